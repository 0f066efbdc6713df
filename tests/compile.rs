// tests/compile.rs
use pretty_assertions::assert_eq;
use robot_script::{Phase, compile};

#[test]
fn test_clean_program() {
    let compilation = compile("DECL POS p = {z 10.0}\nPTP p\n");
    assert!(!compilation.has_errors());
    assert!(compilation.diagnostics.is_empty());
    assert!(compilation.program.is_some());
    assert_eq!(compilation.instructions.len(), 2);
}

#[test]
fn test_lexical_errors_stop_the_pipeline() {
    let compilation = compile("DECL INT x = 1\nx = x ? 2\n");
    assert!(compilation.has_errors());
    assert!(compilation.program.is_none());
    assert!(compilation.instructions.is_empty());

    let lexical: Vec<_> = compilation.diagnostics.of_phase(Phase::Lexical).collect();
    assert_eq!(lexical.len(), 1);
    assert_eq!((lexical[0].line, lexical[0].column), (2, 7));
}

#[test]
fn test_syntax_errors_skip_generation() {
    let compilation = compile("DECL POS p = {x 1.0}\nPTP\n");
    assert!(compilation.has_errors());
    assert!(compilation.program.is_some());
    assert!(compilation.instructions.is_empty());
    assert_eq!(compilation.diagnostics.of_phase(Phase::Syntax).count(), 1);
}

#[test]
fn test_semantic_diagnostics_are_not_errors() {
    let compilation = compile("DECL REAL r = 1 / 0\nWAIT(1)\n");
    assert!(!compilation.has_errors());
    assert_eq!(compilation.diagnostics.of_phase(Phase::Semantic).count(), 1);
    assert_eq!(compilation.instructions.len(), 2);
}

#[test]
fn test_diagnostic_display() {
    let compilation = compile("DECL REAL r = missing\n");
    let diagnostic = compilation.diagnostics.iter().next().unwrap();
    assert_eq!(
        diagnostic.to_string(),
        "semantic error at line 1, column 15: Undefined variable 'missing'"
    );
}
