// tests/lexer.rs
use pretty_assertions::assert_eq;
use robot_script::{Diagnostics, TokenKind, keyword, tokenize};

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source).into_iter().map(|t| t.kind).collect()
}

#[test]
fn test_empty_line_is_single_end_of_line() {
    let tokens = tokenize("\n");
    let eols = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::EndOfLine)
        .count();
    assert_eq!(eols, 1);
    assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::EndOfFile));
}

#[test]
fn test_empty_source_still_has_line_end() {
    assert_eq!(kinds(""), vec![TokenKind::EndOfLine, TokenKind::EndOfFile]);
}

#[test]
fn test_arithmetic_assignment() {
    use TokenKind::*;
    assert_eq!(
        kinds("x = 10 + 20 * (30 - 5)"),
        vec![
            Identifier,
            Assign,
            IntegerLiteral,
            Plus,
            IntegerLiteral,
            Multiply,
            LParen,
            IntegerLiteral,
            Minus,
            IntegerLiteral,
            RParen,
            EndOfLine,
            EndOfFile,
        ]
    );
}

#[test]
fn test_double_equals_is_equality() {
    use TokenKind::*;
    assert_eq!(
        kinds("IF a == 1 THEN"),
        vec![If, Identifier, Equal, IntegerLiteral, Then, EndOfLine, EndOfFile]
    );
}

#[test]
fn test_assignment_spellings() {
    use TokenKind::*;
    // ':=' must not split into ':' and '='.
    assert_eq!(
        kinds("a := 1"),
        vec![Identifier, Assign, IntegerLiteral, EndOfLine, EndOfFile]
    );
    assert_eq!(tokenize("a := 1")[1].text, ":=");
}

#[test]
fn test_float_is_not_split_at_dot() {
    let tokens = tokenize("1.5 2 3.0e2");
    assert_eq!(tokens[0].kind, TokenKind::FloatLiteral);
    assert_eq!(tokens[0].text, "1.5");
    assert_eq!(tokens[1].kind, TokenKind::IntegerLiteral);
    assert_eq!(tokens[2].kind, TokenKind::FloatLiteral);
    assert_eq!(tokens[2].text, "3.0e2");
}

#[test]
fn test_keywords_are_case_sensitive() {
    assert_eq!(keyword("PTP"), Some(TokenKind::Ptp));
    assert_eq!(keyword("LIN_REL"), Some(TokenKind::LinRel));
    assert_eq!(keyword("ptp"), None);

    use TokenKind::*;
    assert_eq!(
        kinds("PTP ptp"),
        vec![Ptp, Identifier, EndOfLine, EndOfFile]
    );
}

#[test]
fn test_word_operators_need_word_boundaries() {
    use TokenKind::*;
    assert_eq!(
        kinds("a AND ANDY"),
        vec![Identifier, And, Identifier, EndOfLine, EndOfFile]
    );
}

#[test]
fn test_io_references() {
    let tokens = tokenize("$IN[3] $OUT[12]");
    assert_eq!(tokens[0].kind, TokenKind::IoInput);
    assert_eq!(tokens[0].text, "$IN[3]");
    assert_eq!(tokens[1].kind, TokenKind::IoOutput);
}

#[test]
fn test_semicolon_ends_the_line() {
    use TokenKind::*;
    assert_eq!(
        kinds("WAIT(1) ; wait a bit\nPTP p"),
        vec![
            Wait, LParen, IntegerLiteral, RParen, Semicolon, EndOfLine, Ptp, Identifier, EndOfLine,
            EndOfFile,
        ]
    );
}

#[test]
fn test_positions_are_one_based() {
    let tokens = tokenize("DECL INT x\n  x = 5");
    let x = &tokens[4];
    assert_eq!((x.kind, x.line, x.column), (TokenKind::Identifier, 2, 3));
    let five = &tokens[6];
    assert_eq!((five.line, five.column), (2, 7));

    let eof = tokens.last().unwrap();
    assert_eq!((eof.kind, eof.line, eof.column), (TokenKind::EndOfFile, 3, 1));
}

#[test]
fn test_string_literal_with_escape() {
    let tokens = tokenize(r#"msg = "say \"hi\"""#);
    assert_eq!(tokens[2].kind, TokenKind::StringLiteral);
    assert_eq!(tokens[2].text, r#""say \"hi\"""#);
}

#[test]
fn test_unrecognized_input_becomes_invalid() {
    let tokens = tokenize("x = #bad 1");
    assert_eq!(tokens[2].kind, TokenKind::Invalid);
    assert_eq!(tokens[2].text, "#bad");
    // Lexing carries on after the bad run.
    assert_eq!(tokens[3].kind, TokenKind::IntegerLiteral);

    let diagnostics = Diagnostics::from_tokens(&tokens);
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics.has_errors());
    let d = diagnostics.iter().next().unwrap();
    assert_eq!((d.line, d.column), (1, 5));
}
