//! # robot-script
//!
//! An interpreter for a small robot-motion language: typed declarations,
//! Cartesian poses and joint sets, arithmetic, `IF`/`ELSE`, `PTP`/`LIN`/`CIRC`
//! motions and timed waits.
//!
//! Source text goes through [`tokenize`], [`parse`] and [`generate`] to become
//! a flat list of [`Instruction`]s, which an [`Executor`] dispatches against
//! any [`MotionPort`] under the control of a [`StateMachine`].
//! [`SimulatedMotion`] is a port that models travel time without hardware.
//!
//! ```no_run
//! use robot_script::{Executor, SimulatedMotion, compile};
//!
//! let compilation = compile("DECL POS home = {x 0.0, y 0.0, z 100.0}\nPTP home\n");
//! assert!(!compilation.has_errors());
//!
//! let mut executor = Executor::new(SimulatedMotion::default());
//! let report = executor.run(&compilation.instructions).unwrap();
//! assert_eq!(report.dispatched, 1);
//! ```

pub mod ast;
pub mod diagnostics;
pub mod error;
pub mod executor;
pub mod generator;
pub mod lexer;
pub mod motion;
pub mod parser;
pub mod state_machine;
pub mod symbols;
pub mod value;

pub use ast::*;
pub use diagnostics::*;
pub use error::*;
pub use executor::*;
pub use generator::*;
pub use lexer::*;
pub use motion::*;
pub use parser::*;
pub use state_machine::*;
pub use symbols::*;
pub use value::*;

use tracing::debug;

/// Everything produced by running the front end over one source text.
#[derive(Clone, Debug, Default)]
pub struct Compilation {
    pub tokens: Vec<Token>,
    /// `None` when lexing failed.
    pub program: Option<Program>,
    /// Empty when lexing or parsing failed.
    pub instructions: Vec<Instruction>,
    pub diagnostics: Diagnostics,
}

impl Compilation {
    /// True when a lexical or syntax error stopped the pipeline.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

/// Tokenizes, parses and generates `source`.
///
/// Each phase runs only if the previous one reported no errors. Semantic
/// diagnostics from generation never stop the pipeline.
pub fn compile(source: &str) -> Compilation {
    let tokens = tokenize(source);
    let mut diagnostics = Diagnostics::from_tokens(&tokens);
    if diagnostics.has_errors() {
        debug!(errors = diagnostics.len(), "lexing failed");
        return Compilation {
            tokens,
            diagnostics,
            ..Default::default()
        };
    }

    let (program, syntax) = parse(&tokens);
    diagnostics.extend(syntax);
    if diagnostics.has_errors() {
        debug!(errors = diagnostics.len(), "parsing failed");
        return Compilation {
            tokens,
            program: Some(program),
            instructions: Vec::new(),
            diagnostics,
        };
    }

    let (instructions, semantic) = generate(Some(&program));
    diagnostics.extend(semantic);

    Compilation {
        tokens,
        program: Some(program),
        instructions,
        diagnostics,
    }
}
