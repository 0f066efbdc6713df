//! Diagnostics collected by the lexer, parser and generator.
//!
//! None of the front-end phases abort on a problem. Each one records a
//! [`Diagnostic`] and carries on with a best-effort result, and the caller
//! decides what to do with the accumulated list once the phase is done.

use crate::ast::Span;
use crate::lexer::{Token, TokenKind};
use std::fmt;
use thiserror::Error;

/// The pipeline phase that produced a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Lexical,
    Syntax,
    Semantic,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lexical => "lexical",
            Self::Syntax => "syntax",
            Self::Semantic => "semantic",
        })
    }
}

/// A single `{message, line, column}` report.
///
/// Line and column are 1-based. Generator diagnostics about nodes without a
/// recorded location use `0, 0`.
#[derive(Clone, Debug, PartialEq, Error)]
#[error("{phase} error at line {line}, column {column}: {message}")]
pub struct Diagnostic {
    pub phase: Phase,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl Diagnostic {
    pub fn new(phase: Phase, message: impl Into<String>, span: Option<Span>) -> Self {
        let span = span.unwrap_or_default();
        Self {
            phase,
            message: message.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn span(&self) -> Span {
        Span::new(self.line, self.column)
    }
}

/// Ordered collection of diagnostics from one or more phases.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports every `Invalid` token as a lexical diagnostic.
    pub fn from_tokens(tokens: &[Token]) -> Self {
        let entries = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Invalid)
            .map(|t| {
                Diagnostic::new(
                    Phase::Lexical,
                    format!("unrecognized input '{}'", t.text),
                    Some(t.span()),
                )
            })
            .collect();
        Self { entries }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.entries.extend(diagnostics);
    }

    /// True when any lexical or syntax problem was found.
    ///
    /// Semantic diagnostics are recoverable by construction and do not count.
    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|d| matches!(d.phase, Phase::Lexical | Phase::Syntax))
    }

    pub fn of_phase(&self, phase: Phase) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.phase == phase)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
