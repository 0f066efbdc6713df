//! Lexical analysis: turns program text into a flat token stream.
//!
//! The lexer works line by line. At each position it tries a fixed list of
//! anchored patterns in priority order and takes the first one that matches,
//! so the order of [`PATTERNS`] is part of the language definition.
//! Identifiers are reclassified through the keyword table afterwards.
//!
//! Tokenizing never fails: runs of characters no pattern accepts become
//! [`TokenKind::Invalid`] tokens and are reported later.

use crate::ast::Span;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Kinds of tokens produced by [`tokenize`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    // --- I/O references ---
    /// `$IN[n]`
    IoInput,
    /// `$OUT[n]`
    IoOutput,

    // --- Operators ---
    /// `:=`, `:` or `=`
    Assign,
    Equal,
    NotEqual,
    LessEqual,
    GreaterEqual,
    Less,
    Greater,
    Plus,
    Minus,
    Multiply,
    Divide,
    And,
    Or,
    Not,

    // --- Literals ---
    FloatLiteral,
    IntegerLiteral,
    StringLiteral,

    // --- Punctuation ---
    Ampersand,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    /// Starts a line comment.
    Semicolon,
    SingleQuote,
    Dot,

    Identifier,

    // --- Program structure ---
    Def,
    End,
    Decl,
    Return,
    Halt,
    Goto,

    // --- Data types ---
    Int,
    Real,
    Bool,
    Char,
    Pos,
    Frame,
    Axis,

    // --- Control flow ---
    If,
    Then,
    Else,
    EndIf,
    For,
    To,
    Step,
    EndFor,
    While,
    EndWhile,
    Repeat,
    Until,
    Switch,
    Case,
    Default,
    EndSwitch,

    // --- Motion ---
    Ptp,
    Lin,
    Circ,
    Spline,
    PtpRel,
    LinRel,
    CircRel,
    SplineRel,

    // --- System functions ---
    Wait,
    Delay,

    // --- Constants ---
    True,
    False,
    Pi,

    EndOfLine,
    EndOfFile,
    Invalid,
}

impl TokenKind {
    /// Upper-case name used in diagnostics and listings.
    pub fn name(self) -> &'static str {
        match self {
            Self::IoInput => "IN",
            Self::IoOutput => "OUT",
            Self::Assign => "ASSIGN",
            Self::Equal => "EQUAL",
            Self::NotEqual => "NOTEQUAL",
            Self::LessEqual => "LESSEQ",
            Self::GreaterEqual => "GREATEREQ",
            Self::Less => "LESS",
            Self::Greater => "GREATER",
            Self::Plus => "PLUS",
            Self::Minus => "MINUS",
            Self::Multiply => "MULTIPLY",
            Self::Divide => "DIVIDE",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::FloatLiteral => "FLOAT",
            Self::IntegerLiteral => "INTEGER",
            Self::StringLiteral => "STRING",
            Self::Ampersand => "AMPERSAND",
            Self::LParen => "LPAREN",
            Self::RParen => "RPAREN",
            Self::LBrace => "LBRACE",
            Self::RBrace => "RBRACE",
            Self::Comma => "COMMA",
            Self::Semicolon => "SEMICOLON",
            Self::SingleQuote => "SINGLEQUOTE",
            Self::Dot => "DOT",
            Self::Identifier => "IDENTIFIER",
            Self::Def => "DEF",
            Self::End => "END",
            Self::Decl => "DECL",
            Self::Return => "RETURN",
            Self::Halt => "HALT",
            Self::Goto => "GOTO",
            Self::Int => "INT",
            Self::Real => "REAL",
            Self::Bool => "BOOL",
            Self::Char => "CHAR",
            Self::Pos => "POS",
            Self::Frame => "FRAME",
            Self::Axis => "AXIS",
            Self::If => "IF",
            Self::Then => "THEN",
            Self::Else => "ELSE",
            Self::EndIf => "ENDIF",
            Self::For => "FOR",
            Self::To => "TO",
            Self::Step => "STEP",
            Self::EndFor => "ENDFOR",
            Self::While => "WHILE",
            Self::EndWhile => "ENDWHILE",
            Self::Repeat => "REPEAT",
            Self::Until => "UNTIL",
            Self::Switch => "SWITCH",
            Self::Case => "CASE",
            Self::Default => "DEFAULT",
            Self::EndSwitch => "ENDSWITCH",
            Self::Ptp => "PTP",
            Self::Lin => "LIN",
            Self::Circ => "CIRC",
            Self::Spline => "SPLINE",
            Self::PtpRel => "PTP_REL",
            Self::LinRel => "LIN_REL",
            Self::CircRel => "CIRC_REL",
            Self::SplineRel => "SPLINE_REL",
            Self::Wait => "WAIT",
            Self::Delay => "DELAY",
            Self::True => "TRUE",
            Self::False => "FALSE",
            Self::Pi => "PI",
            Self::EndOfLine => "ENDOFLINE",
            Self::EndOfFile => "ENDOFFILE",
            Self::Invalid => "INVALID",
        }
    }

    pub fn is_motion(self) -> bool {
        matches!(
            self,
            Self::Ptp
                | Self::Lin
                | Self::Circ
                | Self::Spline
                | Self::PtpRel
                | Self::LinRel
                | Self::CircRel
                | Self::SplineRel
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A lexeme with its kind and 1-based source position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            column,
        }
    }

    pub fn span(&self) -> Span {
        Span::new(self.line, self.column)
    }
}

/// Token patterns in matching priority.
///
/// `==` sits ahead of the assignment family; otherwise `=` would match
/// first and `==` would lex as two assignments. Floats precede integers so
/// `1.5` is not cut at the dot.
const PATTERNS: &[(&str, TokenKind)] = &[
    (r"\$IN\[[0-9]+\]", TokenKind::IoInput),
    (r"\$OUT\[[0-9]+\]", TokenKind::IoOutput),
    (r"==", TokenKind::Equal),
    (r":=|:|=", TokenKind::Assign),
    (r"<>", TokenKind::NotEqual),
    (r"<=", TokenKind::LessEqual),
    (r">=", TokenKind::GreaterEqual),
    (r"<", TokenKind::Less),
    (r">", TokenKind::Greater),
    (r"\+", TokenKind::Plus),
    (r"-", TokenKind::Minus),
    (r"\*", TokenKind::Multiply),
    (r"/", TokenKind::Divide),
    (r"\bAND\b", TokenKind::And),
    (r"\bOR\b", TokenKind::Or),
    (r"\bNOT\b", TokenKind::Not),
    (r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", TokenKind::FloatLiteral),
    (r"[0-9]+", TokenKind::IntegerLiteral),
    (r#""([^"\\]|\\.)*""#, TokenKind::StringLiteral),
    (r"&", TokenKind::Ampersand),
    (r"\(", TokenKind::LParen),
    (r"\)", TokenKind::RParen),
    (r"\{", TokenKind::LBrace),
    (r"\}", TokenKind::RBrace),
    (r",", TokenKind::Comma),
    (r";", TokenKind::Semicolon),
    (r"'", TokenKind::SingleQuote),
    (r"\.", TokenKind::Dot),
    (r"[A-Za-z_][A-Za-z0-9_]*", TokenKind::Identifier),
];

static COMPILED_PATTERNS: LazyLock<Vec<(Regex, TokenKind)>> = LazyLock::new(|| {
    PATTERNS
        .iter()
        .map(|&(pattern, kind)| {
            let anchored = format!("^(?:{pattern})");
            let regex = Regex::new(&anchored).expect("static token pattern must compile");
            (regex, kind)
        })
        .collect()
});

static KEYWORDS: LazyLock<HashMap<&'static str, TokenKind>> = LazyLock::new(|| {
    use TokenKind::*;
    [
        Def, End, Decl, Int, Real, Bool, Char, If, Then, Else, EndIf, For, To, Step, EndFor,
        While, EndWhile, Repeat, Until, Switch, Case, Default, EndSwitch, Goto, Halt, Return, Ptp,
        Lin, Circ, Spline, PtpRel, LinRel, CircRel, SplineRel, Wait, Delay, Frame, Axis, Pos,
        True, False, Pi,
    ]
    .into_iter()
    .map(|kind| (kind.name(), kind))
    .collect()
});

/// Looks up a reserved word. Matching is exact and case-sensitive.
pub fn keyword(text: &str) -> Option<TokenKind> {
    KEYWORDS.get(text).copied()
}

/// Returns the kind and byte length of the highest-priority pattern that
/// matches at the start of `rest`.
fn match_token(rest: &str) -> Option<(TokenKind, usize)> {
    COMPILED_PATTERNS.iter().find_map(|(regex, kind)| {
        regex.find(rest).map(|m| {
            let kind = if *kind == TokenKind::Identifier {
                keyword(m.as_str()).unwrap_or(TokenKind::Identifier)
            } else {
                *kind
            };
            (kind, m.end())
        })
    })
}

/// Splits `source` into tokens.
///
/// Every non-empty line ends with an `EndOfLine` token, an empty line is a
/// single `EndOfLine`, and the stream is terminated by one `EndOfFile`. A
/// `;` ends the useful part of its line. Empty input counts as one empty
/// line.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut line_number = 1;

    let lines: Vec<&str> = if source.is_empty() {
        vec![""]
    } else {
        source.lines().collect()
    };

    for line in lines {
        if line.is_empty() {
            tokens.push(Token::new(TokenKind::EndOfLine, "\n", line_number, 1));
            line_number += 1;
            continue;
        }

        let mut pos = 0;
        let mut column = 1;

        while pos < line.len() {
            let rest = &line[pos..];
            let trimmed = rest.trim_start();
            if trimmed.len() < rest.len() {
                let skipped = rest.len() - trimmed.len();
                column += rest[..skipped].chars().count();
                pos += skipped;
                continue;
            }

            let (kind, len) = match match_token(rest) {
                Some(found) => found,
                None => (
                    TokenKind::Invalid,
                    rest.find(char::is_whitespace).unwrap_or(rest.len()),
                ),
            };
            let text = &rest[..len];
            tokens.push(Token::new(kind, text, line_number, column));
            pos += len;
            column += text.chars().count();

            if kind == TokenKind::Semicolon {
                break;
            }
        }

        tokens.push(Token::new(TokenKind::EndOfLine, "\n", line_number, column));
        line_number += 1;
    }

    tokens.push(Token::new(TokenKind::EndOfFile, "", line_number, 1));
    tokens
}
