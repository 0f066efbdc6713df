//! Abstract syntax tree produced by the [`Parser`](crate::parser::Parser).
//!
//! The tree is strictly hierarchical: every node owns its children and there
//! are no back-references. Consumers walk it with exhaustive `match`
//! expressions over [`Node`] and [`ExprKind`].

use crate::lexer::TokenKind;
use crate::value::{DataType, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 1-based source location. `0, 0` means "unknown".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Discriminant of every node shape in the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Program,
    Block,
    FunctionDeclaration,
    MotionCommand,
    BinaryExpression,
    UnaryExpression,
    LiteralExpression,
    VariableExpression,
    VariableDeclaration,
    FrameDeclaration,
    PositionDeclaration,
    AxisDeclaration,
    MemberAssign,
    IfStatement,
    WaitStatement,
}

/// Infix operator of an [`ExprKind::Binary`] expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Assign,
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOp {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        Some(match kind {
            TokenKind::Assign => Self::Assign,
            TokenKind::Or => Self::Or,
            TokenKind::And => Self::And,
            TokenKind::Equal => Self::Equal,
            TokenKind::NotEqual => Self::NotEqual,
            TokenKind::Less => Self::Less,
            TokenKind::LessEqual => Self::LessEqual,
            TokenKind::Greater => Self::Greater,
            TokenKind::GreaterEqual => Self::GreaterEqual,
            TokenKind::Plus => Self::Add,
            TokenKind::Minus => Self::Subtract,
            TokenKind::Multiply => Self::Multiply,
            TokenKind::Divide => Self::Divide,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Assign => "=",
            Self::Or => "OR",
            Self::And => "AND",
            Self::Equal => "==",
            Self::NotEqual => "<>",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Arithmetic `-`.
    Negate,
    /// Logical `NOT`.
    Not,
}

/// An expression with the position of its first token.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Literal(Value),
    Variable(String),
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn literal(value: impl Into<Value>, span: Span) -> Self {
        Self::new(ExprKind::Literal(value.into()), span)
    }

    pub fn variable(name: impl Into<String>, span: Span) -> Self {
        Self::new(ExprKind::Variable(name.into()), span)
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        let span = left.span;
        Self::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    pub fn unary(op: UnaryOp, operand: Expr, span: Span) -> Self {
        Self::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        )
    }

    pub fn kind(&self) -> NodeKind {
        match self.kind {
            ExprKind::Binary { .. } => NodeKind::BinaryExpression,
            ExprKind::Unary { .. } => NodeKind::UnaryExpression,
            ExprKind::Literal(_) => NodeKind::LiteralExpression,
            ExprKind::Variable(_) => NodeKind::VariableExpression,
        }
    }

    /// The variable name if this expression is a bare variable reference.
    pub fn as_variable(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Variable(name) => Some(name),
            _ => None,
        }
    }
}

/// Root of a parsed program.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Program {
    pub body: Block,
}

impl Program {
    pub fn kind(&self) -> NodeKind {
        NodeKind::Program
    }
}

/// An ordered statement list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Block {
    pub statements: Vec<Node>,
    pub span: Span,
}

impl Block {
    pub fn new(statements: Vec<Node>, span: Span) -> Self {
        Self { statements, span }
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// `DEF name() ... END`.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub body: Block,
    pub span: Span,
}

/// `PTP p1`, `LIN p1`, `CIRC p1` and the spline / relative variants.
///
/// Only the target name is captured; its value is resolved when
/// instructions are generated.
#[derive(Clone, Debug, PartialEq)]
pub struct MotionCommand {
    /// Upper-case keyword, e.g. `"LIN"`.
    pub command: String,
    pub target: String,
    /// Named arguments forwarded to the instruction.
    pub args: Vec<(String, Expr)>,
    pub span: Span,
}

/// `DECL INT x = expr`.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableDecl {
    pub data_type: DataType,
    pub name: String,
    pub initializer: Option<Expr>,
    pub span: Span,
}

/// `DECL POS p = {x 1.0, y 2.0}` and its FRAME / AXIS counterparts.
#[derive(Clone, Debug, PartialEq)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<(String, Expr)>,
    pub span: Span,
}

/// `p.x = expr`: assigns one field of a declared structured variable.
#[derive(Clone, Debug, PartialEq)]
pub struct MemberAssign {
    pub target: String,
    pub field: String,
    pub value: Expr,
    pub span: Span,
}

/// `IF cond THEN ... [ELSE ...] ENDIF`.
#[derive(Clone, Debug, PartialEq)]
pub struct IfStatement {
    pub condition: Expr,
    pub then_branch: Block,
    pub else_branch: Option<Block>,
    pub span: Span,
}

/// `WAIT(seconds)`.
#[derive(Clone, Debug, PartialEq)]
pub struct WaitStatement {
    pub duration: f64,
    pub span: Span,
}

/// A statement-level node.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Block(Block),
    FunctionDecl(FunctionDecl),
    Motion(MotionCommand),
    VariableDecl(VariableDecl),
    PositionDecl(StructDecl),
    FrameDecl(StructDecl),
    AxisDecl(StructDecl),
    MemberAssign(MemberAssign),
    If(IfStatement),
    Wait(WaitStatement),
    Expression(Expr),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Block(_) => NodeKind::Block,
            Self::FunctionDecl(_) => NodeKind::FunctionDeclaration,
            Self::Motion(_) => NodeKind::MotionCommand,
            Self::VariableDecl(_) => NodeKind::VariableDeclaration,
            Self::PositionDecl(_) => NodeKind::PositionDeclaration,
            Self::FrameDecl(_) => NodeKind::FrameDeclaration,
            Self::AxisDecl(_) => NodeKind::AxisDeclaration,
            Self::MemberAssign(_) => NodeKind::MemberAssign,
            Self::If(_) => NodeKind::IfStatement,
            Self::Wait(_) => NodeKind::WaitStatement,
            Self::Expression(expr) => expr.kind(),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Block(b) => b.span,
            Self::FunctionDecl(f) => f.span,
            Self::Motion(m) => m.span,
            Self::VariableDecl(d) => d.span,
            Self::PositionDecl(d) | Self::FrameDecl(d) | Self::AxisDecl(d) => d.span,
            Self::MemberAssign(m) => m.span,
            Self::If(i) => i.span,
            Self::Wait(w) => w.span,
            Self::Expression(e) => e.span,
        }
    }
}
