//! Recursive-descent parser producing a [`Program`].
//!
//! Statements are parsed by one method per grammar rule; expressions use a
//! precedence-climbing chain from assignment (lowest) down to primary
//! expressions. The parser never stops at the first problem:
//!
//! * a *hard* error abandons the current statement, is recorded, and the
//!   parser skips ahead to the next end of line before continuing;
//! * a *soft* error (a missing `)`, an invalid assignment target, a missing
//!   end of line after a declaration) is recorded and the partially built
//!   node is kept.
//!
//! Either way the caller receives a best-effort tree plus the full list of
//! diagnostics.

use crate::ast::{
    BinaryOp, Block, Expr, FunctionDecl, IfStatement, MemberAssign, MotionCommand, Node, Program,
    Span, StructDecl, UnaryOp, VariableDecl, WaitStatement,
};
use crate::diagnostics::{Diagnostic, Phase};
use crate::lexer::{Token, TokenKind};
use crate::value::{AxisValues, DataType, Position};
use tracing::{debug, trace};

type ParseResult<T> = Result<T, Diagnostic>;

/// Tokens that close a nested block.
const BLOCK_TERMINATORS: [TokenKind; 4] = [
    TokenKind::EndIf,
    TokenKind::Else,
    TokenKind::End,
    TokenKind::EndFor,
];

/// Parses a token stream in one call.
pub fn parse(tokens: &[Token]) -> (Program, Vec<Diagnostic>) {
    Parser::new(tokens).parse()
}

/// Recursive-descent parser that recovers at line boundaries and keeps
/// every syntax diagnostic it produces.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<Diagnostic>,
}

impl Parser {
    /// Creates a parser over `tokens`.
    ///
    /// Comment (`;`) tokens are dropped and a trailing end-of-file token is
    /// added if the stream lacks one.
    pub fn new(tokens: &[Token]) -> Self {
        let mut tokens: Vec<Token> = tokens
            .iter()
            .filter(|t| t.kind != TokenKind::Semicolon)
            .cloned()
            .collect();
        if tokens.last().map(|t| t.kind) != Some(TokenKind::EndOfFile) {
            let line = tokens.last().map_or(1, |t| t.line + 1);
            tokens.push(Token::new(TokenKind::EndOfFile, "", line, 1));
        }
        Self {
            tokens,
            current: 0,
            errors: Vec::new(),
        }
    }

    /// Parses the whole stream into a program.
    pub fn parse(mut self) -> (Program, Vec<Diagnostic>) {
        let span = self.peek().span();
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if let Some(node) = self.declaration_or_recover() {
                statements.push(node);
            }
        }

        debug!(
            statements = statements.len(),
            errors = self.errors.len(),
            "parsing finished"
        );
        let program = Program {
            body: Block::new(statements, span),
        };
        (program, self.errors)
    }

    // --- Token cursor ---

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::EndOfFile
    }

    fn peek(&self) -> &Token {
        let idx = self.current.min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn peek_next(&self) -> &Token {
        let idx = (self.current + 1).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) && !self.is_at_end() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn match_any(&mut self, kinds: &[TokenKind]) -> Option<Token> {
        if kinds.contains(&self.peek().kind) && !self.is_at_end() {
            Some(self.advance())
        } else {
            None
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(message))
        }
    }

    // --- Diagnostics ---

    fn error_here(&self, message: impl Into<String>) -> Diagnostic {
        Diagnostic::new(Phase::Syntax, message, Some(self.peek().span()))
    }

    fn report(&mut self, message: impl Into<String>, span: Span) {
        self.errors
            .push(Diagnostic::new(Phase::Syntax, message, Some(span)));
    }

    /// Parses one declaration; on a hard error records it and skips to the
    /// next statement boundary.
    fn declaration_or_recover(&mut self) -> Option<Node> {
        match self.declaration() {
            Ok(node) => node,
            Err(diagnostic) => {
                debug!(%diagnostic, "resynchronizing after parse error");
                self.errors.push(diagnostic);
                self.synchronize();
                None
            }
        }
    }

    fn synchronize(&mut self) {
        while !self.is_at_end() {
            if self.advance().kind == TokenKind::EndOfLine {
                break;
            }
        }
    }

    // --- Statements ---

    fn declaration(&mut self) -> ParseResult<Option<Node>> {
        trace!(token = %self.peek().text, kind = %self.peek().kind, line = self.peek().line, "declaration");
        if self.match_kind(TokenKind::Def) {
            return self.function_declaration().map(Some);
        }
        if self.match_kind(TokenKind::Decl) {
            return self.variable_declaration().map(Some);
        }
        self.statement()
    }

    fn function_declaration(&mut self) -> ParseResult<Node> {
        let span = self.tokens[self.current - 1].span();
        let name = self
            .expect(TokenKind::Identifier, "Expected function name after DEF")?
            .text;
        self.expect(TokenKind::LParen, "Expected '(' after function name")?;
        self.expect(TokenKind::RParen, "Expected ')' after parameters")?;

        let body = self.block();
        self.expect(TokenKind::End, "Expected 'END' after function body")?;

        Ok(Node::FunctionDecl(FunctionDecl { name, body, span }))
    }

    fn variable_declaration(&mut self) -> ParseResult<Node> {
        let span = self.tokens[self.current - 1].span();
        let data_type = match self.peek().kind {
            TokenKind::Int => DataType::Int,
            TokenKind::Real => DataType::Real,
            TokenKind::Bool => DataType::Bool,
            TokenKind::Char => DataType::Char,
            TokenKind::Pos => DataType::Pos,
            TokenKind::Frame => DataType::Frame,
            TokenKind::Axis => DataType::Axis,
            _ => return Err(self.error_here("Expected data type after DECL")),
        };
        self.advance();

        if data_type.is_structured() {
            return self.struct_declaration(data_type, span);
        }

        let name = self
            .expect(TokenKind::Identifier, "Expected variable name")?
            .text;
        let initializer = if self.match_kind(TokenKind::Assign) {
            Some(self.expression()?)
        } else {
            None
        };

        if !self.match_kind(TokenKind::EndOfLine) {
            let here = self.peek().span();
            self.report("Expected end of line after variable declaration", here);
        }

        Ok(Node::VariableDecl(VariableDecl {
            data_type,
            name,
            initializer,
            span,
        }))
    }

    /// `IDENT ('=' '{' field expr (',' field expr)* '}')?` for POS, FRAME
    /// and AXIS.
    fn struct_declaration(&mut self, data_type: DataType, span: Span) -> ParseResult<Node> {
        let name = self
            .expect(
                TokenKind::Identifier,
                &format!("Expected {data_type} variable name"),
            )?
            .text;

        let mut fields = Vec::new();
        if self.match_kind(TokenKind::Assign) {
            self.expect(
                TokenKind::LBrace,
                &format!("Expected '{{' to open {data_type} value"),
            )?;

            if !self.check(TokenKind::RBrace) {
                loop {
                    let field = self.expect(TokenKind::Identifier, "Expected field name")?;
                    if !data_type.fields().contains(&field.text.as_str()) {
                        return Err(Diagnostic::new(
                            Phase::Syntax,
                            format!("Unknown field '{}' for {data_type}", field.text),
                            Some(field.span()),
                        ));
                    }
                    let value = self.expression()?;
                    fields.push((field.text, value));

                    if !self.match_kind(TokenKind::Comma) {
                        break;
                    }
                }
            }

            self.expect(
                TokenKind::RBrace,
                &format!("Expected '}}' to close {data_type} value"),
            )?;
        }

        if !self.match_kind(TokenKind::EndOfLine) {
            let here = self.peek().span();
            self.report(
                format!("Expected end of line after {data_type} declaration"),
                here,
            );
        }

        let decl = StructDecl { name, fields, span };
        Ok(match data_type {
            DataType::Frame => Node::FrameDecl(decl),
            DataType::Axis => Node::AxisDecl(decl),
            _ => Node::PositionDecl(decl),
        })
    }

    fn statement(&mut self) -> ParseResult<Option<Node>> {
        let kind = self.peek().kind;
        match kind {
            k if k.is_motion() => {
                let keyword = self.advance();
                self.motion_command(keyword).map(Some)
            }
            TokenKind::If => {
                self.advance();
                self.if_statement().map(Some)
            }
            TokenKind::Wait => {
                self.advance();
                self.wait_statement().map(Some)
            }
            TokenKind::Return | TokenKind::EndOfLine => {
                self.advance();
                Ok(None)
            }
            TokenKind::Identifier if self.peek_next().kind == TokenKind::Dot => {
                self.member_assign().map(Some)
            }
            _ => self.expression_statement().map(Some),
        }
    }

    fn motion_command(&mut self, keyword: Token) -> ParseResult<Node> {
        let target = self.expect(
            TokenKind::Identifier,
            "Expected position name after motion command",
        )?;
        let args = vec![(
            "position".to_string(),
            Expr::variable(target.text.clone(), target.span()),
        )];

        Ok(Node::Motion(MotionCommand {
            command: keyword.kind.name().to_string(),
            target: target.text,
            args,
            span: keyword.span(),
        }))
    }

    fn member_assign(&mut self) -> ParseResult<Node> {
        let target = self.advance();
        self.advance(); // '.'

        let field = self.expect(TokenKind::Identifier, "Expected field name after '.'")?;
        let known = Position::FIELDS
            .iter()
            .chain(AxisValues::FIELDS.iter())
            .any(|f| *f == field.text);
        if !known {
            return Err(Diagnostic::new(
                Phase::Syntax,
                format!("Unknown field '{}'", field.text),
                Some(field.span()),
            ));
        }

        self.expect(TokenKind::Assign, "Expected assignment after field name")?;
        let value = self.expression()?;

        Ok(Node::MemberAssign(MemberAssign {
            span: target.span(),
            target: target.text,
            field: field.text,
            value,
        }))
    }

    fn wait_statement(&mut self) -> ParseResult<Node> {
        let span = self.tokens[self.current - 1].span();
        self.expect(TokenKind::LParen, "Expected '(' after WAIT")?;

        let literal = self.peek().clone();
        let duration = match literal.kind {
            TokenKind::IntegerLiteral | TokenKind::FloatLiteral => literal
                .text
                .parse::<f64>()
                .map_err(|_| self.error_here("Invalid wait time"))?,
            _ => return Err(self.error_here("Expected numeric wait time")),
        };
        self.advance();

        self.expect(TokenKind::RParen, "Expected ')' after wait time")?;
        Ok(Node::Wait(WaitStatement { duration, span }))
    }

    fn if_statement(&mut self) -> ParseResult<Node> {
        let span = self.tokens[self.current - 1].span();
        let condition = self.expression()?;

        self.expect(TokenKind::Then, "Expected 'THEN' after 'IF' condition")?;
        self.expect(TokenKind::EndOfLine, "Expected end of line after 'THEN'")?;
        let then_branch = self.block();

        let else_branch = if self.match_kind(TokenKind::Else) {
            self.expect(TokenKind::EndOfLine, "Expected end of line after 'ELSE'")?;
            Some(self.block())
        } else {
            None
        };

        self.expect(TokenKind::EndIf, "Expected 'ENDIF' to close IF statement")?;

        Ok(Node::If(IfStatement {
            condition,
            then_branch,
            else_branch,
            span,
        }))
    }

    fn expression_statement(&mut self) -> ParseResult<Node> {
        let expr = self.expression()?;
        self.match_kind(TokenKind::EndOfLine);
        Ok(Node::Expression(expr))
    }

    /// Statements up to (not including) the next block terminator.
    fn block(&mut self) -> Block {
        let span = self.peek().span();
        let mut statements = Vec::new();

        while !self.is_at_end() && !BLOCK_TERMINATORS.contains(&self.peek().kind) {
            if let Some(node) = self.declaration_or_recover() {
                statements.push(node);
            }
        }

        Block::new(statements, span)
    }

    // --- Expressions ---

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.logical_or()?;

        if let Some(equals) = self.match_any(&[TokenKind::Assign]) {
            let value = self.assignment()?;
            if expr.as_variable().is_some() {
                return Ok(Expr::binary(BinaryOp::Assign, expr, value));
            }
            self.report("Invalid assignment target", equals.span());
        }

        Ok(expr)
    }

    /// One left-associative precedence level.
    fn binary_level(
        &mut self,
        operators: &[TokenKind],
        operand: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let mut expr = operand(self)?;

        while let Some(op) = self.match_any(operators) {
            let right = operand(self)?;
            if let Some(op) = BinaryOp::from_token(op.kind) {
                expr = Expr::binary(op, expr, right);
            }
        }

        Ok(expr)
    }

    fn logical_or(&mut self) -> ParseResult<Expr> {
        self.binary_level(&[TokenKind::Or], Self::logical_and)
    }

    fn logical_and(&mut self) -> ParseResult<Expr> {
        self.binary_level(&[TokenKind::And], Self::equality)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        self.binary_level(&[TokenKind::Equal, TokenKind::NotEqual], Self::comparison)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        self.binary_level(
            &[
                TokenKind::Less,
                TokenKind::Greater,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> ParseResult<Expr> {
        self.binary_level(&[TokenKind::Plus, TokenKind::Minus], Self::factor)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        self.binary_level(&[TokenKind::Multiply, TokenKind::Divide], Self::unary)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if let Some(op) = self.match_any(&[TokenKind::Minus, TokenKind::Not]) {
            let operand = self.unary()?;
            let unary_op = if op.kind == TokenKind::Minus {
                UnaryOp::Negate
            } else {
                UnaryOp::Not
            };
            return Ok(Expr::unary(unary_op, operand, op.span()));
        }
        self.primary()
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let token = self.peek().clone();
        let span = token.span();

        let expr = match token.kind {
            TokenKind::True => Expr::literal(true, span),
            TokenKind::False => Expr::literal(false, span),
            TokenKind::Pi => Expr::literal(std::f64::consts::PI, span),
            TokenKind::IntegerLiteral => {
                let value = token
                    .text
                    .parse::<i64>()
                    .map_err(|_| self.error_here("Integer literal out of range"))?;
                Expr::literal(value, span)
            }
            TokenKind::FloatLiteral => {
                let value = token
                    .text
                    .parse::<f64>()
                    .map_err(|_| self.error_here("Invalid real literal"))?;
                Expr::literal(value, span)
            }
            TokenKind::StringLiteral => Expr::literal(unquote(&token.text), span),
            TokenKind::Identifier | TokenKind::IoInput | TokenKind::IoOutput => {
                Expr::variable(token.text.clone(), span)
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.expression()?;
                if !self.match_kind(TokenKind::RParen) {
                    let here = self.peek().span();
                    self.report("Expected ')' after expression", here);
                }
                return Ok(expr);
            }
            _ => {
                return Err(self.error_here(format!(
                    "Expected expression, found {}",
                    describe(&token)
                )));
            }
        };

        self.advance();
        Ok(expr)
    }
}

/// Strips the surrounding quotes and resolves backslash escapes.
fn unquote(literal: &str) -> String {
    let inner = literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(literal);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::EndOfLine => "end of line".to_string(),
        TokenKind::EndOfFile => "end of file".to_string(),
        _ => format!("'{}'", token.text),
    }
}
