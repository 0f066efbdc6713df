//! Lowers a [`Program`] into a flat, ordered list of [`Instruction`]s.
//!
//! The generator walks the tree once, keeping a "last evaluated value"
//! register and a flat [`SymbolTable`]. Constants are folded, variables are
//! bound and every assignment is coerced into the declared type of its
//! target. Conditionals are resolved here: only the taken branch of an `IF`
//! reaches the instruction stream.
//!
//! Problems found on the way (undefined names, impossible conversions,
//! division by zero, bad field names) are recorded as semantic diagnostics
//! and replaced by a safe fallback, so generation always runs to the end.

use crate::ast::{
    BinaryOp, Block, Expr, ExprKind, IfStatement, MemberAssign, MotionCommand, Node, Program,
    Span, StructDecl, UnaryOp, VariableDecl,
};
use crate::diagnostics::{Diagnostic, Phase};
use crate::symbols::SymbolTable;
use crate::value::{DataType, Value};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Argument key carrying the Cartesian target of a motion instruction.
pub const POSITION_INFORMATION: &str = "Position Information";
/// Argument key carrying the joint target of a motion instruction.
pub const AXIS_INFORMATION: &str = "Axis Information";
/// Argument key carrying the duration of a `WAIT` instruction, in seconds.
pub const DURATION_TIME: &str = "duration_time";

/// One entry of the instruction stream handed to the executor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub command: String,
    pub args: Vec<(String, Value)>,
    pub location: Option<Span>,
}

impl Instruction {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            location: None,
        }
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.push((name.into(), value.into()));
        self
    }

    pub fn at(mut self, span: Span) -> Self {
        self.location = Some(span);
        self
    }

    /// First argument named `name`.
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

/// Generates instructions for `program` with a fresh generator.
pub fn generate(program: Option<&Program>) -> (Vec<Instruction>, Vec<Diagnostic>) {
    let mut generator = InstructionGenerator::new();
    let instructions = generator.generate(program);
    (instructions, generator.take_diagnostics())
}

/// Single-pass lowering of a [`Program`] into [`Instruction`]s.
#[derive(Debug)]
pub struct InstructionGenerator {
    instructions: Vec<Instruction>,
    register: Value,
    symbols: SymbolTable,
    diagnostics: Vec<Diagnostic>,
}

impl Default for InstructionGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl InstructionGenerator {
    pub fn new() -> Self {
        Self {
            instructions: Vec::new(),
            register: Value::Real(0.0),
            symbols: SymbolTable::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Runs one generation pass. A missing program yields no instructions.
    ///
    /// The symbol table and register start empty on every pass; diagnostics
    /// accumulate until [`take_diagnostics`](Self::take_diagnostics).
    pub fn generate(&mut self, program: Option<&Program>) -> Vec<Instruction> {
        self.instructions.clear();
        self.symbols.clear();
        self.register = Value::Real(0.0);

        let Some(program) = program else {
            return Vec::new();
        };

        self.lower_block(&program.body);
        debug!(
            instructions = self.instructions.len(),
            diagnostics = self.diagnostics.len(),
            "instruction generation finished"
        );
        std::mem::take(&mut self.instructions)
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// The value of the most recently evaluated expression.
    pub fn last_value(&self) -> &Value {
        &self.register
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    fn report(&mut self, message: impl Into<String>, span: Span) {
        let diagnostic = Diagnostic::new(Phase::Semantic, message, Some(span));
        warn!(%diagnostic, "generation");
        self.diagnostics.push(diagnostic);
    }

    fn emit(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    // --- Statements ---

    fn lower_block(&mut self, block: &Block) {
        for node in &block.statements {
            self.lower(node);
        }
    }

    fn lower(&mut self, node: &Node) {
        match node {
            Node::Block(block) => self.lower_block(block),
            // No call mechanism exists, so a routine body runs where it is defined.
            Node::FunctionDecl(function) => self.lower_block(&function.body),
            Node::Motion(motion) => self.lower_motion(motion),
            Node::VariableDecl(decl) => self.lower_variable_decl(decl),
            Node::PositionDecl(decl) => self.lower_struct_decl(decl, DataType::Pos),
            Node::FrameDecl(decl) => self.lower_struct_decl(decl, DataType::Frame),
            Node::AxisDecl(decl) => self.lower_struct_decl(decl, DataType::Axis),
            Node::MemberAssign(assign) => self.lower_member_assign(assign),
            Node::If(stmt) => self.lower_if(stmt),
            Node::Wait(wait) => self.emit(
                Instruction::new("WAIT")
                    .with_arg(DURATION_TIME, wait.duration)
                    .at(wait.span),
            ),
            Node::Expression(expr) => {
                self.evaluate(expr);
            }
        }
    }

    fn lower_variable_decl(&mut self, decl: &VariableDecl) {
        let value = match &decl.initializer {
            Some(init) => {
                let raw = self.evaluate(init);
                self.coerce_or_zero(&raw, decl.data_type, &decl.name, init.span)
            }
            None => decl.data_type.zero_value(),
        };

        self.symbols
            .declare(decl.name.clone(), decl.data_type, value.clone());
        self.emit(
            Instruction::new(format!("DECL_{}", decl.name))
                .with_arg("type", decl.data_type.keyword())
                .with_arg("value", value)
                .at(decl.span),
        );
    }

    fn lower_struct_decl(&mut self, decl: &StructDecl, data_type: DataType) {
        let mut value = data_type.zero_value();

        for (field, expr) in &decl.fields {
            let raw = self.evaluate(expr);
            let Some(number) = self.number(&raw, expr.span) else {
                continue;
            };
            if !set_field(&mut value, field, number) {
                self.report(
                    format!("'{field}' is not a field of {data_type}"),
                    expr.span,
                );
            }
        }

        let (command, key) = match data_type {
            DataType::Frame => ("FRAME_DECL", "Frame"),
            DataType::Axis => ("AXIS_DECL", "Axis"),
            _ => ("POSITION_DECL", "Position"),
        };

        self.symbols
            .declare(decl.name.clone(), data_type, value.clone());
        self.emit(
            Instruction::new(command)
                .with_arg("name", decl.name.as_str())
                .with_arg(key, value)
                .at(decl.span),
        );
    }

    fn lower_member_assign(&mut self, assign: &MemberAssign) {
        let Some(data_type) = self.symbols.data_type(&assign.target) else {
            self.report(format!("Undefined variable '{}'", assign.target), assign.span);
            return;
        };
        if !data_type.is_structured() {
            self.report(
                format!(
                    "Cannot assign field '{}' of '{}': {data_type} has no fields",
                    assign.field, assign.target
                ),
                assign.span,
            );
            return;
        }

        let raw = self.evaluate(&assign.value);
        let Some(number) = self.number(&raw, assign.value.span) else {
            return;
        };

        let updated = self
            .symbols
            .value_mut(&assign.target)
            .is_some_and(|slot| set_field(slot, &assign.field, number));
        if !updated {
            self.report(
                format!("'{}' is not a field of {data_type}", assign.field),
                assign.span,
            );
        }
    }

    fn lower_motion(&mut self, motion: &MotionCommand) {
        let Some(symbol) = self.symbols.get(&motion.target) else {
            self.report(
                format!("Undefined motion target '{}'", motion.target),
                motion.span,
            );
            return;
        };

        let target = match &symbol.value {
            Value::Position(p) | Value::Frame(p) => (POSITION_INFORMATION, Value::Position(*p)),
            Value::Axis(a) => (AXIS_INFORMATION, Value::Axis(*a)),
            other => {
                let message = format!(
                    "Motion target '{}' is {}, not a position",
                    motion.target,
                    other.data_type()
                );
                self.report(message, motion.span);
                return;
            }
        };

        let mut instruction = Instruction::new(motion.command.as_str()).at(motion.span);
        for (name, expr) in &motion.args {
            let value = match expr.as_variable() {
                Some(variable) => Value::from(variable),
                None => self.evaluate(expr),
            };
            instruction.args.push((name.clone(), value));
        }
        instruction.args.push((target.0.to_string(), target.1));

        self.emit(instruction);
    }

    fn lower_if(&mut self, stmt: &IfStatement) {
        let condition = self.evaluate(&stmt.condition);
        let taken = self
            .number(&condition, stmt.condition.span)
            .is_some_and(|n| n != 0.0);

        self.emit(
            Instruction::new("IF_START")
                .with_arg("condition", taken)
                .at(stmt.span),
        );

        if taken {
            self.emit(Instruction::new("THEN_BLOCK").at(stmt.then_branch.span));
            self.lower_block(&stmt.then_branch);
        } else if let Some(else_branch) = &stmt.else_branch {
            self.emit(Instruction::new("ELSE_BLOCK").at(else_branch.span));
            self.lower_block(else_branch);
        }

        self.emit(Instruction::new("IF_END").at(stmt.span));
    }

    // --- Expressions ---

    /// Evaluates `expr`, leaves the result in the register and returns it.
    fn evaluate(&mut self, expr: &Expr) -> Value {
        let value = match &expr.kind {
            ExprKind::Literal(value) => value.clone(),
            ExprKind::Variable(name) => match self.symbols.value(name) {
                Some(value) => value.clone(),
                None => {
                    self.report(format!("Undefined variable '{name}'"), expr.span);
                    Value::Real(0.0)
                }
            },
            ExprKind::Unary { op, operand } => {
                let value = self.evaluate(operand);
                match (op, value) {
                    (UnaryOp::Negate, Value::Integer(i)) => Value::Integer(i.wrapping_neg()),
                    (UnaryOp::Negate, other) => {
                        Value::Real(-self.number(&other, operand.span).unwrap_or(0.0))
                    }
                    (UnaryOp::Not, other) => {
                        let n = self.number(&other, operand.span).unwrap_or(0.0);
                        Value::Real(if n == 0.0 { 1.0 } else { 0.0 })
                    }
                }
            }
            ExprKind::Binary {
                op: BinaryOp::Assign,
                left,
                right,
            } => self.assign(left, right),
            ExprKind::Binary { op, left, right } => {
                let lhs = self.evaluate(left);
                let rhs = self.evaluate(right);
                match (self.number(&lhs, left.span), self.number(&rhs, right.span)) {
                    (Some(a), Some(b)) => Value::Real(self.apply(*op, a, b, expr.span)),
                    _ => Value::Real(0.0),
                }
            }
        };

        self.register = value.clone();
        value
    }

    fn apply(&mut self, op: BinaryOp, a: f64, b: f64, span: Span) -> f64 {
        let truth = |cond: bool| if cond { 1.0 } else { 0.0 };
        match op {
            BinaryOp::Add => a + b,
            BinaryOp::Subtract => a - b,
            BinaryOp::Multiply => a * b,
            BinaryOp::Divide => {
                if b == 0.0 {
                    self.report("Division by zero", span);
                    0.0
                } else {
                    a / b
                }
            }
            BinaryOp::Less => truth(a < b),
            BinaryOp::LessEqual => truth(a <= b),
            BinaryOp::Greater => truth(a > b),
            BinaryOp::GreaterEqual => truth(a >= b),
            BinaryOp::Equal => truth(a == b),
            BinaryOp::NotEqual => truth(a != b),
            BinaryOp::And => truth(a != 0.0 && b != 0.0),
            BinaryOp::Or => truth(a != 0.0 || b != 0.0),
            BinaryOp::Assign => b,
        }
    }

    /// Lowers `name = value`, coercing into the declared type of `name`.
    fn assign(&mut self, target: &Expr, value: &Expr) -> Value {
        let Some(name) = target.as_variable() else {
            self.report("Assignment target must be a variable", target.span);
            return Value::Real(0.0);
        };
        let Some(data_type) = self.symbols.data_type(name) else {
            self.report(format!("Undefined variable '{name}'"), target.span);
            return Value::Real(0.0);
        };

        let raw = self.evaluate(value);
        let coerced = match raw.coerce_to(data_type) {
            Ok(v) => v,
            Err(err) if !data_type.is_structured() => {
                self.report(format!("{err} in assignment to '{name}'"), value.span);
                data_type.zero_value()
            }
            Err(err) => {
                // Structured targets keep their current value.
                self.report(format!("{err} in assignment to '{name}'"), value.span);
                return Value::Real(0.0);
            }
        };

        self.symbols.assign(name, coerced.clone());
        self.emit(
            Instruction::new(format!("ASSIGN_{name}"))
                .with_arg("variable", name)
                .with_arg("value", coerced.clone())
                .at(target.span),
        );
        coerced
    }

    /// Numeric view of `value`, reporting values that have none.
    fn number(&mut self, value: &Value, span: Span) -> Option<f64> {
        let number = value.as_number();
        if number.is_none() {
            self.report(
                format!("Cannot convert {} value to a number", value.type_name()),
                span,
            );
        }
        number
    }

    fn coerce_or_zero(&mut self, value: &Value, target: DataType, name: &str, span: Span) -> Value {
        match value.coerce_to(target) {
            Ok(v) => v,
            Err(err) => {
                self.report(format!("{err} in declaration of '{name}'"), span);
                target.zero_value()
            }
        }
    }
}

/// Writes one named field of a structured value.
fn set_field(value: &mut Value, field: &str, number: f64) -> bool {
    let slot = match value {
        Value::Position(p) | Value::Frame(p) => p.field_mut(field),
        Value::Axis(a) => a.field_mut(field),
        _ => None,
    };
    match slot {
        Some(slot) => {
            *slot = number;
            true
        }
        None => false,
    }
}
