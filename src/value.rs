//! Typed value model shared by the generator, the instruction stream and the
//! execution engine.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A 6-DOF Cartesian pose: translation in millimetres and roll/pitch/yaw in
/// degrees. Used for both `POS` and `FRAME` variables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Roll.
    pub a: f64,
    /// Pitch.
    pub b: f64,
    /// Yaw.
    pub c: f64,
}

impl Position {
    pub const FIELDS: [&'static str; 6] = ["x", "y", "z", "a", "b", "c"];

    pub fn new(x: f64, y: f64, z: f64, a: f64, b: f64, c: f64) -> Self {
        Self { x, y, z, a, b, c }
    }

    /// Returns the translational part of the pose.
    pub fn translation(&self) -> DVec3 {
        DVec3::new(self.x, self.y, self.z)
    }

    /// Returns the rotational part of the pose as `(a, b, c)`.
    pub fn orientation(&self) -> DVec3 {
        DVec3::new(self.a, self.b, self.c)
    }

    /// Builds a pose from a translation and an `(a, b, c)` orientation.
    pub fn from_parts(translation: DVec3, orientation: DVec3) -> Self {
        Self::new(
            translation.x,
            translation.y,
            translation.z,
            orientation.x,
            orientation.y,
            orientation.z,
        )
    }

    /// Mutable access to a field by its source-level name (`x` .. `c`).
    pub fn field_mut(&mut self, name: &str) -> Option<&mut f64> {
        match name {
            "x" => Some(&mut self.x),
            "y" => Some(&mut self.y),
            "z" => Some(&mut self.z),
            "a" => Some(&mut self.a),
            "b" => Some(&mut self.b),
            "c" => Some(&mut self.c),
            _ => None,
        }
    }

    pub fn to_array(&self) -> [f64; 6] {
        [self.x, self.y, self.z, self.a, self.b, self.c]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{x {}, y {}, z {}, a {}, b {}, c {}}}",
            self.x, self.y, self.z, self.a, self.b, self.c
        )
    }
}

/// Target values for the six robot joints (`A1` .. `A6`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisValues {
    pub a1: f64,
    pub a2: f64,
    pub a3: f64,
    pub a4: f64,
    pub a5: f64,
    pub a6: f64,
}

impl AxisValues {
    pub const FIELDS: [&'static str; 6] = ["A1", "A2", "A3", "A4", "A5", "A6"];

    pub fn new(values: [f64; 6]) -> Self {
        let [a1, a2, a3, a4, a5, a6] = values;
        Self {
            a1,
            a2,
            a3,
            a4,
            a5,
            a6,
        }
    }

    /// Mutable access to a joint by its source-level name (`A1` .. `A6`).
    pub fn field_mut(&mut self, name: &str) -> Option<&mut f64> {
        match name {
            "A1" => Some(&mut self.a1),
            "A2" => Some(&mut self.a2),
            "A3" => Some(&mut self.a3),
            "A4" => Some(&mut self.a4),
            "A5" => Some(&mut self.a5),
            "A6" => Some(&mut self.a6),
            _ => None,
        }
    }

    pub fn to_array(&self) -> [f64; 6] {
        [self.a1, self.a2, self.a3, self.a4, self.a5, self.a6]
    }
}

impl fmt::Display for AxisValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{A1 {}, A2 {}, A3 {}, A4 {}, A5 {}, A6 {}}}",
            self.a1, self.a2, self.a3, self.a4, self.a5, self.a6
        )
    }
}

/// Static type of a declared variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Int,
    Real,
    Bool,
    Char,
    Pos,
    Frame,
    Axis,
}

impl DataType {
    /// The keyword that declares this type in source text.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Int => "INT",
            Self::Real => "REAL",
            Self::Bool => "BOOL",
            Self::Char => "CHAR",
            Self::Pos => "POS",
            Self::Frame => "FRAME",
            Self::Axis => "AXIS",
        }
    }

    /// The value a declaration without initializer starts with.
    pub fn zero_value(self) -> Value {
        match self {
            Self::Int => Value::Integer(0),
            Self::Real => Value::Real(0.0),
            Self::Bool => Value::Boolean(false),
            Self::Char => Value::Text(String::new()),
            Self::Pos => Value::Position(Position::default()),
            Self::Frame => Value::Frame(Position::default()),
            Self::Axis => Value::Axis(AxisValues::default()),
        }
    }

    pub fn is_structured(self) -> bool {
        matches!(self, Self::Pos | Self::Frame | Self::Axis)
    }

    /// Field names accepted inside a structured literal of this type.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            Self::Pos | Self::Frame => &Position::FIELDS,
            Self::Axis => &AxisValues::FIELDS,
            _ => &[],
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A tagged runtime value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Text(String),
    Position(Position),
    Frame(Position),
    Axis(AxisValues),
}

/// Why a value could not be converted to the requested shape.
#[derive(Clone, Debug, PartialEq, Error)]
#[error("cannot convert {from} value to {to}")]
pub struct ConversionError {
    pub from: &'static str,
    pub to: DataType,
}

impl Value {
    /// The static type whose zero value shares this value's tag.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Integer(_) => DataType::Int,
            Self::Real(_) => DataType::Real,
            Self::Boolean(_) => DataType::Bool,
            Self::Text(_) => DataType::Char,
            Self::Position(_) => DataType::Pos,
            Self::Frame(_) => DataType::Frame,
            Self::Axis(_) => DataType::Axis,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Boolean(_) => "boolean",
            Self::Text(_) => "text",
            Self::Position(_) => "position",
            Self::Frame(_) => "frame",
            Self::Axis(_) => "axis",
        }
    }

    /// Numeric view used by arithmetic, comparisons and conditions.
    ///
    /// Integers, reals and booleans convert; text and spatial values do not.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Real(r) => Some(*r),
            Self::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Extracts a Cartesian pose, treating a frame as a position.
    pub fn as_pose(&self) -> Option<Position> {
        match self {
            Self::Position(p) | Self::Frame(p) => Some(*p),
            _ => None,
        }
    }

    /// Converts this value into the shape of `target`.
    ///
    /// Integer truncates, Bool tests non-zero, Real passes through and Char
    /// stringifies. Spatial targets only accept spatial values of matching
    /// shape (position and frame are interchangeable).
    pub fn coerce_to(&self, target: DataType) -> Result<Value, ConversionError> {
        let err = || ConversionError {
            from: self.type_name(),
            to: target,
        };
        match target {
            DataType::Int => match self {
                // Integers pass through untouched; f64 cannot hold every i64.
                Self::Integer(i) => Ok(Value::Integer(*i)),
                _ => self
                    .as_number()
                    .map(|n| Value::Integer(n.trunc() as i64))
                    .ok_or_else(err),
            },
            DataType::Real => self.as_number().map(Value::Real).ok_or_else(err),
            DataType::Bool => self
                .as_number()
                .map(|n| Value::Boolean(n != 0.0))
                .ok_or_else(err),
            DataType::Char => match self {
                Self::Text(s) => Ok(Value::Text(s.clone())),
                Self::Integer(_) | Self::Real(_) | Self::Boolean(_) => {
                    Ok(Value::Text(self.to_string()))
                }
                _ => Err(err()),
            },
            DataType::Pos => self.as_pose().map(Value::Position).ok_or_else(err),
            DataType::Frame => self.as_pose().map(Value::Frame).ok_or_else(err),
            DataType::Axis => match self {
                Self::Axis(a) => Ok(Value::Axis(*a)),
                _ => Err(err()),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Boolean(true) => f.write_str("TRUE"),
            Self::Boolean(false) => f.write_str("FALSE"),
            Self::Text(s) => f.write_str(s),
            Self::Position(p) | Self::Frame(p) => write!(f, "{p}"),
            Self::Axis(a) => write!(f, "{a}"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}
