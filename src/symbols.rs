//! Flat symbol table used during instruction generation.
//!
//! There is a single scope: a declaration anywhere in the program, including
//! inside an `IF` branch, stays visible for the rest of the program.

use crate::value::{DataType, Value};
use std::collections::HashMap;

/// A declared variable. `value` always carries the tag of `data_type`.
#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
    pub data_type: DataType,
    pub value: Value,
}

#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `name`, replacing any earlier declaration.
    ///
    /// Values whose tag does not match `data_type` are replaced by the
    /// type's zero value.
    pub fn declare(&mut self, name: impl Into<String>, data_type: DataType, value: Value) {
        let value = if value.data_type() == data_type {
            value
        } else {
            data_type.zero_value()
        };
        self.symbols
            .insert(name.into(), Symbol { data_type, value });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.symbols.get(name).map(|s| &s.value)
    }

    pub fn data_type(&self, name: &str) -> Option<DataType> {
        self.symbols.get(name).map(|s| s.data_type)
    }

    /// Stores `value` into an existing symbol. Returns `false` if `name` is
    /// undeclared or the tag does not match the declared type.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        match self.symbols.get_mut(name) {
            Some(symbol) if symbol.data_type == value.data_type() => {
                symbol.value = value;
                true
            }
            _ => false,
        }
    }

    /// Mutable access for in-place field updates of structured values.
    pub(crate) fn value_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.symbols.get_mut(name).map(|s| &mut s.value)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn clear(&mut self) {
        self.symbols.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Symbol)> {
        self.symbols.iter().map(|(k, v)| (k.as_str(), v))
    }
}
