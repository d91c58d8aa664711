//! Translation tables and dot-path lookup.
//!
//! A table is the JSON document served per language (`lang/sr.json`), nested
//! objects addressed by dot paths: `contact.phoneInvalid`,
//! `pricing.plans.deepCleaning.modalTitle`. A missing key is `None`; callers
//! pick the fallback (the key itself, or a literal) explicitly.

use serde_json::Value;
use std::rc::Rc;

/// Immutable, cheaply cloneable translation table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Translations {
    table: Rc<Value>,
}

impl Translations {
    pub fn new(table: Value) -> Self {
        Self {
            table: Rc::new(table),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self.table.as_ref() {
            Value::Object(map) => map.is_empty(),
            Value::Null => true,
            _ => false,
        }
    }

    /// Raw value at `path`, if every segment resolves.
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(self.table.as_ref(), |node, segment| node.get(segment))
    }

    /// String value at `path`. Non-string leaves count as missing.
    pub fn text(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// String at `path`, or the key itself when missing.
    pub fn translate(&self, path: &str) -> String {
        self.translate_or(path, path)
    }

    pub fn translate_or(&self, path: &str, fallback: &str) -> String {
        self.text(path).unwrap_or(fallback).to_string()
    }

    pub fn raw(&self) -> &Value {
        &self.table
    }
}
