//! Field-tolerant mapping of raw API items onto a fixed record schema.
//!
//! The source renames and aliases JSON keys between releases, so every
//! output field lists candidate keys in priority order. The first candidate
//! holding a non-null value that is non-empty after trimming wins.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// Value used when none of a field's candidate keys is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// A fixed string (usually empty).
    Text(&'static str),
    /// The symbol the caller asked for.
    Symbol,
}

/// One output field and the source keys that may carry it.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub candidates: &'static [&'static str],
    pub fallback: Fallback,
}

impl FieldRule {
    pub const fn new(name: &'static str, candidates: &'static [&'static str]) -> Self {
        Self {
            name,
            candidates,
            fallback: Fallback::Text(""),
        }
    }

    pub const fn or_symbol(self) -> Self {
        Self {
            name: self.name,
            candidates: self.candidates,
            fallback: Fallback::Symbol,
        }
    }
}

/// Ordered field rules for one category.
#[derive(Debug, Clone, Copy)]
pub struct FieldMapping {
    pub fields: &'static [FieldRule],
}

impl FieldMapping {
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }
}

/// One output row: field name to source-formatted text, in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedRecord {
    fields: Vec<(&'static str, String)>,
}

impl NormalizedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing an existing value of the same name.
    pub fn set(&mut self, name: &'static str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

impl Serialize for NormalizedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Map one raw item onto the mapping's schema. Never fails: a non-object
/// item simply yields every field's fallback.
pub fn normalize(item: &Value, mapping: &FieldMapping, symbol: &str) -> NormalizedRecord {
    let mut record = NormalizedRecord::new();
    for rule in mapping.fields {
        let picked = rule
            .candidates
            .iter()
            .find_map(|key| item.get(*key).and_then(coerce_text));
        let value = picked.unwrap_or_else(|| match rule.fallback {
            Fallback::Text(text) => text.to_string(),
            Fallback::Symbol => symbol.to_string(),
        });
        record.set(rule.name, value);
    }
    record
}

/// Render a JSON value as trimmed text; `None` for null or blank values.
fn coerce_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
