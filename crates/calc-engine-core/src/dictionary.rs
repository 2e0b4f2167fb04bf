//! Associative host container keyed by [`Value`]

use crate::object::{ContainerKind, DataObject, MemberId};
use crate::value::{Value, ValueKind};
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;

/// Key/value container that binding paths index with `name(key)`
///
/// Numeric keys match numerically (so `1` finds a `Decimal` key of `1`), text
/// keys match exactly. Entries live in insertion order and lookup is a linear
/// scan, O(n) in the entry count, since `Value` keys are not `Hash`.
#[derive(Debug, Clone)]
pub struct Dictionary {
    type_name: String,
    entries: Vec<(Value, Value)>,
    key_kind: Option<ValueKind>,
    element_placeholder: Option<Value>,
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl Dictionary {
    pub fn new() -> Self {
        Self {
            type_name: "Dictionary".to_string(),
            entries: Vec::new(),
            key_kind: None,
            element_placeholder: None,
        }
    }

    /// Override the type name reported to the binding resolver
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    /// Declare the key kind indexer arguments are coerced to
    pub fn with_key_kind(mut self, kind: ValueKind) -> Self {
        self.key_kind = Some(kind);
        self
    }

    /// Zero-value element substituted for missing keys in lenient modes
    pub fn with_element_placeholder(mut self, placeholder: impl Into<Value>) -> Self {
        self.element_placeholder = Some(placeholder.into());
        self
    }

    /// Insert an entry (builder style)
    pub fn with(mut self, key: impl Into<Value>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace an entry
    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| keys_equal(k, &key)) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| keys_equal(k, key))
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Wrap into a [`Value::Object`]
    pub fn into_value(self) -> Value {
        Value::Object(Arc::new(self))
    }
}

fn keys_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(a), Value::String(b)) => a == b,
        (a, b) if a.is_numeric() && b.is_numeric() => {
            let a = match a {
                Value::Decimal(d) => d.to_f64(),
                other => other.as_number(),
            };
            let b = match b {
                Value::Decimal(d) => d.to_f64(),
                other => other.as_number(),
            };
            a.is_some() && a == b
        }
        (a, b) => a == b,
    }
}

impl DataObject for Dictionary {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn container_kind(&self) -> ContainerKind {
        ContainerKind::Associative
    }

    fn find_member(&self, name: &str) -> Option<MemberId> {
        let id = MemberId::of(name);
        [MemberId::of("Count"), MemberId::of("Keys"), MemberId::of("Values")]
            .contains(&id)
            .then_some(id)
    }

    fn member_value(&self, id: MemberId) -> Option<Value> {
        if id == MemberId::of("Count") {
            Some(Value::from(self.entries.len()))
        } else if id == MemberId::of("Keys") {
            Some(Value::Array(self.keys().cloned().collect()))
        } else if id == MemberId::of("Values") {
            Some(Value::Array(self.values().cloned().collect()))
        } else {
            None
        }
    }

    fn get_indexed(&self, keys: &[Value]) -> Option<Value> {
        match keys {
            [key] => self.get(key).cloned(),
            _ => None,
        }
    }

    fn key_kind(&self) -> Option<ValueKind> {
        self.key_kind
            .or_else(|| self.entries.first().map(|(k, _)| k.kind()))
    }

    fn element_placeholder(&self) -> Option<Value> {
        self.element_placeholder.clone()
    }

    fn describe(&self) -> String {
        format!("{} ({} entries)", self.type_name, self.entries.len())
    }
}

impl From<Dictionary> for Value {
    fn from(dictionary: Dictionary) -> Self {
        dictionary.into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    #[test]
    fn test_get_and_replace() {
        let mut dict = Dictionary::new().with("a", 1).with("b", 2);
        dict.insert("a", 10);
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get(&Value::from("a")), Some(&Value::Number(10.0)));
        assert_eq!(dict.get(&Value::from("A")), None);
    }

    #[test]
    fn test_numeric_keys_match_across_kinds() {
        let dict = Dictionary::new().with(Decimal::ONE, "one");
        assert_eq!(dict.get_indexed(&[Value::Number(1.0)]), Some(Value::from("one")));
        assert!(dict.contains_key(&[Value::Number(1.0)]));
        assert!(!dict.contains_key(&[Value::Number(2.0)]));
    }

    #[test]
    fn test_intrinsic_members() {
        let dict = Dictionary::new().with("a", 1).with("b", 2);
        assert_eq!(dict.get_member("count"), Some(Value::Number(2.0)));
        assert_eq!(
            dict.get_member("Keys"),
            Some(Value::array(vec!["a", "b"]))
        );
        assert_eq!(dict.get_member("Other"), None);
    }

    #[test]
    fn test_key_kind_inferred() {
        let dict = Dictionary::new().with("a", 1);
        assert_eq!(dict.key_kind(), Some(ValueKind::String));
        let dict = Dictionary::new().with_key_kind(ValueKind::Number);
        assert_eq!(dict.key_kind(), Some(ValueKind::Number));
    }
}
