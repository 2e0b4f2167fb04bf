//! A ready-made host object with named members

use crate::object::{DataObject, MemberId};
use crate::value::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Member {
    name: String,
    id: MemberId,
    value: Value,
    placeholder: Option<Value>,
}

/// An object with a type name and a set of named members
///
/// Member names are matched case-insensitively. Each member may carry a
/// placeholder: the zero-value instance used by validation mode when the
/// member itself is absent.
///
/// ```rust
/// use calc_engine_core::{DataObject, Record, Value};
///
/// let person = Record::new("Person")
///     .with("Name", "Ann")
///     .with("Age", 42);
/// assert_eq!(person.get_member("name"), Some(Value::from("Ann")));
/// ```
#[derive(Debug, Clone)]
pub struct Record {
    type_name: String,
    members: Vec<Member>,
}

impl Record {
    /// Create an empty record of the given type
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            members: Vec::new(),
        }
    }

    /// Add or replace a member (builder style)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Add or replace a member together with its validation placeholder
    pub fn with_placeholder(
        mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
        placeholder: impl Into<Value>,
    ) -> Self {
        let name = name.into();
        self.set(name.as_str(), value);
        if let Some(member) = self.member_mut(&name) {
            member.placeholder = Some(placeholder.into());
        }
        self
    }

    /// Add or replace a member
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.member_mut(&name) {
            Some(member) => member.value = value,
            None => self.members.push(Member {
                id: MemberId::of(&name),
                name,
                value,
                placeholder: None,
            }),
        }
    }

    /// Read a member by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        let id = MemberId::of(name);
        self.members.iter().find(|m| m.id == id).map(|m| &m.value)
    }

    /// Member names in insertion order
    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.name.as_str())
    }

    /// Wrap into a [`Value::Object`]
    pub fn into_value(self) -> Value {
        Value::Object(Arc::new(self))
    }

    fn member_mut(&mut self, name: &str) -> Option<&mut Member> {
        let id = MemberId::of(name);
        self.members.iter_mut().find(|m| m.id == id)
    }

    fn member(&self, id: MemberId) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }
}

impl DataObject for Record {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn find_member(&self, name: &str) -> Option<MemberId> {
        let id = MemberId::of(name);
        self.member(id).map(|m| m.id)
    }

    fn member_value(&self, id: MemberId) -> Option<Value> {
        self.member(id).map(|m| m.value.clone())
    }

    fn member_placeholder(&self, id: MemberId) -> Option<Value> {
        self.member(id).and_then(|m| m.placeholder.clone())
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_members_case_insensitive() {
        let record = Record::new("Person").with("Name", "Ann").with("Age", 3);
        assert_eq!(record.get_member("NAME"), Some(Value::from("Ann")));
        assert_eq!(record.get("age"), Some(&Value::Number(3.0)));
        assert_eq!(record.get_member("Missing"), None);
    }

    #[test]
    fn test_set_replaces() {
        let mut record = Record::new("Person").with("Name", "Ann");
        record.set("name", "Bob");
        assert_eq!(record.member_names().collect::<Vec<_>>(), vec!["Name"]);
        assert_eq!(record.get("Name"), Some(&Value::from("Bob")));
    }

    #[test]
    fn test_placeholder() {
        let record = Record::new("Person").with_placeholder(
            "Parent",
            Value::Empty,
            Record::new("Person").with("Name", ""),
        );
        let id = record.find_member("parent").unwrap();
        assert_eq!(record.member_value(id), Some(Value::Empty));
        assert!(matches!(record.member_placeholder(id), Some(Value::Object(_))));
    }

    #[test]
    fn test_ids_shared_across_records() {
        let a = Record::new("Person").with("Name", "Ann");
        let b = Record::new("Person").with("Age", 1).with("Name", "Bob");
        let id = a.find_member("Name").unwrap();
        assert_eq!(b.member_value(id), Some(Value::from("Bob")));
    }
}
