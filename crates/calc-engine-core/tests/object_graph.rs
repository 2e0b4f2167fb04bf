//! Object graph tests for the host capability interface

use calc_engine_core::{ContainerKind, DataObject, Dictionary, Record, Value, ValueKind};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;

fn child(name: &str, age: i32) -> Record {
    Record::new("Person").with("Name", name).with("Age", age)
}

#[test]
fn test_nested_records() {
    let parent = Record::new("Person")
        .with("Name", "Root")
        .with("Children", vec![child("A", 1), child("B", 2)]);

    let children = parent.get_member("children").unwrap();
    let items = children.as_array().unwrap();
    assert_eq!(items.len(), 2);

    let second = items[1].as_object().unwrap();
    assert_eq!(second.type_name(), "Person");
    assert_eq!(second.get_member("Age"), Some(Value::Number(2.0)));
}

#[test]
fn test_dictionary_of_records() {
    let dict = Dictionary::new()
        .with_type_name("PersonByName")
        .with("A", child("A", 1))
        .with_element_placeholder(child("", 0));

    assert_eq!(dict.container_kind(), ContainerKind::Associative);
    assert!(dict.is_associative());
    assert!(!dict.is_sequence());
    assert_eq!(dict.key_kind(), Some(ValueKind::String));
    assert!(dict.get_indexed(&[Value::from("Z")]).is_none());

    let placeholder = dict.element_placeholder().unwrap();
    let placeholder = placeholder.as_object().unwrap();
    assert_eq!(placeholder.get_member("Age"), Some(Value::Number(0.0)));
    assert_eq!(dict.describe(), "PersonByName (1 entries)");
}

#[test]
fn test_date_members_convert() {
    let born = NaiveDate::from_ymd_opt(2001, 2, 3).unwrap();
    let person = Record::new("Person").with("Born", born);
    let value = person.get_member("born").unwrap();
    assert_eq!(value.to_string(), "2001-02-03 00:00:00");
    assert_eq!(
        value.convert::<chrono::NaiveDateTime>().unwrap().date(),
        born
    );
}

#[test]
fn test_object_values_compare_by_identity() {
    let a = Record::new("Person").into_value();
    let b = Record::new("Person").into_value();
    assert_eq!(a, a.clone());
    assert!(a != b);
}
