//! # calc-engine-core
//!
//! Runtime values and host object capabilities for the calc-engine expression
//! language.
//!
//! This crate provides:
//! - [`Value`] - The tagged runtime value (number, decimal, text, boolean, date, array, object, empty)
//! - [`DataObject`] - The capability interface host objects implement so binding paths can walk them
//! - [`Record`] and [`Dictionary`] - Ready-made host objects
//!
//! ## Example
//!
//! ```rust
//! use calc_engine_core::{DataObject, Dictionary, Record, Value};
//!
//! let ages = Dictionary::new().with("Ann", 7).with("Bob", 9);
//! let person = Record::new("Person")
//!     .with("Name", "Carl")
//!     .with("ChildrenAge", ages);
//!
//! assert_eq!(person.get_member("name"), Some(Value::from("Carl")));
//! ```

pub mod dictionary;
pub mod error;
pub mod object;
pub mod record;
pub mod value;

pub use dictionary::Dictionary;
pub use error::{Error, Result};
pub use object::{ContainerKind, DataObject, MemberId};
pub use record::Record;
pub use value::{FromValue, Value, ValueKind};
