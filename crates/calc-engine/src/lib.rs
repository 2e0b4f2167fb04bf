//! # calc-engine
//!
//! Expression parser and evaluator with data binding.
//!
//! This crate provides:
//! - Expression parsing (text → AST) with constant folding
//! - Evaluation against variables and a host object graph (binding paths)
//! - A built-in function library (logical, math, text, statistical, array)
//! - Strict, lenient and validation evaluation modes
//! - Annotated evaluation traces for auditing
//!
//! ## Example
//!
//! ```rust
//! use calc_engine::{Dictionary, Engine, Record, Value};
//!
//! let child = Record::new("Person").with("Name", "Kim").with("Age", 2);
//! let person = Record::new("Person")
//!     .with("Name", "Lee")
//!     .with("Children", Dictionary::new().with("Kim", child));
//!
//! let mut engine = Engine::new();
//! engine.set_data_context(person);
//!
//! let age = engine.evaluate("15 * Children('Kim').Age + 14").unwrap();
//! assert_eq!(age, Value::Number(44.0));
//! assert_eq!(
//!     engine.parsed_expression().unwrap(),
//!     "((15 * Children('Kim').Age/*{2}*/) + 14)/*{44}*/"
//! );
//! ```

pub mod ast;
mod binding;
pub mod cache;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod options;
pub mod parser;
pub mod tokenizer;
pub mod trace;

pub use ast::{BinaryOperator, BindingPath, BindingStep, Expr, NodeId, UnaryOperator};
pub use cache::ExpressionCache;
pub use engine::{CancellationToken, Engine, EvaluateOptions};
pub use error::{BindingError, BindingErrorKind, CalcError, CalcResult};
pub use evaluator::EvalContext;
pub use functions::{Args, FunctionDef, FunctionImpl, FunctionRegistry};
pub use options::{CalculationOptions, Culture, FunctionOptions};
pub use trace::Trace;

pub use calc_engine_core::{
    ContainerKind, DataObject, Dictionary, FromValue, MemberId, Record, Value, ValueKind,
};
