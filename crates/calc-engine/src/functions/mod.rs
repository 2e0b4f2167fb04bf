//! Function registry and built-in functions

pub mod array;
pub mod logical;
pub mod math;
pub mod statistical;
pub mod text;

use crate::ast::Expr;
use crate::engine::Engine;
use crate::error::{CalcError, CalcResult};
use crate::evaluator::{evaluate, to_bool, to_number, EvalContext};
use ahash::AHashMap;
use calc_engine_core::Value;
use std::fmt;
use std::sync::Arc;

/// Signature of a function that only sees its arguments
pub type PlainFn = dyn Fn(&Args<'_>) -> CalcResult<Value> + Send + Sync;

/// Signature of a function that also sees the owning engine
pub type ContextFn = dyn Fn(&Engine, &Args<'_>) -> CalcResult<Value> + Send + Sync;

/// Function implementation
#[derive(Clone)]
pub enum FunctionImpl {
    /// Receives only its (unevaluated) arguments
    Plain(Arc<PlainFn>),
    /// Receives the engine as well, e.g. to read the data context
    Contextual(Arc<ContextFn>),
}

impl FunctionImpl {
    pub fn plain<F>(f: F) -> Self
    where
        F: Fn(&Args<'_>) -> CalcResult<Value> + Send + Sync + 'static,
    {
        FunctionImpl::Plain(Arc::new(f))
    }

    pub fn contextual<F>(f: F) -> Self
    where
        F: Fn(&Engine, &Args<'_>) -> CalcResult<Value> + Send + Sync + 'static,
    {
        FunctionImpl::Contextual(Arc::new(f))
    }
}

/// Function definition
pub struct FunctionDef {
    /// Function name as registered
    pub name: String,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
    /// Never constant-folded
    pub volatile: bool,
}

impl FunctionDef {
    /// Check an argument count against the arity range
    pub fn check_arity(&self, count: usize) -> CalcResult<()> {
        let too_few = count < self.min_args;
        let too_many = self.max_args.map_or(false, |max| count > max);
        if !too_few && !too_many {
            return Ok(());
        }
        let expected = match self.max_args {
            Some(max) if max == self.min_args => format!("{}", max),
            Some(max) => format!("{} to {}", self.min_args, max),
            None => format!("at least {}", self.min_args),
        };
        Err(CalcError::ArgumentCount {
            function: self.name.clone(),
            expected,
            actual: count,
        })
    }

    /// Invoke the implementation with unevaluated arguments
    pub fn call(&self, args: &[Expr], ctx: &EvalContext<'_>) -> CalcResult<Value> {
        let args = Args::new(args, ctx);
        match &self.implementation {
            FunctionImpl::Plain(f) => f(&args),
            FunctionImpl::Contextual(f) => f(ctx.engine(), &args),
        }
    }
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("volatile", &self.volatile)
            .finish()
    }
}

/// Arguments handed to a function implementation
///
/// Arguments arrive unevaluated; the function decides what to evaluate and
/// when, which is what lets `IF` and `ValueOr` skip or recover from branches.
pub struct Args<'a> {
    exprs: &'a [Expr],
    ctx: &'a EvalContext<'a>,
}

impl<'a> Args<'a> {
    pub fn new(exprs: &'a [Expr], ctx: &'a EvalContext<'a>) -> Self {
        Self { exprs, ctx }
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    /// Unevaluated argument expressions
    pub fn exprs(&self) -> &'a [Expr] {
        self.exprs
    }

    pub fn expr(&self, index: usize) -> Option<&'a Expr> {
        self.exprs.get(index)
    }

    /// Evaluation context of the call
    pub fn context(&self) -> &'a EvalContext<'a> {
        self.ctx
    }

    /// Evaluate an argument
    pub fn eval(&self, index: usize) -> CalcResult<Value> {
        let expr = self
            .exprs
            .get(index)
            .ok_or_else(|| CalcError::Argument(format!("Missing argument {}", index + 1)))?;
        evaluate(expr, self.ctx)
    }

    /// Evaluate an optional argument
    pub fn eval_opt(&self, index: usize) -> CalcResult<Option<Value>> {
        self.exprs
            .get(index)
            .map(|expr| evaluate(expr, self.ctx))
            .transpose()
    }

    /// Evaluate an argument as a number
    pub fn number(&self, index: usize) -> CalcResult<f64> {
        to_number(&self.eval(index)?)
    }

    /// Evaluate an optional numeric argument
    pub fn number_or(&self, index: usize, default: f64) -> CalcResult<f64> {
        match self.eval_opt(index)? {
            Some(value) => to_number(&value),
            None => Ok(default),
        }
    }

    /// Evaluate an argument as text
    pub fn text(&self, index: usize) -> CalcResult<String> {
        Ok(self.eval(index)?.as_string())
    }

    /// Evaluate an argument as a boolean
    pub fn boolean(&self, index: usize) -> CalcResult<bool> {
        to_bool(&self.eval(index)?)
    }

    /// Evaluate every argument in order
    pub fn eval_all(&self) -> CalcResult<Vec<Value>> {
        self.exprs.iter().map(|e| evaluate(e, self.ctx)).collect()
    }

    /// Evaluate every argument, expanding arrays into their items
    pub fn flatten(&self) -> CalcResult<Vec<Value>> {
        let mut values = Vec::with_capacity(self.exprs.len());
        for expr in self.exprs {
            match evaluate(expr, self.ctx)? {
                Value::Array(items) => values.extend(items),
                value => values.push(value),
            }
        }
        Ok(values)
    }

    pub fn check_cancelled(&self) -> CalcResult<()> {
        self.ctx.check_cancelled()
    }
}

/// Function registry
///
/// Lookup is case-insensitive; registering a name again replaces the previous
/// definition.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: AHashMap<String, Arc<FunctionDef>>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register_logical_functions();
        registry.register_math_functions();
        registry.register_text_functions();
        registry.register_statistical_functions();
        registry.register_array_functions();

        registry
    }

    /// Create a registry without any functions
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&Arc<FunctionDef>> {
        self.functions.get(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Register a function
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_lowercase(), Arc::new(def));
    }

    /// Remove a function, returning its definition
    pub fn remove(&mut self, name: &str) -> Option<Arc<FunctionDef>> {
        self.functions.remove(&name.to_lowercase())
    }

    /// Registered names, in no particular order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.values().map(|def| def.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    fn add(&mut self, name: &str, min_args: usize, max_args: Option<usize>, f: fn(&Args<'_>) -> CalcResult<Value>) {
        self.register(FunctionDef {
            name: name.to_string(),
            min_args,
            max_args,
            implementation: FunctionImpl::plain(f),
            volatile: false,
        });
    }

    fn register_logical_functions(&mut self) {
        self.add("AND", 1, None, logical::fn_and);
        self.add("OR", 1, None, logical::fn_or);
        self.add("NOT", 1, Some(1), logical::fn_not);
        self.add("IF", 2, Some(3), logical::fn_if);
        self.add("TRUE", 0, Some(0), logical::fn_true);
        self.add("FALSE", 0, Some(0), logical::fn_false);
        self.add("ValueOr", 1, Some(2), logical::fn_value_or);
    }

    fn register_math_functions(&mut self) {
        self.add("ABS", 1, Some(1), math::fn_abs);
        self.add("CEILING", 1, Some(2), math::fn_ceiling);
        self.add("FLOOR", 1, Some(2), math::fn_floor);
        self.add("INT", 1, Some(1), math::fn_int);
        self.add("ROUND", 1, Some(2), math::fn_round);
        self.add("TRUNC", 1, Some(2), math::fn_trunc);
        self.add("SIGN", 1, Some(1), math::fn_sign);
        self.add("SQRT", 1, Some(1), math::fn_sqrt);
        self.add("POWER", 2, Some(2), math::fn_power);
        self.add("EXP", 1, Some(1), math::fn_exp);
        self.add("LN", 1, Some(1), math::fn_ln);
        self.add("LOG", 1, Some(2), math::fn_log);
        self.add("LOG10", 1, Some(1), math::fn_log10);
        self.add("PI", 0, Some(0), math::fn_pi);
        self.add("SIN", 1, Some(1), math::fn_sin);
        self.add("COS", 1, Some(1), math::fn_cos);
        self.add("TAN", 1, Some(1), math::fn_tan);
        self.add("ASIN", 1, Some(1), math::fn_asin);
        self.add("ACOS", 1, Some(1), math::fn_acos);
        self.add("ATAN", 1, Some(1), math::fn_atan);
        self.add("ATAN2", 2, Some(2), math::fn_atan2);
        self.add("SUM", 1, None, math::fn_sum);
        self.add("MAX", 1, None, math::fn_max);
        self.add("MIN", 1, None, math::fn_min);
    }

    fn register_text_functions(&mut self) {
        self.add("LEN", 1, Some(1), text::fn_len);
        self.add("LEFT", 1, Some(2), text::fn_left);
        self.add("RIGHT", 1, Some(2), text::fn_right);
        self.add("MID", 3, Some(3), text::fn_mid);
        self.add("UPPER", 1, Some(1), text::fn_upper);
        self.add("LOWER", 1, Some(1), text::fn_lower);
        self.add("TRIM", 1, Some(1), text::fn_trim);
        self.add("CONCATENATE", 1, None, text::fn_concatenate);
        self.add("FIND", 2, Some(3), text::fn_find);
        self.add("SEARCH", 2, Some(3), text::fn_search);
        self.add("SUBSTITUTE", 3, Some(4), text::fn_substitute);
        self.add("REPT", 2, Some(2), text::fn_rept);
        self.add("CHAR", 1, Some(1), text::fn_char);
        self.add("VALUE", 1, Some(1), text::fn_value);
        self.add("PadLeft", 2, Some(3), text::fn_pad_left);
        self.add("PadRight", 2, Some(3), text::fn_pad_right);
    }

    fn register_statistical_functions(&mut self) {
        self.add("AVERAGE", 1, None, statistical::fn_average);
        self.add("AVERAGEA", 1, None, statistical::fn_averagea);
        self.add("COUNT", 1, None, statistical::fn_count);
        self.add("COUNTA", 1, None, statistical::fn_counta);
    }

    fn register_array_functions(&mut self) {
        self.add("Array", 0, None, array::fn_array);
        self.add("Range", 2, Some(3), array::fn_range);
        self.add("Map", 0, None, array::fn_map);
        self.add("XLOOKUP", 3, Some(4), array::fn_xlookup);
        for name in ["LessThan", "lt"] {
            self.add(name, 2, Some(2), array::fn_less_than);
        }
        for name in ["LessOrEqual", "le"] {
            self.add(name, 2, Some(2), array::fn_less_or_equal);
        }
        for name in ["GreaterThan", "gt"] {
            self.add(name, 2, Some(2), array::fn_greater_than);
        }
        for name in ["GreaterOrEqual", "ge"] {
            self.add(name, 2, Some(2), array::fn_greater_or_equal);
        }

        // Contains reads the engine's function options
        self.register(FunctionDef {
            name: "Contains".to_string(),
            min_args: 2,
            max_args: Some(2),
            implementation: FunctionImpl::contextual(array::fn_contains),
            volatile: false,
        });
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("len", &self.functions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_case_insensitive_lookup() {
        let registry = FunctionRegistry::new();
        assert!(registry.contains("sum"));
        assert!(registry.contains("Sum"));
        assert!(registry.contains("VALUEOR"));
        assert_eq!(registry.get("lt").map(|d| d.max_args), Some(Some(2)));
        assert!(!registry.contains("nope"));
    }

    #[test]
    fn test_register_overwrites() {
        let mut registry = FunctionRegistry::empty();
        registry.register(FunctionDef {
            name: "Twice".into(),
            min_args: 1,
            max_args: Some(1),
            implementation: FunctionImpl::plain(|args| Ok(Value::Number(args.number(0)? * 2.0))),
            volatile: false,
        });
        registry.register(FunctionDef {
            name: "TWICE".into(),
            min_args: 0,
            max_args: None,
            implementation: FunctionImpl::plain(|_| Ok(Value::Empty)),
            volatile: true,
        });
        assert_eq!(registry.len(), 1);
        let def = registry.get("twice").unwrap();
        assert_eq!(def.name, "TWICE");
        assert!(def.volatile);
    }

    #[test]
    fn test_check_arity() {
        let registry = FunctionRegistry::new();
        let iff = registry.get("IF").unwrap();
        assert!(iff.check_arity(3).is_ok());
        assert_eq!(
            iff.check_arity(1),
            Err(CalcError::ArgumentCount {
                function: "IF".into(),
                expected: "2 to 3".into(),
                actual: 1,
            })
        );
        let sum = registry.get("SUM").unwrap();
        assert!(sum.check_arity(40).is_ok());
        assert_eq!(
            sum.check_arity(0).unwrap_err().to_string(),
            "Wrong number of arguments for SUM: expected at least 1, got 0"
        );
    }
}
