//! Logical functions

use super::Args;
use crate::error::{CalcError, CalcResult};
use calc_engine_core::Value;

/// AND function (stops at the first false argument)
pub fn fn_and(args: &Args<'_>) -> CalcResult<Value> {
    for i in 0..args.len() {
        if !args.boolean(i)? {
            return Ok(Value::Boolean(false));
        }
    }
    Ok(Value::Boolean(true))
}

/// OR function (stops at the first true argument)
pub fn fn_or(args: &Args<'_>) -> CalcResult<Value> {
    for i in 0..args.len() {
        if args.boolean(i)? {
            return Ok(Value::Boolean(true));
        }
    }
    Ok(Value::Boolean(false))
}

/// NOT function
pub fn fn_not(args: &Args<'_>) -> CalcResult<Value> {
    Ok(Value::Boolean(!args.boolean(0)?))
}

/// IF function; only the taken branch is evaluated
pub fn fn_if(args: &Args<'_>) -> CalcResult<Value> {
    if args.boolean(0)? {
        args.eval(1)
    } else {
        Ok(args.eval_opt(2)?.unwrap_or(Value::Boolean(false)))
    }
}

pub fn fn_true(_args: &Args<'_>) -> CalcResult<Value> {
    Ok(Value::Boolean(true))
}

pub fn fn_false(_args: &Args<'_>) -> CalcResult<Value> {
    Ok(Value::Boolean(false))
}

/// ValueOr(expr[, default])
///
/// Returns `expr` unless it is empty or its binding path cannot be resolved,
/// in which case the default (or empty) is returned.
pub fn fn_value_or(args: &Args<'_>) -> CalcResult<Value> {
    let value = match args.eval(0) {
        Ok(value) => value,
        Err(CalcError::Binding(e)) => {
            log::debug!("ValueOr falling back after binding failure: {}", e);
            Value::Empty
        }
        Err(e) => return Err(e),
    };

    if !value.is_empty() {
        return Ok(value);
    }
    Ok(args.eval_opt(1)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use crate::Engine;
    use calc_engine_core::Value;
    use pretty_assertions::assert_eq;

    fn eval(formula: &str) -> Value {
        Engine::new().evaluate(formula).unwrap()
    }

    #[test]
    fn test_and_or_not() {
        assert_eq!(eval("AND(true, true)"), Value::Boolean(true));
        assert_eq!(eval("AND(true, false)"), Value::Boolean(false));
        assert_eq!(eval("OR(false, true)"), Value::Boolean(true));
        assert_eq!(eval("OR(false, false)"), Value::Boolean(false));
        assert_eq!(eval("NOT(false)"), Value::Boolean(true));
        assert_eq!(eval("AND(1, 0)"), Value::Boolean(false));
    }

    #[test]
    fn test_if() {
        assert_eq!(eval("IF(5 > 4, true, false)"), Value::Boolean(true));
        assert_eq!(eval("IF(5 > 14, true, false)"), Value::Boolean(false));
        assert_eq!(eval("IF(1 > 2, 1)"), Value::Boolean(false));
        // the branch not taken is never evaluated
        assert_eq!(eval("IF(true, 1, 1/0)"), Value::Number(1.0));
    }

    #[test]
    fn test_true_false() {
        assert_eq!(eval("TRUE()"), Value::Boolean(true));
        assert_eq!(eval("FALSE()"), Value::Boolean(false));
        assert_eq!(eval("true"), Value::Boolean(true));
    }

    #[test]
    fn test_value_or() {
        let mut engine = Engine::new();
        engine.set_variable("nothing", Value::Empty);
        assert_eq!(engine.evaluate("ValueOr(nothing, 5)").unwrap(), Value::Number(5.0));
        assert_eq!(engine.evaluate("ValueOr(3, 5)").unwrap(), Value::Number(3.0));
        assert_eq!(engine.evaluate("ValueOr(nothing)").unwrap(), Value::Empty);
        assert!(engine.evaluate("ValueOr(1/0, 5)").is_err());
    }
}
