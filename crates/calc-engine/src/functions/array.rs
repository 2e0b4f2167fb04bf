//! Array functions

use super::Args;
use crate::engine::Engine;
use crate::error::{CalcError, CalcResult};
use crate::evaluator::values_equal;
use calc_engine_core::Value;
use std::cmp::Ordering;

/// Largest array `Range` will produce
const MAX_RANGE_LEN: usize = 1_000_000;

/// Array(items...)
pub fn fn_array(args: &Args<'_>) -> CalcResult<Value> {
    Ok(Value::Array(args.eval_all()?))
}

/// Range(min, max[, step])
pub fn fn_range(args: &Args<'_>) -> CalcResult<Value> {
    let min = args.number(0)?;
    let max = args.number(1)?;
    let step = args.number_or(2, 1.0)?;
    if step == 0.0 {
        return Err(CalcError::Argument("Range step cannot be zero".into()));
    }

    let count = ((max - min) / step).trunc() + 1.0;
    if count < 1.0 {
        return Ok(Value::Array(Vec::new()));
    }
    if count > MAX_RANGE_LEN as f64 {
        return Err(CalcError::Argument(format!(
            "Range would produce more than {} elements",
            MAX_RANGE_LEN
        )));
    }

    let count = count as usize;
    let mut items = Vec::with_capacity(count);
    for i in 0..count {
        args.check_cancelled()?;
        items.push(Value::Number(min + step * i as f64));
    }
    Ok(Value::Array(items))
}

/// Map(arrays...): distinct union of the items, in first-seen order
pub fn fn_map(args: &Args<'_>) -> CalcResult<Value> {
    let mut items: Vec<Value> = Vec::new();
    for value in args.flatten()? {
        if !items.iter().any(|seen| values_equal(seen, &value)) {
            items.push(value);
        }
    }
    Ok(Value::Array(items))
}

/// XLOOKUP(key, lookup_array, return_array[, if_not_found])
pub fn fn_xlookup(args: &Args<'_>) -> CalcResult<Value> {
    let key = args.eval(0)?;
    let lookup = array_arg(args.eval(1)?);
    let results = array_arg(args.eval(2)?);
    if lookup.len() != results.len() {
        return Err(CalcError::Argument(format!(
            "XLOOKUP arrays differ in length ({} and {})",
            lookup.len(),
            results.len()
        )));
    }

    match lookup.iter().position(|item| values_equal(item, &key)) {
        Some(i) => Ok(results[i].clone()),
        None => Ok(args.eval_opt(3)?.unwrap_or_default()),
    }
}

fn array_arg(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Empty => Vec::new(),
        other => vec![other],
    }
}

/// Keep the numeric items of the first argument that satisfy `keep` against
/// the threshold. A missing or non-numeric threshold yields an empty array.
fn filter_numbers(args: &Args<'_>, keep: impl Fn(Ordering) -> bool) -> CalcResult<Value> {
    let items = array_arg(args.eval(0)?);
    let threshold = match args.eval(1)? {
        Value::Empty => return Ok(Value::Array(Vec::new())),
        other => match other.as_number() {
            Some(n) => n,
            None => return Ok(Value::Array(Vec::new())),
        },
    };

    let numbers = items
        .iter()
        .filter(|item| !item.is_empty())
        .filter_map(Value::as_number)
        .filter(|n| n.partial_cmp(&threshold).map_or(false, &keep))
        .map(Value::Number)
        .collect();
    Ok(Value::Array(numbers))
}

/// LessThan(array, threshold)
pub fn fn_less_than(args: &Args<'_>) -> CalcResult<Value> {
    filter_numbers(args, |o| o == Ordering::Less)
}

/// LessOrEqual(array, threshold)
pub fn fn_less_or_equal(args: &Args<'_>) -> CalcResult<Value> {
    filter_numbers(args, |o| o != Ordering::Greater)
}

/// GreaterThan(array, threshold)
pub fn fn_greater_than(args: &Args<'_>) -> CalcResult<Value> {
    filter_numbers(args, |o| o == Ordering::Greater)
}

/// GreaterOrEqual(array, threshold)
pub fn fn_greater_or_equal(args: &Args<'_>) -> CalcResult<Value> {
    filter_numbers(args, |o| o != Ordering::Less)
}

/// Contains(collection, value)
///
/// Arrays test their items, dictionaries their keys and text its substrings.
/// Text values lose any leading `contains_trim_start_chars` first.
pub fn fn_contains(engine: &Engine, args: &Args<'_>) -> CalcResult<Value> {
    let trim = &engine.options().functions.contains_trim_start_chars;
    let normalize = |value: Value| match value {
        Value::String(s) => Value::String(s.trim_start_matches(trim.as_slice()).to_string()),
        other => other,
    };

    let collection = args.eval(0)?;
    let needle = normalize(args.eval(1)?);

    let found = match collection {
        Value::Empty => false,
        Value::Array(items) => items
            .into_iter()
            .any(|item| values_equal(&normalize(item), &needle)),
        Value::String(s) => s
            .trim_start_matches(trim.as_slice())
            .contains(needle.as_string().as_str()),
        Value::Object(obj) if obj.is_associative() => {
            obj.contains_key(std::slice::from_ref(&needle))
        }
        other => values_equal(&normalize(other), &needle),
    };
    Ok(Value::Boolean(found))
}

#[cfg(test)]
mod tests {
    use crate::{Engine, EvaluateOptions};
    use calc_engine_core::{Dictionary, Value};
    use pretty_assertions::assert_eq;

    fn eval(formula: &str) -> Value {
        Engine::new().evaluate(formula).unwrap()
    }

    fn numbers(items: &[f64]) -> Value {
        Value::array(items.iter().copied())
    }

    #[test]
    fn test_array_and_range() {
        assert_eq!(eval("Range(0, 3)"), numbers(&[0.0, 1.0, 2.0, 3.0]));
        assert_eq!(eval("Range(0, 200, 100)"), numbers(&[0.0, 100.0, 200.0]));
        assert_eq!(eval("Range(3, 0)"), numbers(&[]));
        assert_eq!(eval("Range(3, 0, -1)"), numbers(&[3.0, 2.0, 1.0, 0.0]));
        assert_eq!(
            eval("Array('K', 'E', 'S')"),
            Value::array(["K", "E", "S"])
        );
        assert_eq!(
            eval("Array(1, '3')"),
            Value::Array(vec![Value::Number(1.0), Value::from("3")])
        );
        assert!(Engine::new().evaluate("Range(0, 1, 0)").is_err());
        assert!(Engine::new().evaluate("Range(0, 10000000)").is_err());
    }

    #[test]
    fn test_range_cancellation() {
        let engine = Engine::new();
        let options = EvaluateOptions::default();
        let token = crate::CancellationToken::new();
        token.cancel();
        let result = engine.evaluate_with("Range(0, 10)", options.with_cancel(token));
        assert_eq!(result, Err(crate::CalcError::Cancelled));
    }

    #[test]
    fn test_map() {
        assert_eq!(
            eval("Map(Range(0, 200, 100), Range(100, 400, 100))"),
            numbers(&[0.0, 100.0, 200.0, 300.0, 400.0])
        );
        assert_eq!(eval("Map()"), numbers(&[]));
    }

    #[test]
    fn test_comparison_filters() {
        assert_eq!(eval("LessThan(Range(0, 3), 3)"), numbers(&[0.0, 1.0, 2.0]));
        assert_eq!(eval("lt(Range(0, 3), 3)"), numbers(&[0.0, 1.0, 2.0]));
        assert_eq!(eval("LessThan(Array('1', '4'), 3)"), numbers(&[1.0]));
        assert_eq!(eval("le(Range(0, 3), 3)"), numbers(&[0.0, 1.0, 2.0, 3.0]));
        assert_eq!(eval("gt(Range(0, 3), 1)"), numbers(&[2.0, 3.0]));
        assert_eq!(eval("GreaterOrEqual(Range(0, 3), 1)"), numbers(&[1.0, 2.0, 3.0]));
        assert_eq!(eval("LessThan(Range(0, 3), 'x')"), numbers(&[]));
    }

    #[test]
    fn test_xlookup() {
        assert_eq!(
            eval("XLOOKUP('04', Array('06', '05', '04'), Array(25, 26, 27), 0)"),
            Value::Number(27.0)
        );
        assert_eq!(
            eval("XLOOKUP('01', Array('06', '05', '04'), Array(25, 26, 27), 0)"),
            Value::Number(0.0)
        );
        assert_eq!(eval("XLOOKUP(9, Array(1), Array(2))"), Value::Empty);
        assert!(Engine::new().evaluate("XLOOKUP(1, Array(1, 2), Array(3))").is_err());
    }

    #[test]
    fn test_contains() {
        assert_eq!(eval("Contains(Array(1, 2), 2)"), Value::Boolean(true));
        assert_eq!(eval("Contains(Array(1, 2), 3)"), Value::Boolean(false));
        assert_eq!(eval("Contains('abracadabra', 'cad')"), Value::Boolean(true));

        let mut engine = Engine::new();
        engine.options_mut().functions.contains_trim_start_chars = vec!['0'];
        assert_eq!(
            engine.evaluate("Contains(Array('004', '005'), '4')").unwrap(),
            Value::Boolean(true)
        );

        let mut dict = Dictionary::new();
        dict.insert("a", 1);
        engine.set_variable("lookup", dict);
        assert_eq!(engine.evaluate("Contains(lookup, 'a')").unwrap(), Value::Boolean(true));
        assert_eq!(engine.evaluate("Contains(lookup, 'b')").unwrap(), Value::Boolean(false));
    }
}
