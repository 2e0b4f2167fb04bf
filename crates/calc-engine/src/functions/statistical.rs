//! Statistical functions

use super::Args;
use crate::error::{CalcError, CalcResult};
use calc_engine_core::Value;
use rust_decimal::prelude::ToPrimitive;

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::Decimal(d) => d.to_f64(),
        _ => None,
    }
}

/// AVERAGE function (numbers only)
pub fn fn_average(args: &Args<'_>) -> CalcResult<Value> {
    let values = args.flatten()?;
    let numbers: Vec<f64> = values.iter().filter_map(numeric).collect();
    if numbers.is_empty() {
        return Err(CalcError::Evaluation("Division by zero".into()));
    }
    Ok(Value::Number(numbers.iter().sum::<f64>() / numbers.len() as f64))
}

/// AVERAGEA function
///
/// Every non-empty value counts; only numbers add to the sum.
pub fn fn_averagea(args: &Args<'_>) -> CalcResult<Value> {
    let values = args.flatten()?;
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values.iter().filter(|v| !v.is_empty()) {
        sum += numeric(value).unwrap_or(0.0);
        count += 1;
    }
    if count == 0 {
        return Err(CalcError::Evaluation("Division by zero".into()));
    }
    Ok(Value::Number(sum / count as f64))
}

/// COUNT function (numbers only)
pub fn fn_count(args: &Args<'_>) -> CalcResult<Value> {
    let values = args.flatten()?;
    Ok(Value::from(values.iter().filter(|v| numeric(v).is_some()).count()))
}

/// COUNTA function (non-empty values)
pub fn fn_counta(args: &Args<'_>) -> CalcResult<Value> {
    let values = args.flatten()?;
    Ok(Value::from(values.iter().filter(|v| !v.is_empty()).count()))
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
    fn test_average() {
        assert_eq!(eval("AVERAGE(1, 3, 3, 1, true, false, \"hello\")"), Value::Number(2.0));
        assert_eq!(eval("AVERAGEA(1, 3, 3, 1, true, false, \"hello\")"), Value::Number(8.0 / 7.0));
        assert_eq!(eval("AVERAGE(Range(1, 5))"), Value::Number(3.0));
        assert!(Engine::new().evaluate("AVERAGE('a')").is_err());
    }

    #[test]
    fn test_count() {
        assert_eq!(eval("COUNT(1, 3, 3, 1, true, false, \"hello\")"), Value::Number(4.0));
        assert_eq!(eval("COUNTA(1, 3, 3, 1, true, false, \"hello\")"), Value::Number(7.0));
        assert_eq!(eval("COUNT(Array(1, 'x', 2))"), Value::Number(2.0));
    }
}
