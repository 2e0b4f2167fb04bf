//! Math functions

use super::Args;
use crate::error::{CalcError, CalcResult};
use crate::evaluator::to_number;
use calc_engine_core::Value;
use rust_decimal::prelude::ToPrimitive;

fn number(n: f64) -> CalcResult<Value> {
    if n.is_finite() {
        Ok(Value::Number(n))
    } else {
        Err(CalcError::Evaluation("Numeric result out of range".into()))
    }
}

fn unary(args: &Args<'_>, f: impl Fn(f64) -> f64) -> CalcResult<Value> {
    number(f(args.number(0)?))
}

/// Numeric values among the (flattened) arguments; text and booleans are ignored
fn numbers(args: &Args<'_>) -> CalcResult<Vec<f64>> {
    Ok(args
        .flatten()?
        .iter()
        .filter_map(|v| match v {
            Value::Number(n) => Some(*n),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        })
        .collect())
}

/// ABS function
pub fn fn_abs(args: &Args<'_>) -> CalcResult<Value> {
    match args.eval(0)? {
        Value::Decimal(d) => Ok(Value::Decimal(d.abs())),
        other => number(to_number(&other)?.abs()),
    }
}

/// CEILING(number[, significance])
pub fn fn_ceiling(args: &Args<'_>) -> CalcResult<Value> {
    let n = args.number(0)?;
    let significance = args.number_or(1, 1.0)?;
    if significance == 0.0 {
        return Ok(Value::Number(0.0));
    }
    number((n / significance).ceil() * significance)
}

/// FLOOR(number[, significance])
pub fn fn_floor(args: &Args<'_>) -> CalcResult<Value> {
    let n = args.number(0)?;
    let significance = args.number_or(1, 1.0)?;
    if significance == 0.0 {
        return Err(CalcError::Evaluation("Division by zero".into()));
    }
    number((n / significance).floor() * significance)
}

/// INT function (rounds down)
pub fn fn_int(args: &Args<'_>) -> CalcResult<Value> {
    unary(args, f64::floor)
}

/// ROUND(number[, digits]), halves away from zero
pub fn fn_round(args: &Args<'_>) -> CalcResult<Value> {
    let n = args.number(0)?;
    let digits = args.number_or(1, 0.0)?.trunc() as i32;
    let factor = 10f64.powi(digits);
    number((n * factor).round() / factor)
}

/// TRUNC(number[, digits])
pub fn fn_trunc(args: &Args<'_>) -> CalcResult<Value> {
    let n = args.number(0)?;
    let digits = args.number_or(1, 0.0)?.trunc() as i32;
    let factor = 10f64.powi(digits);
    number((n * factor).trunc() / factor)
}

/// SIGN function
pub fn fn_sign(args: &Args<'_>) -> CalcResult<Value> {
    let n = args.number(0)?;
    let sign = if n > 0.0 {
        1.0
    } else if n < 0.0 {
        -1.0
    } else {
        0.0
    };
    Ok(Value::Number(sign))
}

/// SQRT function
pub fn fn_sqrt(args: &Args<'_>) -> CalcResult<Value> {
    let n = args.number(0)?;
    if n < 0.0 {
        return Err(CalcError::Evaluation("SQRT of a negative number".into()));
    }
    number(n.sqrt())
}

/// POWER(base, exponent)
pub fn fn_power(args: &Args<'_>) -> CalcResult<Value> {
    number(args.number(0)?.powf(args.number(1)?))
}

pub fn fn_exp(args: &Args<'_>) -> CalcResult<Value> {
    unary(args, f64::exp)
}

fn positive(args: &Args<'_>, name: &str) -> CalcResult<f64> {
    let n = args.number(0)?;
    if n <= 0.0 {
        return Err(CalcError::Evaluation(format!("{} of a non-positive number", name)));
    }
    Ok(n)
}

/// LN function (natural logarithm)
pub fn fn_ln(args: &Args<'_>) -> CalcResult<Value> {
    number(positive(args, "LN")?.ln())
}

/// LOG(number[, base]); the base defaults to 10
pub fn fn_log(args: &Args<'_>) -> CalcResult<Value> {
    let n = positive(args, "LOG")?;
    let base = args.number_or(1, 10.0)?;
    if base <= 0.0 || base == 1.0 {
        return Err(CalcError::Evaluation("Invalid logarithm base".into()));
    }
    number(n.log(base))
}

pub fn fn_log10(args: &Args<'_>) -> CalcResult<Value> {
    number(positive(args, "LOG10")?.log10())
}

pub fn fn_pi(_args: &Args<'_>) -> CalcResult<Value> {
    Ok(Value::Number(std::f64::consts::PI))
}

pub fn fn_sin(args: &Args<'_>) -> CalcResult<Value> {
    unary(args, f64::sin)
}

pub fn fn_cos(args: &Args<'_>) -> CalcResult<Value> {
    unary(args, f64::cos)
}

pub fn fn_tan(args: &Args<'_>) -> CalcResult<Value> {
    unary(args, f64::tan)
}

fn unit_range(args: &Args<'_>, name: &str) -> CalcResult<f64> {
    let n = args.number(0)?;
    if !(-1.0..=1.0).contains(&n) {
        return Err(CalcError::Evaluation(format!("{} argument outside [-1, 1]", name)));
    }
    Ok(n)
}

pub fn fn_asin(args: &Args<'_>) -> CalcResult<Value> {
    number(unit_range(args, "ASIN")?.asin())
}

pub fn fn_acos(args: &Args<'_>) -> CalcResult<Value> {
    number(unit_range(args, "ACOS")?.acos())
}

pub fn fn_atan(args: &Args<'_>) -> CalcResult<Value> {
    unary(args, f64::atan)
}

/// ATAN2(y, x)
pub fn fn_atan2(args: &Args<'_>) -> CalcResult<Value> {
    number(args.number(0)?.atan2(args.number(1)?))
}

/// SUM function
pub fn fn_sum(args: &Args<'_>) -> CalcResult<Value> {
    number(numbers(args)?.iter().sum())
}

/// MAX function; 0 when there are no numbers
pub fn fn_max(args: &Args<'_>) -> CalcResult<Value> {
    let max = numbers(args)?.into_iter().reduce(f64::max);
    Ok(Value::Number(max.unwrap_or(0.0)))
}

/// MIN function; 0 when there are no numbers
pub fn fn_min(args: &Args<'_>) -> CalcResult<Value> {
    let min = numbers(args)?.into_iter().reduce(f64::min);
    Ok(Value::Number(min.unwrap_or(0.0)))
}

#[cfg(test)]
mod tests {
    use crate::Engine;
    use calc_engine_core::Value;
    use pretty_assertions::assert_eq;

    fn num(formula: &str) -> f64 {
        match Engine::new().evaluate(formula).unwrap() {
            Value::Number(n) => n,
            other => panic!("{formula} produced {other:?}"),
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_basic() {
        assert_eq!(num("ABS(-12)"), 12.0);
        assert_eq!(num("ABS(+12)"), 12.0);
        assert_eq!(num("CEILING(1.8)"), 2.0);
        assert_eq!(num("FLOOR(1.8)"), 1.0);
        assert_eq!(num("INT(1.8)"), 1.0);
        assert_eq!(num("INT(-1.2)"), -2.0);
        assert_eq!(num("TRUNC(1.23)"), 1.0);
        assert_eq!(num("TRUNC(-1.29, 1)"), -1.2);
        assert_eq!(num("ROUND(2.5)"), 3.0);
        assert_eq!(num("ROUND(1.2345, 2)"), 1.23);
        assert_eq!(num("SIGN(-5)"), -1.0);
        assert_eq!(num("SIGN(0)"), 0.0);
        assert_eq!(num("SQRT(144)"), 12.0);
        assert_eq!(num("POWER(2,4)"), 16.0);
    }

    #[test]
    fn test_transcendental() {
        assert!(close(num("EXP(1)"), 1f64.exp()));
        assert!(close(num("LN(1.8)"), 1.8f64.ln()));
        assert!(close(num("LOG(1.8)"), 1.8f64.log10()));
        assert!(close(num("LOG(1.8, 4)"), 1.8f64.log(4.0)));
        assert!(close(num("LOG10(1.8)"), 1.8f64.log10()));
        assert!(close(num("SIN(PI()/4)"), (std::f64::consts::PI / 4.0).sin()));
        assert!(close(num("ACOS(.23)"), 0.23f64.acos()));
        assert!(close(num("ATAN2(1,2)"), 1f64.atan2(2.0)));
        assert_eq!(num("PI"), std::f64::consts::PI);
    }

    #[test]
    fn test_aggregates() {
        assert_eq!(num("SUM(1, 2, 3, 4)"), 10.0);
        assert_eq!(num("MAX(1.4, 2, 3, 4.5)"), 4.5);
        assert_eq!(num("MIN(1.4, 2, 3, 4.5)"), 1.4);
        assert_eq!(num("MAX(Array(5,6,7))"), 7.0);
        assert_eq!(num("SUM(1, 'x', true)"), 1.0);
        assert_eq!(num("MAX('a')"), 0.0);
    }

    #[test]
    fn test_domain_errors() {
        let engine = Engine::new();
        assert!(engine.evaluate("SQRT(-1)").is_err());
        assert!(engine.evaluate("LN(0)").is_err());
        assert!(engine.evaluate("ASIN(2)").is_err());
        assert!(engine.evaluate("LOG(10, 1)").is_err());
    }
}
