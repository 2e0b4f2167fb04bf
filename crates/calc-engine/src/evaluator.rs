//! Expression evaluator
//!
//! A plain recursive tree walk. Everything an evaluation needs besides the tree
//! itself travels in [`EvalContext`], so parsed (and cached) trees stay
//! immutable and shareable.

use crate::ast::{BinaryOperator, Expr, NodeId, UnaryOperator, VariableRef};
use crate::binding;
use crate::engine::{CancellationToken, Engine, EvaluateOptions};
use crate::error::{CalcError, CalcResult};
use ahash::AHashMap;
use calc_engine_core::Value;
use chrono::{Duration, NaiveDateTime};
use rust_decimal::Decimal;
use std::cell::RefCell;
use std::cmp::Ordering;

/// Values recorded per node during a traced evaluation
pub type TraceValues = AHashMap<NodeId, Value>;

/// State of a single evaluation
pub struct EvalContext<'e> {
    engine: &'e Engine,
    throw_on_binding_error: bool,
    validation: bool,
    trace: Option<RefCell<TraceValues>>,
    cancel: Option<CancellationToken>,
}

impl<'e> EvalContext<'e> {
    pub(crate) fn new(engine: &'e Engine, options: &EvaluateOptions, validation: bool) -> Self {
        Self {
            engine,
            throw_on_binding_error: options.throw_on_binding_error,
            validation,
            trace: options.record_trace.then(|| RefCell::new(TraceValues::default())),
            cancel: options.cancel.clone(),
        }
    }

    /// Context used by the optimizer: strict, untraced
    pub(crate) fn for_folding(engine: &'e Engine) -> Self {
        Self {
            engine,
            throw_on_binding_error: true,
            validation: false,
            trace: None,
            cancel: None,
        }
    }

    pub fn engine(&self) -> &'e Engine {
        self.engine
    }

    pub fn throw_on_binding_error(&self) -> bool {
        self.throw_on_binding_error
    }

    /// Whether binding failures are replaced by placeholders
    pub fn in_validation(&self) -> bool {
        self.validation
    }

    /// Fail with [`CalcError::Cancelled`] once the token has been cancelled
    pub fn check_cancelled(&self) -> CalcResult<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(CalcError::Cancelled),
            _ => Ok(()),
        }
    }

    pub(crate) fn record(&self, id: NodeId, value: &Value) {
        if let Some(trace) = &self.trace {
            trace.borrow_mut().insert(id, value.clone());
        }
    }

    pub(crate) fn into_trace(self) -> Option<TraceValues> {
        self.trace.map(RefCell::into_inner)
    }
}

/// Evaluate an expression
pub fn evaluate(expr: &Expr, ctx: &EvalContext<'_>) -> CalcResult<Value> {
    ctx.check_cancelled()?;

    match expr {
        Expr::Literal(value) => Ok(value.clone()),

        Expr::Unary { op, operand } => {
            let value = evaluate(operand, ctx)?;
            evaluate_unary_op(*op, &value)
        }

        Expr::Binary { op, left, right } => match op {
            BinaryOperator::And => {
                if !to_bool(&evaluate(left, ctx)?)? {
                    return Ok(Value::Boolean(false));
                }
                Ok(Value::Boolean(to_bool(&evaluate(right, ctx)?)?))
            }
            BinaryOperator::Or => {
                if to_bool(&evaluate(left, ctx)?)? {
                    return Ok(Value::Boolean(true));
                }
                Ok(Value::Boolean(to_bool(&evaluate(right, ctx)?)?))
            }
            _ => {
                let left = evaluate(left, ctx)?;
                let right = evaluate(right, ctx)?;
                evaluate_binary_op(*op, &left, &right)
            }
        },

        Expr::Function(call) => {
            let value = call.def.call(&call.args, ctx)?;
            ctx.record(call.id, &value);
            Ok(value)
        }

        Expr::Variable(var) => {
            let value = evaluate_variable(var, ctx)?;
            ctx.record(var.id, &value);
            Ok(value)
        }

        Expr::Binding(path) => {
            let value = binding::resolve(path, ctx)?;
            ctx.record(path.id, &value);
            Ok(value)
        }
    }
}

fn evaluate_variable(var: &VariableRef, ctx: &EvalContext<'_>) -> CalcResult<Value> {
    let value = ctx
        .engine()
        .variable(&var.name)
        .ok_or_else(|| CalcError::UnknownVariable(var.name.clone()))?;

    let (Some(index), Value::Array(items)) = (var.index.first(), value) else {
        return Ok(value.clone());
    };

    let index = to_number(&evaluate(index, ctx)?)?;
    if index < 0.0 || index.fract() != 0.0 {
        return Ok(Value::Empty);
    }
    Ok(items.get(index as usize).cloned().unwrap_or_default())
}

/// Convert to a number or fail with an evaluation error
pub fn to_number(value: &Value) -> CalcResult<f64> {
    value.as_number().ok_or_else(|| {
        CalcError::Evaluation(format!(
            "Cannot convert {} '{}' to number",
            value.type_name(),
            value
        ))
    })
}

/// Convert to a boolean or fail with an evaluation error
pub fn to_bool(value: &Value) -> CalcResult<bool> {
    value.as_bool().ok_or_else(|| {
        CalcError::Evaluation(format!(
            "Cannot convert {} '{}' to boolean",
            value.type_name(),
            value
        ))
    })
}

/// Evaluate a unary operation
pub fn evaluate_unary_op(op: UnaryOperator, value: &Value) -> CalcResult<Value> {
    match (op, value) {
        (UnaryOperator::Plus, Value::Decimal(d)) => Ok(Value::Decimal(*d)),
        (UnaryOperator::Negate, Value::Decimal(d)) => Ok(Value::Decimal(-*d)),
        (UnaryOperator::Plus, v) => Ok(Value::Number(to_number(v)?)),
        (UnaryOperator::Negate, v) => Ok(Value::Number(-to_number(v)?)),
    }
}

/// Evaluate a binary operation on already-evaluated operands
///
/// `&&` and `||` are handled here too (without short-circuiting) so folded
/// literals go through the same rules.
pub fn evaluate_binary_op(op: BinaryOperator, left: &Value, right: &Value) -> CalcResult<Value> {
    match op {
        BinaryOperator::Add
        | BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::IntDivide
        | BinaryOperator::Power => arithmetic(op, left, right),

        BinaryOperator::Equal => Ok(Value::Boolean(values_equal(left, right))),
        BinaryOperator::NotEqual => Ok(Value::Boolean(!values_equal(left, right))),

        BinaryOperator::LessThan
        | BinaryOperator::LessEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterEqual => {
            let ordering = compare_values(left, right).ok_or_else(|| {
                CalcError::Evaluation(format!(
                    "Cannot compare {} with {}",
                    left.type_name(),
                    right.type_name()
                ))
            })?;
            let result = match op {
                BinaryOperator::LessThan => ordering == Ordering::Less,
                BinaryOperator::LessEqual => ordering != Ordering::Greater,
                BinaryOperator::GreaterThan => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Boolean(result))
        }

        BinaryOperator::And => Ok(Value::Boolean(to_bool(left)? && to_bool(right)?)),
        BinaryOperator::Or => Ok(Value::Boolean(to_bool(left)? || to_bool(right)?)),
    }
}

fn arithmetic(op: BinaryOperator, left: &Value, right: &Value) -> CalcResult<Value> {
    // Text concatenation, unless numeric text meets a number
    let concat = match (left, right) {
        (Value::String(_), Value::String(_)) => true,
        (Value::String(_), _) | (_, Value::String(_)) => {
            left.as_number().is_none() || right.as_number().is_none()
        }
        _ => false,
    };
    if op == BinaryOperator::Add && concat {
        return Ok(Value::String(format!("{}{}", left.as_string(), right.as_string())));
    }

    // Date arithmetic
    match (op, left, right) {
        (BinaryOperator::Subtract, Value::DateTime(a), Value::DateTime(b)) => {
            let span = *a - *b;
            return Ok(Value::Number(span.num_milliseconds() as f64 / 86_400_000.0));
        }
        (BinaryOperator::Add, Value::DateTime(d), n) | (BinaryOperator::Add, n, Value::DateTime(d)) => {
            return shift_date(d, to_number(n)?);
        }
        (BinaryOperator::Subtract, Value::DateTime(d), n) => {
            return shift_date(d, -to_number(n)?);
        }
        _ => {}
    }

    if let (Value::Decimal(a), Value::Decimal(b)) = (left, right) {
        if op != BinaryOperator::Power {
            return decimal_arithmetic(op, *a, *b);
        }
    }

    let l = to_number(left)?;
    let r = to_number(right)?;
    let result = match op {
        BinaryOperator::Add => l + r,
        BinaryOperator::Subtract => l - r,
        BinaryOperator::Multiply => l * r,
        BinaryOperator::Divide | BinaryOperator::IntDivide if r == 0.0 => {
            return Err(CalcError::Evaluation("Division by zero".into()));
        }
        BinaryOperator::Divide => l / r,
        BinaryOperator::IntDivide => (l / r).trunc(),
        _ => l.powf(r),
    };
    Ok(Value::Number(result))
}

fn shift_date(date: &NaiveDateTime, days: f64) -> CalcResult<Value> {
    let millis = (days * 86_400_000.0).round();
    (millis.is_finite() && millis.abs() < i64::MAX as f64)
        .then(|| Duration::try_milliseconds(millis as i64))
        .flatten()
        .and_then(|span| date.checked_add_signed(span))
        .map(Value::DateTime)
        .ok_or_else(|| CalcError::Evaluation("Date out of range".into()))
}

fn decimal_arithmetic(op: BinaryOperator, a: Decimal, b: Decimal) -> CalcResult<Value> {
    if matches!(op, BinaryOperator::Divide | BinaryOperator::IntDivide) && b.is_zero() {
        return Err(CalcError::Evaluation("Division by zero".into()));
    }
    let result = match op {
        BinaryOperator::Add => a.checked_add(b),
        BinaryOperator::Subtract => a.checked_sub(b),
        BinaryOperator::Multiply => a.checked_mul(b),
        BinaryOperator::Divide => a.checked_div(b),
        _ => a.checked_div(b).map(|d| d.trunc()),
    };
    result
        .map(Value::Decimal)
        .ok_or_else(|| CalcError::Evaluation("Decimal overflow".into()))
}

/// Equality used by `=`, `<>` and lookup functions
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(_), _) | (_, Value::Object(_)) => left == right,
        _ => compare_values(left, right) == Some(Ordering::Equal),
    }
}

/// Order two values, if they are comparable
///
/// Numbers compare numerically (numeric text included), text compares
/// ordinally, dates chronologically and `false < true`. An empty value acts as
/// `0` against numbers and `""` against text.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Empty, Value::Empty) => Some(Ordering::Equal),
        (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Empty, Value::String(s)) => Some("".cmp(s.as_str())),
        (Value::String(s), Value::Empty) => Some(s.as_str().cmp("")),
        (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        (Value::String(s), other) if other.is_numeric() => match s.trim().parse::<f64>() {
            Ok(n) => other.as_number().and_then(|o| n.partial_cmp(&o)),
            Err(_) => Some(s.as_str().cmp(other.to_string().as_str())),
        },
        (other, Value::String(_)) if other.is_numeric() => {
            compare_values(right, left).map(Ordering::reverse)
        }
        (Value::Array(_), _) | (_, Value::Array(_)) => None,
        (Value::Object(_), _) | (_, Value::Object(_)) => None,
        (Value::DateTime(_), _) | (_, Value::DateTime(_)) => None,
        _ => {
            let l = left.as_number()?;
            let r = right.as_number()?;
            l.partial_cmp(&r)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Value {
        Value::Decimal(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_arithmetic() {
        let add = |l: Value, r: Value| evaluate_binary_op(BinaryOperator::Add, &l, &r).unwrap();
        assert_eq!(add(Value::from(1), Value::from(2)), Value::Number(3.0));
        assert_eq!(add(Value::Empty, Value::from(2)), Value::Number(2.0));
        assert_eq!(add(Value::from("a"), Value::from("b")), Value::from("ab"));
        assert_eq!(add(Value::from("a"), Value::from(1)), Value::from("a1"));
        assert_eq!(add(Value::from("2"), Value::from(1)), Value::Number(3.0));
        assert_eq!(add(dec("0.1"), dec("0.2")), dec("0.3"));
        assert_eq!(add(dec("1.5"), Value::from(1)), Value::Number(2.5));
    }

    #[test]
    fn test_division() {
        let div = |op, l: f64, r: f64| evaluate_binary_op(op, &Value::from(l), &Value::from(r));
        assert_eq!(div(BinaryOperator::Divide, 7.0, 2.0).unwrap(), Value::Number(3.5));
        assert_eq!(div(BinaryOperator::IntDivide, -7.0, 2.0).unwrap(), Value::Number(-3.0));
        assert_eq!(
            div(BinaryOperator::Divide, 1.0, 0.0),
            Err(CalcError::Evaluation("Division by zero".into()))
        );
        assert_eq!(
            evaluate_binary_op(BinaryOperator::Divide, &dec("1"), &dec("0")),
            Err(CalcError::Evaluation("Division by zero".into()))
        );
    }

    #[test]
    fn test_dates() {
        let day = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let a = Value::from(day);
        let b = Value::from(NaiveDate::from_ymd_opt(2020, 1, 11).unwrap());
        assert_eq!(
            evaluate_binary_op(BinaryOperator::Subtract, &b, &a).unwrap(),
            Value::Number(10.0)
        );
        assert_eq!(
            evaluate_binary_op(BinaryOperator::Add, &a, &Value::from(10)).unwrap(),
            b
        );
    }

    #[test]
    fn test_date_shift_out_of_range() {
        let a = Value::from(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        let out_of_range = Err(CalcError::Evaluation("Date out of range".into()));
        for days in [1e300, -1e300, 1e12, f64::INFINITY, f64::NAN] {
            assert_eq!(
                evaluate_binary_op(BinaryOperator::Subtract, &a, &Value::from(days)),
                out_of_range,
                "{days}"
            );
            assert_eq!(
                evaluate_binary_op(BinaryOperator::Add, &Value::from(days), &a),
                out_of_range,
                "{days}"
            );
        }
    }

    #[test]
    fn test_compare_values() {
        assert_eq!(compare_values(&Value::from(1), &Value::from(2)), Some(Ordering::Less));
        assert_eq!(compare_values(&Value::from("2"), &Value::from(2)), Some(Ordering::Equal));
        assert_eq!(compare_values(&Value::from(10), &Value::from("9")), Some(Ordering::Greater));
        assert_eq!(compare_values(&Value::from("Viis"), &Value::from("Üks")), Some(Ordering::Less));
        assert_eq!(compare_values(&Value::from(false), &Value::from(true)), Some(Ordering::Less));
        assert_eq!(compare_values(&Value::Empty, &Value::from(0)), Some(Ordering::Equal));
        assert_eq!(compare_values(&Value::Empty, &Value::from("")), Some(Ordering::Equal));
        assert_eq!(compare_values(&dec("1.0"), &Value::from(1)), Some(Ordering::Equal));
        assert_eq!(compare_values(&Value::from(vec![1]), &Value::from(1)), None);
    }

    #[test]
    fn test_values_equal() {
        assert!(values_equal(&Value::from(vec![1, 2]), &Value::from(vec![1.0, 2.0])));
        assert!(!values_equal(&Value::from("a"), &Value::from("A")));
        assert!(values_equal(&Value::from("04"), &Value::from("04")));
    }

    #[test]
    fn test_unary() {
        assert_eq!(
            evaluate_unary_op(UnaryOperator::Negate, &Value::from("3")).unwrap(),
            Value::Number(-3.0)
        );
        assert_eq!(evaluate_unary_op(UnaryOperator::Negate, &dec("1.5")).unwrap(), dec("-1.5"));
        assert!(evaluate_unary_op(UnaryOperator::Plus, &Value::from("x")).is_err());
    }

    #[test]
    fn test_logical_ops() {
        assert_eq!(
            evaluate_binary_op(BinaryOperator::And, &Value::from(true), &Value::from(0)).unwrap(),
            Value::Boolean(false)
        );
        assert!(evaluate_binary_op(BinaryOperator::Or, &Value::from("x"), &Value::from(true)).is_err());
    }
}
