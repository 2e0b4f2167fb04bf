//! Evaluation traces
//!
//! A traced evaluation records the value produced by every function call,
//! variable and binding path. Afterwards the tree is rendered back to text with
//! each recorded value annotated as `/*{value}*/`:
//!
//! ```text
//! 15 * ChildrenDct("Test Child 2").Age/*{2}*/ + 14  =>  (...)/*{44}*/
//! ```

use crate::ast::Expr;
use crate::evaluator::TraceValues;
use calc_engine_core::Value;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Diagnostics captured from the last traced evaluation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    /// Annotated expression text
    pub expression: String,
    /// Binding path text or variable name → last resolved value
    pub bindings: BTreeMap<String, Value>,
}

impl Trace {
    pub(crate) fn build(expr: &Expr, values: &TraceValues, result: &Value) -> Self {
        Self {
            expression: render(expr, values, result),
            bindings: collect_bindings(expr, values),
        }
    }
}

/// Render the annotated form of `expr` ending with the overall result
pub fn render(expr: &Expr, values: &TraceValues, result: &Value) -> String {
    let mut out = String::new();
    write_node(&mut out, expr, values);

    let suffix = annotation(result);
    if out.ends_with(&suffix) {
        out
    } else {
        format!("({}){}", out, suffix)
    }
}

/// Flatten the recorded values of binding paths and variables
///
/// A later empty value never replaces an earlier non-empty one.
pub fn collect_bindings(expr: &Expr, values: &TraceValues) -> BTreeMap<String, Value> {
    let mut bindings: BTreeMap<String, Value> = BTreeMap::new();
    expr.walk(&mut |node| {
        let (key, id) = match node {
            Expr::Binding(path) => (path.text.as_str(), path.id),
            Expr::Variable(var) => (var.name.as_str(), var.id),
            _ => return,
        };
        let Some(value) = values.get(&id) else {
            return;
        };
        match bindings.get(key) {
            Some(existing) if value.is_empty() && !existing.is_empty() => {}
            _ => {
                bindings.insert(key.to_string(), value.clone());
            }
        }
    });
    bindings
}

fn annotation(value: &Value) -> String {
    format!("/*{{{}}}*/", value)
}

fn write_node(out: &mut String, expr: &Expr, values: &TraceValues) {
    match expr {
        Expr::Literal(value) => write_literal(out, value),
        Expr::Unary { op, operand } => {
            out.push_str(op.symbol());
            write_operand(out, operand, values);
        }
        Expr::Binary { op, left, right } => {
            write_operand(out, left, values);
            let _ = write!(out, " {} ", op.symbol());
            write_operand(out, right, values);
        }
        Expr::Function(call) => {
            let _ = write!(out, "{}(", call.def.name);
            write_list(out, &call.args, values);
            out.push(')');
            annotate(out, values.get(&call.id));
        }
        Expr::Variable(var) => {
            out.push_str(&var.name);
            if !var.index.is_empty() {
                out.push('[');
                write_list(out, &var.index, values);
                out.push(']');
            }
            annotate(out, values.get(&var.id));
        }
        Expr::Binding(path) => {
            out.push_str(&path.text);
            annotate(out, values.get(&path.id));
        }
    }
}

fn annotate(out: &mut String, value: Option<&Value>) {
    if let Some(value) = value {
        out.push_str(&annotation(value));
    }
}

fn write_operand(out: &mut String, expr: &Expr, values: &TraceValues) {
    if let Expr::Binary { .. } = expr {
        out.push('(');
        write_node(out, expr, values);
        out.push(')');
    } else {
        write_node(out, expr, values);
    }
}

fn write_list(out: &mut String, args: &[Expr], values: &TraceValues) {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_node(out, arg, values);
    }
}

fn write_literal(out: &mut String, value: &Value) {
    match value {
        Value::String(s) => {
            let _ = write!(out, "'{}'", s.replace('\'', "''"));
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_literal(out, item);
            }
            out.push(']');
        }
        other => {
            let _ = write!(out, "{}", other);
        }
    }
}
