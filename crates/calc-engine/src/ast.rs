//! Expression tree types and the constant-folding optimizer

use crate::engine::Engine;
use crate::evaluator::{evaluate, EvalContext};
use crate::functions::{FunctionDef, FunctionImpl};
use calc_engine_core::{MemberId, Value};
use std::fmt;
use std::sync::{Arc, RwLock};

/// Parse-order id of a function, variable or binding node
///
/// Trace values recorded during evaluation are keyed by this id, so a shared
/// tree never has to be mutated to remember what it produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Expression AST
#[derive(Debug, Clone)]
pub enum Expr {
    /// Constant value
    Literal(Value),

    /// Unary operation
    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
    },

    /// Binary operation
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Registered function call
    Function(FunctionCall),

    /// Declared variable, optionally indexed
    Variable(VariableRef),

    /// Member path into the data context
    Binding(BindingPath),
}

/// Function call node
#[derive(Debug, Clone)]
pub struct FunctionCall {
    pub id: NodeId,
    pub def: Arc<FunctionDef>,
    /// Unevaluated arguments
    pub args: Vec<Expr>,
}

/// Variable reference node, e.g. `items[2]`
#[derive(Debug, Clone)]
pub struct VariableRef {
    pub id: NodeId,
    pub name: String,
    pub index: Vec<Expr>,
}

/// Binding path node, e.g. `Parent.Children(2).Name`
#[derive(Debug, Clone)]
pub struct BindingPath {
    pub id: NodeId,
    pub steps: Vec<BindingStep>,
    /// Source text the path was parsed from
    pub text: String,
}

/// One `.member` or `.member(args)` step of a binding path
#[derive(Debug)]
pub struct BindingStep {
    pub name: String,
    /// Indexer arguments, if the step has any
    pub args: Option<Vec<Expr>>,
    /// Member handle keyed by the runtime type name it was resolved against
    memo: RwLock<Option<(String, MemberId)>>,
}

impl BindingStep {
    pub fn new(name: impl Into<String>, args: Option<Vec<Expr>>) -> Self {
        Self {
            name: name.into(),
            args,
            memo: RwLock::new(None),
        }
    }

    /// Memoized member handle, valid only for the same runtime type
    pub(crate) fn cached_member(&self, type_name: &str) -> Option<MemberId> {
        let memo = self.memo.read().ok()?;
        match memo.as_ref() {
            Some((cached_type, id)) if cached_type == type_name => Some(*id),
            _ => None,
        }
    }

    pub(crate) fn remember_member(&self, type_name: &str, id: MemberId) {
        if let Ok(mut memo) = self.memo.write() {
            *memo = Some((type_name.to_string(), id));
        }
    }

    /// Indexer arguments, treating `name()` like `name`
    pub fn indexer(&self) -> Option<&[Expr]> {
        self.args.as_deref().filter(|args| !args.is_empty())
    }
}

impl Clone for BindingStep {
    fn clone(&self) -> Self {
        let memo = self.memo.read().ok().and_then(|m| m.clone());
        Self {
            name: self.name.clone(),
            args: self.args.clone(),
            memo: RwLock::new(memo),
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    Negate,
}

impl UnaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Negate => "-",
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    IntDivide,
    Power,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Logical
    And,
    Or,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::IntDivide => "\\",
            BinaryOperator::Power => "^",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
        }
    }
}

impl Expr {
    /// Evaluate against the engine state captured in `ctx`
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> crate::CalcResult<Value> {
        evaluate(self, ctx)
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Literal(_))
    }

    /// Constant-fold the tree bottom-up
    ///
    /// Unary, binary and function nodes whose operands are all literals are
    /// replaced by their value. Variables, binding paths, context functions and
    /// volatile functions are never folded. A fold that fails to evaluate keeps
    /// the unfolded node so the error surfaces at evaluation time.
    pub fn optimize(self, engine: &Engine) -> Expr {
        let ctx = EvalContext::for_folding(engine);
        self.fold(&ctx)
    }

    fn fold(self, ctx: &EvalContext<'_>) -> Expr {
        match self {
            Expr::Literal(_) => self,
            Expr::Unary { op, operand } => {
                let operand = operand.fold(ctx);
                let foldable = operand.is_literal();
                let node = Expr::Unary {
                    op,
                    operand: Box::new(operand),
                };
                if foldable {
                    fold_node(node, ctx)
                } else {
                    node
                }
            }
            Expr::Binary { op, left, right } => {
                let left = left.fold(ctx);
                let right = right.fold(ctx);
                let foldable = left.is_literal() && right.is_literal();
                let node = Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                };
                if foldable {
                    fold_node(node, ctx)
                } else {
                    node
                }
            }
            Expr::Function(call) => {
                let args: Vec<Expr> = call.args.into_iter().map(|a| a.fold(ctx)).collect();
                let foldable = !call.def.volatile
                    && matches!(call.def.implementation, FunctionImpl::Plain(_))
                    && args.iter().all(Expr::is_literal);
                let node = Expr::Function(FunctionCall {
                    id: call.id,
                    def: call.def,
                    args,
                });
                if foldable {
                    fold_node(node, ctx)
                } else {
                    node
                }
            }
            Expr::Variable(var) => Expr::Variable(VariableRef {
                index: var.index.into_iter().map(|a| a.fold(ctx)).collect(),
                ..var
            }),
            Expr::Binding(path) => Expr::Binding(BindingPath {
                steps: path
                    .steps
                    .into_iter()
                    .map(|step| BindingStep {
                        args: step
                            .args
                            .map(|args| args.into_iter().map(|a| a.fold(ctx)).collect()),
                        ..step
                    })
                    .collect(),
                ..path
            }),
        }
    }

    /// Visit this node and every descendant, depth first
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::Literal(_) => {}
            Expr::Unary { operand, .. } => operand.walk(visit),
            Expr::Binary { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Expr::Function(call) => call.args.iter().for_each(|a| a.walk(visit)),
            Expr::Variable(var) => var.index.iter().for_each(|a| a.walk(visit)),
            Expr::Binding(path) => path
                .steps
                .iter()
                .filter_map(|s| s.args.as_ref())
                .flatten()
                .for_each(|a| a.walk(visit)),
        }
    }
}

fn fold_node(node: Expr, ctx: &EvalContext<'_>) -> Expr {
    match evaluate(&node, ctx) {
        Ok(value) => Expr::Literal(value),
        Err(e) => {
            log::debug!("Constant folding of '{}' skipped: {}", node, e);
            node
        }
    }
}

/// Render a literal so it parses back to the same value
fn write_literal(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::String(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
        Value::DateTime(dt) => write!(f, "#{}#", dt.format("%Y-%m-%d %H:%M:%S")),
        Value::Array(items) => {
            f.write_str("Array(")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_literal(f, item)?;
            }
            f.write_str(")")
        }
        other => write!(f, "{}", other),
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", arg)?;
    }
    Ok(())
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    match expr {
        Expr::Binary { .. } => write!(f, "({})", expr),
        _ => write!(f, "{}", expr),
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write_literal(f, value),
            Expr::Unary { op, operand } => {
                f.write_str(op.symbol())?;
                write_operand(f, operand)
            }
            Expr::Binary { op, left, right } => {
                write_operand(f, left)?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, right)
            }
            Expr::Function(call) => {
                write!(f, "{}(", call.def.name)?;
                write_list(f, &call.args)?;
                f.write_str(")")
            }
            Expr::Variable(var) => {
                f.write_str(&var.name)?;
                if !var.index.is_empty() {
                    f.write_str("[")?;
                    write_list(f, &var.index)?;
                    f.write_str("]")?;
                }
                Ok(())
            }
            Expr::Binding(path) => f.write_str(&path.text),
        }
    }
}

impl fmt::Display for BindingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(args) = &self.args {
            f.write_str("(")?;
            write_list(f, args)?;
            f.write_str(")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display() {
        let expr = Expr::Binary {
            op: BinaryOperator::Multiply,
            left: Box::new(Expr::Binary {
                op: BinaryOperator::Add,
                left: Box::new(Expr::Literal(Value::from(1))),
                right: Box::new(Expr::Literal(Value::from("a\"b"))),
            }),
            right: Box::new(Expr::Unary {
                op: UnaryOperator::Negate,
                operand: Box::new(Expr::Literal(Value::from(2))),
            }),
        };
        assert_eq!(expr.to_string(), "(1 + \"a\"\"b\") * -2");
    }

    #[test]
    fn test_optimize_folds_literals() {
        let mut engine = Engine::new();
        engine.set_optimize_expressions(false);
        let expr = engine.parse("1 + 2 * 3").unwrap();
        assert!(!expr.is_literal());
        let folded = expr.optimize(&engine);
        assert!(matches!(folded, Expr::Literal(Value::Number(n)) if n == 7.0));
    }

    #[test]
    fn test_optimize_keeps_variables() {
        let mut engine = Engine::new();
        engine.set_optimize_expressions(false);
        engine.set_variable("x", 2);
        let expr = engine.parse("x * (2 + 3)").unwrap().optimize(&engine);
        match expr {
            Expr::Binary { left, right, .. } => {
                assert!(matches!(*left, Expr::Variable(_)));
                assert!(matches!(*right, Expr::Literal(Value::Number(n)) if n == 5.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_optimize_keeps_failing_fold() {
        let mut engine = Engine::new();
        engine.set_optimize_expressions(false);
        let expr = engine.parse("1 / 0").unwrap().optimize(&engine);
        assert!(matches!(expr, Expr::Binary { .. }));
    }

    #[test]
    fn test_binding_step_memo_is_type_scoped() {
        let step = BindingStep::new("Name", None);
        assert_eq!(step.cached_member("Person"), None);
        step.remember_member("Person", MemberId::of("Name"));
        assert_eq!(step.cached_member("Person"), Some(MemberId::of("Name")));
        assert_eq!(step.cached_member("Company"), None);
        assert_eq!(step.clone().cached_member("Person"), Some(MemberId::of("Name")));
    }

    #[test]
    fn test_walk_visits_all_nodes() {
        let mut engine = Engine::new();
        engine.set_variable("x", 1);
        let expr = engine.parse("1 + ABS(-2 * x)").unwrap();
        let mut count = 0;
        expr.walk(&mut |_| count += 1);
        // Binary, 1, ABS, Binary, -2 (folded), x
        assert_eq!(count, 6);
    }
}
