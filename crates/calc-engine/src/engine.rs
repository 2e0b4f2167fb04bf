//! Calculation engine facade
//!
//! [`Engine`] owns the variables, functions, data context, culture and
//! options an expression is parsed and evaluated against.

use crate::ast::Expr;
use crate::cache::ExpressionCache;
use crate::error::{CalcError, CalcResult};
use crate::evaluator::{evaluate, EvalContext};
use crate::functions::{Args, FunctionDef, FunctionImpl, FunctionRegistry};
use crate::options::{CalculationOptions, Culture};
use crate::parser;
use crate::trace::Trace;
use ahash::AHashMap;
use calc_engine_core::{FromValue, Value};
use lazy_regex::regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Host hook resolving identifiers to external objects
pub type ExternalObjectFn = dyn Fn(&str) -> Option<Value> + Send + Sync;

/// Cooperative cancellation signal for a running evaluation
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Per-call evaluation settings
#[derive(Debug, Clone)]
pub struct EvaluateOptions {
    /// Raise binding errors instead of yielding an empty value
    pub throw_on_binding_error: bool,
    /// Keep the annotated expression and context bindings afterwards
    pub record_trace: bool,
    /// Serve the parsed tree from the engine's cache
    pub use_cache: bool,
    pub cancel: Option<CancellationToken>,
}

impl Default for EvaluateOptions {
    fn default() -> Self {
        Self {
            throw_on_binding_error: true,
            record_trace: true,
            use_cache: false,
            cancel: None,
        }
    }
}

impl EvaluateOptions {
    pub fn with_throw_on_binding_error(mut self, throw: bool) -> Self {
        self.throw_on_binding_error = throw;
        self
    }

    pub fn with_trace(mut self, record: bool) -> Self {
        self.record_trace = record;
        self
    }

    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Expression engine
///
/// ```rust
/// use calc_engine::{Engine, Record, Value};
///
/// let mut engine = Engine::new();
/// engine.set_variable("rate", 0.5);
/// engine.set_data_context(Record::new("Order").with("Total", 80));
///
/// assert_eq!(engine.evaluate("Total * rate").unwrap(), Value::Number(40.0));
/// ```
pub struct Engine {
    /// Keyed by lowercased name
    variables: AHashMap<String, Value>,
    functions: FunctionRegistry,
    data_context: Option<Value>,
    culture: Culture,
    options: CalculationOptions,
    identifier_chars: String,
    optimize_expressions: bool,
    cache: Option<ExpressionCache>,
    external_objects: Option<Arc<ExternalObjectFn>>,
    last_trace: RwLock<Option<Trace>>,
}

impl Engine {
    /// Create an engine with the built-in function library
    pub fn new() -> Self {
        Self {
            variables: AHashMap::new(),
            functions: FunctionRegistry::new(),
            data_context: None,
            culture: Culture::invariant(),
            options: CalculationOptions::default(),
            identifier_chars: String::new(),
            optimize_expressions: true,
            cache: Some(ExpressionCache::new()),
            external_objects: None,
            last_trace: RwLock::new(None),
        }
    }

    // === Variables ===

    /// Look up a variable (case-insensitive)
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(&name.to_lowercase())
    }

    /// Declare or replace a variable
    pub fn set_variable(&mut self, name: &str, value: impl Into<Value>) {
        self.variables.insert(name.to_lowercase(), value.into());
    }

    pub fn remove_variable(&mut self, name: &str) -> Option<Value> {
        self.variables.remove(&name.to_lowercase())
    }

    pub fn clear_variables(&mut self) {
        self.variables.clear();
    }

    // === Functions ===

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Mutable access to the registry; drops cached trees
    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        self.clear_cache();
        &mut self.functions
    }

    /// Register a function that only sees its arguments
    ///
    /// `max_args` of `None` accepts any number of arguments.
    pub fn register_function<F>(&mut self, name: &str, min_args: usize, max_args: Option<usize>, f: F)
    where
        F: Fn(&Args<'_>) -> CalcResult<Value> + Send + Sync + 'static,
    {
        self.functions_mut().register(FunctionDef {
            name: name.to_string(),
            min_args,
            max_args,
            implementation: FunctionImpl::plain(f),
            volatile: false,
        });
    }

    /// Register a function that also sees this engine
    pub fn register_context_function<F>(
        &mut self,
        name: &str,
        min_args: usize,
        max_args: Option<usize>,
        f: F,
    ) where
        F: Fn(&Engine, &Args<'_>) -> CalcResult<Value> + Send + Sync + 'static,
    {
        self.functions_mut().register(FunctionDef {
            name: name.to_string(),
            min_args,
            max_args,
            implementation: FunctionImpl::contextual(f),
            volatile: false,
        });
    }

    // === Data context ===

    /// Root object binding paths resolve against
    pub fn data_context(&self) -> Option<&Value> {
        self.data_context.as_ref()
    }

    pub fn set_data_context(&mut self, root: impl Into<Value>) {
        self.data_context = Some(root.into());
    }

    pub fn clear_data_context(&mut self) {
        self.data_context = None;
    }

    // === Settings ===

    pub fn culture(&self) -> &Culture {
        &self.culture
    }

    /// Replace the culture; drops cached trees
    pub fn set_culture(&mut self, culture: Culture) {
        self.culture = culture;
        self.clear_cache();
    }

    pub fn options(&self) -> &CalculationOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut CalculationOptions {
        &mut self.options
    }

    /// Extra characters allowed in identifiers
    pub fn identifier_chars(&self) -> &str {
        &self.identifier_chars
    }

    pub fn set_identifier_chars(&mut self, chars: impl Into<String>) {
        self.identifier_chars = chars.into();
        self.clear_cache();
    }

    pub fn optimize_expressions(&self) -> bool {
        self.optimize_expressions
    }

    pub fn set_optimize_expressions(&mut self, optimize: bool) {
        self.optimize_expressions = optimize;
        self.clear_cache();
    }

    pub fn cache_expressions(&self) -> bool {
        self.cache.is_some()
    }

    /// Enable or disable the expression cache; disabling drops it
    pub fn set_cache_expressions(&mut self, enabled: bool) {
        match (enabled, self.cache.is_some()) {
            (true, false) => self.cache = Some(ExpressionCache::new()),
            (false, true) => self.cache = None,
            _ => {}
        }
    }

    pub fn cache(&self) -> Option<&ExpressionCache> {
        self.cache.as_ref()
    }

    fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Install the host hook for external objects
    pub fn set_external_objects<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<Value> + Send + Sync + 'static,
    {
        self.external_objects = Some(Arc::new(lookup));
        self.clear_cache();
    }

    pub fn external_object(&self, name: &str) -> Option<Value> {
        self.external_objects.as_ref().and_then(|lookup| lookup(name))
    }

    // === Parsing ===

    /// Parse an expression; `/* ... */` comments are removed first
    pub fn parse(&self, text: &str) -> CalcResult<Expr> {
        let source = regex!(r"(?s)/\*.*?\*/").replace_all(text, "");
        let expr = parser::parse(self, &source)?;
        log::debug!("parsed expression: {}", text);

        if self.optimize_expressions {
            Ok(expr.optimize(self))
        } else {
            Ok(expr)
        }
    }

    // === Evaluation ===

    /// Evaluate with default options
    pub fn evaluate(&self, text: &str) -> CalcResult<Value> {
        self.evaluate_with(text, EvaluateOptions::default())
    }

    pub fn evaluate_with(&self, text: &str, options: EvaluateOptions) -> CalcResult<Value> {
        let expr = self.resolve_expr(text, options.use_cache)?;
        self.run(&expr, &options, false)
    }

    /// Evaluate an already parsed tree
    pub fn evaluate_expr(&self, expr: &Expr, options: EvaluateOptions) -> CalcResult<Value> {
        self.run(expr, &options, false)
    }

    /// Evaluate and convert the result
    pub fn evaluate_typed<T: FromValue>(&self, text: &str) -> CalcResult<T> {
        self.evaluate_typed_with(text, EvaluateOptions::default())
    }

    pub fn evaluate_typed_with<T: FromValue>(&self, text: &str, options: EvaluateOptions) -> CalcResult<T> {
        convert(self.evaluate_with(text, options)?)
    }

    /// Evaluate, logging and discarding any failure
    pub fn try_evaluate(&self, text: &str) -> Option<Value> {
        match self.evaluate(text) {
            Ok(value) => Some(value),
            Err(e) => {
                log::debug!("try_evaluate of '{}' failed: {}", text, e);
                None
            }
        }
    }

    pub fn try_evaluate_typed<T: FromValue>(&self, text: &str) -> Option<T> {
        match self.evaluate_typed(text) {
            Ok(value) => Some(value),
            Err(e) => {
                log::debug!("try_evaluate_typed of '{}' failed: {}", text, e);
                None
            }
        }
    }

    /// Dry-run an expression: missing data yields placeholders or empty values
    /// instead of binding errors
    ///
    /// Validation never replaces the trace of the last evaluation.
    pub fn validate(&self, text: &str) -> CalcResult<Value> {
        self.validate_with(text, false)
    }

    /// Validate, optionally serving the parsed tree from the cache
    pub fn validate_with(&self, text: &str, use_cache: bool) -> CalcResult<Value> {
        let expr = self.resolve_expr(text, use_cache)?;
        self.run(&expr, &EvaluateOptions::default().with_trace(false), true)
    }

    pub fn validate_typed<T: FromValue>(&self, text: &str) -> CalcResult<T> {
        convert(self.validate(text)?)
    }

    fn resolve_expr(&self, text: &str, use_cache: bool) -> CalcResult<Arc<Expr>> {
        match (&self.cache, use_cache) {
            (Some(cache), true) => cache.get_or_parse(text, |t| self.parse(t)),
            _ => self.parse(text).map(Arc::new),
        }
    }

    fn run(&self, expr: &Expr, options: &EvaluateOptions, validation: bool) -> CalcResult<Value> {
        let ctx = EvalContext::new(self, options, validation);
        let result = evaluate(expr, &ctx);

        let trace = match (ctx.into_trace(), &result) {
            (Some(values), Ok(value)) => Some(Trace::build(expr, &values, value)),
            _ => None,
        };
        if options.record_trace {
            if let Ok(mut last) = self.last_trace.write() {
                *last = trace;
            }
        }
        result
    }

    // === Diagnostics ===

    /// Annotated form of the last traced evaluation
    pub fn parsed_expression(&self) -> Option<String> {
        self.last_trace()
            .map(|trace| trace.expression)
    }

    /// Binding paths and variables read by the last traced evaluation
    pub fn context_bindings(&self) -> BTreeMap<String, Value> {
        self.last_trace()
            .map(|trace| trace.bindings)
            .unwrap_or_default()
    }

    pub fn last_trace(&self) -> Option<Trace> {
        self.last_trace.read().ok()?.clone()
    }
}

fn convert<T: FromValue>(value: Value) -> CalcResult<T> {
    value.convert::<T>().map_err(|_| CalcError::Cast {
        value: value.to_string(),
        kind: value.kind(),
        target: T::TYPE_NAME,
    })
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("variables", &self.variables)
            .field("functions", &self.functions)
            .field("data_context", &self.data_context)
            .field("culture", &self.culture)
            .field("options", &self.options)
            .field("cache_expressions", &self.cache.is_some())
            .finish()
    }
}
