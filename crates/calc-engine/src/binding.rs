//! Binding path resolution
//!
//! Walks the steps of a [`BindingPath`] from the engine's data context,
//! reading one member per step and applying the step's indexer, if any.

use crate::ast::{BindingPath, BindingStep};
use crate::error::{BindingError, BindingErrorKind, CalcError, CalcResult};
use crate::evaluator::{evaluate, to_number, EvalContext};
use calc_engine_core::{ContainerKind, DataObject, Value};
use std::sync::Arc;

/// Resolve a binding path against the current data context
///
/// Strict evaluation raises every [`BindingError`]. With
/// `throw_on_binding_error` off, a failing path yields an empty value. In
/// validation mode only structural errors (unknown members) are raised.
pub(crate) fn resolve(path: &BindingPath, ctx: &EvalContext<'_>) -> CalcResult<Value> {
    let result = match ctx.engine().data_context() {
        Some(root) => Walk { path, ctx }.run(root.clone()),
        None => Err(BindingError::new(
            BindingErrorKind::NoDataContext,
            &path.text,
            &path.text,
            format!("No data context to resolve '{}'", path.text),
        )
        .into()),
    };

    match result {
        Err(CalcError::Binding(e)) if degrades(&e, ctx) => {
            log::debug!("binding path '{}' resolved to empty: {}", path.text, e.message);
            Ok(Value::Empty)
        }
        other => other,
    }
}

fn degrades(e: &BindingError, ctx: &EvalContext<'_>) -> bool {
    if ctx.in_validation() {
        e.kind != BindingErrorKind::UnknownMember
    } else {
        !ctx.throw_on_binding_error()
    }
}

struct Walk<'p, 'c, 'e> {
    path: &'p BindingPath,
    ctx: &'c EvalContext<'e>,
}

impl Walk<'_, '_, '_> {
    fn run(&self, root: Value) -> CalcResult<Value> {
        let mut current = root;

        for (i, step) in self.path.steps.iter().enumerate() {
            if current.is_empty() {
                if self.ctx.in_validation() {
                    log::debug!("no placeholder for '{}', path yields empty", self.marked(i));
                    return Ok(Value::Empty);
                }
                return Err(self.error(
                    BindingErrorKind::NullValue,
                    i,
                    format!("Binding path invalid (value is null): {}", self.marked(i)),
                ));
            }

            let mut value = self.member(i, step, &current)?;

            if value.is_empty() && self.ctx.in_validation() {
                if let Some(placeholder) = current.as_object().and_then(|obj| {
                    obj.find_member(&step.name)
                        .and_then(|id| obj.member_placeholder(id))
                }) {
                    log::debug!("placeholder synthesized for '{}'", self.marked(i));
                    value = placeholder;
                }
            }

            if let Some(args) = step.indexer() {
                let mut keys = Vec::with_capacity(args.len());
                for arg in args {
                    keys.push(evaluate(arg, self.ctx)?);
                }
                value = self.index(i, step, value, keys)?;
            }

            log::trace!("binding step '{}' -> {:?}", step.name, value);
            current = value;
        }

        Ok(current)
    }

    /// Read the step's member from `current`
    fn member(&self, i: usize, step: &BindingStep, current: &Value) -> CalcResult<Value> {
        match current {
            Value::Object(obj) => self.object_member(i, step, obj),
            Value::String(s) if step.name.eq_ignore_ascii_case("length") => {
                Ok(Value::from(s.chars().count()))
            }
            Value::Array(items)
                if step.name.eq_ignore_ascii_case("count")
                    || step.name.eq_ignore_ascii_case("length") =>
            {
                Ok(Value::from(items.len()))
            }
            // Members of a sequence project over its items
            Value::Array(items) => {
                let mut projected = Vec::with_capacity(items.len());
                for item in items {
                    projected.push(match item {
                        Value::Empty => Value::Empty,
                        item => self.member(i, step, item)?,
                    });
                }
                Ok(Value::Array(projected))
            }
            other => Err(self.unknown_member(i, step, other.type_name())),
        }
    }

    fn object_member(
        &self,
        i: usize,
        step: &BindingStep,
        obj: &Arc<dyn DataObject>,
    ) -> CalcResult<Value> {
        let type_name = obj.type_name();
        let id = match step.cached_member(type_name) {
            Some(id) => id,
            None => {
                let id = obj
                    .find_member(&step.name)
                    .ok_or_else(|| self.unknown_member(i, step, type_name))?;
                step.remember_member(type_name, id);
                id
            }
        };
        obj.member_value(id)
            .ok_or_else(|| self.unknown_member(i, step, type_name))
    }

    /// Apply the step's indexer to the member value
    fn index(&self, i: usize, step: &BindingStep, container: Value, keys: Vec<Value>) -> CalcResult<Value> {
        if self.ctx.in_validation() {
            let placeholder = container
                .as_object()
                .and_then(|obj| obj.element_placeholder())
                .unwrap_or_default();
            log::debug!("indexer on '{}' replaced by a placeholder", self.marked(i));
            return Ok(placeholder);
        }

        match container {
            Value::Array(items) => {
                let position = match keys.as_slice() {
                    [key] => to_number(key)?,
                    _ => return Err(self.not_indexable(i, step, "Array")),
                };
                let found = (position >= 0.0 && position.fract() == 0.0)
                    .then(|| items.get(position as usize))
                    .flatten();
                found.cloned().ok_or_else(|| {
                    self.error(
                        BindingErrorKind::IndexOutOfRange,
                        i,
                        format!(
                            "Index {} is out of range for '{}' ({} items) in path '{}'",
                            position,
                            step.name,
                            items.len(),
                            self.marked(i)
                        ),
                    )
                })
            }
            Value::Object(obj) => self.index_object(i, step, &obj, keys),
            Value::Empty => Err(self.error(
                BindingErrorKind::NullValue,
                i,
                format!("Binding path invalid (value is null): {}", self.marked(i)),
            )),
            other => Err(self.not_indexable(i, step, other.type_name())),
        }
    }

    fn index_object(
        &self,
        i: usize,
        step: &BindingStep,
        obj: &Arc<dyn DataObject>,
        keys: Vec<Value>,
    ) -> CalcResult<Value> {
        let keys = match obj.key_kind() {
            Some(kind) => keys
                .iter()
                .map(|k| k.coerce_to(kind))
                .collect::<Result<Vec<_>, _>>()?,
            None => keys,
        };

        match obj.container_kind() {
            ContainerKind::Sequence => obj.get_indexed(&keys).ok_or_else(|| {
                self.error(
                    BindingErrorKind::IndexOutOfRange,
                    i,
                    format!(
                        "Index '{}' is out of range for '{}' ({}) in path '{}'",
                        join_keys(&keys),
                        step.name,
                        obj.describe(),
                        self.marked(i)
                    ),
                )
            }),
            ContainerKind::Associative => {
                if obj.contains_key(&keys) {
                    return Ok(obj.get_indexed(&keys).unwrap_or_default());
                }
                if !self.ctx.throw_on_binding_error() {
                    if let Some(placeholder) = obj.element_placeholder() {
                        log::debug!("missing key in '{}' replaced by a placeholder", self.marked(i));
                        return Ok(placeholder);
                    }
                }
                Err(self.error(
                    BindingErrorKind::MissingKey,
                    i,
                    format!(
                        "'{}' in path '{}' ({}) has no key(s) '{}'",
                        step.name,
                        self.marked(i),
                        obj.describe(),
                        join_keys(&keys)
                    ),
                ))
            }
            ContainerKind::Scalar => obj
                .get_indexed(&keys)
                .ok_or_else(|| self.not_indexable(i, step, obj.type_name())),
        }
    }

    /// The path with step `i` bracketed, e.g. `Parent.[Children(2)].Name`
    fn marked(&self, i: usize) -> String {
        self.path
            .steps
            .iter()
            .enumerate()
            .map(|(j, step)| {
                if j == i {
                    format!("[{}]", step)
                } else {
                    step.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    fn error(&self, kind: BindingErrorKind, i: usize, message: String) -> CalcError {
        let segment = self
            .path
            .steps
            .get(i)
            .map(ToString::to_string)
            .unwrap_or_default();
        BindingError::new(kind, &self.path.text, segment, message).into()
    }

    fn unknown_member(&self, i: usize, step: &BindingStep, type_name: &str) -> CalcError {
        self.error(
            BindingErrorKind::UnknownMember,
            i,
            format!(
                "'{}' is not a valid property of {} in path '{}'",
                step.name,
                type_name,
                self.marked(i)
            ),
        )
    }

    fn not_indexable(&self, i: usize, step: &BindingStep, type_name: &str) -> CalcError {
        self.error(
            BindingErrorKind::UnknownMember,
            i,
            format!(
                "'{}' ({}) cannot be indexed in path '{}'",
                step.name,
                type_name,
                self.marked(i)
            ),
        )
    }
}

fn join_keys(keys: &[Value]) -> String {
    keys.iter()
        .map(Value::as_string)
        .collect::<Vec<_>>()
        .join("; ")
}
