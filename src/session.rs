//! Interactive form state: values, touched flags, visibility and errors.
//!
//! Every mutation runs one synchronous pass: the evaluation date is read once,
//! affected fields are re-evaluated in dependency order and the caller gets a
//! `ChangeSet` describing what the presentation layer has to do.

use crate::ast::{Value, VariablePath};
use crate::data::Environment;
use crate::dependency::{DependencyGraph, owning_field};
use crate::form::{FieldKind, FieldSpec, FormSpec};
use crate::interpreter::{EvaluationPass, Interpreter};
use crate::validation::FieldError;
use ahash::{AHashMap, AHashSet};
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, trace};

/// One thing the presentation layer must apply after a mutation.
///
/// Array item fields are addressed as `array.index.item`.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Hidden { field: String },
    Shown { field: String },
    /// The field was reset to `value`, the empty value of its kind.
    ClearValue { field: String, value: Value },
    ClearError { field: String },
    Computed { field: String, value: Value },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub directives: Vec<Directive>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    pub fn hidden(&self) -> impl Iterator<Item = &str> {
        self.directives.iter().filter_map(|d| match d {
            Directive::Hidden { field } => Some(field.as_str()),
            _ => None,
        })
    }

    pub fn shown(&self) -> impl Iterator<Item = &str> {
        self.directives.iter().filter_map(|d| match d {
            Directive::Shown { field } => Some(field.as_str()),
            _ => None,
        })
    }

    fn push(&mut self, directive: Directive) {
        self.directives.push(directive);
    }
}

/// The accepted payload: visible, value-carrying fields only.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl Submission {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(self.payload.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("submission blocked by {} invalid field(s); first is '{first_invalid}'", .errors.len())]
pub struct SubmitRejection {
    /// Where focus should move.
    pub first_invalid: String,
    pub errors: Vec<FieldError>,
}

impl EvaluationPass<'_> {
    /// Values of every effectively visible field that carries one, in JSON form.
    pub fn visible_payload(&self, form: &FormSpec) -> serde_json::Map<String, serde_json::Value> {
        form.fields()
            .filter(|(_, field)| field.kind.carries_value())
            .filter(|(step, field)| self.is_field_visible(step, field))
            .map(|(_, field)| (field.name.clone(), self.payload_value(field)))
            .collect()
    }

    /// Array rows keep only the entries of their visible, value-carrying items.
    fn payload_value(&self, field: &FieldSpec) -> serde_json::Value {
        let value = self.resolve_str(&field.name);
        let Value::Array(rows) = &value else {
            return value.to_json();
        };
        if field.item_fields.is_empty() {
            return value.to_json();
        }
        let rows = rows
            .iter()
            .map(|row| {
                let Value::Object(entries) = row else {
                    return row.to_json();
                };
                let row_pass = self.in_row(row);
                let dropped: Vec<&str> = field
                    .item_fields
                    .iter()
                    .filter(|item| !item.kind.carries_value() || !row_pass.is_visible(*item))
                    .map(|item| item.name.as_str())
                    .collect();
                serde_json::Value::Object(
                    entries
                        .iter()
                        .filter(|(key, _)| !dropped.contains(&key.as_str()))
                        .map(|(key, value)| (key.clone(), value.to_json()))
                        .collect(),
                )
            })
            .collect();
        serde_json::Value::Array(rows)
    }
}

#[derive(Debug, Clone)]
pub struct FormSession {
    form: Arc<FormSpec>,
    interpreter: Interpreter,
    graph: DependencyGraph,
    initial: Environment,
    values: Environment,
    visible: AHashMap<String, bool>,
    errors: AHashMap<String, String>,
    touched: AHashSet<String>,
    submitted: bool,
}

impl FormSession {
    pub fn new(form: impl Into<Arc<FormSpec>>, interpreter: Interpreter) -> Self {
        Self::with_values(form, interpreter, Environment::new())
    }

    /// Starts a session from pre-filled values. Fields missing from `values`
    /// start at the empty value of their kind.
    pub fn with_values(form: impl Into<Arc<FormSpec>>, interpreter: Interpreter, values: Environment) -> Self {
        let form = form.into();
        let mut initial = values;
        for (_, field) in form.fields() {
            if field.kind.carries_value() && !initial.contains(&field.name) {
                initial.set(field.name.clone(), field.kind.empty_value());
            }
        }
        let graph = DependencyGraph::build(&form);
        let mut session = Self {
            form,
            interpreter,
            graph,
            values: initial.clone(),
            initial,
            visible: AHashMap::new(),
            errors: AHashMap::new(),
            touched: AHashSet::new(),
            submitted: false,
        };
        session.refresh_all();
        session
    }

    pub fn form(&self) -> &FormSpec {
        &self.form
    }

    pub fn values(&self) -> &Environment {
        &self.values
    }

    pub fn value(&self, name: &str) -> Value {
        self.values.resolve_str(name)
    }

    /// Records a user edit and re-evaluates everything that depends on it.
    ///
    /// `name` is a field name or a dotted path into an array row
    /// (`"employers.0.name"`), which edits the row in place. A value written to
    /// a hidden field does not stick: it is reset to the field's empty value.
    pub fn set_value(&mut self, name: &str, value: impl Into<Value>) -> ChangeSet {
        let value = value.into();
        let mut changes = ChangeSet::default();
        let form = Arc::clone(&self.form);
        let path = VariablePath::parse(name);
        let Some(owner) = owning_field(&path, &form) else {
            debug!(field = name, "storing value for undeclared field without a recompute pass");
            self.values.set(name, value);
            return changes;
        };

        if owner == name {
            self.values.set(name, value);
        } else {
            let depth = VariablePath::parse(owner).segments().len();
            let mut current = self.values.resolve_str(owner);
            if !current.set_path(&path.segments()[depth..], value) {
                debug!(field = name, owner, "path does not address a row entry; ignoring");
                return changes;
            }
            self.values.set(owner, current);
        }

        let today = self.interpreter.today();
        let affected: Vec<String> = self
            .graph
            .affected_by(owner)
            .into_iter()
            .map(str::to_string)
            .collect();
        trace!(field = owner, affected = ?affected, "recompute pass");
        self.refresh_field(owner, today, &mut changes);
        for field in &affected {
            self.refresh_field(field, today, &mut changes);
        }
        changes
    }

    /// Marks a field as interacted with, so its error starts being shown.
    pub fn touch(&mut self, name: &str) {
        self.touched.insert(name.to_string());
    }

    pub fn is_touched(&self, name: &str) -> bool {
        self.touched.contains(name)
    }

    /// The error to display: only once the field was touched or a submit was attempted.
    pub fn field_error(&self, name: &str) -> Option<&str> {
        let owner = name.split('.').next().unwrap_or(name);
        if self.submitted || self.touched.contains(name) || self.touched.contains(owner) {
            self.error(name)
        } else {
            None
        }
    }

    /// The current validation error regardless of interaction state.
    pub fn error(&self, name: &str) -> Option<&str> {
        self.errors.get(name).map(String::as_str)
    }

    pub fn errors(&self) -> impl Iterator<Item = (&str, &str)> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn is_visible(&self, name: &str) -> bool {
        self.visible.get(name).copied().unwrap_or(false)
    }

    pub fn is_step_visible(&self, id: &str) -> bool {
        self.form
            .step(id)
            .is_some_and(|step| self.interpreter.begin_pass(&self.values).is_visible(step))
    }

    /// Ids of the steps currently shown, in order.
    pub fn visible_steps(&self) -> Vec<&str> {
        let pass = self.interpreter.begin_pass(&self.values);
        self.form
            .steps()
            .iter()
            .filter(|step| pass.is_visible(*step))
            .map(|step| step.id.as_str())
            .collect()
    }

    /// Validates every visible field. On success returns the payload of
    /// visible fields; otherwise all errors plus the field to focus.
    pub fn submit(&mut self) -> Result<Submission, SubmitRejection> {
        self.submitted = true;
        self.refresh_all();

        let pass = self.interpreter.begin_pass(&self.values);
        let errors = pass.validate_form(&self.form);
        if let Some(first) = errors.first() {
            info!(invalid = errors.len(), first = %first.field, "submission rejected");
            return Err(SubmitRejection {
                first_invalid: first.field.clone(),
                errors,
            });
        }
        let payload = pass.visible_payload(&self.form);
        info!(fields = payload.len(), "submission accepted");
        Ok(Submission { payload })
    }

    /// Back to the initial values, with no touched fields and no submit attempt.
    pub fn reset(&mut self) {
        self.values = self.initial.clone();
        self.visible.clear();
        self.errors.clear();
        self.touched.clear();
        self.submitted = false;
        self.refresh_all();
    }

    /// Full pass over every field in evaluation order. Transitions are applied
    /// but not reported.
    fn refresh_all(&mut self) {
        let today = self.interpreter.today();
        let order: Vec<String> = self.graph.order().to_vec();
        let mut discarded = ChangeSet::default();
        for name in &order {
            self.refresh_field(name, today, &mut discarded);
        }
    }

    fn refresh_field(&mut self, name: &str, today: NaiveDate, changes: &mut ChangeSet) {
        let form = Arc::clone(&self.form);
        let Some((step, field)) = form.locate(name) else {
            return;
        };

        let (visible, computed) = {
            let pass = self.interpreter.begin_pass_at(&self.values, today);
            let visible = pass.is_field_visible(step, field);
            let computed = (visible && field.computed.is_some()).then(|| pass.recompute(field));
            (visible, computed)
        };

        if let Some(value) = computed {
            if self.values.get(name) != Some(&value) {
                self.values.set(name, value.clone());
                changes.push(Directive::Computed {
                    field: name.to_string(),
                    value,
                });
            }
        }

        let current = self.values.resolve_str(name);
        if let Some(empty) = self.settle(name, field.kind, &current, visible, changes) {
            self.values.set(name, empty);
        }

        if visible {
            self.refresh_rows(field, today, changes);
            self.revalidate(name, today);
        } else {
            self.clear_errors(name);
            let prefix = format!("{name}.");
            self.visible.retain(|key, _| !key.starts_with(&prefix));
        }
    }

    /// Item visibility per array row, keyed `array.index.item`. Rows are read
    /// with their own entries in scope, like row validation.
    fn refresh_rows(&mut self, field: &FieldSpec, today: NaiveDate, changes: &mut ChangeSet) {
        if field.item_fields.is_empty() {
            return;
        }
        let Value::Array(mut rows) = self.values.resolve_str(&field.name) else {
            return;
        };

        // Forget rows that no longer exist.
        let prefix = format!("{}.", field.name);
        let row_count = rows.len();
        self.visible.retain(|key, _| {
            key.strip_prefix(&prefix)
                .and_then(|rest| rest.split('.').next())
                .and_then(|index| index.parse::<usize>().ok())
                .is_none_or(|index| index < row_count)
        });

        let mut rewritten = false;
        for index in 0..rows.len() {
            for item in &field.item_fields {
                let key = format!("{}.{}.{}", field.name, index, item.name);
                let visible = self
                    .interpreter
                    .begin_pass_at(&self.values, today)
                    .in_row(&rows[index])
                    .is_visible(item);
                let current = rows[index].child(&item.name).cloned().unwrap_or_default();
                if let Some(empty) = self.settle(&key, item.kind, &current, visible, changes) {
                    rewritten |= rows[index].set_path(std::slice::from_ref(&item.name), empty);
                }
            }
        }
        if rewritten {
            self.values.set(field.name.clone(), Value::Array(rows));
        }
    }

    /// Records the visibility of `key` and reports any transition. Returns the
    /// empty value to store when a hidden target carries a value: always on the
    /// first evaluation and on hiding, and afterwards whenever something was
    /// written to it while hidden.
    fn settle(
        &mut self,
        key: &str,
        kind: FieldKind,
        current: &Value,
        visible: bool,
        changes: &mut ChangeSet,
    ) -> Option<Value> {
        let was_visible = self.visible.insert(key.to_string(), visible);
        if visible {
            if was_visible == Some(false) {
                changes.push(Directive::Shown {
                    field: key.to_string(),
                });
            }
            return None;
        }

        let empty = kind.empty_value();
        let stale = !current.is_blank() && *current != empty;
        let cleared = (kind.carries_value() && (was_visible != Some(false) || stale)).then_some(empty);
        match was_visible {
            Some(true) => {
                changes.push(Directive::Hidden {
                    field: key.to_string(),
                });
                if let Some(value) = &cleared {
                    changes.push(Directive::ClearValue {
                        field: key.to_string(),
                        value: value.clone(),
                    });
                }
                self.touched.remove(key);
                self.clear_errors(key);
                changes.push(Directive::ClearError {
                    field: key.to_string(),
                });
            }
            Some(false) => {
                if let Some(value) = &cleared {
                    changes.push(Directive::ClearValue {
                        field: key.to_string(),
                        value: value.clone(),
                    });
                }
            }
            None => {}
        }
        cleared
    }

    /// Recomputes the stored errors of one field and its array rows.
    fn revalidate(&mut self, name: &str, today: NaiveDate) {
        let form = Arc::clone(&self.form);
        let Some((step, field)) = form.locate(name) else {
            return;
        };
        let errors = self.interpreter.begin_pass_at(&self.values, today).field_errors(step, field);
        self.clear_errors(name);
        for error in errors {
            self.errors.insert(error.field, error.message);
        }
    }

    /// Drops the errors of `name` and of its `name.index.item` rows.
    fn clear_errors(&mut self, name: &str) {
        let prefix = format!("{name}.");
        self.errors
            .retain(|key, _| key != name && !key.starts_with(&prefix));
    }
}
