//! Field validation: declarative constraints, custom predicates and the
//! form-wide sweep used on submit.

use crate::ast::Value;
use crate::data::Environment;
use crate::form::{FieldSpec, FormSpec, StepSpec};
use crate::interpreter::{EvaluationPass, Interpreter};

mod rules;
mod validator;

pub use rules::{
    Constraint, CrossFieldConstraint, CustomCheck, CustomConstraint, CustomRegistry,
    PatternConstraint, PredicateFn, ValidationRuleSet,
};
use validator::FieldValidator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(String),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ValidationOutcome::Valid => None,
            ValidationOutcome::Invalid(message) => Some(message),
        }
    }
}

impl From<Result<(), String>> for ValidationOutcome {
    fn from(result: Result<(), String>) -> Self {
        match result {
            Ok(()) => ValidationOutcome::Valid,
            Err(message) => ValidationOutcome::Invalid(message),
        }
    }
}

/// An error attached to a field key. Array rows use `array.index.item` keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl EvaluationPass<'_> {
    /// Validates a value for `field`. A hidden field is always valid.
    pub fn validate(&self, field: &FieldSpec, value: &Value) -> ValidationOutcome {
        if !self.is_visible(field) {
            return ValidationOutcome::Valid;
        }
        self.validate_shown(field, value)
    }

    /// Validates without consulting visibility; the caller has already decided
    /// the field is shown.
    pub fn validate_shown(&self, field: &FieldSpec, value: &Value) -> ValidationOutcome {
        FieldValidator::new(field, self).check(value).into()
    }

    /// All errors of one field in form context: the field itself, then every
    /// visible item field of every row. Nothing is reported for a hidden field.
    pub fn field_errors(&self, step: &StepSpec, field: &FieldSpec) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if !self.is_field_visible(step, field) {
            return errors;
        }
        let value = self.resolve_str(&field.name);
        if let ValidationOutcome::Invalid(message) = self.validate_shown(field, &value) {
            errors.push(FieldError {
                field: field.name.clone(),
                message,
            });
        }
        if !field.item_fields.is_empty() {
            if let Some(rows) = value.as_array() {
                for (index, row) in rows.iter().enumerate() {
                    self.row_errors(field, index, row, &mut errors);
                }
            }
        }
        errors
    }

    /// Item rules resolve the row's own entries first, so they can name sibling
    /// item fields directly.
    fn row_errors(&self, field: &FieldSpec, index: usize, row: &Value, errors: &mut Vec<FieldError>) {
        let row_pass = self.in_row(row);
        for item in &field.item_fields {
            let value = row.child(&item.name).cloned().unwrap_or_default();
            if let ValidationOutcome::Invalid(message) = row_pass.validate(item, &value) {
                errors.push(FieldError {
                    field: format!("{}.{}.{}", field.name, index, item.name),
                    message,
                });
            }
        }
    }

    /// Every error of every effectively visible field, in configuration order.
    pub fn validate_form(&self, form: &FormSpec) -> Vec<FieldError> {
        form.fields()
            .flat_map(|(step, field)| self.field_errors(step, field))
            .collect()
    }
}

impl Interpreter {
    pub fn validate(&self, field: &FieldSpec, value: &Value, env: &Environment) -> ValidationOutcome {
        self.begin_pass(env).validate(field, value)
    }

    pub fn validate_form(&self, form: &FormSpec, env: &Environment) -> Vec<FieldError> {
        self.begin_pass(env).validate_form(form)
    }
}
