use super::rules::{Constraint, CustomCheck, CustomConstraint, PredicateFn};
use crate::ast::Value;
use crate::form::{FieldKind, FieldSpec};
use crate::interpreter::{EvaluationPass, parse_date, whole_years_between};
use regex::Regex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::LazyLock;
use tracing::warn;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern is valid")
});

type Check = Result<(), String>;

/// Checks one value against one field's rule set.
///
/// Each stage returns `Err(message)` on the first violation, so the order of
/// the `?` chain in `check` is the reporting priority.
pub(crate) struct FieldValidator<'f, 'p> {
    field: &'f FieldSpec,
    pass: &'f EvaluationPass<'p>,
}

impl<'f, 'p> FieldValidator<'f, 'p> {
    pub(crate) fn new(field: &'f FieldSpec, pass: &'f EvaluationPass<'p>) -> Self {
        Self { field, pass }
    }

    pub(crate) fn check(&self, value: &Value) -> Check {
        if self.field.kind == FieldKind::Label {
            return Ok(());
        }
        let empty = self.is_empty(value);
        self.check_required(empty)?;
        if !empty {
            self.check_format(value)?;
        }
        self.check_cardinality(value)?;
        self.check_cross_field(value)?;
        self.check_custom(value)
    }

    fn label(&self) -> &str {
        if self.field.label.is_empty() {
            &self.field.name
        } else {
            &self.field.label
        }
    }

    fn is_empty(&self, value: &Value) -> bool {
        match self.field.kind {
            FieldKind::Checkbox => *value != Value::Bool(true),
            _ => value.is_blank(),
        }
    }

    fn check_required(&self, empty: bool) -> Check {
        match &self.field.validation.required {
            Some(required) if required.value && empty => Err(required
                .message
                .clone()
                .unwrap_or_else(|| format!("{} is required", self.label()))),
            _ => Ok(()),
        }
    }

    fn check_format(&self, value: &Value) -> Check {
        let rules = &self.field.validation;

        if self.field.kind == FieldKind::Email {
            let text = value.as_text().unwrap_or_default();
            if !EMAIL_REGEX.is_match(text.trim()) {
                return Err("Please enter a valid email address".to_string());
            }
        }

        if self.field.kind == FieldKind::Number || rules.min.is_some() || rules.max.is_some() {
            let n = value.to_number();
            if n.is_nan() {
                return Err(format!("{} must be a number", self.label()));
            }
            if let Some(min) = &rules.min {
                if n < min.value {
                    return Err(message_or(min, || {
                        format!("{} must be at least {}", self.label(), Value::Number(min.value))
                    }));
                }
            }
            if let Some(max) = &rules.max {
                if n > max.value {
                    return Err(message_or(max, || {
                        format!("{} must be at most {}", self.label(), Value::Number(max.value))
                    }));
                }
            }
        }

        if self.field.kind == FieldKind::Date {
            let Some(date) = parse_date(value) else {
                return Err(format!("{} must be a valid date", self.label()));
            };
            if let Some(min_age) = &rules.min_age {
                let age = whole_years_between(date, self.pass.today());
                if age < 0 || (age as u32) < min_age.value {
                    return Err(message_or(min_age, || {
                        format!("You must be at least {} years old", min_age.value)
                    }));
                }
            }
        }

        if let Some(text) = value.as_text() {
            let length = text.chars().count();
            if let Some(min_length) = &rules.min_length {
                if length < min_length.value {
                    return Err(message_or(min_length, || {
                        format!(
                            "{} must be at least {} characters",
                            self.label(),
                            min_length.value
                        )
                    }));
                }
            }
            if let Some(max_length) = &rules.max_length {
                if length > max_length.value {
                    return Err(message_or(max_length, || {
                        format!(
                            "{} must be at most {} characters",
                            self.label(),
                            max_length.value
                        )
                    }));
                }
            }
            if let Some(pattern) = &rules.pattern {
                if !pattern.regex.is_match(&text) {
                    return Err(pattern
                        .message
                        .clone()
                        .unwrap_or_else(|| format!("{} is not in the expected format", self.label())));
                }
            }
        }

        Ok(())
    }

    /// Item counts apply to empty collections too: `minItems: 1` on an empty
    /// array fails even when the field is not required.
    fn check_cardinality(&self, value: &Value) -> Check {
        if !self.field.kind.is_collection() {
            return Ok(());
        }
        let rules = &self.field.validation;
        let count = value.as_array().map_or(0, <[Value]>::len);
        if let Some(min_items) = &rules.min_items {
            if count < min_items.value {
                return Err(message_or(min_items, || {
                    format!("{} needs at least {} item(s)", self.label(), min_items.value)
                }));
            }
        }
        if let Some(max_items) = &rules.max_items {
            if count > max_items.value {
                return Err(message_or(max_items, || {
                    format!("{} allows at most {} item(s)", self.label(), max_items.value)
                }));
            }
        }
        Ok(())
    }

    /// Fires only when both sides are filled in and equal; a blank side never
    /// triggers it.
    fn check_cross_field(&self, value: &Value) -> Check {
        for constraint in &self.field.validation.not_equal_to {
            let other = self.pass.resolve_str(&constraint.other);
            if value.is_blank() || other.is_blank() {
                continue;
            }
            if same_entry(value, &other) {
                return Err(constraint.message.clone().unwrap_or_else(|| {
                    format!("{} must be different from {}", self.label(), constraint.other)
                }));
            }
        }
        Ok(())
    }

    fn check_custom(&self, value: &Value) -> Check {
        for constraint in &self.field.validation.custom {
            if !self.run_custom(constraint, value) {
                return Err(constraint
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("{} is invalid", self.label())));
            }
        }
        Ok(())
    }

    /// A predicate that errors or panics counts as failed.
    fn run_custom(&self, constraint: &CustomConstraint, value: &Value) -> bool {
        match &constraint.check {
            CustomCheck::Predicate(predicate) => {
                let predicate: &PredicateFn = &**predicate;
                let env = self.pass.env();
                match panic::catch_unwind(AssertUnwindSafe(|| predicate(value, env))) {
                    Ok(Ok(passed)) => passed,
                    Ok(Err(error)) => {
                        warn!(field = %self.field.name, validator = %constraint.name, %error, "custom validator failed");
                        false
                    }
                    Err(_) => {
                        warn!(field = %self.field.name, validator = %constraint.name, "custom validator panicked");
                        false
                    }
                }
            }
            CustomCheck::Rule(rule) => match self.pass.evaluate_rule(rule) {
                Ok(outcome) => outcome.is_truthy(),
                Err(error) => {
                    warn!(field = %self.field.name, validator = %constraint.name, %error, "custom rule is broken");
                    false
                }
            },
        }
    }
}

fn message_or<T>(constraint: &Constraint<T>, default: impl FnOnce() -> String) -> String {
    constraint.message.clone().unwrap_or_else(default)
}

/// Text compares after trimming so that `"123 "` and `"123"` collide.
fn same_entry(a: &Value, b: &Value) -> bool {
    match (a.as_text(), b.as_text()) {
        (Some(a), Some(b)) => a.trim() == b.trim(),
        _ => a == b,
    }
}
