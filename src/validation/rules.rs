use crate::ast::Value;
use crate::compiler::Rule;
use crate::data::Environment;
use crate::error::CustomValidatorError;
use ahash::AHashMap;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// A threshold plus the message shown when it is violated.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint<T> {
    pub value: T,
    pub message: Option<String>,
}

impl<T> Constraint<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct PatternConstraint {
    pub regex: Regex,
    pub message: Option<String>,
}

/// `crossFieldNotEqual`: this field must differ from `other` once both are filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossFieldConstraint {
    pub other: String,
    pub message: Option<String>,
}

pub type PredicateFn =
    dyn Fn(&Value, &Environment) -> Result<bool, CustomValidatorError> + Send + Sync;

/// What a custom constraint runs: a registered Rust predicate or a JSON rule.
#[derive(Clone)]
pub enum CustomCheck {
    Predicate(Arc<PredicateFn>),
    Rule(Rule),
}

#[derive(Clone)]
pub struct CustomConstraint {
    pub name: String,
    pub check: CustomCheck,
    pub message: Option<String>,
}

impl fmt::Debug for CustomConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.check {
            CustomCheck::Predicate(_) => "predicate",
            CustomCheck::Rule(_) => "rule",
        };
        f.debug_struct("CustomConstraint")
            .field("name", &self.name)
            .field("check", &kind)
            .field("message", &self.message)
            .finish()
    }
}

/// Named predicates that configuration can refer to by validation key.
#[derive(Clone, Default)]
pub struct CustomRegistry {
    predicates: AHashMap<String, Arc<PredicateFn>>,
}

impl CustomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&Value, &Environment) -> Result<bool, CustomValidatorError> + Send + Sync + 'static,
    {
        self.predicates.insert(name.into(), Arc::new(predicate));
    }

    pub fn get(&self, name: &str) -> Option<Arc<PredicateFn>> {
        self.predicates.get(name).cloned()
    }
}

impl fmt::Debug for CustomRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.predicates.keys()).finish()
    }
}

/// The declarative constraints of one field.
///
/// The set is unordered; `FieldValidator` applies it in one fixed priority order.
#[derive(Debug, Clone, Default)]
pub struct ValidationRuleSet {
    pub required: Option<Constraint<bool>>,
    pub pattern: Option<PatternConstraint>,
    pub min_length: Option<Constraint<usize>>,
    pub max_length: Option<Constraint<usize>>,
    pub min: Option<Constraint<f64>>,
    pub max: Option<Constraint<f64>>,
    pub min_items: Option<Constraint<usize>>,
    pub max_items: Option<Constraint<usize>>,
    pub min_age: Option<Constraint<u32>>,
    pub not_equal_to: Vec<CrossFieldConstraint>,
    pub custom: Vec<CustomConstraint>,
}

impl ValidationRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_required(&self) -> bool {
        self.required.as_ref().is_some_and(|c| c.value)
    }

    pub fn required(mut self) -> Self {
        self.required = Some(Constraint::new(true));
        self
    }

    pub fn required_with(mut self, message: impl Into<String>) -> Self {
        self.required = Some(Constraint::new(true).with_message(message));
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.min_length = Some(Constraint::new(n));
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = Some(Constraint::new(n));
        self
    }

    pub fn min(mut self, n: f64) -> Self {
        self.min = Some(Constraint::new(n));
        self
    }

    pub fn max(mut self, n: f64) -> Self {
        self.max = Some(Constraint::new(n));
        self
    }

    pub fn min_items(mut self, n: usize) -> Self {
        self.min_items = Some(Constraint::new(n));
        self
    }

    pub fn max_items(mut self, n: usize) -> Self {
        self.max_items = Some(Constraint::new(n));
        self
    }

    pub fn min_age(mut self, years: u32) -> Self {
        self.min_age = Some(Constraint::new(years));
        self
    }

    pub fn pattern(mut self, regex: Regex, message: Option<String>) -> Self {
        self.pattern = Some(PatternConstraint { regex, message });
        self
    }

    pub fn not_equal_to(mut self, other: impl Into<String>, message: Option<String>) -> Self {
        self.not_equal_to.push(CrossFieldConstraint {
            other: other.into(),
            message,
        });
        self
    }

    pub fn custom<F>(mut self, name: impl Into<String>, message: Option<String>, predicate: F) -> Self
    where
        F: Fn(&Value, &Environment) -> Result<bool, CustomValidatorError> + Send + Sync + 'static,
    {
        self.custom.push(CustomConstraint {
            name: name.into(),
            check: CustomCheck::Predicate(Arc::new(predicate)),
            message,
        });
        self
    }

    pub fn custom_rule(mut self, name: impl Into<String>, rule: Rule, message: Option<String>) -> Self {
        self.custom.push(CustomConstraint {
            name: name.into(),
            check: CustomCheck::Rule(rule),
            message,
        });
        self
    }
}
