use super::config::{
    RawConstraint, RawCrossField, RawCustomRule, RawField, RawFormConfig, RawOption, RawRequired,
    RawStep, RawToggle,
};
use super::definition::{DEFAULT_STEP_ID, FieldKind, FieldOption, FieldSpec, FormSpec, StepSpec};
use crate::ast::Value;
use crate::compiler::Rule;
use crate::data::Environment;
use crate::error::{ConfigError, ConfigShapeError, CustomValidatorError};
use crate::interpreter::Interpreter;
use crate::validation::{
    Constraint, CrossFieldConstraint, CustomCheck, CustomConstraint, CustomRegistry,
    PatternConstraint, ValidationRuleSet,
};
use ahash::AHashSet;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use std::fs;
use tracing::{debug, info, warn};

/// A loaded form plus every per-field problem that was skipped over.
#[derive(Debug, Clone)]
pub struct FormLoad {
    pub form: FormSpec,
    pub issues: Vec<ConfigShapeError>,
}

/// The conversion seam between a configuration format and `FormSpec`.
///
/// Implement this for your own configuration structs to load them through the
/// same rule compiler and custom validator registry.
pub trait IntoFormSpec {
    fn into_form_spec(self, loader: &FormLoader<'_>) -> Result<FormLoad, ConfigError>;
}

/// Builds a `FormSpec` from JSON, compiling every rule with one interpreter.
pub struct FormLoader<'a> {
    interpreter: &'a Interpreter,
    custom: CustomRegistry,
}

impl<'a> FormLoader<'a> {
    pub fn new(interpreter: &'a Interpreter) -> Self {
        Self {
            interpreter,
            custom: CustomRegistry::new(),
        }
    }

    /// Registers a predicate that configuration can enable by name, e.g.
    /// `"validation": { "validSsn": "Enter a valid SSN" }`.
    pub fn with_custom_validator<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value, &Environment) -> Result<bool, CustomValidatorError> + Send + Sync + 'static,
    {
        self.custom.register(name, predicate);
        self
    }

    pub fn with_registry(mut self, registry: CustomRegistry) -> Self {
        self.custom = registry;
        self
    }

    pub fn interpreter(&self) -> &Interpreter {
        self.interpreter
    }

    pub fn load<T: IntoFormSpec>(&self, config: T) -> Result<FormLoad, ConfigError> {
        config.into_form_spec(self)
    }

    pub fn load_str(&self, json: &str) -> Result<FormLoad, ConfigError> {
        let raw: RawFormConfig = serde_json::from_str(json)?;
        self.load(raw)
    }

    pub fn load_json(&self, json: Json) -> Result<FormLoad, ConfigError> {
        let raw: RawFormConfig = serde_json::from_value(json)?;
        self.load(raw)
    }

    pub fn load_file(&self, path: &str) -> Result<FormLoad, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        self.load_str(&content)
    }

    fn compile_conditions(&self, owner: &str, json: &Json) -> Rule {
        let rule = self.interpreter.compiler().compile_conditions(json);
        if let Err(error) = rule.expression() {
            warn!(owner, %error, "condition does not compile; it will be treated as visible");
        }
        rule
    }

    fn compile_rule(&self, owner: &str, json: &Json) -> Rule {
        let rule = self.interpreter.compiler().compile_rule(json);
        if let Err(error) = rule.expression() {
            warn!(owner, %error, "rule does not compile");
        }
        rule
    }

    /// Converts the field entries of one step, skipping the broken ones.
    fn convert_fields(
        &self,
        step: &str,
        entries: Vec<Json>,
        seen: &mut AHashSet<String>,
        issues: &mut Vec<ConfigShapeError>,
    ) -> Vec<FieldSpec> {
        let mut fields = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match self.convert_field(step, index, entry, issues) {
                Ok(field) => {
                    if !seen.insert(field.name.clone()) {
                        warn!(step, index, field = %field.name, "skipping duplicate field");
                        issues.push(ConfigShapeError::DuplicateField { field: field.name });
                        continue;
                    }
                    fields.push(field);
                }
                Err(issue) => {
                    warn!(step, index, %issue, "skipping field");
                    issues.push(issue);
                }
            }
        }
        fields
    }

    fn convert_field(
        &self,
        step: &str,
        index: usize,
        entry: Json,
        issues: &mut Vec<ConfigShapeError>,
    ) -> Result<FieldSpec, ConfigShapeError> {
        let raw: RawField =
            serde_json::from_value(entry).map_err(|e| ConfigShapeError::Unreadable {
                step: step.to_string(),
                index,
                message: e.to_string(),
            })?;
        let missing = |key: &'static str| ConfigShapeError::MissingKey {
            step: step.to_string(),
            index,
            key,
        };
        let name = raw.name.ok_or_else(|| missing("name"))?;
        let type_name = raw.kind.ok_or_else(|| missing("type"))?;
        let label = raw.label.ok_or_else(|| missing("label"))?;
        let kind: FieldKind = type_name
            .parse()
            .map_err(|type_name| ConfigShapeError::UnknownFieldType {
                field: name.clone(),
                type_name,
            })?;

        let mut validation = match raw.validation {
            Some(map) => self.convert_validation(&name, map, issues)?,
            None => ValidationRuleSet::default(),
        };
        if validation.required.is_none() {
            if let Some(required) = raw.required {
                validation.required = Some(parse_required(&name, "required", required)?);
            }
        }
        if validation.min_items.is_none() {
            if let Some(json) = raw.min_items {
                validation.min_items = Some(parse_constraint(&name, "minItems", json)?);
            }
        }
        if validation.max_items.is_none() {
            if let Some(json) = raw.max_items {
                validation.max_items = Some(parse_constraint(&name, "maxItems", json)?);
            }
        }

        let item_step = format!("{name}.items");
        let mut item_names = AHashSet::new();
        let item_fields = self.convert_fields(&item_step, raw.array_item_fields, &mut item_names, issues);

        let options = raw
            .options
            .into_iter()
            .map(|option| match option {
                RawOption::Labeled { label, value } => FieldOption {
                    label,
                    value: Value::from(value),
                },
                RawOption::Plain(value) => {
                    let value = Value::from(value);
                    FieldOption {
                        label: value.to_string(),
                        value,
                    }
                }
            })
            .collect();

        let visibility = raw
            .conditions
            .as_ref()
            .map(|json| self.compile_conditions(&name, json));
        let computed = raw.computed.as_ref().map(|json| self.compile_rule(&name, json));

        debug!(field = %name, %kind, "loaded field");
        Ok(FieldSpec {
            name,
            kind,
            label,
            visibility,
            validation,
            options,
            item_fields,
            computed,
        })
    }

    fn convert_validation(
        &self,
        field: &str,
        map: serde_json::Map<String, Json>,
        issues: &mut Vec<ConfigShapeError>,
    ) -> Result<ValidationRuleSet, ConfigShapeError> {
        let mut rules = ValidationRuleSet::default();
        for (key, json) in map {
            match key.as_str() {
                "required" => rules.required = Some(parse_required(field, &key, json)?),
                "minLength" => rules.min_length = Some(parse_constraint(field, &key, json)?),
                "maxLength" => rules.max_length = Some(parse_constraint(field, &key, json)?),
                "min" => rules.min = Some(parse_constraint(field, &key, json)?),
                "max" => rules.max = Some(parse_constraint(field, &key, json)?),
                "minItems" => rules.min_items = Some(parse_constraint(field, &key, json)?),
                "maxItems" => rules.max_items = Some(parse_constraint(field, &key, json)?),
                "minAge" => rules.min_age = Some(parse_constraint(field, &key, json)?),
                "pattern" | "matches" => {
                    let (source, message) = parse_raw::<RawConstraint<String>>(field, &key, json)?.into_parts();
                    // A pattern the regex engine rejects is dropped; the field stays.
                    match Regex::new(&source) {
                        Ok(regex) => rules.pattern = Some(PatternConstraint { regex, message }),
                        Err(e) => {
                            warn!(field, pattern = %source, "dropping pattern the regex engine rejects");
                            issues.push(ConfigShapeError::InvalidPattern {
                                field: field.to_string(),
                                pattern: source,
                                message: e.to_string(),
                            });
                        }
                    }
                }
                "notEqualTo" => {
                    let constraint = match parse_raw::<RawCrossField>(field, &key, json)? {
                        RawCrossField::Field(other) => CrossFieldConstraint {
                            other,
                            message: None,
                        },
                        RawCrossField::Detailed { field: other, message } => {
                            CrossFieldConstraint { other, message }
                        }
                    };
                    rules.not_equal_to.push(constraint);
                }
                "custom" => {
                    let entries = match json {
                        Json::Array(entries) => entries,
                        single => vec![single],
                    };
                    for entry in entries {
                        let raw = parse_raw::<RawCustomRule>(field, &key, entry)?;
                        rules.custom.push(CustomConstraint {
                            name: "custom".to_string(),
                            check: CustomCheck::Rule(self.compile_rule(field, &raw.rule)),
                            message: raw.message,
                        });
                    }
                }
                _ => {
                    if let Some(other) = named_cross_field(&key) {
                        if let Some(message) = parse_raw::<RawToggle>(field, &key, json)?.into_message() {
                            rules.not_equal_to.push(CrossFieldConstraint { other, message });
                        }
                    } else if let Some(predicate) = self.custom.get(&key) {
                        if let Some(message) = parse_raw::<RawToggle>(field, &key, json)?.into_message() {
                            rules.custom.push(CustomConstraint {
                                name: key.clone(),
                                check: CustomCheck::Predicate(predicate),
                                message,
                            });
                        }
                    } else {
                        warn!(field, key = %key, "ignoring unknown validation key");
                    }
                }
            }
        }
        Ok(rules)
    }
}

impl IntoFormSpec for RawFormConfig {
    fn into_form_spec(self, loader: &FormLoader<'_>) -> Result<FormLoad, ConfigError> {
        let raw_steps = match (self.steps, self.fields) {
            (Some(steps), _) => steps,
            (None, Some(fields)) => vec![RawStep {
                id: Some(DEFAULT_STEP_ID.to_string()),
                label: None,
                fields,
                conditions: None,
            }],
            (None, None) => return Err(ConfigError::MissingFields),
        };

        let mut issues = Vec::new();
        let mut seen = AHashSet::new();
        let mut steps = Vec::with_capacity(raw_steps.len());
        for (index, raw) in raw_steps.into_iter().enumerate() {
            let id = raw.id.unwrap_or_else(|| format!("step-{}", index + 1));
            let fields = loader.convert_fields(&id, raw.fields, &mut seen, &mut issues);
            let visibility = raw
                .conditions
                .as_ref()
                .map(|json| loader.compile_conditions(&id, json));
            steps.push(StepSpec {
                label: raw.label.unwrap_or_default(),
                id,
                visibility,
                fields,
            });
        }

        let mut form = FormSpec::new(steps);
        form.title = self.title;
        form.description = self.description;
        form.submit_button_text = self.submit_button_text;
        form.reset_button_text = self.reset_button_text;

        info!(
            steps = form.steps().len(),
            fields = form.field_count(),
            issues = issues.len(),
            "form configuration loaded"
        );
        Ok(FormLoad { form, issues })
    }
}

fn parse_raw<T: DeserializeOwned>(field: &str, key: &str, json: Json) -> Result<T, ConfigShapeError> {
    serde_json::from_value(json).map_err(|e| ConfigShapeError::InvalidConstraint {
        field: field.to_string(),
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn parse_constraint<T: DeserializeOwned>(
    field: &str,
    key: &str,
    json: Json,
) -> Result<Constraint<T>, ConfigShapeError> {
    let (value, message) = parse_raw::<RawConstraint<T>>(field, key, json)?.into_parts();
    Ok(Constraint { value, message })
}

fn parse_required(field: &str, key: &str, json: Json) -> Result<Constraint<bool>, ConfigShapeError> {
    let constraint = match parse_raw::<RawRequired>(field, key, json)? {
        RawRequired::Flag(value) => Constraint::new(value),
        RawRequired::Message(message) => Constraint::new(true).with_message(message),
        RawRequired::Detailed { value, message } => Constraint { value, message },
    };
    Ok(constraint)
}

/// `notEqualToBorrowerSsn` names the field `borrowerSsn`.
fn named_cross_field(key: &str) -> Option<String> {
    let rest = key.strip_prefix("notEqualTo")?;
    let mut chars = rest.chars();
    let first = chars.next()?;
    Some(first.to_lowercase().chain(chars).collect())
}
