use crate::ast::Value;
use crate::compiler::Rule;
use crate::validation::ValidationRuleSet;
use ahash::AHashMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// The closed set of field kinds a configuration may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Email,
    Password,
    Number,
    Textarea,
    Select,
    Checkbox,
    Radio,
    Array,
    Date,
    Multi,
    Hidden,
    Label,
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Email => "email",
            FieldKind::Password => "password",
            FieldKind::Number => "number",
            FieldKind::Textarea => "textarea",
            FieldKind::Select => "select",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Radio => "radio",
            FieldKind::Array => "array",
            FieldKind::Date => "date",
            FieldKind::Multi => "multi",
            FieldKind::Hidden => "hidden",
            FieldKind::Label => "label",
        }
    }

    /// The value a field is reset to when it is hidden.
    pub fn empty_value(self) -> Value {
        match self {
            FieldKind::Checkbox => Value::Bool(false),
            FieldKind::Array | FieldKind::Multi => Value::Array(Vec::new()),
            FieldKind::Label => Value::Undefined,
            FieldKind::Text
            | FieldKind::Email
            | FieldKind::Password
            | FieldKind::Number
            | FieldKind::Textarea
            | FieldKind::Select
            | FieldKind::Radio
            | FieldKind::Date
            | FieldKind::Hidden => Value::String(String::new()),
        }
    }

    pub fn is_collection(self) -> bool {
        matches!(self, FieldKind::Array | FieldKind::Multi)
    }

    /// Display-only fields hold no value and never reach the payload.
    pub fn carries_value(self) -> bool {
        !matches!(self, FieldKind::Label)
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(FieldKind::Text),
            "email" => Ok(FieldKind::Email),
            "password" => Ok(FieldKind::Password),
            "number" => Ok(FieldKind::Number),
            "textarea" => Ok(FieldKind::Textarea),
            "select" => Ok(FieldKind::Select),
            "checkbox" => Ok(FieldKind::Checkbox),
            "radio" => Ok(FieldKind::Radio),
            "array" => Ok(FieldKind::Array),
            "date" => Ok(FieldKind::Date),
            "multi" => Ok(FieldKind::Multi),
            "hidden" => Ok(FieldKind::Hidden),
            "label" => Ok(FieldKind::Label),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One choice of a select, radio or multi field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOption {
    pub label: String,
    pub value: Value,
}

/// A single field, immutable once loaded.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub label: String,
    pub visibility: Option<Rule>,
    pub validation: ValidationRuleSet,
    pub options: Vec<FieldOption>,
    /// Per-row fields of an `array` field.
    pub item_fields: Vec<FieldSpec>,
    /// Derivation rule for fields the user does not edit.
    pub computed: Option<Rule>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            label: label.into(),
            visibility: None,
            validation: ValidationRuleSet::default(),
            options: Vec::new(),
            item_fields: Vec::new(),
            computed: None,
        }
    }

    pub fn visible_when(mut self, rule: Rule) -> Self {
        self.visibility = Some(rule);
        self
    }

    pub fn with_validation(mut self, validation: ValidationRuleSet) -> Self {
        self.validation = validation;
        self
    }

    pub fn computed_by(mut self, rule: Rule) -> Self {
        self.computed = Some(rule);
        self
    }

    pub fn with_item_fields(mut self, item_fields: Vec<FieldSpec>) -> Self {
        self.item_fields = item_fields;
        self
    }

    pub fn with_options(mut self, options: Vec<FieldOption>) -> Self {
        self.options = options;
        self
    }
}

/// A labelled group of fields with an optional step-level visibility rule.
#[derive(Debug, Clone)]
pub struct StepSpec {
    pub id: String,
    pub label: String,
    pub visibility: Option<Rule>,
    pub fields: Vec<FieldSpec>,
}

impl StepSpec {
    pub fn new(id: impl Into<String>, label: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            visibility: None,
            fields,
        }
    }

    pub fn visible_when(mut self, rule: Rule) -> Self {
        self.visibility = Some(rule);
        self
    }
}

/// A whole (possibly multi-step) form.
#[derive(Debug, Clone, Default)]
pub struct FormSpec {
    pub title: Option<String>,
    pub description: Option<String>,
    pub submit_button_text: Option<String>,
    pub reset_button_text: Option<String>,
    steps: Vec<StepSpec>,
    index: AHashMap<String, (usize, usize)>,
}

pub const DEFAULT_STEP_ID: &str = "main";

impl FormSpec {
    pub fn new(steps: Vec<StepSpec>) -> Self {
        let mut index = AHashMap::new();
        for (step_idx, step) in steps.iter().enumerate() {
            for (field_idx, field) in step.fields.iter().enumerate() {
                if index.contains_key(&field.name) {
                    warn!(field = %field.name, "duplicate field name; later declaration is unreachable");
                    continue;
                }
                index.insert(field.name.clone(), (step_idx, field_idx));
            }
        }
        Self {
            title: None,
            description: None,
            submit_button_text: None,
            reset_button_text: None,
            steps,
            index,
        }
    }

    /// The flat `{ fields: [...] }` shape: one implicit step.
    pub fn single_step(fields: Vec<FieldSpec>) -> Self {
        Self::new(vec![StepSpec::new(DEFAULT_STEP_ID, "", fields)])
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn steps(&self) -> &[StepSpec] {
        &self.steps
    }

    pub fn step(&self, id: &str) -> Option<&StepSpec> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Every field with its step, in configuration order.
    pub fn fields(&self) -> impl Iterator<Item = (&StepSpec, &FieldSpec)> {
        self.steps
            .iter()
            .flat_map(|step| step.fields.iter().map(move |field| (step, field)))
    }

    pub fn locate(&self, name: &str) -> Option<(&StepSpec, &FieldSpec)> {
        let (step_idx, field_idx) = *self.index.get(name)?;
        let step = &self.steps[step_idx];
        Some((step, &step.fields[field_idx]))
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.locate(name).map(|(_, field)| field)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn field_count(&self) -> usize {
        self.index.len()
    }
}
