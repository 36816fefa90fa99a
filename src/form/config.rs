//! Raw serde shapes of a form configuration file.
//!
//! Everything is optional here; presence checks happen during conversion so
//! that one broken field does not take the whole form down.

use serde::Deserialize;
use serde_json::{Map, Value as Json};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFormConfig {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Option<Vec<RawStep>>,
    /// The flat single-step shape.
    #[serde(default)]
    pub fields: Option<Vec<Json>>,
    #[serde(default)]
    pub submit_button_text: Option<String>,
    #[serde(default)]
    pub reset_button_text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawStep {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub fields: Vec<Json>,
    #[serde(default)]
    pub conditions: Option<Json>,
}

/// A field entry. Kept as loose JSON per field and deserialized one at a time.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawField {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub required: Option<Json>,
    #[serde(default)]
    pub validation: Option<Map<String, Json>>,
    #[serde(default)]
    pub conditions: Option<Json>,
    #[serde(default)]
    pub options: Vec<RawOption>,
    #[serde(default)]
    pub array_item_fields: Vec<Json>,
    #[serde(default)]
    pub min_items: Option<Json>,
    #[serde(default)]
    pub max_items: Option<Json>,
    #[serde(default)]
    pub computed: Option<Json>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawOption {
    Labeled { label: String, value: Json },
    Plain(Json),
}

/// `minLength: 8` or `minLength: { value: 8, message: "..." }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawConstraint<T> {
    Bare(T),
    Detailed {
        value: T,
        #[serde(default)]
        message: Option<String>,
    },
}

impl<T> RawConstraint<T> {
    pub fn into_parts(self) -> (T, Option<String>) {
        match self {
            RawConstraint::Bare(value) => (value, None),
            RawConstraint::Detailed { value, message } => (value, message),
        }
    }
}

/// `required: true`, `required: "message"` or `required: { value, message }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawRequired {
    Flag(bool),
    Message(String),
    Detailed {
        #[serde(default = "enabled")]
        value: bool,
        #[serde(default)]
        message: Option<String>,
    },
}

fn enabled() -> bool {
    true
}

/// `notEqualTo: "other"` or `notEqualTo: { field, message }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawCrossField {
    Field(String),
    Detailed {
        field: String,
        #[serde(default)]
        message: Option<String>,
    },
}

/// Switch for keyed rules (`notEqualToPhone`, registered validators):
/// `true`, a message, or `{ message }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawToggle {
    Flag(bool),
    Message(String),
    Detailed {
        #[serde(default)]
        message: Option<String>,
    },
}

impl RawToggle {
    /// `None` when switched off, otherwise the optional message.
    pub fn into_message(self) -> Option<Option<String>> {
        match self {
            RawToggle::Flag(false) => None,
            RawToggle::Flag(true) => Some(None),
            RawToggle::Message(message) => Some(Some(message)),
            RawToggle::Detailed { message } => Some(message),
        }
    }
}

/// `custom: { rule, message }`.
#[derive(Debug, Deserialize)]
pub struct RawCustomRule {
    pub rule: Json,
    #[serde(default)]
    pub message: Option<String>,
}
