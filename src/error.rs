use thiserror::Error;

/// Errors raised while compiling a JSON rule into an `Expression`.
///
/// A rule that fails to compile is kept alongside its source so that
/// visibility checks can fail open at evaluation time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("Unknown rule operator '{operator}'")]
    UnknownOperator { operator: String },

    #[error("Operator '{operator}' expects {expected} argument(s), but received {found}")]
    Arity {
        operator: String,
        expected: String,
        found: usize,
    },

    #[error("Malformed rule: {0}")]
    Malformed(String),

    #[error("Operator 'var' requires a literal path, found: {0}")]
    UnsupportedVariable(String),
}

/// An error reported by a user-supplied custom validation predicate.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Custom validator '{validator}' failed: {message}")]
pub struct CustomValidatorError {
    pub validator: String,
    pub message: String,
}

impl CustomValidatorError {
    pub fn new(validator: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            validator: validator.into(),
            message: message.into(),
        }
    }
}

/// A load-time problem with a single field or step definition.
///
/// The offending entry is skipped; the rest of the form still loads.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigShapeError {
    #[error("Field #{index} in step '{step}' is missing required key '{key}'")]
    MissingKey {
        step: String,
        index: usize,
        key: &'static str,
    },

    #[error("Field '{field}' has unknown type '{type_name}'")]
    UnknownFieldType { field: String, type_name: String },

    #[error("Field '{field}' is declared more than once")]
    DuplicateField { field: String },

    #[error("Field '{field}' has an invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        field: String,
        pattern: String,
        message: String,
    },

    #[error("Field '{field}' has an invalid '{key}' constraint: {message}")]
    InvalidConstraint {
        field: String,
        key: String,
        message: String,
    },

    #[error("Field #{index} in step '{step}' could not be read: {message}")]
    Unreadable {
        step: String,
        index: usize,
        message: String,
    },
}

/// Fatal errors that prevent a form configuration from loading at all.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse form configuration JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Form configuration must contain either 'steps' or 'fields'")]
    MissingFields,

    #[error("Could not read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
