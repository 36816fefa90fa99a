//! Prelude module for convenient imports
//!
//! Re-exports the types most programs need to load a form and drive a session.
//!
//! ```rust
//! use kensho::prelude::*;
//!
//! let interpreter = Interpreter::new();
//! let env: Environment = [("age", 21)].into_iter().collect();
//! let rule = serde_json::json!({ ">=": [{ "var": "age" }, 18] });
//! assert_eq!(interpreter.evaluate_json(&rule, &env), Ok(Value::Bool(true)));
//! ```

// Rules
pub use crate::compiler::{Rule, RuleCompiler};
pub use crate::interpreter::{Clock, EvaluationPass, FixedClock, Interpreter, SystemClock};

// AST and values
pub use crate::ast::{EvaluationTrace, Expression, Value, VariablePath};
pub use crate::data::Environment;

// Forms
pub use crate::dependency::DependencyGraph;
pub use crate::form::{FieldKind, FieldSpec, FormLoad, FormLoader, FormSpec, IntoFormSpec, StepSpec};
pub use crate::session::{ChangeSet, Directive, FormSession, SubmitRejection, Submission};
pub use crate::validation::{FieldError, ValidationOutcome, ValidationRuleSet};
pub use crate::visibility::Gated;

// Error types
pub use crate::error::{ConfigError, ConfigShapeError, CustomValidatorError, RuleError};

// Trace formatting
pub use crate::trace::TraceFormatter;

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
