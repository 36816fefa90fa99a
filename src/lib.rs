//! # Kensho - Rule Interpreter and Form Engine
//!
//! **Kensho** evaluates JSON-Logic style rules against form values and uses them
//! to drive a multi-step form: which fields and steps are shown, what each
//! field's value must satisfy, which values are derived, and what gets
//! submitted.
//!
//! ## Core Workflow
//!
//! 1.  **Build an `Interpreter`**: the operator table and the clock are explicit.
//!     Pin the date with `with_today` for deterministic tests.
//! 2.  **Load the form**: `FormLoader` turns a JSON configuration into a
//!     `FormSpec`, compiling every condition up front. A broken field is skipped
//!     and reported in `FormLoad::issues`; a broken condition is kept and fails open.
//! 3.  **Drive a `FormSession`**: every `set_value` re-evaluates the fields that
//!     depend on the edit and returns a `ChangeSet` for the presentation layer.
//! 4.  **Submit**: all visible fields are validated; the payload contains only
//!     visible, value-carrying fields.
//!
//! ## Quick Start
//!
//! ```rust
//! use kensho::prelude::*;
//! use chrono::NaiveDate;
//! use serde_json::json;
//!
//! let interpreter = Interpreter::builder()
//!     .with_today(NaiveDate::from_ymd_opt(2024, 3, 14).unwrap())
//!     .build();
//!
//! let config = json!({
//!     "fields": [
//!         { "name": "age", "type": "number", "label": "Age", "required": true },
//!         {
//!             "name": "employed", "type": "radio", "label": "Employed",
//!             "options": ["yes", "no"],
//!             "conditions": { ">=": [{ "var": "age" }, 18] },
//!             "validation": { "required": "Please select your employment status" }
//!         }
//!     ]
//! });
//! let load = FormLoader::new(&interpreter).load_json(config).unwrap();
//! assert!(load.issues.is_empty());
//!
//! let mut session = FormSession::new(load.form, interpreter);
//! assert!(!session.is_visible("employed"));
//!
//! let changes = session.set_value("age", 18);
//! assert_eq!(changes.shown().collect::<Vec<_>>(), vec!["employed"]);
//!
//! session.set_value("employed", "yes");
//! let submission = session.submit().unwrap();
//! assert_eq!(submission.to_json(), json!({ "age": 18, "employed": "yes" }));
//! ```

pub mod ast;
pub mod compiler;
pub mod computed;
pub mod data;
pub mod dependency;
pub mod error;
pub mod form;
pub mod interpreter;
pub mod prelude;
pub mod session;
pub mod trace;
pub mod validation;
pub mod visibility;
