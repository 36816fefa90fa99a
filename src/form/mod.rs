//! The form model and its JSON configuration loader.

mod config;
mod definition;
mod loader;

pub use config::RawFormConfig;
pub use definition::{DEFAULT_STEP_ID, FieldKind, FieldOption, FieldSpec, FormSpec, StepSpec};
pub use loader::{FormLoad, FormLoader, IntoFormSpec};
