//! Visibility resolution for fields and steps.
//!
//! A missing rule means visible. A rule that failed to compile also means
//! visible: a broken condition must never hide a field the user needs.

use crate::compiler::Rule;
use crate::data::Environment;
use crate::form::{FieldSpec, StepSpec};
use crate::interpreter::{EvaluationPass, Interpreter};
use crate::trace::TraceFormatter;
use tracing::{Level, debug, warn};

/// Anything that can be shown or hidden by a rule.
pub trait Gated {
    fn gate_name(&self) -> &str;
    fn visibility_rule(&self) -> Option<&Rule>;
}

impl Gated for FieldSpec {
    fn gate_name(&self) -> &str {
        &self.name
    }

    fn visibility_rule(&self) -> Option<&Rule> {
        self.visibility.as_ref()
    }
}

impl Gated for StepSpec {
    fn gate_name(&self) -> &str {
        &self.id
    }

    fn visibility_rule(&self) -> Option<&Rule> {
        self.visibility.as_ref()
    }
}

impl EvaluationPass<'_> {
    pub fn is_visible<G: Gated + ?Sized>(&self, target: &G) -> bool {
        let Some(rule) = target.visibility_rule() else {
            return true;
        };
        match self.trace_rule(rule) {
            Ok(trace) => {
                let visible = trace.get_outcome().is_truthy();
                if tracing::enabled!(Level::DEBUG) {
                    debug!(
                        target_name = target.gate_name(),
                        visible,
                        because = %TraceFormatter::format_trace(&trace),
                        "resolved visibility"
                    );
                }
                visible
            }
            Err(error) => {
                warn!(
                    target_name = target.gate_name(),
                    %error,
                    rule = %rule.source(),
                    "visibility rule is broken; showing it"
                );
                true
            }
        }
    }

    /// A field is effectively visible only while its step is visible too.
    pub fn is_field_visible(&self, step: &StepSpec, field: &FieldSpec) -> bool {
        self.is_visible(step) && self.is_visible(field)
    }
}

impl Interpreter {
    pub fn is_visible<G: Gated + ?Sized>(&self, target: &G, env: &Environment) -> bool {
        self.begin_pass(env).is_visible(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FieldKind;
    use serde_json::json;

    fn field_with(conditions: serde_json::Value, interpreter: &Interpreter) -> FieldSpec {
        FieldSpec::new("employed", FieldKind::Radio, "Employed")
            .visible_when(interpreter.compiler().compile_conditions(&conditions))
    }

    #[test]
    fn missing_rule_is_visible() {
        let interpreter = Interpreter::new();
        let field = FieldSpec::new("name", FieldKind::Text, "Name");
        assert!(interpreter.is_visible(&field, &Environment::new()));
    }

    #[test]
    fn rule_outcome_gates_visibility() {
        let interpreter = Interpreter::new();
        let field = field_with(json!({">=": [{"var": "age"}, 18]}), &interpreter);

        let mut env = Environment::new();
        assert!(!interpreter.is_visible(&field, &env));
        env.set("age", 18);
        assert!(interpreter.is_visible(&field, &env));
        env.set("age", 17);
        assert!(!interpreter.is_visible(&field, &env));
    }

    #[test]
    fn broken_rule_fails_open() {
        let interpreter = Interpreter::new();
        let field = field_with(json!({"frobnicate": [1]}), &interpreter);
        assert!(interpreter.is_visible(&field, &Environment::new()));
    }

    #[test]
    fn hidden_step_hides_its_fields() {
        let interpreter = Interpreter::new();
        let step = StepSpec::new("work", "Work", vec![])
            .visible_when(interpreter.compiler().compile_rule(&json!({"==": [{"var": "employed"}, "yes"]})));
        let field = FieldSpec::new("companyName", FieldKind::Text, "Company");
        let env: Environment = [("employed", "no")].into_iter().collect();
        assert!(!interpreter.begin_pass(&env).is_field_visible(&step, &field));
    }
}
