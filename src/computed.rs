use crate::ast::Value;
use crate::data::Environment;
use crate::form::FieldSpec;
use crate::interpreter::{EvaluationPass, Interpreter};
use tracing::warn;

impl EvaluationPass<'_> {
    /// Derives the value of a computed field from the snapshot.
    ///
    /// A field without a derivation rule keeps its current value. A broken rule
    /// yields the field kind's empty value.
    pub fn recompute(&self, field: &FieldSpec) -> Value {
        let Some(rule) = &field.computed else {
            return self.resolve_str(&field.name);
        };
        match self.evaluate_rule(rule) {
            Ok(value) => value,
            Err(error) => {
                warn!(field = %field.name, %error, "computed rule is broken");
                field.kind.empty_value()
            }
        }
    }
}

impl Interpreter {
    pub fn recompute(&self, field: &FieldSpec, env: &Environment) -> Value {
        self.begin_pass(env).recompute(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FieldKind;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn age_is_derived_from_date_of_birth() {
        let interpreter = Interpreter::builder()
            .with_today(NaiveDate::from_ymd_opt(2024, 3, 14).unwrap())
            .build();
        let rule = interpreter
            .compiler()
            .compile_rule(&json!({"dateDiffYears": [{"var": "dob"}, {"currentDate": []}]}));
        let age = FieldSpec::new("age", FieldKind::Hidden, "Age").computed_by(rule);
        let env: Environment = [("dob", "2006-03-15")].into_iter().collect();
        assert_eq!(interpreter.recompute(&age, &env), Value::Number(17.0));
    }

    #[test]
    fn broken_rule_yields_empty_value() {
        let interpreter = Interpreter::new();
        let rule = interpreter.compiler().compile_rule(&json!({"nope": []}));
        let field = FieldSpec::new("total", FieldKind::Number, "Total").computed_by(rule);
        assert_eq!(interpreter.recompute(&field, &Environment::new()), Value::from(""));
    }
}
