use super::calendar::{format_date, parse_date, whole_years_between};
use crate::ast::{ComparisonOp, EvaluationTrace, Expression, LogicalOp, Value};
use crate::data::Environment;
use chrono::NaiveDate;
use std::cmp::Ordering;

/// The core recursive engine for evaluating a single AST against one
/// environment snapshot and one evaluation date.
///
/// Evaluation is total: missing variables are `Undefined` and every operator
/// defines a result for `Undefined` operands.
pub(crate) struct AstEngine<'a> {
    env: &'a Environment,
    row: Option<&'a Value>,
    today: NaiveDate,
}

impl<'a> AstEngine<'a> {
    pub(crate) fn new(env: &'a Environment, today: NaiveDate) -> Self {
        Self {
            env,
            row: None,
            today,
        }
    }

    /// Variables resolve against `row` before the snapshot.
    pub(crate) fn in_row(mut self, row: Option<&'a Value>) -> Self {
        self.row = row;
        self
    }

    /// Evaluates the AST and returns a trace of the execution.
    pub(crate) fn evaluate(&self, expr: &Expression) -> EvaluationTrace {
        match expr {
            Expression::Literal(val) => EvaluationTrace::Leaf {
                source: render_literal(val),
                value: val.clone(),
            },
            Expression::Variable { path, fallback } => {
                let mut value = match self.row {
                    Some(row) => self.env.resolve_in_row(row, path),
                    None => self.env.resolve(path),
                };
                if let (Value::Undefined, Some(default)) = (&value, fallback) {
                    value = default.clone();
                }
                EvaluationTrace::Leaf {
                    source: path.to_string(),
                    value,
                }
            }
            Expression::CurrentDate => EvaluationTrace::Call {
                name: "currentDate",
                args: Vec::new(),
                outcome: Value::String(format_date(self.today)),
            },

            // --- Comparison ---
            Expression::Compare(op, l, r) => {
                let left_trace = self.evaluate(l);
                let right_trace = self.evaluate(r);
                let outcome = Value::Bool(compare(
                    *op,
                    left_trace.get_outcome(),
                    right_trace.get_outcome(),
                ));
                EvaluationTrace::BinaryOp {
                    op_symbol: op.symbol(),
                    left: Box::new(left_trace),
                    right: Box::new(right_trace),
                    outcome,
                }
            }

            // --- Logical ---
            Expression::Logical(LogicalOp::Not, operands) => {
                let child_trace = match operands.first() {
                    Some(operand) => self.evaluate(operand),
                    None => EvaluationTrace::Leaf {
                        source: "undefined".to_string(),
                        value: Value::Undefined,
                    },
                };
                let outcome = Value::Bool(!child_trace.get_outcome().is_truthy());
                EvaluationTrace::UnaryOp {
                    op_symbol: "NOT",
                    child: Box::new(child_trace),
                    outcome,
                }
            }
            Expression::Logical(op, operands) => {
                // AND stops at the first falsy operand, OR at the first truthy one.
                let stop_on = matches!(op, LogicalOp::Or);
                let mut traces = Vec::with_capacity(operands.len());
                let mut result = !stop_on;
                for operand in operands {
                    let trace = self.evaluate(operand);
                    let truthy = trace.get_outcome().is_truthy();
                    traces.push(trace);
                    if truthy == stop_on {
                        result = stop_on;
                        break;
                    }
                }
                EvaluationTrace::NaryOp {
                    op_symbol: op.symbol(),
                    operands: traces,
                    outcome: Value::Bool(result),
                }
            }

            // --- Collections ---
            Expression::Contains { haystack, needle } => {
                let needle_trace = self.evaluate(needle);
                let haystack_trace = self.evaluate(haystack);
                let outcome = Value::Bool(contains(
                    haystack_trace.get_outcome(),
                    needle_trace.get_outcome(),
                ));
                EvaluationTrace::BinaryOp {
                    op_symbol: "IN",
                    left: Box::new(needle_trace),
                    right: Box::new(haystack_trace),
                    outcome,
                }
            }
            Expression::List(items) => {
                let args: Vec<EvaluationTrace> =
                    items.iter().map(|item| self.evaluate(item)).collect();
                let outcome = Value::Array(args.iter().map(|t| t.get_outcome().clone()).collect());
                EvaluationTrace::Call {
                    name: "list",
                    args,
                    outcome,
                }
            }

            // --- Dates ---
            Expression::DateDiffYears(from, to) => {
                let from_trace = self.evaluate(from);
                let to_trace = self.evaluate(to);
                let outcome = match (
                    parse_date(from_trace.get_outcome()),
                    parse_date(to_trace.get_outcome()),
                ) {
                    (Some(from), Some(to)) => Value::Number(whole_years_between(from, to) as f64),
                    _ => Value::Undefined,
                };
                EvaluationTrace::Call {
                    name: "dateDiffYears",
                    args: vec![from_trace, to_trace],
                    outcome,
                }
            }

            // --- Branching ---
            Expression::Conditional(c, a, b) => {
                let condition = self.evaluate(c);
                let taken = if condition.get_outcome().is_truthy() {
                    self.evaluate(a)
                } else {
                    self.evaluate(b)
                };
                let outcome = taken.get_outcome().clone();
                EvaluationTrace::Branch {
                    condition: Box::new(condition),
                    taken: Box::new(taken),
                    outcome,
                }
            }
        }
    }
}

fn render_literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("{:?}", s),
        other => other.to_string(),
    }
}

/// Equality is strict (no coercion). Ordering compares two strings
/// lexicographically and anything else numerically; `NaN` is never ordered.
pub(crate) fn compare(op: ComparisonOp, left: &Value, right: &Value) -> bool {
    match op {
        ComparisonOp::Equal => left == right,
        ComparisonOp::NotEqual => left != right,
        _ => {
            let ordering = match (left, right) {
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => left.to_number().partial_cmp(&right.to_number()),
            };
            match ordering {
                None => false,
                Some(ordering) => match op {
                    ComparisonOp::LessThan => ordering == Ordering::Less,
                    ComparisonOp::LessThanOrEqual => ordering != Ordering::Greater,
                    ComparisonOp::GreaterThan => ordering == Ordering::Greater,
                    ComparisonOp::GreaterThanOrEqual => ordering != Ordering::Less,
                    ComparisonOp::Equal | ComparisonOp::NotEqual => false,
                },
            }
        }
    }
}

/// Array membership by strict equality, or substring containment.
pub(crate) fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Array(items) => items.iter().any(|item| item == needle),
        Value::String(text) => match needle {
            Value::String(fragment) => text.contains(fragment.as_str()),
            Value::Number(_) => text.contains(&needle.to_string()),
            _ => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_equality_does_not_coerce() {
        assert!(!compare(ComparisonOp::Equal, &Value::from("5"), &Value::from(5.0)));
        assert!(compare(ComparisonOp::NotEqual, &Value::from("5"), &Value::from(5.0)));
        assert!(compare(ComparisonOp::Equal, &Value::Undefined, &Value::Undefined));
    }

    #[test]
    fn ordering_coerces_numeric_strings_but_not_undefined() {
        assert!(compare(ComparisonOp::GreaterThan, &Value::from("18"), &Value::from(17.0)));
        assert!(!compare(ComparisonOp::GreaterThan, &Value::Undefined, &Value::from(17.0)));
        assert!(!compare(ComparisonOp::LessThanOrEqual, &Value::Undefined, &Value::from(17.0)));
    }

    #[test]
    fn iso_dates_order_as_strings() {
        assert!(compare(
            ComparisonOp::LessThan,
            &Value::from("2019-12-31"),
            &Value::from("2020-01-01")
        ));
    }

    #[test]
    fn containment_over_arrays_strings_and_other() {
        let roles = Value::Array(vec![Value::from("employee")]);
        assert!(contains(&roles, &Value::from("employee")));
        assert!(!contains(&roles, &Value::from("retired")));
        assert!(contains(&Value::from("self_employed"), &Value::from("employed")));
        assert!(!contains(&Value::Undefined, &Value::from("x")));
        assert!(!contains(&Value::from(12.0), &Value::from(1.0)));
    }
}
