use crate::ast::EvaluationTrace;
use itertools::Itertools;

/// Formats evaluation traces into human-readable strings
pub struct TraceFormatter;

impl TraceFormatter {
    /// Format an evaluation trace into a human-readable explanation.
    pub fn format_trace(trace: &EvaluationTrace) -> String {
        // Start the recursive formatting with the lowest possible parent precedence.
        Self::format_recursive(trace, 0)
    }

    /// Recursively formats the trace, adding parentheses only when necessary.
    fn format_recursive(trace: &EvaluationTrace, parent_precedence: u8) -> String {
        let current_precedence = trace.precedence();
        let needs_parens = current_precedence < parent_precedence;

        let body = match trace {
            EvaluationTrace::BinaryOp {
                op_symbol,
                left,
                right,
                ..
            } => format!(
                "{} {} {}",
                Self::format_recursive(left, current_precedence + 1),
                op_symbol,
                Self::format_recursive(right, current_precedence + 1)
            ),
            EvaluationTrace::UnaryOp {
                op_symbol, child, ..
            } => format!(
                "{} {}",
                op_symbol,
                Self::format_recursive(child, current_precedence)
            ),
            // Short-circuited operands were never recorded, so only the decisive
            // part of an AND/OR shows up here.
            EvaluationTrace::NaryOp {
                op_symbol,
                operands,
                outcome,
            } => {
                if operands.is_empty() {
                    outcome.to_string()
                } else {
                    operands
                        .iter()
                        .map(|operand| Self::format_recursive(operand, current_precedence + 1))
                        .join(&format!(" {} ", op_symbol))
                }
            }
            EvaluationTrace::Call {
                name,
                args,
                outcome,
            } => format!(
                "{}({}) (was {})",
                name,
                args.iter()
                    .map(|arg| Self::format_recursive(arg, 0))
                    .join(", "),
                outcome
            ),
            EvaluationTrace::Branch {
                condition, taken, ..
            } => format!(
                "{} ? {}",
                Self::format_recursive(condition, 1),
                Self::format_recursive(taken, 1)
            ),
            EvaluationTrace::Leaf { source, value } => {
                if source.starts_with('$') {
                    format!("{} (was {})", source, value)
                } else {
                    source.clone()
                }
            }
        };

        if needs_parens {
            format!("({})", body)
        } else {
            body
        }
    }
}
