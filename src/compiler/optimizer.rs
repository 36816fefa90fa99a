use crate::ast::{Expression, LogicalOp, Value};
use crate::data::Environment;
use crate::interpreter::AstEngine;
use chrono::NaiveDate;

/// Applies simplification passes to a freshly built AST.
///
/// Folding never touches variables or `CurrentDate`, so an optimized rule
/// evaluates identically to the unoptimized one in every environment.
pub(super) struct AstOptimizer {
    empty: Environment,
}

impl AstOptimizer {
    pub(super) fn new() -> Self {
        Self {
            empty: Environment::new(),
        }
    }

    /// Runs optimization passes in a loop until the AST reaches a fixed point.
    pub(super) fn optimize(&self, expr: Expression) -> Expression {
        let mut current_expr = expr;
        loop {
            let next = self.fold_and_eliminate_dead_code(current_expr.clone());
            if next == current_expr {
                return next;
            }
            current_expr = next;
        }
    }

    /// Constant folding and dead branch elimination, children first.
    fn fold_and_eliminate_dead_code(&self, expr: Expression) -> Expression {
        let optimized_expr = match expr {
            Expression::Compare(op, l, r) => Expression::Compare(
                op,
                Box::new(self.fold_and_eliminate_dead_code(*l)),
                Box::new(self.fold_and_eliminate_dead_code(*r)),
            ),
            Expression::Contains { haystack, needle } => Expression::Contains {
                haystack: Box::new(self.fold_and_eliminate_dead_code(*haystack)),
                needle: Box::new(self.fold_and_eliminate_dead_code(*needle)),
            },
            Expression::DateDiffYears(from, to) => Expression::DateDiffYears(
                Box::new(self.fold_and_eliminate_dead_code(*from)),
                Box::new(self.fold_and_eliminate_dead_code(*to)),
            ),
            Expression::List(items) => Expression::List(
                items
                    .into_iter()
                    .map(|item| self.fold_and_eliminate_dead_code(item))
                    .collect(),
            ),
            Expression::Logical(op, operands) => {
                let operands = operands
                    .into_iter()
                    .map(|operand| self.fold_and_eliminate_dead_code(operand))
                    .collect();
                self.simplify_logical(op, operands)
            }
            Expression::Conditional(c, a, b) => {
                let condition = self.fold_and_eliminate_dead_code(*c);
                match &condition {
                    Expression::Literal(v) if v.is_truthy() => {
                        return self.fold_and_eliminate_dead_code(*a);
                    }
                    Expression::Literal(_) => return self.fold_and_eliminate_dead_code(*b),
                    _ => Expression::Conditional(
                        Box::new(condition),
                        Box::new(self.fold_and_eliminate_dead_code(*a)),
                        Box::new(self.fold_and_eliminate_dead_code(*b)),
                    ),
                }
            }
            leaf => leaf,
        };

        self.apply_folding_rules(optimized_expr)
    }

    /// Drops operands that cannot change an AND/OR result and collapses the
    /// node when a literal operand decides it.
    fn simplify_logical(&self, op: LogicalOp, operands: Vec<Expression>) -> Expression {
        let (decisive, neutral) = match op {
            LogicalOp::And => (false, true),
            LogicalOp::Or => (true, false),
            LogicalOp::Not => return Expression::Logical(op, operands),
        };
        let mut kept = Vec::with_capacity(operands.len());
        for operand in operands {
            if let Expression::Literal(v) = &operand {
                if v.is_truthy() == decisive {
                    return Expression::Literal(Value::Bool(decisive));
                }
                if v.is_truthy() == neutral {
                    continue;
                }
            }
            kept.push(operand);
        }
        Expression::Logical(op, kept)
    }

    /// Evaluates any remaining subtree that reads neither the environment nor the clock.
    fn apply_folding_rules(&self, expr: Expression) -> Expression {
        if matches!(expr, Expression::Literal(_)) || !expr.is_constant() {
            return expr;
        }
        let engine = AstEngine::new(&self.empty, NaiveDate::MIN);
        Expression::Literal(engine.evaluate(&expr).into_outcome())
    }
}
