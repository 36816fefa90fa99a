use super::{Value, VariablePath};
use std::collections::HashSet;
use std::fmt;

/// Ordering and equality operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl ComparisonOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOp::Equal => "==",
            ComparisonOp::NotEqual => "!=",
            ComparisonOp::LessThan => "<",
            ComparisonOp::LessThanOrEqual => "<=",
            ComparisonOp::GreaterThan => ">",
            ComparisonOp::GreaterThanOrEqual => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

impl LogicalOp {
    pub fn symbol(self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
            LogicalOp::Not => "NOT",
        }
    }
}

/// The Abstract Syntax Tree of a compiled rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    // Leaf nodes
    Literal(Value),
    Variable {
        path: VariablePath,
        fallback: Option<Value>,
    },
    CurrentDate,

    // Comparison
    Compare(ComparisonOp, Box<Expression>, Box<Expression>),

    // Logical
    Logical(LogicalOp, Vec<Expression>),

    // Collections and strings
    Contains {
        haystack: Box<Expression>,
        needle: Box<Expression>,
    },
    List(Vec<Expression>),

    // Dates
    DateDiffYears(Box<Expression>, Box<Expression>),

    // Branching
    Conditional(Box<Expression>, Box<Expression>, Box<Expression>),
}

impl Expression {
    pub fn var(path: &str) -> Self {
        Expression::Variable {
            path: VariablePath::parse(path),
            fallback: None,
        }
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }

    pub fn compare(op: ComparisonOp, lhs: Expression, rhs: Expression) -> Self {
        Expression::Compare(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn contains(haystack: Expression, needle: Expression) -> Self {
        Expression::Contains {
            haystack: Box::new(haystack),
            needle: Box::new(needle),
        }
    }

    /// Collects the variable paths this expression reads.
    pub fn get_referenced_paths<'a>(&'a self, paths: &mut HashSet<&'a VariablePath>) {
        match self {
            Expression::Variable { path, .. } => {
                paths.insert(path);
            }
            Expression::Compare(_, l, r)
            | Expression::DateDiffYears(l, r)
            | Expression::Contains {
                haystack: l,
                needle: r,
            } => {
                l.get_referenced_paths(paths);
                r.get_referenced_paths(paths);
            }
            Expression::Logical(_, operands) | Expression::List(operands) => {
                for operand in operands {
                    operand.get_referenced_paths(paths);
                }
            }
            Expression::Conditional(c, a, b) => {
                c.get_referenced_paths(paths);
                a.get_referenced_paths(paths);
                b.get_referenced_paths(paths);
            }
            Expression::Literal(_) | Expression::CurrentDate => {}
        }
    }

    /// True when the expression reads neither the environment nor the clock.
    pub fn is_constant(&self) -> bool {
        match self {
            Expression::Literal(_) => true,
            Expression::Variable { .. } | Expression::CurrentDate => false,
            Expression::Compare(_, l, r)
            | Expression::DateDiffYears(l, r)
            | Expression::Contains {
                haystack: l,
                needle: r,
            } => l.is_constant() && r.is_constant(),
            Expression::Logical(_, operands) | Expression::List(operands) => {
                operands.iter().all(Expression::is_constant)
            }
            Expression::Conditional(c, a, b) => {
                c.is_constant() && a.is_constant() && b.is_constant()
            }
        }
    }
}

/// A wrapper to display an expression as an indented tree.
pub struct DisplayExpression<'a> {
    pub expr: &'a Expression,
}

impl<'a> fmt::Display for DisplayExpression<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_as_tree(self.expr, f, "", true)
    }
}

impl<'a> DisplayExpression<'a> {
    fn fmt_as_tree(
        &self,
        expr: &Expression,
        f: &mut fmt::Formatter<'_>,
        prefix: &str,
        is_last: bool,
    ) -> fmt::Result {
        let node_marker = if is_last { "└── " } else { "├── " };
        write!(f, "{}{}", prefix, node_marker)?;

        let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });

        match expr {
            Expression::Literal(Value::String(s)) => writeln!(f, "Literal: {:?}", s)?,
            Expression::Literal(v) => writeln!(f, "Literal: {}", v)?,
            Expression::Variable { path, fallback } => match fallback {
                Some(default) => writeln!(f, "Variable: {} (default {})", path, default)?,
                None => writeln!(f, "Variable: {}", path)?,
            },
            Expression::CurrentDate => writeln!(f, "CurrentDate")?,
            Expression::Compare(op, l, r) => {
                writeln!(f, "Compare ({})", op.symbol())?;
                self.fmt_children(f, &[l.as_ref(), r.as_ref()], &child_prefix)?;
            }
            Expression::Logical(op, operands) => {
                writeln!(f, "Logical ({})", op.symbol())?;
                let children: Vec<&Expression> = operands.iter().collect();
                self.fmt_children(f, &children, &child_prefix)?;
            }
            Expression::Contains { haystack, needle } => {
                writeln!(f, "Contains")?;
                self.fmt_children(f, &[haystack.as_ref(), needle.as_ref()], &child_prefix)?;
            }
            Expression::List(items) => {
                writeln!(f, "List")?;
                let children: Vec<&Expression> = items.iter().collect();
                self.fmt_children(f, &children, &child_prefix)?;
            }
            Expression::DateDiffYears(from, to) => {
                writeln!(f, "DateDiffYears")?;
                self.fmt_children(f, &[from.as_ref(), to.as_ref()], &child_prefix)?;
            }
            Expression::Conditional(c, a, b) => {
                writeln!(f, "Conditional")?;
                self.fmt_children(f, &[c.as_ref(), a.as_ref(), b.as_ref()], &child_prefix)?;
            }
        }
        Ok(())
    }

    fn fmt_children(
        &self,
        f: &mut fmt::Formatter<'_>,
        children: &[&Expression],
        prefix: &str,
    ) -> fmt::Result {
        for (i, child) in children.iter().enumerate() {
            self.fmt_as_tree(child, f, prefix, i + 1 == children.len())?;
        }
        Ok(())
    }
}
