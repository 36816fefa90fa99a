use crate::ast::{ComparisonOp, Expression, LogicalOp, Value, VariablePath};
use crate::error::RuleError;
use ahash::AHashMap;
use std::sync::Arc;

/// Defines the contract for turning one JSON-Logic operator and its already-built
/// arguments into an `Expression`.
pub trait OperatorParser: Send + Sync {
    fn operator(&self) -> &str;
    fn parse(&self, args: Vec<Expression>) -> Result<Expression, RuleError>;
}

/// Helper to check for the correct number of arguments.
fn require_args(
    args: Vec<Expression>,
    count: usize,
    operator: &str,
) -> Result<Vec<Expression>, RuleError> {
    if args.len() != count {
        Err(RuleError::Arity {
            operator: operator.to_string(),
            expected: count.to_string(),
            found: args.len(),
        })
    } else {
        Ok(args)
    }
}

fn take_two(args: Vec<Expression>) -> (Expression, Expression) {
    let mut iter = args.into_iter();
    match (iter.next(), iter.next()) {
        (Some(a), Some(b)) => (a, b),
        (Some(a), None) => (a, Expression::Literal(Value::Undefined)),
        _ => (
            Expression::Literal(Value::Undefined),
            Expression::Literal(Value::Undefined),
        ),
    }
}

/// Builds a comparison. `<` and `<=` also accept JSON-Logic's three-argument
/// "between" form: `{"<": [a, b, c]}` means `a < b AND b < c`.
fn parse_comparison(
    operator: &str,
    op: ComparisonOp,
    allows_between: bool,
    args: Vec<Expression>,
) -> Result<Expression, RuleError> {
    match args.len() {
        2 => {
            let (l, r) = take_two(args);
            Ok(Expression::compare(op, l, r))
        }
        3 if allows_between => {
            let mut iter = args.into_iter();
            match (iter.next(), iter.next(), iter.next()) {
                (Some(a), Some(b), Some(c)) => Ok(Expression::Logical(
                    LogicalOp::And,
                    vec![
                        Expression::compare(op, a, b.clone()),
                        Expression::compare(op, b, c),
                    ],
                )),
                _ => Err(RuleError::Malformed(format!("'{}' lost an argument", operator))),
            }
        }
        found => Err(RuleError::Arity {
            operator: operator.to_string(),
            expected: if allows_between { "2 or 3" } else { "2" }.to_string(),
            found,
        }),
    }
}

/// Master macro to define the comparison parsers and the default operator table.
macro_rules! define_operator_parsers {
    (
        $( ($struct_name:ident, $operator:literal, $op:path, $between:expr) ),* $(,)? ;
        $( ($other_struct:ident, $other_operator:literal) ),* $(,)?
    ) => {
        $(
            struct $struct_name;
            impl OperatorParser for $struct_name {
                fn operator(&self) -> &str { $operator }
                fn parse(&self, args: Vec<Expression>) -> Result<Expression, RuleError> {
                    parse_comparison($operator, $op, $between, args)
                }
            }
        )*

        /// Registers every built-in operator under its JSON-Logic name.
        pub(super) fn register_default_parsers(registry: &mut AHashMap<String, Arc<dyn OperatorParser>>) {
            $( registry.insert($operator.to_string(), Arc::new($struct_name)); )*
            $( registry.insert($other_operator.to_string(), Arc::new($other_struct)); )*
        }

        /// Creates a built-in parser by its operator name.
        pub(super) fn create_parser_by_name(name: &str) -> Option<Arc<dyn OperatorParser>> {
            match name {
                $( $operator => Some(Arc::new($struct_name)), )*
                $( $other_operator => Some(Arc::new($other_struct)), )*
                _ => None,
            }
        }
    };
}

define_operator_parsers! {
    // Equality is strict in both spellings: "5" never equals 5.
    (EqParser, "==", ComparisonOp::Equal, false),
    (StrictEqParser, "===", ComparisonOp::Equal, false),
    (NeqParser, "!=", ComparisonOp::NotEqual, false),
    (StrictNeqParser, "!==", ComparisonOp::NotEqual, false),
    (LtParser, "<", ComparisonOp::LessThan, true),
    (LteParser, "<=", ComparisonOp::LessThanOrEqual, true),
    (GtParser, ">", ComparisonOp::GreaterThan, false),
    (GteParser, ">=", ComparisonOp::GreaterThanOrEqual, false),

    ;

    (AndParser, "and"),
    (OrParser, "or"),
    (NotParser, "!"),
    (TruthyParser, "!!"),
    (InParser, "in"),
    (ContainsParser, "contains"),
    (VarParser, "var"),
    (IfParser, "if"),
    (TernaryParser, "?:"),
    (DateDiffYearsParser, "dateDiffYears"),
    (CurrentDateParser, "currentDate"),
}

struct AndParser;
impl OperatorParser for AndParser {
    fn operator(&self) -> &str {
        "and"
    }
    fn parse(&self, args: Vec<Expression>) -> Result<Expression, RuleError> {
        Ok(Expression::Logical(LogicalOp::And, args))
    }
}

struct OrParser;
impl OperatorParser for OrParser {
    fn operator(&self) -> &str {
        "or"
    }
    fn parse(&self, args: Vec<Expression>) -> Result<Expression, RuleError> {
        Ok(Expression::Logical(LogicalOp::Or, args))
    }
}

struct NotParser;
impl OperatorParser for NotParser {
    fn operator(&self) -> &str {
        "!"
    }
    fn parse(&self, args: Vec<Expression>) -> Result<Expression, RuleError> {
        require_args(args, 1, "!").map(|a| Expression::Logical(LogicalOp::Not, a))
    }
}

struct TruthyParser;
impl OperatorParser for TruthyParser {
    fn operator(&self) -> &str {
        "!!"
    }
    fn parse(&self, args: Vec<Expression>) -> Result<Expression, RuleError> {
        require_args(args, 1, "!!").map(|a| {
            Expression::Logical(
                LogicalOp::Not,
                vec![Expression::Logical(LogicalOp::Not, a)],
            )
        })
    }
}

/// `{"in": [needle, haystack]}`: the same node as `contains` with arguments swapped.
struct InParser;
impl OperatorParser for InParser {
    fn operator(&self) -> &str {
        "in"
    }
    fn parse(&self, args: Vec<Expression>) -> Result<Expression, RuleError> {
        let (needle, haystack) = take_two(require_args(args, 2, "in")?);
        Ok(Expression::contains(haystack, needle))
    }
}

/// `{"contains": [haystack, needle]}`.
struct ContainsParser;
impl OperatorParser for ContainsParser {
    fn operator(&self) -> &str {
        "contains"
    }
    fn parse(&self, args: Vec<Expression>) -> Result<Expression, RuleError> {
        let (haystack, needle) = take_two(require_args(args, 2, "contains")?);
        Ok(Expression::contains(haystack, needle))
    }
}

struct VarParser;
impl OperatorParser for VarParser {
    fn operator(&self) -> &str {
        "var"
    }
    fn parse(&self, args: Vec<Expression>) -> Result<Expression, RuleError> {
        if args.is_empty() || args.len() > 2 {
            return Err(RuleError::Arity {
                operator: "var".to_string(),
                expected: "1 or 2".to_string(),
                found: args.len(),
            });
        }
        let mut iter = args.into_iter();
        let path = match iter.next() {
            Some(Expression::Literal(Value::String(s))) if !s.is_empty() => s,
            Some(Expression::Literal(Value::Number(n))) => Value::Number(n).to_string(),
            Some(other) => return Err(RuleError::UnsupportedVariable(format!("{:?}", other))),
            None => return Err(RuleError::UnsupportedVariable("<empty>".to_string())),
        };
        let fallback = match iter.next() {
            None => None,
            Some(Expression::Literal(value)) => Some(value),
            Some(other) => return Err(RuleError::UnsupportedVariable(format!("{:?}", other))),
        };
        Ok(Expression::Variable {
            path: VariablePath::parse(&path),
            fallback,
        })
    }
}

/// Folds `[c1, a1, c2, a2, ..., else]` into nested conditionals.
fn parse_branches(operator: &str, args: Vec<Expression>) -> Result<Expression, RuleError> {
    if args.len() < 2 {
        return Err(RuleError::Arity {
            operator: operator.to_string(),
            expected: "at least 2".to_string(),
            found: args.len(),
        });
    }
    let mut args = args;
    let mut otherwise = if args.len() % 2 == 1 {
        args.pop().unwrap_or(Expression::Literal(Value::Undefined))
    } else {
        Expression::Literal(Value::Undefined)
    };
    while let (Some(then), Some(condition)) = (args.pop(), args.pop()) {
        otherwise =
            Expression::Conditional(Box::new(condition), Box::new(then), Box::new(otherwise));
    }
    Ok(otherwise)
}

struct IfParser;
impl OperatorParser for IfParser {
    fn operator(&self) -> &str {
        "if"
    }
    fn parse(&self, args: Vec<Expression>) -> Result<Expression, RuleError> {
        parse_branches("if", args)
    }
}

struct TernaryParser;
impl OperatorParser for TernaryParser {
    fn operator(&self) -> &str {
        "?:"
    }
    fn parse(&self, args: Vec<Expression>) -> Result<Expression, RuleError> {
        parse_branches("?:", require_args(args, 3, "?:")?)
    }
}

struct DateDiffYearsParser;
impl OperatorParser for DateDiffYearsParser {
    fn operator(&self) -> &str {
        "dateDiffYears"
    }
    fn parse(&self, args: Vec<Expression>) -> Result<Expression, RuleError> {
        let (from, to) = take_two(require_args(args, 2, "dateDiffYears")?);
        Ok(Expression::DateDiffYears(Box::new(from), Box::new(to)))
    }
}

struct CurrentDateParser;
impl OperatorParser for CurrentDateParser {
    fn operator(&self) -> &str {
        "currentDate"
    }
    fn parse(&self, args: Vec<Expression>) -> Result<Expression, RuleError> {
        require_args(args, 0, "currentDate").map(|_| Expression::CurrentDate)
    }
}
