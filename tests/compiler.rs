//! Rule compilation: operator table, optimizer and error reporting.
use kensho::compiler::RuleCompiler;
use kensho::prelude::*;
use serde_json::json;

#[test]
fn test_constant_rules_fold_to_literals() {
    let compiler = RuleCompiler::default();
    let expr = compiler
        .compile(&json!({ "and": [true, { "==": [1, 1] }, { "in": ["a", ["a", "b"]] }] }))
        .expect("Failed to compile");
    assert_eq!(expr, Expression::Literal(Value::Bool(true)));
}

#[test]
fn test_variables_and_current_date_are_never_folded() {
    let compiler = RuleCompiler::default();
    let expr = compiler
        .compile(&json!({ "and": [true, { ">": [{ "dateDiffYears": ["2000-01-01", { "currentDate": [] }] }, 18] }] }))
        .unwrap();
    assert!(!expr.is_constant());

    let expr = compiler.compile(&json!({ "or": [false, { "var": "x" }] })).unwrap();
    let mut paths = std::collections::HashSet::new();
    expr.get_referenced_paths(&mut paths);
    assert_eq!(paths.len(), 1);
}

#[test]
fn test_conditions_array_is_an_implicit_and() {
    let compiler = RuleCompiler::default();
    let rule = compiler.compile_conditions(&json!([
        { ">=": [{ "var": "age" }, 18] },
        { "==": [{ "var": "employed" }, "yes"] }
    ]));
    assert!(rule.is_compiled());
    let names: Vec<String> = rule
        .referenced_paths()
        .into_iter()
        .map(|p| p.as_str().to_string())
        .collect();
    assert_eq!(names.len(), 2);

    let interpreter = Interpreter::new();
    let env: Environment = [("age", Value::from(20)), ("employed", Value::from("no"))]
        .into_iter()
        .collect();
    assert_eq!(interpreter.evaluate_rule(&rule, &env), Ok(Value::Bool(false)));
}

#[test]
fn test_compile_errors() {
    let compiler = RuleCompiler::default();
    assert!(matches!(
        compiler.compile(&json!({ "nope": [] })),
        Err(RuleError::UnknownOperator { .. })
    ));
    assert!(matches!(
        compiler.compile(&json!({ "==": [1] })),
        Err(RuleError::Arity { found: 1, .. })
    ));
    assert!(matches!(
        compiler.compile(&json!({ "==": [1, 2], "!=": [1, 2] })),
        Err(RuleError::Malformed(_))
    ));
    assert!(matches!(
        compiler.compile(&json!({ "var": { "var": "x" } })),
        Err(RuleError::UnsupportedVariable(_))
    ));

    let rule = compiler.compile_rule(&json!({ "nope": [] }));
    assert!(!rule.is_compiled());
    assert!(rule.referenced_paths().is_empty());
    assert_eq!(rule.source(), &json!({ "nope": [] }));
}

#[test]
fn test_operator_table_is_explicit() {
    let compiler = RuleCompiler::default();
    for operator in ["==", "!=", "<", "<=", ">", ">=", "and", "or", "!", "in", "contains", "var", "if", "dateDiffYears", "currentDate"] {
        assert!(compiler.supports(operator), "missing {}", operator);
    }
    assert!(!compiler.supports("equals"));

    let aliased = RuleCompiler::builder().with_operator_alias("equals", "==").build();
    assert!(aliased.supports("equals"));
    let ignored = RuleCompiler::builder().with_operator_alias("bogus", "not-an-operator").build();
    assert!(!ignored.supports("bogus"));
}
