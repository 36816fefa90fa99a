//! Unit tests for core Kensho types.
use kensho::prelude::*;
use serde_json::json;

#[test]
fn test_value_display() {
    assert_eq!(format!("{}", Value::Number(42.0)), "42");
    assert_eq!(format!("{}", Value::Number(2.5)), "2.5");
    assert_eq!(format!("{}", Value::Bool(true)), "true");
    assert_eq!(format!("{}", Value::Null), "null");
    assert_eq!(format!("{}", Value::from("JOINT")), "JOINT");
}

#[test]
fn test_truthiness() {
    for falsy in [json!(null), json!(false), json!(0), json!(""), json!([])] {
        assert!(!Value::from(falsy.clone()).is_truthy(), "{} should be falsy", falsy);
    }
    for truthy in [json!(true), json!(1), json!("0"), json!([0]), json!({})] {
        assert!(Value::from(truthy.clone()).is_truthy(), "{} should be truthy", truthy);
    }
    assert!(!Value::Undefined.is_truthy());
}

#[test]
fn test_integral_numbers_serialize_as_integers() {
    assert_eq!(Value::Number(18.0).to_json(), json!(18));
    assert_eq!(Value::Number(2.5).to_json(), json!(2.5));
    assert_eq!(Value::Undefined.to_json(), json!(null));
}

#[test]
fn test_variable_path_display() {
    let path = VariablePath::parse("employers[0].name");
    assert_eq!(format!("{}", path), "$employers[0].name");
    assert_eq!(path.segments(), ["employers", "0", "name"]);
    assert_eq!(path.root(), "employers");
}

#[test]
fn test_environment_resolves_dotted_paths() {
    let env = Environment::from_json(json!({
        "employers": [{ "name": "Acme" }],
        "address.city": "Oslo"
    }));
    assert_eq!(env.resolve_str("employers.0.name"), Value::from("Acme"));
    assert_eq!(env.resolve_str("address.city"), Value::from("Oslo"));
    assert_eq!(env.resolve_str("employers.3.name"), Value::Undefined);
    assert_eq!(env.resolve_str("missing"), Value::Undefined);
}

#[test]
fn test_field_kind_parsing_and_empty_values() {
    assert_eq!("multi".parse::<FieldKind>(), Ok(FieldKind::Multi));
    assert!("slider".parse::<FieldKind>().is_err());
    assert_eq!(FieldKind::Checkbox.empty_value(), Value::Bool(false));
    assert_eq!(FieldKind::Multi.empty_value(), Value::Array(vec![]));
    assert_eq!(FieldKind::Text.empty_value(), Value::from(""));
    assert!(!FieldKind::Label.carries_value());
}

#[test]
fn test_error_messages() {
    let error = RuleError::UnknownOperator {
        operator: "frobnicate".to_string(),
    };
    assert_eq!(error.to_string(), "Unknown rule operator 'frobnicate'");
    let error = ConfigShapeError::MissingKey {
        step: "main".to_string(),
        index: 2,
        key: "label",
    };
    assert_eq!(error.to_string(), "Field #2 in step 'main' is missing required key 'label'");
}
