//! Field validation through loaded configurations.
mod common;
use common::*;
use kensho::prelude::*;
use serde_json::json;

fn field(form: &FormSpec, name: &str) -> FieldSpec {
    form.field(name).cloned().expect("field should be declared")
}

fn validate(form: &FormSpec, name: &str, values: serde_json::Value) -> ValidationOutcome {
    let values = env(values);
    let field = field(form, name);
    let value = values.resolve_str(name);
    pinned_interpreter().validate(&field, &value, &values)
}

#[test]
fn test_required_treats_every_empty_shape_alike() {
    let form = load(json!({ "fields": [
        { "name": "nickname", "type": "text", "label": "Nickname", "required": true }
    ]}));
    let expected = ValidationOutcome::Invalid("Nickname is required".to_string());
    for empty in [json!(null), json!(""), json!([])] {
        assert_eq!(validate(&form, "nickname", json!({ "nickname": empty })), expected);
    }
    assert_eq!(validate(&form, "nickname", json!({})), expected);

    assert!(validate(&form, "nickname", json!({ "nickname": 0 })).is_valid());
    assert!(validate(&form, "nickname", json!({ "nickname": "0" })).is_valid());
}

#[test]
fn test_required_checkbox_must_be_checked() {
    let form = load(json!({ "fields": [
        { "name": "terms", "type": "checkbox", "label": "Terms", "validation": { "required": "You must accept the terms" } }
    ]}));
    assert_eq!(
        validate(&form, "terms", json!({ "terms": false })),
        ValidationOutcome::Invalid("You must accept the terms".to_string())
    );
    assert!(validate(&form, "terms", json!({ "terms": true })).is_valid());
}

#[test]
fn test_hidden_field_is_never_invalid() {
    let form = load(employment_config());
    let outcome = validate(&form, "companyName", json!({ "age": 30, "employed": "no", "companyName": "" }));
    assert!(outcome.is_valid());
    let outcome = validate(&form, "companyName", json!({ "age": 30, "employed": "yes", "companyName": "" }));
    assert_eq!(outcome.message(), Some("Company name is required"));
}

#[test]
fn test_cross_field_ignores_blank_sides() {
    let form = load(loan_config());
    let joint = |phone: &str, co_phone: &str| {
        json!({ "applicationType": "JOINT", "phone": phone, "coPhone": co_phone })
    };
    assert!(validate(&form, "coPhone", joint("", "")).is_valid());
    assert!(validate(&form, "coPhone", joint("5551234567", "")).is_valid());
    assert!(validate(&form, "coPhone", joint("", "5551234567")).is_valid());
    assert!(validate(&form, "coPhone", joint("5551234567", "5559999999")).is_valid());
    assert_eq!(
        validate(&form, "coPhone", joint("5551234567", "5551234567")).message(),
        Some("Co-borrower phone must differ from yours")
    );
}

#[test]
fn test_pattern_and_email_messages() {
    let form = load(loan_config());
    assert_eq!(
        validate(&form, "phone", json!({ "phone": "12ab" })).message(),
        Some("Enter 10 digits")
    );
    assert!(validate(&form, "phone", json!({ "phone": "" })).is_valid());
    assert_eq!(
        validate(&form, "email", json!({ "email": "jane@" })).message(),
        Some("Please enter a valid email address")
    );
    assert!(validate(&form, "email", json!({ "email": "jane@example.com" })).is_valid());
}

#[test]
fn test_min_age_uses_the_pinned_date() {
    let form = load(loan_config());
    assert_eq!(
        validate(&form, "dateOfBirth", json!({ "dateOfBirth": "2006-03-15" })).message(),
        Some("Applicants must be adults")
    );
    assert!(validate(&form, "dateOfBirth", json!({ "dateOfBirth": "2006-03-14" })).is_valid());
}

#[test]
fn test_number_checks_run_before_ranges() {
    let form = load(json!({ "fields": [
        { "name": "income", "type": "text", "label": "Income", "validation": { "min": 0, "max": { "value": 1000000, "message": "Too high" } } }
    ]}));
    assert_eq!(
        validate(&form, "income", json!({ "income": "lots" })).message(),
        Some("Income must be a number")
    );
    assert_eq!(
        validate(&form, "income", json!({ "income": "2000000" })).message(),
        Some("Too high")
    );
    assert!(validate(&form, "income", json!({ "income": "50000" })).is_valid());
}

#[test]
fn test_registered_predicate_and_rule_based_custom_checks() {
    let interpreter = pinned_interpreter();
    let load = FormLoader::new(&interpreter)
        .with_custom_validator("evenNumber", |value, _| Ok(value.to_number() % 2.0 == 0.0))
        .with_custom_validator("broken", |_, _| Err(CustomValidatorError::new("broken", "service down")))
        .load_json(json!({ "fields": [
            { "name": "even", "type": "number", "label": "Even", "validation": { "evenNumber": "Must be even" } },
            { "name": "fragile", "type": "text", "label": "Fragile", "validation": { "broken": true } },
            {
                "name": "confirm",
                "type": "text",
                "label": "Confirm",
                "validation": { "custom": { "rule": { "==": [{ "var": "confirm" }, { "var": "password" }] }, "message": "Passwords do not match" } }
            }
        ]}))
        .unwrap();
    let form = load.form;

    let check = |name: &str, values: serde_json::Value| {
        let values = env(values);
        interpreter.validate(form.field(name).unwrap(), &values.resolve_str(name), &values)
    };
    assert_eq!(check("even", json!({ "even": 3 })).message(), Some("Must be even"));
    assert!(check("even", json!({ "even": 4 })).is_valid());
    assert_eq!(check("fragile", json!({ "fragile": "x" })).message(), Some("Fragile is invalid"));
    assert_eq!(
        check("confirm", json!({ "confirm": "a", "password": "b" })).message(),
        Some("Passwords do not match")
    );
    assert!(check("confirm", json!({ "confirm": "a", "password": "a" })).is_valid());
}
