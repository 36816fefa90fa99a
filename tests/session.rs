//! End-to-end tests for interactive form sessions.
mod common;
use common::*;
use kensho::prelude::*;
use serde_json::json;

fn employment_session() -> FormSession {
    FormSession::new(load(employment_config()), pinned_interpreter())
}

#[test]
fn test_employment_flow_end_to_end() {
    let mut session = employment_session();
    assert!(session.is_visible("age"));
    assert!(!session.is_visible("employed"));
    assert!(!session.is_visible("companyName"));

    let changes = session.set_value("age", 18);
    assert_eq!(changes.shown().collect::<Vec<_>>(), vec!["employed"]);
    assert_eq!(session.error("employed"), Some("Please select your employment status"));
    // Not touched and not submitted yet, so nothing is displayed.
    assert_eq!(session.field_error("employed"), None);

    let changes = session.set_value("employed", "yes");
    assert_eq!(changes.shown().collect::<Vec<_>>(), vec!["companyName"]);
    assert_eq!(session.error("employed"), None);

    let rejection = session.submit().unwrap_err();
    assert_eq!(
        rejection.errors,
        vec![FieldError {
            field: "companyName".to_string(),
            message: "Company name is required".to_string(),
        }]
    );
    assert_eq!(rejection.first_invalid, "companyName");

    session.set_value("companyName", "Acme");
    let submission = session.submit().expect("form should be valid");
    assert_eq!(
        submission.to_json(),
        json!({ "age": 18, "employed": "yes", "companyName": "Acme" })
    );

    let changes = session.set_value("age", 16);
    assert_eq!(changes.hidden().collect::<Vec<_>>(), vec!["employed", "companyName"]);
    assert!(!session.is_visible("employed"));
    assert!(!session.is_visible("companyName"));
    assert_eq!(session.submit().expect("only age is left").to_json(), json!({ "age": 16 }));
}

#[test]
fn test_writing_to_a_hidden_field_does_not_stick() {
    let mut session = employment_session();
    session.set_value("age", 16);

    let changes = session.set_value("employed", "yes");
    assert_eq!(
        changes.directives,
        vec![Directive::ClearValue { field: "employed".to_string(), value: Value::from("") }]
    );
    assert_eq!(session.value("employed"), Value::from(""));
    assert!(!session.is_visible("companyName"));

    let submission = session.submit().expect("hidden fields never block a submit");
    assert_eq!(submission.to_json(), json!({ "age": 16 }));
}

#[test]
fn test_submit_reports_first_invalid_field() {
    let mut session = employment_session();
    session.set_value("age", 21);

    let rejection = session.submit().unwrap_err();
    assert_eq!(rejection.first_invalid, "employed");
    assert_eq!(
        rejection.errors,
        vec![FieldError {
            field: "employed".to_string(),
            message: "Please select your employment status".to_string(),
        }]
    );
    // After a submit attempt errors are displayed without touching.
    assert_eq!(
        session.field_error("employed"),
        Some("Please select your employment status")
    );
}

#[test]
fn test_hiding_a_field_resets_it_like_it_was_never_shown() {
    let mut session = employment_session();
    session.set_value("age", 30);
    session.set_value("employed", "yes");
    session.set_value("companyName", "");
    session.touch("companyName");
    assert_eq!(session.field_error("companyName"), Some("Company name is required"));

    let changes = session.set_value("employed", "no");
    assert_eq!(
        changes.directives,
        vec![
            Directive::Hidden { field: "companyName".to_string() },
            Directive::ClearValue { field: "companyName".to_string(), value: Value::from("") },
            Directive::ClearError { field: "companyName".to_string() },
        ]
    );
    assert_eq!(session.error("companyName"), None);
    assert!(!session.is_touched("companyName"));

    session.set_value("employed", "yes");

    let mut fresh = employment_session();
    fresh.set_value("age", 30);
    fresh.set_value("employed", "yes");

    assert_eq!(session.values(), fresh.values());
    assert_eq!(session.error("companyName"), fresh.error("companyName"));
    assert_eq!(session.field_error("companyName"), None);
    assert!(!session.is_touched("companyName"));
}

#[test]
fn test_hiding_cascades_through_dependents() {
    let mut session = employment_session();
    session.set_value("age", 30);
    session.set_value("employed", "yes");
    session.set_value("companyName", "Acme");

    let changes = session.set_value("age", 17);
    assert_eq!(changes.hidden().collect::<Vec<_>>(), vec!["employed", "companyName"]);
    assert_eq!(session.value("employed"), Value::from(""));
    assert_eq!(session.value("companyName"), Value::from(""));

    let submission = session.submit().expect("only age is visible");
    assert_eq!(submission.to_json(), json!({ "age": 17 }));
}

#[test]
fn test_step_visibility_gates_fields_and_payload() {
    let mut session = FormSession::new(load(loan_config()), pinned_interpreter());
    session.set_value("applicationType", "INDIVIDUAL");
    session.set_value("email", "jane@example.com");
    session.set_value("dateOfBirth", "1990-01-01");

    assert!(!session.is_step_visible("coBorrower"));
    assert_eq!(session.visible_steps(), vec!["applicant"]);
    assert!(!session.is_visible("coName"));

    let submission = session.submit().expect("individual application is complete");
    let payload = submission.to_json();
    assert!(payload.get("coName").is_none());
    assert!(payload.get("intro").is_none(), "labels never reach the payload");
    assert_eq!(payload["applicationType"], json!("INDIVIDUAL"));

    let changes = session.set_value("applicationType", "JOINT");
    assert_eq!(changes.shown().collect::<Vec<_>>(), vec!["coName", "coPhone"]);
    let rejection = session.submit().unwrap_err();
    assert_eq!(rejection.first_invalid, "coName");
}

#[test]
fn test_array_rows_are_validated_individually() {
    let form = load(json!({ "fields": [
        {
            "name": "employers",
            "type": "array",
            "label": "Employers",
            "minItems": { "value": 1, "message": "Add at least one employer" },
            "arrayItemFields": [
                { "name": "name", "type": "text", "label": "Employer name", "required": true },
                {
                    "name": "endDate",
                    "type": "date",
                    "label": "End date",
                    "conditions": { "==": [{ "var": "current" }, false] },
                    "required": true
                },
                { "name": "current", "type": "checkbox", "label": "Current employer" }
            ]
        }
    ]}));
    let mut session = FormSession::new(form, pinned_interpreter());

    let rejection = session.submit().unwrap_err();
    assert_eq!(rejection.errors[0].message, "Add at least one employer");

    session.set_value(
        "employers",
        Value::from(json!([
            { "name": "Acme", "current": true },
            { "name": "", "current": false, "endDate": "" }
        ])),
    );
    let rejection = session.submit().unwrap_err();
    let keys: Vec<&str> = rejection.errors.iter().map(|e| e.field.as_str()).collect();
    assert_eq!(keys, vec!["employers.1.name", "employers.1.endDate"]);
    assert_eq!(session.field_error("employers.1.name"), Some("Employer name is required"));
}

fn employers_form() -> FormSpec {
    load(json!({ "fields": [
        {
            "name": "employers",
            "type": "array",
            "label": "Employers",
            "arrayItemFields": [
                { "name": "name", "type": "text", "label": "Employer name", "required": true },
                { "name": "current", "type": "checkbox", "label": "Current employer" },
                {
                    "name": "endDate",
                    "type": "date",
                    "label": "End date",
                    "conditions": { "==": [{ "var": "current" }, false] }
                }
            ]
        }
    ]}))
}

#[test]
fn test_hidden_row_items_are_reset_and_left_out_of_the_payload() {
    let mut session = FormSession::new(employers_form(), pinned_interpreter());
    session.set_value(
        "employers",
        Value::from(json!([{ "name": "Acme", "current": true, "endDate": "2020-01-01" }])),
    );
    assert!(!session.is_visible("employers.0.endDate"));
    assert_eq!(session.value("employers.0.endDate"), Value::from(""));

    let submission = session.submit().expect("row is complete");
    assert_eq!(
        submission.to_json(),
        json!({ "employers": [{ "name": "Acme", "current": true }] })
    );
}

#[test]
fn test_row_paths_edit_rows_in_place() {
    let mut session = FormSession::new(employers_form(), pinned_interpreter());
    session.set_value("employers.0.current", false);
    assert_eq!(session.error("employers.0.name"), Some("Employer name is required"));
    assert!(session.is_visible("employers.0.endDate"));

    session.set_value("employers.0.name", "Acme");
    session.set_value("employers.0.endDate", "2020-01-01");
    assert_eq!(session.value("employers.0.name"), Value::from("Acme"));
    assert_eq!(session.error("employers.0.name"), None);

    let changes = session.set_value("employers.0.current", true);
    assert_eq!(
        changes.directives,
        vec![
            Directive::Hidden { field: "employers.0.endDate".to_string() },
            Directive::ClearValue { field: "employers.0.endDate".to_string(), value: Value::from("") },
            Directive::ClearError { field: "employers.0.endDate".to_string() },
        ]
    );
    assert!(!session.values().contains("employers.0.name"));

    let submission = session.submit().expect("row is complete");
    assert_eq!(
        submission.to_json(),
        json!({ "employers": [{ "name": "Acme", "current": true }] })
    );
}

#[test]
fn test_computed_fields_follow_their_sources() {
    let form = load(json!({ "fields": [
        { "name": "dob", "type": "date", "label": "Date of birth" },
        {
            "name": "age",
            "type": "hidden",
            "label": "Age",
            "computed": { "dateDiffYears": [{ "var": "dob" }, { "currentDate": [] }] }
        },
        {
            "name": "guardian",
            "type": "text",
            "label": "Guardian",
            "conditions": { "<": [{ "var": "age" }, 18] }
        }
    ]}));
    let mut session = FormSession::new(form, pinned_interpreter());

    let changes = session.set_value("dob", "2010-06-01");
    assert!(changes.directives.contains(&Directive::Computed {
        field: "age".to_string(),
        value: Value::Number(13.0),
    }));
    assert!(changes.shown().any(|f| f == "guardian"));

    let changes = session.set_value("dob", "1980-06-01");
    assert!(changes.hidden().any(|f| f == "guardian"));
    assert_eq!(session.value("age"), Value::Number(43.0));
}

#[test]
fn test_reset_restores_the_initial_state() {
    let mut session = employment_session();
    session.set_value("age", 30);
    session.touch("age");
    let _ = session.submit();

    session.reset();
    assert!(!session.is_submitted());
    assert!(!session.is_touched("age"));
    assert_eq!(session.value("age"), Value::from(""));
    assert!(!session.is_visible("employed"));
    assert_eq!(session.field_error("age"), None);
}
