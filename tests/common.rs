//! Common test utilities: form configurations, pinned interpreters and value snapshots.
use chrono::NaiveDate;
use kensho::prelude::*;
use serde_json::json;

/// The evaluation date every deterministic test runs on.
#[allow(dead_code)]
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
}

/// An interpreter whose `currentDate` is pinned to `today()`.
#[allow(dead_code)]
pub fn pinned_interpreter() -> Interpreter {
    Interpreter::builder().with_today(today()).build()
}

/// Age gate: `employed` appears from 18, `companyName` once employed is "yes".
#[allow(dead_code)]
pub fn employment_config() -> serde_json::Value {
    json!({
        "title": "Employment",
        "fields": [
            { "name": "age", "type": "number", "label": "Age", "required": true },
            {
                "name": "employed",
                "type": "radio",
                "label": "Employed",
                "options": ["yes", "no"],
                "conditions": { ">=": [{ "var": "age" }, 18] },
                "validation": { "required": "Please select your employment status" }
            },
            {
                "name": "companyName",
                "type": "text",
                "label": "Company name",
                "conditions": { "==": [{ "var": "employed" }, "yes"] },
                "validation": { "required": true, "maxLength": 50 }
            }
        ]
    })
}

/// Two steps; the co-borrower step only exists for joint applications.
#[allow(dead_code)]
pub fn loan_config() -> serde_json::Value {
    json!({
        "title": "Loan application",
        "steps": [
            {
                "id": "applicant",
                "label": "Applicant",
                "fields": [
                    {
                        "name": "applicationType",
                        "type": "select",
                        "label": "Application type",
                        "options": [
                            { "label": "Individual", "value": "INDIVIDUAL" },
                            { "label": "Joint", "value": "JOINT" }
                        ],
                        "required": true
                    },
                    { "name": "email", "type": "email", "label": "Email", "required": true },
                    {
                        "name": "phone",
                        "type": "text",
                        "label": "Phone",
                        "validation": { "pattern": { "value": "^[0-9]{10}$", "message": "Enter 10 digits" } }
                    },
                    {
                        "name": "dateOfBirth",
                        "type": "date",
                        "label": "Date of birth",
                        "validation": { "required": true, "minAge": { "value": 18, "message": "Applicants must be adults" } }
                    },
                    { "name": "intro", "type": "label", "label": "Tell us about your co-borrower" }
                ]
            },
            {
                "id": "coBorrower",
                "label": "Co-borrower",
                "conditions": { "==": [{ "var": "applicationType" }, "JOINT"] },
                "fields": [
                    { "name": "coName", "type": "text", "label": "Co-borrower name", "required": true },
                    {
                        "name": "coPhone",
                        "type": "text",
                        "label": "Co-borrower phone",
                        "validation": { "notEqualToPhone": "Co-borrower phone must differ from yours" }
                    }
                ]
            }
        ]
    })
}

#[allow(dead_code)]
pub fn load(config: serde_json::Value) -> FormSpec {
    let interpreter = pinned_interpreter();
    let load = FormLoader::new(&interpreter)
        .load_json(config)
        .expect("Failed to load form configuration");
    assert!(load.issues.is_empty(), "unexpected issues: {:?}", load.issues);
    load.form
}

#[allow(dead_code)]
pub fn env(json: serde_json::Value) -> Environment {
    Environment::from_json(json)
}
