//! Contact extraction from candidate analysis blobs.
//!
//! The CV analyser has produced several shapes over time (`name` vs
//! `candidate_name` vs `personal_info.name`, ...). Extraction walks a
//! priority-ordered rule table against the raw JSON value; the first rule
//! whose path holds a truthy value wins. Supporting a new shape means adding
//! a row to [`EXTRACTION_RULES`].

use serde::Serialize;
use serde_json::Value;

pub const UNNAMED_CANDIDATE: &str = "Unnamed Candidate";
pub const NOT_AVAILABLE: &str = "N/A";
const UNKNOWN_NAME: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    Name,
    Email,
    Phone,
}

impl ContactField {
    fn fallback(self) -> &'static str {
        match self {
            ContactField::Name => UNKNOWN_NAME,
            ContactField::Email | ContactField::Phone => NOT_AVAILABLE,
        }
    }
}

/// One lookup: the key path into the blob and the field it fills.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionRule {
    pub field: ContactField,
    pub path: &'static [&'static str],
}

const fn rule(field: ContactField, path: &'static [&'static str]) -> ExtractionRule {
    ExtractionRule { field, path }
}

/// Rules in priority order. Keys are matched case-sensitively.
pub const EXTRACTION_RULES: &[ExtractionRule] = &[
    rule(ContactField::Name, &["name"]),
    rule(ContactField::Name, &["candidate_name"]),
    rule(ContactField::Name, &["full_name"]),
    rule(ContactField::Name, &["personal_info", "name"]),
    rule(ContactField::Email, &["email"]),
    rule(ContactField::Email, &["contact_email"]),
    rule(ContactField::Email, &["personal_info", "email"]),
    rule(ContactField::Phone, &["phone"]),
    rule(ContactField::Phone, &["phone_number"]),
    rule(ContactField::Phone, &["contact_phone"]),
    rule(ContactField::Phone, &["personal_info", "phone"]),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl ContactDetails {
    /// What a candidate shows when nothing could be extracted.
    pub fn sentinel() -> Self {
        Self {
            name: UNNAMED_CANDIDATE.to_string(),
            email: NOT_AVAILABLE.to_string(),
            phone: NOT_AVAILABLE.to_string(),
        }
    }
}

/// Best-effort name/email/phone from a blob of unknown shape.
pub fn extract_contact(blob: &Value) -> ContactDetails {
    let name = resolve(blob, ContactField::Name);
    let name = if name.trim().is_empty() || name == UNKNOWN_NAME || name == NOT_AVAILABLE {
        UNNAMED_CANDIDATE.to_string()
    } else {
        name
    };

    ContactDetails {
        name,
        email: resolve(blob, ContactField::Email),
        phone: resolve(blob, ContactField::Phone),
    }
}

fn resolve(blob: &Value, field: ContactField) -> String {
    EXTRACTION_RULES
        .iter()
        .filter(|r| r.field == field)
        .find_map(|r| truthy_at(blob, r.path))
        .unwrap_or_else(|| field.fallback().to_string())
}

fn truthy_at(blob: &Value, path: &[&str]) -> Option<String> {
    let value = path
        .iter()
        .try_fold(blob, |current, key| current.get(*key))?;

    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
        _ => None,
    }
}
