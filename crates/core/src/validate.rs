//! Per-section required-field validation.
//!
//! Validation is pure: it never mutates form data and has no side effects.
//! Each missing or blank required field produces one human-readable message,
//! in the order the fields are declared for the section. The final section's
//! validation doubles as the pre-submission gate.

use crate::fields::get_field;
use crate::schema::SectionDescriptor;
use intake_types::field_label;
use serde::Serialize;
use serde_json::Value;

/// The result of validating one section against its required fields.
///
/// Constructed so that `ok` is true exactly when `errors` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    ok: bool,
    errors: Vec<String>,
}

impl ValidationOutcome {
    /// An outcome with no errors.
    pub fn valid() -> Self {
        Self {
            ok: true,
            errors: Vec::new(),
        }
    }

    /// An outcome carrying the given error messages.
    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            ok: errors.is_empty(),
            errors,
        }
    }

    /// True when the section validated cleanly.
    pub fn ok(&self) -> bool {
        self.ok
    }

    /// The error messages, in declared field order.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Joins the error messages into a single line for error displays.
    pub fn summary(&self) -> String {
        self.errors.join("; ")
    }
}

/// Validates one section's required fields against the given form data.
///
/// A required field passes when it is present and, for strings (including
/// date fields, which are stored as strings), non-blank after trimming; for
/// lists, non-empty. Sections with no required fields always validate ok.
pub fn validate_section(section: &SectionDescriptor, data: &Value) -> ValidationOutcome {
    let mut errors = Vec::new();

    for path in section.required_fields() {
        let present = match get_field(data, path) {
            None | Some(Value::Null) => false,
            Some(Value::String(text)) => !text.trim().is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(_) => true,
        };

        if !present {
            errors.push(format!("{} is required", field_label(path)));
        }
    }

    ValidationOutcome::invalid(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use intake_types::FieldPath;
    use serde_json::json;

    fn section(required: &[&str]) -> SectionDescriptor {
        SectionDescriptor::new(
            0,
            "Demographics",
            required
                .iter()
                .map(|p| FieldPath::new(p).expect("test path should be valid"))
                .collect(),
        )
    }

    #[test]
    fn test_section_without_required_fields_always_validates_ok() {
        let outcome = validate_section(&section(&[]), &json!({}));
        assert!(outcome.ok());
        assert!(outcome.errors().is_empty());
    }

    #[test]
    fn test_blank_string_produces_human_readable_message() {
        let outcome = validate_section(&section(&["firstName"]), &json!({ "firstName": "  " }));
        assert!(!outcome.ok());
        assert_eq!(outcome.errors(), ["First name is required"]);
    }

    #[test]
    fn test_missing_and_null_fields_are_reported() {
        let data = json!({ "lastName": null });
        let outcome = validate_section(&section(&["firstName", "lastName"]), &data);
        assert_eq!(
            outcome.errors(),
            ["First name is required", "Last name is required"]
        );
    }

    #[test]
    fn test_errors_follow_declared_field_order() {
        let data = json!({});
        let outcome = validate_section(&section(&["dateOfBirth", "firstName"]), &data);
        assert_eq!(
            outcome.errors(),
            ["Date of birth is required", "First name is required"]
        );
    }

    #[test]
    fn test_nested_required_fields_are_resolved_by_path() {
        let data = json!({ "emergencyContact": { "phone": "0123" } });
        let outcome = validate_section(&section(&["emergencyContact.phone"]), &data);
        assert!(outcome.ok());

        let outcome = validate_section(&section(&["emergencyContact.name"]), &data);
        assert_eq!(outcome.errors(), ["Name is required"]);
    }

    #[test]
    fn test_empty_list_counts_as_missing() {
        let data = json!({ "allergies": [] });
        let outcome = validate_section(&section(&["allergies"]), &data);
        assert_eq!(outcome.errors(), ["Allergies is required"]);

        let data = json!({ "allergies": ["Penicillin"] });
        assert!(validate_section(&section(&["allergies"]), &data).ok());
    }

    #[test]
    fn test_present_booleans_and_numbers_pass() {
        let data = json!({ "consentToTreatment": false, "heightCm": 0 });
        let outcome = validate_section(&section(&["consentToTreatment", "heightCm"]), &data);
        assert!(outcome.ok(), "present non-string values should pass");
    }

    #[test]
    fn test_validation_is_pure() {
        let data = json!({ "firstName": "" });
        let descriptor = section(&["firstName"]);

        let first = validate_section(&descriptor, &data);
        let second = validate_section(&descriptor, &data);

        assert_eq!(first, second, "repeated validation should be identical");
        assert_eq!(
            data,
            json!({ "firstName": "" }),
            "validation should not mutate data"
        );
    }
}
