//! The canonical patient intake schema.
//!
//! Nine sections, from demographics through to review and consent. List
//! fields (allergies, medications, conditions) are declared so that
//! comma-separated text entry is normalised into clean string lists at
//! commit time.

use crate::schema::{FormSchema, SectionDescriptor};
use crate::IntakeResult;
use intake_types::FieldPath;
use serde_json::json;

/// Slug identifying the patient intake schema.
pub const PATIENT_INTAKE_SLUG: &str = "patient-intake";

fn path(s: &str) -> IntakeResult<FieldPath> {
    Ok(FieldPath::new(s)?)
}

/// Builds the patient intake schema.
pub fn patient_intake_schema() -> IntakeResult<FormSchema> {
    let sections = vec![
        SectionDescriptor::new(
            0,
            "Demographics",
            vec![path("firstName")?, path("lastName")?, path("dateOfBirth")?],
        ),
        SectionDescriptor::new(1, "Contact details", vec![path("email")?, path("phone")?]),
        SectionDescriptor::new(
            2,
            "Emergency contact",
            vec![path("emergencyContact.name")?, path("emergencyContact.phone")?],
        ),
        SectionDescriptor::new(3, "Insurance", vec![path("insurance.provider")?]),
        SectionDescriptor::new(4, "Allergies and medications", vec![]),
        SectionDescriptor::new(5, "Medical history", vec![]),
        SectionDescriptor::new(6, "Lifestyle", vec![]),
        SectionDescriptor::new(7, "General practitioner", vec![]),
        SectionDescriptor::new(
            8,
            "Review and consent",
            vec![path("consentGiven")?, path("signature")?],
        ),
    ];

    let defaults = json!({
        "firstName": "",
        "lastName": "",
        "dateOfBirth": "",
        "email": "",
        "phone": "",
        "address": {
            "line1": "",
            "line2": "",
            "city": "",
            "postcode": ""
        },
        "emergencyContact": {
            "name": "",
            "relationship": "",
            "phone": ""
        },
        "insurance": {
            "provider": "",
            "policyNumber": ""
        },
        "allergies": [],
        "medications": [],
        "conditions": [],
        "smokingStatus": "",
        "alcoholUse": "",
        "gpName": "",
        "gpPractice": "",
        "notes": "",
        "signature": ""
    });

    let list_fields = vec![path("allergies")?, path("medications")?, path("conditions")?];

    FormSchema::new(PATIENT_INTAKE_SLUG, sections, defaults, list_fields)
}
