//! Form schemas: ordered section descriptors plus default data.
//!
//! A schema is static configuration supplied at session construction. The
//! wizard core itself is schema-agnostic; everything form-specific (section
//! titles, required fields, list-like fields, default values) lives here and
//! is validated once, at construction.

use crate::{IntakeError, IntakeResult};
use intake_types::FieldPath;
use serde::Serialize;
use serde_json::Value;

/// One page/step of a multi-section form.
///
/// Static, defined by the form's schema; never mutated at runtime.
#[derive(Debug, Clone, Serialize)]
pub struct SectionDescriptor {
    index: usize,
    title: String,
    required_fields: Vec<FieldPath>,
}

impl SectionDescriptor {
    /// Creates a descriptor. Indices are checked against their position when
    /// the owning [`FormSchema`] is constructed.
    pub fn new(index: usize, title: &str, required_fields: Vec<FieldPath>) -> Self {
        Self {
            index,
            title: title.to_owned(),
            required_fields,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Required field paths, in declaration order.
    pub fn required_fields(&self) -> &[FieldPath] {
        &self.required_fields
    }
}

/// The static description of one multi-section form.
#[derive(Debug, Clone)]
pub struct FormSchema {
    slug: String,
    sections: Vec<SectionDescriptor>,
    defaults: Value,
    list_fields: Vec<FieldPath>,
}

impl FormSchema {
    /// Creates a schema, validating its shape.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::InvalidInput` if the slug is blank, there are no
    /// sections, a section's index does not match its position, or the
    /// defaults are not a JSON object.
    pub fn new(
        slug: &str,
        sections: Vec<SectionDescriptor>,
        defaults: Value,
        list_fields: Vec<FieldPath>,
    ) -> IntakeResult<Self> {
        if slug.trim().is_empty() {
            return Err(IntakeError::InvalidInput("schema slug cannot be empty".into()));
        }
        if sections.is_empty() {
            return Err(IntakeError::InvalidInput(
                "a form schema requires at least one section".into(),
            ));
        }
        for (position, section) in sections.iter().enumerate() {
            if section.index() != position {
                return Err(IntakeError::InvalidInput(format!(
                    "section '{}' declares index {} but sits at position {}",
                    section.title(),
                    section.index(),
                    position
                )));
            }
        }
        if !defaults.is_object() {
            return Err(IntakeError::InvalidInput(
                "schema defaults must be a JSON object".into(),
            ));
        }

        Ok(Self {
            slug: slug.trim().to_owned(),
            sections,
            defaults,
            list_fields,
        })
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn sections(&self) -> &[SectionDescriptor] {
        &self.sections
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Index of the final section, the terminal wizard state.
    pub fn last_index(&self) -> usize {
        self.sections.len() - 1
    }

    /// The section at `index`, or `None` when out of range.
    pub fn section(&self, index: usize) -> Option<&SectionDescriptor> {
        self.sections.get(index)
    }

    /// A fresh copy of the schema's default data object.
    pub fn defaults(&self) -> Value {
        self.defaults.clone()
    }

    /// Fields whose committed value is always an ordered string sequence.
    pub fn list_fields(&self) -> &[FieldPath] {
        &self.list_fields
    }

    /// True when `path` is declared as a list-like field.
    pub fn is_list_field(&self, path: &FieldPath) -> bool {
        self.list_fields.iter().any(|candidate| candidate == path)
    }
}
