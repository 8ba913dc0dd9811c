//! Shared validated types for the Intake form system.
//!
//! This crate contains the small value types that cross crate boundaries:
//! draft keys, dotted field paths, and the label humanisation used to turn
//! field paths into human-readable validation messages. Types here validate
//! their content at construction so that downstream code never has to
//! re-check it.

/// Errors that can occur when creating a validated draft key.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// The input was empty or contained only whitespace
    #[error("draft key cannot be empty")]
    Empty,
    /// The input exceeded the maximum permitted length
    #[error("draft key exceeds maximum length of {0} characters")]
    TooLong(usize),
    /// The input contained characters outside the permitted set
    #[error("draft key contains invalid characters (only alphanumeric, '.', '-', '_' allowed)")]
    InvalidCharacters,
}

/// A validated key addressing one draft in a draft store.
///
/// Keys are embedded into storage filenames and URLs, so the permitted
/// character set is deliberately conservative: ASCII alphanumerics plus
/// `.`, `-` and `_`. Input is trimmed of surrounding whitespace during
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DraftKey(String);

impl DraftKey {
    /// Maximum permitted key length, bounded to avoid pathological inputs.
    pub const MAX_LEN: usize = 128;

    /// Creates a new `DraftKey` from the given input.
    ///
    /// # Errors
    ///
    /// Returns a `KeyError` if the trimmed input is empty, too long, or
    /// contains characters outside the permitted set.
    pub fn new(input: impl AsRef<str>) -> Result<Self, KeyError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(KeyError::Empty);
        }
        if trimmed.len() > Self::MAX_LEN {
            return Err(KeyError::TooLong(Self::MAX_LEN));
        }

        let ok = trimmed
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_'));
        if !ok {
            return Err(KeyError::InvalidCharacters);
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DraftKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for DraftKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for DraftKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for DraftKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DraftKey::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when creating a validated field path.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// The input was empty or contained only whitespace
    #[error("field path cannot be empty")]
    Empty,
    /// A dot-separated segment was empty (leading, trailing or doubled dot)
    #[error("field path '{0}' contains an empty segment")]
    EmptySegment(String),
    /// A segment contained characters outside the permitted set
    #[error("field path segment '{0}' contains invalid characters (only alphanumeric and '_' allowed)")]
    InvalidSegment(String),
}

/// A validated dotted path into a nested form data object.
///
/// A path is one or more dot-separated segments, each naming a field at
/// successive nesting depth: `firstName` addresses a top-level field,
/// `emergencyContact.phone` a field inside a nested record. Segments are
/// restricted to ASCII alphanumerics and `_`, matching the field names the
/// form schemas use.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(String);

impl FieldPath {
    /// Creates a new `FieldPath` from the given dotted input.
    ///
    /// # Errors
    ///
    /// Returns a `PathError` if the trimmed input is empty, contains an
    /// empty segment, or a segment contains invalid characters.
    pub fn new(input: impl AsRef<str>) -> Result<Self, PathError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(PathError::Empty);
        }

        for segment in trimmed.split('.') {
            if segment.is_empty() {
                return Err(PathError::EmptySegment(trimmed.to_owned()));
            }
            let ok = segment
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'_'));
            if !ok {
                return Err(PathError::InvalidSegment(segment.to_owned()));
            }
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the full dotted path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates the dot-separated segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Returns the final segment, which names the field itself.
    pub fn last_segment(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for FieldPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for FieldPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for FieldPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FieldPath::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Produces a human-readable label for a field path.
///
/// The label is derived from the final path segment by splitting camelCase
/// and snake_case word boundaries, capitalising the first word and
/// lowercasing the rest: `firstName` becomes `First name`,
/// `emergencyContact.phone` becomes `Phone`, `date_of_birth` becomes
/// `Date of birth`.
pub fn field_label(path: &FieldPath) -> String {
    let segment = path.last_segment();

    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    for ch in segment.chars() {
        if ch == '_' {
            if !current.is_empty() {
                words.push(current.clone());
                current.clear();
            }
        } else if ch.is_ascii_uppercase() {
            if !current.is_empty() {
                words.push(current.clone());
                current.clear();
            }
            current.push(ch.to_ascii_lowercase());
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }

    let mut label = words.join(" ");
    if let Some(first) = label.get(..1) {
        let upper = first.to_ascii_uppercase();
        label.replace_range(..1, &upper);
    }
    label
}
