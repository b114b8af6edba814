//! Validated text primitives shared across the GP update workspace.
//!
//! Request payloads distinguish three states for a string field: absent, present but blank, and
//! present with content. Builders only ever want the last of these, so this crate provides:
//! - [`NonEmptyText`], a string guaranteed to hold at least one non-whitespace character
//! - [`non_blank`], which collapses "absent" and "blank" into `None`

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction, so a value
/// such as `"  Smith "` is stored as `"Smith"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Arguments
    ///
    /// * `input` - Any type that can be converted to a string reference
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Empty`] if the input is empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Returns the trimmed content of an optional string field, or `None` when it is absent or blank.
pub fn non_blank(input: Option<&str>) -> Option<&str> {
    input.map(str::trim).filter(|s| !s.is_empty())
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_surrounding_whitespace() {
        let text = NonEmptyText::new("  Smith \t").expect("non-empty");
        assert_eq!(text.as_str(), "Smith");
    }

    #[test]
    fn new_rejects_whitespace_only() {
        assert_eq!(NonEmptyText::new("   ").unwrap_err(), TextError::Empty);
        assert_eq!(NonEmptyText::new("").unwrap_err(), TextError::Empty);
    }

    #[test]
    fn non_blank_distinguishes_present_content() {
        assert_eq!(non_blank(Some(" A12345 ")), Some("A12345"));
        assert_eq!(non_blank(Some("")), None);
        assert_eq!(non_blank(None), None);
    }
}
