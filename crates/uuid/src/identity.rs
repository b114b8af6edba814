//! Identity and full-URL value types.

use std::fmt;

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Prefix of every in-message full URL.
pub const URN_UUID_PREFIX: &str = "urn:uuid:";

/// The identity of one resource inside a composed message.
///
/// Displayed in lowercase hyphenated form, which is what `Resource.id` and bundle identifiers
/// carry on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceIdentity(Uuid);

impl ResourceIdentity {
    /// Wraps an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the bare id (lowercase, hyphenated).
    pub fn id(&self) -> String {
        self.0.hyphenated().to_string()
    }

    /// Returns the canonical `urn:uuid:<id>` reference form.
    pub fn full_url(&self) -> FullUrl {
        FullUrl(format!("{}{}", URN_UUID_PREFIX, self.0.hyphenated()))
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// A `urn:uuid:` full URL.
///
/// Only constructible from a [`ResourceIdentity`], so holding a `FullUrl` means the string is
/// well formed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FullUrl(String);

impl FullUrl {
    /// Returns the full URL as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FullUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FullUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_url_uses_urn_uuid_prefix() {
        let uuid = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let identity = ResourceIdentity::from_uuid(uuid);

        assert_eq!(identity.id(), "550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(
            identity.full_url().as_str(),
            "urn:uuid:550e8400-e29b-41d4-a716-446655440000"
        );
        assert_eq!(identity.to_string(), identity.id());
    }

    #[test]
    fn distinct_uuids_give_distinct_full_urls() {
        let a = ResourceIdentity::from_uuid(Uuid::from_u128(1));
        let b = ResourceIdentity::from_uuid(Uuid::from_u128(2));

        assert_ne!(a.full_url(), b.full_url());
        assert!(a.full_url().as_str().starts_with(URN_UUID_PREFIX));
    }
}
