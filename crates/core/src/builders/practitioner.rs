use super::{owned, BuildContext};
use crate::constants::{NAME_TITLES, PROFILE_PRACTITIONER, SYSTEM_STAFF_CODE};
use crate::request::AuthorInput;
use fhir::{HumanName, Identifier, Practitioner};
use gpupdate_types::NonEmptyText;
use gpupdate_uuid::ResourceIdentity;

/// A display name split into its parts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SplitName {
    pub prefix: Option<String>,
    pub given: Option<String>,
    pub family: Option<String>,
}

/// Split a display name such as `"Dr Jane Anne Doe"` into prefix, given and family names.
///
/// - a leading recognised title is taken as prefix, but only when other tokens follow it
/// - a single remaining token is the family name
/// - otherwise the last token is the family name and everything between is the given name
pub fn split_name(full: &str) -> SplitName {
    let mut parts: Vec<&str> = full.split_whitespace().collect();
    let mut out = SplitName::default();
    if parts.is_empty() {
        return out;
    }

    if parts.len() > 1 && NAME_TITLES.contains(&parts[0]) {
        out.prefix = Some(parts.remove(0).to_owned());
    }

    if let Some((family, given)) = parts.split_last() {
        out.family = Some((*family).to_owned());
        if !given.is_empty() {
            out.given = Some(given.join(" "));
        }
    }
    out
}

/// Build the authoring practitioner.
///
/// Identifiers are the caller-supplied ones followed by the professional code, if any, under
/// the staff-code system.
pub fn build_practitioner(
    identity: &ResourceIdentity,
    author_name: &NonEmptyText,
    input: &AuthorInput,
    ctx: &BuildContext,
) -> Practitioner {
    let mut identifier: Vec<Identifier> = input
        .identifiers
        .iter()
        .flatten()
        .filter(|i| !i.system.trim().is_empty() && !i.value.trim().is_empty())
        .map(|i| Identifier::new(i.system.trim(), i.value.trim()))
        .collect();
    if let Some(code) = owned(input.professional_code.as_deref()) {
        identifier.push(Identifier::new(SYSTEM_STAFF_CODE, code));
    }

    let split = split_name(author_name.as_str());
    let name = HumanName {
        use_: None,
        family: split.family,
        given: split.given.into_iter().collect(),
        prefix: split.prefix.into_iter().collect(),
    };

    Practitioner {
        id: identity.id(),
        meta: ctx.meta(PROFILE_PRACTITIONER),
        identifier,
        name: vec![name],
    }
}
