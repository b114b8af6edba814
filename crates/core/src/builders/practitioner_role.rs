use super::{coding_from, has_code, owned, BuildContext};
use crate::constants::PROFILE_PRACTITIONER_ROLE;
use crate::request::AuthorInput;
use fhir::{CodeableConcept, PractitionerRole};
use gpupdate_uuid::ResourceIdentity;

/// Build the author's role, linking the practitioner to the service organisation.
///
/// Returns `None` unless the author carries a role with both a system and a code; the
/// resource is then left out of the document entirely.
pub fn build_practitioner_role(
    identity: &ResourceIdentity,
    input: &AuthorInput,
    ctx: &BuildContext,
) -> Option<PractitionerRole> {
    let role = input.role.as_ref().filter(|r| has_code(r))?;

    let code = CodeableConcept::from_coding(coding_from(role))
        .with_text(owned(role.display.as_deref()));

    Some(PractitionerRole {
        id: identity.id(),
        meta: ctx.meta(PROFILE_PRACTITIONER_ROLE),
        practitioner: Some(ctx.practitioner_ref()),
        organization: Some(ctx.service_organization_ref()),
        code: vec![code],
    })
}
