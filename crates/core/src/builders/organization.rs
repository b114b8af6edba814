use super::BuildContext;
use crate::constants::SYSTEM_ODS_ORGANIZATION_CODE;
use fhir::{Identifier, Organization};
use gpupdate_uuid::ResourceIdentity;

/// Build an organisation identified by its ODS code.
///
/// The same ODS code is used for both the header (sender) organisation and the document's
/// service-provider organisation; only the profile differs.
pub fn build_organization(
    identity: &ResourceIdentity,
    profile: &str,
    ods_code: &str,
    ctx: &BuildContext,
) -> Organization {
    Organization {
        id: identity.id(),
        meta: ctx.meta(profile),
        identifier: vec![Identifier::new(SYSTEM_ODS_ORGANIZATION_CODE, ods_code)],
        name: None,
    }
}
