use super::{owned, BuildContext};
use crate::constants::{
    PROFILE_CLINICAL_IMPRESSION, STATUS_COMPLETED, SYSTEM_CLINICAL_IMPRESSION_IDENTIFIER,
};
use crate::request::NarrativeBlock;
use fhir::{ClinicalImpression, Identifier};
use gpupdate_uuid::ResourceIdentity;

/// Build one clinical impression from a narrative block. The block text is copied verbatim.
pub fn build_clinical_impression(
    identity: &ResourceIdentity,
    block: &NarrativeBlock,
    ctx: &BuildContext,
) -> ClinicalImpression {
    ClinicalImpression {
        id: identity.id(),
        meta: ctx.meta(PROFILE_CLINICAL_IMPRESSION),
        identifier: vec![Identifier::new(
            SYSTEM_CLINICAL_IMPRESSION_IDENTIFIER,
            identity.id(),
        )],
        status: STATUS_COMPLETED.to_owned(),
        description: owned(block.title.as_deref()),
        subject: Some(ctx.patient_ref()),
        context: Some(ctx.primary_encounter_ref()),
        date: Some(ctx.last_updated.clone()),
        assessor: Some(ctx.practitioner_ref()),
        summary: Some(block.text.clone()).filter(|t| !t.trim().is_empty()),
    }
}
