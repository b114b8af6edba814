use super::{coded_concept, concept_from, has_code, owned, BuildContext};
use crate::constants::{
    ENCOUNTER_STATUS_FINISHED, ENCOUNTER_TYPE_CODE, ENCOUNTER_TYPE_TEXT,
    EXTENSION_OUTCOME_OF_ATTENDANCE, PARTICIPANT_RECORDER_CODE, PARTICIPANT_RECORDER_TEXT,
    PROFILE_ENCOUNTER, SYSTEM_ENCOUNTER_IDENTIFIER, SYSTEM_PARTICIPANT_TYPE, SYSTEM_SNOMED,
};
use crate::request::{CodedItem, EncounterInput};
use fhir::{
    CodeableConcept, Coding, Encounter, EncounterParticipant, Extension, ExtensionValue,
    Identifier, Period,
};
use gpupdate_types::non_blank;
use gpupdate_uuid::ResourceIdentity;

/// Build an encounter from its own request fragment.
///
/// Used for the primary encounter and for each related encounter alike.
pub fn build_encounter(
    identity: &ResourceIdentity,
    input: &EncounterInput,
    ctx: &BuildContext,
) -> Encounter {
    let type_ = coded_concept(input.type_.as_ref()).unwrap_or_else(default_encounter_type);

    let recorder = EncounterParticipant {
        type_: vec![CodeableConcept::from_coding(Coding::new(
            SYSTEM_PARTICIPANT_TYPE,
            PARTICIPANT_RECORDER_CODE,
        ))
        .with_text(Some(PARTICIPANT_RECORDER_TEXT.to_owned()))],
        individual: Some(ctx.practitioner_ref()),
    };

    let period = input.occurred_at.map(|at| Period {
        start: Some(fhir::date(&at.date_naive())),
        end: None,
    });

    Encounter {
        id: identity.id(),
        meta: ctx.meta(PROFILE_ENCOUNTER),
        extension: outcome_extension(input.outcome_of_attendance.as_ref())
            .into_iter()
            .collect(),
        identifier: vec![Identifier::new(SYSTEM_ENCOUNTER_IDENTIFIER, identity.id())],
        status: ENCOUNTER_STATUS_FINISHED.to_owned(),
        type_: vec![type_],
        subject: Some(ctx.patient_ref()),
        participant: vec![recorder],
        period,
        reason: encounter_reason(input).into_iter().collect(),
        service_provider: Some(ctx.service_organization_ref()),
    }
}

fn default_encounter_type() -> CodeableConcept {
    CodeableConcept::from_coding(Coding::new(SYSTEM_SNOMED, ENCOUNTER_TYPE_CODE))
        .with_text(Some(ENCOUNTER_TYPE_TEXT.to_owned()))
}

/// Coded reason wins over free text.
fn encounter_reason(input: &EncounterInput) -> Option<CodeableConcept> {
    coded_concept(input.reason_code.as_ref())
        .or_else(|| owned(input.reason.as_deref()).map(CodeableConcept::text_only))
}

/// Outcome-of-attendance extension; only rendered when system, code and display are all set.
fn outcome_extension(outcome: Option<&CodedItem>) -> Option<Extension> {
    let outcome = outcome.filter(|o| has_code(o) && non_blank(o.display.as_deref()).is_some())?;
    Some(Extension::with_value(
        EXTENSION_OUTCOME_OF_ATTENDANCE,
        ExtensionValue::CodeableConcept(concept_from(outcome)),
    ))
}
