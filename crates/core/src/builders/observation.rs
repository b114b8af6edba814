use super::{
    coded_concept, concept_from, date_time, has_code, owned, quantity_from, require_code,
    BuildContext,
};
use crate::constants::{
    OBSERVATION_STATUS_FINAL, PROFILE_OBSERVATION, SYSTEM_OBSERVATION_CATEGORY,
    SYSTEM_OBSERVATION_IDENTIFIER,
};
use crate::request::{CategoryInput, CodedItem, ComponentInput, ObservationInput, QuantityInput};
use crate::ComposeResult;
use fhir::{
    CodeableConcept, Coding, Identifier, Observation, ObservationComponent, ObservationValue,
};
use gpupdate_types::non_blank;
use gpupdate_uuid::ResourceIdentity;

/// Build an observation.
///
/// # Errors
///
/// Returns [`crate::ComposeError::Construction`] when the observation code, or any component
/// code, lacks a system or code.
pub fn build_observation(
    identity: &ResourceIdentity,
    index: usize,
    input: &ObservationInput,
    ctx: &BuildContext,
) -> ComposeResult<Observation> {
    require_code(&input.code, &format!("observations[{index}].code"))?;

    let component = input
        .components
        .iter()
        .flatten()
        .enumerate()
        .map(|(i, c)| build_component(c, index, i))
        .collect::<ComposeResult<Vec<_>>>()?;

    Ok(Observation {
        id: identity.id(),
        meta: ctx.meta(PROFILE_OBSERVATION),
        identifier: vec![Identifier::new(SYSTEM_OBSERVATION_IDENTIFIER, identity.id())],
        status: OBSERVATION_STATUS_FINAL.to_owned(),
        category: input.category.as_ref().and_then(category).into_iter().collect(),
        code: concept_from(&input.code),
        subject: Some(ctx.patient_ref()),
        context: Some(ctx.primary_encounter_ref()),
        effective_date_time: input.effective_date_time.as_ref().map(date_time),
        issued: input.issued.as_ref().map(date_time),
        performer: vec![ctx.practitioner_ref()],
        value: observation_value(
            input.value_quantity.as_ref(),
            input.value_codeable_concept.as_ref(),
        ),
        body_site: coded_concept(input.body_site.as_ref()),
        component,
    })
}

fn build_component(
    input: &ComponentInput,
    observation: usize,
    index: usize,
) -> ComposeResult<ObservationComponent> {
    require_code(
        &input.code,
        &format!("observations[{observation}].components[{index}].code"),
    )?;
    Ok(ObservationComponent {
        code: concept_from(&input.code),
        value: observation_value(
            input.value_quantity.as_ref(),
            input.value_codeable_concept.as_ref(),
        ),
    })
}

/// Quantity wins over a coded value; a coded value without system and code is dropped.
fn observation_value(
    quantity: Option<&QuantityInput>,
    coded: Option<&CodedItem>,
) -> Option<ObservationValue> {
    match (quantity, coded) {
        (Some(q), _) => Some(ObservationValue::Quantity(quantity_from(q))),
        (None, Some(c)) if has_code(c) => Some(ObservationValue::CodeableConcept(concept_from(c))),
        _ => None,
    }
}

/// Coded category when system and code are both present, otherwise a free-text category under
/// the default category system.
fn category(input: &CategoryInput) -> Option<CodeableConcept> {
    let system = non_blank(input.system.as_deref());
    let code = non_blank(input.code.as_deref());
    let display = owned(input.display.as_deref());

    match (system, code) {
        (Some(system), Some(code)) => {
            let text = owned(input.text.as_deref()).or_else(|| display.clone());
            Some(
                CodeableConcept::from_coding(Coding::new(system, code).with_display(display))
                    .with_text(text),
            )
        }
        (_, code) => {
            let text = owned(input.text.as_deref()).or(display);
            let coding: Vec<Coding> = code
                .map(|c| Coding::new(SYSTEM_OBSERVATION_CATEGORY, c))
                .into_iter()
                .collect();
            if coding.is_empty() && text.is_none() {
                return None;
            }
            Some(CodeableConcept { coding, text })
        }
    }
}
