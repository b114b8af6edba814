use super::{coded_concept, concept_from, date_time, owned, quantity_from, require_code, BuildContext};
use crate::constants::{
    PROFILE_MEDICATION_DISPENSE, STATUS_COMPLETED, SYSTEM_MEDICATION_DISPENSE_IDENTIFIER,
};
use crate::request::{DosageInput, MedicationSupplied, TimingInput};
use crate::ComposeResult;
use fhir::{
    Dosage, Identifier, MedicationDispense, MedicationDispensePerformer, Ratio, Timing,
    TimingRepeat,
};
use gpupdate_uuid::ResourceIdentity;

/// Build one medication dispense from a supplied-medication record.
///
/// # Errors
///
/// Returns [`crate::ComposeError::Construction`] when the medication has no system or code.
pub fn build_medication_dispense(
    identity: &ResourceIdentity,
    index: usize,
    input: &MedicationSupplied,
    ctx: &BuildContext,
) -> ComposeResult<MedicationDispense> {
    require_code(
        &input.medication,
        &format!("clinicalSummary.medicationsSupplied[{index}].medication"),
    )?;

    Ok(MedicationDispense {
        id: identity.id(),
        meta: ctx.meta(PROFILE_MEDICATION_DISPENSE),
        identifier: vec![Identifier::new(
            SYSTEM_MEDICATION_DISPENSE_IDENTIFIER,
            identity.id(),
        )],
        status: STATUS_COMPLETED.to_owned(),
        category: coded_concept(input.category.as_ref()),
        medication_codeable_concept: concept_from(&input.medication),
        subject: Some(ctx.patient_ref()),
        context: Some(ctx.primary_encounter_ref()),
        performer: vec![MedicationDispensePerformer {
            actor: ctx.practitioner_ref(),
        }],
        type_: coded_concept(input.supply_type.as_ref()),
        quantity: input.quantity.as_ref().map(quantity_from),
        days_supply: input.days_supply.as_ref().map(quantity_from),
        when_prepared: input.when_prepared.as_ref().map(date_time),
        when_handed_over: input.when_handed_over.as_ref().map(date_time),
        dosage_instruction: input
            .dosage_instruction
            .as_ref()
            .and_then(dosage)
            .into_iter()
            .collect(),
    })
}

/// A dosage with nothing set is dropped rather than rendered empty.
fn dosage(input: &DosageInput) -> Option<Dosage> {
    let out = Dosage {
        text: owned(input.text.as_deref()),
        patient_instruction: owned(input.patient_instruction.as_deref()),
        timing: input.timing.as_ref().and_then(timing),
        route: coded_concept(input.route.as_ref()),
        max_dose_per_period: input.max_dose_per_period.as_ref().map(|r| Ratio {
            numerator: Some(quantity_from(&r.numerator)),
            denominator: Some(quantity_from(&r.denominator)),
        }),
    };
    (out != Dosage::default()).then_some(out)
}

fn timing(input: &TimingInput) -> Option<Timing> {
    let repeat = TimingRepeat {
        frequency: input.frequency,
        period: input.period,
        period_unit: owned(input.period_unit.as_deref()),
    };
    (repeat != TimingRepeat::default()).then(|| Timing {
        repeat: Some(repeat),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::ResourceLinks;
    use crate::request::{CodedItem, QuantityInput, RatioInput};
    use crate::ComposeError;
    use chrono::DateTime;
    use gpupdate_uuid::Uuid;

    fn fresh_identity() -> ResourceIdentity {
        ResourceIdentity::from_uuid(Uuid::new_v4())
    }

    fn ctx() -> BuildContext {
        BuildContext {
            last_updated: "2024-01-01T00:00:00.000Z".into(),
            links: ResourceLinks {
                patient: fresh_identity().full_url(),
                practitioner: fresh_identity().full_url(),
                service_organization: fresh_identity().full_url(),
                primary_encounter: fresh_identity().full_url(),
            },
        }
    }

    fn amoxicillin() -> CodedItem {
        CodedItem {
            system: "http://snomed.info/sct".into(),
            code: "323509004".into(),
            display: Some("Amoxicillin 500mg capsules".into()),
            text: None,
        }
    }

    fn tablets(value: f64) -> QuantityInput {
        QuantityInput {
            value,
            unit: Some("tablet".into()),
            system: None,
            code: None,
        }
    }

    #[test]
    fn minimal_dispense_has_only_required_parts() {
        let input = MedicationSupplied {
            medication: amoxicillin(),
            ..Default::default()
        };
        let ctx = ctx();
        let md = build_medication_dispense(&fresh_identity(), 0, &input, &ctx).unwrap();

        assert_eq!(md.status, "completed");
        assert_eq!(
            md.medication_codeable_concept.coding[0].code.as_deref(),
            Some("323509004")
        );
        assert_eq!(md.performer[0].actor, ctx.practitioner_ref());
        assert!(md.category.is_none());
        assert!(md.quantity.is_none());
        assert!(md.dosage_instruction.is_empty());
    }

    #[test]
    fn missing_medication_code_is_rejected() {
        let input = MedicationSupplied {
            medication: CodedItem {
                code: "323509004".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        match build_medication_dispense(&fresh_identity(), 1, &input, &ctx()) {
            Err(ComposeError::Construction(msg)) => {
                assert!(msg.contains("medicationsSupplied[1].medication"))
            }
            other => panic!("expected Construction, got {other:?}"),
        }
    }

    #[test]
    fn full_dosage_is_mapped() {
        let input = MedicationSupplied {
            medication: amoxicillin(),
            quantity: Some(tablets(21.0)),
            when_handed_over: Some(
                DateTime::parse_from_rfc3339("2024-05-01T10:00:00+01:00").unwrap(),
            ),
            dosage_instruction: Some(DosageInput {
                text: Some("One capsule three times a day".into()),
                timing: Some(TimingInput {
                    frequency: Some(3),
                    period: Some(1.0),
                    period_unit: Some("d".into()),
                }),
                max_dose_per_period: Some(RatioInput {
                    numerator: tablets(3.0),
                    denominator: QuantityInput {
                        value: 1.0,
                        unit: Some("day".into()),
                        system: None,
                        code: None,
                    },
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let md = build_medication_dispense(&fresh_identity(), 0, &input, &ctx()).unwrap();

        assert_eq!(md.when_handed_over.as_deref(), Some("2024-05-01T10:00:00+01:00"));
        let dosage = &md.dosage_instruction[0];
        let repeat = dosage.timing.as_ref().and_then(|t| t.repeat.as_ref()).unwrap();
        assert_eq!(repeat.frequency, Some(3));
        assert_eq!(repeat.period_unit.as_deref(), Some("d"));
        assert!(dosage.max_dose_per_period.is_some());
        assert!(dosage.route.is_none());
    }

    #[test]
    fn empty_dosage_is_dropped() {
        let input = MedicationSupplied {
            medication: amoxicillin(),
            dosage_instruction: Some(DosageInput {
                timing: Some(TimingInput::default()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let md = build_medication_dispense(&fresh_identity(), 0, &input, &ctx()).unwrap();
        assert!(md.dosage_instruction.is_empty());
    }
}
