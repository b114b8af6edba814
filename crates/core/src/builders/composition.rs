use super::{coded_concept, owned, BuildContext};
use crate::constants::{
    COMPOSITION_STATUS_FINAL, COMPOSITION_TYPE_CODE, DEFAULT_COMPOSITION_TITLE,
    PROFILE_COMPOSITION, SYSTEM_COMPOSITION_IDENTIFIER, SYSTEM_SNOMED,
};
use crate::request::CompositionInput;
use fhir::{
    CodeableConcept, Coding, Composition, CompositionSection, Identifier, Narrative, Reference,
};
use gpupdate_uuid::ResourceIdentity;

/// Build the document's composition.
///
/// # Arguments
///
/// * `identity` - Identity allocated for the composition
/// * `input` - Optional caller-supplied title and type
/// * `summary` - Clinical summary free text, rendered as the section narrative
/// * `entries` - Section back-references, in the order they should appear
/// * `ctx` - Shared build context
pub fn build_composition(
    identity: &ResourceIdentity,
    input: Option<&CompositionInput>,
    summary: &str,
    entries: Vec<Reference>,
    ctx: &BuildContext,
) -> Composition {
    let type_ = coded_concept(input.and_then(|c| c.type_.as_ref())).unwrap_or_else(|| {
        CodeableConcept::from_coding(Coding::new(SYSTEM_SNOMED, COMPOSITION_TYPE_CODE))
    });
    let title = owned(input.and_then(|c| c.title.as_deref()))
        .unwrap_or_else(|| DEFAULT_COMPOSITION_TITLE.to_owned());

    Composition {
        id: identity.id(),
        meta: ctx.meta(PROFILE_COMPOSITION),
        identifier: Some(Identifier::new(SYSTEM_COMPOSITION_IDENTIFIER, identity.id())),
        status: COMPOSITION_STATUS_FINAL.to_owned(),
        type_,
        subject: Some(ctx.patient_ref()),
        encounter: Some(ctx.primary_encounter_ref()),
        date: ctx.last_updated.clone(),
        author: vec![ctx.practitioner_ref()],
        section: vec![CompositionSection {
            title: Some(title.clone()),
            text: Some(Narrative::generated(summary)),
            entry: entries,
        }],
        title,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::ResourceLinks;
    use crate::request::CodedItem;
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

    #[test]
    fn defaults_when_no_composition_input() {
        let ctx = ctx();
        let comp = build_composition(
            &fresh_identity(),
            None,
            "Seen today",
            vec![ctx.primary_encounter_ref()],
            &ctx,
        );

        assert_eq!(comp.status, "final");
        assert_eq!(comp.title, "Community service update");
        assert_eq!(comp.type_.coding[0].code.as_deref(), Some("1659111000000107"));
        assert_eq!(comp.date, ctx.last_updated);
        assert_eq!(comp.section[0].entry, vec![ctx.primary_encounter_ref()]);
        assert_eq!(
            comp.section[0].text.as_ref().map(|n| n.div.contains("Seen today")),
            Some(true)
        );
    }

    #[test]
    fn supplied_type_needs_system_and_code() {
        let mut input = CompositionInput {
            title: Some("Discharge summary".into()),
            type_: Some(CodedItem {
                code: "373942005".into(),
                ..Default::default()
            }),
        };
        let comp = build_composition(&fresh_identity(), Some(&input), "x", Vec::new(), &ctx());
        assert_eq!(comp.type_.coding[0].code.as_deref(), Some("1659111000000107"));
        assert_eq!(comp.title, "Discharge summary");

        input.type_ = Some(CodedItem {
            system: "http://snomed.info/sct".into(),
            code: "373942005".into(),
            ..Default::default()
        });
        let comp = build_composition(&fresh_identity(), Some(&input), "x", Vec::new(), &ctx());
        assert_eq!(comp.type_.coding[0].code.as_deref(), Some("373942005"));
    }
}
