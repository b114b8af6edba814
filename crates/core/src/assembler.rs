//! Bundle assembly.
//!
//! Turns a validated request into the nested message graph:
//!
//! ```text
//! Message Bundle (type=message)
//! ├── MessageHeader            focus  → Document Bundle
//! ├── Organization (sender)
//! └── Document Bundle (type=document)
//!     ├── Composition          section → Encounter, Organization, Practitioner, Patient, ClinicalImpression*
//!     ├── Patient
//!     ├── Organization (service provider)
//!     ├── Practitioner
//!     ├── PractitionerRole?
//!     ├── Encounter (primary), Encounter (related)*
//!     └── Observation*, ClinicalImpression*, MedicationDispense*
//! ```
//!
//! Every identity is allocated before the first resource is built, so builders only ever see
//! finished full URLs. The Composition is built last, once its section entries are known, and
//! prepended.

use crate::builders::{
    clinical_impression::build_clinical_impression, composition::build_composition,
    encounter::build_encounter, has_code, medication_dispense::build_medication_dispense,
    message_header::build_message_header, observation::build_observation,
    organization::build_organization, patient::build_patient, practitioner::build_practitioner,
    practitioner_role::build_practitioner_role, BuildContext, ResourceLinks,
};
use crate::config::CoreConfig;
use crate::constants::{
    PROFILE_DOCUMENT_BUNDLE, PROFILE_HEADER_ORGANIZATION, PROFILE_MESSAGE_BUNDLE,
    PROFILE_ORGANIZATION, SYSTEM_BUNDLE_IDENTIFIER,
};
use crate::encounters::{resolve_encounters, resolve_sender_ods};
use crate::request::UpdateRecordRequest;
use crate::validation::RequiredFields;
use crate::{ComposeError, ComposeResult};
use chrono::{DateTime, Utc};
use fhir::{Bundle, BundleEntry, BundleType, Identifier, Reference, Resource};
use gpupdate_uuid::{ReferenceAllocator, ResourceIdentity, UuidSource};

/// Logical role of a resource within one composed message.
///
/// Indexed roles count from zero in request order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    MessageBundle,
    MessageHeader,
    SenderOrganization,
    DocumentBundle,
    Composition,
    Patient,
    ServiceOrganization,
    Practitioner,
    PractitionerRole,
    PrimaryEncounter,
    RelatedEncounter(usize),
    Observation(usize),
    ClinicalImpression(usize),
    MedicationDispense(usize),
}

/// A fully assembled message, ready to serialize.
#[derive(Clone, Debug)]
pub struct ComposedMessage {
    message_id: ResourceIdentity,
    bundle: Bundle,
}

impl ComposedMessage {
    /// Id of the outer message bundle, reported back to callers as the message id.
    pub fn message_id(&self) -> String {
        self.message_id.id()
    }

    pub fn bundle(&self) -> &Bundle {
        &self.bundle
    }

    /// Render the message as an XML document.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::Render`] if the XML writer fails.
    pub fn to_xml(&self) -> ComposeResult<Vec<u8>> {
        Ok(self.bundle.to_xml_bytes()?)
    }
}

/// Identities for every resource of one message, allocated up front.
struct Identities {
    message_bundle: ResourceIdentity,
    message_header: ResourceIdentity,
    sender_organization: ResourceIdentity,
    document_bundle: ResourceIdentity,
    composition: ResourceIdentity,
    patient: ResourceIdentity,
    service_organization: ResourceIdentity,
    practitioner: ResourceIdentity,
    practitioner_role: Option<ResourceIdentity>,
    primary_encounter: ResourceIdentity,
    related_encounters: Vec<ResourceIdentity>,
    observations: Vec<ResourceIdentity>,
    clinical_impressions: Vec<ResourceIdentity>,
    medication_dispenses: Vec<ResourceIdentity>,
}

impl Identities {
    fn allocate<S: UuidSource>(
        alloc: &mut ReferenceAllocator<Role, S>,
        req: &UpdateRecordRequest,
        related: usize,
    ) -> Self {
        let has_role = req
            .provenance
            .author
            .role
            .as_ref()
            .is_some_and(has_code);

        Self {
            message_bundle: alloc.allocate(Role::MessageBundle),
            message_header: alloc.allocate(Role::MessageHeader),
            sender_organization: alloc.allocate(Role::SenderOrganization),
            document_bundle: alloc.allocate(Role::DocumentBundle),
            composition: alloc.allocate(Role::Composition),
            patient: alloc.allocate(Role::Patient),
            service_organization: alloc.allocate(Role::ServiceOrganization),
            practitioner: alloc.allocate(Role::Practitioner),
            practitioner_role: has_role.then(|| alloc.allocate(Role::PractitionerRole)),
            primary_encounter: alloc.allocate(Role::PrimaryEncounter),
            related_encounters: (0..related)
                .map(|i| alloc.allocate(Role::RelatedEncounter(i)))
                .collect(),
            observations: (0..req.observations.as_ref().map_or(0, Vec::len))
                .map(|i| alloc.allocate(Role::Observation(i)))
                .collect(),
            clinical_impressions: (0..req.narrative_sections.as_ref().map_or(0, Vec::len))
                .map(|i| alloc.allocate(Role::ClinicalImpression(i)))
                .collect(),
            medication_dispenses: (0..req
                .clinical_summary
                .medications_supplied
                .as_ref()
                .map_or(0, Vec::len))
                .map(|i| alloc.allocate(Role::MedicationDispense(i)))
                .collect(),
        }
    }
}

/// Assemble the message graph for a validated request.
///
/// # Arguments
///
/// * `req` - The request, already checked by [`crate::validation::validate_minimal`]
/// * `required` - Typed required values returned by that check
/// * `config` - Composer configuration
/// * `allocator` - A fresh allocator for this message
/// * `now` - The compose instant; used for every timestamp in the message
///
/// # Errors
///
/// Returns [`ComposeError::Construction`] if an observation or supplied medication breaks a
/// construction rule, or [`ComposeError::DanglingReferences`] if the finished graph holds an
/// in-message reference with no matching entry.
pub fn assemble<S: UuidSource>(
    req: &UpdateRecordRequest,
    required: &RequiredFields,
    config: &CoreConfig,
    mut allocator: ReferenceAllocator<Role, S>,
    now: DateTime<Utc>,
) -> ComposeResult<ComposedMessage> {
    let selection = resolve_encounters(req);
    let ids = Identities::allocate(&mut allocator, req, selection.related.len());
    tracing::debug!(
        resources = allocator.len(),
        primary = ?selection.source,
        related = selection.related.len(),
        "allocated identities"
    );

    let ctx = BuildContext {
        last_updated: fhir::instant(&now),
        links: ResourceLinks {
            patient: ids.patient.full_url(),
            practitioner: ids.practitioner.full_url(),
            service_organization: ids.service_organization.full_url(),
            primary_encounter: ids.primary_encounter.full_url(),
        },
    };
    let sender_ods = resolve_sender_ods(req, config.default_sender_ods());

    // Document entries, Composition excluded.
    let mut entries = vec![
        BundleEntry::new(
            &ids.patient.full_url(),
            Resource::Patient(build_patient(&ids.patient, required, &req.patient, &ctx)),
        ),
        BundleEntry::new(
            &ids.service_organization.full_url(),
            Resource::Organization(build_organization(
                &ids.service_organization,
                PROFILE_ORGANIZATION,
                &sender_ods,
                &ctx,
            )),
        ),
        BundleEntry::new(
            &ids.practitioner.full_url(),
            Resource::Practitioner(build_practitioner(
                &ids.practitioner,
                &required.author_name,
                &req.provenance.author,
                &ctx,
            )),
        ),
    ];

    if let Some(identity) = &ids.practitioner_role {
        if let Some(role) = build_practitioner_role(identity, &req.provenance.author, &ctx) {
            entries.push(BundleEntry::new(
                &identity.full_url(),
                Resource::PractitionerRole(role),
            ));
        }
    }

    entries.push(BundleEntry::new(
        &ids.primary_encounter.full_url(),
        Resource::Encounter(build_encounter(
            &ids.primary_encounter,
            &selection.primary,
            &ctx,
        )),
    ));
    for (identity, input) in ids.related_encounters.iter().zip(&selection.related) {
        entries.push(BundleEntry::new(
            &identity.full_url(),
            Resource::Encounter(build_encounter(identity, input, &ctx)),
        ));
    }

    for (i, (identity, input)) in ids
        .observations
        .iter()
        .zip(req.observations.iter().flatten())
        .enumerate()
    {
        entries.push(BundleEntry::new(
            &identity.full_url(),
            Resource::Observation(build_observation(identity, i, input, &ctx)?),
        ));
    }

    let mut section_entries = vec![
        ctx.primary_encounter_ref(),
        ctx.service_organization_ref(),
        ctx.practitioner_ref(),
        ctx.patient_ref(),
    ];
    for (identity, block) in ids
        .clinical_impressions
        .iter()
        .zip(req.narrative_sections.iter().flatten())
    {
        entries.push(BundleEntry::new(
            &identity.full_url(),
            Resource::ClinicalImpression(build_clinical_impression(identity, block, &ctx)),
        ));
        section_entries.push(Reference::to(&identity.full_url()));
    }

    for (i, (identity, input)) in ids
        .medication_dispenses
        .iter()
        .zip(req.clinical_summary.medications_supplied.iter().flatten())
        .enumerate()
    {
        entries.push(BundleEntry::new(
            &identity.full_url(),
            Resource::MedicationDispense(build_medication_dispense(identity, i, input, &ctx)?),
        ));
    }

    let composition = build_composition(
        &ids.composition,
        req.composition.as_ref(),
        required.summary_text.as_str(),
        section_entries,
        &ctx,
    );
    entries.insert(
        0,
        BundleEntry::new(&ids.composition.full_url(), Resource::Composition(composition)),
    );

    let document = bundle(
        &ids.document_bundle,
        PROFILE_DOCUMENT_BUNDLE,
        BundleType::Document,
        entries,
        &ctx,
    );

    let header = build_message_header(
        &ids.message_header,
        req.message_header_options.as_ref(),
        config,
        required.system_name.as_str(),
        &ids.sender_organization.full_url(),
        &ids.document_bundle.full_url(),
        &ctx,
    );
    let message_entries = vec![
        BundleEntry::new(&ids.message_header.full_url(), Resource::MessageHeader(header)),
        BundleEntry::new(
            &ids.sender_organization.full_url(),
            Resource::Organization(build_organization(
                &ids.sender_organization,
                PROFILE_HEADER_ORGANIZATION,
                &sender_ods,
                &ctx,
            )),
        ),
        BundleEntry::new(
            &ids.document_bundle.full_url(),
            Resource::Bundle(Box::new(document)),
        ),
    ];
    let message = bundle(
        &ids.message_bundle,
        PROFILE_MESSAGE_BUNDLE,
        BundleType::Message,
        message_entries,
        &ctx,
    );

    check_references(&message)?;
    tracing::debug!(
        message_id = %ids.message_bundle,
        sender_ods = %sender_ods,
        "assembled message bundle"
    );

    Ok(ComposedMessage {
        message_id: ids.message_bundle,
        bundle: message,
    })
}

fn bundle(
    identity: &ResourceIdentity,
    profile: &str,
    type_: BundleType,
    entry: Vec<BundleEntry>,
    ctx: &BuildContext,
) -> Bundle {
    Bundle {
        id: identity.id(),
        meta: ctx.meta(profile),
        identifier: Some(Identifier::new(SYSTEM_BUNDLE_IDENTIFIER, identity.id())),
        type_,
        entry,
    }
}

/// Fail if any in-message reference has no matching `fullUrl`.
fn check_references(message: &Bundle) -> ComposeResult<()> {
    let dangling = message.unresolved_references();
    if dangling.is_empty() {
        return Ok(());
    }
    Err(ComposeError::DanglingReferences(
        dangling.into_iter().map(str::to_owned).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{
        AuthorInput, ClinicalSummary, CodedItem, EncounterInput, NarrativeBlock, PatientInput,
        Provenance, Routing, SystemInput,
    };
    use crate::validation::validate_minimal;
    use chrono::TimeZone;
    use gpupdate_uuid::SequentialUuids;

    fn request() -> UpdateRecordRequest {
        UpdateRecordRequest {
            patient: PatientInput {
                nhs_number: "9434765919".into(),
                date_of_birth: "1980-02-29".into(),
                surname: "Smith".into(),
                ..Default::default()
            },
            provenance: Provenance {
                author: AuthorInput {
                    name: "Dr Jane Doe".into(),
                    ..Default::default()
                },
                system: SystemInput {
                    asid: "123456789012".into(),
                    name: "Community EPR".into(),
                },
            },
            routing: Routing {
                registered_practice_ods: "Y12345".into(),
            },
            clinical_summary: ClinicalSummary {
                free_text: "Seen for review".into(),
                medications_supplied: None,
            },
            ..Default::default()
        }
    }

    fn compose(req: &UpdateRecordRequest) -> ComposeResult<ComposedMessage> {
        let required = validate_minimal(req)?;
        assemble(
            req,
            &required,
            &CoreConfig::default(),
            ReferenceAllocator::with_source(SequentialUuids::starting_at(1)),
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        )
    }

    fn document(message: &ComposedMessage) -> &Bundle {
        match &message.bundle().entry[2].resource {
            Resource::Bundle(doc) => doc,
            other => panic!("expected document bundle, got {}", other.resource_type()),
        }
    }

    fn types(bundle: &Bundle) -> Vec<&'static str> {
        bundle.entry.iter().map(|e| e.resource.resource_type()).collect()
    }

    #[test]
    fn minimal_request_has_fixed_shape() {
        let message = compose(&request()).unwrap();

        assert_eq!(
            types(message.bundle()),
            vec!["MessageHeader", "Organization", "Bundle"]
        );
        assert_eq!(
            types(document(&message)),
            vec!["Composition", "Patient", "Organization", "Practitioner", "Encounter"]
        );
        assert!(message.bundle().unresolved_references().is_empty());
        assert_eq!(message.message_id(), message.bundle().id);
    }

    #[test]
    fn practitioner_role_only_with_coded_role() {
        let mut req = request();
        req.provenance.author.role = Some(CodedItem {
            system: "https://fhir.nhs.uk/STU3/CodeSystem/CareConnect-SDSJobRoleName-1".into(),
            code: "R0260".into(),
            display: Some("General Medical Practitioner".into()),
            text: None,
        });
        let message = compose(&req).unwrap();
        assert!(types(document(&message)).contains(&"PractitionerRole"));

        req.provenance.author.role.as_mut().unwrap().system = String::new();
        let message = compose(&req).unwrap();
        assert!(!types(document(&message)).contains(&"PractitionerRole"));
    }

    #[test]
    fn related_encounters_follow_primary() {
        let mut req = request();
        req.encounters = Some(vec![
            EncounterInput {
                reason: Some("first".into()),
                ..Default::default()
            },
            EncounterInput {
                role: Some("primary".into()),
                reason: Some("tagged".into()),
                ..Default::default()
            },
        ]);
        let message = compose(&req).unwrap();
        let doc = document(&message);

        let reasons: Vec<_> = doc
            .entry
            .iter()
            .filter_map(|e| match &e.resource {
                Resource::Encounter(enc) => enc.reason.first().and_then(|r| r.text.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(reasons, vec!["tagged", "first"]);
    }

    #[test]
    fn composition_section_lists_clinical_impressions() {
        let mut req = request();
        req.narrative_sections = Some(vec![
            NarrativeBlock {
                title: Some("Plan".into()),
                text: "Review in 2 weeks".into(),
            },
            NarrativeBlock {
                title: None,
                text: "Patient well".into(),
            },
        ]);
        let message = compose(&req).unwrap();
        let doc = document(&message);

        let Resource::Composition(comp) = &doc.entry[0].resource else {
            panic!("composition must come first");
        };
        let section = &comp.section[0].entry;
        assert_eq!(section.len(), 6);

        let impressions: Vec<_> = doc
            .entry
            .iter()
            .filter(|e| e.resource.resource_type() == "ClinicalImpression")
            .map(|e| e.full_url.as_str())
            .collect();
        let tail: Vec<_> = section[4..].iter().map(|r| r.reference.as_str()).collect();
        assert_eq!(tail, impressions);
    }

    #[test]
    fn every_identity_is_distinct() {
        let mut req = request();
        req.narrative_sections = Some(vec![NarrativeBlock::default(); 3]);
        let message = compose(&req).unwrap();

        let urls = message.bundle().full_urls();
        let doc = document(&message);
        assert_eq!(urls.len(), 3 + doc.entry.len());
    }
}
