//! JSON request model for an update-record submission.
//!
//! Field presence is modelled explicitly:
//! - optional fragments are `Option<T>`; absent and present are distinct states
//! - required strings default to `""` when missing so that minimal validation can report the
//!   whole missing group in one message, rather than failing on the first absent key
//!
//! Parsing goes through `serde_path_to_error` so malformed payloads report the JSON path of the
//! offending value.

use crate::{ComposeError, ComposeResult};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============================================================================
// Request root
// ============================================================================

/// An update-record submission.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecordRequest {
    #[serde(default)]
    pub patient: PatientInput,
    #[serde(default)]
    pub provenance: Provenance,
    #[serde(default)]
    pub routing: Routing,
    #[serde(default)]
    pub clinical_summary: ClinicalSummary,
    /// A single encounter; ignored for primary selection when `encounters` is non-empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounter: Option<EncounterInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounters: Option<Vec<EncounterInput>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observations: Option<Vec<ObservationInput>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative_sections: Option<Vec<NarrativeBlock>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<AttachmentInput>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composition: Option<CompositionInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_header_options: Option<MessageHeaderOptions>,
}

impl UpdateRecordRequest {
    /// Parse a request from raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidJson`] carrying the JSON path of the first offending value
    /// (or `<root>` when the document itself is malformed).
    pub fn from_json_slice(bytes: &[u8]) -> ComposeResult<Self> {
        let de = &mut serde_json::Deserializer::from_slice(bytes);
        serde_path_to_error::deserialize(de).map_err(|e| {
            let path = e.path().to_string();
            let path = if path.is_empty() || path == "." {
                "<root>".to_string()
            } else {
                path
            };
            ComposeError::InvalidJson {
                path,
                message: e.into_inner().to_string(),
            }
        })
    }
}

// ============================================================================
// Demographics, provenance and routing
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
    Unknown,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
            Gender::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientInput {
    #[serde(default)]
    pub nhs_number: String,
    /// Calendar date, `YYYY-MM-DD`.
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub surname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    #[serde(default)]
    pub author: AuthorInput,
    #[serde(default)]
    pub system: SystemInput,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthorInput {
    /// Display name, optionally starting with a title such as "Dr".
    #[serde(default)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<CodedItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifiers: Option<Vec<IdentifierInput>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub professional_code: Option<String>,
}

/// The authoring clinical system.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SystemInput {
    #[serde(default)]
    pub asid: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Routing {
    #[serde(
        default,
        rename = "registeredPracticeODS",
        alias = "registeredPracticeOds"
    )]
    pub registered_practice_ods: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IdentifierInput {
    pub system: String,
    pub value: String,
}

/// A coded value. `system` and `code` default to empty so construction rules can report them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CodedItem {
    #[serde(default)]
    pub system: String,
    #[serde(default)]
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

// ============================================================================
// Clinical content
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalSummary {
    #[serde(default)]
    pub free_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medications_supplied: Option<Vec<MedicationSupplied>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EncounterInput {
    /// Role tag; `"primary"` marks the primary encounter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurred_at: Option<DateTime<FixedOffset>>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<CodedItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<CodedItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome_of_attendance: Option<CodedItem>,
    #[serde(
        rename = "performerODS",
        alias = "performerOds",
        skip_serializing_if = "Option::is_none"
    )]
    pub performer_ods: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuantityInput {
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Observation category: coded when both `system` and `code` are present, free text otherwise.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategoryInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInput {
    #[serde(default)]
    pub code: CodedItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_quantity: Option<QuantityInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_codeable_concept: Option<CodedItem>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObservationInput {
    #[serde(default)]
    pub code: CodedItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_date_time: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_site: Option<CodedItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_quantity: Option<QuantityInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_codeable_concept: Option<CodedItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<ComponentInput>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NarrativeBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub text: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub content_type: String,
    /// Standard-alphabet base64 content.
    #[serde(default)]
    pub base64: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CompositionInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<CodedItem>,
}

// ============================================================================
// Medication supply
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimingInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_unit: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RatioInput {
    pub numerator: QuantityInput,
    pub denominator: QuantityInput,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DosageInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_instruction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<TimingInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<CodedItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_dose_per_period: Option<RatioInput>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MedicationSupplied {
    #[serde(default)]
    pub medication: CodedItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CodedItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supply_type: Option<CodedItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<QuantityInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_supply: Option<QuantityInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub when_prepared: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub when_handed_over: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage_instruction: Option<DosageInput>,
}

// ============================================================================
// Message header overrides
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageHeaderOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_ack_requested: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infrastructure_ack_requested: Option<bool>,
    /// `FI` (for information) or `FA` (for action).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_type: Option<String>,
    /// Absolute URL of a published MessageDefinition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_definition_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_extension: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_payload() {
        let json = br#"{
            "patient": {"nhsNumber": "9000000009", "dateOfBirth": "1980-01-01", "surname": "Smith", "gender": "female"},
            "provenance": {"author": {"name": "Dr Jane Doe"}, "system": {"asid": "123", "name": "GP System"}},
            "routing": {"registeredPracticeODS": "A12345"},
            "clinicalSummary": {"freeText": "Routine review"},
            "encounters": [{"role": "primary", "performerODS": "B1", "occurredAt": "2024-05-01T10:00:00+01:00"}]
        }"#;

        let req = UpdateRecordRequest::from_json_slice(json).expect("valid request");

        assert_eq!(req.patient.surname, "Smith");
        assert_eq!(req.patient.gender, Some(Gender::Female));
        assert_eq!(req.routing.registered_practice_ods, "A12345");
        let encounters = req.encounters.expect("encounters present");
        assert_eq!(encounters[0].performer_ods.as_deref(), Some("B1"));
        assert!(encounters[0].occurred_at.is_some());
        assert!(req.observations.is_none());
    }

    #[test]
    fn missing_required_strings_default_to_empty() {
        let req = UpdateRecordRequest::from_json_slice(b"{}").expect("empty object parses");
        assert_eq!(req, UpdateRecordRequest::default());
    }

    #[test]
    fn malformed_value_reports_json_path() {
        let json = br#"{"patient": {"gender": "robot"}}"#;
        let err = UpdateRecordRequest::from_json_slice(json).unwrap_err();
        match err {
            ComposeError::InvalidJson { path, .. } => assert_eq!(path, "patient.gender"),
            other => panic!("expected InvalidJson, got {other:?}"),
        }
    }

    #[test]
    fn malformed_document_reports_root() {
        let err = UpdateRecordRequest::from_json_slice(b"{not json").unwrap_err();
        match err {
            ComposeError::InvalidJson { path, .. } => assert_eq!(path, "<root>"),
            other => panic!("expected InvalidJson, got {other:?}"),
        }
    }
}
