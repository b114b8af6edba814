//! Resource builders.
//!
//! One pure function per output resource kind. Each takes the request fragment it maps, the
//! identity allocated for the resource, and a [`BuildContext`] holding the shared timestamp and
//! the full URLs of the resources it points at. No builder allocates identities or reads the
//! clock.

pub mod clinical_impression;
pub mod composition;
pub mod encounter;
pub mod medication_dispense;
pub mod message_header;
pub mod observation;
pub mod organization;
pub mod patient;
pub mod practitioner;
pub mod practitioner_role;

use crate::request::{AttachmentInput, CodedItem, QuantityInput};
use crate::{ComposeError, ComposeResult};
use base64::Engine;
use chrono::{DateTime, FixedOffset, SecondsFormat};
use fhir::{CodeableConcept, Coding, Meta, Quantity, Reference};
use gpupdate_types::non_blank;
use gpupdate_uuid::FullUrl;

/// Full URLs of the resources other resources point at.
#[derive(Clone, Debug)]
pub struct ResourceLinks {
    pub patient: FullUrl,
    pub practitioner: FullUrl,
    pub service_organization: FullUrl,
    pub primary_encounter: FullUrl,
}

/// Values shared by every builder within one compose call.
#[derive(Clone, Debug)]
pub struct BuildContext {
    /// `meta.lastUpdated` of every resource, computed once at compose start.
    pub last_updated: String,
    pub links: ResourceLinks,
}

impl BuildContext {
    pub fn meta(&self, profile: &str) -> Meta {
        Meta::new(&self.last_updated, profile)
    }

    pub fn patient_ref(&self) -> Reference {
        Reference::to(&self.links.patient)
    }

    pub fn practitioner_ref(&self) -> Reference {
        Reference::to(&self.links.practitioner)
    }

    pub fn service_organization_ref(&self) -> Reference {
        Reference::to(&self.links.service_organization)
    }

    pub fn primary_encounter_ref(&self) -> Reference {
        Reference::to(&self.links.primary_encounter)
    }
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

/// `true` when both `system` and `code` carry content.
pub(crate) fn has_code(item: &CodedItem) -> bool {
    non_blank(Some(item.system.as_str())).is_some() && non_blank(Some(item.code.as_str())).is_some()
}

pub(crate) fn owned(value: Option<&str>) -> Option<String> {
    non_blank(value).map(str::to_owned)
}

pub(crate) fn coding_from(item: &CodedItem) -> Coding {
    Coding::new(item.system.trim(), item.code.trim()).with_display(owned(item.display.as_deref()))
}

/// Coded concept with `text` taken from the item's text, or its display when no text is given.
pub(crate) fn concept_from(item: &CodedItem) -> CodeableConcept {
    let text = owned(item.text.as_deref()).or_else(|| owned(item.display.as_deref()));
    CodeableConcept::from_coding(coding_from(item)).with_text(text)
}

/// Coded concept when `item` has a system and code, otherwise `None`.
pub(crate) fn coded_concept(item: Option<&CodedItem>) -> Option<CodeableConcept> {
    item.filter(|i| has_code(i)).map(concept_from)
}

pub(crate) fn quantity_from(q: &QuantityInput) -> Quantity {
    Quantity {
        value: Some(q.value),
        unit: owned(q.unit.as_deref()),
        system: owned(q.system.as_deref()),
        code: owned(q.code.as_deref()),
    }
}

pub(crate) fn date_time(at: &DateTime<FixedOffset>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Fail with a construction error unless `item` has a system and code.
pub(crate) fn require_code(item: &CodedItem, field: &str) -> ComposeResult<()> {
    if has_code(item) {
        Ok(())
    } else {
        Err(ComposeError::Construction(format!(
            "{field}.system and {field}.code are required"
        )))
    }
}

/// Attachments are not rendered, but their content must be decodable.
pub fn check_attachments(attachments: &[AttachmentInput]) -> ComposeResult<()> {
    for (i, att) in attachments.iter().enumerate() {
        let label = non_blank(att.title.as_deref())
            .map(|t| format!("attachment '{t}'"))
            .unwrap_or_else(|| format!("attachments[{i}]"));

        if non_blank(Some(att.content_type.as_str())).is_none() {
            return Err(ComposeError::Construction(format!(
                "{label} has no contentType"
            )));
        }
        base64::engine::general_purpose::STANDARD
            .decode(att.base64.trim())
            .map_err(|e| ComposeError::Construction(format!("{label} is not valid base64: {e}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(system: &str, code: &str) -> CodedItem {
        CodedItem {
            system: system.into(),
            code: code.into(),
            ..Default::default()
        }
    }

    #[test]
    fn has_code_requires_both_parts() {
        assert!(has_code(&item("http://snomed.info/sct", "123")));
        assert!(!has_code(&item("", "123")));
        assert!(!has_code(&item("http://snomed.info/sct", "  ")));
    }

    #[test]
    fn concept_text_prefers_text_over_display() {
        let mut coded = item("s", "c");
        coded.display = Some("Display".into());
        assert_eq!(concept_from(&coded).text.as_deref(), Some("Display"));

        coded.text = Some("Text".into());
        let concept = concept_from(&coded);
        assert_eq!(concept.text.as_deref(), Some("Text"));
        assert_eq!(concept.coding[0].display.as_deref(), Some("Display"));
    }

    #[test]
    fn attachments_must_be_base64() {
        let good = AttachmentInput {
            title: Some("letter".into()),
            content_type: "application/pdf".into(),
            base64: "SGVsbG8=".into(),
            description: None,
        };
        assert!(check_attachments(std::slice::from_ref(&good)).is_ok());

        let bad = AttachmentInput {
            base64: "not base64!".into(),
            ..good
        };
        match check_attachments(&[bad]) {
            Err(ComposeError::Construction(msg)) => assert!(msg.contains("attachment 'letter'")),
            other => panic!("expected Construction, got {other:?}"),
        }
    }

    #[test]
    fn date_time_keeps_offset() {
        let at = DateTime::parse_from_rfc3339("2024-05-01T10:00:00+01:00").unwrap();
        assert_eq!(date_time(&at), "2024-05-01T10:00:00+01:00");
    }
}
