//! FHIR STU3 wire model and XML serializer for ITK3 messages.
//!
//! This crate provides **wire models** for the resources carried by an ITK3 "update record"
//! message, and a serializer that renders them in the FHIR XML form:
//! - primitive values as `value` attributes
//! - absent optional fields omitted entirely
//! - repeated fields in the order they were appended
//! - the root `Bundle` in the `http://hl7.org/fhir` namespace
//!
//! The model is deliberately narrow: only the elements the composer populates are modelled.
//! It also exposes reference traversal ([`Bundle::references`], [`Bundle::full_urls`]) so
//! callers can check that every in-message reference resolves.

pub mod administrative;
pub mod clinical;
pub mod datatypes;
pub mod message;
pub mod xml;

pub use administrative::{Organization, Patient, Practitioner, PractitionerRole};
pub use clinical::{
    ClinicalImpression, Composition, CompositionSection, Dosage, Encounter, EncounterParticipant,
    MedicationDispense, MedicationDispensePerformer, Observation, ObservationComponent,
    ObservationValue, Timing, TimingRepeat,
};
pub use datatypes::{
    Address, CodeableConcept, Coding, Extension, ExtensionValue, HumanName, Identifier, Meta,
    Narrative, Period, Quantity, Ratio, Reference,
};
pub use message::{Bundle, BundleEntry, BundleType, MessageHeader, MessageSource, Resource};
pub use xml::{is_xml_char, Namespaced, ToXml, XmlWriter, FHIR_NS, XHTML_NS};

/// Errors returned by the `fhir` crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("XML write error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("<{element}> cannot carry character U+{code_point:04X} in XML")]
    InvalidCharacter { element: String, code_point: u32 },
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;

/// Formats an instant the way `meta.lastUpdated` and `MessageHeader.timestamp` expect it:
/// RFC 3339, UTC, millisecond precision.
pub fn instant(at: &chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Formats a calendar date as `YYYY-MM-DD`.
pub fn date(day: &chrono::NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn instant_is_utc_with_millis() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 9, 30, 0).unwrap();
        assert_eq!(instant(&at), "2024-03-05T09:30:00.000Z");
    }

    #[test]
    fn date_is_iso() {
        let day = NaiveDate::from_ymd_opt(1980, 1, 1).unwrap();
        assert_eq!(date(&day), "1980-01-01");
    }
}
