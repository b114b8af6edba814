//! Minimal request validation.
//!
//! Runs before any identity is allocated. Checks fail fast in a fixed group order (patient,
//! clinical summary, provenance, routing); the first failing group produces a single
//! [`ComposeError::Validation`] naming every field of that group.
//!
//! On success the required values are returned already typed, so builders never re-check them.
//! [`check_xml_text`] then rejects any text the XML writer could not carry.

use crate::request::UpdateRecordRequest;
use crate::{ComposeError, ComposeResult};
use chrono::NaiveDate;
use fhir::is_xml_char;
use gpupdate_types::NonEmptyText;
use serde_json::Value;

pub const PATIENT_GROUP_MESSAGE: &str =
    "patient.nhsNumber, patient.dateOfBirth, patient.surname are required";
pub const SUMMARY_GROUP_MESSAGE: &str = "clinicalSummary.freeText is required";
pub const PROVENANCE_GROUP_MESSAGE: &str =
    "provenance.author.name and provenance.system.{asid,name} are required";
pub const ROUTING_GROUP_MESSAGE: &str = "routing.registeredPracticeODS is required";

/// Required request values, trimmed and typed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequiredFields {
    pub nhs_number: NonEmptyText,
    pub date_of_birth: NaiveDate,
    pub surname: NonEmptyText,
    pub summary_text: NonEmptyText,
    pub author_name: NonEmptyText,
    pub system_asid: NonEmptyText,
    pub system_name: NonEmptyText,
    pub registered_practice_ods: NonEmptyText,
}

/// Check the minimal required fields of a request.
///
/// # Errors
///
/// Returns [`ComposeError::Validation`] for the first group with a blank field, or when the
/// date of birth is present but not a `YYYY-MM-DD` calendar date.
pub fn validate_minimal(req: &UpdateRecordRequest) -> ComposeResult<RequiredFields> {
    let patient = &req.patient;
    let (nhs_number, dob, surname) = match (
        NonEmptyText::new(&patient.nhs_number),
        NonEmptyText::new(&patient.date_of_birth),
        NonEmptyText::new(&patient.surname),
    ) {
        (Ok(n), Ok(d), Ok(s)) => (n, d, s),
        _ => return Err(ComposeError::Validation(PATIENT_GROUP_MESSAGE.into())),
    };
    let date_of_birth = NaiveDate::parse_from_str(dob.as_str(), "%Y-%m-%d").map_err(|_| {
        ComposeError::Validation(format!(
            "patient.dateOfBirth must be a calendar date (YYYY-MM-DD), got '{}'",
            dob
        ))
    })?;

    let summary_text = NonEmptyText::new(&req.clinical_summary.free_text)
        .map_err(|_| ComposeError::Validation(SUMMARY_GROUP_MESSAGE.into()))?;

    let provenance = &req.provenance;
    let (author_name, system_asid, system_name) = match (
        NonEmptyText::new(&provenance.author.name),
        NonEmptyText::new(&provenance.system.asid),
        NonEmptyText::new(&provenance.system.name),
    ) {
        (Ok(a), Ok(i), Ok(n)) => (a, i, n),
        _ => return Err(ComposeError::Validation(PROVENANCE_GROUP_MESSAGE.into())),
    };

    let registered_practice_ods = NonEmptyText::new(&req.routing.registered_practice_ods)
        .map_err(|_| ComposeError::Validation(ROUTING_GROUP_MESSAGE.into()))?;

    Ok(RequiredFields {
        nhs_number,
        date_of_birth,
        surname,
        summary_text,
        author_name,
        system_asid,
        system_name,
        registered_practice_ods,
    })
}

/// Reject request text containing characters XML 1.0 cannot represent.
///
/// Every string in the request is checked, keys included, and the first offender is reported by
/// its JSON path, e.g. `clinicalSummary.freeText`.
///
/// # Errors
///
/// Returns [`ComposeError::Validation`] naming the field and the offending code point.
pub fn check_xml_text(req: &UpdateRecordRequest) -> ComposeResult<()> {
    let value = serde_json::to_value(req)
        .map_err(|e| ComposeError::Validation(format!("request could not be inspected: {e}")))?;
    walk(&value, &mut String::new())
}

fn walk(value: &Value, path: &mut String) -> ComposeResult<()> {
    match value {
        Value::String(text) => check_str(path, text),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                let len = path.len();
                path.push_str(&format!("[{index}]"));
                walk(item, path)?;
                path.truncate(len);
            }
            Ok(())
        }
        Value::Object(fields) => {
            for (key, field) in fields {
                let len = path.len();
                if !path.is_empty() {
                    path.push('.');
                }
                path.push_str(key);
                check_str(path, key)?;
                walk(field, path)?;
                path.truncate(len);
            }
            Ok(())
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => Ok(()),
    }
}

fn check_str(path: &str, text: &str) -> ComposeResult<()> {
    match text.chars().find(|c| !is_xml_char(*c)) {
        Some(c) => Err(ComposeError::Validation(format!(
            "{path} contains a character not allowed in XML (U+{:04X})",
            c as u32
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> UpdateRecordRequest {
        let mut req = UpdateRecordRequest::default();
        req.patient.nhs_number = "9000000009".into();
        req.patient.date_of_birth = "1980-01-01".into();
        req.patient.surname = "Smith".into();
        req.clinical_summary.free_text = "Routine review".into();
        req.provenance.author.name = "Dr Jane Doe".into();
        req.provenance.system.asid = "123".into();
        req.provenance.system.name = "GP System".into();
        req.routing.registered_practice_ods = "A12345".into();
        req
    }

    fn message_of(err: ComposeError) -> String {
        match err {
            ComposeError::Validation(msg) => msg,
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn valid_request_yields_typed_fields() {
        let fields = validate_minimal(&valid_request()).expect("valid");
        assert_eq!(fields.surname.as_str(), "Smith");
        assert_eq!(fields.date_of_birth, NaiveDate::from_ymd_opt(1980, 1, 1).unwrap());
        assert_eq!(fields.registered_practice_ods.as_str(), "A12345");
    }

    #[test]
    fn empty_surname_is_rejected_with_patient_group() {
        let mut req = valid_request();
        req.patient.surname = "   ".into();
        assert_eq!(message_of(validate_minimal(&req).unwrap_err()), PATIENT_GROUP_MESSAGE);
    }

    #[test]
    fn missing_summary_text_is_rejected() {
        let mut req = valid_request();
        req.clinical_summary.free_text = String::new();
        assert_eq!(message_of(validate_minimal(&req).unwrap_err()), SUMMARY_GROUP_MESSAGE);
    }

    #[test]
    fn missing_asid_is_rejected_with_provenance_group() {
        let mut req = valid_request();
        req.provenance.system.asid = String::new();
        assert_eq!(message_of(validate_minimal(&req).unwrap_err()), PROVENANCE_GROUP_MESSAGE);
    }

    #[test]
    fn blank_routing_is_rejected() {
        let mut req = valid_request();
        req.routing.registered_practice_ods = " ".into();
        assert_eq!(message_of(validate_minimal(&req).unwrap_err()), ROUTING_GROUP_MESSAGE);
    }

    #[test]
    fn patient_group_is_reported_before_later_groups() {
        let mut req = valid_request();
        req.patient.nhs_number = String::new();
        req.clinical_summary.free_text = String::new();
        assert_eq!(message_of(validate_minimal(&req).unwrap_err()), PATIENT_GROUP_MESSAGE);
    }

    #[test]
    fn unparseable_date_of_birth_is_rejected() {
        let mut req = valid_request();
        req.patient.date_of_birth = "01/01/1980".into();
        let msg = message_of(validate_minimal(&req).unwrap_err());
        assert!(msg.contains("patient.dateOfBirth"));
    }

    #[test]
    fn control_character_in_free_text_is_rejected_by_path() {
        let mut req = valid_request();
        req.clinical_summary.free_text = "Routine\u{0001}review".into();
        assert_eq!(
            message_of(check_xml_text(&req).unwrap_err()),
            "clinicalSummary.freeText contains a character not allowed in XML (U+0001)"
        );
    }

    #[test]
    fn nested_optional_text_is_checked() {
        let mut req = valid_request();
        req.patient.given_name = Some("Ja\u{0002}ne".into());
        let msg = message_of(check_xml_text(&req).unwrap_err());
        assert!(msg.starts_with("patient.givenName "), "{msg}");
    }

    #[test]
    fn tab_newline_and_carriage_return_are_allowed() {
        let mut req = valid_request();
        req.clinical_summary.free_text = "Line one\r\n\tLine two".into();
        assert!(check_xml_text(&req).is_ok());
    }

    #[test]
    fn non_characters_are_rejected() {
        let mut req = valid_request();
        req.provenance.author.name = "Dr \u{FFFE}".into();
        let msg = message_of(check_xml_text(&req).unwrap_err());
        assert!(msg.contains("provenance.author.name"), "{msg}");
        assert!(msg.contains("U+FFFE"), "{msg}");
    }
}
