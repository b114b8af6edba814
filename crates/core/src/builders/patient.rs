use super::{owned, BuildContext};
use crate::constants::{PROFILE_PATIENT, SYSTEM_NHS_NUMBER};
use crate::request::PatientInput;
use crate::validation::RequiredFields;
use fhir::{Address, HumanName, Identifier, Patient};
use gpupdate_uuid::ResourceIdentity;

/// Build the subject patient.
///
/// Required values come from [`RequiredFields`]; given name, postcode and gender are only
/// rendered when present and non-blank.
pub fn build_patient(
    identity: &ResourceIdentity,
    required: &RequiredFields,
    input: &PatientInput,
    ctx: &BuildContext,
) -> Patient {
    let name = HumanName {
        use_: Some("official".to_owned()),
        family: Some(required.surname.to_string()),
        given: owned(input.given_name.as_deref()).into_iter().collect(),
        prefix: Vec::new(),
    };

    let address = owned(input.postcode.as_deref())
        .map(|postcode| Address {
            line: Vec::new(),
            postal_code: Some(postcode),
        })
        .into_iter()
        .collect();

    Patient {
        id: identity.id(),
        meta: ctx.meta(PROFILE_PATIENT),
        identifier: vec![Identifier::new(SYSTEM_NHS_NUMBER, required.nhs_number.as_str())],
        name: vec![name],
        gender: input.gender.map(|g| g.as_str().to_owned()),
        birth_date: Some(fhir::date(&required.date_of_birth)),
        address,
    }
}
