//! Fixed profile URLs, code systems and codes used when composing an ITK3 update-record message.
//!
//! Keeping these in one place makes it obvious which values are dictated by the ITK3 / GP
//! Connect profiles and which come from the request.

// ============================================================================
// Profiles
// ============================================================================

pub const PROFILE_MESSAGE_BUNDLE: &str =
    "https://fhir.nhs.uk/STU3/StructureDefinition/ITK-Message-Bundle-1";
pub const PROFILE_DOCUMENT_BUNDLE: &str =
    "https://fhir.nhs.uk/STU3/StructureDefinition/ITK-Document-Bundle-1";
pub const PROFILE_MESSAGE_HEADER: &str =
    "https://fhir.nhs.uk/STU3/StructureDefinition/ITK-MessageHeader-2";
pub const PROFILE_HEADER_ORGANIZATION: &str =
    "https://fhir.nhs.uk/STU3/StructureDefinition/CareConnect-ITK-Header-Organization-1";
pub const PROFILE_ORGANIZATION: &str =
    "https://fhir.nhs.uk/STU3/StructureDefinition/CareConnect-GPC-Organization-1";
pub const PROFILE_PATIENT: &str =
    "https://fhir.nhs.uk/STU3/StructureDefinition/CareConnect-GPC-Patient-1";
pub const PROFILE_PRACTITIONER: &str =
    "https://fhir.nhs.uk/STU3/StructureDefinition/CareConnect-GPC-Practitioner-1";
pub const PROFILE_PRACTITIONER_ROLE: &str =
    "https://fhir.nhs.uk/STU3/StructureDefinition/CareConnect-GPC-PractitionerRole-1";
pub const PROFILE_ENCOUNTER: &str =
    "https://fhir.nhs.uk/STU3/StructureDefinition/CareConnect-GPC-Encounter-1";
pub const PROFILE_OBSERVATION: &str =
    "https://fhir.nhs.uk/STU3/StructureDefinition/CareConnect-GPC-Observation-1";
pub const PROFILE_CLINICAL_IMPRESSION: &str =
    "https://fhir.nhs.uk/STU3/StructureDefinition/CareConnect-GPC-ClinicalImpression-1";
pub const PROFILE_MEDICATION_DISPENSE: &str =
    "https://fhir.nhs.uk/STU3/StructureDefinition/CareConnect-GPC-MedicationDispense-1";
pub const PROFILE_COMPOSITION: &str =
    "https://fhir.hl7.org.uk/STU3/StructureDefinition/CareConnect-Composition-1";

// ============================================================================
// Identifier systems
// ============================================================================

pub const SYSTEM_NHS_NUMBER: &str = "https://fhir.nhs.uk/Id/nhs-number";
pub const SYSTEM_ODS_ORGANIZATION_CODE: &str = "https://fhir.nhs.uk/Id/ods-organization-code";
pub const SYSTEM_BUNDLE_IDENTIFIER: &str = "https://fhir.provider.example/identifier/bundle";
pub const SYSTEM_COMPOSITION_IDENTIFIER: &str =
    "https://fhir.provider.example/identifier/composition";
pub const SYSTEM_ENCOUNTER_IDENTIFIER: &str = "https://fhir.provider.example/identifier/encounter";
pub const SYSTEM_OBSERVATION_IDENTIFIER: &str =
    "https://fhir.provider.example/identifier/observation";
pub const SYSTEM_CLINICAL_IMPRESSION_IDENTIFIER: &str =
    "https://fhir.provider.example/identifier/clinical-impression";
pub const SYSTEM_MEDICATION_DISPENSE_IDENTIFIER: &str =
    "https://fhir.provider.example/identifier/medication-dispense";
pub const SYSTEM_STAFF_CODE: &str = "https://fhir.provider.example/identifier/staff-code";

// ============================================================================
// Code systems and codes
// ============================================================================

pub const SYSTEM_SNOMED: &str = "http://snomed.info/sct";

/// Default STU3 observation category system for free-text categories.
pub const SYSTEM_OBSERVATION_CATEGORY: &str = "http://hl7.org/fhir/observation-category";

pub const SYSTEM_MESSAGE_EVENT: &str = "https://fhir.nhs.uk/STU3/CodeSystem/ITK-MessageEvent-2";
pub const EVENT_CODE_UPDATE_RECORD: &str = "ITK014M";
pub const EVENT_DISPLAY_UPDATE_RECORD: &str = "ITK Update Record";

pub const SYSTEM_RECIPIENT_TYPE: &str = "https://fhir.nhs.uk/STU3/CodeSystem/ITK-RecipientType-1";

pub const SYSTEM_PARTICIPANT_TYPE: &str =
    "https://fhir.nhs.uk/STU3/CodeSystem/GPConnect-ParticipantType-1";
pub const PARTICIPANT_RECORDER_CODE: &str = "REC";
pub const PARTICIPANT_RECORDER_TEXT: &str = "recorder";

/// "Seen in primary care establishment"
pub const ENCOUNTER_TYPE_CODE: &str = "307778003";
pub const ENCOUNTER_TYPE_TEXT: &str = "Seen in primary care establishment";

pub const COMPOSITION_TYPE_CODE: &str = "1659111000000107";
pub const DEFAULT_COMPOSITION_TITLE: &str = "Community service update";

// ============================================================================
// Extensions
// ============================================================================

pub const EXTENSION_MESSAGE_HANDLING: &str =
    "https://fhir.nhs.uk/STU3/StructureDefinition/Extension-ITK-MessageHandling-2";
pub const EXTENSION_OUTCOME_OF_ATTENDANCE: &str =
    "https://fhir.hl7.org.uk/STU3/StructureDefinition/Extension-CareConnect-OutcomeOfAttendance-1";

/// Value of the `LocalExtension` handling child when the caller supplies none.
pub const DEFAULT_LOCAL_EXTENSION: &str = "None";

// ============================================================================
// Statuses and tags
// ============================================================================

pub const ENCOUNTER_STATUS_FINISHED: &str = "finished";
pub const OBSERVATION_STATUS_FINAL: &str = "final";
pub const COMPOSITION_STATUS_FINAL: &str = "final";
pub const STATUS_COMPLETED: &str = "completed";

/// Role tag marking the primary encounter in a request's encounter list.
pub const PRIMARY_ENCOUNTER_ROLE: &str = "primary";

/// Titles recognised as a name prefix when splitting a practitioner's display name.
pub const NAME_TITLES: [&str; 5] = ["Dr", "Mr", "Mrs", "Miss", "Ms"];

// ============================================================================
// Configuration defaults
// ============================================================================

pub const DEFAULT_SENDER_MESH_MAILBOX: &str = "SENDER_MESH_MAILBOX_ID";
pub const DEFAULT_SENDER_ODS: &str = "A(*)";
pub const DEFAULT_RECIPIENT_TYPE: &str = "FI";
