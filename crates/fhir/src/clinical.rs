//! Clinical resources carried in the document bundle.
//!
//! Field order in each `ToXml` impl follows the STU3 element order for the resource.

use crate::datatypes::{
    CodeableConcept, Extension, Identifier, Meta, Narrative, Period, Quantity, Ratio, Reference,
};
use crate::xml::{ToXml, XmlWriter};
use crate::FhirResult;

// ============================================================================
// Encounter
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct Encounter {
    pub id: String,
    pub meta: Meta,
    pub extension: Vec<Extension>,
    pub identifier: Vec<Identifier>,
    pub status: String,
    pub type_: Vec<CodeableConcept>,
    pub subject: Option<Reference>,
    pub participant: Vec<EncounterParticipant>,
    pub period: Option<Period>,
    pub reason: Vec<CodeableConcept>,
    pub service_provider: Option<Reference>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EncounterParticipant {
    pub type_: Vec<CodeableConcept>,
    pub individual: Option<Reference>,
}

impl ToXml for EncounterParticipant {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.elements("type", &self.type_)?;
            w.opt_element("individual", &self.individual)
        })
    }
}

impl ToXml for Encounter {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.primitive("id", &self.id)?;
            w.element("meta", &self.meta)?;
            w.elements("extension", &self.extension)?;
            w.elements("identifier", &self.identifier)?;
            w.primitive("status", &self.status)?;
            w.elements("type", &self.type_)?;
            w.opt_element("subject", &self.subject)?;
            w.elements("participant", &self.participant)?;
            w.opt_element("period", &self.period)?;
            w.elements("reason", &self.reason)?;
            w.opt_element("serviceProvider", &self.service_provider)
        })
    }
}

impl Encounter {
    pub(crate) fn collect_references<'a>(&'a self, out: &mut Vec<&'a Reference>) {
        for ext in &self.extension {
            ext.collect_references(out);
        }
        out.extend(self.subject.iter());
        out.extend(self.participant.iter().filter_map(|p| p.individual.as_ref()));
        out.extend(self.service_provider.iter());
    }
}

// ============================================================================
// Observation
// ============================================================================

/// The `value[x]` choice of an observation or component.
#[derive(Clone, Debug, PartialEq)]
pub enum ObservationValue {
    Quantity(Quantity),
    CodeableConcept(CodeableConcept),
}

impl ObservationValue {
    fn write(&self, w: &mut XmlWriter) -> FhirResult<()> {
        match self {
            ObservationValue::Quantity(q) => w.element("valueQuantity", q),
            ObservationValue::CodeableConcept(cc) => w.element("valueCodeableConcept", cc),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ObservationComponent {
    pub code: CodeableConcept,
    pub value: Option<ObservationValue>,
}

impl ToXml for ObservationComponent {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.element("code", &self.code)?;
            match &self.value {
                Some(v) => v.write(w),
                None => Ok(()),
            }
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub id: String,
    pub meta: Meta,
    pub identifier: Vec<Identifier>,
    pub status: String,
    pub category: Vec<CodeableConcept>,
    pub code: CodeableConcept,
    pub subject: Option<Reference>,
    pub context: Option<Reference>,
    pub effective_date_time: Option<String>,
    pub issued: Option<String>,
    pub performer: Vec<Reference>,
    pub value: Option<ObservationValue>,
    pub body_site: Option<CodeableConcept>,
    pub component: Vec<ObservationComponent>,
}

impl ToXml for Observation {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.primitive("id", &self.id)?;
            w.element("meta", &self.meta)?;
            w.elements("identifier", &self.identifier)?;
            w.primitive("status", &self.status)?;
            w.elements("category", &self.category)?;
            w.element("code", &self.code)?;
            w.opt_element("subject", &self.subject)?;
            w.opt_element("context", &self.context)?;
            w.opt_primitive("effectiveDateTime", self.effective_date_time.as_deref())?;
            w.opt_primitive("issued", self.issued.as_deref())?;
            w.elements("performer", &self.performer)?;
            if let Some(value) = &self.value {
                value.write(w)?;
            }
            w.opt_element("bodySite", &self.body_site)?;
            w.elements("component", &self.component)
        })
    }
}

impl Observation {
    pub(crate) fn collect_references<'a>(&'a self, out: &mut Vec<&'a Reference>) {
        out.extend(self.subject.iter());
        out.extend(self.context.iter());
        out.extend(self.performer.iter());
    }
}

// ============================================================================
// ClinicalImpression
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct ClinicalImpression {
    pub id: String,
    pub meta: Meta,
    pub identifier: Vec<Identifier>,
    pub status: String,
    pub description: Option<String>,
    pub subject: Option<Reference>,
    pub context: Option<Reference>,
    pub date: Option<String>,
    pub assessor: Option<Reference>,
    pub summary: Option<String>,
}

impl ToXml for ClinicalImpression {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.primitive("id", &self.id)?;
            w.element("meta", &self.meta)?;
            w.elements("identifier", &self.identifier)?;
            w.primitive("status", &self.status)?;
            w.opt_primitive("description", self.description.as_deref())?;
            w.opt_element("subject", &self.subject)?;
            w.opt_element("context", &self.context)?;
            w.opt_primitive("date", self.date.as_deref())?;
            w.opt_element("assessor", &self.assessor)?;
            w.opt_primitive("summary", self.summary.as_deref())
        })
    }
}

impl ClinicalImpression {
    pub(crate) fn collect_references<'a>(&'a self, out: &mut Vec<&'a Reference>) {
        out.extend(self.subject.iter());
        out.extend(self.context.iter());
        out.extend(self.assessor.iter());
    }
}

// ============================================================================
// MedicationDispense
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimingRepeat {
    pub frequency: Option<u32>,
    pub period: Option<f64>,
    pub period_unit: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Timing {
    pub repeat: Option<TimingRepeat>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dosage {
    pub text: Option<String>,
    pub patient_instruction: Option<String>,
    pub timing: Option<Timing>,
    pub route: Option<CodeableConcept>,
    pub max_dose_per_period: Option<Ratio>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MedicationDispensePerformer {
    pub actor: Reference,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MedicationDispense {
    pub id: String,
    pub meta: Meta,
    pub identifier: Vec<Identifier>,
    pub status: String,
    pub category: Option<CodeableConcept>,
    pub medication_codeable_concept: CodeableConcept,
    pub subject: Option<Reference>,
    pub context: Option<Reference>,
    pub performer: Vec<MedicationDispensePerformer>,
    pub type_: Option<CodeableConcept>,
    pub quantity: Option<Quantity>,
    pub days_supply: Option<Quantity>,
    pub when_prepared: Option<String>,
    pub when_handed_over: Option<String>,
    pub dosage_instruction: Vec<Dosage>,
}

impl ToXml for TimingRepeat {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.integer("frequency", self.frequency)?;
            w.decimal("period", self.period)?;
            w.opt_primitive("periodUnit", self.period_unit.as_deref())
        })
    }
}

impl ToXml for Timing {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| w.opt_element("repeat", &self.repeat))
    }
}

impl ToXml for Dosage {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.opt_primitive("text", self.text.as_deref())?;
            w.opt_primitive("patientInstruction", self.patient_instruction.as_deref())?;
            w.opt_element("timing", &self.timing)?;
            w.opt_element("route", &self.route)?;
            w.opt_element("maxDosePerPeriod", &self.max_dose_per_period)
        })
    }
}

impl ToXml for MedicationDispensePerformer {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| w.element("actor", &self.actor))
    }
}

impl ToXml for MedicationDispense {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.primitive("id", &self.id)?;
            w.element("meta", &self.meta)?;
            w.elements("identifier", &self.identifier)?;
            w.primitive("status", &self.status)?;
            w.opt_element("category", &self.category)?;
            w.element("medicationCodeableConcept", &self.medication_codeable_concept)?;
            w.opt_element("subject", &self.subject)?;
            w.opt_element("context", &self.context)?;
            w.elements("performer", &self.performer)?;
            w.opt_element("type", &self.type_)?;
            w.opt_element("quantity", &self.quantity)?;
            w.opt_element("daysSupply", &self.days_supply)?;
            w.opt_primitive("whenPrepared", self.when_prepared.as_deref())?;
            w.opt_primitive("whenHandedOver", self.when_handed_over.as_deref())?;
            w.elements("dosageInstruction", &self.dosage_instruction)
        })
    }
}

impl MedicationDispense {
    pub(crate) fn collect_references<'a>(&'a self, out: &mut Vec<&'a Reference>) {
        out.extend(self.subject.iter());
        out.extend(self.context.iter());
        out.extend(self.performer.iter().map(|p| &p.actor));
    }
}

// ============================================================================
// Composition
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct CompositionSection {
    pub title: Option<String>,
    pub text: Option<Narrative>,
    pub entry: Vec<Reference>,
}

impl ToXml for CompositionSection {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.opt_primitive("title", self.title.as_deref())?;
            w.opt_element("text", &self.text)?;
            w.elements("entry", &self.entry)
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Composition {
    pub id: String,
    pub meta: Meta,
    pub identifier: Option<Identifier>,
    pub status: String,
    pub type_: CodeableConcept,
    pub subject: Option<Reference>,
    pub encounter: Option<Reference>,
    pub date: String,
    pub author: Vec<Reference>,
    pub title: String,
    pub section: Vec<CompositionSection>,
}

impl ToXml for Composition {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.primitive("id", &self.id)?;
            w.element("meta", &self.meta)?;
            w.opt_element("identifier", &self.identifier)?;
            w.primitive("status", &self.status)?;
            w.element("type", &self.type_)?;
            w.opt_element("subject", &self.subject)?;
            w.opt_element("encounter", &self.encounter)?;
            w.primitive("date", &self.date)?;
            w.elements("author", &self.author)?;
            w.primitive("title", &self.title)?;
            w.elements("section", &self.section)
        })
    }
}

impl Composition {
    pub(crate) fn collect_references<'a>(&'a self, out: &mut Vec<&'a Reference>) {
        out.extend(self.subject.iter());
        out.extend(self.encounter.iter());
        out.extend(self.author.iter());
        out.extend(self.section.iter().flat_map(|s| s.entry.iter()));
    }
}
