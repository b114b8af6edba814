//! Administrative resources: the patient, the authoring practitioner and organisations.

use crate::datatypes::{Address, CodeableConcept, HumanName, Identifier, Meta, Reference};
use crate::xml::{ToXml, XmlWriter};
use crate::FhirResult;

#[derive(Clone, Debug, PartialEq)]
pub struct Organization {
    pub id: String,
    pub meta: Meta,
    pub identifier: Vec<Identifier>,
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Patient {
    pub id: String,
    pub meta: Meta,
    pub identifier: Vec<Identifier>,
    pub name: Vec<HumanName>,
    /// `male | female | other | unknown`
    pub gender: Option<String>,
    pub birth_date: Option<String>,
    pub address: Vec<Address>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Practitioner {
    pub id: String,
    pub meta: Meta,
    pub identifier: Vec<Identifier>,
    pub name: Vec<HumanName>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PractitionerRole {
    pub id: String,
    pub meta: Meta,
    pub practitioner: Option<Reference>,
    pub organization: Option<Reference>,
    pub code: Vec<CodeableConcept>,
}

impl ToXml for Organization {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.primitive("id", &self.id)?;
            w.element("meta", &self.meta)?;
            w.elements("identifier", &self.identifier)?;
            w.opt_primitive("name", self.name.as_deref())
        })
    }
}

impl ToXml for Patient {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.primitive("id", &self.id)?;
            w.element("meta", &self.meta)?;
            w.elements("identifier", &self.identifier)?;
            w.elements("name", &self.name)?;
            w.opt_primitive("gender", self.gender.as_deref())?;
            w.opt_primitive("birthDate", self.birth_date.as_deref())?;
            w.elements("address", &self.address)
        })
    }
}

impl ToXml for Practitioner {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.primitive("id", &self.id)?;
            w.element("meta", &self.meta)?;
            w.elements("identifier", &self.identifier)?;
            w.elements("name", &self.name)
        })
    }
}

impl ToXml for PractitionerRole {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.primitive("id", &self.id)?;
            w.element("meta", &self.meta)?;
            w.opt_element("practitioner", &self.practitioner)?;
            w.opt_element("organization", &self.organization)?;
            w.elements("code", &self.code)
        })
    }
}

impl PractitionerRole {
    pub(crate) fn collect_references<'a>(&'a self, out: &mut Vec<&'a Reference>) {
        out.extend(self.practitioner.iter());
        out.extend(self.organization.iter());
    }
}
