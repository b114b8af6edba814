//! Message envelope types: `Bundle`, `MessageHeader` and the `Resource` sum type.

use crate::administrative::{Organization, Patient, Practitioner, PractitionerRole};
use crate::clinical::{ClinicalImpression, Composition, Encounter, MedicationDispense, Observation};
use crate::datatypes::{Coding, Extension, Identifier, Meta, Reference};
use crate::xml::{Namespaced, ToXml, XmlWriter};
use crate::FhirResult;
use gpupdate_uuid::FullUrl;
use std::collections::HashSet;

// ============================================================================
// MessageHeader
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct MessageSource {
    pub name: Option<String>,
    pub endpoint: String,
}

impl ToXml for MessageSource {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.opt_primitive("name", self.name.as_deref())?;
            w.primitive("endpoint", &self.endpoint)
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MessageHeader {
    pub id: String,
    pub meta: Meta,
    pub extension: Vec<Extension>,
    pub event: Coding,
    pub sender: Option<Reference>,
    pub timestamp: String,
    pub source: MessageSource,
    pub focus: Vec<Reference>,
}

impl ToXml for MessageHeader {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.primitive("id", &self.id)?;
            w.element("meta", &self.meta)?;
            w.elements("extension", &self.extension)?;
            w.element("event", &self.event)?;
            w.opt_element("sender", &self.sender)?;
            w.primitive("timestamp", &self.timestamp)?;
            w.element("source", &self.source)?;
            w.elements("focus", &self.focus)
        })
    }
}

impl MessageHeader {
    fn collect_references<'a>(&'a self, out: &mut Vec<&'a Reference>) {
        for ext in &self.extension {
            ext.collect_references(out);
        }
        out.extend(self.sender.iter());
        out.extend(self.focus.iter());
    }
}

// ============================================================================
// Resource
// ============================================================================

/// Any resource that can appear as a bundle entry.
#[derive(Clone, Debug, PartialEq)]
pub enum Resource {
    Bundle(Box<Bundle>),
    MessageHeader(MessageHeader),
    Organization(Organization),
    Patient(Patient),
    Practitioner(Practitioner),
    PractitionerRole(PractitionerRole),
    Encounter(Encounter),
    Observation(Observation),
    ClinicalImpression(ClinicalImpression),
    MedicationDispense(MedicationDispense),
    Composition(Composition),
}

impl Resource {
    /// The FHIR resource type name, which is also the XML element name.
    pub fn resource_type(&self) -> &'static str {
        match self {
            Resource::Bundle(_) => "Bundle",
            Resource::MessageHeader(_) => "MessageHeader",
            Resource::Organization(_) => "Organization",
            Resource::Patient(_) => "Patient",
            Resource::Practitioner(_) => "Practitioner",
            Resource::PractitionerRole(_) => "PractitionerRole",
            Resource::Encounter(_) => "Encounter",
            Resource::Observation(_) => "Observation",
            Resource::ClinicalImpression(_) => "ClinicalImpression",
            Resource::MedicationDispense(_) => "MedicationDispense",
            Resource::Composition(_) => "Composition",
        }
    }

    /// Logical id of the resource.
    pub fn id(&self) -> &str {
        match self {
            Resource::Bundle(r) => &r.id,
            Resource::MessageHeader(r) => &r.id,
            Resource::Organization(r) => &r.id,
            Resource::Patient(r) => &r.id,
            Resource::Practitioner(r) => &r.id,
            Resource::PractitionerRole(r) => &r.id,
            Resource::Encounter(r) => &r.id,
            Resource::Observation(r) => &r.id,
            Resource::ClinicalImpression(r) => &r.id,
            Resource::MedicationDispense(r) => &r.id,
            Resource::Composition(r) => &r.id,
        }
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a Reference>) {
        match self {
            Resource::Bundle(b) => b.collect_references(out),
            Resource::MessageHeader(r) => r.collect_references(out),
            Resource::PractitionerRole(r) => r.collect_references(out),
            Resource::Encounter(r) => r.collect_references(out),
            Resource::Observation(r) => r.collect_references(out),
            Resource::ClinicalImpression(r) => r.collect_references(out),
            Resource::MedicationDispense(r) => r.collect_references(out),
            Resource::Composition(r) => r.collect_references(out),
            Resource::Organization(_) | Resource::Patient(_) | Resource::Practitioner(_) => {}
        }
    }
}

impl ToXml for Resource {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            let inner = self.resource_type();
            match self {
                Resource::Bundle(r) => r.write_xml(inner, w),
                Resource::MessageHeader(r) => r.write_xml(inner, w),
                Resource::Organization(r) => r.write_xml(inner, w),
                Resource::Patient(r) => r.write_xml(inner, w),
                Resource::Practitioner(r) => r.write_xml(inner, w),
                Resource::PractitionerRole(r) => r.write_xml(inner, w),
                Resource::Encounter(r) => r.write_xml(inner, w),
                Resource::Observation(r) => r.write_xml(inner, w),
                Resource::ClinicalImpression(r) => r.write_xml(inner, w),
                Resource::MedicationDispense(r) => r.write_xml(inner, w),
                Resource::Composition(r) => r.write_xml(inner, w),
            }
        })
    }
}

// ============================================================================
// Bundle
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BundleType {
    Message,
    Document,
}

impl BundleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BundleType::Message => "message",
            BundleType::Document => "document",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BundleEntry {
    pub full_url: String,
    pub resource: Resource,
}

impl BundleEntry {
    pub fn new(full_url: &FullUrl, resource: Resource) -> Self {
        Self {
            full_url: full_url.as_str().to_owned(),
            resource,
        }
    }
}

impl ToXml for BundleEntry {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.primitive("fullUrl", &self.full_url)?;
            w.element("resource", &self.resource)
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Bundle {
    pub id: String,
    pub meta: Meta,
    pub identifier: Option<Identifier>,
    pub type_: BundleType,
    pub entry: Vec<BundleEntry>,
}

impl ToXml for Bundle {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.primitive("id", &self.id)?;
            w.element("meta", &self.meta)?;
            w.opt_element("identifier", &self.identifier)?;
            w.primitive("type", self.type_.as_str())?;
            w.elements("entry", &self.entry)
        })
    }
}

impl Bundle {
    /// Every reference held by any resource in this bundle, nested bundles included.
    pub fn references(&self) -> Vec<&Reference> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a Reference>) {
        for entry in &self.entry {
            entry.resource.collect_references(out);
        }
    }

    /// Every `fullUrl` in this bundle, nested bundles included.
    pub fn full_urls(&self) -> HashSet<&str> {
        let mut out = HashSet::new();
        self.collect_full_urls(&mut out);
        out
    }

    fn collect_full_urls<'a>(&'a self, out: &mut HashSet<&'a str>) {
        for entry in &self.entry {
            out.insert(entry.full_url.as_str());
            if let Resource::Bundle(inner) = &entry.resource {
                inner.collect_full_urls(out);
            }
        }
    }

    /// In-message references that do not match any `fullUrl`.
    ///
    /// References built with [`Reference::external`] are not checked, whatever their scheme.
    pub fn unresolved_references(&self) -> Vec<&str> {
        let targets = self.full_urls();
        self.references()
            .into_iter()
            .filter(|r| r.is_internal())
            .map(|r| r.reference.as_str())
            .filter(|r| !targets.contains(r))
            .collect()
    }

    /// Renders this bundle as a namespaced XML document.
    pub fn to_xml_bytes(&self) -> FhirResult<Vec<u8>> {
        let mut w = XmlWriter::new();
        w.declaration()?;
        w.element("Bundle", &Namespaced::fhir(self))?;
        Ok(w.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{HumanName, Identifier};
    use gpupdate_uuid::{ResourceIdentity, Uuid};

    fn fresh_identity() -> ResourceIdentity {
        ResourceIdentity::from_uuid(Uuid::new_v4())
    }

    fn patient(id: &ResourceIdentity) -> Resource {
        Resource::Patient(Patient {
            id: id.id(),
            meta: Meta::new("2024-01-01T00:00:00.000Z", "profile"),
            identifier: vec![Identifier::new("https://fhir.nhs.uk/Id/nhs-number", "9000000009")],
            name: vec![HumanName {
                use_: Some("official".into()),
                family: Some("Smith".into()),
                ..Default::default()
            }],
            gender: None,
            birth_date: Some("1980-01-01".into()),
            address: Vec::new(),
        })
    }

    fn bundle_with(entries: Vec<BundleEntry>, type_: BundleType) -> Bundle {
        Bundle {
            id: fresh_identity().id(),
            meta: Meta::default(),
            identifier: None,
            type_,
            entry: entries,
        }
    }

    fn role(id: &ResourceIdentity, practitioner: &FullUrl, org: &FullUrl) -> Resource {
        Resource::PractitionerRole(PractitionerRole {
            id: id.id(),
            meta: Meta::default(),
            practitioner: Some(Reference::to(practitioner)),
            organization: Some(Reference::to(org)),
            code: Vec::new(),
        })
    }

    #[test]
    fn nested_full_urls_resolve_references() {
        let patient_id = fresh_identity();
        let role_id = fresh_identity();
        let doc_id = fresh_identity();

        let inner = bundle_with(
            vec![
                BundleEntry::new(&patient_id.full_url(), patient(&patient_id)),
                BundleEntry::new(
                    &role_id.full_url(),
                    role(&role_id, &patient_id.full_url(), &patient_id.full_url()),
                ),
            ],
            BundleType::Document,
        );
        let outer = bundle_with(
            vec![BundleEntry::new(&doc_id.full_url(), Resource::Bundle(Box::new(inner)))],
            BundleType::Message,
        );

        assert_eq!(outer.references().len(), 2);
        assert!(outer.unresolved_references().is_empty());
        assert_eq!(outer.full_urls().len(), 3);
    }

    #[test]
    fn dangling_reference_is_reported() {
        let role_id = fresh_identity();
        let missing = fresh_identity().full_url();
        let bundle = bundle_with(
            vec![BundleEntry::new(
                &role_id.full_url(),
                role(&role_id, &missing, &role_id.full_url()),
            )],
            BundleType::Document,
        );

        assert_eq!(bundle.unresolved_references(), vec![missing.as_str()]);
    }

    #[test]
    fn to_xml_bytes_renders_entries_in_order() {
        let first = fresh_identity();
        let second = fresh_identity();
        let bundle = bundle_with(
            vec![
                BundleEntry::new(&first.full_url(), patient(&first)),
                BundleEntry::new(&second.full_url(), patient(&second)),
            ],
            BundleType::Document,
        );

        let bytes = bundle.to_xml_bytes().unwrap();
        let xml = String::from_utf8(bytes).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));

        let doc = roxmltree::Document::parse(&xml).unwrap();
        let root = doc.root_element();
        assert_eq!(root.tag_name().name(), "Bundle");
        assert_eq!(root.tag_name().namespace(), Some(crate::FHIR_NS));

        let full_urls: Vec<_> = root
            .children()
            .filter(|n| n.has_tag_name("entry"))
            .filter_map(|e| e.children().find(|c| c.has_tag_name("fullUrl")))
            .filter_map(|f| f.attribute("value"))
            .collect();
        assert_eq!(full_urls, vec![first.full_url().as_str(), second.full_url().as_str()]);

        let type_value = root
            .children()
            .find(|n| n.has_tag_name("type"))
            .and_then(|n| n.attribute("value"));
        assert_eq!(type_value, Some("document"));
    }
}
