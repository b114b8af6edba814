//! STU3 general-purpose datatypes used by the message and document resources.
//!
//! Wire types hold already-formatted primitive strings (dates, instants, codes). Formatting
//! decisions are made once, by whoever builds the value, and the serializer writes what it is
//! given.

use crate::xml::{ToXml, XmlWriter};
use crate::FhirResult;
use gpupdate_uuid::FullUrl;

// ============================================================================
// Datatypes
// ============================================================================

/// Resource metadata: last-updated instant and declared profile(s).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Meta {
    pub last_updated: Option<String>,
    pub profile: Vec<String>,
}

impl Meta {
    pub fn new(last_updated: &str, profile: &str) -> Self {
        Self {
            last_updated: Some(last_updated.to_owned()),
            profile: vec![profile.to_owned()],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Identifier {
    pub system: Option<String>,
    pub value: Option<String>,
}

impl Identifier {
    pub fn new(system: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            value: Some(value.into()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Coding {
    pub system: Option<String>,
    pub code: Option<String>,
    pub display: Option<String>,
}

impl Coding {
    pub fn new(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            code: Some(code.into()),
            display: None,
        }
    }

    pub fn with_display(mut self, display: Option<String>) -> Self {
        self.display = display;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CodeableConcept {
    pub coding: Vec<Coding>,
    pub text: Option<String>,
}

impl CodeableConcept {
    pub fn from_coding(coding: Coding) -> Self {
        Self {
            coding: vec![coding],
            text: None,
        }
    }

    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            coding: Vec::new(),
            text: Some(text.into()),
        }
    }

    pub fn with_text(mut self, text: Option<String>) -> Self {
        self.text = text;
        self
    }
}

/// A pointer from one resource to another.
///
/// Inside a message every reference is a `urn:uuid:` full URL of a sibling entry; the only
/// exception is a caller-supplied external URL (see [`Reference::external`]). Which of the two a
/// reference is comes from its constructor, never from the shape of the string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reference {
    pub reference: String,
    pub display: Option<String>,
    external: bool,
}

impl Reference {
    /// References the entry whose `fullUrl` is `target`.
    pub fn to(target: &FullUrl) -> Self {
        Self {
            reference: target.as_str().to_owned(),
            display: None,
            external: false,
        }
    }

    /// References something outside the message, such as a published definition URL.
    ///
    /// External references are never resolved against the message's full URLs, whatever
    /// scheme the caller used.
    pub fn external(url: impl Into<String>) -> Self {
        Self {
            reference: url.into(),
            display: None,
            external: true,
        }
    }

    /// Returns `true` when this reference addresses an in-message entry.
    pub fn is_internal(&self) -> bool {
        !self.external
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Period {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HumanName {
    pub use_: Option<String>,
    pub family: Option<String>,
    pub given: Vec<String>,
    pub prefix: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Address {
    pub line: Vec<String>,
    pub postal_code: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Quantity {
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub system: Option<String>,
    pub code: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ratio {
    pub numerator: Option<Quantity>,
    pub denominator: Option<Quantity>,
}

/// Human-readable narrative. `div` is plain text; it is escaped and wrapped in an XHTML `div`
/// when rendered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Narrative {
    pub status: String,
    pub div: String,
}

impl Narrative {
    pub fn generated(text: impl Into<String>) -> Self {
        Self {
            status: "generated".to_owned(),
            div: text.into(),
        }
    }
}

/// An extension with either a value or nested child extensions.
#[derive(Clone, Debug, PartialEq)]
pub struct Extension {
    pub url: String,
    pub extension: Vec<Extension>,
    pub value: Option<ExtensionValue>,
}

impl Extension {
    pub fn with_value(url: impl Into<String>, value: ExtensionValue) -> Self {
        Self {
            url: url.into(),
            extension: Vec::new(),
            value: Some(value),
        }
    }

    pub fn nested(url: impl Into<String>, children: Vec<Extension>) -> Self {
        Self {
            url: url.into(),
            extension: children,
            value: None,
        }
    }
}

/// The `value[x]` choice of an [`Extension`].
#[derive(Clone, Debug, PartialEq)]
pub enum ExtensionValue {
    Boolean(bool),
    String(String),
    Coding(Coding),
    Reference(Reference),
    CodeableConcept(CodeableConcept),
}

impl ExtensionValue {
    fn element_name(&self) -> &'static str {
        match self {
            ExtensionValue::Boolean(_) => "valueBoolean",
            ExtensionValue::String(_) => "valueString",
            ExtensionValue::Coding(_) => "valueCoding",
            ExtensionValue::Reference(_) => "valueReference",
            ExtensionValue::CodeableConcept(_) => "valueCodeableConcept",
        }
    }
}

// ============================================================================
// XML rendering
// ============================================================================

impl ToXml for Meta {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.opt_primitive("lastUpdated", self.last_updated.as_deref())?;
            w.primitives("profile", &self.profile)
        })
    }
}

impl ToXml for Identifier {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.opt_primitive("system", self.system.as_deref())?;
            w.opt_primitive("value", self.value.as_deref())
        })
    }
}

impl ToXml for Coding {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.opt_primitive("system", self.system.as_deref())?;
            w.opt_primitive("code", self.code.as_deref())?;
            w.opt_primitive("display", self.display.as_deref())
        })
    }
}

impl ToXml for CodeableConcept {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.elements("coding", &self.coding)?;
            w.opt_primitive("text", self.text.as_deref())
        })
    }
}

impl ToXml for Reference {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.primitive("reference", &self.reference)?;
            w.opt_primitive("display", self.display.as_deref())
        })
    }
}

impl ToXml for Period {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.opt_primitive("start", self.start.as_deref())?;
            w.opt_primitive("end", self.end.as_deref())
        })
    }
}

impl ToXml for HumanName {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.opt_primitive("use", self.use_.as_deref())?;
            w.opt_primitive("family", self.family.as_deref())?;
            w.primitives("given", &self.given)?;
            w.primitives("prefix", &self.prefix)
        })
    }
}

impl ToXml for Address {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.primitives("line", &self.line)?;
            w.opt_primitive("postalCode", self.postal_code.as_deref())
        })
    }
}

impl ToXml for Quantity {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.decimal("value", self.value)?;
            w.opt_primitive("unit", self.unit.as_deref())?;
            w.opt_primitive("system", self.system.as_deref())?;
            w.opt_primitive("code", self.code.as_deref())
        })
    }
}

impl ToXml for Ratio {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.opt_element("numerator", &self.numerator)?;
            w.opt_element("denominator", &self.denominator)
        })
    }
}

impl ToXml for Narrative {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex(name, |w| {
            w.primitive("status", &self.status)?;
            w.xhtml_div(&self.div)
        })
    }
}

impl ToXml for Extension {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.complex_with_attrs(name, &[("url", self.url.as_str())], |w| {
            w.elements("extension", &self.extension)?;
            match &self.value {
                Some(value) => value.write_xml(value.element_name(), w),
                None => Ok(()),
            }
        })
    }
}

impl ToXml for ExtensionValue {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        match self {
            ExtensionValue::Boolean(b) => w.boolean(name, *b),
            ExtensionValue::String(s) => w.primitive(name, s),
            ExtensionValue::Coding(c) => c.write_xml(name, w),
            ExtensionValue::Reference(r) => r.write_xml(name, w),
            ExtensionValue::CodeableConcept(cc) => cc.write_xml(name, w),
        }
    }
}

impl Extension {
    pub(crate) fn collect_references<'a>(&'a self, out: &mut Vec<&'a Reference>) {
        if let Some(ExtensionValue::Reference(r)) = &self.value {
            out.push(r);
        }
        for child in &self.extension {
            child.collect_references(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render<T: ToXml>(value: &T, name: &str) -> String {
        let mut w = XmlWriter::new();
        w.element(name, value).unwrap();
        String::from_utf8(w.into_bytes()).unwrap()
    }

    #[test]
    fn nested_extension_renders_children_before_value() {
        let ext = Extension::nested(
            "https://example.org/handling",
            vec![
                Extension::with_value("BusAckRequested", ExtensionValue::Boolean(true)),
                Extension::with_value("LocalExtension", ExtensionValue::String("None".into())),
            ],
        );
        let xml = render(&ext, "extension");
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let root = doc.root_element();

        assert_eq!(root.attribute("url"), Some("https://example.org/handling"));
        let children: Vec<_> = root.children().filter(|n| n.is_element()).collect();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].attribute("url"), Some("BusAckRequested"));
        let flag = children[0].first_element_child().unwrap();
        assert_eq!(flag.tag_name().name(), "valueBoolean");
        assert_eq!(flag.attribute("value"), Some("true"));
    }

    #[test]
    fn narrative_div_is_xhtml_and_escaped() {
        let xml = render(&Narrative::generated("BP <140/90> & stable"), "text");
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let div = doc.descendants().find(|n| n.has_tag_name("div")).unwrap();

        assert_eq!(div.tag_name().namespace(), Some(crate::xml::XHTML_NS));
        assert_eq!(div.text(), Some("BP <140/90> & stable"));
    }

    #[test]
    fn extension_references_are_collected_recursively() {
        let ext = Extension::nested(
            "outer",
            vec![Extension::with_value(
                "MessageDefinition",
                ExtensionValue::Reference(Reference::external("https://example.org/def")),
            )],
        );
        let mut refs = Vec::new();
        ext.collect_references(&mut refs);

        assert_eq!(refs.len(), 1);
        assert!(!refs[0].is_internal());
    }

    #[test]
    fn external_reference_stays_external_whatever_its_scheme() {
        let external = Reference::external("urn:uuid:11111111-2222-4333-8444-555555555555");
        assert!(!external.is_internal());

        let identity = gpupdate_uuid::ResourceIdentity::from_uuid(gpupdate_uuid::Uuid::from_u128(9));
        assert!(Reference::to(&identity.full_url()).is_internal());
    }
}
