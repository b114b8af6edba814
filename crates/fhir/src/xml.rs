//! XML rendering for the STU3 wire model.
//!
//! FHIR XML carries primitive values as a `value` attribute rather than as text content:
//!
//! ```xml
//! <birthDate value="1980-01-01"/>
//! ```
//!
//! Complex types become nested elements, repeated fields become repeated sibling elements, and
//! absent optional fields are omitted entirely. Element order is the order in which each
//! [`ToXml`] implementation writes its children, which in turn mirrors the order fields were
//! appended by the caller.

use crate::{FhirError, FhirResult};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

/// Namespace of every FHIR XML element.
pub const FHIR_NS: &str = "http://hl7.org/fhir";

/// Namespace of narrative `div` elements.
pub const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

/// Returns `true` when `c` may appear in an XML 1.0 document.
///
/// Excludes the C0 controls other than tab, line feed and carriage return, and the
/// non-characters U+FFFE and U+FFFF.
pub fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

fn check_text(element: &str, text: &str) -> FhirResult<()> {
    match text.chars().find(|c| !is_xml_char(*c)) {
        Some(c) => Err(FhirError::InvalidCharacter {
            element: element.to_owned(),
            code_point: c as u32,
        }),
        None => Ok(()),
    }
}

/// A value that can render itself as a named XML element.
pub trait ToXml {
    /// Writes `self` as an element called `name`.
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()>;
}

/// Thin wrapper around [`quick_xml::Writer`] with FHIR-shaped helpers.
pub struct XmlWriter {
    inner: Writer<Cursor<Vec<u8>>>,
    pending_xmlns: Option<&'static str>,
}

impl XmlWriter {
    /// Creates a writer indenting nested elements by two spaces.
    pub fn new() -> Self {
        Self {
            inner: Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2),
            pending_xmlns: None,
        }
    }

    /// Writes the `<?xml version="1.0" encoding="UTF-8"?>` declaration.
    pub fn declaration(&mut self) -> FhirResult<()> {
        self.inner
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(())
    }

    /// Attaches an `xmlns` attribute to the next element started by this writer.
    pub fn set_namespace(&mut self, xmlns: &'static str) {
        self.pending_xmlns = Some(xmlns);
    }

    fn start_tag<'a>(&mut self, name: &'a str, attrs: &[(&'a str, &'a str)]) -> BytesStart<'a> {
        let mut start = BytesStart::new(name);
        if let Some(ns) = self.pending_xmlns.take() {
            start.push_attribute(("xmlns", ns));
        }
        for attr in attrs {
            start.push_attribute(*attr);
        }
        start
    }

    /// Writes `<name value="..."/>`.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::InvalidCharacter`] if `value` holds a character XML cannot carry.
    pub fn primitive(&mut self, name: &str, value: &str) -> FhirResult<()> {
        check_text(name, value)?;
        let elem = self.start_tag(name, &[("value", value)]);
        self.inner.write_event(Event::Empty(elem))?;
        Ok(())
    }

    /// Writes a primitive only when a value is present.
    pub fn opt_primitive(&mut self, name: &str, value: Option<&str>) -> FhirResult<()> {
        match value {
            Some(v) => self.primitive(name, v),
            None => Ok(()),
        }
    }

    /// Writes one primitive element per value, in order.
    pub fn primitives(&mut self, name: &str, values: &[String]) -> FhirResult<()> {
        for value in values {
            self.primitive(name, value)?;
        }
        Ok(())
    }

    pub fn boolean(&mut self, name: &str, value: bool) -> FhirResult<()> {
        self.primitive(name, if value { "true" } else { "false" })
    }

    pub fn decimal(&mut self, name: &str, value: Option<f64>) -> FhirResult<()> {
        match value {
            Some(v) => self.primitive(name, &format_decimal(v)),
            None => Ok(()),
        }
    }

    pub fn integer(&mut self, name: &str, value: Option<u32>) -> FhirResult<()> {
        match value {
            Some(v) => self.primitive(name, &v.to_string()),
            None => Ok(()),
        }
    }

    /// Writes `<name>...</name>` with children produced by `body`.
    pub fn complex<F>(&mut self, name: &str, body: F) -> FhirResult<()>
    where
        F: FnOnce(&mut Self) -> FhirResult<()>,
    {
        self.complex_with_attrs(name, &[], body)
    }

    /// Like [`XmlWriter::complex`], with extra attributes on the start tag.
    pub fn complex_with_attrs<F>(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
        body: F,
    ) -> FhirResult<()>
    where
        F: FnOnce(&mut Self) -> FhirResult<()>,
    {
        let start = self.start_tag(name, attrs);
        self.inner.write_event(Event::Start(start))?;
        body(self)?;
        self.inner.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    pub fn element<T: ToXml>(&mut self, name: &str, value: &T) -> FhirResult<()> {
        value.write_xml(name, self)
    }

    pub fn opt_element<T: ToXml>(&mut self, name: &str, value: &Option<T>) -> FhirResult<()> {
        match value {
            Some(v) => v.write_xml(name, self),
            None => Ok(()),
        }
    }

    pub fn elements<T: ToXml>(&mut self, name: &str, values: &[T]) -> FhirResult<()> {
        for value in values {
            value.write_xml(name, self)?;
        }
        Ok(())
    }

    /// Writes an XHTML narrative `div` holding `text` as escaped character data.
    pub fn xhtml_div(&mut self, text: &str) -> FhirResult<()> {
        check_text("div", text)?;
        let mut start = BytesStart::new("div");
        start.push_attribute(("xmlns", XHTML_NS));
        self.inner.write_event(Event::Start(start))?;
        self.inner.write_event(Event::Text(BytesText::new(text)))?;
        self.inner.write_event(Event::End(BytesEnd::new("div")))?;
        Ok(())
    }

    /// Returns the bytes written so far.
    pub fn into_bytes(self) -> Vec<u8> {
        self.inner.into_inner().into_inner()
    }
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// A value rendered as a root element carrying an explicit `xmlns` attribute.
///
/// The wrapper holds the namespace next to the inner value; the inner value's own rendering is
/// unaware of it.
pub struct Namespaced<'a, T> {
    pub xmlns: &'static str,
    pub inner: &'a T,
}

impl<'a, T> Namespaced<'a, T> {
    /// Wraps `inner` in the FHIR namespace.
    pub fn fhir(inner: &'a T) -> Self {
        Self {
            xmlns: FHIR_NS,
            inner,
        }
    }
}

impl<T: ToXml> ToXml for Namespaced<'_, T> {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
        w.set_namespace(self.xmlns);
        self.inner.write_xml(name, w)
    }
}

/// Renders a decimal without a trailing `.0` for whole numbers.
pub fn format_decimal(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair {
        a: Option<String>,
        b: Vec<String>,
    }

    impl ToXml for Pair {
        fn write_xml(&self, name: &str, w: &mut XmlWriter) -> FhirResult<()> {
            w.complex(name, |w| {
                w.opt_primitive("a", self.a.as_deref())?;
                w.primitives("b", &self.b)
            })
        }
    }

    fn render<T: ToXml>(value: &T, name: &str) -> String {
        let mut w = XmlWriter::new();
        w.element(name, value).unwrap();
        String::from_utf8(w.into_bytes()).unwrap()
    }

    #[test]
    fn primitives_render_as_value_attributes() {
        let xml = render(
            &Pair {
                a: Some("x".into()),
                b: vec!["1".into(), "2".into()],
            },
            "pair",
        );
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let values: Vec<_> = doc
            .root_element()
            .children()
            .filter(|n| n.is_element())
            .map(|n| (n.tag_name().name(), n.attribute("value").unwrap()))
            .collect();

        assert_eq!(values, vec![("a", "x"), ("b", "1"), ("b", "2")]);
    }

    #[test]
    fn absent_optionals_are_omitted() {
        let xml = render(&Pair { a: None, b: vec![] }, "pair");
        assert!(!xml.contains("<a"));
        assert!(!xml.contains("<b"));
    }

    #[test]
    fn namespace_wrapper_marks_only_the_root() {
        let pair = Pair {
            a: Some("x".into()),
            b: vec![],
        };
        let xml = render(&Namespaced::fhir(&pair), "Bundle");
        let doc = roxmltree::Document::parse(&xml).unwrap();

        assert_eq!(doc.root_element().tag_name().namespace(), Some(FHIR_NS));
        assert_eq!(xml.matches("xmlns=").count(), 1);
    }

    #[test]
    fn attribute_values_are_escaped() {
        let xml = render(
            &Pair {
                a: Some("A&B <\"c\">".into()),
                b: vec![],
            },
            "pair",
        );
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let a = doc.descendants().find(|n| n.has_tag_name("a")).unwrap();

        assert_eq!(a.attribute("value"), Some("A&B <\"c\">"));
    }

    #[test]
    fn decimals_drop_trailing_zero_fraction() {
        assert_eq!(format_decimal(28.0), "28");
        assert_eq!(format_decimal(37.5), "37.5");
        assert_eq!(format_decimal(-2.0), "-2");
    }

    #[test]
    fn control_characters_fail_with_typed_error() {
        let mut w = XmlWriter::new();
        let err = w.primitive("family", "Ja\u{0002}ne").unwrap_err();
        assert!(matches!(
            err,
            FhirError::InvalidCharacter { ref element, code_point: 2 } if element == "family"
        ));

        let err = XmlWriter::new().xhtml_div("Routine\u{0001}review").unwrap_err();
        assert!(matches!(err, FhirError::InvalidCharacter { code_point: 1, .. }));
    }

    #[test]
    fn whitespace_controls_are_xml_characters() {
        assert!(['\t', '\n', '\r', ' ', '\u{FFFD}', '\u{1F600}'].iter().all(|c| is_xml_char(*c)));
        assert!(!['\u{0}', '\u{1F}', '\u{FFFE}', '\u{FFFF}'].iter().any(|c| is_xml_char(*c)));
    }
}
