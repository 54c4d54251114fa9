//! Target documents and the builders that fill them
//!
//! A builder owns one output tree and the code lists it needs. It is fed
//! every [`BuildingRecord`] once through
//! [`TargetDocumentBuilder::translate`] and then serialized. Each building
//! element is assembled completely before it is attached, so a failed
//! building never leaves a partial member in the tree.

pub mod citygml;
pub mod inspire;

use crate::error::{Error, Result};
use crate::qname::{NamespaceTable, QName};
use crate::source::{BuildingRecord, SOURCE_GML_NAMESPACE};
use crate::tree::Element;
use crate::writer::write_document;
use log::{debug, info};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

pub use citygml::{CityGmlBuilder, CityGmlCodeLists};
pub use inspire::{InspireBuilder, InspireCodeLists};

/// Output schema selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standard {
    /// INSPIRE Buildings 2D
    Inspire,
    /// CityGML 2.0 with the Energy ADE
    CityGml,
}

impl Standard {
    /// Display name as used on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Standard::Inspire => "INSPIRE",
            Standard::CityGml => "CityGML",
        }
    }
}

impl fmt::Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Standard {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "INSPIRE" => Ok(Standard::Inspire),
            "CityGML" => Ok(Standard::CityGml),
            other => Err(format!(
                "Standard can be either 'INSPIRE' or 'CityGML', not '{}'",
                other
            )),
        }
    }
}

/// An output tree with its namespace table
#[derive(Debug, Clone)]
pub struct TargetDocument {
    namespaces: NamespaceTable,
    root: Element,
    member: QName,
    member_count_attribute: Option<QName>,
}

impl TargetDocument {
    /// Create a document whose root and member element names are given as
    /// `prefix:local` tokens
    pub fn new(namespaces: NamespaceTable, root: &str, member: &str) -> Result<Self> {
        let root = Element::new(namespaces.resolve(root)?);
        let member = namespaces.resolve(member)?;
        Ok(Self {
            namespaces,
            root,
            member,
            member_count_attribute: None,
        })
    }

    /// Keep a root attribute in sync with the number of members
    pub fn with_member_count_attribute(mut self, name: QName) -> Self {
        self.root.set_attribute(name.clone(), self.member_count().to_string());
        self.member_count_attribute = Some(name);
        self
    }

    /// Resolve a `prefix:local` token against the document namespaces
    pub fn qname(&self, token: &str) -> Result<QName> {
        self.namespaces.resolve(token)
    }

    /// Create an empty element from a `prefix:local` token
    pub fn element(&self, token: &str) -> Result<Element> {
        Ok(Element::new(self.qname(token)?))
    }

    /// Create a text-only element from a `prefix:local` token
    pub fn text_element(&self, token: &str, text: impl Into<String>) -> Result<Element> {
        Ok(self.element(token)?.with_text(text))
    }

    /// Set an attribute on the root element
    pub fn set_root_attribute(&mut self, name: QName, value: impl Into<String>) {
        self.root.set_attribute(name, value);
    }

    /// Wrap a building in a member element and append it to the root
    pub fn push_member(&mut self, building: Element) {
        let member = Element::new(self.member.clone()).with_child(building);
        self.root.push(member);
        if let Some(name) = self.member_count_attribute.clone() {
            let count = self.member_count().to_string();
            self.root.set_attribute(name, count);
        }
    }

    /// Number of members appended so far
    pub fn member_count(&self) -> usize {
        self.root.children_named(&self.member).count()
    }

    /// The root element
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// The namespace table
    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    /// Serialize the document
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        write_document(&self.root, &self.namespaces, writer)
    }
}

/// Common behaviour of the INSPIRE and CityGML builders
pub trait TargetDocumentBuilder {
    /// Output schema produced by this builder
    fn standard(&self) -> Standard;

    /// The document being built
    fn document(&self) -> &TargetDocument;

    /// Mutable access to the document being built
    fn document_mut(&mut self) -> &mut TargetDocument;

    /// Map one source building to a target building element
    fn build_building(&self, building: &BuildingRecord) -> Result<Element>;

    /// Append one member per building
    ///
    /// The first failing building aborts the run. Calling this again
    /// appends further members. Returns the number of buildings translated.
    fn translate<I>(&mut self, buildings: I) -> Result<usize>
    where
        I: IntoIterator<Item = BuildingRecord>,
        Self: Sized,
    {
        info!("Translating CitiEnGov to {}.", self.standard());
        let mut count = 0;
        for building in buildings {
            let element = self.build_building(&building)?;
            debug!("Translated building {}", building.identifier());
            self.document_mut().push_member(element);
            count += 1;
        }
        Ok(count)
    }

    /// Serialize the document to any writer
    fn write_to<W: Write>(&self, writer: W) -> Result<()>
    where
        Self: Sized,
    {
        self.document().write_to(writer)
    }

    /// Serialize the document to a file, replacing it if it exists
    fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()>
    where
        Self: Sized,
    {
        let path = path.as_ref();
        info!("Writing {} gml to: {}", self.standard(), path.display());
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush().map_err(Error::Io)
    }
}

/// `{year}-01-01T00:00:00`
pub(crate) fn year_timestamp(year: &str) -> String {
    format!("{}-01-01T00:00:00", year)
}

/// `{year}-01-01`
pub(crate) fn year_date(year: &str) -> String {
    format!("{}-01-01", year)
}

/// Read an attribute that another present attribute depends on
pub(crate) fn require<'a>(
    building: &'a BuildingRecord,
    attribute: &str,
    trigger: &str,
) -> Result<&'a str> {
    building
        .find_first(attribute)
        .ok_or_else(|| Error::missing_dependent(building.identifier(), attribute, trigger))
}

/// Read an attribute every target building needs
pub(crate) fn mandatory<'a>(building: &'a BuildingRecord, attribute: &str) -> Result<&'a str> {
    building
        .find_first(attribute)
        .ok_or_else(|| Error::missing_mandatory(building.identifier(), attribute))
}

/// Copy the source footprint coordinates, text and attributes unchanged
///
/// Attributes in the source GML namespace move to the target's `gml`
/// namespace; all other names are kept as they are.
pub(crate) fn copy_coordinates(
    document: &TargetDocument,
    building: &BuildingRecord,
) -> Result<Element> {
    let source = building
        .footprint_coordinates()
        .ok_or_else(|| Error::missing_mandatory(building.identifier(), "GEOMETRY2D"))?;
    let mut coordinates = document.element("gml:coordinates")?;
    let target_gml = coordinates.name.namespace.clone();
    coordinates.attributes = source
        .attributes
        .iter()
        .map(|(name, value)| {
            let name = match name.namespace.as_deref() {
                Some(SOURCE_GML_NAMESPACE) => QName {
                    namespace: target_gml.clone(),
                    local: name.local.clone(),
                },
                _ => name.clone(),
            };
            (name, value.clone())
        })
        .collect();
    coordinates.text = source.text.clone();
    Ok(coordinates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> TargetDocument {
        let ns = NamespaceTable::new().with_prefix("core", "urn:core");
        TargetDocument::new(ns, "core:CityModel", "core:cityObjectMember").unwrap()
    }

    #[test]
    fn test_standard_from_str() {
        assert_eq!("INSPIRE".parse::<Standard>().unwrap(), Standard::Inspire);
        assert_eq!("CityGML".parse::<Standard>().unwrap(), Standard::CityGml);
        assert!("citygml".parse::<Standard>().is_err());
        assert_eq!(Standard::CityGml.to_string(), "CityGML");
    }

    #[test]
    fn test_member_count_attribute_follows_members() {
        let mut doc = document().with_member_count_attribute(QName::local("numberReturned"));
        assert_eq!(doc.root().attribute(&QName::local("numberReturned")), Some("0"));

        let building = doc.element("core:Thing").unwrap();
        doc.push_member(building.clone());
        doc.push_member(building);
        assert_eq!(doc.member_count(), 2);
        assert_eq!(doc.root().attribute(&QName::local("numberReturned")), Some("2"));
    }

    #[test]
    fn test_unknown_prefix_in_element_token() {
        assert!(matches!(
            document().element("bldg:Building"),
            Err(Error::UnknownPrefix { .. })
        ));
    }

    #[test]
    fn test_empty_document_writes_empty_collection() {
        let mut out = Vec::new();
        document().write_to(&mut out).unwrap();
        let xml = String::from_utf8(out).unwrap();
        assert!(xml.contains(r#"<core:CityModel xmlns:core="urn:core"/>"#));
    }

    #[test]
    fn test_year_formats() {
        assert_eq!(year_timestamp("1975"), "1975-01-01T00:00:00");
        assert_eq!(year_date("1975"), "1975-01-01");
    }
}
