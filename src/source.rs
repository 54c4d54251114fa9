//! CitiEnGov source documents
//!
//! A CitiEnGov export is a flat list of `gml:featureMember` fragments. Each
//! fragment carries part of one building's data inside a
//! `CitiEnGov_01_1:GML_BUILDINGS_CEG` feature, and all fragments with the same
//! `UUID` belong to the same building.
//!
//! # Example
//!
//! ```no_run
//! use citiengov_gml::source::{SourceDocument, SourceMode};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let document = SourceDocument::load("buildings.gml", SourceMode::File)?;
//! for building in document.into_buildings()? {
//!     println!("{}: {:?}", building.identifier(), building.find_first("NAME"));
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use crate::qname::{NamespaceTable, QName};
use crate::tree::{Element, parse_document};
use indexmap::{IndexMap, IndexSet};
use log::{debug, info};
use std::io::Read;
use std::rc::Rc;
use std::str::FromStr;

/// Namespace of the CitiEnGov feature type
pub const CITIENGOV_NAMESPACE: &str = "http://maps.dedagroup.it/energy/geoserver/CitiEnGov_01_1";

/// GML 2 namespace used by the source document
pub const SOURCE_GML_NAMESPACE: &str = "http://www.opengis.net/gml";

const FEATURE_MEMBER: &str = "gml:featureMember";
const FEATURE_TYPE: &str = "CitiEnGov_01_1:GML_BUILDINGS_CEG";
const IDENTIFIER: &str = "CitiEnGov_01_1:UUID";
const COORDINATES_PATH: &str =
    "CitiEnGov_01_1:GEOMETRY2D/gml:Polygon/gml:outerBoundaryIs/gml:LinearRing/gml:coordinates";

/// Prefix table of the source schema
pub fn source_namespaces() -> NamespaceTable {
    NamespaceTable::new()
        .with_prefix("CitiEnGov_01_1", CITIENGOV_NAMESPACE)
        .with_prefix("gml", SOURCE_GML_NAMESPACE)
}

/// Where the source document comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// Local file path
    File,
    /// HTTP(S) URL
    Network,
}

impl FromStr for SourceMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(SourceMode::File),
            "url" | "network" => Ok(SourceMode::Network),
            _ => Err(Error::InvalidMode(s.to_string())),
        }
    }
}

/// Resolved names of the fixed source paths
#[derive(Debug)]
struct SourceSchema {
    feature_member: QName,
    feature: QName,
    identifier_path: Vec<QName>,
    coordinates_path: Vec<QName>,
    attribute_namespace: String,
}

impl SourceSchema {
    fn new(namespaces: &NamespaceTable) -> Result<Self> {
        let feature = namespaces.resolve(FEATURE_TYPE)?;
        let identifier = namespaces.resolve(IDENTIFIER)?;
        let attribute_namespace = identifier.namespace.clone().unwrap_or_default();

        let mut coordinates_path = vec![feature.clone()];
        coordinates_path.extend(namespaces.resolve_path(COORDINATES_PATH)?);

        Ok(Self {
            feature_member: namespaces.resolve(FEATURE_MEMBER)?,
            identifier_path: vec![feature.clone(), identifier],
            feature,
            coordinates_path,
            attribute_namespace,
        })
    }

    fn attribute_path(&self, attribute: &str) -> [QName; 2] {
        [
            self.feature.clone(),
            QName::new(self.attribute_namespace.as_str(), attribute),
        ]
    }

    fn identifier_of<'a>(&self, fragment: &'a Element) -> Option<&'a str> {
        fragment.find(&self.identifier_path).and_then(Element::value)
    }
}

/// A parsed CitiEnGov document
///
/// Holds the raw feature-member fragments. Buildings are produced by
/// consuming the document with [`SourceDocument::into_buildings`], so a
/// document can only be walked once.
#[derive(Debug)]
pub struct SourceDocument {
    fragments: Vec<Element>,
    schema: Rc<SourceSchema>,
}

impl SourceDocument {
    /// Load a document from a file path or a URL
    pub fn load(location: &str, mode: SourceMode) -> Result<Self> {
        let bytes = match mode {
            SourceMode::File => {
                info!("Opening file: {}", location);
                std::fs::read(location).map_err(|e| Error::source_unreadable(location, e))?
            }
            SourceMode::Network => {
                info!("Opening URL: {}", location);
                fetch(location)?
            }
        };
        Self::from_bytes(&bytes)
    }

    /// Read a whole document from any reader
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| Error::source_unreadable("<reader>", e))?;
        Self::from_bytes(&bytes)
    }

    /// Parse a document held in memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let schema = SourceSchema::new(&source_namespaces())?;
        let root = parse_document(bytes)?;
        let fragments: Vec<Element> = root
            .children
            .into_iter()
            .filter(|child| child.name == schema.feature_member)
            .collect();
        debug!("Found {} feature members", fragments.len());

        Ok(Self {
            fragments,
            schema: Rc::new(schema),
        })
    }

    /// All top-level feature members in document order
    pub fn feature_members(&self) -> &[Element] {
        &self.fragments
    }

    /// Distinct building identifiers in order of first appearance
    ///
    /// Fails with [`Error::MissingIdentifier`] if any fragment has no `UUID`.
    pub fn building_identifiers(&self) -> Result<IndexSet<String>> {
        self.fragments
            .iter()
            .enumerate()
            .map(|(index, fragment)| {
                self.schema
                    .identifier_of(fragment)
                    .map(str::to_string)
                    .ok_or(Error::MissingIdentifier { index })
            })
            .collect()
    }

    /// Gather every fragment whose identifier equals `identifier`
    ///
    /// Returns `None` if no fragment carries that identifier.
    pub fn building_for(&self, identifier: &str) -> Option<BuildingRecord> {
        let fragments: Vec<Element> = self
            .fragments
            .iter()
            .filter(|f| self.schema.identifier_of(f) == Some(identifier))
            .cloned()
            .collect();

        if fragments.is_empty() {
            return None;
        }
        Some(BuildingRecord {
            identifier: identifier.to_string(),
            fragments,
            schema: Rc::clone(&self.schema),
        })
    }

    /// Consume the document into its sequence of buildings
    ///
    /// Identifiers are checked up front, so a fragment without `UUID` fails
    /// here rather than halfway through a translation.
    pub fn into_buildings(self) -> Result<Buildings> {
        let mut groups: IndexMap<String, Vec<Element>> = IndexMap::new();
        for (index, fragment) in self.fragments.into_iter().enumerate() {
            let identifier = self
                .schema
                .identifier_of(&fragment)
                .ok_or(Error::MissingIdentifier { index })?
                .to_string();
            groups.entry(identifier).or_default().push(fragment);
        }
        debug!("Grouped feature members into {} buildings", groups.len());

        Ok(Buildings {
            groups: groups.into_iter(),
            schema: self.schema,
        })
    }
}

#[cfg(feature = "network")]
fn fetch(url: &str) -> Result<Vec<u8>> {
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| Error::source_unreadable(url, e))?;
    let bytes = response
        .bytes()
        .map_err(|e| Error::source_unreadable(url, e))?;
    Ok(bytes.to_vec())
}

#[cfg(not(feature = "network"))]
fn fetch(url: &str) -> Result<Vec<u8>> {
    Err(Error::source_unreadable(
        url,
        "network support is disabled (build with the `network` feature)",
    ))
}

/// Single-pass sequence of buildings taken from a [`SourceDocument`]
#[derive(Debug)]
pub struct Buildings {
    groups: indexmap::map::IntoIter<String, Vec<Element>>,
    schema: Rc<SourceSchema>,
}

impl Iterator for Buildings {
    type Item = BuildingRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.groups
            .next()
            .map(|(identifier, fragments)| BuildingRecord {
                identifier,
                fragments,
                schema: Rc::clone(&self.schema),
            })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.groups.size_hint()
    }
}

impl ExactSizeIterator for Buildings {}

/// All fragments of one building
///
/// Attributes are looked up at `GML_BUILDINGS_CEG/<attribute>` in each
/// fragment. [`find_first`](Self::find_first) and
/// [`find_all`](Self::find_all) are the only ways to read them.
#[derive(Debug, Clone)]
pub struct BuildingRecord {
    identifier: String,
    fragments: Vec<Element>,
    schema: Rc<SourceSchema>,
}

impl BuildingRecord {
    /// The shared `UUID` of the fragments
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The fragments in document order; never empty
    pub fn fragments(&self) -> &[Element] {
        &self.fragments
    }

    /// First non-empty value of `attribute` across the fragments
    pub fn find_first(&self, attribute: &str) -> Option<&str> {
        let path = self.schema.attribute_path(attribute);
        self.fragments
            .iter()
            .find_map(|f| f.find(&path).and_then(Element::value))
    }

    /// Every non-empty value of `attribute`, in fragment order
    ///
    /// Fragments without a value are skipped, so the result of two calls for
    /// different attributes only line up when each fragment has both.
    pub fn find_all(&self, attribute: &str) -> Vec<&str> {
        let path = self.schema.attribute_path(attribute);
        self.fragments
            .iter()
            .filter_map(|f| f.find(&path).and_then(Element::value))
            .collect()
    }

    /// The outer-boundary `gml:coordinates` element of the footprint
    pub fn footprint_coordinates(&self) -> Option<&Element> {
        self.fragments
            .iter()
            .find_map(|f| f.find(&self.schema.coordinates_path))
    }
}
