//! Shared fixtures for integration tests
//!
//! Source documents are assembled from feature-member fragments so each test
//! states only the attributes it cares about.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use citiengov_gml::tree::parse_document;
use citiengov_gml::{Element, SourceDocument, TargetDocumentBuilder};

pub const COORDINATES: &str = "1686734.12,4992383.5 1686750.0,4992383.5 1686750.0,4992400.25 1686734.12,4992383.5";

/// One feature member with the given `GML_BUILDINGS_CEG` attributes
pub fn fragment(uuid: &str, fields: &[(&str, &str)]) -> String {
    let body: String = fields
        .iter()
        .map(|(name, value)| format!("<CitiEnGov_01_1:{0}>{1}</CitiEnGov_01_1:{0}>", name, value))
        .collect();
    member(uuid, &body)
}

/// One feature member carrying only a footprint
pub fn geometry_fragment(uuid: &str, coordinates: &str) -> String {
    let body = format!(
        "<CitiEnGov_01_1:GEOMETRY2D><gml:Polygon srsName=\"EPSG:3003\"><gml:outerBoundaryIs>\
         <gml:LinearRing><gml:coordinates decimal=\".\" cs=\",\" ts=\" \">{}</gml:coordinates>\
         </gml:LinearRing></gml:outerBoundaryIs></gml:Polygon></CitiEnGov_01_1:GEOMETRY2D>",
        coordinates
    );
    member(uuid, &body)
}

fn member(uuid: &str, body: &str) -> String {
    format!(
        "\n  <gml:featureMember>\n    <CitiEnGov_01_1:GML_BUILDINGS_CEG fid=\"GML_BUILDINGS_CEG.{0}\">\
         <CitiEnGov_01_1:UUID>{0}</CitiEnGov_01_1:UUID>{1}\
         </CitiEnGov_01_1:GML_BUILDINGS_CEG>\n  </gml:featureMember>",
        uuid, body
    )
}

/// Wrap fragments in a WFS 1.x feature collection
pub fn document(fragments: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <wfs:FeatureCollection xmlns:wfs=\"http://www.opengis.net/wfs\" \
         xmlns:gml=\"http://www.opengis.net/gml\" \
         xmlns:CitiEnGov_01_1=\"http://maps.dedagroup.it/energy/geoserver/CitiEnGov_01_1\">{}\n\
         </wfs:FeatureCollection>\n",
        fragments.concat()
    )
}

pub fn load(fragments: &[String]) -> SourceDocument {
    SourceDocument::from_bytes(document(fragments).as_bytes()).expect("Failed to parse fixture")
}

/// A building that satisfies every mandatory field of both builders
pub fn minimal_building(uuid: &str) -> Vec<String> {
    vec![
        fragment(
            uuid,
            &[
                ("LIFESPAN_BEGINNING", "1962"),
                ("IDENTIFIER_ID_LOC", "0042"),
                ("IDENTIFIER_ID_NAME", "IT.COMUNE.REGGIO"),
            ],
        ),
        geometry_fragment(uuid, COORDINATES),
    ]
}

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
}

/// Serialize a builder into a string
pub fn render<B: TargetDocumentBuilder>(builder: &B) -> String {
    let mut out = Vec::new();
    builder.write_to(&mut out).expect("Failed to write document");
    String::from_utf8(out).expect("Output is not UTF-8")
}

pub fn parse(xml: &str) -> Element {
    parse_document(xml.as_bytes()).expect("Output is not well-formed")
}

/// All descendants (and self) with the given local name, in document order
pub fn descendants<'a>(element: &'a Element, local: &str) -> Vec<&'a Element> {
    let mut found = Vec::new();
    collect(element, local, &mut found);
    found
}

fn collect<'a>(element: &'a Element, local: &str, found: &mut Vec<&'a Element>) {
    if element.name.local == local {
        found.push(element);
    }
    for child in &element.children {
        collect(child, local, found);
    }
}

/// Text of the single descendant with the given local name
pub fn text_of<'a>(element: &'a Element, local: &str) -> Option<&'a str> {
    descendants(element, local)
        .first()
        .and_then(|e| e.text.as_deref())
}
