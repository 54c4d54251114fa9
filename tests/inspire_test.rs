//! Tests for the INSPIRE Buildings 2D mapping

mod common;

use citiengov_gml::{
    Error, InspireBuilder, QName, SourceDocument, SourceMode, TargetDocumentBuilder,
};
use common::{
    COORDINATES, descendants, fixed_time, fragment, geometry_fragment, load, minimal_building,
    parse, render, text_of,
};

const XLINK: &str = "http://www.w3.org/1999/xlink";
const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/buildings.gml");

fn href(element: &citiengov_gml::Element) -> Option<&str> {
    element.attribute(&QName::new(XLINK, "href"))
}

fn translate(fragments: &[String]) -> Result<InspireBuilder, Error> {
    let mut builder = InspireBuilder::new()?.with_timestamp(fixed_time());
    builder.translate(load(fragments).into_buildings()?)?;
    Ok(builder)
}

#[test]
fn test_fixture_document_mapping() {
    let source = SourceDocument::load(FIXTURE, SourceMode::File).unwrap();
    let mut builder = InspireBuilder::new().unwrap().with_timestamp(fixed_time());
    let count = builder.translate(source.into_buildings().unwrap()).unwrap();
    assert_eq!(count, 2);

    let root = parse(&render(&builder));
    assert_eq!(root.name.local, "FeatureCollection");
    assert_eq!(root.attribute(&QName::local("numberMatched")), Some("unknown"));
    assert_eq!(root.attribute(&QName::local("numberReturned")), Some("2"));
    assert_eq!(root.attribute(&QName::local("timeStamp")), Some("2024-01-15T10:30:00"));

    let buildings = descendants(&root, "Building");
    assert_eq!(buildings.len(), 2);
    let school = buildings[0];

    let order: Vec<&str> = school.children.iter().map(|c| c.name.local.as_str()).collect();
    assert_eq!(
        order,
        vec![
            "beginLifespanVersion",
            "conditionOfConstruction",
            "dateOfConstruction",
            "heightAboveGround",
            "inspireId",
            "currentUse",
            "currentUse",
            "numberOfFloorsAboveGround",
            "geometry2D",
        ]
    );

    assert_eq!(text_of(school, "beginLifespanVersion"), Some("1968-01-01T00:00:00"));
    assert_eq!(
        href(descendants(school, "conditionOfConstruction")[0]),
        Some("http://inspire.ec.europa.eu/codelist/ConditionOfConstructionValue/functional")
    );

    let construction = descendants(school, "dateOfConstruction")[0];
    assert_eq!(text_of(construction, "beginning"), Some("1966-01-01T00:00:00"));
    assert_eq!(text_of(construction, "end"), Some("1968-01-01T00:00:00"));

    assert_eq!(text_of(school, "localId"), Some("RE-0001"));
    assert_eq!(text_of(school, "namespace"), Some("IT.COMUNE.REGGIOEMILIA"));
    assert_eq!(text_of(school, "numberOfFloorsAboveGround"), Some("3"));
}

#[test]
fn test_current_use_split_with_percentages() {
    let mut fragments = minimal_building("b-1");
    fragments.push(fragment("b-1", &[("USE_M", "residenziale(80%),negozio(20%)")]));
    let builder = translate(&fragments).unwrap();
    let root = parse(&render(&builder));

    let uses = descendants(&root, "CurrentUse");
    assert_eq!(uses.len(), 2);
    assert_eq!(
        href(descendants(uses[0], "currentUse")[0]),
        Some("http://inspire.ec.europa.eu/codelist/CurrentUseValue/residential")
    );
    assert_eq!(text_of(uses[0], "percentage"), Some("80"));
    assert_eq!(
        href(descendants(uses[1], "currentUse")[0]),
        Some("http://inspire.ec.europa.eu/codelist/CurrentUseValue/trade")
    );
    assert_eq!(text_of(uses[1], "percentage"), Some("20"));
}

#[test]
fn test_height_above_ground() {
    let mut fragments = minimal_building("b-1");
    fragments.push(fragment(
        "b-1",
        &[("HEIGHT_HEIGHT_VAL", "12.4"), ("HEIGHT_HEIGHT_STAT", "Stimata")],
    ));
    let builder = translate(&fragments).unwrap();
    let root = parse(&render(&builder));

    let height = descendants(&root, "HeightAboveGround")[0];
    let children: Vec<&str> = height.children.iter().map(|c| c.name.local.as_str()).collect();
    assert_eq!(children, vec!["heightReference", "lowReference", "status", "value"]);

    // No reference in the source falls back to the general roof
    assert_eq!(
        href(&height.children[0]),
        Some("http://inspire.ec.europa.eu/codelist/ElevationReferenceValue/generalRoof")
    );
    assert!(height.children[1].is_empty());
    assert_eq!(
        href(&height.children[2]),
        Some("http://inspire.ec.europa.eu/codelist/HeightStatusValue/estimated")
    );
    assert_eq!(height.children[3].text.as_deref(), Some("12.4"));
    assert_eq!(height.children[3].attribute(&QName::local("uom")), Some("m"));
}

#[test]
fn test_height_without_status_fails() {
    let mut fragments = minimal_building("b-1");
    fragments.push(fragment("b-1", &[("HEIGHT_HEIGHT_VAL", "12.4")]));

    match translate(&fragments) {
        Err(Error::MissingDependentField { building, attribute, trigger }) => {
            assert_eq!(building, "b-1");
            assert_eq!(attribute, "HEIGHT_HEIGHT_STAT");
            assert_eq!(trigger, "HEIGHT_HEIGHT_VAL");
        }
        other => panic!("Expected MissingDependentField, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_external_reference_requires_identifier() {
    let mut fragments = minimal_building("b-1");
    fragments.push(fragment(
        "b-1",
        &[("EXT_REF_REFERENCE", "CAT-77"), ("EXT_REF_INF_SYS_NAME", "Catasto")],
    ));

    match translate(&fragments) {
        Err(Error::MissingDependentField { attribute, trigger, .. }) => {
            assert_eq!(attribute, "EXT_REF_IDENTIFIER");
            assert_eq!(trigger, "EXT_REF_REFERENCE");
        }
        other => panic!("Expected MissingDependentField, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_external_reference_mapping() {
    let mut fragments = minimal_building("b-1");
    fragments.push(fragment(
        "b-1",
        &[
            ("EXT_REF_REFERENCE", "CAT-77"),
            ("EXT_REF_IDENTIFIER", "http://catasto.example.org"),
            ("EXT_REF_INF_SYS_NAME", "Catasto"),
        ],
    ));
    let root = parse(&render(&translate(&fragments).unwrap()));

    let reference = descendants(&root, "ExternalReference")[0];
    assert_eq!(text_of(reference, "informationSystem"), Some("http://catasto.example.org"));
    assert_eq!(text_of(reference, "LocalisedCharacterString"), Some("Catasto"));
    assert_eq!(text_of(reference, "reference"), Some("CAT-77"));
}

#[test]
fn test_renovation_dates() {
    let mut fragments = minimal_building("b-1");
    fragments.push(fragment(
        "b-1",
        &[("DATE_R_BEGINNING", "2001"), ("DATE_R_END", "2003")],
    ));
    let root = parse(&render(&translate(&fragments).unwrap()));

    let renovation = descendants(&root, "dateOfRenovation")[0];
    assert_eq!(text_of(renovation, "beginning"), Some("2001-01-01T00:00:00"));
    assert_eq!(text_of(renovation, "end"), Some("2003-01-01T00:00:00"));
    assert!(descendants(&root, "dateOfConstruction").is_empty());
}

#[test]
fn test_geometry_copied_unchanged() {
    let root = parse(&render(&translate(&minimal_building("b-1")).unwrap()));

    let coordinates = descendants(&root, "coordinates")[0];
    assert_eq!(coordinates.text.as_deref(), Some(COORDINATES));
    assert_eq!(coordinates.attribute(&QName::local("decimal")), Some("."));
    assert_eq!(coordinates.attribute(&QName::local("cs")), Some(","));
    assert_eq!(coordinates.attribute(&QName::local("ts")), Some(" "));

    let geometry = descendants(&root, "BuildingGeometry2D")[0];
    assert_eq!(text_of(geometry, "referenceGeometry"), Some("false"));
    let accuracy = descendants(geometry, "horizontalGeometryEstimatedAccuracy")[0];
    assert_eq!(accuracy.attribute(&QName::local("uom")), Some("!"));
    assert_eq!(descendants(geometry, "exterior").len(), 1);
}

#[test]
fn test_missing_geometry_fails() {
    let fragments = vec![fragment(
        "b-1",
        &[
            ("LIFESPAN_BEGINNING", "1962"),
            ("IDENTIFIER_ID_LOC", "0042"),
            ("IDENTIFIER_ID_NAME", "IT.COMUNE.REGGIO"),
        ],
    )];
    assert!(matches!(
        translate(&fragments),
        Err(Error::MissingMandatoryField { attribute, .. }) if attribute == "GEOMETRY2D"
    ));
}

#[test]
fn test_missing_lifespan_fails() {
    let fragments = vec![
        fragment("b-1", &[("IDENTIFIER_ID_LOC", "1"), ("IDENTIFIER_ID_NAME", "IT")]),
        geometry_fragment("b-1", COORDINATES),
    ];
    assert!(matches!(
        translate(&fragments),
        Err(Error::MissingMandatoryField { attribute, .. }) if attribute == "LIFESPAN_BEGINNING"
    ));
}

#[test]
fn test_unknown_current_use_aborts_without_partial_member() {
    let mut fragments = minimal_building("b-1");
    fragments.extend(minimal_building("b-2"));
    fragments.push(fragment("b-2", &[("USE_M", "chiesa(100%)")]));

    let mut builder = InspireBuilder::new().unwrap();
    let result = builder.translate(load(&fragments).into_buildings().unwrap());
    match result {
        Err(Error::CodeListLookupFailure { code_list, term, building }) => {
            assert_eq!(code_list, "CurrentUseValue");
            assert_eq!(term, "chiesa");
            assert_eq!(building, "b-2");
        }
        other => panic!("Expected CodeListLookupFailure, got {:?}", other),
    }

    // The first building was already appended; the failing one left nothing
    assert_eq!(builder.document().member_count(), 1);
    let root = parse(&render(&builder));
    assert_eq!(descendants(&root, "Building").len(), 1);
}

#[test]
fn test_building_nature_has_no_known_terms() {
    let mut fragments = minimal_building("b-1");
    fragments.push(fragment("b-1", &[("BUILDINGTYPE", "RowHouse")]));
    assert!(matches!(
        translate(&fragments),
        Err(Error::CodeListLookupFailure { code_list, .. }) if code_list == "BuildingNatureValue"
    ));
}

#[test]
fn test_empty_collection_before_translate() {
    let builder = InspireBuilder::new().unwrap();
    let root = parse(&render(&builder));

    assert_eq!(root.name.local, "FeatureCollection");
    assert!(root.children.is_empty());
    assert_eq!(root.attribute(&QName::local("numberReturned")), Some("0"));
}

#[test]
fn test_member_count_matches_identifiers() {
    let mut fragments = Vec::new();
    for id in ["b-1", "b-2", "b-3"] {
        fragments.extend(minimal_building(id));
    }
    let source = load(&fragments);
    let expected = source.building_identifiers().unwrap().len();

    let mut builder = InspireBuilder::new().unwrap();
    builder.translate(source.into_buildings().unwrap()).unwrap();
    assert_eq!(builder.document().member_count(), expected);

    let root = parse(&render(&builder));
    assert_eq!(descendants(&root, "member").len(), 3);
    assert_eq!(root.attribute(&QName::local("numberReturned")), Some("3"));
}

#[test]
fn test_translation_is_deterministic() {
    let mut fragments = minimal_building("b-1");
    fragments.push(fragment("b-1", &[("USE_M", "ausiliario(100%)"), ("UNITS", "4")]));

    let first = render(&translate(&fragments).unwrap());
    let second = render(&translate(&fragments).unwrap());
    assert_eq!(first, second);
}

#[test]
fn test_default_namespace_declared_on_root() {
    let xml = render(&InspireBuilder::new().unwrap());
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(xml.contains(r#"xmlns="http://www.opengis.net/wfs""#));
    assert!(xml.contains(r#"xmlns:wfs="http://www.opengis.net/wfs/2.0""#));
    assert!(xml.contains(r#"xmlns:bu-core2d="http://inspire.ec.europa.eu/schemas/bu-core2d/4.0""#));
}

/// Translate and expect a lookup failure that left no member behind
fn assert_lookup_failure(fragments: &[String], list: &str, expected_term: &str) {
    let mut builder = InspireBuilder::new().unwrap();
    let result = builder.translate(load(fragments).into_buildings().unwrap());
    match result {
        Err(Error::CodeListLookupFailure { code_list, term, building }) => {
            assert_eq!(code_list, list);
            assert_eq!(term, expected_term);
            assert_eq!(building, "b-1");
        }
        other => panic!("Expected CodeListLookupFailure, got {:?}", other),
    }
    assert_eq!(builder.document().member_count(), 0);
    let root = parse(&render(&builder));
    assert!(descendants(&root, "Building").is_empty());
    assert!(descendants(&root, "HeightAboveGround").is_empty());
}

#[test]
fn test_unknown_height_reference_fails() {
    let mut fragments = minimal_building("b-1");
    fragments.push(fragment(
        "b-1",
        &[
            ("HEIGHT_HEIGHT_VAL", "12.4"),
            ("HEIGHT_HEIGHT_REF", "middleOfRoof"),
            ("HEIGHT_HEIGHT_STAT", "stimata"),
        ],
    ));
    assert_lookup_failure(&fragments, "ElevationReferenceValue", "middleofroof");
}

#[test]
fn test_unknown_height_status_fails() {
    let mut fragments = minimal_building("b-1");
    fragments.push(fragment(
        "b-1",
        &[("HEIGHT_HEIGHT_VAL", "12.4"), ("HEIGHT_HEIGHT_STAT", "misurata")],
    ));
    assert_lookup_failure(&fragments, "HeightStatusValue", "misurata");
}

#[test]
fn test_unknown_condition_fails() {
    let mut fragments = minimal_building("b-1");
    fragments.push(fragment("b-1", &[("CONDITION", "Demolished")]));
    assert_lookup_failure(&fragments, "ConditionOfConstructionValue", "demolished");
}

#[test]
fn test_source_gml_attributes_move_to_target_namespace() {
    let footprint = format!(
        "\n  <gml:featureMember>\n    <CitiEnGov_01_1:GML_BUILDINGS_CEG>\
         <CitiEnGov_01_1:UUID>b-1</CitiEnGov_01_1:UUID>\
         <CitiEnGov_01_1:GEOMETRY2D><gml:Polygon><gml:outerBoundaryIs><gml:LinearRing>\
         <gml:coordinates gml:id=\"c-1\" cs=\",\">{}</gml:coordinates>\
         </gml:LinearRing></gml:outerBoundaryIs></gml:Polygon></CitiEnGov_01_1:GEOMETRY2D>\
         </CitiEnGov_01_1:GML_BUILDINGS_CEG>\n  </gml:featureMember>",
        COORDINATES
    );
    let fragments = vec![minimal_building("b-1").remove(0), footprint];

    let xml = render(&translate(&fragments).unwrap());
    assert!(xml.contains(r#"gml:id="c-1""#));

    let root = parse(&xml);
    let coordinates = descendants(&root, "coordinates")[0];
    assert_eq!(
        coordinates.attribute(&QName::new("http://www.opengis.net/gml/3.2", "id")),
        Some("c-1")
    );
    assert_eq!(coordinates.attribute(&QName::local("cs")), Some(","));
    assert_eq!(coordinates.text.as_deref(), Some(COORDINATES));
}
