//! INSPIRE Buildings 2D (bu-core2d 4.0) output
//!
//! Produces a WFS 2.0 `FeatureCollection` with one `bu-core2d:Building` per
//! source building.

use super::{
    TargetDocument, TargetDocumentBuilder, Standard, copy_coordinates, mandatory, require,
    year_timestamp,
};
use crate::codelist::CodeList;
use crate::error::Result;
use crate::qname::{NamespaceTable, QName};
use crate::source::BuildingRecord;
use crate::tree::Element;
use chrono::{DateTime, Utc};

const SCHEMA_LOCATION: &str = "http://www.opengis.net/wfs/2.0 \
    http://schemas.opengis.net/wfs/2.0/wfs.xsd \
    http://www.opengis.net/gml/3.2 \
    http://schemas.opengis.net/gml/3.2.1/gml.xsd \
    http://inspire.ec.europa.eu/schemas/bu-core2d/4.0 \
    https://inspire.ec.europa.eu/schemas/bu-core2d/4.0/BuildingsCore2D.xsd";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Elevation reference used when a building gives a height but no reference
const DEFAULT_ELEVATION_REFERENCE: &str = "generalroof";

/// Prefix table of the INSPIRE output; the empty prefix is the default
/// namespace declared on the root
pub fn inspire_namespaces() -> NamespaceTable {
    NamespaceTable::new()
        .with_prefix("", "http://www.opengis.net/wfs")
        .with_prefix("wfs", "http://www.opengis.net/wfs/2.0")
        .with_prefix("xsi", "http://www.w3.org/2001/XMLSchema-instance")
        .with_prefix("xlink", "http://www.w3.org/1999/xlink")
        .with_prefix("gml", "http://www.opengis.net/gml/3.2")
        .with_prefix("gmd", "http://www.isotc211.org/2005/gmd")
        .with_prefix("base", "http://inspire.ec.europa.eu/schemas/base/3.3")
        .with_prefix("bu-base", "http://inspire.ec.europa.eu/schemas/bu-base/4.0")
        .with_prefix("bu-core2d", "http://inspire.ec.europa.eu/schemas/bu-core2d/4.0")
}

/// Code lists used by [`InspireBuilder`]
///
/// The built-in tables only cover the terms seen in CitiEnGov data so far.
/// Condition of construction and building nature are known to be
/// incomplete; building nature is empty.
#[derive(Debug, Clone)]
pub struct InspireCodeLists {
    /// <http://inspire.ec.europa.eu/codelist/ConditionOfConstructionValue>
    pub condition_of_construction: CodeList,
    /// <http://inspire.ec.europa.eu/codelist/ElevationReferenceValue>
    pub elevation_reference: CodeList,
    /// <http://inspire.ec.europa.eu/codelist/HeightStatusValue>
    pub height_status: CodeList,
    /// <http://inspire.ec.europa.eu/codelist/BuildingNatureValue>
    pub building_nature: CodeList,
    /// <http://inspire.ec.europa.eu/codelist/CurrentUseValue>
    pub current_use: CodeList,
}

impl Default for InspireCodeLists {
    fn default() -> Self {
        const CURRENT_USE: &str = "http://inspire.ec.europa.eu/codelist/CurrentUseValue";
        Self {
            condition_of_construction: CodeList::new("ConditionOfConstructionValue").with_entry(
                "functional",
                "http://inspire.ec.europa.eu/codelist/ConditionOfConstructionValue/functional",
            ),
            elevation_reference: CodeList::new("ElevationReferenceValue").with_entry(
                "generalroof",
                "http://inspire.ec.europa.eu/codelist/ElevationReferenceValue/generalRoof",
            ),
            height_status: CodeList::new("HeightStatusValue").with_entry(
                "stimata",
                "http://inspire.ec.europa.eu/codelist/HeightStatusValue/estimated",
            ),
            building_nature: CodeList::new("BuildingNatureValue"),
            current_use: CodeList::from_entries(
                "CurrentUseValue",
                [
                    ("ausiliario", "ancillary"),
                    ("negozio", "trade"),
                    ("residenziale", "residential"),
                    ("magazzino", "trade"),
                    ("laboratorio", "industrial"),
                ]
                .map(|(term, code)| (term, format!("{}/{}", CURRENT_USE, code))),
            ),
        }
    }
}

/// Builds an INSPIRE Buildings 2D feature collection
#[derive(Debug, Clone)]
pub struct InspireBuilder {
    document: TargetDocument,
    code_lists: InspireCodeLists,
}

impl InspireBuilder {
    /// Create a builder with the built-in code lists, stamped with the
    /// current UTC time
    pub fn new() -> Result<Self> {
        Self::with_code_lists(InspireCodeLists::default())
    }

    /// Create a builder with custom code lists, stamped with the current
    /// UTC time
    pub fn with_code_lists(code_lists: InspireCodeLists) -> Result<Self> {
        let mut document = TargetDocument::new(
            inspire_namespaces(),
            "wfs:FeatureCollection",
            "wfs:member",
        )?;
        document.set_root_attribute(QName::local("numberMatched"), "unknown");
        let mut document =
            document.with_member_count_attribute(QName::local("numberReturned"));
        document.set_root_attribute(QName::local("timeStamp"), "");
        let schema_location = document.qname("xsi:schemaLocation")?;
        document.set_root_attribute(schema_location, SCHEMA_LOCATION);

        Ok(Self {
            document,
            code_lists,
        }
        .with_timestamp(Utc::now()))
    }

    /// Replace the collection time stamp
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.document.set_root_attribute(
            QName::local("timeStamp"),
            timestamp.format(TIMESTAMP_FORMAT).to_string(),
        );
        self
    }

    /// Element whose only content is an `xlink:href` to a code-list value
    fn linked(&self, token: &str, target: &str) -> Result<Element> {
        let href = self.document.qname("xlink:href")?;
        Ok(self.document.element(token)?.with_attribute(href, target))
    }

    /// `DateOfEvent` with a beginning and, when present, an end
    fn date_of_event(
        &self,
        building: &BuildingRecord,
        token: &str,
        beginning: &str,
        end: &str,
    ) -> Result<Option<Element>> {
        let doc = &self.document;
        let Some(begin_year) = building.find_first(beginning) else {
            return Ok(None);
        };

        let mut event = doc.element("bu-base:DateOfEvent")?;
        event.push(doc.text_element("bu-base:beginning", year_timestamp(begin_year))?);
        if let Some(end_year) = building.find_first(end) {
            event.push(doc.text_element("bu-base:end", year_timestamp(end_year))?);
        }
        Ok(Some(doc.element(token)?.with_child(event)))
    }

    fn external_reference(&self, building: &BuildingRecord) -> Result<Option<Element>> {
        let doc = &self.document;
        let Some(reference) = building.find_first("EXT_REF_REFERENCE") else {
            return Ok(None);
        };
        let information_system = require(building, "EXT_REF_IDENTIFIER", "EXT_REF_REFERENCE")?;
        let system_name = require(building, "EXT_REF_INF_SYS_NAME", "EXT_REF_REFERENCE")?;

        let external = doc
            .element("bu-base:ExternalReference")?
            .with_child(doc.text_element("bu-base:informationSystem", information_system)?)
            .with_child(
                doc.element("bu-base:informationSystemName")?
                    .with_child(doc.text_element("gmd:LocalisedCharacterString", system_name)?),
            )
            .with_child(doc.text_element("bu-base:reference", reference)?);
        Ok(Some(doc.element("bu-base:externalReference")?.with_child(external)))
    }

    fn height_above_ground(&self, building: &BuildingRecord) -> Result<Option<Element>> {
        let doc = &self.document;
        let id = building.identifier();
        let Some(value) = building.find_first("HEIGHT_HEIGHT_VAL") else {
            return Ok(None);
        };
        let reference = building
            .find_first("HEIGHT_HEIGHT_REF")
            .unwrap_or(DEFAULT_ELEVATION_REFERENCE);
        let reference = self.code_lists.elevation_reference.lookup(reference, id)?;
        let status = require(building, "HEIGHT_HEIGHT_STAT", "HEIGHT_HEIGHT_VAL")?;
        let status = self.code_lists.height_status.lookup(status, id)?;

        let height = doc
            .element("bu-base:HeightAboveGround")?
            .with_child(self.linked("bu-base:heightReference", reference)?)
            .with_child(doc.element("bu-base:lowReference")?)
            .with_child(self.linked("bu-base:status", status)?)
            .with_child(
                doc.text_element("bu-base:value", value)?
                    .with_attribute(QName::local("uom"), "m"),
            );
        Ok(Some(doc.element("bu-base:heightAboveGround")?.with_child(height)))
    }

    fn inspire_id(&self, building: &BuildingRecord) -> Result<Element> {
        let doc = &self.document;
        let local_id = mandatory(building, "IDENTIFIER_ID_LOC")?;
        let namespace = mandatory(building, "IDENTIFIER_ID_NAME")?;
        let identifier = doc
            .element("base:Identifier")?
            .with_child(doc.text_element("base:localId", local_id)?)
            .with_child(doc.text_element("base:namespace", namespace)?);
        Ok(doc.element("bu-base:inspireId")?.with_child(identifier))
    }

    fn current_uses(&self, building: &BuildingRecord) -> Result<Vec<Element>> {
        let doc = &self.document;
        let Some(uses) = building.find_first("USE_M") else {
            return Ok(Vec::new());
        };

        split_current_uses(uses)
            .into_iter()
            .map(|(term, percentage)| {
                let target = self.code_lists.current_use.lookup(term, building.identifier())?;
                let current_use = doc
                    .element("bu-base:CurrentUse")?
                    .with_child(self.linked("bu-base:currentUse", target)?)
                    .with_child(doc.text_element("bu-base:percentage", percentage)?);
                Ok(doc.element("bu-base:currentUse")?.with_child(current_use))
            })
            .collect()
    }

    fn geometry(&self, building: &BuildingRecord) -> Result<Element> {
        let doc = &self.document;
        let polygon = doc.element("gml:Polygon")?.with_child(
            doc.element("gml:exterior")?.with_child(
                doc.element("gml:LinearRing")?
                    .with_child(copy_coordinates(doc, building)?),
            ),
        );
        // Reference geometry and accuracy have no source counterpart yet
        let geometry = doc
            .element("bu-base:BuildingGeometry2D")?
            .with_child(doc.element("bu-base:geometry")?.with_child(polygon))
            .with_child(doc.text_element("bu-base:referenceGeometry", "false")?)
            .with_child(doc.element("bu-base:horizontalGeometryReference")?)
            .with_child(
                doc.text_element("bu-base:horizontalGeometryEstimatedAccuracy", "0")?
                    .with_attribute(QName::local("uom"), "!"),
            );
        Ok(doc.element("bu-core2d:geometry2D")?.with_child(geometry))
    }
}

impl TargetDocumentBuilder for InspireBuilder {
    fn standard(&self) -> Standard {
        Standard::Inspire
    }

    fn document(&self) -> &TargetDocument {
        &self.document
    }

    fn document_mut(&mut self) -> &mut TargetDocument {
        &mut self.document
    }

    fn build_building(&self, building: &BuildingRecord) -> Result<Element> {
        let doc = &self.document;
        let id = building.identifier();
        let mut element = doc.element("bu-core2d:Building")?;

        let lifespan = mandatory(building, "LIFESPAN_BEGINNING")?;
        element.push(doc.text_element("bu-base:beginLifespanVersion", year_timestamp(lifespan))?);

        if let Some(condition) = building.find_first("CONDITION") {
            let target = self.code_lists.condition_of_construction.lookup(condition, id)?;
            element.push(self.linked("bu-base:conditionOfConstruction", target)?);
        }

        if let Some(construction) = self.date_of_event(
            building,
            "bu-base:dateOfConstruction",
            "DATE_C_BEGINNING",
            "DATE_C_END",
        )? {
            element.push(construction);
        }

        if let Some(renovation) = self.date_of_event(
            building,
            "bu-base:dateOfRenovation",
            "DATE_R_BEGINNING",
            "DATE_R_END",
        )? {
            element.push(renovation);
        }

        if let Some(reference) = self.external_reference(building)? {
            element.push(reference);
        }

        if let Some(height) = self.height_above_ground(building)? {
            element.push(height);
        }

        element.push(self.inspire_id(building)?);

        if let Some(nature) = building.find_first("BUILDINGTYPE") {
            let target = self.code_lists.building_nature.lookup(nature, id)?;
            element.push(self.linked("bu-base:buildingNature", target)?);
        }

        for current_use in self.current_uses(building)? {
            element.push(current_use);
        }

        if let Some(units) = building.find_first("UNITS") {
            element.push(doc.text_element("bu-base:numberOfBuildingUnits", units)?);
        }

        if let Some(floors) = building.find_first("FLOORS") {
            element.push(doc.text_element("bu-base:numberOfFloorsAboveGround", floors)?);
        }

        element.push(self.geometry(building)?);
        Ok(element)
    }
}

/// Split `use(nn%),use(nn%)` into `(use, nn)` pairs
///
/// Entries are split on the first `(`; `%` and `)` are stripped from the
/// percentage. An entry without `(` yields an empty percentage.
pub(crate) fn split_current_uses(uses: &str) -> Vec<(&str, &str)> {
    uses.split(',')
        .map(|entry| {
            let (term, percentage) = entry.split_once('(').unwrap_or((entry, ""));
            (term.trim(), percentage.trim_matches(|c| c == '%' || c == ')'))
        })
        .collect()
}
