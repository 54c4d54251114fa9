//! CityGML 2.0 building output with Energy ADE extensions
//!
//! Produces a `core:CityModel` with one `bldg:Building` per source building.
//! Yearly consumption series become Energy ADE `RegularTimeSeries` demands.

use super::{
    TargetDocument, TargetDocumentBuilder, Standard, copy_coordinates, require, year_date,
};
use crate::codelist::CodeList;
use crate::error::{Error, Result};
use crate::qname::{NamespaceTable, QName};
use crate::source::BuildingRecord;
use crate::tree::Element;

const SCHEMA_LOCATION: &str =
    "http://www.sig3d.org/citygml/2.0/energy/1.0 http://www.citygmlwiki.org/images/a/ac/EnergyADE.xsd";

const USAGE_CODE_SPACE: &str =
    "https://www.sig3d.org/codelists/citygml/2.0/building/2.0/_AbstractBuilding_usage.xml";
const ROOF_TYPE_CODE_SPACE: &str =
    "https://www.sig3d.org/codelists/citygml/2.0/building/2.0/_AbstractBuilding_roofType.xml";
const BUILDING_TYPE_CODE_SPACE: &str =
    "https://www.sig3d.org/codelists/citygml/2.0/energy/0.6.0/energy_BuildingType.xml";
const ENERGY_CARRIER_CODE_SPACE: &str =
    "https://www.sig3d.org/codelists/citygml/2.0/energy/0.6.0/energy_EnergyCarrierType.xml";

/// Upper bound on the floors expanded into `storeyHeightsAboveGround`
const MAX_STOREYS: usize = 500;

/// Prefix table of the CityGML output
pub fn citygml_namespaces() -> NamespaceTable {
    NamespaceTable::new()
        .with_prefix("wfs", "http://www.opengis.net/wfs")
        .with_prefix("xsi", "http://www.w3.org/2001/XMLSchema-instance")
        .with_prefix("xlink", "http://www.w3.org/1999/xlink")
        .with_prefix("gml", "http://www.opengis.net/gml")
        .with_prefix("core", "http://www.opengis.net/citygml/2.0")
        .with_prefix("energy", "http://www.sig3d.org/citygml/2.0/energy/1.0")
        .with_prefix("bldg", "http://www.opengis.net/citygml/building/2.0")
}

/// Code lists used by [`CityGmlBuilder`]
///
/// The roof-type table is empty until the CitiEnGov roof vocabulary is
/// mapped; any building with a roof type fails until it is supplied.
#[derive(Debug, Clone)]
pub struct CityGmlCodeLists {
    /// `_AbstractBuilding_usage` codes
    pub usage: CodeList,
    /// `_AbstractBuilding_roofType` codes
    pub roof_type: CodeList,
    /// Energy ADE elevation references
    pub height_reference: CodeList,
    /// Energy ADE `BuildingType` codes
    pub building_type: CodeList,
}

impl Default for CityGmlCodeLists {
    fn default() -> Self {
        let height_references = [
            "bottomOfConstruction",
            "entrancePoint",
            "generalEave",
            "generalRoof",
            "generalRoofEdge",
            "highestEave",
            "highestPoint",
            "highestRoofEdge",
            "lowestEave",
            "lowestFloorAboveGround",
            "lowestRoofEdge",
            "topOfConstruction",
            "topThermalBoundary",
            // Older tables mapped this to topThermalBoundary
            "bottomThermalBoundary",
        ];
        let building_types = [
            "ApartmentBlock",
            "MultiFamilyHouse",
            "RowHouse",
            "SingleFamilyHouse",
        ];

        Self {
            usage: CodeList::from_entries(
                "_AbstractBuilding_usage",
                [
                    ("school", "2070"),
                    ("residential", "1000"),
                    ("residenziale", "1000"),
                    ("commercio", "1150"),
                    ("ausiliario", "2700"),
                ],
            ),
            roof_type: CodeList::new("_AbstractBuilding_roofType"),
            height_reference: CodeList::from_entries(
                "ElevationReference",
                height_references.map(|code| (code, code)),
            ),
            building_type: CodeList::from_entries(
                "BuildingType",
                building_types.map(|code| (code, code)),
            ),
        }
    }
}

/// Energy carriers with a yearly consumption series in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyCarrier {
    /// `*_E` attributes
    Electricity,
    /// `*_T` attributes
    Thermal,
}

impl EnergyCarrier {
    /// Value the source attribute must hold, compared case-insensitively
    pub fn source_name(&self) -> &'static str {
        match self {
            EnergyCarrier::Electricity => "electricity",
            EnergyCarrier::Thermal => "thermal",
        }
    }

    /// Energy ADE `EnergyCarrierType` code
    pub fn carrier_type(&self) -> &'static str {
        match self {
            EnergyCarrier::Electricity => "Electricity",
            EnergyCarrier::Thermal => "HotWater",
        }
    }

    fn source_attribute(&self) -> &'static str {
        match self {
            EnergyCarrier::Electricity => "ENERGYAMOUNT_E_SOURCE_E",
            EnergyCarrier::Thermal => "ENERGYAMOUNT_E_SOURCE_T",
        }
    }

    fn year_attribute(&self) -> &'static str {
        match self {
            EnergyCarrier::Electricity => "ENERGYAMOUNT_E_YEAR_ONLY_E",
            EnergyCarrier::Thermal => "ENERGYAMOUNT_E_YEAR_ONLY_T",
        }
    }

    fn value_attribute(&self) -> &'static str {
        match self {
            EnergyCarrier::Electricity => "CONSUMONORM_VALORE_E",
            EnergyCarrier::Thermal => "CONSUMONORM_VALORE_T",
        }
    }

    fn uom_attribute(&self) -> &'static str {
        match self {
            EnergyCarrier::Electricity => "CONSUMONORM_UOM_E",
            EnergyCarrier::Thermal => "CONSUMONORM_UOM_T",
        }
    }
}

/// A contiguous yearly consumption series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearlySeries {
    /// First year of the series
    pub first_year: i32,
    /// Last year of the series
    pub last_year: i32,
    /// Values ordered by year
    pub values: Vec<String>,
    /// Unit of measure, lower-cased
    pub uom: String,
}

impl YearlySeries {
    /// Read the series of `carrier` from a building
    ///
    /// Returns `Ok(None)` when the building has no consumption value for the
    /// carrier. Years must form an unbroken range once sorted.
    pub fn from_building(
        building: &BuildingRecord,
        carrier: EnergyCarrier,
    ) -> Result<Option<Self>> {
        let id = building.identifier();
        let value_attribute = carrier.value_attribute();
        let values = building.find_all(value_attribute);
        if values.is_empty() {
            return Ok(None);
        }

        let source = require(building, carrier.source_attribute(), value_attribute)?;
        if source.to_lowercase() != carrier.source_name() {
            return Err(Error::EnergyCarrierMismatch {
                building: id.to_string(),
                attribute: carrier.source_attribute().to_string(),
                expected: carrier.source_name().to_string(),
                found: source.to_string(),
            });
        }

        let year_attribute = carrier.year_attribute();
        let years = building.find_all(year_attribute);
        if years.len() != values.len() {
            return Err(Error::missing_dependent(id, year_attribute, value_attribute));
        }
        let uom = require(building, carrier.uom_attribute(), value_attribute)?.to_lowercase();

        let mut pairs = years
            .iter()
            .zip(values)
            .map(|(year, value)| {
                year.trim()
                    .parse::<i32>()
                    .map(|year| (year, value.to_string()))
                    .map_err(|_| Error::invalid_value(id, year_attribute, year, "a year"))
            })
            .collect::<Result<Vec<_>>>()?;
        pairs.sort_by_key(|(year, _)| *year);

        let first_year = pairs[0].0;
        let last_year = pairs[pairs.len() - 1].0;
        if pairs.len() as i64 != i64::from(last_year) - i64::from(first_year) + 1 {
            return Err(Error::NonContiguousYears {
                building: id.to_string(),
                attribute: year_attribute.to_string(),
                years: pairs.iter().map(|(year, _)| *year).collect(),
            });
        }

        Ok(Some(Self {
            first_year,
            last_year,
            values: pairs.into_iter().map(|(_, value)| value).collect(),
            uom,
        }))
    }

    /// Values joined by single spaces, as in a GML value list
    pub fn values_text(&self) -> String {
        self.values.join(" ")
    }
}

/// The per-floor height repeated once per floor, comma separated
pub(crate) fn storey_heights(height: &str, floors: usize) -> String {
    vec![height; floors].join(",")
}

/// Builds a CityGML city model with Energy ADE content
#[derive(Debug, Clone)]
pub struct CityGmlBuilder {
    document: TargetDocument,
    code_lists: CityGmlCodeLists,
}

impl CityGmlBuilder {
    /// Create a builder with the built-in code lists
    pub fn new() -> Result<Self> {
        Self::with_code_lists(CityGmlCodeLists::default())
    }

    /// Create a builder with custom code lists
    pub fn with_code_lists(code_lists: CityGmlCodeLists) -> Result<Self> {
        let mut document = TargetDocument::new(
            citygml_namespaces(),
            "core:CityModel",
            "core:cityObjectMember",
        )?;
        let schema_location = document.qname("xsi:schemaLocation")?;
        document.set_root_attribute(schema_location, SCHEMA_LOCATION);
        Ok(Self {
            document,
            code_lists,
        })
    }

    fn coded(&self, token: &str, code_space: &str, code: &str) -> Result<Element> {
        Ok(self
            .document
            .text_element(token, code)?
            .with_attribute(QName::local("codeSpace"), code_space))
    }

    fn measure(&self, token: &str, uom: &str, value: &str) -> Result<Element> {
        Ok(self
            .document
            .text_element(token, value)?
            .with_attribute(QName::local("uom"), uom))
    }

    /// `core:externalReference` naming an information system and an object
    fn external_reference(&self, information_system: &str, name: &str) -> Result<Element> {
        let doc = &self.document;
        Ok(doc
            .element("core:externalReference")?
            .with_child(doc.text_element("core:informationSystem", information_system)?)
            .with_child(
                doc.element("core:externalObject")?
                    .with_child(doc.text_element("core:name", name)?),
            ))
    }

    fn energy_demand(&self, carrier: EnergyCarrier, series: &YearlySeries) -> Result<Element> {
        let doc = &self.document;

        let properties = doc.element("energy:variableProperties")?.with_child(
            doc.element("energy:TimeValuesProperties")?
                .with_child(doc.text_element("energy:acquisitionMethod", "measurement")?)
                .with_child(doc.text_element("energy:interpolationType", "instantaneousTotal")?),
        );
        let extent = doc.element("energy:temporalExtent")?.with_child(
            doc.element("gml:TimePeriod")?
                .with_child(doc.text_element("gml:beginPosition", series.first_year.to_string())?)
                .with_child(doc.text_element("gml:endPosition", series.last_year.to_string())?),
        );
        let time_series = doc
            .element("energy:RegularTimeSeries")?
            .with_child(properties)
            .with_child(extent)
            .with_child(
                doc.text_element("energy:timeInterval", "1")?
                    .with_attribute(QName::local("unit"), "year"),
            )
            .with_child(self.measure("energy:values", &series.uom, &series.values_text())?);

        let demand = doc
            .element("energy:EnergyDemand")?
            .with_child(doc.element("energy:energyAmount")?.with_child(time_series))
            .with_child(doc.text_element("energy:endUse", "otherOrCombination")?)
            .with_child(self.coded(
                "energy:energyCarrierType",
                ENERGY_CARRIER_CODE_SPACE,
                carrier.carrier_type(),
            )?);
        Ok(doc.element("energy:demands")?.with_child(demand))
    }

    fn storeys(&self, building: &BuildingRecord, floors: &str) -> Result<Vec<Element>> {
        let mut elements = vec![self.document.text_element("bldg:storeysAboveGround", floors)?];
        if let Some(height) = building.find_first("H_FLOOR") {
            let count = floors
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|count| *count <= MAX_STOREYS)
                .ok_or_else(|| {
                    Error::invalid_value(
                        building.identifier(),
                        "FLOORS",
                        floors,
                        &format!("a floor count of at most {}", MAX_STOREYS),
                    )
                })?;
            elements.push(self.measure(
                "bldg:storeyHeightsAboveGround",
                "m",
                &storey_heights(height, count),
            )?);
        }
        Ok(elements)
    }

    fn footprint(&self, building: &BuildingRecord) -> Result<Element> {
        let doc = &self.document;
        let polygon = doc.element("gml:Polygon")?.with_child(
            doc.element("gml:outerBoundaryIs")?.with_child(
                doc.element("gml:LinearRing")?
                    .with_child(copy_coordinates(doc, building)?),
            ),
        );
        Ok(doc.element("bldg:lod0FootPrint")?.with_child(
            doc.element("gml:MultiSurface")?
                .with_child(doc.element("gml:surfaceMember")?.with_child(polygon)),
        ))
    }

    fn refurbishment_measure(&self, building: &BuildingRecord, begin: &str) -> Result<Element> {
        let doc = &self.document;
        let mut period = doc
            .element("gml:TimePeriod")?
            .with_child(doc.text_element("gml:beginPosition", begin)?);
        if let Some(end) = building.find_first("DATE_R_END") {
            period.push(doc.text_element("gml:endPosition", end)?);
        }

        let measure = doc
            .element("energy:RefurbishmentMeasure")?
            .with_child(
                doc.element("energy:date")?.with_child(
                    doc.element("energy:DateOfEvent")?
                        .with_child(doc.element("energy:period")?.with_child(period)),
                ),
            )
            .with_child(doc.text_element("energy:level", "unknown")?);
        Ok(doc.element("energy:refurbishmentMeasure")?.with_child(measure))
    }

    fn certification(&self, building: &BuildingRecord, rating: &str) -> Result<Element> {
        let doc = &self.document;
        let method = require(
            building,
            "ENERGYPERFORMANCE_PERF_METHOD",
            "ENERGYPERFORMANCE_PERF_CLASS",
        )?;
        // No source field carries the certificate number
        let certification = doc
            .element("energy:EnergyPerformanceCertification")?
            .with_child(doc.text_element("energy:rating", rating)?)
            .with_child(doc.text_element("energy:name", method)?)
            .with_child(doc.element("energy:certificationId")?);
        Ok(doc
            .element("energy:energyPerformanceCertification")?
            .with_child(certification))
    }

    fn height_above_ground(&self, building: &BuildingRecord, value: &str) -> Result<Element> {
        let doc = &self.document;
        let reference = require(building, "HEIGHT_HEIGHT_REF", "HEIGHT_HEIGHT_VAL")?;
        let reference = self
            .code_lists
            .height_reference
            .lookup(reference, building.identifier())?;
        let height = doc
            .element("energy:HeightAboveGround")?
            .with_child(doc.text_element("energy:heightReference", reference)?)
            .with_child(self.measure("energy:value", "m", value)?);
        Ok(doc.element("energy:heightAboveGround")?.with_child(height))
    }

    fn typed_value(
        &self,
        wrapper: &str,
        inner: &str,
        kind: &str,
        uom: &str,
        value: &str,
    ) -> Result<Element> {
        let doc = &self.document;
        Ok(doc.element(wrapper)?.with_child(
            doc.element(inner)?
                .with_child(doc.text_element("energy:type", kind)?)
                .with_child(self.measure("energy:value", uom, value)?),
        ))
    }
}

impl TargetDocumentBuilder for CityGmlBuilder {
    fn standard(&self) -> Standard {
        Standard::CityGml
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
        let mut element = doc.element("bldg:Building")?;

        if let Some(name) = building.find_first("NAME") {
            element.push(doc.text_element("gml:name", name)?);
        }

        if let Some(year) = building.find_first("LIFESPAN_BEGINNING") {
            element.push(doc.text_element("core:creationDate", year_date(year))?);
        }

        if let Some(year) = building.find_first("LIFESPAN_END") {
            element.push(doc.text_element("core:terminationDate", year_date(year))?);
        }

        if let Some(reference) = building.find_first("EXT_REF_REFERENCE") {
            let system = require(building, "EXT_REF_IDENTIFIER", "EXT_REF_REFERENCE")?;
            element.push(self.external_reference(system, reference)?);
        }

        if let Some(local_id) = building.find_first("IDENTIFIER_ID_LOC") {
            let system = require(building, "IDENTIFIER_ID_NAME", "IDENTIFIER_ID_LOC")?;
            element.push(self.external_reference(system, local_id)?);
        }

        for carrier in [EnergyCarrier::Electricity, EnergyCarrier::Thermal] {
            if let Some(series) = YearlySeries::from_building(building, carrier)? {
                element.push(self.energy_demand(carrier, &series)?);
            }
        }

        if let Some(usage) = building.find_first("USE_S") {
            let code = self.code_lists.usage.lookup(usage, id)?;
            element.push(self.coded("bldg:usage", USAGE_CODE_SPACE, code)?);
        }

        if let Some(year) = building.find_first("DATE_C_BEGINNING") {
            element.push(doc.text_element("bldg:yearOfConstruction", year)?);
        }

        if let Some(roof) = building.find_first("ROOF_TYPE") {
            let code = self.code_lists.roof_type.lookup(roof, id)?;
            element.push(self.coded("bldg:roofType", ROOF_TYPE_CODE_SPACE, code)?);
        }

        if let Some(floors) = building.find_first("FLOORS") {
            for storey in self.storeys(building, floors)? {
                element.push(storey);
            }
        }

        element.push(self.footprint(building)?);

        if let Some(begin) = building.find_first("DATE_R_BEGINNING") {
            element.push(self.refurbishment_measure(building, begin)?);
        }

        if let Some(rating) = building.find_first("ENERGYPERFORMANCE_PERF_CLASS") {
            element.push(self.certification(building, rating)?);
        }

        if let Some(value) = building.find_first("HEIGHT_HEIGHT_VAL") {
            element.push(self.height_above_ground(building, value)?);
        }

        if let Some(volume) = building.find_first("VOLUME_VALUE") {
            element.push(self.typed_value(
                "energy:volume",
                "energy:VolumeType",
                "grossVolume",
                "m3",
                volume,
            )?);
        }

        if let Some(volume) = building.find_first("ENERGYPERF_VOLUME_VALUE") {
            element.push(self.typed_value(
                "energy:volume",
                "energy:VolumeType",
                "energyReferenceVolume",
                "m3",
                volume,
            )?);
        }

        if let Some(area) = building.find_first("SURFACE_VALUE") {
            element.push(self.typed_value(
                "energy:floorArea",
                "energy:FloorArea",
                "grossFloorArea",
                "m2",
                area,
            )?);
        }

        if let Some(building_type) = building.find_first("BUILDINGTYPE") {
            let code = self.code_lists.building_type.lookup(building_type, id)?;
            element.push(self.coded("energy:buildingType", BUILDING_TYPE_CODE_SPACE, code)?);
        }

        Ok(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_storey_heights_repeat_floor_height() {
        assert_eq!(storey_heights("3.0", 3), "3.0,3.0,3.0");
        assert_eq!(storey_heights("2.7", 1), "2.7");
        assert_eq!(storey_heights("2.7", 0), "");
    }

    #[test]
    fn test_default_height_reference_is_case_insensitive() {
        let lists = CityGmlCodeLists::default();
        assert_eq!(lists.height_reference.get("generalroof"), Some("generalRoof"));
        assert_eq!(lists.height_reference.get("TopOfConstruction"), Some("topOfConstruction"));
        assert_eq!(
            lists.height_reference.get("bottomThermalBoundary"),
            Some("bottomThermalBoundary")
        );
        assert_eq!(lists.building_type.get("rowhouse"), Some("RowHouse"));
        assert!(lists.roof_type.is_empty());
    }

    #[test]
    fn test_carrier_names() {
        assert_eq!(EnergyCarrier::Electricity.carrier_type(), "Electricity");
        assert_eq!(EnergyCarrier::Thermal.carrier_type(), "HotWater");
        assert_eq!(EnergyCarrier::Thermal.source_name(), "thermal");
    }

    #[test]
    fn test_values_text() {
        let series = YearlySeries {
            first_year: 2015,
            last_year: 2017,
            values: vec!["10".into(), "12".into(), "11".into()],
            uom: "kwh".into(),
        };
        assert_eq!(series.values_text(), "10 12 11");
    }

    proptest! {
        #[test]
        fn prop_storey_heights_has_one_entry_per_floor(
            height in "[0-9]{1,2}\\.[0-9]",
            floors in 1usize..40
        ) {
            let text = storey_heights(&height, floors);
            let parts: Vec<&str> = text.split(',').collect();
            prop_assert_eq!(parts.len(), floors);
            prop_assert!(parts.iter().all(|p| *p == height));
        }
    }
}
