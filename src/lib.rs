//! # citiengov-gml
//!
//! Translation of CitiEnGov building exports into standards-compliant GML.
//!
//! A CitiEnGov document scatters each building's data over several
//! `gml:featureMember` fragments that share a `UUID`. This crate groups them
//! into [`BuildingRecord`]s and maps every building onto one of two target
//! schemas:
//!
//! - **INSPIRE Buildings 2D** ([`InspireBuilder`])
//! - **CityGML 2.0 + Energy ADE** ([`CityGmlBuilder`])
//!
//! The mapping applies code-list lookups, splits multi-valued fields and
//! turns yearly consumption values into Energy ADE time series. Any
//! inconsistency in a building aborts the whole run.
//!
//! ## Example
//!
//! ```no_run
//! use citiengov_gml::{InspireBuilder, SourceDocument, SourceMode, TargetDocumentBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let source = SourceDocument::load("buildings.gml", SourceMode::File)?;
//! let mut builder = InspireBuilder::new()?;
//! builder.translate(source.into_buildings()?)?;
//! builder.write_to_file("buildings_inspire.gml")?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codelist;
pub mod error;
pub mod qname;
pub mod source;
pub mod target;
pub mod tree;
mod writer;

pub use codelist::CodeList;
pub use error::{Error, Result};
pub use qname::{NamespaceTable, QName};
pub use source::{BuildingRecord, Buildings, SourceDocument, SourceMode};
pub use target::{
    CityGmlBuilder, CityGmlCodeLists, InspireBuilder, InspireCodeLists, Standard,
    TargetDocument, TargetDocumentBuilder,
};
pub use tree::Element;

use std::path::Path;

/// Load a source document, translate it into `standard` and write the result
///
/// This is the whole conversion run in one call. Returns the number of
/// buildings written.
pub fn convert<P: AsRef<Path>>(
    input: &str,
    mode: SourceMode,
    output: P,
    standard: Standard,
) -> Result<usize> {
    let buildings = SourceDocument::load(input, mode)?.into_buildings()?;
    match standard {
        Standard::Inspire => run(InspireBuilder::new()?, buildings, output),
        Standard::CityGml => run(CityGmlBuilder::new()?, buildings, output),
    }
}

fn run<B: TargetDocumentBuilder, P: AsRef<Path>>(
    mut builder: B,
    buildings: Buildings,
    output: P,
) -> Result<usize> {
    let count = builder.translate(buildings)?;
    builder.write_to_file(output)?;
    Ok(count)
}
