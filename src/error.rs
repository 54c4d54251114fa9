//! Error types for GML translation
//!
//! Every failure aborts the whole conversion run; there is no per-building
//! recovery. Errors raised while mapping a building name the building
//! identifier and the source attribute involved.
//!
//! # Error Codes
//!
//! Error codes follow the pattern: `E<category><number>`
//!
//! Categories:
//! - **E1xxx**: Loading and output I/O errors
//! - **E2xxx**: XML structure and naming errors
//! - **E3xxx**: Mapping errors raised while translating a building
//!
//! ## Common Error Codes
//!
//! - `E1001`: Source could not be fetched
//! - `E1002`: Unknown input mode
//! - `E1003`: I/O error while writing output
//! - `E2001`: Source is not well-formed XML
//! - `E2002`: Feature member without identifier
//! - `E2003`: Unknown namespace prefix
//! - `E2004`: XML writing error
//! - `E3001`: Code-list lookup failure
//! - `E3002`: Dependent field missing
//! - `E3003`: Mandatory field missing
//! - `E3004`: Energy carrier mismatch
//! - `E3005`: Non-contiguous yearly series
//! - `E3006`: Source value could not be interpreted

use std::io;
use thiserror::Error;

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading, translating or writing documents
#[derive(Error, Debug)]
pub enum Error {
    /// The source byte stream could not be fetched
    ///
    /// **Error Code**: E1001
    ///
    /// **Common Causes**:
    /// - File not found or not readable
    /// - Network location unreachable or answering with an error status
    /// - Network support compiled out (`network` feature disabled)
    #[error("[E1001] Source unreadable: {location}: {reason}")]
    SourceUnreadable {
        /// Path or URL that was requested
        location: String,
        /// Underlying cause
        reason: String,
    },

    /// The input mode is neither `file` nor `network`
    ///
    /// **Error Code**: E1002
    #[error("[E1002] Invalid input mode '{0}': expected 'file' or 'url'")]
    InvalidMode(String),

    /// I/O error while writing the output document
    ///
    /// **Error Code**: E1003
    #[error("[E1003] I/O error: {0}")]
    Io(#[from] io::Error),

    /// The source could not be parsed as XML
    ///
    /// **Error Code**: E2001
    ///
    /// **Common Causes**:
    /// - Truncated download
    /// - Unclosed tags or invalid characters
    /// - DTD declarations, which are rejected
    #[error("[E2001] Malformed source: {0}")]
    MalformedSource(String),

    /// A feature member has no `GML_BUILDINGS_CEG/UUID` value
    ///
    /// **Error Code**: E2002
    #[error("[E2002] Feature member #{index} has no building identifier")]
    MissingIdentifier {
        /// Zero-based position of the feature member in the document
        index: usize,
    },

    /// A `prefix:local` token used a prefix absent from the namespace table
    ///
    /// **Error Code**: E2003
    #[error("[E2003] Unknown namespace prefix '{prefix}' in '{token}'")]
    UnknownPrefix {
        /// The prefix that was not found
        prefix: String,
        /// The full token being resolved
        token: String,
    },

    /// XML serialization failed
    ///
    /// **Error Code**: E2004
    #[error("[E2004] XML writing error: {0}")]
    XmlWrite(String),

    /// A source term has no entry in the target code list
    ///
    /// **Error Code**: E3001
    ///
    /// **Suggestions**:
    /// - Several built-in code lists are known to be incomplete; extend the
    ///   table passed to the builder with the missing term
    #[error("[E3001] Building '{building}': term '{term}' not found in code list '{code_list}'")]
    CodeListLookupFailure {
        /// Name of the code list
        code_list: String,
        /// The normalized term that was looked up
        term: String,
        /// Identifier of the building being translated
        building: String,
    },

    /// A field required by another present field is absent
    ///
    /// **Error Code**: E3002
    #[error("[E3002] Building '{building}': '{attribute}' is required when '{trigger}' is present")]
    MissingDependentField {
        /// Identifier of the building being translated
        building: String,
        /// The absent attribute
        attribute: String,
        /// The present attribute that requires it
        trigger: String,
    },

    /// A field that every target building needs is absent
    ///
    /// **Error Code**: E3003
    #[error("[E3003] Building '{building}': mandatory attribute '{attribute}' is missing")]
    MissingMandatoryField {
        /// Identifier of the building being translated
        building: String,
        /// The absent attribute
        attribute: String,
    },

    /// The energy source field does not name the expected carrier
    ///
    /// **Error Code**: E3004
    #[error("[E3004] Building '{building}': '{expected}' is expected for {attribute} instead of '{found}'")]
    EnergyCarrierMismatch {
        /// Identifier of the building being translated
        building: String,
        /// The source attribute that was checked
        attribute: String,
        /// Expected carrier name
        expected: String,
        /// Carrier name found in the source
        found: String,
    },

    /// The years of a consumption series have a gap
    ///
    /// **Error Code**: E3005
    #[error("[E3005] Building '{building}': years of {attribute} have to be consecutive, got {years:?}")]
    NonContiguousYears {
        /// Identifier of the building being translated
        building: String,
        /// The year attribute of the series
        attribute: String,
        /// The sorted years found
        years: Vec<i32>,
    },

    /// A source value could not be interpreted (e.g. a non-numeric year)
    ///
    /// **Error Code**: E3006
    #[error("[E3006] Building '{building}': cannot interpret {attribute} value '{value}' as {expected}")]
    InvalidValue {
        /// Identifier of the building being translated
        building: String,
        /// The source attribute
        attribute: String,
        /// The offending value
        value: String,
        /// What the value should have been
        expected: String,
    },
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::MalformedSource(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::MalformedSource(format!("Attribute parsing failed: {}", err))
    }
}

impl Error {
    /// Create a SourceUnreadable error
    ///
    /// # Arguments
    /// * `location` - Path or URL that was requested
    /// * `reason` - Anything displayable describing the cause
    pub fn source_unreadable(location: &str, reason: impl std::fmt::Display) -> Self {
        Error::SourceUnreadable {
            location: location.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a MissingDependentField error
    pub fn missing_dependent(building: &str, attribute: &str, trigger: &str) -> Self {
        Error::MissingDependentField {
            building: building.to_string(),
            attribute: attribute.to_string(),
            trigger: trigger.to_string(),
        }
    }

    /// Create a MissingMandatoryField error
    pub fn missing_mandatory(building: &str, attribute: &str) -> Self {
        Error::MissingMandatoryField {
            building: building.to_string(),
            attribute: attribute.to_string(),
        }
    }

    /// Create an InvalidValue error
    ///
    /// # Example
    /// ```ignore
    /// Error::invalid_value("b-1", "FLOORS", "three", "an integer")
    /// ```
    pub fn invalid_value(building: &str, attribute: &str, value: &str, expected: &str) -> Self {
        Error::InvalidValue {
            building: building.to_string(),
            attribute: attribute.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Create an XmlWrite error
    pub fn xml_write(message: String) -> Self {
        Error::XmlWrite(message)
    }
}
