//! # Spreadsheet Codec
//!
//! Reads the first worksheet of an Excel 2007+ (`.xlsx`) package into a
//! [`Dataset`](crate::dataset::Dataset) and writes a dataset back out as a
//! single-sheet package. Parts are read straight from the zip container with
//! a streaming XML reader; nothing beyond the workbook, its relationships,
//! the shared string table and the first sheet is touched.

use crate::helpers::xml::XmlError;
use thiserror::Error;

pub(crate) mod cell;
pub(crate) mod excel;
pub(crate) mod reference;
pub(crate) mod sheet;
pub mod writer;
pub mod xlsx;

pub use writer::encode;
pub use xlsx::decode;

/// Errors raised while decoding or encoding a spreadsheet payload.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] XmlError),

    // Package content errors
    #[error("Spreadsheet '{0}' is password protected or in a legacy format")]
    UnsupportedContainerError(String),

    #[error("Missing part '{0}' in spreadsheet package")]
    FileError(String),

    #[error("Spreadsheet '{0}' has no sheets")]
    SpreadsheetEmptyError(String),

    #[error("Shared string index {0} is out of range")]
    SharedStringError(usize),

    #[error("No Excel data to download")]
    NothingToExport,
}
