//! Microsoft Office Excel package helpers
use crate::helpers::xml::match_xml_events;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Cursor;
use zip::ZipArchive;

/// An xlsx package held in memory
pub(crate) type Package<'a> = ZipArchive<Cursor<&'a [u8]>>;

/// XML tag name for relationship elements in Excel files
const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// Magic number of OLE compound files (legacy .xls and encrypted OOXML packages)
const CFB_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Opens an in-memory payload as an xlsx zip package
///
/// # Arguments
/// * `bytes` - Raw payload
/// * `label` - Provenance label used in error messages
///
/// # Returns
/// Zip archive handle over the payload
pub(super) fn open<'a>(bytes: &'a [u8], label: &str) -> Result<Package<'a>, SpreadsheetError> {
    // Password protected packages are wrapped in a compound file
    if is_compound_file(bytes) {
        Err(SpreadsheetError::UnsupportedContainerError(label.to_owned()))?;
    }
    Ok(ZipArchive::new(Cursor::new(bytes))?)
}

/// Loads worksheet relationships from an Excel package
///
/// # Arguments
/// * `zip` - Zip archive handle
/// * `path` - Path to the relationships XML file within the archive
///
/// # Returns
/// Mapping of relationship IDs to worksheet paths
pub(super) fn load_relationships(zip: &mut Package<'_>, path: &str) -> Result<HashMap<String, String>, SpreadsheetError> {
    let mut reader = zip.xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::FileError(path.to_string()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            // Only worksheet relationships
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Normalizes a relationship target to its location within the zip archive
pub(crate) fn to_zip_path(path: Cow<'_, str>) -> String {
    if let Some(path) = path.strip_prefix("/xl/") {
        format!("xl/{path}")
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

/// Checks whether the payload is an OLE compound file rather than a zip package
fn is_compound_file(bytes: &[u8]) -> bool {
    bytes.starts_with(&CFB_SIGNATURE)
}
