//! Minimal single-sheet xlsx writer used for exporting the live dataset.

use crate::dataset::CellValue;
use crate::dataset::Dataset;
use crate::helpers::xml::XmlWriterHelper;
use crate::helpers::zip::ZipWriterHelper;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::SpreadsheetError;
use log::debug;
use quick_xml::events::BytesDecl;
use quick_xml::events::Event;
use quick_xml::Writer;
use std::io::Cursor;
use zip::ZipWriter;

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PACKAGE_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const REL_OFFICE_DOCUMENT: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_WORKSHEET: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const CT_WORKBOOK: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
const CT_WORKSHEET: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const CT_RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";

/// Excel caps sheet names at 31 characters
const MAX_SHEET_NAME_LEN: usize = 31;

/// Encodes a dataset as an xlsx package with a single worksheet.
///
/// The header row holds the column names of the first row; body rows follow
/// in dataset order. Text is written as inline strings, numbers as numeric
/// cells, and empty cells are left out. Empty text is left out too, so it
/// decodes back as [`CellValue::Empty`].
///
/// # Errors
/// Returns [`SpreadsheetError::NothingToExport`] for an empty dataset.
pub fn encode(dataset: &Dataset, sheet_name: &str) -> Result<Vec<u8>, SpreadsheetError> {
    if dataset.is_empty() {
        Err(SpreadsheetError::NothingToExport)?;
    }
    let sheet_name = sanitize_sheet_name(sheet_name);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.put("[Content_Types].xml", &content_types()?)?;
    zip.put("_rels/.rels", &package_relationships()?)?;
    zip.put("xl/workbook.xml", &workbook(&sheet_name)?)?;
    zip.put("xl/_rels/workbook.xml.rels", &workbook_relationships()?)?;
    zip.put("xl/worksheets/sheet1.xml", &worksheet(dataset)?)?;
    let bytes = zip.finish()?.into_inner();

    debug!(
        "Encoded {} rows of '{}' into sheet '{}' ({} bytes)",
        dataset.len(),
        dataset.label(),
        sheet_name,
        bytes.len()
    );
    Ok(bytes)
}

/// Creates an XML writer positioned after the standard declaration
fn xml_writer() -> Result<Writer<Vec<u8>>, SpreadsheetError> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    Ok(writer)
}

fn content_types() -> Result<Vec<u8>, SpreadsheetError> {
    let mut writer = xml_writer()?;
    writer.open_tag("Types", &[("xmlns", NS_CONTENT_TYPES)])?;
    writer.empty_tag("Default", &[("Extension", "rels"), ("ContentType", CT_RELATIONSHIPS)])?;
    writer.empty_tag("Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;
    writer.empty_tag("Override", &[("PartName", "/xl/workbook.xml"), ("ContentType", CT_WORKBOOK)])?;
    writer.empty_tag("Override", &[("PartName", "/xl/worksheets/sheet1.xml"), ("ContentType", CT_WORKSHEET)])?;
    writer.close_tag("Types")?;
    Ok(writer.into_inner())
}

fn package_relationships() -> Result<Vec<u8>, SpreadsheetError> {
    let mut writer = xml_writer()?;
    writer.open_tag("Relationships", &[("xmlns", NS_PACKAGE_RELATIONSHIPS)])?;
    writer.empty_tag("Relationship", &[
        ("Id", "rId1"),
        ("Type", REL_OFFICE_DOCUMENT),
        ("Target", "xl/workbook.xml"),
    ])?;
    writer.close_tag("Relationships")?;
    Ok(writer.into_inner())
}

fn workbook(sheet_name: &str) -> Result<Vec<u8>, SpreadsheetError> {
    let mut writer = xml_writer()?;
    writer.open_tag("workbook", &[("xmlns", NS_MAIN), ("xmlns:r", NS_RELATIONSHIPS)])?;
    writer.open_tag("sheets", &[])?;
    writer.empty_tag("sheet", &[("name", sheet_name), ("sheetId", "1"), ("r:id", "rId1")])?;
    writer.close_tag("sheets")?;
    writer.close_tag("workbook")?;
    Ok(writer.into_inner())
}

fn workbook_relationships() -> Result<Vec<u8>, SpreadsheetError> {
    let mut writer = xml_writer()?;
    writer.open_tag("Relationships", &[("xmlns", NS_PACKAGE_RELATIONSHIPS)])?;
    writer.empty_tag("Relationship", &[
        ("Id", "rId1"),
        ("Type", REL_WORKSHEET),
        ("Target", "worksheets/sheet1.xml"),
    ])?;
    writer.close_tag("Relationships")?;
    Ok(writer.into_inner())
}

fn worksheet(dataset: &Dataset) -> Result<Vec<u8>, SpreadsheetError> {
    let columns = dataset.columns();
    let dimension = format!("A1:{}", index_to_reference(dataset.len(), columns.len().saturating_sub(1)));

    let mut writer = xml_writer()?;
    writer.open_tag("worksheet", &[("xmlns", NS_MAIN)])?;
    writer.empty_tag("dimension", &[("ref", dimension.as_str())])?;
    writer.open_tag("sheetData", &[])?;

    write_row(&mut writer, 0, columns.iter().map(|name| CellValue::from(*name)))?;
    for (index, row) in dataset.rows().iter().enumerate() {
        // Rows share the header's columns, so values line up by position
        let values = columns
            .iter()
            .map(|column| row.get(column).cloned().unwrap_or(CellValue::Empty));
        write_row(&mut writer, index + 1, values)?;
    }

    writer.close_tag("sheetData")?;
    writer.close_tag("worksheet")?;
    Ok(writer.into_inner())
}

/// Writes one `<row>`; `row` is 0-based
fn write_row(
    writer: &mut Writer<Vec<u8>>,
    row: usize,
    values: impl Iterator<Item = CellValue>,
) -> Result<(), SpreadsheetError> {
    let number = (row + 1).to_string();
    writer.open_tag("row", &[("r", number.as_str())])?;
    for (col, value) in values.enumerate() {
        let reference = index_to_reference(row, col);
        match value {
            CellValue::Number(number) if number.is_finite() => {
                writer.open_tag("c", &[("r", reference.as_str())])?;
                writer.open_tag("v", &[])?;
                writer.text(&number.to_string())?;
                writer.close_tag("v")?;
                writer.close_tag("c")?;
            }
            CellValue::Empty => (),
            CellValue::Text(ref text) if text.is_empty() => (),
            value => {
                writer.open_tag("c", &[("r", reference.as_str()), ("t", "inlineStr")])?;
                writer.open_tag("is", &[])?;
                writer.open_tag("t", &[("xml:space", "preserve")])?;
                writer.text(&value.to_string())?;
                writer.close_tag("t")?;
                writer.close_tag("is")?;
                writer.close_tag("c")?;
            }
        }
    }
    writer.close_tag("row")?;
    Ok(())
}

/// Strips characters Excel rejects in sheet names and applies the length cap
fn sanitize_sheet_name(name: &str) -> String {
    let name: String = name
        .chars()
        .filter(|c| !matches!(c, ':' | '\\' | '/' | '?' | '*' | '[' | ']'))
        .take(MAX_SHEET_NAME_LEN)
        .collect();
    let name = name.trim_matches('\'');
    if name.trim().is_empty() {
        "Sheet1".to_owned()
    } else {
        name.to_owned()
    }
}
