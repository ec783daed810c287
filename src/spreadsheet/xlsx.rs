use crate::dataset::Dataset;
use crate::dataset::SourceKind;
use crate::helpers::xml::match_xml_events;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::excel;
use crate::spreadsheet::excel::load_relationships;
use crate::spreadsheet::excel::Package;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::SpreadsheetError;
use log::debug;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::io::BufRead;

// XML tag names for parsing Excel XLSX format
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");   // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");       // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t");                  // Text content within strings
const TAG_SHEET: QName = QName(b"sheet");             // Worksheet definition
const TAG_ROW: QName = QName(b"row");                 // Row in worksheet
const TAG_CELL: QName = QName(b"c");                  // Cell in worksheet
const TAG_INLINE_STRING: QName = QName(b"is");        // Inline string value
const TAG_VALUE: QName = QName(b"v");                 // Cell value content

/// Decodes the first worksheet of an xlsx payload into a dataset.
///
/// The first populated row supplies the column names; every following row
/// with at least one value becomes a [`Row`](crate::dataset::Row).
///
/// # Arguments
/// * `bytes` - Raw xlsx payload
/// * `label` - Provenance label stored on the dataset
/// * `kind` - Source the payload came from
///
/// # Errors
/// Fails when the payload is not a readable xlsx package.
pub fn decode(bytes: &[u8], label: &str, kind: SourceKind) -> Result<Dataset, SpreadsheetError> {
    let mut spreadsheet = XlsxSpreadsheet::open(bytes, label)?;
    let shared_strings = spreadsheet.load_shared_strings()?;
    let sheet = spreadsheet.read_first_sheet()?;
    debug!(
        "Decoded sheet '{}' of '{}': {} cells, {} shared strings",
        sheet.name,
        label,
        sheet.cells.len(),
        shared_strings.len()
    );
    let rows = sheet.into_rows(&shared_strings)?;
    Ok(Dataset::new(rows, label, kind))
}

/// Represents an xlsx package opened from memory
pub(crate) struct XlsxSpreadsheet<'a> {
    /// Provenance label of the payload
    pub(crate) name: String,
    /// ZIP archive containing the package parts
    zip: Package<'a>,
    /// Worksheets in workbook order as (name, zip_path) pairs
    sheets: Vec<(String, String)>,
}

impl<'a> XlsxSpreadsheet<'a> {
    /// Opens an xlsx payload and reads its workbook structure
    ///
    /// # Arguments
    /// * `bytes` - Raw payload
    /// * `name` - Label used in error messages
    ///
    /// # Returns
    /// Result containing the initialized XlsxSpreadsheet or an error
    pub(crate) fn open(bytes: &'a [u8], name: &str) -> Result<XlsxSpreadsheet<'a>, SpreadsheetError> {
        let mut zip = excel::open(bytes, name)?;
        let sheets = load_workbook(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(name.to_owned()))?
        }
        Ok(XlsxSpreadsheet {
            name: name.to_owned(),
            zip,
            sheets,
        })
    }

    /// Loads the shared string table; a package without one yields an empty table
    pub(crate) fn load_shared_strings(&mut self) -> Result<Vec<String>, SpreadsheetError> {
        let mut shared_strings = Vec::<String>::new();
        let mut reader = match self.zip.xml_reader("xl/sharedStrings.xml")? {
            Some(reader) => reader,
            None => return Ok(shared_strings),
        };

        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
                let string = read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?;
                shared_strings.push(string);
            }
        });
        Ok(shared_strings)
    }

    /// Reads every populated cell of the first worksheet in workbook order
    pub(crate) fn read_first_sheet(&mut self) -> Result<Sheet, SpreadsheetError> {
        let (sheet_name, zip_path) = self.sheets
            .first()
            .cloned()
            .ok_or_else(|| SpreadsheetError::SpreadsheetEmptyError(self.name.to_owned()))?;
        let mut reader = self.zip.xml_reader(&zip_path)?
            .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_owned()))?;

        let mut sheet = Sheet::new(&sheet_name);
        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut row = 0usize;
        let mut col = 0usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_ROW => {
                if let Some(index) = event.parse_attribute_value::<usize>("r")? {
                    row_count = index.saturating_sub(1);
                }
                col_count = 0;
            }
            Event::End(event) if event.name() == TAG_ROW => {
                row_count += 1;
            }
            Event::Start(event) if event.name() == TAG_CELL => {
                (row, col) = event.get_attribute_value("r")?
                    .and_then(|reference| reference_to_index(&reference))
                    .unwrap_or((row_count, col_count));
                col_count = col + 1;
                kind = event.get_attribute_value("t")?
                    .map(|t| CellType::parse(&t))
                    .unwrap_or(CellType::Number);
                value.clear();
            }
            Event::Start(event) if event.name() == TAG_INLINE_STRING => {
                value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
            }
            Event::Start(event) if event.name() == TAG_VALUE => {
                value = read_string_value(&mut reader, TAG_VALUE, true)?;
            }
            Event::End(event) if event.name() == TAG_CELL => {
                if !value.is_empty() {
                    sheet.push(Cell {
                        row,
                        col,
                        kind,
                        value: std::mem::take(&mut value),
                    });
                }
                kind = CellType::default();
            }
        });
        Ok(sheet)
    }
}

/// Loads worksheet names and part paths from `xl/workbook.xml`, in workbook order
fn load_workbook(zip: &mut Package<'_>) -> Result<Vec<(String, String)>, SpreadsheetError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.get_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.get_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(&*id) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
    });
    Ok(sheets)
}

/// Reads a string value up to `end_tag`, skipping phonetic runs
///
/// # Arguments
/// * `reader` - XML reader positioned at the start of the string content
/// * `end_tag` - XML tag that marks the end of the string content
/// * `is_text_content` - Whether to treat the content as text by default
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, SpreadsheetError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_bytes_text(&event)?,
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}
