//! ZIP archive helper utilities for xlsx packages
//! Provides lookups of package parts and XML readers over them

use crate::helpers::xml::XmlReader;
use crate::spreadsheet::SpreadsheetError;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use std::io::Write;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipArchive;
use zip::ZipWriter;

/// Helper trait for reading parts out of a ZIP archive
pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Gets a file from the ZIP archive by name (case-insensitive, path separator agnostic)
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, SpreadsheetError>;

    /// Creates an XML reader for a file within the ZIP archive
    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, SpreadsheetError>;
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    /// Gets a file from the ZIP archive by name with case-insensitive matching
    /// and path separator normalization (backslash to forward slash)
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, SpreadsheetError> {
        let pattern = name.replace('\\', "/");
        let path = self.file_names()
            .find(|file_name| pattern.eq_ignore_ascii_case(*file_name))
            .map(|file_name| file_name.to_owned());
        match path.map(|file_name| self.by_name(&file_name)).transpose() {
            Ok(Some(file)) => Ok(Some(file)),
            Ok(None) | Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error)?,
        }
    }

    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, SpreadsheetError> {
        let reader = self
            .file(name)?
            .map(|file| XmlReader::new(BufReader::new(file)));
        Ok(reader)
    }
}

/// Helper trait for adding deflated parts to a ZIP archive
pub(crate) trait ZipWriterHelper {
    /// Writes one complete part under the given path
    fn put(&mut self, name: &str, content: &[u8]) -> Result<(), SpreadsheetError>;
}

impl<W: Write + Seek> ZipWriterHelper for ZipWriter<W> {
    fn put(&mut self, name: &str, content: &[u8]) -> Result<(), SpreadsheetError> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.start_file(name, options)?;
        self.write_all(content)?;
        Ok(())
    }
}
