//! XML utilities for the SpreadsheetML parts of an xlsx package
//! Provides a reader wrapper, attribute/text helper traits and a small writer helper

use crate::spreadsheet::SpreadsheetError;
use quick_xml::escape::escape;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesEnd;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Reader;
use quick_xml::Writer;
use std::borrow::Cow;
use std::io::BufRead;
use std::io::Write;
use std::str::FromStr;
use thiserror::Error;

/// Errors specific to XML parsing operations
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),

    #[error("Parse attribute value '{0}' failed")]
    ParseAttributeValueError(String),
}

/// XML reader wrapper configured for spreadsheet parts
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    /// Creates a new XML reader; empty elements are expanded into start/end pairs
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);

        let buffer = Vec::with_capacity(1024);
        XmlReader { reader, buffer }
    }

    /// Reads the next XML event from the reader
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, SpreadsheetError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(SpreadsheetError::XmlError(error)),
        }
    }
}

/// Helper trait for XML attributes providing value extraction and parsing
pub(crate) trait XmlAttributeHelper<'a> {
    /// Gets the unescaped attribute value as a string
    fn get_value(&self) -> Result<Cow<'a, str>, SpreadsheetError>;

    /// Parses the attribute value to the specified type
    fn parse_value<T: FromStr>(&self) -> Result<T, SpreadsheetError>;
}

impl<'a> XmlAttributeHelper<'a> for Attribute<'a> {
    fn get_value(&self) -> Result<Cow<'a, str>, SpreadsheetError> {
        Ok(self.unescape_value()?)
    }

    fn parse_value<T: FromStr>(&self) -> Result<T, SpreadsheetError> {
        self.get_value()?
            .trim()
            .parse()
            .map_err(|_| match std::str::from_utf8(&self.value) {
                Ok(value) => SpreadsheetError::XmlHelperError(XmlError::ParseAttributeValueError(value.to_string())),
                Err(error) => SpreadsheetError::StringEncodingError(error),
            })
    }
}

/// Helper trait for XML nodes providing attribute access methods
pub(crate) trait XmlNodeHelper<'a> {
    /// Gets an attribute value by name
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, SpreadsheetError>;

    /// Parses an attribute value to the specified type
    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, SpreadsheetError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, SpreadsheetError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.get_value())
            .transpose()
    }

    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, SpreadsheetError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.parse_value())
            .transpose()
    }
}

/// Helper trait for building text content from XML events
pub(crate) trait XmlTextContextHelper {
    /// Appends text content from a BytesText event
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), SpreadsheetError>;

    /// Appends text content from a BytesRef event (entities and character references)
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), SpreadsheetError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), SpreadsheetError> {
        self.push_str(&text.xml_content()?);
        Ok(())
    }

    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), SpreadsheetError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = if let Some(hex) = number.strip_prefix('x') {
                u32::from_str_radix(hex, 16)?
            } else {
                number.parse::<u32>()?
            };
            if let Some(character) = std::char::from_u32(code) {
                self.push(character);
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::ParseEntityError(raw.to_string()))?;
        }

        Ok(())
    }
}

/// Helper trait for emitting SpreadsheetML elements
pub(crate) trait XmlWriterHelper {
    /// Writes a start tag with the given attributes (values are escaped)
    fn open_tag(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), SpreadsheetError>;

    /// Writes a self-closing tag with the given attributes
    fn empty_tag(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), SpreadsheetError>;

    /// Writes an end tag
    fn close_tag(&mut self, name: &str) -> Result<(), SpreadsheetError>;

    /// Writes escaped text content; `\r` goes out as a character reference
    fn text(&mut self, text: &str) -> Result<(), SpreadsheetError>;
}

impl<W: Write> XmlWriterHelper for Writer<W> {
    fn open_tag(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), SpreadsheetError> {
        let tag = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.write_event(Event::Start(tag))?;
        Ok(())
    }

    fn empty_tag(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), SpreadsheetError> {
        let tag = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.write_event(Event::Empty(tag))?;
        Ok(())
    }

    fn close_tag(&mut self, name: &str) -> Result<(), SpreadsheetError> {
        self.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<(), SpreadsheetError> {
        // Parsers normalize a raw CR to LF
        let escaped = escape(text).replace('\r', "&#13;");
        self.write_event(Event::Text(BytesText::from_escaped(escaped)))?;
        Ok(())
    }
}

/// Drives an `XmlReader` until EOF, dispatching each event to the given match arms
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}

pub(crate) use match_xml_events;
