use crate::dataset::CellValue;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::SpreadsheetError;

/// Types of cell data in a worksheet, taken from the `t` attribute of `<c>`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values stored as 0/1
    Boolean,
    /// Numeric values, including date-formatted serials
    Number,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// Inline strings and formula string results
    InlineString,
    /// Shared string table references
    SharedString,
    /// Error literals such as `#N/A`
    Error,
}

impl CellType {
    /// Maps the SpreadsheetML cell type attribute; absent or unknown types are numeric.
    pub(crate) fn parse(kind: &str) -> Self {
        match kind {
            "inlineStr" | "str" => Self::InlineString,
            "s" => Self::SharedString,
            "d" => Self::IsoDateTime,
            "b" => Self::Boolean,
            "e" => Self::Error,
            _ => Self::Number,
        }
    }
}

/// Represents a single cell in a worksheet with position, type, and raw value.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    /// Cell data type
    pub(crate) kind: CellType,
    /// Cell value as stored in the part
    pub(crate) value: String,
}

impl Cell {
    /// Returns the Excel-style cell reference (e.g., "A1", "B2").
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Converts cell value to boolean (1 = true, other = false).
    pub(crate) fn to_boolean(&self) -> bool {
        self.value.trim() == "1"
    }

    /// Converts cell value to double-precision floating point.
    pub(crate) fn to_double(&self) -> Result<f64, SpreadsheetError> {
        Ok(self.value.trim().parse::<f64>()?)
    }

    /// Resolves the raw value into a dataset cell value.
    ///
    /// Booleans become `TRUE`/`FALSE` text; error cells keep their literal.
    pub(crate) fn to_value(&self, shared_strings: &[String]) -> Result<CellValue, SpreadsheetError> {
        let value = match self.kind {
            CellType::Empty => CellValue::Empty,
            CellType::Boolean => CellValue::Text(if self.to_boolean() { "TRUE" } else { "FALSE" }.to_owned()),
            CellType::Number => CellValue::Number(self.to_double()?),
            CellType::SharedString => {
                let index = self.value.trim().parse::<usize>()?;
                let string = shared_strings
                    .get(index)
                    .ok_or(SpreadsheetError::SharedStringError(index))?;
                CellValue::Text(string.to_owned())
            }
            CellType::InlineString | CellType::IsoDateTime | CellType::Error => {
                CellValue::Text(self.value.to_owned())
            }
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(kind: CellType, value: &str) -> Cell {
        Cell {
            row: 1,
            col: 2,
            kind,
            value: value.to_owned(),
        }
    }

    #[test]
    fn parse_cell_type() {
        assert_eq!(CellType::parse("s"), CellType::SharedString);
        assert_eq!(CellType::parse("inlineStr"), CellType::InlineString);
        assert_eq!(CellType::parse("str"), CellType::InlineString);
        assert_eq!(CellType::parse("b"), CellType::Boolean);
        assert_eq!(CellType::parse("n"), CellType::Number);
    }

    #[test]
    fn resolve_values() {
        let shared = vec!["C100".to_owned(), "C101".to_owned()];
        assert_eq!(cell(CellType::SharedString, "1").to_value(&shared).unwrap(), CellValue::from("C101"));
        assert_eq!(cell(CellType::Number, "42").to_value(&shared).unwrap(), CellValue::Number(42.0));
        assert_eq!(cell(CellType::Boolean, "1").to_value(&shared).unwrap(), CellValue::from("TRUE"));
        assert_eq!(cell(CellType::Error, "#N/A").to_value(&shared).unwrap(), CellValue::from("#N/A"));
        assert_eq!(cell(CellType::Number, "").reference(), "C2");
    }

    #[test]
    fn resolve_invalid_values() {
        let shared = vec!["only".to_owned()];
        assert!(matches!(
            cell(CellType::SharedString, "5").to_value(&shared),
            Err(SpreadsheetError::SharedStringError(5))
        ));
        assert!(cell(CellType::Number, "abc").to_value(&shared).is_err());
    }
}
