use crate::dataset::CellValue;
use crate::dataset::Row;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::SpreadsheetError;
use log::debug;
use std::collections::BTreeMap;
use std::collections::HashSet;

/// Column name given to a header cell with no value
const EMPTY_HEADER: &str = "__EMPTY";

/// Represents the populated cells of one worksheet.
pub(crate) struct Sheet {
    /// Sheet name
    pub(crate) name: String,
    /// All populated cells, in document order
    pub(crate) cells: Vec<Cell>,
    /// Actual data range (determined from cell data)
    pub(crate) row_lower_bound: Option<usize>,
    pub(crate) row_upper_bound: Option<usize>,
    pub(crate) col_lower_bound: Option<usize>,
    pub(crate) col_upper_bound: Option<usize>,
}

impl Sheet {
    pub(super) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            cells: Vec::new(),
            row_lower_bound: None,
            row_upper_bound: None,
            col_lower_bound: None,
            col_upper_bound: None,
        }
    }

    /// Adds a cell to the sheet, updating the data range.
    pub(super) fn push(&mut self, cell: Cell) {
        self.update_bound(cell.row, cell.col);
        self.cells.push(cell);
    }

    fn update_bound(&mut self, row: usize, col: usize) {
        if self.row_lower_bound.map(|row_lower_bound| row < row_lower_bound).unwrap_or(true) {
            self.row_lower_bound = Some(row);
        }
        if self.row_upper_bound.map(|row_upper_bound| row_upper_bound < row).unwrap_or(true) {
            self.row_upper_bound = Some(row);
        }
        if self.col_lower_bound.map(|col_lower_bound| col < col_lower_bound).unwrap_or(true) {
            self.col_lower_bound = Some(col);
        }
        if self.col_upper_bound.map(|col_upper_bound| col_upper_bound < col).unwrap_or(true) {
            self.col_upper_bound = Some(col);
        }
    }

    /// Turns the sheet into dataset rows.
    ///
    /// The first populated row is the header; columns span the populated
    /// column range. Empty header cells are named `__EMPTY`, repeated names
    /// get `_1`, `_2`, ... suffixes, and data rows without any value are
    /// dropped.
    pub(crate) fn into_rows(self, shared_strings: &[String]) -> Result<Vec<Row>, SpreadsheetError> {
        let (Some(header_row), Some(col_lower), Some(col_upper)) =
            (self.row_lower_bound, self.col_lower_bound, self.col_upper_bound)
        else {
            return Ok(Vec::new());
        };

        let mut table = BTreeMap::<usize, Vec<CellValue>>::new();
        let width = col_upper - col_lower + 1;
        for cell in &self.cells {
            let value = cell
                .to_value(shared_strings)
                .inspect_err(|error| debug!("Cell {} of '{}' is unreadable: {error}", cell.reference(), self.name))?;
            let record = table
                .entry(cell.row)
                .or_insert_with(|| vec![CellValue::Empty; width]);
            record[cell.col - col_lower] = value;
        }

        let header = table.remove(&header_row).unwrap_or_default();
        let columns = header_names(&header);

        let rows = table
            .into_values()
            .filter(|record| record.iter().any(|value| !value.is_empty()))
            .map(|record| Row::new(columns.iter().cloned().zip(record).collect()))
            .collect();
        Ok(rows)
    }
}

/// Builds unique column names from the header cells.
fn header_names(header: &[CellValue]) -> Vec<String> {
    let mut used = HashSet::<String>::new();
    header
        .iter()
        .map(|value| {
            let base = match value {
                CellValue::Empty => EMPTY_HEADER.to_owned(),
                value => value.to_string(),
            };
            let mut name = base.clone();
            let mut counter = 0usize;
            while used.contains(&name) {
                counter += 1;
                name = format!("{base}_{counter}");
            }
            used.insert(name.clone());
            name
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::CellType;

    fn push(sheet: &mut Sheet, row: usize, col: usize, value: &str) {
        sheet.push(Cell {
            row,
            col,
            kind: CellType::InlineString,
            value: value.to_owned(),
        });
    }

    #[test]
    fn sheet_initial() {
        let sheet = Sheet::new("Sheet1");

        assert!(sheet.cells.is_empty());
        assert_eq!(sheet.row_lower_bound, None);
        assert_eq!(sheet.col_upper_bound, None);
        assert!(sheet.into_rows(&[]).unwrap().is_empty());
    }

    #[test]
    fn sheet_update() {
        let mut sheet = Sheet::new("Sheet1");
        push(&mut sheet, 1, 1, "a");
        push(&mut sheet, 1, 3, "b");
        push(&mut sheet, 3, 1, "c");
        push(&mut sheet, 3, 3, "d");

        assert_eq!(sheet.cells.len(), 4);
        assert_eq!(sheet.row_lower_bound, Some(1));
        assert_eq!(sheet.row_upper_bound, Some(3));
        assert_eq!(sheet.col_lower_bound, Some(1));
        assert_eq!(sheet.col_upper_bound, Some(3));
    }

    #[test]
    fn sheet_rows_fill_missing_cells() {
        let mut sheet = Sheet::new("Sheet1");
        push(&mut sheet, 1, 1, "MILL COIL NO");
        push(&mut sheet, 1, 3, "GRADE");
        push(&mut sheet, 2, 1, "C100");
        push(&mut sheet, 4, 3, "S355");

        let rows = sheet.into_rows(&[]).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].columns().collect::<Vec<_>>(), vec!["MILL COIL NO", "__EMPTY", "GRADE"]);
        assert_eq!(rows[0].get("MILL COIL NO"), Some(&CellValue::from("C100")));
        assert_eq!(rows[0].get("GRADE"), Some(&CellValue::Empty));
        assert_eq!(rows[1].get("MILL COIL NO"), Some(&CellValue::Empty));
        assert_eq!(rows[1].get("GRADE"), Some(&CellValue::from("S355")));
    }

    #[test]
    fn header_names_are_unique() {
        let header = vec![
            CellValue::from("Name"),
            CellValue::Empty,
            CellValue::from("Name"),
            CellValue::Empty,
            CellValue::Number(7.0),
        ];
        assert_eq!(
            header_names(&header),
            vec!["Name", "__EMPTY", "Name_1", "__EMPTY_1", "7"]
        );
    }
}
