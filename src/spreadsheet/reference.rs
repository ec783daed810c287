//! Conversions between Excel-style cell references and 0-based indexes.

use regex::Regex;
use std::sync::LazyLock;

static CELL_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?(\d+)$").expect("Hardcode regex pattern"));

/// Parses column letters ("A", "AB") into a 0-based column index.
pub(crate) fn col_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0usize, |index, letter| {
        let digit = letter.to_ascii_uppercase() as usize;
        if letter.is_ascii_alphabetic() {
            Some(index * 26 + digit - 'A' as usize + 1)
        } else {
            None
        }
    }).map(|index| index - 1)
}

/// Parses a 1-based row number into a 0-based row index.
pub(crate) fn row_to_index(digits: &str) -> Option<usize> {
    digits.parse::<usize>().ok().filter(|row| *row > 0).map(|row| row - 1)
}

/// Parses a cell reference such as "B12" or "$B$12" into (row, col).
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let captures = CELL_REFERENCE.captures(reference.trim())?;
    let col = col_to_index(captures.get(1)?.as_str())?;
    let row = row_to_index(captures.get(2)?.as_str())?;
    Some((row, col))
}

/// Converts 0-based (row, col) into an Excel-style reference in upper case.
pub(crate) fn index_to_reference(row: usize, col: usize) -> String {
    let mut column = col + 1;
    let mut reference = String::new();
    while column > 0 {
        column -= 1;
        let digit = char::from(b'A' + (column % 26) as u8);
        column /= 26;
        reference.insert(0, digit);
    }
    reference.push_str(&(row + 1).to_string());
    reference
}
