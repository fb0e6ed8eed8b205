//! Utilities for building and parsing Excel-style cell references.
//!
//! Columns are 0-indexed (`0 => "A"`), rows are 1-based row numbers as they
//! appear in the reference text (`"B3"` is column 1, row 3).

use crate::error::{Result, XlgenError};

/// Number of columns in a worksheet (`A` through `XFD`).
pub const MAX_COLUMNS: u32 = 16_384;

/// Number of rows in a worksheet.
pub const MAX_ROWS: u32 = 1_048_576;

const ALPHABET_LEN: u32 = 26;

/// Convert a 0-indexed column number to its letters (`0 => "A"`, `26 => "AA"`).
///
/// Bijective base-26: take `col % 26` as the least significant letter, then
/// continue with `col / 26 - 1` until exhausted.
pub fn col_to_letter(col: u32) -> String {
    let mut letters = Vec::with_capacity(3);
    let mut n = u64::from(col) + 1;
    while n > 0 {
        let rem = (n - 1) % u64::from(ALPHABET_LEN);
        // rem < 26, always a valid ASCII offset
        letters.push(char::from(b'A' + u8::try_from(rem).unwrap_or(0)));
        n = (n - 1) / u64::from(ALPHABET_LEN);
    }
    letters.iter().rev().collect()
}

/// Convert column letters back to a 0-indexed column number (case-insensitive).
pub fn letter_to_col(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        let digit = u32::from(b.to_ascii_uppercase() - b'A') + 1;
        col = col.checked_mul(ALPHABET_LEN)?.checked_add(digit)?;
    }
    Some(col - 1)
}

/// Build a cell reference like `"B3"` from a 0-indexed column and a 1-based row.
pub fn cell_reference(col: u32, row: u32) -> String {
    format!("{}{}", col_to_letter(col), row)
}

/// Parse a cell reference like `"B3"` or `"$B$3"` into `(col, row)`:
/// 0-indexed column and 1-based row.
///
/// Letters must precede digits; row 0 is rejected.
pub fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    let trimmed = cell_ref.trim();
    let split = trimmed
        .char_indices()
        .find(|(_, ch)| ch.is_ascii_digit())
        .map(|(idx, _)| idx)?;
    let (letters, digits) = trimmed.split_at(split);
    let col = letter_to_col(letters.trim_matches('$'))?;
    let digits = digits.strip_prefix('$').unwrap_or(digits);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((col, row))
}

/// Check that a coordinate pair addresses a cell inside the worksheet grid.
pub fn validate_position(col: u32, row: u32) -> Result<()> {
    if row == 0 || row > MAX_ROWS {
        return Err(XlgenError::CellRef(format!(
            "row {row} is outside 1..={MAX_ROWS}"
        )));
    }
    if col >= MAX_COLUMNS {
        return Err(XlgenError::CellRef(format!(
            "column {col} is outside 0..{MAX_COLUMNS}"
        )));
    }
    Ok(())
}
