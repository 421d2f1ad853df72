//! A1-style cell and range addresses.

use std::fmt;

use serde::Serialize;

/// Maximum number of rows in a worksheet (Excel 2007+).
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel 2007+).
pub const MAX_COLS: u16 = 16_384;

/// A cell address, 0-based internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CellAddress {
    pub row: u32,
    pub col: u16,
}

impl CellAddress {
    pub fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    /// Parse a cell address from A1-style notation. `$` markers are accepted
    /// and ignored.
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty address".into());
        }

        let bytes = s.as_bytes();
        let mut pos = 0;

        if bytes.get(pos) == Some(&b'$') {
            pos += 1;
        }

        let col_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
            pos += 1;
        }
        if pos == col_start {
            return Err(format!("no column letters in '{s}'"));
        }
        let col = Self::letters_to_column(&s[col_start..pos])?;

        if bytes.get(pos) == Some(&b'$') {
            pos += 1;
        }

        let row_str = &s[pos..];
        if row_str.is_empty() {
            return Err(format!("no row number in '{s}'"));
        }
        let row: u32 = row_str
            .parse()
            .map_err(|_| format!("invalid row number in '{s}'"))?;

        // Excel rows are 1-based
        if row == 0 {
            return Err(format!("row number must be >= 1 in '{s}'"));
        }
        let row = row - 1;

        if row >= MAX_ROWS {
            return Err(format!("row {} out of bounds in '{s}'", row + 1));
        }

        Ok(Self { row, col })
    }

    /// Convert column index to letters (0 = A, 25 = Z, 26 = AA, etc.)
    pub fn column_to_letters(col: u16) -> String {
        let mut result = String::new();
        let mut n = col as u32 + 1;

        while n > 0 {
            n -= 1;
            let c = ((n % 26) as u8 + b'A') as char;
            result.insert(0, c);
            n /= 26;
        }

        result
    }

    /// Convert column letters to index (A = 0, Z = 25, AA = 26, etc.)
    pub fn letters_to_column(letters: &str) -> Result<u16, String> {
        if letters.is_empty() {
            return Err("empty column letters".into());
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(format!("invalid column letter '{c}'"));
            }
            col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
            if col > MAX_COLS as u32 {
                return Err(format!("column '{letters}' out of bounds"));
            }
        }

        Ok((col - 1) as u16)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::column_to_letters(self.col), self.row + 1)
    }
}

/// A rectangular range, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RangeAddress {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl RangeAddress {
    /// A range from two corners in any order.
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        Self {
            start: CellAddress::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellAddress::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    pub fn single(cell: CellAddress) -> Self {
        Self {
            start: cell,
            end: cell,
        }
    }

    /// Parse "A1:D8" or "B2". A sheet prefix ("Sheet1!A1") is ignored.
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.rsplit('!').next().unwrap_or(s);
        match s.split_once(':') {
            Some((a, b)) => Ok(Self::new(CellAddress::parse(a)?, CellAddress::parse(b)?)),
            None => Ok(Self::single(CellAddress::parse(s)?)),
        }
    }

    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn col_count(&self) -> u16 {
        self.end.col - self.start.col + 1
    }

    pub fn contains(&self, cell: CellAddress) -> bool {
        (self.start.row..=self.end.row).contains(&cell.row)
            && (self.start.col..=self.end.col).contains(&cell.col)
    }

    pub fn intersects(&self, other: &RangeAddress) -> bool {
        self.start.row <= other.end.row
            && other.start.row <= self.end.row
            && self.start.col <= other.end.col
            && other.start.col <= self.end.col
    }

    /// Every cell, row-major.
    pub fn cells(&self) -> impl Iterator<Item = CellAddress> + '_ {
        (self.start.row..=self.end.row)
            .flat_map(move |row| (self.start.col..=self.end.col).map(move |col| CellAddress::new(row, col)))
    }
}

impl fmt::Display for RangeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(CellAddress::column_to_letters(0), "A");
        assert_eq!(CellAddress::column_to_letters(25), "Z");
        assert_eq!(CellAddress::column_to_letters(26), "AA");
        assert_eq!(CellAddress::column_to_letters(16383), "XFD");
        assert_eq!(CellAddress::letters_to_column("xfd"), Ok(16383));
        assert!(CellAddress::letters_to_column("XFE").is_err());
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(CellAddress::parse("A15"), Ok(CellAddress::new(14, 0)));
        assert_eq!(CellAddress::parse("$F$30"), Ok(CellAddress::new(29, 5)));
        assert!(CellAddress::parse("A0").is_err());
        assert!(CellAddress::parse("15").is_err());
        assert!(CellAddress::parse("A").is_err());
    }

    #[test]
    fn test_parse_range() {
        let r = RangeAddress::parse("A1:D1").unwrap();
        assert_eq!(r.row_count(), 1);
        assert_eq!(r.col_count(), 4);
        assert_eq!(r.to_string(), "A1:D1");

        let r = RangeAddress::parse("Sheet1!D8:A1").unwrap();
        assert_eq!(r.to_string(), "A1:D8");
        assert!(r.contains(CellAddress::new(7, 3)));
        assert!(!r.contains(CellAddress::new(8, 0)));

        assert_eq!(RangeAddress::parse("B2").unwrap().to_string(), "B2");
    }

    #[test]
    fn test_intersects() {
        let a = RangeAddress::parse("A1:D8").unwrap();
        assert!(a.intersects(&RangeAddress::parse("D8:E9").unwrap()));
        assert!(!a.intersects(&RangeAddress::parse("A9:D9").unwrap()));
    }
}
