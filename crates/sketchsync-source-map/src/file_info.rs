//! Line index for offset ↔ (row, column) conversion

use serde::{Deserialize, Serialize};

use crate::types::{Location, Range};

/// Newline positions of one text, for O(log n) location lookups.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileInformation {
    /// Byte offsets of each `\n`
    line_breaks: Vec<usize>,
    total_length: usize,
}

impl FileInformation {
    pub fn new(content: &str) -> Self {
        let line_breaks = content
            .bytes()
            .enumerate()
            .filter_map(|(idx, b)| (b == b'\n').then_some(idx))
            .collect();
        FileInformation {
            line_breaks,
            total_length: content.len(),
        }
    }

    /// Row containing `offset`; a newline belongs to the line it terminates.
    pub fn line_of(&self, offset: usize) -> usize {
        match self.line_breaks.binary_search(&offset) {
            Ok(idx) | Err(idx) => idx,
        }
    }

    /// Byte offset where `row` begins, or `None` past the last line.
    pub fn line_start(&self, row: usize) -> Option<usize> {
        match row {
            0 => Some(0),
            _ => self.line_breaks.get(row - 1).map(|b| b + 1),
        }
    }

    /// Returns `None` if `offset` is past the end of the text.
    pub fn offset_to_location(&self, offset: usize) -> Option<Location> {
        if offset > self.total_length {
            return None;
        }
        let row = self.line_of(offset);
        let line_start = self.line_start(row)?;
        Some(Location {
            offset,
            row,
            column: offset - line_start,
        })
    }

    pub fn range(&self, start: usize, end: usize) -> Option<Range> {
        Some(Range {
            start: self.offset_to_location(start)?,
            end: self.offset_to_location(end)?,
        })
    }

    pub fn total_length(&self) -> usize {
        self.total_length
    }

    pub fn line_count(&self) -> usize {
        self.line_breaks.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file() {
        let info = FileInformation::new("");
        assert_eq!(info.line_count(), 1);
        let loc = info.offset_to_location(0).unwrap();
        assert_eq!((loc.row, loc.column), (0, 0));
    }

    #[test]
    fn test_multiple_lines() {
        let info = FileInformation::new("void f(){\n  x\n}");
        assert_eq!(info.line_count(), 3);

        // '\n' at 9 still belongs to the first line
        let loc = info.offset_to_location(9).unwrap();
        assert_eq!((loc.row, loc.column), (0, 9));

        let loc = info.offset_to_location(12).unwrap();
        assert_eq!((loc.row, loc.column), (1, 2));

        assert_eq!(info.line_start(2), Some(14));
        assert_eq!(info.line_start(3), None);
    }

    #[test]
    fn test_out_of_bounds() {
        let info = FileInformation::new("int y;");
        assert!(info.offset_to_location(6).is_some());
        assert!(info.offset_to_location(7).is_none());
        assert!(info.range(0, 40).is_none());
    }

    #[test]
    fn test_multibyte_columns_are_bytes() {
        let info = FileInformation::new("“q”\nx");
        let loc = info.offset_to_location(info.line_start(1).unwrap()).unwrap();
        assert_eq!(loc.row, 1);
        assert_eq!(loc.offset, 8);
    }
}
