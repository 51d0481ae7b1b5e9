//! Free helpers for positions in plain strings

use crate::types::Location;

/// Convert a byte offset to a [`Location`] by scanning `source`.
///
/// Returns `None` if the offset is out of bounds. Prefer
/// [`FileInformation`](crate::FileInformation) for repeated lookups.
pub fn offset_to_location(source: &str, offset: usize) -> Option<Location> {
    if offset > source.len() {
        return None;
    }
    let before = &source.as_bytes()[..offset];
    let row = before.iter().filter(|&&b| b == b'\n').count();
    let line_start = before
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |idx| idx + 1);
    Some(Location {
        offset,
        row,
        column: offset - line_start,
    })
}

/// Convert a 0-indexed line and byte column to an offset.
pub fn line_col_to_offset(source: &str, line: usize, col: usize) -> Option<usize> {
    let mut line_start = 0;
    for _ in 0..line {
        line_start += source[line_start..].find('\n')? + 1;
    }
    let line_end = source[line_start..]
        .find('\n')
        .map_or(source.len(), |idx| line_start + idx);
    let offset = line_start + col;
    (offset <= line_end).then_some(offset)
}

/// Clamp `offset` down to the nearest UTF-8 character boundary.
pub fn floor_char_boundary(source: &str, offset: usize) -> usize {
    let mut offset = offset.min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_to_location() {
        let src = "int y;\nvoid f(){}";
        let loc = offset_to_location(src, 12).unwrap();
        assert_eq!((loc.row, loc.column), (1, 5));
        assert!(offset_to_location(src, 100).is_none());
    }

    #[test]
    fn test_line_col_round_trip() {
        let src = "a\nbcd\n\nef";
        assert_eq!(line_col_to_offset(src, 1, 2), Some(4));
        assert_eq!(line_col_to_offset(src, 2, 0), Some(6));
        assert_eq!(line_col_to_offset(src, 2, 1), None);
        assert_eq!(line_col_to_offset(src, 3, 2), Some(9));
        assert_eq!(line_col_to_offset(src, 4, 0), None);
    }

    #[test]
    fn test_floor_char_boundary() {
        let src = "a“b";
        assert_eq!(floor_char_boundary(src, 2), 1);
        assert_eq!(floor_char_boundary(src, 4), 4);
        assert_eq!(floor_char_boundary(src, 99), src.len());
    }
}
