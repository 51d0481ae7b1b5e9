//! Declarative text edits
//!
//! An [`Edit`] describes one operation against a stage's input text. Edits are
//! pure data: a [`TextTransform`](crate::TextTransform) collects them and derives
//! the output text and offset mapping in one pass.

use serde::{Deserialize, Serialize};

/// A single text operation in input coordinates.
///
/// `to_offset` starts out as an *anchor* in input space: the input position
/// at which the edit's output is emitted. Once the owning transform has been
/// built, the edits stored in its mapper carry real output offsets instead.
///
/// - `text == None`: verbatim copy of `input[from_offset..from_offset + from_length]`
///   (a "move"). Implicit gaps between explicit edits are filled with moves too.
/// - `text == Some(t)` with `from_length == 0`: pure insertion.
/// - `text == Some(t)` with `from_length > 0`: replacement; deletion replaces with `""`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    pub from_offset: usize,
    pub from_length: usize,
    pub to_offset: usize,
    pub to_length: usize,
    pub text: Option<String>,
}

impl Edit {
    /// Insert `text` before input offset `offset`.
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        Edit {
            from_offset: offset,
            from_length: 0,
            to_offset: offset,
            to_length: text.len(),
            text: Some(text),
        }
    }

    /// Replace `length` bytes at `offset` with `text`.
    pub fn replace(offset: usize, length: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        Edit {
            from_offset: offset,
            from_length: length,
            to_offset: offset,
            to_length: text.len(),
            text: Some(text),
        }
    }

    /// Remove `length` bytes at `offset`.
    pub fn delete(offset: usize, length: usize) -> Self {
        Edit {
            from_offset: offset,
            from_length: length,
            to_offset: offset,
            to_length: 0,
            text: Some(String::new()),
        }
    }

    /// Copy `length` bytes at `from` verbatim, emitting them where input
    /// offset `anchor` lands in the output.
    ///
    /// With `anchor == from` this is an ordinary move; any other anchor
    /// relocates the text.
    pub fn relocate(from: usize, length: usize, anchor: usize) -> Self {
        Edit {
            from_offset: from,
            from_length: length,
            to_offset: anchor,
            to_length: length,
            text: None,
        }
    }

    /// Verbatim copy in place.
    pub fn keep(from: usize, length: usize) -> Self {
        Edit::relocate(from, length, from)
    }

    /// One past the last input byte this edit consumes.
    pub fn from_end(&self) -> usize {
        self.from_offset + self.from_length
    }

    /// One past the last output byte this edit produces.
    pub fn to_end(&self) -> usize {
        self.to_offset + self.to_length
    }

    pub fn is_move(&self) -> bool {
        self.text.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_has_no_input_extent() {
        let e = Edit::insert(4, "abc");
        assert_eq!(e.from_length, 0);
        assert_eq!(e.to_length, 3);
        assert_eq!(e.to_offset, 4);
        assert!(!e.is_move());
    }

    #[test]
    fn test_delete_produces_nothing_and_is_not_a_move() {
        let e = Edit::delete(2, 5);
        assert_eq!(e.from_end(), 7);
        assert_eq!(e.to_length, 0);
        assert!(!e.is_move());
        assert_eq!(e.text.as_deref(), Some(""));
    }

    #[test]
    fn test_relocate_keeps_anchor() {
        let e = Edit::relocate(10, 6, 0);
        assert!(e.is_move());
        assert_eq!(e.from_offset, 10);
        assert_eq!(e.to_offset, 0);
        assert_eq!(e.to_length, 6);
    }
}
