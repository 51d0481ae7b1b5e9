//! One transformation stage: input text + edits → output text + mapper

use std::sync::Arc;

use once_cell::unsync::OnceCell;
use tracing::warn;

use crate::edit::Edit;
use crate::mapper::{OffsetMapper, SimpleOffsetMapper};

/// Edits sorted both ways, with implicit moves filling the gaps.
#[derive(Debug)]
struct Built {
    /// Edits consuming input, ascending by `from_offset`
    in_map: Vec<Edit>,
    /// Edits producing output, ascending by `to_offset`
    out_map: Vec<Edit>,
}

/// A single pipeline stage.
///
/// Collect edits with [`add`](Self::add) / [`add_all`](Self::add_all), then call
/// [`apply`](Self::apply) for the output text and [`mapper`](Self::mapper) for
/// the offset mapping. Both are derived from one cached build which is dropped
/// whenever another edit is added.
///
/// Edits must not overlap in input space. Edits that reach past the end of the
/// input or split a UTF-8 character are ignored with a warning.
#[derive(Debug)]
pub struct TextTransform<'a> {
    input: &'a str,
    edits: Vec<Edit>,
    built: OnceCell<Built>,
}

impl<'a> TextTransform<'a> {
    pub fn new(input: &'a str) -> Self {
        TextTransform {
            input,
            edits: Vec::new(),
            built: OnceCell::new(),
        }
    }

    pub fn input(&self) -> &'a str {
        self.input
    }

    pub fn add(&mut self, edit: Edit) {
        self.edits.push(edit);
        self.built = OnceCell::new();
    }

    pub fn add_all(&mut self, edits: impl IntoIterator<Item = Edit>) {
        self.edits.extend(edits);
        self.built = OnceCell::new();
    }

    /// Number of explicit edits collected so far.
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Produce the stage's output text.
    pub fn apply(&self) -> String {
        let built = self.built();
        let mut output = String::with_capacity(self.input.len());
        for edit in &built.out_map {
            match &edit.text {
                Some(text) => output.push_str(text),
                None => output.push_str(&self.input[edit.from_offset..edit.from_end()]),
            }
        }
        output
    }

    /// Mapper between this stage's input (original side) and output.
    pub fn mapper(&self) -> OffsetMapper {
        let built = self.built();
        OffsetMapper::Simple(Arc::new(SimpleOffsetMapper::new(
            built.in_map.clone(),
            built.out_map.clone(),
        )))
    }

    /// Output text and mapper together.
    pub fn finish(&self) -> (String, OffsetMapper) {
        (self.apply(), self.mapper())
    }

    fn built(&self) -> &Built {
        self.built.get_or_init(|| self.build())
    }

    fn is_valid(&self, edit: &Edit) -> bool {
        let len = self.input.len();
        edit.from_end() <= len
            && edit.to_offset <= len
            && self.input.is_char_boundary(edit.from_offset)
            && self.input.is_char_boundary(edit.from_end())
            && self.input.is_char_boundary(edit.to_offset)
    }

    fn build(&self) -> Built {
        let len = self.input.len();

        let mut edits: Vec<Edit> = Vec::with_capacity(self.edits.len() * 2 + 1);
        for edit in &self.edits {
            if self.is_valid(edit) {
                edits.push(edit.clone());
            } else {
                warn!(
                    from = edit.from_offset,
                    length = edit.from_length,
                    anchor = edit.to_offset,
                    input_length = len,
                    "ignoring edit outside of input"
                );
            }
        }

        // Stable sorts keep insertion order among edits sharing an offset
        let mut by_input: Vec<usize> = (0..edits.len()).collect();
        by_input.sort_by_key(|&i| edits[i].from_offset);
        let mut by_output: Vec<usize> = (0..edits.len()).collect();
        by_output.sort_by_key(|&i| edits[i].to_offset);

        let mut in_map: Vec<usize> = Vec::new();
        let mut out_map: Vec<usize> = Vec::new();
        let (mut ii, mut oi) = (0, 0);
        let (mut in_offset, mut out_offset) = (0, 0);

        while in_offset < len || ii < by_input.len() || oi < by_output.len() {
            let next_in = by_input.get(ii).map_or(len, |&i| edits[i].from_offset);
            let next_out = by_output.get(oi).map_or(len, |&i| edits[i].to_offset);
            let next = next_in.min(next_out).max(in_offset);

            // Unmodified stretch up to the next edit
            if next > in_offset {
                let gap = next - in_offset;
                let idx = edits.len();
                edits.push(Edit::relocate(in_offset, gap, out_offset));
                in_map.push(idx);
                out_map.push(idx);
                in_offset = next;
                out_offset += gap;
            }

            while let Some(&i) = by_input.get(ii) {
                if in_offset < edits[i].from_offset {
                    break;
                }
                in_offset = in_offset.max(edits[i].from_end());
                if edits[i].from_length > 0 {
                    in_map.push(i);
                }
                ii += 1;
            }

            while let Some(&i) = by_output.get(oi) {
                if in_offset < edits[i].to_offset {
                    break;
                }
                edits[i].to_offset = out_offset;
                if edits[i].to_length > 0 {
                    out_map.push(i);
                }
                out_offset += edits[i].to_length;
                oi += 1;
            }
        }

        Built {
            in_map: in_map.into_iter().map(|i| edits[i].clone()).collect(),
            out_map: out_map.into_iter().map(|i| edits[i].clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_edit_set_is_identity() {
        let t = TextTransform::new("hello world");
        assert_eq!(t.apply(), "hello world");
        let m = t.mapper();
        for i in 0..11 {
            assert_eq!(m.output_offset(i), Some(i));
            assert_eq!(m.input_offset(i), Some(i));
        }
    }

    #[test]
    fn test_empty_input() {
        let t = TextTransform::new("");
        assert_eq!(t.apply(), "");
        assert_eq!(t.mapper().input_offset(0), Some(0));
    }

    #[test]
    fn test_insert_and_replace() {
        let mut t = TextTransform::new("int(x) + #FF0000");
        t.add(Edit::replace(0, 3, "PApplet.parseInt"));
        t.add(Edit::replace(9, 1, "0xff"));
        assert_eq!(t.apply(), "PApplet.parseInt(x) + 0xffFF0000");
    }

    #[test]
    fn test_insertions_at_same_offset_keep_order() {
        let mut t = TextTransform::new("body");
        t.add(Edit::insert(0, "a;"));
        t.add(Edit::insert(0, "b;"));
        assert_eq!(t.apply(), "a;b;body");
    }

    #[test]
    fn test_relocate_moves_text_to_anchor() {
        let input = "x = 1;\nimport a.b;\ny = 2;";
        let start = input.find("import").unwrap();
        let mut t = TextTransform::new(input);
        t.add(Edit::relocate(start, "import a.b;".len(), 0));
        t.add(Edit::insert(0, "\n"));
        let out = t.apply();
        assert_eq!(out, "import a.b;\nx = 1;\n\ny = 2;");

        // The relocated statement maps back to where it was written
        let m = t.mapper();
        assert_eq!(m.input_offset(0), Some(start));
        assert_eq!(m.input_offset(7), Some(start + 7));
        assert_eq!(m.output_offset(start), Some(0));
    }

    #[test]
    fn test_delete() {
        let mut t = TextTransform::new("abcdef");
        t.add(Edit::delete(1, 2));
        assert_eq!(t.apply(), "adef");
        let m = t.mapper();
        assert_eq!(m.output_offset(1), Some(1));
        assert_eq!(m.output_offset(3), Some(1));
        assert_eq!(m.input_offset(1), Some(3));
    }

    #[test]
    fn test_out_of_range_edit_is_ignored() {
        let mut t = TextTransform::new("abc");
        t.add(Edit::replace(2, 10, "zzz"));
        t.add(Edit::insert(3, "!"));
        assert_eq!(t.apply(), "abc!");
    }

    #[test]
    fn test_adding_invalidates_cache() {
        let mut t = TextTransform::new("abc");
        assert_eq!(t.apply(), "abc");
        t.add(Edit::insert(1, "-"));
        assert_eq!(t.apply(), "a-bc");
    }
}
