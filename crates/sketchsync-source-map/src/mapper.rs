//! Offset mapping between stage inputs and outputs
//!
//! A [`SimpleOffsetMapper`] covers one [`TextTransform`](crate::TextTransform);
//! a [`CompositeOffsetMapper`] chains several of them. Lookups return `None`
//! when an offset has no counterpart on the other side, e.g. text that was
//! inserted in front of everything the stage kept from its input.

use std::sync::Arc;

use crate::edit::Edit;

/// Mapping for a single stage, built from its edits in both sort orders.
#[derive(Debug, Clone)]
pub struct SimpleOffsetMapper {
    /// Edits with input extent, ascending by `from_offset`
    in_map: Vec<Edit>,
    /// Edits with output extent, ascending by `to_offset`
    out_map: Vec<Edit>,
    /// First output offset that came from the input
    output_start: usize,
    /// First input offset that reached the output
    input_start: usize,
}

impl SimpleOffsetMapper {
    pub fn new(in_map: Vec<Edit>, out_map: Vec<Edit>) -> Self {
        let output_start = out_map
            .iter()
            .find(|e| e.from_length > 0)
            .map_or(0, |e| e.to_offset);
        let input_start = in_map
            .iter()
            .find(|e| e.to_length > 0)
            .map_or(0, |e| e.from_offset);
        SimpleOffsetMapper {
            in_map,
            out_map,
            output_start,
            input_start,
        }
    }

    /// Map an output offset back to this stage's input.
    pub fn input_offset(&self, output_offset: usize) -> Option<usize> {
        if self.out_map.is_empty() {
            return (output_offset == 0).then_some(0);
        }
        if output_offset < self.output_start {
            return None;
        }
        let idx = self
            .out_map
            .partition_point(|e| e.to_offset <= output_offset)
            .saturating_sub(1);
        let edit = &self.out_map[idx];
        let diff = output_offset.saturating_sub(edit.to_offset);
        Some(edit.from_offset + diff.min(edit.from_length.saturating_sub(1)))
    }

    /// Map an input offset forward to this stage's output.
    pub fn output_offset(&self, input_offset: usize) -> Option<usize> {
        if self.in_map.is_empty() {
            return (input_offset == 0).then_some(0);
        }
        if input_offset < self.input_start {
            return None;
        }
        let idx = self
            .in_map
            .partition_point(|e| e.from_offset <= input_offset)
            .saturating_sub(1);
        let edit = &self.in_map[idx];
        let diff = input_offset.saturating_sub(edit.from_offset);
        Some(edit.to_offset + diff.min(edit.to_length.saturating_sub(1)))
    }
}

/// An ordered chain of stage mappers, first stage first.
///
/// Always flat: composing composites concatenates their stage lists.
/// The empty chain is the identity mapping.
#[derive(Debug, Clone, Default)]
pub struct CompositeOffsetMapper {
    stages: Vec<Arc<SimpleOffsetMapper>>,
}

impl CompositeOffsetMapper {
    pub fn of<'a>(mappers: impl IntoIterator<Item = &'a OffsetMapper>) -> Self {
        let mut stages = Vec::new();
        for mapper in mappers {
            match mapper {
                OffsetMapper::Simple(simple) => stages.push(Arc::clone(simple)),
                OffsetMapper::Composite(composite) => {
                    stages.extend(composite.stages.iter().cloned())
                }
            }
        }
        CompositeOffsetMapper { stages }
    }

    pub fn input_offset(&self, output_offset: usize) -> Option<usize> {
        self.stages
            .iter()
            .rev()
            .try_fold(output_offset, |offset, stage| stage.input_offset(offset))
    }

    pub fn output_offset(&self, input_offset: usize) -> Option<usize> {
        self.stages
            .iter()
            .try_fold(input_offset, |offset, stage| stage.output_offset(offset))
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

/// Either kind of mapper; cheap to clone.
#[derive(Debug, Clone)]
pub enum OffsetMapper {
    Simple(Arc<SimpleOffsetMapper>),
    Composite(CompositeOffsetMapper),
}

impl Default for OffsetMapper {
    fn default() -> Self {
        OffsetMapper::identity()
    }
}

impl OffsetMapper {
    pub fn identity() -> Self {
        OffsetMapper::Composite(CompositeOffsetMapper::default())
    }

    /// Derived side → original side. `None` means unmapped.
    pub fn input_offset(&self, output_offset: usize) -> Option<usize> {
        match self {
            OffsetMapper::Simple(m) => m.input_offset(output_offset),
            OffsetMapper::Composite(m) => m.input_offset(output_offset),
        }
    }

    /// Original side → derived side. `None` means unmapped.
    pub fn output_offset(&self, input_offset: usize) -> Option<usize> {
        match self {
            OffsetMapper::Simple(m) => m.output_offset(input_offset),
            OffsetMapper::Composite(m) => m.output_offset(input_offset),
        }
    }

    /// This mapping followed by `next`.
    pub fn then_mapping(&self, next: &OffsetMapper) -> OffsetMapper {
        OffsetMapper::Composite(CompositeOffsetMapper::of([self, next]))
    }

    pub fn stage_count(&self) -> usize {
        match self {
            OffsetMapper::Simple(_) => 1,
            OffsetMapper::Composite(m) => m.stage_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TextTransform;

    fn inserted(input: &str, offset: usize, text: &str) -> (String, OffsetMapper) {
        let mut t = TextTransform::new(input);
        t.add(Edit::insert(offset, text));
        t.finish()
    }

    #[test]
    fn test_leading_insertion_is_unmapped() {
        let (out, m) = inserted("body", 0, "head\n");
        assert_eq!(out, "head\nbody");
        assert_eq!(m.input_offset(0), None);
        assert_eq!(m.input_offset(4), None);
        assert_eq!(m.input_offset(5), Some(0));
        assert_eq!(m.output_offset(0), Some(5));
    }

    #[test]
    fn test_inner_insertion_maps_to_anchor() {
        let (out, m) = inserted("abcd", 2, "XYZ");
        assert_eq!(out, "abXYZcd");
        assert_eq!(m.input_offset(2), Some(2));
        assert_eq!(m.input_offset(4), Some(2));
        assert_eq!(m.input_offset(5), Some(2));
        assert_eq!(m.output_offset(2), Some(5));
    }

    #[test]
    fn test_replacement_clamps_inside_span() {
        let mut t = TextTransform::new("a#b");
        t.add(Edit::replace(1, 1, "0xff"));
        let m = t.mapper();
        for out in 1..5 {
            assert_eq!(m.input_offset(out), Some(1));
        }
        assert_eq!(m.input_offset(5), Some(2));
    }

    #[test]
    fn test_composition_flattens() {
        let (_, a) = inserted("abc", 1, "-");
        let (_, b) = inserted("a-bc", 0, ">");
        let (_, c) = inserted(">a-bc", 5, "<");
        let ab = a.then_mapping(&b);
        let abc = ab.then_mapping(&c);
        assert_eq!(abc.stage_count(), 3);
        let nested = a.then_mapping(&b.then_mapping(&c));
        assert_eq!(nested.stage_count(), 3);
        for x in 0..7 {
            assert_eq!(abc.input_offset(x), nested.input_offset(x));
        }
    }

    #[test]
    fn test_unmapped_propagates_through_composite() {
        let (_, a) = inserted("abc", 0, "12");
        let (_, b) = inserted("12abc", 0, "z");
        let m = a.then_mapping(&b);
        assert_eq!(m.input_offset(0), None);
        assert_eq!(m.input_offset(1), None);
        assert_eq!(m.input_offset(3), Some(0));
        assert_eq!(m.output_offset(0), Some(3));
    }

    #[test]
    fn test_identity() {
        let m = OffsetMapper::identity();
        assert_eq!(m.input_offset(42), Some(42));
        assert_eq!(m.output_offset(7), Some(7));
    }
}
