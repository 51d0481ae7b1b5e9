//! Property tests for transforms and mapper composition

use proptest::prelude::*;
use sketchsync_source_map::{Edit, OffsetMapper, TextTransform};

/// Turn random seeds into a non-overlapping edit set for `input`.
fn edits_from_seeds(input: &str, seeds: &[(usize, bool, String)]) -> Vec<Edit> {
    let len = input.len();
    let mut positions: Vec<(usize, bool, &str)> = seeds
        .iter()
        .map(|(pos, replace, text)| (pos % (len + 1), *replace, text.as_str()))
        .collect();
    positions.sort_by_key(|(pos, _, _)| *pos);
    positions.dedup_by_key(|(pos, _, _)| *pos);

    let mut edits = Vec::new();
    for (i, (pos, replace, text)) in positions.iter().enumerate() {
        let next = positions.get(i + 1).map_or(len, |(p, _, _)| *p);
        if *replace && pos + 1 <= next && pos + 1 <= len {
            edits.push(Edit::replace(*pos, 1, *text));
        } else {
            edits.push(Edit::insert(*pos, *text));
        }
    }
    edits
}

fn stage(input: &str, edits: Vec<Edit>) -> (String, OffsetMapper) {
    let mut t = TextTransform::new(input);
    t.add_all(edits);
    t.finish()
}

fn seeds() -> impl Strategy<Value = Vec<(usize, bool, String)>> {
    prop::collection::vec((0usize..64, any::<bool>(), "[a-z;{}]{0,6}"), 0..6)
}

proptest! {
    #[test]
    fn prop_empty_edit_set_is_identity(input in "[ -~\n]{0,60}") {
        let (out, mapper) = stage(&input, Vec::new());
        prop_assert_eq!(&out, &input);
        for x in 0..input.len() {
            prop_assert_eq!(mapper.output_offset(x), Some(x));
            prop_assert_eq!(mapper.input_offset(x), Some(x));
        }
    }

    #[test]
    fn prop_single_insertion_shifts(
        input in "[ -~]{1,60}",
        k_seed in 0usize..100,
        text in "[a-z]{1,10}",
    ) {
        let k = k_seed % (input.len() + 1);
        let l = text.len();
        let (out, mapper) = stage(&input, vec![Edit::insert(k, text.clone())]);
        prop_assert_eq!(out.len(), input.len() + l);

        for i in 0..input.len() {
            let expected = if i < k { i } else { i + l };
            prop_assert_eq!(mapper.output_offset(i), Some(expected));
        }
        for j in 0..out.len() {
            if j < k {
                prop_assert_eq!(mapper.input_offset(j), Some(j));
            } else if j >= k + l {
                prop_assert_eq!(mapper.input_offset(j), Some(j - l));
            }
        }
    }

    #[test]
    fn prop_composition_matches_stepwise(
        input in "[ -~]{0,40}",
        first in seeds(),
        second in seeds(),
    ) {
        let (mid, a) = stage(&input, edits_from_seeds(&input, &first));
        let (out, b) = stage(&mid, edits_from_seeds(&mid, &second));
        let composed = a.then_mapping(&b);
        prop_assert_eq!(composed.stage_count(), 2);

        for x in 0..=out.len() {
            let stepwise = b.input_offset(x).and_then(|y| a.input_offset(y));
            prop_assert_eq!(composed.input_offset(x), stepwise);
        }
        for x in 0..=input.len() {
            let stepwise = a.output_offset(x).and_then(|y| b.output_offset(y));
            prop_assert_eq!(composed.output_offset(x), stepwise);
        }
    }

    #[test]
    fn prop_lookups_stay_in_bounds(
        input in "[ -~]{1,40}",
        edits in seeds(),
        at in 0usize..200,
    ) {
        let (out, mapper) = stage(&input, edits_from_seeds(&input, &edits));
        if let Some(back) = mapper.input_offset(at) {
            prop_assert!(back <= input.len());
        }
        if let Some(fwd) = mapper.output_offset(at) {
            prop_assert!(fwd <= out.len());
        }
    }
}
