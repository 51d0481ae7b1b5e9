//! Offset mapping for multi-stage text rewriting
//!
//! A sugared source text becomes compiler-ready text through a sequence of
//! stages. Each stage is a [`TextTransform`]: the stage's input plus a bag of
//! declarative [`Edit`]s. Applying a transform yields the output text and an
//! [`OffsetMapper`] relating both sides; mappers of consecutive stages compose
//! into one flat chain.
//!
//! # Example
//!
//! ```rust
//! use sketchsync_source_map::*;
//!
//! let mut stage = TextTransform::new("size(100, 100);");
//! stage.add(Edit::insert(0, "void setup() {\n"));
//! stage.add(Edit::insert(15, "\n}"));
//! let (derived, mapper) = stage.finish();
//!
//! assert_eq!(derived, "void setup() {\nsize(100, 100);\n}");
//! // Scaffolding has no counterpart in the input
//! assert_eq!(mapper.input_offset(3), None);
//! assert_eq!(mapper.input_offset(15), Some(0));
//! ```

pub mod edit;
pub mod file_info;
pub mod mapper;
pub mod transform;
pub mod types;
pub mod utils;

pub use edit::Edit;
pub use file_info::FileInformation;
pub use mapper::{CompositeOffsetMapper, OffsetMapper, SimpleOffsetMapper};
pub use transform::TextTransform;
pub use types::{Location, Range};
pub use utils::{floor_char_boundary, line_col_to_offset, offset_to_location};
