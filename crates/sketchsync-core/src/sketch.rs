//! The published snapshot of one rebuild.
//!
//! A [`PreprocessedSketch`] bundles the original text, the derived text, the
//! mapper between them and the compiler's view of the derived text. It is
//! built once by the pipeline and never changes afterwards; consumers share
//! it behind an `Arc`.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use sketchsync_frontend::{Bindings, CompilerProblem, ImportResolver, SyntaxTree};
use sketchsync_source_map::OffsetMapper;

use crate::imports::ImportStatement;
use crate::mode::ParseMode;
use crate::problem::{Problem, SketchFile};

/// A derived-text span mapped back onto one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileInterval {
    pub file_index: usize,
    pub start_file_offset: usize,
    pub stop_file_offset: usize,
    pub start_pde_offset: usize,
    pub stop_pde_offset: usize,
    pub start_derived_offset: usize,
    pub stop_derived_offset: usize,
}

/// Result of mapping a derived span to original coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SketchInterval {
    /// The span lies in generated scaffolding
    BeforeStart,
    Mapped(FileInterval),
}

impl SketchInterval {
    pub fn is_before_start(&self) -> bool {
        matches!(self, SketchInterval::BeforeStart)
    }

    pub fn mapped(&self) -> Option<&FileInterval> {
        match self {
            SketchInterval::BeforeStart => None,
            SketchInterval::Mapped(interval) => Some(interval),
        }
    }
}

/// Everything one rebuild learned about the sketch.
pub struct PreprocessedSketch {
    generation: u64,
    class_name: String,
    mode: ParseMode,
    files: Vec<SketchFile>,
    pde_code: String,
    scrubbed_pde_code: String,
    java_code: String,
    mapper: OffsetMapper,
    tree: Option<Arc<SyntaxTree>>,
    bindings: Option<Arc<Bindings>>,
    diagnostics: Vec<CompilerProblem>,
    program_imports: Vec<ImportStatement>,
    search_resolver: Option<Arc<dyn ImportResolver>>,
    has_syntax_errors: bool,
    has_compilation_errors: bool,
    other_problems: Vec<Problem>,
}

impl fmt::Debug for PreprocessedSketch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreprocessedSketch")
            .field("generation", &self.generation)
            .field("mode", &self.mode)
            .field("files", &self.files.len())
            .field("has_syntax_errors", &self.has_syntax_errors)
            .field("has_compilation_errors", &self.has_compilation_errors)
            .field("diagnostics", &self.diagnostics.len())
            .field("other_problems", &self.other_problems.len())
            .finish_non_exhaustive()
    }
}

/// Mutable form of a snapshot, filled in by the pipeline.
#[derive(Default)]
pub struct SketchBuilder {
    pub generation: u64,
    pub class_name: String,
    pub mode: Option<ParseMode>,
    pub files: Vec<SketchFile>,
    pub pde_code: String,
    pub scrubbed_pde_code: String,
    pub java_code: String,
    pub mapper: OffsetMapper,
    pub tree: Option<Arc<SyntaxTree>>,
    pub bindings: Option<Arc<Bindings>>,
    pub diagnostics: Vec<CompilerProblem>,
    pub program_imports: Vec<ImportStatement>,
    pub search_resolver: Option<Arc<dyn ImportResolver>>,
    pub has_syntax_errors: bool,
    pub has_compilation_errors: bool,
    pub other_problems: Vec<Problem>,
}

impl SketchBuilder {
    pub fn build(self) -> PreprocessedSketch {
        PreprocessedSketch {
            generation: self.generation,
            class_name: self.class_name,
            mode: self.mode.unwrap_or(ParseMode::Static),
            files: self.files,
            pde_code: self.pde_code,
            scrubbed_pde_code: self.scrubbed_pde_code,
            java_code: self.java_code,
            mapper: self.mapper,
            tree: self.tree,
            bindings: self.bindings,
            diagnostics: self.diagnostics,
            program_imports: self.program_imports,
            search_resolver: self.search_resolver,
            has_syntax_errors: self.has_syntax_errors,
            has_compilation_errors: self.has_compilation_errors,
            other_problems: self.other_problems,
        }
    }
}

impl PreprocessedSketch {
    /// 1-based rebuild counter of the service that produced this snapshot.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    pub fn files(&self) -> &[SketchFile] {
        &self.files
    }

    pub fn file(&self, index: usize) -> Option<&SketchFile> {
        self.files.get(index)
    }

    /// All tabs concatenated, each followed by a newline.
    pub fn pde_code(&self) -> &str {
        &self.pde_code
    }

    /// `pde_code` with comments and literal contents blanked.
    pub fn scrubbed_pde_code(&self) -> &str {
        &self.scrubbed_pde_code
    }

    /// The compiler-ready text.
    pub fn java_code(&self) -> &str {
        &self.java_code
    }

    pub fn mapper(&self) -> &OffsetMapper {
        &self.mapper
    }

    pub fn tree(&self) -> Option<&SyntaxTree> {
        self.tree.as_deref()
    }

    pub fn bindings(&self) -> Option<&Bindings> {
        self.bindings.as_deref()
    }

    /// Syntax and binding problems, in derived coordinates.
    pub fn diagnostics(&self) -> &[CompilerProblem] {
        &self.diagnostics
    }

    pub fn program_imports(&self) -> &[ImportStatement] {
        &self.program_imports
    }

    pub fn search_resolver(&self) -> Option<&dyn ImportResolver> {
        self.search_resolver.as_deref()
    }

    pub fn has_syntax_errors(&self) -> bool {
        self.has_syntax_errors
    }

    pub fn has_compilation_errors(&self) -> bool {
        self.has_compilation_errors
    }

    /// Problems found before a tree existed, already in file coordinates.
    pub fn other_problems(&self) -> &[Problem] {
        &self.other_problems
    }

    /// Tab containing concatenated offset `pde_offset`. Offsets past the end
    /// belong to the last tab.
    pub fn pde_offset_to_file_index(&self, pde_offset: usize) -> usize {
        self.files
            .partition_point(|f| f.pde_start <= pde_offset)
            .saturating_sub(1)
    }

    /// Concatenated offset of `offset` in tab `file_index`.
    pub fn file_offset_to_pde(&self, file_index: usize, offset: usize) -> Option<usize> {
        let file = self.files.get(file_index)?;
        (offset <= file.len).then_some(file.pde_start + offset)
    }

    /// 0-based line of `offset` in tab `file_index`.
    pub fn file_offset_to_line(&self, file_index: usize, offset: usize) -> Option<usize> {
        let file = self.files.get(file_index)?;
        (offset <= file.len).then(|| file.lines.line_of(offset))
    }

    /// Derived offset of `offset` in tab `file_index`, if it survived preprocessing.
    pub fn map_original_to_derived(&self, file_index: usize, offset: usize) -> Option<usize> {
        let pde = self.file_offset_to_pde(file_index, offset)?;
        self.mapper.output_offset(pde)
    }

    /// Map the derived span `start..stop` back to one file.
    ///
    /// Spans in generated scaffolding map to [`SketchInterval::BeforeStart`],
    /// except scaffolding after the last tab, which maps to an empty span at
    /// the end of that tab. A span that runs past the end of its file is cut
    /// at the file's end.
    pub fn map_derived_to_original(&self, start: usize, stop: usize) -> SketchInterval {
        let stop = stop.max(start);
        let Some(pde_start) = self.mapper.input_offset(start) else {
            return SketchInterval::BeforeStart;
        };
        let pde_stop = if stop > start {
            self.mapper
                .input_offset(stop - 1)
                .map_or(pde_start, |last| last + 1)
                .max(pde_start)
        } else {
            pde_start
        };
        if self.files.is_empty() {
            return SketchInterval::BeforeStart;
        }

        let file_index = self.pde_offset_to_file_index(pde_start);
        let Some(file) = self.files.get(file_index) else {
            return SketchInterval::BeforeStart;
        };
        let start_file_offset = (pde_start - file.pde_start).min(file.len);
        let stop_file_offset = pde_stop
            .saturating_sub(file.pde_start)
            .clamp(start_file_offset, file.len);

        SketchInterval::Mapped(FileInterval {
            file_index,
            start_file_offset,
            stop_file_offset,
            start_pde_offset: file.pde_start + start_file_offset,
            stop_pde_offset: file.pde_start + stop_file_offset,
            start_derived_offset: start,
            stop_derived_offset: stop,
        })
    }

    /// Original text covered by `interval`.
    pub fn original_text(&self, interval: &FileInterval) -> &str {
        self.pde_code
            .get(interval.start_pde_offset..interval.stop_pde_offset)
            .unwrap_or("")
    }

    /// Whether the mapped span covers exactly the derived span's text, i.e.
    /// it was copied from the original rather than generated.
    pub fn in_range(&self, interval: &SketchInterval) -> bool {
        let Some(interval) = interval.mapped() else {
            return false;
        };
        let Some(file) = self.files.get(interval.file_index) else {
            return false;
        };
        let derived = self
            .java_code
            .get(interval.start_derived_offset..interval.stop_derived_offset);
        interval.stop_file_offset <= file.len && derived == Some(self.original_text(interval))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchsync_source_map::{Edit, TextTransform};

    /// Two tabs wrapped in a fake class, without running the real pipeline.
    fn fixture() -> PreprocessedSketch {
        let pde = "int a;\nint b;\n";
        let mut stage = TextTransform::new(pde);
        stage.add(Edit::insert(0, "class X {\n"));
        stage.add(Edit::insert(pde.len(), "}\n"));
        let (java, mapper) = stage.finish();
        SketchBuilder {
            generation: 1,
            class_name: "X".into(),
            files: vec![SketchFile::new("A", 0, "int a;"), SketchFile::new("B", 7, "int b;")],
            pde_code: pde.into(),
            scrubbed_pde_code: pde.into(),
            java_code: java,
            mapper,
            ..SketchBuilder::default()
        }
        .build()
    }

    #[test]
    fn test_scaffolding_maps_to_before_start() {
        let sketch = fixture();
        assert!(sketch.map_derived_to_original(0, 5).is_before_start());
    }

    #[test]
    fn test_maps_into_second_file() {
        let sketch = fixture();
        let b_at = sketch.java_code().find('b').unwrap();
        let interval = sketch.map_derived_to_original(b_at, b_at + 1);
        let mapped = interval.mapped().unwrap();
        assert_eq!(mapped.file_index, 1);
        assert_eq!(mapped.start_file_offset, 4);
        assert_eq!(mapped.stop_file_offset, 5);
        assert_eq!(sketch.original_text(mapped), "b");
        assert!(sketch.in_range(&interval));
    }

    #[test]
    fn test_trailing_scaffolding_maps_to_end_of_last_file() {
        let sketch = fixture();
        let close_at = sketch.java_code().rfind('}').unwrap();
        let interval = sketch.map_derived_to_original(close_at, close_at + 1);
        let mapped = interval.mapped().unwrap();
        assert_eq!(mapped.file_index, 1);
        assert_eq!(mapped.start_file_offset, 6);
        assert_eq!(mapped.stop_file_offset, 6);
        assert_eq!(sketch.original_text(mapped), "");
        assert!(!sketch.in_range(&interval));
    }

    #[test]
    fn test_original_to_derived() {
        let sketch = fixture();
        let derived = sketch.map_original_to_derived(0, 4).unwrap();
        assert_eq!(&sketch.java_code()[derived..derived + 1], "a");
        assert_eq!(sketch.map_original_to_derived(0, 99), None);
        assert_eq!(sketch.map_original_to_derived(7, 0), None);
    }

    #[test]
    fn test_file_helpers() {
        let sketch = fixture();
        assert_eq!(sketch.pde_offset_to_file_index(0), 0);
        assert_eq!(sketch.pde_offset_to_file_index(6), 0);
        assert_eq!(sketch.pde_offset_to_file_index(7), 1);
        assert_eq!(sketch.pde_offset_to_file_index(100), 1);
        assert_eq!(sketch.file_offset_to_pde(1, 2), Some(9));
        assert_eq!(sketch.file_offset_to_line(1, 3), Some(0));
    }

    #[test]
    fn test_out_of_range_queries_do_not_panic() {
        let sketch = fixture();
        let len = sketch.java_code().len();
        let interval = sketch.map_derived_to_original(len + 10, len + 20);
        if let Some(mapped) = interval.mapped() {
            assert!(mapped.start_file_offset <= mapped.stop_file_offset);
        }
        let reversed = sketch.map_derived_to_original(12, 3);
        if let Some(mapped) = reversed.mapped() {
            assert!(mapped.start_file_offset <= mapped.stop_file_offset);
        }
    }
}
