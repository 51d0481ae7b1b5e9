/*
 * pipeline.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Staged rebuild of one sketch snapshot.
 */

//! The rebuild pipeline.
//!
//! One rebuild runs these stages strictly in order, each feeding the next:
//!
//! 1. `concatenate`: tabs joined into one text, each followed by `\n`
//! 2. `scaffold_imports`: core and code-folder imports inserted in front
//! 3. `hoist_imports`: the sketch's own import statements moved after them
//! 4. `literal_sugar`: `int(..)` style conversions and `#RRGGBB` colors
//! 5. `wrap`: class header and footer around the body
//! 6. `tree_rewrites`: edits computed from a first parse of the wrapped text
//! 7. `compile`: final parse and, without syntax errors, binding
//!
//! Every text stage is a [`TextTransform`] and contributes one mapper to the
//! snapshot's composite mapper. A stage that fails, or panics, still yields a
//! snapshot: it carries `has_syntax_errors` and a synthetic problem instead
//! of a tree.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;

use sketchsync_error_reporting::{interpolate, text};
use sketchsync_frontend::{bind, parse};
use sketchsync_source_map::{Edit, OffsetMapper, TextTransform};

use crate::classpath::{ClassPathCache, ClassPathFlags};
use crate::error::PreprocessError;
use crate::imports::find_program_imports;
use crate::mode::detect_mode;
use crate::observer::{EventLevel, PipelineObserver};
use crate::problem::{Problem, SketchFile};
use crate::rewrites::tree_rewrites;
use crate::scrub::scrub;
use crate::sketch::{PreprocessedSketch, SketchBuilder};
use crate::source::SourceFile;
use crate::sugar::{insert_imports, replace_hex_colors, replace_type_constructors, wrap_sketch};

pub const STAGE_NAMES: &[&str] = &[
    "concatenate",
    "scaffold_imports",
    "hoist_imports",
    "literal_sugar",
    "wrap",
    "tree_rewrites",
    "compile",
];

/// Runs rebuilds for one sketch. Owned by the preprocessing worker.
pub struct Pipeline {
    class_name: String,
    class_path: ClassPathCache,
    observer: Arc<dyn PipelineObserver>,
}

impl Pipeline {
    pub fn new(class_name: impl Into<String>, class_path: ClassPathCache, observer: Arc<dyn PipelineObserver>) -> Self {
        Pipeline {
            class_name: class_name.into(),
            class_path,
            observer,
        }
    }

    pub fn class_path_flags(&self) -> Arc<ClassPathFlags> {
        self.class_path.flags()
    }

    pub fn class_path(&self) -> &ClassPathCache {
        &self.class_path
    }

    /// Build the snapshot for `files`. Never fails: errors and panics turn
    /// into a degraded snapshot.
    pub fn run(&mut self, generation: u64, files: &[SourceFile]) -> PreprocessedSketch {
        let started = Instant::now();
        self.observer.on_pipeline_start(generation, STAGE_NAMES.len());

        let outcome = catch_unwind(AssertUnwindSafe(|| self.build(generation, files)));
        let result = match outcome {
            Ok(result) => result,
            Err(payload) => {
                let error = PreprocessError::Fault(panic_message(payload.as_ref()));
                self.observer.on_stage_error("rebuild", 0, &error);
                Err(error)
            }
        };

        match result {
            Ok(sketch) => {
                self.observer.on_pipeline_complete(generation, started.elapsed());
                sketch
            }
            Err(error) => {
                self.observer.on_pipeline_error(generation, &error);
                degraded(generation, &self.class_name, files, &error)
            }
        }
    }

    fn stage<T>(&self, index: usize, f: impl FnOnce() -> Result<T, PreprocessError>) -> Result<T, PreprocessError> {
        let name = STAGE_NAMES[index];
        self.observer.on_stage_start(name, index, STAGE_NAMES.len());
        match f() {
            Ok(value) => {
                self.observer.on_stage_complete(name, index, STAGE_NAMES.len());
                Ok(value)
            }
            Err(error) => {
                self.observer.on_stage_error(name, index, &error);
                Err(error)
            }
        }
    }

    fn build(&mut self, generation: u64, files: &[SourceFile]) -> Result<PreprocessedSketch, PreprocessError> {
        let mut builder = SketchBuilder {
            generation,
            class_name: self.class_name.clone(),
            ..SketchBuilder::default()
        };

        // 1. concatenate
        let (pde_code, sketch_files, scrubbed) = self.stage(0, || {
            let (pde_code, sketch_files) = concatenate(files);
            let scrubbed = scrub(&pde_code)?;
            Ok((pde_code, sketch_files, scrubbed))
        })?;
        let found_imports = find_program_imports(&scrubbed);
        let mode = detect_mode(&scrubbed);
        let program_imports: Vec<_> = found_imports.iter().map(|f| f.statement.clone()).collect();
        let class_path = self.class_path.prepare(&program_imports);
        self.observer.on_event(
            &format!("Sketch mode {} with {} import(s)", mode.as_str(), program_imports.len()),
            EventLevel::Trace,
        );

        let mut mapper = OffsetMapper::identity();

        // 2. scaffolding imports
        let scaffold_edits = || {
            let mut edits = insert_imports(&class_path.core_imports);
            edits.extend(insert_imports(&class_path.code_folder_imports));
            edits
        };
        let (s2, scrubbed2, m2) = self.stage(1, || Ok(run_stage(&pde_code, &scrubbed, scaffold_edits())))?;
        mapper = mapper.then_mapping(&m2);
        let scaffold_len = s2.len() - pde_code.len();

        // 3. program imports go right after the scaffolding
        let hoist_edits = || {
            found_imports
                .iter()
                .flat_map(|found| {
                    [
                        Edit::relocate(found.span.start + scaffold_len, found.span.len(), scaffold_len),
                        Edit::insert(scaffold_len, "\n"),
                    ]
                })
                .collect::<Vec<_>>()
        };
        let (s3, scrubbed3, m3) = self.stage(2, || Ok(run_stage(&s2, &scrubbed2, hoist_edits())))?;
        mapper = mapper.then_mapping(&m3);
        let prologue_len = scaffold_len
            + found_imports
                .iter()
                .map(|found| found.span.len() + 1)
                .sum::<usize>();

        // 4. literal and constructor sugar
        let (s4, m4) = self.stage(3, || {
            let mut stage = TextTransform::new(&s3);
            stage.add_all(replace_type_constructors(&scrubbed3, prologue_len));
            stage.add_all(replace_hex_colors(&scrubbed3, prologue_len));
            Ok(stage.finish())
        })?;
        mapper = mapper.then_mapping(&m4);

        // 5. wrap
        let (s5, m5) = self.stage(4, || {
            let mut stage = TextTransform::new(&s4);
            stage.add_all(wrap_sketch(mode, &self.class_name, prologue_len, s4.len()));
            Ok(stage.finish())
        })?;
        mapper = mapper.then_mapping(&m5);

        // 6. rewrites that need a tree
        let (java_code, m6) = self.stage(5, || {
            let first = parse(&s5)?;
            let mut stage = TextTransform::new(&s5);
            stage.add_all(tree_rewrites(&s5, &first.unit));
            Ok(stage.finish())
        })?;
        mapper = mapper.then_mapping(&m6);

        // 7. compile
        self.stage(6, || {
            let tree = parse(&java_code)?;
            let has_syntax_errors = tree.has_errors();
            let mut diagnostics = tree.problems.clone();
            let bindings = if has_syntax_errors {
                None
            } else {
                let bindings = bind(&tree, class_path.resolver.as_ref());
                diagnostics.extend(bindings.problems().iter().cloned());
                Some(Arc::new(bindings))
            };
            diagnostics.sort_by_key(|p| (p.start, p.end));

            builder.has_syntax_errors = has_syntax_errors;
            builder.has_compilation_errors = diagnostics.iter().any(|p| p.is_error());
            builder.diagnostics = diagnostics;
            builder.tree = Some(Arc::new(tree));
            builder.bindings = bindings;
            Ok(())
        })?;

        builder.mode = Some(mode);
        builder.files = sketch_files;
        builder.pde_code = pde_code;
        builder.scrubbed_pde_code = scrubbed;
        builder.java_code = java_code;
        builder.mapper = mapper;
        builder.program_imports = program_imports;
        builder.search_resolver = Some(class_path.search_resolver);
        Ok(builder.build())
    }
}

/// Join tabs, recording where each one starts.
pub fn concatenate(files: &[SourceFile]) -> (String, Vec<SketchFile>) {
    let mut pde_code = String::with_capacity(files.iter().map(|f| f.text.len() + 1).sum());
    let mut sketch_files = Vec::with_capacity(files.len());
    for file in files {
        sketch_files.push(SketchFile::new(file.name.clone(), pde_code.len(), &file.text));
        pde_code.push_str(&file.text);
        pde_code.push('\n');
    }
    (pde_code, sketch_files)
}

/// Apply `edits` to a text and to its scrubbed twin. Inserted text never
/// contains comments or literals, so the twin stays a valid scrub.
fn run_stage(text: &str, scrubbed: &str, edits: Vec<Edit>) -> (String, String, OffsetMapper) {
    let mut scrubbed_stage = TextTransform::new(scrubbed);
    scrubbed_stage.add_all(edits.iter().cloned());
    let mut stage = TextTransform::new(text);
    stage.add_all(edits);
    let (output, mapper) = stage.finish();
    (output, scrubbed_stage.apply(), mapper)
}

/// Snapshot for a rebuild that could not finish.
fn degraded(generation: u64, class_name: &str, files: &[SourceFile], error: &PreprocessError) -> PreprocessedSketch {
    let (pde_code, sketch_files) = concatenate(files);
    let (pde_offset, message) = match error {
        PreprocessError::Structural(issue) => (issue.offset, text(&issue.message_key)),
        PreprocessError::Fault(reason) => (0, interpolate("editor.status.preprocessing_failed", &[reason])),
        PreprocessError::Frontend(e) => (0, interpolate("editor.status.preprocessing_failed", &[&e.to_string()])),
    };

    let file_index = sketch_files
        .partition_point(|f| f.pde_start <= pde_offset)
        .saturating_sub(1);
    let other_problems = sketch_files
        .get(file_index)
        .map(|file| {
            let offset = pde_offset.saturating_sub(file.pde_start);
            let stop = (offset + 2).min(file.len);
            let mut problem = Problem::error(file_index, file, offset, stop, message);
            if let PreprocessError::Structural(issue) = error {
                problem = problem.with_code(issue.message_key.clone());
            }
            problem
        })
        .into_iter()
        .collect();

    SketchBuilder {
        generation,
        class_name: class_name.to_string(),
        files: sketch_files,
        scrubbed_pde_code: pde_code.clone(),
        pde_code,
        has_syntax_errors: true,
        other_problems,
        ..SketchBuilder::default()
    }
    .build()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
