//! Keep-in-sync preprocessing for sketches
//!
//! A sketch is a set of tabs written in a sugared Java dialect. This crate
//! turns the tabs into compiler-ready Java, runs the front end over it and
//! maps everything it finds back onto the tabs:
//!
//! - [`Pipeline`] runs the sugar-removal stages and produces an immutable
//!   [`PreprocessedSketch`] with the offset mapper between both texts.
//! - [`PreprocessingService`] rebuilds snapshots in the background as the
//!   tabs change, coalescing bursts of edits.
//! - [`ErrorChecker`] turns each snapshot into editor [`Problem`]s and
//!   publishes them after a quiet period.
//! - [`find_usages`] and [`plan_rename`] work on the same snapshots.
//!
//! [`SketchSession`] wires the service and the checker together.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sketchsync_core::*;
//!
//! let provider: Arc<dyn ClassPathProvider> = Arc::new(DefaultClassPathProvider::new());
//! let mut pipeline = Pipeline::new("sketch", ClassPathCache::new(provider), Arc::new(NoopObserver));
//! let sketch = pipeline.run(1, &[
//!     SourceFile::new("A", "void f(){x}"),
//!     SourceFile::new("B", "int y;"),
//! ]);
//!
//! let problems = check_sketch(&sketch, &CheckerConfig::default());
//! assert_eq!(problems.len(), 1);
//! assert_eq!((problems[0].file_index, problems[0].start_offset()), (0, 9));
//! ```

pub mod checker;
pub mod classpath;
pub mod config;
pub mod error;
pub mod imports;
pub mod mode;
pub mod observer;
pub mod pipeline;
pub mod problem;
pub mod rewrites;
pub mod scrub;
pub mod service;
pub mod session;
pub mod simplify;
pub mod sketch;
pub mod source;
pub mod sugar;
pub mod usages;

pub use checker::{ErrorChecker, ProblemSink, check_sketch};
pub use classpath::{ClassPath, ClassPathCache, ClassPathProvider, DefaultClassPathProvider};
pub use config::{CheckerConfig, ServiceConfig, SessionConfig};
pub use error::{ConfigError, PreprocessError, RenameError, ServiceError, StructuralIssue};
pub use imports::ImportStatement;
pub use mode::ParseMode;
pub use observer::{NoopObserver, PipelineObserver, TracingObserver};
pub use pipeline::Pipeline;
pub use problem::{Problem, SketchFile};
pub use service::{ListenerId, PreprocessingService, Snapshot};
pub use session::SketchSession;
pub use sketch::{FileInterval, PreprocessedSketch, SketchInterval};
pub use source::{FileKind, InMemorySketch, SketchSource, SourceFile};
pub use usages::{RenamePlan, Usages, apply_rename, find_usages, plan_rename};
