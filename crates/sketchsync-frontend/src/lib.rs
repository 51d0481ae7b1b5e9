//! Front end for the Java code derived from a sketch.
//!
//! [`parse`] runs tree-sitter's Java grammar over derived text and lowers the
//! result into a [`SyntaxTree`]; syntax errors are reported as
//! [`CompilerProblem`]s alongside the tree rather than as failures. [`bind`]
//! then resolves names against the sketch itself and an [`ImportResolver`].
//!
//! ```
//! use sketchsync_frontend::{bind, parse, StaticClassPath};
//!
//! let tree = parse("import processing.core.*;\nclass S extends PApplet { void setup() { size(100, 100); } }")?;
//! assert!(!tree.has_errors());
//! let bindings = bind(&tree, StaticClassPath::core().as_ref());
//! assert!(bindings.problems().is_empty());
//! # Ok::<(), sketchsync_frontend::ParseError>(())
//! ```

pub mod ast;
pub mod binder;
pub mod cst;
pub mod keywords;
pub mod parser;
pub mod problem;
mod recovery;
pub mod resolve;
pub mod visit;

pub use ast::{CompilationUnit, Name, NameId, Span};
pub use binder::{Bindings, DeclId, DeclKind, Declaration, NameRef, Symbol, bind};
pub use parser::{JavaParser, ParseError, SyntaxTree, parse};
pub use problem::{CompilerProblem, ProblemId};
pub use resolve::{
    CompositeResolver, ExternalKind, ImportResolver, ResolveError, ResolvedHandle, StaticClassPath,
    TypeEntry,
};
pub use visit::Visitor;
