//! Diagnostics and editor messages for sketchsync.
//!
//! - [`DiagnosticKind`] and [`DiagnosticMessage`]: what the editor surface shows
//! - [`catalog`]: keyed message templates with positional interpolation

pub mod catalog;
pub mod diagnostic;

pub use catalog::{interpolate, text};
pub use diagnostic::{DiagnosticKind, DiagnosticMessage, SourceLocation};
