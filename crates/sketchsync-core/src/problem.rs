//! Editor-facing problems in original coordinates.

use serde::Serialize;
use sketchsync_error_reporting::{DiagnosticKind, DiagnosticMessage, interpolate};
use sketchsync_source_map::{FileInformation, Location, Range};

/// One tab of the concatenated sketch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SketchFile {
    pub name: String,
    /// Offset of the tab's first byte in the concatenated text
    pub pde_start: usize,
    /// Length of the tab's own text, without the separator newline
    pub len: usize,
    pub lines: FileInformation,
}

impl SketchFile {
    pub fn new(name: impl Into<String>, pde_start: usize, text: &str) -> Self {
        SketchFile {
            name: name.into(),
            pde_start,
            len: text.len(),
            lines: FileInformation::new(text),
        }
    }

    /// Range of `start..stop` in this file, clamped to its text.
    pub fn range(&self, start: usize, stop: usize) -> Range {
        let start = start.min(self.len);
        let stop = stop.clamp(start, self.len);
        self.lines.range(start, stop).unwrap_or(Range {
            start: Location {
                offset: start,
                row: 0,
                column: start,
            },
            end: Location {
                offset: stop,
                row: 0,
                column: stop,
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    pub file_index: usize,
    pub file_name: String,
    /// Location inside the file
    pub range: Range,
    pub kind: DiagnosticKind,
    /// Compiler problem id, if the problem came from the compiler
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub import_suggestions: Vec<String>,
}

impl Problem {
    pub fn new(
        file_index: usize,
        file: &SketchFile,
        start: usize,
        stop: usize,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) -> Self {
        Problem {
            file_index,
            file_name: file.name.clone(),
            range: file.range(start, stop),
            kind,
            code: None,
            message: message.into(),
            import_suggestions: Vec::new(),
        }
    }

    pub fn error(file_index: usize, file: &SketchFile, start: usize, stop: usize, message: impl Into<String>) -> Self {
        Self::new(file_index, file, start, stop, DiagnosticKind::Error, message)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.kind == DiagnosticKind::Error
    }

    pub fn start_offset(&self) -> usize {
        self.range.start.offset
    }

    pub fn stop_offset(&self) -> usize {
        self.range.end.offset
    }

    /// 0-based line of the start
    pub fn line(&self) -> usize {
        self.range.start.row
    }

    pub fn to_diagnostic(&self) -> DiagnosticMessage {
        let mut msg = DiagnosticMessage::new(self.kind, self.message.clone()).at(self.file_name.clone(), self.range);
        if let Some(code) = &self.code {
            msg = msg.with_code(code.clone());
        }
        for suggestion in &self.import_suggestions {
            msg = msg.with_hint(interpolate("editor.status.import_suggestion", &[&format!("import {suggestion};")]));
        }
        msg
    }
}
