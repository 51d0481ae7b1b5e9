//! Editor-facing diagnostic message types.

use std::fmt;

use serde::{Deserialize, Serialize};
use sketchsync_source_map::Range;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    /// Prevents the sketch from compiling
    Error,
    /// Worth fixing but does not block compilation
    Warning,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a message points: a file of the sketch and a range inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub range: Range,
}

/// A message ready to be shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticMessage {
    /// Stable identifier of the underlying problem, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub kind: DiagnosticKind,
    pub title: String,
    /// Follow-up suggestions (e.g. imports that would resolve a name)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl DiagnosticMessage {
    pub fn new(kind: DiagnosticKind, title: impl Into<String>) -> Self {
        DiagnosticMessage {
            code: None,
            kind,
            title: title.into(),
            hints: Vec::new(),
            location: None,
        }
    }

    pub fn error(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Error, title)
    }

    pub fn warning(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Warning, title)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    pub fn at(mut self, file: impl Into<String>, range: Range) -> Self {
        self.location = Some(SourceLocation {
            file: file.into(),
            range,
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.kind == DiagnosticKind::Error
    }

    /// Render as plain text, one line per message plus one per hint.
    ///
    /// Rows and columns are shown 1-based.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        if let Some(loc) = &self.location {
            out.push_str(&format!(
                "{}:{}:{}: ",
                loc.file,
                loc.range.start.row + 1,
                loc.range.start.column + 1
            ));
        }
        out.push_str(self.kind.as_str());
        if let Some(code) = &self.code {
            out.push_str(&format!("[{code}]"));
        }
        out.push_str(": ");
        out.push_str(&self.title);
        for hint in &self.hints {
            out.push_str("\n  hint: ");
            out.push_str(hint);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchsync_source_map::FileInformation;

    #[test]
    fn test_plain_rendering() {
        let msg = DiagnosticMessage::error("Missing a semicolon “;”").with_code("InsertToComplete");
        assert_eq!(
            msg.to_text(),
            "error[InsertToComplete]: Missing a semicolon “;”"
        );
    }

    #[test]
    fn test_rendering_with_location_and_hints() {
        let info = FileInformation::new("void f(){\n  x\n}");
        let msg = DiagnosticMessage::warning("The class “List” does not exist")
            .at("A.pde", info.range(12, 13).unwrap())
            .with_hint("import java.util.List;");
        insta::assert_snapshot!(msg.to_text(), @r"
        A.pde:2:3: warning: The class “List” does not exist
          hint: import java.util.List;
        ");
    }

    #[test]
    fn test_json_omits_empty_fields() {
        let msg = DiagnosticMessage::error("boom");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["kind"], "error");
        assert!(json.get("hints").is_none());
        assert!(json.get("location").is_none());
    }
}
