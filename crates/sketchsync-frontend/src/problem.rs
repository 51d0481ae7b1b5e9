//! Problems reported by the parser and binder.
//!
//! Offsets are byte offsets into the text that was compiled; `end` is
//! exclusive.

use serde::{Deserialize, Serialize};
use sketchsync_error_reporting::DiagnosticKind;

/// Stable identifier of a problem category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProblemId {
    /// `Syntax error, insert "{0}" to complete {1}`
    ParsingErrorInsertToComplete,
    /// `Syntax error on token "{0}", {1} expected after this token`
    ParsingErrorInsertTokenAfter,
    /// `Syntax error on token "{0}", delete this token`
    ParsingErrorDeleteToken,
    /// `Syntax error on tokens, delete these tokens`
    ParsingErrorDeleteTokens,
    /// `Syntax error on token "{0}", invalid {1}`
    ParsingErrorInvalidToken,
    /// `Syntax error on token "{0}", {1} expected`
    ParsingErrorReplaceTokens,
    UnterminatedString,
    UnterminatedComment,
    InvalidCharacterConstant,
    UndefinedType,
    UndefinedName,
    UndefinedMethod,
    ImportNotFound,
    DuplicateLocalVariable,
    LocalVariableIsNeverUsed,
}

impl ProblemId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemId::ParsingErrorInsertToComplete => "ParsingErrorInsertToComplete",
            ProblemId::ParsingErrorInsertTokenAfter => "ParsingErrorInsertTokenAfter",
            ProblemId::ParsingErrorDeleteToken => "ParsingErrorDeleteToken",
            ProblemId::ParsingErrorDeleteTokens => "ParsingErrorDeleteTokens",
            ProblemId::ParsingErrorInvalidToken => "ParsingErrorInvalidToken",
            ProblemId::ParsingErrorReplaceTokens => "ParsingErrorReplaceTokens",
            ProblemId::UnterminatedString => "UnterminatedString",
            ProblemId::UnterminatedComment => "UnterminatedComment",
            ProblemId::InvalidCharacterConstant => "InvalidCharacterConstant",
            ProblemId::UndefinedType => "UndefinedType",
            ProblemId::UndefinedName => "UndefinedName",
            ProblemId::UndefinedMethod => "UndefinedMethod",
            ProblemId::ImportNotFound => "ImportNotFound",
            ProblemId::DuplicateLocalVariable => "DuplicateLocalVariable",
            ProblemId::LocalVariableIsNeverUsed => "LocalVariableIsNeverUsed",
        }
    }

    /// Problems raised while parsing.
    pub fn is_syntax(&self) -> bool {
        matches!(
            self,
            ProblemId::ParsingErrorInsertToComplete
                | ProblemId::ParsingErrorInsertTokenAfter
                | ProblemId::ParsingErrorDeleteToken
                | ProblemId::ParsingErrorDeleteTokens
                | ProblemId::ParsingErrorInvalidToken
                | ProblemId::ParsingErrorReplaceTokens
                | ProblemId::UnterminatedString
                | ProblemId::UnterminatedComment
                | ProblemId::InvalidCharacterConstant
        )
    }
}

/// One compiler diagnostic in compiled-text coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerProblem {
    pub id: ProblemId,
    pub kind: DiagnosticKind,
    pub message: String,
    /// Values substituted into the message, in order
    pub arguments: Vec<String>,
    pub start: usize,
    pub end: usize,
}

impl CompilerProblem {
    pub fn error(id: ProblemId, start: usize, end: usize, message: String, arguments: Vec<String>) -> Self {
        CompilerProblem {
            id,
            kind: DiagnosticKind::Error,
            message,
            arguments,
            start,
            end,
        }
    }

    pub fn warning(id: ProblemId, start: usize, end: usize, message: String, arguments: Vec<String>) -> Self {
        CompilerProblem {
            kind: DiagnosticKind::Warning,
            ..CompilerProblem::error(id, start, end, message, arguments)
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == DiagnosticKind::Error
    }

    pub fn argument(&self, idx: usize) -> Option<&str> {
        self.arguments.get(idx).map(String::as_str)
    }
}
