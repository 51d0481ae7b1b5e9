//! Sketch mode detection.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::scrub::blank_nested;

/// How the sketch body gets wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Bare statements: wrapped in a class and a `setup()` method
    Static,
    /// Top-level methods or classes: wrapped in a class
    Active,
    /// The sketch declares its own `PApplet` subclass: not wrapped
    Java,
}

impl ParseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseMode::Static => "static",
            ParseMode::Active => "active",
            ParseMode::Java => "java",
        }
    }
}

static JAVA_MODE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bclass\s+[\w$]+\s+extends\s+PApplet\b").expect("java mode regex"));

static TYPE_DECL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:class|interface|enum)\s+[A-Za-z_$]").expect("type decl regex"));

/// `<modifiers> <type> <name> (` at the start of a top-level statement.
static METHOD_DECL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)(?:^|[;{}])\s*(?:(?:public|private|protected|static|final|abstract|synchronized)\s+)*([A-Za-z_$][\w$.]*(?:\s*<[\w$.,\s<>?\[\]]*>)?(?:\s*\[\s*\])*)\s+[A-Za-z_$][\w$]*\s*\(",
    )
    .expect("method decl regex")
});

/// Words that can precede `name(` without forming a declaration.
const NOT_A_TYPE: &[&str] = &["new", "return", "else", "throw", "case", "do", "goto"];

/// Classify a scrubbed sketch.
pub fn detect_mode(scrubbed: &str) -> ParseMode {
    if JAVA_MODE_REGEX.is_match(scrubbed) {
        return ParseMode::Java;
    }
    let top_level = blank_nested(scrubbed);
    if TYPE_DECL_REGEX.is_match(&top_level) {
        return ParseMode::Active;
    }
    let has_method = METHOD_DECL_REGEX.captures_iter(&top_level).any(|caps| {
        caps.get(1)
            .is_some_and(|ty| !NOT_A_TYPE.contains(&ty.as_str()))
    });
    if has_method {
        ParseMode::Active
    } else {
        ParseMode::Static
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_sketch() {
        let src = "size(200, 200);\nbackground(0);\nint x = round(3.5);\nellipse(x, 50, 10, 10);";
        assert_eq!(detect_mode(src), ParseMode::Static);
    }

    #[test]
    fn test_control_flow_is_static() {
        let src = "if (mousePressed) { fill(0); } else if (keyPressed) { fill(255); }\nPVector v = new PVector(1, 2);\nfor (int i = 0; i < 3; i++) {}";
        assert_eq!(detect_mode(src), ParseMode::Static);
    }

    #[test]
    fn test_active_sketch() {
        let src = "int x;\nvoid setup() {\n  size(100, 100);\n}\nvoid draw() { x++; }";
        assert_eq!(detect_mode(src), ParseMode::Active);
    }

    #[test]
    fn test_generic_return_type_is_active() {
        assert_eq!(
            detect_mode("ArrayList<PVector> points() { return null; }"),
            ParseMode::Active
        );
        assert_eq!(detect_mode("float[] values() { return null; }"), ParseMode::Active);
    }

    #[test]
    fn test_class_declaration_is_active() {
        assert_eq!(detect_mode("class Ball {\n  float x;\n}"), ParseMode::Active);
    }

    #[test]
    fn test_method_inside_class_body_does_not_count_twice() {
        // only the nested declaration looks like a method
        let src = "Runnable r = new Runnable() { public void run() {} };";
        assert_eq!(detect_mode(src), ParseMode::Static);
    }

    #[test]
    fn test_java_mode() {
        let src = "import processing.core.*;\npublic class Foo extends PApplet {\n  public void setup() {}\n}";
        assert_eq!(detect_mode(src), ParseMode::Java);
    }
}
