//! Import statements: parsing, comparison, and discovery in sketch code.

use std::fmt;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One `import` line, static or not, single-type or on-demand (`*`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImportStatement {
    is_static: bool,
    /// Everything before the last dot
    package_name: String,
    /// The last segment, `*` for on-demand imports
    class_name: String,
}

impl ImportStatement {
    /// `import <package>.*;`
    pub fn whole_package(package: impl Into<String>) -> Self {
        ImportStatement {
            is_static: false,
            package_name: package.into(),
            class_name: "*".to_string(),
        }
    }

    /// `import <qualified>;`
    pub fn single_class(qualified: &str) -> Self {
        let (package_name, class_name) = split_last(qualified);
        ImportStatement {
            is_static: false,
            package_name,
            class_name,
        }
    }

    /// Accepts `import static a.b.C;`, `import a.b.*;` or just `a.b.*`.
    ///
    /// Whitespace anywhere inside the name is ignored. Returns `None` when
    /// nothing name-like remains.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim().trim_end_matches(';').trim();
        let text = text.strip_prefix("import").map_or(text, str::trim_start);
        let (is_static, rest) = match text.strip_prefix("static") {
            Some(rest) if rest.starts_with(char::is_whitespace) => (true, rest),
            _ => (false, text),
        };
        let name: String = rest.chars().filter(|c| !c.is_whitespace()).collect();
        let valid = !name.is_empty()
            && name
                .split('.')
                .all(|seg| seg == "*" || (!seg.is_empty() && seg.chars().all(is_ident_char)));
        if !valid {
            return None;
        }
        let (package_name, class_name) = split_last(&name);
        Some(ImportStatement {
            is_static,
            package_name,
            class_name,
        })
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_star_import(&self) -> bool {
        self.class_name == "*"
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// `java.util.ArrayList`, `java.util.*`
    pub fn full_member_name(&self) -> String {
        if self.package_name.is_empty() {
            self.class_name.clone()
        } else {
            format!("{}.{}", self.package_name, self.class_name)
        }
    }

    /// The statement as it appears in generated code, without a newline.
    pub fn full_source_line(&self) -> String {
        let kw = if self.is_static { "import static " } else { "import " };
        format!("{kw}{};", self.full_member_name())
    }

    pub fn is_same_as(&self, other: &ImportStatement) -> bool {
        self.is_static == other.is_static && self.full_member_name() == other.full_member_name()
    }
}

impl fmt::Display for ImportStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_source_line())
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn split_last(name: &str) -> (String, String) {
    match name.rsplit_once('.') {
        Some((pkg, last)) => (pkg.to_string(), last.to_string()),
        None => (String::new(), name.to_string()),
    }
}

/// Whether two import lists differ in size or in any position.
pub fn imports_changed(prev: &[ImportStatement], next: &[ImportStatement]) -> bool {
    prev.len() != next.len() || prev.iter().zip(next).any(|(a, b)| !a.is_same_as(b))
}

static IMPORT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)(?:^|;)\s*(import\s+(?:static\s+)?[\w$]+(?:\s*\.\s*(?:[\w$]+|\*))*\s*;)")
        .expect("import regex")
});

/// An import statement found in sketch code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundImport {
    /// Byte range of `import ... ;`
    pub span: Range<usize>,
    pub statement: ImportStatement,
}

/// Import statements of a scrubbed text, in order of appearance.
pub fn find_program_imports(scrubbed: &str) -> Vec<FoundImport> {
    IMPORT_REGEX
        .captures_iter(scrubbed)
        .filter_map(|caps| {
            let m = caps.get(1)?;
            let statement = ImportStatement::parse(m.as_str())?;
            Some(FoundImport {
                span: m.range(),
                statement,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        let star = ImportStatement::parse("import java.util.*;").unwrap();
        assert!(star.is_star_import());
        assert_eq!(star.package_name(), "java.util");

        let single = ImportStatement::parse("import  java . util . ArrayList ;").unwrap();
        assert_eq!(single.class_name(), "ArrayList");
        assert_eq!(single.full_source_line(), "import java.util.ArrayList;");

        let stat = ImportStatement::parse("import static java.lang.Math.PI;").unwrap();
        assert!(stat.is_static());
        assert_eq!(stat.package_name(), "java.lang.Math");

        let bare = ImportStatement::parse("processing.core.*").unwrap();
        assert_eq!(bare, ImportStatement::whole_package("processing.core"));

        assert!(ImportStatement::parse("import ;").is_none());
        assert!(ImportStatement::parse("import a..b;").is_none());
    }

    #[test]
    fn test_static_prefix_of_package_name() {
        let imp = ImportStatement::parse("import statics.Thing;").unwrap();
        assert!(!imp.is_static());
        assert_eq!(imp.package_name(), "statics");
    }

    #[test]
    fn test_imports_changed() {
        let a = vec![ImportStatement::whole_package("java.util")];
        let b = vec![ImportStatement::parse("import java.util.*;").unwrap()];
        assert!(!imports_changed(&a, &b));
        assert!(imports_changed(&a, &[]));
        assert!(imports_changed(&a, &[ImportStatement::single_class("java.util.List")]));
    }

    #[test]
    fn test_find_program_imports() {
        let src = "import java.util.*;\nint x;\n  import static java.lang.Math.PI;\nvoid f() {}";
        let found = find_program_imports(src);
        assert_eq!(found.len(), 2);
        assert_eq!(&src[found[0].span.clone()], "import java.util.*;");
        assert_eq!(&src[found[1].span.clone()], "import static java.lang.Math.PI;");
        assert!(found[1].statement.is_static());
    }

    #[test]
    fn test_import_inside_identifier_is_ignored() {
        let found = find_program_imports("int reimport = 3;\nString important;");
        assert!(found.is_empty());
    }
}
