//! Which problems the checker shows when several kinds are present at once.

use std::sync::Arc;

use proptest::prelude::*;
use sketchsync_core::*;

fn check(text: &str) -> Vec<Problem> {
    let provider: Arc<dyn ClassPathProvider> = Arc::new(DefaultClassPathProvider::new());
    let mut pipeline = Pipeline::new("sketch", ClassPathCache::new(provider), Arc::new(NoopObserver));
    let sketch = pipeline.run(1, &[SourceFile::new("A", text)]);
    check_sketch(&sketch, &CheckerConfig::default())
}

fn sketch_text(name: &str, value: u32, curly: bool, unclosed: bool, missing_semicolon: bool) -> String {
    let mut body = format!("  int v_{name} = {value};\n");
    if curly {
        body.push_str("  println(“hi”);\n");
    }
    if missing_semicolon {
        body.push_str(&format!("  v_{name}\n"));
    }
    let close = if unclosed { "" } else { "}\n" };
    format!("void f() {{\n{body}{close}")
}

#[test]
fn test_clean_sketch_has_no_problems() {
    assert!(check(&sketch_text("a", 1, false, false, false)).is_empty());
}

#[test]
fn test_unterminated_comment_wins_over_everything() {
    let problems = check("void f() {\n  println(“hi”);\n/* open");
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].message, "Missing the */ from the end of a /* comment */");
}

proptest! {
    #[test]
    fn test_precedence(
        name in "[a-z]{1,6}",
        value in 0u32..10_000,
        curly in any::<bool>(),
        unclosed in any::<bool>(),
        missing_semicolon in any::<bool>(),
    ) {
        let problems = check(&sketch_text(&name, value, curly, unclosed, missing_semicolon));
        if curly {
            prop_assert_eq!(problems.len(), 2);
            prop_assert!(problems.iter().all(|p| p.message.starts_with("Curly quotes")));
        } else if unclosed {
            prop_assert_eq!(problems.len(), 1);
            prop_assert!(problems[0].is_error());
        } else if missing_semicolon {
            prop_assert!(!problems.is_empty());
            prop_assert!(problems.iter().all(|p| !p.message.starts_with("Curly quotes")));
        } else {
            prop_assert!(problems.is_empty());
        }
    }
}
