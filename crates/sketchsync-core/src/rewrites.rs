//! Rewrites driven by the parsed tree of the wrapped sketch.

use sketchsync_frontend::Visitor;
use sketchsync_frontend::ast::{CompilationUnit, Expr, ExprKind, LiteralKind, Member, TypeName, TypeRef};
use sketchsync_frontend::visit::{walk_expr, walk_type_ref, walk_unit};
use sketchsync_source_map::Edit;

/// All tree rewrites for `unit`, parsed from `source`.
pub fn tree_rewrites(source: &str, unit: &CompilationUnit) -> Vec<Edit> {
    let mut edits = add_public_to_top_level_methods(unit);
    edits.extend(replace_color_and_fix_floats(source, unit));
    edits
}

/// `public ` in front of methods of top-level types that have no keyword
/// modifiers. Constructors are left alone.
pub fn add_public_to_top_level_methods(unit: &CompilationUnit) -> Vec<Edit> {
    unit.types
        .iter()
        .flat_map(|decl| decl.members.iter())
        .filter_map(|member| match member {
            Member::Method(method) if method.modifiers.is_empty() && !method.is_constructor() => {
                Some(Edit::insert(method.header_start, "public "))
            }
            _ => None,
        })
        .collect()
}

/// `color` used as a type becomes `int`; float literals without a suffix get `f`.
pub fn replace_color_and_fix_floats(source: &str, unit: &CompilationUnit) -> Vec<Edit> {
    let mut rewriter = ColorAndFloats {
        source,
        edits: Vec::new(),
    };
    walk_unit(&mut rewriter, unit);
    rewriter.edits
}

struct ColorAndFloats<'a> {
    source: &'a str,
    edits: Vec<Edit>,
}

impl Visitor for ColorAndFloats<'_> {
    fn visit_type_ref(&mut self, ty: &TypeRef) {
        if let TypeName::Named(names) = &ty.name
            && let [name] = names.as_slice()
            && name.text == "color"
        {
            self.edits
                .push(Edit::replace(name.span.start, name.span.len(), "int"));
        }
        walk_type_ref(self, ty);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        if let ExprKind::Literal(LiteralKind::Float) = expr.kind
            && let Some(text) = self.source.get(expr.span.start..expr.span.end)
            && needs_float_suffix(text)
        {
            self.edits.push(Edit::insert(expr.span.end, "f"));
        }
        walk_expr(self, expr);
    }
}

fn needs_float_suffix(literal: &str) -> bool {
    let lower = literal.to_ascii_lowercase();
    !lower.starts_with("0x")
        && !lower.ends_with('f')
        && !lower.ends_with('d')
        && (lower.contains('.') || lower.contains('e'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchsync_frontend::parse;
    use sketchsync_source_map::TextTransform;

    fn rewrite(src: &str) -> String {
        let tree = parse(src).unwrap();
        let mut t = TextTransform::new(src);
        t.add_all(tree_rewrites(src, &tree.unit));
        t.apply()
    }

    #[test]
    fn test_public_added_to_top_level_methods() {
        let src = "class S {\nvoid setup() {}\nprivate void helper() {}\nS() {}\nclass Inner { void f() {} }\n}";
        assert_eq!(
            rewrite(src),
            "class S {\npublic void setup() {}\nprivate void helper() {}\nS() {}\nclass Inner { void f() {} }\n}"
        );
    }

    #[test]
    fn test_annotated_method_still_gets_public() {
        let src = "class S { @Override String toString() { return \"\"; } }";
        assert_eq!(
            rewrite(src),
            "class S { @Override public String toString() { return \"\"; } }"
        );
    }

    #[test]
    fn test_color_type_becomes_int() {
        let src = "class S { color c = color(255); color[] cs = new color[3]; }";
        assert_eq!(
            rewrite(src),
            "class S { int c = color(255); int[] cs = new int[3]; }"
        );
    }

    #[test]
    fn test_float_literals_get_suffix() {
        let src = "class S { float a = 1.5; double b = 2.0d; float c = 3f; float d = 1e3; int e = 0x1E; float g = .5; }";
        assert_eq!(
            rewrite(src),
            "class S { float a = 1.5f; double b = 2.0d; float c = 3f; float d = 1e3f; int e = 0x1E; float g = .5f; }"
        );
    }
}
