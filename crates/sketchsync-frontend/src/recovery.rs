//! Syntax problems from a tree-sitter tree
//!
//! MISSING nodes become "insert" problems reported on the token before the
//! gap, ERROR nodes become "delete" or "invalid" problems over what the
//! grammar skipped. A few things the grammar accepts but Java does not (bare
//! names as statements, unterminated strings, malformed character literals)
//! are reported here as well.

use tree_sitter::Node;

use crate::cst::{TraversePhase, leaf_before, leaves, named_children, text, topdown_traverse};
use crate::problem::{CompilerProblem, ProblemId};

/// Every syntax problem in the tree rooted at `root`, in traversal order.
pub(crate) fn syntax_problems(root: Node, source: &str) -> Vec<CompilerProblem> {
    let mut problems: Vec<CompilerProblem> = Vec::new();
    let mut cursor = root.walk();
    topdown_traverse(&mut cursor, &mut |node, phase| {
        if phase == TraversePhase::Exit {
            return false;
        }
        if node.is_missing() {
            problems.extend(missing_node(root, node, source));
            return false;
        }
        if node.is_error() {
            problems.extend(error_node(node, source));
            return false;
        }
        match node.kind() {
            "expression_statement" => problems.extend(not_a_statement(node, source)),
            "string_literal" => problems.extend(unterminated_string(node, source)),
            "character_literal" => problems.extend(invalid_character(node, source)),
            _ => {}
        }
        true
    });
    problems.dedup_by(|b, a| a.id == b.id && a.start == b.start && a.arguments == b.arguments);
    problems
}

/// Grammar name of what a MISSING node stands for: the token itself for
/// punctuation, a CamelCase rule name otherwise.
fn expected_name(kind: &str) -> String {
    match kind {
        "identifier" | "type_identifier" => "Identifier".to_string(),
        k if !k.contains('_') && !k.chars().all(char::is_alphabetic) => k.to_string(),
        k => k
            .split('_')
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect(),
    }
}

/// `expected` has to be inserted after `previous`, or at `at` when nothing
/// comes before the gap.
pub(crate) fn insert_problem(previous: Option<(&str, usize, usize)>, expected: &str, at: usize) -> CompilerProblem {
    match previous {
        Some((token, start, end)) => CompilerProblem::error(
            ProblemId::ParsingErrorInsertTokenAfter,
            start,
            end,
            format!("Syntax error on token \"{token}\", {expected} expected after this token"),
            vec![token.to_string(), expected.to_string()],
        ),
        None => CompilerProblem::error(
            ProblemId::ParsingErrorInsertToComplete,
            at,
            at,
            format!("Syntax error, insert \"{expected}\" to complete CompilationUnit"),
            vec![expected.to_string(), "CompilationUnit".to_string()],
        ),
    }
}

/// Follow-up reported after a lone name that is missing its `;`.
fn identifier_or_new(start: usize, end: usize) -> CompilerProblem {
    CompilerProblem::error(
        ProblemId::ParsingErrorInsertToComplete,
        start,
        end,
        "Syntax error, insert \":: IdentifierOrNew\" to complete Expression".to_string(),
        vec![":: IdentifierOrNew".to_string(), "Expression".to_string()],
    )
}

fn missing_node(root: Node, node: &Node, source: &str) -> Vec<CompilerProblem> {
    if node.kind() == "\"" {
        let start = node.parent().map_or(node.start_byte(), |p| p.start_byte());
        return vec![unterminated_from(start, source)];
    }
    let expected = expected_name(node.kind());
    let previous = leaf_before(root, node.start_byte());
    let mut problems = vec![insert_problem(
        previous.as_ref().map(|p| (text(p, source), p.start_byte(), p.end_byte())),
        &expected,
        node.start_byte(),
    )];
    let bare_name = node.kind() == ";"
        && node
            .parent()
            .filter(|p| p.kind() == "expression_statement")
            .and_then(|p| named_children(&p).into_iter().next())
            .is_some_and(|e| e.kind() == "identifier");
    if let (true, Some(prev)) = (bare_name, previous) {
        problems.push(identifier_or_new(prev.start_byte(), prev.end_byte()));
    }
    problems
}

/// Tokens that can end an expression, so a `;` may be what is missing.
fn ends_expression(leaf: &Node, source: &str) -> bool {
    (leaf.is_named() && !leaf.is_error()) || matches!(text(leaf, source), ")" | "]" | "++" | "--")
}

fn error_node(node: &Node, source: &str) -> Vec<CompilerProblem> {
    let leaves = leaves(*node);
    let (Some(first), Some(last)) = (leaves.first(), leaves.last()) else {
        return Vec::new();
    };

    let mut problems = Vec::new();
    for leaf in &leaves {
        let token = text(leaf, source);
        let closed_string = leaf
            .parent()
            .is_some_and(|p| p.kind() == "string_literal" && !p.has_error() && !text(&p, source).contains('\n'));
        if token.starts_with('"') && (leaf.is_error() || (token == "\"" && !closed_string)) {
            problems.push(unterminated_from(leaf.start_byte(), source));
        } else if leaf.is_error() {
            for (at, c) in token.char_indices().filter(|(_, c)| !(c.is_whitespace() || c.is_alphanumeric() || *c == '_')) {
                let start = leaf.start_byte() + at;
                problems.push(CompilerProblem::error(
                    ProblemId::ParsingErrorInvalidToken,
                    start,
                    start + c.len_utf8(),
                    format!("Syntax error on token \"{c}\", invalid Character"),
                    vec![c.to_string(), "Character".to_string()],
                ));
            }
        }
    }
    if !problems.is_empty() {
        return problems;
    }

    let in_statements = node
        .parent()
        .is_some_and(|p| matches!(p.kind(), "block" | "constructor_body" | "switch_block_statement_group"));
    if in_statements && ends_expression(last, source) {
        problems.push(CompilerProblem::error(
            ProblemId::ParsingErrorInsertToComplete,
            last.start_byte(),
            last.end_byte(),
            "Syntax error, insert \";\" to complete BlockStatements".to_string(),
            vec![";".to_string(), "BlockStatements".to_string()],
        ));
        if leaves.len() == 1 && last.kind() == "identifier" {
            problems.push(identifier_or_new(last.start_byte(), last.end_byte()));
        }
        return problems;
    }

    let token = text(first, source).to_string();
    problems.push(if leaves.len() == 1 {
        CompilerProblem::error(
            ProblemId::ParsingErrorDeleteToken,
            first.start_byte(),
            first.end_byte(),
            format!("Syntax error on token \"{token}\", delete this token"),
            vec![token],
        )
    } else {
        CompilerProblem::error(
            ProblemId::ParsingErrorDeleteTokens,
            first.start_byte(),
            last.end_byte(),
            "Syntax error on tokens, delete these tokens".to_string(),
            vec![token],
        )
    });
    problems
}

/// `x;` and `a.b;` parse as expression statements but are not statements.
fn not_a_statement(node: &Node, source: &str) -> Option<CompilerProblem> {
    let expr = named_children(node).into_iter().next()?;
    if !matches!(expr.kind(), "identifier" | "field_access") || node.has_error() {
        return None;
    }
    Some(CompilerProblem::error(
        ProblemId::ParsingErrorInsertToComplete,
        expr.start_byte(),
        expr.end_byte(),
        "Syntax error, insert \"AssignmentOperator Expression\" to complete Expression".to_string(),
        vec!["AssignmentOperator Expression".to_string(), "Expression".to_string()],
    ))
}

fn unterminated_from(start: usize, source: &str) -> CompilerProblem {
    let rest = source.get(start..).unwrap_or("");
    let end = start + rest.find('\n').unwrap_or(rest.len());
    CompilerProblem::error(
        ProblemId::UnterminatedString,
        start,
        end,
        "String literal is not properly closed by a double-quote".to_string(),
        Vec::new(),
    )
}

/// The grammar lets a string run across lines until the next quote.
fn unterminated_string(node: &Node, source: &str) -> Option<CompilerProblem> {
    let literal = text(node, source);
    if literal.starts_with("\"\"\"") || !literal.contains('\n') {
        return None;
    }
    Some(unterminated_from(node.start_byte(), source))
}

/// `'a'`, `'\n'`, `'\u0041'` and octal escapes are the only valid forms.
fn invalid_character(node: &Node, source: &str) -> Option<CompilerProblem> {
    let literal = text(node, source);
    let inner = literal.strip_prefix('\'').and_then(|l| l.strip_suffix('\''))?;
    let valid = match inner.strip_prefix('\\') {
        None => inner.chars().count() == 1,
        Some(escape) => {
            escape.chars().count() == 1
                || (escape.starts_with('u')
                    && escape.trim_start_matches('u').len() == 4
                    && escape.trim_start_matches('u').chars().all(|c| c.is_ascii_hexdigit()))
                || (escape.len() <= 3 && escape.chars().all(|c| ('0'..='7').contains(&c)))
        }
    };
    (!valid).then(|| {
        CompilerProblem::error(
            ProblemId::InvalidCharacterConstant,
            node.start_byte(),
            node.end_byte(),
            "Invalid character constant".to_string(),
            Vec::new(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_name() {
        assert_eq!(expected_name(";"), ";");
        assert_eq!(expected_name("}"), "}");
        assert_eq!(expected_name("identifier"), "Identifier");
        assert_eq!(expected_name("formal_parameters"), "FormalParameters");
        assert_eq!(expected_name("block"), "Block");
    }

    #[test]
    fn test_missing_token_is_inserted_after_previous_token() {
        let problem = insert_problem(Some(("x", 9, 10)), ";", 10);
        assert_eq!(problem.id, ProblemId::ParsingErrorInsertTokenAfter);
        assert_eq!((problem.start, problem.end), (9, 10));
        assert_eq!(problem.arguments, vec!["x".to_string(), ";".to_string()]);
        assert_eq!(problem.message, "Syntax error on token \"x\", ; expected after this token");
    }

    #[test]
    fn test_missing_token_at_start_of_text() {
        let problem = insert_problem(None, "class", 0);
        assert_eq!(problem.id, ProblemId::ParsingErrorInsertToComplete);
        assert_eq!(problem.argument(0), Some("class"));
    }

    fn found(src: &str) -> Vec<CompilerProblem> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .unwrap();
        let tree = parser.parse(src, None).unwrap();
        syntax_problems(tree.root_node(), src)
    }

    #[test]
    fn test_clean_tree_has_no_problems() {
        assert!(found("class A { void f() { int x = 'a'; String s = \"\\n\"; x++; } }").is_empty());
    }

    #[test]
    fn test_escaped_character_literals_are_valid() {
        assert!(found("class A { char a = '\\n'; char b = '\\u0041'; char c = '\\0'; }").is_empty());
    }

    #[test]
    fn test_field_access_statement() {
        let problems = found("class A { void f() { this.x; } int x; }");
        assert_eq!(problems.len(), 1, "{problems:?}");
        assert_eq!(problems[0].argument(0), Some("AssignmentOperator Expression"));
    }
}
