//! Editor-friendly wording for compiler problems.

use once_cell::sync::Lazy;
use regex::Regex;
use sketchsync_error_reporting::{interpolate, text};
use sketchsync_frontend::{CompilerProblem, ProblemId};

static TOKEN_WORD_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b token\b").expect("token regex"));

pub(crate) const CURLY_QUOTES: &[char] = &['“', '”', '‘', '’'];

/// Message shown for `problem`, whose original text is `bad_code`.
pub fn simplify(problem: &CompilerProblem, bad_code: &str) -> String {
    simplified(problem, bad_code).unwrap_or_else(|| TOKEN_WORD_REGEX.replace_all(&problem.message, "").into_owned())
}

fn simplified(problem: &CompilerProblem, bad_code: &str) -> Option<String> {
    let args = &problem.arguments;
    let arg = |i: usize| problem.argument(i);
    match problem.id {
        ProblemId::ParsingErrorDeleteToken => curly_quote_message(bad_code),
        ProblemId::ParsingErrorDeleteTokens => {
            curly_quote_message(bad_code).or_else(|| arg(0).map(|a| interpolate("editor.status.error_on", &[a])))
        }
        ProblemId::ParsingErrorReplaceTokens => curly_quote_message(bad_code),
        ProblemId::ParsingErrorInsertToComplete => {
            let expected = arg(0)?;
            Some(match expected {
                "AssignmentOperator Expression" => interpolate("editor.status.missing.add", &["="]),
                e if e.eq_ignore_ascii_case(") Statement") => bracket_message(')'),
                e if e.chars().count() == 1 => bracket_message(e.chars().next()?),
                e => interpolate("editor.status.error_on", &[e]),
            })
        }
        ProblemId::ParsingErrorInsertTokenAfter => {
            let token = arg(0)?;
            let expected = arg(1)?;
            Some(if expected.chars().count() == 1 {
                bracket_message(expected.chars().next()?)
            } else if expected.eq_ignore_ascii_case("Statement") {
                interpolate("editor.status.error_on", &[token])
            } else {
                format!(
                    "{} {}",
                    interpolate("editor.status.error_on", &[token]),
                    interpolate("editor.status.missing.add", &[expected])
                )
            })
        }
        ProblemId::ParsingErrorInvalidToken => {
            let token = arg(0)?;
            if token == "int" && arg(1) == Some("VariableDeclaratorId") {
                return Some(text("editor.status.reserved_words"));
            }
            curly_quote_message(bad_code).or_else(|| Some(interpolate("editor.status.error_on", &[token])))
        }
        ProblemId::UnterminatedString => {
            let quotes: String = bad_code.chars().filter(|&c| matches!(c, '“' | '”')).collect();
            if quotes.is_empty() {
                Some(text("editor.status.unterminated_string"))
            } else {
                Some(interpolate("editor.status.unterm_string_curly", &[&quotes]))
            }
        }
        ProblemId::UnterminatedComment => Some(text("editor.status.unterminated_comment")),
        ProblemId::InvalidCharacterConstant => None,
        ProblemId::UndefinedMethod if args.len() > 2 => {
            Some(interpolate("editor.status.undefined_method", &[&args[args.len() - 2]]))
        }
        ProblemId::UndefinedMethod => None,
        ProblemId::UndefinedType => arg(0).map(|a| interpolate("editor.status.undef_class", &[a])),
        ProblemId::UndefinedName => arg(0).map(|a| interpolate("editor.status.undef_var", &[a])),
        ProblemId::ImportNotFound => arg(0).map(|a| interpolate("editor.status.import_not_found", &[a])),
        ProblemId::DuplicateLocalVariable => arg(0).map(|a| interpolate("editor.status.duplicate_variable", &[a])),
        ProblemId::LocalVariableIsNeverUsed => arg(0).map(|a| interpolate("editor.status.unused_variable", &[a])),
    }
}

fn bracket_message(c: char) -> String {
    match c {
        ';' => text("editor.status.missing.semicolon"),
        '[' => text("editor.status.missing.left_sq_bracket"),
        ']' => text("editor.status.missing.right_sq_bracket"),
        '(' => text("editor.status.missing.left_paren"),
        ')' => text("editor.status.missing.right_paren"),
        '{' => text("editor.status.missing.left_curly_bracket"),
        '}' => text("editor.status.missing.right_curly_bracket"),
        other => interpolate("editor.status.missing.default", &[&other.to_string()]),
    }
}

fn curly_quote_message(bad_code: &str) -> Option<String> {
    let quotes: String = bad_code.chars().filter(|c| CURLY_QUOTES.contains(c)).collect();
    (!quotes.is_empty()).then(|| interpolate("editor.status.bad_curly_quote", &[&quotes]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem(id: ProblemId, message: &str, args: &[&str]) -> CompilerProblem {
        CompilerProblem::error(id, 0, 1, message.to_string(), args.iter().map(|a| a.to_string()).collect())
    }

    #[test]
    fn test_missing_semicolon() {
        let p = problem(ProblemId::ParsingErrorInsertToComplete, "", &[";", "BlockStatements"]);
        assert_eq!(simplify(&p, "x"), "Missing a semicolon “;”");
    }

    #[test]
    fn test_assignment_operator() {
        let p = problem(
            ProblemId::ParsingErrorInsertToComplete,
            "",
            &["AssignmentOperator Expression", "Expression"],
        );
        assert_eq!(simplify(&p, "x"), "Consider adding “=”");
    }

    #[test]
    fn test_token_after() {
        let p = problem(ProblemId::ParsingErrorInsertTokenAfter, "", &["f", ")"]);
        assert_eq!(simplify(&p, "f"), "Missing right parenthesis “)”");

        let p = problem(ProblemId::ParsingErrorInsertTokenAfter, "", &["else", "Statement"]);
        assert_eq!(simplify(&p, "else"), "Error on “else”");

        let p = problem(ProblemId::ParsingErrorInsertTokenAfter, "", &["int", "VariableDeclarators"]);
        assert_eq!(
            simplify(&p, "int"),
            "Error on “int” Consider adding “VariableDeclarators”"
        );
    }

    #[test]
    fn test_curly_quotes_in_invalid_token() {
        let p = problem(ProblemId::ParsingErrorInvalidToken, "", &["“", "Character"]);
        assert_eq!(
            simplify(&p, "“"),
            "Curly quotes like “ don't work. Use straight quotes. Ex: (\", ')"
        );
    }

    #[test]
    fn test_reserved_word() {
        let p = problem(ProblemId::ParsingErrorInvalidToken, "", &["int", "VariableDeclaratorId"]);
        assert!(simplify(&p, "int").contains("reserved words"));
    }

    #[test]
    fn test_binding_problems() {
        let p = problem(ProblemId::UndefinedMethod, "", &["sketch", "elipse", "int, int"]);
        assert_eq!(simplify(&p, "elipse"), "The function “elipse()” does not exist");

        let p = problem(ProblemId::UndefinedName, "", &["x"]);
        assert_eq!(simplify(&p, "x"), "The variable “x” does not exist");

        let p = problem(ProblemId::UndefinedType, "", &["Foo"]);
        assert_eq!(simplify(&p, "Foo"), "The class “Foo” does not exist");
    }

    #[test]
    fn test_unterminated_string() {
        let p = problem(ProblemId::UnterminatedString, "", &[]);
        assert_eq!(simplify(&p, "\"abc"), "Missing a closing quote at the end of a string");
        assert!(simplify(&p, "”abc\"").contains("curly quote ”"));
    }

    #[test]
    fn test_fallback_drops_token_word() {
        let p = problem(
            ProblemId::ParsingErrorDeleteToken,
            "Syntax error on token \"$$\", delete this token",
            &["$$"],
        );
        assert_eq!(simplify(&p, "$$"), "Syntax error on \"$$\", delete this");
    }
}
