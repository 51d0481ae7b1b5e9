//! Blanking of comments and literal contents.
//!
//! Structural regex scans (imports, mode, sugar, braces) run over scrubbed
//! text so they never fire inside a comment or a string. Scrubbing keeps the
//! byte length and every newline, so offsets into the scrubbed text are
//! offsets into the original.

use crate::error::StructuralIssue;

/// Replace comments and the contents of string and char literals with spaces.
///
/// Quote characters themselves stay. An unterminated block comment is a
/// [`StructuralIssue`] at the offset of its `/*`.
pub fn scrub(text: &str) -> Result<String, StructuralIssue> {
    let bytes = text.as_bytes();
    let mut out = bytes.to_vec();
    let len = bytes.len();
    let mut i = 0;

    while i < len {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < len && bytes[i] != b'\n' {
                    blank(&mut out, i);
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let start = i;
                blank(&mut out, i);
                blank(&mut out, i + 1);
                i += 2;
                loop {
                    if i + 1 >= len {
                        return Err(StructuralIssue::new(
                            "editor.status.unterminated_comment",
                            start,
                        ));
                    }
                    if bytes[i] == b'*' && bytes[i + 1] == b'/' {
                        blank(&mut out, i);
                        blank(&mut out, i + 1);
                        i += 2;
                        break;
                    }
                    blank(&mut out, i);
                    i += 1;
                }
            }
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < len && bytes[i] != quote && bytes[i] != b'\n' {
                    if bytes[i] == b'\\' && i + 1 < len && bytes[i + 1] != b'\n' {
                        blank(&mut out, i);
                        i += 1;
                    }
                    blank(&mut out, i);
                    i += 1;
                }
                // closing quote (or the newline ending an unterminated literal)
                i += 1;
            }
            _ => i += 1,
        }
    }

    // Only whole characters were blanked, so this never substitutes.
    Ok(String::from_utf8_lossy(&out).into_owned())
}

fn blank(out: &mut [u8], idx: usize) {
    if let Some(b) = out.get_mut(idx)
        && *b != b'\n'
        && *b != b'\r'
    {
        *b = b' ';
    }
}

/// Blank everything nested inside braces, keeping the braces.
///
/// Expects scrubbed input. Used to look at top-level declarations only.
pub fn blank_nested(scrubbed: &str) -> String {
    let mut depth = 0usize;
    let mut out = scrubbed.as_bytes().to_vec();
    for b in out.iter_mut() {
        match *b {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b'\n' | b'\r' => {}
            _ if depth > 0 => *b = b' ',
            _ => {}
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_comment() {
        let src = "int x; // note\nint y;";
        let out = scrub(src).unwrap();
        assert_eq!(out, "int x;        \nint y;");
    }

    #[test]
    fn test_block_comment_keeps_newlines() {
        let src = "a /* one\ntwo */ b";
        assert_eq!(scrub(src).unwrap(), "a       \n       b");
    }

    #[test]
    fn test_string_contents_blanked() {
        let src = r#"s = "a // b \" c"; t = 'x';"#;
        let out = scrub(src).unwrap();
        assert_eq!(out.len(), src.len());
        assert_eq!(out, r#"s = "           "; t = ' ';"#);
    }

    #[test]
    fn test_comment_markers_inside_strings_ignored() {
        let src = "String t = \"*/*\"; int z;";
        let out = scrub(src).unwrap();
        assert!(out.ends_with("int z;"));
    }

    #[test]
    fn test_unterminated_block_comment() {
        let err = scrub("int a;\n/* open").unwrap_err();
        assert_eq!(err.offset, 7);
        assert_eq!(err.message_key, "editor.status.unterminated_comment");
    }

    #[test]
    fn test_multibyte_chars_keep_length() {
        let src = "println(\"héllo\"); // ünïcode\nfloat “x”;";
        let out = scrub(src).unwrap();
        assert_eq!(out.len(), src.len());
        assert!(out.contains("“x”"));
        assert!(!out.contains('é'));
    }

    #[test]
    fn test_blank_nested() {
        let out = blank_nested("void f() {\n  int x;\n}\nint y;");
        assert_eq!(out, "void f() {\n        \n}\nint y;");
    }
}
