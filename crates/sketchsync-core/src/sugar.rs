//! Text-level sugar rules.
//!
//! Each function returns [`Edit`]s against the text it scanned; the pipeline
//! decides which stage they belong to. Scans expect scrubbed text.

use once_cell::sync::Lazy;
use regex::Regex;
use sketchsync_source_map::Edit;

use crate::imports::ImportStatement;
use crate::mode::ParseMode;

static TYPE_CONSTRUCTOR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(int|char|float|boolean|byte)\s*\(").expect("type constructor regex"));

static HEX_COLOR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^\w$])(#[A-Fa-f0-9]{6})\b").expect("hex color regex"));

/// One insertion per import, all at offset 0, in list order.
pub fn insert_imports(imports: &[ImportStatement]) -> Vec<Edit> {
    imports
        .iter()
        .map(|imp| Edit::insert(0, format!("{}\n", imp.full_source_line())))
        .collect()
}

/// `int(x)` → `PApplet.parseInt(x)`, and likewise for `char`, `float`,
/// `boolean` and `byte`. Only matches at or after `from`.
///
/// The match consumes nothing before the keyword, so nested conversions
/// such as `float(int(x))` are all found.
pub fn replace_type_constructors(scrubbed: &str, from: usize) -> Vec<Edit> {
    TYPE_CONSTRUCTOR_REGEX
        .captures_iter(scrubbed)
        .filter_map(|caps| caps.get(1))
        .filter(|m| m.start() >= from)
        // member access such as `x.int(2)`, or part of a `$`-identifier
        .filter(|m| {
            let before = m.start().checked_sub(1).and_then(|i| scrubbed.as_bytes().get(i));
            !matches!(before, Some(b'.' | b'$'))
        })
        .map(|m| {
            let word = m.as_str();
            let mut chars = word.chars();
            let capitalized: String = chars
                .next()
                .map(|c| c.to_ascii_uppercase())
                .into_iter()
                .chain(chars)
                .collect();
            Edit::replace(m.start(), word.len(), format!("PApplet.parse{capitalized}"))
        })
        .collect()
}

/// `#RRGGBB` → `0xffRRGGBB`. Only matches at or after `from`.
pub fn replace_hex_colors(scrubbed: &str, from: usize) -> Vec<Edit> {
    HEX_COLOR_REGEX
        .captures_iter(scrubbed)
        .filter_map(|caps| caps.get(1))
        .filter(|m| m.start() >= from)
        .map(|m| Edit::replace(m.start(), 1, "0xff"))
        .collect()
}

/// Header and footer around the body.
///
/// `prologue_len` bytes at the start (scaffolding and hoisted imports) stay
/// in front of the header. The header is anchored at offset 0 so it maps
/// into the scaffolding rather than onto the first line of the body.
pub fn wrap_sketch(mode: ParseMode, class_name: &str, prologue_len: usize, source_len: usize) -> Vec<Edit> {
    if mode == ParseMode::Java {
        return Vec::new();
    }

    let mut header = format!("\npublic class {class_name} extends PApplet {{\n");
    let mut footer = String::new();
    if mode == ParseMode::Static {
        header.push_str("public void setup() {\n");
        footer.push_str("\n}");
    }
    footer.push_str("\n}\n");

    let mut edits = Vec::with_capacity(3);
    if prologue_len > 0 {
        edits.push(Edit::relocate(0, prologue_len, 0));
    }
    edits.push(Edit::insert(0, header));
    edits.push(Edit::insert(source_len, footer));
    edits
}
