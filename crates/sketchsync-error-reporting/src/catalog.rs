//! Editor message catalog.
//!
//! Maps message keys (like `editor.status.missing.semicolon`) to text
//! templates. Templates use positional placeholders `{0}`, `{1}`, ...

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// One catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageInfo {
    /// Area the message belongs to ("syntax", "binding", "structure")
    pub subsystem: String,

    /// Text with positional placeholders
    pub template: String,
}

/// Global catalog, embedded at compile time.
///
/// # Panics
///
/// Panics on first access if the embedded JSON is malformed.
pub static MESSAGE_CATALOG: Lazy<HashMap<String, MessageInfo>> = Lazy::new(|| {
    let json_data = include_str!("../message_catalog.json");
    serde_json::from_str(json_data).expect("Invalid message catalog JSON")
});

pub fn get_message_info(key: &str) -> Option<&'static MessageInfo> {
    MESSAGE_CATALOG.get(key)
}

/// Template text for `key`, or the key itself when it is unknown.
pub fn text(key: &str) -> String {
    interpolate(key, &[])
}

/// Fill the template for `key` with `args`.
///
/// Unknown keys come back verbatim so a missing entry is visible instead of
/// producing an empty message.
pub fn interpolate(key: &str, args: &[&str]) -> String {
    let Some(info) = get_message_info(key) else {
        return key.to_string();
    };
    let mut out = info.template.clone();
    for (idx, arg) in args.iter().enumerate() {
        out = out.replace(&format!("{{{idx}}}"), arg);
    }
    out
}
