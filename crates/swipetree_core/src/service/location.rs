//! Start identifier resolution and location reflection.
//!
//! # Responsibility
//! - Extract the start id from a URL fragment/query or a typed prompt.
//! - Describe the location fragment written on every anchor change.
//!
//! # Invariants
//! - Returned start ids are trimmed and non-empty.
//! - Location updates replace the current entry; they never add history.

use crate::model::identifier::Identifier;
use once_cell::sync::Lazy;
use regex::Regex;

static ID_PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|&)id=([^&]*)").expect("valid id param regex"));

/// Receives fragment replacements for the visible location.
pub trait LocationReflector {
    /// Replaces the location fragment without adding a history entry.
    fn replace_fragment(&mut self, fragment: &str);
}

/// Fragment reflecting `id`, e.g. `id=140000.1`.
pub fn fragment_for(id: &Identifier) -> String {
    format!("id={id}")
}

/// Reads `id` from the fragment when it carries `key=value` pairs, otherwise
/// from the query string. Leading `#`/`?` are ignored.
pub fn start_id_from_location(fragment: &str, query: &str) -> Option<String> {
    let fragment = fragment.trim().trim_start_matches('#');
    let query = query.trim().trim_start_matches('?');
    let params = if fragment.contains('=') { fragment } else { query };

    let raw = ID_PARAM_RE.captures(params)?.get(1)?.as_str();
    let plus_decoded = raw.replace('+', " ");
    let decoded = urlencoding::decode(&plus_decoded)
        .map(|value| value.into_owned())
        .unwrap_or(plus_decoded);
    non_empty(decoded.trim())
}

/// Accepts a typed start id; blank input is rejected.
pub fn start_id_from_prompt(input: &str) -> Option<String> {
    non_empty(input.trim())
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
