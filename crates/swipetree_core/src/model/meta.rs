//! Per-person display metadata.
//!
//! # Invariants
//! - Stored names never carry non-breaking spaces or outer whitespace.
//! - Blank fields are stored as `None`.

use serde::{Deserialize, Serialize};

const NBSP: char = '\u{00A0}';

/// Display metadata keyed by identifier (`{name, dob}` on the wire).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonMeta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dob: Option<String>,
}

impl PersonMeta {
    pub fn new(name: Option<String>, dob: Option<String>) -> Self {
        Self { name, dob }.normalized()
    }

    /// Returns a copy with cleaned fields; blank values collapse to `None`.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.and_then(|value| non_blank(clean_display_text(&value))),
            dob: self.dob.and_then(|value| non_blank(value.trim().to_string())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.dob.is_none()
    }

    /// Label rendered under a photo; empty when no name is known.
    pub fn display_name(&self) -> String {
        self.name
            .as_deref()
            .map(clean_display_text)
            .unwrap_or_default()
    }
}

/// Strips non-breaking spaces and trims surrounding whitespace.
pub fn clean_display_text(value: &str) -> String {
    value.replace(NBSP, "").trim().to_string()
}

fn non_blank(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
