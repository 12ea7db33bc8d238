//! Displayable card read model.
//!
//! Cards are ephemeral: rebuilt on every grid open, never persisted.

use crate::model::identifier::Identifier;

/// One resolved tile in a relationship grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    /// Person identifier this tile navigates to.
    pub id: Identifier,
    /// Artifact name the display layer loads, e.g. `141000.jpg`.
    pub artifact_ref: String,
    /// Cleaned display label; empty when no metadata exists.
    pub display_name: String,
    /// True for the synthetic second-parent tile whose artifact was not found.
    pub placeholder: bool,
}

impl Card {
    pub fn new(id: Identifier, artifact_ref: String, display_name: String) -> Self {
        Self {
            id,
            artifact_ref,
            display_name,
            placeholder: false,
        }
    }

    /// Tile shown for a candidate whose artifact is absent.
    pub fn placeholder(id: Identifier, placeholder_ref: &str, display_name: String) -> Self {
        Self {
            id,
            artifact_ref: placeholder_ref.to_string(),
            display_name,
            placeholder: true,
        }
    }
}
