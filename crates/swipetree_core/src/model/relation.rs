//! Relationship algebra over fixed-width identifiers.
//!
//! # Responsibility
//! - Derive parent/children/sibling/spouse candidate ids from digits alone.
//!
//! # Invariants
//! - Every derived base id keeps the source width.
//! - At most [`MAX_CANDIDATES`] slots exist per generation (digits 1-9).
//! - Output is candidates only; existence filtering happens in `CardResolver`.

use crate::model::identifier::{format, IdResult, Identifier};

/// Slots per generation: decimal digits 1-9, 0 marks an unused slot.
pub const MAX_CANDIDATES: usize = 9;

/// Returns the parent base id, or `None` for a top-level id.
pub fn parent_of(n: u64, width: usize, tz: usize) -> IdResult<Option<String>> {
    if tz >= width {
        return Ok(None);
    }
    let step = pow10(tz);
    let parent = n - n % (step * 10);
    format(parent, width).map(Some)
}

/// Returns the nine child slots one decimal place finer than `tz`.
pub fn children_of(n: u64, width: usize, tz: usize) -> IdResult<Vec<String>> {
    children_slots(n, width, tz, MAX_CANDIDATES)
}

/// Returns sibling slots at the same place as `n`, excluding `n` itself.
pub fn siblings_of(n: u64, width: usize, tz: usize) -> IdResult<Vec<String>> {
    sibling_slots(n, width, tz, MAX_CANDIDATES)
}

/// Returns the canonical first spouse slot of `base_id`.
pub fn spouses_of(base_id: &str) -> Vec<String> {
    vec![format!("{base_id}.1")]
}

pub(crate) fn children_slots(
    n: u64,
    width: usize,
    tz: usize,
    slots: usize,
) -> IdResult<Vec<String>> {
    let child_step = pow10(tz.saturating_sub(1));
    let floor = n - n % (child_step * 10);
    (1..=slot_limit(slots))
        .map(|k| format(floor + k * child_step, width))
        .collect()
}

pub(crate) fn sibling_slots(
    n: u64,
    width: usize,
    tz: usize,
    slots: usize,
) -> IdResult<Vec<String>> {
    // The root has no generation above it to vary within.
    if tz >= width {
        return Ok(Vec::new());
    }
    let sib_step = pow10(tz);
    let floor = n - n % (sib_step * 10);
    (1..=slot_limit(slots))
        .map(|k| floor + k * sib_step)
        .filter(|candidate| *candidate != n)
        .map(|candidate| format(candidate, width))
        .collect()
}

/// Parent candidate of an identifier; spouse suffixes are ignored.
pub fn parent_id(id: &Identifier) -> IdResult<Option<Identifier>> {
    parent_of(id.base_value(), id.width(), id.depth_code())?
        .map(Identifier::from_base)
        .transpose()
}

/// Child candidates of an identifier, limited to `slots` (at most 9).
pub fn child_ids(id: &Identifier, slots: usize) -> IdResult<Vec<Identifier>> {
    children_slots(id.base_value(), id.width(), id.depth_code(), slots)?
        .into_iter()
        .map(Identifier::from_base)
        .collect()
}

/// Sibling candidates of an identifier, limited to `slots` (at most 9).
pub fn sibling_ids(id: &Identifier, slots: usize) -> IdResult<Vec<Identifier>> {
    sibling_slots(id.base_value(), id.width(), id.depth_code(), slots)?
        .into_iter()
        .map(Identifier::from_base)
        .collect()
}

/// Spouse toggle target: a spouse id maps back to its base person, a base
/// person maps to its first spouse slot.
pub fn spouse_toggle(id: &Identifier) -> Identifier {
    if id.is_spouse() {
        id.base()
    } else {
        id.spouse()
    }
}

fn slot_limit(slots: usize) -> u64 {
    slots.min(MAX_CANDIDATES) as u64
}

fn pow10(exp: usize) -> u64 {
    10_u64.pow(exp as u32)
}
