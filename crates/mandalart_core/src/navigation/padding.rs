//! Sibling padding for the 3x3 grid view.
//!
//! # Invariants
//! - `pad_children` always returns exactly `CELL_FAN_OUT` slots.
//! - Slot `i` holds position `i`: the real child with that position, or a
//!   placeholder.
//! - Placeholders are view-only and never persisted.

use crate::model::cell::{Cell, CellId, CELL_FAN_OUT};
use log::warn;
use serde::Serialize;

/// Prompt shown inside an empty grid slot.
pub const PLACEHOLDER_PROMPT: &str = "Add a goal";

const PLACEHOLDER_KEY_PREFIX: &str = "placeholder-";

/// Synthesized stand-in for a missing child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceholderCell {
    /// Sentinel key, `placeholder-{position}`; never a stored cell id.
    pub key: String,
    pub parent_id: Option<CellId>,
    pub depth: u32,
    pub position: u8,
    pub topic: String,
    pub prompt: &'static str,
}

impl PlaceholderCell {
    fn new(parent_id: Option<CellId>, parent_depth: u32, position: u8) -> Self {
        Self {
            key: placeholder_key(position),
            parent_id,
            depth: parent_depth + 1,
            position,
            topic: String::new(),
            prompt: PLACEHOLDER_PROMPT,
        }
    }
}

/// One of the eight slots around a centre cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GridSlot {
    Filled(Cell),
    Placeholder(PlaceholderCell),
}

impl GridSlot {
    /// Stable render key: the cell id, or the placeholder sentinel.
    pub fn key(&self) -> String {
        match self {
            Self::Filled(cell) => cell.id.to_string(),
            Self::Placeholder(placeholder) => placeholder.key.clone(),
        }
    }

    pub fn position(&self) -> u8 {
        match self {
            Self::Filled(cell) => cell.position,
            Self::Placeholder(placeholder) => placeholder.position,
        }
    }

    pub fn depth(&self) -> u32 {
        match self {
            Self::Filled(cell) => cell.depth,
            Self::Placeholder(placeholder) => placeholder.depth,
        }
    }

    pub fn cell(&self) -> Option<&Cell> {
        match self {
            Self::Filled(cell) => Some(cell),
            Self::Placeholder(_) => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }
}

/// Returns whether `key` was produced for a placeholder slot.
pub fn is_placeholder_key(key: &str) -> bool {
    key.strip_prefix(PLACEHOLDER_KEY_PREFIX)
        .and_then(|rest| rest.parse::<u8>().ok())
        .is_some_and(|position| usize::from(position) < CELL_FAN_OUT)
}

fn placeholder_key(position: u8) -> String {
    format!("{PLACEHOLDER_KEY_PREFIX}{position}")
}

/// Pads `children` of a cell at `parent_depth` to exactly eight slots.
///
/// Children with an out-of-range or already-taken position are dropped
/// with a warning; the first child seen for a position wins.
pub fn pad_children(
    parent_id: Option<CellId>,
    parent_depth: u32,
    children: Vec<Cell>,
) -> Vec<GridSlot> {
    let mut slots: Vec<Option<Cell>> = vec![None; CELL_FAN_OUT];

    for child in children {
        let index = usize::from(child.position);
        match slots.get_mut(index) {
            Some(slot) if slot.is_none() => *slot = Some(child),
            Some(_) => warn!(
                "event=grid_pad module=navigation status=skip reason=duplicate_position cell={} position={}",
                child.id, child.position
            ),
            None => warn!(
                "event=grid_pad module=navigation status=skip reason=position_out_of_range cell={} position={}",
                child.id, child.position
            ),
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| match slot {
            Some(cell) => GridSlot::Filled(cell),
            None => GridSlot::Placeholder(PlaceholderCell::new(
                parent_id,
                parent_depth,
                index as u8,
            )),
        })
        .collect()
}
