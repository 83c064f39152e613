//! Mandalart board model.
//!
//! # Invariants
//! - `title` is non-blank after trim.
//! - `root_cell_id` references a depth-0 cell owned by this board.

use super::cell::CellId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable board identifier.
pub type BoardId = Uuid;

/// User identifier issued by the auth provider.
pub type UserId = Uuid;

/// One goal board owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mandalart {
    pub id: BoardId,
    pub title: String,
    pub owner_id: UserId,
    pub root_cell_id: CellId,
    /// Epoch ms.
    pub created_at: i64,
    /// Epoch ms.
    pub updated_at: i64,
}
