//! Domain model for mandalart boards and goal cells.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//!
//! # Invariants
//! - Every board and cell is identified by a stable UUID.
//! - A board owns exactly one root cell; deleting the board removes its tree.

pub mod board;
pub mod cell;
