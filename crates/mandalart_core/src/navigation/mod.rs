//! Goal-tree navigation.
//!
//! # Responsibility
//! - Assemble board cells into a tree and resolve breadcrumb paths.
//! - Pad sibling lists into the fixed 3x3 grid.
//! - Track a user's position inside one board.

pub mod navigator;
pub mod padding;
pub mod tree;
