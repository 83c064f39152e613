//! Session-scoped cell cache and its periodic sweeper.
//!
//! # Responsibility
//! - Keep recently viewed cells and children in memory with TTL expiry.
//! - Run expiry sweeps with an explicit start/stop lifecycle.
//!
//! # Invariants
//! - The cache is an optimization only; callers must tolerate any miss.

pub mod cell_cache;
pub mod sweeper;
