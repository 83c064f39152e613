//! Authentication helpers that do not depend on a concrete provider.
//!
//! # Responsibility
//! - Session verification contract and the per-client session manager.
//! - Inline form validation that runs before any network call.

pub mod session;
pub mod validation;
