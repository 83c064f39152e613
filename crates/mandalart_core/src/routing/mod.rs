//! Framework-agnostic request gating.
//!
//! # Responsibility
//! - Resolve the request locale from path, cookie and `Accept-Language`.
//! - Decide between pass-through, redirect and allow for each request.
//!
//! # Invariants
//! - Decisions are plain data; no HTTP framework types cross this boundary.

pub mod cookie;
pub mod gate;
pub mod locale;
