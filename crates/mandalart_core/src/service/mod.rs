//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Run form-level validation before any storage call.
//! - Keep cached cell views coherent with writes.

pub mod board_service;
pub mod cell_service;
