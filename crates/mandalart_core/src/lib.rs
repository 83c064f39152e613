//! Core domain logic for Mandalart.
//! This crate is the single source of truth for goal-tree invariants.

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod navigation;
pub mod repo;
pub mod routing;
pub mod runtime;
pub mod service;

pub use cache::cell_cache::{CellCache, Clock, SystemClock, DEFAULT_CACHE_TTL};
pub use cache::sweeper::CacheSweeper;
pub use config::{AppConfig, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::board::{BoardId, Mandalart, UserId};
pub use model::cell::{Cell, CellContent, CellId, CellValidationError, CELL_FAN_OUT};
pub use navigation::navigator::{Navigator, NavigatorError};
pub use navigation::padding::{pad_children, GridSlot, PlaceholderCell};
pub use navigation::tree::{find_path, resolve_path_or_root, CellNode, Progress};
pub use routing::gate::{GateDecision, GateRequest, RequestGate, RoutingConfig};
pub use runtime::{CoreRuntime, RuntimeError};
pub use service::board_service::{BoardService, BoardServiceError};
pub use service::cell_service::{CellGrid, CellService, CellServiceError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
