//! Process-level wiring of config, logging, storage and cache.
//!
//! # Responsibility
//! - Turn one validated `AppConfig` into a ready-to-use core instance.
//! - Hand out services bound to the shared connection and cell cache.
//!
//! # Invariants
//! - The cache sweeper lives exactly as long as the runtime.
//! - Services built here always share the runtime's one `CellCache`.

use crate::auth::session::{SessionManager, SessionVerifier};
use crate::cache::cell_cache::CellCache;
use crate::cache::sweeper::CacheSweeper;
use crate::config::{AppConfig, ConfigError};
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::logging::init_logging;
use crate::model::board::{Mandalart, UserId};
use crate::navigation::navigator::{Navigator, NavigatorError};
use crate::repo::board_repo::{BoardRepoError, SqliteBoardRepository};
use crate::repo::cell_repo::{CellRepoError, SqliteCellRepository};
use crate::repo::visit_repo::SqliteVisitRepository;
use crate::routing::gate::{RequestGate, RoutingConfigError};
use crate::service::board_service::BoardService;
use crate::service::cell_service::{CellService, CellServiceError};
use log::info;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Runtime startup and wiring failures.
#[derive(Debug)]
pub enum RuntimeError {
    Config(ConfigError),
    Logging(String),
    Db(DbError),
    Sweeper(std::io::Error),
    Board(BoardRepoError),
    Cell(CellRepoError),
    Routing(RoutingConfigError),
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Logging(message) => write!(f, "logging init failed: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Sweeper(err) => write!(f, "cache sweeper failed to start: {err}"),
            Self::Board(err) => write!(f, "{err}"),
            Self::Cell(err) => write!(f, "{err}"),
            Self::Routing(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RuntimeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Sweeper(err) => Some(err),
            Self::Board(err) => Some(err),
            Self::Cell(err) => Some(err),
            Self::Routing(err) => Some(err),
            Self::Logging(_) => None,
        }
    }
}

impl From<ConfigError> for RuntimeError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for RuntimeError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<BoardRepoError> for RuntimeError {
    fn from(value: BoardRepoError) -> Self {
        Self::Board(value)
    }
}

impl From<CellRepoError> for RuntimeError {
    fn from(value: CellRepoError) -> Self {
        Self::Cell(value)
    }
}

impl From<RoutingConfigError> for RuntimeError {
    fn from(value: RoutingConfigError) -> Self {
        Self::Routing(value)
    }
}

/// One started core instance.
pub struct CoreRuntime {
    config: AppConfig,
    conn: Connection,
    cache: Arc<CellCache>,
    sweeper: CacheSweeper,
}

impl CoreRuntime {
    /// Validates `config`, starts logging when a log directory is set, opens
    /// storage and starts the cache sweeper.
    pub fn start(config: AppConfig) -> Result<Self, RuntimeError> {
        config.validate()?;

        if let Some(log_dir) = &config.log_dir {
            init_logging(&config.log_level, &log_dir.to_string_lossy())
                .map_err(RuntimeError::Logging)?;
        }

        let conn = match &config.db_path {
            Some(path) => open_db(path)?,
            None => open_db_in_memory()?,
        };
        let cache = Arc::new(CellCache::new(config.cache_ttl()));
        let sweeper = CacheSweeper::start(cache.clone(), config.cache_sweep_interval())
            .map_err(RuntimeError::Sweeper)?;

        info!(
            "event=runtime_start module=core status=ok db={} cache_ttl_secs={}",
            if config.db_path.is_some() { "file" } else { "memory" },
            config.cache_ttl_secs
        );
        Ok(Self {
            config,
            conn,
            cache,
            sweeper,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn cache(&self) -> &Arc<CellCache> {
        &self.cache
    }

    pub fn board_service(&self) -> Result<BoardService<SqliteBoardRepository<'_>>, RuntimeError> {
        Ok(BoardService::with_cache(
            SqliteBoardRepository::try_new(&self.conn)?,
            self.cache.clone(),
        ))
    }

    pub fn cell_service(&self) -> Result<CellService<SqliteCellRepository<'_>>, RuntimeError> {
        Ok(CellService::with_cache(
            SqliteCellRepository::try_new(&self.conn)?,
            self.cache.clone(),
        ))
    }

    /// Opens `board` for `owner_id` at the last visited cell or the root.
    pub fn navigator(
        &self,
        owner_id: UserId,
        board: &Mandalart,
    ) -> Result<Navigator<SqliteCellRepository<'_>, SqliteVisitRepository<'_>>, NavigatorError>
    {
        let repo = SqliteCellRepository::try_new(&self.conn).map_err(CellServiceError::from)?;
        let cells = CellService::with_cache(repo, self.cache.clone());
        let visits = SqliteVisitRepository::try_new(&self.conn)?;
        Navigator::open(cells, visits, owner_id, board)
    }

    /// Builds a request gate from the routing section of the config.
    pub fn request_gate<V: SessionVerifier>(
        &self,
        verifier: V,
    ) -> Result<RequestGate<V>, RuntimeError> {
        RequestGate::new(self.config.routing.clone(), verifier).map_err(Into::into)
    }

    /// Builds the per-client session holder around `verifier`.
    pub fn session_manager<V: SessionVerifier>(&self, verifier: V) -> SessionManager<V> {
        SessionManager::new(verifier)
    }

    /// Stops the cache sweeper and closes storage.
    pub fn shutdown(self) {
        self.sweeper.stop();
        self.cache.clear();
        info!("event=runtime_stop module=core status=ok");
    }
}
