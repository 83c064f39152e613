//! Background eviction of expired cache entries.
//!
//! The sweeper owns one thread that calls `CellCache::sweep_expired` every
//! interval until stopped. Dropping the handle stops and joins the thread.

use super::cell_cache::CellCache;
use log::{debug, info, warn};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Default delay between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Running periodic sweep over one cache.
pub struct CacheSweeper {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CacheSweeper {
    /// Starts sweeping `cache` every `interval`.
    ///
    /// # Errors
    /// Returns the spawn error when the OS refuses a new thread.
    pub fn start(cache: Arc<CellCache>, interval: Duration) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = std::thread::Builder::new()
            .name("mandalart-cache-sweeper".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let evicted = cache.sweep_expired();
                        if evicted > 0 {
                            debug!(
                                "event=cache_sweep module=cache status=ok evicted={} remaining={}",
                                evicted,
                                cache.len()
                            );
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        info!(
            "event=cache_sweeper_start module=cache status=ok interval_ms={}",
            interval.as_millis()
        );
        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Stops the sweep and waits for the thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn shutdown(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The thread may already be gone; a closed channel stops it too.
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("event=cache_sweeper_stop module=cache status=error reason=thread_panicked");
                return;
            }
            info!("event=cache_sweeper_stop module=cache status=ok");
        }
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::CacheSweeper;
    use crate::cache::cell_cache::test_clock::ManualClock;
    use crate::cache::cell_cache::CellCache;
    use crate::model::cell::Cell;
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use uuid::Uuid;

    #[test]
    fn sweeper_evicts_expired_entries_in_background() {
        let clock = Arc::new(ManualClock::new());
        let cache = Arc::new(CellCache::with_clock(Duration::from_secs(60), clock.clone()));
        let cell = Cell::new_root(Uuid::new_v4(), "stale");
        cache.set(cell.id, cell, Vec::new());
        clock.advance(Duration::from_secs(61));

        let sweeper = CacheSweeper::start(cache.clone(), Duration::from_millis(5)).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while cache.len() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(cache.len(), 0);

        assert!(sweeper.is_running());
        sweeper.stop();
    }

    #[test]
    fn stop_returns_promptly_with_long_interval() {
        let cache = Arc::new(CellCache::default());
        let sweeper = CacheSweeper::start(cache, Duration::from_secs(3600)).unwrap();
        let started = Instant::now();
        sweeper.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
