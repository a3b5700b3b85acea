//! Monotonic + NTP-corrected wall clock (spec §4.1).
//!
//! `now_ms`/`now_s` combine a monotonic `Instant` base with a wall-clock
//! offset that a background task periodically nudges towards whatever an SNTP
//! query reports, slewing rather than stepping so callers never observe time
//! running backwards.

mod sntp;

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub use sntp::query_offset_ms;

/// Maximum offset adjustment applied per correction tick, so a large NTP
/// disagreement is slewed in rather than stepped, keeping `now_ms`
/// monotonic-friendly.
const MAX_SLEW_MS: i64 = 250;

const DEFAULT_NTP_SERVER: &str = "pool.ntp.org:123";
const DEFAULT_CORRECTION_INTERVAL_S: u64 = 60;

pub struct Clock {
    base_instant: Instant,
    base_wall_ms: u64,
    offset_ms: AtomicI64,
    ntp_server: String,
    correction_interval_s: u64,
    adjuster: Mutex<Option<JoinHandle<()>>>,
}

impl Clock {
    pub fn new() -> Self {
        Self::with_server(DEFAULT_NTP_SERVER.to_string())
    }

    pub fn with_server(ntp_server: String) -> Self {
        let base_wall_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self {
            base_instant: Instant::now(),
            base_wall_ms,
            offset_ms: AtomicI64::new(0),
            ntp_server,
            correction_interval_s: DEFAULT_CORRECTION_INTERVAL_S,
            adjuster: Mutex::new(None),
        }
    }

    fn wall_ms(&self) -> u64 {
        self.base_wall_ms + self.base_instant.elapsed().as_millis() as u64
    }

    pub fn now_ms(&self) -> u64 {
        let offset = self.offset_ms.load(Ordering::Relaxed);
        (self.wall_ms() as i64 + offset).max(0) as u64
    }

    pub fn now_s(&self) -> u64 {
        self.now_ms() / 1000
    }

    pub fn offset_ms(&self) -> i64 {
        self.offset_ms.load(Ordering::Relaxed)
    }

    fn apply_correction(&self, target_offset_ms: i64) {
        let current = self.offset_ms.load(Ordering::Relaxed);
        let delta = (target_offset_ms - current).clamp(-MAX_SLEW_MS, MAX_SLEW_MS);
        self.offset_ms.store(current + delta, Ordering::Relaxed);
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl traits::Clock for Clock {
    fn now_ms(&self) -> u64 {
        Clock::now_ms(self)
    }
}

/// Owns the background adjuster lifecycle; `start`/`stop` are idempotent.
pub struct ClockHandle(std::sync::Arc<Clock>);

impl ClockHandle {
    pub fn new(clock: std::sync::Arc<Clock>) -> Self {
        Self(clock)
    }

    pub fn start(&self) {
        let mut guard = self.0.adjuster.lock().unwrap();
        if guard.is_some() {
            return;
        }
        let clock = self.0.clone();
        let interval_s = clock.correction_interval_s;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_s));
            loop {
                ticker.tick().await;
                match query_offset_ms(&clock.ntp_server).await {
                    Ok(offset) => {
                        clock.apply_correction(offset);
                        debug!(offset_ms = offset, "clock: applied ntp correction");
                    }
                    Err(e) => {
                        warn!(error = %e, "clock: ntp query failed, keeping previous offset");
                    }
                }
            }
        });
        *guard = Some(handle);
    }

    pub fn stop(&self) {
        if let Some(handle) = self.0.adjuster.lock().unwrap().take() {
            handle.abort();
        }
    }

    pub fn clock(&self) -> std::sync::Arc<Clock> {
        self.0.clone()
    }
}

impl Drop for ClockHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
