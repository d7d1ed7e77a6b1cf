//! Process-wide rate limiter for acquisitions against the profile host.
//!
//! Construct one [`RateLimiter`] per process and hand an `Arc` of it to every
//! orchestrator. The mutex guards only the check-and-update arithmetic: a
//! caller reserves its slot under the lock, releases it, then sleeps until
//! the slot comes due. Concurrent callers therefore queue up behind each
//! other at `min_interval` spacing instead of racing past the check.
//!
//! A limiter built [`with_state_file`](RateLimiter::with_state_file) treats
//! the file as the source of truth: every reservation re-reads it and writes
//! the new slot back while holding an exclusive lock on `<file>.lock`, so
//! separate processes share one window.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::RateLimitConfig;
use crate::error::{IntelError, IntelResult};

#[derive(Debug, Default, Clone, Copy)]
struct RateLimitState {
    /// When the most recent permit was (or will be) granted.
    last_request: Option<Instant>,
    request_count_in_window: u32,
}

/// Serializable view of the limiter state, for operational tooling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitSnapshot {
    pub last_request_epoch_ms: Option<i64>,
    pub request_count_in_window: u32,
}

impl RateLimitSnapshot {
    pub fn load(path: &Path) -> IntelResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Write the snapshot, replacing `path` atomically.
    pub fn save(&self, path: &Path) -> IntelResult<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, self)?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Snapshot plus derived fields, as reported by `ratelimit status`.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStatus {
    #[serde(flatten)]
    pub snapshot: RateLimitSnapshot,
    pub max_per_window: u32,
    pub remaining_in_window: u32,
    /// How long a new caller would wait for its permit.
    pub next_permit_in_ms: u64,
}

/// Exclusive advisory lock on `<state file>.lock`, released when dropped.
struct StateFileLock {
    _file: File,
}

impl StateFileLock {
    fn acquire(state_file: &Path) -> IntelResult<Self> {
        let mut lock_path = state_file.as_os_str().to_owned();
        lock_path.push(".lock");
        let lock_path = PathBuf::from(lock_path);
        if let Some(parent) = lock_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        file.lock()?;
        Ok(Self { _file: file })
    }
}

/// Where a persisted reservation landed on disk, for rolling it back.
#[derive(Debug, Clone, Copy)]
struct PersistedSlot {
    previous_epoch_ms: Option<i64>,
    reserved_epoch_ms: Option<i64>,
}

/// A slot taken from the limiter but not yet due.
///
/// [`ready`](Reservation::ready) sleeps until the slot comes due. Dropping the
/// reservation before that completes hands the slot back, so an abandoned
/// wait neither counts against the window nor delays later callers.
#[must_use = "a reservation is returned to the limiter when dropped"]
pub struct Reservation<'a> {
    limiter: &'a RateLimiter,
    wait: Duration,
    previous: Option<Instant>,
    reserved: Instant,
    persisted: Option<PersistedSlot>,
    armed: bool,
}

impl Reservation<'_> {
    /// Time left until the slot comes due.
    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Sleep until the slot comes due; the permit is then granted.
    pub async fn ready(mut self) {
        if !self.wait.is_zero() {
            info!(wait_ms = self.wait.as_millis() as u64, "rate limiter pacing acquisition");
            tokio::time::sleep(self.wait).await;
        }
        self.armed = false;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!("reservation abandoned, returning slot");
            self.limiter.release(self);
        }
    }
}

/// Enforces minimum spacing and a windowed cap on acquisitions.
pub struct RateLimiter {
    min_interval: Duration,
    max_per_window: u32,
    window: Duration,
    state: Mutex<RateLimitState>,
    state_file: Option<PathBuf>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration, max_per_window: u32, window: Duration) -> Self {
        Self {
            min_interval,
            max_per_window,
            window,
            state: Mutex::new(RateLimitState::default()),
            state_file: None,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.min_interval(), config.max_per_window, config.window())
    }

    /// Share the window with every process using the same state file.
    pub fn with_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = Some(path.into());
        self
    }

    pub fn state_file(&self) -> Option<&Path> {
        self.state_file.as_deref()
    }

    /// Wait until a permit is available.
    ///
    /// Fails immediately with [`IntelError::RateLimitExceeded`] when the
    /// window cap has been reached; never blocks in that case.
    pub async fn acquire_permit(&self) -> IntelResult<()> {
        self.reserve()?.ready().await;
        Ok(())
    }

    /// Take the next slot without waiting for it.
    ///
    /// With a state file the slot is written to disk before this returns.
    pub fn reserve(&self) -> IntelResult<Reservation<'_>> {
        let _file_lock = self.lock_file()?;
        let on_disk = self.sync_from_disk();

        let mut state = self.lock_state();
        let now = Instant::now();
        let now_epoch = epoch_ms();

        if let Some(last) = state.last_request {
            if now.saturating_duration_since(last) > self.window {
                debug!("rate-limit window elapsed, resetting counter");
                state.request_count_in_window = 0;
            }
        }

        if state.request_count_in_window >= self.max_per_window {
            let since_last = state
                .last_request
                .map(|last| now.saturating_duration_since(last))
                .unwrap_or_default();
            return Err(IntelError::RateLimitExceeded {
                count: state.request_count_in_window,
                retry_after: self.window.saturating_sub(since_last),
            });
        }

        let wait = self.pending_wait(&state, now);
        let previous = state.last_request;
        let reserved = now + wait;
        let next = RateLimitState {
            last_request: Some(reserved),
            request_count_in_window: state.request_count_in_window + 1,
        };

        let persisted = match self.state_file {
            Some(ref path) => {
                let snapshot = snapshot_at(&next, now, now_epoch);
                snapshot.save(path)?;
                Some(PersistedSlot {
                    previous_epoch_ms: match on_disk {
                        Some(disk) => disk.last_request_epoch_ms,
                        None => snapshot_at(&state, now, now_epoch).last_request_epoch_ms,
                    },
                    reserved_epoch_ms: snapshot.last_request_epoch_ms,
                })
            }
            None => None,
        };
        *state = next;

        Ok(Reservation {
            limiter: self,
            wait,
            previous,
            reserved,
            persisted,
            armed: true,
        })
    }

    /// Current in-memory state in wall-clock terms.
    pub async fn snapshot(&self) -> RateLimitSnapshot {
        snapshot_at(&self.lock_state(), Instant::now(), epoch_ms())
    }

    /// Replace the in-memory state with a previously saved snapshot.
    pub async fn restore(&self, snapshot: &RateLimitSnapshot) {
        apply_snapshot(&mut self.lock_state(), snapshot, Instant::now(), epoch_ms());
    }

    /// Forget all history, including the state file's.
    pub async fn reset(&self) -> IntelResult<()> {
        let _file_lock = self.lock_file()?;
        let mut state = self.lock_state();
        if let Some(ref path) = self.state_file {
            RateLimitSnapshot::default().save(path)?;
        }
        *state = RateLimitState::default();
        info!("rate limiter reset");
        Ok(())
    }

    pub async fn status(&self) -> RateLimitStatus {
        match self.lock_file() {
            Ok(_file_lock) => {
                self.sync_from_disk();
            }
            Err(e) => warn!("rate-limit state file unavailable: {e}"),
        }

        let state = self.lock_state();
        let now = Instant::now();
        let count = match state.last_request {
            Some(last) if now.saturating_duration_since(last) > self.window => 0,
            _ => state.request_count_in_window,
        };

        RateLimitStatus {
            snapshot: snapshot_at(&state, now, epoch_ms()),
            max_per_window: self.max_per_window,
            remaining_in_window: self.max_per_window.saturating_sub(count),
            next_permit_in_ms: self.pending_wait(&state, now).as_millis() as u64,
        }
    }

    fn pending_wait(&self, state: &RateLimitState, now: Instant) -> Duration {
        state
            .last_request
            .map(|last| {
                if last > now {
                    (last - now) + self.min_interval
                } else {
                    self.min_interval.saturating_sub(now - last)
                }
            })
            .unwrap_or_default()
    }

    fn lock_state(&self) -> MutexGuard<'_, RateLimitState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_file(&self) -> IntelResult<Option<StateFileLock>> {
        self.state_file
            .as_deref()
            .map(StateFileLock::acquire)
            .transpose()
    }

    /// Adopt the state file's contents and return them. Caller holds the
    /// file lock.
    fn sync_from_disk(&self) -> Option<RateLimitSnapshot> {
        let path = self.state_file.as_deref()?;
        match RateLimitSnapshot::load(path) {
            Ok(snapshot) => {
                let snapshot = snapshot.unwrap_or_default();
                apply_snapshot(&mut self.lock_state(), &snapshot, Instant::now(), epoch_ms());
                Some(snapshot)
            }
            Err(e) => {
                warn!(path = %path.display(), "ignoring unreadable rate-limit state: {e}");
                None
            }
        }
    }

    /// Undo an abandoned reservation in memory and on disk.
    fn release(&self, slot: &Reservation<'_>) {
        if let (Some(path), Some(persisted)) = (self.state_file.as_deref(), slot.persisted) {
            let rolled_back = self.lock_file().and_then(|_file_lock| {
                let mut snapshot = RateLimitSnapshot::load(path)?.unwrap_or_default();
                snapshot.request_count_in_window = snapshot.request_count_in_window.saturating_sub(1);
                if snapshot.last_request_epoch_ms == persisted.reserved_epoch_ms {
                    snapshot.last_request_epoch_ms = persisted.previous_epoch_ms;
                }
                snapshot.save(path)
            });
            if let Err(e) = rolled_back {
                warn!(path = %path.display(), "failed to return rate-limit slot: {e}");
            }
        }

        let mut state = self.lock_state();
        state.request_count_in_window = state.request_count_in_window.saturating_sub(1);
        if state.last_request == Some(slot.reserved) {
            state.last_request = slot.previous;
        }
    }
}

fn epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn snapshot_at(state: &RateLimitState, now: Instant, now_epoch: i64) -> RateLimitSnapshot {
    RateLimitSnapshot {
        last_request_epoch_ms: state.last_request.map(|last| {
            if last >= now {
                now_epoch + (last - now).as_millis() as i64
            } else {
                now_epoch - (now - last).as_millis() as i64
            }
        }),
        request_count_in_window: state.request_count_in_window,
    }
}

fn apply_snapshot(state: &mut RateLimitState, snapshot: &RateLimitSnapshot, now: Instant, now_epoch: i64) {
    state.last_request = snapshot.last_request_epoch_ms.map(|epoch| {
        let delta = Duration::from_millis(epoch.abs_diff(now_epoch));
        if epoch >= now_epoch {
            now + delta
        } else {
            now.checked_sub(delta).unwrap_or(now)
        }
    });
    state.request_count_in_window = snapshot.request_count_in_window;
}
