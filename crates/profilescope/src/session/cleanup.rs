//! Best-effort cleanup of browser processes and profile directories.

use std::path::Path;
use std::time::{Duration, SystemTime};

use sysinfo::System;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Prefix of every temporary profile directory created by this crate.
pub const PROFILE_DIR_PREFIX: &str = "profilescope-";

/// Kill every process whose command line contains `marker`.
///
/// Sessions pass their unique `--user-data-dir=...` flag as the marker, so
/// only processes spawned for that session are touched. Returns the number
/// of processes signalled.
pub fn kill_orphans(marker: &str) -> usize {
    if marker.is_empty() {
        return 0;
    }
    let mut sys = System::new();
    sys.refresh_processes();

    let mut killed = 0;
    for process in sys.processes().values() {
        let cmd_line = process.cmd().join(" ");
        if cmd_line.contains(marker) && process.kill() {
            killed += 1;
        }
    }
    if killed > 0 {
        info!(killed, "killed orphaned browser process(es)");
    }
    killed
}

/// Remove a profile directory, ignoring one that is already gone.
pub fn remove_profile_dir(path: &Path) {
    match std::fs::remove_dir_all(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), "failed to remove profile dir: {e}"),
    }
}

/// Kill the session's processes, then delete its profile directory.
///
/// Blocking: the process scan walks the whole process table.
pub fn reap(marker: &str, profile_dir: Option<TempDir>) {
    kill_orphans(marker);
    if let Some(dir) = profile_dir {
        let path = dir.path().to_path_buf();
        if dir.close().is_err() {
            remove_profile_dir(&path);
        }
    }
}

/// [`reap`] on the blocking pool when called inside a runtime, inline
/// otherwise. Safe to call from `Drop`.
pub fn reap_detached(marker: String, profile_dir: Option<TempDir>) -> Option<JoinHandle<()>> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => Some(handle.spawn_blocking(move || reap(&marker, profile_dir))),
        Err(_) => {
            reap(&marker, profile_dir);
            None
        }
    }
}

/// [`kill_orphans`] without stalling the async worker thread.
pub async fn kill_orphans_off_thread(marker: &str) -> usize {
    let marker = marker.to_string();
    tokio::task::spawn_blocking(move || kill_orphans(&marker))
        .await
        .unwrap_or(0)
}

/// Delete leftover profile directories under `root` older than `max_age`.
///
/// Catches directories orphaned by a crashed process. Returns how many were
/// removed.
pub fn sweep_stale_profiles(root: &Path, max_age: Duration) -> usize {
    let Ok(entries) = std::fs::read_dir(root) else {
        return 0;
    };
    let now = SystemTime::now();
    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !name.starts_with(PROFILE_DIR_PREFIX) {
            continue;
        }
        let old_enough = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age >= max_age);
        if old_enough && entry.path().is_dir() {
            remove_profile_dir(&entry.path());
            removed += 1;
        }
    }
    if removed > 0 {
        info!(removed, root = %root.display(), "swept stale profile directories");
    }
    removed
}
