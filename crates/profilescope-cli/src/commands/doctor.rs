//! Environment readiness check.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use sysinfo::System;

use profilescope::session::chromium::find_chromium;
use profilescope::session::cleanup::{sweep_stale_profiles, PROFILE_DIR_PREFIX};

use super::load_config;
use crate::output;

const MIN_MEMORY_MB: u64 = 512;
const STALE_PROFILE_AGE: Duration = Duration::from_secs(3600);

#[derive(Debug, Serialize)]
pub struct DoctorReport {
    pub os: &'static str,
    pub arch: &'static str,
    pub chromium: Option<PathBuf>,
    pub available_memory_mb: u64,
    pub tavily_configured: bool,
    pub serper_configured: bool,
    pub audit_log: Option<PathBuf>,
    pub rate_limit_state: Option<PathBuf>,
    pub stale_profiles: usize,
    pub profiles_removed: usize,
    pub ready: bool,
}

pub async fn run(config_path: Option<&Path>, fix: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let temp_root = std::env::temp_dir();

    let chromium = find_chromium(config.session.chrome_path.as_deref());
    let stale_profiles = count_stale_profiles(&temp_root, STALE_PROFILE_AGE);
    let profiles_removed = if fix {
        sweep_stale_profiles(&temp_root, STALE_PROFILE_AGE)
    } else {
        0
    };

    let mut sys = System::new();
    sys.refresh_memory();

    let tavily_configured = config.api.tavily_api_key.is_some();
    let serper_configured = config.api.serper_api_key.is_some();
    let report = DoctorReport {
        os: std::env::consts::OS,
        arch: std::env::consts::ARCH,
        ready: chromium.is_some() && (tavily_configured || serper_configured),
        chromium,
        available_memory_mb: sys.available_memory() / 1_048_576,
        tavily_configured,
        serper_configured,
        audit_log: config.paths.audit_log.clone(),
        rate_limit_state: config.paths.rate_limit_state.clone(),
        stale_profiles,
        profiles_removed,
    };

    if output::is_json() {
        output::print_json(&report);
    } else {
        print!("{}", render_report(&report));
    }
    Ok(())
}

/// Leftover `profilescope-*` profile directories older than `max_age`.
fn count_stale_profiles(root: &Path, max_age: Duration) -> usize {
    let Ok(entries) = std::fs::read_dir(root) else {
        return 0;
    };
    entries
        .flatten()
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(PROFILE_DIR_PREFIX))
        })
        .filter(|entry| entry.path().is_dir())
        .filter(|entry| {
            entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| modified.elapsed().ok())
                .is_some_and(|age| age >= max_age)
        })
        .count()
}

pub fn render_report(report: &DoctorReport) -> String {
    let mut out = String::new();
    out.push_str("Profilescope Doctor\n");
    out.push_str("===================\n\n");
    out.push_str(&format!("OS:   {}\nArch: {}\n\n", report.os, report.arch));

    match &report.chromium {
        Some(path) => out.push_str(&format!("[OK] Chromium found: {}\n", path.display())),
        None => out.push_str(
            "[!!] Chromium NOT found. Set PROFILESCOPE_CHROME_PATH or session.chrome_path.\n",
        ),
    }

    let mb = report.available_memory_mb;
    if mb >= MIN_MEMORY_MB {
        out.push_str(&format!("[OK] Available memory: {mb}MB (>= {MIN_MEMORY_MB}MB required)\n"));
    } else {
        out.push_str(&format!("[!!] Available memory: {mb}MB (< {MIN_MEMORY_MB}MB, may be insufficient)\n"));
    }

    for (name, configured) in [
        ("Tavily", report.tavily_configured),
        ("Serper", report.serper_configured),
    ] {
        if configured {
            out.push_str(&format!("[OK] {name} API key configured\n"));
        } else {
            out.push_str(&format!("[--] {name} API key not set\n"));
        }
    }

    match &report.audit_log {
        Some(path) => out.push_str(&format!("[OK] Audit log: {}\n", path.display())),
        None => out.push_str("[--] Audit log disabled\n"),
    }
    match &report.rate_limit_state {
        Some(path) => out.push_str(&format!("[OK] Rate-limit state: {}\n", path.display())),
        None => out.push_str("[--] Rate-limit state not persisted\n"),
    }

    if report.stale_profiles == 0 {
        out.push_str("[OK] No stale browser profiles\n");
    } else if report.profiles_removed > 0 {
        out.push_str(&format!(
            "[OK] Removed {} stale browser profile(s)\n",
            report.profiles_removed
        ));
    } else {
        out.push_str(&format!(
            "[!!] {} stale browser profile(s). Run `profilescope doctor --fix` to remove them.\n",
            report.stale_profiles
        ));
    }

    out.push('\n');
    if report.ready {
        out.push_str("Status: READY\n");
    } else {
        out.push_str("Status: NOT READY\n");
        if report.chromium.is_none() {
            out.push_str("  Install Chrome or Chromium.\n");
        }
        if !report.tavily_configured && !report.serper_configured {
            out.push_str("  Set TAVILY_API_KEY or SERPER_API_KEY to enable candidate search.\n");
        }
    }
    out
}
