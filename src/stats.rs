//! Cache statistics reporter
//!
//! Prints a snapshot of the file cache to stdout at a fixed interval.

use chrono::{DateTime, Local};
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::config::parse_duration;
use crate::filecache::{CacheStats, FileCache};
use crate::logger;
use crate::periodic::PeriodicTask;

/// Render one report block, followed by two empty lines
pub fn render_report(stats: &CacheStats, now: DateTime<Local>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "-----[ cache stats: {} ]-----",
        now.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(out, "files cached: {} (max: {})", stats.items, stats.max_items);
    let _ = writeln!(
        out,
        "cache size: {} bytes (will cache files up to {} bytes)",
        stats.bytes, stats.max_size
    );
    out.push_str("[ cached files ]\n");
    for name in &stats.files {
        let _ = writeln!(out, "\t* {name}");
    }
    out.push_str("\n\n");
    out
}

/// Interpret the configured dump interval
///
/// Empty means off. Unparsable or zero values are reported and also leave
/// the reporter off; they never stop the server.
pub fn reporter_interval(raw: &str) -> Option<Duration> {
    if raw.trim().is_empty() {
        return None;
    }
    match parse_duration(raw) {
        Ok(interval) if interval.is_zero() => {
            logger::log_warning(&format!(
                "Dump interval '{raw}' is zero, cache stats disabled"
            ));
            None
        }
        Ok(interval) => Some(interval),
        Err(e) => {
            logger::log_warning(&format!("Ignoring dump interval: {e}, cache stats disabled"));
            None
        }
    }
}

/// Running stats reporter
pub struct StatsReporter {
    task: PeriodicTask,
}

impl StatsReporter {
    pub fn start(cache: Arc<FileCache>, interval: Duration) -> Self {
        let task = PeriodicTask::spawn("cache-stats", interval, move || {
            let report = render_report(&cache.stats(), Local::now());
            async move {
                let mut stdout = tokio::io::stdout();
                let written = match stdout.write_all(report.as_bytes()).await {
                    Ok(()) => stdout.flush().await,
                    Err(e) => Err(e),
                };
                if let Err(e) = written {
                    logger::log_warning(&format!("Failed to write cache stats: {e}"));
                }
            }
        });
        Self { task }
    }

    pub async fn stop(self) {
        self.task.stop().await;
    }
}
