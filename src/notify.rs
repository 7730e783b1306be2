//! UI-side observer implementations.
//!
//! These sit on the consumer end of the dispatcher and the report store:
//! a progress bar value, a transient status banner, and the report list
//! refresh hook. All of them are plain state holders the rendering layer
//! reads; none of them touch the store or the graphs.

use {
    crate::dispatch::{ProgressObserver, StatusObserver},
    crate::model::Report,
    crate::report_store::StoreObserver,
};

/// How long a status banner stays visible.
pub const STATUS_DISPLAY_MS: i64 = 1500;

/// Latest computation progress, percent.
#[derive(Default)]
pub struct ProgressTracker {
    percent: f64,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }
}

impl ProgressObserver for ProgressTracker {
    fn progress_updated(&mut self, percent: f64) {
        self.percent = percent;
    }
}

/// Transient status banner with a fixed display interval.
///
/// A posted message is visible until `STATUS_DISPLAY_MS` after arrival,
/// then reads as dismissed. The clock is injected so dismissal is testable
/// without sleeping.
pub struct Notifier {
    current: Option<(String, i64)>,
    now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl Notifier {
    /// Notifier on the system clock (epoch milliseconds).
    pub fn new() -> Self {
        Self::with_clock(Box::new(|| chrono::Utc::now().timestamp_millis()))
    }

    /// Notifier on a custom clock, for deterministic tests.
    pub fn with_clock(now_fn: Box<dyn Fn() -> i64 + Send + Sync>) -> Self {
        Self {
            current: None,
            now_fn,
        }
    }

    /// The visible banner text, or None once the display interval passed.
    pub fn current(&self) -> Option<&str> {
        let now = (self.now_fn)();
        match &self.current {
            Some((text, deadline)) if now < *deadline => Some(text.as_str()),
            _ => None,
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusObserver for Notifier {
    fn status_posted(&mut self, status: &str, message: &str) {
        let deadline = (self.now_fn)() + STATUS_DISPLAY_MS;
        let text = if message.is_empty() {
            status.to_string()
        } else {
            format!("{}: {}", status, message)
        };
        self.current = Some((text, deadline));
    }
}

/// Report list refresh hook: keeps the ordered key list and logs arrivals.
#[derive(Default)]
pub struct ReportListLogger {
    keys: Vec<u64>,
}

impl ReportListLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store keys in arrival order.
    pub fn keys(&self) -> &[u64] {
        &self.keys
    }
}

impl StoreObserver for ReportListLogger {
    fn report_added(&mut self, key: u64, report: &Report) {
        self.keys.push(key);
        log::info!(
            "Report {} added ({} members, {} listed)",
            key,
            report.members.len(),
            self.keys.len()
        );
    }
}
