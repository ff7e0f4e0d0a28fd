//! Evidence collection for a single capture.
//!
//! The interception hook runs on the CDP event stream, so the log uses a
//! plain mutex with short, non-blocking critical sections. Order is
//! observation order; duplicates are preserved — a page firing the same
//! beacon twice shows it twice.

use crate::detect::classifier::ClassificationSignal;
use std::sync::Mutex;

#[derive(Default)]
pub struct EvidenceLog {
    inner: Mutex<Evidence>,
}

/// Immutable snapshot of collected evidence.
#[derive(Debug, Default, Clone)]
pub struct Evidence {
    pub tracking_requests: Vec<String>,
    pub obfuscated_requests: Vec<String>,
    /// Every URL the page attempted, classified or not — input for the
    /// blocklist-suggestion collaborator.
    pub observed_urls: Vec<String>,
}

impl EvidenceLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, url: &str, signal: &ClassificationSignal) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.observed_urls.push(url.to_string());
        match signal {
            ClassificationSignal::Tracking(u) => inner.tracking_requests.push(u.clone()),
            ClassificationSignal::Obfuscated(u) => inner.obfuscated_requests.push(u.clone()),
            ClassificationSignal::Ignored => {}
        }
    }

    pub fn snapshot(&self) -> Evidence {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
