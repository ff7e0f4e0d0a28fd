//! Per-request tracking classification.
//!
//! Runs on every URL the browser attempts to fetch, before and independently
//! of the resource policy's block decision — a beacon that gets blocked on
//! the wire was still attempted by the page and counts as evidence.

use aho_corasick::AhoCorasick;

/// Known analytics / tag-manager collection domains.
///
/// Bare `google.com` is intentionally not here: it would classify fonts,
/// maps, and every other Google-hosted resource as tracking. Override via
/// `detection.tracking_domains` if you want the aggressive behavior.
pub const DEFAULT_TRACKING_DOMAINS: &[&str] = &[
    "googletagmanager.com",
    "google-analytics.com",
    "analytics.google.com",
];

/// Collection-endpoint path fragments used by proxied first-party setups.
/// `/g/collect` is the GA4 event endpoint, `/j/collect` the Universal
/// Analytics one.
pub const DEFAULT_COLLECT_PATH_PATTERNS: &[&str] = &["/g/collect", "/j/collect"];

/// Outcome of classifying one observed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationSignal {
    /// URL matches a known tracking domain — direct-to-Google analytics.
    Tracking(String),
    /// URL matches a collection-endpoint path on a domain NOT in the
    /// tracking list — analytics routed through a first-party proxy.
    Obfuscated(String),
    Ignored,
}

pub struct RequestClassifier {
    domain_matcher: Option<AhoCorasick>,
    path_matcher: Option<AhoCorasick>,
}

impl RequestClassifier {
    pub fn new(tracking_domains: &[String], collect_path_patterns: &[String]) -> Self {
        Self {
            domain_matcher: build_matcher(tracking_domains),
            path_matcher: build_matcher(collect_path_patterns),
        }
    }

    /// Pure function of (url, configuration): same inputs, same signal.
    ///
    /// Tie-break: a domain match always wins — a direct-to-Google request
    /// that happens to contain `/g/collect` is `Tracking`, never
    /// `Obfuscated`.
    pub fn classify(&self, url: &str) -> ClassificationSignal {
        if let Some(m) = &self.domain_matcher {
            if m.is_match(url) {
                return ClassificationSignal::Tracking(url.to_string());
            }
        }
        if let Some(m) = &self.path_matcher {
            if m.is_match(url) {
                return ClassificationSignal::Obfuscated(url.to_string());
            }
        }
        ClassificationSignal::Ignored
    }
}

fn build_matcher(patterns: &[String]) -> Option<AhoCorasick> {
    let patterns: Vec<&String> = patterns.iter().filter(|p| !p.trim().is_empty()).collect();
    if patterns.is_empty() {
        return None;
    }
    AhoCorasick::new(&patterns).ok()
}
