//! The page-load network classification engine.
//!
//! One [`Detector`] call = one analysis run: sanitize the URL, drive a
//! headless browser with the policy+classifier attached as the
//! request-interception hook, independently probe the raw markup, then
//! compose both signal sets into an [`AnalysisResult`].

pub mod classifier;
pub mod evidence;
pub mod html_probe;
pub mod policy;
pub mod sanitize;
pub mod verdict;

pub use classifier::{ClassificationSignal, RequestClassifier};
pub use evidence::{Evidence, EvidenceLog};
pub use policy::ResourcePolicy;
pub use sanitize::SanitizedUrl;

use crate::browser::{self, CaptureOptions, RequestDecision, RequestInspector};
use crate::core::config::DetectionConfig;
use crate::core::error::AnalysisError;
use crate::core::types::AnalysisResult;
use std::sync::Arc;
use tracing::{info, warn};

/// Fully-resolved engine configuration for one run.
///
/// All lists arrive here explicitly — the engine never reads the blocklist
/// store or any other ambient state, so tests substitute plain vectors.
#[derive(Debug, Clone, Default)]
pub struct DetectorConfig {
    pub tracking_domains: Vec<String>,
    pub collect_path_patterns: Vec<String>,
    pub blocked_resource_types: Vec<String>,
    pub blocked_domains: Vec<String>,
    pub blocked_paths: Vec<String>,
    /// Runtime additions from the external blocklist store.
    pub extra_blocked_values: Vec<String>,
    pub capture: CaptureOptions,
}

impl DetectorConfig {
    /// Resolve from the file/env config plus the blocklist store's values.
    pub fn resolve(detection: &DetectionConfig, extra_blocked_values: Vec<String>) -> Self {
        Self {
            tracking_domains: detection.resolve_tracking_domains(),
            collect_path_patterns: detection.resolve_collect_path_patterns(),
            blocked_resource_types: detection.resolve_blocked_resource_types(),
            blocked_domains: detection.resolve_blocked_domains(),
            blocked_paths: detection.resolve_blocked_paths(),
            extra_blocked_values,
            capture: CaptureOptions {
                navigation_timeout: detection.resolve_navigation_timeout(),
                quiet_period: detection.resolve_quiet_period(),
                max_capture: detection.resolve_max_capture(),
            },
        }
    }
}

/// Engine output: the caller-facing result plus the full observed-URL trace
/// (input for the blocklist-suggestion collaborator).
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub result: AnalysisResult,
    pub observed_urls: Vec<String>,
}

pub struct Detector {
    config: DetectorConfig,
    http: reqwest::Client,
}

impl Detector {
    pub fn new(config: DetectorConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    /// Validate `raw_url` and run the full analysis.
    ///
    /// Invalid input fails here, before any browser or network work.
    pub async fn analyze(&self, raw_url: &str) -> Result<AnalysisOutcome, AnalysisError> {
        let url = SanitizedUrl::parse(raw_url)?;
        self.analyze_url(&url).await
    }

    pub async fn analyze_url(&self, url: &SanitizedUrl) -> Result<AnalysisOutcome, AnalysisError> {
        let evidence = Arc::new(EvidenceLog::new());
        let inspector: Arc<dyn RequestInspector> =
            Arc::new(CaptureInspector::from_config(&self.config, evidence.clone()));

        // The browser pass and the raw-markup probe are independent; run them
        // concurrently and merge at compose time.
        let (capture_result, html_signal) = tokio::join!(
            browser::capture(url, inspector, &self.config.capture),
            html_probe::scan(&self.http, url),
        );

        match capture_result {
            Ok(()) => {}
            Err(AnalysisError::Navigation(reason)) => {
                // Site-attributable: fall through with whatever (likely zero)
                // network evidence exists — the markup signal still counts.
                warn!("analyze: navigation failed for {}: {}", url, reason);
            }
            Err(fatal) => return Err(fatal),
        }

        let snapshot = evidence.snapshot();
        let result = verdict::compose(&snapshot, &html_signal);
        info!(
            "analyze: {} → has_tracking={} ({} tracking, {} obfuscated, {} observed)",
            url,
            result.has_tracking,
            result.tracking_requests.len(),
            result.obfuscated_requests.len(),
            snapshot.observed_urls.len()
        );

        Ok(AnalysisOutcome {
            result,
            observed_urls: snapshot.observed_urls,
        })
    }
}

/// The request-interception hook: classification first, block decision second.
///
/// The order is a hard requirement — a request the policy is about to block
/// was still attempted by the page, and classification is based on URL
/// inspection, never on whether the request completed over the wire.
pub struct CaptureInspector {
    classifier: RequestClassifier,
    policy: ResourcePolicy,
    evidence: Arc<EvidenceLog>,
}

impl CaptureInspector {
    pub fn from_config(config: &DetectorConfig, evidence: Arc<EvidenceLog>) -> Self {
        Self {
            classifier: RequestClassifier::new(
                &config.tracking_domains,
                &config.collect_path_patterns,
            ),
            policy: ResourcePolicy::new(
                &config.blocked_resource_types,
                &config.blocked_domains,
                &config.blocked_paths,
                &config.extra_blocked_values,
                &config.tracking_domains,
                &config.collect_path_patterns,
            ),
            evidence,
        }
    }
}

impl RequestInspector for CaptureInspector {
    fn inspect(&self, url: &str, resource_type: &str) -> RequestDecision {
        let signal = self.classifier.classify(url);
        self.evidence.record(url, &signal);

        if self.policy.should_block(url, resource_type) {
            RequestDecision::Block
        } else {
            RequestDecision::Allow
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> DetectorConfig {
        DetectorConfig {
            tracking_domains: vec![
                "googletagmanager.com".into(),
                "google-analytics.com".into(),
            ],
            collect_path_patterns: vec!["/g/collect".into()],
            blocked_resource_types: vec!["image".into(), "font".into()],
            blocked_domains: vec!["doubleclick.net".into()],
            blocked_paths: vec![],
            extra_blocked_values: vec![],
            capture: CaptureOptions::default(),
        }
    }

    #[test]
    fn classification_survives_the_block_decision() {
        // A GA pixel beacon is an "image" resource — the policy blocks it,
        // but it must still be recorded as tracking evidence.
        let evidence = Arc::new(EvidenceLog::new());
        let inspector = CaptureInspector::from_config(&test_config(), evidence.clone());

        let url = "https://www.google-analytics.com/collect?v=1&t=pageview";
        let decision = inspector.inspect(url, "image");

        assert_eq!(decision, RequestDecision::Block);
        assert_eq!(evidence.snapshot().tracking_requests, vec![url]);
    }

    #[test]
    fn allowed_requests_are_recorded_too() {
        let evidence = Arc::new(EvidenceLog::new());
        let inspector = CaptureInspector::from_config(&test_config(), evidence.clone());

        let gtm = "https://www.googletagmanager.com/gtm.js?id=GTM-XYZ";
        assert_eq!(inspector.inspect(gtm, "script"), RequestDecision::Allow);

        let plain = "https://example.com/app.js";
        assert_eq!(inspector.inspect(plain, "script"), RequestDecision::Allow);

        let snapshot = evidence.snapshot();
        assert_eq!(snapshot.tracking_requests, vec![gtm]);
        assert_eq!(snapshot.observed_urls, vec![gtm, plain]);
    }

    #[test]
    fn blocked_noise_is_observed_but_unclassified() {
        let evidence = Arc::new(EvidenceLog::new());
        let inspector = CaptureInspector::from_config(&test_config(), evidence.clone());

        let ad = "https://stats.doubleclick.net/pixel";
        assert_eq!(inspector.inspect(ad, "script"), RequestDecision::Block);

        let snapshot = evidence.snapshot();
        assert!(snapshot.tracking_requests.is_empty());
        assert_eq!(snapshot.observed_urls, vec![ad]);
    }
}
