//! End-to-end detection scenarios over the engine's injected seams.
//!
//! The browser driver takes the interception hook as a plain `RequestInspector`,
//! so the full classify → block → compose path is exercised here by replaying
//! the request stream a page would produce — no live Chromium required.

use std::sync::Arc;

use tagprobe::browser::{RequestDecision, RequestInspector};
use tagprobe::detect::html_probe::{scan_markup, HtmlSignal};
use tagprobe::detect::{verdict, CaptureInspector, DetectorConfig, EvidenceLog};
use tagprobe::SanitizedUrl;

fn engine_config() -> DetectorConfig {
    DetectorConfig {
        tracking_domains: vec![
            "googletagmanager.com".into(),
            "google-analytics.com".into(),
            "analytics.google.com".into(),
        ],
        collect_path_patterns: vec!["/g/collect".into(), "/j/collect".into()],
        blocked_resource_types: vec![
            "image".into(),
            "stylesheet".into(),
            "font".into(),
            "media".into(),
            "other".into(),
        ],
        blocked_domains: vec!["doubleclick.net".into(), "hotjar.com".into()],
        blocked_paths: vec!["/pagead/".into()],
        extra_blocked_values: vec![],
        capture: Default::default(),
    }
}

/// Replay a page's outgoing requests through the interception hook and
/// return (evidence log, per-request decisions).
fn replay(
    config: &DetectorConfig,
    requests: &[(&str, &str)],
) -> (Arc<EvidenceLog>, Vec<RequestDecision>) {
    let evidence = Arc::new(EvidenceLog::new());
    let inspector = CaptureInspector::from_config(config, evidence.clone());
    let decisions = requests
        .iter()
        .map(|(url, rtype)| inspector.inspect(url, rtype))
        .collect();
    (evidence, decisions)
}

#[test]
fn scenario_plain_page_yields_clean_negative() {
    let config = engine_config();
    let (evidence, _) = replay(
        &config,
        &[
            ("https://example.com/", "document"),
            ("https://example.com/app.js", "script"),
            ("https://example.com/style.css", "stylesheet"),
        ],
    );
    let html = HtmlSignal {
        detected: scan_markup("<html><head><title>Plain</title></head><body>hi</body></html>"),
        error: None,
    };

    let result = verdict::compose(&evidence.snapshot(), &html);

    assert!(!result.has_tracking);
    assert!(result.tracking_requests.is_empty());
    assert!(result.obfuscated_requests.is_empty());
    assert!(result.message.contains("No Google Tag Manager"));
}

#[test]
fn scenario_direct_google_analytics() {
    let config = engine_config();
    let collect = "https://www.google-analytics.com/g/collect?v=2&tid=G-ABC123&en=page_view";
    let (evidence, decisions) = replay(
        &config,
        &[
            ("https://shop.example/", "document"),
            ("https://www.googletagmanager.com/gtm.js?id=GTM-ABCD123", "script"),
            (collect, "xhr"),
        ],
    );
    let html = HtmlSignal {
        detected: scan_markup(
            r#"<script async src="https://www.googletagmanager.com/gtm.js?id=GTM-ABCD123"></script>"#,
        ),
        error: None,
    };

    let result = verdict::compose(&evidence.snapshot(), &html);

    assert!(result.has_tracking);
    assert!(result.tracking_requests.contains(&collect.to_string()));
    assert!(result.obfuscated_requests.is_empty());
    // Analytics traffic itself must never be blocked by the policy.
    assert!(decisions.iter().take(2).all(|d| *d == RequestDecision::Allow));
}

#[test]
fn scenario_first_party_proxy_is_flagged_as_obfuscated() {
    let config = engine_config();
    let proxied = "https://analytics.shop.example/g/collect?v=2&tid=G-ABC123";
    let (evidence, _) = replay(
        &config,
        &[
            ("https://shop.example/", "document"),
            ("https://shop.example/metrics.js", "script"),
            (proxied, "xhr"),
        ],
    );
    // Proxied setups still ship the dataLayer bootstrap in markup.
    let html = HtmlSignal {
        detected: scan_markup("<script>window.dataLayer = window.dataLayer || [];</script>"),
        error: None,
    };

    let result = verdict::compose(&evidence.snapshot(), &html);

    assert!(result.has_tracking);
    assert!(result.tracking_requests.is_empty());
    assert_eq!(result.obfuscated_requests, vec![proxied.to_string()]);
    assert!(result.message.contains("first-party domain"));
}

#[test]
fn scenario_bot_blocked_site_detected_from_markup_only() {
    // Navigation produced no usable traffic (bot wall), but the raw fetch of
    // the markup still shows a dataLayer — low-confidence positive.
    let config = engine_config();
    let (evidence, _) = replay(&config, &[]);
    let html = HtmlSignal {
        detected: scan_markup(
            r#"<html><head><script>window.dataLayer=window.dataLayer||[];</script></head></html>"#,
        ),
        error: None,
    };

    let result = verdict::compose(&evidence.snapshot(), &html);

    assert!(result.has_tracking);
    assert!(result.tracking_requests.is_empty());
    assert!(result.obfuscated_requests.is_empty());
    assert!(result.message.contains("markup only"));
}

#[test]
fn repeated_replay_is_idempotent() {
    let config = engine_config();
    let requests = [
        ("https://shop.example/", "document"),
        ("https://www.google-analytics.com/g/collect?v=2", "xhr"),
        ("https://analytics.shop.example/g/collect?v=2", "xhr"),
        ("https://cdn.shop.example/banner.png", "image"),
    ];
    let html = HtmlSignal {
        detected: true,
        error: None,
    };

    let first = verdict::compose(&replay(&config, &requests).0.snapshot(), &html);
    let second = verdict::compose(&replay(&config, &requests).0.snapshot(), &html);

    assert_eq!(first, second);
}

#[test]
fn duplicate_beacons_show_twice() {
    let config = engine_config();
    let beacon = "https://www.google-analytics.com/g/collect?v=2&en=scroll";
    let (evidence, _) = replay(&config, &[(beacon, "xhr"), (beacon, "xhr")]);

    let snapshot = evidence.snapshot();
    assert_eq!(snapshot.tracking_requests, vec![beacon, beacon]);
}

#[test]
fn evidence_lists_never_overlap() {
    let config = engine_config();
    let (evidence, _) = replay(
        &config,
        &[
            ("https://www.google-analytics.com/g/collect?v=2", "xhr"),
            ("https://region1.google-analytics.com/g/collect?v=2", "xhr"),
            ("https://metrics.shop.example/g/collect?v=2", "xhr"),
            ("https://metrics.shop.example/j/collect?v=1", "xhr"),
        ],
    );
    let result = verdict::compose(
        &evidence.snapshot(),
        &HtmlSignal {
            detected: true,
            error: None,
        },
    );

    assert_eq!(result.tracking_requests.len(), 2);
    assert_eq!(result.obfuscated_requests.len(), 2);
    for url in &result.tracking_requests {
        assert!(!result.obfuscated_requests.contains(url));
    }
}

#[test]
fn invalid_input_never_reaches_the_engine() {
    for raw in ["ftp://example.com", "not a url", "javascript:alert(1)"] {
        assert!(SanitizedUrl::parse(raw).is_err(), "{raw} must be rejected");
    }
}

#[test]
fn blocklist_values_shape_the_policy_without_touching_evidence() {
    let mut config = engine_config();
    config.extra_blocked_values = vec!["annoying-cdn.example".into()];

    let (evidence, decisions) = replay(
        &config,
        &[
            ("https://annoying-cdn.example/widget.js", "script"),
            ("https://www.google-analytics.com/g/collect?v=2", "xhr"),
        ],
    );

    assert_eq!(decisions[0], RequestDecision::Block);
    assert_eq!(decisions[1], RequestDecision::Allow);
    // Both attempts are in the observed trace regardless of blocking.
    assert_eq!(evidence.snapshot().observed_urls.len(), 2);
}
