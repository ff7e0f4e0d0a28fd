//! Static-markup tracking fingerprints.
//!
//! Independent of the browser session: a plain unauthenticated GET of the
//! target, no script execution. Browser-rendered DOM and raw-fetched HTML can
//! diverge (lazy loaders, bot walls), which is exactly why this second signal
//! exists — a site that suppresses its analytics under automation still ships
//! the bootstrap snippet in its markup.

use crate::detect::sanitize::SanitizedUrl;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// GTM bootstrap snippet signature, as injected by the standard embed code.
const GTM_SNIPPET_PATTERN: &str =
    r"\(function\(w,d,s,l,i\)\{w\[l\]=w\[l\]\|\|\[\];w\[l\]\.push\(\{'gtm\.start':";

/// Keywords that betray a tag-manager / analytics install even when the full
/// snippet is minified or rearranged.
const MARKUP_KEYWORDS: &[&str] = &["dataLayer", "gtag("];

/// Script `src` hosts that are themselves a fingerprint.
const SCRIPT_SRC_HINTS: &[&str] = &["googletagmanager.com", "google-analytics.com"];

static GTM_SNIPPET_RE: OnceLock<Regex> = OnceLock::new();

fn gtm_snippet_re() -> &'static Regex {
    GTM_SNIPPET_RE.get_or_init(|| Regex::new(GTM_SNIPPET_PATTERN).expect("valid snippet pattern"))
}

/// Result of the static-markup pass.
#[derive(Debug, Clone, Default)]
pub struct HtmlSignal {
    pub detected: bool,
    /// Recorded fetch/parse failure. The pass fails soft — the network
    /// capture can still carry the verdict on its own.
    pub error: Option<String>,
}

/// Fetch the raw document at `url` and scan it for tracking fingerprints.
pub async fn scan(client: &reqwest::Client, url: &SanitizedUrl) -> HtmlSignal {
    let response = match client
        .get(url.as_str())
        .header(
            reqwest::header::USER_AGENT,
            crate::browser::random_user_agent(),
        )
        .send()
        .await
    {
        Ok(r) => r,
        Err(e) => {
            warn!("html probe: fetch failed for {}: {}", url, e);
            return HtmlSignal {
                detected: false,
                error: Some(format!("fetch failed: {e}")),
            };
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        warn!("html probe: {} returned {}", url, status);
        // Error pages still get scanned: bot walls sometimes serve the real
        // <head> with a challenge body.
        let body = response.text().await.unwrap_or_default();
        return HtmlSignal {
            detected: scan_markup(&body),
            error: Some(format!("http status {status}")),
        };
    }

    match response.text().await {
        Ok(body) => {
            let detected = scan_markup(&body);
            debug!("html probe: {} scanned, detected={}", url, detected);
            HtmlSignal {
                detected,
                error: None,
            }
        }
        Err(e) => HtmlSignal {
            detected: false,
            error: Some(format!("body read failed: {e}")),
        },
    }
}

/// Scan markup for a tracking-library fingerprint: the GTM bootstrap snippet,
/// a known keyword in inline script text, or a known analytics script `src`.
pub fn scan_markup(html: &str) -> bool {
    let document = Html::parse_document(html);
    let selector = Selector::parse("script").expect("static selector");

    for script in document.select(&selector) {
        if let Some(src) = script.value().attr("src") {
            if SCRIPT_SRC_HINTS.iter().any(|hint| src.contains(hint)) {
                return true;
            }
        }

        let text: String = script.text().collect();
        if text.is_empty() {
            continue;
        }
        if gtm_snippet_re().is_match(&text) {
            return true;
        }
        if MARKUP_KEYWORDS.iter().any(|kw| text.contains(kw)) {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    const GTM_SNIPPET_PAGE: &str = r#"<html><head>
        <script>(function(w,d,s,l,i){w[l]=w[l]||[];w[l].push({'gtm.start':
        new Date().getTime(),event:'gtm.js'});var f=d.getElementsByTagName(s)[0],
        j=d.createElement(s);j.async=true;j.src='https://www.googletagmanager.com/gtm.js?id='+i;
        f.parentNode.insertBefore(j,f);})(window,document,'script','dataLayer','GTM-ABCD123');</script>
        </head><body>hello</body></html>"#;

    #[test]
    fn detects_gtm_bootstrap_snippet() {
        assert!(scan_markup(GTM_SNIPPET_PAGE));
    }

    #[test]
    fn detects_data_layer_keyword_alone() {
        let html = r#"<html><body><script>window.dataLayer = window.dataLayer || [];</script></body></html>"#;
        assert!(scan_markup(html));
    }

    #[test]
    fn detects_gtag_call() {
        let html = r#"<script>gtag('config', 'G-ABC123');</script>"#;
        assert!(scan_markup(html));
    }

    #[test]
    fn detects_gtm_script_src() {
        let html = r#"<html><head><script async src="https://www.googletagmanager.com/gtag/js?id=G-ABC"></script></head></html>"#;
        assert!(scan_markup(html));
    }

    #[test]
    fn clean_page_yields_no_signal() {
        let html = r#"<html><head><title>Plain</title>
            <script src="/static/app.js"></script>
            <script>console.log("no analytics here");</script>
            </head><body><p>dataLayer mentioned in prose does not count</p></body></html>"#;
        assert!(!scan_markup(html));
    }

    #[test]
    fn keyword_outside_script_elements_is_ignored() {
        let html = r#"<html><body><div>Our docs explain what a dataLayer is.</div></body></html>"#;
        assert!(!scan_markup(html));
    }
}
