//! Request-filtering policy consulted on every outgoing browser request.
//!
//! The policy suppresses load noise (images, fonts, ad networks, consent
//! platforms) so captures stay fast and uncontaminated. It must never block
//! the analytics traffic the classifier is looking for: construction filters
//! out any rule that collides with the tracking-domain or collect-path
//! configuration.

use aho_corasick::AhoCorasick;

/// CDP resource types dropped outright. "other" is the catch-all bucket for
/// beacons/pings CDP cannot categorize — those still reach the classifier
/// before the block decision, so no evidence is lost.
pub const DEFAULT_BLOCKED_RESOURCE_TYPES: &[&str] =
    &["image", "stylesheet", "font", "media", "other"];

/// Third-party noise domains. Deliberately disjoint from
/// `classifier::DEFAULT_TRACKING_DOMAINS` — ad serving and consent tooling,
/// not analytics collection.
pub const DEFAULT_BLOCKED_DOMAINS: &[&str] = &[
    "doubleclick.net",
    "googlesyndication.com",
    "adservice.google.",
    "amazon-adsystem.com",
    "criteo.com",
    "taboola.com",
    "outbrain.com",
    "adnxs.com",
    "connect.facebook.net",
    "hotjar.com",
    "mouseflow.com",
    "fullstory.com",
    "cookielaw.org",
    "cookiebot.com",
    "onetrust.com",
];

pub const DEFAULT_BLOCKED_PATHS: &[&str] = &["/pagead/", "/adsbygoogle"];

/// Ordered rule set deciding which outgoing requests the browser may make.
///
/// Evaluation order is fixed: resource type, then domain substring, then path
/// substring; first match blocks. Read-only during a run; rebuilt per run
/// from config + the external blocklist store.
pub struct ResourcePolicy {
    blocked_types: Vec<String>,
    domain_matcher: Option<AhoCorasick>,
    path_matcher: Option<AhoCorasick>,
}

impl ResourcePolicy {
    /// Build a policy from configured rules plus runtime `extra_values` from
    /// the blocklist store (treated as domain substrings, deduplicated).
    ///
    /// Any value that overlaps the classifier's configuration (contains or
    /// is contained by a tracking domain or collect-path pattern) is
    /// discarded with a warning.
    pub fn new(
        blocked_types: &[String],
        blocked_domains: &[String],
        blocked_paths: &[String],
        extra_values: &[String],
        tracking_domains: &[String],
        collect_path_patterns: &[String],
    ) -> Self {
        let blocked_types: Vec<String> = blocked_types
            .iter()
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        let mut domains: Vec<String> = Vec::new();
        for value in blocked_domains.iter().chain(extra_values.iter()) {
            let value = value.trim();
            if value.is_empty() || domains.iter().any(|d| d == value) {
                continue;
            }
            if collides(value, tracking_domains) || collides(value, collect_path_patterns) {
                tracing::warn!(
                    "resource policy: dropping blocked value '{}' — overlaps tracking configuration",
                    value
                );
                continue;
            }
            domains.push(value.to_string());
        }

        let mut paths: Vec<String> = Vec::new();
        for value in blocked_paths {
            let value = value.trim();
            if value.is_empty() || paths.iter().any(|p| p == value) {
                continue;
            }
            if collides(value, collect_path_patterns) {
                tracing::warn!(
                    "resource policy: dropping blocked path '{}' — overlaps collect patterns",
                    value
                );
                continue;
            }
            paths.push(value.to_string());
        }

        Self {
            blocked_types,
            domain_matcher: build_matcher(&domains),
            path_matcher: build_matcher(&paths),
        }
    }

    /// `true` when the request must not be allowed to proceed.
    ///
    /// Synchronous and non-blocking: this runs inside the request-interception
    /// hook, where an undecided request stalls the whole page load.
    pub fn should_block(&self, url: &str, resource_type: &str) -> bool {
        if self
            .blocked_types
            .iter()
            .any(|t| resource_type.eq_ignore_ascii_case(t))
        {
            return true;
        }
        if let Some(m) = &self.domain_matcher {
            if m.is_match(url) {
                return true;
            }
        }
        if let Some(m) = &self.path_matcher {
            if m.is_match(url) {
                return true;
            }
        }
        false
    }
}

fn collides(value: &str, configured: &[String]) -> bool {
    configured
        .iter()
        .any(|c| c.contains(value) || value.contains(c.as_str()))
}

fn build_matcher(patterns: &[String]) -> Option<AhoCorasick> {
    if patterns.is_empty() {
        return None;
    }
    // Patterns are plain substrings; Aho-Corasick gives linear-time scan.
    AhoCorasick::new(patterns).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn default_policy(extra: &[&str]) -> ResourcePolicy {
        ResourcePolicy::new(
            &strings(&["image", "font", "other"]),
            &strings(&["doubleclick.net", "hotjar.com"]),
            &strings(&["/pagead/"]),
            &strings(extra),
            &strings(&["google-analytics.com", "googletagmanager.com"]),
            &strings(&["/g/collect"]),
        )
    }

    #[test]
    fn blocks_by_resource_type_first() {
        let policy = default_policy(&[]);
        assert!(policy.should_block("https://example.com/logo.png", "image"));
        assert!(policy.should_block("https://example.com/x.woff2", "Font"));
        assert!(!policy.should_block("https://example.com/app.js", "script"));
    }

    #[test]
    fn blocks_by_domain_then_path_substring() {
        let policy = default_policy(&[]);
        assert!(policy.should_block("https://stats.doubleclick.net/r/collect", "script"));
        assert!(policy.should_block("https://example.com/pagead/view", "script"));
        assert!(!policy.should_block("https://example.com/main.js", "script"));
    }

    #[test]
    fn works_with_empty_blocklist() {
        let policy = ResourcePolicy::new(&[], &[], &[], &[], &[], &[]);
        assert!(!policy.should_block("https://example.com/anything", "image"));
    }

    #[test]
    fn runtime_values_extend_the_domain_rules() {
        let policy = default_policy(&["annoying-widget.io"]);
        assert!(policy.should_block("https://cdn.annoying-widget.io/w.js", "script"));
    }

    #[test]
    fn never_blocks_tracking_domains() {
        // A blocklist entry overlapping the tracking config must be discarded:
        // "google" is a substring of google-analytics.com, and the full domain
        // collides directly.
        let policy = default_policy(&["google", "google-analytics.com"]);
        assert!(!policy.should_block(
            "https://www.google-analytics.com/g/collect?v=2",
            "script"
        ));
        assert!(!policy.should_block("https://www.googletagmanager.com/gtm.js", "script"));
    }

    #[test]
    fn collect_paths_cannot_be_blocked() {
        let policy = ResourcePolicy::new(
            &[],
            &[],
            &strings(&["/g/collect", "/collect"]),
            &[],
            &strings(&["google-analytics.com"]),
            &strings(&["/g/collect"]),
        );
        assert!(!policy.should_block("https://analytics.example.com/g/collect?v=2", "script"));
    }
}
