//! Final verdict composition.
//!
//! Merges the network-level evidence with the static-markup signal. The
//! asymmetric middle case — markup fingerprint but zero captured requests —
//! is reported distinctly: some sites lazy-load or fire analytics only under
//! real user interaction, so markup-only detection is weaker evidence and the
//! caller should be able to judge confidence from the message.

use crate::core::types::AnalysisResult;
use crate::detect::evidence::Evidence;
use crate::detect::html_probe::HtmlSignal;

pub fn compose(evidence: &Evidence, html: &HtmlSignal) -> AnalysisResult {
    let tracking = &evidence.tracking_requests;
    let obfuscated = &evidence.obfuscated_requests;

    let has_tracking = !tracking.is_empty() || html.detected;

    let message = match (tracking.is_empty(), obfuscated.is_empty(), html.detected) {
        (false, false, _) => format!(
            "Tracking detected via network requests. {} request(s) are routed through a \
             first-party domain, potentially obfuscating tracking.",
            obfuscated.len()
        ),
        (false, true, _) => "Tracking detected via network requests. This website is sending \
             analytics data directly to Google Analytics."
            .to_string(),
        (true, false, true) => format!(
            "Tracking detected. No direct Google Analytics requests were captured, but {} \
             request(s) match a collection endpoint on a first-party domain, potentially \
             obfuscating tracking.",
            obfuscated.len()
        ),
        (true, false, false) => format!(
            "No tracking implementation confirmed, but {} request(s) match a \
             collection-endpoint pattern on a first-party domain. Detection may be \
             suppressed by the site.",
            obfuscated.len()
        ),
        (true, true, true) => "Tracking detected in page markup only; no analytics requests \
             were captured. Detection may be suppressed by the site, or tags may fire only \
             on real user interaction."
            .to_string(),
        (true, true, false) => "No Google Tag Manager or Google Analytics implementation \
             detected on this website. Detection may be suppressed by the site."
            .to_string(),
    };

    AnalysisResult {
        has_tracking,
        tracking_requests: tracking.clone(),
        obfuscated_requests: obfuscated.clone(),
        message,
    }
}
