use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub url: String,
}

/// Terminal artifact of a single analysis run.
///
/// Field names are camelCase on the wire (`hasTracking`, `trackingRequests`,
/// …) so existing front-ends consuming the check-tracking API keep working.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub has_tracking: bool,
    /// Request URLs that matched a known tracking domain, in observation
    /// order, duplicates preserved.
    pub tracking_requests: Vec<String>,
    /// Request URLs that matched a collection-endpoint path on a domain NOT
    /// in the tracking list. Never overlaps `tracking_requests`.
    pub obfuscated_requests: Vec<String>,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
