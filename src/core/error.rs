use thiserror::Error;

/// Failure taxonomy for a single analysis run.
///
/// The split matters for the HTTP layer: anything attributable to the target
/// site is recovered inside the engine and reported as an explained negative
/// result; only engine-infrastructure failures escape as errors.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Bad user input — rejected before any browser or network work.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// No Chromium-family executable could be located on this machine.
    #[error("no usable browser executable found; install Chromium or set CHROME_EXECUTABLE")]
    BrowserUnavailable,

    /// The browser process failed to start (environment misconfiguration).
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    /// The browser started but the CDP session broke before navigation
    /// (page creation, interception setup, event subscription).
    #[error("browser session failed: {0}")]
    BrowserSession(String),

    /// Navigation to the target failed (DNS, TLS, refused, timeout).
    /// Recovered by the engine — the HTML pass can still produce a verdict.
    #[error("navigation failed: {0}")]
    Navigation(String),
}

impl AnalysisError {
    /// True when the failure indicates broken engine infrastructure rather
    /// than target-site behavior. These surface as HTTP 5xx.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AnalysisError::BrowserUnavailable
                | AnalysisError::BrowserLaunch(_)
                | AnalysisError::BrowserSession(_)
        )
    }
}
