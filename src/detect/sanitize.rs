use crate::core::error::AnalysisError;
use url::Url;

/// A validated, normalized target URL.
///
/// Invariants: scheme is `http` or `https`, fragment is cleared. Every
/// downstream component (browser driver, HTML probe) assumes its input went
/// through here — construction is the only entry point, and it runs before
/// any network or browser work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedUrl(Url);

impl SanitizedUrl {
    pub fn parse(raw: &str) -> Result<Self, AnalysisError> {
        let mut url = Url::parse(raw.trim())
            .map_err(|e| AnalysisError::InvalidUrl(format!("{raw}: {e}")))?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(AnalysisError::InvalidUrl(format!(
                    "unsupported scheme '{other}' (only http/https)"
                )))
            }
        }

        url.set_fragment(None);
        Ok(Self(url))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }
}

impl std::fmt::Display for SanitizedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
