use std::env;
use std::sync::Arc;

/// Shared handler state. Cheap to clone; all heavy members are behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub http_client: reqwest::Client,
    /// File-based config loaded from `tagprobe.json` (env-var fallback for all fields).
    pub config: Arc<crate::core::config::TagprobeConfig>,
    /// Persistent blocklist store (optional — absent when no home dir and no
    /// explicit path; the engine works with an empty list).
    pub blocklist: Option<Arc<crate::features::blocklist::BlocklistStore>>,
    /// Short-TTL cache of finished analyses keyed by sanitized URL. Repeat
    /// submissions of the same site within the window skip the browser launch.
    pub analysis_cache: moka::future::Cache<String, crate::core::types::AnalysisResult>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("blocklist_enabled", &self.blocklist.is_some())
            .field("suggest_enabled", &self.config.suggest.resolve_enabled())
            .finish()
    }
}

impl AppState {
    pub fn new(http_client: reqwest::Client) -> Self {
        let config = Arc::new(crate::core::config::load_config());

        let cache_ttl_secs = env::var("TAGPROBE_CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60 * 10);

        let blocklist = crate::features::blocklist::BlocklistStore::open(
            config.blocklist_path.as_deref(),
        )
        .map(Arc::new);

        Self {
            http_client,
            config,
            blocklist,
            analysis_cache: moka::future::Cache::builder()
                .max_capacity(10_000)
                .time_to_live(std::time::Duration::from_secs(cache_ttl_secs))
                .build(),
        }
    }

    pub fn with_blocklist(
        mut self,
        blocklist: Arc<crate::features::blocklist::BlocklistStore>,
    ) -> Self {
        self.blocklist = Some(blocklist);
        self
    }
}
