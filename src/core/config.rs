use std::time::Duration;

// ---------------------------------------------------------------------------
// TagprobeConfig — file-based config loader (tagprobe.json) with env-var fallback
// ---------------------------------------------------------------------------

/// Detection sub-config (mirrors the `detection` key in tagprobe.json).
///
/// Every field is optional; absent fields fall back to an env var and then to
/// the built-in defaults in `crate::detect`. The domain/pattern lists are
/// deliberately configuration, not hardcoded contracts — deployments disagree
/// on how aggressive the tracking-domain list should be.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct DetectionConfig {
    /// Substrings identifying known analytics / tag-manager domains.
    pub tracking_domains: Option<Vec<String>>,
    /// Path fragments identifying proxied collection endpoints (`/g/collect` style).
    pub collect_path_patterns: Option<Vec<String>>,
    /// CDP resource types the policy drops outright (image, font, …).
    pub blocked_resource_types: Option<Vec<String>>,
    /// Domain substrings the policy drops (ad networks, consent platforms, …).
    pub blocked_domains: Option<Vec<String>>,
    /// Path substrings the policy drops.
    pub blocked_paths: Option<Vec<String>>,
    /// Seconds to wait for the initial navigation. Default: 15.
    pub navigation_timeout_secs: Option<u64>,
    /// Network-quiescence quiet period in milliseconds. Default: 1500.
    pub quiet_ms: Option<u64>,
    /// Hard bound on the whole browser capture in seconds. Default: 25.
    pub max_capture_secs: Option<u64>,
}

fn env_list(key: &str) -> Option<Vec<String>> {
    let raw = std::env::var(key).ok()?;
    let values: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl DetectionConfig {
    /// Tracking domains: JSON field → `TAGPROBE_TRACKING_DOMAINS` (comma-separated)
    /// → built-in defaults. Bare `google.com` is intentionally absent from the
    /// defaults; add it here if you accept the false-positive risk.
    pub fn resolve_tracking_domains(&self) -> Vec<String> {
        self.tracking_domains
            .clone()
            .or_else(|| env_list("TAGPROBE_TRACKING_DOMAINS"))
            .unwrap_or_else(|| {
                crate::detect::classifier::DEFAULT_TRACKING_DOMAINS
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            })
    }

    /// Collection-endpoint path fragments: JSON field →
    /// `TAGPROBE_COLLECT_PATHS` → defaults (`/g/collect`, `/j/collect`).
    pub fn resolve_collect_path_patterns(&self) -> Vec<String> {
        self.collect_path_patterns
            .clone()
            .or_else(|| env_list("TAGPROBE_COLLECT_PATHS"))
            .unwrap_or_else(|| {
                crate::detect::classifier::DEFAULT_COLLECT_PATH_PATTERNS
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            })
    }

    pub fn resolve_blocked_resource_types(&self) -> Vec<String> {
        self.blocked_resource_types
            .clone()
            .or_else(|| env_list("TAGPROBE_BLOCKED_RESOURCE_TYPES"))
            .unwrap_or_else(|| {
                crate::detect::policy::DEFAULT_BLOCKED_RESOURCE_TYPES
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            })
    }

    pub fn resolve_blocked_domains(&self) -> Vec<String> {
        self.blocked_domains
            .clone()
            .or_else(|| env_list("TAGPROBE_BLOCKED_DOMAINS"))
            .unwrap_or_else(|| {
                crate::detect::policy::DEFAULT_BLOCKED_DOMAINS
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            })
    }

    pub fn resolve_blocked_paths(&self) -> Vec<String> {
        self.blocked_paths
            .clone()
            .or_else(|| env_list("TAGPROBE_BLOCKED_PATHS"))
            .unwrap_or_else(|| {
                crate::detect::policy::DEFAULT_BLOCKED_PATHS
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            })
    }

    pub fn resolve_navigation_timeout(&self) -> Duration {
        Duration::from_secs(
            self.navigation_timeout_secs
                .or_else(|| env_u64("TAGPROBE_NAV_TIMEOUT_SECS"))
                .unwrap_or(15),
        )
    }

    pub fn resolve_quiet_period(&self) -> Duration {
        Duration::from_millis(
            self.quiet_ms
                .or_else(|| env_u64("TAGPROBE_QUIET_MS"))
                .unwrap_or(1500),
        )
    }

    /// Hard bound on the whole browser capture. Sized for serverless-style
    /// execution limits: the run is treated as complete when it expires.
    pub fn resolve_max_capture(&self) -> Duration {
        Duration::from_secs(
            self.max_capture_secs
                .or_else(|| env_u64("TAGPROBE_MAX_CAPTURE_SECS"))
                .unwrap_or(25),
        )
    }
}

/// Blocklist-suggestion sub-config (mirrors the `suggest` key in tagprobe.json).
///
/// Points at any OpenAI-compatible endpoint. Suggestion is strictly optional:
/// with no base URL configured the feature is silently off.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct SuggestConfig {
    /// Whether post-run blocklist suggestion runs at all. Defaults to `true`
    /// when an endpoint is configured.
    pub enabled: Option<bool>,
    /// LLM endpoint — e.g. `https://api.openai.com/v1` or `http://localhost:11434/v1` (Ollama).
    pub llm_base_url: Option<String>,
    /// API key. Never logged. Leave blank for key-less local endpoints.
    pub llm_api_key: Option<String>,
    /// Model name — e.g. `gpt-4o-mini`, `llama3`.
    pub llm_model: Option<String>,
}

impl SuggestConfig {
    /// API key: JSON field → `OPENAI_API_KEY` env var → `None`.
    ///
    /// An explicit empty string in the config file means "no key required"
    /// (Ollama / LM Studio) — the call proceeds without auth.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(k) = &self.llm_api_key {
            return Some(k.trim().to_string());
        }
        std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty())
    }

    /// LLM base URL: JSON field → `OPENAI_BASE_URL` env var → `None` (feature off).
    pub fn resolve_base_url(&self) -> Option<String> {
        if let Some(u) = &self.llm_base_url {
            if !u.trim().is_empty() {
                return Some(u.clone());
            }
        }
        std::env::var("OPENAI_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
    }

    /// Model name: JSON field → `TAGPROBE_SUGGEST_MODEL` env var → `gpt-4o-mini`.
    pub fn resolve_model(&self) -> String {
        if let Some(m) = &self.llm_model {
            if !m.trim().is_empty() {
                return m.clone();
            }
        }
        std::env::var("TAGPROBE_SUGGEST_MODEL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "gpt-4o-mini".to_string())
    }

    /// Suggestion is on when enabled AND an endpoint is resolvable.
    pub fn resolve_enabled(&self) -> bool {
        self.enabled.unwrap_or(true) && self.resolve_base_url().is_some()
    }
}

/// Top-level config loaded from `tagprobe.json`.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct TagprobeConfig {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub suggest: SuggestConfig,
    /// Override for the blocklist store file. Default: `~/.tagprobe/blocklist.json`.
    pub blocklist_path: Option<String>,
}

/// Load `tagprobe.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `TAGPROBE_CONFIG` env var path
/// 2. `./tagprobe.json` (process cwd)
/// 3. `../tagprobe.json` (one level up)
///
/// Missing file → `TagprobeConfig::default()` (silent, all env-var fallbacks apply).
/// Parse error → log a warning, return `TagprobeConfig::default()`.
pub fn load_config() -> TagprobeConfig {
    let candidates: Vec<std::path::PathBuf> = {
        let mut v = vec![
            std::path::PathBuf::from("tagprobe.json"),
            std::path::PathBuf::from("../tagprobe.json"),
        ];
        if let Ok(env_path) = std::env::var("TAGPROBE_CONFIG") {
            v.insert(0, std::path::PathBuf::from(env_path));
        }
        v
    };

    for path in &candidates {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<TagprobeConfig>(&contents) {
                Ok(cfg) => {
                    tracing::info!("tagprobe.json loaded from {}", path.display());
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(
                        "tagprobe.json parse error at {}: {} — using defaults",
                        path.display(),
                        e
                    );
                    return TagprobeConfig::default();
                }
            },
            Err(_) => continue, // file not found at this path — try next
        }
    }

    TagprobeConfig::default()
}
