//! Post-run blocklist suggestion via an OpenAI-compatible endpoint.
//!
//! Given the full list of URLs a page attempted to load, ask a model which
//! third-party noise domains are worth blocking in future runs. Strictly
//! fire-and-forget: every failure here is logged and swallowed — the
//! analysis result the caller already holds is never affected.

use crate::core::config::SuggestConfig;
use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

const SYSTEM_PROMPT: &str = "You maintain a resource blocklist for a web tracking detector. \
Given the URLs a page requested, reply with a JSON array of domain substrings worth blocking \
as load noise (ad networks, consent banners, widgets). Never include analytics or tag-manager \
domains such as google-analytics.com or googletagmanager.com, and never include collection \
paths like /g/collect. Reply with the JSON array only.";

/// Spawn the suggestion round-trip in the background.
///
/// No-op when the feature is unconfigured or the run observed nothing.
pub fn spawn_suggestion_task(
    http: reqwest::Client,
    config: SuggestConfig,
    store: Option<std::sync::Arc<crate::features::blocklist::BlocklistStore>>,
    observed_urls: Vec<String>,
) {
    if !config.resolve_enabled() || observed_urls.is_empty() {
        return;
    }

    tokio::spawn(async move {
        match suggest_blocked_values(&http, &config, &observed_urls).await {
            Ok(values) if values.is_empty() => {
                info!("suggest: model proposed no new blocklist values");
            }
            Ok(values) => {
                info!("suggest: model proposed {} value(s): {:?}", values.len(), values);
                if let Some(store) = store {
                    store.add_blocked_values(&values);
                }
            }
            Err(e) => warn!("suggest: failed (ignored): {:#}", e),
        }
    });
}

/// One chat-completion round trip. Returns the proposed substrings.
pub async fn suggest_blocked_values(
    http: &reqwest::Client,
    config: &SuggestConfig,
    observed_urls: &[String],
) -> Result<Vec<String>> {
    let base_url = config
        .resolve_base_url()
        .ok_or_else(|| anyhow!("suggestion endpoint not configured"))?;
    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));

    // Cap the sample; a heavy page can attempt hundreds of requests.
    let sample: Vec<&String> = observed_urls.iter().take(100).collect();
    let body = serde_json::json!({
        "model": config.resolve_model(),
        "temperature": 0.2,
        "messages": [
            {"role": "system", "content": SYSTEM_PROMPT},
            {"role": "user", "content": serde_json::to_string(&sample)?}
        ]
    });

    let builder = http.post(url).json(&body);
    // Only send Authorization when a key is provided — key-less local
    // endpoints (Ollama / LM Studio) work without it.
    let builder = match config.resolve_api_key() {
        Some(key) if !key.is_empty() => builder.bearer_auth(key.trim().to_string()),
        _ => builder,
    };

    let response = builder
        .send()
        .await
        .context("chat.completions request failed")?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(anyhow!(
            "chat.completions failed: status={} body={}",
            status,
            text
        ));
    }

    let value: serde_json::Value = response
        .json()
        .await
        .context("chat.completions response parse failed")?;

    let content = value
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow!("chat.completions response missing content"))?;

    Ok(parse_suggestions(content))
}

/// Extract a string array from the model reply, tolerating code fences and
/// surrounding prose.
fn parse_suggestions(content: &str) -> Vec<String> {
    let trimmed = content.trim();
    let json_slice = match (trimmed.find('['), trimmed.rfind(']')) {
        (Some(start), Some(end)) if end > start => &trimmed[start..=end],
        _ => return Vec::new(),
    };

    serde_json::from_str::<Vec<String>>(json_slice)
        .unwrap_or_default()
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_plain_array() {
        assert_eq!(
            parse_suggestions(r#"["taboola.com", "outbrain.com"]"#),
            vec!["taboola.com", "outbrain.com"]
        );
    }

    #[test]
    fn parses_a_fenced_array_with_prose() {
        let reply = "Sure, here you go:\n```json\n[\"adnxs.com\"]\n```\nLet me know!";
        assert_eq!(parse_suggestions(reply), vec!["adnxs.com"]);
    }

    #[test]
    fn garbage_yields_nothing() {
        assert!(parse_suggestions("no json here").is_empty());
        assert!(parse_suggestions("").is_empty());
        assert!(parse_suggestions("[1, 2, 3]").is_empty());
    }
}
