//! Headless browser driving via `chromiumoxide`.
//!
//! This module is the single source of truth for:
//! * Finding a usable Chromium-family executable (cross-platform).
//! * Launching a headless session that works in sandboxed / CI environments.
//! * CDP `Fetch` request interception — every outgoing request is handed to
//!   an injected [`RequestInspector`] which must decide allow/deny before the
//!   request proceeds.
//! * Waiting for network quiescence with a hard upper bound.
//! * Scoped teardown: the browser process is closed on every exit path.
//!
//! The inspector seam keeps detection logic out of here: this module knows
//! how to drive a page, not what a tracking request looks like.

use crate::core::error::AnalysisError;
use crate::detect::sanitize::SanitizedUrl;
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::cdp::browser_protocol::fetch;
use chromiumoxide::cdp::browser_protocol::network;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use rand::seq::IndexedRandom;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

// ── Realistic User-Agent pool ────────────────────────────────────────────────

const DESKTOP_USER_AGENTS: &[&str] = &[
    // Chrome 132 – Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    // Chrome 132 – macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    // Chrome 131 – Linux
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    // Firefox 133 – Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
];

/// Returns a randomly-chosen realistic desktop User-Agent string.
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::rng();
    DESKTOP_USER_AGENTS
        .choose(&mut rng)
        .copied()
        .unwrap_or(DESKTOP_USER_AGENTS[0])
}

// ── Browser executable discovery ─────────────────────────────────────────────

/// Find a usable Chromium-family browser executable.
///
/// Resolution order:
/// 1. `CHROME_EXECUTABLE` env var (explicit override)
/// 2. PATH scan — finds package-manager installs on all platforms.
/// 3. OS-specific well-known install paths.
pub fn find_chrome_executable() -> Option<String> {
    if let Ok(p) = std::env::var("CHROME_EXECUTABLE") {
        if Path::new(&p).exists() {
            return Some(p);
        }
    }

    if let Ok(path_var) = std::env::var("PATH") {
        let candidates = [
            "chromium",
            "chromium-browser",
            "google-chrome",
            "google-chrome-stable",
            "chrome",
            "brave-browser",
        ];
        for dir in std::env::split_paths(&path_var) {
            for exe in candidates {
                let full = dir.join(exe);
                if full.exists() {
                    return Some(full.to_string_lossy().to_string());
                }
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        let candidates = [
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "linux")]
    {
        let candidates = [
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/local/bin/chromium",
            "/snap/bin/chromium",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "windows")]
    {
        let candidates = [
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\Chromium\Application\chrome.exe",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    None
}

// ── Headless browser config builder ──────────────────────────────────────────

/// Build a `BrowserConfig` for headless operation.
///
/// Flags chosen for compatibility with CI / serverless / container
/// environments where elevated privileges are unavailable (`--no-sandbox`,
/// `--disable-dev-shm-usage`) and for a quiet, deterministic capture
/// (no background networking, no sync, no translate).
fn build_headless_config(exe: &str, width: u32, height: u32) -> anyhow::Result<BrowserConfig> {
    let ua = random_user_agent();

    BrowserConfig::builder()
        .chrome_executable(exe)
        .viewport(Viewport {
            width,
            height,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .window_size(width, height)
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-setuid-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .arg("--disable-background-networking")
        .arg("--disable-sync")
        .arg("--disable-translate")
        .arg("--disable-crash-reporter")
        .arg("--disable-breakpad")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--hide-scrollbars")
        .arg("--mute-audio")
        .arg("--disable-blink-features=AutomationControlled")
        .arg(format!("--user-agent={}", ua))
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build browser config: {}", e))
}

// ── Request interception seam ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDecision {
    Allow,
    Block,
}

/// Per-request hook invoked for every outgoing request, before it proceeds.
///
/// Must be synchronous and non-blocking — a hook that never decides stalls
/// the page load indefinitely, so no network calls and no long locks here.
pub trait RequestInspector: Send + Sync {
    fn inspect(&self, url: &str, resource_type: &str) -> RequestDecision;
}

/// Timing knobs for a single capture.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Bound on the initial navigation. Hitting it is treated as
    /// load-complete, not an error — long-polling pages never settle.
    pub navigation_timeout: Duration,
    /// Sustained-quiet interval that counts as network quiescence.
    pub quiet_period: Duration,
    /// Hard bound on the whole capture, browser teardown included.
    pub max_capture: Duration,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(15),
            quiet_period: Duration::from_millis(1500),
            max_capture: Duration::from_secs(25),
        }
    }
}

// ── Capture ──────────────────────────────────────────────────────────────────

/// Load `url` in a fresh headless browser, routing every outgoing request
/// through `inspector` before it is allowed on the wire.
///
/// The session is exclusively owned by this call and closed on every exit
/// path — normal completion, navigation failure, timeout, or internal error.
/// Navigation failures are recoverable ([`AnalysisError::Navigation`]);
/// launch/session failures indicate broken infrastructure.
pub async fn capture(
    url: &SanitizedUrl,
    inspector: Arc<dyn RequestInspector>,
    opts: &CaptureOptions,
) -> Result<(), AnalysisError> {
    let exe = find_chrome_executable().ok_or(AnalysisError::BrowserUnavailable)?;

    info!("capture: {} (browser: {})", url, exe);

    let config = build_headless_config(&exe, 1280, 900)
        .map_err(|e| AnalysisError::BrowserLaunch(e.to_string()))?;

    let (mut browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| AnalysisError::BrowserLaunch(format!("{exe}: {e}")))?;

    let handler_task = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                debug!("CDP handler error: {}", e);
            }
        }
    });

    let result = tokio::time::timeout(opts.max_capture, drive_page(&browser, url, inspector, opts))
        .await;

    // Teardown on every path — don't let a close error shadow the real outcome.
    if let Err(e) = browser.close().await {
        warn!("browser close error (non-fatal): {}", e);
    }
    handler_task.abort();

    match result {
        Ok(inner) => inner,
        Err(_) => {
            info!(
                "capture: max duration ({:?}) reached, treating load as complete",
                opts.max_capture
            );
            Ok(())
        }
    }
}

async fn drive_page(
    browser: &Browser,
    url: &SanitizedUrl,
    inspector: Arc<dyn RequestInspector>,
    opts: &CaptureOptions,
) -> Result<(), AnalysisError> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| AnalysisError::BrowserSession(format!("failed to open page: {e}")))?;

    attach_interceptor(&page, inspector).await?;

    match tokio::time::timeout(opts.navigation_timeout, page.goto(url.as_str())).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => return Err(AnalysisError::Navigation(e.to_string())),
        Err(_) => {
            // Load event never fired within the bound. The page may be
            // long-polling; whatever requests were observed stand as evidence.
            info!(
                "capture: navigation did not complete within {:?}, continuing with observed traffic",
                opts.navigation_timeout
            );
            return Ok(());
        }
    }

    wait_until_stable(
        &page,
        opts.quiet_period.as_millis() as u64,
        opts.navigation_timeout.as_millis() as u64,
    )
    .await;

    Ok(())
}

/// Enable CDP `Fetch` interception and spawn the decision loop.
///
/// Every paused request is inspected FIRST — classification of a request that
/// is about to be blocked is still valid evidence — then continued or failed
/// with `BlockedByClient`. A request is never left undecided.
async fn attach_interceptor(
    page: &Page,
    inspector: Arc<dyn RequestInspector>,
) -> Result<(), AnalysisError> {
    page.execute(fetch::EnableParams {
        patterns: Some(vec![fetch::RequestPattern {
            url_pattern: Some("*".to_string()),
            resource_type: None,
            request_stage: Some(fetch::RequestStage::Request),
        }]),
        handle_auth_requests: Some(false),
    })
    .await
    .map_err(|e| {
        AnalysisError::BrowserSession(format!("failed to enable fetch interception: {e}"))
    })?;

    let mut paused = page
        .event_listener::<fetch::EventRequestPaused>()
        .await
        .map_err(|e| {
            AnalysisError::BrowserSession(format!("failed to subscribe to requestPaused: {e}"))
        })?;

    let page = page.clone();
    tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            // Response-stage echoes carry a status/error — pass them through
            // without re-inspecting, the request was already counted.
            if event.response_status_code.is_some() || event.response_error_reason.is_some() {
                let _ = page
                    .execute(fetch::ContinueRequestParams::new(event.request_id.clone()))
                    .await;
                continue;
            }

            let resource_type = format!("{:?}", event.resource_type).to_ascii_lowercase();
            let decision = inspector.inspect(&event.request.url, &resource_type);

            let outcome = match decision {
                RequestDecision::Allow => page
                    .execute(fetch::ContinueRequestParams::new(event.request_id.clone()))
                    .await
                    .map(|_| ()),
                RequestDecision::Block => page
                    .execute(fetch::FailRequestParams {
                        request_id: event.request_id.clone(),
                        error_reason: network::ErrorReason::BlockedByClient,
                    })
                    .await
                    .map(|_| ()),
            };
            if let Err(e) = outcome {
                // The page may already be tearing down; nothing to salvage.
                debug!("interceptor: decision delivery failed for {}: {}", event.request.url, e);
            }
        }
    });

    Ok(())
}

// ── Network quiescence ───────────────────────────────────────────────────────

/// Wait until the page network goes idle (no new resource entries for
/// `quiet_ms` consecutive ms) or until `timeout_ms` has elapsed.
///
/// Polls `performance.getEntriesByType("resource").length` every 250 ms — a
/// networkidle heuristic that needs no extra CDP event plumbing. Hitting the
/// bound is load-complete, not an error: analytics beacons and long-polling
/// keep some pages from ever going fully idle.
async fn wait_until_stable(page: &Page, quiet_ms: u64, timeout_ms: u64) {
    let poll_ms = 250u64;
    let start = std::time::Instant::now();
    let mut last_count: u64 = 0;
    let mut stable_since = std::time::Instant::now();

    loop {
        if start.elapsed().as_millis() as u64 >= timeout_ms {
            info!("wait_until_stable: bound hit after {}ms", timeout_ms);
            break;
        }

        let count: u64 = page
            .evaluate("performance.getEntriesByType('resource').length")
            .await
            .ok()
            .and_then(|v| v.into_value::<serde_json::Value>().ok())
            .and_then(|j| j.as_u64())
            .unwrap_or(0);

        let ready_complete: bool = page
            .evaluate("document.readyState")
            .await
            .ok()
            .and_then(|v| v.into_value::<serde_json::Value>().ok())
            .and_then(|j| j.as_str().map(|s| s == "complete"))
            .unwrap_or(false);

        if !ready_complete {
            // DOM not fully loaded; keep waiting and do not allow "idle" to trigger.
            stable_since = std::time::Instant::now();
            last_count = count;
        } else if count != last_count {
            last_count = count;
            stable_since = std::time::Instant::now();
        } else if stable_since.elapsed().as_millis() as u64 >= quiet_ms {
            debug!(
                "wait_until_stable: idle after {}ms ({} resources)",
                start.elapsed().as_millis(),
                count
            );
            break;
        }

        tokio::time::sleep(Duration::from_millis(poll_ms)).await;
    }
}
