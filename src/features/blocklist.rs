//! Persistent blocklist store.
//!
//! A plain JSON file of blocked substrings under `~/.tagprobe/blocklist.json`
//! (path overridable via config). The engine never touches this directly —
//! values are read here and handed in as explicit policy configuration, so
//! tests run against an in-memory vector and the engine stays free of hidden
//! dependencies. Every operation fails soft: a broken store means an empty
//! list, never a failed analysis.

use std::path::PathBuf;
use tracing::{info, warn};

pub struct BlocklistStore {
    path: PathBuf,
}

impl BlocklistStore {
    /// Open the store at `override_path`, or the default location under the
    /// user's home directory. Returns `None` only when no home directory can
    /// be resolved and no override was given.
    pub fn open(override_path: Option<&str>) -> Option<Self> {
        let path = match override_path {
            Some(p) if !p.trim().is_empty() => PathBuf::from(p),
            _ => dirs::home_dir()?.join(".tagprobe").join("blocklist.json"),
        };
        Some(Self { path })
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// All stored values. Missing file → empty list (first run); parse error
    /// → warn and empty list.
    pub fn get_blocked_values(&self) -> Vec<String> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str::<Vec<String>>(&contents) {
            Ok(values) => values,
            Err(e) => {
                warn!(
                    "blocklist: parse error at {}: {} — treating as empty",
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Append `values`, deduplicated by value against the existing contents.
    /// Write failures are logged, never propagated.
    pub fn add_blocked_values(&self, values: &[String]) {
        let mut current = self.get_blocked_values();
        let mut added = 0usize;
        for value in values {
            let value = value.trim();
            if value.is_empty() || current.iter().any(|v| v == value) {
                continue;
            }
            current.push(value.to_string());
            added += 1;
        }
        if added == 0 {
            return;
        }

        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("blocklist: cannot create {}: {}", parent.display(), e);
                return;
            }
        }

        match serde_json::to_string_pretty(&current) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    warn!("blocklist: write failed at {}: {}", self.path.display(), e);
                } else {
                    info!(
                        "blocklist: added {} value(s), {} total",
                        added,
                        current.len()
                    );
                }
            }
            Err(e) => warn!("blocklist: serialize failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> BlocklistStore {
        let path = std::env::temp_dir()
            .join(format!("tagprobe-test-{}-{}", std::process::id(), name))
            .join("blocklist.json");
        let _ = std::fs::remove_file(&path);
        BlocklistStore::at(path)
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let store = temp_store("empty");
        assert!(store.get_blocked_values().is_empty());
    }

    #[test]
    fn round_trips_values() {
        let store = temp_store("roundtrip");
        store.add_blocked_values(&["taboola.com".into(), "outbrain.com".into()]);
        assert_eq!(
            store.get_blocked_values(),
            vec!["taboola.com".to_string(), "outbrain.com".to_string()]
        );
    }

    #[test]
    fn deduplicates_by_value() {
        let store = temp_store("dedup");
        store.add_blocked_values(&["criteo.com".into()]);
        store.add_blocked_values(&["criteo.com".into(), "  criteo.com ".into(), "adnxs.com".into()]);
        assert_eq!(
            store.get_blocked_values(),
            vec!["criteo.com".to_string(), "adnxs.com".to_string()]
        );
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let store = temp_store("corrupt");
        if let Some(parent) = store.path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&store.path, "not json at all").unwrap();
        assert!(store.get_blocked_values().is_empty());
    }
}
