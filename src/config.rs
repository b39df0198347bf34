use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;

/// Polite lower bound on spacing between requests to one platform.
pub const MIN_SPACING_MS: u64 = 250;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SoundCloudConfig {
    pub handle: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BandcampConfig {
    pub handle: String,
}

/// Everything a sync run needs. Built once at startup and passed down.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    pub output: PathBuf,
    pub events: PathBuf,
    pub placeholder_thumb: String,
    pub item_cap: usize,
    pub request_spacing_ms: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Compose the dedupe key from `kind` and title instead of title alone.
    pub key_includes_kind: bool,
    pub soundcloud: Option<SoundCloudConfig>,
    pub bandcamp: Option<BandcampConfig>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("data/auto-projects.json"),
            events: PathBuf::from("data/events.json"),
            placeholder_thumb: "image00015.jpeg".to_string(),
            item_cap: 20,
            request_spacing_ms: 300,
            timeout_secs: 20,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            key_includes_kind: false,
            soundcloud: Some(SoundCloudConfig { handle: "thirty_3".to_string() }),
            bandcamp: None,
        }
    }
}

impl SyncConfig {
    /// Load config from `explicit`, else `./cardsync.toml`, else the platform
    /// config dir, else defaults. `CARDSYNC_*` env vars win over all of them.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut cfg = match explicit {
            Some(p) => Self::from_file(p)?,
            None => match discover_config_file() {
                Some(p) => Self::from_file(&p)?,
                None => Self::default(),
            },
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        Ok(cfg.sanitized())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("invalid config: {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str::<Self>(text)?.sanitized())
    }

    fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, get: F) {
        if let Some(v) = get("CARDSYNC_OUTPUT").filter(|s| !s.trim().is_empty()) { self.output = PathBuf::from(v); }
        if let Some(v) = get("CARDSYNC_ITEM_CAP").and_then(|s| s.parse().ok()) { self.item_cap = v; }
        if let Some(v) = get("CARDSYNC_SPACING_MS").and_then(|s| s.parse().ok()) { self.request_spacing_ms = v; }
        if let Some(v) = get("CARDSYNC_SOUNDCLOUD_HANDLE").filter(|s| !s.trim().is_empty()) {
            self.soundcloud = Some(SoundCloudConfig { handle: v });
        }
        if let Some(v) = get("CARDSYNC_BANDCAMP_HANDLE").filter(|s| !s.trim().is_empty()) {
            self.bandcamp = Some(BandcampConfig { handle: v });
        }
    }

    fn sanitized(mut self) -> Self {
        self.item_cap = self.item_cap.max(1);
        self.request_spacing_ms = self.request_spacing_ms.max(MIN_SPACING_MS);
        self.timeout_secs = self.timeout_secs.max(1);
        if let Some(sc) = &mut self.soundcloud { sc.handle = sc.handle.trim().trim_matches('/').to_string(); }
        if let Some(bc) = &mut self.bandcamp { bc.handle = bc.handle.trim().to_ascii_lowercase(); }
        self.soundcloud = self.soundcloud.filter(|s| !s.handle.is_empty());
        self.bandcamp = self.bandcamp.filter(|b| !b.handle.is_empty());
        self
    }

    pub fn request_spacing(&self) -> Duration { Duration::from_millis(self.request_spacing_ms) }
    pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }
}

fn discover_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("cardsync.toml");
    if local.is_file() { return Some(local); }
    let dirs = ProjectDirs::from("", "", "cardsync")?;
    let global = dirs.config_dir().join("cardsync.toml");
    global.is_file().then_some(global)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = SyncConfig::from_toml("item_cap = 5\n[bandcamp]\nhandle = \"Thirty3\"\n").unwrap();
        assert_eq!(cfg.item_cap, 5);
        assert_eq!(cfg.bandcamp, Some(BandcampConfig { handle: "thirty3".into() }));
        assert_eq!(cfg.soundcloud, Some(SoundCloudConfig { handle: "thirty_3".into() }));
        assert_eq!(cfg.output, PathBuf::from("data/auto-projects.json"));
    }

    #[test]
    fn spacing_and_cap_are_clamped() {
        let cfg = SyncConfig::from_toml("item_cap = 0\nrequest_spacing_ms = 10\n").unwrap();
        assert_eq!(cfg.item_cap, 1);
        assert_eq!(cfg.request_spacing(), Duration::from_millis(MIN_SPACING_MS));
    }

    #[test]
    fn env_overrides_win() {
        let mut cfg = SyncConfig::default();
        cfg.apply_env(|k| match k {
            "CARDSYNC_OUTPUT" => Some("out/cards.json".into()),
            "CARDSYNC_ITEM_CAP" => Some("7".into()),
            "CARDSYNC_SPACING_MS" => Some("not-a-number".into()),
            _ => None,
        });
        assert_eq!(cfg.output, PathBuf::from("out/cards.json"));
        assert_eq!(cfg.item_cap, 7);
        assert_eq!(cfg.request_spacing_ms, 300);
    }

    #[test]
    fn blank_handle_disables_source() {
        let cfg = SyncConfig::from_toml("[soundcloud]\nhandle = \"  \"\n").unwrap();
        assert!(cfg.soundcloud.is_none());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(SyncConfig::from_file(&tmp.path().join("nope.toml")).is_err());
    }
}
