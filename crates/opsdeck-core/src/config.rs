use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::UtcOffset;

/// Dashboard client configuration, stored as `config.json`.
///
/// Every key is optional; missing keys take the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeckConfig {
    pub backend_url: String,
    pub query_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub history_preview: usize,
    pub label_budget: usize,
    pub history_refresh_delay_ms: u64,
    pub script_settle_ms: u64,
    pub script_load_timeout_secs: u64,
    pub deploy_window_minutes: u64,
    /// Zone every timestamp on the status panel is rendered in, e.g. `-08:00`.
    pub reference_utc_offset: String,
    pub incident_feed: bool,
    pub deployment_feed: bool,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:5001".to_string(),
            query_timeout_secs: 180,
            fetch_timeout_secs: 15,
            poll_interval_secs: 180,
            history_preview: 3,
            label_budget: 30,
            history_refresh_delay_ms: 500,
            script_settle_ms: 30,
            script_load_timeout_secs: 10,
            deploy_window_minutes: 120,
            reference_utc_offset: "+00:00".to_string(),
            incident_feed: true,
            deployment_feed: true,
        }
    }
}

impl DeckConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: DeckConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// `<config_dir>/opsdeck/config.json`, falling back to `~/.opsdeck/config.json`.
    pub fn default_path() -> PathBuf {
        if let Some(dir) = dirs::config_dir() {
            dir.join("opsdeck").join("config.json")
        } else if let Some(home) = dirs::home_dir() {
            home.join(".opsdeck").join("config.json")
        } else {
            PathBuf::from(".opsdeck").join("config.json")
        }
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn history_refresh_delay(&self) -> Duration {
        Duration::from_millis(self.history_refresh_delay_ms)
    }

    pub fn script_settle(&self) -> Duration {
        Duration::from_millis(self.script_settle_ms)
    }

    pub fn script_load_timeout(&self) -> Duration {
        Duration::from_secs(self.script_load_timeout_secs)
    }

    pub fn deploy_window(&self) -> Duration {
        Duration::from_secs(self.deploy_window_minutes.saturating_mul(60))
    }

    pub fn reference_offset(&self) -> anyhow::Result<UtcOffset> {
        parse_utc_offset(&self.reference_utc_offset)
    }
}

/// Parse `+HH:MM` / `-HH:MM` (or `Z`/`UTC`).
pub fn parse_utc_offset(s: &str) -> anyhow::Result<UtcOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return Ok(UtcOffset::UTC);
    }
    UtcOffset::parse(
        s,
        format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
    .map_err(|e| anyhow::anyhow!("invalid UTC offset {s:?}: {e}"))
}

// ── Raw key/value access (config get/set/list) ──

/// Read `config.json` as a JSON map. Returns an empty map if the file doesn't exist.
pub fn read_raw(path: &Path) -> anyhow::Result<serde_json::Map<String, serde_json::Value>> {
    if !path.exists() {
        return Ok(serde_json::Map::new());
    }
    let content = std::fs::read_to_string(path)?;
    let val: serde_json::Value = serde_json::from_str(&content)?;
    match val {
        serde_json::Value::Object(map) => Ok(map),
        _ => Ok(serde_json::Map::new()),
    }
}

/// Write `config.json` atomically, creating the parent directory.
pub fn write_raw(
    path: &Path,
    config: &serde_json::Map<String, serde_json::Value>,
) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

/// Parse a string value into an appropriate JSON value (bool/number/string).
pub fn parse_value(s: &str) -> serde_json::Value {
    match s {
        "true" => serde_json::Value::Bool(true),
        "false" => serde_json::Value::Bool(false),
        _ => {
            if let Ok(n) = s.parse::<i64>() {
                serde_json::Value::Number(n.into())
            } else if let Ok(f) = s.parse::<f64>() {
                serde_json::json!(f)
            } else {
                serde_json::Value::String(s.to_string())
            }
        }
    }
}

/// Set one key, rejecting values that would make the config unloadable.
pub fn set_key(path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let known = serde_json::to_value(DeckConfig::default())?;
    if known.get(key).is_none() {
        anyhow::bail!("unknown config key: {key}");
    }
    let mut config = read_raw(path)?;
    config.insert(key.to_string(), parse_value(value));
    serde_json::from_value::<DeckConfig>(serde_json::Value::Object(config.clone()))
        .map_err(|e| anyhow::anyhow!("invalid value for {key}: {e}"))?;
    write_raw(path, &config)
}
