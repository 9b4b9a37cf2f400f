use clap::Subcommand;
use opsdeck_core::config::{read_raw, set_key};
use opsdeck_core::DeckConfig;
use std::path::Path;

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Set a config value
    Set {
        /// Config key (e.g. poll_interval_secs)
        key: String,
        /// Config value (true/false/number/string)
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values, defaults included
    List,
    /// Print the config file location
    Path,
}

// ── Dispatch ──

pub fn run(cmd: ConfigCmd, path: &Path) -> anyhow::Result<()> {
    match cmd {
        ConfigCmd::Set { key, value } => set(path, &key, &value),
        ConfigCmd::Get { key } => get(path, &key),
        ConfigCmd::List => list(path),
        ConfigCmd::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

// ── Command Implementations ──

/// `opsdeck config set <key> <value>`
pub fn set(path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    set_key(path, key, value)?;
    println!("{key} = {value}");
    Ok(())
}

/// `opsdeck config get <key>`
pub fn get(path: &Path, key: &str) -> anyhow::Result<()> {
    let config = read_raw(path)?;
    match config.get(key) {
        Some(val) => println!("{val}"),
        None => match effective(path)?.get(key) {
            Some(val) => println!("{val} (default)"),
            None => anyhow::bail!("unknown config key: {key}"),
        },
    }
    Ok(())
}

/// `opsdeck config list`
pub fn list(path: &Path) -> anyhow::Result<()> {
    let set = read_raw(path)?;
    for (k, v) in &effective(path)? {
        if set.contains_key(k) {
            println!("{k} = {v}");
        } else {
            println!("{k} = {v} (default)");
        }
    }
    Ok(())
}

/// Every key with its effective value.
fn effective(path: &Path) -> anyhow::Result<serde_json::Map<String, serde_json::Value>> {
    match serde_json::to_value(DeckConfig::load(path)?)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Ok(serde_json::Map::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_merges_file_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        set(&path, "history_preview", "5").unwrap();

        let map = effective(&path).unwrap();
        assert_eq!(map["history_preview"], 5);
        assert_eq!(map["fetch_timeout_secs"], 15);
        assert_eq!(read_raw(&path).unwrap().len(), 1);
    }

    #[test]
    fn get_unknown_key_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(get(&dir.path().join("config.json"), "colour").is_err());
    }
}
