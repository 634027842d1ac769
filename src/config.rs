use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the appwarden daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the blocklist file (one package name per line)
    #[serde(default = "default_blocklist_path")]
    pub blocklist_path: PathBuf,
    /// Active usage allowed per session, in seconds
    #[serde(default = "default_limit_secs")]
    pub limit_secs: u64,
    /// How long a package stays banned after hitting the limit, in seconds
    #[serde(default = "default_ban_secs")]
    pub ban_secs: u64,
    /// Pause longer than this discards the session, in seconds
    #[serde(default = "default_idle_reset_secs")]
    pub idle_reset_secs: u64,
    /// Coordinator polling interval, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Monitor task tick interval, in milliseconds
    #[serde(default = "default_monitor_tick_ms")]
    pub monitor_tick_ms: u64,
    /// Timeout for the foreground probe command, in milliseconds
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

fn default_blocklist_path() -> PathBuf {
    PathBuf::from("block.txt")
}

fn default_limit_secs() -> u64 {
    30 * 60
}

fn default_ban_secs() -> u64 {
    10 * 60
}

fn default_idle_reset_secs() -> u64 {
    5 * 60
}

fn default_poll_interval_ms() -> u64 {
    1500
}

fn default_monitor_tick_ms() -> u64 {
    250
}

fn default_probe_timeout_ms() -> u64 {
    2000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            blocklist_path: default_blocklist_path(),
            limit_secs: default_limit_secs(),
            ban_secs: default_ban_secs(),
            idle_reset_secs: default_idle_reset_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            monitor_tick_ms: default_monitor_tick_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::WardenError::ConfigError(e.to_string()))?;
        toml::from_str(&content).map_err(|e| crate::error::WardenError::ConfigError(e.to_string()))
    }

    /// Merge CLI arguments into this configuration
    /// CLI arguments take precedence over config file values
    pub fn merge_cli_args(
        &mut self,
        blocklist: Option<PathBuf>,
        limit_secs: Option<u64>,
        ban_secs: Option<u64>,
        idle_reset_secs: Option<u64>,
        poll_interval_ms: Option<u64>,
    ) {
        if let Some(b) = blocklist {
            self.blocklist_path = b;
        }
        if let Some(l) = limit_secs {
            self.limit_secs = l;
        }
        if let Some(b) = ban_secs {
            self.ban_secs = b;
        }
        if let Some(i) = idle_reset_secs {
            self.idle_reset_secs = i;
        }
        if let Some(p) = poll_interval_ms {
            self.poll_interval_ms = p;
        }
    }

    pub fn limit(&self) -> Duration {
        Duration::from_secs(self.limit_secs)
    }

    pub fn ban_duration(&self) -> Duration {
        Duration::from_secs(self.ban_secs)
    }

    pub fn idle_reset_threshold(&self) -> Duration {
        Duration::from_secs(self.idle_reset_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn monitor_tick(&self) -> Duration {
        Duration::from_millis(self.monitor_tick_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_reference_policy() {
        let config = Config::default();
        assert_eq!(config.limit_secs, 1800);
        assert_eq!(config.ban_secs, 600);
        assert_eq!(config.idle_reset_secs, 300);
        assert_eq!(config.poll_interval_ms, 1500);
    }

    #[test]
    fn cli_args_override_file_values() {
        let mut config = Config::default();
        config.merge_cli_args(
            Some(PathBuf::from("other.txt")),
            Some(60),
            None,
            None,
            Some(500),
        );
        assert_eq!(config.blocklist_path, PathBuf::from("other.txt"));
        assert_eq!(config.limit_secs, 60);
        assert_eq!(config.ban_secs, 600);
        assert_eq!(config.poll_interval_ms, 500);
    }

    #[test]
    fn from_file_fills_missing_fields_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "limit_secs = 120").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.limit_secs, 120);
        assert_eq!(config.ban_secs, 600);
    }

    #[test]
    fn from_file_rejects_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "limit_secs = \"not a number\"").unwrap();
        assert!(Config::from_file(file.path()).is_err());
    }
}
