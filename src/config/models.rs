use crate::humanize::HumanDuration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub drafts: DraftsConfig,
}

/// Backend API connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: HumanDuration,
    /// Upper bound for any single request, status polls included
    #[serde(default = "default_request_timeout")]
    pub request_timeout: HumanDuration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_connect_timeout() -> HumanDuration {
    HumanDuration::from_secs(10)
}

fn default_request_timeout() -> HumanDuration {
    HumanDuration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("scrapewatch/{}", env!("CARGO_PKG_VERSION"))
}

/// Poll cadences. Status and stats run on independent timers.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingConfig {
    #[serde(default = "default_status_interval")]
    pub status_interval: HumanDuration,
    #[serde(default = "default_stats_interval")]
    pub stats_interval: HumanDuration,
    /// Delay between a completed job and the follow-up data reload
    #[serde(default = "default_reload_delay")]
    pub reload_delay: HumanDuration,
    /// Delay between a successful cancel request and the follow-up reload
    #[serde(default = "default_cancel_reload_delay")]
    pub cancel_reload_delay: HumanDuration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            status_interval: default_status_interval(),
            stats_interval: default_stats_interval(),
            reload_delay: default_reload_delay(),
            cancel_reload_delay: default_cancel_reload_delay(),
        }
    }
}

fn default_status_interval() -> HumanDuration {
    HumanDuration::from_secs(5)
}

fn default_stats_interval() -> HumanDuration {
    HumanDuration::from_secs(30)
}

fn default_reload_delay() -> HumanDuration {
    HumanDuration::from_secs(2)
}

fn default_cancel_reload_delay() -> HumanDuration {
    HumanDuration::from_secs(1)
}

/// Export output settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Local form draft cache
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DraftsConfig {
    #[serde(default = "default_drafts_path")]
    pub path: PathBuf,
}

impl Default for DraftsConfig {
    fn default() -> Self {
        Self {
            path: default_drafts_path(),
        }
    }
}

fn default_drafts_path() -> PathBuf {
    PathBuf::from("data/drafts")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.api.base_url, "http://localhost:5000");
        assert_eq!(config.api.request_timeout.as_duration(), Duration::from_secs(30));
        assert_eq!(config.polling.status_interval.as_duration(), Duration::from_secs(5));
        assert_eq!(config.polling.stats_interval.as_duration(), Duration::from_secs(30));
        assert_eq!(config.polling.reload_delay.as_duration(), Duration::from_secs(2));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
[polling]
status_interval = "1s"
            "#,
        )
        .unwrap();

        assert_eq!(config.polling.status_interval.as_duration(), Duration::from_secs(1));
        assert_eq!(config.polling.stats_interval.as_duration(), Duration::from_secs(30));
        assert_eq!(config.drafts.path, PathBuf::from("data/drafts"));
    }
}
