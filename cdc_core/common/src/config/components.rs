use crate::types::ConnectionConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

pub const DEFAULT_CONNECT_URL: &str = "http://localhost:8083";
pub const DEFAULT_BOOTSTRAP_SERVERS: &str = "localhost:9092";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_QUERY_RETRIES: u32 = 3;
pub const DEFAULT_METRICS_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_METRICS_LOOKBACK: &str = "1d";

///  ---------------- Control plane config ----------------
///
/// Contents of `cdcctl.yml`. Every section is optional and falls back to the
/// defaults above.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ControlPlaneConfig {
    #[serde(default)]
    pub connect: ConnectSettings,
    #[serde(default)]
    pub kafka: KafkaSettings,
    #[serde(default)]
    pub status: StatusSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub metrics: MetricsSettings,
    /// Named connections the CLI can refer to with `--connection <name>`.
    #[serde(default)]
    pub connections: HashMap<String, ConnectionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectSettings {
    pub url: String,
}

impl Default for ConnectSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_CONNECT_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KafkaSettings {
    pub bootstrap_servers: String,
}

impl Default for KafkaSettings {
    fn default() -> Self {
        Self {
            bootstrap_servers: DEFAULT_BOOTSTRAP_SERVERS.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSettings {
    pub poll_interval_secs: u64,
}

impl Default for StatusSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub query_retries: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            query_retries: DEFAULT_QUERY_RETRIES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogSettings {
    pub path: Option<PathBuf>,
}

/// Prometheus the last-success monitor reads sink commit metrics from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSettings {
    #[serde(default)]
    pub prometheus_url: Option<String>,
    #[serde(default = "default_metrics_poll_interval")]
    pub poll_interval_secs: u64,
    /// PromQL range the latest commit is searched in.
    #[serde(default = "default_metrics_lookback")]
    pub lookback: String,
}

fn default_metrics_poll_interval() -> u64 {
    DEFAULT_METRICS_POLL_INTERVAL_SECS
}

fn default_metrics_lookback() -> String {
    DEFAULT_METRICS_LOOKBACK.to_string()
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            prometheus_url: None,
            poll_interval_secs: DEFAULT_METRICS_POLL_INTERVAL_SECS,
            lookback: DEFAULT_METRICS_LOOKBACK.to_string(),
        }
    }
}
