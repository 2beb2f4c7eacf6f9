use crate::config::components::ControlPlaneConfig;
use crate::config::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CONFIG_FILE_NAME: &str = "cdcctl.yml";
pub const CONNECT_URL_ENV: &str = "DEBEZIUM_CONNECT_URL";
pub const BOOTSTRAP_SERVERS_ENV: &str = "KAFKA_BOOTSTRAP_SERVERS";
pub const PROMETHEUS_URL_ENV: &str = "PROMETHEUS_URL";

/// Resolve the config file location. A directory gets `cdcctl.yml` appended.
fn config_file_path(config_path: Option<PathBuf>) -> PathBuf {
    match config_path {
        Some(path) if path.is_dir() => path.join(CONFIG_FILE_NAME),
        Some(path) => path,
        None => PathBuf::from(CONFIG_FILE_NAME),
    }
}

/// Load `cdcctl.yml` and apply environment overrides.
///
/// A missing file is not an error: the defaults describe a local single-node
/// Kafka Connect setup.
pub fn read_config(config_path: Option<PathBuf>) -> Result<ControlPlaneConfig, ConfigError> {
    let explicit = config_path.is_some();
    let path = config_file_path(config_path);

    let config = if path.exists() {
        info!("loading config from {}", path.display());
        parse_config_file(&path)?
    } else if explicit {
        return Err(ConfigError::missing_file(&path));
    } else {
        debug!("no {} found, using defaults", CONFIG_FILE_NAME);
        ControlPlaneConfig::default()
    };

    Ok(apply_env_overrides(config, |key| std::env::var(key).ok()))
}

pub fn parse_config_file(path: &Path) -> Result<ControlPlaneConfig, ConfigError> {
    let file = fs::File::open(path)?;
    let config: ControlPlaneConfig = serde_yaml::from_reader(file)?;
    if config.status.poll_interval_secs == 0 {
        return Err(ConfigError::invalid(
            "status.poll_interval_secs",
            "must be greater than zero",
        ));
    }
    if config.metrics.poll_interval_secs == 0 {
        return Err(ConfigError::invalid(
            "metrics.poll_interval_secs",
            "must be greater than zero",
        ));
    }
    Ok(config)
}

pub fn apply_env_overrides<F>(mut config: ControlPlaneConfig, lookup: F) -> ControlPlaneConfig
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(CONNECT_URL_ENV).filter(|v| !v.trim().is_empty()) {
        config.connect.url = url;
    }
    if let Some(servers) = lookup(BOOTSTRAP_SERVERS_ENV).filter(|v| !v.trim().is_empty()) {
        config.kafka.bootstrap_servers = servers;
    }
    if let Some(url) = lookup(PROMETHEUS_URL_ENV).filter(|v| !v.trim().is_empty()) {
        config.metrics.prometheus_url = Some(url);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EngineKind;
    use std::io::Write;

    #[test]
    fn parses_full_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
connect:
  url: http://connect:8083
kafka:
  bootstrap_servers: broker:29092
status:
  poll_interval_secs: 10
connections:
  erp:
    engine: mssql
    host: erp.internal
    port: 1433
    username: sa
    password: secret
    database: erp
"#
        )
        .unwrap();

        let cfg = parse_config_file(file.path()).unwrap();
        assert_eq!(cfg.connect.url, "http://connect:8083");
        assert_eq!(cfg.kafka.bootstrap_servers, "broker:29092");
        assert_eq!(cfg.status.poll_interval_secs, 10);
        assert_eq!(cfg.database.query_retries, 3);
        assert_eq!(cfg.connections["erp"].engine, EngineKind::Mssql);
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "status:\n  poll_interval_secs: 0").unwrap();
        assert!(matches!(
            parse_config_file(file.path()),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn metrics_section_defaults_and_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "metrics:\n  prometheus_url: http://prom:9090").unwrap();
        let cfg = parse_config_file(file.path()).unwrap();
        assert_eq!(cfg.metrics.prometheus_url.as_deref(), Some("http://prom:9090"));
        assert_eq!(cfg.metrics.poll_interval_secs, 60);
        assert_eq!(cfg.metrics.lookback, "1d");

        let cfg = apply_env_overrides(ControlPlaneConfig::default(), |key| {
            (key == PROMETHEUS_URL_ENV).then(|| "http://other:9090".to_string())
        });
        assert_eq!(cfg.metrics.prometheus_url.as_deref(), Some("http://other:9090"));
    }

    #[test]
    fn unknown_engine_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "connections:\n  x:\n    engine: db2\n    host: h\n    port: 1\n    username: u\n    password: p\n    database: d"
        )
        .unwrap();
        assert!(matches!(
            parse_config_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn env_overrides_win() {
        let cfg = apply_env_overrides(ControlPlaneConfig::default(), |key| match key {
            CONNECT_URL_ENV => Some("http://other:8083".to_string()),
            _ => None,
        });
        assert_eq!(cfg.connect.url, "http://other:8083");
        assert_eq!(cfg.kafka.bootstrap_servers, "localhost:9092");
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yml");
        assert!(matches!(
            read_config(Some(missing)),
            Err(ConfigError::MissingFile { .. })
        ));
    }
}
