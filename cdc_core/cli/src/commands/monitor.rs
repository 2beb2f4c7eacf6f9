use crate::commands::{print_json, runtime, ControlPlane};
use clap::Args;
use common::error::CdcError;
use executor::LastSuccessMonitor;
use shared_clients::prometheus::PrometheusClient;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

#[derive(Debug, Args)]
pub struct MonitorArgs {
    /// Run a single pass and exit
    #[arg(long)]
    pub once: bool,
}

/// Copy sink commit times from Prometheus into `last_success_at`, every
/// `metrics.poll_interval_secs` until Ctrl-C. Each pass that moved a pipeline
/// is printed and persisted.
pub fn handle_monitor(args: MonitorArgs, config_path: Option<PathBuf>) -> Result<(), CdcError> {
    let plane = ControlPlane::load(config_path)?;
    let url = plane.config.metrics.prometheus_url.clone().ok_or_else(|| {
        CdcError::init_msg("metrics.prometheus_url is not set (or export PROMETHEUS_URL)")
    })?;
    let metrics = PrometheusClient::new(&url).with_lookback(plane.config.metrics.lookback.clone());
    let monitor = LastSuccessMonitor::new(Arc::new(plane.catalog.clone()), Arc::new(metrics));
    let period = Duration::from_secs(plane.config.metrics.poll_interval_secs);

    runtime()?.block_on(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match monitor.update_all().await {
                        Ok(updates) if !updates.is_empty() => {
                            plane.persist()?;
                            print_json(&updates)?;
                        }
                        Ok(_) => {}
                        Err(err) if args.once => return Err(CdcError::run(err)),
                        Err(err) => warn!("monitor pass failed: {err}"),
                    }
                    if args.once {
                        return Ok(());
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted, stopping monitor");
                    return Ok(());
                }
            }
        }
    })
}
