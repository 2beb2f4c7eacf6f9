use crate::commands::{print_json, runtime, ControlPlane};
use clap::Args;
use common::error::CdcError;
use executor::StatusReconciliationStream;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[arg(required = true, value_name = "PIPELINE_ID")]
    pub pipeline_ids: Vec<String>,
}

/// Print a snapshot, then one JSON document per status delta until Ctrl-C.
pub fn handle_watch(args: WatchArgs, config_path: Option<PathBuf>) -> Result<(), CdcError> {
    let plane = ControlPlane::load(config_path)?;
    let stream = StatusReconciliationStream::with_poll_interval(
        plane.cluster(),
        Arc::new(plane.catalog.clone()),
        Duration::from_secs(plane.config.status.poll_interval_secs),
    );

    runtime()?.block_on(async move {
        let mut subscription = stream.subscribe(args.pipeline_ids).await;
        let result = loop {
            tokio::select! {
                event = subscription.next() => match event {
                    Some(event) => {
                        if let Err(err) = print_json(&event) {
                            break Err(err);
                        }
                    }
                    None => break Ok(()),
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted, stopping watch");
                    break Ok(());
                }
            }
        };
        stream.unsubscribe(subscription.id);
        result
    })
}
