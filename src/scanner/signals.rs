//! Signal worker: turns SIGINT/SIGTERM into a clean shutdown

use super::{Shared, Worker};
use crate::error::{Result, ScannerError};
use log::{debug, info};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::oneshot;

pub(crate) async fn run(shared: Arc<Shared>, started: oneshot::Sender<()>) -> Result<()> {
    info!("handler: started");
    let stop = shared.coordinator.stop_token(Worker::Signals);

    let mut sigint = signal(SignalKind::interrupt()).map_err(|source| {
        ScannerError::SignalRegistration {
            signal: "SIGINT",
            source,
        }
    })?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(|source| {
        ScannerError::SignalRegistration {
            signal: "SIGTERM",
            source,
        }
    })?;
    debug!("CTRL-C to exit");
    let _ = started.send(());

    tokio::select! {
        _ = sigint.recv() => info!("handler: received SIGINT"),
        _ = sigterm.recv() => info!("handler: received SIGTERM"),
        _ = stop.cancelled() => info!("handler: stop requested"),
    }
    Ok(())
}
