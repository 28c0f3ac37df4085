//! Expiration sweep worker

use super::{Shared, Worker};
use crate::error::Result;
use crate::events;
use crate::store::is_address;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub(crate) async fn run(shared: Arc<Shared>, started: oneshot::Sender<()>) -> Result<()> {
    info!("reaper: starting");
    let stop = shared.coordinator.stop_token(Worker::Reaper);
    let period = shared.settings.tick_interval;

    // first sweep one full interval after start
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let _ = started.send(());

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => {
                info!("reaper: stop requested");
                return Ok(());
            }
            _ = ticker.tick() => {
                debug!("reaper: checking expirations");
                sweep(&shared, Utc::now()).await?;
            }
        }
    }
}

/// Evict every record expired at `now`, in directory-listing order
///
/// For each expired address: delete hook, watchlist removal, record
/// deletion. Returns the evicted addresses.
pub(crate) async fn sweep(shared: &Shared, now: DateTime<Utc>) -> Result<Vec<String>> {
    let mut expired = Vec::new();
    for record in shared.timeouts.records()? {
        if !is_address(&record.address) {
            warn!(
                "reaper: ignoring non-address file '{}' in {}",
                record.address,
                shared.timeouts.dir().display()
            );
            continue;
        }
        if record.is_expired(now) {
            expired.push(record.address);
        } else {
            events::address_active(&record.address, record.expires_at);
        }
    }

    for addr in &expired {
        if let Some(hook) = &shared.delete_hook {
            hook.invoke(addr).await?;
        }
        let outcome = shared.watchlist.remove(addr)?;
        shared.timeouts.remove(addr)?;
        events::address_expired(addr, outcome, shared.watchlist.path());
    }
    Ok(expired)
}
