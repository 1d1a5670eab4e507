use std::{
    sync::Arc,
    time::Duration,
};

use farm_trait::{
    Address,
    BlockNumber,
    FarmDataSource,
    FarmSnapshot,
    RpcError,
};
use tokio::{
    sync::{
        mpsc,
        watch,
    },
    time::{
        self,
        MissedTickBehavior,
    },
};

/// Keeps the latest [`FarmSnapshot`] of an account published.
///
/// A fetch runs on every block notification and on every `interval` tick.
/// A failed fetch leaves the previous snapshot in place.
pub struct Poller<D: ?Sized> {
    source: Arc<D>,
    account: Option<Address>,
    interval: Duration,
    snapshot: watch::Sender<Option<Arc<FarmSnapshot>>>,
}

impl<D: FarmDataSource + ?Sized> Poller<D> {
    pub fn new(source: Arc<D>, account: Option<Address>, interval: Duration) -> Self {
        let (snapshot, _) = watch::channel(None);
        Poller {
            source,
            account,
            interval,
            snapshot,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<FarmSnapshot>>> {
        self.snapshot.subscribe()
    }

    pub fn latest(&self) -> Option<Arc<FarmSnapshot>> {
        self.snapshot.borrow().clone()
    }

    /// Fetches once and publishes the result.
    pub async fn refresh(&self) -> Result<Arc<FarmSnapshot>, RpcError> {
        match self.source.fetch(self.account).await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                log::debug!(
                    "Fetched {} farms at block {}",
                    snapshot.farms.len(),
                    snapshot.block_number
                );
                self.snapshot.send_replace(Some(snapshot.clone()));
                Ok(snapshot)
            }
            Err(e) => {
                log::warn!("Failed to fetch farms: {e}");
                Err(e)
            }
        }
    }

    /// Polls until `blocks` closes or the last subscriber is dropped.
    ///
    /// Block numbers queued while a fetch runs collapse into one refresh.
    pub async fn run(self, mut blocks: mpsc::Receiver<BlockNumber>) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                block = blocks.recv() => match block {
                    Some(block) => {
                        while blocks.try_recv().is_ok() {}
                        log::trace!("New block {block}");
                    }
                    None => {
                        log::debug!("Block stream closed, stopping poller");
                        return
                    }
                },
                _ = ticker.tick() => {}
                _ = self.snapshot.closed() => {
                    log::debug!("No subscribers left, stopping poller");
                    return
                }
            }
            // failures are already logged
            let _ = self.refresh().await;
        }
    }
}
