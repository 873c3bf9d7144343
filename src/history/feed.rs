//! Live event feed.
//!
//! Over HTTP JSON-RPC there are no push subscriptions, so [`FeedMonitor`]
//! polls both contracts for logs in newly mined blocks and prepends the
//! classified events to a bounded [`EventFeed`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::sleep;

use crate::blockchain::{BlockRange, BlockchainResult};
use crate::config::HistoryConfig;
use crate::contracts::ContractGateway;
use crate::history::events::{classify_credit_log, classify_registry_log, ChainEvent, EventData};
use crate::history::plantations::PlantationIndex;

/// Most recent events, newest first, capped at a fixed length.
#[derive(Debug)]
pub struct EventFeed {
    capacity: usize,
    events: Mutex<VecDeque<ChainEvent>>,
}

impl EventFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            events: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Prepend an event, dropping the oldest beyond capacity.
    pub fn push(&self, event: ChainEvent) {
        let mut events = self.events.lock().expect("event feed mutex poisoned");
        events.push_front(event);
        events.truncate(self.capacity);
    }

    /// Current events, newest first.
    pub fn snapshot(&self) -> Vec<ChainEvent> {
        self.events
            .lock()
            .expect("event feed mutex poisoned")
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().expect("event feed mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events.lock().expect("event feed mutex poisoned").clear();
    }
}

/// Polls contract logs into an [`EventFeed`].
pub struct FeedMonitor {
    gateway: Arc<dyn ContractGateway>,
    feed: Arc<EventFeed>,
    index: Option<Arc<PlantationIndex>>,
    sink: Option<mpsc::Sender<ChainEvent>>,
    poll_interval: Duration,
    /// Last block already scanned; `None` until the first poll.
    last_block: Option<u64>,
}

impl FeedMonitor {
    pub fn new(gateway: Arc<dyn ContractGateway>, feed: Arc<EventFeed>, config: &HistoryConfig) -> Self {
        Self {
            gateway,
            feed,
            index: None,
            sink: None,
            poll_interval: Duration::from_millis(config.feed_poll_interval_ms),
            last_block: None,
        }
    }

    /// Refresh `index` whenever registry events arrive.
    pub fn with_index(mut self, index: Arc<PlantationIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Also forward every new event to `sink`.
    pub fn with_sink(mut self, sink: mpsc::Sender<ChainEvent>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Start scanning after `block` instead of at the chain head.
    pub fn starting_after(mut self, block: u64) -> Self {
        self.last_block = Some(block);
        self
    }

    /// Poll until shutdown.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_ms = self.poll_interval.as_millis() as u64, "Starting event feed monitor");

        loop {
            if let Err(e) = self.poll_once().await {
                tracing::error!(error = %e, "Error polling contract events");
            }

            tokio::select! {
                _ = sleep(self.poll_interval) => {}
                _ = shutdown.recv() => {
                    tracing::info!("Event feed monitor received shutdown signal");
                    break;
                }
            }
        }
    }

    /// Scan blocks mined since the previous poll. Returns the new events in
    /// chain order.
    ///
    /// The first poll only records the chain head.
    pub async fn poll_once(&mut self) -> BlockchainResult<Vec<ChainEvent>> {
        let latest = self.gateway.latest_block().await?;

        let last = match self.last_block {
            Some(last) => last,
            None => {
                tracing::info!(block = latest, "Event feed initialized at chain head");
                self.last_block = Some(latest);
                return Ok(Vec::new());
            }
        };
        if latest <= last {
            return Ok(Vec::new());
        }

        let range = BlockRange::between(last + 1, latest);
        let (registry_logs, credit_logs) = tokio::join!(
            self.gateway.registry_logs(range),
            self.gateway.transfer_logs(range)
        );
        let (registry_logs, credit_logs) = (registry_logs?, credit_logs?);

        let mut ordered: Vec<_> = registry_logs
            .iter()
            .filter_map(|log| classify_registry_log(log).map(|e| (log.log_index, e)))
            .chain(
                credit_logs
                    .iter()
                    .filter_map(|log| classify_credit_log(log).map(|e| (log.log_index, e))),
            )
            .collect();
        ordered.sort_by_key(|(log_index, event)| (event.block_number, *log_index));
        let events: Vec<ChainEvent> = ordered.into_iter().map(|(_, e)| e).collect();

        for event in &events {
            tracing::debug!(kind = event.data.kind(), block = event.block_number, "Contract event");
            self.feed.push(event.clone());
            let sink_closed = match &self.sink {
                Some(sink) => sink.send(event.clone()).await.is_err(),
                None => false,
            };
            if sink_closed {
                tracing::debug!("Event sink closed, no longer forwarding");
                self.sink = None;
            }
        }

        let registry_changed = events.iter().any(|e| {
            matches!(
                e.data,
                EventData::PlantationRegistered { .. } | EventData::PlantationVerified { .. }
            )
        });
        if registry_changed {
            if let Some(index) = &self.index {
                if let Err(e) = index.refresh(self.gateway.as_ref()).await {
                    tracing::warn!(error = %e, "Plantation index refresh failed");
                }
            }
        }

        self.last_block = Some(latest);
        Ok(events)
    }
}
