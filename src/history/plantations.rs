//! Plantation enumeration by replaying registry events.

use std::sync::atomic::{AtomicU64, Ordering};

use alloy::primitives::U256;
use alloy::rpc::types::Log;
use dashmap::DashMap;
use futures_util::stream::{self, StreamExt};

use crate::blockchain::{BlockRange, BlockchainResult};
use crate::contracts::abi::PlantationRegistry;
use crate::contracts::{ContractGateway, PlantationData};
use crate::observability::metrics;

/// Concurrent `getPlantation` calls during a full replay.
const FETCH_CONCURRENCY: usize = 8;

fn registered_id(log: &Log) -> Option<U256> {
    log.log_decode::<PlantationRegistry::PlantationRegistered>()
        .ok()
        .map(|decoded| decoded.inner.data.id)
}

/// Every plantation with a `PlantationRegistered` event, in event order.
///
/// A plantation whose record cannot be fetched is skipped; only a failed log
/// query fails the whole call.
pub async fn get_all_plantations(gateway: &dyn ContractGateway) -> BlockchainResult<Vec<PlantationData>> {
    let logs = gateway.plantation_registered_logs(BlockRange::full()).await?;
    let ids: Vec<U256> = logs.iter().filter_map(registered_id).collect();
    tracing::debug!(count = ids.len(), "Replaying PlantationRegistered events");

    let fetched: Vec<Option<PlantationData>> = stream::iter(ids)
        .map(|id| async move {
            match gateway.get_plantation(id).await {
                Ok(plantation) => Some(PlantationData::from(plantation)),
                Err(e) => {
                    tracing::warn!(plantation_id = %id, error = %e, "Skipping plantation that failed to load");
                    None
                }
            }
        })
        .buffered(FETCH_CONCURRENCY)
        .collect()
        .await;

    Ok(fetched.into_iter().flatten().collect())
}

/// Plantations still awaiting verification.
pub async fn get_unverified_plantations(gateway: &dyn ContractGateway) -> BlockchainResult<Vec<PlantationData>> {
    let all = get_all_plantations(gateway).await?;
    Ok(all.into_iter().filter(|p| !p.verified).collect())
}

/// Fetch attempts before a plantation is given up on.
const MAX_FETCH_ATTEMPTS: u32 = 5;

/// Local view of the registry, kept current by incremental log scans.
#[derive(Debug, Default)]
pub struct PlantationIndex {
    entries: DashMap<U256, PlantationData>,
    /// Registered plantations whose record failed to load, with attempts so far.
    pending: DashMap<U256, u32>,
    /// First block not yet scanned.
    next_block: AtomicU64,
}

impl PlantationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan registry logs since the last refresh. Returns how many
    /// plantations were added or updated.
    ///
    /// Plantations that failed to load are retried on their own, up to
    /// [`MAX_FETCH_ATTEMPTS`] times; the scan cursor always moves on.
    pub async fn refresh(&self, gateway: &dyn ContractGateway) -> BlockchainResult<usize> {
        let from = self.next_block.load(Ordering::SeqCst);
        let latest = gateway.latest_block().await?;

        let mut changed = self.retry_pending(gateway).await;
        if from > latest {
            return Ok(changed);
        }

        let logs = gateway.registry_logs(BlockRange::between(from, latest)).await?;
        for log in &logs {
            if let Some(id) = registered_id(log) {
                if self.fetch(gateway, id).await {
                    changed += 1;
                }
            } else if let Ok(decoded) = log.log_decode::<PlantationRegistry::PlantationVerified>() {
                if let Some(mut entry) = self.entries.get_mut(&decoded.inner.data.id) {
                    if !entry.verified {
                        entry.verified = true;
                        changed += 1;
                    }
                }
            }
        }

        self.next_block.store(latest + 1, Ordering::SeqCst);
        metrics::record_index_size(self.entries.len());
        tracing::debug!(
            from,
            to = latest,
            changed,
            size = self.entries.len(),
            pending = self.pending.len(),
            "Plantation index refreshed"
        );
        Ok(changed)
    }

    async fn retry_pending(&self, gateway: &dyn ContractGateway) -> usize {
        let ids: Vec<U256> = self.pending.iter().map(|r| *r.key()).collect();
        let mut changed = 0;
        for id in ids {
            if self.fetch(gateway, id).await {
                changed += 1;
            }
        }
        changed
    }

    /// Load one plantation into the index. Returns whether the stored record
    /// changed.
    async fn fetch(&self, gateway: &dyn ContractGateway, id: U256) -> bool {
        match gateway.get_plantation(id).await {
            Ok(plantation) => {
                self.pending.remove(&id);
                let data = PlantationData::from(plantation);
                let unchanged = self.entries.get(&id).is_some_and(|current| *current == data);
                if !unchanged {
                    self.entries.insert(id, data);
                }
                !unchanged
            }
            Err(e) => {
                let attempts = {
                    let mut attempts = self.pending.entry(id).or_insert(0);
                    *attempts += 1;
                    *attempts
                };
                if attempts >= MAX_FETCH_ATTEMPTS {
                    tracing::warn!(plantation_id = %id, attempts, error = %e, "Giving up on plantation");
                    self.pending.remove(&id);
                } else {
                    tracing::warn!(plantation_id = %id, attempts, error = %e, "Plantation fetch failed, will retry");
                }
                false
            }
        }
    }

    /// All indexed plantations ordered by ID.
    pub fn all(&self) -> Vec<PlantationData> {
        let mut list: Vec<(U256, PlantationData)> = self
            .entries
            .iter()
            .map(|r| (*r.key(), r.value().clone()))
            .collect();
        list.sort_by_key(|(id, _)| *id);
        list.into_iter().map(|(_, p)| p).collect()
    }

    pub fn unverified(&self) -> Vec<PlantationData> {
        self.all().into_iter().filter(|p| !p.verified).collect()
    }

    pub fn get(&self, id: U256) -> Option<PlantationData> {
        self.entries.get(&id).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Plantations waiting for another fetch attempt.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Next block the index will scan from.
    pub fn next_block(&self) -> u64 {
        self.next_block.load(Ordering::SeqCst)
    }
}
