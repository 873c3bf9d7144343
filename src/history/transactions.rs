//! Credit transfer history of one account, rebuilt from `Transfer` logs.

use alloy::primitives::{Address, TxHash};
use alloy::rpc::types::Log;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;

use crate::blockchain::{BlockRange, BlockchainResult};
use crate::config::HistoryConfig;
use crate::contracts::abi::BlueCarbonCredit;
use crate::contracts::ContractGateway;
use crate::credits::format_ether;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    Sent,
    Received,
}

/// One transfer involving the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub direction: TransferDirection,
    /// Decimal token amount.
    pub amount: String,
    /// Counterparty.
    pub address: Address,
    /// "time ago" label.
    pub timestamp: String,
    pub hash: TxHash,
    pub block_number: u64,
}

struct Candidate {
    from: Address,
    to: Address,
    value: alloy::primitives::U256,
    block_number: u64,
    hash: TxHash,
}

fn decode(log: &Log) -> Option<Candidate> {
    let decoded = log.log_decode::<BlueCarbonCredit::Transfer>().ok()?;
    let transfer = decoded.inner.data;
    Some(Candidate {
        from: transfer.from,
        to: transfer.to,
        value: transfer.value,
        block_number: log.block_number.unwrap_or_default(),
        hash: log.transaction_hash.unwrap_or_default(),
    })
}

/// Latest transfers sent or received by `account` within the configured
/// block window, newest first. Transfers whose block timestamp cannot be
/// resolved are left out.
pub async fn recent_transactions(
    gateway: &dyn ContractGateway,
    account: Address,
    config: &HistoryConfig,
    now: DateTime<Utc>,
) -> BlockchainResult<Vec<TransactionRecord>> {
    let latest = gateway.latest_block().await?;
    let logs = gateway
        .transfer_logs(BlockRange::trailing(latest, config.transfer_window_blocks))
        .await?;

    let mut candidates: Vec<Candidate> = logs
        .iter()
        .filter_map(decode)
        .filter(|c| c.from == account || c.to == account)
        .collect();
    candidates.sort_by(|a, b| b.block_number.cmp(&a.block_number));
    candidates.truncate(config.transaction_limit);

    let records = candidates.into_iter().map(|c| async move {
        let block_time = match gateway.block_timestamp(c.block_number).await {
            Ok(ts) => ts,
            Err(e) => {
                tracing::warn!(block = c.block_number, tx_hash = %c.hash, error = %e, "Dropping transfer with unknown block time");
                return None;
            }
        };

        let received = c.to == account;
        Some(TransactionRecord {
            id: c.hash.to_string(),
            direction: if received {
                TransferDirection::Received
            } else {
                TransferDirection::Sent
            },
            amount: format_ether(c.value),
            address: if received { c.from } else { c.to },
            timestamp: time_ago(now, block_time),
            hash: c.hash,
            block_number: c.block_number,
        })
    });

    Ok(join_all(records).await.into_iter().flatten().collect())
}

/// Relative label for a Unix timestamp: `Just now`, `5 min ago`,
/// `1 hour ago`, `3 days ago`.
pub fn time_ago(now: DateTime<Utc>, then_secs: u64) -> String {
    let then = i64::try_from(then_secs).unwrap_or(i64::MAX);
    let elapsed = now.timestamp().saturating_sub(then).max(0);

    let minutes = elapsed / 60;
    let hours = elapsed / 3600;
    let days = elapsed / 86_400;

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{} min ago", minutes)
    } else if hours < 24 {
        format!("{} hour{} ago", hours, if hours > 1 { "s" } else { "" })
    } else {
        format!("{} day{} ago", days, if days > 1 { "s" } else { "" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_time_ago_labels() {
        let now = at(1_000_000);
        assert_eq!(time_ago(now, 1_000_000), "Just now");
        assert_eq!(time_ago(now, 999_950), "Just now");
        assert_eq!(time_ago(now, 999_880), "2 min ago");
        assert_eq!(time_ago(now, 1_000_000 - 3600), "1 hour ago");
        assert_eq!(time_ago(now, 1_000_000 - 5 * 3600), "5 hours ago");
        assert_eq!(time_ago(now, 1_000_000 - 86_400), "1 day ago");
        assert_eq!(time_ago(now, 1_000_000 - 3 * 86_400), "3 days ago");
    }

    #[test]
    fn test_future_block_is_just_now() {
        assert_eq!(time_ago(at(100), 500), "Just now");
    }

    #[test]
    fn test_direction_serialization() {
        assert_eq!(serde_json::to_value(TransferDirection::Received).unwrap(), "received");
        assert_eq!(serde_json::to_value(TransferDirection::Sent).unwrap(), "sent");
    }
}
