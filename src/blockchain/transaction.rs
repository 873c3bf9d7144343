//! Transaction confirmation monitoring.
//!
//! Transactions are built, signed and broadcast by the signer provider (its
//! fillers handle nonce, gas and chain ID). This module waits for the receipt
//! and turns it into a [`TxOutcome`].

use std::time::Duration;

use alloy::network::Ethereum;
use alloy::primitives::TxHash;
use alloy::providers::PendingTransactionBuilder;
use alloy::rpc::types::TransactionReceipt;
use tokio::time::{interval, timeout};

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult, ConfirmationStatus, TxOutcome};
use crate::config::BlockchainConfig;

/// Polls for a receipt until the transaction has enough confirmations.
#[derive(Debug, Clone)]
pub struct Confirmer {
    client: BlockchainClient,
    timeout_duration: Duration,
    poll_interval: Duration,
}

impl Confirmer {
    /// Create a confirmer reading receipts through `client`.
    pub fn new(client: BlockchainClient, tuning: &BlockchainConfig) -> Self {
        Self {
            client,
            timeout_duration: Duration::from_secs(tuning.confirmation_timeout_secs),
            poll_interval: Duration::from_millis(tuning.confirmation_poll_ms),
        }
    }

    /// Wait for a submitted transaction and collect its outcome.
    pub async fn confirm(&self, pending: PendingTransactionBuilder<Ethereum>) -> BlockchainResult<TxOutcome> {
        let tx_hash = *pending.tx_hash();
        tracing::info!(tx_hash = %tx_hash, "Transaction submitted, waiting for confirmation");
        let receipt = self.wait_for_receipt(tx_hash).await?;
        Ok(TxOutcome::from_receipt(&receipt))
    }

    /// Current state of a transaction, without waiting.
    pub async fn status(&self, tx_hash: TxHash) -> BlockchainResult<(ConfirmationStatus, Option<TransactionReceipt>)> {
        let receipt = match self.client.get_transaction_receipt(tx_hash).await? {
            Some(r) => r,
            None => return Ok((ConfirmationStatus::Pending, None)),
        };

        if !receipt.status() {
            return Ok((
                ConfirmationStatus::Failed("Transaction reverted".to_string()),
                Some(receipt),
            ));
        }

        let required = self.client.confirmation_blocks().max(1);
        let current_block = self.client.get_block_number().await?;
        let tx_block = receipt.block_number.unwrap_or(current_block);
        // The inclusion block itself counts as the first confirmation.
        let confirmations = current_block.saturating_sub(tx_block).saturating_add(1) as u32;

        let status = if confirmations >= required {
            ConfirmationStatus::Confirmed { block_number: tx_block }
        } else {
            ConfirmationStatus::Confirming {
                current: confirmations,
                required,
            }
        };
        Ok((status, Some(receipt)))
    }

    /// Wait for a transaction to be confirmed and return its receipt.
    pub async fn wait_for_receipt(&self, tx_hash: TxHash) -> BlockchainResult<TransactionReceipt> {
        let result = timeout(self.timeout_duration, async {
            let mut ticker = interval(self.poll_interval);

            loop {
                ticker.tick().await;

                let status = match self.status(tx_hash).await {
                    Ok(status) => status,
                    Err(e @ (BlockchainError::Rpc(_) | BlockchainError::Timeout(_))) => {
                        // Transient; keep polling until the deadline.
                        tracing::warn!(tx_hash = %tx_hash, error = %e, "Receipt poll failed");
                        continue;
                    }
                    Err(e) => return Err(e),
                };

                match status {
                    (ConfirmationStatus::Confirmed { block_number }, Some(receipt)) => {
                        tracing::info!(tx_hash = %tx_hash, block_number, "Transaction confirmed");
                        return Ok(receipt);
                    }
                    (ConfirmationStatus::Failed(reason), _) => {
                        return Err(BlockchainError::Reverted(format!("{} ({})", reason, tx_hash)));
                    }
                    (ConfirmationStatus::Confirming { current, required }, _) => {
                        tracing::debug!(
                            tx_hash = %tx_hash,
                            confirmations = current,
                            required = required,
                            "Waiting for confirmations"
                        );
                    }
                    _ => tracing::debug!(tx_hash = %tx_hash, "Transaction pending"),
                }
            }
        })
        .await;

        match result {
            Ok(receipt) => receipt,
            Err(_) => Err(BlockchainError::ConfirmationTimeout(
                tx_hash,
                self.timeout_duration.as_secs(),
            )),
        }
    }
}
