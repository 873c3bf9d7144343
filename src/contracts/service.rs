//! Contract service: typed operations with the application's failure policy.
//!
//! Reads degrade to `"0"`, `None` or an empty list; writes report success as
//! `bool` or `Option`. Every failure is logged with its cause and counted in
//! `mrv_contract_calls_total`.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use chrono::Utc;

use crate::blockchain::types::one_token;
use crate::blockchain::{BlockchainError, BlockchainResult, TxOutcome};
use crate::config::HistoryConfig;
use crate::contracts::abi::PlantationRegistry;
use crate::contracts::gateway::ContractGateway;
use crate::contracts::types::{MonitoringReport, PlantationData, PlantationRegistration, ReportSubmission};
use crate::credits::{self, format_ether, parse_ether};
use crate::history::{self, TransactionRecord};
use crate::observability::metrics;

/// Log and count the outcome of an operation, keeping only the value.
fn settle<T>(operation: &'static str, result: BlockchainResult<T>) -> Option<T> {
    match result {
        Ok(value) => {
            metrics::record_contract_call(operation, true);
            Some(value)
        }
        Err(e) => {
            metrics::record_contract_call(operation, false);
            tracing::error!(operation, error = %e, "Contract operation failed");
            None
        }
    }
}

/// ID carried by the `PlantationRegistered` event in a receipt.
fn registered_plantation_id(outcome: &TxOutcome) -> BlockchainResult<U256> {
    outcome
        .logs
        .iter()
        .find_map(|log| log.log_decode::<PlantationRegistry::PlantationRegistered>().ok())
        .map(|decoded| decoded.inner.data.id)
        .ok_or(BlockchainError::EventNotFound("PlantationRegistered"))
}

/// High-level contract operations.
#[derive(Clone)]
pub struct ContractService {
    gateway: Arc<dyn ContractGateway>,
}

impl ContractService {
    pub fn new(gateway: Arc<dyn ContractGateway>) -> Self {
        Self { gateway }
    }

    /// The gateway backing this service.
    pub fn gateway(&self) -> &Arc<dyn ContractGateway> {
        &self.gateway
    }

    // ------------------------------------------------------------------
    // Credit token
    // ------------------------------------------------------------------

    /// Credit balance of `account` as a decimal string; `"0"` on failure.
    pub async fn get_carbon_credit_balance(&self, account: Address) -> String {
        settle("balance_of", self.gateway.credit_balance_of(account).await)
            .map(format_ether)
            .unwrap_or_else(|| "0".to_string())
    }

    /// Total credit supply as a decimal string; `"0"` on failure.
    pub async fn get_total_supply(&self) -> String {
        settle("total_supply", self.gateway.credit_total_supply().await)
            .map(format_ether)
            .unwrap_or_else(|| "0".to_string())
    }

    /// Transfer `amount` (decimal, 18 decimals) credits to `to`.
    pub async fn transfer_carbon_credits(&self, to: Address, amount: &str) -> bool {
        let result = match parse_ether(amount) {
            Ok(wei) => self.gateway.credit_transfer(to, wei).await,
            Err(e) => Err(e),
        };

        match settle("transfer", result) {
            Some(outcome) => {
                tracing::info!(to = %to, amount, tx_hash = %outcome.tx_hash, "Credits transferred");
                true
            }
            None => false,
        }
    }

    /// Mint the estimated credits for `plantation` to its implementer.
    pub async fn mint_carbon_credits_for_plantation(&self, plantation: &PlantationData) -> bool {
        let credits = self.calculate_carbon_credits_for_plantation(plantation);
        let amount = U256::from(credits).saturating_mul(one_token());

        match settle("mint", self.gateway.credit_mint(plantation.implementer, amount).await) {
            Some(outcome) => {
                tracing::info!(
                    plantation_id = %plantation.id,
                    implementer = %plantation.implementer,
                    credits,
                    tx_hash = %outcome.tx_hash,
                    "Credits minted"
                );
                true
            }
            None => false,
        }
    }

    /// Client-side credit estimate for a plantation.
    pub fn calculate_carbon_credits_for_plantation(&self, plantation: &PlantationData) -> u64 {
        credits::credits_for_plantation(plantation)
    }

    /// `1234.5` → `1,234.50`.
    pub fn format_token_amount(&self, amount: &str) -> String {
        credits::format_token_amount(amount)
    }

    // ------------------------------------------------------------------
    // Plantation registry
    // ------------------------------------------------------------------

    /// Register a plantation and return its token ID.
    pub async fn register_plantation(
        &self,
        location: &str,
        area: u64,
        ecosystem_type: &str,
        ipfs_hash: &str,
    ) -> Option<String> {
        let registration = PlantationRegistration {
            location: location.to_string(),
            area: U256::from(area),
            ecosystem_type: ecosystem_type.to_string(),
            ipfs_hash: ipfs_hash.to_string(),
        };

        let result = self
            .gateway
            .register_plantation(&registration)
            .await
            .and_then(|outcome| registered_plantation_id(&outcome));

        let id = settle("register_plantation", result)?;
        tracing::info!(plantation_id = %id, location, "Plantation registered");
        Some(id.to_string())
    }

    pub async fn get_plantation(&self, token_id: U256) -> Option<PlantationData> {
        settle("get_plantation", self.gateway.get_plantation(token_id).await).map(PlantationData::from)
    }

    /// Every registered plantation; empty when the log query fails.
    pub async fn get_all_plantations(&self) -> Vec<PlantationData> {
        settle(
            "get_all_plantations",
            history::get_all_plantations(self.gateway.as_ref()).await,
        )
        .unwrap_or_default()
    }

    pub async fn get_unverified_plantations(&self) -> Vec<PlantationData> {
        settle(
            "get_unverified_plantations",
            history::get_unverified_plantations(self.gateway.as_ref()).await,
        )
        .unwrap_or_default()
    }

    /// Token IDs registered by `implementer`.
    pub async fn get_user_plantations(&self, implementer: Address) -> Vec<String> {
        settle(
            "get_user_plantations",
            self.gateway.implementer_plantations(implementer).await,
        )
        .map(|ids| ids.iter().map(U256::to_string).collect())
        .unwrap_or_default()
    }

    /// Verify a plantation, then mint its credits.
    ///
    /// Returns the minted credits, or `None` when verification, the refetch
    /// or minting fails.
    pub async fn verify_plantation(&self, token_id: U256) -> Option<u64> {
        settle("verify_plantation", self.gateway.verify_plantation(token_id).await)?;
        tracing::info!(plantation_id = %token_id, "Plantation verified");

        let plantation = self.get_plantation(token_id).await?;
        let credits = self.calculate_carbon_credits_for_plantation(&plantation);

        if !self.mint_carbon_credits_for_plantation(&plantation).await {
            tracing::warn!(plantation_id = %token_id, "Plantation verified but credit minting failed");
            return None;
        }
        Some(credits)
    }

    // ------------------------------------------------------------------
    // MRV
    // ------------------------------------------------------------------

    pub async fn submit_monitoring_report(
        &self,
        plantation_id: U256,
        survival_rate: u64,
        biomass: u64,
        data_source: &str,
        ipfs_hash: &str,
    ) -> bool {
        let report = ReportSubmission {
            plantation_id,
            survival_rate: U256::from(survival_rate),
            biomass: U256::from(biomass),
            data_source: data_source.to_string(),
            ipfs_hash: ipfs_hash.to_string(),
        };
        settle(
            "submit_monitoring_report",
            self.gateway.submit_monitoring_report(&report).await,
        )
        .is_some()
    }

    pub async fn verify_monitoring_report(&self, report_id: U256) -> bool {
        settle(
            "verify_monitoring_report",
            self.gateway.verify_monitoring_report(report_id).await,
        )
        .is_some()
    }

    pub async fn get_monitoring_report(&self, report_id: U256) -> Option<MonitoringReport> {
        settle(
            "get_monitoring_report",
            self.gateway.get_monitoring_report(report_id).await,
        )
        .map(MonitoringReport::from)
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Recent credit transfers of `account`; empty when the query fails.
    pub async fn get_transaction_history(&self, account: Address, config: &HistoryConfig) -> Vec<TransactionRecord> {
        settle(
            "transaction_history",
            history::recent_transactions(self.gateway.as_ref(), account, config, Utc::now()).await,
        )
        .unwrap_or_default()
    }
}

impl std::fmt::Debug for ContractService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractService").finish_non_exhaustive()
    }
}
