//! Contract gateway: the raw on-chain calls behind the contract service.
//!
//! [`ContractGateway`] is the seam between the service's failure policy and
//! the chain. [`AlloyGateway`] binds it to the session's providers; tests
//! substitute an in-memory implementation.

use std::sync::Arc;

use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, B256, U256};
use alloy::providers::DynProvider;
use alloy::rpc::types::{Filter, Log};
use alloy::sol_types::SolEvent;
use async_trait::async_trait;

use crate::blockchain::{
    BlockRange, BlockchainClient, BlockchainError, BlockchainResult, Confirmer, TxOutcome, WalletSession,
};
use crate::config::ContractsConfig;
use crate::contracts::abi::{BlueCarbonCredit, BlueCarbonMRV, PlantationRegistry};
use crate::contracts::types::{PlantationRegistration, ReportSubmission};

/// Raw contract operations. Writes resolve once the transaction is confirmed.
#[async_trait]
pub trait ContractGateway: Send + Sync {
    async fn credit_balance_of(&self, account: Address) -> BlockchainResult<U256>;
    async fn credit_total_supply(&self) -> BlockchainResult<U256>;
    async fn credit_transfer(&self, to: Address, amount: U256) -> BlockchainResult<TxOutcome>;
    async fn credit_mint(&self, to: Address, amount: U256) -> BlockchainResult<TxOutcome>;

    async fn register_plantation(&self, registration: &PlantationRegistration) -> BlockchainResult<TxOutcome>;
    async fn get_plantation(&self, id: U256) -> BlockchainResult<PlantationRegistry::Plantation>;
    async fn verify_plantation(&self, id: U256) -> BlockchainResult<TxOutcome>;
    async fn implementer_plantations(&self, implementer: Address) -> BlockchainResult<Vec<U256>>;

    async fn submit_monitoring_report(&self, report: &ReportSubmission) -> BlockchainResult<TxOutcome>;
    async fn verify_monitoring_report(&self, id: U256) -> BlockchainResult<TxOutcome>;
    async fn get_monitoring_report(&self, id: U256) -> BlockchainResult<BlueCarbonMRV::MonitoringReport>;

    /// Latest block number.
    async fn latest_block(&self) -> BlockchainResult<u64>;
    /// Timestamp of a block in Unix seconds.
    async fn block_timestamp(&self, number: u64) -> BlockchainResult<u64>;

    /// `PlantationRegistered` logs of the registry.
    async fn plantation_registered_logs(&self, range: BlockRange) -> BlockchainResult<Vec<Log>>;
    /// `PlantationRegistered` and `PlantationVerified` logs of the registry.
    async fn registry_logs(&self, range: BlockRange) -> BlockchainResult<Vec<Log>>;
    /// `Transfer` logs of the credit token.
    async fn transfer_logs(&self, range: BlockRange) -> BlockchainResult<Vec<Log>>;
}

/// Gateway backed by the wallet session's providers.
pub struct AlloyGateway {
    session: Arc<WalletSession>,
    contracts: ContractsConfig,
}

impl AlloyGateway {
    pub fn new(session: Arc<WalletSession>, contracts: ContractsConfig) -> Self {
        Self { session, contracts }
    }

    fn deployed(address: Address, name: &'static str) -> BlockchainResult<Address> {
        if address.is_zero() {
            return Err(BlockchainError::NotDeployed(name));
        }
        Ok(address)
    }

    fn credit_address(&self) -> BlockchainResult<Address> {
        Self::deployed(self.contracts.carbon_credit, "BlueCarbonCredit")
    }

    fn registry_address(&self) -> BlockchainResult<Address> {
        Self::deployed(self.contracts.plantation_registry, "PlantationRegistry")
    }

    fn mrv_address(&self) -> BlockchainResult<Address> {
        Self::deployed(self.contracts.mrv, "BlueCarbonMRV")
    }

    /// Signer provider plus a confirmer bound to the same connection.
    async fn signer(&self) -> BlockchainResult<(DynProvider, Confirmer)> {
        let connection = self.session.ensure_signer().await?;
        let confirmer = Confirmer::new(connection.client.clone(), self.session.tuning());
        Ok((connection.signer.clone(), confirmer))
    }

    fn reader(&self) -> BlockchainResult<BlockchainClient> {
        self.session.read_client()
    }

    async fn logs(&self, address: Address, range: BlockRange, topics: Vec<B256>) -> BlockchainResult<Vec<Log>> {
        let to = range.to.map(BlockNumberOrTag::Number).unwrap_or(BlockNumberOrTag::Latest);
        let filter = Filter::new()
            .address(address)
            .from_block(range.from)
            .to_block(to)
            .event_signature(topics);
        self.reader()?.get_logs(&filter).await
    }
}

fn send_error(e: impl std::fmt::Display) -> BlockchainError {
    BlockchainError::Contract(e.to_string())
}

#[async_trait]
impl ContractGateway for AlloyGateway {
    async fn credit_balance_of(&self, account: Address) -> BlockchainResult<U256> {
        let client = self.reader()?;
        let token = BlueCarbonCredit::new(self.credit_address()?, client.provider().clone());
        let call = token.balanceOf(account);
        client.timed(call.call()).await
    }

    async fn credit_total_supply(&self) -> BlockchainResult<U256> {
        let client = self.reader()?;
        let token = BlueCarbonCredit::new(self.credit_address()?, client.provider().clone());
        let call = token.totalSupply();
        client.timed(call.call()).await
    }

    async fn credit_transfer(&self, to: Address, amount: U256) -> BlockchainResult<TxOutcome> {
        let address = self.credit_address()?;
        let (signer, confirmer) = self.signer().await?;
        let token = BlueCarbonCredit::new(address, signer);
        let pending = token.transfer(to, amount).send().await.map_err(send_error)?;
        confirmer.confirm(pending).await
    }

    async fn credit_mint(&self, to: Address, amount: U256) -> BlockchainResult<TxOutcome> {
        let address = self.credit_address()?;
        let (signer, confirmer) = self.signer().await?;
        let token = BlueCarbonCredit::new(address, signer);
        let pending = token.mint(to, amount).send().await.map_err(send_error)?;
        confirmer.confirm(pending).await
    }

    async fn register_plantation(&self, registration: &PlantationRegistration) -> BlockchainResult<TxOutcome> {
        let address = self.registry_address()?;
        let (signer, confirmer) = self.signer().await?;
        let registry = PlantationRegistry::new(address, signer);
        let pending = registry
            .registerPlantation(
                registration.location.clone(),
                registration.area,
                registration.ecosystem_type.clone(),
                registration.ipfs_hash.clone(),
            )
            .send()
            .await
            .map_err(send_error)?;
        confirmer.confirm(pending).await
    }

    async fn get_plantation(&self, id: U256) -> BlockchainResult<PlantationRegistry::Plantation> {
        let client = self.reader()?;
        let registry = PlantationRegistry::new(self.registry_address()?, client.provider().clone());
        let call = registry.getPlantation(id);
        client.timed(call.call()).await
    }

    async fn verify_plantation(&self, id: U256) -> BlockchainResult<TxOutcome> {
        let address = self.registry_address()?;
        let (signer, confirmer) = self.signer().await?;
        let registry = PlantationRegistry::new(address, signer);
        let pending = registry.verifyPlantation(id).send().await.map_err(send_error)?;
        confirmer.confirm(pending).await
    }

    async fn implementer_plantations(&self, implementer: Address) -> BlockchainResult<Vec<U256>> {
        let client = self.reader()?;
        let registry = PlantationRegistry::new(self.registry_address()?, client.provider().clone());
        let call = registry.getImplementerPlantations(implementer);
        client.timed(call.call()).await
    }

    async fn submit_monitoring_report(&self, report: &ReportSubmission) -> BlockchainResult<TxOutcome> {
        let address = self.mrv_address()?;
        let (signer, confirmer) = self.signer().await?;
        let mrv = BlueCarbonMRV::new(address, signer);
        let pending = mrv
            .submitMonitoringReport(
                report.plantation_id,
                report.survival_rate,
                report.biomass,
                report.data_source.clone(),
                report.ipfs_hash.clone(),
            )
            .send()
            .await
            .map_err(send_error)?;
        confirmer.confirm(pending).await
    }

    async fn verify_monitoring_report(&self, id: U256) -> BlockchainResult<TxOutcome> {
        let address = self.mrv_address()?;
        let (signer, confirmer) = self.signer().await?;
        let mrv = BlueCarbonMRV::new(address, signer);
        let pending = mrv.verifyMonitoringReport(id).send().await.map_err(send_error)?;
        confirmer.confirm(pending).await
    }

    async fn get_monitoring_report(&self, id: U256) -> BlockchainResult<BlueCarbonMRV::MonitoringReport> {
        let client = self.reader()?;
        let mrv = BlueCarbonMRV::new(self.mrv_address()?, client.provider().clone());
        let call = mrv.getMonitoringReport(id);
        client.timed(call.call()).await
    }

    async fn latest_block(&self) -> BlockchainResult<u64> {
        self.reader()?.get_block_number().await
    }

    async fn block_timestamp(&self, number: u64) -> BlockchainResult<u64> {
        self.reader()?.get_block_timestamp(number).await
    }

    async fn plantation_registered_logs(&self, range: BlockRange) -> BlockchainResult<Vec<Log>> {
        let address = self.registry_address()?;
        self.logs(address, range, vec![PlantationRegistry::PlantationRegistered::SIGNATURE_HASH])
            .await
    }

    async fn registry_logs(&self, range: BlockRange) -> BlockchainResult<Vec<Log>> {
        let address = self.registry_address()?;
        self.logs(
            address,
            range,
            vec![
                PlantationRegistry::PlantationRegistered::SIGNATURE_HASH,
                PlantationRegistry::PlantationVerified::SIGNATURE_HASH,
            ],
        )
        .await
    }

    async fn transfer_logs(&self, range: BlockRange) -> BlockchainResult<Vec<Log>> {
        let address = self.credit_address()?;
        self.logs(address, range, vec![BlueCarbonCredit::Transfer::SIGNATURE_HASH])
            .await
    }
}
