//! Shared fakes for integration tests: an in-memory contract gateway and a
//! scripted EIP-1193 wallet.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use alloy::network::EthereumWallet;
use alloy::primitives::{address, Address, TxHash, B256, U256};
use alloy::rpc::types::Log;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use blue_carbon_mrv::blockchain::types::one_token;
use blue_carbon_mrv::blockchain::{
    BlockRange, BlockchainError, BlockchainResult, ChainId, InjectedWallet, TxOutcome, WalletEvent,
    WalletRpcError,
};
use blue_carbon_mrv::contracts::abi::{BlueCarbonCredit, BlueCarbonMRV, PlantationRegistry};
use blue_carbon_mrv::contracts::{ContractGateway, PlantationRegistration, ReportSubmission};

pub const CREDIT: Address = address!("f8a2226C8f93c8552ff5DaCB839998C0E846E77c");
pub const REGISTRY: Address = address!("32109832c85438f1B4125149B322218bd2EA9CD3");
pub const OWNER: Address = address!("6fcD6344267F2D7C4D09914437A06ceF3Fc2E304");
pub const ALICE: Address = address!("1111111111111111111111111111111111111111");
pub const BOB: Address = address!("2222222222222222222222222222222222222222");

/// Anvil's first account.
pub const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Whole tokens to wei.
pub fn tokens(amount: u64) -> U256 {
    U256::from(amount) * one_token()
}

fn tx_hash(seed: u64) -> TxHash {
    B256::from(U256::from(seed))
}

/// An RPC log carrying `event`, emitted by `emitter` at `block`.
pub fn log_at<E: SolEvent>(event: &E, emitter: Address, block: u64, log_index: u64) -> Log {
    Log {
        inner: alloy::primitives::Log {
            address: emitter,
            data: event.encode_log_data(),
        },
        block_number: Some(block),
        transaction_hash: Some(tx_hash(block * 1000 + log_index)),
        log_index: Some(log_index),
        ..Default::default()
    }
}

pub fn plantation(id: u64, area: u64, ecosystem: &str, implementer: Address, verified: bool) -> PlantationRegistry::Plantation {
    PlantationRegistry::Plantation {
        id: U256::from(id),
        location: format!("Site {}", id),
        area: U256::from(area),
        ecosystemType: ecosystem.to_string(),
        plantationDate: U256::from(1_700_000_000u64),
        implementer,
        verified,
        ipfsHash: format!("QmPlantation{}", id),
    }
}

pub fn registered_log(id: u64, implementer: Address, block: u64) -> Log {
    let event = PlantationRegistry::PlantationRegistered {
        id: U256::from(id),
        implementer,
        location: format!("Site {}", id),
    };
    log_at(&event, REGISTRY, block, 0)
}

pub fn verified_log(id: u64, verifier: Address, block: u64) -> Log {
    let event = PlantationRegistry::PlantationVerified {
        id: U256::from(id),
        verifier,
    };
    log_at(&event, REGISTRY, block, 1)
}

pub fn transfer_log(from: Address, to: Address, amount: U256, block: u64, log_index: u64) -> Log {
    let event = BlueCarbonCredit::Transfer { from, to, value: amount };
    log_at(&event, CREDIT, block, log_index)
}

fn in_range(log: &Log, range: BlockRange) -> bool {
    let block = log.block_number.unwrap_or_default();
    block >= range.from && range.to.map_or(true, |to| block <= to)
}

/// State behind [`MockGateway`]. Tests mutate it directly.
#[derive(Default)]
pub struct MockState {
    pub latest_block: u64,
    pub balances: HashMap<Address, U256>,
    pub total_supply: U256,
    pub plantations: BTreeMap<U256, PlantationRegistry::Plantation>,
    pub implementer_plantations: HashMap<Address, Vec<U256>>,
    pub reports: HashMap<U256, BlueCarbonMRV::MonitoringReport>,
    pub registry_logs: Vec<Log>,
    pub transfer_logs: Vec<Log>,
    pub block_timestamps: HashMap<u64, u64>,

    /// Plantation IDs whose `getPlantation` call fails.
    pub broken_plantations: HashSet<U256>,
    pub fail_reads: bool,
    pub fail_logs: bool,
    pub fail_verify: bool,
    pub fail_mint: bool,
    pub omit_registered_event: bool,

    pub transfers: Vec<(Address, U256)>,
    pub mints: Vec<(Address, U256)>,
    pub submitted_reports: Vec<ReportSubmission>,
    pub verified_reports: Vec<U256>,
    pub sender: Address,
}

/// In-memory [`ContractGateway`].
#[derive(Default)]
pub struct MockGateway {
    state: Mutex<MockState>,
}

impl MockGateway {
    pub fn new() -> Self {
        let gateway = Self::default();
        gateway.state().sender = OWNER;
        gateway
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state mutex poisoned")
    }

    /// Register a plantation directly, with its event at `block`.
    pub fn seed_plantation(&self, p: PlantationRegistry::Plantation, block: u64) {
        let mut state = self.state();
        let id: u64 = p.id.to::<u64>();
        state.registry_logs.push(registered_log(id, p.implementer, block));
        state
            .implementer_plantations
            .entry(p.implementer)
            .or_default()
            .push(p.id);
        state.plantations.insert(p.id, p);
        state.latest_block = state.latest_block.max(block);
    }

    fn receipt(block: u64, logs: Vec<Log>) -> TxOutcome {
        TxOutcome {
            tx_hash: tx_hash(block * 1000 + 999),
            block_number: block,
            logs,
        }
    }

    fn read_guard(&self) -> BlockchainResult<MutexGuard<'_, MockState>> {
        let state = self.state();
        if state.fail_reads {
            return Err(BlockchainError::Rpc("All RPC providers failed: eth_call".to_string()));
        }
        Ok(state)
    }
}

#[async_trait]
impl ContractGateway for MockGateway {
    async fn credit_balance_of(&self, account: Address) -> BlockchainResult<U256> {
        Ok(self.read_guard()?.balances.get(&account).copied().unwrap_or_default())
    }

    async fn credit_total_supply(&self) -> BlockchainResult<U256> {
        Ok(self.read_guard()?.total_supply)
    }

    async fn credit_transfer(&self, to: Address, amount: U256) -> BlockchainResult<TxOutcome> {
        let mut state = self.state();
        let sender = state.sender;
        let balance = state.balances.get(&sender).copied().unwrap_or_default();
        if balance < amount {
            return Err(BlockchainError::Reverted("ERC20: transfer amount exceeds balance".to_string()));
        }
        state.balances.insert(sender, balance - amount);
        *state.balances.entry(to).or_default() += amount;
        state.transfers.push((to, amount));

        state.latest_block += 1;
        let block = state.latest_block;
        let log = transfer_log(sender, to, amount, block, 0);
        state.transfer_logs.push(log.clone());
        Ok(Self::receipt(block, vec![log]))
    }

    async fn credit_mint(&self, to: Address, amount: U256) -> BlockchainResult<TxOutcome> {
        let mut state = self.state();
        if state.fail_mint {
            return Err(BlockchainError::Reverted("Ownable: caller is not the owner".to_string()));
        }
        *state.balances.entry(to).or_default() += amount;
        state.total_supply += amount;
        state.mints.push((to, amount));

        state.latest_block += 1;
        let block = state.latest_block;
        let log = transfer_log(Address::ZERO, to, amount, block, 0);
        state.transfer_logs.push(log.clone());
        Ok(Self::receipt(block, vec![log]))
    }

    async fn register_plantation(&self, registration: &PlantationRegistration) -> BlockchainResult<TxOutcome> {
        let mut state = self.state();
        let id = state.plantations.len() as u64 + 1;
        let implementer = state.sender;
        state.latest_block += 1;
        let block = state.latest_block;

        let record = PlantationRegistry::Plantation {
            id: U256::from(id),
            location: registration.location.clone(),
            area: registration.area,
            ecosystemType: registration.ecosystem_type.clone(),
            plantationDate: U256::from(1_700_000_000u64),
            implementer,
            verified: false,
            ipfsHash: registration.ipfs_hash.clone(),
        };
        state.plantations.insert(U256::from(id), record);
        state
            .implementer_plantations
            .entry(implementer)
            .or_default()
            .push(U256::from(id));

        let event = PlantationRegistry::PlantationRegistered {
            id: U256::from(id),
            implementer,
            location: registration.location.clone(),
        };
        let log = log_at(&event, REGISTRY, block, 0);
        state.registry_logs.push(log.clone());

        let logs = if state.omit_registered_event { Vec::new() } else { vec![log] };
        Ok(Self::receipt(block, logs))
    }

    async fn get_plantation(&self, id: U256) -> BlockchainResult<PlantationRegistry::Plantation> {
        let state = self.read_guard()?;
        if state.broken_plantations.contains(&id) {
            return Err(BlockchainError::Contract(format!("getPlantation({}) reverted", id)));
        }
        state
            .plantations
            .get(&id)
            .cloned()
            .ok_or_else(|| BlockchainError::Contract("Plantation does not exist".to_string()))
    }

    async fn verify_plantation(&self, id: U256) -> BlockchainResult<TxOutcome> {
        let mut state = self.state();
        if state.fail_verify {
            return Err(BlockchainError::Reverted("Not authorized".to_string()));
        }
        let verifier = state.sender;
        let plantation = state
            .plantations
            .get_mut(&id)
            .ok_or_else(|| BlockchainError::Reverted("Plantation does not exist".to_string()))?;
        plantation.verified = true;

        state.latest_block += 1;
        let block = state.latest_block;
        let log = verified_log(id.to::<u64>(), verifier, block);
        state.registry_logs.push(log.clone());
        Ok(Self::receipt(block, vec![log]))
    }

    async fn implementer_plantations(&self, implementer: Address) -> BlockchainResult<Vec<U256>> {
        Ok(self
            .read_guard()?
            .implementer_plantations
            .get(&implementer)
            .cloned()
            .unwrap_or_default())
    }

    async fn submit_monitoring_report(&self, report: &ReportSubmission) -> BlockchainResult<TxOutcome> {
        let mut state = self.state();
        state.submitted_reports.push(report.clone());
        state.latest_block += 1;
        Ok(Self::receipt(state.latest_block, Vec::new()))
    }

    async fn verify_monitoring_report(&self, id: U256) -> BlockchainResult<TxOutcome> {
        let mut state = self.state();
        let report = state
            .reports
            .get_mut(&id)
            .ok_or_else(|| BlockchainError::Reverted("Report does not exist".to_string()))?;
        report.verified = true;
        state.verified_reports.push(id);
        state.latest_block += 1;
        Ok(Self::receipt(state.latest_block, Vec::new()))
    }

    async fn get_monitoring_report(&self, id: U256) -> BlockchainResult<BlueCarbonMRV::MonitoringReport> {
        self.read_guard()?
            .reports
            .get(&id)
            .cloned()
            .ok_or_else(|| BlockchainError::Contract("Report does not exist".to_string()))
    }

    async fn latest_block(&self) -> BlockchainResult<u64> {
        Ok(self.read_guard()?.latest_block)
    }

    async fn block_timestamp(&self, number: u64) -> BlockchainResult<u64> {
        self.read_guard()?
            .block_timestamps
            .get(&number)
            .copied()
            .ok_or_else(|| BlockchainError::Rpc(format!("Block {} not found", number)))
    }

    async fn plantation_registered_logs(&self, range: BlockRange) -> BlockchainResult<Vec<Log>> {
        let state = self.state();
        if state.fail_logs {
            return Err(BlockchainError::Rpc("All RPC providers failed: eth_getLogs".to_string()));
        }
        Ok(state
            .registry_logs
            .iter()
            .filter(|log| in_range(log, range))
            .filter(|log| log.topics().first() == Some(&PlantationRegistry::PlantationRegistered::SIGNATURE_HASH))
            .cloned()
            .collect())
    }

    async fn registry_logs(&self, range: BlockRange) -> BlockchainResult<Vec<Log>> {
        let state = self.state();
        if state.fail_logs {
            return Err(BlockchainError::Rpc("All RPC providers failed: eth_getLogs".to_string()));
        }
        Ok(state.registry_logs.iter().filter(|log| in_range(log, range)).cloned().collect())
    }

    async fn transfer_logs(&self, range: BlockRange) -> BlockchainResult<Vec<Log>> {
        let state = self.state();
        if state.fail_logs {
            return Err(BlockchainError::Rpc("All RPC providers failed: eth_getLogs".to_string()));
        }
        Ok(state.transfer_logs.iter().filter(|log| in_range(log, range)).cloned().collect())
    }
}

/// Wallet whose answers are set by the test.
pub struct ScriptedWallet {
    signer: PrivateKeySigner,
    chain_id: AtomicU64,
    known_chains: Mutex<HashSet<u64>>,
    reject_requests: Mutex<bool>,
    requests: Mutex<Vec<String>>,
    events: broadcast::Sender<WalletEvent>,
}

impl ScriptedWallet {
    /// Wallet on `chain_id`, knowing only that chain.
    pub fn on_chain(chain_id: u64) -> Self {
        let signer: PrivateKeySigner = TEST_PRIVATE_KEY.parse().expect("valid test key");
        let (events, _) = broadcast::channel(16);
        Self {
            signer,
            chain_id: AtomicU64::new(chain_id),
            known_chains: Mutex::new(HashSet::from([chain_id])),
            reject_requests: Mutex::new(false),
            requests: Mutex::new(Vec::new()),
            events,
        }
    }

    pub fn account(&self) -> Address {
        self.signer.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id.load(Ordering::SeqCst)
    }

    /// Make every prompt fail with code 4001.
    pub fn reject_everything(&self) {
        *self.reject_requests.lock().expect("wallet mutex poisoned") = true;
    }

    /// Methods requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("wallet mutex poisoned").clone()
    }

    /// The user switches networks in the wallet itself.
    pub fn move_to(&self, chain_id: u64) {
        self.known_chains.lock().expect("wallet mutex poisoned").insert(chain_id);
        self.chain_id.store(chain_id, Ordering::SeqCst);
        self.emit(WalletEvent::ChainChanged(chain_id));
    }

    pub fn emit(&self, event: WalletEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl InjectedWallet for ScriptedWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletRpcError> {
        self.requests
            .lock()
            .expect("wallet mutex poisoned")
            .push(method.to_string());

        let prompts = matches!(
            method,
            "eth_requestAccounts" | "wallet_switchEthereumChain" | "wallet_addEthereumChain"
        );
        if prompts && *self.reject_requests.lock().expect("wallet mutex poisoned") {
            return Err(WalletRpcError::user_rejected());
        }

        match method {
            "eth_requestAccounts" | "eth_accounts" => Ok(json!([self.account().to_string()])),
            "eth_chainId" => Ok(json!(ChainId(self.chain_id()).to_hex())),
            "wallet_switchEthereumChain" | "wallet_addEthereumChain" => {
                let hex = params[0]["chainId"].as_str().unwrap_or_default().to_string();
                let chain = ChainId::from_hex(&hex)
                    .ok_or_else(|| WalletRpcError::new(WalletRpcError::INVALID_PARAMS, "bad chainId"))?;

                let mut known = self.known_chains.lock().expect("wallet mutex poisoned");
                if method == "wallet_addEthereumChain" {
                    known.insert(chain.0);
                } else if !known.contains(&chain.0) {
                    return Err(WalletRpcError::unrecognized_chain(&hex));
                }
                self.chain_id.store(chain.0, Ordering::SeqCst);
                Ok(Value::Null)
            }
            other => Err(WalletRpcError::new(
                WalletRpcError::UNSUPPORTED_METHOD,
                format!("{} not supported", other),
            )),
        }
    }

    fn signing_wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

/// Shared handle to a scripted wallet, usable both by the test and the session.
pub fn scripted_wallet(chain_id: u64) -> (Arc<ScriptedWallet>, Arc<dyn InjectedWallet>) {
    let wallet = Arc::new(ScriptedWallet::on_chain(chain_id));
    let dyn_wallet: Arc<dyn InjectedWallet> = wallet.clone();
    (wallet, dyn_wallet)
}
