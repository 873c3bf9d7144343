//! Injected wallet boundary and the local key-backed wallet.
//!
//! The session only talks to wallets through [`InjectedWallet`], an
//! EIP-1193 shaped `request(method, params)` interface plus account/chain
//! change events. [`LocalWallet`] implements it on top of a private key.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables
//! - Keys are never logged or serialized

use std::sync::atomic::{AtomicU64, Ordering};

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainDescriptor, ChainId, WalletRpcError};

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "BLUE_CARBON_PRIVATE_KEY";

/// Events a wallet emits on its own initiative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// `accountsChanged`; an empty list means the wallet was locked or disconnected.
    AccountsChanged(Vec<Address>),
    /// `chainChanged`.
    ChainChanged(u64),
    /// `disconnect`.
    Disconnect,
}

/// An EIP-1193 style wallet.
#[async_trait]
pub trait InjectedWallet: Send + Sync {
    /// Forward a JSON-RPC request to the wallet.
    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletRpcError>;

    /// Signing handle used by the signer provider.
    fn signing_wallet(&self) -> EthereumWallet;

    /// Subscribe to wallet events.
    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}

/// Wallet backed by a local private key.
///
/// Account requests are approved without a prompt. Chains are only usable
/// after they were added, starting with the one passed at construction.
#[derive(Debug)]
pub struct LocalWallet {
    /// The underlying signer (private key).
    signer: PrivateKeySigner,
    /// Chains this wallet knows about, by ID.
    chains: DashMap<u64, ChainDescriptor>,
    /// Currently selected chain.
    active_chain: AtomicU64,
    /// Event channel.
    events: broadcast::Sender<WalletEvent>,
}

impl LocalWallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    /// * `chain` - Initially known and selected chain
    pub fn from_private_key(private_key_hex: &str, chain: ChainDescriptor) -> BlockchainResult<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex.parse().map_err(|e| BlockchainError::Wallet {
            code: WalletRpcError::UNAUTHORIZED,
            message: format!("Invalid private key format: {}", e),
        })?;

        let chain_id = ChainId::from_hex(&chain.chain_id).ok_or_else(|| BlockchainError::Wallet {
            code: WalletRpcError::INVALID_PARAMS,
            message: format!("Invalid chain ID '{}'", chain.chain_id),
        })?;

        tracing::info!(
            address = %signer.address(),
            chain_id = chain_id.0,
            "Local wallet initialized"
        );

        let chains = DashMap::new();
        chains.insert(chain_id.0, chain);
        let (events, _) = broadcast::channel(16);

        Ok(Self {
            signer,
            chains,
            active_chain: AtomicU64::new(chain_id.0),
            events,
        })
    }

    /// Load wallet from environment variable.
    ///
    /// Reads `BLUE_CARBON_PRIVATE_KEY`; returns `None` when it is unset.
    pub fn from_env(chain: ChainDescriptor) -> BlockchainResult<Option<Self>> {
        match std::env::var(PRIVATE_KEY_ENV_VAR) {
            Ok(key) if !key.trim().is_empty() => Self::from_private_key(&key, chain).map(Some),
            _ => Ok(None),
        }
    }

    /// Get the wallet's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Currently selected chain ID.
    pub fn chain_id(&self) -> u64 {
        self.active_chain.load(Ordering::SeqCst)
    }

    fn select_chain(&self, chain_id: u64) {
        let previous = self.active_chain.swap(chain_id, Ordering::SeqCst);
        if previous != chain_id {
            tracing::info!(from = previous, to = chain_id, "Wallet switched chain");
            let _ = self.events.send(WalletEvent::ChainChanged(chain_id));
        }
    }

    fn switch_chain(&self, params: &Value) -> Result<Value, WalletRpcError> {
        let requested = params
            .get(0)
            .and_then(|p| p.get("chainId"))
            .and_then(Value::as_str)
            .ok_or_else(|| WalletRpcError::new(WalletRpcError::INVALID_PARAMS, "Missing chainId"))?;
        let chain_id = ChainId::from_hex(requested).ok_or_else(|| {
            WalletRpcError::new(WalletRpcError::INVALID_PARAMS, format!("Invalid chainId '{}'", requested))
        })?;

        if !self.chains.contains_key(&chain_id.0) {
            return Err(WalletRpcError::unrecognized_chain(requested));
        }
        self.select_chain(chain_id.0);
        Ok(Value::Null)
    }

    fn add_chain(&self, params: &Value) -> Result<Value, WalletRpcError> {
        let descriptor: ChainDescriptor = params
            .get(0)
            .cloned()
            .ok_or_else(|| WalletRpcError::new(WalletRpcError::INVALID_PARAMS, "Missing chain descriptor"))
            .and_then(|p| {
                serde_json::from_value(p)
                    .map_err(|e| WalletRpcError::new(WalletRpcError::INVALID_PARAMS, e.to_string()))
            })?;
        let chain_id = ChainId::from_hex(&descriptor.chain_id).ok_or_else(|| {
            WalletRpcError::new(
                WalletRpcError::INVALID_PARAMS,
                format!("Invalid chainId '{}'", descriptor.chain_id),
            )
        })?;

        tracing::info!(chain_id = chain_id.0, name = %descriptor.chain_name, "Wallet added chain");
        self.chains.insert(chain_id.0, descriptor);
        // Wallets switch to a freshly added chain.
        self.select_chain(chain_id.0);
        Ok(Value::Null)
    }
}

#[async_trait]
impl InjectedWallet for LocalWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletRpcError> {
        tracing::debug!(method, "Wallet request");
        match method {
            "eth_requestAccounts" | "eth_accounts" => Ok(json!([self.address().to_string()])),
            "eth_chainId" => Ok(json!(ChainId(self.chain_id()).to_hex())),
            "wallet_switchEthereumChain" => self.switch_chain(&params),
            "wallet_addEthereumChain" => self.add_chain(&params),
            other => Err(WalletRpcError::new(
                WalletRpcError::UNSUPPORTED_METHOD,
                format!("Method '{}' is not supported", other),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;

    // Well-known test private key (Anvil's first account)
    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn localhost_chain() -> ChainDescriptor {
        NetworkConfig {
            chain_id: 31337,
            chain_name: "Anvil".to_string(),
            rpc_url: "http://localhost:8545".to_string(),
            ..NetworkConfig::default()
        }
        .descriptor()
    }

    #[test]
    fn test_wallet_from_private_key() {
        let wallet = LocalWallet::from_private_key(TEST_PRIVATE_KEY, localhost_chain()).unwrap();
        assert_eq!(
            wallet.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
        assert_eq!(wallet.chain_id(), 31337);
    }

    #[test]
    fn test_wallet_with_0x_prefix() {
        let wallet =
            LocalWallet::from_private_key(&format!("0x{}", TEST_PRIVATE_KEY), localhost_chain()).unwrap();
        assert_eq!(
            wallet.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_invalid_private_key() {
        let result = LocalWallet::from_private_key("invalid_key", localhost_chain());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid private key"));
    }

    #[tokio::test]
    async fn test_accounts_and_chain_id() {
        let wallet = LocalWallet::from_private_key(TEST_PRIVATE_KEY, localhost_chain()).unwrap();

        let accounts = wallet.request("eth_requestAccounts", json!([])).await.unwrap();
        let first: Address = accounts[0].as_str().unwrap().parse().unwrap();
        assert_eq!(first, wallet.address());

        let chain = wallet.request("eth_chainId", json!([])).await.unwrap();
        assert_eq!(chain, json!("0x7a69"));
    }

    #[tokio::test]
    async fn test_switch_to_unknown_chain_then_add() {
        let wallet = LocalWallet::from_private_key(TEST_PRIVATE_KEY, localhost_chain()).unwrap();
        let mut events = wallet.subscribe();
        let sepolia = NetworkConfig::default();

        let err = wallet
            .request("wallet_switchEthereumChain", json!([{ "chainId": sepolia.chain_id_hex() }]))
            .await
            .unwrap_err();
        assert_eq!(err.code, WalletRpcError::UNRECOGNIZED_CHAIN);

        wallet
            .request("wallet_addEthereumChain", json!([sepolia.descriptor()]))
            .await
            .unwrap();
        assert_eq!(wallet.chain_id(), 11155111);
        assert_eq!(events.recv().await.unwrap(), WalletEvent::ChainChanged(11155111));

        // Known now, so switching back and forth works.
        wallet
            .request("wallet_switchEthereumChain", json!([{ "chainId": "0x7a69" }]))
            .await
            .unwrap();
        assert_eq!(wallet.chain_id(), 31337);
    }

    #[tokio::test]
    async fn test_unsupported_method() {
        let wallet = LocalWallet::from_private_key(TEST_PRIVATE_KEY, localhost_chain()).unwrap();
        let err = wallet.request("eth_sign", json!([])).await.unwrap_err();
        assert_eq!(err.code, WalletRpcError::UNSUPPORTED_METHOD);
    }
}
