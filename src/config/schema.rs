//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from TOML, and every
//! section has defaults describing the Sepolia deployment of the Blue Carbon
//! contracts, so an empty file (or no file) is a valid configuration.

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};

use crate::blockchain::types::{ChainDescriptor, NativeCurrency};

/// Sepolia test network chain ID.
pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

/// Environment variable overriding `network.rpc_url`.
pub const RPC_URL_ENV_VAR: &str = "BLUE_CARBON_RPC_URL";

/// Deployed BlueCarbonCredit (ERC20) token.
pub const CARBON_CREDIT_ADDRESS: Address = address!("f8a2226C8f93c8552ff5DaCB839998C0E846E77c");

/// Deployed PlantationRegistry (ERC721) contract.
pub const PLANTATION_REGISTRY_ADDRESS: Address =
    address!("32109832c85438f1B4125149B322218bd2EA9CD3");

/// Deployer wallet, holder of the owner and admin roles.
pub const OWNER_ADDRESS: Address = address!("6fcD6344267F2D7C4D09914437A06ceF3Fc2E304");

/// Root configuration for the MRV client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MrvConfig {
    /// Network the wallet and RPC client talk to.
    pub network: NetworkConfig,

    /// Deployed contract addresses.
    pub contracts: ContractsConfig,

    /// Privileged wallet addresses.
    pub roles: RolesConfig,

    /// RPC client and confirmation tuning.
    pub blockchain: BlockchainConfig,

    /// Log replay windows and feed sizes.
    pub history: HistoryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl MrvConfig {
    /// Apply overrides taken from the process environment.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(RPC_URL_ENV_VAR) {
            let url = url.trim();
            if !url.is_empty() {
                self.network.rpc_url = url.to_string();
            }
        }
    }
}

/// Network descriptor, also used when asking a wallet to add the chain.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Chain ID (11155111 for Sepolia).
    pub chain_id: u64,

    /// Human readable chain name.
    pub chain_name: String,

    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs, used for reads only.
    pub failover_urls: Vec<String>,

    /// Block explorer base URL.
    pub explorer_url: String,

    /// Native currency name.
    pub currency_name: String,

    /// Native currency symbol.
    pub currency_symbol: String,

    /// Native currency decimals.
    pub currency_decimals: u8,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            chain_id: SEPOLIA_CHAIN_ID,
            chain_name: "Sepolia".to_string(),
            rpc_url: "https://sepolia.drpc.org".to_string(),
            failover_urls: Vec::new(),
            explorer_url: "https://sepolia.etherscan.io".to_string(),
            currency_name: "ETH".to_string(),
            currency_symbol: "ETH".to_string(),
            currency_decimals: 18,
        }
    }
}

impl NetworkConfig {
    /// Chain ID as the `0x`-prefixed hex string wallets expect.
    pub fn chain_id_hex(&self) -> String {
        format!("{:#x}", self.chain_id)
    }

    /// Descriptor sent with `wallet_addEthereumChain`.
    pub fn descriptor(&self) -> ChainDescriptor {
        ChainDescriptor {
            chain_id: self.chain_id_hex(),
            chain_name: self.chain_name.clone(),
            native_currency: NativeCurrency {
                name: self.currency_name.clone(),
                symbol: self.currency_symbol.clone(),
                decimals: self.currency_decimals,
            },
            rpc_urls: vec![self.rpc_url.clone()],
            block_explorer_urls: vec![self.explorer_url.clone()],
        }
    }

    /// Explorer link for a transaction hash.
    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), tx_hash)
    }

    /// Explorer link for an address.
    pub fn address_url(&self, address: &Address) -> String {
        format!("{}/address/{}", self.explorer_url.trim_end_matches('/'), address)
    }
}

/// Addresses of the three consumed contracts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContractsConfig {
    /// ERC20 carbon credit token.
    pub carbon_credit: Address,

    /// Plantation registry.
    pub plantation_registry: Address,

    /// MRV contract. The zero address marks it as not yet deployed.
    pub mrv: Address,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            carbon_credit: CARBON_CREDIT_ADDRESS,
            plantation_registry: PLANTATION_REGISTRY_ADDRESS,
            mrv: Address::ZERO,
        }
    }
}

/// Role holders recognised by the client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RolesConfig {
    /// Contract owner.
    pub owner: Address,

    /// Admin allowed to verify plantations.
    pub admin: Address,
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            owner: OWNER_ADDRESS,
            admin: OWNER_ADDRESS,
        }
    }
}

impl RolesConfig {
    /// Whether `account` is the owner or the admin.
    pub fn is_admin(&self, account: &Address) -> bool {
        *account == self.owner || *account == self.admin
    }
}

/// RPC client and transaction confirmation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Confirmations to wait for after a transaction is mined.
    pub confirmation_blocks: u32,

    /// Maximum time to wait for a transaction receipt, in seconds.
    pub confirmation_timeout_secs: u64,

    /// Receipt polling interval in milliseconds.
    pub confirmation_poll_ms: u64,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            rpc_timeout_secs: 10,
            confirmation_blocks: 1,
            confirmation_timeout_secs: 300,
            confirmation_poll_ms: 2000,
        }
    }
}

/// Log replay settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// How many recent blocks the transfer history scans.
    pub transfer_window_blocks: u64,

    /// Maximum number of transfers returned by the history.
    pub transaction_limit: usize,

    /// Maximum number of events kept by the live feed.
    pub feed_capacity: usize,

    /// Live feed polling interval in milliseconds.
    pub feed_poll_interval_ms: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            transfer_window_blocks: 1000,
            transaction_limit: 10,
            feed_capacity: 10,
            feed_poll_interval_ms: 4000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines instead of the human readable format.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
