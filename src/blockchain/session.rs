//! Wallet session: connection, signer and network management.
//!
//! One session is built at startup and shared as `Arc<WalletSession>`. The
//! cached [`Connection`] is only replaced by connect, disconnect, network
//! switches and wallet events.

use std::sync::Arc;

use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use arc_swap::ArcSwapOption;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainId, WalletRpcError};
use crate::blockchain::wallet::{InjectedWallet, WalletEvent};
use crate::config::{BlockchainConfig, NetworkConfig};
use crate::credits::format::format_ether;

/// An established wallet connection.
#[derive(Clone)]
pub struct Connection {
    /// Active account.
    pub account: Address,
    /// Chain the connection was made on.
    pub chain_id: u64,
    /// Read client for the configured network.
    pub client: BlockchainClient,
    /// Provider that signs with the wallet.
    pub signer: DynProvider,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("account", &self.account)
            .field("chain_id", &self.chain_id)
            .field("client", &self.client)
            .finish()
    }
}

/// Shared wallet/provider manager.
pub struct WalletSession {
    wallet: Option<Arc<dyn InjectedWallet>>,
    network: NetworkConfig,
    tuning: BlockchainConfig,
    connection: ArcSwapOption<Connection>,
    read_only: ArcSwapOption<BlockchainClient>,
}

impl WalletSession {
    /// Create a session. `wallet` is `None` when no wallet is installed.
    pub fn new(
        wallet: Option<Arc<dyn InjectedWallet>>,
        network: NetworkConfig,
        tuning: BlockchainConfig,
    ) -> Self {
        Self {
            wallet,
            network,
            tuning,
            connection: ArcSwapOption::empty(),
            read_only: ArcSwapOption::empty(),
        }
    }

    /// RPC and confirmation settings.
    pub fn tuning(&self) -> &BlockchainConfig {
        &self.tuning
    }

    /// Current connection, if any.
    pub fn connection(&self) -> Option<Arc<Connection>> {
        self.connection.load_full()
    }

    /// Connected account, if any.
    pub fn account(&self) -> Option<Address> {
        self.connection.load_full().map(|c| c.account)
    }

    pub fn is_connected(&self) -> bool {
        self.connection.load().is_some()
    }

    /// Request account access and build the provider and signer.
    ///
    /// Switches the wallet to the configured network when it is elsewhere.
    pub async fn connect(&self) -> BlockchainResult<Address> {
        let wallet = self.wallet.as_ref().ok_or(BlockchainError::NoWallet)?;

        let account = request_account(wallet.as_ref()).await?;

        let chain_id = wallet_chain_id(wallet.as_ref()).await?;
        if chain_id != self.network.chain_id {
            tracing::info!(
                wallet_chain = chain_id,
                expected = self.network.chain_id,
                "Wallet is on another network, requesting switch"
            );
            self.switch_network(self.network.chain_id).await?;
        }

        let connection = self.establish(wallet.as_ref(), account, self.network.chain_id)?;
        tracing::info!(
            account = %connection.account,
            chain_id = connection.chain_id,
            "Wallet connected"
        );
        Ok(account)
    }

    /// Return the connection, building it from the wallet if needed.
    ///
    /// A wallet on another network is refused with `ChainMismatch` rather
    /// than switched behind the user's back.
    pub async fn ensure_signer(&self) -> BlockchainResult<Arc<Connection>> {
        if let Some(connection) = self.connection.load_full() {
            return Ok(connection);
        }

        let wallet = self.wallet.as_ref().ok_or(BlockchainError::NoProvider)?;
        let account = request_account(wallet.as_ref()).await?;
        let chain_id = wallet_chain_id(wallet.as_ref()).await?;
        if chain_id != self.network.chain_id {
            tracing::warn!(
                wallet_chain = chain_id,
                expected = self.network.chain_id,
                "Refusing to sign on another network"
            );
            return Err(BlockchainError::ChainMismatch {
                expected: self.network.chain_id,
                actual: chain_id,
            });
        }
        self.establish(wallet.as_ref(), account, chain_id)
    }

    fn establish(
        &self,
        wallet: &dyn InjectedWallet,
        account: Address,
        chain_id: u64,
    ) -> BlockchainResult<Arc<Connection>> {
        let client = BlockchainClient::connect(&self.network, &self.tuning)?;
        let rpc_url: url::Url = self.network.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", self.network.rpc_url, e))
        })?;
        let signer = ProviderBuilder::new()
            .wallet(wallet.signing_wallet())
            .connect_http(rpc_url)
            .erased();

        let connection = Arc::new(Connection {
            account,
            chain_id,
            client,
            signer,
        });
        self.connection.store(Some(connection.clone()));
        Ok(connection)
    }

    /// Drop the cached connection.
    pub fn disconnect(&self) {
        if self.connection.swap(None).is_some() {
            tracing::info!("Wallet disconnected");
        }
    }

    /// Client for read calls: the connection's when connected, otherwise a
    /// read-only client for the configured network.
    pub fn read_client(&self) -> BlockchainResult<BlockchainClient> {
        if let Some(connection) = self.connection.load_full() {
            return Ok(connection.client.clone());
        }
        if let Some(client) = self.read_only.load_full() {
            return Ok(client.as_ref().clone());
        }

        let client = BlockchainClient::connect(&self.network, &self.tuning)?;
        self.read_only.store(Some(Arc::new(client.clone())));
        Ok(client)
    }

    /// Native currency balance as a decimal string; `"0"` on any failure.
    pub async fn get_balance(&self, address: Address) -> String {
        let client = match self.read_client() {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(error = %e, "No provider for balance query");
                return "0".to_string();
            }
        };

        match client.get_balance(address).await {
            Ok(wei) => format_ether(wei),
            Err(e) => {
                tracing::error!(address = %address, error = %e, "Failed to get native balance");
                "0".to_string()
            }
        }
    }

    /// Ask the wallet to switch to `target_chain_id`.
    ///
    /// An unrecognized chain is added with the configured network descriptor
    /// when the target is the configured network. Failures are returned.
    pub async fn switch_network(&self, target_chain_id: u64) -> BlockchainResult<()> {
        let wallet = self.wallet.as_ref().ok_or(BlockchainError::NoWallet)?;
        let chain_hex = ChainId(target_chain_id).to_hex();

        match wallet
            .request("wallet_switchEthereumChain", json!([{ "chainId": chain_hex }]))
            .await
        {
            Ok(_) => {}
            Err(e) if e.code == WalletRpcError::UNRECOGNIZED_CHAIN && target_chain_id == self.network.chain_id => {
                tracing::info!(chain_id = target_chain_id, "Chain unknown to wallet, requesting addition");
                wallet
                    .request("wallet_addEthereumChain", json!([self.network.descriptor()]))
                    .await?;
            }
            Err(e) => {
                tracing::error!(chain_id = target_chain_id, error = %e, "Failed to switch network");
                return Err(e.into());
            }
        }

        self.invalidate_if_chain_changed(target_chain_id);
        Ok(())
    }

    fn invalidate_if_chain_changed(&self, chain_id: u64) {
        let stale = self
            .connection
            .load_full()
            .is_some_and(|c| c.chain_id != chain_id);
        if stale {
            tracing::info!(chain_id, "Chain changed, dropping cached provider");
            self.connection.store(None);
        }
    }

    /// Apply a wallet event to the session.
    pub fn handle_wallet_event(&self, event: WalletEvent) {
        match event {
            WalletEvent::AccountsChanged(accounts) => match accounts.first() {
                None => self.disconnect(),
                Some(account) => {
                    let current = self.connection.load_full();
                    if let Some(connection) = current {
                        if connection.account != *account {
                            tracing::info!(account = %account, "Active account changed");
                            let mut updated = connection.as_ref().clone();
                            updated.account = *account;
                            self.connection.store(Some(Arc::new(updated)));
                        }
                    }
                }
            },
            WalletEvent::ChainChanged(chain_id) => self.invalidate_if_chain_changed(chain_id),
            WalletEvent::Disconnect => self.disconnect(),
        }
    }

    /// Follow wallet events until shutdown. Returns `None` without a wallet.
    pub fn spawn_event_listener(
        self: &Arc<Self>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Option<JoinHandle<()>> {
        let mut events = self.wallet.as_ref()?.subscribe();
        let session = Arc::clone(self);

        Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Ok(event) => session.handle_wallet_event(event),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Wallet event listener lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = shutdown.recv() => {
                        tracing::debug!("Wallet event listener received shutdown signal");
                        break;
                    }
                }
            }
        }))
    }
}

impl std::fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSession")
            .field("has_wallet", &self.wallet.is_some())
            .field("chain_id", &self.network.chain_id)
            .field("account", &self.account())
            .finish()
    }
}

/// Shorten an address for display: `0x1234...abcd`.
pub fn format_address(address: &Address) -> String {
    let full = address.to_string();
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

async fn request_account(wallet: &dyn InjectedWallet) -> BlockchainResult<Address> {
    let accounts = wallet.request("eth_requestAccounts", json!([])).await?;
    first_account(&accounts)
}

fn first_account(accounts: &Value) -> BlockchainResult<Address> {
    let first = accounts
        .as_array()
        .and_then(|list| list.first())
        .and_then(Value::as_str)
        .ok_or_else(|| BlockchainError::Wallet {
            code: WalletRpcError::UNAUTHORIZED,
            message: "Wallet returned no accounts".to_string(),
        })?;
    first.parse().map_err(|e| BlockchainError::Wallet {
        code: WalletRpcError::INVALID_PARAMS,
        message: format!("Invalid account '{}': {}", first, e),
    })
}

async fn wallet_chain_id(wallet: &dyn InjectedWallet) -> BlockchainResult<u64> {
    let value = wallet.request("eth_chainId", json!([])).await?;
    value
        .as_str()
        .and_then(ChainId::from_hex)
        .map(u64::from)
        .ok_or_else(|| BlockchainError::Wallet {
            code: WalletRpcError::INVALID_PARAMS,
            message: format!("Invalid chain ID response {}", value),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn test_format_address() {
        let addr = address!("6fcD6344267F2D7C4D09914437A06ceF3Fc2E304");
        assert_eq!(format_address(&addr), "0x6fcD...E304");
    }

    #[test]
    fn test_first_account_parsing() {
        let accounts = json!(["0x6fcD6344267F2D7C4D09914437A06ceF3Fc2E304"]);
        assert_eq!(
            first_account(&accounts).unwrap(),
            address!("6fcD6344267F2D7C4D09914437A06ceF3Fc2E304")
        );
        assert!(first_account(&json!([])).is_err());
    }

    #[tokio::test]
    async fn test_no_wallet() {
        let session = WalletSession::new(None, NetworkConfig::default(), BlockchainConfig::default());
        assert!(matches!(session.connect().await, Err(BlockchainError::NoWallet)));
        assert!(matches!(session.ensure_signer().await, Err(BlockchainError::NoProvider)));
        assert!(matches!(session.switch_network(1).await, Err(BlockchainError::NoWallet)));
        assert!(!session.is_connected());
    }

    #[test]
    fn test_read_client_without_wallet() {
        let session = WalletSession::new(None, NetworkConfig::default(), BlockchainConfig::default());
        let client = session.read_client().unwrap();
        assert_eq!(client.chain_id(), 11155111);
    }
}
