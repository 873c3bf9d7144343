//! Chain-specific types and error definitions.

use alloy::primitives::{TxHash, U256};
use alloy::rpc::types::{Log, TransactionReceipt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

impl ChainId {
    /// Parse a `0x`-prefixed hex chain ID as returned by `eth_chainId`.
    pub fn from_hex(value: &str) -> Option<Self> {
        let digits = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X"))?;
        u64::from_str_radix(digits, 16).ok().map(Self)
    }

    /// Render as `0x`-prefixed hex.
    pub fn to_hex(self) -> String {
        format!("{:#x}", self.0)
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// No injected wallet is available.
    #[error("No wallet found. Install or configure a wallet first.")]
    NoWallet,

    /// The user dismissed the wallet prompt.
    #[error("User rejected the request")]
    UserRejected,

    /// A signer was requested but no wallet ever connected.
    #[error("No provider. Connect wallet first.")]
    NoProvider,

    /// Any other error returned by the wallet.
    #[error("Wallet error {code}: {message}")]
    Wallet { code: i64, message: String },

    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Transaction was not mined within the configured time.
    #[error("Transaction {0} not confirmed after {1} seconds")]
    ConfirmationTimeout(TxHash, u64),

    /// Transaction was reverted on-chain.
    #[error("Transaction reverted: {0}")]
    Reverted(String),

    /// Contract call could not be built, sent or decoded.
    #[error("Contract call failed: {0}")]
    Contract(String),

    /// A transaction succeeded but the expected event is missing.
    #[error("Event {0} not found in transaction receipt")]
    EventNotFound(&'static str),

    /// The contract address is the zero placeholder.
    #[error("{0} contract is not deployed")]
    NotDeployed(&'static str),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// A decimal token amount could not be parsed.
    #[error("Invalid amount '{0}'")]
    InvalidAmount(String),
}

impl From<WalletRpcError> for BlockchainError {
    fn from(err: WalletRpcError) -> Self {
        match err.code {
            WalletRpcError::USER_REJECTED => BlockchainError::UserRejected,
            code => BlockchainError::Wallet {
                code,
                message: err.message,
            },
        }
    }
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// EIP-1193 provider error.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message} (code {code})")]
pub struct WalletRpcError {
    pub code: i64,
    pub message: String,
}

impl WalletRpcError {
    pub const USER_REJECTED: i64 = 4001;
    pub const UNAUTHORIZED: i64 = 4100;
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
    pub const INVALID_PARAMS: i64 = -32602;

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn user_rejected() -> Self {
        Self::new(Self::USER_REJECTED, "User rejected the request")
    }

    pub fn unrecognized_chain(chain_id: &str) -> Self {
        Self::new(
            Self::UNRECOGNIZED_CHAIN,
            format!("Unrecognized chain ID \"{}\"", chain_id),
        )
    }
}

/// Native currency block of a chain descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// `wallet_addEthereumChain` parameter object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDescriptor {
    pub chain_id: String,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

/// Transaction confirmation status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    /// Transaction is pending in mempool.
    Pending,
    /// Transaction has been mined but not enough confirmations.
    Confirming { current: u32, required: u32 },
    /// Transaction is confirmed with required block depth.
    Confirmed { block_number: u64 },
    /// Transaction failed or was dropped.
    Failed(String),
}

/// Result of a mined and confirmed transaction.
#[derive(Debug, Clone, Default)]
pub struct TxOutcome {
    /// Transaction hash.
    pub tx_hash: TxHash,
    /// Block the transaction was included in.
    pub block_number: u64,
    /// Logs emitted by the transaction.
    pub logs: Vec<Log>,
}

impl TxOutcome {
    pub fn from_receipt(receipt: &TransactionReceipt) -> Self {
        Self {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number.unwrap_or_default(),
            logs: receipt.inner.logs().to_vec(),
        }
    }
}

/// Inclusive block range for log queries. `to: None` means latest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub from: u64,
    pub to: Option<u64>,
}

impl BlockRange {
    /// Genesis to latest.
    pub fn full() -> Self {
        Self { from: 0, to: None }
    }

    /// `from..=to`.
    pub fn between(from: u64, to: u64) -> Self {
        Self { from, to: Some(to) }
    }

    /// The last `window` blocks up to and including `latest`.
    pub fn trailing(latest: u64, window: u64) -> Self {
        Self::between(latest.saturating_sub(window), latest)
    }
}

/// Wei per whole token for 18-decimal tokens.
pub fn one_token() -> U256 {
    U256::from(10u64).pow(U256::from(18u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_conversion() {
        let chain_id = ChainId::from(11155111u64);
        assert_eq!(u64::from(chain_id), 11155111);
        assert_eq!(chain_id.to_hex(), "0xaa36a7");
        assert_eq!(ChainId::from_hex("0xaa36a7"), Some(chain_id));
        assert_eq!(ChainId::from_hex("aa36a7"), None);
    }

    #[test]
    fn test_wallet_error_mapping() {
        let err: BlockchainError = WalletRpcError::user_rejected().into();
        assert!(matches!(err, BlockchainError::UserRejected));

        let err: BlockchainError = WalletRpcError::unrecognized_chain("0x1").into();
        assert!(matches!(err, BlockchainError::Wallet { code: 4902, .. }));
    }

    #[test]
    fn test_error_display() {
        let err = BlockchainError::Timeout(10);
        assert_eq!(err.to_string(), "RPC timeout after 10 seconds");

        let err = BlockchainError::NotDeployed("MRV");
        assert_eq!(err.to_string(), "MRV contract is not deployed");
    }

    #[test]
    fn test_trailing_range_saturates() {
        assert_eq!(BlockRange::trailing(5000, 1000), BlockRange::between(4000, 5000));
        assert_eq!(BlockRange::trailing(10, 1000), BlockRange::between(0, 10));
    }
}
