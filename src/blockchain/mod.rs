//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Injected wallet (accounts, chain switching, signing)
//!     → session.rs (connection, signer provider, network switching)
//!     → client.rs (RPC reads with timeouts and failover)
//!     → transaction.rs (receipt polling and confirmation)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod session;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::BlockchainClient;
pub use session::{format_address, Connection, WalletSession};
pub use transaction::Confirmer;
pub use types::{BlockRange, BlockchainError, BlockchainResult, ChainId, TxOutcome, WalletRpcError};
pub use wallet::{InjectedWallet, LocalWallet, WalletEvent};
