//! Blue Carbon MRV client library.
//!
//! Contract-interaction layer for the Blue Carbon MRV platform: a wallet
//! session, a contract service over the credit token, plantation registry
//! and MRV contracts, and history reconstruction from event logs.
//!
//! # Architecture Overview
//!
//! ```text
//!   CLI command ──▶ AppContext ──▶ ContractService ──▶ ContractGateway ──▶ RPC node
//!                       │                                    │
//!                       ▼                                    ▼
//!                 WalletSession ◀──────────────── signer / read client
//!                       │
//!                       ▼
//!                 InjectedWallet (EIP-1193)
//!
//!   FeedMonitor ──▶ registry + token logs ──▶ EventFeed / PlantationIndex
//! ```

// Chain access
pub mod blockchain;
pub mod contracts;

// Domain logic
pub mod credits;
pub mod history;

// Cross-cutting concerns
pub mod config;
pub mod context;
pub mod lifecycle;
pub mod observability;

pub use config::MrvConfig;
pub use context::AppContext;
pub use contracts::ContractService;
pub use lifecycle::Shutdown;
