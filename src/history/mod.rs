//! History reconstruction from contract event logs.
//!
//! # Data Flow
//! ```text
//! ContractGateway logs
//!     → events.rs (classification into application events)
//!     → plantations.rs (registry replay, incremental index)
//!     → transactions.rs (per-account transfer history)
//!     → feed.rs (polling monitor, bounded recent-events list)
//! ```

pub mod events;
pub mod feed;
pub mod plantations;
pub mod transactions;

pub use events::{classify_log, ChainEvent, EventData, EventSummary};
pub use feed::{EventFeed, FeedMonitor};
pub use plantations::{get_all_plantations, get_unverified_plantations, PlantationIndex};
pub use transactions::{recent_transactions, time_ago, TransactionRecord, TransferDirection};
