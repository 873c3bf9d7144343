//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse, env overrides)
//!     → validation.rs (semantic checks)
//!     → MrvConfig (validated, immutable)
//!     → shared via Arc through the AppContext
//! ```
//!
//! # Design Decisions
//! - All fields have defaults; the defaults are the Sepolia deployment
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    BlockchainConfig, ContractsConfig, HistoryConfig, MrvConfig, NetworkConfig,
    ObservabilityConfig, RolesConfig,
};
