//! Startup orchestration.
//!
//! Configuration first, then logging, then the wallet, then the context.
//! Any error here is fatal to the caller.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::blockchain::{BlockchainError, InjectedWallet, LocalWallet};
use crate::config::{load_or_default, ConfigError};
use crate::context::AppContext;
use crate::observability::logging;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] BlockchainError),
}

/// Load configuration, initialize logging and build the application context.
///
/// The local wallet is loaded from the environment; without a key the
/// context still serves read-only operations.
pub fn bootstrap(config_path: Option<&Path>) -> Result<AppContext, StartupError> {
    let config = load_or_default(config_path)?;
    logging::init(&config.observability);

    tracing::info!(
        chain_id = config.network.chain_id,
        rpc_url = %config.network.rpc_url,
        carbon_credit = %config.contracts.carbon_credit,
        plantation_registry = %config.contracts.plantation_registry,
        mrv = %config.contracts.mrv,
        "Configuration loaded"
    );

    let wallet: Option<Arc<dyn InjectedWallet>> = match LocalWallet::from_env(config.network.descriptor())? {
        Some(wallet) => Some(Arc::new(wallet)),
        None => {
            tracing::info!("No wallet key configured, running read-only");
            None
        }
    };

    let context = AppContext::new(config, wallet);
    context.spawn_wallet_listener();
    Ok(context)
}
