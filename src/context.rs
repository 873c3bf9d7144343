//! Application context shared by every command.

use std::sync::Arc;

use alloy::primitives::Address;
use tokio::task::JoinHandle;

use crate::blockchain::{InjectedWallet, WalletSession};
use crate::config::MrvConfig;
use crate::contracts::{AlloyGateway, ContractGateway, ContractService};
use crate::history::{EventFeed, FeedMonitor, PlantationIndex};
use crate::lifecycle::Shutdown;

/// Everything a command needs, built once at startup.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Arc<MrvConfig>,
    pub session: Arc<WalletSession>,
    pub contracts: ContractService,
    pub feed: Arc<EventFeed>,
    pub index: Arc<PlantationIndex>,
    pub shutdown: Arc<Shutdown>,
}

impl AppContext {
    /// Build a context whose contract calls go through the session's providers.
    pub fn new(config: MrvConfig, wallet: Option<Arc<dyn InjectedWallet>>) -> Self {
        let session = Arc::new(WalletSession::new(
            wallet,
            config.network.clone(),
            config.blockchain.clone(),
        ));
        let gateway = Arc::new(AlloyGateway::new(session.clone(), config.contracts.clone()));
        Self::with_gateway(config, session, gateway)
    }

    /// Build a context around an existing gateway.
    pub fn with_gateway(config: MrvConfig, session: Arc<WalletSession>, gateway: Arc<dyn ContractGateway>) -> Self {
        let feed = Arc::new(EventFeed::new(config.history.feed_capacity));
        Self {
            config: Arc::new(config),
            session,
            contracts: ContractService::new(gateway),
            feed,
            index: Arc::new(PlantationIndex::new()),
            shutdown: Arc::new(Shutdown::new()),
        }
    }

    /// Whether `account` holds the owner or admin role.
    pub fn is_admin(&self, account: &Address) -> bool {
        self.config.roles.is_admin(account)
    }

    /// Follow wallet events until shutdown.
    pub fn spawn_wallet_listener(&self) -> Option<JoinHandle<()>> {
        self.session.spawn_event_listener(self.shutdown.subscribe())
    }

    /// A feed monitor writing into this context's feed and index.
    pub fn feed_monitor(&self) -> FeedMonitor {
        FeedMonitor::new(self.contracts.gateway().clone(), self.feed.clone(), &self.config.history)
            .with_index(self.index.clone())
    }
}
