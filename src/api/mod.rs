use std::sync::Arc;

pub mod autoswap;
pub mod config;
pub mod history;

use crate::limits::LimitTracker;
use crate::notify::HistoryStore;
use crate::orchestrator::Orchestrator;
use crate::providers::ChainProvider;
use crate::rules::RuleStore;

#[derive(Clone)]
pub struct AppState {
    pub rules: Arc<RuleStore>,
    pub history: Arc<HistoryStore>,
    pub limits: Arc<LimitTracker>,
    pub orchestrator: Arc<Orchestrator>,
    pub provider: Arc<dyn ChainProvider>,
}

impl AppState {
    pub fn new(
        rules: Arc<RuleStore>,
        history: Arc<HistoryStore>,
        limits: Arc<LimitTracker>,
        orchestrator: Arc<Orchestrator>,
        provider: Arc<dyn ChainProvider>
    ) -> Self {
        Self {
            rules,
            history,
            limits,
            orchestrator,
            provider,
        }
    }

    /// Reject malformed wallet addresses before touching storage.
    pub fn check_wallet(&self, wallet: &str) -> crate::error::Result<()> {
        if self.provider.validate_address(wallet) {
            Ok(())
        } else {
            Err(crate::error::AppError::InvalidAddress)
        }
    }
}
