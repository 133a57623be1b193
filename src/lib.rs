pub mod adapters;
pub mod domain;
pub mod infra;
pub mod services;

use std::sync::Arc;

use {domain::store::SettlementStore, services::signature::ReplayCache};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SettlementStore>,
    pub replay_cache: Arc<dyn ReplayCache>,
    pub webhook_secret: Arc<str>,
}
