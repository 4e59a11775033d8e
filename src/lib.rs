pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod models;
pub mod query;
pub mod view;

use config::Config;
use std::sync::Arc;

use crate::api::{ApiClient, ClientError};
use crate::auth::{AuthStore, FileTokenStore, TokenStore};
use crate::query::{EventStore, QueryCache};

pub struct AppState {
    pub config: Config,
    pub auth: Arc<AuthStore>,
    pub api: ApiClient,
    pub queries: Arc<QueryCache>,
    pub events: EventStore,
}

impl AppState {
    /// Restore the session from the configured data directory and wire the
    /// client, cache and event store around it.
    pub fn new(config: Config) -> Result<Self, ClientError> {
        let storage: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(&config.session.data_dir));
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: Config, storage: Arc<dyn TokenStore>) -> Result<Self, ClientError> {
        let auth = Arc::new(AuthStore::initialize(storage));
        let api = ApiClient::new(&config.api, auth.clone())?;
        let queries = Arc::new(QueryCache::new(&config.cache));
        let events = EventStore::new(Arc::new(api.clone()), queries.clone(), auth.clone());

        Ok(Self {
            config,
            auth,
            api,
            queries,
            events,
        })
    }
}
