use std::sync::Arc;

use curator_core::{Cataloger, Config, RelayAuthenticator, SanitizedConfig, Store};

/// Shared application state
pub struct AppState {
    config: Config,
    relay: Arc<dyn RelayAuthenticator>,
    cataloger: Arc<Cataloger>,
}

impl AppState {
    pub fn new(
        config: Config,
        relay: Arc<dyn RelayAuthenticator>,
        cataloger: Arc<Cataloger>,
    ) -> Self {
        Self {
            config,
            relay,
            cataloger,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn relay(&self) -> &dyn RelayAuthenticator {
        self.relay.as_ref()
    }

    pub fn cataloger(&self) -> &Arc<Cataloger> {
        &self.cataloger
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        self.cataloger.store()
    }
}
