//! Who may talk to the relay surface, and who may run which command.

mod policy;
mod relay;

pub use policy::*;
pub use relay::*;

use std::sync::Arc;

use thiserror::Error;

use crate::config::{AccessConfig, RelayAuthMethod, RelayConfig};

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Factory function to create the relay authenticator from config
pub fn create_relay_authenticator(
    config: &RelayConfig,
) -> Result<Arc<dyn RelayAuthenticator>, AccessError> {
    match config.method {
        RelayAuthMethod::None => Ok(Arc::new(NoRelayAuth::new())),
        RelayAuthMethod::SharedSecret => {
            let secret = config
                .secret
                .clone()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    AccessError::ConfigurationError(
                        "secret must be set when using shared_secret relay auth".to_string(),
                    )
                })?;
            Ok(Arc::new(SharedSecretAuthenticator::new(secret)))
        }
    }
}

/// Factory function to create the command access policy from config
pub fn create_access_policy(config: &AccessConfig) -> Arc<dyn AccessPolicy> {
    match config.staff_role_id {
        Some(role) => Arc::new(StaffRolePolicy::new(role)),
        None => Arc::new(OpenPolicy),
    }
}
