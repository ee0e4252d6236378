use std::collections::HashMap;

use async_trait::async_trait;

use super::AccessError;

/// Header alternative to `Authorization: Bearer`.
pub const RELAY_SECRET_HEADER: &str = "x-relay-secret";

/// Request information available for relay authentication
#[derive(Debug, Clone, Default)]
pub struct RelayRequest {
    /// Header names are lowercase.
    pub headers: HashMap<String, String>,
}

/// Authenticates the gateway that relays platform events.
#[async_trait]
pub trait RelayAuthenticator: Send + Sync {
    async fn authenticate(&self, request: &RelayRequest) -> Result<(), AccessError>;

    fn method_name(&self) -> &'static str;
}

/// Accepts every request. Only for relays reachable from trusted hosts.
#[derive(Debug, Default)]
pub struct NoRelayAuth;

impl NoRelayAuth {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RelayAuthenticator for NoRelayAuth {
    async fn authenticate(&self, _request: &RelayRequest) -> Result<(), AccessError> {
        Ok(())
    }

    fn method_name(&self) -> &'static str {
        "none"
    }
}

/// Requires the shared secret via `Authorization: Bearer` or `X-Relay-Secret`.
pub struct SharedSecretAuthenticator {
    secret: String,
}

impl SharedSecretAuthenticator {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    fn presented<'a>(request: &'a RelayRequest) -> Option<&'a str> {
        if let Some(value) = request.headers.get("authorization") {
            let mut parts = value.splitn(2, ' ');
            if let (Some(scheme), Some(token)) = (parts.next(), parts.next()) {
                if scheme.eq_ignore_ascii_case("bearer") {
                    return Some(token.trim());
                }
            }
        }
        request
            .headers
            .get(RELAY_SECRET_HEADER)
            .map(|v| v.trim())
    }
}

#[async_trait]
impl RelayAuthenticator for SharedSecretAuthenticator {
    async fn authenticate(&self, request: &RelayRequest) -> Result<(), AccessError> {
        let presented = Self::presented(request).ok_or(AccessError::NotAuthenticated)?;

        if constant_time_eq(presented.as_bytes(), self.secret.as_bytes()) {
            Ok(())
        } else {
            Err(AccessError::InvalidCredentials(
                "Invalid relay secret".to_string(),
            ))
        }
    }

    fn method_name(&self) -> &'static str {
        "shared_secret"
    }
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
