//! Token endpoint client
//!
//! Room connects are authenticated by a short-lived token minted by the
//! application backend: `GET <token_url>` returns the token plus the display
//! identity the backend assigned to this visitor.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, Result};

/// Token endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrant {
    /// Opaque access token for the video service
    pub token: String,
    /// Display name assigned by the token service
    pub identity: String,
}

/// Source of connect tokens
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Fetch a fresh token; no retries, every failure is terminal for the
    /// join attempt that requested it
    async fn fetch_token(&self) -> Result<TokenGrant>;
}

/// HTTP client for the token endpoint
pub struct HttpTokenClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTokenClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for HttpTokenClient {
    async fn fetch_token(&self) -> Result<TokenGrant> {
        debug!(endpoint = %self.endpoint, "fetching connect token");
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| AppError::TokenFetch(format!("endpoint unreachable: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::TokenFetch(e.to_string()))?;

        response
            .json::<TokenGrant>()
            .await
            .map_err(|e| AppError::TokenFetch(format!("malformed response: {e}")))
    }
}

/// Fixed token for development and tests
pub struct StaticTokenProvider {
    grant: TokenGrant,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            grant: TokenGrant {
                token: token.into(),
                identity: identity.into(),
            },
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn fetch_token(&self) -> Result<TokenGrant> {
        Ok(self.grant.clone())
    }
}

/// A provider that always fails, for exercising the token error path
pub struct FailingTokenProvider;

#[async_trait]
impl TokenProvider for FailingTokenProvider {
    async fn fetch_token(&self) -> Result<TokenGrant> {
        Err(AppError::TokenFetch("endpoint unreachable".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_provider_returns_its_grant() {
        let provider = StaticTokenProvider::new("T", "alice");
        let grant = tokio_test::block_on(provider.fetch_token()).unwrap();
        assert_eq!(grant.token, "T");
        assert_eq!(grant.identity, "alice");
    }

    #[test]
    fn grant_deserializes_from_endpoint_json() {
        let grant: TokenGrant =
            serde_json::from_str(r#"{"token":"T","identity":"alice"}"#).unwrap();
        assert_eq!(grant.token, "T");
        assert_eq!(grant.identity, "alice");
    }
}
