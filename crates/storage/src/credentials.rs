//! Temporary S3 credentials per data provider.
//!
//! Each provider exposes an `s3credentials` endpoint that hands out
//! short-lived keys for its buckets. Keys are fetched once per provider and
//! reused for the life of the process; a failed fetch yields
//! [`ProviderCredential::Unavailable`] and is retried on the next request.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::CredentialConfig;
use crate::error::{StorageError, StorageResult};
use crate::memo::{CacheStats, SingleFlightCache};

/// Keys returned by a provider's credential endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporaryCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    /// Informational only; nothing refreshes on expiry.
    #[serde(default)]
    pub expiration: Option<String>,
}

impl fmt::Debug for TemporaryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporaryCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Result of a credential lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCredential {
    Available(TemporaryCredentials),
    Unavailable,
}

impl ProviderCredential {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn credentials(&self) -> Option<&TemporaryCredentials> {
        match self {
            Self::Available(creds) => Some(creds),
            Self::Unavailable => None,
        }
    }
}

/// Memoized credential fetcher.
pub struct CredentialCache {
    client: Client,
    config: CredentialConfig,
    memo: SingleFlightCache<String, TemporaryCredentials>,
    had_errors: AtomicBool,
}

impl CredentialCache {
    pub fn new(config: CredentialConfig, capacity: usize) -> StorageResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| StorageError::Credentials(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, config, capacity))
    }

    pub fn with_client(client: Client, config: CredentialConfig, capacity: usize) -> Self {
        Self {
            client,
            config,
            memo: SingleFlightCache::new(capacity),
            had_errors: AtomicBool::new(false),
        }
    }

    /// Credentials for `provider`, fetched at most once while they succeed.
    ///
    /// Never fails: any problem is logged and reported as `Unavailable`.
    #[instrument(skip(self))]
    pub async fn credentials_for(&self, provider: &str) -> ProviderCredential {
        let result = self
            .memo
            .get_or_try_load(provider.to_string(), || self.fetch(provider))
            .await;

        match result {
            Ok(creds) => ProviderCredential::Available(creds),
            Err(e) => {
                warn!(provider, error = %e, "Credentials unavailable");
                self.had_errors.store(true, Ordering::Relaxed);
                ProviderCredential::Unavailable
            }
        }
    }

    /// Whether any credential request has failed so far.
    pub fn had_errors(&self) -> bool {
        self.had_errors.load(Ordering::Relaxed)
    }

    pub async fn stats(&self) -> CacheStats {
        self.memo.stats().await
    }

    async fn fetch(&self, provider: &str) -> StorageResult<TemporaryCredentials> {
        let endpoint = self
            .config
            .endpoints
            .endpoint(provider)
            .ok_or_else(|| StorageError::UnknownProvider(provider.to_string()))?;

        debug!(provider, endpoint, "Requesting temporary credentials");
        let mut request = self.client.get(endpoint);
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::Credentials(format!("{}: {}", endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Credentials(format!(
                "{} returned HTTP {}",
                endpoint,
                status.as_u16()
            )));
        }

        let creds: TemporaryCredentials = response
            .json()
            .await
            .map_err(|e| StorageError::Credentials(format!("{}: bad response body: {}", endpoint, e)))?;

        info!(provider, expiration = ?creds.expiration, "Obtained temporary credentials");
        Ok(creds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderEndpoints;

    #[test]
    fn test_credentials_deserialize() {
        let json = r#"{
            "accessKeyId": "AKIA",
            "secretAccessKey": "secret",
            "sessionToken": "token",
            "expiration": "2023-01-01 01:00:00+00:00"
        }"#;
        let creds: TemporaryCredentials = serde_json::from_str(json).unwrap();
        assert_eq!(creds.access_key_id, "AKIA");
        assert_eq!(creds.expiration.as_deref(), Some("2023-01-01 01:00:00+00:00"));

        let without_expiry = r#"{"accessKeyId": "a", "secretAccessKey": "b", "sessionToken": "c"}"#;
        let creds: TemporaryCredentials = serde_json::from_str(without_expiry).unwrap();
        assert!(creds.expiration.is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = TemporaryCredentials {
            access_key_id: "AKIA".to_string(),
            secret_access_key: "very-secret".to_string(),
            session_token: "very-token".to_string(),
            expiration: None,
        };
        let printed = format!("{:?}", creds);
        assert!(printed.contains("AKIA"));
        assert!(!printed.contains("very-secret"));
        assert!(!printed.contains("very-token"));
    }

    #[tokio::test]
    async fn test_unknown_provider_is_unavailable() {
        let config = CredentialConfig::default().with_endpoints(ProviderEndpoints::empty());
        let cache = CredentialCache::new(config, 4).unwrap();

        assert!(!cache.had_errors());
        assert_eq!(cache.credentials_for("NOPE").await, ProviderCredential::Unavailable);
        assert!(cache.had_errors());
    }
}
