use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::config::NetworkConfig;
use crate::domain::DomainError;
use crate::ports::HttpClient;

/// Outbound HTTP gate for the script generator.
///
/// In local-only mode every request is refused. Otherwise only hosts in the
/// allow list (or their subdomains) may be contacted. URLs are logged by host
/// only.
pub struct NetworkGuard {
    client: Client,
    local_only: bool,
    allowed_domains: Vec<String>,
}

impl NetworkGuard {
    pub fn new(config: &NetworkConfig) -> Result<Self, DomainError> {
        Self::with_policy(config.local_only, config.allowed_domains.clone())
    }

    fn with_policy(local_only: bool, allowed_domains: Vec<String>) -> Result<Self, DomainError> {
        let client = Client::builder()
            .use_rustls_tls()
            .user_agent(format!("CamTune/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DomainError::HttpRequest(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            local_only = local_only,
            allowed_domains = ?allowed_domains,
            "NetworkGuard initialized"
        );

        Ok(Self {
            client,
            local_only,
            allowed_domains,
        })
    }

    /// Check if a URL is allowed based on current settings.
    fn check_url(&self, url: &str) -> Result<(), DomainError> {
        if self.local_only {
            warn!("Network request blocked: local-only mode enabled");
            return Err(DomainError::NetworkBlocked {
                reason: "Local-only mode is enabled. All network requests are blocked.".to_string(),
            });
        }

        let parsed = Url::parse(url).map_err(|e| DomainError::HttpRequest(e.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| DomainError::HttpRequest("Invalid URL: no host".to_string()))?;

        let allowed = self
            .allowed_domains
            .iter()
            .any(|d| host == d || host.ends_with(&format!(".{}", d)));
        if !allowed {
            warn!(host = host, "Network request blocked: domain not in allow list");
            return Err(DomainError::NetworkBlocked {
                reason: format!("Domain '{}' is not in the allowed list", host),
            });
        }

        debug!(host = host, "Network request allowed");
        Ok(())
    }
}

#[async_trait]
impl HttpClient for NetworkGuard {
    async fn post_json<T: Serialize + Send + Sync, R: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &T,
    ) -> Result<R, DomainError> {
        self.check_url(url)?;

        let mut request = self.client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DomainError::HttpRequest(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DomainError::HttpRequest(format!(
                "HTTP {}: {}",
                status,
                detail.trim()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| DomainError::HttpRequest(e.without_url().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_only_blocks_requests() {
        let guard = NetworkGuard::with_policy(true, vec!["example.com".to_string()]).unwrap();
        assert!(guard.check_url("https://example.com/api").is_err());
    }

    #[test]
    fn test_default_policy_allows_generation_endpoint() {
        let guard = NetworkGuard::new(&NetworkConfig::default()).unwrap();
        assert!(guard
            .check_url("https://generativelanguage.googleapis.com/v1beta/models/m:generateContent")
            .is_ok());
    }

    #[test]
    fn test_disallowed_domain_blocked() {
        let guard = NetworkGuard::with_policy(false, vec!["googleapis.com".to_string()]).unwrap();
        assert!(matches!(
            guard.check_url("https://evil.example/steal"),
            Err(DomainError::NetworkBlocked { .. })
        ));
        assert!(guard.check_url("https://generativelanguage.googleapis.com/x").is_ok());
    }
}
