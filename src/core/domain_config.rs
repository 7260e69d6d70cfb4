//! 後端的自訂網域設定 API：寫入網域、重建客戶連結、移除網域。

use crate::core::validator::DEFAULT_EXPECTED_IP;
use crate::domain::model::{DomainValidationState, ValidationStatus};
use crate::utils::error::{CrmError, Result};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct DomainConfig {
    pub forms_domain: Option<String>,
    #[serde(default)]
    pub forms_domain_verified: bool,
    #[serde(default)]
    pub forms_domain_configured: bool,
    pub forms_domain_added_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct ConfigureResponse {
    #[serde(default)]
    pub success: bool,
    pub message: Option<String>,
    pub domain: Option<String>,
    pub configured_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct LinkStats {
    pub total_count: u64,
    pub success_count: u64,
    pub fail_count: u64,
}

#[derive(Debug, Deserialize)]
struct RegenerateResponse {
    stats: LinkStats,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

pub struct DomainConfigClient {
    client: Client,
    base_url: String,
    token: String,
    expected_ip: String,
}

impl DomainConfigClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(CrmError::MissingConfigError {
                field: "api.token".to_string(),
            });
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            expected_ip: DEFAULT_EXPECTED_IP.to_string(),
        })
    }

    /// SSL 失敗的提示訊息會帶上這個 IP
    pub fn with_expected_ip(mut self, expected_ip: impl Into<String>) -> Self {
        self.expected_ip = expected_ip.into();
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Token {}", self.token))
            .header("Content-Type", "application/json")
    }

    pub async fn fetch_config(&self) -> Result<DomainConfig> {
        let response = self.request(Method::GET, "/api/domains/").send().await?;
        let response = self.ensure_success(response, "Failed to load domain settings").await?;
        Ok(response.json().await?)
    }

    /// 只有 DNS 已驗證的網域才會送到後端
    pub async fn configure(&self, state: &DomainValidationState) -> Result<ConfigureResponse> {
        if state.status != ValidationStatus::Verified {
            return Err(CrmError::DomainNotVerified);
        }

        tracing::info!("🌐 Configuring forms domain {}", state.subdomain);
        let response = self
            .request(Method::POST, "/api/domains/configure/")
            .json(&serde_json::json!({ "forms_domain": state.subdomain }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            let raw = body
                .error
                .unwrap_or_else(|| "Failed to configure domain".to_string());
            tracing::error!("❌ Domain configuration failed ({}): {}", status, raw);
            return Err(CrmError::BackendError {
                status: status.as_u16(),
                message: self.friendly_configure_error(&raw),
            });
        }

        let configured: ConfigureResponse = response.json().await?;
        tracing::info!("✅ Domain {} configured", state.subdomain);
        Ok(configured)
    }

    fn friendly_configure_error(&self, raw: &str) -> String {
        if raw.contains("already in use") {
            "This domain is already taken by another account".to_string()
        } else if raw.contains("SSL certificate generation failed") {
            format!(
                "SSL setup failed. Please verify your DNS is pointing to {}",
                self.expected_ip
            )
        } else if raw.contains("Invalid domain format") {
            "Invalid domain format. Use format: subdomain.domain.com".to_string()
        } else {
            raw.to_string()
        }
    }

    pub async fn regenerate_links(&self) -> Result<LinkStats> {
        let response = self
            .request(Method::POST, "/api/domains/regenerate-links/")
            .send()
            .await?;
        let response = self
            .ensure_success(response, "Failed to regenerate client links")
            .await?;
        let body: RegenerateResponse = response.json().await?;
        tracing::info!(
            "🔗 Regenerated {}/{} client links ({} failed)",
            body.stats.success_count,
            body.stats.total_count,
            body.stats.fail_count
        );
        Ok(body.stats)
    }

    pub async fn remove_domain(&self) -> Result<()> {
        let response = self
            .request(Method::DELETE, "/api/domains/delete/")
            .send()
            .await?;
        self.ensure_success(response, "Failed to remove domain").await?;
        tracing::info!("🗑️ Custom domain removed, reverted to default domain");
        Ok(())
    }

    async fn ensure_success(&self, response: Response, fallback: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body: ErrorBody = response.json().await.unwrap_or_default();
        Err(CrmError::BackendError {
            status: status.as_u16(),
            message: body.error.unwrap_or_else(|| fallback.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(server: &MockServer) -> DomainConfigClient {
        DomainConfigClient::new(&server.base_url(), "secret", Duration::from_secs(2)).unwrap()
    }

    fn verified() -> DomainValidationState {
        DomainValidationState {
            subdomain: "check.gym.com".to_string(),
            status: ValidationStatus::Verified,
            attempts: 1,
            verified_ip: Some("13.51.251.199".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_token_is_config_error() {
        let err = DomainConfigClient::new("http://localhost", " ", Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, CrmError::MissingConfigError { .. }));
    }

    #[tokio::test]
    async fn test_fetch_config() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/domains/")
                .header("Authorization", "Token secret");
            then.status(200).json_body(serde_json::json!({
                "forms_domain": "check.gym.com",
                "forms_domain_verified": true,
                "forms_domain_configured": false,
                "forms_domain_added_at": null
            }));
        });

        let config = client(&server).fetch_config().await.unwrap();

        api_mock.assert();
        assert_eq!(config.forms_domain.as_deref(), Some("check.gym.com"));
        assert!(config.forms_domain_verified);
        assert!(!config.forms_domain_configured);
    }

    #[tokio::test]
    async fn test_configure_requires_verified_state() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path("/api/domains/configure/");
            then.status(200);
        });

        let mut state = verified();
        state.status = ValidationStatus::Failed;
        let err = client(&server).configure(&state).await.unwrap_err();

        assert!(matches!(err, CrmError::DomainNotVerified));
        api_mock.assert_hits(0);
    }

    #[tokio::test]
    async fn test_configure_sends_forms_domain() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/domains/configure/")
                .header("Authorization", "Token secret")
                .json_body(serde_json::json!({"forms_domain": "check.gym.com"}));
            then.status(200).json_body(serde_json::json!({
                "success": true,
                "message": "Custom domain configured successfully with SSL and Nginx",
                "domain": "check.gym.com",
                "configured_at": "2025-11-25T10:30:00Z"
            }));
        });

        let response = client(&server).configure(&verified()).await.unwrap();

        api_mock.assert();
        assert!(response.success);
        assert_eq!(response.configured_at.as_deref(), Some("2025-11-25T10:30:00Z"));
    }

    #[tokio::test]
    async fn test_configure_maps_backend_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/domains/configure/");
            then.status(400).json_body(serde_json::json!({
                "error": "This domain is already in use by another account: Iron Gym"
            }));
        });

        let err = client(&server).configure(&verified()).await.unwrap_err();
        match err {
            CrmError::BackendError { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "This domain is already taken by another account");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_configure_ssl_failure_mentions_expected_ip() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/domains/configure/");
            then.status(500).json_body(serde_json::json!({
                "success": false,
                "error": "SSL certificate generation failed",
                "details": "certbot exited with 1"
            }));
        });

        let err = client(&server)
            .with_expected_ip("10.0.0.1")
            .configure(&verified())
            .await
            .unwrap_err();
        assert_eq!(
            err.user_friendly_message(),
            "SSL setup failed. Please verify your DNS is pointing to 10.0.0.1"
        );
    }

    #[tokio::test]
    async fn test_regenerate_links_returns_stats() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path("/api/domains/regenerate-links/");
            then.status(200).json_body(serde_json::json!({
                "success": true,
                "message": "Regenerated 45 out of 50 client links. 5 failed.",
                "stats": {"total_count": 50, "success_count": 45, "fail_count": 5}
            }));
        });

        let stats = client(&server).regenerate_links().await.unwrap();

        api_mock.assert();
        assert_eq!(
            stats,
            LinkStats {
                total_count: 50,
                success_count: 45,
                fail_count: 5
            }
        );
    }

    #[tokio::test]
    async fn test_remove_domain_error_uses_backend_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(DELETE).path("/api/domains/delete/");
            then.status(403)
                .json_body(serde_json::json!({"error": "Only super admins can remove domains"}));
        });

        let err = client(&server).remove_domain().await.unwrap_err();
        assert_eq!(err.user_friendly_message(), "Only super admins can remove domains");
        assert_eq!(err.category(), crate::utils::error::ErrorCategory::Network);
    }
}
