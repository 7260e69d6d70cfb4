use crate::domain::ports::{ConfigProvider, DnsAnswer, DnsResolver};
use crate::utils::error::{CrmError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_RESOLVER_ENDPOINT: &str = "https://dns.google/resolve";

#[derive(Debug, Deserialize)]
struct DohResponse {
    #[serde(rename = "Answer", default)]
    answer: Vec<DnsAnswer>,
}

/// DNS-over-HTTPS JSON API（dns.google/resolve 格式）
#[derive(Debug, Clone)]
pub struct DohResolver {
    client: Client,
    endpoint: String,
}

impl DohResolver {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::new(config.resolver_endpoint(), config.request_timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn transport(detail: impl ToString) -> CrmError {
    CrmError::DnsTransport {
        detail: detail.to_string(),
    }
}

#[async_trait]
impl DnsResolver for DohResolver {
    async fn lookup_a(&self, name: &str) -> Result<Vec<DnsAnswer>> {
        tracing::debug!("Making DoH request to {} for {}", self.endpoint, name);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("name", name), ("type", "A")])
            .header("Accept", "application/dns-json")
            .header("Cache-Control", "no-store")
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        tracing::debug!("DoH response status: {}", status);
        if !status.is_success() {
            return Err(transport(format!("resolver returned HTTP {}", status)));
        }

        let body = response.text().await.map_err(transport)?;
        let parsed: DohResponse = serde_json::from_str(&body)
            .map_err(|e| transport(format!("malformed resolver response: {}", e)))?;

        Ok(parsed.answer)
    }
}
