use crate::adapters::doh::DEFAULT_RESOLVER_ENDPOINT;
use crate::core::validator::{
    DEFAULT_EXPECTED_IP, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL, MAX_POLL_INTERVAL,
};
use crate::core::ConfigProvider;
use crate::utils::error::{CrmError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub dns: DnsConfig,
    pub polling: PollingConfig,
    pub storage: StorageConfig,
    pub api: Option<ApiConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsConfig {
    pub resolver_endpoint: String,
    pub expected_ip: String,
    pub request_timeout_seconds: u64,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            resolver_endpoint: DEFAULT_RESOLVER_ENDPOINT.to_string(),
            expected_ip: DEFAULT_EXPECTED_IP.to_string(),
            request_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_seconds: u64,
    pub max_attempts: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_POLL_INTERVAL.as_secs(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub state_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: "./.fithq".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default)]
    pub token: String,
    pub timeout_seconds: Option<u64>,
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| CrmError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${FITHQ_API_TOKEN})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| CrmError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("dns.resolver_endpoint", &self.dns.resolver_endpoint)?;
        validation::validate_ipv4("dns.expected_ip", &self.dns.expected_ip)?;
        validation::validate_range(
            "dns.request_timeout_seconds",
            self.dns.request_timeout_seconds,
            1,
            120,
        )?;

        validation::validate_range(
            "polling.interval_seconds",
            self.polling.interval_seconds,
            1,
            MAX_POLL_INTERVAL.as_secs(),
        )?;
        validation::validate_positive_number(
            "polling.max_attempts",
            self.polling.max_attempts as usize,
            1,
        )?;

        validation::validate_path("storage.state_dir", &self.storage.state_dir)?;

        if let Some(api) = &self.api {
            validation::validate_url("api.base_url", &api.base_url)?;
        }

        Ok(())
    }

    /// 後端 API 的 token；沒設定或環境變數未展開時回傳 None
    pub fn api_token(&self) -> Option<&str> {
        self.api
            .as_ref()
            .map(|api| api.token.trim())
            .filter(|token| !token.is_empty() && !token.starts_with("${"))
    }

    pub fn api_timeout(&self) -> Duration {
        let seconds = self
            .api
            .as_ref()
            .and_then(|api| api.timeout_seconds)
            .unwrap_or(30);
        Duration::from_secs(seconds)
    }
}

impl ConfigProvider for AppConfig {
    fn resolver_endpoint(&self) -> &str {
        &self.dns.resolver_endpoint
    }

    fn expected_ip(&self) -> &str {
        &self.dns.expected_ip
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.dns.request_timeout_seconds)
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_seconds)
    }

    fn max_attempts(&self) -> u32 {
        self.polling.max_attempts
    }

    fn state_dir(&self) -> &str {
        &self.storage.state_dir
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
