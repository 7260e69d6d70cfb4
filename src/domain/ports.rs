use crate::utils::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn delete_file(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn resolver_endpoint(&self) -> &str;
    fn expected_ip(&self) -> &str;
    fn request_timeout(&self) -> Duration;
    fn poll_interval(&self) -> Duration;
    fn max_attempts(&self) -> u32;
    fn state_dir(&self) -> &str;
}

/// DoH 回應中的一筆答案；`type == 1` 代表 A 記錄
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DnsAnswer {
    #[serde(rename = "type")]
    pub record_type: u16,
    pub data: String,
}

impl DnsAnswer {
    pub const TYPE_A: u16 = 1;

    pub fn a(ip: impl Into<String>) -> Self {
        Self {
            record_type: Self::TYPE_A,
            data: ip.into(),
        }
    }

    pub fn is_a_record(&self) -> bool {
        self.record_type == Self::TYPE_A
    }
}

/// 查詢 A 記錄的外部邊界。傳輸或解析失敗回傳 `DnsTransport`。
#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn lookup_a(&self, name: &str) -> Result<Vec<DnsAnswer>>;
}
