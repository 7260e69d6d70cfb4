use crate::domain::ports::DnsResolver;
use crate::utils::error::{CrmError, Result};

/// 查詢一次 A 記錄並判斷是否指向 `expected_ip`。
///
/// 成功時回傳相符的 IP。失敗時回傳 `DnsNotFound`、`DnsMismatch` 或 `DnsTransport`，
/// 三者都可重試。
pub async fn check_dns<R: DnsResolver + ?Sized>(
    resolver: &R,
    subdomain: &str,
    expected_ip: &str,
) -> Result<String> {
    let answers = match resolver.lookup_a(subdomain).await {
        Ok(answers) => answers,
        Err(CrmError::DnsTransport { detail }) => {
            tracing::warn!("⚠️ DNS lookup for {} failed: {}", subdomain, detail);
            return Err(CrmError::DnsTransport { detail });
        }
        Err(other) => {
            tracing::warn!("⚠️ DNS lookup for {} failed: {}", subdomain, other);
            return Err(CrmError::DnsTransport {
                detail: other.to_string(),
            });
        }
    };

    let a_records: Vec<&str> = answers
        .iter()
        .filter(|answer| answer.is_a_record())
        .map(|answer| answer.data.trim())
        .collect();

    tracing::debug!("🔍 {} A records for {}: {:?}", a_records.len(), subdomain, a_records);

    if a_records.is_empty() {
        return Err(CrmError::DnsNotFound);
    }

    if let Some(ip) = a_records.iter().find(|ip| **ip == expected_ip) {
        return Ok((*ip).to_string());
    }

    Err(CrmError::DnsMismatch {
        found: a_records[0].to_string(),
        expected: expected_ip.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::DnsAnswer;
    use async_trait::async_trait;

    struct FixedResolver(Result<Vec<DnsAnswer>>);

    #[async_trait]
    impl DnsResolver for FixedResolver {
        async fn lookup_a(&self, _name: &str) -> Result<Vec<DnsAnswer>> {
            match &self.0 {
                Ok(answers) => Ok(answers.clone()),
                Err(_) => Err(CrmError::DnsTransport {
                    detail: "timed out".to_string(),
                }),
            }
        }
    }

    const EXPECTED: &str = "13.51.251.199";

    #[tokio::test]
    async fn test_matching_record_succeeds() {
        let resolver = FixedResolver(Ok(vec![
            DnsAnswer::a("1.1.1.1"),
            DnsAnswer::a(EXPECTED),
        ]));
        let ip = check_dns(&resolver, "check.gym.com", EXPECTED).await.unwrap();
        assert_eq!(ip, EXPECTED);
    }

    #[tokio::test]
    async fn test_no_records_is_not_found() {
        let resolver = FixedResolver(Ok(vec![]));
        let err = check_dns(&resolver, "check.gym.com", EXPECTED)
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::DnsNotFound));
    }

    #[tokio::test]
    async fn test_only_cname_records_is_not_found() {
        let resolver = FixedResolver(Ok(vec![DnsAnswer {
            record_type: 5,
            data: "gym.example.net.".to_string(),
        }]));
        let err = check_dns(&resolver, "check.gym.com", EXPECTED)
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::DnsNotFound));
    }

    #[tokio::test]
    async fn test_wrong_ip_reports_both_addresses() {
        let resolver = FixedResolver(Ok(vec![DnsAnswer::a("93.184.216.34")]));
        let err = check_dns(&resolver, "check.gym.com", EXPECTED)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Found IP: 93.184.216.34, expected: 13.51.251.199"
        );
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_transport_failure_is_retryable() {
        let resolver = FixedResolver(Err(CrmError::DnsNotFound));
        let err = check_dns(&resolver, "check.gym.com", EXPECTED)
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::DnsTransport { .. }));
        assert!(err.is_retryable());
    }
}
