//! SEO 指标 API 客户端
//!
//! 封装所有与指标服务（Ahrefs v3 风格接口）相关的调用逻辑

use std::time::Duration;

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::debug;

/// 指标客户端错误
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("指标请求失败: {0}")]
    Request(#[from] reqwest::Error),
    #[error("指标服务返回错误响应 (状态码 {status}): {message}")]
    BadResponse { status: u16, message: String },
}

/// 域名指标
#[derive(Debug, Clone, Copy)]
pub struct DomainMetrics {
    pub domain_rating: f64,
    pub organic_traffic: u64,
}

/// 指标客户端
pub struct MetricsClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl MetricsClient {
    /// 创建新的指标客户端
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// 查询域名总览指标（DR + 自然流量）
    pub async fn domain_overview(&self, domain: &str) -> Result<DomainMetrics, MetricsError> {
        let endpoint = format!("{}/site-explorer/overview", self.base_url);
        debug!("查询域名指标: {}", domain);

        let response = self
            .http
            .get(&endpoint)
            .bearer_auth(&self.api_key)
            .query(&[("target", domain), ("protocol", "both")])
            .send()
            .await?;

        let status = response.status();
        let data: JsonValue = response.json().await?;

        if !status.is_success() {
            return Err(MetricsError::BadResponse {
                status: status.as_u16(),
                message: extract_error_message(&data),
            });
        }

        let domain_rating = data
            .pointer("/metrics/domain_rating")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let organic_traffic = data
            .pointer("/metrics/organic/traffic")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);

        debug!(
            "域名 {} 指标: DR {}, 流量 {}",
            domain, domain_rating, organic_traffic
        );

        Ok(DomainMetrics {
            domain_rating,
            organic_traffic,
        })
    }

    /// 查询页面的外部链接数量
    ///
    /// 服务不提供该数据时返回 None（不视为错误）
    pub async fn external_links_count(
        &self,
        page_url: &str,
    ) -> Result<Option<u64>, MetricsError> {
        let endpoint = format!("{}/site-explorer/linked-domains-from-page", self.base_url);
        debug!("查询页面外链数量: {}", page_url);

        let response = self
            .http
            .get(&endpoint)
            .bearer_auth(&self.api_key)
            .query(&[("target", page_url), ("protocol", "both"), ("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        let data: JsonValue = response.json().await?;

        if !status.is_success() {
            return Err(MetricsError::BadResponse {
                status: status.as_u16(),
                message: extract_error_message(&data),
            });
        }

        Ok(data.get("count").and_then(|v| v.as_u64()))
    }
}

fn extract_error_message(data: &JsonValue) -> String {
    data.pointer("/error/message")
        .and_then(|v| v.as_str())
        .unwrap_or("Unknown error")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_message() {
        let data = serde_json::json!({ "error": { "message": "invalid token" } });
        assert_eq!(extract_error_message(&data), "invalid token");
    }

    #[test]
    fn test_extract_error_message_missing() {
        let data = serde_json::json!({});
        assert_eq!(extract_error_message(&data), "Unknown error");
    }
}
