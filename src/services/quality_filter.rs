//! 质量过滤服务 - 业务能力层
//!
//! 只负责"判断单个候选站点是否合格"能力，不关心流程

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clients::MetricsClient;
use crate::config::Config;

/// 质量过滤器
///
/// 职责：
/// - 按配置阈值判断域名/页面是否合格
/// - 只处理单个候选
/// - 不出现 Vec<候选>
/// - 不关心流程顺序
pub struct QualityFilter {
    config: Arc<Config>,
    client: Option<MetricsClient>,
}

impl QualityFilter {
    /// 创建新的质量过滤器
    ///
    /// 未配置指标凭证时 client 为 None，此时过滤器对所有候选放行。
    /// 这是刻意保留的宽松默认值，方便在没有指标服务的环境里运行。
    pub fn new(config: Arc<Config>) -> Self {
        let client = if config.metrics_api_key.is_empty() {
            None
        } else {
            Some(MetricsClient::new(
                config.metrics_api_key.clone(),
                config.metrics_api_base_url.clone(),
            ))
        };
        Self { config, client }
    }

    /// 判断候选站点是否满足质量要求
    ///
    /// # 参数
    /// - `domain`: 候选域名
    /// - `page_url`: 可选的具体页面 URL（提供时额外检查页面外链数量）
    ///
    /// # 判定规则
    /// 1. 去掉 www. 前缀后，若配置排除子域名且域名标签数超过 2 → 拒绝
    /// 2. 未配置指标凭证 → 放行（宽松默认）
    /// 3. 指标服务调用失败 → 拒绝（fail-closed）并记录日志
    /// 4. DR 或自然流量低于阈值 → 拒绝
    /// 5. 页面外链数量超过上限 → 拒绝（数量不可用时不拒绝）
    pub async fn is_acceptable(&self, domain: &str, page_url: Option<&str>) -> bool {
        let clean_domain = normalize_domain(domain);

        if self.config.exclude_subdomains && is_subdomain(&clean_domain) {
            debug!("跳过子域名: {}", domain);
            return false;
        }

        let client = match &self.client {
            Some(client) => client,
            None => {
                debug!("未配置指标凭证，候选 {} 默认放行", clean_domain);
                return true;
            }
        };

        let metrics = match client.domain_overview(&clean_domain).await {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!("查询域名 {} 指标失败，按不合格处理: {}", clean_domain, e);
                return false;
            }
        };

        info!(
            "域名 {} 指标: DR {}, 流量 {}",
            clean_domain, metrics.domain_rating, metrics.organic_traffic
        );

        if metrics.domain_rating < self.config.min_domain_rating
            || metrics.organic_traffic < self.config.min_organic_traffic
        {
            debug!(
                "域名 {} 不满足质量要求 (DR: {}, 流量: {})",
                clean_domain, metrics.domain_rating, metrics.organic_traffic
            );
            return false;
        }

        if let Some(page_url) = page_url {
            match client.external_links_count(page_url).await {
                Ok(Some(count)) if count > self.config.max_external_links => {
                    debug!("页面 {} 外链过多 ({})", page_url, count);
                    return false;
                }
                Ok(_) => {}
                Err(e) => {
                    // 外链数量不可用不作为拒绝理由
                    debug!("查询页面 {} 外链数量失败: {}", page_url, e);
                }
            }
        }

        true
    }
}

/// 归一化域名（去掉 www. 前缀，统一小写）
pub fn normalize_domain(domain: &str) -> String {
    let lower = domain.trim().to_lowercase();
    lower.strip_prefix("www.").unwrap_or(&lower).to_string()
}

/// 判断是否为子域名（标签数超过 2）
pub fn is_subdomain(domain: &str) -> bool {
    domain.split('.').filter(|p| !p.is_empty()).count() > 2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter_without_credential() -> QualityFilter {
        let mut config = Config::default();
        config.metrics_api_key = String::new();
        QualityFilter::new(Arc::new(config))
    }

    #[test]
    fn test_normalize_domain_strips_www() {
        assert_eq!(normalize_domain("www.example.com"), "example.com");
        assert_eq!(normalize_domain("Example.COM"), "example.com");
        assert_eq!(normalize_domain("sub.example.com"), "sub.example.com");
    }

    #[test]
    fn test_is_subdomain() {
        assert!(is_subdomain("blog.example.com"));
        assert!(!is_subdomain("example.com"));
        assert!(is_subdomain("a.b.example.com"));
    }

    #[tokio::test]
    async fn test_fail_open_without_credential() {
        let filter = filter_without_credential();
        assert!(filter.is_acceptable("example.com", None).await);
        assert!(
            filter
                .is_acceptable("example.com", Some("https://example.com/page"))
                .await
        );
    }

    #[tokio::test]
    async fn test_subdomain_rejected_even_without_credential() {
        let filter = filter_without_credential();
        assert!(!filter.is_acceptable("blog.example.com", None).await);
        // www. 前缀不算子域名
        assert!(filter.is_acceptable("www.example.com", None).await);
    }

    #[tokio::test]
    async fn test_subdomain_allowed_when_not_excluded() {
        let mut config = Config::default();
        config.metrics_api_key = String::new();
        config.exclude_subdomains = false;
        let filter = QualityFilter::new(Arc::new(config));
        assert!(filter.is_acceptable("blog.example.com", None).await);
    }
}
