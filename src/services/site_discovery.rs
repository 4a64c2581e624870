//! 站点发现服务 - 业务能力层
//!
//! 只负责"为一个类别枚举合格候选站点"能力，不关心流程

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::infrastructure::PageDriver;
use crate::models::Category;
use crate::services::QualityFilter;

/// 搜索结果页渲染等待时间
const SEARCH_SETTLE: Duration = Duration::from_secs(2);

/// 搜索结果提取脚本
///
/// 优先取自然结果区块的链接，取不到时退化为页面上所有外部链接
const RESULT_SCRIPT: &str = r#"
    (() => {
        let urls = [];
        for (const a of document.querySelectorAll('li.b_algo h2 a, li.b_algo .b_title a')) {
            if (a.href && a.href.startsWith('http')) {
                urls.push(a.href);
            }
        }
        if (urls.length === 0) {
            for (const a of document.querySelectorAll('a[href^="http"]')) {
                urls.push(a.href);
            }
        }
        return urls.slice(0, 30);
    })()
"#;

/// 排除的域名后缀（搜索引擎自身和大平台，不是外链目标）
const EXCLUDED_DOMAINS: &[&str] = &[
    "bing.com",
    "google.com",
    "microsoft.com",
    "microsofttranslator.com",
    "youtube.com",
    "facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "linkedin.com",
    "pinterest.com",
    "amazon.com",
    "apple.com",
];

/// 站点发现服务
///
/// 职责：
/// - 按类别的搜索模式枚举候选 URL
/// - 逐个通过质量过滤器，凑够配额即停
/// - 只处理单个类别
/// - 不关心流程顺序
pub struct SiteDiscovery {
    filter: QualityFilter,
}

impl SiteDiscovery {
    /// 创建新的站点发现服务
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            filter: QualityFilter::new(config),
        }
    }

    /// 为指定类别寻找合格站点
    ///
    /// # 参数
    /// - `driver`: 用于执行搜索的页面驱动器
    /// - `category`: 目标类别
    /// - `quota`: 需要的合格站点数量
    ///
    /// # 返回
    /// 最多 `quota` 个通过质量过滤的 URL，按发现顺序排列。
    /// 合格候选不足时返回更少的结果，这不是错误。
    pub async fn find_sites(
        &self,
        driver: &PageDriver,
        category: Category,
        quota: usize,
    ) -> Vec<String> {
        if quota == 0 {
            return Vec::new();
        }

        let mut accepted = Vec::new();
        let mut seen_domains = HashSet::new();

        for pattern in category.search_patterns() {
            let candidates = match self.search(driver, pattern).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!("搜索 \"{}\" 失败: {}", pattern, e);
                    continue;
                }
            };
            debug!("搜索 \"{}\" 返回 {} 个候选", pattern, candidates.len());

            self.vet_candidates(candidates, quota, &mut seen_domains, &mut accepted)
                .await;

            if accepted.len() >= quota {
                break;
            }
        }

        info!(
            "✓ 类别 {} 找到 {}/{} 个合格站点",
            category.name(),
            accepted.len(),
            quota
        );
        accepted
    }

    /// 逐个审核候选 URL，合格的按顺序收进 accepted
    ///
    /// 同一域名只审核一次；凑够配额立即返回
    async fn vet_candidates(
        &self,
        candidates: Vec<String>,
        quota: usize,
        seen_domains: &mut HashSet<String>,
        accepted: &mut Vec<String>,
    ) {
        for url in candidates {
            if accepted.len() >= quota {
                return;
            }
            let domain = match host_of(&url) {
                Some(domain) => domain,
                None => continue,
            };
            if is_excluded_domain(&domain) {
                continue;
            }
            if !seen_domains.insert(domain.clone()) {
                continue;
            }
            if self.filter.is_acceptable(&domain, Some(&url)).await {
                accepted.push(url);
            }
        }
    }

    /// 在会话里执行一次网页搜索并提取结果链接
    async fn search(&self, driver: &PageDriver, query: &str) -> Result<Vec<String>> {
        let search_url = Url::parse_with_params("https://www.bing.com/search", &[("q", query)])?;
        driver.goto(search_url.as_str()).await?;
        sleep(SEARCH_SETTLE).await;

        let urls: Vec<String> = driver.eval_as(RESULT_SCRIPT).await?;
        Ok(urls)
    }
}

/// 提取 URL 的主机名（统一小写）
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(|h| h.to_lowercase())
}

/// 判断域名是否在排除列表里（含其子域名）
pub fn is_excluded_domain(domain: &str) -> bool {
    EXCLUDED_DOMAINS
        .iter()
        .any(|d| domain == *d || domain.ends_with(&format!(".{}", d)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn discovery_without_metrics() -> SiteDiscovery {
        let mut config = Config::default();
        config.metrics_api_key = String::new();
        SiteDiscovery::new(Arc::new(config))
    }

    #[test]
    fn test_host_of() {
        assert_eq!(
            host_of("https://Example.com/forum/thread"),
            Some("example.com".to_string())
        );
        assert_eq!(host_of("not a url"), None);
    }

    #[test]
    fn test_is_excluded_domain() {
        assert!(is_excluded_domain("bing.com"));
        assert!(is_excluded_domain("cn.bing.com"));
        assert!(!is_excluded_domain("bingo.com"));
        assert!(!is_excluded_domain("example.com"));
    }

    #[tokio::test]
    async fn test_vet_candidates_respects_quota() {
        let discovery = discovery_without_metrics();
        let candidates = vec![
            "https://one.example/page".to_string(),
            "https://two.example/page".to_string(),
            "https://three.example/page".to_string(),
        ];
        let mut seen = HashSet::new();
        let mut accepted = Vec::new();
        discovery
            .vet_candidates(candidates, 2, &mut seen, &mut accepted)
            .await;
        // 未配置指标服务时全部放行，但绝不超过配额
        assert_eq!(accepted.len(), 2);
        assert_eq!(accepted[0], "https://one.example/page");
    }

    #[tokio::test]
    async fn test_vet_candidates_dedupes_domains() {
        let discovery = discovery_without_metrics();
        let candidates = vec![
            "https://one.example/first".to_string(),
            "https://one.example/second".to_string(),
        ];
        let mut seen = HashSet::new();
        let mut accepted = Vec::new();
        discovery
            .vet_candidates(candidates, 5, &mut seen, &mut accepted)
            .await;
        assert_eq!(accepted.len(), 1);
    }

    #[tokio::test]
    async fn test_vet_candidates_skips_excluded() {
        let discovery = discovery_without_metrics();
        let candidates = vec![
            "https://www.bing.com/search?q=x".to_string(),
            "https://site.example/page".to_string(),
        ];
        let mut seen = HashSet::new();
        let mut accepted = Vec::new();
        discovery
            .vet_candidates(candidates, 5, &mut seen, &mut accepted)
            .await;
        assert_eq!(accepted, vec!["https://site.example/page".to_string()]);
    }
}
