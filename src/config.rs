use crate::models::Category;

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 同时工作的 worker 数量上限
    pub max_workers: usize,
    /// 每个类别需要找到的合格站点数量
    pub sites_per_category: usize,
    /// 目标页面类别（按顺序处理）
    pub target_categories: Vec<Category>,
    /// 最低域名评分（DR）
    pub min_domain_rating: f64,
    /// 最低自然流量
    pub min_organic_traffic: u64,
    /// 页面外链数量上限
    pub max_external_links: u64,
    /// 是否排除子域名
    pub exclude_subdomains: bool,
    /// 提交前随机延迟范围（秒）
    pub submission_delay_secs: (u64, u64),
    /// 每篇内容嵌入的链接数量范围
    pub links_per_post: (u32, u32),
    /// 生产模式：true 时才真正点击提交按钮
    pub production_mode: bool,
    /// 推广站点清单文件（TOML），不存在时使用内置清单
    pub roster_file: String,
    // --- 指标服务配置 ---
    pub metrics_api_key: String,
    pub metrics_api_base_url: String,
    // --- 验证码服务配置 ---
    pub captcha_api_key: String,
    pub captcha_api_base_url: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    // --- 浏览器身份配置 ---
    pub user_agents: Vec<String>,
    pub proxy_list: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_workers: 5,
            sites_per_category: 5,
            target_categories: Category::ALL.to_vec(),
            min_domain_rating: 50.0,
            min_organic_traffic: 500,
            max_external_links: 100,
            exclude_subdomains: true,
            submission_delay_secs: (15, 45),
            links_per_post: (1, 2),
            production_mode: false,
            roster_file: "sites.toml".to_string(),
            metrics_api_key: String::new(),
            metrics_api_base_url: "https://api.ahrefs.com/v3".to_string(),
            captcha_api_key: String::new(),
            captcha_api_base_url: "https://2captcha.com".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4".to_string(),
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Safari/605.1.15".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:89.0) Gecko/20100101 Firefox/89.0".to_string(),
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.107 Safari/537.36".to_string(),
                "Mozilla/5.0 (iPhone; CPU iPhone OS 14_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0 Mobile/15E148 Safari/604.1".to_string(),
            ],
            proxy_list: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_workers: env_parse("MAX_WORKERS", default.max_workers),
            sites_per_category: env_parse("SITES_PER_CATEGORY", default.sites_per_category),
            target_categories: env_categories("TARGET_CATEGORIES", default.target_categories),
            min_domain_rating: env_parse("MIN_DOMAIN_RATING", default.min_domain_rating),
            min_organic_traffic: env_parse("MIN_ORGANIC_TRAFFIC", default.min_organic_traffic),
            max_external_links: env_parse("MAX_EXTERNAL_LINKS", default.max_external_links),
            exclude_subdomains: env_parse("EXCLUDE_SUBDOMAINS", default.exclude_subdomains),
            submission_delay_secs: (
                env_parse("SUBMISSION_DELAY_MIN", default.submission_delay_secs.0),
                env_parse("SUBMISSION_DELAY_MAX", default.submission_delay_secs.1),
            ),
            links_per_post: (
                env_parse("LINKS_PER_POST_MIN", default.links_per_post.0),
                env_parse("LINKS_PER_POST_MAX", default.links_per_post.1),
            ),
            production_mode: env_parse("PRODUCTION_MODE", default.production_mode),
            roster_file: std::env::var("ROSTER_FILE").unwrap_or(default.roster_file),
            metrics_api_key: std::env::var("METRICS_API_KEY").unwrap_or(default.metrics_api_key),
            metrics_api_base_url: std::env::var("METRICS_API_BASE_URL")
                .unwrap_or(default.metrics_api_base_url),
            captcha_api_key: std::env::var("CAPTCHA_API_KEY").unwrap_or(default.captcha_api_key),
            captcha_api_base_url: std::env::var("CAPTCHA_API_BASE_URL")
                .unwrap_or(default.captcha_api_base_url),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL")
                .unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            user_agents: env_list("USER_AGENTS", default.user_agents),
            proxy_list: env_list("PROXY_LIST", default.proxy_list),
        }
    }

    /// 随机延迟范围（归一化，保证 min <= max）
    pub fn delay_range(&self) -> (u64, u64) {
        let (min, max) = self.submission_delay_secs;
        if min <= max {
            (min, max)
        } else {
            (max, min)
        }
    }

    /// 链接数量范围（归一化，保证 min <= max 且至少为 1）
    pub fn link_range(&self) -> (u32, u32) {
        let (min, max) = self.links_per_post;
        let min = min.max(1);
        let max = max.max(min);
        (min, max)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// 逗号分隔的环境变量列表
fn env_list(name: &str, default: Vec<String>) -> Vec<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => default,
    }
}

/// 逗号分隔的类别列表（无法识别的类别会被忽略）
fn env_categories(name: &str, default: Vec<Category>) -> Vec<Category> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => {
            let parsed: Vec<Category> = v
                .split(',')
                .filter_map(|s| Category::from_slug(s.trim()))
                .collect();
            if parsed.is_empty() {
                default
            } else {
                parsed
            }
        }
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_covers_all_categories() {
        let config = Config::default();
        assert_eq!(config.target_categories.len(), 7);
    }

    #[test]
    fn test_delay_range_normalized() {
        let mut config = Config::default();
        config.submission_delay_secs = (45, 15);
        assert_eq!(config.delay_range(), (15, 45));
    }

    #[test]
    fn test_link_range_at_least_one() {
        let mut config = Config::default();
        config.links_per_post = (0, 0);
        assert_eq!(config.link_range(), (1, 1));
    }
}
