use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::fs;
use tracing::{info, warn};

use crate::models::site::{default_roster, PromotionalSite};

/// 清单文件结构
#[derive(Debug, Deserialize)]
struct RosterFile {
    #[serde(default)]
    sites: Vec<PromotionalSite>,
}

/// 从 TOML 文件加载推广站点清单
pub async fn load_roster_file(path: &Path) -> Result<Vec<PromotionalSite>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取清单文件: {}", path.display()))?;

    let file: RosterFile = toml::from_str(&content)
        .with_context(|| format!("无法解析清单文件: {}", path.display()))?;

    Ok(file.sites)
}

/// 加载推广站点清单
///
/// 文件不存在或解析失败时回退到内置清单（清单为空会在活动层被拒绝）
pub async fn load_roster(path: &str) -> Vec<PromotionalSite> {
    let file_path = Path::new(path);
    if !file_path.exists() {
        info!("清单文件 {} 不存在，使用内置推广站点清单", path);
        return default_roster();
    }

    match load_roster_file(file_path).await {
        Ok(sites) if !sites.is_empty() => {
            info!("✓ 从 {} 加载了 {} 个推广站点", path, sites.len());
            sites
        }
        Ok(_) => {
            warn!("⚠️ 清单文件 {} 中没有站点，使用内置清单", path);
            default_roster()
        }
        Err(e) => {
            warn!("⚠️ 加载清单文件失败 ({}), 使用内置清单: {}", path, e);
            default_roster()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_falls_back_to_default() {
        let roster = load_roster("does_not_exist.toml").await;
        assert!(!roster.is_empty());
    }

    #[test]
    fn test_parse_roster_toml() {
        let content = r#"
            [[sites]]
            name = "Example"
            url = "https://example.com"
            description = "Example site."
            keywords = ["one", "two"]
        "#;
        let file: RosterFile = toml::from_str(content).unwrap();
        assert_eq!(file.sites.len(), 1);
        assert_eq!(file.sites[0].keywords, vec!["one", "two"]);
    }
}
