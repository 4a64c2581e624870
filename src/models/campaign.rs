use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::Category;

/// 单次提交结果
///
/// 每次 SubmissionFlow 调用产出一条，归属于唯一一个类别
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub category: Category,
    pub url: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmissionOutcome {
    pub fn success(category: Category, url: impl Into<String>) -> Self {
        Self {
            category,
            url: url.into(),
            success: true,
            error: None,
        }
    }

    pub fn failure(
        category: Category,
        url: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            category,
            url: url.into(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// 单个类别的统计结果
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryResult {
    pub sites_found: usize,
    pub successful: usize,
    pub failed: usize,
}

impl CategoryResult {
    /// 该类别尝试的提交总数
    pub fn attempted(&self) -> usize {
        self.successful + self.failed
    }
}

/// 活动最终结果
///
/// 活动的终态产物，生成后不再变更
#[derive(Debug, Clone, Default, Serialize)]
pub struct CampaignResult {
    pub quality_sites_found: usize,
    pub submissions_attempted: usize,
    pub successful_submissions: usize,
    pub failed_submissions: usize,
    pub duration_seconds: u64,
    /// 按类别 slug 排序的分类统计
    pub by_category: BTreeMap<String, CategoryResult>,
    /// 活动级别失败时的错误标记
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CampaignResult {
    /// 构建活动级别失败的空结果
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Default::default()
        }
    }

    /// 从分类统计汇总总数
    pub fn aggregate(
        by_category: BTreeMap<String, CategoryResult>,
        duration_seconds: u64,
    ) -> Self {
        let quality_sites_found = by_category.values().map(|c| c.sites_found).sum();
        let successful_submissions = by_category.values().map(|c| c.successful).sum();
        let failed_submissions = by_category.values().map(|c| c.failed).sum();
        Self {
            quality_sites_found,
            submissions_attempted: successful_submissions + failed_submissions,
            successful_submissions,
            failed_submissions,
            duration_seconds,
            by_category,
            error: None,
        }
    }
}

/// 活动状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CampaignStatus {
    Running,
    Completed,
    Failed(String),
    Cancelled,
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignStatus::Running => write!(f, "running"),
            CampaignStatus::Completed => write!(f, "completed"),
            CampaignStatus::Failed(reason) => write!(f, "failed: {}", reason),
            CampaignStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category_result(sites: usize, ok: usize, fail: usize) -> CategoryResult {
        CategoryResult {
            sites_found: sites,
            successful: ok,
            failed: fail,
        }
    }

    #[test]
    fn test_aggregate_totals_match_categories() {
        let mut by_category = BTreeMap::new();
        by_category.insert("forums".to_string(), category_result(3, 2, 1));
        by_category.insert("blogs".to_string(), category_result(2, 0, 2));

        let result = CampaignResult::aggregate(by_category, 12);

        assert_eq!(result.quality_sites_found, 5);
        assert_eq!(result.submissions_attempted, 5);
        assert_eq!(result.successful_submissions, 2);
        assert_eq!(result.failed_submissions, 3);
        // 各类别 attempted 之和等于总 attempted
        let per_category: usize = result.by_category.values().map(|c| c.attempted()).sum();
        assert_eq!(per_category, result.submissions_attempted);
    }

    #[test]
    fn test_successful_plus_failed_equals_attempted() {
        let mut by_category = BTreeMap::new();
        by_category.insert("wiki_sites".to_string(), category_result(4, 1, 3));
        let result = CampaignResult::aggregate(by_category, 1);
        assert_eq!(
            result.successful_submissions + result.failed_submissions,
            result.submissions_attempted
        );
    }

    #[test]
    fn test_failed_result_is_zeroed() {
        let result = CampaignResult::failed("推广站点清单为空");
        assert!(result.error.is_some());
        assert_eq!(result.submissions_attempted, 0);
        assert_eq!(result.quality_sites_found, 0);
        assert!(result.by_category.is_empty());
    }
}
