//! 活动生命周期管理 - 编排层
//!
//! 把 start / status / results / cancel 四个生命周期操作映射到
//! CampaignRunner 上，供外层请求处理层调用。活动结果只保存在内存里，
//! 进程重启后不保留。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::config::Config;
use crate::models::{CampaignResult, CampaignStatus, PromotionalSite};
use crate::orchestrator::CampaignRunner;

/// 单个活动的登记项
struct CampaignEntry {
    status: CampaignStatus,
    result: Option<CampaignResult>,
    runner: Arc<CampaignRunner>,
}

/// 活动生命周期管理器
#[derive(Clone, Default)]
pub struct CampaignManager {
    campaigns: Arc<Mutex<HashMap<String, CampaignEntry>>>,
}

impl CampaignManager {
    /// 创建新的管理器
    pub fn new() -> Self {
        Self::default()
    }

    /// 启动一个活动，立即返回活动 ID（工作在后台任务里执行）
    pub async fn start(&self, config: Config, roster: Vec<PromotionalSite>) -> String {
        let campaign_id = format!("campaign_{}", chrono::Utc::now().timestamp_millis());
        let runner = Arc::new(CampaignRunner::new(config, roster));

        {
            let mut campaigns = self.campaigns.lock().await;
            campaigns.insert(
                campaign_id.clone(),
                CampaignEntry {
                    status: CampaignStatus::Running,
                    result: None,
                    runner: runner.clone(),
                },
            );
        }

        info!("🚀 活动 {} 已启动", campaign_id);

        let campaigns = self.campaigns.clone();
        let task_id = campaign_id.clone();
        tokio::spawn(async move {
            let result = runner.run().await;

            let mut campaigns = campaigns.lock().await;
            if let Some(entry) = campaigns.get_mut(&task_id) {
                entry.status = if runner.is_cancelled() {
                    CampaignStatus::Cancelled
                } else if let Some(reason) = &result.error {
                    CampaignStatus::Failed(reason.clone())
                } else {
                    CampaignStatus::Completed
                };
                entry.result = Some(result);
            }
        });

        campaign_id
    }

    /// 查询活动状态
    pub async fn status(&self, campaign_id: &str) -> Option<CampaignStatus> {
        let campaigns = self.campaigns.lock().await;
        campaigns.get(campaign_id).map(|entry| entry.status.clone())
    }

    /// 获取活动结果（运行中返回 None）
    pub async fn results(&self, campaign_id: &str) -> Option<CampaignResult> {
        let campaigns = self.campaigns.lock().await;
        campaigns.get(campaign_id).and_then(|entry| entry.result.clone())
    }

    /// 取消活动
    ///
    /// 取消是协作式的：立即反映到状态上，后台任务随后完成收尾
    pub async fn cancel(&self, campaign_id: &str) -> bool {
        let mut campaigns = self.campaigns.lock().await;
        match campaigns.get_mut(campaign_id) {
            Some(entry) => {
                entry.runner.cancel();
                if entry.status == CampaignStatus::Running {
                    entry.status = CampaignStatus::Cancelled;
                }
                info!("🛑 活动 {} 已标记取消", campaign_id);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn offline_config() -> Config {
        let mut config = Config::default();
        config.metrics_api_key = String::new();
        config.llm_api_key = String::new();
        config.captcha_api_key = String::new();
        config
    }

    /// 轮询直到活动脱离 Running 状态（测试辅助）
    async fn wait_until_settled(manager: &CampaignManager, id: &str) -> CampaignStatus {
        for _ in 0..100 {
            match manager.status(id).await {
                Some(CampaignStatus::Running) => {
                    tokio::time::sleep(Duration::from_millis(20)).await
                }
                Some(status) => return status,
                None => panic!("活动 {} 不存在", id),
            }
        }
        panic!("活动 {} 长时间未结束", id);
    }

    #[tokio::test]
    async fn test_empty_roster_campaign_fails() {
        let manager = CampaignManager::new();
        let id = manager.start(offline_config(), Vec::new()).await;

        let status = wait_until_settled(&manager, &id).await;
        assert!(matches!(status, CampaignStatus::Failed(_)));

        let result = manager.results(&id).await.expect("应该有结果");
        assert!(result.error.is_some());
        assert_eq!(result.submissions_attempted, 0);
    }

    #[tokio::test]
    async fn test_no_categories_campaign_completes() {
        let manager = CampaignManager::new();
        let mut config = offline_config();
        config.target_categories = Vec::new();
        let id = manager
            .start(config, crate::models::default_roster())
            .await;

        let status = wait_until_settled(&manager, &id).await;
        assert_eq!(status, CampaignStatus::Completed);

        let result = manager.results(&id).await.expect("应该有结果");
        assert!(result.error.is_none());
        assert_eq!(result.submissions_attempted, 0);
    }

    #[tokio::test]
    async fn test_status_unknown_campaign() {
        let manager = CampaignManager::new();
        assert!(manager.status("campaign_missing").await.is_none());
        assert!(!manager.cancel("campaign_missing").await);
    }
}
