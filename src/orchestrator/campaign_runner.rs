//! 活动执行器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个活动的入口，负责类别遍历、并发扇出和资源管理。
//!
//! ## 核心功能
//!
//! 1. **类别遍历**：按配置顺序处理每个类别，前一类别全部完成后才开始下一个
//! 2. **站点发现**：每个类别先用专属会话跑一轮发现
//! 3. **并发控制**：使用 Semaphore 限制并发数量（上限取发现数量）
//! 4. **资源管理**：持有 SessionPool，保证无论哪条路径结束都恰好关停一次
//! 5. **全局统计**：共享计数器在同一把锁下单调递增
//! 6. **协作取消**：取消标志阻止新类别开始，随后池子整体关停
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单次提交的细节
//! - **资源所有者**：唯一持有 SessionPool 的模块
//! - **向下委托**：委托 SubmissionFlow 处理单次提交
//! - **永不外抛**：活动总是返回 CampaignResult，失败用错误标记表达

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Semaphore};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::CampaignError;
use crate::infrastructure::SessionPool;
use crate::models::{
    CampaignResult, Category, CategoryResult, PromotionalSite, SubmissionOutcome,
};
use crate::services::SiteDiscovery;
use crate::utils::logging;
use crate::workflow::{SubmissionCtx, SubmissionFlow};

/// 站点发现专用的 worker 标识
const DISCOVERY_WORKER: usize = 0;

/// 活动级别共享计数器
///
/// 只增不减，所有更新都在同一把锁下进行
#[derive(Debug, Default)]
struct Counters {
    successful: usize,
    failed: usize,
}

/// 活动执行器
pub struct CampaignRunner {
    config: Arc<Config>,
    roster: Arc<Vec<PromotionalSite>>,
    pool: Arc<SessionPool>,
    cancelled: Arc<AtomicBool>,
}

impl CampaignRunner {
    /// 创建新的活动执行器
    pub fn new(config: Config, roster: Vec<PromotionalSite>) -> Self {
        let config = Arc::new(config);
        Self {
            pool: Arc::new(SessionPool::new(config.clone())),
            config,
            roster: Arc::new(roster),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 请求取消活动
    ///
    /// 协作式取消：不打断正在执行的任务，只阻止新类别开始
    pub fn cancel(&self) {
        info!("🛑 收到取消请求");
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// 会话池（用于观测存活会话数）
    pub fn pool(&self) -> &Arc<SessionPool> {
        &self.pool
    }

    /// 执行完整活动
    ///
    /// 永远返回 CampaignResult；无论正常结束、活动级失败还是取消，
    /// 会话池都恰好关停一次
    pub async fn run(&self) -> CampaignResult {
        let started = Instant::now();
        logging::log_campaign_start(&self.config);

        let result = self.run_inner(started).await;

        self.pool.shutdown().await;
        result
    }

    async fn run_inner(&self, started: Instant) -> CampaignResult {
        if self.roster.is_empty() {
            error!("❌ {}，活动中止", CampaignError::EmptyRoster);
            return CampaignResult::failed(CampaignError::EmptyRoster.to_string());
        }

        let flow = Arc::new(SubmissionFlow::new(&self.config, self.roster.clone()));
        let discovery = SiteDiscovery::new(self.config.clone());
        let counters = Arc::new(Mutex::new(Counters::default()));
        // worker 0 留给发现阶段，提交任务从 1 开始编号
        let worker_seq = Arc::new(AtomicUsize::new(DISCOVERY_WORKER + 1));

        let mut by_category = BTreeMap::new();
        let total = self.config.target_categories.len();

        for (index, category) in self.config.target_categories.iter().copied().enumerate() {
            if self.is_cancelled() {
                warn!("🛑 活动已取消，跳过剩余 {} 个类别", total - index);
                break;
            }

            logging::log_category_start(index + 1, total, category.name());

            // 发现阶段使用专属会话
            let sites = match self.pool.acquire(DISCOVERY_WORKER).await {
                Ok(session) => {
                    discovery
                        .find_sites(session.driver(), category, self.config.sites_per_category)
                        .await
                }
                Err(e) => {
                    warn!("类别 {} 的发现会话不可用: {}", category.name(), e);
                    Vec::new()
                }
            };

            let category_result = self
                .run_category(category, sites, flow.clone(), counters.clone(), &worker_seq)
                .await;

            {
                let tally = counters.lock().await;
                logging::log_category_complete(
                    category.name(),
                    category_result.sites_found,
                    tally.successful,
                    tally.failed,
                );
            }

            by_category.insert(category.slug().to_string(), category_result);
        }

        // 发现会话的单位工作到此结束
        self.pool.release(DISCOVERY_WORKER).await;

        CampaignResult::aggregate(by_category, started.elapsed().as_secs())
    }

    /// 处理单个类别：一个 URL 一个任务，扇出后在本类别内汇合
    async fn run_category(
        &self,
        category: Category,
        sites: Vec<String>,
        flow: Arc<SubmissionFlow>,
        counters: Arc<Mutex<Counters>>,
        worker_seq: &Arc<AtomicUsize>,
    ) -> CategoryResult {
        let mut result = CategoryResult {
            sites_found: sites.len(),
            ..Default::default()
        };
        if sites.is_empty() {
            return result;
        }

        info!(
            "📤 正在向 {} 个 {} 站点发起提交...",
            sites.len(),
            category.name()
        );

        // 并发上限取配置值和站点数量的较小者
        let permits = self.config.max_workers.max(1).min(sites.len());
        let semaphore = Arc::new(Semaphore::new(permits));
        let (delay_min, delay_max) = self.config.delay_range();

        let mut handles = Vec::new();
        for url in sites {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            let worker_id = worker_seq.fetch_add(1, Ordering::Relaxed);
            let ctx = SubmissionCtx::new(category, url, worker_id);
            let flow = flow.clone();
            let pool = self.pool.clone();
            let counters = counters.clone();
            // 随机延迟在任务外生成，避免 rng 跨越 await
            let delay_secs = rand::random_range(delay_min..=delay_max);

            let handle = tokio::spawn(async move {
                let _permit = permit;

                // 随机延迟，避免所有任务同时发起请求
                sleep(Duration::from_secs(delay_secs)).await;

                let outcome = match pool.acquire(worker_id).await {
                    Ok(session) => flow.run(session.driver(), &ctx).await,
                    Err(e) => SubmissionOutcome::failure(
                        ctx.category,
                        ctx.url.as_str(),
                        format!("会话创建失败: {}", e),
                    ),
                };

                // 本单位工作完成，销毁会话
                pool.release(worker_id).await;

                {
                    let mut tally = counters.lock().await;
                    if outcome.success {
                        tally.successful += 1;
                    } else {
                        tally.failed += 1;
                    }
                }

                outcome
            });
            handles.push(handle);
        }

        // 本类别所有任务汇合后才进入下一类别
        for handle in handles {
            match handle.await {
                Ok(outcome) if outcome.success => result.successful += 1,
                Ok(_) => result.failed += 1,
                Err(e) => {
                    error!("提交任务执行失败: {}", e);
                    result.failed += 1;
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::default_roster;

    fn offline_config() -> Config {
        let mut config = Config::default();
        config.metrics_api_key = String::new();
        config.llm_api_key = String::new();
        config.captcha_api_key = String::new();
        config
    }

    #[tokio::test]
    async fn test_empty_roster_aborts_with_marker() {
        let runner = CampaignRunner::new(offline_config(), Vec::new());
        let result = runner.run().await;

        assert!(result.error.is_some());
        assert_eq!(result.submissions_attempted, 0);
        assert_eq!(result.quality_sites_found, 0);
        assert_eq!(runner.pool().live_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_cancel_before_run_skips_all_categories() {
        let runner = CampaignRunner::new(offline_config(), default_roster());
        runner.cancel();
        let result = runner.run().await;

        assert!(result.error.is_none());
        assert!(result.by_category.is_empty());
        assert_eq!(result.submissions_attempted, 0);
        assert!(runner.is_cancelled());
        assert_eq!(runner.pool().live_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_no_categories_completes_with_zero_counts() {
        let mut config = offline_config();
        config.target_categories = Vec::new();
        let runner = CampaignRunner::new(config, default_roster());
        let result = runner.run().await;

        assert!(result.error.is_none());
        assert_eq!(result.submissions_attempted, 0);
        assert_eq!(
            result.successful_submissions + result.failed_submissions,
            result.submissions_attempted
        );
        assert_eq!(runner.pool().live_sessions().await, 0);
    }
}
