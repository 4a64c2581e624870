//! 会话池 - 基础设施层
//!
//! ## 职责
//!
//! 按 worker 维度管理浏览器会话的生命周期：
//!
//! 1. **延迟创建**：worker 首次 acquire 时才启动浏览器
//! 2. **独占持有**：同一个会话绝不会同时交给两个 worker（map 以 worker_id 为键）
//! 3. **生命周期**：worker 完成本单位工作后 release，活动结束时 shutdown
//!
//! 会话创建失败只影响该 worker 的当前任务，活动继续进行。
//! 会话 map 的锁只在创建/查找/销毁期间持有，绝不跨网络调用。

use std::collections::HashMap;
use std::sync::Arc;

use chromiumoxide::Browser;
use rand::seq::IndexedRandom;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::browser::launch_headless_browser;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::PageDriver;

/// 兜底 User-Agent（配置里没有提供任何 UA 时使用）
const FALLBACK_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.107 Safari/537.36";

/// 会话句柄
///
/// 一个 worker 独占的浏览器会话：浏览器连接 + 页面驱动器 + 配置好的身份
pub struct SessionHandle {
    worker_id: usize,
    user_agent: String,
    proxy: Option<String>,
    browser: Mutex<Browser>,
    driver: PageDriver,
}

impl SessionHandle {
    /// 获取页面驱动器
    pub fn driver(&self) -> &PageDriver {
        &self.driver
    }

    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    /// 关闭浏览器进程
    async fn teardown(&self) {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            debug!("关闭 worker {} 的浏览器失败: {}", self.worker_id, e);
        }
        let _ = browser.wait().await;
    }
}

/// 会话池
pub struct SessionPool {
    config: Arc<Config>,
    sessions: Mutex<HashMap<usize, Arc<SessionHandle>>>,
}

impl SessionPool {
    /// 创建新的会话池
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// 获取 worker 的会话（不存在则创建）
    ///
    /// 创建时配置随机 User-Agent 和可选代理。创建失败对该 worker 的
    /// 当前任务是致命的，但不影响其他 worker。
    pub async fn acquire(&self, worker_id: usize) -> AppResult<Arc<SessionHandle>> {
        {
            let sessions = self.sessions.lock().await;
            if let Some(handle) = sessions.get(&worker_id) {
                return Ok(handle.clone());
            }
        }

        // 为本会话挑选身份
        let (user_agent, proxy) = {
            let mut rng = rand::rng();
            let user_agent = self
                .config
                .user_agents
                .choose(&mut rng)
                .cloned()
                .unwrap_or_else(|| FALLBACK_USER_AGENT.to_string());
            let proxy = self.config.proxy_list.choose(&mut rng).cloned();
            (user_agent, proxy)
        };

        let (browser, page) = launch_headless_browser(&user_agent, proxy.as_deref())
            .await
            .map_err(|e| {
                warn!("worker {} 创建会话失败: {}", worker_id, e);
                AppError::session_creation_failed(worker_id, e)
            })?;

        let handle = Arc::new(SessionHandle {
            worker_id,
            user_agent,
            proxy,
            browser: Mutex::new(browser),
            driver: PageDriver::new(page),
        });

        let mut sessions = self.sessions.lock().await;
        sessions.insert(worker_id, handle.clone());
        info!("✓ worker {} 会话已创建", worker_id);

        Ok(handle)
    }

    /// 销毁并移除 worker 的会话
    pub async fn release(&self, worker_id: usize) {
        let handle = {
            let mut sessions = self.sessions.lock().await;
            sessions.remove(&worker_id)
        };
        if let Some(handle) = handle {
            handle.teardown().await;
            debug!("worker {} 会话已销毁", worker_id);
        }
    }

    /// 销毁所有剩余会话
    ///
    /// 活动结束或致命错误时调用，可重复调用（幂等）
    pub async fn shutdown(&self) {
        let handles: Vec<(usize, Arc<SessionHandle>)> = {
            let mut sessions = self.sessions.lock().await;
            sessions.drain().collect()
        };
        if handles.is_empty() {
            return;
        }
        info!("🧹 正在关闭 {} 个剩余会话...", handles.len());
        for (worker_id, handle) in handles {
            handle.teardown().await;
            debug!("worker {} 会话已销毁", worker_id);
        }
    }

    /// 当前存活的会话数量
    pub async fn live_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_pool_has_no_sessions() {
        let pool = SessionPool::new(Arc::new(Config::default()));
        assert_eq!(pool.live_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_shutdown_on_empty_pool_is_noop() {
        let pool = SessionPool::new(Arc::new(Config::default()));
        pool.shutdown().await;
        pool.shutdown().await;
        assert_eq!(pool.live_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_release_unknown_worker_is_noop() {
        let pool = SessionPool::new(Arc::new(Config::default()));
        pool.release(42).await;
        assert_eq!(pool.live_sessions().await, 0);
    }
}
