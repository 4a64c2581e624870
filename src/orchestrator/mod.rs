//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责活动级别的调度和资源管理，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `campaign_runner` - 活动执行器
//! - 按顺序遍历目标类别（发现 → 扇出提交 → 汇合）
//! - 控制并发数量（Semaphore，上限取发现数量）
//! - 管理浏览器资源（SessionPool，恰好关停一次）
//! - 维护共享计数器并输出全局统计
//!
//! ### `manager` - 活动生命周期管理器
//! - start / status / results / cancel 四个生命周期操作
//! - 结果只保存在内存里
//!
//! ## 层次关系
//!
//! ```text
//! manager (登记活动，后台执行)
//!     ↓
//! campaign_runner (处理 Vec<Category>)
//!     ↓
//! services::SiteDiscovery (每类别枚举候选 URL)
//!     ↓
//! workflow::SubmissionFlow (处理单次提交)
//!     ↓
//! services (能力层：filter / generate / captcha)
//!     ↓
//! infrastructure (基础设施：SessionPool / PageDriver)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：manager 管生命周期，campaign_runner 管执行
//! 2. **资源隔离**：只有编排层持有 SessionPool
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure
//! 4. **永不外抛**：活动失败通过结果里的错误标记表达

pub mod campaign_runner;
pub mod manager;

// 重新导出主要类型
pub use campaign_runner::CampaignRunner;
pub use manager::CampaignManager;
