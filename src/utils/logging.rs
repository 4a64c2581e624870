//! 日志工具模块
//!
//! 提供日志初始化和格式化输出的辅助函数

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::CampaignResult;

/// 初始化 tracing 日志
///
/// 日志级别通过 RUST_LOG 环境变量控制，默认 info
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}

/// 记录活动启动信息
pub fn log_campaign_start(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 外链建设活动启动");
    info!("📊 最大并发数: {}", config.max_workers);
    info!("📋 目标类别: {} 个", config.target_categories.len());
    info!("🎯 每类别配额: {}", config.sites_per_category);
    if !config.production_mode {
        info!("💡 当前为演练模式，不会真正点击提交按钮");
    }
    info!("{}", "=".repeat(60));
}

/// 记录类别处理开始
pub fn log_category_start(index: usize, total: usize, name: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 个类别: {}", index, total, name);
    info!("{}", "=".repeat(60));
}

/// 记录类别处理完成（成功/失败为活动累计值）
pub fn log_category_complete(name: &str, found: usize, success: usize, failed: usize) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 类别 {} 完成: 找到 {} 个站点, 累计成功 {}, 累计失败 {}",
        name, found, success, failed
    );
    info!("{}", "─".repeat(60));
}

/// 打印活动最终统计信息
pub fn log_campaign_complete(result: &CampaignResult) {
    info!("\n{}", "=".repeat(60));
    info!("📊 活动完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    if let Some(error) = &result.error {
        info!("❌ 活动失败: {}", error);
    }
    info!("🔍 合格站点: {}", result.quality_sites_found);
    info!("📤 尝试提交: {}", result.submissions_attempted);
    info!("✅ 成功: {}", result.successful_submissions);
    info!("❌ 失败: {}", result.failed_submissions);
    info!("⏱️ 用时: {} 秒", result.duration_seconds);
    info!("{}", "=".repeat(60));
}
