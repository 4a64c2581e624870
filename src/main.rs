use anyhow::Result;
use link_builder::orchestrator::CampaignRunner;
use link_builder::{load_roster, utils, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    utils::logging::init();

    // 加载配置
    let config = Config::from_env();

    // 加载推广站点清单（文件不存在时使用内置清单）
    let roster = load_roster(&config.roster_file).await;

    // 执行活动
    let runner = CampaignRunner::new(config, roster);
    let result = runner.run().await;

    utils::logging::log_campaign_complete(&result);

    Ok(())
}
