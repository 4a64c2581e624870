use std::path::Path;

use anyhow::Result;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// 反检测脚本：在每个新文档注入，抹掉 webdriver 痕迹
const STEALTH_SCRIPT: &str = r#"
    Object.defineProperty(navigator, 'webdriver', {
        get: () => undefined
    });
    window.chrome = window.chrome || { runtime: {} };
"#;

/// 查找可用的 Chromium 系浏览器可执行文件
///
/// 查找顺序：
/// 1. CHROME_EXECUTABLE 环境变量
/// 2. 常见安装路径
///
/// 都找不到时返回 None，交给 chromiumoxide 自行探测
pub fn find_chrome_executable() -> Option<String> {
    if let Ok(p) = std::env::var("CHROME_EXECUTABLE") {
        if Path::new(&p).exists() {
            return Some(p);
        }
    }

    let candidates = [
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/usr/local/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
    ];
    for c in candidates {
        if Path::new(c).exists() {
            return Some(c.to_string());
        }
    }

    None
}

/// 启动无头浏览器并创建空白页面
///
/// # 参数
/// - `user_agent`: 本会话使用的 User-Agent
/// - `proxy`: 可选代理地址
///
/// # 返回
/// 返回 (Browser, Page)，page 已注入反检测脚本
pub async fn launch_headless_browser(
    user_agent: &str,
    proxy: Option<&str>,
) -> Result<(Browser, Page)> {
    info!("🚀 启动无头浏览器...");
    debug!("User-Agent: {}", user_agent);

    let mut args = vec![
        "--disable-gpu".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-blink-features=AutomationControlled".to_string(),
        format!("--user-agent={}", user_agent),
    ];
    if let Some(proxy) = proxy {
        debug!("使用代理: {}", proxy);
        args.push(format!("--proxy-server={}", proxy));
    }

    // 配置无头浏览器
    let mut builder = BrowserConfig::builder().new_headless_mode().args(args);
    if let Some(executable) = find_chrome_executable() {
        debug!("浏览器可执行文件: {}", executable);
        builder = builder.chrome_executable(Path::new(&executable));
    }
    let config = builder.build().map_err(|e| {
        error!("配置无头浏览器失败: {}", e);
        anyhow::anyhow!("配置无头浏览器失败: {}", e)
    })?;

    // 启动浏览器
    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动无头浏览器失败: {}", e);
        anyhow::anyhow!("启动无头浏览器失败: {}", e)
    })?;
    debug!("无头浏览器启动成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    // 创建空白页面
    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建页面失败: {}", e);
        anyhow::anyhow!("创建页面失败: {}", e)
    })?;

    // 注入反检测脚本
    page.evaluate_on_new_document(STEALTH_SCRIPT)
        .await
        .map_err(|e| {
            error!("注入反检测脚本失败: {}", e);
            anyhow::anyhow!("注入反检测脚本失败: {}", e)
        })?;

    info!("✅ 无头浏览器就绪");

    Ok((browser, page))
}
