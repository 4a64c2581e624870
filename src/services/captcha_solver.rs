//! 验证码处理服务 - 业务能力层
//!
//! 只负责"检测并解决当前页面验证码"能力，不关心流程

use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::clients::CaptchaClient;
use crate::config::Config;
use crate::infrastructure::PageDriver;

/// 页面上检测到的验证码挑战
///
/// 检测按固定优先级进行：reCAPTCHA → hCaptcha → 图片验证码
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptchaChallenge {
    Recaptcha { site_key: String },
    Hcaptcha { site_key: String },
    Image { src: String },
}

/// 验证码处理服务
///
/// 职责：
/// - 扫描当前页面的已知验证码控件
/// - 调用识别服务并把结果注入页面
/// - 只处理当前页面
/// - 不关心流程顺序
pub struct CaptchaSolver {
    client: Option<CaptchaClient>,
}

impl CaptchaSolver {
    /// 创建新的验证码处理服务
    ///
    /// 未配置识别凭证时 client 为 None，resolve 总是返回 false
    pub fn new(config: &Config) -> Self {
        let client = if config.captcha_api_key.is_empty() {
            None
        } else {
            Some(CaptchaClient::new(
                config.captcha_api_key.clone(),
                config.captcha_api_base_url.clone(),
            ))
        };
        Self { client }
    }

    /// 检测并解决当前页面的验证码
    ///
    /// # 返回
    /// 检测到挑战且注入了识别结果时返回 true。页面上没有已知控件
    /// 不是错误（返回 false）；识别服务失败只记录日志（返回 false），
    /// 调用方照常继续提交流程。
    pub async fn resolve(&self, driver: &PageDriver) -> bool {
        let detection = match driver.eval(DETECTION_SCRIPT).await {
            Ok(value) => value,
            Err(e) => {
                warn!("扫描验证码控件失败: {}", e);
                return false;
            }
        };

        let challenge = match parse_detection(&detection) {
            Some(challenge) => challenge,
            None => {
                debug!("页面上没有已知验证码控件");
                return false;
            }
        };

        let client = match &self.client {
            Some(client) => client,
            None => {
                warn!("检测到验证码但未配置识别凭证，跳过");
                return false;
            }
        };

        let page_url = driver.current_url().await.unwrap_or_default();

        match challenge {
            CaptchaChallenge::Recaptcha { site_key } => {
                info!("🔐 检测到 reCAPTCHA (site key: {})", site_key);
                match client.solve_recaptcha(&site_key, &page_url).await {
                    Ok(token) => self.inject_token(driver, "g-recaptcha-response", &token).await,
                    Err(e) => {
                        warn!("reCAPTCHA 识别失败: {}", e);
                        false
                    }
                }
            }
            CaptchaChallenge::Hcaptcha { site_key } => {
                info!("🔐 检测到 hCaptcha (site key: {})", site_key);
                match client.solve_hcaptcha(&site_key, &page_url).await {
                    Ok(token) => self.inject_token(driver, "h-captcha-response", &token).await,
                    Err(e) => {
                        warn!("hCaptcha 识别失败: {}", e);
                        false
                    }
                }
            }
            CaptchaChallenge::Image { src } => {
                info!("🔐 检测到图片验证码: {}", src);
                match client.solve_image_url(&src).await {
                    Ok(text) => self.inject_image_answer(driver, &text).await,
                    Err(e) => {
                        warn!("图片验证码识别失败: {}", e);
                        false
                    }
                }
            }
        }
    }

    /// 把 token 注入响应字段（textarea 的 innerHTML 和 value 都要设置）
    async fn inject_token(&self, driver: &PageDriver, field_name: &str, token: &str) -> bool {
        let js_code = format!(
            r#"
            (() => {{
                const token = {};
                const fields = document.querySelectorAll(
                    '#{field}, textarea[name="{field}"]'
                );
                let injected = false;
                for (const field of fields) {{
                    field.style.display = 'block';
                    field.innerHTML = token;
                    field.value = token;
                    field.style.display = 'none';
                    injected = true;
                }}
                return injected;
            }})()
            "#,
            serde_json::to_string(token).unwrap_or_default(),
            field = field_name,
        );

        match driver.eval_as::<bool>(js_code).await {
            Ok(true) => {
                info!("✓ 验证码 token 已注入");
                true
            }
            Ok(false) => {
                warn!("未找到 {} 响应字段", field_name);
                false
            }
            Err(e) => {
                warn!("注入验证码 token 失败: {}", e);
                false
            }
        }
    }

    /// 把图片验证码答案填入输入框
    async fn inject_image_answer(&self, driver: &PageDriver, text: &str) -> bool {
        let filled = driver
            .fill_first(
                &[
                    "input[name*='captcha']",
                    "input[id*='captcha']",
                    "input[class*='captcha']",
                ],
                text,
            )
            .await;

        match filled {
            Ok(true) => {
                info!("✓ 图片验证码答案已填入");
                true
            }
            Ok(false) => {
                warn!("未找到图片验证码输入框");
                false
            }
            Err(e) => {
                warn!("填入图片验证码答案失败: {}", e);
                false
            }
        }
    }
}

/// 验证码控件扫描脚本
///
/// 按优先级返回第一个命中的控件信息
const DETECTION_SCRIPT: &str = r#"
    (() => {
        const recaptcha = document.querySelector('.g-recaptcha[data-sitekey], [data-sitekey].g-recaptcha');
        if (recaptcha) {
            return { kind: 'recaptcha', siteKey: recaptcha.getAttribute('data-sitekey') };
        }
        const hcaptcha = document.querySelector('.h-captcha[data-sitekey]');
        if (hcaptcha) {
            return { kind: 'hcaptcha', siteKey: hcaptcha.getAttribute('data-sitekey') };
        }
        const image = document.querySelector(
            "img[src*='captcha'], img[class*='captcha'], img[id*='captcha']"
        );
        if (image && image.src) {
            return { kind: 'image', src: image.src };
        }
        return null;
    })()
"#;

/// 解析扫描脚本的返回值
pub(crate) fn parse_detection(value: &JsonValue) -> Option<CaptchaChallenge> {
    let kind = value.get("kind")?.as_str()?;
    match kind {
        "recaptcha" => {
            let site_key = value.get("siteKey")?.as_str()?.to_string();
            (!site_key.is_empty()).then_some(CaptchaChallenge::Recaptcha { site_key })
        }
        "hcaptcha" => {
            let site_key = value.get("siteKey")?.as_str()?.to_string();
            (!site_key.is_empty()).then_some(CaptchaChallenge::Hcaptcha { site_key })
        }
        "image" => {
            let src = value.get("src")?.as_str()?.to_string();
            (!src.is_empty()).then_some(CaptchaChallenge::Image { src })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_detection_recaptcha() {
        let value = serde_json::json!({ "kind": "recaptcha", "siteKey": "abc123" });
        assert_eq!(
            parse_detection(&value),
            Some(CaptchaChallenge::Recaptcha {
                site_key: "abc123".to_string()
            })
        );
    }

    #[test]
    fn test_parse_detection_image() {
        let value = serde_json::json!({ "kind": "image", "src": "https://x.example/c.png" });
        assert_eq!(
            parse_detection(&value),
            Some(CaptchaChallenge::Image {
                src: "https://x.example/c.png".to_string()
            })
        );
    }

    #[test]
    fn test_parse_detection_none() {
        assert_eq!(parse_detection(&serde_json::Value::Null), None);
        let unknown = serde_json::json!({ "kind": "funcaptcha", "siteKey": "x" });
        assert_eq!(parse_detection(&unknown), None);
    }

    #[test]
    fn test_parse_detection_empty_site_key() {
        let value = serde_json::json!({ "kind": "recaptcha", "siteKey": "" });
        assert_eq!(parse_detection(&value), None);
    }

    #[test]
    fn test_resolve_without_credential_is_noop_client() {
        let config = Config::default();
        let solver = CaptchaSolver::new(&config);
        assert!(solver.client.is_none());
    }
}
