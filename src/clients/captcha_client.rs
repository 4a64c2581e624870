//! 验证码识别 API 客户端
//!
//! 封装所有与识别服务（2Captcha 风格 in/res 轮询接口）相关的调用逻辑

use std::time::Duration;

use base64::Engine;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tokio::time::sleep;
use tracing::debug;

/// 轮询间隔
const POLL_INTERVAL: Duration = Duration::from_secs(5);
/// 最大轮询次数（约两分钟）
const MAX_POLLS: usize = 24;

/// 验证码客户端错误
#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("验证码请求失败: {0}")]
    Request(#[from] reqwest::Error),
    #[error("验证码服务拒绝: {0}")]
    Rejected(String),
    #[error("等待识别结果超时")]
    Timeout,
}

/// 验证码客户端
pub struct CaptchaClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl CaptchaClient {
    /// 创建新的验证码客户端
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// 识别 reCAPTCHA，返回 g-recaptcha-response token
    pub async fn solve_recaptcha(
        &self,
        site_key: &str,
        page_url: &str,
    ) -> Result<String, CaptchaError> {
        debug!("提交 reCAPTCHA 识别任务: {}", page_url);
        let task_id = self
            .submit(&[
                ("method", "userrecaptcha"),
                ("googlekey", site_key),
                ("pageurl", page_url),
            ])
            .await?;
        self.poll(&task_id).await
    }

    /// 识别 hCaptcha，返回 h-captcha-response token
    pub async fn solve_hcaptcha(
        &self,
        site_key: &str,
        page_url: &str,
    ) -> Result<String, CaptchaError> {
        debug!("提交 hCaptcha 识别任务: {}", page_url);
        let task_id = self
            .submit(&[
                ("method", "hcaptcha"),
                ("sitekey", site_key),
                ("pageurl", page_url),
            ])
            .await?;
        self.poll(&task_id).await
    }

    /// 识别图片验证码（先下载图片再提交），返回识别出的文本
    pub async fn solve_image_url(&self, image_url: &str) -> Result<String, CaptchaError> {
        debug!("下载图片验证码: {}", image_url);
        let bytes = self.http.get(image_url).send().await?.bytes().await?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);

        let task_id = self
            .submit(&[("method", "base64"), ("body", encoded.as_str())])
            .await?;
        self.poll(&task_id).await
    }

    /// 提交识别任务，返回任务 ID
    async fn submit(&self, params: &[(&str, &str)]) -> Result<String, CaptchaError> {
        let endpoint = format!("{}/in.php", self.base_url);
        let mut query: Vec<(&str, &str)> = vec![("key", self.api_key.as_str()), ("json", "1")];
        query.extend_from_slice(params);

        let data: JsonValue = self
            .http
            .post(&endpoint)
            .query(&query)
            .send()
            .await?
            .json()
            .await?;

        parse_response(&data)
    }

    /// 轮询识别结果
    async fn poll(&self, task_id: &str) -> Result<String, CaptchaError> {
        let endpoint = format!("{}/res.php", self.base_url);

        for attempt in 0..MAX_POLLS {
            sleep(POLL_INTERVAL).await;

            let data: JsonValue = self
                .http
                .get(&endpoint)
                .query(&[
                    ("key", self.api_key.as_str()),
                    ("action", "get"),
                    ("id", task_id),
                    ("json", "1"),
                ])
                .send()
                .await?
                .json()
                .await?;

            match parse_response(&data) {
                Ok(token) => {
                    debug!("识别完成 (第 {} 次轮询)", attempt + 1);
                    return Ok(token);
                }
                Err(CaptchaError::Rejected(msg)) if msg == "CAPCHA_NOT_READY" => continue,
                Err(e) => return Err(e),
            }
        }

        Err(CaptchaError::Timeout)
    }
}

/// 解析 in.php / res.php 的 JSON 响应
///
/// 成功时 status 为 1，request 字段是任务 ID 或识别结果
fn parse_response(data: &JsonValue) -> Result<String, CaptchaError> {
    let status = data.get("status").and_then(|v| v.as_u64()).unwrap_or(0);
    let request = data
        .get("request")
        .and_then(|v| v.as_str())
        .unwrap_or_default();

    if status == 1 {
        Ok(request.to_string())
    } else {
        Err(CaptchaError::Rejected(request.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_success() {
        let data = serde_json::json!({ "status": 1, "request": "token123" });
        assert_eq!(parse_response(&data).unwrap(), "token123");
    }

    #[test]
    fn test_parse_response_not_ready() {
        let data = serde_json::json!({ "status": 0, "request": "CAPCHA_NOT_READY" });
        match parse_response(&data) {
            Err(CaptchaError::Rejected(msg)) => assert_eq!(msg, "CAPCHA_NOT_READY"),
            other => panic!("意外结果: {:?}", other),
        }
    }

    #[test]
    fn test_parse_response_malformed() {
        let data = serde_json::json!({});
        assert!(parse_response(&data).is_err());
    }
}
