pub mod captcha_client;
pub mod metrics_client;

pub use captcha_client::{CaptchaClient, CaptchaError};
pub use metrics_client::{DomainMetrics, MetricsClient, MetricsError};
