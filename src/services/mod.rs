pub mod captcha_solver;
pub mod content_generator;
pub mod quality_filter;
pub mod site_discovery;

pub use captcha_solver::CaptchaSolver;
pub use content_generator::ContentGenerator;
pub use quality_filter::QualityFilter;
pub use site_discovery::SiteDiscovery;
