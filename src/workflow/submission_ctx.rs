//! 提交处理上下文
//!
//! 封装"我正在向哪个类别的哪个页面提交"这一信息

use std::fmt::Display;

use crate::models::Category;

/// 提交处理上下文
///
/// 包含处理单次提交所需的所有上下文信息
#[derive(Debug, Clone)]
pub struct SubmissionCtx {
    /// 目标页面类别
    pub category: Category,

    /// 目标页面 URL
    pub url: String,

    /// worker 标识（会话池按它分配会话，也用于日志显示）
    pub worker_id: usize,
}

impl SubmissionCtx {
    /// 创建新的提交上下文
    pub fn new(category: Category, url: String, worker_id: usize) -> Self {
        Self {
            category,
            url,
            worker_id,
        }
    }
}

impl Display for SubmissionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[类别#{} 目标#{} worker#{}]",
            self.category.slug(),
            self.url,
            self.worker_id
        )
    }
}
