use crate::utils::text;

/// 页面上下文长度上限（字符）
const MAX_CONTEXT_CHARS: usize = 4000;

/// 页面上下文
///
/// 每次提交前从目标页面提取，内容生成结束后即丢弃
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    /// 页面可见文本（有界长度）
    pub text: String,
    /// 问答页面提取到的问题
    pub question: Option<String>,
    /// 从文本推导的主题（关键词摘要）
    pub topic: Option<String>,
}

impl PageContext {
    /// 从页面文本构建上下文
    pub fn from_text(text: String, question: Option<String>) -> Self {
        let bounded = text::truncate_text(&text, MAX_CONTEXT_CHARS);
        let topic = text::extract_topic(&bounded, 5);
        Self {
            text: bounded,
            question,
            topic,
        }
    }

    /// 主题（缺失时返回空字符串）
    pub fn topic_or_empty(&self) -> &str {
        self.topic.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text_derives_topic() {
        let text = "Property investment yields depend on location. Property investment \
                    requires research into property markets and investment financing."
            .to_string();
        let ctx = PageContext::from_text(text, None);
        let topic = ctx.topic.expect("应该推导出主题");
        assert!(topic.contains("property"));
        assert!(topic.contains("investment"));
    }

    #[test]
    fn test_from_text_bounds_length() {
        let text = "word ".repeat(2000);
        let ctx = PageContext::from_text(text, None);
        assert!(ctx.text.chars().count() <= MAX_CONTEXT_CHARS + 3);
    }

    #[test]
    fn test_empty_text_has_no_topic() {
        let ctx = PageContext::from_text(String::new(), None);
        assert!(ctx.topic.is_none());
    }
}
