//! 内容选择与生成服务 - 业务能力层
//!
//! 只负责"挑选推广站点 + 生成一段提交内容"能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 未配置 LLM 凭证时退化为确定性模板生成
//!
//! ## 不变式
//! 生成的内容总是至少包含一次选中站点的 URL（以超链接形式）。
//! 生成失败绝不会中止提交流程。

use std::sync::Arc;

use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{Category, PageContext, PromotionalSite};
use crate::utils::text::split_sentences;

/// 附加到提示词里的页面上下文长度上限
const CONTEXT_SAMPLE_CHARS: usize = 500;

/// LLM 系统提示词
const SYSTEM_PROMPT: &str = "You are an expert in real estate, travel, and expatriate living. \
     Write helpful, natural-sounding content that subtly incorporates links without appearing \
     promotional. The links should feel like genuine resources rather than advertisements.";

/// 内容选择与生成服务
///
/// 职责：
/// - 按主题相关度挑选推广站点
/// - 生成一段适配类别的提交内容
/// - 只处理单次提交
/// - 不出现 Vec<目标页面>
/// - 不关心流程顺序
pub struct ContentGenerator {
    roster: Arc<Vec<PromotionalSite>>,
    llm: Option<Client<OpenAIConfig>>,
    model_name: String,
    link_range: (u32, u32),
}

impl ContentGenerator {
    /// 创建新的内容生成服务
    pub fn new(config: &Config, roster: Arc<Vec<PromotionalSite>>) -> Self {
        let llm = if config.llm_api_key.is_empty() {
            None
        } else {
            let openai_config = OpenAIConfig::new()
                .with_api_key(&config.llm_api_key)
                .with_api_base(&config.llm_api_base_url);
            Some(Client::with_config(openai_config))
        };

        Self {
            roster,
            llm,
            model_name: config.llm_model_name.clone(),
            link_range: config.link_range(),
        }
    }

    /// 按主题相关度挑选推广站点
    ///
    /// 评分 = 主题词与站点关键词的重叠数 + 随机扰动（0~0.5，避免同类
    /// 主题总是命中同一个站点），取最高分。没有主题时均匀随机挑选。
    /// 清单非空时总会返回 Some。
    pub fn select_site(&self, topic: Option<&str>) -> Option<&PromotionalSite> {
        if self.roster.is_empty() {
            return None;
        }

        let mut rng = rand::rng();

        let topic = match topic {
            Some(t) if !t.trim().is_empty() => t,
            _ => return self.roster.choose(&mut rng),
        };

        let topic_tokens: Vec<String> = topic
            .to_lowercase()
            .split_whitespace()
            .map(|t| t.to_string())
            .collect();

        let mut best: Option<(&PromotionalSite, f64)> = None;
        for site in self.roster.iter() {
            let overlap = site
                .keywords
                .iter()
                .filter(|k| {
                    let k = k.to_lowercase();
                    topic_tokens.iter().any(|t| k.contains(t.as_str()))
                })
                .count() as f64;
            let score = overlap + rng.random_range(0.0..0.5);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((site, score));
            }
        }

        best.map(|(site, _)| site)
    }

    /// 生成提交内容
    ///
    /// 配置了 LLM 凭证时走模型生成，失败（或返回空）时退化为模板；
    /// 两条路径的产物都会经过 `ensure_link` 保证包含站点链接。
    pub async fn generate(
        &self,
        category: Category,
        ctx: &PageContext,
        site: &PromotionalSite,
    ) -> String {
        let link_count = {
            let mut rng = rand::rng();
            rng.random_range(self.link_range.0..=self.link_range.1)
        };

        if let Some(client) = &self.llm {
            match self
                .generate_llm(client, category, ctx, site, link_count)
                .await
            {
                Ok(text) if !text.trim().is_empty() => {
                    return self.ensure_link(text, site);
                }
                Ok(_) => warn!("LLM 返回空内容，退化为模板生成"),
                Err(e) => warn!("LLM 生成失败，退化为模板生成: {}", e),
            }
        }

        let text = self.generate_template(category, ctx, site);
        self.ensure_link(text, site)
    }

    /// 通过 LLM 生成内容
    async fn generate_llm(
        &self,
        client: &Client<OpenAIConfig>,
        category: Category,
        ctx: &PageContext,
        site: &PromotionalSite,
        link_count: u32,
    ) -> Result<String> {
        let user_prompt = build_prompt(category, ctx, site, link_count);
        debug!("调用 LLM API，模型: {}", self.model_name);

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(SYSTEM_PROMPT)
            .build()?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_prompt)
            .build()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(0.7)
            .max_tokens(1024u32)
            .build()?;

        let response = client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            anyhow::anyhow!("LLM API 调用失败: {}", e)
        })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow::anyhow!("LLM 返回内容为空"))?;

        Ok(content.trim().to_string())
    }

    /// 通过模板生成内容（确定性回退路径）
    fn generate_template(
        &self,
        category: Category,
        ctx: &PageContext,
        site: &PromotionalSite,
    ) -> String {
        let templates = category_templates(category);
        let template = {
            let mut rng = rand::rng();
            templates
                .choose(&mut rng)
                .copied()
                .unwrap_or(templates[0])
        };

        let topic = match ctx.topic.as_deref() {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => "real estate investment and living abroad".to_string(),
        };
        let question_text = ctx
            .question
            .clone()
            .unwrap_or_else(|| "this topic".to_string());

        template
            .replace("{topic}", &topic)
            .replace("{site_url}", &site.url)
            .replace("{site_desc}", &site.description)
            .replace("{site_keywords}", &site.sample_keywords(3))
            .replace("{question_text}", &question_text)
    }

    /// 保证内容包含站点链接（不变式兜底）
    ///
    /// 内容里已有 URL 时原样返回；否则在随机句子边界插入一条
    /// 带变化锚文本的超链接
    fn ensure_link(&self, content: String, site: &PromotionalSite) -> String {
        if content.contains(&site.url) {
            return content;
        }

        let mut rng = rand::rng();

        let anchor_text = {
            let mut options: Vec<&str> = vec![
                site.name.as_str(),
                "this resource",
                "this helpful site",
                "this guide",
                "more information here",
            ];
            if let Some(keyword) = site.keywords.choose(&mut rng) {
                options.push(keyword.as_str());
            }
            options.choose(&mut rng).copied().unwrap_or("this resource")
        };
        let html_link = format!("<a href=\"{}\">{}</a>", site.url, anchor_text);

        let mut sentences = split_sentences(&content);
        if sentences.len() > 2 {
            let insert_position = rng.random_range(1..sentences.len() - 1);
            let sentence = &mut sentences[insert_position];
            if sentence.contains(anchor_text) {
                *sentence = sentence.replacen(anchor_text, &html_link, 1);
            } else {
                sentence.push_str(&format!(" You can find {} for more details.", html_link));
            }
            sentences.join(" ")
        } else {
            format!("{} For more information, check out {}.", content, html_link)
        }
    }
}

/// 构建类别定制的 LLM 用户提示词
fn build_prompt(
    category: Category,
    ctx: &PageContext,
    site: &PromotionalSite,
    link_count: u32,
) -> String {
    let topic = match ctx.topic.as_deref() {
        Some(t) if !t.is_empty() => t,
        _ => "living abroad or real estate investment",
    };

    let mut prompt = match category {
        Category::Forum => format!(
            "Write a helpful, informative forum post about {topic}. \
             Make it sound natural and conversational, not promotional. \
             Incorporate {link_count} natural reference(s) to {url} which specializes in {desc} \
             Do not use obvious promotional language. Make the link relevant to the discussion. \
             Response should be 3-4 paragraphs and include a question at the end to encourage replies.",
            topic = topic,
            link_count = link_count,
            url = site.url,
            desc = site.description,
        ),
        Category::Blog => format!(
            "Write a thoughtful blog comment about {topic}. \
             Be insightful and add value to the article. \
             Naturally incorporate {link_count} reference(s) to {url} which offers {desc} \
             Avoid obvious promotional language. Make the links feel helpful in context. \
             Response should be 2-3 paragraphs, conversational but intelligent.",
            topic = topic,
            link_count = link_count,
            url = site.url,
            desc = site.description,
        ),
        Category::QaSite => match &ctx.question {
            Some(question) => format!(
                "Write a detailed, helpful answer to the question: \"{question}\" \
                 Be informative and thorough. \
                 Naturally incorporate {link_count} reference(s) to {url} which provides {desc} \
                 Make the link(s) genuinely helpful to someone with this question. \
                 Avoid promotional language. \
                 Response should be comprehensive yet concise, about 3-4 paragraphs.",
                question = question,
                link_count = link_count,
                url = site.url,
                desc = site.description,
            ),
            None => format!(
                "Write a detailed answer about {topic}. Be informative and thorough. \
                 Naturally incorporate {link_count} reference(s) to {url} which provides {desc} \
                 Make the link(s) genuinely helpful. Avoid promotional language. \
                 Response should be comprehensive yet concise, about 3-4 paragraphs.",
                topic = topic,
                link_count = link_count,
                url = site.url,
                desc = site.description,
            ),
        },
        Category::CommentSection => format!(
            "Write an insightful comment for an article about {topic}. \
             Be thoughtful and add to the discussion. \
             Subtly incorporate {link_count} reference(s) to {url} which focuses on {desc} \
             Make the comment primarily valuable, with the link appearing natural and helpful. \
             Response should be 2 paragraphs, intelligent but conversational.",
            topic = topic,
            link_count = link_count,
            url = site.url,
            desc = site.description,
        ),
        Category::Directory | Category::Wiki | Category::SocialBookmark => format!(
            "Write helpful content about {topic}. \
             Naturally incorporate {link_count} reference(s) to {url} which specializes in {desc} \
             Avoid obvious promotional language. Make the content helpful and the links \
             contextually relevant. Response should be 2-3 paragraphs, informative and well-written.",
            topic = topic,
            link_count = link_count,
            url = site.url,
            desc = site.description,
        ),
    };

    if !ctx.text.is_empty() {
        let sample: String = ctx.text.chars().take(CONTEXT_SAMPLE_CHARS).collect();
        let ellipsis = if ctx.text.chars().count() > CONTEXT_SAMPLE_CHARS {
            "..."
        } else {
            ""
        };
        prompt.push_str(&format!(
            "\n\nContext from the page: \"{}{}\"",
            sample, ellipsis
        ));
    }

    prompt
}

/// 类别对应的模板组
fn category_templates(category: Category) -> &'static [&'static str] {
    match category {
        Category::Forum => &[
            "I've been researching {topic} extensively lately. One aspect that really stood out \
             to me was how {site_desc} I found {site_url} to be particularly helpful for \
             understanding this better. Has anyone else had experience with this? What were your \
             findings?",
            "Recently moved abroad and been dealing with {topic}. It's been quite the journey! \
             For anyone interested, {site_url} has some really useful information about \
             {site_keywords}. What's everyone else's experience been like?",
            "Question for the community about {topic} - has anyone found good resources for \
             this? After some research, I came across {site_url} which covers {site_desc} in \
             detail. Curious if others have recommendations too?",
        ],
        Category::Blog => &[
            "Really enjoyed this post about {topic}! It reminds me of some research I was doing \
             recently. For anyone interested in going deeper on this subject, {site_url} has \
             some complementary information about {site_keywords}. Thanks for sharing your \
             insights!",
            "Great article! I've been dealing with {topic} myself recently. Found that \
             {site_url} offers some practical advice on {site_desc} that complements what \
             you've written here. Looking forward to more content like this!",
            "This is exactly what I needed to read today. I've been working on {topic} and \
             found the information at {site_url} about {site_keywords} to be really helpful \
             alongside your insights. Thanks for putting this together!",
        ],
        Category::QaSite => &[
            "Based on my experience with {topic}, there are several approaches you could take. \
             First, consider how {site_desc} You can find more detailed guidance at {site_url} \
             which covers this extensively. Hope this helps!",
            "To answer your question about {question_text}: The key thing to understand is how \
             {site_desc} There's a comprehensive guide at {site_url} that I found really \
             clarified the process. Let me know if you need any clarification!",
            "Having dealt with {topic} myself, I'd recommend first looking into how \
             {site_keywords} work together. {site_url} has some excellent resources that walk \
             through this step by step.",
        ],
        Category::CommentSection => &[
            "This article raises some interesting points about {topic}. From my experience, \
             understanding {site_desc} can add valuable context. I found some helpful insights \
             on this at {site_url}. Thanks for starting this discussion!",
            "Really appreciate this perspective on {topic}. It connects well with some research \
             I was reading about {site_keywords} recently. For anyone interested in exploring \
             this further, {site_url} offers some complementary information.",
            "Fascinating read! I've been following developments in {topic} for a while. The \
             relationship between this and {site_desc} is particularly interesting. There's \
             some good analysis of this connection at {site_url}.",
        ],
        Category::Directory | Category::Wiki | Category::SocialBookmark => &[
            "I've found {topic} to be increasingly important lately. Understanding how \
             {site_desc} can make a significant difference. {site_url} offers some valuable \
             resources on this that I've found helpful.",
            "When dealing with {topic}, it's worth considering how {site_keywords} factor into \
             the equation. There's a helpful overview at {site_url} that covers {site_desc} in \
             detail.",
            "For anyone interested in {topic}, I would recommend exploring how {site_desc} You \
             can find more information at {site_url} which I've found to be a reliable \
             resource.",
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::default_roster;

    fn generator_without_llm() -> ContentGenerator {
        let mut config = Config::default();
        config.llm_api_key = String::new();
        ContentGenerator::new(&config, Arc::new(default_roster()))
    }

    #[test]
    fn test_select_site_empty_topic_returns_entry() {
        let generator = generator_without_llm();
        assert!(generator.select_site(None).is_some());
        assert!(generator.select_site(Some("")).is_some());
        assert!(generator.select_site(Some("   ")).is_some());
    }

    #[test]
    fn test_select_site_prefers_keyword_overlap() {
        let generator = generator_without_llm();
        // 随机扰动上限 0.5，压不过 3 个关键词的重叠优势
        let site = generator
            .select_site(Some("cryptocurrency bitcoin blockchain"))
            .unwrap();
        assert_eq!(site.url, "https://cryptoapartments.com");
    }

    #[test]
    fn test_select_site_empty_roster_returns_none() {
        let config = Config::default();
        let generator = ContentGenerator::new(&config, Arc::new(Vec::new()));
        assert!(generator.select_site(Some("anything")).is_none());
    }

    #[tokio::test]
    async fn test_generate_without_llm_contains_url() {
        let generator = generator_without_llm();
        let roster = default_roster();
        let ctx = PageContext::from_text("Property investment discussion thread.".to_string(), None);

        for category in Category::ALL {
            let content = generator.generate(category, &ctx, &roster[0]).await;
            assert!(
                content.contains(&roster[0].url),
                "类别 {} 生成的内容缺少站点链接: {}",
                category,
                content
            );
        }
    }

    #[tokio::test]
    async fn test_generate_leaves_no_placeholders() {
        let generator = generator_without_llm();
        let roster = default_roster();
        let ctx = PageContext::from_text(String::new(), None);
        let content = generator.generate(Category::Forum, &ctx, &roster[1]).await;
        for placeholder in ["{topic}", "{site_url}", "{site_desc}", "{site_keywords}"] {
            assert!(!content.contains(placeholder), "残留占位符: {}", placeholder);
        }
    }

    #[test]
    fn test_ensure_link_inserts_when_missing() {
        let generator = generator_without_llm();
        let roster = default_roster();
        let content = "First sentence here. Second sentence follows. Third one too. Fourth ends."
            .to_string();
        let fixed = generator.ensure_link(content, &roster[2]);
        assert!(fixed.contains(&roster[2].url));
        assert!(fixed.contains("<a href="));
    }

    #[test]
    fn test_ensure_link_keeps_existing() {
        let generator = generator_without_llm();
        let roster = default_roster();
        let content = format!("Check out {} for details.", roster[0].url);
        let fixed = generator.ensure_link(content.clone(), &roster[0]);
        assert_eq!(fixed, content);
    }

    #[test]
    fn test_qa_prompt_uses_question() {
        let ctx = PageContext::from_text(
            "How do I rent an apartment abroad?".to_string(),
            Some("How do I rent an apartment abroad?".to_string()),
        );
        let roster = default_roster();
        let prompt = build_prompt(Category::QaSite, &ctx, &roster[0], 1);
        assert!(prompt.contains("How do I rent an apartment abroad?"));
    }
}
