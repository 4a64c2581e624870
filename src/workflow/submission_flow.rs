//! 提交处理流程 - 流程层
//!
//! 核心职责：定义"一次提交"的完整处理流程
//!
//! 流程顺序：
//! 1. navigate → 提取页面上下文
//! 2. 挑选推广站点 → 生成内容
//! 3. 按类别策略定位入口 → 填表 → 验证码 → 提交
//! 4. 记录结果
//!
//! 所有定位都通过按优先级排列的匹配器列表完成，匹配失败是常规
//! 结果而不是异常。

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use regex::Regex;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::Config;
use crate::infrastructure::PageDriver;
use crate::models::{Category, PageContext, PromotionalSite, SubmissionOutcome};
use crate::services::{CaptchaSolver, ContentGenerator};
use crate::utils::text::random_string;
use crate::workflow::SubmissionCtx;

/// 页面加载后的静置时间
const PAGE_SETTLE: Duration = Duration::from_secs(2);
/// 点击入口链接后等待表单页加载的时间
const FORM_SETTLE: Duration = Duration::from_secs(3);
/// 页面可见文本提取上限
const PAGE_TEXT_CHARS: usize = 4000;

// ========== 匹配器列表（按优先级顺序） ==========

/// 论坛发帖入口链接文本
const FORUM_ENTRY_PATTERNS: &[&str] = &["new topic", "post reply", "new thread", "reply", "start discussion"];
/// 论坛正文编辑区
const FORUM_BODY_SELECTORS: &[&str] = &[
    "textarea[name*='message']",
    "textarea[id*='message']",
    "textarea[name*='post']",
    "textarea[class*='editor']",
    "div[contenteditable='true']",
];
/// 博客/评论区正文编辑区
const COMMENT_SELECTORS: &[&str] = &[
    "textarea[id*='comment']",
    "textarea[name*='comment']",
    ".comment-form textarea",
    "form[id*='comment'] textarea",
    "div[contenteditable='true'][class*='comment']",
];
/// 问答站点回答编辑区
const ANSWER_SELECTORS: &[&str] = &[
    "textarea[name*='answer']",
    "textarea[id*='answer']",
    ".answer-form textarea",
    "textarea[class*='editor']",
    "div[contenteditable='true']",
];
/// 目录站点提交入口链接文本
const DIRECTORY_ENTRY_PATTERNS: &[&str] = &["submit", "add site", "add url", "add listing", "suggest"];
/// 书签站点提交入口链接文本
const BOOKMARK_ENTRY_PATTERNS: &[&str] = &["submit", "add", "post", "share", "bookmark"];
/// wiki 编辑入口链接文本
const WIKI_ENTRY_PATTERNS: &[&str] = &["edit", "edit page", "modify", "contribute"];
/// wiki 编辑区
const WIKI_EDIT_SELECTORS: &[&str] = &[
    "#wpTextbox1",
    "textarea[class*='editor']",
    "div[contenteditable='true']",
];
/// URL 输入框
const URL_FIELD_SELECTORS: &[&str] = &[
    "input[name*='url']",
    "input[id*='url']",
    "input[name*='website']",
    "input[id*='website']",
    "input[type='url']",
];
/// 标题/名称输入框
const TITLE_FIELD_SELECTORS: &[&str] = &[
    "input[name*='title']",
    "input[id*='title']",
    "input[name*='name']",
    "input[id*='name']",
];
/// 描述输入框
const DESC_FIELD_SELECTORS: &[&str] = &[
    "textarea[name*='desc']",
    "textarea[id*='desc']",
    "textarea[name*='description']",
    "textarea[id*='description']",
];
/// 邮箱输入框
const EMAIL_FIELD_SELECTORS: &[&str] = &["input[name*='email']", "input[id*='email']"];
/// 昵称输入框（评论表单）
const AUTHOR_FIELD_SELECTORS: &[&str] = &[
    "input[id*='author']",
    "input[name*='author']",
    "input[id*='name']",
    "input[name*='name']",
];
/// 标签输入框
const TAGS_FIELD_SELECTORS: &[&str] = &["input[name*='tag']", "input[id*='tag']"];
/// 分类下拉框
const CATEGORY_SELECT_SELECTORS: &[&str] = &["select[name*='category']", "select[id*='category']"];
/// 分类下拉框里优先匹配的关键词
const CATEGORY_OPTION_KEYWORDS: &[&str] = &[
    "real estate",
    "property",
    "travel",
    "housing",
    "accommodation",
    "investment",
];

/// 提交处理流程
///
/// - 编排完整的提交处理流程
/// - 决定何时生成内容、何时处理验证码、何时提交
/// - 不持有任何资源（会话）
/// - 只依赖业务能力（services）
pub struct SubmissionFlow {
    generator: ContentGenerator,
    captcha: CaptchaSolver,
    production_mode: bool,
}

impl SubmissionFlow {
    /// 创建新的提交处理流程
    pub fn new(config: &Config, roster: Arc<Vec<PromotionalSite>>) -> Self {
        Self {
            generator: ContentGenerator::new(config, roster),
            captcha: CaptchaSolver::new(config),
            production_mode: config.production_mode,
        }
    }

    /// 执行一次完整的提交
    ///
    /// 任何内部错误都会被降级为失败结果，绝不向上抛出
    pub async fn run(&self, driver: &PageDriver, ctx: &SubmissionCtx) -> SubmissionOutcome {
        let category = ctx.category;
        let url = ctx.url.as_str();

        info!("[worker {}] 🌐 正在打开 {}", ctx.worker_id, url);
        if let Err(e) = driver.goto(url).await {
            warn!("[worker {}] 导航到 {} 失败: {}", ctx.worker_id, url, e);
            return SubmissionOutcome::failure(category, url, format!("导航失败: {}", e));
        }
        sleep(PAGE_SETTLE).await;

        // 提取页面上下文
        let page_ctx = self.extract_page_context(driver, category).await;

        // 挑选推广站点并生成内容
        let site = match self.generator.select_site(page_ctx.topic.as_deref()) {
            Some(site) => site.clone(),
            None => {
                return SubmissionOutcome::failure(category, url, "推广站点清单为空");
            }
        };
        let content = self.generator.generate(category, &page_ctx, &site).await;
        info!(
            "[worker {}] ✍️ 已为 {} 生成内容 ({} 字符)",
            ctx.worker_id,
            site.name,
            content.len()
        );

        // 按类别策略执行
        let submitted = match category {
            Category::Forum => self.submit_to_forum(driver, &site, &content).await,
            Category::Blog => self.submit_to_blog(driver, &site, &content).await,
            Category::QaSite => self.submit_to_qa_site(driver, &content).await,
            Category::Directory => self.submit_to_directory(driver, &site).await,
            Category::Wiki => self.submit_to_wiki(driver, &site, &content).await,
            Category::SocialBookmark => self.submit_to_social_bookmark(driver, &site).await,
            Category::CommentSection => self.submit_to_comment_section(driver, &site, &content).await,
        };

        match submitted {
            Ok(true) => {
                info!("[worker {}] ✅ {} 提交流程完成", ctx.worker_id, url);
                SubmissionOutcome::success(category, url)
            }
            Ok(false) => {
                warn!("[worker {}] ⚠️ 在 {} 上未找到合适的提交入口", ctx.worker_id, url);
                SubmissionOutcome::failure(category, url, "未找到合适的提交入口")
            }
            Err(e) => {
                warn!("[worker {}] ⚠️ {} 提交流程出错: {}", ctx.worker_id, url, e);
                SubmissionOutcome::failure(category, url, format!("提交流程出错: {}", e))
            }
        }
    }

    /// 提取页面上下文（问答页面额外提取问题）
    async fn extract_page_context(&self, driver: &PageDriver, category: Category) -> PageContext {
        let text = driver
            .visible_text(PAGE_TEXT_CHARS)
            .await
            .unwrap_or_default();
        let question = if category == Category::QaSite {
            self.extract_question(driver).await
        } else {
            None
        };
        PageContext::from_text(text, question)
    }

    /// 从问答页面提取问题文本
    async fn extract_question(&self, driver: &PageDriver) -> Option<String> {
        let js_code = r#"
            (() => {
                const candidates = document.querySelectorAll(
                    'h1, .question-title, .question h1, [itemprop="name"]'
                );
                for (const el of candidates) {
                    const text = (el.textContent || '').trim();
                    if (text.includes('?')) {
                        return text;
                    }
                }
                const title = (document.title || '').trim();
                return title.includes('?') ? title : null;
            })()
        "#;
        match driver.eval(js_code).await {
            Ok(value) => value.as_str().map(|s| s.to_string()),
            Err(_) => None,
        }
    }

    // ========== 类别策略 ==========

    /// 论坛：发新帖或回帖
    async fn submit_to_forum(
        &self,
        driver: &PageDriver,
        site: &PromotionalSite,
        content: &str,
    ) -> Result<bool> {
        if driver.click_link_by_text(FORUM_ENTRY_PATTERNS).await? {
            sleep(FORM_SETTLE).await;
        }

        // 登录墙：正文编辑区不存在但有密码框时，尝试一次性身份登录
        if !driver.exists("textarea").await.unwrap_or(false)
            && driver.exists("input[type='password']").await.unwrap_or(false)
        {
            self.best_effort_login(driver).await;
        }

        let body_found = driver.fill_first(FORUM_BODY_SELECTORS, content).await?;
        if !body_found {
            return Ok(false);
        }

        // 标题字段是可选的
        let title = format!(
            "Looking for insights on {}",
            site.keywords.first().map(String::as_str).unwrap_or("this")
        );
        let _ = driver.fill_first(TITLE_FIELD_SELECTORS, &title).await;

        self.captcha.resolve(driver).await;

        self.activate_submit(driver, &["post", "reply", "submit"]).await
    }

    /// 博客：发表评论
    async fn submit_to_blog(
        &self,
        driver: &PageDriver,
        site: &PromotionalSite,
        content: &str,
    ) -> Result<bool> {
        let body_found = driver.fill_first(COMMENT_SELECTORS, content).await?;
        if !body_found {
            return Ok(false);
        }

        self.fill_commenter_identity(driver, site).await;
        self.captcha.resolve(driver).await;

        self.activate_submit(driver, &["post", "submit", "comment"]).await
    }

    /// 问答站点：提交回答
    async fn submit_to_qa_site(&self, driver: &PageDriver, content: &str) -> Result<bool> {
        let body_found = driver.fill_first(ANSWER_SELECTORS, content).await?;
        if !body_found {
            return Ok(false);
        }

        self.captcha.resolve(driver).await;

        self.activate_submit(driver, &["post", "answer", "submit"]).await
    }

    /// 目录站点：提交站点收录
    async fn submit_to_directory(
        &self,
        driver: &PageDriver,
        site: &PromotionalSite,
    ) -> Result<bool> {
        if driver.click_link_by_text(DIRECTORY_ENTRY_PATTERNS).await? {
            sleep(FORM_SETTLE).await;
        }

        // URL 字段是目录提交的必要入口
        let url_found = driver.fill_first(URL_FIELD_SELECTORS, &site.url).await?;
        if !url_found {
            return Ok(false);
        }

        let _ = driver.fill_first(TITLE_FIELD_SELECTORS, &site.name).await;
        let _ = driver
            .fill_first(DESC_FIELD_SELECTORS, &site.description)
            .await;
        let _ = driver
            .select_option_containing(CATEGORY_SELECT_SELECTORS, CATEGORY_OPTION_KEYWORDS)
            .await;
        let email = format!("contact{}@example.com", random_string(6));
        let _ = driver.fill_first(EMAIL_FIELD_SELECTORS, &email).await;

        self.captcha.resolve(driver).await;

        self.activate_submit(driver, &["submit", "add"]).await
    }

    /// wiki 站点：编辑页面追加内容
    async fn submit_to_wiki(
        &self,
        driver: &PageDriver,
        site: &PromotionalSite,
        content: &str,
    ) -> Result<bool> {
        if driver.click_link_by_text(WIKI_ENTRY_PATTERNS).await? {
            sleep(FORM_SETTLE).await;
        }

        // wiki 编辑要在现有文本基础上插入，而不是整页覆盖
        let edit_found = match driver.value_of_first(WIKI_EDIT_SELECTORS).await? {
            Some(existing) => {
                let merged = insert_into_wiki_section(&existing, content, &site.keywords);
                driver.fill_first(WIKI_EDIT_SELECTORS, &merged).await?
            }
            None => false,
        };
        if !edit_found {
            return Ok(false);
        }

        let summary = format!(
            "Added information about {}",
            site.keywords.first().map(String::as_str).unwrap_or("the topic")
        );
        let _ = driver
            .fill_first(
                &[
                    "input[id*='summary']",
                    "input[name*='summary']",
                    "input[id*='comment']",
                    "input[name*='comment']",
                ],
                &summary,
            )
            .await;

        self.captcha.resolve(driver).await;

        self.activate_submit(driver, &["save", "submit", "publish"]).await
    }

    /// 社会化书签：提交链接
    async fn submit_to_social_bookmark(
        &self,
        driver: &PageDriver,
        site: &PromotionalSite,
    ) -> Result<bool> {
        if driver.click_link_by_text(BOOKMARK_ENTRY_PATTERNS).await? {
            sleep(FORM_SETTLE).await;
        }

        let url_found = driver.fill_first(URL_FIELD_SELECTORS, &site.url).await?;
        if !url_found {
            return Ok(false);
        }

        let _ = driver.fill_first(TITLE_FIELD_SELECTORS, &site.name).await;
        let _ = driver
            .fill_first(DESC_FIELD_SELECTORS, &site.description)
            .await;
        let _ = driver
            .fill_first(TAGS_FIELD_SELECTORS, &site.sample_keywords(5))
            .await;

        self.captcha.resolve(driver).await;

        self.activate_submit(driver, &["submit", "save", "add"]).await
    }

    /// 评论区：发表评论
    async fn submit_to_comment_section(
        &self,
        driver: &PageDriver,
        site: &PromotionalSite,
        content: &str,
    ) -> Result<bool> {
        let body_found = driver.fill_first(COMMENT_SELECTORS, content).await?;
        if !body_found {
            return Ok(false);
        }

        self.fill_commenter_identity(driver, site).await;
        self.captcha.resolve(driver).await;

        self.activate_submit(driver, &["post", "submit", "comment"]).await
    }

    // ========== 共享辅助方法 ==========

    /// 填写评论者身份（昵称/邮箱/网址，缺失的字段静默跳过）
    async fn fill_commenter_identity(&self, driver: &PageDriver, site: &PromotionalSite) {
        let name = format!("User {}", random_string(6));
        let email = format!("{}@example.com", name.replace(' ', "").to_lowercase());

        let _ = driver.fill_first(AUTHOR_FIELD_SELECTORS, &name).await;
        let _ = driver.fill_first(EMAIL_FIELD_SELECTORS, &email).await;
        let _ = driver.fill_first(URL_FIELD_SELECTORS, &site.url).await;
    }

    /// 一次性身份登录（尽力而为，失败不影响后续流程）
    async fn best_effort_login(&self, driver: &PageDriver) {
        info!("检测到登录墙，尝试一次性身份登录");

        let username = format!("user{}", random_string(6));
        let password = random_string(12);

        let _ = driver
            .fill_first(
                &[
                    "input[name*='user']",
                    "input[id*='user']",
                    "input[name*='login']",
                    "input[type='email']",
                ],
                &username,
            )
            .await;
        let _ = driver
            .fill_first(&["input[type='password']"], &password)
            .await;
        let _ = driver
            .click_first(&[
                "button[type='submit']",
                "input[type='submit']",
            ])
            .await;

        sleep(FORM_SETTLE).await;
    }

    /// 定位提交控件并（在生产模式下）点击
    ///
    /// 标准 submit 控件优先，其次按钮文本匹配。两种模式下都记录意图。
    async fn activate_submit(&self, driver: &PageDriver, words: &[&str]) -> Result<bool> {
        let js_code = format!(
            r#"
            (() => {{
                const words = {};
                const click = {};
                const candidates = Array.from(document.querySelectorAll(
                    "input[type='submit'], button[type='submit'], button"
                ));
                const target = candidates.find(el => {{
                    if (el.matches("input[type='submit'], button[type='submit']")) {{
                        return true;
                    }}
                    const text = (el.textContent || '').toLowerCase();
                    return words.some(w => text.includes(w));
                }});
                if (!target) {{
                    return false;
                }}
                if (click) {{
                    target.click();
                }}
                return true;
            }})()
            "#,
            serde_json::to_string(words)?,
            self.production_mode,
        );

        let found = driver.eval_as::<bool>(js_code).await?;
        if found {
            if self.production_mode {
                info!("📤 已点击提交控件");
            } else {
                info!("📤 已定位提交控件（演练模式，未点击）");
            }
        }
        Ok(found)
    }
}

/// 把内容插入到关键词最相关的 wiki 段落末尾
///
/// 段落以 `== 标题 ==` 形式划分；没有任何标题（或没有命中关键词的
/// 段落）时追加到整页末尾，空页面直接写入内容
fn insert_into_wiki_section(existing: &str, content: &str, keywords: &[String]) -> String {
    if existing.trim().is_empty() {
        return content.to_string();
    }

    let header_re = match Regex::new(r"==+\s*[\w\s]+\s*==+") {
        Ok(re) => re,
        Err(_) => return format!("{}\n\n{}", existing, content),
    };

    let headers: Vec<(usize, usize)> = header_re
        .find_iter(existing)
        .map(|m| (m.start(), m.end()))
        .collect();
    if headers.is_empty() {
        return format!("{}\n\n{}", existing, content);
    }

    // 每个段落从标题结束到下一个标题开始；取关键词命中最多的段落
    let mut best_end = existing.len();
    let mut best_score = 0usize;
    for (i, &(_, header_end)) in headers.iter().enumerate() {
        let section_end = headers
            .get(i + 1)
            .map(|&(next_start, _)| next_start)
            .unwrap_or(existing.len());
        let section = existing[header_end..section_end].to_lowercase();
        let score = keywords
            .iter()
            .filter(|k| section.contains(&k.to_lowercase()))
            .count();
        if score > best_score {
            best_score = score;
            best_end = section_end;
        }
    }

    let mut merged = String::with_capacity(existing.len() + content.len() + 2);
    merged.push_str(existing[..best_end].trim_end());
    merged.push_str("\n\n");
    merged.push_str(content);
    if best_end < existing.len() {
        merged.push_str("\n\n");
        merged.push_str(existing[best_end..].trim_start());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matcher_lists_are_ordered_and_nonempty() {
        for list in [
            FORUM_BODY_SELECTORS,
            COMMENT_SELECTORS,
            ANSWER_SELECTORS,
            WIKI_EDIT_SELECTORS,
            URL_FIELD_SELECTORS,
        ] {
            assert!(!list.is_empty());
        }
        // MediaWiki 编辑区优先于通用编辑器
        assert_eq!(WIKI_EDIT_SELECTORS[0], "#wpTextbox1");
    }

    #[test]
    fn test_flow_construction_without_credentials() {
        let config = Config::default();
        let roster = Arc::new(crate::models::default_roster());
        let flow = SubmissionFlow::new(&config, roster);
        assert!(!flow.production_mode);
    }

    fn keywords(list: &[&str]) -> Vec<String> {
        list.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_wiki_insert_into_relevant_section() {
        let existing = "Intro paragraph.\n\
                        == History ==\nOld buildings and archives.\n\
                        == Housing ==\nRental market and apartment prices.\n\
                        == Climate ==\nMild winters.";
        let merged = insert_into_wiki_section(
            existing,
            "NEW CONTENT",
            &keywords(&["rental", "apartment"]),
        );

        // 插在 Housing 段落末尾、Climate 标题之前
        let content_pos = merged.find("NEW CONTENT").unwrap();
        let housing_pos = merged.find("== Housing ==").unwrap();
        let climate_pos = merged.find("== Climate ==").unwrap();
        assert!(housing_pos < content_pos);
        assert!(content_pos < climate_pos);
    }

    #[test]
    fn test_wiki_insert_appends_without_headers() {
        let merged = insert_into_wiki_section(
            "Just a plain page about nothing in particular.",
            "NEW CONTENT",
            &keywords(&["rental"]),
        );
        assert!(merged.ends_with("NEW CONTENT"));
    }

    #[test]
    fn test_wiki_insert_into_empty_page() {
        let merged = insert_into_wiki_section("   ", "NEW CONTENT", &keywords(&[]));
        assert_eq!(merged, "NEW CONTENT");
    }

    #[test]
    fn test_wiki_insert_no_keyword_match_appends_at_end() {
        let existing = "Intro.\n== History ==\nOld stuff.";
        let merged = insert_into_wiki_section(existing, "NEW CONTENT", &keywords(&["rental"]));
        assert!(merged.ends_with("NEW CONTENT"));
    }
}
