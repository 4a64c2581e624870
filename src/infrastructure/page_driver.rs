//! 页面驱动器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露页面交互能力

use anyhow::Result;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

/// 页面驱动器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露导航、执行 JS、填表、点击能力
/// - 不认识 Category / PromotionalSite
/// - 不处理业务流程
pub struct PageDriver {
    page: Page,
}

impl PageDriver {
    /// 创建新的页面驱动器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 导航到指定 URL 并等待加载完成
    pub async fn goto(&self, url: &str) -> Result<()> {
        self.page.goto(url).await?;
        // 导航事件可能早于 goto 返回，等待失败不视为错误
        let _ = self.page.wait_for_navigation().await;
        Ok(())
    }

    /// 当前页面 URL
    pub async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 提取页面可见文本（有界长度）
    pub async fn visible_text(&self, max_chars: usize) -> Result<String> {
        let js_code = format!(
            "((document.body && document.body.innerText) || '').slice(0, {})",
            max_chars
        );
        self.eval_as::<String>(js_code).await
    }

    /// 检查选择器是否命中任何元素
    pub async fn exists(&self, selector: &str) -> Result<bool> {
        let js_code = format!(
            "!!document.querySelector({})",
            serde_json::to_string(selector)?
        );
        self.eval_as::<bool>(js_code).await
    }

    /// 按优先级顺序查找第一个命中的选择器并填入值
    ///
    /// 支持 input / textarea / contenteditable，填入后派发 input 和
    /// change 事件。任何选择器都未命中时返回 false。
    pub async fn fill_first(&self, selectors: &[&str], value: &str) -> Result<bool> {
        let js_code = format!(
            r#"
            (() => {{
                const selectors = {};
                const value = {};
                for (const sel of selectors) {{
                    const el = document.querySelector(sel);
                    if (!el) continue;
                    if (el.isContentEditable) {{
                        el.innerHTML = value;
                    }} else {{
                        el.value = value;
                    }}
                    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                    return true;
                }}
                return false;
            }})()
            "#,
            serde_json::to_string(selectors)?,
            serde_json::to_string(value)?,
        );
        self.eval_as::<bool>(js_code).await
    }

    /// 读取第一个命中元素的当前值
    ///
    /// input/textarea 取 value，contenteditable 取 innerText；
    /// 没有元素命中时返回 None
    pub async fn value_of_first(&self, selectors: &[&str]) -> Result<Option<String>> {
        let js_code = format!(
            r#"
            (() => {{
                const selectors = {};
                for (const sel of selectors) {{
                    const el = document.querySelector(sel);
                    if (!el) continue;
                    if (el.isContentEditable) {{
                        return el.innerText || '';
                    }}
                    return el.value || '';
                }}
                return null;
            }})()
            "#,
            serde_json::to_string(selectors)?,
        );
        self.eval_as::<Option<String>>(js_code).await
    }

    /// 按优先级顺序点击第一个命中的元素
    pub async fn click_first(&self, selectors: &[&str]) -> Result<bool> {
        let js_code = format!(
            r#"
            (() => {{
                const selectors = {};
                for (const sel of selectors) {{
                    const el = document.querySelector(sel);
                    if (el) {{
                        el.click();
                        return true;
                    }}
                }}
                return false;
            }})()
            "#,
            serde_json::to_string(selectors)?,
        );
        self.eval_as::<bool>(js_code).await
    }

    /// 点击链接文本包含任一模式的第一个 <a> 元素
    ///
    /// 模式按优先级顺序匹配，比较时统一转小写
    pub async fn click_link_by_text(&self, patterns: &[&str]) -> Result<bool> {
        let js_code = format!(
            r#"
            (() => {{
                const patterns = {};
                const links = Array.from(document.querySelectorAll('a'));
                for (const pattern of patterns) {{
                    const link = links.find(
                        a => (a.textContent || '').toLowerCase().includes(pattern)
                    );
                    if (link) {{
                        link.click();
                        return true;
                    }}
                }}
                return false;
            }})()
            "#,
            serde_json::to_string(patterns)?,
        );
        self.eval_as::<bool>(js_code).await
    }

    /// 在第一个命中的下拉框里选择文本包含任一关键词的选项
    pub async fn select_option_containing(
        &self,
        selectors: &[&str],
        keywords: &[&str],
    ) -> Result<bool> {
        let js_code = format!(
            r#"
            (() => {{
                const selectors = {};
                const keywords = {};
                for (const sel of selectors) {{
                    const select = document.querySelector(sel);
                    if (!select) continue;
                    for (const option of Array.from(select.options || [])) {{
                        const text = (option.textContent || '').toLowerCase();
                        if (keywords.some(k => text.includes(k))) {{
                            select.value = option.value;
                            select.dispatchEvent(new Event('change', {{ bubbles: true }}));
                            return true;
                        }}
                    }}
                }}
                return false;
            }})()
            "#,
            serde_json::to_string(selectors)?,
            serde_json::to_string(keywords)?,
        );
        self.eval_as::<bool>(js_code).await
    }
}
