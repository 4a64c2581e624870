/// 目标页面类别枚举
///
/// 每个类别对应一套独立的提交策略（见 `workflow::SubmissionFlow`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum Category {
    /// 论坛
    Forum,
    /// 博客
    Blog,
    /// 问答站点
    QaSite,
    /// 目录站点
    Directory,
    /// Wiki 站点
    Wiki,
    /// 社会化书签
    SocialBookmark,
    /// 评论区
    CommentSection,
}

/// slug → 类别的静态查找表
static CATEGORY_SLUGS: phf::Map<&'static str, Category> = phf::phf_map! {
    "forums" => Category::Forum,
    "blogs" => Category::Blog,
    "qa_sites" => Category::QaSite,
    "directories" => Category::Directory,
    "wiki_sites" => Category::Wiki,
    "social_bookmarks" => Category::SocialBookmark,
    "comment_sections" => Category::CommentSection,
};

impl Category {
    /// 全部类别（按默认处理顺序）
    pub const ALL: [Category; 7] = [
        Category::Forum,
        Category::Blog,
        Category::QaSite,
        Category::Directory,
        Category::SocialBookmark,
        Category::Wiki,
        Category::CommentSection,
    ];

    /// 获取类别的 slug（用于配置和结果输出）
    pub fn slug(self) -> &'static str {
        match self {
            Category::Forum => "forums",
            Category::Blog => "blogs",
            Category::QaSite => "qa_sites",
            Category::Directory => "directories",
            Category::Wiki => "wiki_sites",
            Category::SocialBookmark => "social_bookmarks",
            Category::CommentSection => "comment_sections",
        }
    }

    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            Category::Forum => "论坛",
            Category::Blog => "博客",
            Category::QaSite => "问答站点",
            Category::Directory => "目录站点",
            Category::Wiki => "Wiki站点",
            Category::SocialBookmark => "社会化书签",
            Category::CommentSection => "评论区",
        }
    }

    /// 从 slug 解析类别
    pub fn from_slug(s: &str) -> Option<Self> {
        CATEGORY_SLUGS.get(s.to_lowercase().as_str()).copied()
    }

    /// 该类别的搜索模式列表（按优先级顺序）
    ///
    /// 站点发现按此顺序逐个搜索，直到凑够配额
    pub fn search_patterns(self) -> &'static [&'static str] {
        match self {
            Category::Forum => &[
                "real estate forum \"new topic\"",
                "property investment forum \"post reply\"",
                "expat living forum register",
            ],
            Category::Blog => &[
                "real estate blog \"leave a comment\"",
                "living abroad blog \"post a comment\"",
                "property investment blog comments",
            ],
            Category::QaSite => &[
                "real estate questions answers site",
                "property investment \"ask a question\"",
                "expat living q&a",
            ],
            Category::Directory => &[
                "real estate directory \"submit site\"",
                "property listings directory \"add url\"",
                "travel directory \"suggest a site\"",
            ],
            Category::Wiki => &[
                "real estate wiki \"edit this page\"",
                "travel wiki contribute",
            ],
            Category::SocialBookmark => &[
                "social bookmarking \"submit a link\"",
                "bookmark site \"add story\" property",
            ],
            Category::CommentSection => &[
                "property investment article comments",
                "living abroad news \"add comment\"",
            ],
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.slug())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_roundtrip() {
        for category in Category::ALL {
            assert_eq!(Category::from_slug(category.slug()), Some(category));
        }
    }

    #[test]
    fn test_from_slug_case_insensitive() {
        assert_eq!(Category::from_slug("FORUMS"), Some(Category::Forum));
        assert_eq!(Category::from_slug("Qa_Sites"), Some(Category::QaSite));
    }

    #[test]
    fn test_from_slug_unknown() {
        assert_eq!(Category::from_slug("newsletters"), None);
    }

    #[test]
    fn test_every_category_has_patterns() {
        for category in Category::ALL {
            assert!(!category.search_patterns().is_empty());
        }
    }
}
