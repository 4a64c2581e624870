use serde::{Deserialize, Serialize};

/// 推广站点
///
/// 活动要建设外链的目标站点，清单在活动运行期间只读
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionalSite {
    pub name: String,
    pub url: String,
    pub description: String,
    pub keywords: Vec<String>,
}

impl PromotionalSite {
    /// 随机抽取最多 `count` 个关键词，拼接为逗号分隔字符串
    pub fn sample_keywords(&self, count: usize) -> String {
        use rand::seq::index::sample;

        if self.keywords.is_empty() {
            return String::new();
        }
        let take = count.min(self.keywords.len());
        let mut rng = rand::rng();
        let mut picked: Vec<&str> = sample(&mut rng, self.keywords.len(), take)
            .iter()
            .map(|i| self.keywords[i].as_str())
            .collect();
        picked.sort_unstable();
        picked.join(", ")
    }
}

/// 内置推广站点清单
///
/// 未提供清单文件时使用，覆盖房产、旅居、投资移民等方向
pub fn default_roster() -> Vec<PromotionalSite> {
    fn site(name: &str, url: &str, description: &str, keywords: &[&str]) -> PromotionalSite {
        PromotionalSite {
            name: name.to_string(),
            url: url.to_string(),
            description: description.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    vec![
        site(
            "Living Abroad - Aparthotels",
            "https://aparthotel.com",
            "Offers aparthotels, rental options, and travel guides for local living.",
            &["aparthotel", "rental", "travel", "accommodation", "temporary housing", "extended stay", "digital nomad", "furnished"],
        ),
        site(
            "Crypto Rentals",
            "https://cryptoapartments.com",
            "Modern rental platform accepting cryptocurrency with travel and lifestyle insights.",
            &["cryptocurrency", "bitcoin", "ethereum", "rental", "blockchain", "crypto payment", "travel", "tech"],
        ),
        site(
            "Serviced Apartments",
            "https://servicedapartments.net",
            "Specializes in serviced apartments with travel tips and local renting rules.",
            &["serviced apartment", "temporary housing", "corporate housing", "short-term rental", "business travel", "relocation", "amenities"],
        ),
        site(
            "Furnished Apartments",
            "https://furnishedapartments.net",
            "Focuses on furnished apartments with immediate living solutions and local analysis.",
            &["furnished apartment", "ready to move", "turnkey", "fully equipped", "move-in ready", "short-term rental"],
        ),
        site(
            "Real Estate Abroad",
            "https://realestateabroad.com",
            "International property investments, buying guides, financing tips, and market analysis.",
            &["international real estate", "overseas property", "foreign investment", "global real estate", "overseas buying guide"],
        ),
        site(
            "Property Developments",
            "https://propertydevelopments.com",
            "Latest new property projects with detailed buying and financing guides.",
            &["property development", "new construction", "pre-construction", "off-plan property", "new build", "property launch"],
        ),
        site(
            "Property Investment",
            "https://propertyinvestment.net",
            "Dedicated to property investment with how-to articles, financing guides, and yield analysis.",
            &["property investment", "real estate investment", "rental yield", "capital appreciation", "passive income", "property portfolio"],
        ),
        site(
            "Golden Visa Opportunities",
            "https://golden-visa.com",
            "Focuses on Golden Visa properties and investment immigration for the global elite.",
            &["golden visa", "investment visa", "residency by investment", "european residency", "portugal golden visa", "spain golden visa"],
        ),
        site(
            "Residence by Investment",
            "https://residence-by-investment.com",
            "Guides investors on obtaining residency through property investments across markets.",
            &["residence by investment", "residency program", "permanent residency", "investment migration", "second residency"],
        ),
        site(
            "Citizenship by Investment",
            "https://citizenship-by-investment.net",
            "Covers citizenship-by-investment programs with global insights and investment tips.",
            &["citizenship by investment", "second passport", "economic citizenship", "dual citizenship", "global mobility"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roster_not_empty() {
        let roster = default_roster();
        assert!(!roster.is_empty());
        for site in &roster {
            assert!(site.url.starts_with("https://"));
            assert!(!site.keywords.is_empty());
        }
    }

    #[test]
    fn test_sample_keywords_bounded() {
        let roster = default_roster();
        let sampled = roster[0].sample_keywords(3);
        assert_eq!(sampled.split(", ").count(), 3);
    }

    #[test]
    fn test_sample_keywords_more_than_available() {
        let site = PromotionalSite {
            name: "t".to_string(),
            url: "https://t.example".to_string(),
            description: String::new(),
            keywords: vec!["a".to_string()],
        };
        assert_eq!(site.sample_keywords(5), "a");
    }
}
