//! 文本处理工具
//!
//! 提供主题提取、分句、截断等纯文本能力

use std::collections::HashMap;

/// 英文停用词表
static STOP_WORDS: phf::Set<&'static str> = phf::phf_set! {
    "about", "above", "after", "again", "against", "also", "because", "been",
    "before", "being", "below", "between", "both", "cannot", "could", "does",
    "doing", "down", "during", "each", "from", "further", "have", "having",
    "here", "info", "into", "itself", "just", "more", "most", "much", "once",
    "only", "other", "over", "same", "should", "some", "such", "than", "that",
    "their", "theirs", "them", "then", "there", "these", "they", "this",
    "those", "through", "under", "until", "very", "were", "what", "when",
    "where", "which", "while", "will", "with", "would", "your", "yours",
};

/// 从页面文本中提取主题（高频关键词摘要）
///
/// 分词后过滤停用词和短词，取出现频率最高的 `max_words` 个词。
/// 频率相同按字典序排列，保证结果确定。
pub fn extract_topic(text: &str, max_words: usize) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }

    let mut freq: HashMap<String, usize> = HashMap::new();
    for raw in text.split(|c: char| !c.is_alphabetic()) {
        let word = raw.to_lowercase();
        if word.len() <= 3 || STOP_WORDS.contains(word.as_str()) {
            continue;
        }
        *freq.entry(word).or_insert(0) += 1;
    }

    if freq.is_empty() {
        return None;
    }

    let mut words: Vec<(String, usize)> = freq.into_iter().collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words.truncate(max_words);

    Some(
        words
            .into_iter()
            .map(|(w, _)| w)
            .collect::<Vec<_>>()
            .join(" "),
    )
}

/// 按句子边界拆分文本
///
/// 句号/问号/叹号视为句子结束，标点保留在句子里
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            let s = current.trim().to_string();
            if !s.is_empty() {
                sentences.push(s);
            }
            current.clear();
        }
    }

    let tail = current.trim().to_string();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

/// 生成随机小写字母数字串（用于一次性身份）
pub fn random_string(len: usize) -> String {
    use rand::distr::Alphanumeric;
    use rand::Rng;

    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_topic_picks_frequent_words() {
        let text = "Rental yield matters. Rental income and rental demand drive yield.";
        let topic = extract_topic(text, 2).unwrap();
        assert!(topic.contains("rental"));
        assert!(topic.contains("yield"));
    }

    #[test]
    fn test_extract_topic_filters_stop_words() {
        let topic = extract_topic("these those with would about through", 5);
        assert!(topic.is_none());
    }

    #[test]
    fn test_extract_topic_empty() {
        assert!(extract_topic("", 5).is_none());
        assert!(extract_topic("   ", 5).is_none());
    }

    #[test]
    fn test_split_sentences() {
        let sentences = split_sentences("First one. Second? Third! Tail without dot");
        assert_eq!(sentences.len(), 4);
        assert_eq!(sentences[0], "First one.");
        assert_eq!(sentences[3], "Tail without dot");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("hello world", 5), "hello...");
    }

    #[test]
    fn test_random_string_length() {
        let s = random_string(8);
        assert_eq!(s.len(), 8);
        assert!(s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }
}
