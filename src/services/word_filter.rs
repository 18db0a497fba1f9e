//! 忽略规则 - 业务能力层
//!
//! 协议里没有"忽略单词"的通道，所以在客户端过滤拼写标注。
//! 语法标注从不过滤。

use std::collections::HashSet;

use crate::models::{AnnotationKind, AnnotationSpan};

/// 拼写标注过滤器
#[derive(Debug, Clone, Copy)]
pub struct WordFilter<'a> {
    pub ignore_uppercase: bool,
    pub ignore_title_case: bool,
    pub ignored_words: &'a HashSet<String>,
}

impl WordFilter<'_> {
    /// 是否保留该标注；`text` 是发送给服务端的段落文本
    pub fn keep(&self, span: &AnnotationSpan, text: &str) -> bool {
        if span.kind != AnnotationKind::Spelling {
            return true;
        }
        let word = match &span.word {
            Some(word) if !word.is_empty() => word.clone(),
            _ => span.covered_text(text),
        };
        if self.ignored_words.contains(&word) {
            return false;
        }
        if self.ignore_uppercase && is_uppercase_word(&word) {
            return false;
        }
        if self.ignore_title_case && is_title_case_word(&word) {
            return false;
        }
        true
    }

    pub fn apply(&self, spans: Vec<AnnotationSpan>, text: &str) -> Vec<AnnotationSpan> {
        spans.into_iter().filter(|s| self.keep(s, text)).collect()
    }
}

/// 至少含一个字母，且所有字母都是大写，如 "NASA"
pub fn is_uppercase_word(word: &str) -> bool {
    let mut letters = word.chars().filter(|c| c.is_alphabetic()).peekable();
    letters.peek().is_some() && letters.all(char::is_uppercase)
}

/// 首字母大写，其余字母不全是大写，如 "Berlin"
pub fn is_title_case_word(word: &str) -> bool {
    let mut letters = word.chars().filter(|c| c.is_alphabetic());
    match letters.next() {
        Some(first) if first.is_uppercase() => !is_uppercase_word(word),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spelling(word: &str) -> AnnotationSpan {
        AnnotationSpan::spelling(0, word.chars().count(), word, vec![])
    }

    #[test]
    fn test_case_predicates() {
        assert!(is_uppercase_word("NASA"));
        assert!(is_uppercase_word("B2B"));
        assert!(!is_uppercase_word("42"));
        assert!(!is_uppercase_word("Nasa"));

        assert!(is_title_case_word("Berlin"));
        assert!(is_title_case_word("Ärger"));
        assert!(!is_title_case_word("NASA"));
        assert!(!is_title_case_word("berlin"));
    }

    #[test]
    fn test_filter_respects_options() {
        let ignored: HashSet<String> = ["Teh".to_string()].into_iter().collect();
        let filter = WordFilter {
            ignore_uppercase: true,
            ignore_title_case: false,
            ignored_words: &ignored,
        };

        assert!(!filter.keep(&spelling("Teh"), "Teh"));
        // 区分大小写
        assert!(filter.keep(&spelling("teh"), "teh"));
        assert!(!filter.keep(&spelling("NASA"), "NASA"));
        assert!(filter.keep(&spelling("Berlin"), "Berlin"));
        assert!(filter.keep(&AnnotationSpan::grammar(0, 4, vec![]), "NASA"));
    }

    #[test]
    fn test_word_falls_back_to_covered_text() {
        let ignored: HashSet<String> = ["cat".to_string()].into_iter().collect();
        let filter = WordFilter {
            ignore_uppercase: false,
            ignore_title_case: false,
            ignored_words: &ignored,
        };
        let span = AnnotationSpan::spelling(4, 7, "", vec![]);
        assert!(!filter.keep(&span, "Teh cat sat."));
    }
}
