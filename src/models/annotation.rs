//! 标注区间

use serde::Serialize;

/// 标注类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    /// 拼写错误（misspelled）
    Spelling,
    /// 语法 / 风格警告（grammar-warning）
    Grammar,
}

impl AnnotationKind {
    pub const ALL: [AnnotationKind; 2] = [AnnotationKind::Spelling, AnnotationKind::Grammar];
}

/// 服务端返回的一个标注区间
///
/// 偏移量是段落纯文本中从 0 开始的字符下标（按服务端的计数方式），
/// 区间为 `[start, end)`。只在一次响应中临时存在，写入段落后即丢弃。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationSpan {
    pub kind: AnnotationKind,
    pub start: usize,
    pub end: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
    /// 建议的替换；语法标注为空时表示"删除该区间"
    pub corrections: Vec<String>,
}

impl AnnotationSpan {
    pub fn spelling(start: usize, end: usize, word: impl Into<String>, corrections: Vec<String>) -> Self {
        Self {
            kind: AnnotationKind::Spelling,
            start,
            end,
            word: Some(word.into()),
            corrections,
        }
    }

    pub fn grammar(start: usize, end: usize, corrections: Vec<String>) -> Self {
        Self {
            kind: AnnotationKind::Grammar,
            start,
            end,
            word: None,
            corrections,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// 将区间限制在 `[0, limit]` 内，保证 `start <= end <= limit`
    pub fn clamped(mut self, limit: usize) -> Self {
        self.end = self.end.min(limit);
        self.start = self.start.min(self.end);
        self
    }

    /// 区间覆盖的文本（按字符计）
    pub fn covered_text(&self, text: &str) -> String {
        text.chars().skip(self.start).take(self.len()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_never_exceeds_limit() {
        let span = AnnotationSpan::spelling(8, 40, "x", vec![]).clamped(10);
        assert_eq!((span.start, span.end), (8, 10));

        let span = AnnotationSpan::spelling(20, 40, "x", vec![]).clamped(10);
        assert_eq!((span.start, span.end), (10, 10));
        assert!(span.is_empty());
    }

    #[test]
    fn test_covered_text_counts_chars() {
        let span = AnnotationSpan::grammar(2, 5, vec![]);
        assert_eq!(span.covered_text("äöüßx!"), "üßx");
    }
}
