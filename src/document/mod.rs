//! 文档适配层
//!
//! 核心逻辑只依赖 [`DocumentAdapter`] 这个接口，从不依赖具体的文档类型。
//! 宿主文档（富文本编辑器、测试用的内存文档等）实现该接口即可接入。

pub mod memory;

use std::fmt::Debug;

use crate::models::{AnnotationKind, AnnotationSpan};

pub use memory::{MemoryDocument, ParagraphId, UnitId};

/// 文档适配接口
///
/// - 文本单元（Unit）是可独立检查的段落容器，例如一个文本框
/// - 段落文本以一个结束符结尾，所以空段落的 `length` 为 1
/// - 偏移量一律按字符计
pub trait DocumentAdapter {
    type Unit: Clone + PartialEq + Debug;
    type Paragraph: Clone + PartialEq + Debug;

    /// 当前（通常是用户正在编辑的）文本单元
    fn current_unit(&self) -> Option<Self::Unit>;
    /// 可以循环回到第一个单元；协调器回到起点时停止
    fn next_unit(&self, unit: &Self::Unit) -> Option<Self::Unit>;

    fn first_paragraph(&self, unit: &Self::Unit) -> Option<Self::Paragraph>;
    fn next_paragraph(&self, paragraph: &Self::Paragraph) -> Option<Self::Paragraph>;

    /// 段落文本，包含末尾的结束符
    fn text(&self, paragraph: &Self::Paragraph) -> String;
    /// 段落长度（字符数，包含结束符）
    fn length(&self, paragraph: &Self::Paragraph) -> usize;

    fn needs_check(&self, paragraph: &Self::Paragraph) -> bool;
    fn set_needs_check(&mut self, paragraph: &Self::Paragraph, needs_check: bool);

    fn clear_annotations(&mut self, paragraph: &Self::Paragraph, kind: AnnotationKind);
    fn apply_annotation(&mut self, paragraph: &Self::Paragraph, span: &AnnotationSpan);

    /// 可能在一轮遍历中被多次调用，实现方应自行合并
    fn request_repaint(&mut self, unit: &Self::Unit);

    /// 段落是否仍然存在
    fn contains(&self, paragraph: &Self::Paragraph) -> bool;

    /// 单元最后一个段落检查完后调用
    fn set_unit_needs_check(&mut self, _unit: &Self::Unit, _needs_check: bool) {}
}

/// 段落结束符
pub fn is_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2029}' | ' ')
}

/// 去掉段落末尾的一个结束符
pub fn strip_terminator(text: &str) -> &str {
    match text.chars().last() {
        Some(c) if is_terminator(c) => &text[..text.len() - c.len_utf8()],
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_terminator_removes_only_one() {
        assert_eq!(strip_terminator("Teh cat sat.\n"), "Teh cat sat.");
        assert_eq!(strip_terminator("two \n\n"), "two \n");
        assert_eq!(strip_terminator("\n"), "");
        assert_eq!(strip_terminator(""), "");
        assert_eq!(strip_terminator("no terminator"), "no terminator");
        assert_eq!(strip_terminator("ende\u{2029}"), "ende");
    }
}
