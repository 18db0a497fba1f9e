//! 检查会话状态
//!
//! 封装"检查是否开启、过滤哪些词、当前遍历到哪个段落"这些进程级信息

use std::collections::HashSet;
use std::fmt::{self, Debug, Display};

use super::directive::ServiceOptions;

/// 指向文档中某个段落的导航句柄（不持有数据）
#[derive(Debug, Clone, PartialEq)]
pub struct ParagraphRef<U, P> {
    pub unit: U,
    pub paragraph: P,
}

impl<U, P> ParagraphRef<U, P> {
    pub fn new(unit: U, paragraph: P) -> Self {
        Self { unit, paragraph }
    }
}

impl<U: Debug, P: Debug> Display for ParagraphRef<U, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[单元 {:?} 段落 {:?}]", self.unit, self.paragraph)
    }
}

/// 遍历游标
///
/// 到达文档末尾或检查被重置时变为空。只有协调器会修改它。
#[derive(Debug, Clone)]
pub struct TraversalCursor<U, P> {
    position: Option<ParagraphRef<U, P>>,
}

impl<U, P> Default for TraversalCursor<U, P> {
    fn default() -> Self {
        Self { position: None }
    }
}

impl<U: Clone + PartialEq, P: Clone + PartialEq> TraversalCursor<U, P> {
    pub fn position(&self) -> Option<&ParagraphRef<U, P>> {
        self.position.as_ref()
    }

    pub fn unit(&self) -> Option<&U> {
        self.position.as_ref().map(|p| &p.unit)
    }

    pub fn move_to(&mut self, position: ParagraphRef<U, P>) {
        self.position = Some(position);
    }

    pub fn reset(&mut self) {
        self.position = None;
    }

    pub fn is_at(&self, target: &ParagraphRef<U, P>) -> bool {
        self.position.as_ref() == Some(target)
    }

    pub fn is_on_paragraph(&self, paragraph: &P) -> bool {
        self.position
            .as_ref()
            .is_some_and(|p| &p.paragraph == paragraph)
    }
}

/// 正在等待结果的请求，任一时刻最多一个
#[derive(Debug, Clone)]
pub struct PendingRequest<U, P> {
    pub id: u64,
    pub paragraph: ParagraphRef<U, P>,
    /// 实际发送的文本（已去掉段落结束符）
    pub text: String,
}

/// 进程级检查会话
#[derive(Debug, Clone)]
pub struct CheckSession<U, P> {
    pub enabled: bool,
    pub ignore_uppercase: bool,
    pub ignore_title_case: bool,
    /// 区分大小写
    pub ignored_words: HashSet<String>,
    pub cursor: TraversalCursor<U, P>,
    service_options: Option<ServiceOptions>,
    directive_pending: bool,
}

impl<U, P> Default for CheckSession<U, P> {
    fn default() -> Self {
        Self {
            enabled: false,
            ignore_uppercase: false,
            ignore_title_case: false,
            ignored_words: HashSet::new(),
            cursor: TraversalCursor::default(),
            service_options: None,
            directive_pending: false,
        }
    }
}

impl<U, P> CheckSession<U, P> {
    pub fn set_service_options(&mut self, options: ServiceOptions) {
        self.service_options = Some(options);
        self.directive_pending = true;
    }

    pub fn service_options(&self) -> Option<&ServiceOptions> {
        self.service_options.as_ref()
    }

    /// 下一次请求需要附带的配置指令
    pub fn pending_directive(&self) -> Option<String> {
        if !self.directive_pending {
            return None;
        }
        self.service_options.as_ref().map(ServiceOptions::to_directive)
    }

    /// 指令已随一次成功的请求送达
    pub fn directive_delivered(&mut self) {
        self.directive_pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_is_sent_once_per_change() {
        let mut session: CheckSession<u32, u32> = CheckSession::default();
        assert!(session.pending_directive().is_none());

        session.set_service_options(ServiceOptions::default());
        assert!(session.pending_directive().is_some());
        // 未送达前保持待发送
        assert!(session.pending_directive().is_some());

        session.directive_delivered();
        assert!(session.pending_directive().is_none());
    }

    #[test]
    fn test_cursor_identity() {
        let mut cursor: TraversalCursor<u32, u32> = TraversalCursor::default();
        assert!(cursor.position().is_none());

        cursor.move_to(ParagraphRef::new(1, 7));
        assert!(cursor.is_at(&ParagraphRef::new(1, 7)));
        assert!(cursor.is_on_paragraph(&7));
        assert!(!cursor.is_at(&ParagraphRef::new(2, 7)));

        cursor.reset();
        assert!(cursor.unit().is_none());
    }
}
