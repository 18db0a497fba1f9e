//! 内存文档
//!
//! [`DocumentAdapter`] 的一个简单实现，供演示程序和测试使用。
//! 内部数据由 `Arc<Mutex<_>>` 共享：宿主保留一个克隆用于编辑，
//! 另一个克隆交给检查引擎。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::DocumentAdapter;
use crate::models::{AnnotationKind, AnnotationSpan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParagraphId(pub u64);

impl fmt::Display for ParagraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

const TERMINATOR: char = '\n';

#[derive(Debug)]
struct ParagraphData {
    id: ParagraphId,
    content: String,
    needs_check: bool,
    annotations: Vec<AnnotationSpan>,
}

#[derive(Debug)]
struct UnitData {
    id: UnitId,
    needs_check: bool,
    paragraphs: Vec<ParagraphData>,
}

#[derive(Debug, Default)]
struct Inner {
    units: Vec<UnitData>,
    current: Option<UnitId>,
    next_id: u64,
    repaints: HashMap<UnitId, usize>,
}

impl Inner {
    fn alloc_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn unit_index(&self, unit: UnitId) -> Option<usize> {
        self.units.iter().position(|u| u.id == unit)
    }

    fn locate(&self, paragraph: ParagraphId) -> Option<(usize, usize)> {
        self.units.iter().enumerate().find_map(|(ui, u)| {
            u.paragraphs
                .iter()
                .position(|p| p.id == paragraph)
                .map(|pi| (ui, pi))
        })
    }

    fn paragraph(&self, paragraph: ParagraphId) -> Option<&ParagraphData> {
        self.locate(paragraph)
            .map(|(ui, pi)| &self.units[ui].paragraphs[pi])
    }

    fn paragraph_mut(&mut self, paragraph: ParagraphId) -> Option<&mut ParagraphData> {
        self.locate(paragraph)
            .map(|(ui, pi)| &mut self.units[ui].paragraphs[pi])
    }
}

/// 共享的内存文档
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用一组段落创建只有一个单元的文档
    pub fn from_paragraphs<I, S>(paragraphs: I) -> (Self, UnitId)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let doc = Self::new();
        let unit = doc.add_unit();
        for text in paragraphs {
            doc.push_paragraph(unit, text);
        }
        (doc, unit)
    }

    // ========== 宿主侧编辑操作 ==========

    pub fn add_unit(&self) -> UnitId {
        let mut inner = self.inner.lock();
        let id = UnitId(inner.alloc_id());
        inner.units.push(UnitData {
            id,
            needs_check: true,
            paragraphs: Vec::new(),
        });
        id
    }

    pub fn set_current_unit(&self, unit: UnitId) {
        self.inner.lock().current = Some(unit);
    }

    /// 在单元末尾追加段落，内容不含结束符
    pub fn push_paragraph(&self, unit: UnitId, content: impl Into<String>) -> Option<ParagraphId> {
        let mut inner = self.inner.lock();
        let ui = inner.unit_index(unit)?;
        let id = ParagraphId(inner.alloc_id());
        let unit = &mut inner.units[ui];
        unit.needs_check = true;
        unit.paragraphs.push(ParagraphData {
            id,
            content: content.into(),
            needs_check: true,
            annotations: Vec::new(),
        });
        Some(id)
    }

    pub fn insert_paragraph_after(
        &self,
        after: ParagraphId,
        content: impl Into<String>,
    ) -> Option<ParagraphId> {
        let mut inner = self.inner.lock();
        let (ui, pi) = inner.locate(after)?;
        let id = ParagraphId(inner.alloc_id());
        let unit = &mut inner.units[ui];
        unit.needs_check = true;
        unit.paragraphs.insert(
            pi + 1,
            ParagraphData {
                id,
                content: content.into(),
                needs_check: true,
                annotations: Vec::new(),
            },
        );
        Some(id)
    }

    /// 替换段落内容并标记为需要检查
    pub fn set_text(&self, paragraph: ParagraphId, content: impl Into<String>) -> bool {
        let mut inner = self.inner.lock();
        let Some((ui, pi)) = inner.locate(paragraph) else {
            return false;
        };
        let unit = &mut inner.units[ui];
        unit.needs_check = true;
        let p = &mut unit.paragraphs[pi];
        p.content = content.into();
        p.needs_check = true;
        true
    }

    pub fn remove_paragraph(&self, paragraph: ParagraphId) -> bool {
        let mut inner = self.inner.lock();
        match inner.locate(paragraph) {
            Some((ui, pi)) => {
                inner.units[ui].paragraphs.remove(pi);
                true
            }
            None => false,
        }
    }

    // ========== 查询 ==========

    pub fn paragraphs(&self, unit: UnitId) -> Vec<ParagraphId> {
        let inner = self.inner.lock();
        inner
            .unit_index(unit)
            .map(|ui| inner.units[ui].paragraphs.iter().map(|p| p.id).collect())
            .unwrap_or_default()
    }

    /// 段落内容（不含结束符）
    pub fn content(&self, paragraph: ParagraphId) -> Option<String> {
        self.inner
            .lock()
            .paragraph(paragraph)
            .map(|p| p.content.clone())
    }

    pub fn annotations(&self, paragraph: ParagraphId) -> Vec<AnnotationSpan> {
        self.inner
            .lock()
            .paragraph(paragraph)
            .map(|p| p.annotations.clone())
            .unwrap_or_default()
    }

    pub fn is_dirty(&self, paragraph: ParagraphId) -> bool {
        self.inner
            .lock()
            .paragraph(paragraph)
            .is_some_and(|p| p.needs_check)
    }

    pub fn unit_is_dirty(&self, unit: UnitId) -> bool {
        let inner = self.inner.lock();
        inner
            .unit_index(unit)
            .is_some_and(|ui| inner.units[ui].needs_check)
    }

    pub fn repaint_count(&self, unit: UnitId) -> usize {
        self.inner.lock().repaints.get(&unit).copied().unwrap_or(0)
    }

    /// 所有段落都已检查完毕
    pub fn is_clean(&self) -> bool {
        self.inner
            .lock()
            .units
            .iter()
            .all(|u| u.paragraphs.iter().all(|p| !p.needs_check))
    }
}

impl DocumentAdapter for MemoryDocument {
    type Unit = UnitId;
    type Paragraph = ParagraphId;

    fn current_unit(&self) -> Option<UnitId> {
        let inner = self.inner.lock();
        inner
            .current
            .filter(|id| inner.unit_index(*id).is_some())
            .or_else(|| inner.units.first().map(|u| u.id))
    }

    /// 循环：最后一个单元之后回到第一个
    fn next_unit(&self, unit: &UnitId) -> Option<UnitId> {
        let inner = self.inner.lock();
        let ui = inner.unit_index(*unit)?;
        let next = (ui + 1) % inner.units.len();
        Some(inner.units[next].id)
    }

    fn first_paragraph(&self, unit: &UnitId) -> Option<ParagraphId> {
        let inner = self.inner.lock();
        let ui = inner.unit_index(*unit)?;
        inner.units[ui].paragraphs.first().map(|p| p.id)
    }

    fn next_paragraph(&self, paragraph: &ParagraphId) -> Option<ParagraphId> {
        let inner = self.inner.lock();
        let (ui, pi) = inner.locate(*paragraph)?;
        inner.units[ui].paragraphs.get(pi + 1).map(|p| p.id)
    }

    fn text(&self, paragraph: &ParagraphId) -> String {
        self.inner
            .lock()
            .paragraph(*paragraph)
            .map(|p| format!("{}{}", p.content, TERMINATOR))
            .unwrap_or_default()
    }

    fn length(&self, paragraph: &ParagraphId) -> usize {
        self.inner
            .lock()
            .paragraph(*paragraph)
            .map(|p| p.content.chars().count() + 1)
            .unwrap_or(0)
    }

    fn needs_check(&self, paragraph: &ParagraphId) -> bool {
        self.is_dirty(*paragraph)
    }

    fn set_needs_check(&mut self, paragraph: &ParagraphId, needs_check: bool) {
        if let Some(p) = self.inner.lock().paragraph_mut(*paragraph) {
            p.needs_check = needs_check;
        }
    }

    fn clear_annotations(&mut self, paragraph: &ParagraphId, kind: AnnotationKind) {
        if let Some(p) = self.inner.lock().paragraph_mut(*paragraph) {
            p.annotations.retain(|a| a.kind != kind);
        }
    }

    fn apply_annotation(&mut self, paragraph: &ParagraphId, span: &AnnotationSpan) {
        if let Some(p) = self.inner.lock().paragraph_mut(*paragraph) {
            let limit = p.content.chars().count() + 1;
            p.annotations.push(span.clone().clamped(limit));
        }
    }

    fn request_repaint(&mut self, unit: &UnitId) {
        *self.inner.lock().repaints.entry(*unit).or_insert(0) += 1;
    }

    fn contains(&self, paragraph: &ParagraphId) -> bool {
        self.inner.lock().locate(*paragraph).is_some()
    }

    fn set_unit_needs_check(&mut self, unit: &UnitId, needs_check: bool) {
        let mut inner = self.inner.lock();
        if let Some(ui) = inner.unit_index(*unit) {
            inner.units[ui].needs_check = needs_check;
        }
    }
}
