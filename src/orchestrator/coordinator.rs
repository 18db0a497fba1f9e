//! 遍历协调器 - 编排层
//!
//! ## 职责
//!
//! 决定下一个要检查的段落，把它交给检查客户端，把返回的标注写回文档，
//! 没事可做时挂一个空闲定时器再回来看看。
//!
//! ## 状态
//!
//! ```text
//! Idle ──enable──> Seeking ──找到脏段落──> Waiting ──响应到达──> Applying ──> Seeking
//!                    │                                                      │
//!                    └──没有可检查的段落──> Sleeping ──空闲定时器──> Seeking ┘
//! ```
//!
//! ## 设计特点
//!
//! - **不做 IO**：每个操作返回 [`Action`] 列表，由 [`Engine`](super::Engine) 执行
//! - **单请求**：`in_flight` 记录线路上的请求，被放弃的请求在响应回来之前仍然占用线路
//! - **定时器代数**：每次调度都递增 `timer_epoch`，旧的定时器消息到达后直接丢弃
//! - **身份校验**：写入标注前确认段落仍存在、仍是游标位置、文本未变

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clients::CheckRequest;
use crate::config::Config;
use crate::document::{strip_terminator, DocumentAdapter};
use crate::error::CheckError;
use crate::models::{
    AnnotationKind, AnnotationSpan, CheckSession, ParagraphRef, PendingRequest, ServiceOptions,
};
use crate::orchestrator::events::{Action, Command, Event, Wake, WakeKind};
use crate::services::{ParsedResponse, ServiceSupervisor, SupervisorDecision, WordFilter};
use crate::utils::truncate_text;

type Ref<D> = ParagraphRef<<D as DocumentAdapter>::Unit, <D as DocumentAdapter>::Paragraph>;

/// 协调器所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// 检查已关闭
    Idle,
    /// 正在寻找下一个段落（或等待短间隔后继续寻找）
    Seeking,
    /// 有请求在线路上
    Waiting,
    /// 正在写入标注
    Applying,
    /// 没有可检查的段落，或在等待服务启动
    Sleeping,
}

/// 一次寻找的结果
enum Seek<U, P> {
    /// 找到的段落和要发送的文本
    Found(ParagraphRef<U, P>, String),
    /// 本次处理的段落数用完，游标停在最后检查过的段落
    Yield,
    /// 整轮遍历没有找到需要检查的段落
    Exhausted,
}

/// 一轮遍历的起点和已访问的单元数
#[derive(Debug, Clone)]
struct Pass<U> {
    start: U,
    units: usize,
}

/// 遍历协调器
pub struct Coordinator<D: DocumentAdapter> {
    document: D,
    session: CheckSession<D::Unit, D::Paragraph>,
    supervisor: ServiceSupervisor,
    phase: Phase,
    pending: Option<PendingRequest<D::Unit, D::Paragraph>>,
    in_flight: Option<u64>,
    next_request_id: u64,
    timer_epoch: u64,
    pass: Option<Pass<D::Unit>>,
    repaint: Option<D::Unit>,
    /// 携带配置指令的请求
    directive_request: Option<u64>,
    idle_delay: Duration,
    step_delay: Duration,
    scan_budget: usize,
    max_units_per_pass: usize,
}

impl<D: DocumentAdapter> Coordinator<D> {
    pub fn new(document: D, supervisor: ServiceSupervisor, config: &Config) -> Self {
        let mut session = CheckSession::default();
        session.ignore_uppercase = config.ignore_uppercase;
        session.ignore_title_case = config.ignore_title_case;
        session.ignored_words = config.ignored_words.iter().cloned().collect();
        if config.send_service_options {
            session.set_service_options(config.service_options());
        }

        Self {
            document,
            session,
            supervisor,
            phase: Phase::Idle,
            pending: None,
            in_flight: None,
            next_request_id: 1,
            timer_epoch: 0,
            pass: None,
            repaint: None,
            directive_request: None,
            idle_delay: config.idle_delay(),
            step_delay: config.step_delay(),
            scan_budget: config.scan_budget.max(1),
            max_units_per_pass: config.max_units_per_pass.max(1),
        }
    }

    // ========== 访问器 ==========

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> &CheckSession<D::Unit, D::Paragraph> {
        &self.session
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn pending(&self) -> Option<&PendingRequest<D::Unit, D::Paragraph>> {
        self.pending.as_ref()
    }

    /// 线路上尚未返回的请求
    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    // ========== 公开操作 ==========

    pub fn handle(&mut self, event: Event<D::Paragraph>) -> Vec<Action> {
        match event {
            Event::Command(command) => self.handle_command(command),
            Event::Wake(wake) => self.handle_wake(wake),
            Event::Exchange {
                request_id,
                outcome,
            } => self.handle_exchange(request_id, outcome),
        }
    }

    fn handle_command(&mut self, command: Command<D::Paragraph>) -> Vec<Action> {
        match command {
            Command::Enable(on) => self.enable(on),
            Command::SetIgnoreOptions {
                ignore_uppercase,
                ignore_title_case,
            } => self.set_ignore_options(ignore_uppercase, ignore_title_case),
            Command::IgnoreWord(word) => self.ignore_word(word),
            Command::IgnoreWords(words) => self.ignore_words(words),
            Command::ClearIgnored => self.clear_ignored(),
            Command::SetServiceOptions(options) => self.set_service_options(options),
            Command::ParagraphRemoved(paragraph) => self.notify_paragraph_removed(&paragraph),
            Command::Shutdown => {
                self.session.enabled = false;
                self.stop();
                Vec::new()
            }
        }
    }

    /// 开启或关闭检查；关闭时保留已写入的标注
    pub fn enable(&mut self, on: bool) -> Vec<Action> {
        if on == self.session.enabled {
            return Vec::new();
        }
        self.session.enabled = on;
        if on {
            info!("✅ 开启后台检查");
            self.restart()
        } else {
            info!("⏸️ 关闭后台检查");
            self.stop();
            Vec::new()
        }
    }

    pub fn set_ignore_options(&mut self, ignore_uppercase: bool, ignore_title_case: bool) -> Vec<Action> {
        self.session.ignore_uppercase = ignore_uppercase;
        self.session.ignore_title_case = ignore_title_case;
        self.restart()
    }

    pub fn ignore_word(&mut self, word: impl Into<String>) -> Vec<Action> {
        self.session.ignored_words.insert(word.into());
        self.restart()
    }

    /// 用新列表替换忽略词表
    pub fn ignore_words<I, S>(&mut self, words: I) -> Vec<Action>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.session.ignored_words = words.into_iter().map(Into::into).collect();
        self.restart()
    }

    pub fn clear_ignored(&mut self) -> Vec<Action> {
        self.session.ignored_words.clear();
        self.restart()
    }

    /// 更新服务端规则；指令随下一个请求发送
    pub fn set_service_options(&mut self, options: ServiceOptions) -> Vec<Action> {
        self.session.set_service_options(options);
        self.directive_request = None;
        self.restart()
    }

    /// 宿主删除了一个段落
    pub fn notify_paragraph_removed(&mut self, paragraph: &D::Paragraph) -> Vec<Action> {
        let pending_hit = self
            .pending
            .as_ref()
            .is_some_and(|p| &p.paragraph.paragraph == paragraph);
        if !pending_hit && !self.session.cursor.is_on_paragraph(paragraph) {
            return Vec::new();
        }
        debug!("段落 {:?} 已删除，重新开始遍历", paragraph);
        self.restart()
    }

    pub fn handle_wake(&mut self, wake: Wake) -> Vec<Action> {
        if wake.epoch != self.timer_epoch || !self.session.enabled {
            debug!("忽略过期的定时器 {:?}", wake);
            return Vec::new();
        }
        match wake.kind {
            WakeKind::Restart => {
                self.reset_cursor();
                self.start_pass()
            }
            WakeKind::Continue => self.check_next(),
            WakeKind::RetryPending => self.retry_pending(),
        }
    }

    /// 一次请求结束
    pub fn handle_exchange(
        &mut self,
        request_id: u64,
        outcome: Result<ParsedResponse, CheckError>,
    ) -> Vec<Action> {
        if self.in_flight != Some(request_id) {
            debug!("忽略未知请求 #{} 的结果", request_id);
            return Vec::new();
        }
        self.in_flight = None;

        if outcome.is_ok() && self.directive_request == Some(request_id) {
            self.session.directive_delivered();
            self.directive_request = None;
        }

        let pending = match self.pending.take() {
            Some(pending) if pending.id == request_id => pending,
            other => {
                // 请求已被放弃：丢弃结果，线路空出来后重新开始
                self.pending = other;
                debug!("{}", CheckError::StaleParagraph { request_id });
                return self.start_pass();
            }
        };

        match outcome {
            Ok(parsed) => self.apply(pending, parsed.spans),
            Err(CheckError::ConnectionRefused { endpoint }) => {
                match self.supervisor.on_connection_refused() {
                    SupervisorDecision::RetryAfter(delay) => {
                        info!("⏳ 检查服务已启动，{}ms 后重试", delay.as_millis());
                        self.pending = Some(pending);
                        self.phase = Phase::Sleeping;
                        vec![self.schedule(delay, WakeKind::RetryPending)]
                    }
                    SupervisorDecision::GiveUp { .. } => {
                        debug!("{} 拒绝连接，稍后再试", endpoint);
                        self.sleep()
                    }
                    SupervisorDecision::LaunchFailed(err) => {
                        let mut actions = vec![Action::NotifyUser(err)];
                        actions.extend(self.sleep());
                        actions
                    }
                }
            }
            Err(err) => {
                warn!("⚠️ {}", err);
                self.sleep()
            }
        }
    }

    // ========== 遍历 ==========

    /// 停止当前遍历：作废定时器、放弃等待中的段落、清空游标
    fn stop(&mut self) {
        self.timer_epoch += 1;
        self.pending = None;
        self.reset_cursor();
        self.flush_repaint();
        self.phase = Phase::Idle;
    }

    fn restart(&mut self) -> Vec<Action> {
        self.stop();
        self.start_pass()
    }

    fn reset_cursor(&mut self) {
        self.session.cursor.reset();
        self.pass = None;
    }

    fn start_pass(&mut self) -> Vec<Action> {
        if !self.session.enabled {
            self.phase = Phase::Idle;
            return Vec::new();
        }
        self.check_next()
    }

    fn check_next(&mut self) -> Vec<Action> {
        // 上一步写入的标注在这一步统一重绘
        self.flush_repaint();
        if self.in_flight.is_some() {
            self.phase = Phase::Waiting;
            return Vec::new();
        }
        self.phase = Phase::Seeking;
        match self.seek() {
            Seek::Found(target, text) => self.submit_paragraph(target, text),
            Seek::Yield => vec![self.schedule(self.step_delay, WakeKind::Continue)],
            Seek::Exhausted => {
                self.reset_cursor();
                self.phase = Phase::Sleeping;
                vec![self.schedule(self.idle_delay, WakeKind::Restart)]
            }
        }
    }

    /// 从游标之后向前寻找需要检查的段落
    fn seek(&mut self) -> Seek<D::Unit, D::Paragraph> {
        let resume = self
            .session
            .cursor
            .position()
            .filter(|pos| self.document.contains(&pos.paragraph))
            .cloned();

        let (mut unit, mut candidate) = match resume {
            Some(pos) if self.pass.is_some() => {
                let next = self.document.next_paragraph(&pos.paragraph);
                (pos.unit, next)
            }
            _ => {
                // 游标为空或段落已不存在：从当前单元开头开始新的一轮
                self.reset_cursor();
                let Some(unit) = self.document.current_unit() else {
                    return Seek::Exhausted;
                };
                self.pass = Some(Pass {
                    start: unit.clone(),
                    units: 1,
                });
                let first = self.document.first_paragraph(&unit);
                (unit, first)
            }
        };

        let mut budget = self.scan_budget;
        loop {
            match candidate {
                Some(paragraph) => {
                    let target = ParagraphRef::new(unit.clone(), paragraph);
                    self.session.cursor.move_to(target.clone());

                    if self.document.needs_check(&target.paragraph) {
                        // 空段落、只有结束符或空白的段落直接清除脏标记，不发送
                        if self.document.length(&target.paragraph) > 1 {
                            let text = request_text(&self.document, &target.paragraph);
                            if !text.trim().is_empty() {
                                return Seek::Found(target, text);
                            }
                        }
                        self.finish_paragraph(&target);
                    }

                    budget -= 1;
                    if budget == 0 {
                        return Seek::Yield;
                    }
                    candidate = self.document.next_paragraph(&target.paragraph);
                }
                None => {
                    let Some(pass) = self.pass.as_mut() else {
                        return Seek::Exhausted;
                    };
                    match self.document.next_unit(&unit) {
                        Some(next) if next != pass.start && pass.units < self.max_units_per_pass => {
                            pass.units += 1;
                            candidate = self.document.first_paragraph(&next);
                            unit = next;
                        }
                        _ => return Seek::Exhausted,
                    }
                }
            }
        }
    }

    fn submit_paragraph(&mut self, target: Ref<D>, text: String) -> Vec<Action> {
        let id = self.next_request_id;
        self.next_request_id += 1;
        self.pending = Some(PendingRequest {
            id,
            paragraph: target,
            text: text.clone(),
        });
        self.send(id, text)
    }

    /// 把等待中的段落放上线路
    fn send(&mut self, id: u64, text: String) -> Vec<Action> {
        let directive = self.session.pending_directive();
        if directive.is_some() {
            self.directive_request = Some(id);
        }
        debug!("提交段落 #{}: '{}'", id, truncate_text(&text, 40));
        self.in_flight = Some(id);
        self.phase = Phase::Waiting;
        vec![Action::Submit(CheckRequest {
            id,
            text,
            directive,
        })]
    }

    /// 服务启动后重试同一个段落
    fn retry_pending(&mut self) -> Vec<Action> {
        match self.pending.take() {
            Some(pending) if self.document.contains(&pending.paragraph.paragraph) => {
                let (id, text) = (pending.id, pending.text.clone());
                self.pending = Some(pending);
                self.send(id, text)
            }
            _ => {
                self.reset_cursor();
                self.start_pass()
            }
        }
    }

    /// 放弃当前段落，空闲间隔后从头再来
    fn sleep(&mut self) -> Vec<Action> {
        self.pending = None;
        self.reset_cursor();
        self.flush_repaint();
        self.phase = Phase::Sleeping;
        vec![self.schedule(self.idle_delay, WakeKind::Restart)]
    }

    fn schedule(&mut self, delay: Duration, kind: WakeKind) -> Action {
        self.timer_epoch += 1;
        Action::Schedule {
            delay,
            wake: Wake {
                epoch: self.timer_epoch,
                kind,
            },
        }
    }

    // ========== 写入标注 ==========

    fn apply(
        &mut self,
        pending: PendingRequest<D::Unit, D::Paragraph>,
        spans: Vec<AnnotationSpan>,
    ) -> Vec<Action> {
        self.phase = Phase::Applying;
        if !self.is_live(&pending) {
            debug!("{}", CheckError::StaleParagraph { request_id: pending.id });
            self.reset_cursor();
            return self.start_pass();
        }

        let filter = WordFilter {
            ignore_uppercase: self.session.ignore_uppercase,
            ignore_title_case: self.session.ignore_title_case,
            ignored_words: &self.session.ignored_words,
        };
        let spans = filter.apply(spans, &pending.text);
        let limit = pending.text.chars().count();

        let paragraph = &pending.paragraph.paragraph;
        for kind in AnnotationKind::ALL {
            self.document.clear_annotations(paragraph, kind);
        }
        for span in &spans {
            self.document.apply_annotation(paragraph, &span.clone().clamped(limit));
        }
        info!(
            "📝 段落 {} 检查完成，{} 处标注",
            pending.paragraph,
            spans.len()
        );

        self.finish_paragraph(&pending.paragraph);
        self.mark_repaint(pending.paragraph.unit);
        self.phase = Phase::Seeking;
        vec![self.schedule(self.step_delay, WakeKind::Continue)]
    }

    fn is_live(&self, pending: &PendingRequest<D::Unit, D::Paragraph>) -> bool {
        let paragraph = &pending.paragraph.paragraph;
        self.document.contains(paragraph)
            && self.session.cursor.is_at(&pending.paragraph)
            && request_text(&self.document, paragraph) == pending.text
    }

    /// 清除脏标记；单元的最后一个段落同时清除单元标记
    fn finish_paragraph(&mut self, target: &Ref<D>) {
        self.document.set_needs_check(&target.paragraph, false);
        if self.document.next_paragraph(&target.paragraph).is_none() {
            self.document.set_unit_needs_check(&target.unit, false);
        }
    }

    fn mark_repaint(&mut self, unit: D::Unit) {
        if self.repaint.as_ref() != Some(&unit) {
            self.flush_repaint();
        }
        self.repaint = Some(unit);
    }

    fn flush_repaint(&mut self) {
        if let Some(unit) = self.repaint.take() {
            self.document.request_repaint(&unit);
        }
    }
}

/// 发送给服务端的单行文本：去掉结束符，内部换行替换为空格（偏移不变）
fn request_text<D: DocumentAdapter>(document: &D, paragraph: &D::Paragraph) -> String {
    let text = document.text(paragraph);
    strip_terminator(&text)
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\u{2029}' => ' ',
            c => c,
        })
        .collect()
}
