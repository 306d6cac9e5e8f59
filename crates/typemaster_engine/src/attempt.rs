//! 单次练习的计时与状态机
//!
//! Idle → Running（第一次有效输入，记录开始时间）→ Complete（输入长度等于原文长度）。
//! `restart` 从任意状态回到 Idle。所有操作都显式接收当前时刻，方便宿主和测试控制时间。

use crate::metrics;
use log::debug;
use std::time::{Duration, Instant};
use typemaster_core::{AttemptStatus, SessionMetrics};

/// 一次输入变化的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// 超长输入或已完成，输入保持不变
    Rejected,
    Accepted,
    /// 第一次有效输入，计时开始
    Started,
    Completed(SessionMetrics),
}

#[derive(Debug, Clone)]
pub struct TypingAttempt {
    target: Vec<char>,
    input: Vec<char>,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
    status: AttemptStatus,
    result: Option<SessionMetrics>,
}

impl TypingAttempt {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.chars().collect(),
            input: Vec::new(),
            started_at: None,
            finished_at: None,
            status: AttemptStatus::Idle,
            result: None,
        }
    }

    /// 用整段候选输入替换当前输入
    pub fn update_input(&mut self, candidate: &str, now: Instant) -> InputOutcome {
        self.apply(candidate.chars().collect(), now)
    }

    /// 在末尾追加一个字符
    pub fn type_char(&mut self, ch: char, now: Instant) -> InputOutcome {
        let mut candidate = self.input.clone();
        candidate.push(ch);
        self.apply(candidate, now)
    }

    /// 删除最后一个字符
    pub fn backspace(&mut self, now: Instant) -> InputOutcome {
        let mut candidate = self.input.clone();
        candidate.pop();
        self.apply(candidate, now)
    }

    fn apply(&mut self, candidate: Vec<char>, now: Instant) -> InputOutcome {
        if self.status == AttemptStatus::Complete {
            return InputOutcome::Rejected;
        }

        if candidate.len() > self.target.len() {
            debug!(
                "  ↳ 拒绝超长输入: {} > {}",
                candidate.len(),
                self.target.len()
            );
            return InputOutcome::Rejected;
        }

        self.input = candidate;

        let mut outcome = InputOutcome::Accepted;
        if self.status == AttemptStatus::Idle && !self.input.is_empty() {
            self.started_at = Some(now);
            self.status = AttemptStatus::Running;
            outcome = InputOutcome::Started;
        }

        if self.status == AttemptStatus::Running && self.input.len() == self.target.len() {
            let metrics = self.compute(now);
            self.result = Some(metrics);
            self.finished_at = Some(now);
            self.status = AttemptStatus::Complete;
            debug!("🏁 练习完成: {:?}", metrics);
            return InputOutcome::Completed(metrics);
        }

        outcome
    }

    /// 计时器回调；只有 Running 时返回已用时间，返回 None 表示应停止计时器
    pub fn tick(&self, now: Instant) -> Option<Duration> {
        match self.status {
            AttemptStatus::Running => Some(self.elapsed(now)),
            _ => None,
        }
    }

    /// Idle 时为零，完成后固定在完成时刻
    pub fn elapsed(&self, now: Instant) -> Duration {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            (Some(start), None) => now.saturating_duration_since(start),
            _ => Duration::ZERO,
        }
    }

    /// 当前输入对应的实时指标
    pub fn metrics(&self, now: Instant) -> SessionMetrics {
        self.compute(now)
    }

    fn compute(&self, now: Instant) -> SessionMetrics {
        let elapsed_ms = i64::try_from(self.elapsed(now).as_millis()).unwrap_or(i64::MAX);
        metrics::calculate(&self.target_text(), &self.input_text(), elapsed_ms)
    }

    pub fn restart(&mut self) {
        self.input.clear();
        self.started_at = None;
        self.finished_at = None;
        self.result = None;
        self.status = AttemptStatus::Idle;
    }

    pub fn status(&self) -> AttemptStatus {
        self.status
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// 完成时计算的最终指标
    pub fn result(&self) -> Option<SessionMetrics> {
        self.result
    }

    pub fn target(&self) -> &[char] {
        &self.target
    }

    pub fn input(&self) -> &[char] {
        &self.input
    }

    pub fn target_text(&self) -> String {
        self.target.iter().collect()
    }

    pub fn input_text(&self) -> String {
        self.input.iter().collect()
    }

    /// (已输入, 总长度)
    pub fn progress(&self) -> (usize, usize) {
        (self.input.len(), self.target.len())
    }
}
