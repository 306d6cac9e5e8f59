pub mod attempt;
pub mod classify;
pub mod dashboard;
pub mod metrics;
pub mod recorder;

pub use attempt::{InputOutcome, TypingAttempt};
pub use classify::{classify, ClassifiedChar, Classifier};
pub use dashboard::{Dashboard, DashboardRow, RECENT_SESSION_LIMIT};
pub use recorder::{RecorderHandle, SessionRecorder, SessionSink};

use log::{debug, info};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use typemaster_core::*;

/// 完成时的持久化去向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistDispatch {
    /// 未登录，跳过保存
    Skipped,
    /// 已登录但没有可用的记录器
    Unavailable,
    Queued(PersistTicket),
}

/// 完成一次练习后的回执
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionReceipt {
    pub metrics: SessionMetrics,
    pub persistence: PersistDispatch,
}

/// 一节课的练习会话：状态机 + 身份 + 记录器 + 事件
pub struct TypingSession {
    lesson: Lesson,
    attempt: TypingAttempt,
    identity: Option<UserIdentity>,
    recorder: Option<RecorderHandle>,
    receipt: Option<CompletionReceipt>,

    // 事件发布
    event_tx: Option<mpsc::Sender<TypingEvent>>,
}

impl TypingSession {
    pub fn new(
        lesson: Lesson,
        identity: Option<UserIdentity>,
        recorder: Option<RecorderHandle>,
        event_tx: Option<mpsc::Sender<TypingEvent>>,
    ) -> Self {
        let attempt = TypingAttempt::new(&lesson.content);

        Self {
            lesson,
            attempt,
            identity,
            recorder,
            receipt: None,
            event_tx,
        }
    }

    /// 核心方法：处理输入框内容变化
    pub fn handle_input(&mut self, candidate: &str, now: Instant) -> InputOutcome {
        let outcome = self.attempt.update_input(candidate, now);
        self.after_input(outcome)
    }

    /// 处理按键（退格用 `\u{0008}`）
    pub fn handle_keystroke(&mut self, ch: char, now: Instant) -> InputOutcome {
        debug!(
            "🟢 Engine::handle_keystroke 收到字符: {:?} (U+{:04X})",
            ch, ch as u32
        );

        let outcome = if ch == '\u{0008}' {
            self.attempt.backspace(now)
        } else {
            self.attempt.type_char(ch, now)
        };
        self.after_input(outcome)
    }

    fn after_input(&mut self, outcome: InputOutcome) -> InputOutcome {
        match outcome {
            InputOutcome::Started => {
                self.send_event(TypingEvent::Started {
                    lesson_id: self.lesson.id,
                });
            }
            InputOutcome::Completed(metrics) => {
                self.complete(metrics);
            }
            InputOutcome::Accepted | InputOutcome::Rejected => {}
        }
        outcome
    }

    /// 完成：先保存回执并通知界面，再（如已登录）投递一次写入
    fn complete(&mut self, metrics: SessionMetrics) {
        info!(
            "🎉 课程 {} 完成: {} WPM, {}%, {}s",
            self.lesson.id, metrics.wpm, metrics.accuracy, metrics.elapsed_seconds
        );

        self.send_event(TypingEvent::Completed {
            lesson_id: self.lesson.id,
            metrics,
        });

        let persistence = match (&self.identity, &self.recorder) {
            (None, _) => {
                debug!("  ↳ 未登录，跳过保存");
                PersistDispatch::Skipped
            }
            (Some(_), None) => PersistDispatch::Unavailable,
            (Some(user), Some(recorder)) => {
                let record = NewSessionRecord::completed(user.id, self.lesson.id, &metrics);
                PersistDispatch::Queued(recorder.submit(record, self.event_tx.clone()))
            }
        };

        self.receipt = Some(CompletionReceipt {
            metrics,
            persistence,
        });
    }

    /// 计时器回调；返回 None 时宿主应停止计时
    pub fn tick(&self, now: Instant) -> Option<Duration> {
        self.attempt.tick(now)
    }

    pub fn restart(&mut self) {
        self.attempt.restart();
        self.receipt = None;
        self.send_event(TypingEvent::Restarted {
            lesson_id: self.lesson.id,
        });
    }

    /// 获取 UI 渲染用的快照
    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        let (typed, total) = self.attempt.progress();
        SessionSnapshot {
            status: self.attempt.status(),
            elapsed: self.attempt.elapsed(now),
            metrics: self
                .attempt
                .result()
                .unwrap_or_else(|| self.attempt.metrics(now)),
            typed,
            total,
        }
    }

    /// 当前输入的逐字符分类
    pub fn classify_input(&self) -> Vec<ClassifiedChar> {
        let input = self.attempt.input_text();
        classify(&self.lesson.content, &input).collect()
    }

    pub fn status(&self) -> AttemptStatus {
        self.attempt.status()
    }

    pub fn attempt(&self) -> &TypingAttempt {
        &self.attempt
    }

    pub fn receipt(&self) -> Option<&CompletionReceipt> {
        self.receipt.as_ref()
    }

    pub fn lesson(&self) -> &Lesson {
        &self.lesson
    }

    pub fn identity(&self) -> Option<&UserIdentity> {
        self.identity.as_ref()
    }

    fn send_event(&self, event: TypingEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}

/// UI 渲染快照（轻量级）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub status: AttemptStatus,
    pub elapsed: Duration,
    pub metrics: SessionMetrics,
    pub typed: usize,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use chrono::{TimeZone, Utc};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MemorySink {
        rows: Arc<Mutex<Vec<NewSessionRecord>>>,
    }

    impl SessionSink for MemorySink {
        fn record(&mut self, record: &NewSessionRecord) -> Result<i64> {
            let mut rows = self.rows.lock().unwrap();
            rows.push(record.clone());
            Ok(rows.len() as i64)
        }
    }

    struct FailingSink;

    impl SessionSink for FailingSink {
        fn record(&mut self, _record: &NewSessionRecord) -> Result<i64> {
            anyhow::bail!("database is locked")
        }
    }

    fn create_test_lesson(content: &str) -> Lesson {
        Lesson {
            id: 4,
            title: "Test Lesson".to_string(),
            content: content.to_string(),
            difficulty: Difficulty::Beginner,
            category: "test".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn user() -> UserIdentity {
        UserIdentity {
            id: 11,
            email: "ada@example.com".to_string(),
        }
    }

    fn type_all(session: &mut TypingSession, text: &str, base: Instant, step_ms: u64) {
        for (i, ch) in text.chars().enumerate() {
            session.handle_keystroke(ch, base + Duration::from_millis(step_ms * i as u64));
        }
    }

    #[test]
    fn test_typing_session_creation() {
        let session = TypingSession::new(create_test_lesson("hello world"), None, None, None);
        assert_eq!(session.status(), AttemptStatus::Idle);
        assert!(session.receipt().is_none());

        let snapshot = session.snapshot(Instant::now());
        assert_eq!(snapshot.typed, 0);
        assert_eq!(snapshot.total, 11);
        assert_eq!(snapshot.metrics.wpm, 0);
    }

    #[test]
    fn test_events_for_full_attempt() {
        let (tx, rx) = mpsc::channel();
        let mut session = TypingSession::new(create_test_lesson("hi"), None, None, Some(tx));
        let base = Instant::now();

        type_all(&mut session, "hi", base, 500);
        session.restart();

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], TypingEvent::Started { lesson_id: 4 });
        assert!(matches!(events[1], TypingEvent::Completed { lesson_id: 4, .. }));
        assert_eq!(events[2], TypingEvent::Restarted { lesson_id: 4 });
    }

    #[test]
    fn test_guest_completion_skips_persistence() {
        let sink = MemorySink::default();
        let recorder = SessionRecorder::spawn(sink.clone());
        let mut session =
            TypingSession::new(create_test_lesson("cat"), None, Some(recorder.handle()), None);

        type_all(&mut session, "cat", Instant::now(), 100);
        recorder.shutdown();

        let receipt = session.receipt().unwrap();
        assert_eq!(receipt.persistence, PersistDispatch::Skipped);
        assert!(sink.rows.lock().unwrap().is_empty());
    }

    #[test]
    fn test_signed_in_completion_writes_once() {
        let sink = MemorySink::default();
        let recorder = SessionRecorder::spawn(sink.clone());
        let (tx, rx) = mpsc::channel();
        let mut session = TypingSession::new(
            create_test_lesson("cat"),
            Some(user()),
            Some(recorder.handle()),
            Some(tx),
        );

        let base = Instant::now();
        session.handle_keystroke('c', base);
        session.handle_keystroke('a', base + Duration::from_millis(3_000));
        session.handle_keystroke('t', base + Duration::from_millis(6_000));
        // 完成后的输入被忽略
        session.handle_keystroke('s', base + Duration::from_millis(7_000));
        recorder.shutdown();

        let receipt = *session.receipt().unwrap();
        assert_eq!(
            receipt.metrics,
            SessionMetrics {
                wpm: 10,
                accuracy: 100,
                elapsed_seconds: 6
            }
        );
        let ticket = match receipt.persistence {
            PersistDispatch::Queued(ticket) => ticket,
            other => panic!("expected queued write, got {:?}", other),
        };

        let rows = sink.rows.lock().unwrap();
        assert_eq!(
            *rows,
            vec![NewSessionRecord {
                user_id: 11,
                lesson_id: 4,
                wpm: 10,
                accuracy: 100,
                time_taken: 6,
                completed: true,
            }]
        );

        let saved = rx
            .try_iter()
            .any(|e| e == TypingEvent::SessionSaved { ticket, record_id: 1 });
        assert!(saved);
    }

    #[test]
    fn test_signed_in_without_recorder() {
        let mut session = TypingSession::new(create_test_lesson("a"), Some(user()), None, None);
        session.handle_keystroke('a', Instant::now());
        assert_eq!(
            session.receipt().map(|r| r.persistence),
            Some(PersistDispatch::Unavailable)
        );
    }

    #[test]
    fn test_backspace_keystroke() {
        let mut session = TypingSession::new(create_test_lesson("hello"), None, None, None);
        let base = Instant::now();
        session.handle_keystroke('h', base);
        session.handle_keystroke('x', base);
        session.handle_keystroke('\u{0008}', base);
        assert_eq!(session.attempt().input_text(), "h");
        assert_eq!(session.classify_input()[1].class, CharClass::CurrentCursor);
    }

    #[test]
    fn test_restart_after_completion_allows_new_attempt() {
        let mut session = TypingSession::new(create_test_lesson("ok"), None, None, None);
        let base = Instant::now();
        type_all(&mut session, "ok", base, 200);
        assert_eq!(session.status(), AttemptStatus::Complete);
        assert_eq!(session.tick(base + Duration::from_secs(1)), None);

        session.restart();
        assert_eq!(session.status(), AttemptStatus::Idle);
        assert!(session.receipt().is_none());

        let later = base + Duration::from_secs(30);
        session.handle_keystroke('o', later);
        assert_eq!(session.attempt().started_at(), Some(later));
        assert_eq!(session.tick(later + Duration::from_millis(100)), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_snapshot_uses_final_result_after_completion() {
        let mut session = TypingSession::new(create_test_lesson("cat"), None, None, None);
        let base = Instant::now();
        session.handle_input("c", base);
        session.handle_input("cat", base + Duration::from_millis(6_000));

        let snapshot = session.snapshot(base + Duration::from_secs(600));
        assert_eq!(snapshot.status, AttemptStatus::Complete);
        assert_eq!(snapshot.metrics.wpm, 10);
        assert_eq!(snapshot.elapsed, Duration::from_millis(6_000));
    }

    #[test]
    fn test_failed_save_keeps_completion() {
        let recorder = SessionRecorder::spawn(FailingSink);
        let (tx, rx) = mpsc::channel();
        let mut session = TypingSession::new(
            create_test_lesson("cat"),
            Some(user()),
            Some(recorder.handle()),
            Some(tx),
        );
        assert_eq!(session.identity(), Some(&user()));

        let base = Instant::now();
        type_all(&mut session, "cat", base, 3_000);
        recorder.shutdown();

        let receipt = *session.receipt().unwrap();
        let PersistDispatch::Queued(ticket) = receipt.persistence else {
            panic!("expected queued write, got {:?}", receipt.persistence);
        };
        assert!(rx.try_iter().any(|e| matches!(
            e,
            TypingEvent::SaveFailed { ticket: t, ref reason } if t == ticket && reason.contains("locked")
        )));

        assert_eq!(session.status(), AttemptStatus::Complete);
        assert_eq!(session.receipt(), Some(&receipt));
        assert_eq!(receipt.metrics.elapsed_seconds, 6);
        assert_eq!(session.tick(base + Duration::from_secs(10)), None);
        assert_eq!(session.attempt().result(), Some(receipt.metrics));
    }
}
