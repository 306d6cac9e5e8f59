use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};
use typemaster_core::*;
use typemaster_data::{filter_lessons, LessonLoader};
use typemaster_engine::{
    Dashboard, InputOutcome, RecorderHandle, TypingSession, RECENT_SESSION_LIMIT,
};
use typemaster_persistence::{Database, OverallStats, Settings};

/// 课程列表中 `+`/`-` 调整计时器刷新间隔的步长
const TICK_RATE_STEP_MS: u64 = 50;

/// 带 Ctrl/Alt 的按键是快捷键，不算输入
fn is_shortcut(key: &KeyEvent) -> bool {
    key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Lessons,
    Typing,
    Results,
    Dashboard,
}

pub struct App {
    pub view: View,
    db: Database,
    recorder: RecorderHandle,
    pub settings: Settings,
    pub identity: Option<UserIdentity>,

    // 课程列表
    loader: LessonLoader,
    lessons_changed: Arc<AtomicBool>,
    pub lessons: Vec<Lesson>,
    pub selected: usize,

    // 登录
    pub email_input: String,
    pub login_error: Option<String>,

    // 练习
    pub session: Option<TypingSession>,
    pub elapsed: Duration,
    event_tx: mpsc::Sender<TypingEvent>,
    event_rx: mpsc::Receiver<TypingEvent>,

    pub dashboard: Option<(Dashboard, OverallStats)>,
    pub status_line: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        db: Database,
        recorder: RecorderHandle,
        settings: Settings,
        identity: Option<UserIdentity>,
        loader: LessonLoader,
        lessons: Vec<Lesson>,
        lessons_changed: Arc<AtomicBool>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        let view = if identity.is_some() {
            View::Lessons
        } else {
            View::Login
        };

        Self {
            view,
            db,
            recorder,
            settings,
            identity,
            loader,
            lessons_changed,
            lessons,
            selected: 0,
            email_input: String::new(),
            login_error: None,
            session: None,
            elapsed: Duration::ZERO,
            event_tx,
            event_rx,
            dashboard: None,
            status_line: None,
            should_quit: false,
        }
    }

    /// 当前筛选条件下的课程
    pub fn visible_lessons(&self) -> Vec<Lesson> {
        filter_lessons(&self.lessons, self.settings.difficulty_filter)
    }

    /// 只有练习计时中才需要计时器
    pub fn tick_interval(&self) -> Option<Duration> {
        match &self.session {
            Some(session) if session.status() == AttemptStatus::Running => {
                Some(Duration::from_millis(self.settings.tick_rate_ms))
            }
            _ => None,
        }
    }

    pub fn on_tick(&mut self, now: Instant) {
        if let Some(elapsed) = self.session.as_ref().and_then(|s| s.tick(now)) {
            self.elapsed = elapsed;
        }
    }

    /// 处理后台事件：写入结果、课程目录变化
    pub fn process_background(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            match event {
                TypingEvent::SessionSaved { record_id, .. } => {
                    self.status_line = Some(format!("Session saved (#{})", record_id));
                }
                TypingEvent::SaveFailed { reason, .. } => {
                    self.status_line = Some(format!("Could not save session: {}", reason));
                }
                _ => {}
            }
        }

        if self.lessons_changed.swap(false, Ordering::Relaxed) {
            self.reload_lessons();
        }
    }

    fn reload_lessons(&mut self) {
        match self.loader.load_all() {
            Ok(lessons) => {
                info!("🔄 重新加载课程: {} 个", lessons.len());
                self.lessons = lessons;
                self.clamp_selection();
            }
            Err(e) => {
                warn!("重新加载课程失败: {:#}", e);
                self.status_line = Some(format!("Could not reload lessons: {}", e));
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.view {
            View::Login => self.handle_login_key(key),
            View::Lessons => self.handle_lessons_key(key),
            View::Typing => self.handle_typing_key(key, now),
            View::Results => self.handle_results_key(key),
            View::Dashboard => self.handle_dashboard_key(key),
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.sign_in(),
            KeyCode::Esc => {
                info!("以访客身份继续，练习记录不会保存");
                self.view = View::Lessons;
            }
            KeyCode::Backspace => {
                self.email_input.pop();
            }
            KeyCode::Char(c) if !is_shortcut(&key) => self.email_input.push(c),
            _ => {}
        }
    }

    fn sign_in(&mut self) {
        match self.db.sign_in(&self.email_input) {
            Ok(user) => {
                info!("👤 登录: {}", user.email);
                self.settings.current_user = Some(user.id);
                self.save_settings();
                self.identity = Some(user);
                self.email_input.clear();
                self.login_error = None;
                self.view = View::Lessons;
            }
            Err(e) => self.login_error = Some(e.to_string()),
        }
    }

    fn sign_out(&mut self) {
        self.identity = None;
        self.settings.current_user = None;
        self.save_settings();
        self.dashboard = None;
        self.view = View::Login;
    }

    fn handle_lessons_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('a') => self.set_filter(DifficultyFilter::All),
            KeyCode::Char('1') => self.set_filter(DifficultyFilter::Only(Difficulty::Beginner)),
            KeyCode::Char('2') => {
                self.set_filter(DifficultyFilter::Only(Difficulty::Intermediate))
            }
            KeyCode::Char('3') => self.set_filter(DifficultyFilter::Only(Difficulty::Advanced)),
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected += 1;
                self.clamp_selection();
            }
            KeyCode::Enter => self.start_selected(),
            KeyCode::Char('d') => self.open_dashboard(),
            KeyCode::Char('o') => self.sign_out(),
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.adjust_tick_rate(TICK_RATE_STEP_MS as i64)
            }
            KeyCode::Char('-') => self.adjust_tick_rate(-(TICK_RATE_STEP_MS as i64)),
            _ => {}
        }
    }

    fn set_filter(&mut self, filter: DifficultyFilter) {
        self.settings.difficulty_filter = filter;
        self.selected = 0;
        self.save_settings();
    }

    fn adjust_tick_rate(&mut self, delta_ms: i64) {
        let next = self.settings.tick_rate_ms.saturating_add_signed(delta_ms);
        self.settings.set_tick_rate(next);
        self.status_line = Some(format!("Timer refresh: {} ms", self.settings.tick_rate_ms));
        self.save_settings();
    }

    fn clamp_selection(&mut self) {
        let count = self.visible_lessons().len();
        self.selected = self.selected.min(count.saturating_sub(1));
    }

    fn start_selected(&mut self) {
        let Some(lesson) = self.visible_lessons().into_iter().nth(self.selected) else {
            return;
        };

        info!("📖 开始课程 {}: {}", lesson.id, lesson.title);
        self.session = Some(TypingSession::new(
            lesson,
            self.identity.clone(),
            Some(self.recorder.clone()),
            Some(self.event_tx.clone()),
        ));
        self.elapsed = Duration::ZERO;
        self.status_line = None;
        self.view = View::Typing;
    }

    fn handle_typing_key(&mut self, key: KeyEvent, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            self.view = View::Lessons;
            return;
        };

        let outcome = match key.code {
            KeyCode::Esc => {
                self.session = None;
                self.view = View::Lessons;
                return;
            }
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                session.restart();
                self.elapsed = Duration::ZERO;
                return;
            }
            KeyCode::Char(c) if !is_shortcut(&key) => session.handle_keystroke(c, now),
            KeyCode::Backspace => session.handle_keystroke('\u{0008}', now),
            KeyCode::Enter => session.handle_keystroke('\n', now),
            KeyCode::Tab => session.handle_keystroke('\t', now),
            _ => return,
        };

        if let InputOutcome::Completed(metrics) = outcome {
            self.elapsed = Duration::from_secs(metrics.elapsed_seconds);
            self.view = View::Results;
        }
    }

    fn handle_results_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('r') => {
                if let Some(session) = self.session.as_mut() {
                    session.restart();
                }
                self.elapsed = Duration::ZERO;
                self.view = View::Typing;
            }
            KeyCode::Enter | KeyCode::Esc => {
                self.session = None;
                self.view = View::Lessons;
            }
            _ => {}
        }
    }

    fn open_dashboard(&mut self) {
        let Some(user) = &self.identity else {
            self.status_line = Some("Sign in to track your progress".to_string());
            return;
        };

        let loaded = self
            .db
            .recent_sessions(user.id, RECENT_SESSION_LIMIT)
            .and_then(|records| Ok((records, self.db.overall_stats(user.id)?)));

        match loaded {
            Ok((records, overall)) => {
                self.dashboard = Some((Dashboard::build(records, &self.lessons), overall));
                self.view = View::Dashboard;
            }
            Err(e) => {
                warn!("加载仪表盘失败: {}", e);
                self.status_line = Some(format!("Could not load your stats: {}", e));
            }
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyEvent) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('q')) {
            self.view = View::Lessons;
        }
    }

    fn save_settings(&mut self) {
        if let Err(e) = self.settings.save(&self.db) {
            warn!("保存设置失败: {}", e);
        }
    }
}
