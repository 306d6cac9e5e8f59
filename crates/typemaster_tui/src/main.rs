mod app;
mod ui;

use anyhow::{Context, Result};
use app::App;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{debug, info, warn};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use typemaster_data::{AppPaths, LessonLoader};
use typemaster_engine::SessionRecorder;
use typemaster_persistence::{Database, Settings};

/// 非练习状态下的事件轮询间隔
const IDLE_POLL: Duration = Duration::from_millis(250);

fn init_logging(paths: &AppPaths) -> Result<()> {
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(paths.log_path())
        .with_context(|| format!("Failed to open log file: {:?}", paths.log_path()))?;

    // 终端被 TUI 占用，日志写入文件
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui::render(app, f, Instant::now()))?;

        let timeout = match app.tick_interval() {
            Some(rate) => rate.saturating_sub(last_tick.elapsed()),
            None => IDLE_POLL,
        };

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key, Instant::now());
                }
            }
        }

        match app.tick_interval() {
            Some(rate) if last_tick.elapsed() >= rate => {
                app.on_tick(Instant::now());
                last_tick = Instant::now();
            }
            Some(_) => {}
            None => last_tick = Instant::now(),
        }

        app.process_background();

        if app.should_quit {
            return Ok(());
        }
    }
}

fn main() -> Result<()> {
    let paths = AppPaths::resolve()?;
    fs::create_dir_all(paths.root())
        .with_context(|| format!("Failed to create data dir: {:?}", paths.root()))?;
    init_logging(&paths)?;

    info!("🚀 TypeMaster 启动");
    debug!("📁 数据目录: {:?}", paths.root());

    let db = Database::new(paths.database_path())?;
    let settings = Settings::load(&db)?;

    let identity = match settings.current_user {
        Some(id) => match db.find_user(id) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("无法恢复上次登录的用户 {}: {}", id, e);
                None
            }
        },
        None => None,
    };

    // 后台写入使用独立连接
    let recorder = SessionRecorder::spawn(Database::new(paths.database_path())?);

    let mut loader = LessonLoader::new(paths.lessons_dir())?;
    let lessons = loader.load_all()?;
    info!("📚 共加载课程: {} 个", lessons.len());

    let lessons_changed = Arc::new(AtomicBool::new(false));
    let flag = lessons_changed.clone();
    if let Err(e) = loader.start_watching(move || flag.store(true, Ordering::Relaxed)) {
        warn!("无法监听课程目录: {:#}", e);
    }

    let mut app = App::new(
        db,
        recorder.handle(),
        settings,
        identity,
        loader,
        lessons,
        lessons_changed,
    );

    // 设置终端
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    // 恢复终端
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    drop(app);
    recorder.shutdown();
    info!("👋 TypeMaster 退出");

    result
}
