use crate::app::{App, View};
use chrono::Local;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, Wrap},
    Frame,
};
use std::time::Instant;
use typemaster_core::{format_clock, CharClass, Difficulty, DifficultyFilter};

fn difficulty_color(difficulty: Difficulty) -> Color {
    match difficulty {
        Difficulty::Beginner => Color::Green,
        Difficulty::Intermediate => Color::Yellow,
        Difficulty::Advanced => Color::Red,
    }
}

pub fn render(app: &App, frame: &mut Frame, now: Instant) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // 标题栏
            Constraint::Min(10),   // 主体
            Constraint::Length(3), // 提示信息
        ])
        .split(frame.area());

    render_header(app, frame, chunks[0]);

    let help = match app.view {
        View::Login => {
            render_login(app, frame, chunks[1]);
            "Enter sign in  |  Esc continue as guest  |  Ctrl+C quit"
        }
        View::Lessons => {
            render_lessons(app, frame, chunks[1]);
            "↑/↓ select  |  Enter start  |  a/1/2/3 filter  |  +/- timer  |  d dashboard  |  o sign out  |  q quit"
        }
        View::Typing => {
            render_typing(app, frame, chunks[1], now);
            "Backspace correct  |  Ctrl+R restart  |  Esc back to lessons"
        }
        View::Results => {
            render_results(app, frame, chunks[1], now);
            "r try again  |  Enter choose another lesson"
        }
        View::Dashboard => {
            render_dashboard(app, frame, chunks[1]);
            "Esc back to lessons"
        }
    };

    let mut footer = vec![Span::styled(help, Style::default().fg(Color::DarkGray))];
    if let Some(status) = &app.status_line {
        footer.push(Span::raw("   "));
        footer.push(Span::styled(status.clone(), Style::default().fg(Color::Cyan)));
    }
    let footer = Paragraph::new(Line::from(footer))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, chunks[2]);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let user = app
        .identity
        .as_ref()
        .map(|u| u.email.clone())
        .unwrap_or_else(|| "guest".to_string());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "TYPEMASTER",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  -  "),
        Span::styled(user, Style::default().fg(Color::DarkGray)),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn render_login(app: &App, frame: &mut Frame, area: Rect) {
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Master the art of typing",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Email:"),
        Line::from(Span::styled(
            format!("{}_", app.email_input),
            Style::default().fg(Color::Cyan),
        )),
        Line::from(""),
    ];

    if let Some(error) = &app.login_error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    let login = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Sign in")
            .title_alignment(Alignment::Center),
    );
    frame.render_widget(login, area);
}

fn render_lessons(app: &App, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)])
        .split(area);

    let filters = [
        ('a', DifficultyFilter::All),
        ('1', DifficultyFilter::Only(Difficulty::Beginner)),
        ('2', DifficultyFilter::Only(Difficulty::Intermediate)),
        ('3', DifficultyFilter::Only(Difficulty::Advanced)),
    ];
    let tabs: Vec<Span> = filters
        .iter()
        .flat_map(|(key, filter)| {
            let style = if *filter == app.settings.difficulty_filter {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            [
                Span::styled(format!(" [{}] {} ", key, filter.label()), style),
                Span::raw(" "),
            ]
        })
        .collect();
    frame.render_widget(
        Paragraph::new(Line::from(tabs)).alignment(Alignment::Center),
        chunks[0],
    );

    let lessons = app.visible_lessons();
    if lessons.is_empty() {
        let empty = Paragraph::new("No lessons found for this difficulty level")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Lessons"));
        frame.render_widget(empty, chunks[1]);
        return;
    }

    let items: Vec<ListItem> = lessons
        .iter()
        .map(|lesson| {
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(
                        format!("{:<13}", lesson.difficulty.label()),
                        Style::default().fg(difficulty_color(lesson.difficulty)),
                    ),
                    Span::styled(
                        lesson.title.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!("  [{}]  {} chars", lesson.category, lesson.char_count()),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]),
                Line::from(Span::styled(
                    format!("             {}", lesson.preview(60)),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Choose Your Lesson")
                .title_alignment(Alignment::Center),
        )
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");

    let mut state = ListState::default().with_selected(Some(app.selected));
    frame.render_stateful_widget(list, chunks[1], &mut state);
}

fn render_typing(app: &App, frame: &mut Frame, area: Rect, now: Instant) {
    let Some(session) = &app.session else {
        return;
    };
    let lesson = session.lesson();
    let snapshot = session.snapshot(now);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // 统计信息
            Constraint::Min(5),    // 核心练习区
            Constraint::Length(1), // 进度
        ])
        .split(area);

    let stats = Paragraph::new(Line::from(vec![
        Span::styled(
            lesson.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("   Time: "),
        Span::styled(
            format_clock(app.elapsed.as_millis() as u64),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("   Difficulty: "),
        Span::styled(
            lesson.difficulty.label(),
            Style::default().fg(difficulty_color(lesson.difficulty)),
        ),
        Span::styled(
            if session.identity().is_some() {
                ""
            } else {
                "   (guest, not saved)"
            },
            Style::default().fg(Color::DarkGray),
        ),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(stats, chunks[0]);

    let spans: Vec<Span> = session
        .classify_input()
        .into_iter()
        .map(|c| {
            let (display, style) = match c.class {
                CharClass::Correct => (c.expected, Style::default().fg(Color::Green)),
                CharClass::Incorrect => (
                    c.typed.unwrap_or(c.expected),
                    Style::default()
                        .fg(Color::Red)
                        .add_modifier(Modifier::UNDERLINED),
                ),
                CharClass::CurrentCursor => (
                    c.expected,
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                CharClass::Untyped => (c.expected, Style::default().fg(Color::DarkGray)),
            };
            Span::styled(display.to_string(), style)
        })
        .collect();

    let practice_area = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Start typing")
                .title_alignment(Alignment::Center),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(practice_area, chunks[1]);

    let progress = Paragraph::new(format!(
        "Progress: {} / {} characters",
        snapshot.typed, snapshot.total
    ))
    .style(Style::default().fg(Color::DarkGray))
    .alignment(Alignment::Center);
    frame.render_widget(progress, chunks[2]);
}

fn render_results(app: &App, frame: &mut Frame, area: Rect, now: Instant) {
    let Some(session) = &app.session else {
        return;
    };
    let metrics = session
        .receipt()
        .map(|r| r.metrics)
        .unwrap_or_else(|| session.snapshot(now).metrics);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Great Job!",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!("WPM:       {}", metrics.wpm)),
        Line::from(format!("Accuracy:  {}%", metrics.accuracy)),
        Line::from(format!("Time:      {}s", metrics.elapsed_seconds)),
        Line::from(""),
    ];

    let completion = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .title(session.lesson().title.clone())
            .title_alignment(Alignment::Center),
    );
    frame.render_widget(completion, area);
}

fn render_dashboard(app: &App, frame: &mut Frame, area: Rect) {
    let Some((dashboard, overall)) = &app.dashboard else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(5)])
        .split(area);

    let stats = &dashboard.stats;
    let summary = Paragraph::new(vec![
        Line::from(vec![
            Span::styled(
                format!("Average WPM: {}", stats.avg_wpm),
                Style::default().fg(Color::Blue),
            ),
            Span::raw("   "),
            Span::styled(
                format!("Average Accuracy: {}%", stats.avg_accuracy),
                Style::default().fg(Color::Green),
            ),
            Span::raw("   "),
            Span::styled(
                format!("Minutes Practiced: {}", stats.minutes_practiced()),
                Style::default().fg(Color::Yellow),
            ),
            Span::raw("   "),
            Span::styled(
                format!("Sessions: {}", stats.total_sessions),
                Style::default().fg(Color::Red),
            ),
        ]),
        Line::from(Span::styled(
            format!(
                "All time: {} sessions, best {} WPM",
                overall.total_sessions, overall.max_wpm
            ),
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("Your Progress"));
    frame.render_widget(summary, chunks[0]);

    if dashboard.is_empty() {
        let empty = Paragraph::new("No sessions yet. Start practicing to see your progress!")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Recent Sessions"));
        frame.render_widget(empty, chunks[1]);
        return;
    }

    let rows: Vec<Row> = dashboard
        .rows
        .iter()
        .map(|row| {
            let difficulty = row
                .difficulty
                .map(|d| {
                    Span::styled(d.label(), Style::default().fg(difficulty_color(d)))
                })
                .unwrap_or_else(|| Span::raw("-"));
            Row::new(vec![
                Cell::from(row.lesson_title.clone()),
                Cell::from(difficulty),
                Cell::from(row.record.wpm.to_string()),
                Cell::from(format!("{}%", row.record.accuracy)),
                Cell::from(format!("{}s", row.record.time_taken)),
                Cell::from(
                    row.record
                        .created_at
                        .with_timezone(&Local)
                        .format("%b %-d, %I:%M %p")
                        .to_string(),
                ),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(20),
            Constraint::Length(13),
            Constraint::Length(6),
            Constraint::Length(9),
            Constraint::Length(7),
            Constraint::Length(18),
        ],
    )
    .header(
        Row::new(vec!["Lesson", "Difficulty", "WPM", "Accuracy", "Time", "Date"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL).title("Recent Sessions"));
    frame.render_widget(table, chunks[1]);
}
