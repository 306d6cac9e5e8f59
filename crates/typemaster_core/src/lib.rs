use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 难度等级
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "beginner" => Some(Difficulty::Beginner),
            "intermediate" => Some(Difficulty::Intermediate),
            "advanced" => Some(Difficulty::Advanced),
            _ => None,
        }
    }

    /// 首字母大写的显示名
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 课程列表的难度筛选
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DifficultyFilter {
    #[default]
    All,
    Only(Difficulty),
}

impl DifficultyFilter {
    pub fn matches(&self, difficulty: Difficulty) -> bool {
        match self {
            DifficultyFilter::All => true,
            DifficultyFilter::Only(d) => *d == difficulty,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyFilter::All => "all",
            DifficultyFilter::Only(d) => d.as_str(),
        }
    }

    /// 未知值回退到 `All`
    pub fn from_str(s: &str) -> Self {
        Difficulty::from_str(s)
            .map(DifficultyFilter::Only)
            .unwrap_or(DifficultyFilter::All)
    }

    pub fn label(&self) -> &'static str {
        match self {
            DifficultyFilter::All => "All Levels",
            DifficultyFilter::Only(d) => d.label(),
        }
    }
}

/// 课程定义
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lesson {
    pub id: u32,
    pub title: String,
    /// 需要逐字输入的原文
    pub content: String,
    pub difficulty: Difficulty,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

impl Lesson {
    /// 字符数（按 unicode 标量计）
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    /// 列表中展示的内容预览
    pub fn preview(&self, max_chars: usize) -> String {
        let mut preview = self.content.chars().take(max_chars).collect::<String>();
        if self.char_count() > max_chars {
            preview.push_str("...");
        }
        preview
    }
}

/// 单次练习的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AttemptStatus {
    /// 尚未输入，计时器未启动
    #[default]
    Idle,
    /// 计时中
    Running,
    /// 输入长度已等于原文长度（重新开始前不再变化）
    Complete,
}

/// 练习指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SessionMetrics {
    pub wpm: u32,
    /// 0 - 100
    pub accuracy: u32,
    pub elapsed_seconds: u64,
}

/// 实时反馈用的字符分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Untyped,
    CurrentCursor,
    Correct,
    Incorrect,
}

/// 当前登录的用户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: i64,
    pub email: String,
}

/// 完成练习后写入存储的载荷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSessionRecord {
    pub user_id: i64,
    pub lesson_id: u32,
    pub wpm: u32,
    pub accuracy: u32,
    /// 秒
    pub time_taken: u64,
    pub completed: bool,
}

impl NewSessionRecord {
    pub fn completed(user_id: i64, lesson_id: u32, metrics: &SessionMetrics) -> Self {
        Self {
            user_id,
            lesson_id,
            wpm: metrics.wpm,
            accuracy: metrics.accuracy,
            time_taken: metrics.elapsed_seconds,
            completed: true,
        }
    }
}

/// 已保存的练习记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingSessionRecord {
    pub id: i64,
    pub user_id: i64,
    pub lesson_id: u32,
    pub wpm: u32,
    pub accuracy: u32,
    pub time_taken: u64,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// 持久化任务编号，用于关联异步写入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PersistTicket(pub u64);

/// 打字事件（用于 UI 反馈）
#[derive(Debug, Clone, PartialEq)]
pub enum TypingEvent {
    Started {
        lesson_id: u32,
    },
    Completed {
        lesson_id: u32,
        metrics: SessionMetrics,
    },
    Restarted {
        lesson_id: u32,
    },
    SessionSaved {
        ticket: PersistTicket,
        record_id: i64,
    },
    SaveFailed {
        ticket: PersistTicket,
        reason: String,
    },
}

/// 仪表盘汇总
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardStats {
    pub avg_wpm: u32,
    pub avg_accuracy: u32,
    pub total_time_secs: u64,
    pub total_sessions: usize,
}

impl DashboardStats {
    pub fn from_records(records: &[TypingSessionRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let count = records.len() as f64;
        let total_wpm: u64 = records.iter().map(|r| r.wpm as u64).sum();
        let total_accuracy: u64 = records.iter().map(|r| r.accuracy as u64).sum();

        Self {
            avg_wpm: (total_wpm as f64 / count).round() as u32,
            avg_accuracy: (total_accuracy as f64 / count).round() as u32,
            total_time_secs: records.iter().map(|r| r.time_taken).sum(),
            total_sessions: records.len(),
        }
    }

    pub fn minutes_practiced(&self) -> u64 {
        (self.total_time_secs as f64 / 60.0).round() as u64
    }
}

/// 毫秒格式化为 `m:ss`
pub fn format_clock(elapsed_ms: u64) -> String {
    let seconds = elapsed_ms / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
