mod profiles;
mod settings;

pub use settings::Settings;

use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use thiserror::Error;
use typemaster_core::{NewSessionRecord, TypingSessionRecord};

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data not found")]
    NotFound,

    #[error("Invalid email address: {0:?}")]
    InvalidEmail(String),
}

pub type Result<T, E = PersistenceError> = std::result::Result<T, E>;

/// 数据库管理器
pub struct Database {
    conn: Connection,
}

impl Database {
    /// 创建或打开数据库（测试中可传 `":memory:"`）
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path.as_ref())?;

        // 启用外键约束
        conn.execute("PRAGMA foreign_keys = ON", [])?;

        let db = Self { conn };
        db.initialize()?;
        debug!("🗄️ 打开数据库: {:?}", path.as_ref());
        Ok(db)
    }

    /// 初始化数据库表
    fn initialize(&self) -> Result<()> {
        // 本地用户
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        // 练习记录：每次完成一行，不做唯一约束
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS typing_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                lesson_id INTEGER NOT NULL,
                wpm INTEGER NOT NULL,
                accuracy INTEGER NOT NULL,
                time_taken INTEGER NOT NULL,
                completed INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
            )",
            [],
        )?;

        // 配置表
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_typing_sessions_user_created
             ON typing_sessions(user_id, created_at DESC)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_typing_sessions_lesson_id ON typing_sessions(lesson_id)",
            [],
        )?;

        Ok(())
    }

    /// 保存一次完成的练习
    pub fn insert_session(&self, record: &NewSessionRecord) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO typing_sessions (
                user_id, lesson_id, wpm, accuracy, time_taken, completed, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.user_id,
                record.lesson_id,
                record.wpm,
                record.accuracy,
                record.time_taken as i64,
                record.completed,
                Utc::now().timestamp_millis(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    /// 获取用户最近的练习记录（新的在前）
    pub fn recent_sessions(&self, user_id: i64, limit: usize) -> Result<Vec<TypingSessionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, lesson_id, wpm, accuracy, time_taken, completed, created_at
             FROM typing_sessions
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )?;

        let sessions = stmt
            .query_map(params![user_id, limit as i64], session_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    /// 获取用户在指定课程上的练习历史
    pub fn lesson_history(
        &self,
        user_id: i64,
        lesson_id: u32,
        limit: usize,
    ) -> Result<Vec<TypingSessionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, lesson_id, wpm, accuracy, time_taken, completed, created_at
             FROM typing_sessions
             WHERE user_id = ?1 AND lesson_id = ?2
             ORDER BY created_at DESC, id DESC
             LIMIT ?3",
        )?;

        let sessions = stmt
            .query_map(params![user_id, lesson_id, limit as i64], session_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    /// 获取用户所有时间的统计数据
    pub fn overall_stats(&self, user_id: i64) -> Result<OverallStats> {
        let mut stmt = self.conn.prepare(
            "SELECT
                COUNT(*) as total_sessions,
                SUM(time_taken) as total_time,
                AVG(wpm) as avg_wpm,
                MAX(wpm) as max_wpm,
                AVG(accuracy) as avg_accuracy
             FROM typing_sessions
             WHERE user_id = ?1",
        )?;

        let stats = stmt.query_row([user_id], |row| {
            Ok(OverallStats {
                total_sessions: row.get(0)?,
                total_time_secs: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
                avg_wpm: row.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
                max_wpm: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
                avg_accuracy: row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
            })
        })?;

        Ok(stats)
    }
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<TypingSessionRecord> {
    let created_ms: i64 = row.get(7)?;
    let created_at = DateTime::<Utc>::from_timestamp_millis(created_ms).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(7, "created_at".to_string(), rusqlite::types::Type::Integer)
    })?;

    Ok(TypingSessionRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        lesson_id: row.get(2)?,
        wpm: row.get(3)?,
        accuracy: row.get(4)?,
        time_taken: row.get::<_, i64>(5)?.max(0) as u64,
        completed: row.get(6)?,
        created_at,
    })
}

/// 总体统计
#[derive(Debug, Clone, PartialEq)]
pub struct OverallStats {
    pub total_sessions: i64,
    pub total_time_secs: i64,
    pub avg_wpm: f64,
    pub max_wpm: i64,
    pub avg_accuracy: f64,
}

impl Database {
    /// 保存配置项
    pub fn save_config(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO config (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取配置项
    pub fn get_config(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM config WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;

        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    /// 删除配置项
    pub fn delete_config(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM config WHERE key = ?1", params![key])?;
        Ok(())
    }
}
