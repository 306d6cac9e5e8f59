//! 存放在 config 表中的应用设置

use crate::{Database, Result};
use log::warn;
use typemaster_core::DifficultyFilter;

const KEY_TICK_RATE: &str = "tick_rate_ms";
const KEY_CURRENT_USER: &str = "current_user";
const KEY_DIFFICULTY_FILTER: &str = "difficulty_filter";

pub const DEFAULT_TICK_RATE_MS: u64 = 100;
const MIN_TICK_RATE_MS: u64 = 16;
const MAX_TICK_RATE_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// 计时器刷新间隔
    pub tick_rate_ms: u64,
    /// 上次登录的用户
    pub current_user: Option<i64>,
    pub difficulty_filter: DifficultyFilter,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_rate_ms: DEFAULT_TICK_RATE_MS,
            current_user: None,
            difficulty_filter: DifficultyFilter::All,
        }
    }
}

impl Settings {
    /// 缺失或无法解析的项使用默认值
    pub fn load(db: &Database) -> Result<Self> {
        let mut settings = Settings::default();

        if let Some(raw) = db.get_config(KEY_TICK_RATE)? {
            match raw.parse::<u64>() {
                Ok(ms) => settings.set_tick_rate(ms),
                Err(_) => warn!("忽略无效的 {}: {:?}", KEY_TICK_RATE, raw),
            }
        }

        if let Some(raw) = db.get_config(KEY_CURRENT_USER)? {
            match raw.parse::<i64>() {
                Ok(id) => settings.current_user = Some(id),
                Err(_) => warn!("忽略无效的 {}: {:?}", KEY_CURRENT_USER, raw),
            }
        }

        if let Some(raw) = db.get_config(KEY_DIFFICULTY_FILTER)? {
            settings.difficulty_filter = DifficultyFilter::from_str(&raw);
        }

        Ok(settings)
    }

    /// 超出 16..=1000 ms 的值会被截断
    pub fn set_tick_rate(&mut self, ms: u64) {
        self.tick_rate_ms = ms.clamp(MIN_TICK_RATE_MS, MAX_TICK_RATE_MS);
    }

    pub fn save(&self, db: &Database) -> Result<()> {
        db.save_config(KEY_TICK_RATE, &self.tick_rate_ms.to_string())?;
        match self.current_user {
            Some(id) => db.save_config(KEY_CURRENT_USER, &id.to_string())?,
            None => db.delete_config(KEY_CURRENT_USER)?,
        }
        db.save_config(KEY_DIFFICULTY_FILTER, self.difficulty_filter.as_str())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typemaster_core::Difficulty;

    #[test]
    fn test_defaults_when_empty() {
        let db = Database::new(":memory:").unwrap();
        assert_eq!(Settings::load(&db).unwrap(), Settings::default());
    }

    #[test]
    fn test_save_and_load() {
        let db = Database::new(":memory:").unwrap();
        let settings = Settings {
            tick_rate_ms: 250,
            current_user: Some(3),
            difficulty_filter: DifficultyFilter::Only(Difficulty::Advanced),
        };
        settings.save(&db).unwrap();
        assert_eq!(Settings::load(&db).unwrap(), settings);
    }

    #[test]
    fn test_sign_out_clears_current_user() {
        let db = Database::new(":memory:").unwrap();
        let mut settings = Settings {
            current_user: Some(3),
            ..Settings::default()
        };
        settings.save(&db).unwrap();

        settings.current_user = None;
        settings.save(&db).unwrap();
        assert_eq!(db.get_config(KEY_CURRENT_USER).unwrap(), None);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let db = Database::new(":memory:").unwrap();
        db.save_config(KEY_TICK_RATE, "fast").unwrap();
        db.save_config(KEY_CURRENT_USER, "nobody").unwrap();
        db.save_config(KEY_DIFFICULTY_FILTER, "expert").unwrap();
        assert_eq!(Settings::load(&db).unwrap(), Settings::default());

        db.save_config(KEY_TICK_RATE, "1").unwrap();
        assert_eq!(Settings::load(&db).unwrap().tick_rate_ms, MIN_TICK_RATE_MS);
    }

    #[test]
    fn test_set_tick_rate_clamps() {
        let mut settings = Settings::default();
        settings.set_tick_rate(0);
        assert_eq!(settings.tick_rate_ms, MIN_TICK_RATE_MS);
        settings.set_tick_rate(5_000);
        assert_eq!(settings.tick_rate_ms, MAX_TICK_RATE_MS);
        settings.set_tick_rate(250);
        assert_eq!(settings.tick_rate_ms, 250);
    }
}
