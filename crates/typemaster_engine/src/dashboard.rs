//! 仪表盘：最近的练习记录与课程目录关联

use std::collections::HashMap;
use typemaster_core::{DashboardStats, Difficulty, Lesson, TypingSessionRecord};

/// 仪表盘展示的最近记录条数
pub const RECENT_SESSION_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardRow {
    pub record: TypingSessionRecord,
    pub lesson_title: String,
    /// 课程已不在目录中时为 None
    pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub rows: Vec<DashboardRow>,
}

impl Dashboard {
    /// `records` 应按时间倒序排列
    pub fn build(records: Vec<TypingSessionRecord>, lessons: &[Lesson]) -> Self {
        let by_id: HashMap<u32, &Lesson> = lessons.iter().map(|l| (l.id, l)).collect();
        let stats = DashboardStats::from_records(&records);

        let rows = records
            .into_iter()
            .map(|record| {
                let lesson = by_id.get(&record.lesson_id);
                DashboardRow {
                    lesson_title: lesson
                        .map(|l| l.title.clone())
                        .unwrap_or_else(|| "Unknown lesson".to_string()),
                    difficulty: lesson.map(|l| l.difficulty),
                    record,
                }
            })
            .collect();

        Self { stats, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn lesson(id: u32, title: &str, difficulty: Difficulty) -> Lesson {
        Lesson {
            id,
            title: title.to_string(),
            content: "abc".to_string(),
            difficulty,
            category: "basics".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn record(id: i64, lesson_id: u32, wpm: u32) -> TypingSessionRecord {
        TypingSessionRecord {
            id,
            user_id: 1,
            lesson_id,
            wpm,
            accuracy: 90,
            time_taken: 60,
            completed: true,
            created_at: Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_build_joins_lessons() {
        let lessons = vec![
            lesson(1, "Home Row", Difficulty::Beginner),
            lesson(2, "Numbers", Difficulty::Advanced),
        ];
        let dashboard = Dashboard::build(vec![record(2, 2, 50), record(1, 9, 30)], &lessons);

        assert_eq!(dashboard.rows.len(), 2);
        assert_eq!(dashboard.rows[0].lesson_title, "Numbers");
        assert_eq!(dashboard.rows[0].difficulty, Some(Difficulty::Advanced));
        assert_eq!(dashboard.rows[1].lesson_title, "Unknown lesson");
        assert_eq!(dashboard.rows[1].difficulty, None);
        assert_eq!(dashboard.stats.avg_wpm, 40);
        assert_eq!(dashboard.stats.minutes_practiced(), 2);
    }

    #[test]
    fn test_empty_dashboard() {
        let dashboard = Dashboard::build(Vec::new(), &[]);
        assert!(dashboard.is_empty());
        assert_eq!(dashboard.stats.total_sessions, 0);
    }
}
