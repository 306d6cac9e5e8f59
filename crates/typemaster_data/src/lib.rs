pub mod paths;

pub use paths::AppPaths;

use anyhow::{Context, Result};
use log::{debug, warn};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use rust_embed::RustEmbed;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use typemaster_core::{DifficultyFilter, Lesson};

/// 嵌入式课程资源
#[derive(RustEmbed)]
#[folder = "../../lessons"]
#[include = "*.ron"]
struct EmbeddedLessons;

pub struct LessonLoader {
    user_data_dir: PathBuf,
    watcher: Option<RecommendedWatcher>,
}

impl LessonLoader {
    /// `user_data_dir` 中的课程会覆盖同 ID 的内置课程
    pub fn new(user_data_dir: impl Into<PathBuf>) -> Result<Self> {
        let user_data_dir = user_data_dir.into();

        // 确保用户数据目录存在
        if !user_data_dir.exists() {
            fs::create_dir_all(&user_data_dir)
                .with_context(|| format!("Failed to create user data dir: {:?}", user_data_dir))?;
            debug!("✅ 创建用户课程目录: {:?}", user_data_dir);
        }

        Ok(Self {
            user_data_dir,
            watcher: None,
        })
    }

    /// 加载所有课程（用户目录覆盖内置资源），按难度再按 ID 排序
    pub fn load_all(&self) -> Result<Vec<Lesson>> {
        let mut lessons_map: HashMap<u32, Lesson> = HashMap::new();

        // 1. 先加载嵌入式内置课程
        let builtin = Self::load_embedded_lessons()?;
        debug!("📚 加载嵌入式课程: {} 个", builtin.len());
        for lesson in builtin {
            lessons_map.insert(lesson.id, lesson);
        }

        // 2. 再加载用户课程（覆盖同 ID 的内置课程）
        let mut user_lessons = Vec::new();
        Self::load_from_dir_recursive(&self.user_data_dir, &mut user_lessons)?;
        if !user_lessons.is_empty() {
            debug!("📚 加载用户课程: {} 个", user_lessons.len());
        }
        for lesson in user_lessons {
            if lessons_map.contains_key(&lesson.id) {
                debug!("🔄 用户课程覆盖内置课程 ID: {}", lesson.id);
            }
            lessons_map.insert(lesson.id, lesson);
        }

        // 3. 排序返回
        let mut lessons: Vec<_> = lessons_map.into_values().collect();
        lessons.sort_by_key(|l| (l.difficulty, l.id));
        Ok(lessons)
    }

    /// 从嵌入式资源加载课程
    fn load_embedded_lessons() -> Result<Vec<Lesson>> {
        let mut lessons = Vec::new();

        for file in EmbeddedLessons::iter() {
            let file_name = file.as_ref();

            if let Some(content) = EmbeddedLessons::get(file_name) {
                let content_str = std::str::from_utf8(&content.data)
                    .with_context(|| format!("Failed to decode embedded file: {}", file_name))?;

                let lesson = parse_lesson(content_str)
                    .with_context(|| format!("Failed to parse embedded lesson: {}", file_name))?;

                if let Some(lesson) = validate(lesson, file_name) {
                    lessons.push(lesson);
                }
            }
        }

        Ok(lessons)
    }

    /// 递归加载目录中的所有课程
    fn load_from_dir_recursive(dir: &Path, lessons: &mut Vec<Lesson>) -> Result<()> {
        if !dir.exists() {
            return Ok(());
        }

        for entry in
            fs::read_dir(dir).with_context(|| format!("Failed to read directory: {:?}", dir))?
        {
            let entry = entry?;
            let path = entry.path();

            if path.is_dir() {
                Self::load_from_dir_recursive(&path, lessons)?;
            } else if is_ron(&path) {
                let content = fs::read_to_string(&path)?;
                let lesson =
                    parse_lesson(&content).with_context(|| format!("Failed to parse: {:?}", path))?;
                if let Some(lesson) = validate(lesson, &path.display().to_string()) {
                    lessons.push(lesson);
                }
            }
        }

        Ok(())
    }

    /// 按 ID 加载单个课程
    pub fn load_by_id(&self, id: u32) -> Result<Lesson> {
        let all_lessons = self.load_all()?;
        all_lessons
            .into_iter()
            .find(|l| l.id == id)
            .ok_or_else(|| anyhow::anyhow!("Lesson with id {} not found", id))
    }

    /// 按难度筛选课程
    pub fn load_by_difficulty(&self, filter: DifficultyFilter) -> Result<Vec<Lesson>> {
        let all_lessons = self.load_all()?;
        Ok(filter_lessons(&all_lessons, filter))
    }

    /// 启动文件系统监听，用户课程变化时调用 `callback`
    pub fn start_watching<F>(&mut self, callback: F) -> Result<()>
    where
        F: Fn() + Send + 'static,
    {
        let (tx, rx) = channel();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                // 只关心 .ron 文件的变化
                let has_ron_change = event.paths.iter().any(|p| is_ron(p));

                if has_ron_change {
                    debug!("📂 检测到用户课程文件变化: {:?}", event.paths);
                    tx.send(()).ok();
                }
            }
        })?;

        // 只监听用户数据目录（内置目录编译到二进制，无需监听）
        watcher.watch(&self.user_data_dir, RecursiveMode::Recursive)?;

        debug!("👀 开始监听用户课程目录: {:?}", self.user_data_dir);

        // 启动监听线程
        std::thread::spawn(move || {
            while rx.recv().is_ok() {
                callback();
            }
        });

        self.watcher = Some(watcher);
        Ok(())
    }

    pub fn user_data_dir(&self) -> &Path {
        &self.user_data_dir
    }
}

/// 保持原有顺序的难度筛选
pub fn filter_lessons(lessons: &[Lesson], filter: DifficultyFilter) -> Vec<Lesson> {
    lessons
        .iter()
        .filter(|l| filter.matches(l.difficulty))
        .cloned()
        .collect()
}

fn parse_lesson(content: &str) -> Result<Lesson> {
    Ok(ron::from_str(content)?)
}

fn is_ron(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("ron")
}

/// 空内容的课程无法完成，直接跳过
fn validate(lesson: Lesson, source: &str) -> Option<Lesson> {
    if lesson.content.is_empty() {
        warn!("跳过内容为空的课程 {} ({})", lesson.id, source);
        None
    } else {
        Some(lesson)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typemaster_core::Difficulty;

    const USER_LESSON: &str = r#"(
        id: 1,
        title: "My Home Row",
        content: "fff jjj",
        difficulty: Beginner,
        category: "custom",
        created_at: "2024-06-01T00:00:00Z",
    )"#;

    #[test]
    fn test_loader_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let lessons_dir = dir.path().join("lessons");
        let loader = LessonLoader::new(&lessons_dir).expect("Failed to create loader");
        assert!(lessons_dir.is_dir());
        assert_eq!(loader.user_data_dir(), lessons_dir.as_path());
    }

    #[test]
    fn test_embedded_lessons_load() {
        let lessons = LessonLoader::load_embedded_lessons().expect("Failed to load embedded lessons");
        assert!(!lessons.is_empty(), "Should load embedded lessons");
        for d in Difficulty::ALL {
            assert!(lessons.iter().any(|l| l.difficulty == d), "missing {:?}", d);
        }
    }

    #[test]
    fn test_load_all_sorted_by_difficulty() {
        let dir = tempfile::tempdir().unwrap();
        let loader = LessonLoader::new(dir.path()).unwrap();
        let lessons = loader.load_all().unwrap();
        assert!(lessons
            .windows(2)
            .all(|w| (w[0].difficulty, w[0].id) <= (w[1].difficulty, w[1].id)));
    }

    #[test]
    fn test_user_lesson_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("mine");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("home.ron"), USER_LESSON).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let loader = LessonLoader::new(dir.path()).unwrap();
        let lesson = loader.load_by_id(1).unwrap();
        assert_eq!(lesson.title, "My Home Row");
        assert_eq!(lesson.content, "fff jjj");
    }

    #[test]
    fn test_empty_user_lesson_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("empty.ron"),
            USER_LESSON.replace("id: 1", "id: 9001").replace("fff jjj", ""),
        )
        .unwrap();

        let loader = LessonLoader::new(dir.path()).unwrap();
        assert!(loader.load_by_id(9001).is_err());
    }

    #[test]
    fn test_broken_user_lesson_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.ron"), "(id: ").unwrap();
        let loader = LessonLoader::new(dir.path()).unwrap();
        let err = loader.load_all().unwrap_err();
        assert!(format!("{:#}", err).contains("broken.ron"));
    }

    #[test]
    fn test_load_by_difficulty() {
        let dir = tempfile::tempdir().unwrap();
        let loader = LessonLoader::new(dir.path()).unwrap();

        let all = loader.load_by_difficulty(DifficultyFilter::All).unwrap();
        let advanced = loader
            .load_by_difficulty(DifficultyFilter::Only(Difficulty::Advanced))
            .unwrap();
        assert!(!advanced.is_empty());
        assert!(advanced.len() < all.len());
        assert!(advanced.iter().all(|l| l.difficulty == Difficulty::Advanced));
    }
}
