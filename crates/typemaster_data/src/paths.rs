use anyhow::Result;
use std::path::{Path, PathBuf};

/// 覆盖数据目录的环境变量
pub const HOME_ENV: &str = "TYPEMASTER_HOME";

/// 应用数据目录布局
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    root: PathBuf,
}

impl AppPaths {
    /// `$TYPEMASTER_HOME`，否则系统数据目录下的 `TypeMaster`
    pub fn resolve() -> Result<Self> {
        if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::with_root(home));
        }

        #[cfg(target_os = "windows")]
        let base = dirs::data_dir().ok_or_else(|| anyhow::anyhow!("无法获取数据目录"))?;

        #[cfg(not(target_os = "windows"))]
        let base = dirs::data_local_dir().ok_or_else(|| anyhow::anyhow!("无法获取数据目录"))?;

        Ok(Self::with_root(base.join("TypeMaster")))
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 用户自定义课程目录
    pub fn lessons_dir(&self) -> PathBuf {
        self.root.join("lessons")
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join("typemaster.db")
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join("typemaster.log")
    }
}
