//! # 会话存储
//!
//! 桥接程序把浏览器的登录状态保存为一个不透明的 JSON 文件；
//! 本模块只关心它在哪里、是否存在、何时作废。
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 使用 `dirs` 定位用户目录

use crate::error::{BembatchError, Result};

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// 默认会话文件名（位于用户主目录）
pub const AUTH_STATE_FILE: &str = ".bembatch_auth_state.json";

/// 会话文件
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// 主目录下的默认位置
    pub fn locate() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            BembatchError::InvalidArgument("cannot determine home directory".to_string())
        })?;
        Ok(Self::at(home.join(AUTH_STATE_FILE)))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        SessionStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 是否有已保存且非空的会话
    pub fn is_available(&self) -> bool {
        fs::metadata(&self.path)
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false)
    }

    /// 删除已保存的会话；文件不存在不算错误
    pub fn invalidate(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BembatchError::FileWriteError {
                path: self.path.display().to_string(),
                source: e,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_availability_follows_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::at(dir.path().join(AUTH_STATE_FILE));
        assert!(!store.is_available());

        fs::write(store.path(), "").unwrap();
        assert!(!store.is_available());

        fs::write(store.path(), r#"{"cookies":[]}"#).unwrap();
        assert!(store.is_available());

        store.invalidate().unwrap();
        assert!(!store.is_available());
        // 再次作废不报错
        store.invalidate().unwrap();
    }
}
