//! # 气候文件收集器
//!
//! 在输入目录中收集待模拟的气候文件。
//!
//! ## 功能
//! - glob 模式匹配（默认 `*.epw`）
//! - 顶层目录没有匹配时退回递归搜索
//! - 按路径排序，保证派发顺序稳定
//!
//! ## 依赖关系
//! - 被 `batch/loader.rs` 调用
//! - 使用 `walkdir` 遍历目录

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 文件收集器
pub struct FileCollector {
    /// 输入目录
    input: PathBuf,
    /// 匹配模式列表
    patterns: Vec<String>,
}

impl FileCollector {
    /// 创建新的文件收集器，默认匹配 `*.epw`
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            patterns: vec!["*.epw".to_string()],
        }
    }

    /// 设置匹配模式（逗号分隔的多模式）
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.patterns = pattern
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if self.patterns.is_empty() {
            self.patterns = vec!["*.epw".to_string()];
        }
        self
    }

    /// 收集文件：先查顶层，没有结果再递归
    pub fn collect(&self) -> Vec<PathBuf> {
        let top = self.walk(1);
        if !top.is_empty() {
            return top;
        }
        self.walk(usize::MAX)
    }

    fn walk(&self, max_depth: usize) -> Vec<PathBuf> {
        if !self.input.is_dir() {
            return vec![];
        }

        let mut files: Vec<PathBuf> = WalkDir::new(&self.input)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|entry| self.matches_patterns(entry.path()))
            .map(|e| e.path().to_path_buf())
            .collect();

        files.sort();
        files
    }

    /// 检查文件是否匹配任一模式
    fn matches_patterns(&self, path: &Path) -> bool {
        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => return false,
        };

        self.patterns
            .iter()
            .any(|pattern| Self::glob_match(pattern, filename))
    }

    /// 简单 glob 匹配（支持 * 和 ? 通配符）
    fn glob_match(pattern: &str, text: &str) -> bool {
        let pattern = pattern.as_bytes();
        let text = text.as_bytes();

        let mut p = 0;
        let mut t = 0;
        let mut star_p = None;
        let mut star_t = 0;

        while t < text.len() {
            if p < pattern.len() && (pattern[p] == b'?' || pattern[p] == text[t]) {
                p += 1;
                t += 1;
            } else if p < pattern.len() && pattern[p] == b'*' {
                star_p = Some(p);
                star_t = t;
                p += 1;
            } else if let Some(sp) = star_p {
                p = sp + 1;
                star_t += 1;
                t = star_t;
            } else {
                return false;
            }
        }

        while p < pattern.len() && pattern[p] == b'*' {
            p += 1;
        }

        p == pattern.len()
    }
}
