//! # 数据集加载器
//!
//! 把项目定义和一组命名气候数据装载进远程引擎，得到独占的 `BatchSession`。
//!
//! ## 规则
//! - 气候列表为空 → `EmptyInput`
//! - 气候名称重复 → `DuplicateClimateName`（在任何解析之前拒绝）
//! - 项目只解析一次；任一气候解析失败都使整个批次中止
//!
//! ## 依赖关系
//! - 被 `commands/compact.rs`, `commands/stream.rs` 调用
//! - 使用 `batch/collector.rs` 收集文件，`parsers/epw.rs` 命名
//! - 使用 `engine::RemoteEngine`

use super::collector::FileCollector;
use crate::engine::{EngineError, RemoteEngine};
use crate::error::{BembatchError, Result};
use crate::models::{ClimateDataset, ProjectModel};
use crate::parsers::{self, epw};

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// 一个待装载的气候输入
#[derive(Debug, Clone)]
pub struct ClimateInput {
    pub name: String,
    pub text: String,
    pub path: PathBuf,
}

/// 在目录中查找气候文件
pub fn collect_climate_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(BembatchError::DirectoryNotFound {
            path: dir.display().to_string(),
        });
    }

    let files = FileCollector::new(dir.to_path_buf())
        .with_pattern(pattern)
        .collect();
    if files.is_empty() {
        return Err(BembatchError::NoClimateFiles {
            path: dir.display().to_string(),
        });
    }
    Ok(files)
}

/// 读取气候文件并命名
pub fn read_climate_inputs(files: &[PathBuf]) -> Result<Vec<ClimateInput>> {
    files
        .iter()
        .map(|path| {
            let text = parsers::read_text_lossy(path)?;
            Ok(ClimateInput {
                name: epw::climate_name(&text, path),
                text,
                path: path.clone(),
            })
        })
        .collect()
}

/// 已装载的批次会话
///
/// 独占引擎的可变借用：同一引擎上下文不能同时存在两个会话。
/// 会话结束（drop）时释放引擎中的项目与气候。
pub struct BatchSession<'e, E: RemoteEngine + ?Sized> {
    engine: &'e mut E,
    pub project: ProjectModel,
    pub climates: Vec<ClimateDataset>,
}

impl<'e, E: RemoteEngine + ?Sized> BatchSession<'e, E> {
    pub fn engine(&mut self) -> &mut E {
        &mut *self.engine
    }

    /// 按输入顺序的气候名称
    pub fn climate_names(&self) -> Vec<String> {
        self.climates.iter().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.climates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.climates.is_empty()
    }
}

impl<E: RemoteEngine + ?Sized> Drop for BatchSession<'_, E> {
    fn drop(&mut self) {
        self.engine.release();
    }
}

/// 装载项目和气候
pub fn stage<'e, E: RemoteEngine + ?Sized>(
    engine: &'e mut E,
    project_text: &str,
    inputs: &[ClimateInput],
) -> Result<BatchSession<'e, E>> {
    if inputs.is_empty() {
        return Err(BembatchError::EmptyInput);
    }

    let mut seen = HashSet::new();
    for input in inputs {
        if !seen.insert(input.name.as_str()) {
            return Err(BembatchError::DuplicateClimateName {
                name: input.name.clone(),
            });
        }
    }

    let project = match engine.parse_project(project_text) {
        Ok(project) => project,
        Err(err) => {
            engine.release();
            return Err(match err {
                EngineError::Parse(reason) | EngineError::Engine(reason) => {
                    BembatchError::ProjectParse { reason }
                }
                other => other.into(),
            });
        }
    };

    let mut climates = Vec::with_capacity(inputs.len());
    for input in inputs {
        match engine.parse_climate(&input.name, &input.text) {
            Ok(handle) => climates.push(ClimateDataset {
                name: input.name.clone(),
                raw_content: input.text.clone(),
                handle,
            }),
            Err(err) => {
                engine.release();
                return Err(match err {
                    EngineError::Parse(reason) | EngineError::Engine(reason) => {
                        BembatchError::ClimateParse {
                            name: input.name.clone(),
                            reason,
                        }
                    }
                    other => other.into(),
                });
            }
        }
    }

    Ok(BatchSession {
        engine,
        project,
        climates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fake::FakeEngine;
    use std::fs;

    fn inputs(names: &[&str]) -> Vec<ClimateInput> {
        names
            .iter()
            .map(|n| ClimateInput {
                name: n.to_string(),
                text: format!("LOCATION,{},-,NOR\n", n),
                path: PathBuf::from(format!("{}.epw", n)),
            })
            .collect()
    }

    #[test]
    fn test_stage_parses_everything_in_order() {
        let mut engine = FakeEngine::new();
        let session = stage(&mut engine, "Kontorbygg", &inputs(&["Oslo", "Bergen"])).unwrap();
        assert_eq!(session.project.name, "Kontorbygg");
        assert_eq!(session.climate_names(), vec!["Oslo", "Bergen"]);
        drop(session);
        assert!(engine.released);
    }

    #[test]
    fn test_empty_input_rejected() {
        let mut engine = FakeEngine::new();
        assert!(matches!(
            stage(&mut engine, "x", &[]).err(),
            Some(BembatchError::EmptyInput)
        ));
    }

    #[test]
    fn test_duplicate_names_rejected_before_parsing() {
        let mut engine = FakeEngine::new();
        let err = stage(&mut engine, "x", &inputs(&["Oslo", "Oslo"])).err();
        match err {
            Some(BembatchError::DuplicateClimateName { name }) => assert_eq!(name, "Oslo"),
            _ => panic!("expected duplicate name error"),
        }
        assert_eq!(engine.climate_parses, 0);
    }

    #[test]
    fn test_one_malformed_climate_aborts_batch() {
        let mut engine = FakeEngine::new().bad_climate("Bergen");
        let err = stage(&mut engine, "x", &inputs(&["Oslo", "Bergen", "Trondheim"])).err();
        match err {
            Some(err @ BembatchError::ClimateParse { .. }) => assert!(err.is_input_error()),
            _ => panic!("expected climate parse error"),
        }
        assert!(engine.dispatched.is_empty());
        assert!(engine.released);
    }

    #[test]
    fn test_project_session_error_is_distinct() {
        let mut engine = FakeEngine::new();
        engine.project_error = Some(EngineError::Session("expired".to_string()));
        let err = stage(&mut engine, "x", &inputs(&["Oslo"])).err();
        assert!(matches!(err, Some(ref e) if e.is_session_expired()));

        engine.project_error = Some(EngineError::Parse("bad sxi".to_string()));
        let err = stage(&mut engine, "x", &inputs(&["Oslo"])).err();
        assert!(matches!(err, Some(BembatchError::ProjectParse { .. })));
    }

    #[test]
    fn test_read_inputs_names_from_location() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.epw"),
            "LOCATION,Oslo Blindern,-,NOR,IWEC,014920,59.95,10.72,1.0,94.0\n",
        )
        .unwrap();
        fs::write(dir.path().join("b.epw"), "no header\n").unwrap();

        let files = collect_climate_files(dir.path(), "*.epw").unwrap();
        let inputs = read_climate_inputs(&files).unwrap();
        let names: Vec<_> = inputs.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Oslo Blindern", "b"]);
    }

    #[test]
    fn test_collect_reports_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            collect_climate_files(dir.path(), "*.epw"),
            Err(BembatchError::NoClimateFiles { .. })
        ));
    }
}
