//! # 桥接进程引擎
//!
//! 通过外部桥接程序访问浏览器中的模拟引擎。桥接程序由本进程启动，
//! 双方在 stdin/stdout 上逐行交换 JSON：
//!
//! ```text
//! -> {"op":"parseProject","text":"..."}
//! <- {"ok":{"handle":"p1","name":"Kontorbygg","category":"Kontor","zones":3}}
//! -> {"op":"poll","ticket":4}
//! <- {"ok":{"done":false,"progress":{"current":2,"total":12,"name":"Oslo"}}}
//! <- {"error":{"kind":"session","message":"login required"}}
//! ```
//!
//! 每个请求都应立即应答；长时间计算只通过 `poll` 观察。
//! 应答由独立的读取线程送入通道，等待不超过 `reply_timeout`；
//! 超时或读写失败后协议已失步，此后的请求一律以 `Bridge` 错误快速返回。
//!
//! 单次运行的结果无法解码（例如引擎把 NaN 写成 null）只算该运行失败，
//! 不算桥接故障。
//!
//! ## 依赖关系
//! - 实现 `engine::RemoteEngine`
//! - 被 `commands/` 启动
//! - 使用 `serde_json` 编解码协议

use super::{
    EngineError, EngineProgress, EngineResult, EngineSnapshot, RemoteEngine, RunOutcome,
    RunTicket,
};
use crate::error::{BembatchError, Result};
use crate::models::{BatchTally, ClimateHandle, ProjectModel, RawRunOutput};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// 默认的单次应答等待上限
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// 桥接进程配置
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// 桥接程序
    pub program: String,
    /// 引擎 URL
    pub url: String,
    /// 会话文件
    pub auth_state: PathBuf,
    /// 是否显示浏览器窗口
    pub headed: bool,
    /// 单次应答等待上限
    pub reply_timeout: Duration,
}

/// 桥接报告的会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Valid,
    Expired,
}

// ─────────────────────────────────────────────────────────────
// 协议
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
enum Request<'a> {
    Hello,
    ParseProject {
        text: &'a str,
    },
    ParseClimate {
        name: &'a str,
        text: &'a str,
    },
    StartSingle {
        project: &'a str,
        climate: &'a str,
        ticket: u64,
    },
    StartBatch {
        project: &'a str,
        climates: Vec<BatchItem<'a>>,
        ticket: u64,
    },
    Poll {
        ticket: u64,
    },
    Abandon {
        ticket: u64,
    },
    Release,
    Login,
    SaveSession,
}

#[derive(Debug, Serialize)]
struct BatchItem<'a> {
    name: &'a str,
    climate: &'a str,
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    ok: Option<Value>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    kind: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct HelloPayload {
    session: SessionStatus,
}

#[derive(Debug, Deserialize)]
struct ProjectPayload {
    handle: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    zones: usize,
}

#[derive(Debug, Deserialize)]
struct ClimatePayload {
    handle: String,
}

#[derive(Debug, Deserialize)]
struct PollPayload {
    #[serde(default)]
    done: bool,
    #[serde(default)]
    progress: EngineProgress,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunKind {
    Single,
    Batch,
}

impl ErrorBody {
    fn into_engine_error(self) -> EngineError {
        match self.kind.as_str() {
            "parse" => EngineError::Parse(self.message),
            "session" => EngineError::Session(self.message),
            "engine" => EngineError::Engine(self.message),
            other => EngineError::Bridge(format!("{} ({})", self.message, other)),
        }
    }
}

// ─────────────────────────────────────────────────────────────
// 引擎实现
// ─────────────────────────────────────────────────────────────

/// 通过桥接进程访问的远程引擎
pub struct BridgeEngine {
    child: Child,
    stdin: ChildStdin,
    replies: Receiver<io::Result<String>>,
    reply_timeout: Duration,
    /// 读写失败或应答超时后置位
    broken: bool,
    next_ticket: u64,
    active: Option<(RunTicket, RunKind)>,
}

impl BridgeEngine {
    /// 启动桥接进程
    pub fn launch(config: &BridgeConfig) -> Result<Self> {
        let mut cmd = Command::new(&config.program);
        cmd.arg("--url")
            .arg(&config.url)
            .arg("--auth-state")
            .arg(&config.auth_state);
        if config.headed {
            cmd.arg("--headed");
        }

        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                BembatchError::Bridge(format!("cannot start '{}': {}", config.program, e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BembatchError::Bridge("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BembatchError::Bridge("bridge stdout unavailable".to_string()))?;

        let replies = match spawn_reader(stdout) {
            Ok(replies) => replies,
            Err(e) => {
                child.kill().ok();
                child.wait().ok();
                return Err(BembatchError::Bridge(format!("cannot start reply reader: {}", e)));
            }
        };

        Ok(BridgeEngine {
            child,
            stdin,
            replies,
            reply_timeout: config.reply_timeout,
            broken: false,
            next_ticket: 0,
            active: None,
        })
    }

    /// 握手并返回会话状态
    pub fn hello(&mut self) -> EngineResult<SessionStatus> {
        let payload: HelloPayload = decode(self.request(&Request::Hello)?)?;
        Ok(payload.session)
    }

    /// 打开登录页面（需要 headed 模式）
    pub fn login(&mut self) -> EngineResult<()> {
        self.request(&Request::Login).map(|_| ())
    }

    /// 把当前浏览器会话写入会话文件
    pub fn save_session(&mut self) -> EngineResult<()> {
        self.request(&Request::SaveSession).map(|_| ())
    }

    fn request(&mut self, request: &Request<'_>) -> EngineResult<Value> {
        if self.broken {
            return Err(EngineError::Bridge(
                "bridge is out of sync after an earlier failure".to_string(),
            ));
        }

        let mut line = serde_json::to_string(request)
            .map_err(|e| EngineError::Bridge(format!("encode request: {}", e)))?;
        line.push('\n');
        if let Err(e) = self
            .stdin
            .write_all(line.as_bytes())
            .and_then(|_| self.stdin.flush())
        {
            self.broken = true;
            return Err(EngineError::Bridge(format!("write to bridge: {}", e)));
        }

        let reply = match self.replies.recv_timeout(self.reply_timeout) {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                self.broken = true;
                return Err(EngineError::Bridge(format!("read from bridge: {}", e)));
            }
            Err(RecvTimeoutError::Timeout) => {
                self.broken = true;
                return Err(EngineError::Bridge(format!(
                    "no reply within {:.1} s",
                    self.reply_timeout.as_secs_f64()
                )));
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.broken = true;
                return Err(EngineError::Bridge("bridge closed its output".to_string()));
            }
        };

        let response: Response = serde_json::from_str(reply.trim())
            .map_err(|e| EngineError::Bridge(format!("malformed reply: {}", e)))?;
        match response.error {
            Some(body) => Err(body.into_engine_error()),
            None => Ok(response.ok.unwrap_or(Value::Null)),
        }
    }

    fn issue_ticket(&mut self, kind: RunKind) -> RunTicket {
        self.next_ticket += 1;
        let ticket = RunTicket(self.next_ticket);
        self.active = Some((ticket, kind));
        ticket
    }
}

/// 在独立线程上逐行读取应答
fn spawn_reader(stdout: ChildStdout) -> io::Result<Receiver<io::Result<String>>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("bridge-reader".to_string())
        .spawn(move || {
            let mut reader = BufReader::new(stdout);
            loop {
                let mut line = String::new();
                match reader.read_line(&mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        if tx.send(Ok(line)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e));
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}

/// 把 poll 应答中的结果翻译为终态
///
/// 结果解码失败只影响这一次运行。
fn outcome_from(kind: RunKind, error: Option<String>, result: Option<Value>) -> Option<RunOutcome> {
    match (error, result) {
        (Some(message), _) => Some(RunOutcome::Failed(message)),
        (None, Some(value)) => Some(match kind {
            RunKind::Single => match serde_json::from_value::<RawRunOutput>(value) {
                Ok(raw) => RunOutcome::Single(raw),
                Err(e) => RunOutcome::Failed(format!("malformed result: {}", e)),
            },
            RunKind::Batch => match serde_json::from_value::<BatchTally>(value) {
                Ok(tally) => RunOutcome::Batch(tally),
                Err(e) => RunOutcome::Failed(format!("malformed tally: {}", e)),
            },
        }),
        (None, None) => None,
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> EngineResult<T> {
    serde_json::from_value(value).map_err(|e| EngineError::Bridge(format!("bad payload: {}", e)))
}

impl RemoteEngine for BridgeEngine {
    fn parse_project(&mut self, text: &str) -> EngineResult<ProjectModel> {
        let payload: ProjectPayload = decode(self.request(&Request::ParseProject { text })?)?;
        Ok(ProjectModel {
            handle: payload.handle,
            name: payload.name,
            category: payload.category,
            zone_count: payload.zones,
        })
    }

    fn parse_climate(&mut self, name: &str, text: &str) -> EngineResult<ClimateHandle> {
        let payload: ClimatePayload =
            decode(self.request(&Request::ParseClimate { name, text })?)?;
        Ok(ClimateHandle(payload.handle))
    }

    fn start_single(
        &mut self,
        project: &ProjectModel,
        climate: &ClimateHandle,
    ) -> EngineResult<RunTicket> {
        let ticket = self.issue_ticket(RunKind::Single);
        self.request(&Request::StartSingle {
            project: &project.handle,
            climate: climate.as_str(),
            ticket: ticket.0,
        })?;
        Ok(ticket)
    }

    fn start_batch(
        &mut self,
        project: &ProjectModel,
        climates: &[(String, ClimateHandle)],
    ) -> EngineResult<RunTicket> {
        let ticket = self.issue_ticket(RunKind::Batch);
        let items = climates
            .iter()
            .map(|(name, handle)| BatchItem {
                name,
                climate: handle.as_str(),
            })
            .collect();
        self.request(&Request::StartBatch {
            project: &project.handle,
            climates: items,
            ticket: ticket.0,
        })?;
        Ok(ticket)
    }

    fn poll(&mut self, ticket: RunTicket) -> EngineResult<EngineSnapshot> {
        let kind = match self.active {
            Some((active, kind)) if active == ticket => kind,
            _ => return Ok(EngineSnapshot::default()),
        };

        let payload: PollPayload = decode(self.request(&Request::Poll { ticket: ticket.0 })?)?;
        let outcome = outcome_from(kind, payload.error, payload.result);

        Ok(EngineSnapshot {
            done: payload.done,
            progress: payload.progress,
            outcome,
        })
    }

    fn abandon(&mut self, ticket: RunTicket) {
        if self.active.map(|(t, _)| t) == Some(ticket) {
            self.active = None;
        }
        // 尽力而为，桥接失败时不影响后续调度
        let _ = self.request(&Request::Abandon { ticket: ticket.0 });
    }

    fn release(&mut self) {
        self.active = None;
        let _ = self.request(&Request::Release);
    }
}

impl Drop for BridgeEngine {
    fn drop(&mut self) {
        self.child.kill().ok();
        self.child.wait().ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_encoding() {
        let json = serde_json::to_string(&Request::StartSingle {
            project: "p1",
            climate: "c2",
            ticket: 7,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"op":"startSingle","project":"p1","climate":"c2","ticket":7}"#
        );

        let json = serde_json::to_string(&Request::SaveSession).unwrap();
        assert_eq!(json, r#"{"op":"saveSession"}"#);
    }

    #[test]
    fn test_error_reply_kinds() {
        let reply: Response =
            serde_json::from_str(r#"{"error":{"kind":"session","message":"login required"}}"#)
                .unwrap();
        let err = reply.error.unwrap().into_engine_error();
        assert_eq!(err, EngineError::Session("login required".to_string()));

        let reply: Response =
            serde_json::from_str(r#"{"error":{"kind":"weird","message":"x"}}"#).unwrap();
        assert!(matches!(
            reply.error.unwrap().into_engine_error(),
            EngineError::Bridge(_)
        ));
    }

    #[test]
    fn test_poll_payload_defaults() {
        let payload: PollPayload = serde_json::from_str(
            r#"{"done":false,"progress":{"current":2,"total":12,"name":"Oslo"}}"#,
        )
        .unwrap();
        assert!(!payload.done);
        assert_eq!(payload.progress.completed, 2);
        assert_eq!(payload.progress.name, "Oslo");
        assert!(payload.result.is_none());

        let payload: PollPayload = serde_json::from_str(r#"{"done":true}"#).unwrap();
        assert!(payload.done);
        assert_eq!(payload.progress, EngineProgress::default());
    }

    #[test]
    fn test_launch_missing_program() {
        let config = BridgeConfig {
            program: "definitely-not-a-bembatch-bridge".to_string(),
            url: "https://example.invalid".to_string(),
            auth_state: PathBuf::from("/tmp/none.json"),
            headed: false,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        };
        assert!(matches!(
            BridgeEngine::launch(&config),
            Err(BembatchError::Bridge(_))
        ));
    }

    #[test]
    fn test_malformed_result_fails_only_the_run() {
        let value: Value = serde_json::from_str(
            r#"{"stepResultsPerSone":{"Sone 1":[{"inneklima":{"luftTemperatur":null}}]}}"#,
        )
        .unwrap();
        match outcome_from(RunKind::Single, None, Some(value)) {
            Some(RunOutcome::Failed(message)) => assert!(message.starts_with("malformed result")),
            other => panic!("unexpected outcome: {:?}", other),
        }

        let value: Value = serde_json::from_str(r#"{"succeeded":"Oslo"}"#).unwrap();
        match outcome_from(RunKind::Batch, None, Some(value)) {
            Some(RunOutcome::Failed(message)) => assert!(message.starts_with("malformed tally")),
            other => panic!("unexpected outcome: {:?}", other),
        }

        // 引擎报告的错误优先于结果
        let outcome = outcome_from(
            RunKind::Single,
            Some("solver diverged".to_string()),
            Some(Value::Null),
        );
        assert_eq!(outcome, Some(RunOutcome::Failed("solver diverged".to_string())));
        assert_eq!(outcome_from(RunKind::Single, None, None), None);
    }

    #[cfg(unix)]
    fn script_bridge(dir: &tempfile::TempDir, body: &str, reply_timeout: Duration) -> BridgeConfig {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join("bridge.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        BridgeConfig {
            program: path.to_string_lossy().into_owned(),
            url: "https://example.invalid".to_string(),
            auth_state: dir.path().join("auth.json"),
            headed: false,
            reply_timeout,
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_poll_with_null_temperature_is_a_failed_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = script_bridge(
            &dir,
            r#"while read -r line; do
  case "$line" in
    *'"op":"poll"'*) echo '{"ok":{"done":true,"result":{"stepResultsPerSone":{"Sone 1":[{"inneklima":{"luftTemperatur":null}}]}}}}' ;;
    *) echo '{"ok":null}' ;;
  esac
done"#,
            DEFAULT_REPLY_TIMEOUT,
        );
        let mut engine = BridgeEngine::launch(&config).unwrap();

        let project = ProjectModel {
            handle: "p1".to_string(),
            name: "Kontor".to_string(),
            category: "Kontorbygg".to_string(),
            zone_count: 1,
        };
        let ticket = engine
            .start_single(&project, &ClimateHandle("c1".to_string()))
            .unwrap();
        let snapshot = engine.poll(ticket).unwrap();

        assert!(snapshot.done);
        match snapshot.outcome {
            Some(RunOutcome::Failed(message)) => assert!(message.starts_with("malformed result")),
            other => panic!("unexpected outcome: {:?}", other),
        }

        // 桥接仍然可用
        assert!(!engine.broken);
    }

    #[cfg(unix)]
    #[test]
    fn test_silent_bridge_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let config = script_bridge(&dir, "read -r line\nexec sleep 30", Duration::from_millis(200));
        let mut engine = BridgeEngine::launch(&config).unwrap();

        let started = std::time::Instant::now();
        assert!(matches!(engine.hello(), Err(EngineError::Bridge(_))));
        assert!(started.elapsed() < Duration::from_secs(5));

        // 失步之后不再等待
        let started = std::time::Instant::now();
        assert!(matches!(engine.hello(), Err(EngineError::Bridge(_))));
        assert!(started.elapsed() < Duration::from_millis(100));
    }
}
