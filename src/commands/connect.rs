//! # 引擎连接与登录流程
//!
//! 启动桥接进程、检查会话，必要时走一次交互式登录：
//! 打开可见浏览器 → 用户登录 → 终端按 ENTER → 保存会话。
//!
//! 批次运行中途报告会话失效时，作废会话、重新登录并把整个批次重试一次。
//!
//! ## 依赖关系
//! - 被 `commands/compact.rs`, `commands/stream.rs`, `commands/login.rs` 使用
//! - 使用 `engine::BridgeEngine`, `utils/session.rs`
//! - 使用 `console` 读取终端输入

use crate::cli::engine::EngineArgs;
use crate::engine::bridge::{SessionStatus, DEFAULT_REPLY_TIMEOUT};
use crate::engine::{BridgeConfig, BridgeEngine};
use crate::error::{BembatchError, Result};
use crate::utils::output;
use crate::utils::progress;
use crate::utils::session::SessionStore;

use console::Term;

/// 由命令行参数构造桥接配置
pub fn bridge_config(args: &EngineArgs, store: &SessionStore, headed: bool) -> BridgeConfig {
    BridgeConfig {
        program: args.bridge.clone(),
        url: args.url.clone(),
        auth_state: store.path().to_path_buf(),
        headed,
        reply_timeout: DEFAULT_REPLY_TIMEOUT,
    }
}

/// 交互式登录并保存会话
pub fn login_flow(args: &EngineArgs, store: &SessionStore) -> Result<()> {
    output::print_info("A browser window will open. Log in to the engine there.");

    let mut engine = BridgeEngine::launch(&bridge_config(args, store, true))?;
    engine.login()?;

    output::print_info("Press ENTER here once you are logged in...");
    Term::stdout()
        .read_line()
        .map_err(|e| BembatchError::Bridge(format!("cannot read from terminal: {}", e)))?;

    engine.save_session()?;
    output::print_success(&format!("Session saved to {}", store.path().display()));
    Ok(())
}

/// 启动引擎并确认会话有效
pub fn connect(args: &EngineArgs, store: &SessionStore) -> Result<BridgeEngine> {
    if !store.is_available() {
        login_flow(args, store)?;
    }

    let spinner = progress::create_spinner(&format!("Loading engine from {}...", args.url));
    let mut engine = BridgeEngine::launch(&bridge_config(args, store, args.headed))?;
    let status = engine.hello();
    spinner.finish_and_clear();

    match status? {
        SessionStatus::Valid => {
            output::print_success("Engine loaded");
            Ok(engine)
        }
        SessionStatus::Expired => {
            output::print_warning("Session has expired");
            drop(engine);
            store.invalidate()?;
            login_flow(args, store)?;

            let mut engine = BridgeEngine::launch(&bridge_config(args, store, args.headed))?;
            match engine.hello()? {
                SessionStatus::Valid => Ok(engine),
                SessionStatus::Expired => Err(BembatchError::SessionExpired(
                    "still not logged in after login".to_string(),
                )),
            }
        }
    }
}

/// 在有效会话上运行 `job`；会话中途失效时重新登录并重试一次
pub fn with_session<T, F>(args: &EngineArgs, job: F) -> Result<T>
where
    F: Fn(&mut BridgeEngine) -> Result<T>,
{
    let store = SessionStore::locate()?;
    if args.relogin {
        store.invalidate()?;
        output::print_info("Discarded saved session");
    }

    let mut engine = connect(args, &store)?;
    match job(&mut engine) {
        Err(e) if e.is_session_expired() => {
            output::print_warning(&format!("{}; logging in again and retrying", e));
            drop(engine);
            store.invalidate()?;
            login_flow(args, &store)?;
            let mut engine = connect(args, &store)?;
            job(&mut engine)
        }
        other => other,
    }
}
