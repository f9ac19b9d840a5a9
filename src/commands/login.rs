//! # login 命令实现
//!
//! 作废已保存的会话并执行一次交互式登录。
//!
//! ## 依赖关系
//! - 使用 `cli/login.rs` 定义的参数
//! - 使用 `commands/connect.rs`, `utils/session.rs`

use super::connect;
use crate::cli::login::LoginArgs;
use crate::error::Result;
use crate::utils::output;
use crate::utils::session::SessionStore;

/// 执行 login 命令
pub fn execute(args: LoginArgs) -> Result<()> {
    output::print_header("Engine Login");

    let store = SessionStore::locate()?;
    store.invalidate()?;
    connect::login_flow(&args.engine, &store)?;

    output::print_done("Logged in");
    Ok(())
}
