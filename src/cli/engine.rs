//! # 引擎连接参数
//!
//! 所有需要远程引擎的子命令共享的参数，支持环境变量回退。
//!
//! ## 依赖关系
//! - 被 `cli/compact.rs`, `cli/stream.rs`, `cli/login.rs` 展开（flatten）
//! - 在 `commands/connect.rs` 中转换为 `BridgeConfig`

use clap::Args;

/// 引擎连接参数
#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    /// Engine web application URL
    #[arg(long, env = "BEMBATCH_URL", default_value = "https://app.bemify.no")]
    pub url: String,

    /// Bridge program that drives the browser session
    #[arg(long, env = "BEMBATCH_BRIDGE", default_value = "bembatch-bridge")]
    pub bridge: String,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Discard the saved session and log in again
    #[arg(long)]
    pub relogin: bool,
}
