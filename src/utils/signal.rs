//! # 中断监听
//!
//! 在后台线程上等待 Ctrl-C，收到后置位 `CancelToken`。
//! 调度器在轮询边界检查该标志，停止派发并把未完成的气候标记为失败。
//! 第二次 Ctrl-C 立即以 130 退出。
//!
//! ## 依赖关系
//! - 被 `commands/compact.rs`, `commands/stream.rs` 使用
//! - 使用 `tokio::signal`

use crate::batch::CancelToken;
use crate::utils::output;

use std::thread;

/// 启动监听线程；线程随进程结束
pub fn watch_ctrl_c(cancel: CancelToken) {
    let spawned = thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    output::print_warning(&format!("Ctrl-C handler unavailable: {}", e));
                    return;
                }
            };
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }
                output::print_warning("Interrupted, finishing current poll (Ctrl-C again to quit)...");
                cancel.cancel();

                if tokio::signal::ctrl_c().await.is_ok() {
                    output::print_error("Interrupted twice, exiting");
                    std::process::exit(130);
                }
            });
        });

    if let Err(e) = spawned {
        output::print_warning(&format!("Ctrl-C handler unavailable: {}", e));
    }
}
