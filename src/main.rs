//! Beltron - BeltronGPT 终端客户端
//!
//! 入口：初始化日志、创建会话编排器与 TUI，并运行主循环。

use anyhow::Context;
use beltron::{core::create_chat, observability, ui::run_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志写文件：TUI 占用终端；默认 info，可通过 RUST_LOG 覆盖
    observability::init_to_file(observability::DEFAULT_LOG_FILE)
        .context("Failed to initialize logging")?;

    // 配置路径可由第一个参数指定，否则按 config/default.toml + BELTRON__* 加载
    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);

    // 创建会话：返回命令发送端、状态接收端、退出令牌
    let (cmd_tx, state_rx, shutdown) =
        create_chat(config_path).context("Failed to create chat session")?;

    // 启动 TUI 主循环（消费 state，向 cmd_tx 发送用户指令）
    run_app(state_rx, cmd_tx, shutdown)
        .await
        .context("App run failed")?;

    Ok(())
}
