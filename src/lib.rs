//! Beltron - BeltronGPT 终端客户端
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误、轮次状态、回合驱动、主控循环
//! - **session**: 身份、对话历史、请求构造
//! - **client**: 查询后端抽象与实现（HTTP / 脚本化 Mock）
//! - **response**: 回复解释与表格解码
//! - **presentation**: 渲染命令与展示适配器边界
//! - **observability**: 日志初始化
//! - **ui**: Ratatui TUI 界面

pub mod client;
pub mod config;
pub mod core;
pub mod observability;
pub mod presentation;
pub mod response;
pub mod session;
pub mod ui;
