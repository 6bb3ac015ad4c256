//! 查询客户端抽象
//!
//! 所有后端（HTTP / 脚本化 Mock）实现 QueryBackend：每次调用恰好一次尝试、不重试，
//! 所有失败都表示为 QueryResult 的变体，不会以错误形式越过这一边界。

use std::time::Duration;

use async_trait::async_trait;

use crate::session::QueryPayload;

/// 200 响应缺少 `response` 字段时使用的占位文字
pub const NO_RESPONSE: &str = "No response.";

/// 一次查询的结果
#[derive(Clone, Debug, PartialEq)]
pub enum QueryResult {
    Success {
        text: String,
        execution_time_ms: Option<f64>,
        /// 原样保留的 `dataframe` 字符串，由 ResponseInterpreter 解码
        table: Option<String>,
    },
    /// 非 200 状态码；响应体不读取
    ServerError { status_code: u16 },
    /// 连接失败、DNS 失败、超时、响应体无法读取或解析
    TransportError { message: String },
}

impl QueryResult {
    pub fn text(text: impl Into<String>) -> Self {
        QueryResult::Success {
            text: text.into(),
            execution_time_ms: None,
            table: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, QueryResult::Success { .. })
    }
}

/// 查询后端 trait
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// 发送一次查询；timeout 为墙钟上限，超时与其它传输错误对调用方无区别
    async fn send(&self, payload: &QueryPayload, timeout: Duration) -> QueryResult;
}
