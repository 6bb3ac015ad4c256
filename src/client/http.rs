//! HTTP 查询客户端（reqwest）
//!
//! `POST {base_url}/query`，JSON 载荷；200 时解析 response / execution_time_ms / dataframe，
//! 非 200 只取状态码，网络错误与超时统一为 TransportError。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::{QueryBackend, QueryResult, NO_RESPONSE};
use crate::session::QueryPayload;

/// 基于 reqwest 的查询客户端；Client 内部有连接池，可跨轮次复用
pub struct HttpQueryClient {
    client: Client,
    endpoint: String,
}

impl HttpQueryClient {
    pub fn new(base_url: &str) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("beltron/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/query", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn describe(e: &reqwest::Error, timeout: Duration) -> String {
    if e.is_timeout() {
        format!("request timed out after {:?}", timeout)
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}

/// 从 200 响应体提取回复；缺少 `response` 时用占位文字
pub fn success_from_body(body: Value) -> QueryResult {
    let mut obj = match body {
        Value::Object(obj) => obj,
        other => {
            return QueryResult::TransportError {
                message: format!("unexpected response body: {}", other),
            }
        }
    };

    let text = match obj.remove("response") {
        None | Some(Value::Null) => NO_RESPONSE.to_string(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    };
    let execution_time_ms = obj.get("execution_time_ms").and_then(Value::as_f64);
    // 空串视为没有表格
    let table = match obj.remove("dataframe") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    };

    QueryResult::Success {
        text,
        execution_time_ms,
        table,
    }
}

#[async_trait]
impl QueryBackend for HttpQueryClient {
    async fn send(&self, payload: &QueryPayload, timeout: Duration) -> QueryResult {
        debug!(endpoint = %self.endpoint, session = %payload.session_key, "Sending query");

        let resp = match self
            .client
            .post(&self.endpoint)
            .timeout(timeout)
            .json(payload)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                let message = describe(&e, timeout);
                warn!("Query failed: {}", message);
                return QueryResult::TransportError { message };
            }
        };

        let status = resp.status();
        if status != StatusCode::OK {
            warn!("Query service returned HTTP {}", status);
            return QueryResult::ServerError {
                status_code: status.as_u16(),
            };
        }

        match resp.json::<Value>().await {
            Ok(body) => success_from_body(body),
            Err(e) => {
                let message = describe(&e, timeout);
                warn!("Unreadable query response: {}", message);
                QueryResult::TransportError { message }
            }
        }
    }
}
