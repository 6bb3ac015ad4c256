//! 脚本化查询后端（用于测试与离线演示，无需服务）
//!
//! 按顺序返回预设结果；预设用完后回显用户输入。记录每次收到的载荷，便于断言。

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::client::{QueryBackend, QueryResult};
use crate::session::QueryPayload;

#[derive(Debug, Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<QueryResult>>,
    received: Mutex<Vec<QueryPayload>>,
}

impl ScriptedBackend {
    pub fn new(script: impl IntoIterator<Item = QueryResult>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            received: Mutex::new(Vec::new()),
        }
    }

    /// 至今收到的全部载荷（按发送顺序）
    pub fn received(&self) -> Vec<QueryPayload> {
        self.received
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl QueryBackend for ScriptedBackend {
    async fn send(&self, payload: &QueryPayload, _timeout: Duration) -> QueryResult {
        if let Ok(mut received) = self.received.lock() {
            received.push(payload.clone());
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        next.unwrap_or_else(|| QueryResult::text(format!("Echo from Mock: {}", payload.query)))
    }
}
