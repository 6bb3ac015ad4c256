//! 回复解释：QueryResult -> 助手消息 + 渲染命令
//!
//! 三种结果都恰好追加一条 Assistant 消息。表格解码失败时降级：丢弃表格、保留文字回复。

use tracing::warn;

use crate::client::QueryResult;
use crate::presentation::RenderCommand;
use crate::response::TabularData;
use crate::session::{Role, SessionStore};

pub fn server_error_text(status_code: u16) -> String {
    format!("❌ Server Error {}", status_code)
}

pub fn transport_error_text(message: &str) -> String {
    format!("⚠️ Unable to reach server: {}", message)
}

/// 把执行耗时拼到回复文字后面（耗时不单独存储）
pub fn with_latency(text: &str, execution_time_ms: f64) -> String {
    let ms = if execution_time_ms.is_finite() {
        execution_time_ms.max(0.0).round() as u64
    } else {
        0
    };
    format!("{}\n\n⏱ {} ms", text, ms)
}

pub struct ResponseInterpreter;

impl ResponseInterpreter {
    pub fn apply(result: QueryResult, store: &mut SessionStore) -> Vec<RenderCommand> {
        let (text, table) = match result {
            QueryResult::Success {
                text,
                execution_time_ms,
                table,
            } => {
                let text = match execution_time_ms {
                    Some(ms) => with_latency(&text, ms),
                    None => text,
                };
                (text, table.as_deref().and_then(Self::decode_table))
            }
            QueryResult::ServerError { status_code } => (server_error_text(status_code), None),
            QueryResult::TransportError { message } => (transport_error_text(&message), None),
        };

        let message = store.append_message(Role::Assistant, text, table);
        let mut commands = vec![RenderCommand::Message {
            role: message.role,
            text: message.text.clone(),
        }];
        if let Some(table) = &message.attachments {
            commands.push(RenderCommand::Table(table.clone()));
        }
        commands
    }

    fn decode_table(serialized: &str) -> Option<TabularData> {
        if serialized.trim().is_empty() {
            return None;
        }
        match TabularData::decode(serialized) {
            Ok(table) => Some(table),
            Err(e) => {
                warn!("Dropping table from reply: {}", e);
                None
            }
        }
    }
}
