//! 会话编排器：主控循环
//!
//! 负责：加载配置、创建查询后端与会话、建立 cmd/state 两通道，
//! 并在后台任务中按顺序消费用户命令（Login/Submit/Logout/Quit），更新 UI 状态。
//! 进行中的请求不会被新命令打断：期间提交的输入在通道中排队，待上一轮结束后处理。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{HttpQueryClient, QueryBackend, ScriptedBackend};
use crate::config::{load_config, AppConfig};
use crate::core::{ChatError, ChatSession, StateProjector, UiState};
use crate::presentation::PresentationAdapter;
use crate::session::{Credentials, SessionStore};

/// `api.base_url` 设为该值时使用本地回显后端，便于离线演示
pub const MOCK_BASE_URL: &str = "mock";

/// 从 UI 发往编排器的用户命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 提交登录表单
    Login {
        username: String,
        password: String,
        context: Option<String>,
    },
    /// 提交用户输入，触发一轮查询
    Submit(String),
    /// 登出并清空会话
    Logout,
    /// 退出应用
    Quit,
}

/// 根据配置选择查询后端（HTTP / 本地回显）
pub(crate) fn create_backend_from_config(cfg: &AppConfig) -> anyhow::Result<Arc<dyn QueryBackend>> {
    if cfg.api.base_url.eq_ignore_ascii_case(MOCK_BASE_URL) {
        warn!("api.base_url is \"mock\", using local echo backend");
        return Ok(Arc::new(ScriptedBackend::default()));
    }
    info!("Using query service at {}", cfg.api.base_url);
    let client = HttpQueryClient::new(&cfg.api.base_url).context("Failed to build HTTP client")?;
    Ok(Arc::new(client))
}

/// 执行单条命令；Quit 由主循环处理
pub async fn apply_command(
    session: &mut ChatSession,
    cmd: Command,
    adapter: &mut dyn PresentationAdapter,
) -> Result<(), ChatError> {
    match cmd {
        Command::Login {
            username,
            password,
            context,
        } => session.submit_login(&username, &password, context, adapter),
        Command::Submit(text) => session.submit_utterance(&text, adapter).await,
        Command::Logout => {
            session.logout(adapter);
            Ok(())
        }
        Command::Quit => Ok(()),
    }
}

/// 在后台任务中运行会话：启动后依次处理命令，直到 Quit、通道关闭或 shutdown 触发。
/// 任务结束时交还会话与适配器。
pub fn spawn_session<A>(
    mut session: ChatSession,
    mut adapter: A,
    shutdown: CancellationToken,
) -> (mpsc::UnboundedSender<Command>, JoinHandle<(ChatSession, A)>)
where
    A: PresentationAdapter + 'static,
{
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();

    let handle = tokio::spawn(async move {
        session.start(&mut adapter);
        loop {
            let cmd = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                cmd = cmd_rx.recv() => match cmd {
                    Some(cmd) => cmd,
                    None => break, // cmd_tx 已关闭
                },
            };
            if cmd == Command::Quit {
                break;
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                result = apply_command(&mut session, cmd, &mut adapter) => {
                    if let Err(e) = result {
                        debug!("Command rejected: {}", e);
                    }
                }
            }
        }
        (session, adapter)
    });

    (cmd_tx, handle)
}

/// 创建会话运行时：返回命令发送端、状态接收端与退出令牌
pub fn create_chat(
    config_path: Option<PathBuf>,
) -> anyhow::Result<(
    mpsc::UnboundedSender<Command>,
    watch::Receiver<UiState>,
    CancellationToken,
)> {
    let cfg = load_config(config_path).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let backend = create_backend_from_config(&cfg)?;
    let store = SessionStore::new(Credentials::new(
        cfg.auth.username.clone(),
        cfg.auth.password.clone(),
    ));
    let session = ChatSession::new(store, backend, cfg.api.timeout())
        .with_mode(cfg.app.mode)
        .with_default_context(cfg.app.departments.first().cloned());

    let (projector, state_rx) = StateProjector::new(cfg.app.name.clone(), cfg.app.departments.clone());
    let shutdown = CancellationToken::new();
    let (cmd_tx, _handle) = spawn_session(session, projector, shutdown.clone());

    Ok((cmd_tx, state_rx, shutdown))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::QueryResult;
    use crate::presentation::RecordingAdapter;
    use crate::session::Role;
    use std::time::Duration;

    #[tokio::test]
    async fn test_queued_submissions_processed_in_order() {
        let backend = Arc::new(ScriptedBackend::new([
            QueryResult::text("first"),
            QueryResult::text("second"),
        ]));
        let session = ChatSession::new(SessionStore::default(), backend, Duration::from_secs(5));
        let (cmd_tx, handle) =
            spawn_session(session, RecordingAdapter::default(), CancellationToken::new());

        cmd_tx
            .send(Command::Login {
                username: "admin".into(),
                password: "admin".into(),
                context: Some("Education".into()),
            })
            .unwrap();
        cmd_tx.send(Command::Submit("a".into())).unwrap();
        cmd_tx.send(Command::Submit("  ".into())).unwrap();
        cmd_tx.send(Command::Submit("b".into())).unwrap();
        cmd_tx.send(Command::Quit).unwrap();

        let (session, ui) = handle.await.unwrap();
        let texts: Vec<&str> = session
            .store()
            .history()
            .iter()
            .map(|m| m.text.as_str())
            .collect();
        assert_eq!(texts, vec!["a", "first", "b", "second"]);
        assert_eq!(
            ui.messages(),
            vec![
                (Role::User, "a"),
                (Role::Assistant, "first"),
                (Role::User, "b"),
                (Role::Assistant, "second"),
            ]
        );
    }

    #[tokio::test]
    async fn test_logout_returns_to_login() {
        let session = ChatSession::new(
            SessionStore::default(),
            Arc::new(ScriptedBackend::default()),
            Duration::from_secs(5),
        );
        let (cmd_tx, handle) =
            spawn_session(session, RecordingAdapter::default(), CancellationToken::new());
        cmd_tx
            .send(Command::Login {
                username: "admin".into(),
                password: "admin".into(),
                context: None,
            })
            .unwrap();
        cmd_tx.send(Command::Submit("hi".into())).unwrap();
        cmd_tx.send(Command::Logout).unwrap();
        drop(cmd_tx);

        let (session, _) = handle.await.unwrap();
        assert!(!session.store().is_logged_in());
        assert!(session.store().history().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_stops_loop() {
        let session = ChatSession::new(
            SessionStore::default(),
            Arc::new(ScriptedBackend::default()),
            Duration::from_secs(5),
        );
        let shutdown = CancellationToken::new();
        let (_cmd_tx, handle) =
            spawn_session(session, RecordingAdapter::default(), shutdown.clone());
        shutdown.cancel();
        assert!(handle.await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_backend_echoes() {
        let mut cfg = AppConfig::default();
        cfg.api.base_url = "MOCK".into();
        let backend = create_backend_from_config(&cfg).unwrap();
        let payload = crate::session::RequestBuilder::build(
            "ping",
            &crate::session::Identity::anonymous(),
        )
        .unwrap();
        assert_eq!(
            backend.send(&payload, Duration::from_secs(1)).await,
            QueryResult::text("Echo from Mock: ping")
        );
    }

    #[test]
    fn test_http_backend_from_config() {
        let cfg = AppConfig::default();
        assert!(create_backend_from_config(&cfg).is_ok());
    }
}
