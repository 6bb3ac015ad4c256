//! 单个会话的回合驱动
//!
//! 一轮：追加 User 消息 -> 构造载荷 -> 发送 -> 解释结果并追加 Assistant 消息 -> 回到 Idle。
//! `&mut self` 加上 SessionStore 的单飞标记保证同一会话最多一个进行中的请求。

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::client::QueryBackend;
use crate::config::SessionMode;
use crate::core::{ChatError, TurnPhase};
use crate::presentation::{LoginPrompt, PresentationAdapter};
use crate::response::ResponseInterpreter;
use crate::session::{RequestBuilder, Role, SessionStore};

pub struct ChatSession {
    store: SessionStore,
    backend: Arc<dyn QueryBackend>,
    timeout: Duration,
    mode: SessionMode,
    /// 登录表单默认部门
    default_context: Option<String>,
}

impl ChatSession {
    pub fn new(store: SessionStore, backend: Arc<dyn QueryBackend>, timeout: Duration) -> Self {
        Self {
            store,
            backend,
            timeout,
            mode: SessionMode::Department,
            default_context: None,
        }
    }

    pub fn with_mode(mut self, mode: SessionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_default_context(mut self, context: Option<String>) -> Self {
        self.default_context = context;
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// 启动：匿名模式直接进入对话，否则提示登录
    pub fn start(&mut self, adapter: &mut dyn PresentationAdapter) {
        match self.mode {
            SessionMode::Anonymous => self.enter_anonymous(adapter),
            SessionMode::Department => adapter.prompt_login(&self.login_prompt(None)),
        }
    }

    fn enter_anonymous(&mut self, adapter: &mut dyn PresentationAdapter) {
        if let Ok(identity) = self.store.initialize_anonymous() {
            adapter.prompt_input(identity.user_id(), identity.context());
        }
    }

    fn login_prompt(&self, error: Option<String>) -> LoginPrompt {
        let draft = self.store.draft();
        LoginPrompt {
            error,
            username: draft.username.clone(),
            context: draft
                .context
                .clone()
                .or_else(|| self.default_context.clone()),
        }
    }

    pub fn submit_login(
        &mut self,
        username: &str,
        password: &str,
        context: Option<String>,
        adapter: &mut dyn PresentationAdapter,
    ) -> Result<(), ChatError> {
        let result = self
            .store
            .initialize(username, password, context)
            .map(|id| (id.user_id().to_string(), id.context().map(String::from)));
        match result {
            Ok((user_id, context)) => {
                adapter.prompt_input(&user_id, context.as_deref());
                Ok(())
            }
            Err(ChatError::InvalidCredentials) => {
                let prompt = self.login_prompt(Some(ChatError::InvalidCredentials.to_string()));
                adapter.prompt_login(&prompt);
                Err(ChatError::InvalidCredentials)
            }
            Err(e) => Err(e),
        }
    }

    /// 跑一轮对话；空输入与未登录在发请求前拒绝
    pub async fn submit_utterance(
        &mut self,
        text: &str,
        adapter: &mut dyn PresentationAdapter,
    ) -> Result<(), ChatError> {
        let identity = self.store.identity().ok_or(ChatError::NotLoggedIn)?;
        let payload = RequestBuilder::build(text, identity)?;
        self.store.begin_turn()?;

        let message = self
            .store
            .append_message(Role::User, payload.query.clone(), None);
        adapter.render_message(message.role, &message.text);
        adapter.turn_phase(TurnPhase::AwaitingReply);

        let result = self.backend.send(&payload, self.timeout).await;
        debug!(success = result.is_success(), "Query finished");

        for command in ResponseInterpreter::apply(result, &mut self.store) {
            adapter.dispatch(command);
        }
        self.store.end_turn();
        adapter.turn_phase(TurnPhase::Idle);
        Ok(())
    }

    /// 登出：清空会话；匿名模式下立即以匿名身份重新开始
    pub fn logout(&mut self, adapter: &mut dyn PresentationAdapter) {
        self.store.reset();
        info!("Logged out");
        match self.mode {
            SessionMode::Anonymous => self.enter_anonymous(adapter),
            SessionMode::Department => adapter.prompt_login(&self.login_prompt(None)),
        }
    }

    /// 重新渲染全部历史（界面重新挂载时）
    pub fn replay(&self, adapter: &mut dyn PresentationAdapter) {
        for message in self.store.history() {
            adapter.render_message(message.role, &message.text);
            if let Some(table) = &message.attachments {
                adapter.render_table(table);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{QueryResult, ScriptedBackend};
    use crate::presentation::{RecordingAdapter, RenderCommand};

    fn session(backend: Arc<ScriptedBackend>) -> ChatSession {
        ChatSession::new(SessionStore::default(), backend, Duration::from_secs(5))
            .with_default_context(Some("Education".into()))
    }

    #[tokio::test]
    async fn test_history_even_after_each_turn() {
        let backend = Arc::new(ScriptedBackend::new([
            QueryResult::text("hello"),
            QueryResult::ServerError { status_code: 500 },
            QueryResult::TransportError {
                message: "timed out".into(),
            },
        ]));
        let mut chat = session(backend.clone());
        let mut ui = RecordingAdapter::default();
        chat.submit_login("admin", "admin", Some("Health".into()), &mut ui)
            .unwrap();

        for text in ["one", "two", "three", "four"] {
            chat.submit_utterance(text, &mut ui).await.unwrap();
            assert_eq!(chat.store().history().len() % 2, 0);
            assert_eq!(chat.store().phase(), TurnPhase::Idle);
        }

        let history = chat.store().history();
        assert_eq!(history.len(), 8);
        assert_eq!(history[1].text, "hello");
        assert!(history[3].text.contains("500"));
        assert!(history[5].text.starts_with("⚠️ Unable to reach server"));
        assert_eq!(history[7].text, "Echo from Mock: four");

        let sent = backend.received();
        assert!(sent.iter().all(|p| p.session_key == "admin-Health"));
        assert_eq!(
            ui.phases,
            [TurnPhase::AwaitingReply, TurnPhase::Idle].repeat(4)
        );
    }

    #[tokio::test]
    async fn test_blank_input_never_sent() {
        let backend = Arc::new(ScriptedBackend::default());
        let mut chat = session(backend.clone());
        let mut ui = RecordingAdapter::default();
        chat.submit_login("admin", "admin", None, &mut ui).unwrap();

        let err = chat.submit_utterance("   ", &mut ui).await.unwrap_err();
        assert_eq!(err, ChatError::EmptyUtterance);
        assert!(backend.received().is_empty());
        assert!(chat.store().history().is_empty());
        assert_eq!(chat.store().phase(), TurnPhase::Idle);
    }

    #[tokio::test]
    async fn test_submit_before_login() {
        let mut chat = session(Arc::new(ScriptedBackend::default()));
        let mut ui = RecordingAdapter::default();
        assert_eq!(
            chat.submit_utterance("hi", &mut ui).await.unwrap_err(),
            ChatError::NotLoggedIn
        );
    }

    #[test]
    fn test_failed_login_reprompts_with_draft() {
        let mut chat = session(Arc::new(ScriptedBackend::default()));
        let mut ui = RecordingAdapter::default();
        chat.start(&mut ui);

        let err = chat
            .submit_login("x", "y", Some("Transport".into()), &mut ui)
            .unwrap_err();
        assert_eq!(err, ChatError::InvalidCredentials);
        assert!(!chat.store().is_logged_in());
        assert_eq!(
            ui.commands.last(),
            Some(&RenderCommand::PromptLogin(LoginPrompt {
                error: Some("Invalid credentials".into()),
                username: "x".into(),
                context: Some("Transport".into()),
            }))
        );
        // 首次提示使用默认部门
        assert_eq!(
            ui.commands[0],
            RenderCommand::PromptLogin(LoginPrompt {
                error: None,
                username: String::new(),
                context: Some("Education".into()),
            })
        );
    }

    #[tokio::test]
    async fn test_table_reply_rendered_after_message() {
        let backend = Arc::new(ScriptedBackend::new([QueryResult::Success {
            text: "routes".into(),
            execution_time_ms: None,
            table: Some(r#"[{"route":"R1"}]"#.into()),
        }]));
        let mut chat = session(backend);
        let mut ui = RecordingAdapter::default();
        chat.submit_login("admin", "admin", None, &mut ui).unwrap();
        chat.submit_utterance("routes?", &mut ui).await.unwrap();

        let n = ui.commands.len();
        assert!(matches!(ui.commands[n - 2], RenderCommand::Message { role: Role::Assistant, .. }));
        assert!(matches!(ui.commands[n - 1], RenderCommand::Table(_)));

        let mut replayed = RecordingAdapter::default();
        chat.replay(&mut replayed);
        assert_eq!(replayed.commands, ui.commands[n - 3..].to_vec());
    }

    #[test]
    fn test_anonymous_mode_and_logout() {
        let mut chat =
            session(Arc::new(ScriptedBackend::default())).with_mode(SessionMode::Anonymous);
        let mut ui = RecordingAdapter::default();
        chat.start(&mut ui);
        assert!(chat.store().is_logged_in());
        assert_eq!(
            chat.store().identity().map(|i| i.session_key()),
            Some(crate::session::ANONYMOUS_SESSION_KEY)
        );

        chat.logout(&mut ui);
        assert!(chat.store().is_logged_in());
        assert!(matches!(ui.commands.last(), Some(RenderCommand::PromptInput { .. })));
    }

    #[tokio::test]
    async fn test_anonymous_logout_clears_transcript() {
        let mut chat =
            session(Arc::new(ScriptedBackend::default())).with_mode(SessionMode::Anonymous);
        let (mut projector, rx) = crate::core::StateProjector::new("BeltronGPT", Vec::new());
        chat.start(&mut projector);
        chat.submit_utterance("hi", &mut projector).await.unwrap();
        assert_eq!(rx.borrow().transcript.len(), 2);

        chat.logout(&mut projector);
        let state = rx.borrow().clone();
        assert_eq!(state.transcript.len(), chat.store().history().len());
        assert!(state.transcript.is_empty());
        assert_eq!(state.phase, TurnPhase::Idle);
        assert!(!state.input_locked);
    }
}
