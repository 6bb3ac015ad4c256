//! 会话存储：身份、对话历史、登录输入缓冲与单飞标记
//!
//! 历史只追加、不修改；插入顺序即显示顺序。每个 User 消息在下一轮开始前恰好对应一条 Assistant 消息，
//! 由 begin_turn / end_turn 保证同一时刻最多一个未回复的轮次。

use tracing::info;

use crate::core::{ChatError, TurnPhase};
use crate::response::TabularData;
use crate::session::identity::{Credentials, Identity};

/// 消息角色
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// 单条消息；创建后不再修改
#[derive(Clone, Debug)]
pub struct Message {
    pub role: Role,
    pub text: String,
    /// 随回复一起到达的表格
    pub attachments: Option<TabularData>,
}

impl Message {
    pub fn new(role: Role, text: impl Into<String>, attachments: Option<TabularData>) -> Self {
        Self {
            role,
            text: text.into(),
            attachments,
        }
    }
}

/// 登录表单的临时输入：登录失败后保留，重新提示时回填
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoginDraft {
    pub username: String,
    pub context: Option<String>,
}

/// 单个用户会话的全部状态
#[derive(Debug)]
pub struct SessionStore {
    credentials: Credentials,
    identity: Option<Identity>,
    messages: Vec<Message>,
    draft: LoginDraft,
    phase: TurnPhase,
}

impl SessionStore {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            identity: None,
            messages: Vec::new(),
            draft: LoginDraft::default(),
            phase: TurnPhase::Idle,
        }
    }

    /// 登录：校验占位凭据，成功后设置身份并清空历史
    ///
    /// 已登录时返回 AlreadyLoggedIn，需先 reset。
    pub fn initialize(
        &mut self,
        user_id: &str,
        password: &str,
        context: Option<String>,
    ) -> Result<&Identity, ChatError> {
        if self.identity.is_some() {
            return Err(ChatError::AlreadyLoggedIn);
        }
        self.draft = LoginDraft {
            username: user_id.to_string(),
            context: context.clone(),
        };
        if !self.credentials.verify(user_id, password) {
            info!(user = user_id, "Login rejected");
            return Err(ChatError::InvalidCredentials);
        }
        info!(user = user_id, context = ?context, "Login accepted");
        self.messages.clear();
        self.phase = TurnPhase::Idle;
        Ok(self.identity.insert(Identity::new(user_id, context)))
    }

    /// 匿名模式：不校验凭据，直接使用固定身份
    pub fn initialize_anonymous(&mut self) -> Result<&Identity, ChatError> {
        if self.identity.is_some() {
            return Err(ChatError::AlreadyLoggedIn);
        }
        self.messages.clear();
        self.phase = TurnPhase::Idle;
        Ok(self.identity.insert(Identity::anonymous()))
    }

    /// 追加消息并返回它，调用方据此发出渲染命令
    pub fn append_message(
        &mut self,
        role: Role,
        text: impl Into<String>,
        attachments: Option<TabularData>,
    ) -> &Message {
        self.messages.push(Message::new(role, text, attachments));
        &self.messages[self.messages.len() - 1]
    }

    /// 回到登录前状态；不访问后端
    pub fn reset(&mut self) {
        if let Some(identity) = self.identity.take() {
            info!(user = identity.user_id(), "Session reset");
        }
        self.messages.clear();
        self.draft = LoginDraft::default();
        self.phase = TurnPhase::Idle;
    }

    pub fn history(&self) -> &[Message] {
        &self.messages
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.identity.is_some()
    }

    pub fn draft(&self) -> &LoginDraft {
        &self.draft
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// 进入 AwaitingReply；已有未完成轮次时返回 Busy
    pub fn begin_turn(&mut self) -> Result<(), ChatError> {
        if self.identity.is_none() {
            return Err(ChatError::NotLoggedIn);
        }
        if self.phase == TurnPhase::AwaitingReply {
            return Err(ChatError::Busy);
        }
        self.phase = TurnPhase::AwaitingReply;
        Ok(())
    }

    pub fn end_turn(&mut self) {
        self.phase = TurnPhase::Idle;
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Credentials::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_success_clears_history() {
        let mut store = SessionStore::default();
        store.initialize_anonymous().unwrap();
        store.append_message(Role::User, "hi", None);
        store.reset();
        store.append_message(Role::User, "stale", None);

        let identity = store
            .initialize("admin", "admin", Some("Education".to_string()))
            .unwrap();
        assert_eq!(identity.session_key(), "admin-Education");
        assert!(store.is_logged_in());
        assert!(store.history().is_empty());
    }

    #[test]
    fn test_login_failure_keeps_logged_out() {
        let mut store = SessionStore::default();
        let err = store
            .initialize("x", "y", Some("Health".to_string()))
            .unwrap_err();
        assert_eq!(err, ChatError::InvalidCredentials);
        assert!(!store.is_logged_in());
        // 输入缓冲保留，便于回填登录表单
        assert_eq!(store.draft().username, "x");
        assert_eq!(store.draft().context.as_deref(), Some("Health"));
    }

    #[test]
    fn test_relogin_requires_reset() {
        let mut store = SessionStore::default();
        store.initialize("admin", "admin", None).unwrap();
        assert_eq!(
            store.initialize("admin", "admin", None).unwrap_err(),
            ChatError::AlreadyLoggedIn
        );
        store.reset();
        assert!(!store.is_logged_in());
        assert!(store.initialize("admin", "admin", None).is_ok());
    }

    #[test]
    fn test_append_preserves_order() {
        let mut store = SessionStore::default();
        store.append_message(Role::User, "q1", None);
        store.append_message(Role::Assistant, "a1", None);
        store.append_message(Role::User, "q2", None);
        let texts: Vec<&str> = store.history().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["q1", "a1", "q2"]);
    }

    #[test]
    fn test_single_flight() {
        let mut store = SessionStore::default();
        assert_eq!(store.begin_turn().unwrap_err(), ChatError::NotLoggedIn);

        store.initialize_anonymous().unwrap();
        store.begin_turn().unwrap();
        assert_eq!(store.phase(), TurnPhase::AwaitingReply);
        assert_eq!(store.begin_turn().unwrap_err(), ChatError::Busy);

        store.end_turn();
        assert!(store.begin_turn().is_ok());
    }
}
