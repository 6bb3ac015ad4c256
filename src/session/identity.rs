//! 会话身份与占位登录校验
//!
//! session_key 由 user_id + 部门确定性拼出，会话期内不变，供后端关联多轮对话。

/// 匿名（导览版）模式下的固定用户与会话键
pub const ANONYMOUS_USER_ID: &str = "guest";
pub const ANONYMOUS_SESSION_KEY: &str = "anonymous-session";

/// 已登录用户的身份；创建后不可变，logout / reset 时销毁
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    user_id: String,
    context: Option<String>,
    session_key: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, context: Option<String>) -> Self {
        let user_id = user_id.into();
        let context = context.filter(|c| !c.trim().is_empty());
        let session_key = match &context {
            Some(ctx) => format!("{}-{}", user_id, ctx),
            None => user_id.clone(),
        };
        Self {
            user_id,
            context,
            session_key,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            user_id: ANONYMOUS_USER_ID.to_string(),
            context: None,
            session_key: ANONYMOUS_SESSION_KEY.to_string(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// 部门 / 上下文标签
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }
}

/// 占位凭据：只做字符串比对，不是安全边界
#[derive(Clone, Debug)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new("admin", "admin")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_with_context() {
        let id = Identity::new("admin", Some("Health".to_string()));
        assert_eq!(id.session_key(), "admin-Health");
        assert_eq!(id.context(), Some("Health"));
    }

    #[test]
    fn test_session_key_without_context() {
        let id = Identity::new("admin", Some("  ".to_string()));
        assert_eq!(id.session_key(), "admin");
        assert_eq!(id.context(), None);
    }

    #[test]
    fn test_anonymous_key_is_constant() {
        assert_eq!(Identity::anonymous(), Identity::anonymous());
        assert_eq!(Identity::anonymous().session_key(), ANONYMOUS_SESSION_KEY);
    }

    #[test]
    fn test_credentials() {
        let creds = Credentials::default();
        assert!(creds.verify("admin", "admin"));
        assert!(!creds.verify("x", "y"));
        assert!(!creds.verify("admin", ""));
    }
}
