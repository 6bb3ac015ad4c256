//! 请求构造：用户输入 + 身份 -> 查询载荷
//!
//! 纯函数；字段名按查询服务的线上格式序列化（user_query / user_id / department / session_id）。

use serde::Serialize;

use crate::core::ChatError;
use crate::session::identity::Identity;

/// 发往 `POST /query` 的 JSON 载荷
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QueryPayload {
    #[serde(rename = "user_query")]
    pub query: String,
    pub user_id: String,
    #[serde(rename = "department", skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(rename = "session_id")]
    pub session_key: String,
}

pub struct RequestBuilder;

impl RequestBuilder {
    /// 构造载荷；输入去除首尾空白后为空则拒绝
    pub fn build(utterance: &str, identity: &Identity) -> Result<QueryPayload, ChatError> {
        let query = utterance.trim();
        if query.is_empty() {
            return Err(ChatError::EmptyUtterance);
        }
        Ok(QueryPayload {
            query: query.to_string(),
            user_id: identity.user_id().to_string(),
            context: identity.context().map(String::from),
            session_key: identity.session_key().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_is_deterministic() {
        let identity = Identity::new("admin", Some("Transport".to_string()));
        let a = RequestBuilder::build("bus routes?", &identity).unwrap();
        let b = RequestBuilder::build("bus routes?", &identity).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.session_key, "admin-Transport");
    }

    #[test]
    fn test_build_trims_and_rejects_blank() {
        let identity = Identity::anonymous();
        assert_eq!(
            RequestBuilder::build("  \n\t", &identity).unwrap_err(),
            ChatError::EmptyUtterance
        );
        let payload = RequestBuilder::build("  hello  ", &identity).unwrap();
        assert_eq!(payload.query, "hello");
    }

    #[test]
    fn test_wire_field_names() {
        let identity = Identity::new("admin", Some("Health".to_string()));
        let payload = RequestBuilder::build("beds", &identity).unwrap();
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "user_query": "beds",
                "user_id": "admin",
                "department": "Health",
                "session_id": "admin-Health",
            })
        );
    }

    #[test]
    fn test_department_omitted_when_absent() {
        let payload = RequestBuilder::build("hi", &Identity::anonymous()).unwrap();
        let value = serde_json::to_value(&payload).unwrap();
        assert!(value.get("department").is_none());
        assert_eq!(value["session_id"], "anonymous-session");
    }
}
