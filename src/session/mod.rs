//! 会话层：身份、历史存储、请求构造

pub mod identity;
pub mod request;
pub mod store;

pub use identity::{Credentials, Identity, ANONYMOUS_SESSION_KEY, ANONYMOUS_USER_ID};
pub use request::{QueryPayload, RequestBuilder};
pub use store::{LoginDraft, Message, Role, SessionStore};
