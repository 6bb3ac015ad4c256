//! 查询客户端层：后端抽象与实现（HTTP / 脚本化 Mock）

pub mod http;
pub mod mock;
pub mod traits;

pub use http::HttpQueryClient;
pub use mock::ScriptedBackend;
pub use traits::{QueryBackend, QueryResult, NO_RESPONSE};
