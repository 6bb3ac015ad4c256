//! 核心编排层：错误、状态投影、回合驱动、主控循环

pub mod chat;
pub mod error;
pub mod orchestrator;
pub mod state;

pub use chat::ChatSession;
pub use error::ChatError;
pub use orchestrator::{apply_command, create_chat, spawn_session, Command, MOCK_BASE_URL};
pub use state::{Screen, StateProjector, TranscriptEntry, TurnPhase, UiState};
