//! 状态定义：轮次阶段与 UiState 投影
//!
//! UI 只持有轻量的 UiState（界面、对话记录、锁、登录错误）；StateProjector 作为展示适配器
//! 接收渲染命令，更新投影并通过 watch 通道推给 UI。

use tokio::sync::watch;

use crate::presentation::{LoginPrompt, PresentationAdapter};
use crate::response::TabularData;
use crate::session::Role;

/// 单轮状态机：Idle -> AwaitingReply -> Idle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TurnPhase {
    #[default]
    Idle,
    AwaitingReply,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Login,
    Chat,
}

/// 对话区中的一项：消息或表格
#[derive(Clone, Debug, PartialEq)]
pub enum TranscriptEntry {
    Message { role: Role, text: String },
    Table(TabularData),
}

/// UI 看到的「投影」状态，轻量且易于渲染
#[derive(Clone, Debug, Default)]
pub struct UiState {
    pub app_name: String,
    pub screen: Screen,
    pub phase: TurnPhase,
    pub transcript: Vec<TranscriptEntry>,
    pub user_id: Option<String>,
    pub context: Option<String>,
    /// 登录页下拉可选项
    pub departments: Vec<String>,
    pub login: LoginPrompt,
    pub input_locked: bool,
}

/// 把渲染命令投影为 UiState 的展示适配器
pub struct StateProjector {
    state: UiState,
    tx: watch::Sender<UiState>,
}

impl StateProjector {
    pub fn new(app_name: impl Into<String>, departments: Vec<String>) -> (Self, watch::Receiver<UiState>) {
        let state = UiState {
            app_name: app_name.into(),
            departments,
            ..UiState::default()
        };
        let (tx, rx) = watch::channel(state.clone());
        (Self { state, tx }, rx)
    }

    fn publish(&self) {
        self.tx.send_replace(self.state.clone());
    }
}

impl PresentationAdapter for StateProjector {
    fn render_message(&mut self, role: Role, text: &str) {
        self.state.transcript.push(TranscriptEntry::Message {
            role,
            text: text.to_string(),
        });
        self.publish();
    }

    fn render_table(&mut self, table: &TabularData) {
        self.state.transcript.push(TranscriptEntry::Table(table.clone()));
        self.publish();
    }

    fn prompt_login(&mut self, prompt: &LoginPrompt) {
        self.state.screen = Screen::Login;
        self.state.transcript.clear();
        self.state.user_id = None;
        self.state.context = None;
        self.state.phase = TurnPhase::Idle;
        self.state.input_locked = false;
        self.state.login = prompt.clone();
        self.publish();
    }

    fn prompt_input(&mut self, user_id: &str, context: Option<&str>) {
        // 新身份从空白对话开始
        self.state.screen = Screen::Chat;
        self.state.transcript.clear();
        self.state.phase = TurnPhase::Idle;
        self.state.input_locked = false;
        self.state.user_id = Some(user_id.to_string());
        self.state.context = context.map(String::from);
        self.state.login = LoginPrompt::default();
        self.publish();
    }

    fn turn_phase(&mut self, phase: TurnPhase) {
        self.state.phase = phase;
        self.state.input_locked = phase == TurnPhase::AwaitingReply;
        self.publish();
    }
}
