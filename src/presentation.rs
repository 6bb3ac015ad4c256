//! 展示适配层边界
//!
//! 核心只通过 RenderCommand 驱动界面；界面（TUI 或测试用 RecordingAdapter）实现 PresentationAdapter。

use crate::core::TurnPhase;
use crate::response::TabularData;
use crate::session::Role;

/// 登录提示：可附带上次失败原因与回填值
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoginPrompt {
    pub error: Option<String>,
    pub username: String,
    pub context: Option<String>,
}

/// 核心发往界面的渲染命令
#[derive(Clone, Debug, PartialEq)]
pub enum RenderCommand {
    Message { role: Role, text: String },
    Table(TabularData),
    PromptLogin(LoginPrompt),
    /// 进入对话界面；携带用户与部门供标题栏显示
    PromptInput {
        user_id: String,
        context: Option<String>,
    },
}

pub trait PresentationAdapter: Send {
    fn render_message(&mut self, role: Role, text: &str);

    fn render_table(&mut self, table: &TabularData);

    fn prompt_login(&mut self, prompt: &LoginPrompt);

    fn prompt_input(&mut self, user_id: &str, context: Option<&str>);

    /// 轮次阶段变化（用于锁定输入框）；默认忽略
    fn turn_phase(&mut self, _phase: TurnPhase) {}

    fn dispatch(&mut self, command: RenderCommand) {
        match command {
            RenderCommand::Message { role, text } => self.render_message(role, &text),
            RenderCommand::Table(table) => self.render_table(&table),
            RenderCommand::PromptLogin(prompt) => self.prompt_login(&prompt),
            RenderCommand::PromptInput { user_id, context } => {
                self.prompt_input(&user_id, context.as_deref())
            }
        }
    }
}

/// 记录所有渲染命令，不做任何展示
#[derive(Debug, Default)]
pub struct RecordingAdapter {
    pub commands: Vec<RenderCommand>,
    pub phases: Vec<TurnPhase>,
}

impl RecordingAdapter {
    pub fn messages(&self) -> Vec<(Role, &str)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                RenderCommand::Message { role, text } => Some((*role, text.as_str())),
                _ => None,
            })
            .collect()
    }
}

impl PresentationAdapter for RecordingAdapter {
    fn render_message(&mut self, role: Role, text: &str) {
        self.commands.push(RenderCommand::Message {
            role,
            text: text.to_string(),
        });
    }

    fn render_table(&mut self, table: &TabularData) {
        self.commands.push(RenderCommand::Table(table.clone()));
    }

    fn prompt_login(&mut self, prompt: &LoginPrompt) {
        self.commands.push(RenderCommand::PromptLogin(prompt.clone()));
    }

    fn prompt_input(&mut self, user_id: &str, context: Option<&str>) {
        self.commands.push(RenderCommand::PromptInput {
            user_id: user_id.to_string(),
            context: context.map(String::from),
        });
    }

    fn turn_phase(&mut self, phase: TurnPhase) {
        self.phases.push(phase);
    }
}
