//! TUI 应用主循环
//!
//! 进入全屏/原始模式，轮询 state_rx 与键盘事件，将登录表单、用户输入与快捷键转为 Command
//! 发送给编排器，每帧用 draw 渲染 UiState 与本地 ViewState。

use std::io::{self, Stdout};

use crossterm::event::{KeyCode, KeyEvent};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::core::{Command, Screen, UiState};
use crate::presentation::LoginPrompt;
use crate::ui::event::{AppEvent, EventHandler};
use crate::ui::render::{draw, LoginField, LoginForm, ViewState};

/// 运行 TUI：启用原始模式与全屏，循环 poll 事件 + 渲染，退出时恢复终端
pub async fn run_app(
    state_rx: watch::Receiver<UiState>,
    cmd_tx: tokio::sync::mpsc::UnboundedSender<Command>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, state_rx, cmd_tx, &shutdown).await;
    shutdown.cancel();

    restore_terminal(&mut terminal)?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    state_rx: watch::Receiver<UiState>,
    cmd_tx: tokio::sync::mpsc::UnboundedSender<Command>,
    shutdown: &CancellationToken,
) -> anyhow::Result<()> {
    let event_handler = EventHandler::new(cmd_tx);
    let mut view = ViewState::default();
    let mut last_screen: Option<Screen> = None;
    let mut last_login: Option<LoginPrompt> = None;
    let mut last_transcript_len = 0usize;

    while !shutdown.is_cancelled() {
        let state = state_rx.borrow().clone();

        // 界面切换或新的登录提示：回填表单 / 清空输入
        if last_screen != Some(state.screen) || last_login.as_ref() != Some(&state.login) {
            match state.screen {
                Screen::Login => view.login = login_form_from(&state),
                Screen::Chat if last_screen != Some(Screen::Chat) => {
                    view.input_buffer.clear();
                    view.conversation_scroll = 0;
                }
                Screen::Chat => {}
            }
            last_screen = Some(state.screen);
            last_login = Some(state.login.clone());
        }

        if state.transcript.len() != last_transcript_len {
            last_transcript_len = state.transcript.len();
            view.conversation_scroll = usize::MAX;
        }

        if let Some(ev) = event_handler.poll()? {
            match ev {
                AppEvent::Command(Command::Quit) => break,
                AppEvent::Command(_) => {}
                AppEvent::Key(key) => {
                    let quit = match state.screen {
                        Screen::Login => {
                            handle_login_key(&mut view.login, key, &state, &event_handler);
                            false
                        }
                        Screen::Chat => handle_chat_key(&mut view, key, &state, &event_handler),
                    };
                    if quit {
                        event_handler.send(Command::Quit);
                        break;
                    }
                }
            }
        }

        let mut scroll_info = (0usize, 0usize);
        terminal.draw(|f| draw(f, &state, &view, &mut scroll_info))?;
        let (total_lines, viewport_height) = scroll_info;
        view.conversation_scroll = view
            .conversation_scroll
            .min(total_lines.saturating_sub(viewport_height));

        tokio::task::yield_now().await;
    }
    Ok(())
}

fn login_form_from(state: &UiState) -> LoginForm {
    let department = state
        .login
        .context
        .as_ref()
        .and_then(|ctx| state.departments.iter().position(|d| d == ctx))
        .unwrap_or(0);
    LoginForm {
        username: state.login.username.clone(),
        password: String::new(),
        department,
        focus: if state.login.username.is_empty() {
            LoginField::Username
        } else {
            LoginField::Password
        },
    }
}

fn handle_login_key(form: &mut LoginForm, key: KeyEvent, state: &UiState, events: &EventHandler) {
    let departments = state.departments.len();
    match key.code {
        KeyCode::Tab | KeyCode::Down => form.focus = form.focus.next(),
        KeyCode::BackTab | KeyCode::Up => form.focus = form.focus.prev(),
        KeyCode::Left if form.focus == LoginField::Department && departments > 0 => {
            form.department = (form.department + departments - 1) % departments;
        }
        KeyCode::Right if form.focus == LoginField::Department && departments > 0 => {
            form.department = (form.department + 1) % departments;
        }
        KeyCode::Backspace => match form.focus {
            LoginField::Username => {
                form.username.pop();
            }
            LoginField::Password => {
                form.password.pop();
            }
            LoginField::Department => {}
        },
        KeyCode::Char(c) => match form.focus {
            LoginField::Username => form.username.push(c),
            LoginField::Password => form.password.push(c),
            LoginField::Department => {}
        },
        KeyCode::Enter => {
            // 提交后清空密码
            events.send(Command::Login {
                username: form.username.trim().to_string(),
                password: std::mem::take(&mut form.password),
                context: state.departments.get(form.department).cloned(),
            });
            form.focus = if form.username.trim().is_empty() {
                LoginField::Username
            } else {
                LoginField::Password
            };
        }
        _ => {}
    }
}

/// 返回 true 表示用户要求退出
fn handle_chat_key(view: &mut ViewState, key: KeyEvent, state: &UiState, events: &EventHandler) -> bool {
    match key.code {
        KeyCode::Up => view.conversation_scroll = view.conversation_scroll.saturating_sub(1),
        KeyCode::Down => view.conversation_scroll = view.conversation_scroll.saturating_add(1),
        KeyCode::PageUp => view.conversation_scroll = view.conversation_scroll.saturating_sub(10),
        KeyCode::PageDown => {
            view.conversation_scroll = view.conversation_scroll.saturating_add(10)
        }
        KeyCode::Home => view.conversation_scroll = 0,
        KeyCode::End => view.conversation_scroll = usize::MAX,
        // 等待回复时只允许滚动
        _ if state.input_locked => {}
        KeyCode::Enter => {
            let input = view.input_buffer.trim().to_string();
            view.input_buffer.clear();
            if matches!(input.to_lowercase().as_str(), "/exit" | "/quit") {
                return true;
            }
            if !input.is_empty() {
                events.send(Command::Submit(input));
            }
        }
        KeyCode::Backspace => {
            view.input_buffer.pop();
        }
        KeyCode::Char(c) => view.input_buffer.push(c),
        _ => {}
    }
    false
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
