//! 界面渲染
//!
//! 登录页：居中卡片（用户名、掩码密码、部门选择、错误提示）。
//! 对话页：标题栏显示用户与部门，主体为对话记录（按角色着色、按宽度换行、表格按列对齐），
//! 底部为输入框与快捷键提示；等待回复时输入框锁定。

use std::iter;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};

use crate::core::{Screen, TranscriptEntry, TurnPhase, UiState};
use crate::response::TabularData;
use crate::session::Role;

/// 表格单元格显示的最大字符数
const MAX_CELL_CHARS: usize = 24;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    Username,
    Password,
    Department,
}

impl LoginField {
    pub fn next(self) -> Self {
        match self {
            LoginField::Username => LoginField::Password,
            LoginField::Password => LoginField::Department,
            LoginField::Department => LoginField::Username,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            LoginField::Username => LoginField::Department,
            LoginField::Password => LoginField::Username,
            LoginField::Department => LoginField::Password,
        }
    }
}

/// 登录表单的本地编辑状态（提交前不进入核心）
#[derive(Clone, Debug, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub department: usize,
    pub focus: LoginField,
}

/// UI 本地状态：登录表单、输入缓冲、滚动位置
#[derive(Clone, Debug, Default)]
pub struct ViewState {
    pub login: LoginForm,
    pub input_buffer: String,
    pub conversation_scroll: usize,
}

/// 将内容按宽度换行，支持 UTF-8（按字符数，避免在 UTF-8 中间截断）
fn wrap_text(s: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![s.to_string()];
    }
    let mut lines = Vec::new();
    for para in s.split('\n') {
        let mut line = String::new();
        for ch in para.chars() {
            if line.chars().count() >= width {
                lines.push(std::mem::take(&mut line));
            }
            line.push(ch);
        }
        lines.push(line);
    }
    lines
}

fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn pad(s: &str, width: usize) -> String {
    let len = s.chars().count();
    format!("{}{}", s, " ".repeat(width.saturating_sub(len)))
}

/// 表格转为对齐的文本行：表头、分隔线、数据行
pub fn table_lines(table: &TabularData) -> Vec<String> {
    if table.columns().is_empty() {
        return vec!["(empty table)".to_string()];
    }
    let headers: Vec<String> = table
        .columns()
        .iter()
        .map(|c| clip(c, MAX_CELL_CHARS))
        .collect();
    let cells: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .map(|c| clip(&c.to_string(), MAX_CELL_CHARS))
                .collect()
        })
        .collect();
    let widths: Vec<usize> = (0..headers.len())
        .map(|i| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(iter::once(headers[i].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_row = |row: &[String]| {
        row.iter()
            .zip(&widths)
            .map(|(cell, w)| pad(cell, *w))
            .collect::<Vec<_>>()
            .join(" │ ")
    };

    let mut lines = vec![
        format_row(&headers[..]),
        widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─"),
    ];
    if table.is_empty() {
        lines.push("(no rows)".to_string());
    }
    lines.extend(cells.iter().map(|row| format_row(row.as_slice())));
    lines
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}

/// 绘制一帧；对话页将 (总行数, 可视高度) 写入 out 供外部 clamp 滚动
pub fn draw(f: &mut Frame, state: &UiState, view: &ViewState, out: &mut (usize, usize)) {
    match state.screen {
        Screen::Login => draw_login(f, state, &view.login),
        Screen::Chat => draw_chat(f, state, view, out),
    }
}

fn draw_login(f: &mut Frame, state: &UiState, form: &LoginForm) {
    let area = centered(f.area(), 52, 13);
    let field_style = |field: LoginField| {
        if form.focus == field {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        }
    };
    let department = state
        .departments
        .get(form.department)
        .map(String::as_str)
        .unwrap_or("-");

    let mut lines = vec![
        Line::from(Span::styled(
            "Private departmental AI workspace",
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Username   ", field_style(LoginField::Username)),
            Span::raw(form.username.clone()),
        ]),
        Line::from(vec![
            Span::styled("Password   ", field_style(LoginField::Password)),
            Span::raw("*".repeat(form.password.chars().count())),
        ]),
        Line::from(vec![
            Span::styled("Department ", field_style(LoginField::Department)),
            Span::raw(format!("◀ {} ▶", department)),
        ]),
        Line::from(""),
    ];
    if let Some(err) = &state.login.error {
        lines.push(Line::from(Span::styled(
            err.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    let hint = " Tab 切换 │ ←→ 部门 │ Enter 登录 │ Ctrl+Q 退出 ";
    let block = Block::default()
        .title(format!(" {} ", state.app_name))
        .title_alignment(Alignment::Center)
        .title_bottom(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));
    let card = Paragraph::new(Text::from(lines))
        .block(block)
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: false });
    f.render_widget(card, area);
}

fn draw_chat(f: &mut Frame, state: &UiState, view: &ViewState, out: &mut (usize, usize)) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(5),
        ])
        .split(f.area());

    let user = state.user_id.as_deref().unwrap_or("guest");
    let mut header = vec![Span::styled(
        format!("Welcome to {}, {}", state.app_name, user),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if let Some(ctx) = &state.context {
        header.push(Span::styled(
            format!("   Department: {}", ctx),
            Style::default().fg(Color::Gray),
        ));
    }
    f.render_widget(
        Paragraph::new(Line::from(header)).block(Block::default().borders(Borders::BOTTOM)),
        chunks[0],
    );

    let conv_area = chunks[1];
    let content_width = conv_area.width.saturating_sub(3) as usize; // 边框 + 滚动条

    let phase_str = match state.phase {
        TurnPhase::Idle => "Ready",
        TurnPhase::AwaitingReply => "Fetching response…",
    };
    let block = Block::default()
        .title(format!(" Chat │ {} ", phase_str))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    // 消息之间加空行；表格在所属回复下方，不换行
    let mut text_lines: Vec<Line> = Vec::new();
    for (idx, entry) in state.transcript.iter().enumerate() {
        match entry {
            TranscriptEntry::Message { role, text } => {
                if idx > 0 {
                    text_lines.push(Line::from(""));
                }
                let (prefix, color) = match role {
                    Role::User => ("You ", Color::Cyan),
                    Role::Assistant => ("Bot ", Color::Green),
                };
                for (i, line) in wrap_text(text, content_width.saturating_sub(4).max(20))
                    .into_iter()
                    .enumerate()
                {
                    let pref = if i == 0 { prefix } else { "    " };
                    text_lines.push(Line::from(vec![
                        Span::styled(pref, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                        Span::raw(line),
                    ]));
                }
            }
            TranscriptEntry::Table(table) => {
                text_lines.push(Line::from(Span::styled(
                    "    📊 Additional Info",
                    Style::default().add_modifier(Modifier::BOLD),
                )));
                for line in table_lines(table) {
                    text_lines.push(Line::from(Span::raw(format!("    {}", line))));
                }
            }
        }
    }

    let content_height = conv_area.height.saturating_sub(2) as usize;
    let total_lines = text_lines.len();
    let max_scroll = total_lines.saturating_sub(content_height);
    let scroll_offset = view.conversation_scroll.min(max_scroll);

    let inner = block.inner(conv_area);
    let paragraph = Paragraph::new(Text::from(text_lines))
        .block(block)
        .scroll((scroll_offset as u16, 0));
    f.render_widget(paragraph, conv_area);

    if total_lines > content_height {
        let mut scrollbar_state = ScrollbarState::new(total_lines)
            .position(scroll_offset)
            .viewport_content_length(content_height);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .thumb_symbol("█")
            .track_symbol(Some("░"));
        f.render_stateful_widget(scrollbar, inner, &mut scrollbar_state);
    }

    let input_prompt = if state.input_locked {
        " Waiting for reply… "
    } else {
        " Type your message here... "
    };
    let hint = " Enter 发送 │ ↑↓ PgUp/PgDn 滚动 │ Ctrl+L 登出 │ Ctrl+Q 退出 ";
    let input_block = Block::default()
        .title(input_prompt)
        .title_bottom(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    let input = Paragraph::new(view.input_buffer.as_str())
        .block(input_block)
        .wrap(Wrap { trim: false })
        .style(if state.input_locked {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        });
    f.render_widget(input, chunks[2]);

    out.0 = total_lines;
    out.1 = content_height;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lines_aligned() {
        let table = TabularData::decode(r#"{"columns":["a","bb"],"rows":[[1,"x"],[22,null]]}"#)
            .unwrap();
        let lines = table_lines(&table);
        assert_eq!(lines[0], "a  │ bb");
        assert_eq!(lines[1], "───┼───");
        assert_eq!(lines[2], "1  │ x ");
        assert_eq!(lines[3], "22 │   ");
    }

    #[test]
    fn test_table_lines_empty() {
        let table = TabularData::decode(r#"{"columns":["a"],"rows":[]}"#).unwrap();
        assert_eq!(table_lines(&table).last().map(String::as_str), Some("(no rows)"));
        let table = TabularData::decode("{}").unwrap();
        assert_eq!(table_lines(&table), vec!["(empty table)".to_string()]);
    }

    #[test]
    fn test_clip_long_cells() {
        assert_eq!(clip("abcdef", 4), "abc…");
        assert_eq!(clip("abc", 4), "abc");
    }

    #[test]
    fn test_wrap_keeps_blank_lines() {
        assert_eq!(wrap_text("ab\n\ncd", 10), vec!["ab", "", "cd"]);
        assert_eq!(wrap_text("abcdef", 4), vec!["abcd", "ef"]);
    }

    #[test]
    fn test_login_focus_cycle() {
        let f = LoginField::default();
        assert_eq!(f.next().next().next(), f);
        assert_eq!(f.prev(), LoginField::Department);
    }
}
