use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use parley_core::{ChatRole, SessionStatus};
use crate::app::{App, InputMode, Screen};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Chat => render_chat_screen(app, frame, body_area),
        Screen::Summarize => render_summary_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![Span::styled(" parley ", Style::default().fg(Color::Cyan).bold())];

    for screen in [Screen::Chat, Screen::Summarize] {
        let style = if screen == app.screen {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::raw(" "));
        spans.push(Span::styled(format!(" {} ", screen.title()), style));
    }

    spans.push(Span::styled(
        format!("  {}: {} ", app.provider.display_name(), app.model),
        Style::default().fg(Color::Gray),
    ));
    spans.push(Span::styled(
        format!("v{}", env!("CARGO_PKG_VERSION")),
        Style::default().fg(Color::Gray),
    ));

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " EDIT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints: Vec<(&str, &str)> = match (app.screen, app.input_mode) {
        (_, InputMode::Normal) => {
            let mut hints = vec![("Tab", "screen"), ("j/k", "scroll"), ("^R", "reload"), ("q", "quit")];
            if app.can_edit() {
                hints.insert(0, ("i", "type"));
            } else {
                hints.insert(0, ("-", "busy"));
            }
            hints
        }
        (Screen::Chat, InputMode::Editing) => vec![("Enter", "send"), ("Esc", "done")],
        (Screen::Summarize, InputMode::Editing) => {
            vec![("^S", "summarize"), ("Enter", "newline"), ("Esc", "done")]
        }
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
        spans.push(Span::raw(" "));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn status_style(status: &SessionStatus) -> Style {
    match status {
        SessionStatus::Failed(_) => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    }
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let can_edit = app.can_edit();
    let editing = app.input_mode == InputMode::Editing;
    let frame_no = app.animation_frame;
    let Some(mounted) = app.chat.as_ref() else { return };
    let view = &mounted.view;
    let session = view.session();

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Chat ");

    let mut lines: Vec<Line> = Vec::new();
    if view.transcript().is_empty() && !session.is_busy() && session.is_ready() {
        lines.push(Line::from(Span::styled(
            "Type your message...",
            Style::default().fg(Color::DarkGray),
        )));
    }

    for msg in view.transcript() {
        // User turns sit on the right, everything else on the left
        let (alignment, style) = match msg.role {
            ChatRole::User => (Alignment::Right, Style::default().fg(Color::Cyan)),
            _ => (Alignment::Left, Style::default().fg(Color::White)),
        };
        for line in msg.content.lines() {
            lines.push(Line::from(Span::styled(line.to_string(), style)).alignment(alignment));
        }
        lines.push(Line::default());
    }

    if session.is_busy() || session.failure().is_some() {
        lines.push(
            Line::from(Span::styled(session.progress().to_string(), status_style(session.status())))
                .alignment(Alignment::Center),
        );
    }
    if session.is_busy() && session.is_ready() {
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((frame_no as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((mounted.scroll, 0));
    frame.render_widget(chat, chat_area);

    // Single-line input at the bottom, disabled while busy
    let input_border_color = if !can_edit {
        Color::DarkGray
    } else if editing {
        Color::Yellow
    } else {
        Color::White
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(" Message (i to type, Enter to send) ");

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let cursor_pos = mounted.cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = view
        .input()
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();
    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);
    frame.render_widget(input, input_area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
    }
}

/// Row and column of a character cursor in multi-line text
fn cursor_row_col(text: &str, cursor: usize) -> (usize, usize) {
    let before: String = text.chars().take(cursor).collect();
    let row = before.matches('\n').count();
    let col = before.rsplit('\n').next().map(|l| l.chars().count()).unwrap_or(0);
    (row, col)
}

fn render_summary_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [input_area, summary_area] = Layout::vertical([
        Constraint::Length(12),
        Constraint::Min(0),
    ])
    .areas(area);

    let can_edit = app.can_edit();
    let editing = app.input_mode == InputMode::Editing;
    let Some(mounted) = app.summary.as_ref() else { return };
    let view = &mounted.view;
    let session = view.session();

    // Multi-line input, scrolled so the cursor row stays visible
    let input_border_color = if !can_edit {
        Color::DarkGray
    } else if editing {
        Color::Yellow
    } else {
        Color::White
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(" JSON export (i to type, Ctrl+S to summarize) ");

    let inner_height = input_area.height.saturating_sub(2) as usize;
    let (row, col) = cursor_row_col(view.input(), mounted.cursor);
    let row_offset = row.saturating_sub(inner_height.saturating_sub(1));

    let input_text = if view.input().is_empty() {
        Text::from(Span::styled("Paste your JSON here...", Style::default().fg(Color::DarkGray)))
    } else {
        Text::from(view.input())
    };
    let input = Paragraph::new(input_text)
        .block(input_block)
        .scroll((row_offset as u16, 0));
    frame.render_widget(input, input_area);

    if editing {
        let inner_width = input_area.width.saturating_sub(2) as usize;
        let x = input_area.x + 1 + col.min(inner_width.saturating_sub(1)) as u16;
        let y = input_area.y + 1 + (row - row_offset) as u16;
        frame.set_cursor_position((x, y));
    }

    // Summary pane: status while busy, the summary otherwise
    let title = match view.result() {
        Some(result) => format!(
            " Summary: {} messages, {} words, {} emojis ",
            result.total_messages, result.total_words, result.total_emojis
        ),
        None => " Summary: ".to_string(),
    };
    let summary_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);

    let body = if session.is_busy() {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        Text::from(vec![
            Line::from(Span::styled(session.progress().to_string(), status_style(session.status()))),
            Line::from(Span::styled(dots, Style::default().fg(Color::Yellow))),
        ])
    } else if let Some(reason) = session.failure() {
        Text::from(vec![
            Line::from(Span::styled(session.progress().to_string(), status_style(session.status()))),
            Line::from(Span::styled(reason.to_string(), Style::default().fg(Color::DarkGray))),
        ])
    } else {
        Text::from(view.summary())
    };

    let summary = Paragraph::new(body)
        .block(summary_block)
        .wrap(Wrap { trim: false })
        .scroll((mounted.scroll, 0));
    frame.render_widget(summary, summary_area);
}
