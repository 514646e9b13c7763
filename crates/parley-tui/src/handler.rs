use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::{App, InputMode, Screen};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Engine { screen, generation, event } => {
            app.handle_engine_event(screen, generation, event);
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('r') if ctrl => app.remount(),
        KeyCode::Tab => app.show(app.screen.next()),
        KeyCode::Char('1') => app.show(Screen::Chat),
        KeyCode::Char('2') => app.show(Screen::Summarize),

        // Start typing (disabled while the engine is loading or busy)
        KeyCode::Char('i') | KeyCode::Enter => {
            if app.can_edit() {
                app.input_mode = InputMode::Editing;
            }
        }

        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::PageDown => app.scroll_down(10),
        KeyCode::PageUp => app.scroll_up(10),
        KeyCode::Char('g') => app.scroll_top(),
        KeyCode::Char('G') => {
            if app.screen == Screen::Chat {
                app.scroll_chat_to_bottom();
            }
        }
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            return;
        }
        // Chat sends on Enter; the summarizer takes multi-line input and sends on Ctrl+S
        KeyCode::Enter if app.screen == Screen::Chat => {
            app.submit();
            return;
        }
        KeyCode::Char('s') if ctrl => {
            app.submit();
            return;
        }
        _ => {}
    }

    if !app.can_edit() {
        return;
    }
    let multiline = app.screen == Screen::Summarize;
    let Some((input, cursor)) = app.current_input_mut() else { return };

    match key.code {
        KeyCode::Enter if multiline => insert_str(input, cursor, "\n"),
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(input, *cursor);
                input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = input.chars().count();
            if *cursor < char_count {
                let byte_pos = char_to_byte_index(input, *cursor);
                input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            *cursor = cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = input.chars().count();
            *cursor = (*cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            *cursor = 0;
        }
        KeyCode::End => {
            *cursor = input.chars().count();
        }
        KeyCode::Char(c) if !ctrl => {
            let byte_pos = char_to_byte_index(input, *cursor);
            input.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => {}
    }
}

fn handle_paste(app: &mut App, text: &str) {
    if app.input_mode != InputMode::Editing || !app.can_edit() {
        return;
    }
    // The chat box is a single line
    let text = if app.screen == Screen::Chat {
        text.replace(['\r', '\n'], " ")
    } else {
        text.replace("\r\n", "\n")
    };
    if let Some((input, cursor)) = app.current_input_mut() {
        insert_str(input, cursor, &text);
    }
}

fn insert_str(input: &mut String, cursor: &mut usize, text: &str) {
    let byte_pos = char_to_byte_index(input, *cursor);
    input.insert_str(byte_pos, text);
    *cursor += text.chars().count();
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}
