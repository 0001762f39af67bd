use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, FocusPane, InputMode};
use crate::request::ImageCount;
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
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::GenerationFinished { token, result } => app.on_generation_finished(token, result),
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

fn set_focus(app: &mut App, focus: FocusPane) {
    app.focus = focus;
    // Auto-enter editing mode when focusing the prompt
    if focus == FocusPane::Prompt {
        app.input_mode = InputMode::Editing;
        app.prompt_cursor = app.session.prompt().chars().count();
    } else {
        app.input_mode = InputMode::Normal;
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Tab => {
            let next = app.focus.next();
            set_focus(app, next);
        }
        KeyCode::BackTab => {
            let prev = app.focus.prev();
            set_focus(app, prev);
        }
        KeyCode::Char('i') => set_focus(app, FocusPane::Prompt),

        KeyCode::Char('g') => app.start_generation(),
        KeyCode::Char('r') => app.pick_random_prompt(),
        KeyCode::Char('c') => app.clear_results(),
        KeyCode::Char('+') | KeyCode::Char('=') => app.count_up(),
        KeyCode::Char('-') => app.count_down(),
        KeyCode::Char('[') => {
            let style = app.session.style().prev();
            app.select_style(style);
        }
        KeyCode::Char(']') => {
            let style = app.session.style().next();
            app.select_style(style);
        }
        KeyCode::Char(c @ '1'..='4') => {
            if let Some(count) = c.to_digit(10).and_then(|n| ImageCount::new(n as u8)) {
                app.session.set_count(count);
            }
        }

        _ => match app.focus {
            FocusPane::Prompt => {
                if key.code == KeyCode::Enter {
                    app.start_generation();
                }
            }
            FocusPane::Styles => handle_styles(app, key),
            FocusPane::Count => handle_count(app, key),
            FocusPane::Gallery => handle_gallery(app, key),
        },
    }
}

fn handle_styles(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('h') | KeyCode::Left => app.style_cursor_move(-1, 0),
        KeyCode::Char('l') | KeyCode::Right => app.style_cursor_move(1, 0),
        KeyCode::Char('k') | KeyCode::Up => app.style_cursor_move(0, -1),
        KeyCode::Char('j') | KeyCode::Down => app.style_cursor_move(0, 1),
        KeyCode::Enter | KeyCode::Char(' ') => app.select_style_at_cursor(),
        _ => {}
    }
}

fn handle_count(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('h') | KeyCode::Left | KeyCode::Char('j') | KeyCode::Down => app.count_down(),
        KeyCode::Char('l') | KeyCode::Right | KeyCode::Char('k') | KeyCode::Up => app.count_up(),
        KeyCode::Enter => app.start_generation(),
        _ => {}
    }
}

fn handle_gallery(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('h') | KeyCode::Left => app.gallery_move(-1),
        KeyCode::Char('l') | KeyCode::Right => app.gallery_move(1),
        KeyCode::Char('k') | KeyCode::Up => app.gallery_move_row(-1),
        KeyCode::Char('j') | KeyCode::Down => app.gallery_move_row(1),
        KeyCode::Char('s') | KeyCode::Enter => app.save_selected(),
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Tab => {
            let next = app.focus.next();
            set_focus(app, next);
        }
        KeyCode::BackTab => {
            let prev = app.focus.prev();
            set_focus(app, prev);
        }
        KeyCode::Enter => app.start_generation(),
        KeyCode::Backspace => {
            if app.prompt_cursor > 0 {
                app.prompt_cursor -= 1;
                let cursor = app.prompt_cursor;
                app.session.edit_prompt(|prompt| {
                    let byte_pos = char_to_byte_index(prompt, cursor);
                    prompt.remove(byte_pos);
                });
            }
        }
        KeyCode::Delete => {
            let cursor = app.prompt_cursor;
            if cursor < app.session.prompt().chars().count() {
                app.session.edit_prompt(|prompt| {
                    let byte_pos = char_to_byte_index(prompt, cursor);
                    prompt.remove(byte_pos);
                });
            }
        }
        KeyCode::Left => {
            app.prompt_cursor = app.prompt_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.session.prompt().chars().count();
            app.prompt_cursor = (app.prompt_cursor + 1).min(char_count);
        }
        KeyCode::Home => app.prompt_cursor = 0,
        KeyCode::End => app.prompt_cursor = app.session.prompt().chars().count(),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.session.set_prompt("");
            app.prompt_cursor = 0;
        }
        KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.pick_random_prompt();
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            let cursor = app.prompt_cursor;
            app.session.edit_prompt(|prompt| {
                let byte_pos = char_to_byte_index(prompt, cursor);
                prompt.insert(byte_pos, c);
            });
            app.prompt_cursor += 1;
        }
        _ => {}
    }
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;
    let in_gallery = app.gallery_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let clicked = app
                .style_cells
                .iter()
                .find(|(rect, _)| point_in_rect(x, y, *rect))
                .map(|(_, style)| *style);
            if let Some(style) = clicked {
                app.select_style(style);
                set_focus(app, FocusPane::Styles);
            } else if in_gallery {
                set_focus(app, FocusPane::Gallery);
            }
        }
        MouseEventKind::ScrollDown if in_gallery => app.gallery_move(1),
        MouseEventKind::ScrollUp if in_gallery => app.gallery_move(-1),
        _ => {}
    }
}
