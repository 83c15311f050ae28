use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::App;
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => app.scroll_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Reply { ticket, outcome } => app.receive_reply(ticket, outcome),
        AppEvent::Greeting(result) => app.receive_greeting(result),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        // Quit
        KeyCode::Char('c') if ctrl => app.should_quit = true,
        KeyCode::Esc => app.should_quit = true,

        // Submit
        KeyCode::Enter => app.send_message(),

        // Half-page scroll
        KeyCode::Char('u') if ctrl => app.scroll_up(app.half_page()),
        KeyCode::Char('d') if ctrl => app.scroll_down(app.half_page()),
        KeyCode::PageUp => app.scroll_up(app.half_page()),
        KeyCode::PageDown => app.scroll_down(app.half_page()),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),

        // Line editing
        KeyCode::Backspace => app.delete_before_cursor(),
        KeyCode::Delete => app.delete_at_cursor(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Char(c) if !ctrl => app.insert_char(c),

        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let on_send = app.send_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown if in_chat => app.scroll_down(3),
        MouseEventKind::ScrollUp if in_chat => app.scroll_up(3),
        MouseEventKind::Down(MouseButton::Left) if on_send => app.send_message(),
        _ => {}
    }
}
