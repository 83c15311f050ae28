use finchat_core::{Message, Sender};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use crate::app::{App, BackendStatus};

const PLACEHOLDER: &str = "Ask me about stock/crypto prices...";

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input row, footer
    let [header_area, chat_area, input_row, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    let [input_area, send_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(10),
    ])
    .areas(input_row);

    // Store areas for mouse hit-testing
    app.chat_area = Some(chat_area);
    app.send_area = Some(send_area);

    // Inner size minus borders, for scroll calculations
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_send_button(app, frame, send_area);
    render_footer(frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let (status_text, status_color) = match &app.backend_status {
        BackendStatus::Checking => ("connecting".to_string(), Color::Gray),
        BackendStatus::Online => ("online".to_string(), Color::Green),
        BackendStatus::Offline(reason) => (format!("offline: {}", reason), Color::Red),
    };

    let title = Line::from(vec![
        Span::styled(" Finance Chatbot ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("{} ", app.client.base_url()),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(format!("[{}]", status_text), Style::default().fg(status_color)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn message_lines(message: &Message) -> Vec<Line<'_>> {
    let (label, color) = match message.sender {
        Sender::User => ("You:", Color::Cyan),
        Sender::Bot => ("Bot:", Color::Yellow),
    };

    let mut lines = vec![Line::from(Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))];

    let body_style = if message.sender == Sender::Bot && message.text.starts_with("Error: ") {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };
    for line in message.text.lines() {
        lines.push(Line::from(Span::styled(line, body_style)));
    }
    lines.push(Line::default());
    lines
}

fn render_chat(app: &App, frame: &mut Frame, area: Rect) {
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Messages ");

    let waiting = app.state.is_waiting();
    let chat_text = if app.state.messages().is_empty() && !waiting {
        Text::from(Span::styled(
            "Try 'What is the price of BTC?' or 'Show me news'",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = app
            .state
            .messages()
            .iter()
            .flat_map(message_lines)
            .collect();

        if waiting {
            lines.push(Line::from(Span::styled(
                "Bot:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            let pending = app.state.pending();
            let label = if pending > 1 {
                format!("Thinking{} ({} pending)", dots, pending)
            } else {
                format!("Thinking{}", dots)
            };
            lines.push(Line::from(Span::styled(
                label,
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Ask ");

    // Horizontal scrolling keeps the cursor visible; inner width excludes borders
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let input = if app.input().is_empty() {
        Paragraph::new(Span::styled(PLACEHOLDER, Style::default().fg(Color::DarkGray)))
    } else {
        let visible_text: String = app
            .input()
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan))
    };

    frame.render_widget(input.block(input_block), area);

    let cursor_x = (cursor_pos - scroll_offset) as u16;
    frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
}

fn render_send_button(app: &App, frame: &mut Frame, area: Rect) {
    let enabled = !app.input().trim().is_empty();
    let style = if enabled {
        Style::default().fg(Color::Black).bg(Color::Cyan).bold()
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let button = Paragraph::new("Send")
        .alignment(Alignment::Center)
        .style(style)
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(button, area);
}

fn render_footer(frame: &mut Frame, area: Rect) {
    let hints = Line::from(vec![
        Span::styled(" Enter ", Style::default().bg(Color::Blue).fg(Color::White)),
        Span::raw(" send  "),
        Span::styled(" PgUp/PgDn ", Style::default().bg(Color::Blue).fg(Color::White)),
        Span::raw(" scroll  "),
        Span::styled(" Esc ", Style::default().bg(Color::Blue).fg(Color::White)),
        Span::raw(" quit"),
    ]);

    frame.render_widget(Paragraph::new(hints), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use finchat_core::{Action, BackendReply, ChatClient};
    use ratatui::{backend::TestBackend, Terminal};
    use tokio::sync::mpsc;

    fn screen_text(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    fn app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        App::new(ChatClient::new("http://localhost:8000"), tx)
    }

    #[test]
    fn empty_session_shows_placeholder() {
        let mut app = app();
        let text = screen_text(&mut app);
        assert!(text.contains("Finance Chatbot"));
        assert!(text.contains(PLACEHOLDER));
        assert!(text.contains("Send"));
    }

    #[test]
    fn messages_render_with_sender_labels() {
        let mut app = app();
        app.state.set_input("price of BTC");
        let dispatch = app.state.update(Action::SubmitStarted).unwrap();
        app.state.update(Action::ResponseReceived {
            ticket: dispatch.ticket,
            outcome: Ok(BackendReply::Plain {
                message: Some("Latest news:\n- Markets up".to_string()),
            }),
        });

        let text = screen_text(&mut app);
        assert!(text.contains("You:"));
        assert!(text.contains("price of BTC"));
        assert!(text.contains("Bot:"));
        assert!(text.contains("- Markets up"));
    }

    #[test]
    fn pending_query_shows_thinking() {
        let mut app = app();
        app.state.set_input("price of ETH");
        app.state.update(Action::SubmitStarted);

        let text = screen_text(&mut app);
        assert!(text.contains("Thinking."));
    }
}
