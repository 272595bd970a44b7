//! Conversation screen rendering

use super::helpers::{message_body, wrap_text};
use crate::model::SenderType;
use crate::tui::app::App;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use std::rc::Rc;

fn screen_chunks(area: Rect) -> Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(5),    // Message history
            Constraint::Length(3), // Input box
            Constraint::Length(3), // Status/Help
        ])
        .split(area)
}

/// Inner area of the message history pane for a terminal of the given size
pub fn message_pane(area: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(screen_chunks(area)[1])
}

/// Renders the conversation screen
pub fn render_conversation(f: &mut Frame, app: &App) {
    let Some(view) = &app.conversation else {
        return;
    };
    let chunks = screen_chunks(f.size());
    let snapshot = view.snapshot();

    let customer = app
        .room_list
        .rooms()
        .iter()
        .find(|room| room.room_id == view.room_id())
        .map(|room| room.customer_name.clone())
        .unwrap_or_else(|| format!("Room {}", view.room_id()));
    let title = Paragraph::new(format!("Chat with {}", customer))
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    let pane_width = message_pane(f.size()).width;
    if snapshot.messages.is_empty() {
        let text = if snapshot.loading {
            "Loading messages..."
        } else {
            "No messages yet"
        };
        let empty = Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Messages"));
        f.render_widget(empty, chunks[1]);
    } else {
        let mut lines: Vec<Line> = Vec::new();
        for message in &snapshot.messages {
            let is_admin = message.sender_type() == SenderType::Admin;
            let sender_color = if is_admin { Color::Green } else { Color::Blue };
            let sender = if message.sender_name().is_empty() {
                if is_admin { "You" } else { "Customer" }
            } else {
                message.sender_name()
            };
            let time = if message.is_pending() {
                "sending...".to_string()
            } else {
                message.display_time()
            };

            lines.push(Line::from(vec![
                Span::styled(format!("[{}] ", time), Style::default().fg(Color::DarkGray)),
                Span::styled(
                    sender.to_string(),
                    Style::default().fg(sender_color).add_modifier(Modifier::BOLD),
                ),
            ]));

            let body_style = if message.is_pending() {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::White)
            };
            for row in wrap_text(&message_body(message), pane_width) {
                lines.push(Line::from(Span::styled(row, body_style)));
            }
        }

        let history_title = if snapshot.loading_more {
            "Messages (loading older...)".to_string()
        } else if snapshot.has_more {
            "Messages".to_string()
        } else {
            "Messages (start of conversation)".to_string()
        };
        let offset = u16::try_from(snapshot.scroll.offset).unwrap_or(u16::MAX);
        let history = Paragraph::new(lines)
            .scroll((offset, 0))
            .block(Block::default().borders(Borders::ALL).title(history_title));
        f.render_widget(history, chunks[1]);
    }

    let input = Paragraph::new(snapshot.draft.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title("Type your message"));
    f.render_widget(input, chunks[2]);

    let (help_text, help_style) = if app.connection_lost() {
        (
            "Connection to the server lost, retrying...".to_string(),
            Style::default().fg(Color::Red),
        )
    } else if let Some(status) = app.status_message.clone().or(snapshot.last_error) {
        (status, Style::default().fg(Color::Red))
    } else {
        (
            "Enter: Send | ↑↓/PgUp/PgDn: Scroll | End: Latest | Esc: Back".to_string(),
            Style::default().fg(Color::DarkGray),
        )
    };
    let help = Paragraph::new(help_text)
        .style(help_style)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[3]);
}
