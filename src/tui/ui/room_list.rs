//! Room list screen rendering

use super::helpers::status_color;
use crate::tui::app::App;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

/// Renders the room list screen
pub fn render_room_list(f: &mut Frame, app: &App) {
    let size = f.size();
    let view = &app.room_list;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(5),    // Rooms
            Constraint::Length(3), // Status
            Constraint::Length(3), // Help
        ])
        .split(size);

    let filter_label = view.filter().map(|s| s.label()).unwrap_or("All");
    let title = Paragraph::new(format!(
        "Clinic Chat - {} rooms, {} unread [{}]",
        view.rooms().len(),
        view.total_unread(),
        filter_label
    ))
    .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    let visible = view.visible_rooms();
    if visible.is_empty() {
        let text = if view.is_loading() {
            "Loading rooms..."
        } else {
            "No rooms"
        };
        let empty = Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Rooms"));
        f.render_widget(empty, chunks[1]);
    } else {
        let items: Vec<ListItem> = visible
            .iter()
            .map(|room| {
                let selected = view.selected_id() == Some(room.room_id);
                let marker = if selected {
                    Span::styled("→ ", Style::default().fg(Color::Cyan))
                } else {
                    Span::raw("  ")
                };

                let name_style = if view.is_highlighted(room.room_id) || room.unread_count > 0 {
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Gray)
                };
                let unread = if room.unread_count > 0 {
                    format!(" ({})", room.unread_count)
                } else {
                    String::new()
                };

                let header = Line::from(vec![
                    marker,
                    Span::styled(room.customer_name.clone(), name_style),
                    Span::styled(unread, Style::default().fg(Color::Yellow)),
                    Span::raw("  "),
                    Span::styled(
                        format!("[{}]", room.status.label()),
                        Style::default().fg(status_color(room.status)),
                    ),
                    Span::raw("  "),
                    Span::styled(
                        room.last_message_display.clone(),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]);
                let preview = Line::from(vec![
                    Span::raw("    "),
                    Span::styled(room.last_message.clone(), Style::default().fg(Color::Gray)),
                ]);
                ListItem::new(vec![header, preview])
            })
            .collect();

        let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Rooms"));
        f.render_widget(list, chunks[1]);
    }

    let (status_text, status_style) = if app.connection_lost() {
        (
            "Connection to the server lost, retrying...".to_string(),
            Style::default().fg(Color::Red),
        )
    } else if let Some(error) = view.last_error() {
        (error.to_string(), Style::default().fg(Color::Red))
    } else {
        (
            app.status_message.clone().unwrap_or_default(),
            Style::default().fg(Color::Green),
        )
    };
    let status = Paragraph::new(status_text)
        .style(status_style)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, chunks[2]);

    let help_text = "↑↓/j/k: Navigate | Enter: Open | f: Filter | a: Assign | c: Complete | x: Cancel | r: Refresh | q: Quit";
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[3]);
}
