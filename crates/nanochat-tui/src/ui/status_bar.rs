//! Header bar widget for the nanochat client.

use crate::app::{App, AppState};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Renders the header bar with title, quit hint and connection status.
///
/// # Arguments
/// * `frame` - The frame to render into
/// * `area` - The rectangular area for the header
/// * `app` - Application state containing connection info
pub fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let (status_text, status_style) = get_status_display(&app.state);

    let detail = match &app.state {
        AppState::Connected | AppState::Connecting => {
            format!(" | {}@{}", app.username, app.server)
        }
        AppState::Disconnected { since, .. } => format!(" since {}", since.format("%H:%M:%S")),
    };

    let header_line = Line::from(vec![
        Span::styled(
            "nanochat",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" - press ESC/Ctrl-C to quit | "),
        Span::styled(status_text, status_style),
        Span::styled(detail, Style::default().fg(Color::DarkGray)),
    ]);

    let border_style = match app.state {
        AppState::Connected => Style::default().fg(Color::Green),
        AppState::Connecting => Style::default().fg(Color::Yellow),
        AppState::Disconnected { .. } => Style::default().fg(Color::Red),
    };

    let header = Paragraph::new(header_line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style),
    );

    frame.render_widget(header, area);
}

/// Returns the display text and style for the given connection state.
fn get_status_display(state: &AppState) -> (&'static str, Style) {
    match state {
        AppState::Connected => (
            "Connected",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
        AppState::Connecting => (
            "Connecting...",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        AppState::Disconnected { .. } => (
            "Disconnected",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
    }
}
