//! Chat log widget for the nanochat client.
//!
//! Shows the most recent entries that fit, newest at the bottom.

use crate::app::{App, ChatEntry, EntryKind};
use crate::ui::theme::{sender_color, OWN_COLOR, SYSTEM_COLOR};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

/// Renders the chat log.
///
/// Entries are not wrapped; the log shows as many of the newest entries as
/// the area has rows.
pub fn render_chat_log(frame: &mut Frame, area: Rect, app: &App) {
    // Two rows go to the borders.
    let visible = usize::from(area.height.saturating_sub(2));
    let skip = app.entries.len().saturating_sub(visible);

    let items: Vec<ListItem> = app
        .entries
        .iter()
        .skip(skip)
        .map(|entry| ListItem::new(entry_line(entry)))
        .collect();

    let title = format!(" {} ", app.server);
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(Color::White)),
    );

    frame.render_widget(list, area);
}

/// Builds the styled line for one entry: `HH:MM:SS` followed by the text.
fn entry_line(entry: &ChatEntry) -> Line<'static> {
    let time = Span::styled(
        format!("{} ", entry.time.format("%H:%M:%S")),
        Style::default().fg(Color::DarkGray),
    );

    match &entry.kind {
        EntryKind::Chat { sender } => Line::from(vec![
            time,
            Span::styled(
                format!("[{sender}]:"),
                Style::default()
                    .fg(sender_color(sender))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(" {}", entry.text)),
        ]),
        EntryKind::Own => Line::from(vec![
            time,
            Span::styled(entry.display_text(), Style::default().fg(OWN_COLOR)),
        ]),
        EntryKind::System => Line::from(vec![
            time,
            Span::styled(
                entry.display_text(),
                Style::default()
                    .fg(SYSTEM_COLOR)
                    .add_modifier(Modifier::ITALIC),
            ),
        ]),
    }
}
