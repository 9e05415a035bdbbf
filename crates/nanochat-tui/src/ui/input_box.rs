//! Input line widget for the nanochat client.

use crate::app::App;
use ratatui::{
    layout::{Position, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Prompt shown before the typed text.
const PROMPT: &str = "> ";

/// Renders the input line and places the cursor after the typed text.
///
/// While disconnected the box is dimmed and the cursor hidden.
pub fn render_input_box(frame: &mut Frame, area: Rect, app: &App) {
    let connected = app.is_connected();
    let text_style = if connected {
        Style::default()
    } else {
        Style::default().fg(Color::DarkGray)
    };

    // Keep the end of a long line visible.
    let inner_width = usize::from(area.width.saturating_sub(2));
    let room = inner_width.saturating_sub(PROMPT.len() + 1);
    let typed = tail_chars(&app.input, room);

    let line = Line::from(vec![
        Span::styled(PROMPT, Style::default().fg(Color::Cyan)),
        Span::styled(typed.to_string(), text_style),
    ]);

    let title = if connected { " Message " } else { " Offline " };
    let input = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(text_style),
    );
    frame.render_widget(input, area);

    if connected && area.height > 2 {
        let offset = PROMPT.len() + typed.chars().count();
        let x = area
            .x
            .saturating_add(1)
            .saturating_add(u16::try_from(offset).unwrap_or(u16::MAX));
        frame.set_cursor_position(Position::new(
            x.min(area.right().saturating_sub(2)),
            area.y.saturating_add(1),
        ));
    }
}

/// Returns the last `max` characters of `s`.
fn tail_chars(s: &str, max: usize) -> &str {
    if max == 0 {
        return "";
    }
    let count = s.chars().count();
    if count <= max {
        return s;
    }
    match s.char_indices().nth(count - max) {
        Some((idx, _)) => s.get(idx..).unwrap_or(s),
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_chars_short() {
        assert_eq!(tail_chars("hello", 10), "hello");
        assert_eq!(tail_chars("hello", 5), "hello");
    }

    #[test]
    fn test_tail_chars_long() {
        assert_eq!(tail_chars("hello world", 5), "world");
    }

    #[test]
    fn test_tail_chars_multibyte() {
        assert_eq!(tail_chars("héllo wörld", 5), "wörld");
    }

    #[test]
    fn test_tail_chars_zero() {
        assert_eq!(tail_chars("hello", 0), "");
    }
}
