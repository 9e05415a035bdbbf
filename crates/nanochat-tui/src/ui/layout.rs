//! Layout helpers for the nanochat client.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Main application layout areas.
///
/// The TUI is divided into three vertical sections:
/// - Header (3 lines): Title and connection status
/// - Messages (fills remaining): The chat log
/// - Input (3 lines): The line being typed
#[derive(Debug, Clone, Copy)]
pub struct AppLayout {
    /// Header area for title and status
    pub header: Rect,
    /// Chat log area
    pub messages: Rect,
    /// Input line area
    pub input: Rect,
}

impl AppLayout {
    /// Creates a new AppLayout by splitting the given area.
    pub fn new(area: Rect) -> Self {
        let [header, messages, input] = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(1),    // Messages
                Constraint::Length(3), // Input
            ])
            .areas(area);

        Self {
            header,
            messages,
            input,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_layout_creation() {
        let area = Rect::new(0, 0, 80, 24);
        let layout = AppLayout::new(area);

        assert_eq!(layout.header.y, 0);
        assert_eq!(layout.header.height, 3);

        assert_eq!(layout.messages.y, 3);
        assert_eq!(layout.messages.height, 18);
        assert_eq!(layout.messages.width, 80);

        assert_eq!(layout.input.height, 3);
        assert_eq!(layout.input.y + layout.input.height, 24);
    }
}
