//! Shared theme utilities for the nanochat client.

use ratatui::style::Color;

/// Palette used for other users' names.
const SENDER_PALETTE: [Color; 6] = [
    Color::Cyan,
    Color::Magenta,
    Color::Yellow,
    Color::Blue,
    Color::LightGreen,
    Color::LightRed,
];

/// Color for our own messages.
pub const OWN_COLOR: Color = Color::Green;

/// Color for client notices.
pub const SYSTEM_COLOR: Color = Color::DarkGray;

/// Returns a stable color for a sender's name.
///
/// The same name always gets the same color, so a conversation stays
/// readable without keeping any per-user state.
///
/// # Example
/// ```ignore
/// assert_eq!(sender_color("bob"), sender_color("bob"));
/// ```
pub fn sender_color(sender: &str) -> Color {
    let hash = sender
        .bytes()
        .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(usize::from(b)));
    SENDER_PALETTE
        .get(hash % SENDER_PALETTE.len())
        .copied()
        .unwrap_or(Color::White)
}
