//! UI rendering module for the nanochat client.
//!
//! # Layout Structure
//!
//! ```text
//! +--------------------------------------------------+
//! |  Header: Title and Connection Status             |  <- 3 lines
//! +--------------------------------------------------+
//! | 12:00:01 [bob]: hi                               |
//! | 12:00:04 <Me:> hello                             |  <- fills remaining
//! |                                                  |
//! +--------------------------------------------------+
//! |  > typed text_                                   |  <- 3 lines
//! +--------------------------------------------------+
//! ```

pub mod chat_log;
pub mod input_box;
pub mod layout;
pub mod status_bar;
pub mod theme;

use crate::app::App;
use layout::AppLayout;
use ratatui::Frame;

pub use chat_log::render_chat_log;
pub use input_box::render_input_box;
pub use status_bar::render_header;

/// Renders the complete TUI interface.
///
/// # Example
///
/// ```ignore
/// terminal.draw(|frame| {
///     ui::render(frame, &app);
/// })?;
/// ```
pub fn render(frame: &mut Frame, app: &App) {
    let layout = AppLayout::new(frame.area());

    render_header(frame, layout.header, app);
    render_chat_log(frame, layout.messages, app);
    render_input_box(frame, layout.input, app);
}
