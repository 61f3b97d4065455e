//! TUI pane rendering modules
//!
//! This module provides the rendering logic for all visual panes in the TUI.
//!
//! # Pane Modules
//!
//! - [`code`]: disassembled text segment with the program counter indicator
//! - [`stack`]: stack region grouped by activation record
//! - [`registers`]: PC/BP/SP, the instruction register and the static chain
//! - [`terminal`]: program output and input lines
//! - [`status`]: status bar with keybindings and execution state
//!
//! # Architecture
//!
//! Each pane module exports a primary `render_*` function that takes the
//! frame, its area, a borrowed view of machine state and its focus flag.
//! Panes are stateless apart from the scroll offsets owned by the app.

pub mod code;
pub mod registers;
pub mod stack;
pub mod status;
pub mod terminal;

// Re-export render functions for convenience
pub use code::{render_code_pane, CodeRenderData};
pub use registers::render_registers_pane;
pub use stack::{render_stack_pane, StackRenderData};
pub use status::{render_status_bar, StatusRenderData};
pub use terminal::render_terminal_pane;

use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    style::{Modifier, Style},
    widgets::{Block, Borders},
};

/// Bordered block whose border color follows focus
pub(crate) fn pane_block(title: &str, is_focused: bool) -> Block<'_> {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style)
}

/// Clamp `offset` so that a window of `visible` rows stays within `total`
pub(crate) fn clamp_scroll(offset: &mut usize, total: usize, visible: usize) {
    if total > visible {
        *offset = (*offset).min(total - visible);
    } else {
        *offset = 0;
    }
}
