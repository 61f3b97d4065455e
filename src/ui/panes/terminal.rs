//! Console pane rendering

use super::{clamp_scroll, pane_block};
use crate::snapshot::MockConsole;
use crate::trace::SysEvent;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{List, ListItem, Padding, Paragraph},
    Frame,
};

/// Render the console pane
pub fn render_terminal_pane(
    frame: &mut Frame,
    area: Rect,
    console: &MockConsole,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = pane_block(" Console ", is_focused);

    if console.lines.is_empty() {
        let paragraph = Paragraph::new("(no output)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    }

    let block = block.padding(Padding::new(1, 0, 0, 0));
    let all_items: Vec<ListItem> = console
        .lines
        .iter()
        .map(|line| {
            let color = match line.event {
                SysEvent::Output(_) => DEFAULT_THEME.fg,
                SysEvent::Input(_) => DEFAULT_THEME.secondary,
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("[{:>4}] ", line.step),
                    Style::default().fg(DEFAULT_THEME.comment),
                ),
                Span::styled(line.text(), Style::default().fg(color)),
            ]))
        })
        .collect();

    let total_items = all_items.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    clamp_scroll(scroll_offset, total_items, visible_height);

    let visible_items: Vec<ListItem> = all_items
        .into_iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .collect();

    frame.render_widget(List::new(visible_items).block(block), area);
}
