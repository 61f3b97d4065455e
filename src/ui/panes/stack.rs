//! Stack pane rendering with activation records
//!
//! This module renders the stack region of the address space, from the
//! bottom of the stack (highest index) to the top at SP.
//!
//! # Layout
//!
//! Each activation record found on the dynamic chain gets a header row,
//! followed by its cells. The three header words are labelled:
//! - `SL`: static link
//! - `DL`: dynamic link
//! - `RA`: return address
//!
//! Cells that open a frame in the textual trace (the `| ` marker) show a
//! bar in the gutter.

use super::{clamp_scroll, pane_block};
use crate::memory::frame::{DYNAMIC_LINK_OFFSET, RETURN_ADDRESS_OFFSET};
use crate::memory::{ActivationRecord, StackCell};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
    Frame,
};

/// Data needed to render the stack pane
pub struct StackRenderData<'a> {
    pub cells: &'a [StackCell],
    pub records: &'a [ActivationRecord],
    pub bp: i32,
    pub sp: i32,
}

fn header_label(index: i32, records: &[ActivationRecord]) -> Option<&'static str> {
    records.iter().find_map(|record| {
        if index == record.base {
            Some("SL")
        } else if index == record.base - DYNAMIC_LINK_OFFSET {
            Some("DL")
        } else if index == record.base - RETURN_ADDRESS_OFFSET {
            Some("RA")
        } else {
            None
        }
    })
}

/// Render the stack pane
pub fn render_stack_pane(
    frame: &mut Frame,
    area: Rect,
    data: StackRenderData,
    is_focused: bool,
    scroll_offset: &mut usize,
    prev_item_count: &mut usize,
) {
    let block = pane_block(" Stack ", is_focused);
    let mut all_items = Vec::new();

    if data.cells.is_empty() {
        all_items.push(ListItem::new("(empty)").style(Style::default().fg(DEFAULT_THEME.comment)));
    }

    for cell in data.cells {
        let index = cell.index as i32;

        if let Some(record) = data.records.iter().find(|r| r.base == index) {
            let frame_header = Line::from(vec![
                Span::styled("▸ ", Style::default().fg(DEFAULT_THEME.secondary)),
                Span::styled(
                    format!("Frame {} ", record.depth),
                    Style::default().fg(DEFAULT_THEME.comment),
                ),
                Span::styled("│ ", Style::default().fg(DEFAULT_THEME.comment)),
                Span::styled(
                    format!("base {}", record.base),
                    Style::default()
                        .fg(DEFAULT_THEME.frame_header)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("  returns to {}", record.header.return_address),
                    Style::default().fg(DEFAULT_THEME.comment),
                ),
            ]);
            all_items.push(ListItem::new(frame_header));
        }

        let gutter = if cell.boundary { "┃ " } else { "  " };
        let label = header_label(index, data.records).unwrap_or("  ");

        let mut spans = vec![
            Span::styled(gutter, Style::default().fg(DEFAULT_THEME.secondary)),
            Span::styled(
                format!("{:>4} ", cell.index),
                Style::default().fg(DEFAULT_THEME.comment),
            ),
            Span::styled(format!("{} ", label), Style::default().fg(DEFAULT_THEME.link)),
            Span::styled(
                format!("{:>8}", cell.value),
                Style::default().fg(DEFAULT_THEME.number),
            ),
        ];

        if index == data.bp {
            spans.push(Span::styled(
                "  ← BP",
                Style::default().fg(DEFAULT_THEME.primary),
            ));
        }
        if index == data.sp {
            spans.push(Span::styled(
                "  ← SP",
                Style::default()
                    .fg(DEFAULT_THEME.stack_top)
                    .add_modifier(Modifier::BOLD),
            ));
        }

        all_items.push(ListItem::new(Line::from(spans)));
    }

    let total_items = all_items.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;

    // Follow the top of stack when the stack grows
    if total_items > *prev_item_count && total_items > visible_height {
        *scroll_offset = total_items - visible_height;
    }
    *prev_item_count = total_items;
    clamp_scroll(scroll_offset, total_items, visible_height);

    let visible_items: Vec<ListItem> = all_items
        .into_iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .collect();

    frame.render_widget(List::new(visible_items).block(block), area);
}
