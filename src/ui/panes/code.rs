//! Code pane: the disassembled text segment
//!
//! Each row shows the word address of one instruction, its raw triple and
//! its mnemonic. The instruction that just executed is highlighted and the
//! next one to fetch carries an arrow.

use super::{clamp_scroll, pane_block};
use crate::interpreter::isa::RawInstruction;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
    Frame,
};

/// Data needed to render the code pane
pub struct CodeRenderData<'a> {
    pub instructions: &'a [RawInstruction],
    pub code_start: usize,
    /// Next instruction to fetch
    pub pc: i32,
    /// Address of the instruction that produced the current state
    pub executed: Option<i32>,
}

/// Render the code pane
pub fn render_code_pane(
    frame: &mut Frame,
    area: Rect,
    data: CodeRenderData,
    is_focused: bool,
    scroll_offset: &mut usize,
    follow_pc: bool,
) {
    let block = pane_block(" Code ", is_focused);

    let pc_row = usize::try_from(data.pc - data.code_start as i32)
        .ok()
        .map(|offset| offset / 3);

    let items: Vec<ListItem> = data
        .instructions
        .iter()
        .enumerate()
        .map(|(row, raw)| {
            let address = (data.code_start + row * 3) as i32;
            let is_next = address == data.pc;
            let is_executed = data.executed == Some(address);

            let marker = if is_next { "→ " } else { "  " };
            let mut spans = vec![
                Span::styled(marker, Style::default().fg(DEFAULT_THEME.secondary)),
                Span::styled(
                    format!("{:>4}  ", address),
                    Style::default().fg(DEFAULT_THEME.comment),
                ),
                Span::styled(
                    format!("{:<3} ", mnemonic_of(raw)),
                    Style::default()
                        .fg(DEFAULT_THEME.mnemonic)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("{:>3} {:>5}", raw.l, raw.m),
                    Style::default().fg(DEFAULT_THEME.number),
                ),
                Span::styled(
                    format!("   ({} {} {})", raw.op, raw.l, raw.m),
                    Style::default().fg(DEFAULT_THEME.comment),
                ),
            ];
            if is_executed {
                spans.push(Span::styled(
                    "  ◀ executed",
                    Style::default().fg(DEFAULT_THEME.success),
                ));
            }

            let item = ListItem::new(Line::from(spans));
            if is_executed {
                item.style(Style::default().bg(DEFAULT_THEME.current_line_bg))
            } else {
                item
            }
        })
        .collect();

    if items.is_empty() {
        let list = List::new(vec![
            ListItem::new("(no instructions)").style(Style::default().fg(DEFAULT_THEME.comment))
        ])
        .block(block);
        frame.render_widget(list, area);
        return;
    }

    let total_items = items.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;

    // Keep the next instruction roughly centered while stepping
    if follow_pc {
        if let Some(row) = pc_row {
            *scroll_offset = row.saturating_sub(visible_height / 2);
        }
    }
    clamp_scroll(scroll_offset, total_items, visible_height);

    let visible_items: Vec<ListItem> = items
        .into_iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .collect();

    frame.render_widget(List::new(visible_items).block(block), area);
}

fn mnemonic_of(raw: &RawInstruction) -> &'static str {
    raw.decode()
        .map(|instruction| instruction.opcode.mnemonic())
        .unwrap_or("???")
}
