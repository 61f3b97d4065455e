//! Register pane: PC, BP, SP, the instruction register and the static chain

use super::pane_block;
use crate::interpreter::registers::Registers;
use crate::memory::{resolve_base, AddressSpace};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Deepest static chain shown
const MAX_CHAIN: u32 = 8;

fn register_line(name: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!(" {:<4}", name),
            Style::default()
                .fg(DEFAULT_THEME.primary)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(value, Style::default().fg(DEFAULT_THEME.number)),
    ])
}

/// Render the register pane
pub fn render_registers_pane(
    frame: &mut Frame,
    area: Rect,
    registers: &Registers,
    memory: &AddressSpace,
    steps_executed: usize,
    is_focused: bool,
) {
    let block = pane_block(" Registers ", is_focused);

    let mut lines = vec![
        register_line("PC", registers.pc.to_string()),
        register_line("BP", registers.bp.to_string()),
        register_line("SP", registers.sp.to_string()),
        register_line("IR", registers.ir.to_string()),
        register_line("#", format!("{} executed", steps_executed)),
    ];

    // Static chain: base(BP, 0), base(BP, 1), ... until it stops moving
    let root = memory.capacity() as i32 - 1;
    let mut chain = Vec::new();
    for levels in 0..MAX_CHAIN {
        match resolve_base(memory, registers.bp, levels) {
            Ok(base) => {
                chain.push(base.to_string());
                if base == root {
                    break;
                }
            }
            Err(_) => {
                chain.push("?".to_string());
                break;
            }
        }
    }
    lines.push(Line::from(vec![
        Span::styled(" SL* ", Style::default().fg(DEFAULT_THEME.link)),
        Span::styled(chain.join(" → "), Style::default().fg(DEFAULT_THEME.comment)),
    ]));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
