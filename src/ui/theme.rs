use ratatui::style::Color;

pub struct Theme {
    pub fg: Color,
    pub primary: Color,   // Blue
    pub secondary: Color, // Orange
    pub comment: Color,   // Grey
    pub success: Color,   // Green
    pub error: Color,     // Red
    pub mnemonic: Color,
    pub number: Color,
    pub border_focused: Color,
    pub border_normal: Color,
    pub current_line_bg: Color,
    pub frame_header: Color,  // Yellow for activation record headers
    pub link: Color,          // Cyan for SL/DL/RA cells
    pub stack_top: Color,     // Pink for the cell at SP
}

pub const DEFAULT_THEME: Theme = Theme {
    fg: Color::Rgb(205, 214, 244),
    primary: Color::Rgb(137, 180, 250),   // Blue
    secondary: Color::Rgb(250, 179, 135), // Orange
    comment: Color::Rgb(108, 112, 134),
    success: Color::Rgb(166, 227, 161),
    error: Color::Rgb(243, 139, 168),
    mnemonic: Color::Rgb(137, 180, 250),       // Blue for opcodes
    number: Color::Rgb(250, 179, 135),         // Orange for operands
    border_focused: Color::Rgb(249, 226, 175), // Yellow border for focus
    border_normal: Color::Rgb(108, 112, 134),  // Grey border for normal
    current_line_bg: Color::Rgb(50, 50, 70),   // Slightly lighter BG for current line
    frame_header: Color::Rgb(249, 226, 175),
    link: Color::Rgb(148, 226, 213),
    stack_top: Color::Rgb(245, 194, 231),
};
