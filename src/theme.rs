use ratatui::style::Color;

pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub accent: Color,
  pub muted: Color,
  pub border: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  pub key_fg: Color,
  pub key_bg: Color,
  pub status: Color,
  pub error: Color,
  pub success: Color,
  pub info: Color,
  /// Rows marked for batch download.
  pub selected: Color,
}

pub const THEMES: [Theme; 3] = [
  Theme {
    name: "Midnight",
    bg: Color::Rgb(18, 18, 24),
    fg: Color::Rgb(210, 210, 225),
    accent: Color::Rgb(255, 95, 95),
    muted: Color::Rgb(115, 115, 138),
    border: Color::Rgb(52, 52, 68),
    highlight_fg: Color::Rgb(255, 255, 255),
    highlight_bg: Color::Rgb(48, 40, 72),
    stripe_bg: Color::Rgb(24, 24, 32),
    key_fg: Color::Rgb(18, 18, 24),
    key_bg: Color::Rgb(120, 100, 200),
    status: Color::Rgb(255, 184, 80),
    error: Color::Rgb(255, 80, 80),
    success: Color::Rgb(80, 200, 120),
    info: Color::Rgb(80, 160, 220),
    selected: Color::Rgb(255, 210, 50),
  },
  Theme {
    name: "Paper",
    bg: Color::Rgb(250, 247, 240),
    fg: Color::Rgb(40, 40, 48),
    accent: Color::Rgb(196, 64, 64),
    muted: Color::Rgb(128, 124, 118),
    border: Color::Rgb(210, 204, 192),
    highlight_fg: Color::Rgb(20, 20, 24),
    highlight_bg: Color::Rgb(232, 222, 200),
    stripe_bg: Color::Rgb(242, 238, 228),
    key_fg: Color::Rgb(250, 247, 240),
    key_bg: Color::Rgb(96, 88, 160),
    status: Color::Rgb(176, 112, 16),
    error: Color::Rgb(200, 40, 40),
    success: Color::Rgb(40, 140, 80),
    info: Color::Rgb(40, 110, 170),
    selected: Color::Rgb(176, 112, 16),
  },
  Theme {
    name: "Terminal",
    bg: Color::Reset,
    fg: Color::White,
    accent: Color::Red,
    muted: Color::DarkGray,
    border: Color::DarkGray,
    highlight_fg: Color::Black,
    highlight_bg: Color::White,
    stripe_bg: Color::Reset,
    key_fg: Color::Black,
    key_bg: Color::Magenta,
    status: Color::Yellow,
    error: Color::LightRed,
    success: Color::Green,
    info: Color::Cyan,
    selected: Color::Yellow,
  },
];
