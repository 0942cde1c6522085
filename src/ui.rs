use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, BorderType, Clear, List, ListItem, ListState, Padding, Paragraph, Wrap},
};

use crate::app::{App, AppMode};
use crate::constants::constants;
use crate::filter::page_window;
use crate::notify::Severity;
use crate::player::PlayerState;
use crate::state::BannerKind;
use crate::theme::Theme;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

fn panel<'a>(theme: &Theme, title: impl Into<Line<'a>>, focused: bool) -> Block<'a> {
  let color = if focused { theme.accent } else { theme.border };
  Block::bordered()
    .title(title)
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(color))
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();
  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let banner_h = if app.state.banner().is_some() { 1 } else { 0 };
  let [header_area, banner_area, main_area, pager_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Length(banner_h),
    Constraint::Min(3),
    Constraint::Length(1),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, app, header_area);
  render_banner(frame, app, banner_area);
  render_main(frame, app, main_area);
  render_pager(frame, app, pager_area);
  render_status(frame, app, status_area);
  render_input(frame, app, input_area);
  render_footer(frame, app, footer_area);
  render_notifications(frame, app, main_area);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (dot, dot_color) =
    if app.state.is_connected() { ("● connected", theme.success) } else { ("● offline", theme.error) };
  let left = Line::from(vec![
    Span::styled(" ▼ tube-snatch ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
    Span::styled(dot, Style::default().fg(dot_color)),
    Span::styled(format!("  {}", app.base_url), Style::default().fg(theme.muted)),
  ]);
  frame.render_widget(left, area);

  let version = format!("v{} ", env!("CARGO_PKG_VERSION"));
  let right = Line::from(Span::styled(&version, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(version.len() as u16), width: version.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

fn render_banner(frame: &mut Frame, app: &App, area: Rect) {
  let Some(banner) = app.state.banner() else { return };
  let theme = app.theme();
  let hint = match banner.kind {
    BannerKind::Connectivity => "  (r to retry)",
    BannerKind::Fetch => "",
  };
  let text = format!(" ⚠  {}{}", banner.message, hint);
  frame.render_widget(Paragraph::new(text).style(Style::default().fg(theme.error)), area);
}

fn render_main(frame: &mut Frame, app: &App, area: Rect) {
  if app.mode == AppMode::Recent {
    render_recent(frame, app, area);
  } else if app.state.catalog.is_empty() {
    render_welcome(frame, app.theme(), area);
  } else if app.state.player.is_open() || matches!(app.state.player.state(), PlayerState::ClosedWithError(_)) {
    let [list_area, player_area] =
      Layout::horizontal([Constraint::Percentage(62), Constraint::Percentage(38)]).areas(area);
    render_catalog(frame, app, list_area);
    render_player(frame, app, player_area);
  } else {
    render_catalog(frame, app, area);
  }
}

fn render_welcome(frame: &mut Frame, theme: &Theme, area: Rect) {
  let text = vec![
    Line::from(""),
    Line::from(Span::styled("▼  Welcome to tube-snatch", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))),
    Line::from(""),
    Line::from(Span::styled("Browse a channel. Pick videos. Download them.", Style::default().fg(theme.fg))),
    Line::from(""),
    Line::from(Span::styled(
      "Paste a channel URL below and press Enter. Tab switches videos/shorts/streams.",
      Style::default().fg(theme.muted),
    )),
  ];
  let paragraph = Paragraph::new(text).alignment(Alignment::Center).wrap(Wrap { trim: true }).block(
    Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(theme.border)),
  );
  frame.render_widget(paragraph, area);
}

fn render_catalog(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let focused = matches!(app.mode, AppMode::Browse | AppMode::Search);
  let Ok(page) = app.state.page() else {
    frame.render_widget(panel(theme, " Videos ", focused), area);
    return;
  };

  // Borders, highlight symbol and the checkbox column.
  let inner_w = area.width.saturating_sub(8) as usize;

  let items: Vec<ListItem> = page
    .videos
    .iter()
    .enumerate()
    .map(|(i, video)| {
      let is_cursor = focused && i == app.cursor;
      let fg = if is_cursor { theme.highlight_fg } else { theme.fg };
      let bg = if is_cursor {
        theme.highlight_bg
      } else if i % 2 == 1 {
        theme.stripe_bg
      } else {
        theme.bg
      };

      let (mark, mark_color) = if video.downloaded {
        ("✓ ", theme.success)
      } else if app.state.selection.contains(&video.id) {
        ("■ ", theme.selected)
      } else {
        ("□ ", theme.muted)
      };
      let right = if app.state.downloads.is_in_flight(&video.id) {
        "DL…".to_string()
      } else {
        video.duration.clone()
      };

      let right_w = right.chars().count();
      let title = truncate_str(&video.title, inner_w.saturating_sub(right_w + 2));
      let gap = inner_w.saturating_sub(title.chars().count() + right_w);
      let right_color = if right_w > 0 && right.starts_with("DL") { theme.status } else { theme.muted };
      let line = Line::from(vec![
        Span::styled(mark, Style::default().fg(mark_color)),
        Span::styled(title, Style::default().fg(fg)),
        Span::raw(" ".repeat(gap)),
        Span::styled(right, Style::default().fg(right_color)),
      ]);
      ListItem::new(line).bg(bg)
    })
    .collect();

  let channel = app.state.catalog.channel_name();
  let title = format!(" {} — {} of {} videos ", channel, page.filtered_len, app.state.catalog.len());
  let list = List::new(items)
    .block(panel(theme, title, focused))
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));

  let mut list_state = ListState::default();
  if focused && !page.videos.is_empty() {
    list_state.select(Some(app.cursor));
  }
  frame.render_stateful_widget(list, area, &mut list_state);
}

fn render_player(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let player = &app.state.player;
  let block = panel(theme, " Preview ", false).padding(Padding::horizontal(1));
  let inner_w = area.width.saturating_sub(4) as usize;

  let mut lines = vec![Line::from("")];
  match (player.session(), player.state()) {
    (Some(session), state) => {
      lines.push(Line::from(Span::styled(
        truncate_str(&session.video.title, inner_w),
        Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
      )));
      lines.push(Line::from(""));
      let phase = match state {
        PlayerState::DiscoveringQualities => "Finding qualities…",
        PlayerState::LoadingStream if player.is_switching() => "Switching quality…",
        PlayerState::LoadingStream => "Loading stream…",
        PlayerState::Ready => "Ready",
        _ => "",
      };
      lines.push(Line::from(vec![
        Span::styled("State     ", Style::default().fg(theme.muted)),
        Span::styled(phase, Style::default().fg(theme.status)),
      ]));
      let offered = player.qualities();
      let qualities: Vec<Span> = offered
        .iter()
        .flat_map(|q| {
          let style = if *q == session.selected_quality {
            Style::default().fg(theme.key_fg).bg(theme.key_bg)
          } else {
            Style::default().fg(theme.fg)
          };
          [Span::styled(format!(" {} ", q), style), Span::raw(" ")]
        })
        .collect();
      let mut quality_line = vec![Span::styled("Quality   ", Style::default().fg(theme.muted))];
      quality_line.extend(qualities);
      lines.push(Line::from(quality_line));
      if !session.video.duration.is_empty() {
        lines.push(Line::from(vec![
          Span::styled("Duration  ", Style::default().fg(theme.muted)),
          Span::styled(session.video.duration.as_str(), Style::default().fg(theme.fg)),
        ]));
      }
      if app.preview.is_running() {
        lines.push(Line::from(vec![
          Span::styled("Window    ", Style::default().fg(theme.muted)),
          Span::styled("mpv", Style::default().fg(theme.fg)),
        ]));
      }
      if let Some(url) = &session.stream_url {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
          truncate_str(url, inner_w),
          Style::default().fg(theme.accent).add_modifier(Modifier::UNDERLINED),
        )));
      }
    }
    (None, PlayerState::ClosedWithError(err)) => {
      lines.push(Line::from(Span::styled("Preview failed", Style::default().fg(theme.error))));
      lines.push(Line::from(Span::styled(err.as_str(), Style::default().fg(theme.muted))));
    }
    (None, _) => {}
  }
  frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }).block(block), area);
}

fn render_recent(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let inner_w = area.width.saturating_sub(4) as usize;
  let items: Vec<ListItem> = app
    .state
    .history
    .entries()
    .iter()
    .map(|entry| {
      let right = format!("{} videos  {}", entry.video_count, entry.last_fetched_at.format("%Y-%m-%d %H:%M"));
      let name = truncate_str(&entry.name, inner_w.saturating_sub(right.chars().count() + 2));
      let gap = inner_w.saturating_sub(name.chars().count() + right.chars().count());
      ListItem::new(Line::from(vec![
        Span::styled(name, Style::default().fg(theme.fg)),
        Span::raw(" ".repeat(gap)),
        Span::styled(right, Style::default().fg(theme.muted)),
      ]))
    })
    .collect();
  let list = List::new(items)
    .block(panel(theme, " Recent channels ", true))
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));
  let mut state = ListState::default().with_selected(Some(app.recent_cursor));
  frame.render_stateful_widget(list, area, &mut state);
}

fn render_pager(frame: &mut Frame, app: &App, area: Rect) {
  if app.state.catalog.is_empty() {
    return;
  }
  let theme = app.theme();
  let view = &app.state.view;
  let total = app.state.total_pages();

  let mut spans = vec![Span::styled(" ", Style::default())];
  if let Some(cat) = app.state.categories().into_iter().find(|c| c.name == view.category()) {
    spans.push(Span::styled(format!("{} ({})", cat.name, cat.count), Style::default().fg(theme.accent)));
    spans.push(Span::raw("   "));
  }
  for p in page_window(view.page(), total, constants().page_window) {
    let style = if p == view.page() {
      Style::default().fg(theme.key_fg).bg(theme.key_bg)
    } else {
      Style::default().fg(theme.muted)
    };
    spans.push(Span::styled(format!(" {} ", p), style));
  }
  spans.push(Span::styled(format!("  of {}", total), Style::default().fg(theme.muted)));
  spans.push(Span::styled(format!("   {}/page", view.page_size()), Style::default().fg(theme.muted)));
  if !app.state.selection.is_empty() {
    spans.push(Span::styled(format!("   {} selected", app.state.selection.len()), Style::default().fg(theme.selected)));
  }
  if !view.search().is_empty() {
    spans.push(Span::styled(format!("   /{}", view.search()), Style::default().fg(theme.status)));
  }
  frame.render_widget(Line::from(spans), area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(url) = app.state.fetching() {
    (format!(" ⏳ Fetching {} from {}…", app.state.content_type.label(), url), Style::default().fg(theme.status))
  } else if let Some(status) = app.preview.last_status() {
    (format!(" ▶ {}", status), Style::default().fg(theme.status))
  } else if app.state.downloads.in_flight_count() > 0 {
    (format!(" ↓ {} download(s) starting", app.state.downloads.in_flight_count()), Style::default().fg(theme.status))
  } else {
    (" Ready".to_string(), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_input(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();

  if app.mode == AppMode::Search {
    let block = panel(theme, " Search title or channel ", true).padding(Padding::horizontal(1));
    let inner_w = area.width.saturating_sub(4) as usize;
    let width = display_width(&app.search_input, app.search_input.chars().count());
    let skip = width.saturating_sub(inner_w.saturating_sub(1));
    let visible: String = app.search_input.chars().skip(skip).collect();
    frame.render_widget(Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(block), area);
    let cursor_x = area.x + 2 + width.saturating_sub(skip) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
    return;
  }

  let focused = app.mode == AppMode::Input;
  let title = format!(" Channel URL [{}] ", app.state.content_type.label());
  let input_block = panel(theme, title, focused).padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let cursor_col = display_width(&app.input, app.cursor_position);

  if cursor_col < app.input_scroll {
    app.input_scroll = cursor_col;
  } else if cursor_col >= app.input_scroll + inner_w {
    app.input_scroll = cursor_col.saturating_sub(inner_w) + 1;
  }

  let visible: String = app
    .input
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= app.input_scroll)
    .take_while(|(start, _, _)| *start < app.input_scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  let paragraph = Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(input_block);
  frame.render_widget(paragraph, area);

  if focused {
    let cursor_x = area.x + 2 + (cursor_col - app.input_scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn footer_keys(app: &App) -> Vec<(&'static str, &'static str)> {
  let has_catalog = !app.state.catalog.is_empty();
  match app.mode {
    AppMode::Input => {
      let mut k = vec![("Enter", "Fetch"), ("Tab", "Type")];
      if !app.state.history.is_empty() {
        k.push(("↑", "Recent"));
      }
      if has_catalog {
        k.push(("↓", "Browse"));
      }
      k.push(("^t", "Theme"));
      k.push(("Esc", if has_catalog { "Browse" } else { "Quit" }));
      k
    }
    AppMode::Browse => {
      let mut k = vec![
        ("j/k", "Move"),
        ("n/p", "Page"),
        ("Space", "Select"),
        ("a/c", "All/Clear"),
        ("d", "Download sel."),
        ("x", "Download"),
        ("Enter", "Preview"),
      ];
      if app.state.player.is_open() {
        k.push(("q", "Quality"));
        k.push(("s", "Close"));
      }
      k.extend([("[ ]", "Category"), ("+", "Per page"), ("/", "Search"), ("R", "Reset"), ("N", "New")]);
      if !app.state.is_connected() {
        k.push(("r", "Retry"));
      }
      k
    }
    AppMode::Search => vec![("Enter", "Done"), ("Esc", "Clear")],
    AppMode::Recent => vec![("Enter", "Fetch"), ("j/k", "Navigate"), ("Esc", "Back")],
  }
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let keys = footer_keys(app);

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw(" "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let theme_label = format!("{} ", theme.name);
  let right = Line::from(Span::styled(&theme_label, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(theme_label.len() as u16), width: theme_label.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

/// Toasts stacked in the top-right corner of `area`, newest on top.
fn render_notifications(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let width = (area.width / 2).clamp(20, 60).min(area.width);
  let inner_w = width.saturating_sub(4) as usize;
  let mut y = area.y;
  let now = std::time::Instant::now();

  for note in app.state.notifications.iter().rev() {
    if y + 3 > area.y + area.height {
      break;
    }
    let (icon, color) = match note.severity {
      Severity::Success => ("✓", theme.success),
      Severity::Error => ("✗", theme.error),
      Severity::Info => ("ℹ", theme.info),
    };
    let rect = Rect { x: area.x + area.width - width, y, width, height: 3 };
    let text = Line::from(vec![
      Span::styled(format!("{} ", icon), Style::default().fg(color)),
      Span::styled(truncate_str(&note.message, inner_w.saturating_sub(6)), Style::default().fg(theme.fg)),
      Span::styled(
        format!(" {}s", now.saturating_duration_since(note.created_at).as_secs()),
        Style::default().fg(theme.muted),
      ),
    ]);
    frame.render_widget(Clear, rect);
    frame.render_widget(
      Paragraph::new(text).style(Style::default().bg(theme.bg)).block(
        Block::bordered()
          .border_type(BorderType::Rounded)
          .border_style(Style::default().fg(color))
          .padding(Padding::horizontal(1)),
      ),
      rect,
    );
    y += 3;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn truncate_keeps_short_strings() {
    assert_eq!(truncate_str("short", 10), "short");
    assert_eq!(truncate_str("exactly10!", 10), "exactly10!");
  }

  #[test]
  fn truncate_appends_ellipsis() {
    assert_eq!(truncate_str("a very long title", 8), "a very …");
    assert_eq!(truncate_str("日本語のタイトル", 4).chars().count(), 4);
  }

  #[test]
  fn display_width_counts_wide_chars() {
    assert_eq!(display_width("abc", 2), 2);
    assert_eq!(display_width("日本", 2), 4);
  }
}
