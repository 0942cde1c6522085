use anyhow::Result;
use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};

use crate::app::{App, AppMode};

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

// --- Event Handling ---

pub async fn handle_key_event(app: &mut App, key: event::KeyEvent) -> Result<()> {
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return Ok(());
  }

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('t') {
    app.next_theme();
    return Ok(());
  }

  match app.mode {
    AppMode::Input => handle_input_key(app, key),
    AppMode::Browse => handle_browse_key(app, key).await,
    AppMode::Search => handle_search_key(app, key),
    AppMode::Recent => handle_recent_key(app, key),
  }
  Ok(())
}

fn handle_input_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter => {
      app.trigger_fetch();
    }
    KeyCode::Tab => {
      app.state.content_type = app.state.content_type.next();
    }
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
      app.input.insert(byte_idx, c);
      app.cursor_position += 1;
    }
    KeyCode::Backspace => {
      if app.cursor_position > 0 {
        app.cursor_position -= 1;
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
      }
    }
    KeyCode::Delete => {
      if app.cursor_position < app.input.chars().count() {
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
      }
    }
    KeyCode::Left => {
      app.cursor_position = app.cursor_position.saturating_sub(1);
    }
    KeyCode::Right => {
      if app.cursor_position < app.input.chars().count() {
        app.cursor_position += 1;
      }
    }
    KeyCode::Home => {
      app.cursor_position = 0;
    }
    KeyCode::End => {
      app.cursor_position = app.input.chars().count();
    }
    KeyCode::Up => {
      if !app.state.history.is_empty() {
        app.recent_cursor = 0;
        app.mode = AppMode::Recent;
      }
    }
    KeyCode::Down => {
      if !app.state.catalog.is_empty() {
        app.mode = AppMode::Browse;
      }
    }
    KeyCode::Esc => {
      if !app.input.is_empty() {
        app.input.clear();
        app.cursor_position = 0;
        app.input_scroll = 0;
      } else if !app.state.catalog.is_empty() {
        app.mode = AppMode::Browse;
      } else {
        app.should_quit = true;
      }
    }
    _ => {}
  }
}

async fn handle_browse_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Down | KeyCode::Char('j') => app.move_cursor(true),
    KeyCode::Up | KeyCode::Char('k') => app.move_cursor(false),
    KeyCode::Right | KeyCode::Char('n') => app.step_page(true),
    KeyCode::Left | KeyCode::Char('p') => app.step_page(false),
    KeyCode::Char(' ') => app.toggle_current(),
    KeyCode::Char('a') => {
      app.state.select_all();
    }
    KeyCode::Char('c') => app.state.clear_selection(),
    KeyCode::Char('d') => app.state.download_selected(),
    KeyCode::Char('x') => app.download_current(),
    KeyCode::Enter => app.open_preview(),
    KeyCode::Char('q') => app.cycle_quality(),
    KeyCode::Char('s') => app.close_preview().await,
    KeyCode::Char(']') => {
      app.state.cycle_category(true);
      app.cursor = 0;
    }
    KeyCode::Char('[') => {
      app.state.cycle_category(false);
      app.cursor = 0;
    }
    KeyCode::Char('+') => {
      app.state.cycle_page_size();
      app.cursor = 0;
    }
    KeyCode::Char('/') => {
      app.search_input = app.state.view.search().to_string();
      app.mode = AppMode::Search;
    }
    KeyCode::Char('r') => app.trigger_connectivity(),
    KeyCode::Char('R') => app.reset_view(),
    KeyCode::Char('N') => app.new_channel().await,
    KeyCode::Backspace => {
      app.state.notifications.dismiss_latest();
    }
    KeyCode::Char('i') | KeyCode::Esc => app.mode = AppMode::Input,
    _ => {}
  }
}

fn handle_search_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Char(c) => {
      app.search_input.push(c);
      app.apply_search();
    }
    KeyCode::Backspace => {
      if app.search_input.pop().is_some() {
        app.apply_search();
      }
    }
    KeyCode::Enter => {
      app.mode = AppMode::Browse;
    }
    KeyCode::Esc => {
      app.search_input.clear();
      app.apply_search();
      app.mode = AppMode::Browse;
    }
    _ => {}
  }
}

fn handle_recent_key(app: &mut App, key: event::KeyEvent) {
  let count = app.state.history.len();
  match key.code {
    KeyCode::Down | KeyCode::Char('j') => {
      if count > 0 {
        app.recent_cursor = (app.recent_cursor + 1) % count;
      }
    }
    KeyCode::Up | KeyCode::Char('k') => {
      if count > 0 {
        app.recent_cursor = if app.recent_cursor == 0 { count - 1 } else { app.recent_cursor - 1 };
      }
    }
    KeyCode::Enter => app.fetch_recent(),
    KeyCode::Esc => app.mode = AppMode::Input,
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  // --- char_to_byte_index ---

  #[test]
  fn char_to_byte_ascii() {
    assert_eq!(char_to_byte_index("channel", 0), 0);
    assert_eq!(char_to_byte_index("channel", 4), 4);
    assert_eq!(char_to_byte_index("channel", 7), 7); // past end
  }

  #[test]
  fn char_to_byte_multibyte() {
    let s = "@é日"; // @=1 byte, é=2 bytes, 日=3 bytes
    assert_eq!(char_to_byte_index(s, 1), 1);
    assert_eq!(char_to_byte_index(s, 2), 3);
    assert_eq!(char_to_byte_index(s, 3), 6); // past end
  }

  #[test]
  fn char_to_byte_empty() {
    assert_eq!(char_to_byte_index("", 0), 0);
    assert_eq!(char_to_byte_index("", 3), 0);
  }
}
