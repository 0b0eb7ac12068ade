use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};
use std::time::Instant;

use crate::app::{App, Focus};

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

/// Single-line editable text with a char-indexed cursor and horizontal scroll.
#[derive(Debug, Default, Clone)]
pub struct TextField {
  pub value: String,
  pub cursor: usize,
  pub scroll: usize,
}

impl TextField {
  pub fn with_value(value: impl Into<String>) -> Self {
    let value = value.into();
    let cursor = value.chars().count();
    Self { value, cursor, scroll: 0 }
  }

  pub fn is_empty(&self) -> bool {
    self.value.is_empty()
  }

  pub fn clear(&mut self) {
    self.value.clear();
    self.cursor = 0;
    self.scroll = 0;
  }

  /// Apply an editing key. Returns true when the text itself changed.
  pub fn edit(&mut self, code: KeyCode) -> bool {
    match code {
      KeyCode::Char(c) => {
        let byte_idx = char_to_byte_index(&self.value, self.cursor);
        self.value.insert(byte_idx, c);
        self.cursor += 1;
        true
      }
      KeyCode::Backspace => {
        if self.cursor > 0 {
          self.cursor -= 1;
          let byte_idx = char_to_byte_index(&self.value, self.cursor);
          self.value.remove(byte_idx);
          return true;
        }
        false
      }
      KeyCode::Delete => {
        if self.cursor < self.value.chars().count() {
          let byte_idx = char_to_byte_index(&self.value, self.cursor);
          self.value.remove(byte_idx);
          return true;
        }
        false
      }
      KeyCode::Left => {
        self.cursor = self.cursor.saturating_sub(1);
        false
      }
      KeyCode::Right => {
        if self.cursor < self.value.chars().count() {
          self.cursor += 1;
        }
        false
      }
      KeyCode::Home => {
        self.cursor = 0;
        false
      }
      KeyCode::End => {
        self.cursor = self.value.chars().count();
        false
      }
      _ => false,
    }
  }
}

// --- Event Handling ---

pub fn handle_key_event(app: &mut App, key: event::KeyEvent, now: Instant) {
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return;
  }

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('t') {
    app.toggle_theme();
    return;
  }

  // Ctrl+U: wipe the focused field, like a shell prompt
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('u') {
    match app.focus {
      Focus::Url => {
        app.url.clear();
        app.url_edited(now);
      }
      Focus::Keyword => {
        app.keyword.clear();
        app.keyword_edited(now);
      }
      Focus::Results => {}
    }
    return;
  }

  match key.code {
    KeyCode::Tab => {
      app.focus_next();
      return;
    }
    KeyCode::BackTab => {
      app.focus_prev();
      return;
    }
    _ => {}
  }

  match app.focus {
    Focus::Url => handle_field_key(app, key, now, Focus::Url),
    Focus::Keyword => handle_field_key(app, key, now, Focus::Keyword),
    Focus::Results => handle_results_key(app, key),
  }
}

fn handle_field_key(app: &mut App, key: event::KeyEvent, now: Instant, focus: Focus) {
  match key.code {
    KeyCode::Enter => {
      app.trigger_search();
    }
    KeyCode::Esc => {
      let field = if focus == Focus::Url { &mut app.url } else { &mut app.keyword };
      if field.is_empty() {
        app.should_quit = true;
        return;
      }
      field.clear();
      if focus == Focus::Url {
        app.url_edited(now);
      } else {
        app.keyword_edited(now);
      }
    }
    KeyCode::Down => {
      if app.has_results() {
        app.focus = Focus::Results;
      }
    }
    KeyCode::Up => {
      if focus == Focus::Keyword {
        app.focus = Focus::Url;
      }
    }
    code => {
      let field = if focus == Focus::Url { &mut app.url } else { &mut app.keyword };
      if field.edit(code) {
        if focus == Focus::Url {
          app.url_edited(now);
        } else {
          app.keyword_edited(now);
        }
      }
    }
  }
}

fn handle_results_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter | KeyCode::Char('o') => {
      app.open_selected();
    }
    KeyCode::Down | KeyCode::Char('j') => {
      app.select_next();
    }
    KeyCode::Up | KeyCode::Char('k') => {
      if app.list_state.selected() == Some(0) {
        app.focus = Focus::Keyword;
      } else {
        app.select_prev();
      }
    }
    KeyCode::Home | KeyCode::Char('g') => {
      app.list_state.select_first();
    }
    KeyCode::End | KeyCode::Char('G') => {
      app.select_last();
    }
    KeyCode::Char('/') | KeyCode::Esc => {
      app.focus = Focus::Keyword;
    }
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  // --- char_to_byte_index ---

  #[test]
  fn char_to_byte_ascii() {
    assert_eq!(char_to_byte_index("hello", 0), 0);
    assert_eq!(char_to_byte_index("hello", 3), 3);
    assert_eq!(char_to_byte_index("hello", 5), 5); // past end
  }

  #[test]
  fn char_to_byte_multibyte() {
    let s = "aé日"; // a=1 byte, é=2 bytes, 日=3 bytes
    assert_eq!(char_to_byte_index(s, 0), 0);
    assert_eq!(char_to_byte_index(s, 1), 1);
    assert_eq!(char_to_byte_index(s, 2), 3);
    assert_eq!(char_to_byte_index(s, 3), 6);
  }

  // --- TextField ---

  #[test]
  fn typing_inserts_at_cursor() {
    let mut field = TextField::with_value("ac");
    assert_eq!(field.cursor, 2);
    assert!(!field.edit(KeyCode::Left));
    assert!(field.edit(KeyCode::Char('b')));
    assert_eq!(field.value, "abc");
    assert_eq!(field.cursor, 2);
  }

  #[test]
  fn backspace_and_delete_report_changes() {
    let mut field = TextField::with_value("日本");
    assert!(field.edit(KeyCode::Backspace));
    assert_eq!(field.value, "日");
    assert!(!field.edit(KeyCode::Delete)); // cursor at end
    field.edit(KeyCode::Home);
    assert!(field.edit(KeyCode::Delete));
    assert!(field.is_empty());
    assert!(!field.edit(KeyCode::Backspace));
  }

  #[test]
  fn cursor_moves_stay_in_bounds() {
    let mut field = TextField::with_value("ab");
    field.edit(KeyCode::Right);
    assert_eq!(field.cursor, 2);
    field.edit(KeyCode::Home);
    field.edit(KeyCode::Left);
    assert_eq!(field.cursor, 0);
    field.edit(KeyCode::End);
    assert_eq!(field.cursor, 2);
  }

  #[test]
  fn clear_resets_cursor_and_scroll() {
    let mut field = TextField::with_value("https://example.com");
    field.scroll = 4;
    field.clear();
    assert!(field.is_empty());
    assert_eq!((field.cursor, field.scroll), (0, 0));
  }
}
