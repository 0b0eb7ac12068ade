use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, BorderType, LineGauge, List, ListItem, Padding, Paragraph},
};

use crate::app::{App, Focus};
use crate::filter::{self, Fragment};
use crate::input::TextField;
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

/// Spans for one line of highlighted fragments, cut to `max_width` chars.
/// Returns the spans and the number of chars they occupy.
fn highlighted_line(
  fragments: &[Fragment<'_>],
  max_width: usize,
  base: Style,
  marked: Style,
) -> (Vec<Span<'static>>, usize) {
  let total: usize = fragments.iter().map(|f| f.text.chars().count()).sum();
  let truncate = total > max_width;
  let budget = if truncate { max_width.saturating_sub(1) } else { max_width };
  let mut spans = Vec::new();
  let mut used = 0usize;

  for fragment in fragments {
    if used >= budget {
      break;
    }
    let text: String = fragment.text.chars().take(budget - used).collect();
    used += text.chars().count();
    let style = if fragment.highlighted { marked } else { base };
    spans.push(Span::styled(text, style));
  }
  if truncate {
    spans.push(Span::styled("…", base));
    used += 1;
  }
  (spans, used)
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme;

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, url_area, keyword_area, status_area, main_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(3),
    Constraint::Length(1),
    Constraint::Min(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, app, header_area);
  render_field(frame, theme, &mut app.url, " Playlist URL ", app.focus == Focus::Url, url_area);
  render_field(frame, theme, &mut app.keyword, " Keyword ", app.focus == Focus::Keyword, keyword_area);
  render_status(frame, app, status_area);
  render_main(frame, app, main_area);
  render_footer(frame, app, footer_area);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme;
  let mut spans = vec![Span::styled(" ▶ ypl ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))];
  if let Some(session) = app.controller.session() {
    let count = format!("  {}/{} videos", session.videos.len(), session.total_expected);
    let title_w = (area.width as usize).saturating_sub(count.chars().count() + 20);
    spans.push(Span::styled(truncate_str(&session.title, title_w), Style::default().fg(theme.fg)));
    spans.push(Span::styled(count, Style::default().fg(theme.muted)));
  }
  frame.render_widget(Line::from(spans), area);

  let version = format!("v{} ", env!("CARGO_PKG_VERSION"));
  let right = Line::from(Span::styled(&version, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(version.len() as u16), width: version.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

fn render_field(frame: &mut Frame, theme: &Theme, field: &mut TextField, title: &str, focused: bool, area: Rect) {
  let border_color = if focused { theme.accent } else { theme.border };
  let block = Block::bordered()
    .title(title)
    .title_style(Style::default().fg(border_color))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let cursor_col = display_width(&field.value, field.cursor);

  if cursor_col < field.scroll {
    field.scroll = cursor_col;
  } else if cursor_col >= field.scroll + inner_w {
    field.scroll = cursor_col.saturating_sub(inner_w) + 1;
  }

  let scroll = field.scroll;
  let visible: String = field
    .value
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= scroll)
    .take_while(|(start, _, _)| *start < scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  frame.render_widget(Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(block), area);

  if focused {
    let cursor_x = area.x + 2 + cursor_col.saturating_sub(scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme;
  let controller = &app.controller;

  if let Some(progress) = controller.progress() {
    let ratio = if progress.total == 0 { 0.0 } else { (progress.fetched as f64 / progress.total as f64).min(1.0) };
    let label = match controller.status() {
      Some(msg) => format!(" ⏳ {} · {}/{}", msg, progress.fetched, progress.total),
      None => format!(" ⏳ Fetching videos... {}/{}", progress.fetched, progress.total),
    };
    let gauge = LineGauge::default()
      .label(label)
      .ratio(ratio)
      .style(Style::default().fg(theme.status))
      .filled_style(Style::default().fg(theme.accent))
      .unfilled_style(Style::default().fg(theme.border));
    frame.render_widget(gauge, area);
    return;
  }

  let (text, style) = if let Some(msg) = controller.status() {
    (format!(" ⏳ {}", msg), Style::default().fg(theme.status))
  } else if let Some(err) = controller.error() {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if !controller.keyword().is_empty() && controller.session().is_some() {
    let outcome = controller.outcome();
    (format!(" Found {} of {} videos", outcome.matched, outcome.total), Style::default().fg(theme.status))
  } else if let Some(session) = controller.session() {
    (format!(" {} videos loaded. Type a keyword to filter.", session.videos.len()), Style::default().fg(theme.muted))
  } else {
    (" Ready".to_string(), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_main(frame: &mut Frame, app: &mut App, area: Rect) {
  if app.has_results() {
    render_results(frame, app, area);
  } else {
    render_welcome(frame, app, area);
  }
}

fn render_welcome(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme;
  let hint = if app.controller.is_loading() {
    "Loading playlist…"
  } else if app.controller.session().is_some() {
    "Type a keyword above to filter titles and descriptions."
  } else {
    "Paste a playlist URL above, then type a keyword."
  };
  let text = vec![
    Line::from(""),
    Line::from(Span::styled(
      "▶  Playlist keyword filter",
      Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
    )),
    Line::from(""),
    Line::from(Span::styled(hint, Style::default().fg(theme.muted))),
  ];
  let paragraph = Paragraph::new(text)
    .alignment(Alignment::Center)
    .block(Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(theme.border)));
  frame.render_widget(paragraph, area);
}

fn render_results(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme;
  let (area, details_area) = if area.height > 10 {
    let [list, details] = Layout::vertical([Constraint::Min(3), Constraint::Length(4)]).areas(area);
    (list, Some(details))
  } else {
    (area, None)
  };
  let controller = &app.controller;
  let highlighter = controller.highlighter();
  let selected = app.list_state.selected();

  // Inner width: area minus 2 borders minus 2 chars for highlight symbol ("▶ ")
  let inner_w = area.width.saturating_sub(4) as usize;
  let marked = Style::default().fg(theme.match_fg).bg(theme.match_bg).add_modifier(Modifier::BOLD);

  let items: Vec<ListItem> = controller
    .matches()
    .enumerate()
    .map(|(i, video)| {
      let is_selected = Some(i) == selected;
      let fg = if is_selected { theme.highlight_fg } else { theme.fg };
      let bg = if is_selected {
        theme.highlight_bg
      } else if i % 2 == 1 {
        theme.stripe_bg
      } else {
        theme.bg
      };

      let date = video.published_date().unwrap_or_default();
      let date_w = date.chars().count();
      let title_max = if date.is_empty() { inner_w } else { inner_w.saturating_sub(date_w + 2) };
      let fragments = highlighter.fragments(&video.title);
      let (mut spans, title_w) = highlighted_line(&fragments, title_max, Style::default().fg(fg), marked);
      if !date.is_empty() {
        spans.push(Span::raw(" ".repeat(inner_w.saturating_sub(title_w + date_w))));
        spans.push(Span::styled(date, Style::default().fg(theme.muted)));
      }
      ListItem::new(Line::from(spans)).bg(bg)
    })
    .collect();

  let outcome = controller.outcome();
  let title = format!(" Found {} of {} videos ", outcome.matched, outcome.total);
  let border_color = if app.focus == Focus::Results { theme.accent } else { theme.border };

  let list = List::new(items)
    .block(
      Block::bordered()
        .title(title)
        .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color)),
    )
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));

  frame.render_stateful_widget(list, area, &mut app.list_state);

  if let Some(details_area) = details_area {
    render_details(frame, app, details_area);
  }
}

/// Description and links of the selected video.
fn render_details(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme;
  let block = Block::bordered()
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(theme.border))
    .padding(Padding::horizontal(1));
  let Some(video) = app.selected_video() else {
    frame.render_widget(block, area);
    return;
  };

  let inner_w = area.width.saturating_sub(4) as usize;
  let description = video.description.lines().find(|l| !l.trim().is_empty()).unwrap_or("(no description)");
  let fragments = filter::highlight(description, app.controller.keyword());
  let marked = Style::default().fg(theme.match_fg).bg(theme.match_bg);
  let (desc_spans, _) = highlighted_line(&fragments, inner_w, Style::default().fg(theme.fg), marked);

  let url = video.watch_url();
  let url_w = url.chars().count();
  let mut link_spans =
    vec![Span::styled(url, Style::default().fg(theme.accent).add_modifier(Modifier::UNDERLINED))];
  if inner_w > url_w + 3 {
    link_spans.push(Span::raw("  "));
    link_spans.push(Span::styled(
      truncate_str(&video.thumbnail_url, inner_w - url_w - 2),
      Style::default().fg(theme.muted),
    ));
  }

  let paragraph = Paragraph::new(vec![Line::from(desc_spans), Line::from(link_spans)]).block(block);
  frame.render_widget(paragraph, area);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme;
  let keys: Vec<(&str, &str)> = match app.focus {
    Focus::Url | Focus::Keyword => {
      let mut k = vec![("Enter", "Search"), ("Tab", "Next field"), ("^u", "Clear")];
      if app.has_results() {
        k.push(("↓", "Results"));
      }
      k.push(("^t", "Theme"));
      k.push(("Esc", "Clear/Quit"));
      k
    }
    Focus::Results => {
      vec![("Enter", "Open"), ("j/k", "Navigate"), ("/", "Keyword"), ("^t", "Theme"), ("Esc", "Back")]
    }
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw("  "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let theme_label = if theme.is_dark() { "☀ light mode " } else { "☾ dark mode " };
  let label_w = theme_label.chars().count() as u16;
  let right = Line::from(Span::styled(theme_label, Style::default().fg(theme.muted)));
  let right_area = Rect { x: area.x + area.width.saturating_sub(label_w), width: label_w, ..area };
  frame.render_widget(right, right_area);
}
