use regex::{Regex, RegexBuilder};

use crate::youtube::VideoRecord;

/// Result of running a keyword over the loaded videos.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
  /// Indices into the video list, in playlist order.
  pub indices: Vec<usize>,
  pub matched: usize,
  pub total: usize,
}

/// Trimmed, lower-cased form used for matching.
pub fn normalize_keyword(raw: &str) -> String {
  raw.trim().to_lowercase()
}

/// Case-insensitive substring match against title or description.
pub fn matches_keyword(video: &VideoRecord, needle: &str) -> bool {
  video.title.to_lowercase().contains(needle) || video.description.to_lowercase().contains(needle)
}

/// Stable filter of `videos` by `keyword`. An empty keyword selects nothing.
pub fn filter(videos: &[VideoRecord], keyword: &str) -> FilterOutcome {
  let needle = normalize_keyword(keyword);
  if needle.is_empty() {
    return FilterOutcome { indices: Vec::new(), matched: 0, total: videos.len() };
  }
  let indices: Vec<usize> =
    videos.iter().enumerate().filter(|(_, v)| matches_keyword(v, &needle)).map(|(i, _)| i).collect();
  FilterOutcome { matched: indices.len(), total: videos.len(), indices }
}

/// A slice of highlighted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment<'a> {
  pub text: &'a str,
  pub highlighted: bool,
}

impl<'a> Fragment<'a> {
  fn plain(text: &'a str) -> Self {
    Self { text, highlighted: false }
  }

  fn marked(text: &'a str) -> Self {
    Self { text, highlighted: true }
  }
}

/// Keyword matcher compiled once and reused for every rendered row.
#[derive(Debug, Clone)]
pub struct Highlighter {
  pattern: Option<Regex>,
}

impl Highlighter {
  pub fn new(keyword: &str) -> Self {
    let keyword = keyword.trim();
    let pattern = if keyword.is_empty() {
      None
    } else {
      // Escaped, so user input is always matched literally.
      RegexBuilder::new(&regex::escape(keyword)).case_insensitive(true).build().ok()
    };
    Self { pattern }
  }

  /// Split `text` into plain and highlighted fragments covering it exactly.
  pub fn fragments<'a>(&self, text: &'a str) -> Vec<Fragment<'a>> {
    let Some(ref pattern) = self.pattern else {
      return vec![Fragment::plain(text)];
    };
    let mut out = Vec::new();
    let mut last = 0;
    for m in pattern.find_iter(text) {
      if m.start() > last {
        out.push(Fragment::plain(&text[last..m.start()]));
      }
      out.push(Fragment::marked(m.as_str()));
      last = m.end();
    }
    if last < text.len() || out.is_empty() {
      out.push(Fragment::plain(&text[last..]));
    }
    out
  }
}

/// One-shot convenience over [`Highlighter`].
pub fn highlight<'a>(text: &'a str, keyword: &str) -> Vec<Fragment<'a>> {
  Highlighter::new(keyword).fragments(text)
}
