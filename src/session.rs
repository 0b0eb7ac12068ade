//! Orchestration of the two input fields and the playlist load lifecycle.
//!
//! The controller owns the only [`PlaylistSession`] and decides which in-flight load
//! may commit into it. Every load is tagged with a generation; starting a new load or
//! clearing the URL bumps the generation, so results from superseded loads are dropped
//! on arrival no matter when they finish.

use tracing::{debug, info, warn};

use crate::error::{FetchError, FetchResult};
use crate::filter::{self, FilterOutcome, Highlighter};
use crate::youtube::{FetchProgress, LoadEvent, PlaylistMetadata, VideoRecord, extract_playlist_id};

pub const NO_VIDEOS_LOADED: &str = "No videos loaded yet. Please enter a playlist URL first.";
pub const MISSING_URL: &str = "Please enter a playlist URL";
pub const MISSING_KEYWORD: &str = "Please enter a keyword to search";

/// Videos of one playlist, eligible for keyword filtering.
#[derive(Debug, Clone)]
pub struct PlaylistSession {
  pub playlist_id: String,
  pub title: String,
  pub videos: Vec<VideoRecord>,
  pub total_expected: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
  Idle,
  Loading { playlist_id: String, generation: u64 },
  Ready,
}

/// Handed to the caller when a load should start. The generation must accompany
/// every event and the final result of that load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
  pub playlist_id: String,
  pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
  Url,
  Keyword,
}

/// What an explicit search asks the caller to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchAction {
  Focus(Field),
  Load(LoadTicket),
  Refiltered,
  Nothing,
}

pub struct Controller {
  state: LoadState,
  session: Option<PlaylistSession>,
  generation: u64,
  keyword: String,
  outcome: FilterOutcome,
  highlighter: Highlighter,
  error: Option<String>,
  status: Option<String>,
  progress: Option<FetchProgress>,
}

impl Default for Controller {
  fn default() -> Self {
    Self::new()
  }
}

impl Controller {
  pub fn new() -> Self {
    Self {
      state: LoadState::Idle,
      session: None,
      generation: 0,
      keyword: String::new(),
      outcome: FilterOutcome::default(),
      highlighter: Highlighter::new(""),
      error: None,
      status: None,
      progress: None,
    }
  }

  // --- Accessors ---

  pub fn is_loading(&self) -> bool {
    matches!(self.state, LoadState::Loading { .. })
  }

  pub fn session(&self) -> Option<&PlaylistSession> {
    self.session.as_ref()
  }

  pub fn outcome(&self) -> &FilterOutcome {
    &self.outcome
  }

  pub fn highlighter(&self) -> &Highlighter {
    &self.highlighter
  }

  /// The applied (normalized) keyword.
  pub fn keyword(&self) -> &str {
    &self.keyword
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  pub fn status(&self) -> Option<&str> {
    self.status.as_deref()
  }

  pub fn progress(&self) -> Option<FetchProgress> {
    self.progress
  }

  /// Videos matching the applied keyword, in playlist order.
  pub fn matches(&self) -> impl Iterator<Item = &VideoRecord> {
    let videos = self.session.as_ref().map(|s| s.videos.as_slice()).unwrap_or(&[]);
    self.outcome.indices.iter().filter_map(move |&i| videos.get(i))
  }

  /// The playlist the controller currently stands for: loaded or being loaded.
  pub fn current_playlist_id(&self) -> Option<&str> {
    match &self.state {
      LoadState::Loading { playlist_id, .. } => Some(playlist_id.as_str()),
      _ => self.session.as_ref().map(|s| s.playlist_id.as_str()),
    }
  }

  pub fn set_error(&mut self, message: impl Into<String>) {
    self.error = Some(message.into());
  }

  pub fn clear_error(&mut self) {
    self.error = None;
  }

  // --- Transitions ---

  /// The URL field settled on `raw`. Returns a ticket when a new load must start.
  pub fn url_settled(&mut self, raw: &str) -> Option<LoadTicket> {
    let raw = raw.trim();
    if raw.is_empty() {
      self.reset();
      return None;
    }

    let Some(playlist_id) = extract_playlist_id(raw) else {
      self.set_error(FetchError::InvalidUrl.to_string());
      return None;
    };

    if self.current_playlist_id() == Some(playlist_id.as_str()) {
      debug!(playlist_id = %playlist_id, "url unchanged, nothing to do");
      return None;
    }

    Some(self.begin_load(playlist_id))
  }

  /// The keyword field settled on `raw`. Never touches the network.
  pub fn keyword_settled(&mut self, raw: &str) {
    self.refilter(raw);
  }

  /// Explicit search from either field: validate, then load or re-filter.
  pub fn search(&mut self, raw_url: &str, raw_keyword: &str) -> SearchAction {
    if raw_url.trim().is_empty() {
      self.set_error(FetchError::Validation(MISSING_URL).to_string());
      return SearchAction::Focus(Field::Url);
    }
    if raw_keyword.trim().is_empty() {
      self.set_error(FetchError::Validation(MISSING_KEYWORD).to_string());
      return SearchAction::Focus(Field::Keyword);
    }
    let Some(playlist_id) = extract_playlist_id(raw_url) else {
      self.set_error(FetchError::InvalidUrl.to_string());
      return SearchAction::Focus(Field::Url);
    };

    if self.current_playlist_id() != Some(playlist_id.as_str()) {
      return match self.url_settled(raw_url) {
        Some(ticket) => SearchAction::Load(ticket),
        None => SearchAction::Nothing,
      };
    }

    self.refilter(raw_keyword);
    SearchAction::Refiltered
  }

  /// Apply a progress event. Returns false when the event belongs to a superseded load.
  pub fn apply_event(&mut self, generation: u64, event: LoadEvent) -> bool {
    if !self.is_current(generation) {
      return false;
    }
    match event {
      LoadEvent::Metadata(PlaylistMetadata { title, total_video_count }) => {
        self.status = Some(format!("Loading {}", title));
        self.progress = Some(FetchProgress { fetched: 0, total: total_video_count });
      }
      LoadEvent::Progress(progress) => {
        self.progress = Some(progress);
      }
    }
    true
  }

  /// Commit the outcome of a load, then re-apply `keyword`.
  /// Returns false, leaving state untouched, when the load was superseded.
  pub fn finish_load(
    &mut self,
    generation: u64,
    result: FetchResult<(PlaylistMetadata, Vec<VideoRecord>)>,
    keyword: &str,
  ) -> bool {
    let LoadState::Loading { playlist_id, .. } = &self.state else {
      debug!(generation, "dropping result of a load that is no longer wanted");
      return false;
    };
    if !self.is_current(generation) {
      debug!(generation, current = self.generation, "dropping result of superseded load");
      return false;
    }
    let playlist_id = playlist_id.clone();

    self.status = None;
    self.progress = None;
    match result {
      Ok((metadata, videos)) => {
        info!(playlist_id = %playlist_id, videos = videos.len(), "session ready");
        self.session = Some(PlaylistSession {
          playlist_id,
          title: metadata.title,
          videos,
          total_expected: metadata.total_video_count,
        });
        self.state = LoadState::Ready;
        self.clear_error();
        self.refilter(keyword);
      }
      Err(e) => {
        warn!(playlist_id = %playlist_id, err = %e, root = %e.root(), "playlist load failed");
        self.session = None;
        self.state = LoadState::Idle;
        self.outcome = FilterOutcome::default();
        self.set_error(e.to_string());
      }
    }
    true
  }

  fn is_current(&self, generation: u64) -> bool {
    matches!(self.state, LoadState::Loading { generation: g, .. } if g == generation)
  }

  fn begin_load(&mut self, playlist_id: String) -> LoadTicket {
    self.generation += 1;
    info!(playlist_id = %playlist_id, generation = self.generation, "starting playlist load");
    self.state = LoadState::Loading { playlist_id: playlist_id.clone(), generation: self.generation };
    self.session = None;
    self.outcome = FilterOutcome::default();
    self.clear_error();
    self.status = Some("Getting playlist info…".to_string());
    self.progress = None;
    LoadTicket { playlist_id, generation: self.generation }
  }

  /// Back to Idle with nothing loaded; any in-flight load becomes stale.
  fn reset(&mut self) {
    if self.is_loading() || self.session.is_some() {
      info!("playlist cleared");
    }
    self.generation += 1;
    self.state = LoadState::Idle;
    self.session = None;
    self.outcome = FilterOutcome::default();
    self.clear_error();
    self.status = None;
    self.progress = None;
  }

  fn refilter(&mut self, raw_keyword: &str) {
    self.keyword = filter::normalize_keyword(raw_keyword);
    self.highlighter = Highlighter::new(&self.keyword);

    let Some(session) = &self.session else {
      self.outcome = FilterOutcome::default();
      if !self.keyword.is_empty() && !self.is_loading() {
        self.set_error(NO_VIDEOS_LOADED);
      } else if self.keyword.is_empty() && self.error() == Some(NO_VIDEOS_LOADED) {
        self.clear_error();
      }
      return;
    };

    self.outcome = filter::filter(&session.videos, &self.keyword);
    if self.keyword.is_empty() {
      self.clear_error();
      return;
    }
    if self.outcome.matched == 0 {
      let message = format!(
        "No matching videos found for \"{}\". Showing 0 of {} videos.",
        self.keyword, self.outcome.total
      );
      self.set_error(message);
    } else {
      self.clear_error();
    }
  }
}
