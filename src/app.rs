use ratatui::widgets::ListState;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::constants::constants;
use crate::debounce::Debouncer;
use crate::error::FetchResult;
use crate::input::TextField;
use crate::session::{Controller, Field, LoadTicket, SearchAction};
use crate::theme::Theme;
use crate::youtube::{LoadEvent, PlaylistApi, PlaylistMetadata, VideoRecord};

// --- Types ---

pub type LoadResult = FetchResult<(PlaylistMetadata, Vec<VideoRecord>)>;

/// Message from a background load, tagged with the generation it was started for.
pub(crate) enum LoadMessage {
  Event(u64, LoadEvent),
  Done(u64, LoadResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
  Url,
  Keyword,
  Results,
}

/// The single in-flight playlist load, if any.
struct LoadTask {
  handle: Option<JoinHandle<()>>,
  tx: mpsc::UnboundedSender<LoadMessage>,
  rx: mpsc::UnboundedReceiver<LoadMessage>,
}

pub struct App {
  pub url: TextField,
  pub keyword: TextField,
  pub focus: Focus,
  pub theme: &'static Theme,
  pub controller: Controller,
  pub list_state: ListState,
  pub should_quit: bool,
  url_debounce: Debouncer,
  keyword_debounce: Debouncer,
  api: Arc<PlaylistApi>,
  task: LoadTask,
  config: Config,
}

impl App {
  pub fn new(api: PlaylistApi, config: Config) -> Self {
    let theme = Theme::by_name(config.theme_name.as_deref());
    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      url: TextField::default(),
      keyword: TextField::default(),
      focus: Focus::Url,
      theme,
      controller: Controller::new(),
      list_state: ListState::default(),
      should_quit: false,
      url_debounce: Debouncer::new(constants().url_debounce()),
      keyword_debounce: Debouncer::new(constants().keyword_debounce()),
      api: Arc::new(api),
      task: LoadTask { handle: None, tx, rx },
      config,
    }
  }

  /// Prefill the URL field from the host (command line) and load it right away.
  pub fn prefill_url(&mut self, url: &str) {
    self.url = TextField::with_value(url);
    self.focus = Focus::Keyword;
    if let Some(ticket) = self.controller.url_settled(url) {
      self.spawn_load(ticket);
    }
  }

  pub fn toggle_theme(&mut self) {
    self.theme = self.theme.toggled();
    self.config.theme_name = Some(self.theme.name.to_string());
    self.config.save();
    info!(theme = self.theme.name, "theme changed");
  }

  pub fn has_results(&self) -> bool {
    !self.controller.outcome().indices.is_empty()
  }

  pub fn focus_next(&mut self) {
    self.focus = match self.focus {
      Focus::Url => Focus::Keyword,
      Focus::Keyword if self.has_results() => Focus::Results,
      _ => Focus::Url,
    };
  }

  pub fn focus_prev(&mut self) {
    self.focus = match self.focus {
      Focus::Url if self.has_results() => Focus::Results,
      Focus::Url => Focus::Keyword,
      Focus::Keyword => Focus::Url,
      Focus::Results => Focus::Keyword,
    };
  }

  // --- Input ---

  pub fn url_edited(&mut self, now: Instant) {
    self.url_debounce.schedule(now);
  }

  pub fn keyword_edited(&mut self, now: Instant) {
    self.keyword_debounce.schedule(now);
  }

  /// Enter in either field: validate both, then load or re-filter immediately.
  pub fn trigger_search(&mut self) {
    self.keyword_debounce.cancel();
    match self.controller.search(&self.url.value, &self.keyword.value) {
      SearchAction::Focus(Field::Url) => self.focus = Focus::Url,
      SearchAction::Focus(Field::Keyword) => self.focus = Focus::Keyword,
      SearchAction::Load(ticket) => {
        self.url_debounce.cancel();
        self.spawn_load(ticket);
      }
      SearchAction::Refiltered => {
        self.list_state.select(None);
        self.sync_selection();
      }
      SearchAction::Nothing => {}
    }
  }

  /// How long the event loop may block before a debounce timer is due.
  pub fn next_deadline(&self, now: Instant) -> Duration {
    let poll = Duration::from_millis(constants().poll_interval_ms);
    [self.url_debounce.remaining(now), self.keyword_debounce.remaining(now)]
      .into_iter()
      .flatten()
      .fold(poll, Duration::min)
  }

  /// Fire due debounce timers and drain background load messages.
  pub fn tick(&mut self, now: Instant) {
    if self.url_debounce.fire(now) {
      debug!("url input settled");
      if let Some(ticket) = self.controller.url_settled(&self.url.value) {
        self.spawn_load(ticket);
      }
      self.sync_selection();
    }

    if self.keyword_debounce.fire(now) {
      debug!("keyword input settled");
      self.controller.keyword_settled(&self.keyword.value);
      self.list_state.select(None);
      self.sync_selection();
    }

    while let Ok(message) = self.task.rx.try_recv() {
      match message {
        LoadMessage::Event(generation, event) => {
          self.controller.apply_event(generation, event);
        }
        LoadMessage::Done(generation, result) => {
          if self.controller.finish_load(generation, result, &self.keyword.value) {
            self.task.handle = None;
            self.list_state.select(None);
            self.sync_selection();
          }
        }
      }
    }
  }

  // --- Loading ---

  /// Start a background load, aborting whichever load it supersedes.
  fn spawn_load(&mut self, ticket: LoadTicket) {
    if let Some(handle) = self.task.handle.take() {
      debug!("aborting superseded load");
      handle.abort();
    }
    self.list_state.select(None);
    if self.focus == Focus::Results {
      self.focus = Focus::Keyword;
    }

    let api = Arc::clone(&self.api);
    let tx = self.task.tx.clone();
    let LoadTicket { playlist_id, generation } = ticket;
    self.task.handle = Some(tokio::spawn(async move {
      let events = tx.clone();
      let result = api
        .load_playlist(&playlist_id, |event| {
          let _ = events.send(LoadMessage::Event(generation, event));
        })
        .await;
      let _ = tx.send(LoadMessage::Done(generation, result));
    }));
  }

  // --- Results ---

  /// Keep the list selection inside the current result range.
  fn sync_selection(&mut self) {
    let count = self.controller.outcome().indices.len();
    if count == 0 {
      self.list_state.select(None);
      if self.focus == Focus::Results {
        self.focus = Focus::Keyword;
      }
      return;
    }
    let sel = self.list_state.selected().unwrap_or(0);
    self.list_state.select(Some(sel.min(count - 1)));
  }

  pub fn select_next(&mut self) {
    let count = self.controller.outcome().indices.len();
    if count > 0 {
      let i = self.list_state.selected().map_or(0, |i| (i + 1) % count);
      self.list_state.select(Some(i));
    }
  }

  pub fn select_prev(&mut self) {
    let count = self.controller.outcome().indices.len();
    if count > 0 {
      let i = self.list_state.selected().map_or(0, |i| if i == 0 { count - 1 } else { i - 1 });
      self.list_state.select(Some(i));
    }
  }

  pub fn select_last(&mut self) {
    let count = self.controller.outcome().indices.len();
    if count > 0 {
      self.list_state.select(Some(count - 1));
    }
  }

  pub fn selected_video(&self) -> Option<&VideoRecord> {
    let selected = self.list_state.selected()?;
    self.controller.matches().nth(selected)
  }

  /// Open the selected video in the default browser.
  pub fn open_selected(&mut self) {
    let Some(url) = self.selected_video().map(VideoRecord::watch_url) else { return };
    #[cfg(target_os = "macos")]
    let cmd = "open";
    #[cfg(not(target_os = "macos"))]
    let cmd = "xdg-open";
    match std::process::Command::new(cmd)
      .arg(&url)
      .stdin(std::process::Stdio::null())
      .stdout(std::process::Stdio::null())
      .stderr(std::process::Stdio::null())
      .spawn()
    {
      Ok(mut child) => {
        info!(url = %url, "opened video in browser");
        // Reap the child in a background thread to avoid zombie processes.
        std::thread::spawn(move || {
          let _ = child.wait();
        });
      }
      Err(e) => {
        warn!(err = %e, "failed to open browser");
        self.controller.set_error(format!("Failed to open browser: {}", e));
      }
    }
  }
}
