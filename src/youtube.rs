use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use tracing::{debug, info, warn};
use url::Url;

use crate::constants::constants;
use crate::error::{FetchError, FetchResult};

/// A single playable entry from a playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRecord {
  pub id: String,
  pub title: String,
  pub description: String,
  pub thumbnail_url: String,
  pub published_at: Option<DateTime<Utc>>,
}

impl VideoRecord {
  pub fn watch_url(&self) -> String {
    format!("{}{}", constants().watch_url_prefix, self.id)
  }

  /// Publication date as shown in the result list, e.g. `2024-03-01`.
  pub fn published_date(&self) -> Option<String> {
    self.published_at.map(|d| d.format("%Y-%m-%d").to_string())
  }
}

/// Title and advertised size of a playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistMetadata {
  pub title: String,
  pub total_video_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchProgress {
  pub fetched: usize,
  pub total: u64,
}

/// Intermediate events emitted while a playlist loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadEvent {
  Metadata(PlaylistMetadata),
  Progress(FetchProgress),
}

/// Pull the `list` query parameter out of anything that parses as a URL.
/// Returns None for malformed input or when the parameter is missing or empty.
pub fn extract_playlist_id(input: &str) -> Option<String> {
  let url = Url::parse(input.trim()).ok()?;
  url.query_pairs().find(|(k, _)| k == "list").map(|(_, v)| v.into_owned()).filter(|v| !v.is_empty())
}

// --- Transport ---

#[derive(Debug, Clone)]
pub struct HttpResponse {
  pub status: u16,
  pub body: String,
}

/// Minimal HTTP GET seam so the retry and pagination logic can run against scripted responses.
pub trait Transport: Send + Sync {
  fn get(&self, url: &str) -> impl Future<Output = FetchResult<HttpResponse>> + Send;
}

pub struct HttpTransport {
  client: Client,
}

impl HttpTransport {
  pub fn new() -> Self {
    let client = Client::builder()
      .user_agent(concat!("ypl/", env!("CARGO_PKG_VERSION")))
      .build()
      .unwrap_or_else(|_| Client::new());
    Self { client }
  }
}

impl Default for HttpTransport {
  fn default() -> Self {
    Self::new()
  }
}

impl Transport for HttpTransport {
  async fn get(&self, url: &str) -> FetchResult<HttpResponse> {
    let response = self.client.get(url).send().await.map_err(|e| FetchError::Network(e.without_url().to_string()))?;
    let status = response.status().as_u16();
    let body = response.text().await.map_err(|e| FetchError::Network(e.without_url().to_string()))?;
    Ok(HttpResponse { status, body })
  }
}

// --- API response types ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
  #[serde(default = "Vec::new")]
  items: Vec<T>,
  next_page_token: Option<String>,
  error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
  error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
  #[serde(default)]
  message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistResource {
  snippet: PlaylistSnippet,
  #[serde(default)]
  content_details: PlaylistContentDetails,
}

#[derive(Debug, Deserialize)]
struct PlaylistSnippet {
  title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistContentDetails {
  #[serde(default)]
  item_count: u64,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemResource {
  snippet: ItemSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemSnippet {
  title: String,
  #[serde(default)]
  description: String,
  resource_id: ResourceId,
  #[serde(default)]
  thumbnails: Thumbnails,
  published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
  #[serde(default)]
  video_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
  medium: Option<Thumbnail>,
  default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
  url: String,
}

impl ItemSnippet {
  /// Normalize into a record, or None for deleted/private placeholders.
  fn into_record(self) -> Option<VideoRecord> {
    if constants().skipped_titles.iter().any(|t| *t == self.title) {
      return None;
    }
    let thumbnail_url = self
      .thumbnails
      .medium
      .or(self.thumbnails.default)
      .map(|t| t.url)
      .unwrap_or_else(|| constants().placeholder_thumbnail.clone());
    let published_at =
      self.published_at.as_deref().and_then(|s| DateTime::parse_from_rfc3339(s).ok()).map(|d| d.with_timezone(&Utc));
    Some(VideoRecord {
      id: self.resource_id.video_id,
      title: self.title,
      description: self.description,
      thumbnail_url,
      published_at,
    })
  }
}

/// Best-effort extraction of `{ error: { message } }` from an error body.
fn api_error_message(body: &str) -> Option<String> {
  serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error.message).filter(|m| !m.is_empty())
}

// --- Client ---

/// YouTube Data API v3 client for playlist reads.
pub struct PlaylistApi<T: Transport = HttpTransport> {
  transport: T,
  base_url: String,
  api_key: String,
}

impl PlaylistApi<HttpTransport> {
  pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
    Self::with_transport(HttpTransport::new(), base_url, api_key)
  }
}

impl<T: Transport> PlaylistApi<T> {
  pub fn with_transport(transport: T, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
    Self { transport, base_url: base_url.into().trim_end_matches('/').to_string(), api_key: api_key.into() }
  }

  fn endpoint(&self, resource: &str, params: &[(&str, &str)]) -> FetchResult<String> {
    let base = format!("{}/{}", self.base_url, resource);
    let url = Url::parse_with_params(&base, params.iter().copied().chain([("key", self.api_key.as_str())]))
      .map_err(|e| FetchError::Api(format!("Bad API base URL {}: {}", self.base_url, e)))?;
    Ok(url.into())
  }

  /// GET and decode JSON, retrying transient failures with linear backoff.
  ///
  /// HTTP 403 is treated as quota exhaustion and returned without retrying.
  pub async fn fetch_json<R: DeserializeOwned>(&self, url: &str) -> FetchResult<R> {
    let max_attempts = constants().max_attempts.max(1);
    let mut attempt = 1;
    loop {
      let failure = match self.transport.get(url).await {
        Ok(resp) if (200..300).contains(&resp.status) => {
          return serde_json::from_str(&resp.body).map_err(|e| FetchError::Decode(e.to_string()));
        }
        Ok(resp) if resp.status == 403 => {
          warn!(status = resp.status, "api: quota exceeded");
          return Err(FetchError::QuotaExceeded);
        }
        Ok(resp) => FetchError::Network(match api_error_message(&resp.body) {
          Some(msg) => format!("HTTP {}: {}", resp.status, msg),
          None => format!("HTTP {}", resp.status),
        }),
        Err(e) => e,
      };

      if attempt >= max_attempts {
        warn!(attempt, err = %failure, "api: giving up");
        return Err(failure);
      }
      let delay = constants().retry_delay(attempt);
      warn!(attempt, delay_ms = delay.as_millis() as u64, err = %failure, "api: request failed, retrying");
      tokio::time::sleep(delay).await;
      attempt += 1;
    }
  }

  pub async fn get_playlist_metadata(&self, playlist_id: &str) -> FetchResult<PlaylistMetadata> {
    self.fetch_metadata(playlist_id).await.map_err(|e| e.context("Failed to get playlist info"))
  }

  async fn fetch_metadata(&self, playlist_id: &str) -> FetchResult<PlaylistMetadata> {
    let url = self.endpoint("playlists", &[("part", "snippet,contentDetails"), ("id", playlist_id)])?;
    let data: ListResponse<PlaylistResource> = self.fetch_json(&url).await?;
    if let Some(err) = data.error {
      return Err(FetchError::Api(err.message));
    }
    let first = data.items.into_iter().next().ok_or(FetchError::NotFound)?;
    debug!(playlist_id, title = %first.snippet.title, "api: playlist metadata");
    Ok(PlaylistMetadata { title: first.snippet.title, total_video_count: first.content_details.item_count })
  }

  /// Walk every page of `playlistItems`, reporting progress after each page.
  ///
  /// Fails with `EmptyPage` when the very first page is empty; an empty page after that
  /// ends pagination. Any error aborts the walk and no partial list is returned.
  pub async fn fetch_all_playlist_videos(
    &self,
    playlist_id: &str,
    total_expected: u64,
    mut on_progress: impl FnMut(FetchProgress) + Send,
  ) -> FetchResult<Vec<VideoRecord>> {
    let page_size = constants().page_size.to_string();
    let mut videos: Vec<VideoRecord> = Vec::new();
    let mut page_token = String::new();
    let mut page = 1usize;

    loop {
      let url = self.endpoint(
        "playlistItems",
        &[("part", "snippet"), ("maxResults", &page_size), ("playlistId", playlist_id), ("pageToken", &page_token)],
      )?;
      let data: ListResponse<PlaylistItemResource> =
        self.fetch_json(&url).await.map_err(|e| e.context(format!("Failed to fetch page {}", page)))?;

      if let Some(err) = data.error {
        let msg = if err.message.is_empty() { "Failed to fetch playlist items".to_string() } else { err.message };
        return Err(FetchError::Api(msg).context(format!("Failed to fetch page {}", page)));
      }

      if data.items.is_empty() {
        if videos.is_empty() {
          return Err(FetchError::EmptyPage);
        }
        debug!(playlist_id, page, "api: empty page, stopping");
        break;
      }

      videos.extend(data.items.into_iter().filter_map(|item| item.snippet.into_record()));
      on_progress(FetchProgress { fetched: videos.len(), total: total_expected });
      debug!(playlist_id, page, fetched = videos.len(), "api: page fetched");

      match data.next_page_token.filter(|t| !t.is_empty()) {
        Some(token) => {
          page_token = token;
          page += 1;
          tokio::time::sleep(constants().page_delay()).await;
        }
        None => break,
      }
    }

    Ok(videos)
  }

  /// Metadata followed by every page of items.
  pub async fn load_playlist(
    &self,
    playlist_id: &str,
    mut on_event: impl FnMut(LoadEvent) + Send,
  ) -> FetchResult<(PlaylistMetadata, Vec<VideoRecord>)> {
    let metadata = self.get_playlist_metadata(playlist_id).await?;
    info!(playlist_id, title = %metadata.title, total = metadata.total_video_count, "loading playlist");
    on_event(LoadEvent::Metadata(metadata.clone()));
    let videos = self
      .fetch_all_playlist_videos(playlist_id, metadata.total_video_count, |p| on_event(LoadEvent::Progress(p)))
      .await?;
    info!(playlist_id, videos = videos.len(), "playlist loaded");
    Ok((metadata, videos))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::{Value, json};
  use std::collections::VecDeque;
  use std::sync::Mutex;
  use std::time::Duration;

  /// Replays canned responses in order and records every requested URL.
  #[derive(Default)]
  struct ScriptedTransport {
    responses: Mutex<VecDeque<FetchResult<HttpResponse>>>,
    requests: Mutex<Vec<String>>,
  }

  impl ScriptedTransport {
    fn new(responses: Vec<FetchResult<HttpResponse>>) -> Self {
      Self { responses: Mutex::new(responses.into()), requests: Mutex::default() }
    }

    fn requests(&self) -> Vec<String> {
      self.requests.lock().unwrap().clone()
    }
  }

  impl Transport for ScriptedTransport {
    async fn get(&self, url: &str) -> FetchResult<HttpResponse> {
      self.requests.lock().unwrap().push(url.to_string());
      self.responses.lock().unwrap().pop_front().unwrap_or_else(|| Err(FetchError::Network("script exhausted".into())))
    }
  }

  fn ok(body: Value) -> FetchResult<HttpResponse> {
    Ok(HttpResponse { status: 200, body: body.to_string() })
  }

  fn status(code: u16) -> FetchResult<HttpResponse> {
    Ok(HttpResponse { status: code, body: json!({ "error": { "message": "boom" } }).to_string() })
  }

  fn item(id: &str, title: &str) -> Value {
    json!({
      "snippet": {
        "title": title,
        "description": format!("about {}", id),
        "resourceId": { "videoId": id },
        "thumbnails": { "default": { "url": format!("https://i.ytimg.com/vi/{}/default.jpg", id) } },
        "publishedAt": "2024-03-01T12:00:00Z"
      }
    })
  }

  fn page(range: std::ops::Range<usize>, next: Option<&str>) -> Value {
    let items: Vec<Value> = range.map(|i| item(&format!("v{}", i), &format!("Video {}", i))).collect();
    match next {
      Some(token) => json!({ "items": items, "nextPageToken": token }),
      None => json!({ "items": items }),
    }
  }

  fn api(transport: ScriptedTransport) -> PlaylistApi<ScriptedTransport> {
    PlaylistApi::with_transport(transport, "https://api.test/youtube/v3/", "KEY")
  }

  // --- extract_playlist_id ---

  #[test]
  fn extract_from_playlist_url() {
    assert_eq!(extract_playlist_id("https://youtube.com/playlist?list=ABC123"), Some("ABC123".to_string()));
  }

  #[test]
  fn extract_from_watch_url_with_list() {
    assert_eq!(
      extract_playlist_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PLxyz&index=3"),
      Some("PLxyz".to_string())
    );
  }

  #[test]
  fn extract_rejects_non_url() {
    assert_eq!(extract_playlist_id("not a url"), None);
    assert_eq!(extract_playlist_id(""), None);
  }

  #[test]
  fn extract_missing_or_empty_list() {
    assert_eq!(extract_playlist_id("https://youtube.com/watch?v=abc"), None);
    assert_eq!(extract_playlist_id("https://youtube.com/playlist?list="), None);
  }

  // --- record normalization ---

  #[test]
  fn placeholder_titles_are_skipped() {
    let snippet: ItemSnippet = serde_json::from_value(item("x", "Deleted video")["snippet"].clone()).unwrap();
    assert!(snippet.into_record().is_none());
    let snippet: ItemSnippet = serde_json::from_value(item("x", "Private video")["snippet"].clone()).unwrap();
    assert!(snippet.into_record().is_none());
  }

  #[test]
  fn thumbnail_prefers_medium_then_placeholder() {
    let snippet: ItemSnippet = serde_json::from_value(json!({
      "title": "t",
      "resourceId": { "videoId": "id1" },
      "thumbnails": { "medium": { "url": "m.jpg" }, "default": { "url": "d.jpg" } }
    }))
    .unwrap();
    let record = snippet.into_record().unwrap();
    assert_eq!(record.thumbnail_url, "m.jpg");
    assert_eq!(record.description, "");
    assert_eq!(record.published_at, None);

    let snippet: ItemSnippet =
      serde_json::from_value(json!({ "title": "t", "resourceId": { "videoId": "id2" } })).unwrap();
    assert_eq!(snippet.into_record().unwrap().thumbnail_url, "default-thumbnail.jpg");
  }

  #[test]
  fn record_watch_url_and_date() {
    let snippet: ItemSnippet = serde_json::from_value(item("abc", "A")["snippet"].clone()).unwrap();
    let record = snippet.into_record().unwrap();
    assert_eq!(record.watch_url(), "https://www.youtube.com/watch?v=abc");
    assert_eq!(record.published_date().as_deref(), Some("2024-03-01"));
  }

  // --- fetch_json ---

  #[tokio::test(start_paused = true)]
  async fn quota_error_is_not_retried() {
    let api = api(ScriptedTransport::new(vec![status(403), ok(json!({}))]));
    let err = api.fetch_json::<Value>("https://api.test/x").await.unwrap_err();
    assert!(matches!(err, FetchError::QuotaExceeded));
    assert_eq!(api.transport.requests().len(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn third_attempt_succeeds_after_linear_backoff() {
    let api = api(ScriptedTransport::new(vec![
      Err(FetchError::Network("connection reset".into())),
      status(500),
      ok(json!({ "items": [] })),
    ]));
    let started = tokio::time::Instant::now();
    let value: Value = api.fetch_json("https://api.test/x").await.unwrap();
    assert_eq!(value, json!({ "items": [] }));
    assert!(started.elapsed() >= Duration::from_millis(3000));
    assert_eq!(api.transport.requests().len(), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn exhausted_retries_surface_last_failure() {
    let api = api(ScriptedTransport::new(vec![status(500), status(502), status(503)]));
    let err = api.fetch_json::<Value>("https://api.test/x").await.unwrap_err();
    match err {
      FetchError::Network(msg) => assert_eq!(msg, "HTTP 503: boom"),
      other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(api.transport.requests().len(), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn exhausted_transport_failures_keep_single_prefix() {
    let reset = || Err(FetchError::Network("connection reset".into()));
    let api = api(ScriptedTransport::new(vec![reset(), reset(), reset()]));
    let err = api.get_playlist_metadata("PL1").await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to get playlist info: Network error: connection reset");
    assert_eq!(api.transport.requests().len(), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn undecodable_body_is_a_decode_error() {
    let api = api(ScriptedTransport::new(vec![Ok(HttpResponse { status: 200, body: "<html>".into() })]));
    let err = api.fetch_json::<Value>("https://api.test/x").await.unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)));
  }

  // --- get_playlist_metadata ---

  #[tokio::test(start_paused = true)]
  async fn metadata_reads_title_and_count() {
    let api = api(ScriptedTransport::new(vec![ok(json!({
      "items": [{ "snippet": { "title": "Mix" }, "contentDetails": { "itemCount": 120 } }]
    }))]));
    let meta = api.get_playlist_metadata("PL1").await.unwrap();
    assert_eq!(meta, PlaylistMetadata { title: "Mix".into(), total_video_count: 120 });

    let url = &api.transport.requests()[0];
    assert!(url.starts_with("https://api.test/youtube/v3/playlists?"));
    assert!(url.contains("part=snippet%2CcontentDetails"));
    assert!(url.contains("id=PL1"));
    assert!(url.contains("key=KEY"));
  }

  #[tokio::test(start_paused = true)]
  async fn metadata_without_items_is_not_found_with_context() {
    let api = api(ScriptedTransport::new(vec![ok(json!({ "items": [] }))]));
    let err = api.get_playlist_metadata("PL1").await.unwrap_err();
    assert!(matches!(err.root(), FetchError::NotFound));
    assert_eq!(err.to_string(), "Failed to get playlist info: Playlist not found or is private");
  }

  #[tokio::test(start_paused = true)]
  async fn metadata_wraps_quota_error() {
    let api = api(ScriptedTransport::new(vec![status(403)]));
    let err = api.get_playlist_metadata("PL1").await.unwrap_err();
    assert!(matches!(err.root(), FetchError::QuotaExceeded));
    assert!(err.to_string().starts_with("Failed to get playlist info"));
  }

  // --- fetch_all_playlist_videos ---

  #[tokio::test(start_paused = true)]
  async fn three_pages_are_chained_in_order() {
    let mut second = page(50..100, Some("T3"));
    second["items"][3] = item("gone", "Deleted video");
    second["items"][7] = item("hidden", "Private video");
    let api = api(ScriptedTransport::new(vec![ok(page(0..50, Some("T2"))), ok(second), ok(page(100..120, None))]));

    let mut progress = Vec::new();
    let videos = api.fetch_all_playlist_videos("PL1", 120, |p| progress.push(p)).await.unwrap();

    assert_eq!(videos.len(), 118);
    let expected: Vec<String> =
      (0..120).filter(|i| *i != 53 && *i != 57).map(|i| format!("v{}", i)).collect();
    let ids: Vec<String> = videos.iter().map(|v| v.id.clone()).collect();
    assert_eq!(ids, expected);

    let requests = api.transport.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].contains("pageToken=&") || requests[0].ends_with("pageToken="));
    assert!(requests[0].contains("maxResults=50"));
    assert!(requests[1].contains("pageToken=T2"));
    assert!(requests[2].contains("pageToken=T3"));

    let fetched: Vec<usize> = progress.iter().map(|p| p.fetched).collect();
    assert_eq!(fetched, vec![50, 98, 118]);
    assert!(progress.iter().all(|p| p.total == 120));
  }

  #[tokio::test(start_paused = true)]
  async fn pages_are_paced() {
    let api = api(ScriptedTransport::new(vec![ok(page(0..2, Some("T2"))), ok(page(2..4, None))]));
    let started = tokio::time::Instant::now();
    api.fetch_all_playlist_videos("PL1", 4, |_| {}).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(100));
  }

  #[tokio::test(start_paused = true)]
  async fn empty_first_page_is_an_error() {
    let api = api(ScriptedTransport::new(vec![ok(json!({ "items": [] }))]));
    let err = api.fetch_all_playlist_videos("PL1", 0, |_| {}).await.unwrap_err();
    assert!(matches!(err, FetchError::EmptyPage));
  }

  #[tokio::test(start_paused = true)]
  async fn empty_later_page_ends_pagination() {
    let api = api(ScriptedTransport::new(vec![
      ok(page(0..5, Some("T2"))),
      ok(json!({ "items": [], "nextPageToken": "T3" })),
    ]));
    let videos = api.fetch_all_playlist_videos("PL1", 5, |_| {}).await.unwrap();
    assert_eq!(videos.len(), 5);
    assert_eq!(api.transport.requests().len(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn quota_mid_pagination_aborts_without_partial_result() {
    let api = api(ScriptedTransport::new(vec![ok(page(0..50, Some("T2"))), status(403)]));
    let err = api.fetch_all_playlist_videos("PL1", 100, |_| {}).await.unwrap_err();
    assert!(matches!(err.root(), FetchError::QuotaExceeded));
    assert_eq!(api.transport.requests().len(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn api_error_body_is_surfaced() {
    let api = api(ScriptedTransport::new(vec![ok(json!({ "error": { "message": "playlistId invalid" } }))]));
    let err = api.fetch_all_playlist_videos("PL1", 0, |_| {}).await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to fetch page 1: playlistId invalid");
    assert!(matches!(err.root(), FetchError::Api(msg) if msg == "playlistId invalid"));
  }

  // --- load_playlist ---

  #[tokio::test(start_paused = true)]
  async fn load_reports_metadata_before_progress() {
    let api = api(ScriptedTransport::new(vec![
      ok(json!({ "items": [{ "snippet": { "title": "Mix" }, "contentDetails": { "itemCount": 3 } }] })),
      ok(page(0..3, None)),
    ]));
    let mut events = Vec::new();
    let (meta, videos) = api.load_playlist("PL1", |e| events.push(e)).await.unwrap();
    assert_eq!(meta.title, "Mix");
    assert_eq!(videos.len(), 3);
    assert_eq!(
      events,
      vec![
        LoadEvent::Metadata(PlaylistMetadata { title: "Mix".into(), total_video_count: 3 }),
        LoadEvent::Progress(FetchProgress { fetched: 3, total: 3 }),
      ]
    );
  }
}
