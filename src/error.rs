use thiserror::Error;

/// Everything that can go wrong between the input fields and the Data API.
#[derive(Error, Debug)]
pub enum FetchError {
  #[error("Please enter a valid YouTube playlist URL")]
  InvalidUrl,

  #[error("API quota exceeded. Please try again later.")]
  QuotaExceeded,

  #[error("Playlist not found or is private")]
  NotFound,

  #[error("No videos found in this playlist")]
  EmptyPage,

  #[error("Network error: {0}")]
  Network(String),

  #[error("{0}")]
  Validation(&'static str),

  #[error("{0}")]
  Api(String),

  #[error("Invalid response: {0}")]
  Decode(String),

  #[error("{context}: {source}")]
  Context {
    context: String,
    #[source]
    source: Box<FetchError>,
  },
}

impl FetchError {
  /// Wrap this error with a description of the calling layer.
  pub fn context(self, context: impl Into<String>) -> Self {
    FetchError::Context { context: context.into(), source: Box::new(self) }
  }

  /// The innermost error, seen through any number of context layers.
  pub fn root(&self) -> &FetchError {
    match self {
      FetchError::Context { source, .. } => source.root(),
      other => other,
    }
  }
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn context_prefixes_message() {
    let err = FetchError::NotFound.context("Failed to get playlist info");
    assert_eq!(err.to_string(), "Failed to get playlist info: Playlist not found or is private");
  }

  #[test]
  fn root_sees_through_nested_context() {
    let err = FetchError::QuotaExceeded.context("page 2").context("Failed to fetch playlist items");
    assert!(matches!(err.root(), FetchError::QuotaExceeded));
  }

  #[test]
  fn root_of_plain_error_is_itself() {
    assert!(matches!(FetchError::EmptyPage.root(), FetchError::EmptyPage));
  }
}
