//! Error types for `refinery-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("Validation failed: history export has no 'queries'")]
  MissingQueries,

  #[error("Queries must have objectType and objectValue: {0}")]
  IncompleteQuery(String),

  #[error("unsupported history export version: {0:?}")]
  UnsupportedVersion(String),

  #[error("invalid end timestamp: {0:?}")]
  InvalidEndTimestamp(String),

  #[error("no failed search to retry")]
  NoFailedSearch,

  #[error("search failed: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
