//! Error type for the platform client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
  #[error("invalid base URL {0:?}")]
  InvalidBaseUrl(String),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("platform returned {status}: {}", .messages.join("; "))]
  Status { status: u16, messages: Vec<String> },
}
