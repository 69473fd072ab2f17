//! The `SearchBackend` trait: where search results come from.
//!
//! Implemented by the platform client in `refinery-cli`. The session depends
//! on this abstraction only, so tests can drive it with an in-memory fake.

use std::future::Future;

use crate::{model::SearchResult, search::Search};

/// Executes searches against a fact store.
///
/// The returned future must be `Send` so sessions can live on a
/// multi-threaded runtime.
pub trait SearchBackend: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Run `search` and return everything it matched.
  fn execute<'a>(
    &'a self,
    search: &'a Search,
  ) -> impl Future<Output = Result<SearchResult, Self::Error>> + Send + 'a;
}
