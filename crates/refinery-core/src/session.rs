//! [`Session`] — the working state of one exploration session.
//!
//! Holds the search history and the refinement configuration, and derives
//! the merged and refined results from them on demand. Every mutation is a
//! single synchronous call; listeners registered with
//! [`Session::subscribe`] hear about each change right after it happens.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  backend::SearchBackend,
  export::{StateExport, parse_state_export, state_export},
  filters::ObjectTypeFilters,
  graph::{Graph, ProjectionOptions, project},
  history::{HistoryItem, HistoryLog},
  model::SearchResult,
  refine::{RefineOptions, refine},
  search::Search,
  timestamp::EndTimestamp,
};

/// What a mutation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
  /// Items were added or removed.
  History,
  /// The selected item or the merge mode changed.
  Selection,
  /// Object type toggles, end timestamp or retraction visibility changed.
  Filters,
  /// The pruned object set changed.
  Pruning,
}

/// The most recent search that did not complete.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchFailure {
  pub search:  Search,
  pub message: String,
}

type Listener = Box<dyn FnMut(SessionEvent) + Send>;

pub struct Session<B> {
  backend:          B,
  history:          HistoryLog,
  type_filters:     ObjectTypeFilters,
  pruned:           BTreeSet<String>,
  end_timestamp:    EndTimestamp,
  show_retractions: bool,
  last_error:       Option<SearchFailure>,
  listeners:        Vec<Listener>,
}

impl<B: SearchBackend> Session<B> {
  pub fn new(backend: B) -> Self {
    Self {
      backend,
      history: HistoryLog::new(),
      type_filters: ObjectTypeFilters::default(),
      pruned: BTreeSet::new(),
      end_timestamp: EndTimestamp::AnyTime,
      show_retractions: false,
      last_error: None,
      listeners: Vec::new(),
    }
  }

  // ── Accessors ─────────────────────────────────────────────────────────

  pub fn backend(&self) -> &B { &self.backend }

  pub fn history(&self) -> &HistoryLog { &self.history }

  pub fn object_type_filters(&self) -> &ObjectTypeFilters { &self.type_filters }

  pub fn pruned_object_ids(&self) -> &BTreeSet<String> { &self.pruned }

  pub fn end_timestamp(&self) -> EndTimestamp { self.end_timestamp }

  pub fn show_retractions(&self) -> bool { self.show_retractions }

  pub fn last_error(&self) -> Option<&SearchFailure> { self.last_error.as_ref() }

  /// Register a callback invoked after every effective mutation.
  pub fn subscribe(&mut self, listener: impl FnMut(SessionEvent) + Send + 'static) {
    self.listeners.push(Box::new(listener));
  }

  fn notify(&mut self, event: SessionEvent) {
    debug!(?event, "session changed");
    for listener in &mut self.listeners {
      listener(event);
    }
  }

  // ── Searching ─────────────────────────────────────────────────────────

  /// Run `search` on the backend and record the result. Returns the id of
  /// the history item now selected.
  ///
  /// A search already in the history is not added twice; its existing item
  /// is selected instead. On failure the search is kept for [`Self::retry`].
  pub async fn execute(&mut self, search: Search) -> Result<String> {
    info!(%search, "executing search");
    match self.backend.execute(&search).await {
      Ok(result) => {
        self.last_error = None;
        Ok(self.record(HistoryItem::new(search, result)))
      }
      Err(e) => {
        warn!(%search, error = %e, "search failed");
        self.last_error = Some(SearchFailure {
          search,
          message: e.to_string(),
        });
        Err(Error::Backend(Box::new(e)))
      }
    }
  }

  /// Re-run the search that failed last.
  pub async fn retry(&mut self) -> Result<String> {
    let search = self
      .last_error
      .as_ref()
      .map(|f| f.search.clone())
      .ok_or(Error::NoFailedSearch)?;
    self.execute(search).await
  }

  fn record(&mut self, item: HistoryItem) -> String {
    let id = item.id.clone();
    if self.history.contains(&id) {
      if self.history.selected_id() != Some(id.as_str()) {
        self.history.select(Some(&id));
        self.notify(SessionEvent::Selection);
      }
      return id;
    }
    self.add_item(item);
    id
  }

  // ── History ───────────────────────────────────────────────────────────

  /// Add an already-fetched item after the selection and select it. Returns
  /// `false` if an item with the same id exists.
  pub fn add_item(&mut self, item: HistoryItem) -> bool {
    if self.history.contains(&item.id) {
      return false;
    }
    let new_types = self.type_filters.observe(&item.result);
    self.history.add_item(item);
    self.notify(SessionEvent::History);
    if new_types > 0 {
      self.notify(SessionEvent::Filters);
    }
    true
  }

  /// Remove an item. If it was selected, the last remaining item becomes
  /// selected, or none.
  pub fn remove_item(&mut self, id: &str) -> bool {
    let was_selected = self.history.selected_id() == Some(id);
    if self.history.remove_item(id).is_none() {
      return false;
    }
    if was_selected {
      let last = self.history.items().last().map(|i| i.id.clone());
      self.history.select(last.as_deref());
    }
    self.notify(SessionEvent::History);
    true
  }

  pub fn remove_all(&mut self) {
    if self.history.is_empty() {
      return;
    }
    self.history.remove_all();
    self.notify(SessionEvent::History);
  }

  /// Select an item, or clear the selection with `None`.
  pub fn select_item(&mut self, id: Option<&str>) -> bool {
    if self.history.selected_id() == id {
      return true;
    }
    let ok = self.history.select(id);
    if ok {
      self.notify(SessionEvent::Selection);
    }
    ok
  }

  pub fn set_merge_previous(&mut self, merge_previous: bool) {
    if self.history.merge_previous() != merge_previous {
      self.history.set_merge_previous(merge_previous);
      self.notify(SessionEvent::Selection);
    }
  }

  // ── Filters ───────────────────────────────────────────────────────────

  pub fn set_object_type_filter(&mut self, type_id: &str, checked: bool) -> bool {
    let changed = self.type_filters.set_checked(type_id, checked);
    if changed {
      self.notify(SessionEvent::Filters);
    }
    changed
  }

  pub fn toggle_object_type(&mut self, type_id: &str) -> Option<bool> {
    let checked = self.type_filters.toggle(type_id)?;
    self.notify(SessionEvent::Filters);
    Some(checked)
  }

  pub fn set_end_timestamp(&mut self, end_timestamp: EndTimestamp) {
    if self.end_timestamp != end_timestamp {
      self.end_timestamp = end_timestamp;
      self.notify(SessionEvent::Filters);
    }
  }

  pub fn set_show_retractions(&mut self, show_retractions: bool) {
    if self.show_retractions != show_retractions {
      self.show_retractions = show_retractions;
      self.notify(SessionEvent::Filters);
    }
  }

  // ── Pruning ───────────────────────────────────────────────────────────

  pub fn prune_objects<I, S>(&mut self, ids: I)
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let before = self.pruned.len();
    self
      .pruned
      .extend(ids.into_iter().map(|id| id.as_ref().to_owned()));
    if self.pruned.len() != before {
      self.notify(SessionEvent::Pruning);
    }
  }

  pub fn unprune_objects<I, S>(&mut self, ids: I)
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let before = self.pruned.len();
    for id in ids {
      self.pruned.remove(id.as_ref());
    }
    if self.pruned.len() != before {
      self.notify(SessionEvent::Pruning);
    }
  }

  pub fn clear_pruned(&mut self) {
    if !self.pruned.is_empty() {
      self.pruned.clear();
      self.notify(SessionEvent::Pruning);
    }
  }

  // ── Derived views ─────────────────────────────────────────────────────

  pub fn merged_result(&self) -> SearchResult { self.history.merged_result() }

  pub fn refine_options(&self) -> RefineOptions {
    RefineOptions {
      excluded_type_ids: self.type_filters.excluded_ids(),
      pruned_object_ids: self.pruned.clone(),
      end_timestamp:     self.end_timestamp,
      show_retractions:  self.show_retractions,
    }
  }

  /// The result every view displays. `now` anchors relative cutoffs.
  pub fn refined(&self, now: DateTime<Utc>) -> SearchResult {
    refine(&self.merged_result(), &self.refine_options(), now)
  }

  pub fn graph(&self, now: DateTime<Utc>, options: ProjectionOptions) -> Graph {
    project(&self.refined(now), options)
  }

  // ── Import / export ───────────────────────────────────────────────────

  pub fn export_state(&self) -> StateExport {
    state_export(self.history.items(), self.pruned.iter().map(String::as_str))
  }

  /// Replace the history and pruned set with a replay of `json`.
  ///
  /// Every query is executed before anything is applied; a parse error or a
  /// failed search leaves the session untouched. Returns the number of
  /// items in the new history.
  pub async fn import_state(&mut self, json: &str) -> Result<usize> {
    let export = parse_state_export(json)?;

    let mut items = Vec::with_capacity(export.queries.len());
    for query in export.queries {
      let search = Search::Object(query);
      let result = self.backend.execute(&search).await.map_err(|e| {
        warn!(%search, error = %e, "import aborted");
        Error::Backend(Box::new(e))
      })?;
      items.push(HistoryItem::new(search, result));
    }

    let previous = self.history.clone();
    let mut new_types = 0;
    self.history.remove_all();
    for item in items {
      new_types += self.type_filters.observe(&item.result);
      self.history.add_item(item);
    }
    let history_changed = self.history.items() != previous.items()
      || self.history.selected_id() != previous.selected_id();

    let pruned: BTreeSet<String> = export.pruned_object_ids.into_iter().collect();
    let pruning_changed = pruned != self.pruned;
    self.pruned = pruned;

    info!(items = self.history.len(), pruned = self.pruned.len(), "imported session");
    if history_changed {
      self.notify(SessionEvent::History);
    }
    if new_types > 0 {
      self.notify(SessionEvent::Filters);
    }
    if pruning_changed {
      self.notify(SessionEvent::Pruning);
    }
    Ok(self.history.len())
  }

  /// Drop all state, including object type toggles. The merge mode is kept.
  pub fn reset(&mut self) {
    let history_changed = !self.history.is_empty();
    let filters_changed = !self.type_filters.entries().is_empty()
      || !self.end_timestamp.is_any_time()
      || self.show_retractions;
    let pruning_changed = !self.pruned.is_empty();

    self.history.remove_all();
    self.type_filters.clear();
    self.pruned.clear();
    self.end_timestamp = EndTimestamp::AnyTime;
    self.show_retractions = false;
    self.last_error = None;

    if history_changed {
      self.notify(SessionEvent::History);
    }
    if filters_changed {
      self.notify(SessionEvent::Filters);
    }
    if pruning_changed {
      self.notify(SessionEvent::Pruning);
    }
  }
}
