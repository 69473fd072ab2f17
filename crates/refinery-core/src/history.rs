//! Ordered log of executed searches and the merged result they produce.
//!
//! New items land directly after the selected item rather than at the end,
//! so selecting an older search and running another one branches from that
//! point. Items past the selection stay in the list but drop out of the
//! merge until one of them is selected again.

use serde::{Deserialize, Serialize};

use crate::{model::SearchResult, search::Search};

/// One executed search and its raw result. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
  /// Always `search.id()`.
  pub id:     String,
  pub search: Search,
  pub result: SearchResult,
}

impl HistoryItem {
  pub fn new(search: Search, result: SearchResult) -> Self {
    Self {
      id: search.id(),
      search,
      result,
    }
  }
}

#[derive(Debug, Clone)]
pub struct HistoryLog {
  items:          Vec<HistoryItem>,
  selected_id:    Option<String>,
  /// Fold every item up to the selection instead of showing it alone.
  merge_previous: bool,
}

impl Default for HistoryLog {
  fn default() -> Self {
    Self {
      items:          Vec::new(),
      selected_id:    None,
      merge_previous: true,
    }
  }
}

impl HistoryLog {
  pub fn new() -> Self { Self::default() }

  pub fn items(&self) -> &[HistoryItem] { &self.items }

  pub fn len(&self) -> usize { self.items.len() }

  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  pub fn contains(&self, id: &str) -> bool {
    self.items.iter().any(|i| i.id == id)
  }

  pub fn selected_id(&self) -> Option<&str> { self.selected_id.as_deref() }

  pub fn selected(&self) -> Option<&HistoryItem> {
    let id = self.selected_id.as_deref()?;
    self.items.iter().find(|i| i.id == id)
  }

  pub fn merge_previous(&self) -> bool { self.merge_previous }

  pub fn set_merge_previous(&mut self, merge_previous: bool) {
    self.merge_previous = merge_previous;
  }

  fn selected_index(&self) -> Option<usize> {
    let id = self.selected_id.as_deref()?;
    self.items.iter().position(|i| i.id == id)
  }

  /// Insert `item` right after the selected item and select it.
  ///
  /// Appends when nothing is selected. Returns `false` without touching the
  /// log when an item with the same id is already present.
  pub fn add_item(&mut self, item: HistoryItem) -> bool {
    if self.contains(&item.id) {
      return false;
    }
    let at = self
      .selected_index()
      .map_or(self.items.len(), |i| i + 1);
    self.selected_id = Some(item.id.clone());
    self.items.insert(at, item);
    true
  }

  /// Remove the item with `id`. The selection is left as is; reassigning it
  /// is up to the caller.
  pub fn remove_item(&mut self, id: &str) -> Option<HistoryItem> {
    let at = self.items.iter().position(|i| i.id == id)?;
    Some(self.items.remove(at))
  }

  pub fn remove_all(&mut self) {
    self.items.clear();
    self.selected_id = None;
  }

  /// Select the item with `id`, or clear the selection with `None`.
  /// Returns `false` if `id` is not in the log.
  pub fn select(&mut self, id: Option<&str>) -> bool {
    match id {
      Some(id) if !self.contains(id) => false,
      _ => {
        self.selected_id = id.map(str::to_owned);
        true
      }
    }
  }

  /// The effective result for the current selection and merge mode.
  ///
  /// Without merging this is the selected item's result, or empty. With
  /// merging, every item from the start through the selection is folded
  /// left to right with later ids overwriting earlier ones; a missing
  /// selection folds the whole list.
  pub fn merged_result(&self) -> SearchResult {
    if !self.merge_previous {
      return self
        .selected()
        .map(|item| item.result.clone())
        .unwrap_or_default();
    }

    let end = self
      .selected_index()
      .map_or(self.items.len(), |i| i + 1);
    self.items[..end]
      .iter()
      .fold(SearchResult::default(), |mut acc, item| {
        acc.merge(&item.result);
        acc
      })
  }
}
