//! Object type toggles.
//!
//! The list only grows: a type stays listed, with whatever state the user
//! gave it, even once no result contains it anymore.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::SearchResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectTypeFilter {
  pub id:      String,
  pub name:    String,
  /// Checked types are shown.
  pub checked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectTypeFilters {
  entries: Vec<ObjectTypeFilter>,
}

impl ObjectTypeFilters {
  pub fn entries(&self) -> &[ObjectTypeFilter] { &self.entries }

  pub fn get(&self, id: &str) -> Option<&ObjectTypeFilter> {
    self.entries.iter().find(|f| f.id == id)
  }

  /// Append every object type in `result` that is not listed yet, checked.
  /// Returns how many were added.
  pub fn observe(&mut self, result: &SearchResult) -> usize {
    let before = self.entries.len();
    for object in result.objects.values() {
      let t = &object.object_type;
      if self.get(&t.id).is_none() {
        self.entries.push(ObjectTypeFilter {
          id:      t.id.clone(),
          name:    t.name.clone(),
          checked: true,
        });
      }
    }
    self.entries.len() - before
  }

  /// Returns `true` if the state changed.
  pub fn set_checked(&mut self, id: &str, checked: bool) -> bool {
    match self.entries.iter_mut().find(|f| f.id == id) {
      Some(f) if f.checked != checked => {
        f.checked = checked;
        true
      }
      _ => false,
    }
  }

  /// Flip a type. Returns the new state, or `None` for an unknown id.
  pub fn toggle(&mut self, id: &str) -> Option<bool> {
    let f = self.entries.iter_mut().find(|f| f.id == id)?;
    f.checked = !f.checked;
    Some(f.checked)
  }

  /// Ids to hand to the refinement pipeline.
  pub fn excluded_ids(&self) -> BTreeSet<String> {
    self
      .entries
      .iter()
      .filter(|f| !f.checked)
      .map(|f| f.id.clone())
      .collect()
  }

  /// Resolve a type by id or by name.
  pub fn find(&self, id_or_name: &str) -> Option<&ObjectTypeFilter> {
    self
      .get(id_or_name)
      .or_else(|| self.entries.iter().find(|f| f.name == id_or_name))
  }

  pub fn clear(&mut self) { self.entries.clear(); }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::fixtures::*;

  fn result(objects: Vec<crate::model::ActObject>) -> SearchResult {
    SearchResult::new([], objects)
  }

  #[test]
  fn observe_appends_new_types_checked() {
    let mut filters = ObjectTypeFilters::default();
    let added = filters.observe(&result(vec![
      object("o1", "threatActor", "Axiom"),
      object("o2", "tool", "PlugX"),
      object("o3", "tool", "Winnti"),
    ]));
    assert_eq!(added, 2);
    assert!(filters.entries().iter().all(|f| f.checked));
  }

  #[test]
  fn types_are_sticky() {
    let mut filters = ObjectTypeFilters::default();
    filters.observe(&result(vec![object("o1", "tool", "PlugX")]));
    filters.set_checked("tool", false);

    assert_eq!(filters.observe(&result(vec![object("o2", "ipv4", "10.0.0.1")])), 1);
    assert_eq!(filters.observe(&result(vec![object("o3", "tool", "Winnti")])), 0);
    assert_eq!(filters.entries().len(), 2);
    assert!(!filters.get("tool").unwrap().checked);
  }

  #[test]
  fn excluded_ids_are_the_unchecked() {
    let mut filters = ObjectTypeFilters::default();
    filters.observe(&result(vec![
      object("o1", "threatActor", "Axiom"),
      object("o2", "tool", "PlugX"),
    ]));
    assert!(filters.excluded_ids().is_empty());
    assert_eq!(filters.toggle("tool"), Some(false));
    assert_eq!(filters.excluded_ids(), BTreeSet::from(["tool".to_string()]));
    assert_eq!(filters.toggle("missing"), None);
  }

  #[test]
  fn set_checked_reports_changes() {
    let mut filters = ObjectTypeFilters::default();
    filters.observe(&result(vec![object("o1", "tool", "PlugX")]));
    assert!(!filters.set_checked("tool", true));
    assert!(filters.set_checked("tool", false));
    assert!(!filters.set_checked("nope", false));
  }
}
