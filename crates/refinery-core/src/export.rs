//! JSON snapshot of a session: the searches to replay and the pruned ids.
//!
//! Only object searches are written; fact searches are skipped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
  Error, Result,
  history::HistoryItem,
  search::{ObjectSearch, Search},
};

pub const EXPORT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateExport {
  pub version:           String,
  pub queries:           Vec<ObjectSearch>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub pruned_object_ids: Vec<String>,
}

/// Snapshot `items` in history order together with `pruned_object_ids`.
pub fn state_export<'a>(
  items: &[HistoryItem],
  pruned_object_ids: impl IntoIterator<Item = &'a str>,
) -> StateExport {
  StateExport {
    version:           EXPORT_VERSION.to_owned(),
    queries:           items
      .iter()
      .filter_map(|item| match &item.search {
        Search::Object(s) => Some(s.clone()),
        Search::Fact(_) => None,
      })
      .collect(),
    pruned_object_ids: pruned_object_ids.into_iter().map(str::to_owned).collect(),
  }
}

/// Parse and validate an exported snapshot.
pub fn parse_state_export(json: &str) -> Result<StateExport> {
  let value: Value = serde_json::from_str(json)?;

  if let Some(version) = value.get("version").and_then(Value::as_str)
    && version.split('.').next() != Some("1")
  {
    return Err(Error::UnsupportedVersion(version.to_owned()));
  }

  let queries = match value.get("queries").and_then(Value::as_array) {
    Some(q) if !q.is_empty() => q,
    _ => return Err(Error::MissingQueries),
  };

  let queries = queries
    .iter()
    .map(|q| {
      let has = |key: &str| q.get(key).and_then(Value::as_str).is_some();
      if !has("objectType") || !has("objectValue") {
        return Err(Error::IncompleteQuery(q.to_string()));
      }
      Ok(serde_json::from_value::<ObjectSearch>(q.clone())?)
    })
    .collect::<Result<Vec<_>>>()?;

  let pruned_object_ids = match value.get("prunedObjectIds") {
    None | Some(Value::Null) => Vec::new(),
    Some(ids) => serde_json::from_value(ids.clone())?,
  };

  Ok(StateExport {
    version: value
      .get("version")
      .and_then(Value::as_str)
      .unwrap_or(EXPORT_VERSION)
      .to_owned(),
    queries,
    pruned_object_ids,
  })
}
