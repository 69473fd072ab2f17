//! Search descriptors and their content-addressed identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex characters kept from the SHA-256 digest.
const SEARCH_ID_LEN: usize = 16;

/// Search anchored on one object, optionally narrowed by a graph query or a
/// set of fact types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSearch {
  pub object_type:  String,
  pub object_value: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub query:        Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub fact_types:   Vec<String>,
}

/// Search for a single fact by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactSearch {
  pub fact_type_name: String,
  pub id:             String,
}

/// A query descriptor. Same parameters always produce the same
/// [`Search::id`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Search {
  Object(ObjectSearch),
  Fact(FactSearch),
}

impl Search {
  pub fn object(object_type: impl Into<String>, object_value: impl Into<String>) -> Self {
    Self::Object(ObjectSearch {
      object_type:  object_type.into(),
      object_value: object_value.into(),
      query:        None,
      fact_types:   Vec::new(),
    })
  }

  pub fn fact(fact_type_name: impl Into<String>, id: impl Into<String>) -> Self {
    Self::Fact(FactSearch {
      fact_type_name: fact_type_name.into(),
      id:             id.into(),
    })
  }

  /// Stable identifier derived from the descriptor's content.
  ///
  /// An absent query and an empty one hash the same, as do absent and empty
  /// fact type lists.
  pub fn id(&self) -> String {
    let mut hasher = Sha256::new();
    match self {
      Self::Object(s) => {
        hasher.update(b"object");
        for part in [
          s.object_type.as_str(),
          s.object_value.as_str(),
          s.query.as_deref().map(str::trim).unwrap_or_default(),
        ] {
          hasher.update([0x1f]);
          hasher.update(part.as_bytes());
        }
        for fact_type in &s.fact_types {
          hasher.update([0x1e]);
          hasher.update(fact_type.as_bytes());
        }
      }
      Self::Fact(s) => {
        hasher.update(b"fact");
        hasher.update([0x1f]);
        hasher.update(s.fact_type_name.as_bytes());
        hasher.update([0x1f]);
        hasher.update(s.id.as_bytes());
      }
    }
    let mut id = hex::encode(hasher.finalize());
    id.truncate(SEARCH_ID_LEN);
    id
  }
}

impl fmt::Display for Search {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Object(s) => {
        write!(f, "{}/{}", s.object_type, s.object_value)?;
        if let Some(q) = s.query.as_deref().filter(|q| !q.trim().is_empty()) {
          write!(f, " {q}")?;
        }
        if !s.fact_types.is_empty() {
          write!(f, " [{}]", s.fact_types.join(", "))?;
        }
        Ok(())
      }
      Self::Fact(s) => write!(f, "{} fact {}", s.fact_type_name, s.id),
    }
  }
}
