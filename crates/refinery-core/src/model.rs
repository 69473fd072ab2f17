//! Objects, facts, and the search result that bundles them.
//!
//! Types mirror the platform wire format (camelCase JSON). Nothing here is
//! mutated after it has been fetched; refinement builds new maps instead of
//! editing objects or facts in place.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the fact type that invalidates another fact.
pub const RETRACTION_FACT_TYPE: &str = "Retraction";

// ─── References ──────────────────────────────────────────────────────────────

/// A typed reference. `id` is the stable identity, `name` the display label.
///
/// Equality only looks at `id`.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct NamedId {
  pub id:   String,
  #[serde(default)]
  pub name: String,
}

impl NamedId {
  pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      id:   id.into(),
      name: name.into(),
    }
  }
}

impl PartialEq for NamedId {
  fn eq(&self, other: &Self) -> bool { self.id == other.id }
}

// ─── Objects ─────────────────────────────────────────────────────────────────

/// Per-fact-type counters the platform attaches to an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStatistic {
  #[serde(rename = "type")]
  pub fact_type:            NamedId,
  #[serde(default)]
  pub count:                u64,
  pub last_added_timestamp: Option<DateTime<Utc>>,
  pub last_seen_timestamp:  Option<DateTime<Utc>>,
}

/// A typed entity, e.g. a threat actor or an IP address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActObject {
  pub id:          String,
  #[serde(rename = "type")]
  pub object_type: NamedId,
  pub value:       String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub statistics:  Vec<ObjectStatistic>,
}

/// The object reference embedded in a fact endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactObjectRef {
  pub id:          String,
  #[serde(rename = "type")]
  pub object_type: NamedId,
  #[serde(default)]
  pub value:       String,
}

impl From<&FactObjectRef> for ActObject {
  fn from(r: &FactObjectRef) -> Self {
    ActObject {
      id:          r.id.clone(),
      object_type: r.object_type.clone(),
      value:       r.value.clone(),
      statistics:  Vec::new(),
    }
  }
}

// ─── Facts ───────────────────────────────────────────────────────────────────

/// A typed relationship or attribute, binding zero, one, or two objects.
///
/// `retracted` and `retraction` are view annotations written by
/// [`crate::retraction::resolve`]; fetched data never carries them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActFact {
  pub id:                    String,
  #[serde(rename = "type")]
  pub fact_type:             NamedId,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub value:                 Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub in_reference_to:       Option<NamedId>,
  pub timestamp:             DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_seen_timestamp:   Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_object:         Option<FactObjectRef>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub destination_object:    Option<FactObjectRef>,
  #[serde(default)]
  pub bidirectional_binding: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub organization:          Option<NamedId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub origin:                Option<NamedId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub access_mode:           Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub flags:                 Vec<String>,
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub retracted:             bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub retraction:            Option<Box<ActFact>>,
}

impl ActFact {
  pub fn is_retraction(&self) -> bool {
    self.fact_type.name == RETRACTION_FACT_TYPE
  }

  /// The id of the fact this one points at through `inReferenceTo`.
  pub fn referenced_fact_id(&self) -> Option<&str> {
    self.in_reference_to.as_ref().map(|r| r.id.as_str())
  }

  /// Source and destination references, whichever are present.
  pub fn endpoints(&self) -> impl Iterator<Item = &FactObjectRef> {
    self
      .source_object
      .iter()
      .chain(self.destination_object.iter())
  }

  /// Bound to exactly one object.
  pub fn is_one_legged(&self) -> bool {
    self.source_object.is_some() != self.destination_object.is_some()
  }

  /// Values starting with `-` are placeholders that renderers must not show.
  pub fn has_hidden_value(&self) -> bool {
    self.value.as_deref().is_some_and(|v| v.starts_with('-'))
  }
}

// ─── SearchResult ────────────────────────────────────────────────────────────

/// Facts and objects returned by one executed search, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
  pub facts:   BTreeMap<String, ActFact>,
  pub objects: BTreeMap<String, ActObject>,
}

impl SearchResult {
  pub fn new(
    facts: impl IntoIterator<Item = ActFact>,
    objects: impl IntoIterator<Item = ActObject>,
  ) -> Self {
    Self {
      facts:   facts.into_iter().map(|f| (f.id.clone(), f)).collect(),
      objects: objects.into_iter().map(|o| (o.id.clone(), o)).collect(),
    }
  }

  /// Build a result from facts alone, deriving objects from fact endpoints.
  pub fn from_facts(facts: impl IntoIterator<Item = ActFact>) -> Self {
    let mut result = Self::default();
    for fact in facts {
      for endpoint in fact.endpoints() {
        result
          .objects
          .entry(endpoint.id.clone())
          .or_insert_with(|| ActObject::from(endpoint));
      }
      result.facts.insert(fact.id.clone(), fact);
    }
    result
  }

  pub fn is_empty(&self) -> bool {
    self.facts.is_empty() && self.objects.is_empty()
  }

  /// Fold `other` into `self`. Colliding ids take `other`'s version.
  pub fn merge(&mut self, other: &SearchResult) {
    self
      .facts
      .extend(other.facts.iter().map(|(k, v)| (k.clone(), v.clone())));
    self
      .objects
      .extend(other.objects.iter().map(|(k, v)| (k.clone(), v.clone())));
  }

  /// Type id of an endpoint, preferring the object map over the reference.
  pub fn endpoint_type_id<'a>(&'a self, endpoint: &'a FactObjectRef) -> &'a str {
    self
      .objects
      .get(&endpoint.id)
      .map(|o| o.object_type.id.as_str())
      .unwrap_or(endpoint.object_type.id.as_str())
  }
}

// ─── Test fixtures ───────────────────────────────────────────────────────────


#[cfg(test)]
mod tests {
  use super::{fixtures::*, *};

  #[test]
  fn named_id_equality_ignores_name() {
    assert_eq!(NamedId::new("t1", "threatActor"), NamedId::new("t1", "renamed"));
    assert_ne!(NamedId::new("t1", "x"), NamedId::new("t2", "x"));
  }

  #[test]
  fn merge_is_last_write_wins() {
    let o1 = object("o1", "threatActor", "Axiom");
    let mut a = fact("f1", "alias", Some(&o1), Some(&o1), 10);
    a.value = Some("old".into());
    let mut b = a.clone();
    b.value = Some("new".into());

    let mut merged = SearchResult::new([a], [o1.clone()]);
    merged.merge(&SearchResult::new([b], []));

    assert_eq!(merged.facts["f1"].value.as_deref(), Some("new"));
    assert_eq!(merged.objects.len(), 1);
  }

  #[test]
  fn from_facts_derives_endpoint_objects() {
    let o1 = object("o1", "threatActor", "Axiom");
    let o2 = object("o2", "tool", "PlugX");
    let result = SearchResult::from_facts([fact("f1", "uses", Some(&o1), Some(&o2), 0)]);
    assert_eq!(result.objects.len(), 2);
    assert_eq!(result.objects["o2"].value, "PlugX");
  }

  #[test]
  fn endpoint_type_falls_back_to_reference() {
    let o1 = object("o1", "threatActor", "Axiom");
    let result = SearchResult::default();
    assert_eq!(result.endpoint_type_id(&endpoint(&o1)), "threatActor");
  }

  #[test]
  fn hidden_value_sentinel() {
    let mut f = fact("f1", "name", None, None, 0);
    assert!(!f.has_hidden_value());
    f.value = Some("-".into());
    assert!(f.has_hidden_value());
  }

  #[test]
  fn platform_fact_json_deserialises() {
    let json = serde_json::json!({
      "id": "f1",
      "type": { "id": "t-alias", "name": "alias" },
      "value": "Axiom2",
      "timestamp": "2017-10-09T13:07:24.000Z",
      "sourceObject": {
        "id": "o1",
        "type": { "id": "t-ta", "name": "threatActor" },
        "value": "Axiom"
      },
      "bidirectionalBinding": true,
      "flags": ["RetractedHint"]
    });
    let f: ActFact = serde_json::from_value(json).unwrap();
    assert_eq!(f.fact_type.name, "alias");
    assert!(f.bidirectional_binding);
    assert!(f.is_one_legged());
    assert!(!f.retracted);
    assert!(f.retraction.is_none());
  }
}
