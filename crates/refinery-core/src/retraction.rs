//! Display semantics for retraction facts.
//!
//! A retraction is itself a fact, of type `Retraction`, whose `inReferenceTo`
//! names the fact it invalidates. Retractions are never shown. Their targets
//! are hidden, or kept and annotated when retracted facts are requested.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::model::ActFact;

/// Resolve retractions in `facts`.
///
/// When several retractions point at the same fact, the first one in id
/// order is attached. A retraction whose target is not in `facts` has no
/// effect and is dropped like any other retraction.
pub fn resolve(
  facts: &BTreeMap<String, ActFact>,
  show_retractions: bool,
) -> BTreeMap<String, ActFact> {
  let (retractions, others): (Vec<&ActFact>, Vec<&ActFact>) =
    facts.values().partition(|f| f.is_retraction());

  if retractions.is_empty() {
    return facts.clone();
  }

  // target id -> first retraction found for it
  let mut retraction_for: BTreeMap<&str, &ActFact> = BTreeMap::new();
  for &r in &retractions {
    if let Some(target) = r.referenced_fact_id() {
      retraction_for.entry(target).or_insert(r);
    }
  }

  let retracted: Vec<ActFact> = others
    .iter()
    .filter_map(|f| {
      retraction_for.get(f.id.as_str()).map(|r| ActFact {
        retracted: true,
        retraction: Some(Box::new((*r).clone())),
        ..(*f).clone()
      })
    })
    .collect();

  let excluded: BTreeSet<&str> = retractions
    .iter()
    .map(|r| r.id.as_str())
    .chain(retracted.iter().map(|f| f.id.as_str()))
    .collect();

  debug!(
    retractions = retractions.len(),
    retracted = retracted.len(),
    show_retractions,
    "resolved retractions"
  );

  let mut out: BTreeMap<String, ActFact> = others
    .iter()
    .filter(|f| !excluded.contains(f.id.as_str()))
    .map(|f| (f.id.clone(), (*f).clone()))
    .collect();

  if show_retractions {
    out.extend(retracted.into_iter().map(|f| (f.id.clone(), f)));
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{SearchResult, fixtures::*};

  fn facts(list: Vec<ActFact>) -> BTreeMap<String, ActFact> {
    SearchResult::new(list, []).facts
  }

  #[test]
  fn no_retractions_is_identity() {
    let o = object("o1", "threatActor", "Axiom");
    let input = facts(vec![fact("f1", "alias", Some(&o), Some(&o), 0)]);
    assert_eq!(resolve(&input, false), input);
    assert_eq!(resolve(&input, true), input);
  }

  #[test]
  fn retracted_fact_hidden_by_default() {
    let o = object("o1", "threatActor", "Axiom");
    let f1 = fact("f1", "alias", Some(&o), Some(&o), 0);
    let r = retraction("r1", &f1, 10);
    let out = resolve(&facts(vec![f1, r]), false);
    assert!(out.is_empty());
  }

  #[test]
  fn retracted_fact_annotated_when_shown() {
    let o = object("o1", "threatActor", "Axiom");
    let f1 = fact("f1", "alias", Some(&o), Some(&o), 0);
    let f2 = fact("f2", "alias", Some(&o), Some(&o), 0);
    let r = retraction("r1", &f1, 10);
    let out = resolve(&facts(vec![f1, f2, r]), true);

    assert_eq!(out.len(), 2);
    assert!(!out.contains_key("r1"));
    assert!(out["f1"].retracted);
    assert_eq!(out["f1"].retraction.as_ref().map(|r| r.id.as_str()), Some("r1"));
    assert!(!out["f2"].retracted);
  }

  #[test]
  fn dangling_retraction_is_dropped() {
    let o = object("o1", "threatActor", "Axiom");
    let f1 = fact("f1", "alias", Some(&o), Some(&o), 0);
    let gone = fact("gone", "alias", None, None, 0);
    let r = retraction("r1", &gone, 10);
    let out = resolve(&facts(vec![f1, r]), true);
    assert_eq!(out.keys().collect::<Vec<_>>(), ["f1"]);
  }

  #[test]
  fn retraction_without_reference_matches_nothing() {
    let o = object("o1", "threatActor", "Axiom");
    let f1 = fact("f1", "alias", Some(&o), Some(&o), 0);
    let mut r = retraction("r1", &f1, 10);
    r.in_reference_to = None;
    let out = resolve(&facts(vec![f1, r]), false);
    assert_eq!(out.keys().collect::<Vec<_>>(), ["f1"]);
  }

  #[test]
  fn first_retraction_wins_on_ties() {
    let f1 = fact("f1", "alias", None, None, 0);
    let r_b = retraction("r-b", &f1, 10);
    let r_a = retraction("r-a", &f1, 20);
    let out = resolve(&facts(vec![f1, r_b, r_a]), true);
    assert_eq!(out["f1"].retraction.as_ref().map(|r| r.id.as_str()), Some("r-a"));
  }

  #[test]
  fn retraction_of_a_retraction_is_not_marked() {
    let f1 = fact("f1", "alias", None, None, 0);
    let r1 = retraction("r1", &f1, 10);
    let r2 = retraction("r2", &r1, 20);
    let out = resolve(&facts(vec![f1, r1, r2]), true);
    assert!(out.values().all(|f| !f.is_retraction()));
    assert!(out["f1"].retracted);
  }
}
