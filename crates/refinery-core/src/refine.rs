//! The refinement pipeline: merged result in, displayed result out.
//!
//! Three steps, always in this order:
//!
//! 1. Exclusion. Facts touching an excluded-type or pruned object on either
//!    end are dropped, then those objects themselves. Endpoints are
//!    classified against the unfiltered object map.
//! 2. Time cutoff, only when one is set. Facts not strictly before the
//!    cutoff are dropped and the object map is narrowed to the endpoints of
//!    the surviving facts.
//! 3. Retraction resolution over the remaining facts. Objects pass through.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
  model::{ActFact, ActObject, SearchResult},
  retraction,
  timestamp::EndTimestamp,
};

/// Filter configuration for [`refine`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefineOptions {
  pub excluded_type_ids: BTreeSet<String>,
  pub pruned_object_ids: BTreeSet<String>,
  pub end_timestamp:     EndTimestamp,
  pub show_retractions:  bool,
}

/// Compute the displayed subset of `result`. `now` anchors relative cutoffs.
pub fn refine(result: &SearchResult, options: &RefineOptions, now: DateTime<Utc>) -> SearchResult {
  let (mut facts, mut objects) = exclude(result, options);

  if let Some(cutoff) = options.end_timestamp.resolve(now) {
    facts.retain(|_, f| f.timestamp < cutoff);
    objects = referenced_objects(&facts, &objects);
  }

  let facts = retraction::resolve(&facts, options.show_retractions);

  debug!(
    facts_in = result.facts.len(),
    objects_in = result.objects.len(),
    facts_out = facts.len(),
    objects_out = objects.len(),
    "refined result"
  );

  SearchResult { facts, objects }
}

fn exclude(
  result: &SearchResult,
  options: &RefineOptions,
) -> (BTreeMap<String, ActFact>, BTreeMap<String, ActObject>) {
  let types = &options.excluded_type_ids;
  let pruned = &options.pruned_object_ids;

  if types.is_empty() && pruned.is_empty() {
    return (result.facts.clone(), result.objects.clone());
  }

  let facts = result
    .facts
    .iter()
    .filter(|(_, f)| {
      !f.endpoints()
        .any(|e| pruned.contains(&e.id) || types.contains(result.endpoint_type_id(e)))
    })
    .map(|(id, f)| (id.clone(), f.clone()))
    .collect();

  let objects = result
    .objects
    .iter()
    .filter(|(id, o)| !pruned.contains(*id) && !types.contains(&o.object_type.id))
    .map(|(id, o)| (id.clone(), o.clone()))
    .collect();

  (facts, objects)
}

/// Objects from `objects` that some fact in `facts` binds.
fn referenced_objects(
  facts: &BTreeMap<String, ActFact>,
  objects: &BTreeMap<String, ActObject>,
) -> BTreeMap<String, ActObject> {
  facts
    .values()
    .flat_map(ActFact::endpoints)
    .filter_map(|e| objects.get_key_value(&e.id))
    .map(|(id, o)| (id.clone(), o.clone()))
    .collect()
}
