//! Node/edge projection of a refined result for graph renderers.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::{ActFact, SearchResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionOptions {
  /// Draw every fact as its own node instead of only one-legged facts.
  pub facts_as_nodes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
  Object,
  Fact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
  pub id:        String,
  pub kind:      NodeKind,
  pub label:     String,
  pub type_name: String,
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub retracted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
  pub id:            String,
  pub source:        String,
  pub target:        String,
  pub label:         String,
  pub bidirectional: bool,
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub retracted:     bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
  pub nodes: Vec<Node>,
  pub edges: Vec<Edge>,
}

/// Project `result` into nodes and edges. Edges whose endpoint has no node
/// are dropped.
pub fn project(result: &SearchResult, options: ProjectionOptions) -> Graph {
  let mut graph = Graph {
    nodes: result
      .objects
      .values()
      .map(|o| Node {
        id:        o.id.clone(),
        kind:      NodeKind::Object,
        label:     o.value.clone(),
        type_name: o.object_type.name.clone(),
        retracted: false,
      })
      .collect(),
    edges: Vec::new(),
  };

  for fact in result.facts.values() {
    match (&fact.source_object, &fact.destination_object) {
      (Some(source), Some(destination)) if !options.facts_as_nodes => {
        graph.edges.push(Edge {
          id:            fact.id.clone(),
          source:        source.id.clone(),
          target:        destination.id.clone(),
          label:         fact.fact_type.name.clone(),
          bidirectional: fact.bidirectional_binding,
          retracted:     fact.retracted,
        });
      }
      (None, None) => {}
      (source, destination) => {
        graph.nodes.push(fact_node(fact));
        if let Some(source) = source {
          graph
            .edges
            .push(fact_edge(fact, "source", &source.id, &fact.id));
        }
        if let Some(destination) = destination {
          graph
            .edges
            .push(fact_edge(fact, "destination", &fact.id, &destination.id));
        }
      }
    }
  }

  let node_ids: BTreeSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
  let edges = graph
    .edges
    .iter()
    .filter(|e| node_ids.contains(e.source.as_str()) && node_ids.contains(e.target.as_str()))
    .cloned()
    .collect();
  graph.edges = edges;
  graph
}

fn fact_node(fact: &ActFact) -> Node {
  let label = match fact.value.as_deref() {
    Some(v) if !v.is_empty() && !fact.has_hidden_value() => v.to_owned(),
    _ => fact.fact_type.name.clone(),
  };
  Node {
    id: fact.id.clone(),
    kind: NodeKind::Fact,
    label,
    type_name: fact.fact_type.name.clone(),
    retracted: fact.retracted,
  }
}

fn fact_edge(fact: &ActFact, leg: &str, source: &str, target: &str) -> Edge {
  Edge {
    id:            format!("{}/{leg}", fact.id),
    source:        source.to_owned(),
    target:        target.to_owned(),
    label:         String::new(),
    bidirectional: fact.bidirectional_binding,
    retracted:     fact.retracted,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::fixtures::*;

  fn sample() -> SearchResult {
    let actor = object("o1", "threatActor", "Axiom");
    let tool = object("o2", "tool", "PlugX");
    let mut name = fact("f2", "name", Some(&tool), None, 0);
    name.value = Some("Sogu".into());
    SearchResult::new([fact("f1", "uses", Some(&actor), Some(&tool), 0), name], [actor, tool])
  }

  #[test]
  fn two_legged_fact_becomes_edge() {
    let g = project(&sample(), ProjectionOptions::default());
    assert_eq!(g.nodes.len(), 3);
    let edge = g.edges.iter().find(|e| e.id == "f1").unwrap();
    assert_eq!((edge.source.as_str(), edge.target.as_str()), ("o1", "o2"));
    assert_eq!(edge.label, "uses");
  }

  #[test]
  fn one_legged_fact_becomes_node() {
    let g = project(&sample(), ProjectionOptions::default());
    let node = g.nodes.iter().find(|n| n.id == "f2").unwrap();
    assert_eq!(node.kind, NodeKind::Fact);
    assert_eq!(node.label, "Sogu");
    assert!(g.edges.iter().any(|e| e.id == "f2/source" && e.target == "f2"));
  }

  #[test]
  fn facts_as_nodes_splits_every_fact() {
    let g = project(&sample(), ProjectionOptions {
      facts_as_nodes: true,
    });
    assert_eq!(g.nodes.len(), 4);
    let ids: Vec<&str> = g.edges.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, ["f1/source", "f1/destination", "f2/source"]);
  }

  #[test]
  fn hidden_value_falls_back_to_type_name() {
    let mut input = sample();
    input.facts.get_mut("f2").unwrap().value = Some("-".into());
    let g = project(&input, ProjectionOptions::default());
    let node = g.nodes.iter().find(|n| n.id == "f2").unwrap();
    assert_eq!(node.label, "name");
  }

  #[test]
  fn dangling_edges_are_dropped() {
    let mut input = sample();
    input.objects.remove("o2");
    let g = project(&input, ProjectionOptions::default());
    assert!(g.edges.is_empty());
  }

  #[test]
  fn retracted_flag_carries_over() {
    let mut input = sample();
    input.facts.get_mut("f1").unwrap().retracted = true;
    let g = project(&input, ProjectionOptions::default());
    assert!(g.edges.iter().find(|e| e.id == "f1").unwrap().retracted);
  }
}
