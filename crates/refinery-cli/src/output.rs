//! Rendering of session state to stdout.

use std::io::{self, Write};

use clap::ValueEnum;
use refinery_core::{
  graph::Graph,
  history::HistoryLog,
  model::{ActFact, SearchResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
  /// Human-readable history and fact listing.
  Summary,
  /// The refined result as JSON.
  Json,
  /// The node/edge projection as JSON.
  Graph,
}

pub fn json(out: &mut impl Write, result: &SearchResult) -> io::Result<()> {
  serde_json::to_writer_pretty(&mut *out, result)?;
  writeln!(out)
}

pub fn graph(out: &mut impl Write, graph: &Graph) -> io::Result<()> {
  serde_json::to_writer_pretty(&mut *out, graph)?;
  writeln!(out)
}

pub fn summary(out: &mut impl Write, history: &HistoryLog, refined: &SearchResult) -> io::Result<()> {
  writeln!(out, "History ({} searches):", history.len())?;
  for item in history.items() {
    let marker = if history.selected_id() == Some(item.id.as_str()) { '*' } else { ' ' };
    writeln!(
      out,
      " {marker} {}  {}  ({} facts, {} objects)",
      item.id,
      item.search,
      item.result.facts.len(),
      item.result.objects.len()
    )?;
  }

  writeln!(
    out,
    "\nShowing {} facts, {} objects:",
    refined.facts.len(),
    refined.objects.len()
  )?;

  let mut facts: Vec<&ActFact> = refined.facts.values().collect();
  facts.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
  for fact in facts {
    writeln!(out, "  {}", fact_line(fact))?;
  }
  Ok(())
}

fn fact_line(fact: &ActFact) -> String {
  let endpoint = |e: Option<&refinery_core::model::FactObjectRef>| {
    e.map(|o| format!("{}/{}", o.object_type.name, o.value))
  };
  let mut line = format!(
    "{}  {}",
    fact.timestamp.format("%Y-%m-%d %H:%M"),
    fact.fact_type.name
  );
  match (
    endpoint(fact.source_object.as_ref()),
    endpoint(fact.destination_object.as_ref()),
  ) {
    (Some(s), Some(d)) => {
      let arrow = if fact.bidirectional_binding { "<->" } else { "->" };
      line.push_str(&format!("  {s} {arrow} {d}"));
    }
    (Some(o), None) | (None, Some(o)) => line.push_str(&format!("  {o}")),
    (None, None) => {}
  }
  if let Some(value) = fact.value.as_deref()
    && !value.is_empty()
    && !fact.has_hidden_value()
  {
    line.push_str(&format!("  {value:?}"));
  }
  if fact.retracted {
    line.push_str("  [retracted]");
  }
  line
}
