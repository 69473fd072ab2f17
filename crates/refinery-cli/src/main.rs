//! `refinery` — search the ACT platform, merge the results and print the
//! refined view.
//!
//! # Usage
//!
//! ```text
//! refinery search --type threatActor Axiom APT1 --end "Last 30 days"
//! refinery fact --type-name alias 5e9b1c9e-0000-4000-8000-000000000001
//! refinery replay session.json --exclude-type ipv4 --format graph
//! refinery validate session.json
//! ```

mod client;
mod error;
mod output;
mod settings;

use std::{
  io,
  path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use client::ActClient;
use output::Format;
use refinery_core::{
  export::parse_state_export,
  graph::ProjectionOptions,
  search::{ObjectSearch, Search},
  session::Session,
  timestamp::EndTimestamp,
};
use settings::Settings;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "refinery", author, version, about = "Search, merge and refine ACT facts")]
struct Cli {
  /// Path to a TOML config file.
  #[arg(short, long, value_name = "FILE", default_value = "refinery.toml")]
  config: PathBuf,

  /// Base URL of the ACT platform.
  #[arg(long)]
  url: Option<String>,

  /// Value sent in the `ACT-User-ID` header.
  #[arg(long)]
  user_id: Option<String>,

  #[command(flatten)]
  view: ViewArgs,

  #[command(subcommand)]
  command: Command,
}

#[derive(Args, Debug)]
struct ViewArgs {
  /// Hide facts at or after this point: `Any time`, `Last 7 days`, a date
  /// or an RFC 3339 timestamp.
  #[arg(long, global = true, value_name = "WHEN")]
  end: Option<EndTimestamp>,

  /// Show retracted facts, marked, instead of hiding them.
  #[arg(long, global = true, conflicts_with = "hide_retractions")]
  show_retractions: bool,

  /// Hide retracted facts even if the config shows them.
  #[arg(long, global = true)]
  hide_retractions: bool,

  /// Hide objects of this type (name or id) and every fact touching them.
  #[arg(long = "exclude-type", global = true, value_name = "TYPE")]
  exclude_types: Vec<String>,

  /// Hide this object and every fact touching it.
  #[arg(long = "prune", global = true, value_name = "OBJECT_ID")]
  prune: Vec<String>,

  /// Show only the last search instead of merging all of them.
  #[arg(long, global = true, conflicts_with = "merge")]
  no_merge: bool,

  /// Merge all searches even if the config turns merging off.
  #[arg(long, global = true)]
  merge: bool,

  #[arg(long, global = true, value_enum, default_value_t = Format::Summary)]
  format: Format,

  /// Graph output: draw every fact as a node.
  #[arg(long, global = true)]
  facts_as_nodes: bool,

  /// Write the session's history export to this file.
  #[arg(long, global = true, value_name = "FILE")]
  export: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Search facts around one or more objects of a type.
  Search {
    #[arg(long = "type", value_name = "TYPE")]
    object_type: String,

    /// Graph traversal query, e.g. `g.outE()`.
    #[arg(long)]
    query: Option<String>,

    /// Restrict to these fact types.
    #[arg(long = "fact-type", value_name = "NAME")]
    fact_types: Vec<String>,

    #[arg(required = true, value_name = "VALUE")]
    values: Vec<String>,
  },

  /// Fetch a single fact.
  Fact {
    #[arg(long)]
    type_name: String,

    id: String,
  },

  /// Replay the searches of a history export.
  Replay { file: PathBuf },

  /// Check a history export without contacting the platform.
  Validate { file: PathBuf },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let mut settings = Settings::load(&cli.config)?;
  // CLI flags override the config file and environment.
  if let Some(url) = cli.url {
    settings.act_url = url;
  }
  if let Some(user_id) = cli.user_id {
    settings.act_user_id = user_id;
  }

  let client = ActClient::new(settings.act_config()).context("failed to build platform client")?;
  let mut session = Session::new(client);
  session.set_merge_previous(switch(cli.view.merge, cli.view.no_merge, settings.merge_previous));
  session.set_show_retractions(switch(
    cli.view.show_retractions,
    cli.view.hide_retractions,
    settings.show_retractions,
  ));
  session.set_end_timestamp(cli.view.end.unwrap_or(settings.end_timestamp));

  match cli.command {
    Command::Search {
      object_type,
      query,
      fact_types,
      values,
    } => {
      for value in values {
        let search = Search::Object(ObjectSearch {
          object_type: object_type.clone(),
          object_value: value,
          query: query.clone(),
          fact_types: fact_types.clone(),
        });
        session
          .execute(search)
          .await
          .context("search failed")?;
      }
    }
    Command::Fact { type_name, id } => {
      session
        .execute(Search::fact(type_name, id))
        .await
        .context("search failed")?;
    }
    Command::Replay { file } => {
      let json = std::fs::read_to_string(&file)
        .with_context(|| format!("reading {}", file.display()))?;
      session.import_state(&json).await.context("Import failed")?;
    }
    Command::Validate { file } => return validate(&file),
  }

  session.prune_objects(cli.view.prune);
  for name in &cli.view.exclude_types {
    match session.object_type_filters().find(name).map(|f| f.id.clone()) {
      Some(id) => {
        session.set_object_type_filter(&id, false);
      }
      None => tracing::warn!(object_type = %name, "no objects of this type in the results"),
    }
  }

  if let Some(path) = &cli.view.export {
    let export = serde_json::to_string_pretty(&session.export_state())?;
    std::fs::write(path, export).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote history export");
  }

  let now = Utc::now();
  let mut stdout = io::stdout().lock();
  match cli.view.format {
    Format::Summary => output::summary(&mut stdout, session.history(), &session.refined(now)),
    Format::Json => output::json(&mut stdout, &session.refined(now)),
    Format::Graph => output::graph(
      &mut stdout,
      &session.graph(now, ProjectionOptions {
        facts_as_nodes: cli.view.facts_as_nodes,
      }),
    ),
  }
  .context("writing output")?;

  Ok(())
}

/// Resolve a pair of on/off flags against the configured value.
fn switch(on: bool, off: bool, configured: bool) -> bool {
  match (on, off) {
    (true, _) => true,
    (_, true) => false,
    _ => configured,
  }
}

/// Parse a history export and report what it holds.
fn validate(file: &Path) -> Result<()> {
  let json =
    std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
  let export = parse_state_export(&json).context("Import failed")?;
  println!(
    "{}: version {}, {} queries, {} pruned objects",
    file.display(),
    export.version,
    export.queries.len(),
    export.pruned_object_ids.len()
  );
  Ok(())
}
