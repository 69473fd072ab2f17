//! Runtime settings: an optional TOML file overlaid with `REFINERY_*`
//! environment variables.

use std::{path::Path, time::Duration};

use anyhow::Context as _;
use refinery_core::timestamp::EndTimestamp;
use serde::Deserialize;

use crate::client::ActConfig;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub act_url:          String,
  pub act_user_id:      String,
  pub timeout_secs:     u64,
  pub merge_previous:   bool,
  pub show_retractions: bool,
  pub end_timestamp:    EndTimestamp,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      act_url:          "http://localhost:8888".to_string(),
      act_user_id:      "1".to_string(),
      timeout_secs:     30,
      merge_previous:   true,
      show_retractions: false,
      end_timestamp:    EndTimestamp::AnyTime,
    }
  }
}

impl Settings {
  /// Read `path` if it exists, then apply the environment on top.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("REFINERY"))
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise settings")
  }

  pub fn act_config(&self) -> ActConfig {
    ActConfig {
      base_url: self.act_url.clone(),
      user_id:  self.act_user_id.clone(),
      timeout:  Duration::from_secs(self.timeout_secs),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use refinery_core::timestamp::RelativeUnit;

  use super::*;

  fn load_str(toml: &str) -> Settings {
    let path = std::env::temp_dir().join(format!("refinery-settings-{}.toml", std::process::id()));
    std::fs::File::create(&path)
      .unwrap()
      .write_all(toml.as_bytes())
      .unwrap();
    let settings = Settings::load(&path).unwrap();
    std::fs::remove_file(&path).ok();
    settings
  }

  #[test]
  fn missing_file_gives_defaults() {
    let settings = Settings::load(Path::new("/nonexistent/refinery.toml")).unwrap();
    assert_eq!(settings, Settings::default());
  }

  #[test]
  fn file_values_override_defaults() {
    let settings = load_str(
      r#"
act_url = "https://act.example.com"
show_retractions = true
end_timestamp = "Last 7 days"
"#,
    );
    assert_eq!(settings.act_url, "https://act.example.com");
    assert!(settings.show_retractions);
    assert!(settings.merge_previous);
    assert_eq!(settings.end_timestamp, EndTimestamp::Relative {
      amount: 7,
      unit:   RelativeUnit::Days,
    });
    assert_eq!(settings.act_config().timeout, Duration::from_secs(30));
  }
}
