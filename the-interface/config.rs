//! Registry behavior knobs.
//!
//! ```toml
//! overwrite = "reject"
//! ```

use serde::{
  Deserialize,
  Serialize,
};

use crate::Result;

/// What happens when a type is registered twice for the same operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverwritePolicy {
  /// Replace the previous implementation silently.
  Replace,
  /// Replace the previous implementation and log a warning.
  #[default]
  Warn,
  /// Keep the previous implementation and fail the registration.
  Reject,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct DispatchConfig {
  pub overwrite: OverwritePolicy,
}

impl DispatchConfig {
  pub fn from_toml(source: &str) -> Result<Self> {
    Ok(toml::from_str(source)?)
  }

  pub fn with_overwrite(mut self, overwrite: OverwritePolicy) -> Self {
    self.overwrite = overwrite;
    self
  }
}
