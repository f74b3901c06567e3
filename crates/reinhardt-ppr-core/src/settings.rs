//! Partial prerendering settings.
//!
//! Settings load from TOML. Every field has a default, so an empty document
//! is a valid configuration:
//!
//! ```toml
//! placeholder_prefix = "home-"
//! timeout_ms = 2500
//! lang = "en"
//! resolve_strategy = "concurrent"
//! shell_ttl_secs = 300
//! ```

use crate::error::{PprError, PprResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default per-boundary timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// How the streaming response resolves boundaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveStrategy {
	/// One boundary at a time, in priority order.
	#[default]
	Sequential,
	/// All boundaries at once; scripts are still flushed in priority order.
	Concurrent,
}

/// Configuration for shell building and streaming.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PprSettings {
	/// Prefix for synthesized boundary ids.
	pub placeholder_prefix: String,
	/// Per-boundary timeout in milliseconds.
	pub timeout_ms: u64,
	/// Value of the document `lang` attribute.
	pub lang: String,
	/// Boundary resolution strategy.
	pub resolve_strategy: ResolveStrategy,
	/// Lifetime of cached shells. `None` keeps them until invalidated.
	pub shell_ttl_secs: Option<u64>,
}

impl Default for PprSettings {
	fn default() -> Self {
		Self {
			placeholder_prefix: String::new(),
			timeout_ms: DEFAULT_TIMEOUT_MS,
			lang: "en".to_string(),
			resolve_strategy: ResolveStrategy::default(),
			shell_ttl_secs: None,
		}
	}
}

impl PprSettings {
	/// Sets the id prefix.
	pub fn with_placeholder_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.placeholder_prefix = prefix.into();
		self
	}

	/// Sets the per-boundary timeout.
	pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
		self.timeout_ms = timeout_ms;
		self
	}

	/// Sets the resolution strategy.
	pub fn with_resolve_strategy(mut self, strategy: ResolveStrategy) -> Self {
		self.resolve_strategy = strategy;
		self
	}

	/// Sets the shell cache lifetime.
	pub fn with_shell_ttl_secs(mut self, secs: u64) -> Self {
		self.shell_ttl_secs = Some(secs);
		self
	}

	/// Parses and validates settings from a TOML string.
	pub fn from_toml_str(content: &str) -> PprResult<Self> {
		let settings: Self = toml::from_str(content)?;
		settings.validate()?;
		Ok(settings)
	}

	/// Loads settings from a TOML file.
	///
	/// # Errors
	///
	/// Returns an error if the file cannot be read, parsed or validated.
	pub fn from_toml_file(path: impl AsRef<Path>) -> PprResult<Self> {
		let content = std::fs::read_to_string(path.as_ref())?;
		Self::from_toml_str(&content)
	}

	/// Checks value constraints.
	pub fn validate(&self) -> PprResult<()> {
		if self.timeout_ms == 0 {
			return Err(PprError::InvalidSettings(
				"timeout_ms must be greater than zero".to_string(),
			));
		}
		if self.placeholder_prefix.contains(char::is_whitespace)
			|| self.placeholder_prefix.contains("-->")
		{
			return Err(PprError::InvalidSettings(format!(
				"placeholder_prefix '{}' must not contain whitespace or '-->'",
				self.placeholder_prefix
			)));
		}
		if self.lang.is_empty() {
			return Err(PprError::InvalidSettings("lang must not be empty".to_string()));
		}
		Ok(())
	}

	/// Returns the per-boundary timeout.
	pub fn timeout(&self) -> Duration {
		Duration::from_millis(self.timeout_ms)
	}

	/// Returns the shell cache lifetime.
	pub fn shell_ttl(&self) -> Option<Duration> {
		self.shell_ttl_secs.map(Duration::from_secs)
	}
}
