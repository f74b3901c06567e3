//! The immutable static shell and its boundary metadata.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use reinhardt_ppr_core::{BoundaryKind, PprResult};
use serde::{Deserialize, Serialize};

/// Build-time description of one boundary in a shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicBoundaryMetadata {
	/// Boundary id.
	pub id: String,
	/// What introduced the boundary.
	#[serde(rename = "type")]
	pub kind: BoundaryKind,
	/// Rendered fallback HTML.
	pub fallback_html: String,
	/// Declared data dependencies.
	pub data_dependencies: Vec<String>,
	/// Streaming priority.
	pub priority: i32,
	/// Start marker token.
	pub start_marker: String,
	/// End marker token.
	pub end_marker: String,
}

/// Assets referenced by the shell HTML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellAssets {
	/// Stylesheet URLs.
	pub css: Vec<String>,
	/// Script URLs.
	pub js: Vec<String>,
	/// Preloaded font URLs.
	pub fonts: Vec<String>,
	/// Critical CSS inlined into the document head.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub inline_css: Option<String>,
}

impl ShellAssets {
	/// Returns `true` if no asset was found.
	pub fn is_empty(&self) -> bool {
		self.css.is_empty() && self.js.is_empty() && self.fonts.is_empty() && self.inline_css.is_none()
	}
}

/// A prerendered route: HTML with boundary markers plus metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticShell {
	/// Route path.
	pub path: String,
	/// Shell HTML including boundary markers.
	pub html: String,
	/// Boundaries in discovery order.
	#[serde(with = "boundary_pairs")]
	pub boundaries: IndexMap<String, DynamicBoundaryMetadata>,
	/// When the shell was built.
	pub build_time: DateTime<Utc>,
	/// SHA-256 of `html`.
	pub content_hash: String,
	/// Asset manifest.
	pub assets: ShellAssets,
	/// Prefix used for synthesized ids during the build.
	#[serde(default)]
	pub placeholder_prefix: String,
}

impl StaticShell {
	/// Returns the boundary ids in discovery order.
	pub fn boundary_ids(&self) -> impl Iterator<Item = &str> {
		self.boundaries.keys().map(String::as_str)
	}

	/// Returns `true` if any boundary declares `dependency`.
	pub fn depends_on(&self, dependency: &str) -> bool {
		self.boundaries
			.values()
			.any(|b| b.data_dependencies.iter().any(|d| d == dependency))
	}

	/// Returns the strong ETag derived from the content hash.
	pub fn etag(&self) -> String {
		format!("\"{}\"", self.content_hash)
	}

	/// Serializes the shell to JSON.
	pub fn to_json(&self) -> PprResult<String> {
		Ok(serde_json::to_string(self)?)
	}

	/// Deserializes a shell from JSON.
	pub fn from_json(json: &str) -> PprResult<Self> {
		Ok(serde_json::from_str(json)?)
	}
}

/// Answers a conditional request against a shell.
///
/// Returns `true` when `if_none_match` is `*` or lists the shell's ETag.
/// Weak validators compare equal to their strong counterpart.
pub fn is_not_modified(shell: &StaticShell, if_none_match: Option<&str>) -> bool {
	let Some(header) = if_none_match else {
		return false;
	};
	let etag = shell.etag();
	header.split(',').map(str::trim).any(|candidate| {
		candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
	})
}

/// Serializes an `IndexMap` as an ordered list of `[key, value]` pairs.
mod boundary_pairs {
	use super::DynamicBoundaryMetadata;
	use indexmap::IndexMap;
	use serde::ser::SerializeSeq;
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(
		map: &IndexMap<String, DynamicBoundaryMetadata>,
		serializer: S,
	) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut seq = serializer.serialize_seq(Some(map.len()))?;
		for pair in map.iter() {
			seq.serialize_element(&pair)?;
		}
		seq.end()
	}

	pub fn deserialize<'de, D>(
		deserializer: D,
	) -> Result<IndexMap<String, DynamicBoundaryMetadata>, D::Error>
	where
		D: Deserializer<'de>,
	{
		let pairs = Vec::<(String, DynamicBoundaryMetadata)>::deserialize(deserializer)?;
		Ok(pairs.into_iter().collect())
	}
}
