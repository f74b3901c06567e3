//! Marker surgery on shell HTML.

use crate::resolver::BoundaryResolution;
use crate::shell::{DynamicBoundaryMetadata, StaticShell};
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"<!--ppr:(?:start|end|fallback-start|fallback-end):.*?-->")
		.expect("MARKER: invalid regex pattern")
});

/// Splices resolved content into the shell HTML.
///
/// Each resolved boundary's marked region, markers included, is replaced by
/// its resolved wrapper. Resolutions whose markers cannot be found are
/// skipped.
pub fn inject_dynamic_content(
	shell: &StaticShell,
	resolutions: &IndexMap<String, BoundaryResolution>,
) -> String {
	inject_resolutions(&shell.html, &shell.boundaries, resolutions)
}

/// Splices resolutions into arbitrary HTML using the given boundary metadata.
///
/// Applying this to its own output changes nothing, since the markers are
/// consumed by the first pass.
pub fn inject_resolutions(
	html: &str,
	boundaries: &IndexMap<String, DynamicBoundaryMetadata>,
	resolutions: &IndexMap<String, BoundaryResolution>,
) -> String {
	let mut html = html.to_string();

	for (id, resolution) in resolutions {
		let Some(metadata) = boundaries.get(id) else {
			tracing::debug!(boundary_id = %id, "no shell metadata for resolution, skipping");
			continue;
		};
		let Some(start) = html.find(&metadata.start_marker) else {
			tracing::debug!(boundary_id = %id, "start marker not found, skipping");
			continue;
		};
		let Some(offset) = html[start..].find(&metadata.end_marker) else {
			tracing::debug!(boundary_id = %id, "end marker not found after start marker, skipping");
			continue;
		};
		let end = start + offset + metadata.end_marker.len();
		html.replace_range(start..end, &resolution.wrapped_html());
	}

	html
}

/// Removes every boundary marker, leaving fallbacks inside their wrappers.
pub fn replace_markers_with_fallbacks(html: &str) -> String {
	MARKER.replace_all(html, "").into_owned()
}
