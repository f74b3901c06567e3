//! Request-time boundary resolution.
//!
//! The cached shell keeps only boundary metadata, so the original tree is
//! walked again in request mode to recover each boundary's live content.
//! That walk runs in discovery mode: boundaries are registered in the same
//! order as the build pass but their bodies are rendered only once, by
//! [`render_dynamic_content`].

use crate::shell::StaticShell;
use indexmap::IndexMap;
use reinhardt_ppr_core::markers::{ERROR_FRAGMENT, wrap_boundary};
use reinhardt_ppr_core::{
	DynamicBoundary, Node, PprContext, PprError, PprResult, RequestData, render_with_ppr,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The outcome of rendering one boundary at request time.
#[derive(Debug)]
pub struct BoundaryResolution {
	/// Boundary id.
	pub id: String,
	/// Resolved content, or the error fragment on failure.
	pub html: String,
	/// Time spent rendering.
	pub resolve_time: Duration,
	/// Whether the content came from a cache.
	pub cached: bool,
	/// The failure, if rendering did not succeed.
	pub error: Option<PprError>,
}

impl BoundaryResolution {
	/// Creates a failed resolution showing the error fragment.
	pub fn failed(id: impl Into<String>, error: PprError, resolve_time: Duration) -> Self {
		Self {
			id: id.into(),
			html: ERROR_FRAGMENT.to_string(),
			resolve_time,
			cached: false,
			error: Some(error),
		}
	}

	/// Returns `true` if rendering failed or timed out.
	pub fn is_error(&self) -> bool {
		self.error.is_some()
	}

	/// Returns the content inside its resolved boundary wrapper.
	pub fn wrapped_html(&self) -> String {
		wrap_boundary(&self.id, &self.html, true)
	}

	/// Returns the resolve time in whole milliseconds.
	pub fn resolve_time_ms(&self) -> u64 {
		self.resolve_time.as_millis() as u64
	}
}

/// Renders the content of one boundary.
///
/// Never fails: a render error yields the error fragment with `error` set.
pub async fn render_dynamic_content(
	boundary: &DynamicBoundary,
	ctx: &mut PprContext,
) -> BoundaryResolution {
	let started = Instant::now();
	let previous = ctx.set_inside_dynamic_boundary(true);
	let result = render_with_ppr(&boundary.content, ctx).await;
	ctx.set_inside_dynamic_boundary(previous);
	let resolve_time = started.elapsed();

	match result {
		Ok(html) => {
			tracing::debug!(
				boundary_id = %boundary.id,
				elapsed_ms = resolve_time.as_millis() as u64,
				"resolved dynamic boundary"
			);
			BoundaryResolution {
				id: boundary.id.clone(),
				html,
				resolve_time,
				cached: false,
				error: None,
			}
		}
		Err(error) => {
			tracing::error!(boundary_id = %boundary.id, %error, "dynamic boundary failed to render");
			BoundaryResolution::failed(boundary.id.clone(), error, resolve_time)
		}
	}
}

/// Re-walks `original` in request mode and returns the populated context.
///
/// Boundary bodies are not rendered during the walk. Ids that the shell does
/// not know are logged.
pub async fn discover_boundaries(
	shell: &StaticShell,
	request_data: Option<Arc<RequestData>>,
	original: &Node,
) -> PprResult<PprContext> {
	let mut ctx = PprContext::request(request_data)
		.with_placeholder_prefix(shell.placeholder_prefix.clone())
		.discovery();
	render_with_ppr(original, &mut ctx).await?;

	for id in ctx.boundaries().keys() {
		if !shell.boundaries.contains_key(id) {
			tracing::warn!(boundary_id = %id, path = %shell.path, "boundary discovered at request time is missing from the shell");
		}
	}
	if ctx.boundaries().len() != shell.boundaries.len() {
		tracing::warn!(
			path = %shell.path,
			shell = shell.boundaries.len(),
			discovered = ctx.boundaries().len(),
			"boundary count differs between shell and request walk"
		);
	}
	Ok(ctx)
}

/// Resolves every boundary of `original` for one request.
///
/// Boundaries are rendered one after another in discovery order.
pub async fn render_all_dynamic_content(
	shell: &StaticShell,
	request_data: Option<Arc<RequestData>>,
	original: &Node,
) -> PprResult<IndexMap<String, BoundaryResolution>> {
	let ctx = discover_boundaries(shell, request_data, original).await?;

	let mut resolutions = IndexMap::with_capacity(ctx.boundaries().len());
	for (id, boundary) in ctx.boundaries() {
		let mut scratch = ctx.fork();
		let resolution = render_dynamic_content(boundary, &mut scratch).await;
		resolutions.insert(id.clone(), resolution);
	}
	Ok(resolutions)
}
