//! Streaming response builder.
//!
//! [`generate_ppr_response`] returns immediately with a body fed by a spawned
//! producer task. The producer writes, in order:
//!
//! 1. the document preamble with the client runtime,
//! 2. the shell with its markers stripped, so fallbacks are visible,
//! 3. a script registering every shell boundary as pending,
//! 4. one `inject` script per boundary, highest priority first, then an
//!    error inject for each shell boundary the request walk did not find,
//! 5. the completion script and the closing tags.
//!
//! Each boundary is rendered under its own timeout. Failures and timeouts
//! become the error fragment for that boundary only.

use crate::document::{document_close, render_preamble};
use crate::response::{PprBody, PprResponse, StreamingResponse};
use crate::runtime::{complete_script, inject_script, pending_script};
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::FuturesOrdered;
use reinhardt_ppr_core::markers::wrap_boundary;
use reinhardt_ppr_core::{
	DynamicBoundary, ERROR_FRAGMENT, Node, PprContext, PprError, PprResult, PprSettings,
	RequestData, ResolveStrategy,
};
use reinhardt_ppr_shell::{
	BoundaryResolution, StaticShell, discover_boundaries, render_dynamic_content,
	replace_markers_with_fallbacks,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

type Callback = Arc<dyn Fn() + Send + Sync>;
type BoundaryCallback = Arc<dyn Fn(&str) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&str, &PprError) + Send + Sync>;

/// Hooks invoked by the producer task as the stream progresses.
#[derive(Clone, Default)]
pub struct StreamCallbacks {
	on_shell_sent: Option<Callback>,
	on_boundary_resolved: Option<BoundaryCallback>,
	on_complete: Option<Callback>,
	on_error: Option<ErrorCallback>,
}

impl StreamCallbacks {
	/// Creates an empty callback set.
	pub fn new() -> Self {
		Self::default()
	}

	/// Called once the shell and pending registration are sent.
	pub fn on_shell_sent(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
		self.on_shell_sent = Some(Arc::new(f));
		self
	}

	/// Called with the id of each boundary streamed successfully.
	pub fn on_boundary_resolved(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
		self.on_boundary_resolved = Some(Arc::new(f));
		self
	}

	/// Called after the document is closed.
	pub fn on_complete(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
		self.on_complete = Some(Arc::new(f));
		self
	}

	/// Called with the id and error of each boundary that failed or timed out.
	pub fn on_error(mut self, f: impl Fn(&str, &PprError) + Send + Sync + 'static) -> Self {
		self.on_error = Some(Arc::new(f));
		self
	}

	fn shell_sent(&self) {
		if let Some(f) = &self.on_shell_sent {
			f();
		}
	}

	fn boundary_resolved(&self, id: &str) {
		if let Some(f) = &self.on_boundary_resolved {
			f(id);
		}
	}

	fn complete(&self) {
		if let Some(f) = &self.on_complete {
			f();
		}
	}

	fn error(&self, id: &str, error: &PprError) {
		if let Some(f) = &self.on_error {
			f(id, error);
		}
	}
}

impl std::fmt::Debug for StreamCallbacks {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StreamCallbacks")
			.field("on_shell_sent", &self.on_shell_sent.is_some())
			.field("on_boundary_resolved", &self.on_boundary_resolved.is_some())
			.field("on_complete", &self.on_complete.is_some())
			.field("on_error", &self.on_error.is_some())
			.finish()
	}
}

/// Options for one streamed response.
#[derive(Debug, Clone)]
pub struct StreamOptions {
	/// Request-scoped values for components.
	pub request_data: Option<Arc<RequestData>>,
	/// Per-boundary render deadline.
	pub timeout: Duration,
	/// Document language.
	pub lang: String,
	/// Boundary resolution strategy.
	pub strategy: ResolveStrategy,
	/// Progress hooks.
	pub callbacks: StreamCallbacks,
	/// Number of chunks buffered between producer and consumer.
	pub channel_capacity: usize,
}

impl Default for StreamOptions {
	fn default() -> Self {
		Self::from_settings(&PprSettings::default())
	}
}

impl StreamOptions {
	/// Creates options from settings.
	pub fn from_settings(settings: &PprSettings) -> Self {
		Self {
			request_data: None,
			timeout: settings.timeout(),
			lang: settings.lang.clone(),
			strategy: settings.resolve_strategy,
			callbacks: StreamCallbacks::default(),
			channel_capacity: 16,
		}
	}

	/// Sets the request data.
	pub fn with_request_data(mut self, data: impl Into<Arc<RequestData>>) -> Self {
		self.request_data = Some(data.into());
		self
	}

	/// Sets the per-boundary timeout.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	/// Sets the resolution strategy.
	pub fn with_strategy(mut self, strategy: ResolveStrategy) -> Self {
		self.strategy = strategy;
		self
	}

	/// Sets the callbacks.
	pub fn with_callbacks(mut self, callbacks: StreamCallbacks) -> Self {
		self.callbacks = callbacks;
		self
	}
}

/// Starts streaming the document for `shell`.
///
/// `original` is the tree the shell was built from; it is walked again to
/// recover boundary content. Must be called within a Tokio runtime.
pub fn generate_ppr_response(
	shell: Arc<StaticShell>,
	original: Arc<Node>,
	options: StreamOptions,
) -> PprResponse {
	let (tx, rx) = mpsc::channel(options.channel_capacity.max(1));
	let response_shell = Arc::clone(&shell);

	tokio::spawn(async move {
		if let Err(error) = stream_document(&shell, &original, &options, &tx).await {
			tracing::debug!(path = %shell.path, %error, "stopped streaming response");
		}
	});

	let body: PprBody = Box::pin(ReceiverStream::new(rx));
	StreamingResponse::new(body)
		.media_type("text/html; charset=utf-8")
		.shell_headers(&response_shell)
}

/// Answers a conditional request: `304` when `if_none_match` matches the
/// shell, otherwise a streamed response.
pub fn generate_conditional_response(
	shell: Arc<StaticShell>,
	original: Arc<Node>,
	options: StreamOptions,
	if_none_match: Option<&str>,
) -> PprResponse {
	if reinhardt_ppr_shell::is_not_modified(&shell, if_none_match) {
		return crate::response::not_modified(&shell);
	}
	generate_ppr_response(shell, original, options)
}

async fn stream_document(
	shell: &StaticShell,
	original: &Node,
	options: &StreamOptions,
	tx: &mpsc::Sender<PprResult<Bytes>>,
) -> PprResult<()> {
	let started = Instant::now();
	let callbacks = &options.callbacks;

	send(tx, render_preamble(shell, &options.lang)).await?;
	send(tx, replace_markers_with_fallbacks(&shell.html)).await?;
	send(tx, pending_script(shell.boundary_ids())).await?;
	callbacks.shell_sent();

	match discover_boundaries(shell, options.request_data.clone(), original).await {
		Ok(ctx) => {
			let mut boundaries: Vec<&DynamicBoundary> = ctx.boundaries().values().collect();
			boundaries.sort_by(|a, b| b.priority.cmp(&a.priority));

			match options.strategy {
				ResolveStrategy::Sequential => {
					for boundary in boundaries {
						let resolution = resolve_with_timeout(boundary, &ctx, options.timeout).await;
						emit(tx, resolution, callbacks).await?;
					}
				}
				ResolveStrategy::Concurrent => {
					let mut pending: FuturesOrdered<_> = boundaries
						.into_iter()
						.map(|boundary| resolve_with_timeout(boundary, &ctx, options.timeout))
						.collect();
					while let Some(resolution) = pending.next().await {
						emit(tx, resolution, callbacks).await?;
					}
				}
			}

			// Settle shell boundaries the request walk no longer renders, so the
			// client's pending set still drains.
			for id in shell.boundary_ids() {
				if ctx.boundary(id).is_none() {
					let error = PprError::MissingBoundary { id: id.to_string() };
					tracing::warn!(
						path = %shell.path,
						boundary_id = %id,
						"boundary missing from request walk"
					);
					send(tx, inject_script(id, &wrap_boundary(id, ERROR_FRAGMENT, true))).await?;
					callbacks.error(id, &error);
				}
			}
		}
		Err(error) => {
			tracing::error!(path = %shell.path, %error, "request walk failed, failing every boundary");
			for id in shell.boundary_ids() {
				send(tx, inject_script(id, &wrap_boundary(id, ERROR_FRAGMENT, true))).await?;
				callbacks.error(id, &error);
			}
		}
	}

	send(tx, complete_script()).await?;
	send(tx, document_close()).await?;
	callbacks.complete();

	tracing::info!(
		path = %shell.path,
		boundaries = shell.boundaries.len(),
		elapsed_ms = started.elapsed().as_millis() as u64,
		"streamed partial prerendering response"
	);
	Ok(())
}

async fn resolve_with_timeout(
	boundary: &DynamicBoundary,
	ctx: &PprContext,
	limit: Duration,
) -> BoundaryResolution {
	let started = Instant::now();
	let mut scratch = ctx.fork();
	match tokio::time::timeout(limit, render_dynamic_content(boundary, &mut scratch)).await {
		Ok(resolution) => resolution,
		Err(_) => {
			let timeout_ms = limit.as_millis() as u64;
			tracing::warn!(boundary_id = %boundary.id, timeout_ms, "dynamic boundary timed out");
			BoundaryResolution::failed(
				boundary.id.clone(),
				PprError::Timeout {
					id: boundary.id.clone(),
					timeout_ms,
				},
				started.elapsed(),
			)
		}
	}
}

async fn emit(
	tx: &mpsc::Sender<PprResult<Bytes>>,
	resolution: BoundaryResolution,
	callbacks: &StreamCallbacks,
) -> PprResult<()> {
	send(tx, inject_script(&resolution.id, &resolution.wrapped_html())).await?;
	match &resolution.error {
		None => callbacks.boundary_resolved(&resolution.id),
		Some(error) => callbacks.error(&resolution.id, error),
	}
	Ok(())
}

async fn send(tx: &mpsc::Sender<PprResult<Bytes>>, chunk: impl Into<Bytes>) -> PprResult<()> {
	tx.send(Ok(chunk.into()))
		.await
		.map_err(|_| PprError::StreamClosed)
}

#[cfg(test)]
mod tests {
	use super::*;
	use reinhardt_ppr_core::{DynamicProps, IntoNode, Suspend};
	use reinhardt_ppr_shell::{ShellConfig, render_to_static_shell};
	use rstest::rstest;
	use std::sync::Mutex;

	async fn collect(response: PprResponse) -> String {
		let chunks: Vec<_> = response.into_stream().collect().await;
		chunks
			.into_iter()
			.map(|chunk| String::from_utf8(chunk.unwrap().to_vec()).unwrap())
			.collect()
	}

	fn slow(text: &'static str, millis: u64) -> Node {
		Node::component_fn("Slow", move |_| {
			Ok(Suspend::pending(async move {
				tokio::time::sleep(Duration::from_millis(millis)).await;
				Ok(Node::text(text))
			}))
		})
	}

	#[rstest]
	#[tokio::test]
	async fn test_stream_layout_order() {
		let tree = Arc::new(
			Node::element("main")
				.child(DynamicProps::new("late").fallback("wait"))
				.into_node(),
		);
		let shell = Arc::new(
			render_to_static_shell(&tree, "/", &ShellConfig::default())
				.await
				.unwrap(),
		);

		let response = generate_ppr_response(Arc::clone(&shell), tree, StreamOptions::default());
		assert_eq!(
			response.headers.get(hyper::header::CONTENT_TYPE).unwrap(),
			"text/html; charset=utf-8"
		);
		let body = collect(response).await;

		let shell_pos = body
			.find(r#"<main><div id="dynamic-0" data-ppr-boundary="true">wait</div></main>"#)
			.unwrap();
		let pending_pos = body.find(".register(['dynamic-0'])").unwrap();
		let inject_pos = body.find(".inject('dynamic-0'").unwrap();
		let complete_pos = body.find("'ppr:complete'").unwrap();
		assert!(body.find("window.__REINHARDT_PPR__ = ppr").unwrap() < shell_pos);
		assert!(shell_pos < pending_pos && pending_pos < inject_pos && inject_pos < complete_pos);
		assert!(!body.contains("<!--ppr:"));
		assert!(body.ends_with("</body>\n</html>"));
	}

	#[rstest]
	#[case(ResolveStrategy::Sequential)]
	#[case(ResolveStrategy::Concurrent)]
	#[tokio::test]
	async fn test_priority_order_regardless_of_speed(#[case] strategy: ResolveStrategy) {
		let tree = Arc::new(Node::fragment([
			Node::dynamic(DynamicProps::new(slow("low", 1)).id("low").priority(1)),
			Node::dynamic(DynamicProps::new(slow("high", 15)).id("high").priority(10)),
		]));
		let shell = Arc::new(
			render_to_static_shell(&tree, "/", &ShellConfig::default())
				.await
				.unwrap(),
		);

		let resolved = Arc::new(Mutex::new(Vec::new()));
		let sink = Arc::clone(&resolved);
		let options = StreamOptions::default()
			.with_strategy(strategy)
			.with_callbacks(StreamCallbacks::new().on_boundary_resolved(move |id| {
				sink.lock().unwrap().push(id.to_string());
			}));

		let body = collect(generate_ppr_response(shell, tree, options)).await;
		assert!(body.find(".inject('high'").unwrap() < body.find(".inject('low'").unwrap());
		assert_eq!(*resolved.lock().unwrap(), vec!["high", "low"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_timeout_degrades_single_boundary() {
		let tree = Arc::new(Node::fragment([
			Node::dynamic(DynamicProps::new(slow("never", 200)).id("slow")),
			Node::dynamic(DynamicProps::new("quick").id("fast")),
		]));
		let shell = Arc::new(
			render_to_static_shell(&tree, "/", &ShellConfig::default())
				.await
				.unwrap(),
		);

		let errors = Arc::new(Mutex::new(Vec::new()));
		let sink = Arc::clone(&errors);
		let options = StreamOptions::default()
			.with_timeout(Duration::from_millis(20))
			.with_callbacks(StreamCallbacks::new().on_error(move |id, error| {
				sink.lock().unwrap().push((id.to_string(), error.is_timeout()));
			}));

		let body = collect(generate_ppr_response(shell, tree, options)).await;
		assert!(body.contains("Error loading content"));
		assert!(!body.contains("never"));
		assert!(body.contains(".inject('fast', '<div id=\"fast\" data-ppr-boundary=\"true\" data-ppr-resolved=\"true\">quick<\\/div>')"));
		assert_eq!(*errors.lock().unwrap(), vec![("slow".to_string(), true)]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_failed_request_walk_fails_every_boundary() {
		let build_tree = Node::fragment([
			Node::dynamic(DynamicProps::new("a")),
			Node::dynamic(DynamicProps::new("b")),
		]);
		let shell = Arc::new(
			render_to_static_shell(&build_tree, "/", &ShellConfig::default())
				.await
				.unwrap(),
		);
		let broken = Arc::new(Node::component_fn("Layout", |scope| {
			if scope.is_build() {
				Ok(Suspend::ready(""))
			} else {
				Err(PprError::component("Layout", "session lookup failed"))
			}
		}));

		let errors = Arc::new(Mutex::new(Vec::new()));
		let sink = Arc::clone(&errors);
		let options = StreamOptions::default().with_callbacks(
			StreamCallbacks::new().on_error(move |id, _| sink.lock().unwrap().push(id.to_string())),
		);

		let body = collect(generate_ppr_response(shell, broken, options)).await;
		assert_eq!(body.matches("Error loading content").count(), 2);
		assert_eq!(*errors.lock().unwrap(), vec!["dynamic-0", "dynamic-1"]);
		assert!(body.ends_with("</body>\n</html>"));
	}

	#[rstest]
	#[case(ResolveStrategy::Sequential)]
	#[case(ResolveStrategy::Concurrent)]
	#[tokio::test]
	async fn test_boundary_missing_from_request_walk_is_settled(#[case] strategy: ResolveStrategy) {
		let build_tree = Node::fragment([
			Node::dynamic(DynamicProps::new("kept").id("kept")),
			Node::dynamic(DynamicProps::new("gone").id("gone")),
		]);
		let shell = Arc::new(
			render_to_static_shell(&build_tree, "/", &ShellConfig::default())
				.await
				.unwrap(),
		);
		let request_tree = Arc::new(Node::dynamic(DynamicProps::new("kept").id("kept")));

		let errors = Arc::new(Mutex::new(Vec::new()));
		let sink = Arc::clone(&errors);
		let options = StreamOptions::default().with_strategy(strategy).with_callbacks(
			StreamCallbacks::new().on_error(move |id, error| {
				sink.lock().unwrap().push((id.to_string(), error.to_string()));
			}),
		);

		let body = collect(generate_ppr_response(shell, request_tree, options)).await;
		assert!(body.contains(".register(['kept','gone'])"));
		assert!(body.contains(
			r#".inject('gone', '<div id="gone" data-ppr-boundary="true" data-ppr-resolved="true"><div class="ppr-error">Error loading content<\/div><\/div>')"#
		));
		assert!(body.find(".inject('gone'").unwrap() < body.find("'ppr:complete'").unwrap());
		assert_eq!(
			*errors.lock().unwrap(),
			vec![(
				"gone".to_string(),
				"boundary 'gone' is in the shell but missing from the request render".to_string()
			)]
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_lifecycle_callbacks_fire_once() {
		let tree = Arc::new(Node::dynamic(DynamicProps::new("x")));
		let shell = Arc::new(
			render_to_static_shell(&tree, "/", &ShellConfig::default())
				.await
				.unwrap(),
		);

		let events = Arc::new(Mutex::new(Vec::new()));
		let (a, b) = (Arc::clone(&events), Arc::clone(&events));
		let options = StreamOptions::default().with_callbacks(
			StreamCallbacks::new()
				.on_shell_sent(move || a.lock().unwrap().push("shell"))
				.on_complete(move || b.lock().unwrap().push("complete")),
		);

		collect(generate_ppr_response(shell, tree, options)).await;
		assert_eq!(*events.lock().unwrap(), vec!["shell", "complete"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_conditional_response_short_circuits() {
		let tree = Arc::new(Node::dynamic(DynamicProps::new("x")));
		let shell = Arc::new(
			render_to_static_shell(&tree, "/", &ShellConfig::default())
				.await
				.unwrap(),
		);
		let etag = shell.etag();

		let response = generate_conditional_response(
			Arc::clone(&shell),
			Arc::clone(&tree),
			StreamOptions::default(),
			Some(&etag),
		);
		assert_eq!(response.status, hyper::StatusCode::NOT_MODIFIED);

		let response = generate_conditional_response(shell, tree, StreamOptions::default(), None);
		assert_eq!(response.status, hyper::StatusCode::OK);
		assert!(collect(response).await.contains(".inject('dynamic-0'"));
	}
}
