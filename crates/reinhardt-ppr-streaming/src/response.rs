//! Streaming HTTP response types.

use bytes::Bytes;
use futures::stream::{self, Stream};
use hyper::header::{CONTENT_TYPE, ETAG, HeaderName, HeaderValue};
use hyper::{HeaderMap, StatusCode};
use reinhardt_ppr_core::PprError;
use reinhardt_ppr_shell::StaticShell;
use std::pin::Pin;

/// Header carrying the number of boundaries in the shell.
pub const BOUNDARY_COUNT_HEADER: &str = "x-ppr-boundaries";

/// Streaming HTTP response.
pub struct StreamingResponse<S> {
	/// Response status
	pub status: StatusCode,
	/// Response headers
	pub headers: HeaderMap,
	/// Body chunks
	pub stream: S,
}

/// Body of a partial prerendering response.
pub type PprBody = Pin<Box<dyn Stream<Item = Result<Bytes, PprError>> + Send>>;

/// A streamed partial prerendering response.
pub type PprResponse = StreamingResponse<PprBody>;

impl<S> StreamingResponse<S>
where
	S: Stream<Item = Result<Bytes, PprError>> + Send + 'static,
{
	/// Create a new streaming response with OK status
	pub fn new(stream: S) -> Self {
		Self {
			status: StatusCode::OK,
			headers: HeaderMap::new(),
			stream,
		}
	}

	/// Create a streaming response with a specific status code
	pub fn with_status(stream: S, status: StatusCode) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
			stream,
		}
	}

	/// Set the status code
	pub fn status(mut self, status: StatusCode) -> Self {
		self.status = status;
		self
	}

	/// Add a header to the streaming response
	pub fn header(mut self, key: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(key, value);
		self
	}

	/// Set the Content-Type header (media type)
	pub fn media_type(self, media_type: &str) -> Self {
		self.header(
			CONTENT_TYPE,
			HeaderValue::from_str(media_type)
				.unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
		)
	}

	/// Sets the ETag and boundary count headers from `shell`.
	pub fn shell_headers(self, shell: &StaticShell) -> Self {
		let mut response = self.header(
			HeaderName::from_static(BOUNDARY_COUNT_HEADER),
			HeaderValue::from(shell.boundaries.len()),
		);
		if let Ok(etag) = HeaderValue::from_str(&shell.etag()) {
			response = response.header(ETAG, etag);
		}
		response
	}
}

impl<S> StreamingResponse<S> {
	/// Consume the response and return the underlying stream
	pub fn into_stream(self) -> S {
		self.stream
	}
}

impl<S> std::fmt::Debug for StreamingResponse<S> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StreamingResponse")
			.field("status", &self.status)
			.field("headers", &self.headers)
			.finish_non_exhaustive()
	}
}

/// Builds a `304 Not Modified` response for `shell` with an empty body.
pub fn not_modified(shell: &StaticShell) -> PprResponse {
	let body: PprBody = Box::pin(stream::empty());
	StreamingResponse::with_status(body, StatusCode::NOT_MODIFIED).shell_headers(shell)
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::StreamExt;
	use reinhardt_ppr_core::{DynamicProps, Node};
	use reinhardt_ppr_shell::{ShellConfig, render_to_static_shell};
	use rstest::rstest;

	#[rstest]
	#[tokio::test]
	async fn test_builder_methods() {
		let body: PprBody = Box::pin(stream::iter(vec![Ok(Bytes::from("chunk"))]));
		let response = StreamingResponse::new(body)
			.status(StatusCode::ACCEPTED)
			.media_type("text/html; charset=utf-8");
		assert_eq!(response.status, StatusCode::ACCEPTED);
		assert_eq!(
			response.headers.get(CONTENT_TYPE).unwrap(),
			"text/html; charset=utf-8"
		);
		let chunks: Vec<_> = response.into_stream().collect().await;
		assert_eq!(chunks.len(), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_not_modified_has_validators_and_empty_body() {
		let tree = Node::fragment([
			Node::dynamic(DynamicProps::new("a")),
			Node::dynamic(DynamicProps::new("b")),
		]);
		let shell = render_to_static_shell(&tree, "/", &ShellConfig::default())
			.await
			.unwrap();

		let response = not_modified(&shell);
		assert_eq!(response.status, StatusCode::NOT_MODIFIED);
		assert_eq!(response.headers.get(ETAG).unwrap(), shell.etag().as_str());
		assert_eq!(response.headers.get(BOUNDARY_COUNT_HEADER).unwrap(), "2");
		assert!(response.into_stream().next().await.is_none());
	}
}
