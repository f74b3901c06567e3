//! Reinhardt PPR Streaming - out-of-order HTML streaming for prerendered shells
//!
//! A cached [`StaticShell`](reinhardt_ppr_shell::StaticShell) is sent to the
//! client immediately, fallbacks included. Dynamic boundaries are then
//! rendered on the server and streamed as small inline scripts that swap each
//! fallback for its resolved content.
//!
//! ## Architecture
//!
//! - [`stream`]: [`generate_ppr_response`], the producer task and scheduling
//! - [`runtime`]: the `window.__REINHARDT_PPR__` client runtime and scripts
//! - [`document`]: document preamble and the non-streaming fallback
//! - [`response`]: [`StreamingResponse`] and the `304` helper
//!
//! ## Example
//!
//! ```ignore
//! use reinhardt_ppr_streaming::{StreamOptions, generate_ppr_response};
//!
//! let shell = cache.get_or_build("/", &tree, &ShellConfig::default()).await?;
//! let options = StreamOptions::from_settings(&settings).with_request_data(request_data);
//! let response = generate_ppr_response(shell, Arc::new(tree), options);
//! ```

#![warn(missing_docs)]

pub mod document;
pub mod response;
pub mod runtime;
pub mod stream;

pub use document::{document_close, render_complete_document, render_preamble};
pub use response::{BOUNDARY_COUNT_HEADER, PprBody, PprResponse, StreamingResponse, not_modified};
pub use runtime::{
	COMPLETE_EVENT, RESOLVED_EVENT, RUNTIME_GLOBAL, RUNTIME_SCRIPT, complete_script,
	escape_js_string, inject_script, pending_script,
};
pub use stream::{
	StreamCallbacks, StreamOptions, generate_conditional_response, generate_ppr_response,
};
