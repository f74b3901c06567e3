//! # Reinhardt PPR
//!
//! Partial prerendering for Reinhardt: serve a cached static shell instantly,
//! then stream the request-specific parts of the page into it.
//!
//! A page is described once as a [`Node`] tree. Subtrees that depend on the
//! request are wrapped in dynamic boundaries. Building the tree produces a
//! [`StaticShell`] in which each boundary shows its fallback between comment
//! markers. Serving a request sends that shell straight away and then emits
//! one inline script per boundary, highest priority first, replacing the
//! fallback with freshly rendered HTML.
//!
//! ## Crates
//!
//! - [`core`]: node tree, markers, boundary registry, walker and settings
//! - [`shell`]: shell builder, resolver, non-streaming injection, shell cache
//! - [`streaming`]: streamed responses and the client runtime
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use reinhardt_ppr::prelude::*;
//!
//! fn page() -> Node {
//!     Node::element("main")
//!         .child(Node::element("h1").child("Dashboard"))
//!         .child(
//!             DynamicProps::new(Node::component_fn("Orders", |scope| {
//!                 let user = scope.cookie("user").unwrap_or("guest").to_string();
//!                 Ok(Suspend::pending(async move { load_orders(user).await }))
//!             }))
//!             .fallback("Loading orders...")
//!             .priority(10)
//!             .depends_on("orders"),
//!         )
//!         .into_node()
//! }
//!
//! let settings = PprSettings::from_toml_file("ppr.toml")?;
//! let cache = ShellCache::from_settings(&settings);
//! let tree = Arc::new(page());
//!
//! let shell = cache.get_or_build("/dashboard", &tree, &ShellConfig::from(&settings)).await?;
//! let options = StreamOptions::from_settings(&settings).with_request_data(request_data);
//! let response = generate_ppr_response(shell, tree, options);
//! ```

pub mod core;
pub mod shell;
pub mod streaming;

pub use reinhardt_ppr_core::{
	DynamicProps, IntoNode, Node, PprContext, PprError, PprResult, PprSettings, RenderMode,
	RequestData, ResolveStrategy, Suspend, render_with_ppr,
};
pub use reinhardt_ppr_shell::{
	BoundaryResolution, ShellCache, ShellConfig, StaticShell, inject_dynamic_content,
	render_all_dynamic_content, render_dynamic_content, render_to_static_shell,
};
pub use reinhardt_ppr_streaming::{
	PprResponse, StreamCallbacks, StreamOptions, generate_conditional_response,
	generate_ppr_response,
};

/// Prelude module for convenient imports
pub mod prelude {
	pub use crate::{
		BoundaryResolution, DynamicProps, IntoNode, Node, PprContext, PprError, PprResult,
		PprResponse, PprSettings, RenderMode, RequestData, ResolveStrategy, ShellCache,
		ShellConfig, StaticShell, StreamCallbacks, StreamOptions, Suspend,
		generate_conditional_response, generate_ppr_response, inject_dynamic_content,
		render_all_dynamic_content, render_dynamic_content, render_to_static_shell,
		render_with_ppr,
	};
	pub use std::sync::Arc;
}
