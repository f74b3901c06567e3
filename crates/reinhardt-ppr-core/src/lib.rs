//! Reinhardt PPR Core - node tree, markers and the dual-mode walker
//!
//! Partial prerendering renders one tree twice. The build pass produces a
//! static shell in which every dynamic boundary is replaced by its fallback
//! between comment markers. The request pass walks the same tree again and
//! produces the real content of each boundary, matched to the shell purely
//! by boundary id.
//!
//! ## Architecture
//!
//! - [`node`]: the [`Node`] tree, components and boundary props
//! - [`markers`]: comment tokens delimiting boundaries inside shell HTML
//! - [`context`]: the per-pass boundary registry ([`PprContext`])
//! - [`walker`]: [`render_with_ppr`], the async renderer for both passes
//! - [`settings`]: TOML-backed [`PprSettings`]
//!
//! ## Example
//!
//! ```ignore
//! use reinhardt_ppr_core::{DynamicProps, Node, PprContext, render_with_ppr};
//!
//! let tree = Node::element("main")
//!     .child(Node::element("h1").child("Dashboard"))
//!     .child(DynamicProps::new(user_panel()).fallback("Loading..."))
//!     .into_node();
//!
//! let mut ctx = PprContext::build();
//! let shell_html = render_with_ppr(&tree, &mut ctx).await?;
//! assert_eq!(ctx.boundaries().len(), 1);
//! ```

#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod markers;
pub mod node;
pub mod settings;
pub mod walker;

pub use context::{
	BoundaryKind, DynamicBoundary, PprContext, Registration, RenderMode, RequestData, Scope,
};
pub use error::{PprError, PprResult};
pub use markers::{BoundaryMarkers, ERROR_FRAGMENT, LOADING_PLACEHOLDER, hash_content};
pub use node::{
	AttrValue, Component, ComponentNode, DEFAULT_PRIORITY, DynamicProps, Element, FnComponent,
	IntoNode, Node, Suspend, SuspenseProps,
};
pub use settings::{DEFAULT_TIMEOUT_MS, PprSettings, ResolveStrategy};
pub use walker::{render_isolated, render_with_ppr};
