//! Node tree, boundary registry and the dual-mode walker
//!
//! This module provides access to reinhardt-ppr-core: the [`Node`] tree,
//! the comment markers that delimit boundaries, the per-pass
//! [`PprContext`] and [`render_with_ppr`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use reinhardt_ppr::core::{DynamicProps, Node, PprContext, render_with_ppr};
//!
//! let tree = Node::element("main")
//!     .child(DynamicProps::new(cart_summary()).fallback("Loading cart..."))
//!     .into_node();
//!
//! let mut ctx = PprContext::build();
//! let html = render_with_ppr(&tree, &mut ctx).await?;
//! ```

// Re-export all reinhardt-ppr-core functionality
pub use reinhardt_ppr_core::*;
