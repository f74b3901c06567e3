//! Reinhardt PPR Shell - static shells and request-time resolution
//!
//! This crate turns a node tree into an immutable [`StaticShell`] once, then
//! resolves the shell's dynamic boundaries for each request.
//!
//! ## Architecture
//!
//! - [`builder`]: [`render_to_static_shell`] and asset scanning
//! - [`resolver`]: [`render_dynamic_content`] and [`render_all_dynamic_content`]
//! - [`inject`]: non-streaming splicing of resolutions into shell HTML
//! - [`cache`]: [`ShellCache`], per-route shell storage with invalidation
//! - [`shell`]: the shell and boundary metadata types
//!
//! ## Example
//!
//! ```ignore
//! use reinhardt_ppr_shell::{ShellConfig, inject_dynamic_content, render_all_dynamic_content, render_to_static_shell};
//!
//! let shell = render_to_static_shell(&tree, "/", &ShellConfig::default()).await?;
//! let resolutions = render_all_dynamic_content(&shell, Some(request_data), &tree).await?;
//! let html = inject_dynamic_content(&shell, &resolutions);
//! ```

#![warn(missing_docs)]

pub mod builder;
pub mod cache;
pub mod inject;
pub mod resolver;
pub mod shell;

pub use builder::{ShellConfig, extract_assets, render_to_static_shell};
pub use cache::{CacheStatistics, ShellCache};
pub use inject::{inject_dynamic_content, inject_resolutions, replace_markers_with_fallbacks};
pub use resolver::{
	BoundaryResolution, discover_boundaries, render_all_dynamic_content, render_dynamic_content,
};
pub use shell::{DynamicBoundaryMetadata, ShellAssets, StaticShell, is_not_modified};
