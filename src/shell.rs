//! Static shells, request-time resolution and the shell cache
//!
//! This module provides access to reinhardt-ppr-shell.
//!
//! ## Example
//!
//! ```rust,ignore
//! use reinhardt_ppr::shell::{ShellCache, ShellConfig};
//!
//! let cache = ShellCache::new();
//! let shell = cache.get_or_build("/", &tree, &ShellConfig::default()).await?;
//! ```

// Re-export all reinhardt-ppr-shell functionality
pub use reinhardt_ppr_shell::*;
