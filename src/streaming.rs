//! Streamed responses with out-of-order boundary injection
//!
//! This module provides access to reinhardt-ppr-streaming.
//!
//! ## Example
//!
//! ```rust,ignore
//! use reinhardt_ppr::streaming::{StreamOptions, generate_ppr_response};
//!
//! let response = generate_ppr_response(shell, Arc::new(tree), StreamOptions::default());
//! ```

// Re-export all reinhardt-ppr-streaming functionality
pub use reinhardt_ppr_streaming::*;
