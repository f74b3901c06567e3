//! Textual boundary markers.
//!
//! A shell is a plain HTML string; boundaries are located inside it by four
//! comment tokens keyed by boundary id. Every token ends with `-->`, so the
//! token for `dynamic-1` never matches inside the token for `dynamic-10`, and
//! none of them contain whitespace.

use crate::error::{PprError, PprResult};
use sha2::{Digest, Sha256};

/// Attribute placed on every boundary wrapper element.
pub const BOUNDARY_ATTR: &str = "data-ppr-boundary";

/// Attribute placed on a boundary wrapper once its content is resolved.
pub const RESOLVED_ATTR: &str = "data-ppr-resolved";

/// Fallback used when a boundary declares none.
pub const LOADING_PLACEHOLDER: &str = r#"<div class="ppr-loading">Loading...</div>"#;

/// Fragment shown in place of a boundary that failed or timed out.
pub const ERROR_FRAGMENT: &str = r#"<div class="ppr-error">Error loading content</div>"#;

/// Characters that would break out of an attribute value, a comment token or
/// a quoted script argument.
const FORBIDDEN_ID_CHARS: &[char] = &['"', '\'', '<', '>', '&', '\\'];

/// Checks that `id` can be embedded verbatim in markers, the wrapper's `id`
/// attribute and runtime scripts.
///
/// # Errors
///
/// Returns [`PprError::InvalidBoundaryId`] for an empty id, or one containing
/// whitespace, `-->`, quotes, `<`, `>`, `&` or a backslash.
pub fn validate_id(id: &str) -> PprResult<()> {
	let reason = if id.is_empty() {
		"must not be empty"
	} else if id.contains(char::is_whitespace) {
		"contains whitespace"
	} else if id.contains("-->") {
		"contains '-->'"
	} else if id.contains(FORBIDDEN_ID_CHARS) {
		"contains a quote, '<', '>', '&' or a backslash"
	} else {
		return Ok(());
	};
	Err(PprError::InvalidBoundaryId {
		id: id.to_string(),
		reason,
	})
}

/// Returns the start marker for `id`.
pub fn start(id: &str) -> String {
	format!("<!--ppr:start:{}-->", id)
}

/// Returns the end marker for `id`.
pub fn end(id: &str) -> String {
	format!("<!--ppr:end:{}-->", id)
}

/// Returns the fallback start marker for `id`.
pub fn fallback_start(id: &str) -> String {
	format!("<!--ppr:fallback-start:{}-->", id)
}

/// Returns the fallback end marker for `id`.
pub fn fallback_end(id: &str) -> String {
	format!("<!--ppr:fallback-end:{}-->", id)
}

/// Returns the lowercase hex SHA-256 digest of `html`.
pub fn hash_content(html: &str) -> String {
	let mut hasher = Sha256::new();
	hasher.update(html.as_bytes());
	hex::encode(hasher.finalize())
}

/// Wraps boundary content in its identifying `div`.
///
/// With `resolved` set the wrapper also carries `data-ppr-resolved="true"`,
/// the form used for request-time output and injected content.
pub fn wrap_boundary(id: &str, inner: &str, resolved: bool) -> String {
	let mut out = String::with_capacity(inner.len() + id.len() + 64);
	out.push_str("<div id=\"");
	out.push_str(id);
	out.push_str("\" ");
	out.push_str(BOUNDARY_ATTR);
	out.push_str("=\"true\"");
	if resolved {
		out.push(' ');
		out.push_str(RESOLVED_ATTR);
		out.push_str("=\"true\"");
	}
	out.push('>');
	out.push_str(inner);
	out.push_str("</div>");
	out
}

/// The four marker tokens of a single boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryMarkers {
	/// `<!--ppr:start:{id}-->`
	pub start: String,
	/// `<!--ppr:end:{id}-->`
	pub end: String,
	/// `<!--ppr:fallback-start:{id}-->`
	pub fallback_start: String,
	/// `<!--ppr:fallback-end:{id}-->`
	pub fallback_end: String,
}

impl BoundaryMarkers {
	/// Builds all four markers for `id`.
	pub fn new(id: &str) -> Self {
		Self {
			start: start(id),
			end: end(id),
			fallback_start: fallback_start(id),
			fallback_end: fallback_end(id),
		}
	}

	/// Returns the byte range `start..end` of the marked region in `html`,
	/// including both outer markers.
	///
	/// `None` when either marker is missing or the end marker precedes the
	/// start marker.
	pub fn locate(&self, html: &str) -> Option<std::ops::Range<usize>> {
		let start = html.find(&self.start)?;
		let end = start + html[start..].find(&self.end)?;
		Some(start..end + self.end.len())
	}
}
