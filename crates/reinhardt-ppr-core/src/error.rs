//! Error types for partial prerendering.

use thiserror::Error;

/// Result type for PPR operations.
pub type PprResult<T> = Result<T, PprError>;

/// Errors raised while building shells, resolving boundaries or streaming responses.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PprError {
	/// A component failed while rendering.
	#[error("component '{component}' failed to render: {message}")]
	Component {
		/// Component name.
		component: String,
		/// Failure description.
		message: String,
	},

	/// A boundary did not resolve before its deadline.
	#[error("boundary '{id}' timed out after {timeout_ms}ms")]
	Timeout {
		/// Boundary id.
		id: String,
		/// Deadline that elapsed, in milliseconds.
		timeout_ms: u64,
	},

	/// A shell boundary was not found again when the page was re-walked for a
	/// request.
	#[error("boundary '{id}' is in the shell but missing from the request render")]
	MissingBoundary {
		/// Boundary id.
		id: String,
	},

	/// A boundary id cannot be embedded in markers or attributes.
	#[error("invalid boundary id '{id}': {reason}")]
	InvalidBoundaryId {
		/// The rejected id.
		id: String,
		/// What makes it unusable.
		reason: &'static str,
	},

	/// Static shell generation aborted.
	#[error("failed to build static shell for '{path}': {source}")]
	ShellBuild {
		/// Route path of the shell.
		path: String,
		/// The error that aborted the build.
		#[source]
		source: Box<PprError>,
	},

	/// JSON (de)serialization error.
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	/// TOML settings could not be parsed.
	#[error("settings parse error: {0}")]
	Settings(#[from] toml::de::Error),

	/// Settings parsed but failed validation.
	#[error("invalid settings: {0}")]
	InvalidSettings(String),

	/// IO error.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	/// The receiving end of a response stream went away.
	#[error("response stream closed by the receiver")]
	StreamClosed,
}

impl PprError {
	/// Creates a component render error.
	pub fn component(component: impl Into<String>, message: impl Into<String>) -> Self {
		Self::Component {
			component: component.into(),
			message: message.into(),
		}
	}

	/// Returns `true` if this error is a boundary timeout.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Timeout { .. })
	}
}
