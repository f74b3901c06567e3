//! Per-render boundary registry.
//!
//! A [`PprContext`] is created for exactly one render pass and dropped
//! afterwards. It owns the render mode, the boundary id counter, the ordered
//! map of discovered boundaries and the re-entrancy flag that keeps a boundary
//! from registering another boundary while its own content is rendering.

use crate::error::PprResult;
use crate::markers::{self, BoundaryMarkers};
use crate::node::{ComponentNode, DynamicProps, Node};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Which of the two passes a render belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
	/// Ahead-of-time pass producing the static shell.
	Build,
	/// Per-request pass producing boundary content.
	Request,
}

impl std::fmt::Display for RenderMode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Build => f.write_str("build"),
			Self::Request => f.write_str("request"),
		}
	}
}

/// What introduced a boundary into the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryKind {
	/// An explicit `Dynamic` node.
	Dynamic,
	/// A `Suspense` wrapper with its dynamic flag set.
	Suspense,
	/// A component that suspended outside any boundary.
	Component,
}

impl std::fmt::Display for BoundaryKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Dynamic => f.write_str("dynamic"),
			Self::Suspense => f.write_str("suspense"),
			Self::Component => f.write_str("component"),
		}
	}
}

/// Request-scoped values visible to components during the request pass.
///
/// Header names are stored lowercased, so lookups are case-insensitive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestData {
	/// Request headers.
	#[serde(default)]
	pub headers: HashMap<String, String>,
	/// Request cookies.
	#[serde(default)]
	pub cookies: HashMap<String, String>,
	/// Route and query parameters.
	#[serde(default)]
	pub params: HashMap<String, String>,
	/// Arbitrary application values.
	#[serde(default)]
	pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RequestData {
	/// Creates empty request data.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a header.
	pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.headers
			.insert(name.as_ref().to_ascii_lowercase(), value.into());
		self
	}

	/// Adds a cookie.
	pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.cookies.insert(name.into(), value.into());
		self
	}

	/// Adds a parameter.
	pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.params.insert(name.into(), value.into());
		self
	}

	/// Adds an application value.
	pub fn extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
		self.extra.insert(key.into(), value.into());
		self
	}
}

/// A boundary discovered during a render pass.
#[derive(Debug, Clone)]
pub struct DynamicBoundary {
	/// Unique id within the pass.
	pub id: String,
	/// Content shown until the boundary resolves.
	pub fallback: Option<Arc<Node>>,
	/// The deferred subtree.
	pub content: Arc<Node>,
	/// Streaming priority; higher streams earlier.
	pub priority: i32,
	/// Declared data dependencies.
	pub data_dependencies: Vec<String>,
	/// What introduced the boundary.
	pub kind: BoundaryKind,
}

/// Result of registering a boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
	/// The assigned id.
	pub id: String,
	/// Marker tokens for the id.
	pub markers: BoundaryMarkers,
}

/// Read-only view of the current pass handed to components.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
	mode: RenderMode,
	request: Option<&'a RequestData>,
}

impl<'a> Scope<'a> {
	/// Creates a scope.
	pub fn new(mode: RenderMode, request: Option<&'a RequestData>) -> Self {
		Self { mode, request }
	}

	/// Returns the render mode.
	pub fn mode(&self) -> RenderMode {
		self.mode
	}

	/// Returns `true` during the build pass.
	pub fn is_build(&self) -> bool {
		self.mode == RenderMode::Build
	}

	/// Returns the request data, if any.
	pub fn request(&self) -> Option<&'a RequestData> {
		self.request
	}

	/// Looks up a header, case-insensitively.
	pub fn header(&self, name: &str) -> Option<&'a str> {
		let request = self.request?;
		request
			.headers
			.get(&name.to_ascii_lowercase())
			.map(String::as_str)
	}

	/// Looks up a cookie.
	pub fn cookie(&self, name: &str) -> Option<&'a str> {
		self.request?.cookies.get(name).map(String::as_str)
	}

	/// Looks up a parameter.
	pub fn param(&self, name: &str) -> Option<&'a str> {
		self.request?.params.get(name).map(String::as_str)
	}

	/// Looks up an application value.
	pub fn extra(&self, key: &str) -> Option<&'a serde_json::Value> {
		self.request?.extra.get(key)
	}
}

/// Boundary registry and state for one render pass.
#[derive(Debug)]
pub struct PprContext {
	mode: RenderMode,
	boundaries: IndexMap<String, DynamicBoundary>,
	boundary_counter: usize,
	inside_dynamic_boundary: bool,
	discovery_only: bool,
	request_data: Option<Arc<RequestData>>,
	placeholder_prefix: String,
}

impl PprContext {
	/// Creates a context for `mode`.
	pub fn new(mode: RenderMode) -> Self {
		Self {
			mode,
			boundaries: IndexMap::new(),
			boundary_counter: 0,
			inside_dynamic_boundary: false,
			discovery_only: false,
			request_data: None,
			placeholder_prefix: String::new(),
		}
	}

	/// Creates a build-mode context.
	pub fn build() -> Self {
		Self::new(RenderMode::Build)
	}

	/// Creates a request-mode context carrying `request_data`.
	pub fn request(request_data: Option<Arc<RequestData>>) -> Self {
		let mut ctx = Self::new(RenderMode::Request);
		ctx.request_data = request_data;
		ctx
	}

	/// Sets the prefix used for synthesized ids.
	pub fn with_placeholder_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.placeholder_prefix = prefix.into();
		self
	}

	/// Switches the context to discovery: boundaries are registered but
	/// their bodies are neither rendered nor emitted.
	pub fn discovery(mut self) -> Self {
		self.discovery_only = true;
		self
	}

	/// Creates a child context for rendering one boundary in isolation.
	///
	/// The child shares mode, request data and prefix but starts with an
	/// empty registry.
	pub fn fork(&self) -> Self {
		Self {
			mode: self.mode,
			boundaries: IndexMap::new(),
			boundary_counter: 0,
			inside_dynamic_boundary: self.inside_dynamic_boundary,
			discovery_only: false,
			request_data: self.request_data.clone(),
			placeholder_prefix: self.placeholder_prefix.clone(),
		}
	}

	/// Returns the render mode.
	pub fn mode(&self) -> RenderMode {
		self.mode
	}

	/// Returns the id prefix.
	pub fn placeholder_prefix(&self) -> &str {
		&self.placeholder_prefix
	}

	/// Returns the request data, if any.
	pub fn request_data(&self) -> Option<&RequestData> {
		self.request_data.as_deref()
	}

	/// Returns `true` while boundary content is rendering.
	pub fn inside_dynamic_boundary(&self) -> bool {
		self.inside_dynamic_boundary
	}

	/// Sets the re-entrancy flag and returns its previous value.
	pub fn set_inside_dynamic_boundary(&mut self, inside: bool) -> bool {
		std::mem::replace(&mut self.inside_dynamic_boundary, inside)
	}

	/// Returns `true` in discovery mode.
	pub fn is_discovery_only(&self) -> bool {
		self.discovery_only
	}

	/// Returns the component scope for this pass.
	pub fn scope(&self) -> Scope<'_> {
		Scope::new(self.mode, self.request_data.as_deref())
	}

	/// Registers a boundary and returns its id and markers.
	///
	/// The id is `props.id` when set, otherwise `{prefix}dynamic-{n}` from the
	/// counter. Registering an id twice keeps the later boundary.
	///
	/// # Errors
	///
	/// Returns [`PprError::InvalidBoundaryId`](crate::PprError::InvalidBoundaryId)
	/// when the id cannot be embedded in markers or attributes.
	pub fn register_dynamic_boundary(
		&mut self,
		props: &DynamicProps,
		kind: BoundaryKind,
	) -> PprResult<Registration> {
		let id = match &props.id {
			Some(id) => id.clone(),
			None => {
				let id = format!("{}dynamic-{}", self.placeholder_prefix, self.boundary_counter);
				self.boundary_counter += 1;
				id
			}
		};
		markers::validate_id(&id)?;

		let boundary = DynamicBoundary {
			id: id.clone(),
			fallback: props.fallback.clone(),
			content: Arc::clone(&props.children),
			priority: props.priority,
			data_dependencies: props.data_dependencies.clone(),
			kind,
		};

		if self.boundaries.insert(id.clone(), boundary).is_some() {
			tracing::warn!(boundary_id = %id, "duplicate boundary id, keeping the latest registration");
		} else {
			tracing::debug!(boundary_id = %id, %kind, mode = %self.mode, "registered dynamic boundary");
		}

		Ok(Registration {
			markers: BoundaryMarkers::new(&id),
			id,
		})
	}

	/// Registers a suspending component as an implicit boundary.
	pub fn register_component_boundary(
		&mut self,
		component: &ComponentNode,
	) -> PprResult<Registration> {
		let props = DynamicProps::new(Node::Component(component.clone()));
		self.register_dynamic_boundary(&props, BoundaryKind::Component)
	}

	/// Returns the discovered boundaries in discovery order.
	pub fn boundaries(&self) -> &IndexMap<String, DynamicBoundary> {
		&self.boundaries
	}

	/// Looks up a boundary by id.
	pub fn boundary(&self, id: &str) -> Option<&DynamicBoundary> {
		self.boundaries.get(id)
	}

	/// Consumes the context and returns its boundaries.
	pub fn into_boundaries(self) -> IndexMap<String, DynamicBoundary> {
		self.boundaries
	}
}
