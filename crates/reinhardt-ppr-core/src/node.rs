//! Node types for partial prerendering.
//!
//! The `Node` enum is the tree the walker renders. Besides plain elements,
//! text and fragments it carries the two constructs that make a tree
//! prerenderable: components that may suspend, and dynamic boundaries whose
//! content is deferred to request time.
//!
//! ## Example
//!
//! ```ignore
//! use reinhardt_ppr_core::node::{DynamicProps, Node, Suspend};
//!
//! let greeting = Node::component_fn("UserGreeting", |scope| {
//!     let name = scope.cookie("name").unwrap_or("guest").to_string();
//!     Ok(Suspend::ready(format!("Hello, {}", name)))
//! });
//!
//! let tree = Node::element("div")
//!     .child(Node::element("h1").child("Title"))
//!     .child(DynamicProps::new(greeting).fallback("Loading..."))
//!     .into_node();
//! ```

mod util;

pub use util::{
	BOOLEAN_ATTRS, VOID_ELEMENTS, css_property_name, html_escape, is_boolean_attr_truthy,
	is_void_element, normalize_attr_name,
};

use crate::context::Scope;
use crate::error::PprResult;
use futures::future::BoxFuture;
use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

/// Default boundary priority. Higher priorities stream earlier.
pub const DEFAULT_PRIORITY: i32 = 5;

/// A renderable tree unit.
#[derive(Debug, Clone)]
pub enum Node {
	/// Renders nothing. Booleans and `()` convert to this.
	Empty,
	/// Escaped text. Strings and numbers convert to this.
	Text(Cow<'static, str>),
	/// An ordered list of nodes with no wrapper element.
	Fragment(Vec<Node>),
	/// An HTML element.
	Element(Element),
	/// A component that renders to a node, possibly after suspending.
	Component(ComponentNode),
	/// A subtree explicitly deferred to request time.
	Dynamic(DynamicProps),
	/// A suspense-like wrapper; deferred only when its `dynamic` flag is set.
	Suspense(SuspenseProps),
}

impl Node {
	/// Creates an element builder.
	pub fn element(tag: impl Into<Cow<'static, str>>) -> Element {
		Element::new(tag)
	}

	/// Creates a text node.
	pub fn text(content: impl Into<Cow<'static, str>>) -> Self {
		Self::Text(content.into())
	}

	/// Creates a fragment.
	pub fn fragment(children: impl IntoIterator<Item = impl IntoNode>) -> Self {
		Self::Fragment(children.into_iter().map(|c| c.into_node()).collect())
	}

	/// Creates an empty node.
	pub fn empty() -> Self {
		Self::Empty
	}

	/// Wraps a [`Component`] implementation.
	pub fn component(component: impl Component + 'static) -> Self {
		Self::Component(ComponentNode::new(component))
	}

	/// Creates a component from a name and a render closure.
	pub fn component_fn<F>(name: &'static str, render: F) -> Self
	where
		F: Fn(&Scope<'_>) -> PprResult<Suspend> + Send + Sync + 'static,
	{
		Self::component(FnComponent::new(name, render))
	}

	/// Creates an explicit dynamic boundary.
	pub fn dynamic(props: DynamicProps) -> Self {
		Self::Dynamic(props)
	}

	/// Creates a suspense wrapper.
	pub fn suspense(props: DynamicProps, dynamic: bool) -> Self {
		Self::Suspense(SuspenseProps { props, dynamic })
	}
}

/// An attribute value.
#[derive(Clone)]
pub enum AttrValue {
	/// A plain string value, escaped on render.
	Text(Cow<'static, str>),
	/// A boolean attribute: a bare name when `true`, omitted when `false`.
	Bool(bool),
	/// An ordered style map rendered as `prop:value;prop:value`.
	Style(Vec<(Cow<'static, str>, Cow<'static, str>)>),
	/// A function value (event handler). Never rendered.
	Handler(Arc<dyn Fn() + Send + Sync>),
}

impl std::fmt::Debug for AttrValue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Text(v) => f.debug_tuple("Text").field(v).finish(),
			Self::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
			Self::Style(v) => f.debug_tuple("Style").field(v).finish(),
			Self::Handler(_) => f.write_str("Handler(<closure>)"),
		}
	}
}

impl From<&'static str> for AttrValue {
	fn from(value: &'static str) -> Self {
		Self::Text(Cow::Borrowed(value))
	}
}

impl From<String> for AttrValue {
	fn from(value: String) -> Self {
		Self::Text(Cow::Owned(value))
	}
}

impl From<Cow<'static, str>> for AttrValue {
	fn from(value: Cow<'static, str>) -> Self {
		Self::Text(value)
	}
}

impl From<bool> for AttrValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

/// Represents an HTML element in the node tree.
#[derive(Debug, Clone)]
pub struct Element {
	tag: Cow<'static, str>,
	attrs: Vec<(Cow<'static, str>, AttrValue)>,
	children: Vec<Node>,
	is_void: bool,
}

impl Element {
	/// Creates a new element.
	pub fn new(tag: impl Into<Cow<'static, str>>) -> Self {
		let tag = tag.into();
		let is_void = is_void_element(&tag);
		Self {
			tag,
			attrs: Vec::new(),
			children: Vec::new(),
			is_void,
		}
	}

	/// Adds an attribute.
	pub fn attr(mut self, name: impl Into<Cow<'static, str>>, value: impl Into<AttrValue>) -> Self {
		self.attrs.push((name.into(), value.into()));
		self
	}

	/// Adds a boolean attribute.
	pub fn bool_attr(self, name: impl Into<Cow<'static, str>>, value: bool) -> Self {
		self.attr(name, AttrValue::Bool(value))
	}

	/// Adds a `style` attribute from property/value pairs.
	pub fn style<K, V>(mut self, properties: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: Into<Cow<'static, str>>,
		V: Into<Cow<'static, str>>,
	{
		let properties = properties
			.into_iter()
			.map(|(k, v)| (k.into(), v.into()))
			.collect();
		self.attrs
			.push((Cow::Borrowed("style"), AttrValue::Style(properties)));
		self
	}

	/// Attaches an event handler. Handlers are kept on the node but never serialized.
	pub fn on(
		mut self,
		name: impl Into<Cow<'static, str>>,
		handler: impl Fn() + Send + Sync + 'static,
	) -> Self {
		self.attrs
			.push((name.into(), AttrValue::Handler(Arc::new(handler))));
		self
	}

	/// Adds a child node.
	pub fn child(mut self, child: impl IntoNode) -> Self {
		self.children.push(child.into_node());
		self
	}

	/// Adds multiple child nodes.
	pub fn children(mut self, children: impl IntoIterator<Item = impl IntoNode>) -> Self {
		self.children
			.extend(children.into_iter().map(|c| c.into_node()));
		self
	}

	/// Returns the tag name.
	pub fn tag_name(&self) -> &str {
		&self.tag
	}

	/// Returns the attributes in insertion order.
	pub fn attrs(&self) -> &[(Cow<'static, str>, AttrValue)] {
		&self.attrs
	}

	/// Returns the child nodes.
	pub fn child_nodes(&self) -> &[Node] {
		&self.children
	}

	/// Returns whether this is a void element.
	pub fn is_void(&self) -> bool {
		self.is_void
	}
}

/// The outcome of invoking a component.
///
/// A component that can answer immediately returns [`Suspend::Ready`]; one
/// that must wait on data returns [`Suspend::Pending`] with the future that
/// eventually yields its node.
pub enum Suspend {
	/// The component rendered synchronously.
	Ready(Node),
	/// The component is waiting on data.
	Pending(BoxFuture<'static, PprResult<Node>>),
}

impl Suspend {
	/// Creates a ready result.
	pub fn ready(node: impl IntoNode) -> Self {
		Self::Ready(node.into_node())
	}

	/// Creates a pending result from a future.
	pub fn pending<F>(future: F) -> Self
	where
		F: Future<Output = PprResult<Node>> + Send + 'static,
	{
		Self::Pending(Box::pin(future))
	}

	/// Returns `true` if the component suspended.
	pub fn is_pending(&self) -> bool {
		matches!(self, Self::Pending(_))
	}
}

impl std::fmt::Debug for Suspend {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Ready(node) => f.debug_tuple("Ready").field(node).finish(),
			Self::Pending(_) => f.write_str("Pending(<future>)"),
		}
	}
}

/// A renderable component.
///
/// Props are whatever the implementing type captures. The scope exposes the
/// render mode and the per-request data of the current pass.
pub trait Component: Send + Sync {
	/// Renders the component.
	fn render(&self, scope: &Scope<'_>) -> PprResult<Suspend>;

	/// Returns the component name used in errors and logs.
	fn name(&self) -> &str {
		std::any::type_name::<Self>()
	}
}

/// A component backed by a closure.
pub struct FnComponent<F> {
	name: &'static str,
	render: F,
}

impl<F> FnComponent<F>
where
	F: Fn(&Scope<'_>) -> PprResult<Suspend> + Send + Sync,
{
	/// Creates a closure component.
	pub fn new(name: &'static str, render: F) -> Self {
		Self { name, render }
	}
}

impl<F> Component for FnComponent<F>
where
	F: Fn(&Scope<'_>) -> PprResult<Suspend> + Send + Sync,
{
	fn render(&self, scope: &Scope<'_>) -> PprResult<Suspend> {
		(self.render)(scope)
	}

	fn name(&self) -> &str {
		self.name
	}
}

/// A shared handle to a component inside the tree.
#[derive(Clone)]
pub struct ComponentNode(Arc<dyn Component>);

impl ComponentNode {
	/// Wraps a component.
	pub fn new(component: impl Component + 'static) -> Self {
		Self(Arc::new(component))
	}

	/// Returns the component name.
	pub fn name(&self) -> &str {
		self.0.name()
	}

	/// Invokes the component.
	pub fn render(&self, scope: &Scope<'_>) -> PprResult<Suspend> {
		self.0.render(scope)
	}
}

impl std::fmt::Debug for ComponentNode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ComponentNode")
			.field("name", &self.name())
			.finish()
	}
}

/// Per-boundary configuration.
#[derive(Debug, Clone)]
pub struct DynamicProps {
	/// Explicit boundary id. Synthesized from the context counter when absent.
	pub id: Option<String>,
	/// Content shown until the boundary resolves.
	pub fallback: Option<Arc<Node>>,
	/// The deferred subtree.
	pub children: Arc<Node>,
	/// Streaming priority; higher streams earlier.
	pub priority: i32,
	/// Data the boundary depends on, used for shell invalidation.
	pub data_dependencies: Vec<String>,
}

impl DynamicProps {
	/// Creates boundary props around `children` with default priority.
	pub fn new(children: impl IntoNode) -> Self {
		Self {
			id: None,
			fallback: None,
			children: Arc::new(children.into_node()),
			priority: DEFAULT_PRIORITY,
			data_dependencies: Vec::new(),
		}
	}

	/// Sets an explicit id.
	pub fn id(mut self, id: impl Into<String>) -> Self {
		self.id = Some(id.into());
		self
	}

	/// Sets the fallback content.
	pub fn fallback(mut self, fallback: impl IntoNode) -> Self {
		self.fallback = Some(Arc::new(fallback.into_node()));
		self
	}

	/// Sets the streaming priority.
	pub fn priority(mut self, priority: i32) -> Self {
		self.priority = priority;
		self
	}

	/// Declares one data dependency.
	pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
		self.data_dependencies.push(dependency.into());
		self
	}

	/// Declares several data dependencies.
	pub fn data_dependencies(
		mut self,
		dependencies: impl IntoIterator<Item = impl Into<String>>,
	) -> Self {
		self.data_dependencies
			.extend(dependencies.into_iter().map(Into::into));
		self
	}
}

/// A suspense-like wrapper.
#[derive(Debug, Clone)]
pub struct SuspenseProps {
	/// Boundary configuration used when the wrapper is dynamic.
	pub props: DynamicProps,
	/// When `false` the children render inline.
	pub dynamic: bool,
}

/// Trait for types that can be converted into a [`Node`].
pub trait IntoNode {
	/// Converts self into a node.
	fn into_node(self) -> Node;
}

impl IntoNode for Node {
	fn into_node(self) -> Node {
		self
	}
}

impl IntoNode for Element {
	fn into_node(self) -> Node {
		Node::Element(self)
	}
}

impl IntoNode for DynamicProps {
	fn into_node(self) -> Node {
		Node::Dynamic(self)
	}
}

impl IntoNode for String {
	fn into_node(self) -> Node {
		Node::Text(Cow::Owned(self))
	}
}

impl IntoNode for &String {
	fn into_node(self) -> Node {
		Node::Text(Cow::Owned(self.clone()))
	}
}

impl IntoNode for &'static str {
	fn into_node(self) -> Node {
		Node::Text(Cow::Borrowed(self))
	}
}

impl IntoNode for Cow<'static, str> {
	fn into_node(self) -> Node {
		Node::Text(self)
	}
}

impl IntoNode for bool {
	fn into_node(self) -> Node {
		Node::Empty
	}
}

impl IntoNode for () {
	fn into_node(self) -> Node {
		Node::Empty
	}
}

macro_rules! impl_into_node_for_number {
	($($ty:ty),*) => {
		$(
			impl IntoNode for $ty {
				fn into_node(self) -> Node {
					Node::Text(Cow::Owned(self.to_string()))
				}
			}
		)*
	};
}

impl_into_node_for_number!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl<T: IntoNode> IntoNode for Option<T> {
	fn into_node(self) -> Node {
		match self {
			Some(v) => v.into_node(),
			None => Node::Empty,
		}
	}
}

impl<T: IntoNode> IntoNode for Vec<T> {
	fn into_node(self) -> Node {
		Node::Fragment(self.into_iter().map(|v| v.into_node()).collect())
	}
}

impl<A: IntoNode, B: IntoNode> IntoNode for (A, B) {
	fn into_node(self) -> Node {
		Node::Fragment(vec![self.0.into_node(), self.1.into_node()])
	}
}

impl<A: IntoNode, B: IntoNode, C: IntoNode> IntoNode for (A, B, C) {
	fn into_node(self) -> Node {
		Node::Fragment(vec![
			self.0.into_node(),
			self.1.into_node(),
			self.2.into_node(),
		])
	}
}
