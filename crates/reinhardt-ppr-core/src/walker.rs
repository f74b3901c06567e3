//! Dual-mode tree walker.
//!
//! [`render_with_ppr`] turns a [`Node`] tree into HTML. Plain nodes render the
//! same in both modes. Dynamic boundaries and components that suspend outside
//! a boundary branch on the context mode:
//!
//! - `Build` emits the boundary's fallback between markers.
//! - `Request` renders the boundary's real content inside a resolved wrapper.
//!
//! Fragment children are awaited one after another, so boundary ids are
//! assigned in tree pre-order and both passes discover the same id sequence.

use crate::context::{BoundaryKind, PprContext, Registration, RenderMode};
use crate::error::{PprError, PprResult};
use crate::markers::{LOADING_PLACEHOLDER, wrap_boundary};
use crate::node::{
	AttrValue, BOOLEAN_ATTRS, ComponentNode, DynamicProps, Element, Node, Suspend,
	css_property_name, html_escape, is_boolean_attr_truthy, normalize_attr_name,
};
use futures::future::BoxFuture;

/// Renders `node` to HTML under the rules of `ctx`'s mode.
///
/// Boundaries discovered along the way are registered in `ctx` in
/// pre-order. Component errors abort the walk.
pub fn render_with_ppr<'a>(
	node: &'a Node,
	ctx: &'a mut PprContext,
) -> BoxFuture<'a, PprResult<String>> {
	Box::pin(async move {
		let mut out = String::new();
		render_into(node, ctx, &mut out).await?;
		Ok(out)
	})
}

/// Renders `node` inline in a child of `ctx`, as if inside a boundary.
///
/// Nothing is registered in `ctx`. Used for fallbacks and for content that
/// must not defer again.
pub async fn render_isolated(node: &Node, ctx: &PprContext) -> PprResult<String> {
	let mut scratch = ctx.fork();
	scratch.set_inside_dynamic_boundary(true);
	render_with_ppr(node, &mut scratch).await
}

fn render_into<'a>(
	node: &'a Node,
	ctx: &'a mut PprContext,
	out: &'a mut String,
) -> BoxFuture<'a, PprResult<()>> {
	Box::pin(async move {
		match node {
			Node::Empty => {}
			Node::Text(text) => out.push_str(&html_escape(text)),
			Node::Fragment(children) => {
				for child in children {
					render_into(child, ctx, out).await?;
				}
			}
			Node::Element(el) => render_element(el, ctx, out).await?,
			Node::Dynamic(props) => {
				render_boundary(props, BoundaryKind::Dynamic, ctx, out).await?;
			}
			Node::Suspense(suspense) if suspense.dynamic => {
				render_boundary(&suspense.props, BoundaryKind::Suspense, ctx, out).await?;
			}
			Node::Suspense(suspense) => {
				render_into(&suspense.props.children, ctx, out).await?;
			}
			Node::Component(component) => render_component(component, ctx, out).await?,
		}
		Ok(())
	})
}

async fn render_element(el: &Element, ctx: &mut PprContext, out: &mut String) -> PprResult<()> {
	out.push('<');
	out.push_str(el.tag_name());

	for (name, value) in el.attrs() {
		write_attr(name, value, out);
	}

	if el.is_void() {
		out.push_str(" />");
		return Ok(());
	}

	out.push('>');
	for child in el.child_nodes() {
		render_into(child, ctx, out).await?;
	}
	out.push_str("</");
	out.push_str(el.tag_name());
	out.push('>');
	Ok(())
}

fn write_attr(name: &str, value: &AttrValue, out: &mut String) {
	let Some(name) = normalize_attr_name(name) else {
		return;
	};

	match value {
		AttrValue::Handler(_) | AttrValue::Bool(false) => {}
		AttrValue::Bool(true) => {
			out.push(' ');
			out.push_str(name);
		}
		AttrValue::Text(text) if BOOLEAN_ATTRS.contains(&name) => {
			if is_boolean_attr_truthy(text) {
				out.push(' ');
				out.push_str(name);
			}
		}
		AttrValue::Text(text) => {
			out.push(' ');
			out.push_str(name);
			out.push_str("=\"");
			out.push_str(&html_escape(text));
			out.push('"');
		}
		AttrValue::Style(properties) => {
			if properties.is_empty() {
				return;
			}
			let style = properties
				.iter()
				.map(|(prop, val)| format!("{}:{}", css_property_name(prop), val))
				.collect::<Vec<_>>()
				.join(";");
			out.push(' ');
			out.push_str(name);
			out.push_str("=\"");
			out.push_str(&html_escape(&style));
			out.push('"');
		}
	}
}

async fn render_boundary(
	props: &DynamicProps,
	kind: BoundaryKind,
	ctx: &mut PprContext,
	out: &mut String,
) -> PprResult<()> {
	if ctx.inside_dynamic_boundary() {
		return render_into(&props.children, ctx, out).await;
	}

	let registration = ctx.register_dynamic_boundary(props, kind)?;
	if ctx.is_discovery_only() {
		return Ok(());
	}

	match ctx.mode() {
		RenderMode::Build => {
			write_fallback_region(&registration, props.fallback.as_deref(), ctx, out).await
		}
		RenderMode::Request => {
			let inner = render_nested(&props.children, ctx).await?;
			out.push_str(&wrap_boundary(&registration.id, &inner, true));
			Ok(())
		}
	}
}

async fn render_component(
	component: &ComponentNode,
	ctx: &mut PprContext,
	out: &mut String,
) -> PprResult<()> {
	let suspend = component
		.render(&ctx.scope())
		.map_err(|err| component_error(component, err))?;

	let future = match suspend {
		Suspend::Ready(node) => return render_into(&node, ctx, out).await,
		Suspend::Pending(future) => future,
	};

	if ctx.inside_dynamic_boundary() {
		let node = future.await.map_err(|err| component_error(component, err))?;
		return render_into(&node, ctx, out).await;
	}

	let registration = ctx.register_component_boundary(component)?;
	tracing::debug!(
		boundary_id = %registration.id,
		component = component.name(),
		"component suspended outside a boundary"
	);
	if ctx.is_discovery_only() {
		return Ok(());
	}

	match ctx.mode() {
		RenderMode::Build => {
			drop(future);
			write_fallback_region(&registration, None, ctx, out).await
		}
		RenderMode::Request => {
			let node = future.await.map_err(|err| component_error(component, err))?;
			let inner = render_nested(&node, ctx).await?;
			out.push_str(&wrap_boundary(&registration.id, &inner, true));
			Ok(())
		}
	}
}

async fn write_fallback_region(
	registration: &Registration,
	fallback: Option<&Node>,
	ctx: &mut PprContext,
	out: &mut String,
) -> PprResult<()> {
	let fallback_html = match fallback {
		Some(node) => render_nested(node, ctx).await?,
		None => LOADING_PLACEHOLDER.to_string(),
	};

	let markers = &registration.markers;
	let mut inner =
		String::with_capacity(fallback_html.len() + markers.fallback_start.len() * 2);
	inner.push_str(&markers.fallback_start);
	inner.push_str(&fallback_html);
	inner.push_str(&markers.fallback_end);

	out.push_str(&markers.start);
	out.push_str(&wrap_boundary(&registration.id, &inner, false));
	out.push_str(&markers.end);
	Ok(())
}

/// Renders `node` with the re-entrancy flag set, restoring it afterwards.
async fn render_nested(node: &Node, ctx: &mut PprContext) -> PprResult<String> {
	let previous = ctx.set_inside_dynamic_boundary(true);
	let mut html = String::new();
	let result = render_into(node, ctx, &mut html).await;
	ctx.set_inside_dynamic_boundary(previous);
	result.map(|()| html)
}

fn component_error(component: &ComponentNode, err: PprError) -> PprError {
	match err {
		err @ PprError::Component { .. } => err,
		other => PprError::component(component.name(), other.to_string()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::RequestData;
	use crate::node::IntoNode;
	use crate::markers;
	use rstest::rstest;
	use std::sync::Arc;

	async fn render(node: &Node, mut ctx: PprContext) -> (String, PprContext) {
		let html = render_with_ppr(node, &mut ctx).await.unwrap();
		(html, ctx)
	}

	fn pending_component(name: &'static str, text: &'static str) -> Node {
		Node::component_fn(name, move |_| {
			Ok(Suspend::pending(async move { Ok(Node::text(text)) }))
		})
	}

	#[rstest]
	#[tokio::test]
	async fn test_plain_tree_renders_identically_in_both_modes() {
		let tree = Node::element("div")
			.attr("className", "card")
			.child(Node::element("h1").child("A & B"))
			.child(Node::element("br"))
			.into_node();

		let (build, _) = render(&tree, PprContext::build()).await;
		let (request, _) = render(&tree, PprContext::request(None)).await;

		assert_eq!(build, r#"<div class="card"><h1>A &amp; B</h1><br /></div>"#);
		assert_eq!(build, request);
	}

	#[rstest]
	#[tokio::test]
	async fn test_attribute_rendering_rules() {
		let tree = Node::element("input")
			.attr("htmlFor", "name")
			.bool_attr("disabled", true)
			.bool_attr("checked", false)
			.attr("readonly", "false")
			.attr("__internal", "x")
			.attr("title", "\"quoted\"")
			.style([("backgroundColor", "red"), ("marginTop", "4px")])
			.on("onClick", || {})
			.into_node();

		let (html, _) = render(&tree, PprContext::build()).await;
		assert_eq!(
			html,
			r#"<input for="name" disabled title="&quot;quoted&quot;" style="background-color:red;margin-top:4px" />"#
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_build_mode_emits_marked_fallback() {
		let tree = Node::element("main")
			.child(DynamicProps::new("secret").fallback(Node::element("p").child("wait")))
			.into_node();

		let (html, ctx) = render(&tree, PprContext::build()).await;

		let expected = format!(
			"<main>{}<div id=\"dynamic-0\" data-ppr-boundary=\"true\">{}<p>wait</p>{}</div>{}</main>",
			markers::start("dynamic-0"),
			markers::fallback_start("dynamic-0"),
			markers::fallback_end("dynamic-0"),
			markers::end("dynamic-0"),
		);
		assert_eq!(html, expected);
		assert!(!html.contains("secret"));
		assert_eq!(ctx.boundaries().len(), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_build_mode_without_fallback_uses_placeholder() {
		let tree = Node::dynamic(DynamicProps::new("x"));
		let (html, _) = render(&tree, PprContext::build()).await;
		assert!(html.contains(LOADING_PLACEHOLDER));
	}

	#[rstest]
	#[tokio::test]
	async fn test_request_mode_emits_resolved_wrapper() {
		let tree = Node::dynamic(DynamicProps::new(Node::element("b").child("now")).fallback("old"));
		let (html, ctx) = render(&tree, PprContext::request(None)).await;
		assert_eq!(
			html,
			r#"<div id="dynamic-0" data-ppr-boundary="true" data-ppr-resolved="true"><b>now</b></div>"#
		);
		assert!(!ctx.inside_dynamic_boundary());
	}

	#[rstest]
	#[tokio::test]
	async fn test_nested_boundaries_do_not_register() {
		let inner = DynamicProps::new("inner");
		let outer = DynamicProps::new(Node::element("section").child(inner));
		let tree = Node::dynamic(outer);

		let (build, build_ctx) = render(&tree, PprContext::build()).await;
		let (request, request_ctx) = render(&tree, PprContext::request(None)).await;

		assert_eq!(build_ctx.boundaries().len(), 1);
		assert_eq!(request_ctx.boundaries().len(), 1);
		assert_eq!(build.matches("<!--ppr:start:").count(), 1);
		assert!(request.contains("<section>inner</section>"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_suspense_flag_controls_deferral() {
		let tree = Node::fragment([
			Node::suspense(DynamicProps::new("inline"), false),
			Node::suspense(DynamicProps::new("deferred"), true),
		]);
		let (html, ctx) = render(&tree, PprContext::build()).await;
		assert!(html.starts_with("inline"));
		assert!(!html.contains("deferred"));
		assert_eq!(
			ctx.boundary("dynamic-0").map(|b| b.kind),
			Some(BoundaryKind::Suspense)
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_pending_component_becomes_implicit_boundary() {
		let tree = Node::element("div")
			.child(pending_component("Clock", "12:00"))
			.into_node();

		let (build, build_ctx) = render(&tree, PprContext::build()).await;
		let (request, request_ctx) = render(&tree, PprContext::request(None)).await;

		assert!(build.contains(&markers::start("dynamic-0")));
		assert!(build.contains(LOADING_PLACEHOLDER));
		assert!(!build.contains("12:00"));
		assert_eq!(
			request,
			r#"<div><div id="dynamic-0" data-ppr-boundary="true" data-ppr-resolved="true">12:00</div></div>"#
		);
		assert_eq!(
			build_ctx.boundaries().keys().collect::<Vec<_>>(),
			request_ctx.boundaries().keys().collect::<Vec<_>>()
		);
		assert_eq!(
			build_ctx.boundary("dynamic-0").map(|b| b.kind),
			Some(BoundaryKind::Component)
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_pending_component_inside_boundary_is_awaited_inline() {
		let tree = Node::dynamic(DynamicProps::new(pending_component("Clock", "12:00")));
		let (html, ctx) = render(&tree, PprContext::request(None)).await;
		assert_eq!(ctx.boundaries().len(), 1);
		assert!(html.contains(">12:00</div>"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_id_sequence_matches_across_modes() {
		let tree = Node::fragment([
			Node::dynamic(DynamicProps::new("a")),
			Node::element("div")
				.child(Node::dynamic(DynamicProps::new("b").id("named")))
				.child(pending_component("C", "c"))
				.into_node(),
			Node::suspense(DynamicProps::new("d"), true),
		]);

		let (_, build_ctx) = render(&tree, PprContext::build()).await;
		let (_, request_ctx) = render(&tree, PprContext::request(None)).await;
		let (discovery, discovery_ctx) = render(&tree, PprContext::request(None).discovery()).await;

		let build_ids: Vec<_> = build_ctx.boundaries().keys().cloned().collect();
		assert_eq!(build_ids, vec!["dynamic-0", "named", "dynamic-1", "dynamic-2"]);
		assert_eq!(build_ids, request_ctx.boundaries().keys().cloned().collect::<Vec<_>>());
		assert_eq!(build_ids, discovery_ctx.boundaries().keys().cloned().collect::<Vec<_>>());
		assert_eq!(discovery, "<div></div>");
	}

	#[rstest]
	#[tokio::test]
	async fn test_component_reads_request_scope() {
		let tree = Node::dynamic(DynamicProps::new(Node::component_fn("Greeting", |scope| {
			let name = scope.cookie("name").unwrap_or("guest").to_string();
			Ok(Suspend::ready(format!("Hello, {}", name)))
		})));
		let data = Arc::new(RequestData::new().cookie("name", "Ada"));
		let (html, _) = render(&tree, PprContext::request(Some(data))).await;
		assert!(html.contains("Hello, Ada"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_component_error_propagates() {
		let tree = Node::element("div")
			.child(Node::component_fn("Broken", |_| {
				Err(PprError::InvalidSettings("bad".into()))
			}))
			.into_node();
		let mut ctx = PprContext::build();
		let err = render_with_ppr(&tree, &mut ctx).await.unwrap_err();
		assert!(matches!(err, PprError::Component { ref component, .. } if component == "Broken"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_flag_restored_after_failed_boundary() {
		let tree = Node::dynamic(DynamicProps::new(Node::component_fn("Broken", |_| {
			Err(PprError::component("Broken", "boom"))
		})));
		let mut ctx = PprContext::request(None);
		assert!(render_with_ppr(&tree, &mut ctx).await.is_err());
		assert!(!ctx.inside_dynamic_boundary());
	}

	#[rstest]
	#[tokio::test]
	async fn test_render_isolated_does_not_register() {
		let node = Node::fragment([Node::dynamic(DynamicProps::new("x")), pending_component("P", "y")]);
		let ctx = PprContext::build();
		let html = render_isolated(&node, &ctx).await.unwrap();
		assert_eq!(html, "xy");
		assert!(ctx.boundaries().is_empty());
	}
}
