//! Static shell generation.
//!
//! [`render_to_static_shell`] runs the walker once in build mode, records the
//! metadata of every discovered boundary, scans the HTML for the assets it
//! references and hashes the result.

use crate::shell::{DynamicBoundaryMetadata, ShellAssets, StaticShell};
use chrono::Utc;
use indexmap::IndexMap;
use regex::Regex;
use reinhardt_ppr_core::{
	LOADING_PLACEHOLDER, Node, PprContext, PprError, PprResult, PprSettings, hash_content,
	markers, render_isolated, render_with_ppr,
};
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Instant;

// Any `<link ...>` tag; attributes are inspected separately.
static LINK_TAG: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)<link\b[^>]*>").expect("LINK_TAG: invalid regex pattern")
});

static SCRIPT_SRC: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"(?i)<script\b[^>]*?\bsrc\s*=\s*"([^"]*)""#)
		.expect("SCRIPT_SRC: invalid regex pattern")
});

static CRITICAL_STYLE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?is)<style\b[^>]*\bdata-critical\b[^>]*>(.*?)</style>")
		.expect("CRITICAL_STYLE: invalid regex pattern")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*"([^"]*)""#)
		.expect("ATTRIBUTE: invalid regex pattern")
});

/// Options for building a shell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellConfig {
	/// Prefix for synthesized boundary ids.
	pub placeholder_prefix: String,
}

impl ShellConfig {
	/// Creates a config with the given id prefix.
	pub fn with_placeholder_prefix(prefix: impl Into<String>) -> Self {
		Self {
			placeholder_prefix: prefix.into(),
		}
	}
}

impl From<&PprSettings> for ShellConfig {
	fn from(settings: &PprSettings) -> Self {
		Self::with_placeholder_prefix(settings.placeholder_prefix.clone())
	}
}

/// Builds the static shell for `path` from `root`.
///
/// # Errors
///
/// Any component failure aborts the build with [`PprError::ShellBuild`]; no
/// partial shell is produced.
pub async fn render_to_static_shell(
	root: &Node,
	path: &str,
	config: &ShellConfig,
) -> PprResult<StaticShell> {
	let started = Instant::now();
	build_shell(root, path, config)
		.await
		.map(|shell| {
			tracing::info!(
				path,
				boundaries = shell.boundaries.len(),
				elapsed_ms = started.elapsed().as_millis() as u64,
				"built static shell"
			);
			shell
		})
		.map_err(|source| {
			tracing::error!(path, error = %source, "static shell build failed");
			PprError::ShellBuild {
				path: path.to_string(),
				source: Box::new(source),
			}
		})
}

async fn build_shell(root: &Node, path: &str, config: &ShellConfig) -> PprResult<StaticShell> {
	let mut ctx = PprContext::build().with_placeholder_prefix(config.placeholder_prefix.clone());
	let html = render_with_ppr(root, &mut ctx).await?;

	let mut boundaries = IndexMap::with_capacity(ctx.boundaries().len());
	for (id, boundary) in ctx.boundaries() {
		let fallback_html = match &boundary.fallback {
			Some(fallback) => render_isolated(fallback, &ctx).await?,
			None => LOADING_PLACEHOLDER.to_string(),
		};
		boundaries.insert(
			id.clone(),
			DynamicBoundaryMetadata {
				id: id.clone(),
				kind: boundary.kind,
				fallback_html,
				data_dependencies: boundary.data_dependencies.clone(),
				priority: boundary.priority,
				start_marker: markers::start(id),
				end_marker: markers::end(id),
			},
		);
	}

	let assets = extract_assets(&html);
	let content_hash = hash_content(&html);

	Ok(StaticShell {
		path: path.to_string(),
		html,
		boundaries,
		build_time: Utc::now(),
		content_hash,
		assets,
		placeholder_prefix: config.placeholder_prefix.clone(),
	})
}

/// Collects stylesheet, script, font and critical CSS references from `html`.
pub fn extract_assets(html: &str) -> ShellAssets {
	let mut assets = ShellAssets::default();

	for tag in LINK_TAG.find_iter(html) {
		let attrs = parse_attributes(tag.as_str());
		let Some(href) = attrs.get("href") else {
			continue;
		};
		let rel = attrs.get("rel").map(|r| r.to_ascii_lowercase());
		let is_font_preload = rel.as_deref() == Some("preload")
			&& attrs.get("as").is_some_and(|a| a.eq_ignore_ascii_case("font"));
		if rel.as_deref() == Some("stylesheet") {
			push_unique(&mut assets.css, href);
		} else if is_font_preload {
			push_unique(&mut assets.fonts, href);
		}
	}

	for caps in SCRIPT_SRC.captures_iter(html) {
		push_unique(&mut assets.js, &html_unescape(&caps[1]));
	}

	let critical: Vec<String> = CRITICAL_STYLE
		.captures_iter(html)
		.map(|caps| html_unescape(caps[1].trim()))
		.filter(|css| !css.is_empty())
		.collect();
	if !critical.is_empty() {
		assets.inline_css = Some(critical.join("\n"));
	}

	assets
}

fn parse_attributes(tag: &str) -> HashMap<String, String> {
	ATTRIBUTE
		.captures_iter(tag)
		.map(|caps| (caps[1].to_ascii_lowercase(), html_unescape(&caps[2])))
		.collect()
}

fn push_unique(list: &mut Vec<String>, value: &str) {
	if !list.iter().any(|v| v == value) {
		list.push(value.to_string());
	}
}

/// Reverses the escaping applied to text and attribute values.
fn html_unescape(s: &str) -> String {
	if !s.contains('&') {
		return s.to_string();
	}
	s.replace("&lt;", "<")
		.replace("&gt;", ">")
		.replace("&quot;", "\"")
		.replace("&#x27;", "'")
		.replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
	use super::*;
	use reinhardt_ppr_core::{DynamicProps, IntoNode, Suspend};
	use rstest::rstest;

	#[rstest]
	fn test_extract_assets() {
		let html = concat!(
			r#"<link rel="stylesheet" href="/static/app.css" />"#,
			r#"<link rel="preload" as="font" href="/fonts/inter.woff2" crossorigin />"#,
			r#"<link rel="icon" href="/favicon.ico" />"#,
			r#"<script src="/static/app.js?v=1&amp;x=2"></script>"#,
			r#"<script>inline()</script>"#,
			r#"<style data-critical="true"> body &gt; main { margin: 0 } </style>"#,
			r#"<link rel="stylesheet" href="/static/app.css" />"#,
		);
		let assets = extract_assets(html);
		assert_eq!(assets.css, vec!["/static/app.css"]);
		assert_eq!(assets.fonts, vec!["/fonts/inter.woff2"]);
		assert_eq!(assets.js, vec!["/static/app.js?v=1&x=2"]);
		assert_eq!(assets.inline_css.as_deref(), Some("body > main { margin: 0 }"));
	}

	#[rstest]
	fn test_extract_assets_from_plain_html() {
		assert!(extract_assets("<main><p>hi</p></main>").is_empty());
	}

	#[rstest]
	#[tokio::test]
	async fn test_shell_records_boundary_metadata() {
		let tree = Node::element("main")
			.child(Node::element("link").attr("rel", "stylesheet").attr("href", "/a.css"))
			.child(
				DynamicProps::new("secret")
					.fallback(Node::element("i").child("wait"))
					.priority(7)
					.depends_on("orders"),
			)
			.child(DynamicProps::new("other").id("side"))
			.into_node();

		let shell = render_to_static_shell(&tree, "/orders", &ShellConfig::with_placeholder_prefix("o-"))
			.await
			.unwrap();

		assert_eq!(shell.path, "/orders");
		assert_eq!(shell.placeholder_prefix, "o-");
		assert_eq!(shell.boundary_ids().collect::<Vec<_>>(), vec!["o-dynamic-0", "side"]);
		let first = &shell.boundaries["o-dynamic-0"];
		assert_eq!(first.fallback_html, "<i>wait</i>");
		assert_eq!(first.priority, 7);
		assert_eq!(first.data_dependencies, vec!["orders"]);
		assert_eq!(first.start_marker, "<!--ppr:start:o-dynamic-0-->");
		assert_eq!(shell.boundaries["side"].fallback_html, LOADING_PLACEHOLDER);
		assert_eq!(shell.assets.css, vec!["/a.css"]);
		assert_eq!(shell.content_hash, hash_content(&shell.html));
		assert!(!shell.html.contains("secret"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_component_failure_aborts_build() {
		let tree = Node::element("main")
			.child(Node::component_fn("Header", |_| Ok(Suspend::ready("ok"))))
			.child(Node::component_fn("Chart", |_| Err(PprError::component("Chart", "boom"))))
			.into_node();

		let err = render_to_static_shell(&tree, "/charts", &ShellConfig::default())
			.await
			.unwrap_err();
		match err {
			PprError::ShellBuild { path, source } => {
				assert_eq!(path, "/charts");
				assert!(matches!(*source, PprError::Component { .. }));
			}
			other => panic!("expected ShellBuild, got {:?}", other),
		}
	}

	#[rstest]
	#[case("a-->b")]
	#[case("q\"r")]
	#[tokio::test]
	async fn test_unembeddable_boundary_id_aborts_build(#[case] id: &str) {
		let tree = Node::element("main")
			.child(DynamicProps::new("x").id(id).fallback("wait"))
			.into_node();

		let err = render_to_static_shell(&tree, "/", &ShellConfig::default())
			.await
			.unwrap_err();
		match err {
			PprError::ShellBuild { source, .. } => match *source {
				PprError::InvalidBoundaryId { id: rejected, .. } => assert_eq!(rejected, id),
				other => panic!("expected InvalidBoundaryId, got {:?}", other),
			},
			other => panic!("expected ShellBuild, got {:?}", other),
		}
	}
}
