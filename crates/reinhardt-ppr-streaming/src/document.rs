//! Document framing around the shell.

use crate::runtime::{complete_script, runtime_script_tag};
use reinhardt_ppr_core::node::html_escape;
use reinhardt_ppr_core::{Node, PprResult, RequestData};
use reinhardt_ppr_shell::{StaticShell, inject_dynamic_content, render_all_dynamic_content};
use std::sync::Arc;

/// Renders everything up to and including `<body>`.
///
/// The head preloads every stylesheet, script and font of the shell, inlines
/// its critical CSS and installs the client runtime.
pub fn render_preamble(shell: &StaticShell, lang: &str) -> String {
	let mut html = String::with_capacity(2048);

	html.push_str("<!DOCTYPE html>\n");
	html.push_str(&format!("<html lang=\"{}\">\n", html_escape(lang)));

	html.push_str("<head>\n");
	html.push_str("<meta charset=\"UTF-8\">\n");
	html.push_str(
		"<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
	);

	for href in &shell.assets.css {
		html.push_str(&format!(
			"<link rel=\"preload\" href=\"{}\" as=\"style\">\n",
			html_escape(href)
		));
	}
	for src in &shell.assets.js {
		html.push_str(&format!(
			"<link rel=\"preload\" href=\"{}\" as=\"script\">\n",
			html_escape(src)
		));
	}
	for font in &shell.assets.fonts {
		html.push_str(&format!(
			"<link rel=\"preload\" href=\"{}\" as=\"font\" crossorigin>\n",
			html_escape(font)
		));
	}

	if let Some(css) = &shell.assets.inline_css {
		html.push_str("<style>");
		html.push_str(css);
		html.push_str("</style>\n");
	}

	html.push_str(&runtime_script_tag());
	html.push_str("</head>\n");
	html.push_str("<body>\n");
	html
}

/// Closes the document opened by [`render_preamble`].
pub fn document_close() -> &'static str {
	"</body>\n</html>"
}

/// Renders a complete document with every boundary already resolved.
///
/// For clients that cannot consume a streamed body. Failed boundaries show
/// the error fragment.
pub async fn render_complete_document(
	shell: &StaticShell,
	original: &Node,
	request_data: Option<Arc<RequestData>>,
	lang: &str,
) -> PprResult<String> {
	let resolutions = render_all_dynamic_content(shell, request_data, original).await?;
	let body = inject_dynamic_content(shell, &resolutions);

	let mut html = render_preamble(shell, lang);
	html.push_str(&body);
	html.push('\n');
	html.push_str(&complete_script());
	html.push_str(document_close());
	Ok(html)
}
