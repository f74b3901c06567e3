//! Client runtime and inline instruction scripts.
//!
//! The runtime defines `window.__REINHARDT_PPR__`. Every later instruction in
//! the stream is a small inline script calling into it.

/// Name of the client-side global.
pub const RUNTIME_GLOBAL: &str = "window.__REINHARDT_PPR__";

/// Event dispatched on `document` after each injection, with `detail.id`.
pub const RESOLVED_EVENT: &str = "ppr:resolved";

/// Event dispatched on `document` once every boundary was streamed.
pub const COMPLETE_EVENT: &str = "ppr:complete";

/// Client runtime source.
///
/// `inject(id, html)` replaces the element with that id, moves the id from
/// `pending` to `resolved` and fires `ppr:resolved`. `onAllResolved(cb)` runs
/// `cb` immediately when nothing is pending, otherwise once `pending` empties.
pub const RUNTIME_SCRIPT: &str = r#"(function(){
if (window.__REINHARDT_PPR__) return;
var ppr = {
resolved: new Set(),
pending: new Set(),
callbacks: [],
register: function(ids) {
ids.forEach(function(id) { if (!ppr.resolved.has(id)) ppr.pending.add(id); });
},
inject: function(id, html) {
var el = document.getElementById(id);
if (el) el.outerHTML = html;
ppr.pending.delete(id);
ppr.resolved.add(id);
document.dispatchEvent(new CustomEvent('ppr:resolved', { detail: { id: id } }));
if (ppr.pending.size === 0) ppr.callbacks.splice(0).forEach(function(cb) { cb(); });
},
onAllResolved: function(cb) {
if (ppr.pending.size === 0) cb(); else ppr.callbacks.push(cb);
}
};
window.__REINHARDT_PPR__ = ppr;
})();"#;

/// Returns the runtime wrapped in a `<script>` tag.
pub fn runtime_script_tag() -> String {
	format!("<script>{}</script>\n", RUNTIME_SCRIPT)
}

/// Returns a script registering `ids` as pending.
pub fn pending_script<'a>(ids: impl IntoIterator<Item = &'a str>) -> String {
	let list = ids
		.into_iter()
		.map(|id| format!("'{}'", escape_js_string(id)))
		.collect::<Vec<_>>()
		.join(",");
	format!("<script>{}.register([{}]);</script>\n", RUNTIME_GLOBAL, list)
}

/// Returns the script replacing boundary `id` with `html`.
pub fn inject_script(id: &str, html: &str) -> String {
	format!(
		"<script>{}.inject('{}', '{}');</script>\n",
		RUNTIME_GLOBAL,
		escape_js_string(id),
		escape_js_string(html)
	)
}

/// Returns the script announcing that the stream is complete.
pub fn complete_script() -> String {
	format!(
		"<script>document.dispatchEvent(new CustomEvent('{}'));</script>\n",
		COMPLETE_EVENT
	)
}

/// Escapes `s` for a single-quoted JavaScript string inside an inline script.
///
/// `</` becomes `<\/` so that content cannot close the surrounding script
/// element.
pub fn escape_js_string(s: &str) -> String {
	let mut out = String::with_capacity(s.len() + 16);
	let mut chars = s.chars().peekable();
	while let Some(c) = chars.next() {
		match c {
			'\\' => out.push_str("\\\\"),
			'\'' => out.push_str("\\'"),
			'\n' => out.push_str("\\n"),
			'\r' => out.push_str("\\r"),
			'\u{2028}' => out.push_str("\\u2028"),
			'\u{2029}' => out.push_str("\\u2029"),
			'<' if chars.peek() == Some(&'/') => out.push_str("<\\"),
			_ => out.push(c),
		}
	}
	out
}
