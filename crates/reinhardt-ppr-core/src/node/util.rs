//! Utility functions for node rendering.
//!
//! This module provides escaping and attribute normalization helpers shared
//! by the walker and the marker protocol.

use std::borrow::Cow;

/// Escapes HTML special characters in a string.
///
/// This function replaces the following characters:
/// - `&` → `&amp;`
/// - `<` → `&lt;`
/// - `>` → `&gt;`
/// - `"` → `&quot;`
/// - `'` → `&#x27;`
///
/// Returns a borrowed reference if no escaping is needed,
/// or an owned string if any characters were escaped.
pub fn html_escape(s: &str) -> Cow<'_, str> {
	if s.contains(['&', '<', '>', '"', '\'']) {
		let mut escaped = String::with_capacity(s.len() + 8);
		for c in s.chars() {
			match c {
				'&' => escaped.push_str("&amp;"),
				'<' => escaped.push_str("&lt;"),
				'>' => escaped.push_str("&gt;"),
				'"' => escaped.push_str("&quot;"),
				'\'' => escaped.push_str("&#x27;"),
				_ => escaped.push(c),
			}
		}
		Cow::Owned(escaped)
	} else {
		Cow::Borrowed(s)
	}
}

/// Elements that never have children or a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
	"track", "wbr",
];

/// Returns `true` if `tag` is a void element.
pub fn is_void_element(tag: &str) -> bool {
	VOID_ELEMENTS.contains(&tag)
}

/// HTML boolean attributes that should only be set when the value is truthy.
///
/// Boolean attributes in HTML are special: the presence of the attribute alone
/// makes it active, regardless of its value. `<button disabled="false">` is
/// still disabled, so falsy text values drop the attribute entirely.
pub const BOOLEAN_ATTRS: &[&str] = &[
	"allowfullscreen",
	"async",
	"autofocus",
	"autoplay",
	"checked",
	"controls",
	"default",
	"defer",
	"disabled",
	"formnovalidate",
	"hidden",
	"inert",
	"ismap",
	"itemscope",
	"loop",
	"multiple",
	"muted",
	"nomodule",
	"novalidate",
	"open",
	"playsinline",
	"readonly",
	"required",
	"reversed",
	"selected",
	"truespeed",
];

/// Checks if a boolean attribute value should result in the attribute being set.
///
/// Returns `false` for empty strings, "false", or "0".
pub fn is_boolean_attr_truthy(value: &str) -> bool {
	!value.is_empty() && value != "false" && value != "0"
}

/// Maps an authored attribute name to the name emitted in HTML.
///
/// `className` becomes `class`, `htmlFor` becomes `for`. Names with a leading
/// double underscore are internal and return `None`.
pub fn normalize_attr_name(name: &str) -> Option<&str> {
	if name.starts_with("__") {
		return None;
	}
	Some(match name {
		"className" => "class",
		"htmlFor" => "for",
		other => other,
	})
}

/// Converts a camelCase style property to its CSS kebab-case form.
///
/// Custom properties (`--brand-color`) and names already in kebab-case pass
/// through unchanged.
pub fn css_property_name(name: &str) -> Cow<'_, str> {
	if name.starts_with("--") || !name.contains(|c: char| c.is_ascii_uppercase()) {
		return Cow::Borrowed(name);
	}
	let mut out = String::with_capacity(name.len() + 4);
	for c in name.chars() {
		if c.is_ascii_uppercase() {
			out.push('-');
			out.push(c.to_ascii_lowercase());
		} else {
			out.push(c);
		}
	}
	Cow::Owned(out)
}
