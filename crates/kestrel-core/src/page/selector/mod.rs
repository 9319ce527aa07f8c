//! Selector grammar.
//!
//! One string argument covers CSS, XPath, text, attribute, and indexed
//! selection:
//!
//! - `#x` / `.x` / bare token → id, class, tag
//! - `@attr=value`, `@attr^=v`, `@attr$=v`, `@attr*=v`, `@attr` → attribute
//! - `text:Foo`, `tx:Foo` → contains-text XPath
//! - `text=Foo` → exact-text XPath
//! - `/…`, `//…`, `(…)`, `.//…` → XPath passthrough
//! - `css:…`, `c:…`, `xpath:…`, `x:…` → explicit mode
//! - `…@i=N` / `…@index=N` → N-th (0-based) match of the preceding
//!   selector

use crate::error::SelectorError;

/// Which query engine a parsed selector targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorKind {
    /// Resolved with `document.querySelector`.
    Css,
    /// Resolved with `document.evaluate`.
    XPath,
}

/// A parsed selector ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSelector {
    /// Query engine.
    pub kind: SelectorKind,
    /// Engine-specific selector text.
    pub value: String,
    /// Take the N-th (0-based) match instead of the first.
    pub index: Option<usize>,
}

impl ParsedSelector {
    fn css(value: impl Into<String>, index: Option<usize>) -> Self {
        Self {
            kind: SelectorKind::Css,
            value: value.into(),
            index,
        }
    }

    fn xpath(value: impl Into<String>, index: Option<usize>) -> Self {
        Self {
            kind: SelectorKind::XPath,
            value: value.into(),
            index,
        }
    }
}

/// Parse a selector string.
///
/// # Errors
///
/// Returns an error for empty input.
pub fn parse(selector: &str) -> Result<ParsedSelector, SelectorError> {
    let trimmed = selector.trim();
    if trimmed.is_empty() {
        return Err(SelectorError::Empty);
    }

    let (body, index) = split_index_suffix(trimmed);

    // Explicit mode prefixes.
    for (prefix, is_css) in [("css:", true), ("c:", true), ("xpath:", false), ("x:", false)] {
        if let Some(rest) = strip_prefix_ci(body, prefix) {
            let rest = rest.trim();
            return Ok(if is_css {
                ParsedSelector::css(rest, index)
            } else {
                ParsedSelector::xpath(rest, index)
            });
        }
    }

    // Text selectors compile to XPath.
    for prefix in ["text:", "tx:"] {
        if let Some(rest) = strip_prefix_ci(body, prefix) {
            let needle = rest.trim();
            return Ok(ParsedSelector::xpath(
                format!("//*[contains(text(), '{needle}')]"),
                index,
            ));
        }
    }
    if let Some(rest) = body.strip_prefix("text=") {
        let needle = rest.trim();
        return Ok(ParsedSelector::xpath(
            format!("//*[text()='{needle}']"),
            index,
        ));
    }

    // XPath passthrough.
    if body.starts_with('/') || body.starts_with('(') || body.starts_with(".//") {
        return Ok(ParsedSelector::xpath(body, index));
    }

    // Attribute selectors.
    if let Some(rest) = body.strip_prefix('@') {
        return Ok(ParsedSelector::css(parse_attribute(rest), index));
    }

    // `#id` / `.class`: pure single-token forms keep their meaning,
    // combined forms are already CSS.
    if body.starts_with('#') || body.starts_with('.') {
        return Ok(ParsedSelector::css(body, index));
    }

    // `<tag>` wrapper.
    if let Some(inner) = body.strip_prefix('<').and_then(|b| b.strip_suffix('>')) {
        return Ok(ParsedSelector::css(inner.trim(), index));
    }

    // Everything else is CSS: bare tag names and combinator expressions
    // alike.
    Ok(ParsedSelector::css(body, index))
}

/// Split a trailing `@i=N`/`@index=N` suffix off the selector.
fn split_index_suffix(selector: &str) -> (&str, Option<usize>) {
    for marker in ["@i=", "@index="] {
        if let Some(pos) = selector.rfind(marker) {
            let digits = &selector[pos + marker.len()..];
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(index) = digits.parse() {
                    return (&selector[..pos], Some(index));
                }
            }
        }
    }
    (selector, None)
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len() && s[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// Translate `attr<op>value` into a CSS attribute selector.
fn parse_attribute(attr: &str) -> String {
    for op in ["^=", "$=", "*=", "~=", "|=", "="] {
        if let Some(pos) = attr.find(op) {
            let name = attr[..pos].trim();
            let value = attr[pos + op.len()..]
                .trim()
                .trim_matches('"')
                .trim_matches('\'');
            return if op == "=" {
                format!("[{name}=\"{value}\"]")
            } else {
                format!("[{name}{op}\"{value}\"]")
            };
        }
    }
    format!("[{}]", attr.trim())
}

#[cfg(test)]
mod tests;
