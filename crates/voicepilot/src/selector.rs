//! Selector descriptor grammar.
//!
//! A selector descriptor is an opaque string identifying a target element in
//! one of several supported syntaxes: `#id`, `[text='…']`, `xpath=…`,
//! `tag:has-text('…')`, a literal CSS selector, an `[attr='value']` shape,
//! or plain free text. This module classifies descriptors, repairs the two
//! malformed shapes the model is known to emit, and extracts embedded text
//! for the fuzzy fallbacks.

use once_cell::sync::Lazy;
use regex::Regex;

/// Prefix for synthetic identifiers assigned to unidentified elements
pub const SYNTHETIC_ID_PREFIX: &str = "vp-target-";

/// Sentinel descriptor meaning "whatever is under the pointer right now"
pub const CURRENT_POSITION: &str = "currentPosition";

/// Represents ways to locate a page element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Direct `#id` lookup
    Id(String),
    /// Literal text target, `[text='…']`
    Text(String),
    /// XPath expression, `xpath=…`
    XPath(String),
    /// Playwright-style `tag:has-text('…')`
    HasText { tag: String, text: String },
    /// Attribute equality, `[attr='value']`
    Attribute { name: String, value: String },
    /// Anything with CSS syntax markers, passed to the CSS matcher
    Css(String),
    /// Click target at the current pointer position
    CurrentPosition,
    /// No selector syntax at all; resolved by text search
    FreeText(String),
}

static TEXT_DESCRIPTOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\[text=['"]([^'"]+)['"]\]$"#).unwrap());
static HAS_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^([a-zA-Z0-9]+):has-text\(['"]([^'"]+)['"]\)$"#).unwrap());
static ATTRIBUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\[([a-zA-Z-]+)\s*=\s*['"]?([^'"\]]+)['"]?\]$"#).unwrap());

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        let s = s.trim();

        if s == CURRENT_POSITION {
            return Selector::CurrentPosition;
        }
        if let Some(id) = s.strip_prefix('#') {
            return Selector::Id(id.to_string());
        }
        if let Some(expr) = s.strip_prefix("xpath=") {
            return Selector::XPath(expr.to_string());
        }
        if s.starts_with("//") {
            return Selector::XPath(s.to_string());
        }
        if let Some(caps) = TEXT_DESCRIPTOR.captures(s) {
            return Selector::Text(caps[1].to_string());
        }
        if let Some(caps) = HAS_TEXT.captures(s) {
            return Selector::HasText {
                tag: caps[1].to_lowercase(),
                text: caps[2].to_string(),
            };
        }
        if let Some(caps) = ATTRIBUTE.captures(s) {
            return Selector::Attribute {
                name: caps[1].to_string(),
                value: caps[2].to_string(),
            };
        }
        if s.contains(':') || s.starts_with('[') || s.starts_with('.') || s.contains(' ') {
            return Selector::Css(s.to_string());
        }
        // A bare word could still be a tag selector; the resolver tries CSS
        // before falling back to text search, so classify by intent here.
        Selector::FreeText(s.to_string())
    }
}

static MALFORMED_HAS_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.+):has-text\((.+)\)").unwrap());
static MALFORMED_TEXT_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\[text=['"]?([^'"\]]+)['"]?\]"#).unwrap());

/// Normalize the two malformed selector shapes the model is known to emit:
/// mixed-quote `tag:has-text(...)` expressions and loosely quoted
/// `[text=value]` attributes. Well-formed selectors pass through unchanged,
/// so the function is idempotent.
pub fn fix_malformed_selectors(selector: &str) -> String {
    if selector.contains(":has-text(") {
        if let Some(caps) = MALFORMED_HAS_TEXT.captures(selector) {
            let tag = caps[1].to_string();
            let mut text = caps[2].trim().to_string();

            let single = text.starts_with('\'') && text.ends_with('\'') && text.len() >= 2;
            let double = text.starts_with('"') && text.ends_with('"') && text.len() >= 2;
            if single || double {
                text = text[1..text.len() - 1].to_string();
            } else if text.starts_with('\'')
                || text.ends_with('\'')
                || text.starts_with('"')
                || text.ends_with('"')
            {
                // Mismatched quoting; strip every quote character
                text = text.replace(['\'', '"'], "");
            }

            return format!("{tag}:has-text('{text}')");
        }
    }

    if selector.contains("[text=") {
        if let Some(caps) = MALFORMED_TEXT_ATTR.captures(selector) {
            return format!("[text='{}']", &caps[1]);
        }
    }

    selector.to_string()
}

/// Classify a string target emitted by the model into a selector descriptor.
///
/// `#id`, `[text='…']`, XPath and anything carrying CSS syntax pass through;
/// a Playwright `text=…` prefix becomes a button `:has-text(…)`; a plain
/// string with no selector markers is wrapped as a text-match descriptor.
pub fn classify_target(target: &str) -> String {
    let target = target.trim();

    if target.starts_with('#') || target.starts_with("[text=") {
        return target.to_string();
    }
    if let Some(text) = target.strip_prefix("text=") {
        return format!("button:has-text('{}')", text.trim());
    }
    if !target.contains(':') && !target.starts_with('[') && !target.starts_with("//") {
        return format!("[text='{target}']");
    }
    target.to_string()
}

static XPATH_TEXT_EQ: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"text\(\)\s*=\s*['"]([^'"]+)['"]"#).unwrap());
static XPATH_TEXT_CONTAINS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"contains\s*\(\s*text\(\)\s*,\s*['"]([^'"]+)['"]\s*\)"#).unwrap());
static HAS_TEXT_CONTENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#":has-text\s*\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());
static TEXT_EQ_ANY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"text\s*=\s*['"]([^'"]+)['"]"#).unwrap());
static SELECTOR_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+:|[.#\[\]]").unwrap());

/// Extract the target text from an XPath expression testing text content,
/// in either its equality or `contains()` form.
pub fn extract_text_from_xpath(expr: &str) -> Option<String> {
    XPATH_TEXT_EQ
        .captures(expr)
        .or_else(|| XPATH_TEXT_CONTAINS.captures(expr))
        .map(|c| c[1].to_string())
}

/// Pull whatever human-readable text a descriptor carries, for the
/// last-resort text search. Plain descriptors are returned with obvious
/// selector punctuation stripped.
pub fn extract_text_content(selector: &str) -> Option<String> {
    if let Some(caps) = TEXT_EQ_ANY.captures(selector) {
        return Some(caps[1].to_string());
    }
    if let Some(caps) = HAS_TEXT_CONTENT.captures(selector) {
        return Some(caps[1].to_string());
    }
    if let Some(caps) = XPATH_TEXT_CONTAINS.captures(selector) {
        return Some(caps[1].to_string());
    }
    let stripped = SELECTOR_NOISE.replace_all(selector, "").trim().to_string();
    if stripped.is_empty() {
        None
    } else {
        Some(stripped)
    }
}

/// Trim the trailing punctuation speech transcripts tend to carry
pub fn clean_spoken_text(text: &str) -> String {
    text.trim()
        .trim_end_matches(['.', ',', ';', ':', '!', '?'])
        .trim()
        .to_string()
}
