//! Selector resolution against a live document.
//!
//! An ordered fallback chain, precision over recall: cheap unambiguous
//! identity lookups run before fuzzy text search, and each strategy is
//! attempted only when the previous one yields nothing. Invalid selector
//! syntax anywhere in the chain is a non-match, never an error.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::dom::{Dom, DomElement};
use crate::selector::{self, Selector, SYNTHETIC_ID_PREFIX};

use super::inventory::IdRegistry;

/// Resolve a selector descriptor to a single element, or nothing once
/// every strategy is exhausted.
pub fn resolve(dom: &Dom, registry: &IdRegistry, descriptor: &str) -> Option<DomElement> {
    debug!(descriptor, "resolving element");

    match Selector::from(descriptor) {
        // Fast path: a synthetically-assigned id resolves by direct lookup
        Selector::Id(id) if id.starts_with(SYNTHETIC_ID_PREFIX) => dom
            .get_element_by_id(&id)
            .or_else(|| generic_chain(dom, descriptor)),
        // Literal text target: the tracked element set first
        Selector::Text(text) => {
            find_in_tracked(registry, &text).or_else(|| generic_chain(dom, descriptor))
        }
        // XPath has its own internal fallbacks and then terminates
        Selector::XPath(expr) => resolve_xpath(dom, &expr),
        Selector::HasText { tag, text } => {
            has_text_search(dom, &tag, &text).or_else(|| generic_chain(dom, descriptor))
        }
        _ => generic_chain(dom, descriptor),
    }
}

/// Strategies 5–7: literal CSS, attribute shape, free-text last resort
fn generic_chain(dom: &Dom, descriptor: &str) -> Option<DomElement> {
    match css_query(dom, descriptor) {
        Ok(Some(el)) => return Some(el),
        Ok(None) => {}
        Err(_) => debug!(descriptor, "invalid CSS selector, trying other methods"),
    }

    if let Some((name, value)) = parse_attribute_shape(descriptor) {
        let found = if name == "text" {
            find_by_text(dom, &value)
        } else {
            dom.all_elements()
                .into_iter()
                .find(|el| el.attr(&name).as_deref() == Some(value.as_str()))
        };
        if found.is_some() {
            return found;
        }
    }

    let text = selector::extract_text_content(descriptor)?;
    find_by_text(dom, &text).or_else(|| find_by_partial_text(dom, &text))
}

/// Exact (case-insensitive) text equality over the tracked element set
fn find_in_tracked(registry: &IdRegistry, text: &str) -> Option<DomElement> {
    registry
        .tracked_elements()
        .find(|el| {
            let el_text = el.text_content().trim().to_string();
            el_text == text || el_text.eq_ignore_ascii_case(text)
        })
        .cloned()
}

static XPATH_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^//([a-zA-Z0-9]+|\*)(?:\[(.+)\])?$").unwrap());
static XPATH_PRED_TEXT_EQ: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^text\(\)\s*=\s*['"]([^'"]+)['"]$"#).unwrap());
static XPATH_PRED_TEXT_CONTAINS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^contains\s*\(\s*text\(\)\s*,\s*['"]([^'"]+)['"]\s*\)$"#).unwrap()
});
static XPATH_PRED_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^@([a-zA-Z-]+)\s*=\s*['"]([^'"]+)['"]$"#).unwrap());

/// Evaluate the XPath shapes this pipeline emits, with the documented
/// relaxations: exact `text()` equality, then `contains(text(), …)` against
/// the same element type, then plain text search on the extracted string.
fn resolve_xpath(dom: &Dom, expr: &str) -> Option<DomElement> {
    if let Some(caps) = XPATH_SHAPE.captures(expr) {
        let tag = caps[1].to_lowercase();
        let of_tag = |el: &DomElement| tag == "*" || el.tag() == tag;

        match caps.get(2).map(|m| m.as_str().trim()) {
            None => {
                if let Some(el) = dom.all_elements().into_iter().find(|el| of_tag(el)) {
                    return Some(el);
                }
            }
            Some(pred) => {
                if let Some(p) = XPATH_PRED_TEXT_EQ.captures(pred) {
                    let target = &p[1];
                    let exact = dom
                        .all_elements()
                        .into_iter()
                        .find(|el| of_tag(el) && el.text_content().trim() == target);
                    if exact.is_some() {
                        return exact;
                    }
                    // Relax equality to containment on the same element type
                    debug!(target, "exact XPath failed, trying contains() relaxation");
                    let relaxed = dom
                        .all_elements()
                        .into_iter()
                        .find(|el| of_tag(el) && el.text_content().contains(target));
                    if relaxed.is_some() {
                        return relaxed;
                    }
                } else if let Some(p) = XPATH_PRED_TEXT_CONTAINS.captures(pred) {
                    let target = &p[1];
                    let found = dom
                        .all_elements()
                        .into_iter()
                        .find(|el| of_tag(el) && el.text_content().contains(target));
                    if found.is_some() {
                        return found;
                    }
                } else if let Some(p) = XPATH_PRED_ATTR.captures(pred) {
                    let (name, value) = (p[1].to_string(), p[2].to_string());
                    let found = dom.all_elements().into_iter().find(|el| {
                        of_tag(el) && el.attr(&name).as_deref() == Some(value.as_str())
                    });
                    if found.is_some() {
                        return found;
                    }
                }
            }
        }
    }

    // Every XPath approach failed; fall back to whatever text the
    // expression carries, then give up.
    let text = selector::extract_text_from_xpath(expr)?;
    debug!(text, "XPath exhausted, falling back to text search");
    find_by_text(dom, &text).or_else(|| find_by_partial_text(dom, &text))
}

/// `tag:has-text(text)`: exact trimmed equality first, substring second,
/// both case-insensitive
fn has_text_search(dom: &Dom, tag: &str, text: &str) -> Option<DomElement> {
    let candidates: Vec<DomElement> = dom
        .all_elements()
        .into_iter()
        .filter(|el| el.tag() == tag)
        .collect();

    candidates
        .iter()
        .find(|el| {
            let t = el.text_content().trim().to_string();
            t == text || t.eq_ignore_ascii_case(text)
        })
        .or_else(|| {
            candidates.iter().find(|el| {
                let t = el.text_content().trim().to_string();
                t.contains(text) || t.to_lowercase().contains(&text.to_lowercase())
            })
        })
        .cloned()
}

static ATTRIBUTE_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\[([a-zA-Z-]+)\s*=\s*['"]?([^'"\]]+)['"]?\]$"#).unwrap());

fn parse_attribute_shape(descriptor: &str) -> Option<(String, String)> {
    if !descriptor.starts_with('[') || !descriptor.contains('=') {
        return None;
    }
    ATTRIBUTE_SHAPE
        .captures(descriptor)
        .map(|c| (c[1].to_string(), c[2].to_string()))
}

/// Tags the free-text fallback searches, mirroring the elements users
/// describe aloud
fn is_text_candidate(el: &DomElement) -> bool {
    match el.tag() {
        "button" | "a" | "div" | "span" | "p" | "label" | "h1" | "h2" | "h3" | "h4" | "h5"
        | "h6" => true,
        "input" => el.attr("type").as_deref() == Some("submit"),
        _ => el.role().as_deref() == Some("button"),
    }
}

/// Exact text match (case-insensitive, trailing punctuation stripped)
pub fn find_by_text(dom: &Dom, text: &str) -> Option<DomElement> {
    let clean = selector::clean_spoken_text(text);
    if clean.is_empty() {
        return None;
    }
    dom.all_elements()
        .into_iter()
        .filter(is_text_candidate_ref)
        .find(|el| {
            let el_text = selector::clean_spoken_text(el.text_content().trim());
            el_text == clean || el_text.eq_ignore_ascii_case(&clean)
        })
}

/// Substring text match (case-insensitive)
pub fn find_by_partial_text(dom: &Dom, text: &str) -> Option<DomElement> {
    let clean = selector::clean_spoken_text(text);
    if clean.is_empty() {
        return None;
    }
    let clean_lower = clean.to_lowercase();
    dom.all_elements()
        .into_iter()
        .filter(is_text_candidate_ref)
        .find(|el| {
            let el_text = selector::clean_spoken_text(el.text_content().trim());
            el_text.contains(&clean) || el_text.to_lowercase().contains(&clean_lower)
        })
}

fn is_text_candidate_ref(el: &DomElement) -> bool {
    is_text_candidate(el)
}

// Minimal CSS evaluation: compound simple selectors and comma lists, the
// shapes this pipeline emits. Combinators and pseudo-classes are invalid
// here (has-text is handled before CSS is attempted).

struct InvalidCss;

struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

fn css_query(dom: &Dom, selector: &str) -> std::result::Result<Option<DomElement>, InvalidCss> {
    let compounds: Vec<Compound> = selector
        .split(',')
        .map(|part| parse_compound(part.trim()))
        .collect::<std::result::Result<_, _>>()?;

    if compounds.is_empty() {
        return Err(InvalidCss);
    }

    Ok(dom
        .all_elements()
        .into_iter()
        .find(|el| compounds.iter().any(|c| compound_matches(el, c))))
}

fn take_ident(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut out = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            out.push(c);
            chars.next();
        } else {
            break;
        }
    }
    out
}

fn parse_compound(input: &str) -> std::result::Result<Compound, InvalidCss> {
    if input.is_empty() {
        return Err(InvalidCss);
    }

    let mut compound = Compound {
        tag: None,
        id: None,
        classes: Vec::new(),
        attrs: Vec::new(),
    };
    let mut chars = input.chars().peekable();

    if matches!(chars.peek(), Some(c) if c.is_ascii_alphabetic()) {
        compound.tag = Some(take_ident(&mut chars).to_lowercase());
    } else if chars.peek() == Some(&'*') {
        chars.next();
    }

    while let Some(&c) = chars.peek() {
        match c {
            '#' => {
                chars.next();
                let id = take_ident(&mut chars);
                if id.is_empty() {
                    return Err(InvalidCss);
                }
                compound.id = Some(id);
            }
            '.' => {
                chars.next();
                let class = take_ident(&mut chars);
                if class.is_empty() {
                    return Err(InvalidCss);
                }
                compound.classes.push(class);
            }
            '[' => {
                chars.next();
                let name = take_ident(&mut chars);
                if name.is_empty() {
                    return Err(InvalidCss);
                }
                let value = if chars.peek() == Some(&'=') {
                    chars.next();
                    let quote = match chars.peek() {
                        Some(&q @ ('\'' | '"')) => {
                            chars.next();
                            Some(q)
                        }
                        _ => None,
                    };
                    let mut v = String::new();
                    while let Some(&c) = chars.peek() {
                        if Some(c) == quote || (quote.is_none() && c == ']') {
                            break;
                        }
                        v.push(c);
                        chars.next();
                    }
                    if let Some(q) = quote {
                        if chars.next() != Some(q) {
                            return Err(InvalidCss);
                        }
                    }
                    Some(v)
                } else {
                    None
                };
                if chars.next() != Some(']') {
                    return Err(InvalidCss);
                }
                compound.attrs.push((name, value));
            }
            _ => return Err(InvalidCss),
        }
    }

    Ok(compound)
}

fn compound_matches(el: &DomElement, compound: &Compound) -> bool {
    if let Some(tag) = &compound.tag {
        if el.tag() != tag {
            return false;
        }
    }
    if let Some(id) = &compound.id {
        if el.id().as_deref() != Some(id.as_str()) {
            return false;
        }
    }
    if !compound.classes.is_empty() {
        let class_attr = el.attr("class").unwrap_or_default();
        let classes: Vec<&str> = class_attr.split_whitespace().collect();
        if !compound
            .classes
            .iter()
            .all(|c| classes.contains(&c.as_str()))
        {
            return false;
        }
    }
    for (name, value) in &compound.attrs {
        match value {
            Some(v) => {
                if el.attr(name).as_deref() != Some(v.as_str()) {
                    return false;
                }
            }
            None => {
                if !el.has_attr(name) {
                    return false;
                }
            }
        }
    }
    true
}
