//! Interactive element inventory.
//!
//! Scans the document for candidate interactive elements, assigns synthetic
//! stable identifiers to the ones lacking a native id, filters by
//! visibility, and serializes a summary for model context. Identifier
//! assignment is idempotent by node identity and lives for one page load.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dom::{Dom, DomElement, Rect, StructuralChange};
use crate::selector::SYNTHETIC_ID_PREFIX;

/// How many elements a snapshot contributes to a model prompt, at most.
/// The cap preserves document order so the model sees the page top-down.
pub const PROMPT_ELEMENT_CAP: usize = 30;

const INTERACTIVE_ROLES: &[&str] = &[
    "button", "link", "tab", "menuitem", "checkbox", "radio", "switch", "combobox", "option",
];

/// Whether an element belongs to the interactive candidate allowlist
pub fn is_interactive_candidate(el: &DomElement) -> bool {
    match el.tag() {
        "button" | "a" | "select" | "textarea" => true,
        "input" => el.attr("type").as_deref() != Some("hidden"),
        _ => {
            if let Some(role) = el.role() {
                if INTERACTIVE_ROLES.contains(&role.as_str()) {
                    return true;
                }
            }
            el.attr("aria-haspopup").as_deref() == Some("true")
                || el.attr("contenteditable").as_deref() == Some("true")
        }
    }
}

/// Page identity attached to every snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageContext {
    pub title: String,
    pub url: String,
}

/// Summary of one interactive element, serialized for model context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageElementDescriptor {
    pub tag: String,
    pub text: String,
    pub id: String,
    pub class_name: String,
    #[serde(rename = "type")]
    pub input_type: String,
    pub name: String,
    pub value: String,
    pub placeholder: String,
    pub aria_label: String,
    pub role: String,
    pub is_interactive: bool,
    pub is_in_viewport: bool,
    pub bounding_rect: Rect,
}

/// A scan result: page identity plus the visible interactive elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub page_context: PageContext,
    pub elements: Vec<PageElementDescriptor>,
}

/// Tracks which elements hold a synthetic identifier, keyed by node
/// identity rather than by attribute so re-assignment never happens.
/// One registry corresponds to one document; navigation discards it.
#[derive(Default)]
pub struct IdRegistry {
    counter: usize,
    tracked: HashMap<usize, DomElement>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Elements currently tracked, in arbitrary order
    pub fn tracked_elements(&self) -> impl Iterator<Item = &DomElement> {
        self.tracked.values()
    }

    pub fn is_tracked(&self, el: &DomElement) -> bool {
        self.tracked.contains_key(&el.key())
    }

    /// Walk the document and give every visible interactive candidate a
    /// stable identifier. Elements already tracked are skipped; elements
    /// with a native id are tracked but left untouched. Returns how many
    /// new identifiers were assigned.
    pub fn assign_ids(&mut self, dom: &Dom) -> usize {
        let mut assigned = 0;

        for el in dom.all_elements() {
            if !is_interactive_candidate(&el) {
                continue;
            }
            if self.is_tracked(&el) || !el.is_visible() {
                continue;
            }

            if el.id().is_none() {
                let base = id_base_for(&el);
                let id = format!("{SYNTHETIC_ID_PREFIX}{base}-{}", self.counter);
                self.counter += 1;
                el.set_id(&id);
                assigned += 1;
            }
            self.tracked.insert(el.key(), el.clone());
        }

        if assigned > 0 {
            debug!(assigned, "assigned synthetic ids to interactive elements");
        }
        assigned
    }

    /// React to a batch of mutation records: only element additions warrant
    /// a re-scan; attribute and text mutations are ignored to avoid
    /// excessive work. Returns whether a re-scan ran.
    pub fn observe(&mut self, dom: &Dom, changes: &[StructuralChange]) -> bool {
        if changes
            .iter()
            .any(|c| matches!(c, StructuralChange::ElementAdded))
        {
            self.assign_ids(dom);
            true
        } else {
            false
        }
    }
}

/// Identifier stem: slug of short text content, else the tag name
fn id_base_for(el: &DomElement) -> String {
    let text = el.text_content().trim().to_string();
    if !text.is_empty() && text.len() < 20 {
        let slug = slugify(&text);
        if !slug.is_empty() {
            return slug;
        }
    }
    el.tag().to_string()
}

fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_dash = false;
    for c in text.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_dash = false;
        } else if !last_dash && !out.is_empty() {
            out.push('-');
            last_dash = true;
        }
    }
    out.trim_matches('-').to_string()
}

/// Scan the document: assign identifiers, then summarize every visible
/// interactive element in document order.
pub fn scan(dom: &Dom, registry: &mut IdRegistry) -> PageSnapshot {
    registry.assign_ids(dom);

    let mut elements = Vec::new();
    for el in dom.all_elements() {
        if !is_interactive_candidate(&el) || !el.is_visible() {
            continue;
        }

        elements.push(PageElementDescriptor {
            tag: el.tag().to_string(),
            text: el.text_content().trim().to_string(),
            id: el.id().unwrap_or_default(),
            class_name: el.attr("class").unwrap_or_default(),
            input_type: el.attr("type").unwrap_or_default(),
            name: el.attr("name").unwrap_or_default(),
            value: if el.tag() == "input" {
                el.value()
            } else {
                String::new()
            },
            placeholder: el.attr("placeholder").unwrap_or_default(),
            aria_label: el.attr("aria-label").unwrap_or_default(),
            role: el.role().unwrap_or_default(),
            is_interactive: true,
            is_in_viewport: dom.is_in_viewport(&el),
            bounding_rect: dom.client_rect(&el),
        });
    }

    PageSnapshot {
        page_context: PageContext {
            title: dom.title(),
            url: dom.url(),
        },
        elements,
    }
}
