//! Element interaction executor.
//!
//! Resolves a target, scrolls it into the viewport, waits a fixed settle
//! delay, then performs the requested interaction. Every path reports a
//! structured outcome; nothing throws past this boundary, so the message
//! channel driving it always gets a well-formed reply.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dom::{Dom, DomElement};
use crate::selector::CURRENT_POSITION;

use super::inventory::IdRegistry;
use super::resolver;

/// Settle time between scrolling an element into view and acting on it;
/// some sites shift layout in response to the scroll.
pub const SETTLE_DELAY: Duration = Duration::from_millis(300);

/// Kind of interaction to perform on the resolved element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Click,
    Input,
    Select,
}

/// Structured interaction result; `method` reports which click strategy
/// landed when the native click was refused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InteractionOutcome {
    pub fn ok(action: &str) -> Self {
        Self {
            success: true,
            action: Some(action.to_string()),
            method: None,
            error: None,
        }
    }

    pub fn ok_via(action: &str, method: &str) -> Self {
        Self {
            success: true,
            action: Some(action.to_string()),
            method: Some(method.to_string()),
            error: None,
        }
    }

    pub fn fail(error: &str) -> Self {
        Self {
            success: false,
            action: None,
            method: None,
            error: Some(error.to_string()),
        }
    }
}

/// Resolve the interaction target: the element under the pointer for the
/// current-position sentinel, otherwise the full resolution chain.
pub fn resolve_target(dom: &Dom, registry: &IdRegistry, descriptor: &str) -> Option<DomElement> {
    if descriptor == CURRENT_POSITION {
        let (x, y) = dom.pointer();
        return dom.element_from_point(x, y);
    }
    resolver::resolve(dom, registry, descriptor)
}

/// Scroll the element into view, settle, then act on it.
pub async fn perform(
    dom: &Dom,
    element: DomElement,
    kind: InteractionKind,
    value: Option<&str>,
) -> InteractionOutcome {
    dom.scroll_element_into_view(&element);
    tokio::time::sleep(SETTLE_DELAY).await;

    match kind {
        InteractionKind::Click => click_element(&element),
        InteractionKind::Input => input_text(&element, value.unwrap_or("")),
        InteractionKind::Select => select_option(&element, value.unwrap_or("")),
    }
}

/// Resolve and interact in one step. Resolution failure is a reported
/// outcome, not an error.
pub async fn interact(
    dom: &Dom,
    registry: &IdRegistry,
    descriptor: &str,
    kind: InteractionKind,
    value: Option<&str>,
) -> InteractionOutcome {
    let Some(element) = resolve_target(dom, registry, descriptor) else {
        warn!(descriptor, "element not found for interaction");
        return if descriptor == CURRENT_POSITION {
            InteractionOutcome::fail("No element at position")
        } else {
            InteractionOutcome::fail("Element not found")
        };
    };
    perform(dom, element, kind, value).await
}

fn click_element(element: &DomElement) -> InteractionOutcome {
    match element.click() {
        Ok(()) => InteractionOutcome::ok("click"),
        Err(err) => {
            debug!(%err, "native click failed, dispatching click event");
            if element.dispatch_click() {
                InteractionOutcome::ok_via("click", "event")
            } else {
                InteractionOutcome::fail(&err)
            }
        }
    }
}

fn input_text(element: &DomElement, text: &str) -> InteractionOutcome {
    if element.tag() != "input" && element.tag() != "textarea" {
        return InteractionOutcome::fail("Element is not an input field");
    }

    element.focus();
    element.set_value(text);
    // Framework-bound listeners observe the change through these
    element.notify_input();
    element.notify_change();
    InteractionOutcome::ok("input")
}

fn select_option(element: &DomElement, value: &str) -> InteractionOutcome {
    if element.tag() != "select" {
        return InteractionOutcome::fail("Element is not a select dropdown");
    }

    let option = element
        .options()
        .iter()
        .find(|opt| opt.text == value || opt.value == value)
        .cloned();

    match option {
        Some(opt) => {
            element.set_value(&opt.value);
            element.notify_change();
            InteractionOutcome::ok("select")
        }
        None => InteractionOutcome::fail("Option not found"),
    }
}
