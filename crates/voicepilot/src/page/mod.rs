//! The page-side runtime: everything that conceptually runs inside the
//! target page. Requests arrive over a message channel (see `bridge`), are
//! dispatched here, and always produce a structured reply.

pub mod interact;
pub mod inventory;
pub mod resolver;
pub mod scroll;

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::{ScrollDirection, ScrollType};
use crate::dom::Dom;

use interact::{InteractionKind, InteractionOutcome};
use inventory::{IdRegistry, PageSnapshot};
use scroll::ScrollInfo;

fn default_pages() -> f64 {
    1.0
}

/// Request delivered to the page runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PageRequest {
    Ping,
    GetPageElements,
    #[serde(rename_all = "camelCase")]
    InteractWithElement {
        selector: String,
        interaction_type: InteractionKind,
        #[serde(default)]
        value: Option<String>,
    },
    Scroll {
        direction: ScrollDirection,
    },
    #[serde(rename_all = "camelCase")]
    AdvancedScroll {
        scroll_type: ScrollType,
        #[serde(default)]
        percent: f64,
        #[serde(default = "default_pages")]
        pages: f64,
        #[serde(default)]
        direction: Option<ScrollDirection>,
    },
    GetScrollInfo,
}

/// Reply from the page runtime. Serialized untagged: each variant has a
/// distinct required field set on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageResponse {
    Snapshot(PageSnapshot),
    ScrollInfo(ScrollInfo),
    Status { status: String },
    Outcome(InteractionOutcome),
}

impl PageResponse {
    pub fn is_pong(&self) -> bool {
        matches!(self, PageResponse::Status { status } if status == "ok")
    }
}

/// Dispatcher for page requests, owning the document's id registry.
///
/// Before every request it consumes pending mutation records so element
/// additions get identifiers without an explicit re-scan call.
pub struct PageRuntime {
    dom: Dom,
    registry: Mutex<IdRegistry>,
}

impl PageRuntime {
    pub fn new(dom: Dom) -> Self {
        let mut registry = IdRegistry::new();
        registry.assign_ids(&dom);
        Self {
            dom,
            registry: Mutex::new(registry),
        }
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    /// Consume structural mutation records; element additions re-run id
    /// assignment.
    pub fn pump_mutations(&self) {
        let changes = self.dom.drain_structural_changes();
        if !changes.is_empty() {
            self.registry
                .lock()
                .unwrap()
                .observe(&self.dom, &changes);
        }
    }

    pub async fn handle(&self, request: PageRequest) -> PageResponse {
        debug!(?request, "page runtime handling request");
        self.pump_mutations();

        match request {
            PageRequest::Ping => PageResponse::Status {
                status: "ok".to_string(),
            },
            PageRequest::GetPageElements => {
                let mut registry = self.registry.lock().unwrap();
                PageResponse::Snapshot(inventory::scan(&self.dom, &mut registry))
            }
            PageRequest::InteractWithElement {
                selector,
                interaction_type,
                value,
            } => {
                // Resolve under the lock, act after releasing it
                let element = {
                    let registry = self.registry.lock().unwrap();
                    interact::resolve_target(&self.dom, &registry, &selector)
                };
                let outcome = match element {
                    Some(element) => {
                        interact::perform(&self.dom, element, interaction_type, value.as_deref())
                            .await
                    }
                    None if selector == crate::selector::CURRENT_POSITION => {
                        InteractionOutcome::fail("No element at position")
                    }
                    None => InteractionOutcome::fail("Element not found"),
                };
                PageResponse::Outcome(outcome)
            }
            PageRequest::Scroll { direction } => {
                scroll::scroll_relative(&self.dom, direction);
                PageResponse::Outcome(InteractionOutcome::ok("scroll"))
            }
            PageRequest::AdvancedScroll {
                scroll_type,
                percent,
                pages,
                direction,
            } => {
                match scroll_type {
                    ScrollType::ToPercent => scroll::scroll_to_percent(&self.dom, percent),
                    ScrollType::ByPages => scroll::scroll_by_pages(
                        &self.dom,
                        pages,
                        direction.unwrap_or(ScrollDirection::Down),
                    ),
                }
                PageResponse::Outcome(InteractionOutcome::ok("scroll"))
            }
            PageRequest::GetScrollInfo => PageResponse::ScrollInfo(scroll::scroll_info(&self.dom)),
        }
    }
}
