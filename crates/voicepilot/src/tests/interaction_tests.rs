use crate::action::{ScrollDirection, ScrollType};
use crate::dom::{Dom, DomEvent, ElementBuilder};
use crate::page::interact::{interact, InteractionKind};
use crate::page::inventory::IdRegistry;
use crate::page::scroll::{self, SCROLL_STEP};
use crate::page::{PageRequest, PageResponse, PageRuntime};

use super::support::scanned_page;

#[tokio::test(start_paused = true)]
async fn click_scrolls_into_view_then_clicks() {
    let (dom, registry) = scanned_page();
    let outcome = interact(
        &dom,
        &registry,
        "#vp-target-below-fold-4",
        InteractionKind::Click,
        None,
    )
    .await;

    assert!(outcome.success);
    assert_eq!(outcome.action.as_deref(), Some("click"));
    assert!(outcome.method.is_none());

    let events = dom.events();
    assert!(matches!(
        events[0],
        DomEvent::ScrollIntoView { ref target } if target == "vp-target-below-fold-4"
    ));
    assert!(events.contains(&DomEvent::Click {
        target: "vp-target-below-fold-4".to_string(),
        synthetic: false,
    }));
    // The element was centered before the click
    assert!(dom.scroll_top() > 0.0);
}

#[tokio::test(start_paused = true)]
async fn click_falls_back_to_event_dispatch() {
    let dom = Dom::new("t", "https://t", 1280.0, 720.0);
    dom.set_root(
        ElementBuilder::new("body")
            .rect(0.0, 0.0, 1280.0, 720.0)
            .child(
                ElementBuilder::new("button")
                    .id("stubborn")
                    .text("Stubborn")
                    .fail_native_click(),
            )
            .build(),
    );
    let registry = IdRegistry::new();

    let outcome = interact(&dom, &registry, "#stubborn", InteractionKind::Click, None).await;
    assert!(outcome.success);
    assert_eq!(outcome.method.as_deref(), Some("event"));
    assert!(dom.events().contains(&DomEvent::Click {
        target: "stubborn".to_string(),
        synthetic: true,
    }));
}

#[tokio::test(start_paused = true)]
async fn input_requires_an_input_element() {
    let (dom, registry) = scanned_page();
    let outcome = interact(
        &dom,
        &registry,
        "#vp-target-login-0",
        InteractionKind::Input,
        Some("hello"),
    )
    .await;
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("Element is not an input field"));
}

#[tokio::test(start_paused = true)]
async fn input_sets_value_and_fires_notifications() {
    let (dom, registry) = scanned_page();
    let outcome = interact(
        &dom,
        &registry,
        "#vp-target-input-2",
        InteractionKind::Input,
        Some("user@example.com"),
    )
    .await;
    assert!(outcome.success);

    let input = dom.get_element_by_id("vp-target-input-2").unwrap();
    assert_eq!(input.value(), "user@example.com");

    let events = dom.events();
    assert!(events.contains(&DomEvent::Focus {
        target: "vp-target-input-2".to_string()
    }));
    assert!(events.contains(&DomEvent::Input {
        target: "vp-target-input-2".to_string(),
        value: "user@example.com".to_string(),
    }));
    assert!(events.contains(&DomEvent::Change {
        target: "vp-target-input-2".to_string()
    }));
}

#[tokio::test(start_paused = true)]
async fn select_matches_option_text_or_value() {
    let (dom, registry) = scanned_page();
    let outcome = interact(
        &dom,
        &registry,
        "#country",
        InteractionKind::Select,
        Some("Canada"),
    )
    .await;
    assert!(outcome.success);
    assert_eq!(dom.get_element_by_id("country").unwrap().value(), "ca");

    let outcome = interact(&dom, &registry, "#country", InteractionKind::Select, Some("us")).await;
    assert!(outcome.success);
    assert_eq!(dom.get_element_by_id("country").unwrap().value(), "us");
}

#[tokio::test(start_paused = true)]
async fn select_reports_missing_option() {
    let (dom, registry) = scanned_page();
    let outcome = interact(
        &dom,
        &registry,
        "#country",
        InteractionKind::Select,
        Some("Option B"),
    )
    .await;
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("Option not found"));
}

#[tokio::test(start_paused = true)]
async fn select_requires_a_select_element() {
    let (dom, registry) = scanned_page();
    let outcome = interact(
        &dom,
        &registry,
        "#vp-target-login-0",
        InteractionKind::Select,
        Some("x"),
    )
    .await;
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("Element is not a select dropdown"));
}

#[tokio::test(start_paused = true)]
async fn unresolvable_descriptor_is_a_reported_failure() {
    let (dom, registry) = scanned_page();
    let outcome = interact(
        &dom,
        &registry,
        "[text='No Such Button']",
        InteractionKind::Click,
        None,
    )
    .await;
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("Element not found"));
}

#[tokio::test(start_paused = true)]
async fn current_position_clicks_element_under_pointer() {
    let (dom, registry) = scanned_page();
    dom.set_pointer(50.0, 20.0);
    let outcome = interact(&dom, &registry, "currentPosition", InteractionKind::Click, None).await;
    assert!(outcome.success);
    assert!(dom.events().contains(&DomEvent::Click {
        target: "vp-target-login-0".to_string(),
        synthetic: false,
    }));
}

#[tokio::test(start_paused = true)]
async fn current_position_with_nothing_under_pointer() {
    let (dom, registry) = scanned_page();
    dom.set_pointer(5000.0, 5000.0);
    let outcome = interact(&dom, &registry, "currentPosition", InteractionKind::Click, None).await;
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("No element at position"));
}

#[test]
fn relative_scroll_steps_and_clamps() {
    let (dom, _) = scanned_page();
    scroll::scroll_relative(&dom, ScrollDirection::Down);
    assert_eq!(dom.scroll_top(), SCROLL_STEP);
    scroll::scroll_relative(&dom, ScrollDirection::Up);
    scroll::scroll_relative(&dom, ScrollDirection::Up);
    assert_eq!(dom.scroll_top(), 0.0);
}

#[test]
fn percent_scroll_is_clamped_to_scrollable_range() {
    let (dom, _) = scanned_page();
    scroll::scroll_to_percent(&dom, 100.0);
    // content 2000, viewport 720: the furthest reachable offset
    assert_eq!(dom.scroll_top(), 1280.0);
    scroll::scroll_to_percent(&dom, 50.0);
    assert_eq!(dom.scroll_top(), 1000.0);
    scroll::scroll_to_percent(&dom, 0.0);
    assert_eq!(dom.scroll_top(), 0.0);
}

#[test]
fn page_scroll_uses_viewport_heights() {
    let (dom, _) = scanned_page();
    scroll::scroll_by_pages(&dom, 1.0, ScrollDirection::Down);
    assert_eq!(dom.scroll_top(), 720.0);
    scroll::scroll_by_pages(&dom, 2.0, ScrollDirection::Down);
    assert_eq!(dom.scroll_top(), 1280.0);

    let info = scroll::scroll_info(&dom);
    assert_eq!(info.max_scroll, 1280.0);
    assert_eq!(info.percent_scrolled, 100.0);
    assert_eq!(info.viewport_height, 720.0);
    assert_eq!(info.total_height, 2000.0);
}

#[tokio::test(start_paused = true)]
async fn runtime_dispatches_requests() {
    let (dom, _) = scanned_page();
    let runtime = PageRuntime::new(dom.clone());

    assert!(runtime.handle(PageRequest::Ping).await.is_pong());

    match runtime.handle(PageRequest::GetPageElements).await {
        PageResponse::Snapshot(snapshot) => {
            assert!(!snapshot.elements.is_empty());
            assert_eq!(snapshot.page_context.title, "Example Dashboard");
        }
        other => panic!("expected snapshot, got {other:?}"),
    }

    match runtime
        .handle(PageRequest::AdvancedScroll {
            scroll_type: ScrollType::ToPercent,
            percent: 100.0,
            pages: 1.0,
            direction: None,
        })
        .await
    {
        PageResponse::Outcome(outcome) => assert!(outcome.success),
        other => panic!("expected outcome, got {other:?}"),
    }
    assert_eq!(dom.scroll_top(), 1280.0);
}

#[test]
fn page_request_wire_format() {
    let request = PageRequest::InteractWithElement {
        selector: "#save-btn".to_string(),
        interaction_type: InteractionKind::Click,
        value: None,
    };
    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["action"], "interactWithElement");
    assert_eq!(json["selector"], "#save-btn");
    assert_eq!(json["interactionType"], "click");

    let round_tripped: PageRequest = serde_json::from_value(json).unwrap();
    match round_tripped {
        PageRequest::InteractWithElement { selector, .. } => assert_eq!(selector, "#save-btn"),
        other => panic!("unexpected request: {other:?}"),
    }
}
