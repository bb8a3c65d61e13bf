use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::action::{CanonicalAction, NavigationOp, ScrollDirection, ScrollType, TabTarget};
use crate::errors::CommandError;
use crate::interpreter::{
    map_reply, normalize_navigation_target, normalize_url, parse_reply, repair_tab_target,
    search_url, wants_element_interaction, Interpreter,
};
use crate::llm::{ChatMessage, LlmClient};
use crate::page::inventory;
use crate::page::inventory::IdRegistry;
use crate::tabs::TabInfo;

use super::support::sample_page;

fn tab(index: usize, title: &str) -> TabInfo {
    TabInfo {
        id: index as u32 + 100,
        index,
        title: title.to_string(),
        url: format!("https://example.com/{index}"),
        window_id: 1,
    }
}

fn sample_tabs() -> Vec<TabInfo> {
    vec![
        tab(1, "GitHub - Home"),
        tab(2, "Rust Documentation"),
        tab(3, "Inbox"),
    ]
}

#[test]
fn keyword_detection() {
    assert!(wants_element_interaction("click the login button"));
    assert!(wants_element_interaction("Type my address"));
    assert!(wants_element_interaction("choose the second option"));
    assert!(!wants_element_interaction("go back"));
    assert!(!wants_element_interaction("scroll down"));
}

#[test]
fn parse_strips_code_fences() {
    let raw = "```json\n{\"action\": \"scroll\", \"target\": \"down\"}\n```";
    let reply = parse_reply(raw).unwrap();
    assert_eq!(reply.action.as_deref(), Some("scroll"));
}

#[test]
fn parse_rejects_non_json() {
    let err = parse_reply("I would scroll down here").unwrap_err();
    assert!(matches!(err, CommandError::AiParse(_)));
}

#[test]
fn tab_target_repair_is_case_insensitive_substring() {
    let mut reply = parse_reply(r#"{"action": "switch_tab", "target": "git"}"#).unwrap();
    repair_tab_target(&mut reply, &sample_tabs());
    assert_eq!(reply.target, Some(serde_json::json!(1)));
}

#[test]
fn tab_target_repair_nulls_on_miss() {
    let mut reply = parse_reply(r#"{"action": "switch_tab", "target": "spreadsheet"}"#).unwrap();
    repair_tab_target(&mut reply, &sample_tabs());
    assert_eq!(reply.target, Some(serde_json::Value::Null));

    // Downstream mapping must treat this as target-not-found, not a crash
    let action = map_reply(reply);
    assert_eq!(
        action,
        CanonicalAction::Navigation {
            op: NavigationOp::SwitchTab { target: None }
        }
    );
}

#[test]
fn numeric_tab_targets_pass_through() {
    let mut reply = parse_reply(r#"{"action": "switch_tab", "target": 2}"#).unwrap();
    repair_tab_target(&mut reply, &sample_tabs());
    let action = map_reply(reply);
    assert_eq!(
        action,
        CanonicalAction::Navigation {
            op: NavigationOp::SwitchTab {
                target: Some(TabTarget::Index(2))
            }
        }
    );
}

#[test]
fn click_with_plain_target_is_wrapped_as_text() {
    let reply = parse_reply(r#"{"action": "click", "target": "login"}"#).unwrap();
    assert_eq!(
        map_reply(reply),
        CanonicalAction::Click {
            selector: "[text='login']".to_string()
        }
    );
}

#[test]
fn click_with_id_selector_passes_through() {
    let reply = parse_reply(r##"{"action": "click", "target": "#vp-target-login-0"}"##).unwrap();
    assert_eq!(
        map_reply(reply),
        CanonicalAction::Click {
            selector: "#vp-target-login-0".to_string()
        }
    );
}

#[test]
fn click_repairs_malformed_has_text() {
    let reply =
        parse_reply(r#"{"action": "click", "target": "button:has-text(\"Submit')"}"#).unwrap();
    assert_eq!(
        map_reply(reply),
        CanonicalAction::Click {
            selector: "button:has-text('Submit')".to_string()
        }
    );
}

#[test]
fn click_with_object_target_prefers_id() {
    let reply = parse_reply(
        r#"{"action": "click", "target": {"id": "save-btn", "text": "Save"}}"#,
    )
    .unwrap();
    assert_eq!(
        map_reply(reply),
        CanonicalAction::Click {
            selector: "#save-btn".to_string()
        }
    );
}

#[test]
fn click_without_target_uses_pointer_position() {
    let reply = parse_reply(r#"{"action": "click", "target": null}"#).unwrap();
    assert_eq!(
        map_reply(reply),
        CanonicalAction::Click {
            selector: "currentPosition".to_string()
        }
    );
}

#[test]
fn input_carries_value() {
    let reply = parse_reply(
        r##"{"action": "input", "target": "#vp-target-input-2", "value": "user@example.com"}"##,
    )
    .unwrap();
    assert_eq!(
        map_reply(reply),
        CanonicalAction::Input {
            selector: "#vp-target-input-2".to_string(),
            value: "user@example.com".to_string()
        }
    );
}

#[test]
fn scroll_direction_mapping() {
    let reply = parse_reply(r#"{"action": "scroll", "target": "up"}"#).unwrap();
    assert_eq!(
        map_reply(reply),
        CanonicalAction::Scroll {
            direction: ScrollDirection::Up
        }
    );

    // Edge targets execute as percent scrolls rather than a fixed step
    let reply = parse_reply(r#"{"action": "scroll", "target": "bottom"}"#).unwrap();
    match map_reply(reply) {
        CanonicalAction::AdvancedScroll {
            scroll_type,
            percent,
            ..
        } => {
            assert_eq!(scroll_type, ScrollType::ToPercent);
            assert_eq!(percent, 100.0);
        }
        other => panic!("unexpected action: {other:?}"),
    }
}

#[test]
fn advanced_scroll_details() {
    let reply = parse_reply(
        r#"{"action": "advanced_scroll", "details": {"scrollType": "byPages", "pages": 2, "direction": "up"}}"#,
    )
    .unwrap();
    assert_eq!(
        map_reply(reply),
        CanonicalAction::AdvancedScroll {
            scroll_type: ScrollType::ByPages,
            percent: 0.0,
            pages: 2.0,
            direction: ScrollDirection::Up,
        }
    );
}

#[test]
fn unknown_action_is_inert() {
    let reply = parse_reply(r#"{"action": "dance", "target": "floor"}"#).unwrap();
    assert_eq!(map_reply(reply), CanonicalAction::None);
}

#[test]
fn missing_action_is_inert() {
    let reply = parse_reply(r#"{"target": "login"}"#).unwrap();
    assert_eq!(map_reply(reply), CanonicalAction::None);
}

#[test]
fn url_normalization() {
    assert_eq!(normalize_url("amazon"), "https://amazon.com");
    assert_eq!(normalize_url("youtube.com"), "https://youtube.com");
    assert_eq!(normalize_url("https://docs.rs"), "https://docs.rs");
    assert_eq!(normalize_url("http://internal.host"), "http://internal.host");
}

#[test]
fn search_phrasing_becomes_query_url() {
    let url = normalize_navigation_target("search for cats");
    assert_eq!(url, "https://www.google.com/search?q=cats");

    let url = normalize_navigation_target("search rust async traits");
    assert!(url.contains("q=rust+async+traits"));
}

#[test]
fn search_url_escapes_reserved_characters() {
    assert_eq!(
        search_url("c++ & rust"),
        "https://www.google.com/search?q=c%2B%2B+%26+rust"
    );
}

struct ScriptedLlm {
    reply: std::result::Result<String, String>,
    captured: Mutex<Vec<ChatMessage>>,
}

impl ScriptedLlm {
    fn ok(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            captured: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: Err("connect timeout".to_string()),
            captured: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat(&self, messages: &[ChatMessage]) -> std::result::Result<String, CommandError> {
        self.captured.lock().unwrap().extend_from_slice(messages);
        self.reply
            .clone()
            .map_err(CommandError::AiTransport)
    }
}

#[tokio::test]
async fn interpret_maps_fenced_reply() {
    let llm = ScriptedLlm::ok("```json\n{\"action\": \"go_back\"}\n```");
    let interpreter = Interpreter::new(llm);
    let action = interpreter.interpret("go back", &sample_tabs(), None).await;
    assert_eq!(
        action,
        CanonicalAction::Navigation {
            op: NavigationOp::Back
        }
    );
}

#[tokio::test]
async fn interpret_degrades_to_none_on_transport_failure() {
    let llm = ScriptedLlm::failing();
    let interpreter = Interpreter::new(llm);
    let action = interpreter
        .interpret("click submit", &sample_tabs(), None)
        .await;
    assert_eq!(action, CanonicalAction::None);
}

#[tokio::test]
async fn element_flavored_prompt_carries_inventory() {
    let dom = sample_page();
    let mut registry = IdRegistry::new();
    let snapshot = inventory::scan(&dom, &mut registry);

    let llm = ScriptedLlm::ok(r##"{"action": "click", "target": "#vp-target-login-0"}"##);
    let interpreter = Interpreter::new(llm.clone());
    let action = interpreter
        .interpret("click the login button", &sample_tabs(), Some(&snapshot))
        .await;
    assert_eq!(
        action,
        CanonicalAction::Click {
            selector: "#vp-target-login-0".to_string()
        }
    );

    let captured = llm.captured.lock().unwrap();
    assert!(captured[0].content.contains("interact with web elements"));
    assert!(captured[1].content.contains("vp-target-login-0"));
    assert!(captured[1].content.contains("Example Dashboard"));
}

#[tokio::test]
async fn navigation_prompt_enumerates_tabs_one_based() {
    let llm = ScriptedLlm::ok(r#"{"action": "new_tab"}"#);
    let interpreter = Interpreter::new(llm.clone());
    interpreter
        .interpret("open another tab please", &sample_tabs(), None)
        .await;

    let captured = llm.captured.lock().unwrap();
    assert!(captured[1].content.contains("1. GitHub - Home"));
    assert!(captured[1].content.contains("3. Inbox"));
}
