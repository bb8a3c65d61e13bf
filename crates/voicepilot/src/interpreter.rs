//! Model response normalization and mapping.
//!
//! Builds the constrained prompts, parses and repairs whatever the endpoint
//! returns, and maps it into a [`CanonicalAction`]. Interpretation never
//! executes side effects; once the network call returns, everything here is
//! a pure mapping. Transport failures, unparseable bodies and unknown
//! action values all degrade to [`CanonicalAction::None`] so the
//! orchestrator can fall back instead of crashing.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::action::{
    AiReply, CanonicalAction, NavigationOp, ScrollDirection, ScrollType, TabTarget,
};
use crate::errors::CommandError;
use crate::llm::{ChatMessage, LlmClient};
use crate::page::inventory::{PageSnapshot, PROMPT_ELEMENT_CAP};
use crate::selector::{classify_target, fix_malformed_selectors, SYNTHETIC_ID_PREFIX};
use crate::tabs::TabInfo;

/// Keywords marking a transcript as element-interaction flavored; such
/// commands get the element inventory attached to their prompt.
pub const ELEMENT_INTERACTION_KEYWORDS: &[&str] = &[
    "click", "press", "tap", "select", "choose", "check", "uncheck", "type", "enter", "input",
    "write", "fill",
];

pub fn wants_element_interaction(transcript: &str) -> bool {
    let lower = transcript.to_lowercase();
    ELEMENT_INTERACTION_KEYWORDS
        .iter()
        .any(|kw| lower.contains(kw))
}

const ELEMENT_SYSTEM_PROMPT: &str = "You are an assistant that helps users interact with web \
elements. You analyze page elements and find the best match for user commands.\n\n\
Respond with a JSON object containing:\n\
- action: The type of interaction (\"click\", \"input\", \"select\", \"scroll\")\n\
- target: The specific selector to interact with. IMPORTANT: If an element has an id, ALWAYS \
use the '#id' selector format as it's most reliable.\n\
- value: Any value to be input (for text fields)\n\
- confidence: A number between 0-1 indicating your confidence";

const NAVIGATION_SYSTEM_PROMPT: &str = "You are a command parser that converts voice commands \
into JSON actions. Respond ONLY with valid JSON.\n\n\
The JSON object should include:\n\
- action: One of: \"switch_tab\", \"new_tab\", \"close_tab\", \"go_back\", \"go_forward\", \
\"scroll\", \"click\", \"navigate_to_url\", \"advanced_scroll\"\n\
- target: For basic scrolling: \"up\", \"down\", \"top\", \"bottom\". For tabs: the tab number \
or identifier. For navigation history: null.\n\
- details: For \"advanced_scroll\": include \"scrollType\" (\"toPercent\" or \"byPages\"), \
\"percent\" (0-100) or \"pages\" (number of viewport heights), AND \"direction\" (\"up\" or \
\"down\"). For other commands: null.\n\n\
SCROLL COMMAND RULES:\n\
- For exact commands like \"scroll up\" or \"scroll down\" with no additional parameters, use \
action \"scroll\" with target \"up\" or \"down\".\n\
- For any command mentioning pages, use action \"advanced_scroll\", scrollType \"byPages\", \
with both the pages value and the direction.\n\
- For \"scroll to middle\" or \"scroll halfway\", use action \"advanced_scroll\", scrollType \
\"toPercent\", percent 50.\n\
- For \"scroll to top\" or \"scroll to bottom\", use action \"scroll\" with target \"top\" or \
\"bottom\".\n\n\
For switch tab commands, return the target as the tab number when possible.\n\
For navigation history commands like \"go back\" or \"go forward\", use action \"go_back\" or \
\"go_forward\" with target null.";

/// Interprets transcripts through the hosted model
pub struct Interpreter {
    llm: Arc<dyn LlmClient>,
}

impl Interpreter {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Interpret a transcript into a canonical action. Failures of any kind
    /// (transport, parse, unknown action) come back as
    /// [`CanonicalAction::None`]; the caller treats that as its cue to fall
    /// back.
    pub async fn interpret(
        &self,
        transcript: &str,
        tabs: &[TabInfo],
        page: Option<&PageSnapshot>,
    ) -> CanonicalAction {
        let messages = match page {
            Some(snapshot) if wants_element_interaction(transcript) => {
                build_element_messages(transcript, snapshot)
            }
            _ => build_navigation_messages(transcript, tabs),
        };

        let raw = match self.llm.chat(&messages).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(%err, "model endpoint unavailable");
                return CanonicalAction::None;
            }
        };

        let mut reply = match parse_reply(&raw) {
            Ok(reply) => reply,
            Err(err) => {
                warn!(%err, "model reply was not usable");
                return CanonicalAction::None;
            }
        };

        repair_tab_target(&mut reply, tabs);
        map_reply(reply)
    }
}

fn build_element_messages(transcript: &str, page: &PageSnapshot) -> Vec<ChatMessage> {
    // Bounded, document-ordered element summary to keep the prompt small
    let filtered: Vec<Value> = page
        .elements
        .iter()
        .take(PROMPT_ELEMENT_CAP)
        .map(|el| {
            serde_json::json!({
                "text": el.text,
                "tag": el.tag,
                "id": el.id,
                "ariaLabel": el.aria_label,
                "placeholder": el.placeholder,
                "role": el.role,
                "type": el.input_type,
                "isInViewport": el.is_in_viewport,
                "hasAssignedId": el.id.starts_with(SYNTHETIC_ID_PREFIX),
            })
        })
        .collect();

    let user = format!(
        "User command: \"{transcript}\"\n\n\
         Page title: {}\nURL: {}\n\n\
         Available interactive elements:\n{}\n\n\
         Based on the command and available elements, identify which element to interact with \
         and how. ALWAYS prefer using id selectors (format: '#element-id') when available as \
         they are most reliable.",
        page.page_context.title,
        page.page_context.url,
        serde_json::to_string_pretty(&filtered).unwrap_or_else(|_| "[]".to_string()),
    );

    vec![
        ChatMessage::system(ELEMENT_SYSTEM_PROMPT),
        ChatMessage::user(user),
    ]
}

fn build_navigation_messages(transcript: &str, tabs: &[TabInfo]) -> Vec<ChatMessage> {
    let tab_list = tabs
        .iter()
        .enumerate()
        .map(|(i, tab)| format!("{}. {}", i + 1, tab.title))
        .collect::<Vec<_>>()
        .join("\n");

    let user = format!("Parse this voice command into JSON: \"{transcript}\".\nAvailable tabs:\n{tab_list}");

    vec![
        ChatMessage::system(NAVIGATION_SYSTEM_PROMPT),
        ChatMessage::user(user),
    ]
}

/// Parse the model's raw text into an [`AiReply`], stripping the markdown
/// code fences it habitually wraps JSON in.
pub fn parse_reply(raw: &str) -> std::result::Result<AiReply, CommandError> {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();
    serde_json::from_str(cleaned).map_err(|e| CommandError::AiParse(e.to_string()))
}

/// Repair a non-numeric switch-tab target by case-insensitive substring
/// match against the tab titles; first match wins, a miss nulls the target.
pub fn repair_tab_target(reply: &mut AiReply, tabs: &[TabInfo]) {
    if reply.action.as_deref() != Some("switch_tab") {
        return;
    }
    let Some(target) = reply.target.as_ref() else {
        return;
    };
    if target_as_index(target).is_some() {
        return;
    }
    let Some(title) = target.as_str() else {
        reply.target = Some(Value::Null);
        return;
    };

    let needle = title.to_lowercase();
    match tabs
        .iter()
        .find(|tab| tab.title.to_lowercase().contains(&needle))
    {
        Some(tab) => {
            debug!(title, index = tab.index, "repaired tab target from title");
            reply.target = Some(Value::from(tab.index as u64));
        }
        None => {
            warn!(title, "no tab found with matching title");
            reply.target = Some(Value::Null);
        }
    }
}

fn target_as_index(target: &Value) -> Option<usize> {
    match target {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    }
}

/// Map a validated reply into the canonical action shape. Unknown action
/// values are inert: logged, mapped to `None`, never dispatched.
pub fn map_reply(reply: AiReply) -> CanonicalAction {
    let Some(action) = reply.action.as_deref() else {
        warn!("model reply carried no action");
        return CanonicalAction::None;
    };

    match action {
        "click" => CanonicalAction::Click {
            selector: selector_from_target(reply.target.as_ref()),
        },
        "input" => CanonicalAction::Input {
            selector: selector_from_target(reply.target.as_ref()),
            value: reply.value.unwrap_or_default(),
        },
        "select" => CanonicalAction::Select {
            selector: selector_from_target(reply.target.as_ref()),
            value: reply.value.unwrap_or_default(),
        },
        "scroll" => match reply.target.as_ref().and_then(Value::as_str) {
            Some("up") => CanonicalAction::Scroll {
                direction: ScrollDirection::Up,
            },
            // "top"/"bottom" arrive on the plain scroll action per the
            // prompt rules; they execute as percent scrolls
            Some("top") => CanonicalAction::AdvancedScroll {
                scroll_type: ScrollType::ToPercent,
                percent: 0.0,
                pages: 1.0,
                direction: ScrollDirection::Up,
            },
            Some("bottom") => CanonicalAction::AdvancedScroll {
                scroll_type: ScrollType::ToPercent,
                percent: 100.0,
                pages: 1.0,
                direction: ScrollDirection::Down,
            },
            _ => CanonicalAction::Scroll {
                direction: ScrollDirection::Down,
            },
        },
        "advanced_scroll" => {
            let details = reply.details.unwrap_or_default();
            let scroll_type = match details.scroll_type.as_deref() {
                Some("toPercent") => ScrollType::ToPercent,
                _ => ScrollType::ByPages,
            };
            let direction = match details.direction.as_deref() {
                Some("up") => ScrollDirection::Up,
                _ => ScrollDirection::Down,
            };
            CanonicalAction::AdvancedScroll {
                scroll_type,
                percent: details.percent.unwrap_or(0.0),
                pages: details.pages.unwrap_or(1.0),
                direction,
            }
        }
        "go_back" => CanonicalAction::Navigation {
            op: NavigationOp::Back,
        },
        "go_forward" => CanonicalAction::Navigation {
            op: NavigationOp::Forward,
        },
        "new_tab" => CanonicalAction::Navigation {
            op: NavigationOp::NewTab,
        },
        "close_tab" => CanonicalAction::Navigation {
            op: NavigationOp::CloseTab,
        },
        "switch_tab" => CanonicalAction::Navigation {
            op: NavigationOp::SwitchTab {
                target: tab_target_from(reply.target.as_ref()),
            },
        },
        "navigate_to_url" => {
            let details = reply.details.unwrap_or_default();
            let url = reply
                .target
                .as_ref()
                .and_then(Value::as_str)
                .map(str::to_string)
                .or(details.url);
            match url {
                Some(url) => CanonicalAction::NavigateToUrl {
                    url: normalize_navigation_target(&url),
                    new_tab: details.new_tab.unwrap_or(false),
                },
                None => {
                    warn!("navigate_to_url without a target");
                    CanonicalAction::None
                }
            }
        }
        "none" => CanonicalAction::None,
        other => {
            warn!(
                %other,
                "{}",
                CommandError::AiUnrecognizedAction(other.to_string())
            );
            CanonicalAction::None
        }
    }
}

/// Turn a raw model target into a selector descriptor, handling the
/// string, object and missing shapes.
fn selector_from_target(target: Option<&Value>) -> String {
    let selector = match target {
        Some(Value::String(s)) if !s.trim().is_empty() => classify_target(s),
        Some(Value::Object(obj)) => {
            if let Some(id) = obj.get("id").and_then(Value::as_str) {
                format!("#{id}")
            } else if let Some(sel) = obj.get("selector").and_then(Value::as_str) {
                sel.to_string()
            } else if let Some(xpath) = obj.get("xpath").and_then(Value::as_str) {
                xpath.to_string()
            } else if let Some(text) = obj.get("text").and_then(Value::as_str) {
                format!("[text='{text}']")
            } else {
                crate::selector::CURRENT_POSITION.to_string()
            }
        }
        _ => crate::selector::CURRENT_POSITION.to_string(),
    };
    fix_malformed_selectors(&selector)
}

fn tab_target_from(target: Option<&Value>) -> Option<TabTarget> {
    let target = target?;
    if let Some(index) = target_as_index(target) {
        return Some(TabTarget::Index(index));
    }
    target
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .map(|s| TabTarget::Title(s.to_string()))
}

/// Normalize a spoken navigation target into a loadable URL: "search for X"
/// becomes a search-engine query, a bare single-label name gets `.com`, a
/// missing scheme gets `https://`.
pub fn normalize_navigation_target(input: &str) -> String {
    let input = input.trim();

    for prefix in ["search for ", "search "] {
        if let Some(query) = input.strip_prefix(prefix) {
            return search_url(query);
        }
    }
    normalize_url(input)
}

pub fn normalize_url(input: &str) -> String {
    let mut url = input.trim().to_string();
    if url.starts_with("http://") || url.starts_with("https://") {
        return url;
    }
    if !url.contains('.') {
        url.push_str(".com");
    }
    format!("https://{url}")
}

pub fn search_url(query: &str) -> String {
    format!("https://www.google.com/search?q={}", encode_query(query))
}

fn encode_query(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    for c in query.trim().chars() {
        match c {
            ' ' => out.push('+'),
            c if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~') => out.push(c),
            c => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).as_bytes() {
                    out.push_str(&format!("%{byte:02X}"));
                }
            }
        }
    }
    out
}
