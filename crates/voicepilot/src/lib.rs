//! Voice command resolution and execution pipeline
//!
//! Takes a speech transcript, classifies it against an ordered table of
//! command patterns, and — when no pattern is decisive — asks a hosted
//! language model to interpret it into a structured action. The resolved
//! action executes against a tab host or against the page runtime through
//! a message channel, with layered fallbacks at every stage: pattern
//! direct execution, model interpretation, and a bare keyword scan as the
//! last line of defense.

pub mod action;
pub mod bridge;
pub mod dom;
pub mod errors;
pub mod interpreter;
pub mod llm;
pub mod orchestrator;
pub mod page;
pub mod patterns;
pub mod selector;
pub mod session;
pub mod tabs;
#[cfg(test)]
mod tests;

pub use action::{
    AiReply, CanonicalAction, CommandCategory, MatchResult, NavigationOp, PatternAction,
    ScrollDirection, ScrollType, TabTarget,
};
pub use bridge::{ensure_page_ready, LocalPage, PageChannel, WsBridge};
pub use dom::{Dom, DomElement, DomEvent, ElementBuilder, Rect};
pub use errors::{CommandError, Result};
pub use interpreter::{wants_element_interaction, Interpreter};
pub use llm::{ChatMessage, ChatRole, LlmClient, OpenAiCompatibleClient};
pub use orchestrator::{Orchestrator, Resolution};
pub use page::interact::{InteractionKind, InteractionOutcome};
pub use page::inventory::{IdRegistry, PageElementDescriptor, PageSnapshot};
pub use page::{PageRequest, PageResponse, PageRuntime};
pub use patterns::match_transcript;
pub use selector::{fix_malformed_selectors, Selector, SYNTHETIC_ID_PREFIX};
pub use session::{ListeningState, Session};
pub use tabs::{find_target_tab, TabHost, TabInfo};
