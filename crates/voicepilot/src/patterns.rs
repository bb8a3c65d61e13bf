//! Transcript classification against the registered command patterns.
//!
//! The table is ordered and the first matching pattern wins; order encodes
//! priority, so the exact scroll commands sit above the catch-all click
//! pattern. Matching is a pure function over the transcript and is safe to
//! drive exhaustively from tests.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::action::{CommandCategory, MatchResult, PatternAction};

/// A registered command pattern
pub struct CommandPattern {
    pub category: CommandCategory,
    pub action: PatternAction,
    pub regex: Regex,
    /// Whether a match still needs model-side parameter resolution
    pub requires_ai: bool,
}

impl CommandPattern {
    fn new(
        category: CommandCategory,
        action: PatternAction,
        pattern: &str,
        requires_ai: bool,
    ) -> Self {
        Self {
            category,
            action,
            regex: Regex::new(pattern).expect("static command pattern must compile"),
            requires_ai,
        }
    }
}

/// The ordered pattern table, built once at startup.
pub static COMMAND_PATTERNS: Lazy<Vec<CommandPattern>> = Lazy::new(|| {
    use CommandCategory::*;
    use PatternAction::*;

    vec![
        // Tab management. Switch-tab keeps its ordinal parameter but the
        // title-based phrasing goes through the model.
        CommandPattern::new(
            Navigation,
            SwitchTab,
            r"^(?:switch|go|navigate)\s+to\s+(?:tab\s+)?(\d+|first|second|third|fourth|fifth|last)\b",
            true,
        ),
        CommandPattern::new(
            Navigation,
            SwitchTab,
            r"\bswitch\s+to\s+tab\s+(\d+|first|second|third|fourth|fifth|last)\b",
            true,
        ),
        CommandPattern::new(
            Navigation,
            NewTab,
            r"\b(?:open|create|new)\s+(?:a\s+)?(?:new\s+)?tab\b",
            false,
        ),
        CommandPattern::new(Navigation, CloseTab, r"\b(?:close|exit)\s+(?:this\s+)?tab\b", false),
        CommandPattern::new(
            Navigation,
            GoBack,
            r"^(?:(?:go|navigate)\s+back|back|return|previous(?:\s+page)?)$",
            false,
        ),
        CommandPattern::new(
            Navigation,
            GoForward,
            r"^(?:(?:go|navigate)\s+forward|forward|next(?:\s+page)?)$",
            false,
        ),
        // Exact scroll commands before anything generic
        CommandPattern::new(Scrolling, Up, r"^scroll\s+(?:up|back|backward)$", false),
        CommandPattern::new(Scrolling, Down, r"^scroll\s+(?:down|forward)$", false),
        CommandPattern::new(
            Scrolling,
            Top,
            r"^(?:scroll\s+to\s+|go\s+to\s+)?(?:the\s+)?top$",
            false,
        ),
        CommandPattern::new(
            Scrolling,
            Bottom,
            r"^(?:scroll\s+to\s+|go\s+to\s+)?(?:the\s+)?bottom$",
            false,
        ),
        // URL navigation and search are matched here but resolved by the
        // model, which normalizes the target.
        CommandPattern::new(
            Navigation,
            NavigateToUrl,
            r"\b(?:go\s+to|open|navigate\s+to)\s+([a-zA-Z0-9.-]+\.[a-zA-Z]{2,})\b",
            true,
        ),
        CommandPattern::new(Navigation, Search, r"\bsearch\s+(?:for\s+)?(.+)$", true),
        CommandPattern::new(
            System,
            Stop,
            r"\b(?:stop|end|quit|exit)\s+(?:listening|voice|recognition)\b",
            false,
        ),
        CommandPattern::new(System, Stop, r"^(?:stop|end|quit|exit)$", false),
        // Text entry; both need the model to pick the field
        CommandPattern::new(
            Input,
            Focus,
            r"^(?:focus|select)\s+(?:on\s+)?(?:the\s+)?(.*?)\s+(?:field|input|box)\b",
            true,
        ),
        CommandPattern::new(Input, Type, r"^(?:type|enter|input|write|put)\s+(.+)$", true),
        // Clicks last: the bare click is precise, the element click is the
        // broadest pattern in the table and needs the model to find its target
        CommandPattern::new(Clicking, SimpleClick, r"^(?:just\s+)?(?:click|tap|press)$", false),
        CommandPattern::new(
            Clicking,
            ElementClick,
            r"^(?:click|tap|press)\s+(?:on\s+)?(?:the\s+)?(.+?)(?:\s+(?:button|link|element))?$",
            true,
        ),
    ]
});

/// Classify a transcript against the pattern table.
///
/// The transcript is expected lowercased and trimmed. Returns the first
/// matching pattern's category/action with its capture groups as `params`
/// (empty groups filtered out), or a no-match result flagged for AI.
pub fn match_transcript(transcript: &str) -> MatchResult {
    for pattern in COMMAND_PATTERNS.iter() {
        if let Some(caps) = pattern.regex.captures(transcript) {
            let params: Vec<String> = caps
                .iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str().to_string())
                .filter(|p| !p.is_empty())
                .collect();

            debug!(
                category = ?pattern.category,
                action = ?pattern.action,
                use_ai = pattern.requires_ai,
                "transcript matched pattern"
            );

            return MatchResult {
                matched: true,
                category: Some(pattern.category),
                action: Some(pattern.action),
                params,
                use_ai: pattern.requires_ai,
            };
        }
    }

    debug!("no pattern matched transcript");
    MatchResult::no_match()
}
