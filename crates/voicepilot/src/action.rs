//! Command shapes flowing through the pipeline.
//!
//! Two families live here: the pattern matcher's output ([`MatchResult`]),
//! and the normalized [`CanonicalAction`] the execution layer consumes. The
//! untrusted model reply ([`AiReply`]) is also defined here; it is validated
//! and mapped by the interpreter before anything executes it.

use serde::{Deserialize, Serialize};

/// Category of a registered command pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandCategory {
    Navigation,
    Scrolling,
    Clicking,
    Input,
    System,
}

/// Action attached to a registered command pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatternAction {
    SwitchTab,
    NewTab,
    CloseTab,
    GoBack,
    GoForward,
    NavigateToUrl,
    Search,
    Up,
    Down,
    Top,
    Bottom,
    SimpleClick,
    ElementClick,
    Type,
    Focus,
    Stop,
}

/// Result of classifying a transcript against the pattern table.
///
/// `use_ai` is set when the category matched but the parameters still need
/// model-side resolution (element descriptions, tab titles, free text), and
/// always when nothing matched at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub matched: bool,
    pub category: Option<CommandCategory>,
    pub action: Option<PatternAction>,
    pub params: Vec<String>,
    pub use_ai: bool,
}

impl MatchResult {
    pub fn no_match() -> Self {
        Self {
            matched: false,
            category: None,
            action: None,
            params: Vec::new(),
            use_ai: true,
        }
    }

    /// Whether this match can serve as a fallback execution candidate
    pub fn is_executable(&self) -> bool {
        self.matched && self.category.is_some() && self.action.is_some()
    }
}

/// Scroll direction for plain scrolls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    /// Signed multiplier (+down, -up) applied to scroll amounts
    pub fn sign(&self) -> f64 {
        match self {
            ScrollDirection::Up => -1.0,
            ScrollDirection::Down => 1.0,
        }
    }
}

/// Advanced scroll flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScrollType {
    ToPercent,
    ByPages,
}

/// Target of a tab switch, as resolved by the interpreter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TabTarget {
    /// 1-based position in the current tab listing snapshot
    Index(usize),
    /// Case-insensitive substring of a tab title
    Title(String),
}

/// Tab-level navigation operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum NavigationOp {
    Back,
    Forward,
    NewTab,
    CloseTab,
    SwitchTab { target: Option<TabTarget> },
}

/// The normalized action shape the execution layer consumes.
///
/// This is the only structure dispatched against tabs or the page, whether
/// it originated from a pattern match or from the model. Unknown model
/// actions never reach this type; they map to [`CanonicalAction::None`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CanonicalAction {
    /// Inert outcome: AI unavailable, unparseable, or unrecognized
    None,
    Click {
        selector: String,
    },
    Input {
        selector: String,
        value: String,
    },
    Select {
        selector: String,
        value: String,
    },
    Scroll {
        direction: ScrollDirection,
    },
    AdvancedScroll {
        scroll_type: ScrollType,
        percent: f64,
        pages: f64,
        direction: ScrollDirection,
    },
    Navigation {
        #[serde(flatten)]
        op: NavigationOp,
    },
    NavigateToUrl {
        url: String,
        new_tab: bool,
    },
}

impl CanonicalAction {
    pub fn is_none(&self) -> bool {
        matches!(self, CanonicalAction::None)
    }
}

/// Raw action descriptor returned by the model endpoint.
///
/// Untrusted external input: every field is optional and `target` may be a
/// number, a string, an object or null. The interpreter coerces it per
/// action before anything downstream sees it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AiReply {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub target: Option<serde_json::Value>,
    #[serde(default)]
    pub details: Option<AiReplyDetails>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Optional `details` object of an [`AiReply`]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiReplyDetails {
    #[serde(default)]
    pub scroll_type: Option<String>,
    #[serde(default)]
    pub percent: Option<f64>,
    #[serde(default)]
    pub pages: Option<f64>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub new_tab: Option<bool>,
}
