//! Tab and window management seam.
//!
//! The pipeline consumes the browser's tab surface as a black-box async
//! collaborator behind [`TabHost`]. Target resolution (ordinal words,
//! 1-based indices, title substrings) lives here so it can be tested
//! without a browser.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::action::TabTarget;
use crate::errors::Result;

/// Descriptor of one open tab. `index` is 1-based and stable only within
/// the listing snapshot it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub id: u32,
    pub index: usize,
    pub title: String,
    pub url: String,
    pub window_id: u32,
}

/// Browser tab operations the orchestrator dispatches to
#[async_trait]
pub trait TabHost: Send + Sync {
    async fn active_tab(&self) -> Result<TabInfo>;
    /// All tabs, with 1-based indices assigned in listing order
    async fn list_tabs(&self) -> Result<Vec<TabInfo>>;
    async fn create_tab(&self, url: Option<&str>) -> Result<TabInfo>;
    async fn close_tab(&self, id: u32) -> Result<()>;
    async fn activate_tab(&self, id: u32) -> Result<()>;
    async fn focus_window(&self, window_id: u32) -> Result<()>;
    async fn navigate(&self, id: u32, url: &str) -> Result<()>;
    async fn go_back(&self, id: u32) -> Result<()>;
    async fn go_forward(&self, id: u32) -> Result<()>;
}

/// Resolve a tab target against a listing snapshot: a numeric target is a
/// 1-based index, anything else is a case-insensitive title substring
/// (first match wins).
pub fn find_target_tab<'a>(tabs: &'a [TabInfo], target: &TabTarget) -> Option<&'a TabInfo> {
    match target {
        TabTarget::Index(index) => {
            if *index == 0 {
                return None;
            }
            tabs.get(index - 1)
        }
        TabTarget::Title(title) => {
            let needle = title.to_lowercase();
            tabs.iter()
                .find(|tab| tab.title.to_lowercase().contains(&needle))
        }
    }
}

/// A spoken tab position: a concrete 1-based slot or the last tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabOrdinal {
    Position(usize),
    Last,
}

impl TabOrdinal {
    /// Concrete 1-based index within a listing of `tab_count` tabs
    pub fn to_index(self, tab_count: usize) -> usize {
        match self {
            TabOrdinal::Position(n) => n,
            TabOrdinal::Last => tab_count,
        }
    }
}

/// Parse the ordinal words the switch-tab patterns capture
pub fn parse_tab_ordinal(word: &str) -> Option<TabOrdinal> {
    if let Ok(n) = word.trim().parse::<usize>() {
        return (n > 0).then_some(TabOrdinal::Position(n));
    }
    match word.trim().to_lowercase().as_str() {
        "first" => Some(TabOrdinal::Position(1)),
        "second" => Some(TabOrdinal::Position(2)),
        "third" => Some(TabOrdinal::Position(3)),
        "fourth" => Some(TabOrdinal::Position(4)),
        "fifth" => Some(TabOrdinal::Position(5)),
        "last" => Some(TabOrdinal::Last),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tabs() -> Vec<TabInfo> {
        ["GitHub - Home", "Rust Documentation", "Inbox"]
            .iter()
            .enumerate()
            .map(|(i, title)| TabInfo {
                id: i as u32 + 100,
                index: i + 1,
                title: title.to_string(),
                url: format!("https://example.com/{i}"),
                window_id: 1,
            })
            .collect()
    }

    #[test]
    fn numeric_targets_are_one_based() {
        let tabs = tabs();
        let found = find_target_tab(&tabs, &TabTarget::Index(1)).unwrap();
        assert_eq!(found.title, "GitHub - Home");
        assert!(find_target_tab(&tabs, &TabTarget::Index(0)).is_none());
        assert!(find_target_tab(&tabs, &TabTarget::Index(4)).is_none());
    }

    #[test]
    fn title_targets_match_case_insensitive_substring() {
        let tabs = tabs();
        let found = find_target_tab(&tabs, &TabTarget::Title("git".to_string())).unwrap();
        assert_eq!(found.title, "GitHub - Home");
        assert!(find_target_tab(&tabs, &TabTarget::Title("jira".to_string())).is_none());
    }

    #[test]
    fn ordinal_words() {
        assert_eq!(parse_tab_ordinal("2"), Some(TabOrdinal::Position(2)));
        assert_eq!(parse_tab_ordinal("third"), Some(TabOrdinal::Position(3)));
        assert_eq!(parse_tab_ordinal("last"), Some(TabOrdinal::Last));
        assert_eq!(parse_tab_ordinal("0"), None);
        assert_eq!(parse_tab_ordinal("umpteenth"), None);
        assert_eq!(TabOrdinal::Last.to_index(3), 3);
    }
}
