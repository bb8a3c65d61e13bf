use crate::action::{CommandCategory, PatternAction};
use crate::patterns::match_transcript;

#[test]
fn scroll_down_matches_without_ai() {
    let result = match_transcript("scroll down");
    assert!(result.matched);
    assert_eq!(result.category, Some(CommandCategory::Scrolling));
    assert_eq!(result.action, Some(PatternAction::Down));
    assert!(!result.use_ai);
}

#[test]
fn scroll_up_and_synonyms() {
    assert_eq!(
        match_transcript("scroll up").action,
        Some(PatternAction::Up)
    );
    assert_eq!(
        match_transcript("scroll backward").action,
        Some(PatternAction::Up)
    );
    assert_eq!(
        match_transcript("scroll forward").action,
        Some(PatternAction::Down)
    );
}

#[test]
fn top_and_bottom_variants() {
    for phrase in ["top", "go to top", "scroll to top", "the top"] {
        let result = match_transcript(phrase);
        assert_eq!(result.action, Some(PatternAction::Top), "phrase: {phrase}");
        assert!(!result.use_ai);
    }
    for phrase in ["bottom", "scroll to bottom", "go to the bottom"] {
        assert_eq!(
            match_transcript(phrase).action,
            Some(PatternAction::Bottom),
            "phrase: {phrase}"
        );
    }
}

#[test]
fn tab_management() {
    let result = match_transcript("open a new tab");
    assert_eq!(result.action, Some(PatternAction::NewTab));
    assert!(!result.use_ai);

    let result = match_transcript("close this tab");
    assert_eq!(result.action, Some(PatternAction::CloseTab));
    assert!(!result.use_ai);
}

#[test]
fn switch_tab_keeps_ordinal_and_consults_ai() {
    let result = match_transcript("switch to tab 3");
    assert_eq!(result.category, Some(CommandCategory::Navigation));
    assert_eq!(result.action, Some(PatternAction::SwitchTab));
    assert_eq!(result.params, vec!["3".to_string()]);
    assert!(result.use_ai);

    let result = match_transcript("go to tab last");
    assert_eq!(result.action, Some(PatternAction::SwitchTab));
    assert_eq!(result.params, vec!["last".to_string()]);
}

#[test]
fn history_navigation() {
    for phrase in ["go back", "back", "previous page"] {
        assert_eq!(
            match_transcript(phrase).action,
            Some(PatternAction::GoBack),
            "phrase: {phrase}"
        );
    }
    for phrase in ["go forward", "forward", "next page"] {
        assert_eq!(
            match_transcript(phrase).action,
            Some(PatternAction::GoForward),
            "phrase: {phrase}"
        );
    }
}

#[test]
fn url_navigation_captures_domain() {
    let result = match_transcript("go to github.com");
    assert_eq!(result.action, Some(PatternAction::NavigateToUrl));
    assert_eq!(result.params, vec!["github.com".to_string()]);
    assert!(result.use_ai);
}

#[test]
fn search_captures_query() {
    let result = match_transcript("search for rust tutorials");
    assert_eq!(result.action, Some(PatternAction::Search));
    assert_eq!(result.params, vec!["rust tutorials".to_string()]);
    assert!(result.use_ai);
}

#[test]
fn stop_commands() {
    for phrase in ["stop listening", "quit voice", "stop"] {
        let result = match_transcript(phrase);
        assert_eq!(result.category, Some(CommandCategory::System), "phrase: {phrase}");
        assert_eq!(result.action, Some(PatternAction::Stop));
        assert!(!result.use_ai);
    }
}

#[test]
fn click_variants() {
    let result = match_transcript("click");
    assert_eq!(result.action, Some(PatternAction::SimpleClick));
    assert!(!result.use_ai);

    let result = match_transcript("just click");
    assert_eq!(result.action, Some(PatternAction::SimpleClick));

    let result = match_transcript("click the login button");
    assert_eq!(result.action, Some(PatternAction::ElementClick));
    assert_eq!(result.params, vec!["login".to_string()]);
    assert!(result.use_ai);
}

#[test]
fn text_entry_flagged_for_ai() {
    let result = match_transcript("type hello world");
    assert_eq!(result.category, Some(CommandCategory::Input));
    assert_eq!(result.action, Some(PatternAction::Type));
    assert_eq!(result.params, vec!["hello world".to_string()]);
    assert!(result.use_ai);

    let result = match_transcript("focus on the email field");
    assert_eq!(result.action, Some(PatternAction::Focus));
    assert_eq!(result.params, vec!["email".to_string()]);
}

#[test]
fn first_match_wins_in_priority_order() {
    // Both the new-tab pattern and the search pattern match; the earlier
    // table entry wins even though the later one is more specific to the
    // phrasing.
    let result = match_transcript("search for new tab videos");
    assert_eq!(result.action, Some(PatternAction::NewTab));
}

#[test]
fn unmatched_transcript_defers_to_ai() {
    let result = match_transcript("make the page bigger");
    assert!(!result.matched);
    assert!(result.use_ai);
    assert!(result.category.is_none());
    assert!(result.params.is_empty());
}
