use crate::selector::{
    classify_target, clean_spoken_text, extract_text_content, extract_text_from_xpath,
    fix_malformed_selectors, Selector,
};

#[test]
fn parses_id_selector() {
    assert_eq!(
        Selector::from("#vp-target-login-0"),
        Selector::Id("vp-target-login-0".to_string())
    );
}

#[test]
fn parses_text_descriptor() {
    assert_eq!(
        Selector::from("[text='Login']"),
        Selector::Text("Login".to_string())
    );
    assert_eq!(
        Selector::from("[text=\"Sign up\"]"),
        Selector::Text("Sign up".to_string())
    );
}

#[test]
fn parses_xpath_both_prefixes() {
    assert_eq!(
        Selector::from("xpath=//a[text()='Dashboard']"),
        Selector::XPath("//a[text()='Dashboard']".to_string())
    );
    assert_eq!(
        Selector::from("//button"),
        Selector::XPath("//button".to_string())
    );
}

#[test]
fn parses_has_text() {
    assert_eq!(
        Selector::from("button:has-text('Save')"),
        Selector::HasText {
            tag: "button".to_string(),
            text: "Save".to_string()
        }
    );
}

#[test]
fn parses_attribute_shape() {
    assert_eq!(
        Selector::from("[aria-label='Close']"),
        Selector::Attribute {
            name: "aria-label".to_string(),
            value: "Close".to_string()
        }
    );
}

#[test]
fn plain_word_is_free_text() {
    assert_eq!(Selector::from("Login"), Selector::FreeText("Login".to_string()));
}

#[test]
fn current_position_sentinel() {
    assert_eq!(Selector::from("currentPosition"), Selector::CurrentPosition);
}

#[test]
fn fixes_mixed_quote_has_text() {
    assert_eq!(
        fix_malformed_selectors("button:has-text(\"Submit')"),
        "button:has-text('Submit')"
    );
    assert_eq!(
        fix_malformed_selectors("a:has-text(Dashboard)"),
        "a:has-text('Dashboard')"
    );
}

#[test]
fn fixes_loose_text_attribute() {
    assert_eq!(fix_malformed_selectors("[text=Login]"), "[text='Login']");
    assert_eq!(fix_malformed_selectors("[text=\"Login\"]"), "[text='Login']");
}

#[test]
fn fix_is_idempotent_on_well_formed_selectors() {
    for selector in ["button:has-text('Save')", "[text='Login']", "#save-btn", "div.card"] {
        let once = fix_malformed_selectors(selector);
        assert_eq!(once, fix_malformed_selectors(&once), "selector: {selector}");
        assert_eq!(once, selector, "well-formed input must pass through");
    }
}

#[test]
fn classify_wraps_plain_text() {
    assert_eq!(classify_target("login"), "[text='login']");
    assert_eq!(classify_target("Sign out"), "[text='Sign out']");
}

#[test]
fn classify_converts_playwright_text_prefix() {
    assert_eq!(classify_target("text=Sign up"), "button:has-text('Sign up')");
}

#[test]
fn classify_passes_qualified_selectors_through() {
    assert_eq!(classify_target("#save-btn"), "#save-btn");
    assert_eq!(classify_target("[text='Login']"), "[text='Login']");
    assert_eq!(
        classify_target("//a[text()='Dashboard']"),
        "//a[text()='Dashboard']"
    );
    assert_eq!(classify_target("button:has-text('Go')"), "button:has-text('Go')");
}

#[test]
fn extracts_text_from_xpath_forms() {
    assert_eq!(
        extract_text_from_xpath("//a[text()='Dashboard']"),
        Some("Dashboard".to_string())
    );
    assert_eq!(
        extract_text_from_xpath("//a[contains(text(), 'Dash')]"),
        Some("Dash".to_string())
    );
    assert_eq!(extract_text_from_xpath("//a[@href='/home']"), None);
}

#[test]
fn extracts_text_content_from_descriptors() {
    assert_eq!(
        extract_text_content("[text='Login']"),
        Some("Login".to_string())
    );
    assert_eq!(
        extract_text_content("button:has-text('Save')"),
        Some("Save".to_string())
    );
    assert_eq!(extract_text_content("Login"), Some("Login".to_string()));
}

#[test]
fn cleans_trailing_punctuation() {
    assert_eq!(clean_spoken_text("Sign out."), "Sign out");
    assert_eq!(clean_spoken_text("  Save!  "), "Save");
    assert_eq!(clean_spoken_text("Login"), "Login");
}
