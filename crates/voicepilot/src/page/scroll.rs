//! Page scrolling: the plain relative step plus the advanced modes
//! (scroll-to-percent and scroll-by-pages) and the scroll position report.

use serde::{Deserialize, Serialize};

use crate::action::ScrollDirection;
use crate::dom::Dom;

/// Step size of a plain "scroll up" / "scroll down"
pub const SCROLL_STEP: f64 = 300.0;

/// Scroll position report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollInfo {
    pub current_position: f64,
    pub max_scroll: f64,
    pub viewport_height: f64,
    pub total_height: f64,
    pub percent_scrolled: f64,
}

pub fn scroll_relative(dom: &Dom, direction: ScrollDirection) {
    dom.scroll_by(SCROLL_STEP * direction.sign());
}

pub fn scroll_to_percent(dom: &Dom, percent: f64) {
    let target = dom.content_height() * (percent.clamp(0.0, 100.0) / 100.0);
    dom.scroll_to(target);
}

/// Scroll by whole viewport heights in the given direction
pub fn scroll_by_pages(dom: &Dom, pages: f64, direction: ScrollDirection) {
    let (_, viewport_height) = dom.viewport();
    dom.scroll_by(pages * viewport_height * direction.sign());
}

pub fn scroll_info(dom: &Dom) -> ScrollInfo {
    let (_, viewport_height) = dom.viewport();
    let total_height = dom.content_height();
    let max_scroll = (total_height - viewport_height).max(0.0);
    let current_position = dom.scroll_top();
    let percent_scrolled = if max_scroll > 0.0 {
        (current_position / max_scroll) * 100.0
    } else {
        0.0
    };

    ScrollInfo {
        current_position,
        max_scroll,
        viewport_height,
        total_height,
        percent_scrolled,
    }
}
