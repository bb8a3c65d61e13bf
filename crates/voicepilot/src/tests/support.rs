use crate::dom::{Dom, ElementBuilder};
use crate::page::inventory::IdRegistry;

/// A representative page: mixed identified/unidentified interactive
/// elements, a hidden element, and one below the fold.
pub fn sample_page() -> Dom {
    let dom = Dom::new("Example Dashboard", "https://example.com/home", 1280.0, 720.0);
    dom.set_content_height(2000.0);

    let root = ElementBuilder::new("body")
        .rect(0.0, 0.0, 1280.0, 2000.0)
        .child(ElementBuilder::new("button").text("Login").rect(10.0, 10.0, 100.0, 30.0))
        .child(
            ElementBuilder::new("a")
                .text("Dashboard")
                .attr("href", "/dashboard")
                .rect(10.0, 50.0, 120.0, 20.0),
        )
        .child(
            ElementBuilder::new("input")
                .input_type("text")
                .attr("name", "email")
                .placeholder("Email")
                .rect(10.0, 90.0, 200.0, 30.0),
        )
        .child(
            ElementBuilder::new("select")
                .id("country")
                .option("United States", "us")
                .option("Canada", "ca")
                .rect(10.0, 130.0, 150.0, 30.0),
        )
        .child(
            ElementBuilder::new("button")
                .id("save-btn")
                .text("Save")
                .rect(10.0, 170.0, 80.0, 30.0),
        )
        .child(
            ElementBuilder::new("div")
                .role("button")
                .text("Menu")
                .rect(10.0, 210.0, 60.0, 30.0),
        )
        .child(
            ElementBuilder::new("button")
                .text("Ghost")
                .display("none")
                .rect(10.0, 250.0, 80.0, 30.0),
        )
        .child(
            ElementBuilder::new("p")
                .text("Welcome back")
                .rect(10.0, 290.0, 200.0, 20.0),
        )
        .child(
            ElementBuilder::new("button")
                .text("Below Fold")
                .rect(10.0, 900.0, 100.0, 30.0),
        )
        .build();
    dom.set_root(root);
    dom
}

pub fn scanned_page() -> (Dom, IdRegistry) {
    let dom = sample_page();
    let mut registry = IdRegistry::new();
    registry.assign_ids(&dom);
    (dom, registry)
}
