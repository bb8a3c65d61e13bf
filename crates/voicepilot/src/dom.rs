//! In-process document model.
//!
//! The page-side components (inventory, resolver, executor) operate against
//! this tree rather than a live browser document, which keeps them
//! synchronously testable and lets an embedder mirror a real DOM into it.
//! [`DomElement`] is a cheap cloneable handle over shared node state;
//! interactions are recorded into an effect log the executor's callers (and
//! tests) can inspect, and structural mutations surface as an event stream
//! the inventory consumes to decide when to re-scan.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Bounding rectangle in document coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// The subset of computed style the visibility filter inspects
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: String,
    pub opacity: f64,
    pub pointer_events: String,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: "block".to_string(),
            visibility: "visible".to_string(),
            opacity: 1.0,
            pointer_events: "auto".to_string(),
        }
    }
}

/// An option entry of a `<select>` element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub text: String,
    pub value: String,
}

/// Observable side effect of an interaction, recorded on the owning document
#[derive(Debug, Clone, PartialEq)]
pub enum DomEvent {
    Click { target: String, synthetic: bool },
    Input { target: String, value: String },
    Change { target: String },
    Focus { target: String },
    ScrollIntoView { target: String },
}

/// A structural mutation record; only element additions trigger re-scans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralChange {
    ElementAdded,
    AttributeChanged,
    TextChanged,
}

type EventLog = Arc<Mutex<Vec<DomEvent>>>;

struct NodeState {
    tag: String,
    attrs: Mutex<HashMap<String, String>>,
    own_text: Mutex<String>,
    style: ComputedStyle,
    rect: Rect,
    /// Whether the element produces a rendered box (`offsetParent` analogue)
    rendered: bool,
    /// Test hook: make the native click reject so the synthesized-event
    /// fallback path runs
    fail_native_click: bool,
    value: Mutex<String>,
    options: Vec<SelectOption>,
    children: Mutex<Vec<DomElement>>,
    log: Mutex<Option<EventLog>>,
}

/// Handle to a document node
#[derive(Clone)]
pub struct DomElement(Arc<NodeState>);

impl std::fmt::Debug for DomElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomElement")
            .field("tag", &self.0.tag)
            .field("id", &self.id())
            .field("text", &self.text_content())
            .finish()
    }
}

impl DomElement {
    pub fn tag(&self) -> &str {
        &self.0.tag
    }

    /// Stable identity for this node, independent of any attribute
    pub fn key(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    pub fn same_node(&self, other: &DomElement) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn id(&self) -> Option<String> {
        self.attr("id").filter(|id| !id.is_empty())
    }

    pub fn set_id(&self, id: &str) {
        self.set_attr("id", id);
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        self.0.attrs.lock().unwrap().get(name).cloned()
    }

    pub fn set_attr(&self, name: &str, value: &str) {
        self.0
            .attrs
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.0.attrs.lock().unwrap().contains_key(name)
    }

    pub fn role(&self) -> Option<String> {
        self.attr("role")
    }

    /// Concatenated text of this node and its descendants
    pub fn text_content(&self) -> String {
        let mut out = self.0.own_text.lock().unwrap().clone();
        for child in self.children() {
            out.push_str(&child.text_content());
        }
        out
    }

    pub fn rect(&self) -> Rect {
        self.0.rect
    }

    pub fn children(&self) -> Vec<DomElement> {
        self.0.children.lock().unwrap().clone()
    }

    /// This node and every descendant, in document (preorder) order
    pub fn descendants(&self) -> Vec<DomElement> {
        let mut out = Vec::new();
        let mut stack = vec![self.clone()];
        while let Some(el) = stack.pop() {
            out.push(el.clone());
            let children = el.children();
            for child in children.into_iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Whether this element would be considered interactive-visible: not
    /// styled away, not `hidden`/`aria-hidden`, and producing a rendered box
    pub fn is_visible(&self) -> bool {
        let style = &self.0.style;
        if style.display == "none"
            || style.visibility == "hidden"
            || style.opacity == 0.0
            || style.pointer_events == "none"
        {
            return false;
        }
        if self.has_attr("hidden") {
            return false;
        }
        if self.attr("aria-hidden").as_deref() == Some("true") {
            return false;
        }
        self.0.rendered
    }

    pub fn value(&self) -> String {
        self.0.value.lock().unwrap().clone()
    }

    pub fn set_value(&self, value: &str) {
        *self.0.value.lock().unwrap() = value.to_string();
    }

    pub fn options(&self) -> &[SelectOption] {
        &self.0.options
    }

    /// Native click; rejects when the node is configured to, so callers can
    /// exercise the synthesized-event fallback
    pub fn click(&self) -> std::result::Result<(), String> {
        if self.0.fail_native_click {
            return Err("native click rejected".to_string());
        }
        self.emit(DomEvent::Click {
            target: self.describe(),
            synthetic: false,
        });
        Ok(())
    }

    /// Dispatch a synthesized click event; returns whether it was delivered
    pub fn dispatch_click(&self) -> bool {
        self.emit(DomEvent::Click {
            target: self.describe(),
            synthetic: true,
        });
        true
    }

    pub fn focus(&self) {
        self.emit(DomEvent::Focus {
            target: self.describe(),
        });
    }

    pub fn notify_input(&self) {
        self.emit(DomEvent::Input {
            target: self.describe(),
            value: self.value(),
        });
    }

    pub fn notify_change(&self) {
        self.emit(DomEvent::Change {
            target: self.describe(),
        });
    }

    /// Short label for event records: the id when present, else the tag
    pub fn describe(&self) -> String {
        self.id().unwrap_or_else(|| self.0.tag.clone())
    }

    fn emit(&self, event: DomEvent) {
        if let Some(log) = self.0.log.lock().unwrap().as_ref() {
            log.lock().unwrap().push(event);
        }
    }

    fn attach_log(&self, log: &EventLog) {
        for el in self.descendants() {
            *el.0.log.lock().unwrap() = Some(log.clone());
        }
    }
}

/// Builder for document nodes, used by embedders and tests
pub struct ElementBuilder {
    tag: String,
    attrs: HashMap<String, String>,
    text: String,
    style: ComputedStyle,
    rect: Rect,
    rendered: bool,
    fail_native_click: bool,
    value: String,
    options: Vec<SelectOption>,
    children: Vec<DomElement>,
}

impl ElementBuilder {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            attrs: HashMap::new(),
            text: String::new(),
            style: ComputedStyle::default(),
            rect: Rect::new(0.0, 0.0, 100.0, 20.0),
            rendered: true,
            fail_native_click: false,
            value: String::new(),
            options: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.attrs.insert("id".to_string(), id.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn role(self, role: &str) -> Self {
        self.attr("role", role)
    }

    pub fn input_type(self, ty: &str) -> Self {
        self.attr("type", ty)
    }

    pub fn placeholder(self, text: &str) -> Self {
        self.attr("placeholder", text)
    }

    pub fn aria_label(self, label: &str) -> Self {
        self.attr("aria-label", label)
    }

    pub fn rect(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.rect = Rect::new(x, y, width, height);
        self
    }

    pub fn display(mut self, value: &str) -> Self {
        self.style.display = value.to_string();
        self
    }

    pub fn visibility(mut self, value: &str) -> Self {
        self.style.visibility = value.to_string();
        self
    }

    pub fn opacity(mut self, value: f64) -> Self {
        self.style.opacity = value;
        self
    }

    pub fn not_rendered(mut self) -> Self {
        self.rendered = false;
        self
    }

    pub fn fail_native_click(mut self) -> Self {
        self.fail_native_click = true;
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    pub fn option(mut self, text: &str, value: &str) -> Self {
        self.options.push(SelectOption {
            text: text.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn child(mut self, child: ElementBuilder) -> Self {
        self.children.push(child.build());
        self
    }

    pub fn build(self) -> DomElement {
        DomElement(Arc::new(NodeState {
            tag: self.tag,
            attrs: Mutex::new(self.attrs),
            own_text: Mutex::new(self.text),
            style: self.style,
            rect: self.rect,
            rendered: self.rendered,
            fail_native_click: self.fail_native_click,
            value: Mutex::new(self.value),
            options: self.options,
            children: Mutex::new(self.children),
            log: Mutex::new(None),
        }))
    }
}

struct DomInner {
    title: Mutex<String>,
    url: Mutex<String>,
    viewport: (f64, f64),
    content_height: Mutex<f64>,
    root: Mutex<Option<DomElement>>,
    scroll_top: Mutex<f64>,
    pointer: Mutex<(f64, f64)>,
    events: EventLog,
    changes: Mutex<Vec<StructuralChange>>,
}

/// A document: node tree, viewport, scroll position and effect log.
/// One `Dom` corresponds to one page load; navigation means a fresh `Dom`.
#[derive(Clone)]
pub struct Dom {
    inner: Arc<DomInner>,
}

impl Dom {
    pub fn new(title: &str, url: &str, viewport_width: f64, viewport_height: f64) -> Self {
        Self {
            inner: Arc::new(DomInner {
                title: Mutex::new(title.to_string()),
                url: Mutex::new(url.to_string()),
                viewport: (viewport_width, viewport_height),
                content_height: Mutex::new(viewport_height),
                root: Mutex::new(None),
                scroll_top: Mutex::new(0.0),
                pointer: Mutex::new((viewport_width / 2.0, viewport_height / 2.0)),
                events: Arc::new(Mutex::new(Vec::new())),
                changes: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn title(&self) -> String {
        self.inner.title.lock().unwrap().clone()
    }

    pub fn url(&self) -> String {
        self.inner.url.lock().unwrap().clone()
    }

    pub fn viewport(&self) -> (f64, f64) {
        self.inner.viewport
    }

    pub fn set_content_height(&self, height: f64) {
        *self.inner.content_height.lock().unwrap() = height.max(self.inner.viewport.1);
    }

    pub fn content_height(&self) -> f64 {
        *self.inner.content_height.lock().unwrap()
    }

    pub fn set_root(&self, root: DomElement) {
        root.attach_log(&self.inner.events);
        *self.inner.root.lock().unwrap() = Some(root);
    }

    pub fn root(&self) -> Option<DomElement> {
        self.inner.root.lock().unwrap().clone()
    }

    /// Append a subtree under `parent`, recording a structural change
    pub fn append_child(&self, parent: &DomElement, child: DomElement) {
        child.attach_log(&self.inner.events);
        parent.0.children.lock().unwrap().push(child);
        self.inner
            .changes
            .lock()
            .unwrap()
            .push(StructuralChange::ElementAdded);
    }

    /// Record a non-structural mutation (does not trigger re-scans)
    pub fn note_attribute_change(&self) {
        self.inner
            .changes
            .lock()
            .unwrap()
            .push(StructuralChange::AttributeChanged);
    }

    pub fn note_text_change(&self) {
        self.inner
            .changes
            .lock()
            .unwrap()
            .push(StructuralChange::TextChanged);
    }

    /// Drain pending mutation records
    pub fn drain_structural_changes(&self) -> Vec<StructuralChange> {
        std::mem::take(&mut *self.inner.changes.lock().unwrap())
    }

    /// Every element in document order
    pub fn all_elements(&self) -> Vec<DomElement> {
        match self.root() {
            Some(root) => root.descendants(),
            None => Vec::new(),
        }
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<DomElement> {
        self.all_elements()
            .into_iter()
            .find(|el| el.id().as_deref() == Some(id))
    }

    /// Viewport-relative rectangle (document rect shifted by scroll)
    pub fn client_rect(&self, el: &DomElement) -> Rect {
        let rect = el.rect();
        Rect::new(rect.x, rect.y - self.scroll_top(), rect.width, rect.height)
    }

    /// Whether the element's box currently sits fully inside the viewport
    pub fn is_in_viewport(&self, el: &DomElement) -> bool {
        let (vw, vh) = self.inner.viewport;
        let rect = self.client_rect(el);
        rect.y >= 0.0
            && rect.x >= 0.0
            && rect.y + rect.height <= vh
            && rect.x + rect.width <= vw
            && rect.width > 0.0
            && rect.height > 0.0
    }

    /// Topmost rendered element whose box contains the viewport point
    pub fn element_from_point(&self, x: f64, y: f64) -> Option<DomElement> {
        self.all_elements()
            .into_iter()
            .filter(|el| el.is_visible())
            .filter(|el| self.client_rect(el).contains(x, y))
            .next_back()
    }

    pub fn pointer(&self) -> (f64, f64) {
        *self.inner.pointer.lock().unwrap()
    }

    pub fn set_pointer(&self, x: f64, y: f64) {
        *self.inner.pointer.lock().unwrap() = (x, y);
    }

    pub fn scroll_top(&self) -> f64 {
        *self.inner.scroll_top.lock().unwrap()
    }

    fn max_scroll(&self) -> f64 {
        (self.content_height() - self.inner.viewport.1).max(0.0)
    }

    pub fn scroll_to(&self, top: f64) {
        *self.inner.scroll_top.lock().unwrap() = top.clamp(0.0, self.max_scroll());
    }

    pub fn scroll_by(&self, delta: f64) {
        self.scroll_to(self.scroll_top() + delta);
    }

    /// Scroll so the element's box is centered in the viewport
    pub fn scroll_element_into_view(&self, el: &DomElement) {
        let rect = el.rect();
        let (_, vh) = self.inner.viewport;
        self.scroll_to(rect.y + rect.height / 2.0 - vh / 2.0);
        el.emit(DomEvent::ScrollIntoView {
            target: el.describe(),
        });
    }

    /// Snapshot of the interaction effect log
    pub fn events(&self) -> Vec<DomEvent> {
        self.inner.events.lock().unwrap().clone()
    }
}
