//! Event router: the page's input bindings behind one owner.
//!
//! The router never mutates the document. [`EventRouter::route`] turns one
//! [`InputEvent`] into a list of [`Reaction`]s, which the stage applies in
//! order. After [`EventRouter::teardown`] every input routes to nothing.

use crate::document::Document;
use crate::id::{ListenerId, Millis, NodeId};
use crate::visual::Accent;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A user input delivered to the stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    PointerEnter { node: NodeId },
    PointerLeave { node: NodeId },
    Click { node: NodeId },
    /// `code` follows the DOM `KeyboardEvent.code` names (`Space`, `KeyH`).
    KeyDown {
        code: String,
        ctrl: bool,
        target: Option<NodeId>,
    },
}

impl InputEvent {
    pub fn key(code: &str) -> Self {
        InputEvent::KeyDown {
            code: code.to_string(),
            ctrl: false,
            target: None,
        }
    }

    pub fn ctrl_key(code: &str) -> Self {
        InputEvent::KeyDown {
            code: code.to_string(),
            ctrl: true,
            target: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Bindings
// ---------------------------------------------------------------------------

/// Which node a hover accent lands on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoverTarget {
    /// The hovered element itself.
    Element,
    /// The first descendant of the hovered element carrying this class.
    Descendant(String),
}

/// One input binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Binding {
    /// Pointer enter/leave on an element carrying one of `classes` applies
    /// the `enter`/`leave` accent to `target`.
    Hover {
        classes: Vec<String>,
        target: HoverTarget,
        enter: Accent,
        leave: Accent,
    },
    /// A click inside an element carrying `attribute` toggles `open_class`
    /// on the element whose id the attribute names. The trigger gets a
    /// pressed accent for `press_ms`.
    Toggle {
        #[serde(default = "default_toggle_attribute")]
        attribute: String,
        #[serde(default = "default_open_class")]
        open_class: String,
        #[serde(default = "default_press_ms")]
        press_ms: Millis,
    },
    /// Clicking an in-page `#id` link scrolls its target to the top.
    Anchors,
    /// Clicking the element with this id navigates to `href`.
    Navigate { id: String, href: String },
    /// A key that scrolls by `fraction` of the viewport height, unless the
    /// key went to a text field.
    PageScroll {
        #[serde(default = "default_scroll_code")]
        code: String,
        #[serde(default = "default_scroll_fraction")]
        fraction: f64,
    },
    /// Ctrl plus `code` follows the first link whose href contains
    /// `link_fragment`.
    Home {
        #[serde(default = "default_home_code")]
        code: String,
        #[serde(default = "default_home_fragment")]
        link_fragment: String,
    },
}

fn default_toggle_attribute() -> String {
    "data-toggle".to_string()
}

fn default_open_class() -> String {
    "open".to_string()
}

fn default_press_ms() -> Millis {
    180
}

fn default_scroll_code() -> String {
    "Space".to_string()
}

fn default_scroll_fraction() -> f64 {
    0.8
}

fn default_home_code() -> String {
    "KeyH".to_string()
}

fn default_home_fragment() -> String {
    "index.html".to_string()
}

impl Binding {
    pub fn hover(classes: &[&str], target: HoverTarget, enter: Accent, leave: Accent) -> Self {
        Binding::Hover {
            classes: classes.iter().map(|c| c.to_string()).collect(),
            target,
            enter,
            leave,
        }
    }

    pub fn toggle() -> Self {
        Binding::Toggle {
            attribute: default_toggle_attribute(),
            open_class: default_open_class(),
            press_ms: default_press_ms(),
        }
    }

    pub fn page_scroll() -> Self {
        Binding::PageScroll {
            code: default_scroll_code(),
            fraction: default_scroll_fraction(),
        }
    }

    pub fn home() -> Self {
        Binding::Home {
            code: default_home_code(),
            link_fragment: default_home_fragment(),
        }
    }

    pub fn navigate(id: &str, href: &str) -> Self {
        Binding::Navigate {
            id: id.to_string(),
            href: href.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Reactions
// ---------------------------------------------------------------------------

/// A change the stage should make in response to input.
#[derive(Debug, Clone, PartialEq)]
pub enum Reaction {
    Accent {
        node: NodeId,
        accent: Accent,
    },
    Toggle {
        details: NodeId,
        trigger: NodeId,
        open_class: String,
        press_ms: Millis,
    },
    ScrollTo {
        top: f64,
    },
    ScrollBy {
        delta: f64,
    },
    Navigate {
        href: String,
    },
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct EventRouter {
    bindings: SlotMap<ListenerId, Binding>,
    /// Registration order; `SlotMap` iteration order is not.
    order: Vec<ListenerId>,
    torn_down: bool,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, binding: Binding) -> ListenerId {
        let id = self.bindings.insert(binding);
        self.order.push(id);
        id
    }

    pub fn unregister(&mut self, id: ListenerId) -> bool {
        self.order.retain(|&l| l != id);
        self.bindings.remove(id).is_some()
    }

    /// Drop every binding. Later input is ignored, including input for
    /// bindings registered afterwards.
    pub fn teardown(&mut self) {
        self.bindings.clear();
        self.order.clear();
        self.torn_down = true;
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Reactions for `input`, in binding registration order.
    pub fn route(&self, doc: &Document, input: &InputEvent) -> Vec<Reaction> {
        if self.torn_down {
            return Vec::new();
        }
        self.order
            .iter()
            .filter_map(|&id| self.bindings.get(id))
            .filter_map(|binding| react(doc, binding, input))
            .collect()
    }
}

fn react(doc: &Document, binding: &Binding, input: &InputEvent) -> Option<Reaction> {
    match (binding, input) {
        (
            Binding::Hover {
                classes,
                target,
                enter,
                leave,
            },
            InputEvent::PointerEnter { node } | InputEvent::PointerLeave { node },
        ) => {
            let accent = match input {
                InputEvent::PointerEnter { .. } => *enter,
                _ => *leave,
            };
            hover_target(doc, classes, target, *node).map(|node| Reaction::Accent { node, accent })
        }
        (
            Binding::Toggle {
                attribute,
                open_class,
                press_ms,
            },
            InputEvent::Click { node },
        ) => {
            let trigger = doc.closest_with_attribute(*node, attribute)?;
            let details = doc.find_by_id(doc.attribute(trigger, attribute)?)?;
            Some(Reaction::Toggle {
                details,
                trigger,
                open_class: open_class.clone(),
                press_ms: *press_ms,
            })
        }
        (Binding::Anchors, InputEvent::Click { node }) => {
            let link = closest(doc, *node, |n| {
                doc.tag(n) == Some("a")
                    && doc.attribute(n, "href").is_some_and(|h| h.starts_with('#'))
            })?;
            follow_link(doc, link)
        }
        (Binding::Navigate { id, href }, InputEvent::Click { node }) => {
            closest(doc, *node, |n| doc.attribute(n, "id") == Some(id.as_str()))?;
            Some(Reaction::Navigate { href: href.clone() })
        }
        (
            Binding::PageScroll { code, fraction },
            InputEvent::KeyDown {
                code: pressed,
                target,
                ..
            },
        ) => {
            if pressed != code || target.is_some_and(|t| is_text_field(doc, t)) {
                return None;
            }
            Some(Reaction::ScrollBy {
                delta: doc.viewport().height * fraction,
            })
        }
        (
            Binding::Home {
                code,
                link_fragment,
            },
            InputEvent::KeyDown {
                code: pressed,
                ctrl: true,
                ..
            },
        ) if pressed == code => {
            let link = doc.find_link_containing(link_fragment)?;
            follow_link(doc, link)
        }
        _ => None,
    }
}

fn closest(doc: &Document, node: NodeId, pred: impl Fn(NodeId) -> bool) -> Option<NodeId> {
    doc.node(node)?;
    std::iter::once(node).chain(doc.ancestors(node)).find(|&n| pred(n))
}

fn hover_target(
    doc: &Document,
    classes: &[String],
    target: &HoverTarget,
    node: NodeId,
) -> Option<NodeId> {
    let element = closest(doc, node, |n| classes.iter().any(|c| doc.has_class(n, c)))?;
    match target {
        HoverTarget::Element => Some(element),
        HoverTarget::Descendant(class) => {
            let target = doc.query_descendant(element, class);
            if target.is_none() {
                log::debug!("hover target .{class} missing under {element:?}");
            }
            target
        }
    }
}

/// What clicking `link` does: `#id` scrolls to the target, anything else
/// navigates.
fn follow_link(doc: &Document, link: NodeId) -> Option<Reaction> {
    let href = doc.attribute(link, "href")?;
    match href.strip_prefix('#') {
        Some(id) => {
            let Some(target) = doc.find_by_id(id) else {
                log::debug!("anchor target #{id} missing");
                return None;
            };
            doc.rect(target).map(|r| Reaction::ScrollTo { top: r.top })
        }
        None => Some(Reaction::Navigate {
            href: href.to_string(),
        }),
    }
}

fn is_text_field(doc: &Document, node: NodeId) -> bool {
    matches!(doc.tag(node), Some("input" | "textarea"))
}
