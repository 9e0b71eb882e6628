//! Shared test helpers for unit and integration tests.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests and, via the `test-utils` feature, in other
//! crates' tests.

use crate::config::StageConfig;
use crate::document::{Document, Rect, Viewport};
use crate::event::{Event, EventKind};
use crate::id::NodeId;
use crate::ramp::RampGroup;
use crate::sequencer::{RevealGroup, RevealPlan, Step, StepAction};
use crate::stage::Stage;
use crate::watcher::WatchOptions;
use std::cell::RefCell;
use std::rc::Rc;

// ===========================================================================
// Documents
// ===========================================================================

/// An empty document with an 800px viewport.
pub fn page() -> Document {
    Document::new(Viewport::new(800.0))
}

/// Append `tag.class` under `parent` with the given rect.
pub fn element(doc: &mut Document, parent: NodeId, tag: &str, class: &str, rect: Rect) -> NodeId {
    let id = doc.append(parent, tag);
    doc.add_class(id, class);
    doc.set_rect(id, rect);
    id
}

/// Ids of one timeline item and its sub-nodes.
#[derive(Debug, Clone, Copy)]
pub struct TimelineItem {
    pub item: NodeId,
    pub content: Option<NodeId>,
    pub marker: NodeId,
}

/// A `.timeline-item` 200px tall at `top`, with a marker and, optionally,
/// a content block.
pub fn timeline_item(doc: &mut Document, top: f64, with_content: bool) -> TimelineItem {
    let body = doc.body();
    let item = element(doc, body, "div", "timeline-item", Rect::new(top, 200.0));
    let marker = element(doc, item, "span", "timeline-marker", Rect::new(top, 20.0));
    let content = with_content
        .then(|| element(doc, item, "div", "timeline-content", Rect::new(top, 180.0)));
    TimelineItem {
        item,
        content,
        marker,
    }
}

/// A `.stat-number` 40px tall at `top` with an optional `data-target`.
pub fn stat_number(doc: &mut Document, top: f64, target: Option<&str>) -> NodeId {
    let body = doc.body();
    let id = element(doc, body, "span", "stat-number", Rect::new(top, 40.0));
    if let Some(value) = target {
        doc.set_attribute(id, "data-target", value);
    }
    id
}

// ===========================================================================
// Configs
// ===========================================================================

/// The two-step timeline plan: show content at 200ms, pop the marker at
/// 400ms.
pub fn timeline_plan() -> RevealPlan {
    RevealPlan {
        when_class: "timeline-item".to_string(),
        enter_stagger_ms: 0,
        steps: vec![
            Step::new(200, Some("timeline-content"), StepAction::Show),
            Step::new(400, Some("timeline-marker"), StepAction::PopMarker),
        ],
    }
}

/// Timeline reveals (threshold 0.1, -50px bottom margin) plus the default
/// stat-number ramp group.
pub fn timeline_config() -> StageConfig {
    StageConfig {
        reveals: vec![RevealGroup {
            classes: vec!["timeline-item".to_string()],
            watch: WatchOptions::new(0.1, -50.0),
            enter_class: "animate-in".to_string(),
            plans: vec![timeline_plan()],
        }],
        ramps: vec![RampGroup::default()],
        ..StageConfig::default()
    }
}

// ===========================================================================
// Events
// ===========================================================================

/// Shared log of delivered events.
pub type EventLog = Rc<RefCell<Vec<Event>>>;

/// Record every delivered event of the given kinds.
pub fn record(stage: &mut Stage, kinds: &[EventKind]) -> EventLog {
    let log: EventLog = Rc::new(RefCell::new(Vec::new()));
    for &kind in kinds {
        let sink = log.clone();
        stage.on_passive(kind, Box::new(move |e| sink.borrow_mut().push(e.clone())));
    }
    log
}

/// Count of recorded events matching `kind`.
pub fn count(log: &EventLog, kind: EventKind) -> usize {
    log.borrow().iter().filter(|e| e.kind() == kind).count()
}
