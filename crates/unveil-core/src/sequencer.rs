//! Reveal sequencer: the immediate base transition plus timed sub-steps.
//!
//! The sequencer itself holds no timers. [`RevealSequencer::enter`] applies
//! the base transition and returns the steps to schedule; the stage puts one
//! timer per step on the scheduler and calls [`apply_step`] when it fires.

use crate::document::Document;
use crate::id::{Millis, NodeId};
use crate::visual::{Accent, Reveal};
use crate::watcher::WatchOptions;
use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// What a step does to its target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepAction {
    /// Fade the target in to its resting position.
    Show,
    /// Fade the target out.
    Hide,
    /// Run the marker pop keyframe.
    PopMarker,
    /// Apply the scale-emphasis accent.
    Emphasize,
    /// Add a class to the target.
    AddClass(String),
    /// Remove the target (and its subtree) from the document.
    Detach,
    /// Start the base entry animation on the target.
    AnimateIn,
}

/// `delay_ms` after the parent reveal, apply `action` to the first
/// descendant carrying `target_class` (or to the element itself when `None`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Step {
    pub delay_ms: Millis,
    #[serde(default)]
    pub target_class: Option<String>,
    pub action: StepAction,
}

impl Step {
    pub fn new(delay_ms: Millis, target_class: Option<&str>, action: StepAction) -> Self {
        Self {
            delay_ms,
            target_class: target_class.map(str::to_string),
            action,
        }
    }

    /// A step acting on the element itself.
    pub fn on_self(delay_ms: Millis, action: StepAction) -> Self {
        Self::new(delay_ms, None, action)
    }
}

/// Steps that apply to elements carrying `when_class`.
///
/// With a non-zero `enter_stagger_ms`, the n-th such element in document
/// order (counting from 0, fixed at page-ready) starts its base animation
/// `n * enter_stagger_ms` after entry. Step delays stay relative to entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealPlan {
    pub when_class: String,
    #[serde(default)]
    pub enter_stagger_ms: Millis,
    pub steps: Vec<Step>,
}

/// One watched group of observable elements: the classes that identify them,
/// the intersection options, the class added on entry, and the step plans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevealGroup {
    pub classes: Vec<String>,
    #[serde(default)]
    pub watch: WatchOptions,
    #[serde(default = "default_enter_class")]
    pub enter_class: String,
    #[serde(default)]
    pub plans: Vec<RevealPlan>,
}

fn default_enter_class() -> String {
    "animate-in".to_string()
}

// ---------------------------------------------------------------------------
// Sequencer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RevealSequencer {
    enter_class: String,
    plans: Vec<RevealPlan>,
    /// Base-animation delay per staggered element.
    enter_delays: SecondaryMap<NodeId, Millis>,
}

impl RevealSequencer {
    pub fn new(enter_class: impl Into<String>, plans: Vec<RevealPlan>) -> Self {
        Self {
            enter_class: enter_class.into(),
            plans,
            enter_delays: SecondaryMap::new(),
        }
    }

    pub fn from_group(group: &RevealGroup) -> Self {
        Self::new(group.enter_class.clone(), group.plans.clone())
    }

    pub fn enter_class(&self) -> &str {
        &self.enter_class
    }

    /// Number every staggered plan's elements in document order and record
    /// their entry delays. When several plans match, the longest delay wins.
    pub fn assign_stagger(&mut self, doc: &Document) {
        self.enter_delays.clear();
        for plan in self.plans.iter().filter(|p| p.enter_stagger_ms > 0) {
            let nodes = doc.query_by_classes(&[&plan.when_class]);
            for (index, node) in nodes.into_iter().enumerate() {
                let delay = plan.enter_stagger_ms.saturating_mul(index as Millis);
                if let Some(slot) = self.enter_delays.entry(node).map(|e| e.or_insert(0)) {
                    *slot = (*slot).max(delay);
                }
            }
        }
    }

    /// Delay before `element` starts its base animation.
    pub fn enter_delay(&self, element: NodeId) -> Millis {
        self.enter_delays.get(element).copied().unwrap_or(0)
    }

    /// Steps for `element`, from every plan whose class it carries, sorted
    /// by ascending delay. Equal delays keep plan order.
    pub fn steps_for(&self, doc: &Document, element: NodeId) -> Vec<Step> {
        let mut steps: Vec<Step> = self
            .plans
            .iter()
            .filter(|plan| doc.has_class(element, &plan.when_class))
            .flat_map(|plan| plan.steps.iter().cloned())
            .collect();
        steps.sort_by_key(|s| s.delay_ms);
        steps
    }

    /// Apply the base transition to a freshly entered element and return the
    /// steps to schedule relative to now. A staggered element gets its base
    /// animation as a delayed step instead. A missing element yields nothing.
    pub fn enter(&self, doc: &mut Document, element: NodeId) -> Vec<Step> {
        if doc.node(element).is_none() {
            return Vec::new();
        }
        doc.add_class(element, &self.enter_class);
        let mut steps = self.steps_for(doc, element);
        match self.enter_delay(element) {
            0 => doc.set_reveal(element, Reveal::AnimatingIn),
            delay => {
                steps.push(Step::on_self(delay, StepAction::AnimateIn));
                steps.sort_by_key(|s| s.delay_ms);
            }
        }
        steps
    }
}

// ---------------------------------------------------------------------------
// Applying a step
// ---------------------------------------------------------------------------

/// What happened when a step fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Applied { target: NodeId },
    /// A `Detach` step removed `target` and these nodes (target first).
    Removed { target: NodeId, removed: Vec<NodeId> },
    /// No descendant carries the target class.
    MissingTarget,
    /// The element (or target) is no longer attached to the document.
    Detached,
}

/// Resolve the step's target under `element` and apply its action.
///
/// Missing and detached targets are reported, never raised: a skipped step
/// has no effect on its siblings.
pub fn apply_step(doc: &mut Document, element: NodeId, step: &Step) -> StepOutcome {
    if !doc.contains(element) {
        return StepOutcome::Detached;
    }
    let target = match &step.target_class {
        None => element,
        Some(class) => match doc.query_descendant(element, class) {
            Some(target) => target,
            None => return StepOutcome::MissingTarget,
        },
    };
    if !doc.contains(target) {
        return StepOutcome::Detached;
    }

    match &step.action {
        StepAction::Show => doc.set_reveal(target, Reveal::Shown),
        StepAction::Hide => doc.set_reveal(target, Reveal::Hidden),
        StepAction::PopMarker => doc.set_reveal(target, Reveal::Popping),
        StepAction::Emphasize => doc.set_accent(target, Accent::Emphasized),
        StepAction::AddClass(class) => doc.add_class(target, class),
        StepAction::AnimateIn => doc.set_reveal(target, Reveal::AnimatingIn),
        StepAction::Detach => {
            let removed = doc.remove(target);
            return StepOutcome::Removed { target, removed };
        }
    }
    StepOutcome::Applied { target }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Viewport;

    fn timeline_item(doc: &mut Document, with_content: bool) -> NodeId {
        let body = doc.body();
        let item = doc.append(body, "div");
        doc.add_class(item, "timeline-item");
        let marker = doc.append(item, "span");
        doc.add_class(marker, "timeline-marker");
        if with_content {
            let content = doc.append(item, "div");
            doc.add_class(content, "timeline-content");
        }
        item
    }

    fn timeline_plan() -> RevealPlan {
        RevealPlan {
            when_class: "timeline-item".into(),
            enter_stagger_ms: 0,
            steps: vec![
                Step::new(400, Some("timeline-marker"), StepAction::PopMarker),
                Step::new(200, Some("timeline-content"), StepAction::Show),
            ],
        }
    }

    #[test]
    fn enter_applies_base_transition_and_sorts_steps() {
        let mut doc = Document::new(Viewport::default());
        let item = timeline_item(&mut doc, true);
        let seq = RevealSequencer::new("animate-in", vec![timeline_plan()]);

        let steps = seq.enter(&mut doc, item);
        assert!(doc.has_class(item, "animate-in"));
        assert_eq!(doc.visual(item).map(|v| v.reveal), Some(Reveal::AnimatingIn));
        let delays: Vec<Millis> = steps.iter().map(|s| s.delay_ms).collect();
        assert_eq!(delays, vec![200, 400]);
    }

    #[test]
    fn plans_only_apply_to_matching_class() {
        let mut doc = Document::new(Viewport::default());
        let body = doc.body();
        let card = doc.append(body, "div");
        doc.add_class(card, "stat-card");
        let seq = RevealSequencer::new("animate-in", vec![timeline_plan()]);

        assert!(seq.enter(&mut doc, card).is_empty());
        assert!(doc.has_class(card, "animate-in"));
    }

    #[test]
    fn equal_delays_keep_plan_order() {
        let mut doc = Document::new(Viewport::default());
        let item = timeline_item(&mut doc, true);
        let plan = RevealPlan {
            when_class: "timeline-item".into(),
            enter_stagger_ms: 0,
            steps: vec![
                Step::on_self(100, StepAction::AddClass("first".into())),
                Step::on_self(100, StepAction::AddClass("second".into())),
            ],
        };
        let seq = RevealSequencer::new("animate-in", vec![plan]);
        let steps = seq.steps_for(&doc, item);
        assert_eq!(steps[0].action, StepAction::AddClass("first".into()));
        assert_eq!(steps[1].action, StepAction::AddClass("second".into()));
    }

    #[test]
    fn missing_target_does_not_block_siblings() {
        let mut doc = Document::new(Viewport::default());
        let item = timeline_item(&mut doc, false);
        let seq = RevealSequencer::new("animate-in", vec![timeline_plan()]);
        let steps = seq.enter(&mut doc, item);

        assert_eq!(apply_step(&mut doc, item, &steps[0]), StepOutcome::MissingTarget);
        let outcome = apply_step(&mut doc, item, &steps[1]);
        let StepOutcome::Applied { target } = outcome else {
            panic!("marker step should apply, got {outcome:?}");
        };
        assert_eq!(doc.visual(target).map(|v| v.reveal), Some(Reveal::Popping));
    }

    #[test]
    fn removed_element_is_detached() {
        let mut doc = Document::new(Viewport::default());
        let item = timeline_item(&mut doc, true);
        let step = Step::new(200, Some("timeline-content"), StepAction::Show);
        doc.remove(item);
        assert_eq!(apply_step(&mut doc, item, &step), StepOutcome::Detached);
    }

    #[test]
    fn detach_step_removes_subtree() {
        let mut doc = Document::new(Viewport::default());
        let item = timeline_item(&mut doc, true);
        let outcome = apply_step(&mut doc, item, &Step::on_self(0, StepAction::Detach));
        let StepOutcome::Removed { target, removed } = outcome else {
            panic!("expected removal");
        };
        assert_eq!(target, item);
        assert_eq!(removed.len(), 3);
        assert!(doc.node(item).is_none());
    }

    #[test]
    fn staggered_items_start_by_document_index() {
        let mut doc = Document::new(Viewport::default());
        let items: Vec<NodeId> = (0..3).map(|_| timeline_item(&mut doc, true)).collect();
        let body = doc.body();
        let card = doc.append(body, "div");
        doc.add_class(card, "stat-card");
        let plan = RevealPlan {
            enter_stagger_ms: 300,
            ..timeline_plan()
        };
        let mut seq = RevealSequencer::new("animate-in", vec![plan]);
        seq.assign_stagger(&doc);

        let delays: Vec<Millis> = items.iter().map(|&i| seq.enter_delay(i)).collect();
        assert_eq!(delays, vec![0, 300, 600]);
        assert_eq!(seq.enter_delay(card), 0);

        // The first item animates at once; later ones wait for their turn.
        assert!(seq.enter(&mut doc, items[0]).iter().all(|s| s.action != StepAction::AnimateIn));
        assert_eq!(doc.visual(items[0]).map(|v| v.reveal), Some(Reveal::AnimatingIn));

        let steps = seq.enter(&mut doc, items[2]);
        assert!(doc.has_class(items[2], "animate-in"));
        assert_eq!(doc.visual(items[2]).map(|v| v.reveal), Some(Reveal::Initial));
        let timeline: Vec<(Millis, &StepAction)> =
            steps.iter().map(|s| (s.delay_ms, &s.action)).collect();
        assert_eq!(
            timeline,
            vec![
                (200, &StepAction::Show),
                (400, &StepAction::PopMarker),
                (600, &StepAction::AnimateIn),
            ]
        );
        assert_eq!(
            apply_step(&mut doc, items[2], &steps[2]),
            StepOutcome::Applied { target: items[2] }
        );
        assert_eq!(doc.visual(items[2]).map(|v| v.reveal), Some(Reveal::AnimatingIn));
    }

    #[test]
    fn group_deserializes_with_defaults() {
        let group: RevealGroup = serde_json::from_str(
            r#"{ "classes": ["card"], "watch": { "threshold": 0.12 } }"#,
        )
        .unwrap();
        assert_eq!(group.enter_class, "animate-in");
        assert_eq!(group.watch.threshold, 0.12);
        assert_eq!(group.watch.bottom_margin, 0.0);
        assert!(group.plans.is_empty());
    }
}
