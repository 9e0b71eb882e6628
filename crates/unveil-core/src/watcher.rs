//! Visibility watcher: one-shot viewport-entry detection.
//!
//! A watcher holds a set of observed elements. Each [`VisibilityWatcher::check`]
//! measures every observed element against the viewport; an element whose
//! visible fraction reaches the threshold is reported once, has its revealed
//! flag set, and is dropped from the set. Nothing is ever re-armed.

use crate::document::{Document, Rect, Viewport};
use crate::id::NodeId;
use serde::{Deserialize, Serialize};

/// Intersection options for one watcher.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchOptions {
    /// Visible fraction in `[0, 1]` an element must reach to count as entered.
    /// 0 means "any overlap".
    pub threshold: f64,
    /// Added to the bottom edge of the viewport, in pixels. Negative values
    /// shrink the effective viewport (an element must scroll further in).
    pub bottom_margin: f64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            bottom_margin: 0.0,
        }
    }
}

impl WatchOptions {
    pub fn new(threshold: f64, bottom_margin: f64) -> Self {
        Self {
            threshold,
            bottom_margin,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.threshold.is_finite()
            && (0.0..=1.0).contains(&self.threshold)
            && self.bottom_margin.is_finite()
    }
}

/// Fraction of `rect` inside the effective viewport, in `[0, 1]`.
///
/// A zero-height element counts as fully visible when its top edge lies
/// inside the effective viewport.
pub fn visible_fraction(rect: Rect, viewport: &Viewport, bottom_margin: f64) -> f64 {
    let top = viewport.scroll_top;
    let bottom = viewport.bottom() + bottom_margin;
    if bottom <= top {
        return 0.0;
    }
    if rect.height <= 0.0 {
        return if rect.top >= top && rect.top <= bottom {
            1.0
        } else {
            0.0
        };
    }
    let overlap = rect.bottom().min(bottom) - rect.top.max(top);
    (overlap.max(0.0) / rect.height).clamp(0.0, 1.0)
}

/// Whether `fraction` counts as entered under `threshold`.
fn crosses(fraction: f64, threshold: f64) -> bool {
    fraction > 0.0 && fraction >= threshold
}

// ---------------------------------------------------------------------------
// Watcher
// ---------------------------------------------------------------------------

/// Observes elements and reports each one at most once.
#[derive(Debug, Clone, Default)]
pub struct VisibilityWatcher {
    options: WatchOptions,
    observed: Vec<NodeId>,
}

impl VisibilityWatcher {
    pub fn new(options: WatchOptions) -> Self {
        Self {
            options,
            observed: Vec::new(),
        }
    }

    pub fn options(&self) -> WatchOptions {
        self.options
    }

    /// Start observing `node`. Returns `false` (and does nothing) if the node
    /// is missing, already revealed, or already observed.
    pub fn observe(&mut self, doc: &Document, node: NodeId) -> bool {
        if doc.node(node).is_none() || doc.is_revealed(node) || self.observed.contains(&node) {
            return false;
        }
        self.observed.push(node);
        true
    }

    pub fn unobserve(&mut self, node: NodeId) -> bool {
        let before = self.observed.len();
        self.observed.retain(|&n| n != node);
        self.observed.len() != before
    }

    pub fn is_observing(&self, node: NodeId) -> bool {
        self.observed.contains(&node)
    }

    pub fn observed_count(&self) -> usize {
        self.observed.len()
    }

    /// Stop observing everything.
    pub fn disconnect(&mut self) {
        self.observed.clear();
    }

    /// Measure every observed element. Entered elements are returned in
    /// observation order, marked revealed, and deregistered. Elements removed
    /// from the arena are dropped silently; detached ones stay observed but
    /// cannot intersect.
    pub fn check(&mut self, doc: &mut Document) -> Vec<NodeId> {
        let viewport = doc.viewport();
        let options = self.options;
        let mut entered = Vec::new();

        self.observed.retain(|&node| {
            let Some(rect) = doc.rect(node) else {
                return false;
            };
            if !doc.contains(node) {
                return true;
            }
            let fraction = visible_fraction(rect, &viewport, options.bottom_margin);
            if crosses(fraction, options.threshold) {
                entered.push(node);
                false
            } else {
                true
            }
        });

        for &node in &entered {
            doc.mark_revealed(node);
        }
        entered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with(rects: &[Rect]) -> (Document, Vec<NodeId>) {
        let mut doc = Document::new(Viewport::new(600.0));
        let body = doc.body();
        let ids = rects
            .iter()
            .map(|&r| {
                let id = doc.append(body, "div");
                doc.set_rect(id, r);
                id
            })
            .collect();
        (doc, ids)
    }

    #[test]
    fn fraction_fully_inside() {
        let vp = Viewport::new(600.0);
        assert_eq!(visible_fraction(Rect::new(100.0, 200.0), &vp, 0.0), 1.0);
    }

    #[test]
    fn fraction_partial_overlap() {
        let vp = Viewport::new(600.0);
        // 500..700 overlaps 500..600: half visible.
        assert_eq!(visible_fraction(Rect::new(500.0, 200.0), &vp, 0.0), 0.5);
    }

    #[test]
    fn negative_margin_shrinks_viewport() {
        let vp = Viewport::new(600.0);
        // Effective bottom is 550; 500..700 overlaps 500..550 = 50/200.
        assert_eq!(visible_fraction(Rect::new(500.0, 200.0), &vp, -50.0), 0.25);
        assert_eq!(visible_fraction(Rect::new(560.0, 10.0), &vp, -50.0), 0.0);
    }

    #[test]
    fn zero_height_inside_is_fully_visible() {
        let vp = Viewport::new(600.0);
        assert_eq!(visible_fraction(Rect::new(300.0, 0.0), &vp, 0.0), 1.0);
        assert_eq!(visible_fraction(Rect::new(900.0, 0.0), &vp, 0.0), 0.0);
    }

    #[test]
    fn threshold_must_be_reached() {
        let (mut doc, ids) = doc_with(&[Rect::new(500.0, 200.0)]);
        let mut w = VisibilityWatcher::new(WatchOptions::new(0.6, 0.0));
        assert!(w.observe(&doc, ids[0]));
        assert!(w.check(&mut doc).is_empty());

        doc.set_scroll_top(30.0); // 530..630 overlap = 80/200 = 0.4
        assert!(w.check(&mut doc).is_empty());

        doc.set_scroll_top(100.0); // 600..700 overlap = 100/200 = 0.5
        assert!(w.check(&mut doc).is_empty());

        doc.set_scroll_top(140.0); // 640..700 overlap = 140/200 = 0.7
        assert_eq!(w.check(&mut doc), vec![ids[0]]);
    }

    #[test]
    fn entered_at_most_once() {
        let (mut doc, ids) = doc_with(&[Rect::new(100.0, 50.0)]);
        let mut w = VisibilityWatcher::new(WatchOptions::new(0.1, 0.0));
        w.observe(&doc, ids[0]);

        assert_eq!(w.check(&mut doc), vec![ids[0]]);
        assert!(doc.is_revealed(ids[0]));
        assert!(!w.is_observing(ids[0]));

        // Leave and re-enter.
        doc.set_scroll_top(2000.0);
        assert!(w.check(&mut doc).is_empty());
        doc.set_scroll_top(0.0);
        assert!(w.check(&mut doc).is_empty());
    }

    #[test]
    fn revealed_nodes_are_never_rearmed() {
        let (mut doc, ids) = doc_with(&[Rect::new(100.0, 50.0)]);
        doc.mark_revealed(ids[0]);
        let mut w = VisibilityWatcher::default();
        assert!(!w.observe(&doc, ids[0]));
        assert!(w.check(&mut doc).is_empty());
    }

    #[test]
    fn zero_threshold_needs_overlap() {
        let (mut doc, ids) = doc_with(&[Rect::new(600.0, 100.0), Rect::new(599.0, 100.0)]);
        let mut w = VisibilityWatcher::new(WatchOptions::default());
        w.observe(&doc, ids[0]);
        w.observe(&doc, ids[1]);
        // The first starts exactly at the viewport bottom: no overlap.
        assert_eq!(w.check(&mut doc), vec![ids[1]]);
        assert_eq!(w.observed_count(), 1);
    }

    #[test]
    fn removed_nodes_are_dropped() {
        let (mut doc, ids) = doc_with(&[Rect::new(2000.0, 50.0)]);
        let mut w = VisibilityWatcher::new(WatchOptions::new(0.1, 0.0));
        w.observe(&doc, ids[0]);
        doc.remove(ids[0]);
        assert!(w.check(&mut doc).is_empty());
        assert_eq!(w.observed_count(), 0);
    }

    #[test]
    fn options_validation() {
        assert!(WatchOptions::new(0.5, -50.0).is_valid());
        assert!(!WatchOptions::new(1.5, 0.0).is_valid());
        assert!(!WatchOptions::new(f64::NAN, 0.0).is_valid());
        assert!(!WatchOptions::new(0.2, f64::INFINITY).is_valid());
    }
}
