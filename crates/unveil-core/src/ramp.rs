//! Numeric ramp animator.
//!
//! Drives a displayed integer from 0 to a goal over a fixed duration with a
//! cubic ease-out. Each target runs its own frame loop: the stage requests a
//! frame, calls [`RampAnimator::frame`], and re-arms only while the target
//! is still [`RampPhase::Running`].
//!
//! # State machine
//!
//! ```text
//! Pending --first frame--> Running --elapsed >= duration--> Settled
//! ```
//!
//! A goal of 0 goes straight to `Settled` at entry. Nothing leaves
//! `Settled`.

use crate::document::Document;
use crate::format::DigitGrouping;
use crate::id::{Millis, NodeId};
use crate::visual::Accent;
use crate::watcher::WatchOptions;
use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;

/// Default ramp duration.
pub const DEFAULT_DURATION_MS: Millis = 2000;

/// How long the completion pulse stays on before it is reverted.
pub const DEFAULT_PULSE_MS: Millis = 200;

// ---------------------------------------------------------------------------
// Math
// ---------------------------------------------------------------------------

/// Parse a goal with integer-prefix semantics: leading whitespace, an
/// optional sign, then as many digits as follow. Absent, non-numeric and
/// negative input all yield 0; overflow saturates.
pub fn parse_goal(raw: Option<&str>) -> u64 {
    let Some(raw) = raw else {
        return 0;
    };
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0u64, |acc, d| {
            acc.saturating_mul(10).saturating_add(u64::from(d - b'0'))
        });
    if negative { 0 } else { value }
}

/// `clamp(elapsed / duration, 0, 1)`. A zero duration is already complete.
pub fn progress(elapsed: Millis, duration: Millis) -> f64 {
    if duration == 0 {
        return 1.0;
    }
    (elapsed as f64 / duration as f64).clamp(0.0, 1.0)
}

/// `1 - (1 - p)^3`
pub fn ease_out_cubic(p: f64) -> f64 {
    let inv = 1.0 - p.clamp(0.0, 1.0);
    1.0 - inv * inv * inv
}

/// Displayed value after `elapsed` ms: `floor(goal * eased)`, forced to
/// exactly `goal` once the duration has elapsed, and never above `goal`.
pub fn value_at(goal: u64, elapsed: Millis, duration: Millis) -> u64 {
    let p = progress(elapsed, duration);
    if p >= 1.0 {
        return goal;
    }
    let raw = (goal as f64 * ease_out_cubic(p)).floor();
    (raw as u64).min(goal)
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// A watched group of ramp targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RampGroup {
    pub classes: Vec<String>,
    /// Attribute holding the goal.
    pub attribute: String,
    pub watch: WatchOptions,
    pub duration_ms: Millis,
    pub pulse_ms: Millis,
    pub grouping: DigitGrouping,
}

impl Default for RampGroup {
    fn default() -> Self {
        Self {
            classes: vec!["stat-number".to_string()],
            attribute: "data-target".to_string(),
            watch: WatchOptions::new(0.5, 0.0),
            duration_ms: DEFAULT_DURATION_MS,
            pulse_ms: DEFAULT_PULSE_MS,
            grouping: DigitGrouping::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RampPhase {
    Pending,
    Running,
    Settled,
}

/// One display node and its ramp.
#[derive(Debug, Clone, PartialEq)]
pub struct RampTarget {
    pub node: NodeId,
    pub goal: u64,
    /// Entry time; elapsed time is measured from here, not from the first
    /// frame.
    pub started_at: Millis,
    pub duration_ms: Millis,
    pub pulse_ms: Millis,
    pub grouping: DigitGrouping,
    phase: RampPhase,
    displayed: u64,
    frames: u32,
}

impl RampTarget {
    pub fn new(node: NodeId, goal: u64, started_at: Millis, group: &RampGroup) -> Self {
        Self {
            node,
            goal,
            started_at,
            duration_ms: group.duration_ms,
            pulse_ms: group.pulse_ms,
            grouping: group.grouping.clone(),
            phase: RampPhase::Pending,
            displayed: 0,
            frames: 0,
        }
    }

    pub fn phase(&self) -> RampPhase {
        self.phase
    }

    pub fn displayed(&self) -> u64 {
        self.displayed
    }

    /// Frames run so far.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Advance to `now`. The displayed value only ever grows.
    pub fn frame(&mut self, now: Millis) -> RampPhase {
        if self.phase == RampPhase::Settled {
            return RampPhase::Settled;
        }
        self.phase = RampPhase::Running;
        self.frames += 1;

        let elapsed = now.saturating_sub(self.started_at);
        let value = value_at(self.goal, elapsed, self.duration_ms);
        self.displayed = self.displayed.max(value);
        if elapsed >= self.duration_ms {
            self.displayed = self.goal;
            self.phase = RampPhase::Settled;
        }
        self.phase
    }

    fn settle(&mut self) {
        self.displayed = self.goal;
        self.phase = RampPhase::Settled;
    }
}

// ---------------------------------------------------------------------------
// Animator
// ---------------------------------------------------------------------------

/// Result of starting a ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RampStart {
    pub goal: u64,
    /// `true` for a zero goal, which settles at entry.
    pub settled: bool,
}

/// All ramp targets on a page, keyed by display node.
#[derive(Debug, Clone, Default)]
pub struct RampAnimator {
    targets: SecondaryMap<NodeId, RampTarget>,
}

impl RampAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a ramp for `node` entering at `now`. Returns `None` if the node
    /// is missing or already has a ramp.
    pub fn start(
        &mut self,
        doc: &mut Document,
        node: NodeId,
        group: &RampGroup,
        now: Millis,
    ) -> Option<RampStart> {
        if doc.node(node).is_none() || self.targets.contains_key(node) {
            return None;
        }
        let goal = parse_goal(doc.attribute(node, &group.attribute));
        let mut target = RampTarget::new(node, goal, now, group);
        let settled = goal == 0;
        if settled {
            target.settle();
            doc.set_text(node, &target.grouping.format(0));
            doc.set_accent(node, Accent::Emphasized);
        }
        self.targets.insert(node, target);
        Some(RampStart { goal, settled })
    }

    /// Run one frame for `node` at `now`, writing the displayed value.
    /// Reaching `Settled` applies the emphasis pulse. Returns `None` (and
    /// forgets the target) if the node is gone or detached.
    pub fn frame(&mut self, doc: &mut Document, node: NodeId, now: Millis) -> Option<RampPhase> {
        if !doc.contains(node) {
            self.targets.remove(node);
            return None;
        }
        let target = self.targets.get_mut(node)?;
        if target.phase() == RampPhase::Settled {
            return Some(RampPhase::Settled);
        }
        let phase = target.frame(now);
        doc.set_text(node, &target.grouping.format(target.displayed()));
        if phase == RampPhase::Settled {
            doc.set_accent(node, Accent::Emphasized);
        }
        Some(phase)
    }

    pub fn target(&self, node: NodeId) -> Option<&RampTarget> {
        self.targets.get(node)
    }

    pub fn phase(&self, node: NodeId) -> Option<RampPhase> {
        self.targets.get(node).map(RampTarget::phase)
    }

    pub fn forget(&mut self, node: NodeId) -> bool {
        self.targets.remove(node).is_some()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
