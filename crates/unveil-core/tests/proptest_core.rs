//! Property-based tests for the reveal engine.
//!
//! Uses proptest to generate random layouts, scroll sequences and ramp
//! goals, then verify the engine's invariants hold.

use std::collections::HashSet;
use unveil_core::document::Rect;
use unveil_core::event::{Event, EventKind};
use unveil_core::ramp::{RampPhase, parse_goal, value_at};
use unveil_core::stage::Stage;
use unveil_core::test_utils::*;
use proptest::prelude::*;

/// Read a grouped ramp display back as an integer.
fn displayed(stage: &Stage, node: unveil_core::id::NodeId) -> u64 {
    stage
        .document()
        .text(node)
        .unwrap_or("")
        .replace(',', "")
        .parse()
        .unwrap_or(0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Ramp values never decrease and never exceed the goal.
    #[test]
    fn ramp_value_monotone_and_bounded(
        goal in 0..10_000_000_000u64,
        duration in 1..10_000u64,
        a in 0..12_000u64,
        b in 0..12_000u64,
    ) {
        let (early, late) = (a.min(b), a.max(b));
        let v_early = value_at(goal, early, duration);
        let v_late = value_at(goal, late, duration);
        prop_assert!(v_early <= v_late);
        prop_assert!(v_late <= goal);
    }

    /// The final displayed value is exactly the goal.
    #[test]
    fn ramp_final_value_is_goal(goal in any::<u64>(), duration in 0..10_000u64, extra in 0..1_000u64) {
        prop_assert_eq!(value_at(goal, duration + extra, duration), goal);
    }

    #[test]
    fn parse_goal_reads_plain_integers(n in any::<u64>()) {
        prop_assert_eq!(parse_goal(Some(&n.to_string())), n);
        prop_assert_eq!(parse_goal(Some(&format!("-{n}"))), 0);
    }

    /// "Entered" fires at most once per element, whatever the scrolling.
    #[test]
    fn entered_at_most_once(
        tops in proptest::collection::vec(0.0..6000.0f64, 1..12),
        scrolls in proptest::collection::vec(0.0..7000.0f64, 0..30),
    ) {
        let mut doc = page();
        let items: Vec<_> = tops.iter().map(|&t| timeline_item(&mut doc, t, true).item).collect();
        let mut stage = Stage::new(doc, timeline_config());
        let log = record(&mut stage, &[EventKind::ElementEntered]);
        stage.ready().unwrap();

        for top in scrolls {
            stage.scroll_to(top);
            stage.advance(100).unwrap();
        }

        let entered: Vec<_> = log
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::ElementEntered { node, .. } => Some(*node),
                _ => None,
            })
            .collect();
        let unique: HashSet<_> = entered.iter().copied().collect();
        prop_assert_eq!(unique.len(), entered.len());
        prop_assert!(entered.len() <= items.len());
        for node in entered {
            prop_assert!(stage.document().is_revealed(node));
        }
    }

    /// Driven through real frames, the displayed text only grows, stays at
    /// or below the goal, and lands on the goal.
    #[test]
    fn ramp_display_through_frames(
        goal in 0..5_000_000u64,
        frame_interval in 1..60u64,
        steps in proptest::collection::vec(1..120u64, 1..80),
    ) {
        let mut doc = page();
        let node = stat_number(&mut doc, 100.0, Some(&goal.to_string()));
        let mut config = timeline_config();
        config.frame_interval_ms = frame_interval;
        let mut stage = Stage::new(doc, config);
        stage.ready().unwrap();

        let mut last = 0;
        for dt in steps {
            stage.advance(dt).unwrap();
            let shown = displayed(&stage, node);
            prop_assert!(shown >= last);
            prop_assert!(shown <= goal);
            last = shown;
        }

        stage.advance(2_000 + frame_interval).unwrap();
        prop_assert_eq!(displayed(&stage, node), goal);
        prop_assert_eq!(stage.ramp_phase(node), Some(RampPhase::Settled));
    }

    /// Moving an element around never produces a second reveal.
    #[test]
    fn relayout_does_not_rearm(moves in proptest::collection::vec(0.0..3000.0f64, 1..20)) {
        let mut doc = page();
        let item = timeline_item(&mut doc, 100.0, true).item;
        let mut stage = Stage::new(doc, timeline_config());
        stage.ready().unwrap();
        prop_assert!(stage.document().is_revealed(item));

        for top in moves {
            stage.set_rect(item, Rect::new(top, 200.0));
        }
        prop_assert_eq!(stage.events().total_emitted(EventKind::ElementEntered), 1);
    }
}
