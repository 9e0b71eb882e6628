//! Unveil Core -- a staged reveal engine for static pages.
//!
//! This crate watches page elements enter the viewport and drives a small,
//! deterministic animation state machine per element: timed reveal steps,
//! eased numeric ramps, hover and click accents, and decorative particles.
//! Everything runs against an in-memory [`document::Document`] on a virtual
//! clock, so a page's whole animation timeline can be stepped and asserted.
//!
//! # Pipeline
//!
//! Each [`stage::Stage::advance_to`] call:
//!
//! 1. **Drain** -- pop due tasks in `(time, timers before frames, order)`
//!    order and run them (reveal steps, ramp frames, reverts, particles).
//! 2. **Deliver** -- hand buffered events to passive listeners.
//!
//! Scrolling, resizing and layout changes re-check every watcher; input is
//! routed through the [`router::EventRouter`] and applied synchronously.
//!
//! # Key Types
//!
//! - [`stage::Stage`] -- Owns the document, clock, watchers and router.
//! - [`watcher::VisibilityWatcher`] -- One-shot viewport-entry detection.
//! - [`sequencer::RevealSequencer`] -- Base transition plus timed steps.
//! - [`ramp::RampAnimator`] -- Cubic ease-out counters with a completion pulse.
//! - [`scheduler::Scheduler`] -- Virtual timers, intervals and frame callbacks
//!   with cancellation handles.
//! - [`visual::render`] -- The single mapping from visual state to style.
//! - [`config::StageConfig`] -- Per-page configuration, loadable from RON,
//!   TOML or JSON.

pub mod config;
pub mod document;
pub mod error;
pub mod event;
pub mod format;
pub mod id;
pub mod particles;
pub mod ramp;
pub mod rng;
pub mod router;
pub mod scheduler;
pub mod sequencer;
pub mod stage;
pub mod visual;
pub mod watcher;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
