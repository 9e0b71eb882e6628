//! The stage: one page's reveal engine.
//!
//! # Architecture
//!
//! The `Stage` owns:
//! - The [`Document`] being animated
//! - A [`Scheduler`] of plain-data [`Task`]s (the virtual host clock)
//! - One [`VisibilityWatcher`] per reveal group and per ramp group
//! - The [`RampAnimator`], the [`EventRouter`] and an optional
//!   [`ParticleField`]
//! - An [`EventBus`] delivered at the end of every public operation
//!
//! # Lifecycle
//!
//! ```text
//! Loading --ready()--> Ready --teardown()--> TornDown
//!    |
//!    +--boot() on a failed ready()--> Inert
//! ```
//!
//! # Cancellation
//!
//! Every step, frame and revert is scheduled under a [`TaskId`] recorded
//! against the node it acts on. Removing a node cancels its pending tasks,
//! and every task re-checks that its node is still attached before it
//! applies anything.

use crate::config::StageConfig;
use crate::document::{Document, Rect};
use crate::error::StageError;
use crate::event::{Event, EventBus, EventKind, PassiveListener};
use crate::id::{Millis, NodeId, ParticleId, TaskId};
use crate::particles::ParticleField;
use crate::ramp::{RampAnimator, RampGroup, RampPhase};
use crate::router::{EventRouter, InputEvent, Reaction};
use crate::scheduler::{Due, Scheduler};
use crate::sequencer::{RevealSequencer, Step, StepOutcome, apply_step};
use crate::visual::Accent;
use crate::watcher::VisibilityWatcher;
use slotmap::SecondaryMap;

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Work the scheduler hands back to the stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    /// Apply one reveal step to `element` (or its sub-node).
    Step { element: NodeId, step: Step },
    /// One frame of a ramp loop.
    RampFrame { node: NodeId },
    /// Revert the ramp completion pulse.
    PulseRevert { node: NodeId },
    /// Revert the click accent on a toggle trigger.
    PressRevert { node: NodeId },
    SpawnParticle,
    FinishParticle { particle: ParticleId },
}

impl Task {
    /// The node whose removal cancels this task.
    fn owner(&self) -> Option<NodeId> {
        match self {
            Task::Step { element, .. } => Some(*element),
            Task::RampFrame { node } | Task::PulseRevert { node } | Task::PressRevert { node } => {
                Some(*node)
            }
            Task::SpawnParticle | Task::FinishParticle { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StagePhase {
    /// Constructed; `ready()` not yet called.
    Loading,
    Ready,
    /// Startup failed under `boot()`; nothing is animated.
    Inert,
    TornDown,
}

/// What page-ready discovery found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadyReport {
    /// Observable elements registered across all reveal groups.
    pub observed: usize,
    /// Ramp targets registered across all ramp groups.
    pub ramp_targets: usize,
    pub bindings: usize,
    /// Elements already in view at ready time.
    pub entered: usize,
    pub particles: bool,
}

#[derive(Debug)]
struct RevealLane {
    watcher: VisibilityWatcher,
    sequencer: RevealSequencer,
}

#[derive(Debug)]
struct RampLane {
    watcher: VisibilityWatcher,
    group: RampGroup,
}

#[derive(Debug)]
pub struct Stage {
    document: Document,
    config: StageConfig,
    scheduler: Scheduler<Task>,
    reveal_lanes: Vec<RevealLane>,
    ramp_lanes: Vec<RampLane>,
    ramps: RampAnimator,
    router: EventRouter,
    particles: Option<ParticleField>,
    particles_spawned: usize,
    /// Pending tasks per node they act on.
    owned_tasks: SecondaryMap<NodeId, Vec<TaskId>>,
    /// Nodes that have already produced an `ElementEntered`.
    announced: SecondaryMap<NodeId, ()>,
    event_bus: EventBus,
    phase: StagePhase,
}

impl Stage {
    pub fn new(document: Document, config: StageConfig) -> Self {
        let scheduler =
            Scheduler::new(config.frame_interval_ms).with_step_limit(config.step_limit);
        let event_bus = EventBus::new(config.event_capacity);
        Self {
            document,
            config,
            scheduler,
            reveal_lanes: Vec::new(),
            ramp_lanes: Vec::new(),
            ramps: RampAnimator::new(),
            router: EventRouter::new(),
            particles: None,
            particles_spawned: 0,
            owned_tasks: SecondaryMap::new(),
            announced: SecondaryMap::new(),
            event_bus,
            phase: StagePhase::Loading,
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Page-ready: validate the config, discover and register every
    /// observable element and ramp target, install the input bindings and
    /// particles, then handle whatever is already in view.
    pub fn ready(&mut self) -> Result<ReadyReport, StageError> {
        match self.phase {
            StagePhase::Loading => {}
            StagePhase::TornDown => return Err(StageError::TornDown),
            StagePhase::Ready | StagePhase::Inert => return Err(StageError::AlreadyReady),
        }
        self.config.validate()?;

        let mut report = ReadyReport::default();

        for group in &self.config.reveals {
            let mut watcher = VisibilityWatcher::new(group.watch);
            for node in self.document.query_by_classes(&group.classes) {
                if watcher.observe(&self.document, node) {
                    report.observed += 1;
                }
            }
            let mut sequencer = RevealSequencer::from_group(group);
            sequencer.assign_stagger(&self.document);
            self.reveal_lanes.push(RevealLane { watcher, sequencer });
        }

        for group in &self.config.ramps {
            let mut watcher = VisibilityWatcher::new(group.watch);
            for node in self.document.query_by_classes(&group.classes) {
                if watcher.observe(&self.document, node) {
                    report.ramp_targets += 1;
                }
            }
            self.ramp_lanes.push(RampLane {
                watcher,
                group: group.clone(),
            });
        }

        for binding in &self.config.bindings {
            self.router.register(binding.clone());
        }
        report.bindings = self.router.len();

        if let Some(cfg) = self.config.particles.clone() {
            let initial = cfg.initial_count;
            let stagger = cfg.initial_stagger_ms;
            let interval = cfg.spawn_interval_ms;
            self.particles = ParticleField::attach(&mut self.document, cfg, self.config.seed);
            if self.particles.is_some() {
                for i in 0..u64::from(initial) {
                    self.scheduler
                        .schedule_timeout(i * stagger, Task::SpawnParticle);
                }
                if let Some(period) = interval {
                    self.scheduler.schedule_interval(period, Task::SpawnParticle);
                }
                report.particles = true;
            }
        }

        self.phase = StagePhase::Ready;
        report.entered = self.check_visibility();
        self.event_bus.deliver();

        log::info!(
            "page ready: {} observed, {} ramp targets, {} bindings, {} already in view",
            report.observed,
            report.ramp_targets,
            report.bindings,
            report.entered
        );
        Ok(report)
    }

    /// `ready()`, with a failure caught once, logged, and the page left inert.
    pub fn boot(&mut self) -> Option<ReadyReport> {
        let was_loading = self.phase == StagePhase::Loading;
        match self.ready() {
            Ok(report) => Some(report),
            Err(err) => {
                log::error!("page startup aborted: {err}");
                if was_loading {
                    self.phase = StagePhase::Inert;
                }
                None
            }
        }
    }

    /// Unregister all input bindings, disconnect the watchers and cancel
    /// every pending task. Returns the number of tasks cancelled.
    pub fn teardown(&mut self) -> usize {
        self.router.teardown();
        for lane in &mut self.reveal_lanes {
            lane.watcher.disconnect();
        }
        for lane in &mut self.ramp_lanes {
            lane.watcher.disconnect();
        }
        let cancelled = self.scheduler.cancel_all();
        self.owned_tasks.clear();
        self.phase = StagePhase::TornDown;
        log::info!("stage torn down, {cancelled} pending tasks cancelled");
        cancelled
    }

    pub fn phase(&self) -> StagePhase {
        self.phase
    }

    // -----------------------------------------------------------------------
    // Clock
    // -----------------------------------------------------------------------

    pub fn now(&self) -> Millis {
        self.scheduler.now()
    }

    /// Advance the clock by `ms`. Returns the number of tasks run.
    pub fn advance(&mut self, ms: Millis) -> Result<usize, StageError> {
        let target = self.now().saturating_add(ms);
        self.advance_to(target)
    }

    /// Run every task due at or before `target`, in order, then move the
    /// clock to `target` and deliver events.
    pub fn advance_to(&mut self, target: Millis) -> Result<usize, StageError> {
        let now = self.now();
        if target < now {
            return Err(StageError::ClockRegression { target, now });
        }
        let steps = self.drain_until(target, 0)?;
        self.scheduler.set_now(target);
        self.event_bus.deliver();
        Ok(steps)
    }

    /// Run until no one-shot task remains pending. Intervals keep running
    /// while there is one-shot work left, so an interval that keeps
    /// scheduling one-shots hits the step limit.
    pub fn flush(&mut self) -> Result<usize, StageError> {
        let mut steps = 0;
        while let Some(until) = self.scheduler.last_one_shot_due() {
            steps = self.drain_until(until.max(self.now()), steps)?;
            self.scheduler.set_now(until);
        }
        self.event_bus.deliver();
        Ok(steps)
    }

    fn drain_until(&mut self, limit: Millis, mut steps: usize) -> Result<usize, StageError> {
        while let Some(due) = self.scheduler.pop_due(limit) {
            steps += 1;
            self.scheduler.check_budget(steps)?;
            self.run(due);
        }
        Ok(steps)
    }

    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending_count()
    }

    // -----------------------------------------------------------------------
    // Viewport & layout
    // -----------------------------------------------------------------------

    pub fn scroll_to(&mut self, top: f64) {
        self.apply_scroll(top);
        self.event_bus.deliver();
    }

    pub fn scroll_by(&mut self, delta: f64) {
        let top = self.document.viewport().scroll_top + delta;
        self.scroll_to(top);
    }

    pub fn resize_viewport(&mut self, height: f64) {
        self.document.set_viewport_height(height);
        self.check_visibility();
        self.event_bus.deliver();
    }

    pub fn set_rect(&mut self, node: NodeId, rect: Rect) {
        self.document.set_rect(node, rect);
        self.check_visibility();
        self.event_bus.deliver();
    }

    fn apply_scroll(&mut self, top: f64) {
        let from = self.document.viewport().scroll_top;
        self.document.set_scroll_top(top);
        let to = self.document.viewport().scroll_top;
        if from != to {
            self.event_bus.emit(Event::Scrolled {
                from,
                to,
                at: self.now(),
            });
        }
        self.check_visibility();
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Route one input and apply its reactions synchronously. Returns the
    /// number of reactions applied.
    pub fn dispatch(&mut self, input: InputEvent) -> usize {
        let reactions = self.router.route(&self.document, &input);
        let count = reactions.len();
        for reaction in reactions {
            self.react(reaction);
        }
        self.event_bus.deliver();
        count
    }

    fn react(&mut self, reaction: Reaction) {
        let at = self.now();
        match reaction {
            Reaction::Accent { node, accent } => self.document.set_accent(node, accent),
            Reaction::Toggle {
                details,
                trigger,
                open_class,
                press_ms,
            } => {
                if let Some(open) = self.document.toggle_class(details, &open_class) {
                    self.event_bus.emit(Event::Toggled {
                        node: details,
                        open,
                        at,
                    });
                }
                self.document.set_accent(trigger, Accent::Pressed);
                self.schedule(press_ms, Task::PressRevert { node: trigger });
            }
            Reaction::ScrollTo { top } => self.apply_scroll(top),
            Reaction::ScrollBy { delta } => {
                let top = self.document.viewport().scroll_top + delta;
                self.apply_scroll(top);
            }
            Reaction::Navigate { href } => {
                self.document.navigate(&href);
                self.event_bus.emit(Event::Navigated { href, at });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Page-driven effects
    // -----------------------------------------------------------------------

    /// Schedule `steps` on `node` relative to now, as if it had just been
    /// revealed (without the enter transition).
    pub fn run_transient(&mut self, node: NodeId, steps: Vec<Step>) -> Result<Vec<TaskId>, StageError> {
        if self.phase == StagePhase::TornDown {
            return Err(StageError::TornDown);
        }
        Ok(self.schedule_steps(node, steps))
    }

    /// Spawn `count` particles at once (an emoji rain). A page without a
    /// particle layer spawns nothing.
    pub fn burst_particles(&mut self, count: usize) -> Result<usize, StageError> {
        if self.phase == StagePhase::TornDown {
            return Err(StageError::TornDown);
        }
        let spawned = (0..count).filter(|&i| self.spawn_particle(i)).count();
        self.event_bus.deliver();
        Ok(spawned)
    }

    /// Remove `node` and its subtree, cancelling every task that would act
    /// on them. Returns the removed ids.
    pub fn remove_element(&mut self, node: NodeId) -> Vec<NodeId> {
        let removed = self.document.remove(node);
        self.forget_removed(&removed);
        removed
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable access for page glue that renders content after ready.
    /// Call [`Stage::refresh`] after changing layout.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Re-check visibility after external layout changes.
    pub fn refresh(&mut self) -> usize {
        let entered = self.check_visibility();
        self.event_bus.deliver();
        entered
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn ramp_phase(&self, node: NodeId) -> Option<RampPhase> {
        self.ramps.phase(node)
    }

    pub fn live_particles(&self) -> usize {
        self.particles.as_ref().map_or(0, ParticleField::live_count)
    }

    pub fn particle_layer(&self) -> Option<NodeId> {
        self.particles.as_ref().map(ParticleField::layer)
    }

    pub fn events(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.event_bus
    }

    /// Register a passive listener for an event kind.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.event_bus.on_passive(kind, listener);
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn schedule(&mut self, delay: Millis, task: Task) -> TaskId {
        let owner = task.owner();
        let id = self.scheduler.schedule_timeout(delay, task);
        self.own(owner, id);
        id
    }

    fn request_frame(&mut self, task: Task) -> TaskId {
        let owner = task.owner();
        let id = self.scheduler.request_frame(task);
        self.own(owner, id);
        id
    }

    fn own(&mut self, owner: Option<NodeId>, id: TaskId) {
        if let Some(node) = owner
            && let Some(entry) = self.owned_tasks.entry(node)
        {
            entry.or_default().push(id);
        }
    }

    fn schedule_steps(&mut self, element: NodeId, steps: Vec<Step>) -> Vec<TaskId> {
        steps
            .into_iter()
            .map(|step| self.schedule(step.delay_ms, Task::Step { element, step }))
            .collect()
    }

    /// Measure every watcher and start whatever entered. Returns the number
    /// of newly announced elements.
    fn check_visibility(&mut self) -> usize {
        let at = self.now();
        let mut announced = 0;

        for lane_idx in 0..self.reveal_lanes.len() {
            let entered = self.reveal_lanes[lane_idx].watcher.check(&mut self.document);
            for element in entered {
                announced += usize::from(self.announce(element, at));
                let steps = self.reveal_lanes[lane_idx]
                    .sequencer
                    .enter(&mut self.document, element);
                self.schedule_steps(element, steps);
            }
        }

        for lane_idx in 0..self.ramp_lanes.len() {
            let entered = self.ramp_lanes[lane_idx].watcher.check(&mut self.document);
            for node in entered {
                announced += usize::from(self.announce(node, at));
                let group = &self.ramp_lanes[lane_idx].group;
                let Some(start) = self.ramps.start(&mut self.document, node, group, at) else {
                    continue;
                };
                let pulse_ms = group.pulse_ms;
                self.event_bus.emit(Event::RampStarted {
                    node,
                    goal: start.goal,
                    at,
                });
                if start.settled {
                    self.event_bus.emit(Event::RampSettled {
                        node,
                        goal: start.goal,
                        at,
                    });
                    self.schedule(pulse_ms, Task::PulseRevert { node });
                } else {
                    self.request_frame(Task::RampFrame { node });
                }
            }
        }

        announced
    }

    fn announce(&mut self, node: NodeId, at: Millis) -> bool {
        match self.announced.insert(node, ()) {
            Some(()) => false,
            None => {
                self.event_bus.emit(Event::ElementEntered { node, at });
                true
            }
        }
    }

    fn run(&mut self, due: Due<Task>) {
        let at = due.at;
        if let Some(owner) = due.task.owner()
            && let Some(ids) = self.owned_tasks.get_mut(owner)
        {
            ids.retain(|&id| id != due.id);
        }

        match due.task {
            Task::Step { element, step } => match apply_step(&mut self.document, element, &step) {
                StepOutcome::Applied { target } => {
                    self.event_bus.emit(Event::StepApplied {
                        element,
                        target,
                        action: step.action,
                        at,
                    });
                }
                StepOutcome::Removed { target, removed } => {
                    self.forget_removed(&removed);
                    self.event_bus.emit(Event::StepApplied {
                        element,
                        target,
                        action: step.action,
                        at,
                    });
                }
                outcome @ (StepOutcome::MissingTarget | StepOutcome::Detached) => {
                    log::debug!(
                        "step at +{}ms on {element:?} skipped: {outcome:?}",
                        step.delay_ms
                    );
                    self.event_bus.emit(Event::StepSkipped {
                        element,
                        target_class: step.target_class,
                        at,
                    });
                }
            },
            Task::RampFrame { node } => match self.ramps.frame(&mut self.document, node, at) {
                Some(RampPhase::Running | RampPhase::Pending) => {
                    self.request_frame(Task::RampFrame { node });
                }
                Some(RampPhase::Settled) => {
                    if let Some(target) = self.ramps.target(node) {
                        let (goal, pulse_ms) = (target.goal, target.pulse_ms);
                        self.event_bus.emit(Event::RampSettled { node, goal, at });
                        self.schedule(pulse_ms, Task::PulseRevert { node });
                    }
                }
                None => log::debug!("ramp frame for {node:?} dropped, node detached"),
            },
            Task::PulseRevert { node } => {
                if self.document.contains(node) {
                    self.document.set_accent(node, Accent::Settled);
                }
            }
            Task::PressRevert { node } => {
                if self.document.contains(node) {
                    self.document.set_accent(node, Accent::None);
                }
            }
            Task::SpawnParticle => {
                let index = self.particles_spawned;
                self.spawn_particle(index);
            }
            Task::FinishParticle { particle } => {
                if let Some(field) = self.particles.as_mut()
                    && field.finish(&mut self.document, particle)
                {
                    self.event_bus.emit(Event::ParticleRemoved { particle, at });
                }
            }
        }
    }

    fn spawn_particle(&mut self, index: usize) -> bool {
        let at = self.now();
        let Some(field) = self.particles.as_mut() else {
            return false;
        };
        let Some((particle, lifetime_ms)) = field.spawn(&mut self.document, at, index) else {
            return false;
        };
        let node = field.particle(particle).map(|p| p.node);
        self.particles_spawned += 1;
        self.scheduler
            .schedule_timeout(lifetime_ms, Task::FinishParticle { particle });
        if let Some(node) = node {
            self.event_bus.emit(Event::ParticleSpawned {
                particle,
                node,
                lifetime_ms,
                at,
            });
        }
        true
    }

    fn forget_removed(&mut self, removed: &[NodeId]) {
        for &node in removed {
            if let Some(ids) = self.owned_tasks.remove(node) {
                for id in ids {
                    self.scheduler.cancel(id);
                }
            }
            self.ramps.forget(node);
            for lane in &mut self.reveal_lanes {
                lane.watcher.unobserve(node);
            }
            for lane in &mut self.ramp_lanes {
                lane.watcher.unobserve(node);
            }
        }
    }
}
