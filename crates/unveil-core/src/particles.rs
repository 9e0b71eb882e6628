//! Decorative particles: short-lived nodes spawned into a layer and removed
//! when their animation finishes.
//!
//! Placement, size and duration come from a seeded [`SimRng`], so a field
//! with the same seed produces the same particles. The field owns each
//! particle node from spawn to [`ParticleField::finish`]; the stage
//! schedules the finish at the particle's lifetime.

use crate::document::Document;
use crate::id::{Millis, NodeId, ParticleId};
use crate::rng::SimRng;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

/// How a field finds its layer and shapes its particles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    /// Class of the host element.
    pub container_class: String,
    /// When set, a fresh layer with this class is appended to the host and
    /// particles go there; otherwise they go into the host directly.
    pub layer_class: Option<String>,
    /// Class given to every particle node.
    pub particle_class: String,
    /// Particles spawned at ready, one every `initial_stagger_ms`.
    pub initial_count: u32,
    pub initial_stagger_ms: Millis,
    /// Continuous spawning after ready, if any.
    pub spawn_interval_ms: Option<Millis>,
    pub min_duration_ms: f64,
    pub duration_spread_ms: f64,
    pub min_size_px: f64,
    pub size_spread_px: f64,
    /// Upper bound on a random start delay before the animation runs.
    pub max_start_delay_ms: f64,
    /// Extra time a node stays after its animation before removal.
    pub linger_ms: Millis,
    /// Text content, cycled by spawn index. Empty means no text.
    pub glyphs: Vec<String>,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            container_class: "header".to_string(),
            layer_class: Some("particle-layer".to_string()),
            particle_class: "particle".to_string(),
            initial_count: 20,
            initial_stagger_ms: 200,
            spawn_interval_ms: Some(3000),
            min_duration_ms: 2000.0,
            duration_spread_ms: 3000.0,
            min_size_px: 2.0,
            size_spread_px: 3.0,
            max_start_delay_ms: 0.0,
            linger_ms: 0,
            glyphs: Vec::new(),
        }
    }
}

impl ParticleConfig {
    /// A falling-emoji layer driven only by bursts.
    pub fn emoji_rain() -> Self {
        Self {
            container_class: "emoji-layer".to_string(),
            layer_class: None,
            particle_class: "emoji".to_string(),
            initial_count: 0,
            initial_stagger_ms: 0,
            spawn_interval_ms: None,
            min_duration_ms: 2200.0,
            duration_spread_ms: 1600.0,
            min_size_px: 14.0,
            size_spread_px: 28.0,
            max_start_delay_ms: 800.0,
            linger_ms: 200,
            glyphs: ["☀️", "🌤️", "⛅", "🌧️", "⛈️", "❄️", "🌈", "☁️", "🌪️"]
                .iter()
                .map(|g| g.to_string())
                .collect(),
        }
    }
}

/// One live particle.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub node: NodeId,
    /// Horizontal offset, percent of the layer width.
    pub left_pct: f64,
    pub size_px: f64,
    pub delay_ms: Millis,
    pub duration_ms: Millis,
    pub spawned_at: Millis,
}

impl Particle {
    /// Time from spawn until the node should be removed. Saturates.
    pub fn lifetime_ms(&self, linger_ms: Millis) -> Millis {
        self.delay_ms
            .saturating_add(self.duration_ms)
            .saturating_add(linger_ms)
    }
}

#[derive(Debug, Clone)]
pub struct ParticleField {
    config: ParticleConfig,
    layer: NodeId,
    rng: SimRng,
    live: SlotMap<ParticleId, Particle>,
}

impl ParticleField {
    /// Find the host by class and bind to it (creating the layer if
    /// configured). `None` when the page has no host.
    pub fn attach(doc: &mut Document, config: ParticleConfig, seed: u64) -> Option<Self> {
        let host = doc
            .query_by_classes(&[config.container_class.as_str()])
            .first()
            .copied();
        let Some(host) = host else {
            log::debug!("particle host .{} missing", config.container_class);
            return None;
        };
        Self::attach_to(doc, host, config, seed)
    }

    /// Bind to an explicit host node.
    pub fn attach_to(
        doc: &mut Document,
        host: NodeId,
        config: ParticleConfig,
        seed: u64,
    ) -> Option<Self> {
        if !doc.contains(host) {
            return None;
        }
        let layer = match &config.layer_class {
            Some(class) => {
                let layer = doc.append(host, "div");
                doc.add_class(layer, class);
                layer
            }
            None => host,
        };
        Some(Self {
            config,
            layer,
            rng: SimRng::new(seed),
            live: SlotMap::with_key(),
        })
    }

    pub fn config(&self) -> &ParticleConfig {
        &self.config
    }

    pub fn layer(&self) -> NodeId {
        self.layer
    }

    /// Spawn one particle at `now`. `index` picks the glyph. Returns the
    /// particle and its lifetime, or `None` if the layer is gone.
    pub fn spawn(
        &mut self,
        doc: &mut Document,
        now: Millis,
        index: usize,
    ) -> Option<(ParticleId, Millis)> {
        if !doc.contains(self.layer) {
            return None;
        }
        let cfg = &self.config;
        let left_pct = self.rng.range_f64(0.0, 100.0);
        let delay_ms = self.rng.range_f64(0.0, cfg.max_start_delay_ms) as Millis;
        let duration_ms = self.rng.range_f64(cfg.min_duration_ms, cfg.duration_spread_ms) as Millis;
        let size_px = self.rng.range_f64(cfg.min_size_px, cfg.size_spread_px);

        let node = doc.append(self.layer, "div");
        doc.add_class(node, &cfg.particle_class);
        doc.set_attribute(node, "data-left", &format!("{left_pct:.2}%"));
        doc.set_attribute(node, "data-size", &format!("{size_px:.1}px"));
        doc.set_attribute(node, "data-delay", &delay_ms.to_string());
        doc.set_attribute(node, "data-duration", &duration_ms.to_string());
        if !cfg.glyphs.is_empty() {
            doc.set_text(node, &cfg.glyphs[index % cfg.glyphs.len()]);
        }

        let particle = Particle {
            node,
            left_pct,
            size_px,
            delay_ms,
            duration_ms,
            spawned_at: now,
        };
        let lifetime = particle.lifetime_ms(cfg.linger_ms);
        let id = self.live.insert(particle);
        Some((id, lifetime))
    }

    /// Remove a finished particle and its node. `false` if already gone.
    pub fn finish(&mut self, doc: &mut Document, id: ParticleId) -> bool {
        match self.live.remove(id) {
            Some(particle) => {
                doc.remove(particle.node);
                true
            }
            None => false,
        }
    }

    pub fn particle(&self, id: ParticleId) -> Option<&Particle> {
        self.live.get(id)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}
