//! Declarative visual state and the single render step that turns it into
//! style properties.
//!
//! Engine code never writes style properties directly. It moves an element
//! between [`Reveal`] and [`Accent`] states and the document re-renders the
//! element's [`Style`] through [`render`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

/// Where an element is in its one-way reveal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reveal {
    /// No reveal styling applied; the page stylesheet decides.
    #[default]
    Initial,
    /// The slide-in keyframe is running.
    AnimatingIn,
    /// Fully opaque, resting position.
    Shown,
    /// Faded out.
    Hidden,
    /// The marker pop keyframe is running.
    Popping,
}

/// Short-lived emphasis layered on top of the reveal state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Accent {
    #[default]
    None,
    /// Card hover: raised with a soft shadow.
    Lifted,
    /// Card at rest after a hover.
    Rested,
    /// Timeline marker hover: enlarged and spun.
    Spinning,
    /// Timeline marker at rest after a hover.
    Centered,
    /// Ramp completion pulse.
    Emphasized,
    /// Ramp pulse reverted.
    Settled,
    /// Title hover: animated gradient text.
    Gradient,
    /// Title at rest: pulsing white text.
    Pulsing,
    /// Click feedback on a toggle trigger.
    Pressed,
}

/// The full visual state of one element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisualState {
    pub reveal: Reveal,
    pub accent: Accent,
}

// ---------------------------------------------------------------------------
// Style
// ---------------------------------------------------------------------------

/// Rendered style properties, keyed by CSS property name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Style {
    props: BTreeMap<&'static str, String>,
}

impl Style {
    pub fn get(&self, property: &str) -> Option<&str> {
        self.props.get(property).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.props.iter().map(|(k, v)| (*k, v.as_str()))
    }

    fn set(&mut self, property: &'static str, value: &str) {
        self.props.insert(property, value.to_string());
    }
}

// ---------------------------------------------------------------------------
// Render
// ---------------------------------------------------------------------------

/// Render a visual state to style properties.
///
/// The reveal layer is written first; accent properties overwrite any
/// property the reveal layer also sets (an accent transform wins over the
/// resting reveal transform).
pub fn render(state: &VisualState) -> Style {
    let mut style = Style::default();

    match state.reveal {
        Reveal::Initial => {}
        Reveal::AnimatingIn => {
            style.set("animation", "slideInFromBottom 0.8s ease-out forwards");
        }
        Reveal::Shown => {
            style.set("opacity", "1");
            style.set("transform", "translateY(0)");
        }
        Reveal::Hidden => {
            style.set("opacity", "0");
        }
        Reveal::Popping => {
            style.set("animation", "markerPop 0.6s ease-out");
        }
    }

    match state.accent {
        Accent::None => {}
        Accent::Lifted => {
            style.set("transform", "translateY(-10px) scale(1.02)");
            style.set("box-shadow", "0 20px 60px rgba(0, 0, 0, 0.2)");
        }
        Accent::Rested => {
            style.set("transform", "translateY(0) scale(1)");
        }
        Accent::Spinning => {
            style.set("transform", "translateX(-50%) scale(1.3) rotate(360deg)");
            style.set("transition", "all 0.5s ease");
        }
        Accent::Centered => {
            style.set("transform", "translateX(-50%) scale(1)");
            style.set("transition", "all 0.5s ease");
        }
        Accent::Emphasized => {
            style.set("transform", "scale(1.1)");
        }
        Accent::Settled => {
            style.set("transform", "scale(1)");
        }
        Accent::Gradient => {
            style.set(
                "background",
                "linear-gradient(45deg, #4a90e2, #ff6b6b, #4a90e2)",
            );
            style.set("background-size", "200% 200%");
            style.set("background-clip", "text");
            style.set("color", "transparent");
            style.set("animation", "gradientShift 2s ease-in-out infinite");
        }
        Accent::Pulsing => {
            style.set("color", "white");
            style.set("animation", "titlePulse 2s ease-in-out infinite alternate");
        }
        Accent::Pressed => {
            style.set("transform", "scale(0.98)");
        }
    }

    style
}
