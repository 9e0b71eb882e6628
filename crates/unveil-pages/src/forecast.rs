//! Joke weather predictor.
//!
//! Predictions are picked from fixed tables with a [`SimRng`] seeded from a
//! string, so the same seed always tells the same joke. Each prediction
//! replaces the button's output, pops the result in and rains emoji.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use unveil_core::config::StageConfig;
use unveil_core::document::{Document, Rect, Viewport};
use unveil_core::id::NodeId;
use unveil_core::rng::SimRng;
use unveil_core::sequencer::{Step, StepAction};
use unveil_core::stage::{ReadyReport, Stage};
use unveil_core::visual::Reveal;

use crate::PageError;

pub const CONFIG: &str = include_str!("../pages/forecast.ron");

pub const WEATHERS: [&str; 10] = [
    "Clear skies",
    "Sunny with passing clouds",
    "Cloudy",
    "Light rain",
    "Heavy rain",
    "Snow",
    "Sleet",
    "Passing showers",
    "Thunderstorms",
    "Mysteriously sunny",
];

pub const EXTRAS: [&str; 8] = [
    "A rainbow might show up",
    "Don't forget your umbrella",
    "Stay cool out there",
    "Sweater weather",
    "The ice cream won't sell",
    "A bit windy",
    "Perfect for a walk",
    "Maybe not a laundry day",
];

pub const JOKES: [&str; 4] = [
    "The sky is laughing too",
    "The weather does as it pleases",
    "The clouds might be reading social media",
    "The sky may cheer up",
];

/// Length of the result pop-in.
pub const POP_IN_MS: u64 = 420;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prediction {
    pub main: &'static str,
    pub extra: &'static str,
    pub joke: &'static str,
}

/// Pick a weather, an extra and a joke, in that order, from `seed`.
pub fn make_prediction(seed: &str) -> Prediction {
    let mut rng = SimRng::from_seed_str(seed);
    let mut pick = |table: &[&'static str]| rng.pick(table).copied().unwrap_or_default();
    Prediction {
        main: pick(&WEATHERS),
        extra: pick(&EXTRAS),
        joke: pick(&JOKES),
    }
}

/// The same calendar day a year later; February 29th rolls over to
/// March 1st when the next year has no leap day.
pub fn same_day_next_year(today: NaiveDate) -> NaiveDate {
    let year = today.year() + 1;
    today
        .with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
        .unwrap_or(today)
}

// ---------------------------------------------------------------------------
// Buttons
// ---------------------------------------------------------------------------

/// The three prediction buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastKind {
    NextYear,
    December,
    Surprise,
}

impl ForecastKind {
    pub const ALL: [ForecastKind; 3] = [
        ForecastKind::NextYear,
        ForecastKind::December,
        ForecastKind::Surprise,
    ];

    pub fn button_id(self) -> &'static str {
        match self {
            ForecastKind::NextYear => "predict-next-year",
            ForecastKind::December => "predict-dec",
            ForecastKind::Surprise => "surprise",
        }
    }

    pub fn output_id(self) -> &'static str {
        match self {
            ForecastKind::NextYear => "out-next-year",
            ForecastKind::December => "out-dec",
            ForecastKind::Surprise => "out-surprise",
        }
    }

    /// Emoji spawned alongside the result.
    pub fn burst(self) -> usize {
        match self {
            ForecastKind::NextYear => 12,
            ForecastKind::December => 16,
            ForecastKind::Surprise => 22,
        }
    }

    pub fn from_button_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.button_id() == id)
    }

    /// Seed string and heading for a prediction made at `now`.
    pub fn seed_and_label(self, now: DateTime<Utc>) -> (String, String) {
        match self {
            ForecastKind::NextYear => {
                let next = same_day_next_year(now.date_naive());
                (format!("next-{next}"), format!("Same day next year ({next})"))
            }
            ForecastKind::December => {
                let year = now.year();
                (format!("dec-{year}-12"), format!("This December ({year})"))
            }
            ForecastKind::Surprise => (
                format!("surprise-{}", now.timestamp_millis()),
                "Right-now forecast".to_string(),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

pub fn config() -> Result<StageConfig, PageError> {
    crate::embedded_config(CONFIG)
}

pub struct ForecastPage {
    stage: Stage,
    report: Option<ReadyReport>,
}

impl ForecastPage {
    /// Boot the page. `seed` drives emoji placement only; predictions are
    /// seeded by their own strings.
    pub fn load(document: Document, seed: u64) -> Result<Self, PageError> {
        let mut config = config()?;
        config.seed = seed;
        let mut stage = Stage::new(document, config);
        let report = stage.boot();
        Ok(Self { stage, report })
    }

    pub fn report(&self) -> Option<ReadyReport> {
        self.report
    }

    /// Make, render and celebrate one prediction.
    pub fn predict(&mut self, kind: ForecastKind, now: DateTime<Utc>) -> Result<Prediction, PageError> {
        let (seed, label) = kind.seed_and_label(now);
        let prediction = make_prediction(&seed);

        let output = kind.output_id();
        let container = self
            .stage
            .document()
            .find_by_id(output)
            .ok_or_else(|| PageError::missing(output))?;
        let result = self.render_result(container, &prediction, &label);
        self.stage
            .run_transient(result, vec![Step::on_self(POP_IN_MS, StepAction::Show)])?;
        let spawned = self.stage.burst_particles(kind.burst())?;
        log::debug!("{seed}: {} ({spawned} emoji)", prediction.main);
        Ok(prediction)
    }

    /// Route a click to the prediction button it landed in, if any.
    pub fn handle_click(&mut self, node: NodeId, now: DateTime<Utc>) -> Result<Option<Prediction>, PageError> {
        let doc = self.stage.document();
        let kind = std::iter::once(node)
            .chain(doc.ancestors(node))
            .find_map(|n| doc.attribute(n, "id").and_then(ForecastKind::from_button_id));
        match kind {
            Some(kind) => self.predict(kind, now).map(Some),
            None => Ok(None),
        }
    }

    /// The `.result` node currently under `kind`'s output.
    pub fn result(&self, kind: ForecastKind) -> Option<NodeId> {
        let doc = self.stage.document();
        let container = doc.find_by_id(kind.output_id())?;
        doc.query_descendant(container, "result")
    }

    fn render_result(&mut self, container: NodeId, prediction: &Prediction, label: &str) -> NodeId {
        let stale = self.stage.document().children(container).to_vec();
        for child in stale {
            self.stage.remove_element(child);
        }

        let doc = self.stage.document_mut();
        let result = doc.append(container, "div");
        doc.add_class(result, "result");
        doc.add_class(result, "pop-in");
        doc.set_reveal(result, Reveal::AnimatingIn);

        let heading = doc.append(result, "div");
        doc.add_class(heading, "label");
        doc.set_text(heading, label);

        let main = doc.append(result, "div");
        doc.add_class(main, "main");
        doc.set_text(main, "Forecast:");
        let humor = doc.append(main, "span");
        doc.add_class(humor, "humor");
        doc.set_text(humor, prediction.main);

        let extra = doc.append(result, "div");
        doc.add_class(extra, "extra");
        doc.set_text(extra, prediction.extra);
        let joke = doc.append(extra, "em");
        doc.add_class(joke, "joke");
        doc.set_text(joke, prediction.joke);

        result
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }
}

/// Emoji layer, three buttons and their output containers.
pub fn sample_document() -> Document {
    let mut doc = Document::new(Viewport::new(900.0));
    let body = doc.body();

    let layer = doc.append(body, "div");
    doc.add_class(layer, "emoji-layer");
    doc.set_rect(layer, Rect::new(0.0, 900.0));

    for (i, kind) in ForecastKind::ALL.into_iter().enumerate() {
        let top = 100.0 + 250.0 * i as f64;
        let button = doc.append(body, "button");
        doc.set_attribute(button, "id", kind.button_id());
        doc.set_rect(button, Rect::new(top, 40.0));
        let caption = doc.append(button, "span");
        doc.set_text(caption, "Predict");

        let output = doc.append(body, "div");
        doc.set_attribute(output, "id", kind.output_id());
        doc.set_rect(output, Rect::new(top + 60.0, 150.0));
    }
    doc
}
