//! Weekly weather widget with an umbrella hint.
//!
//! The forecast is fabricated from a fixed sample starting at a given date.
//! Each day renders as a `.day` node under `#week`, and `#statusTop` gets a
//! one-line summary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use unveil_core::config::StageConfig;
use unveil_core::document::{Document, Viewport};
use unveil_core::id::NodeId;
use unveil_core::stage::{ReadyReport, Stage};

use crate::PageError;

pub const WEEK_ID: &str = "week";
pub const STATUS_ID: &str = "statusTop";

pub const STATUS_LOADING: &str = "Loading...";
pub const STATUS_UMBRELLA: &str = "Some days look like umbrella days";
pub const STATUS_DRY: &str = "No umbrella needed this week";
pub const STATUS_FAILED: &str = "Could not load the weather";

/// Icon shown for a condition with no mapping.
pub const UNKNOWN_ICON: &str = "❔";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    Clear,
    Clouds,
    Rain,
    Drizzle,
    Thunderstorm,
    Snow,
    Mist,
    #[serde(other)]
    Unknown,
}

impl Condition {
    pub fn icon(self) -> &'static str {
        match self {
            Condition::Clear => "☀️",
            Condition::Clouds => "☁️",
            Condition::Rain => "🌧️",
            Condition::Drizzle => "🌦️",
            Condition::Thunderstorm => "⛈️",
            Condition::Snow => "❄️",
            Condition::Mist => "🌫️",
            Condition::Unknown => UNKNOWN_ICON,
        }
    }

    pub fn is_wet(self) -> bool {
        matches!(
            self,
            Condition::Rain | Condition::Thunderstorm | Condition::Drizzle
        )
    }
}

/// One day of forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayForecast {
    pub date: NaiveDate,
    pub condition: Condition,
    pub min_c: i32,
    pub max_c: i32,
    /// Probability of precipitation in `[0, 1]`.
    pub pop: f64,
}

impl DayForecast {
    pub fn needs_umbrella(&self) -> bool {
        needs_umbrella(self.pop, self.condition)
    }

    /// Short English weekday, e.g. `Mon`.
    pub fn weekday(&self) -> String {
        self.date.format("%a").to_string()
    }

    /// Precipitation chance as a whole percentage.
    pub fn pop_percent(&self) -> i64 {
        (self.pop * 100.0).round() as i64
    }
}

/// Umbrella when rain is at least even odds or the condition is wet.
pub fn needs_umbrella(pop: f64, condition: Condition) -> bool {
    pop >= 0.5 || condition.is_wet()
}

/// `(condition, min, max, pop)` cycled over the week.
const SAMPLE: [(Condition, i32, i32, f64); 7] = [
    (Condition::Clear, 18, 28, 0.05),
    (Condition::Clouds, 19, 26, 0.1),
    (Condition::Rain, 17, 23, 0.7),
    (Condition::Rain, 16, 22, 0.6),
    (Condition::Clear, 18, 27, 0.02),
    (Condition::Drizzle, 17, 21, 0.4),
    (Condition::Clouds, 18, 24, 0.12),
];

/// Seven consecutive days starting at `start`.
pub fn weekly_forecast(start: NaiveDate) -> Vec<DayForecast> {
    start
        .iter_days()
        .zip(SAMPLE.iter().cycle())
        .take(7)
        .map(|(date, &(condition, min_c, max_c, pop))| DayForecast {
            date,
            condition,
            min_c,
            max_c,
            pop,
        })
        .collect()
}

/// Replace the children of `#week` with one `.day` node per forecast day.
/// Returns the day nodes.
pub fn render_week(doc: &mut Document, week: &[DayForecast]) -> Result<Vec<NodeId>, PageError> {
    let container = doc
        .find_by_id(WEEK_ID)
        .ok_or_else(|| PageError::missing(WEEK_ID))?;
    doc.clear_children(container);

    let days = week
        .iter()
        .map(|day| {
            let el = doc.append(container, "div");
            doc.add_class(el, "day");
            if day.needs_umbrella() {
                let badge = doc.append(el, "div");
                doc.add_class(badge, "badge");
                doc.set_text(badge, "☂ Umbrella");
            }
            let parts = [
                ("date", format!("{} {}", day.weekday(), day.date.format("%Y-%m-%d"))),
                ("icon", day.condition.icon().to_string()),
                ("temp", format!("{}° / {}°", day.min_c, day.max_c)),
                ("note", format!("Chance of rain {}%", day.pop_percent())),
            ];
            for (class, text) in parts {
                let part = doc.append(el, "div");
                doc.add_class(part, class);
                doc.set_text(part, &text);
            }
            el
        })
        .collect();
    Ok(days)
}

fn set_status(doc: &mut Document, text: &str) {
    if let Some(status) = doc.find_by_id(STATUS_ID) {
        doc.set_text(status, text);
    }
}

/// The widget page. It has no reveal or input configuration; the stage only
/// hosts the document.
pub struct WeatherPage {
    stage: Stage,
    report: Option<ReadyReport>,
    week: Vec<DayForecast>,
}

impl WeatherPage {
    /// Render the week starting at `today`. A missing `#week` container
    /// reports the failure in the status line and leaves the week empty.
    pub fn load(document: Document, today: NaiveDate) -> Self {
        let mut stage = Stage::new(document, StageConfig::default());
        let report = stage.boot();

        let doc = stage.document_mut();
        set_status(doc, STATUS_LOADING);
        let week = weekly_forecast(today);
        let week = match render_week(doc, &week) {
            Ok(_) => {
                let status = if week.iter().any(DayForecast::needs_umbrella) {
                    STATUS_UMBRELLA
                } else {
                    STATUS_DRY
                };
                set_status(doc, status);
                week
            }
            Err(err) => {
                log::error!("weather widget: {err}");
                set_status(doc, STATUS_FAILED);
                Vec::new()
            }
        };
        Self {
            stage,
            report,
            week,
        }
    }

    pub fn report(&self) -> Option<ReadyReport> {
        self.report
    }

    pub fn week(&self) -> &[DayForecast] {
        &self.week
    }

    pub fn status(&self) -> Option<&str> {
        let doc = self.stage.document();
        doc.find_by_id(STATUS_ID).and_then(|s| doc.text(s))
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }
}

/// A document with `#statusTop` and an empty `#week` container.
pub fn sample_document() -> Document {
    let mut doc = Document::new(Viewport::new(800.0));
    let body = doc.body();
    let status = doc.append(body, "p");
    doc.set_attribute(status, "id", STATUS_ID);
    let week = doc.append(body, "div");
    doc.set_attribute(week, "id", WEEK_ID);
    doc
}
