//! Headless runner: boots every page, drives it on the virtual clock, prints
//! what happened and verifies the timeline replays identically.
//!
//! Run with: `RUST_LOG=debug cargo run --package unveil-pages --example headless_runner`

use chrono::{NaiveDate, TimeZone, Utc};
use unveil_core::event::EventKind;
use unveil_core::router::InputEvent;
use unveil_pages::cards::{self, CardsPage};
use unveil_pages::forecast::{self, ForecastKind, ForecastPage};
use unveil_pages::pets::{self, PetsPage};
use unveil_pages::timeline::{self, TimelinePage};
use unveil_pages::weather::{self, WeatherPage};

const RUN_MS: u64 = 6_000;

/// Scroll through the timeline page and return a fingerprint of what it did.
fn run_timeline() -> Vec<String> {
    let mut page = TimelinePage::load(timeline::sample_document()).expect("timeline config");
    let stage = page.stage_mut();
    for _ in 0..6 {
        stage.dispatch(InputEvent::key("Space"));
        stage.advance(RUN_MS / 6).expect("advance");
    }

    let doc = stage.document();
    let mut lines: Vec<String> = doc
        .query_by_classes(&["stat-number"])
        .into_iter()
        .map(|n| format!("stat {}", doc.text(n).unwrap_or("")))
        .collect();
    for kind in EventKind::ALL {
        lines.push(format!("{kind:?} x{}", stage.events().total_emitted(kind)));
    }
    lines.push(format!("particles live {}", stage.live_particles()));
    lines
}

fn main() {
    env_logger::init();

    println!("--- timeline ---");
    let first = run_timeline();
    for line in &first {
        println!("    {line}");
    }
    let second = run_timeline();
    if first == second {
        println!("    Determinism: PASS");
    } else {
        println!("    Determinism: FAIL!");
        std::process::exit(1);
    }

    println!("\n--- cards ---");
    let (doc, sample) = cards::sample_document();
    let mut page = CardsPage::load(doc).expect("cards config");
    page.stage_mut().dispatch(InputEvent::Click {
        node: sample[0].toggle,
    });
    page.stage_mut().scroll_to(2_000.0);
    println!("    visible cards: {}", page.visible_cards().len());
    println!(
        "    details-0 open: {}",
        page.stage().document().has_class(sample[0].details, "open")
    );

    println!("\n--- weather ---");
    let today = NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date");
    let page = WeatherPage::load(weather::sample_document(), today);
    for day in page.week() {
        let umbrella = if day.needs_umbrella() { " (umbrella)" } else { "" };
        println!(
            "    {} {} {} {}°/{}°{umbrella}",
            day.weekday(),
            day.date,
            day.condition.icon(),
            day.min_c,
            day.max_c
        );
    }
    println!("    status: {}", page.status().unwrap_or(""));

    println!("\n--- forecast ---");
    let now = Utc
        .with_ymd_and_hms(2026, 10, 19, 9, 0, 0)
        .single()
        .expect("valid time");
    let mut page = ForecastPage::load(forecast::sample_document(), 24).expect("forecast config");
    for kind in ForecastKind::ALL {
        let p = page.predict(kind, now).expect("prediction");
        println!("    {kind:?}: {} / {} / {}", p.main, p.extra, p.joke);
    }
    println!("    emoji in flight: {}", page.stage().live_particles());
    page.stage_mut().advance(5_000).expect("advance");
    println!("    emoji after 5s: {}", page.stage().live_particles());

    println!("\n--- pets ---");
    let mut page = PetsPage::load(pets::sample_document()).expect("pet list");
    for trend in pets::PET_TRENDS {
        println!("    {}", trend.line());
    }
    page.refresh();
}
