//! The history timeline page.
//!
//! Everything except the welcome toast is declared in `pages/timeline.ron`.
//! The toast is a hidden node appended at load and driven by transient steps.

use unveil_core::config::StageConfig;
use unveil_core::document::{Document, Rect, Viewport};
use unveil_core::id::NodeId;
use unveil_core::sequencer::{Step, StepAction};
use unveil_core::stage::{ReadyReport, Stage};
use unveil_core::visual::Reveal;

use crate::PageError;

/// Embedded page config.
pub const CONFIG: &str = include_str!("../pages/timeline.ron");

pub const WELCOME_TEXT: &str = "🎉 Welcome to a journey through history!";

/// Class carried by the welcome toast node.
pub const TOAST_CLASS: &str = "welcome-toast";

/// Fade in at 1100ms, fade out at 3000ms, gone at 3500ms.
pub fn welcome_steps() -> Vec<Step> {
    vec![
        Step::on_self(1100, StepAction::Show),
        Step::on_self(3000, StepAction::Hide),
        Step::on_self(3500, StepAction::Detach),
    ]
}

pub fn config() -> Result<StageConfig, PageError> {
    crate::embedded_config(CONFIG)
}

pub struct TimelinePage {
    stage: Stage,
    report: Option<ReadyReport>,
    toast: Option<NodeId>,
}

impl TimelinePage {
    /// Boot the page over `document`. A startup failure leaves the page
    /// inert (logged, no toast); only a broken embedded config is an error.
    pub fn load(document: Document) -> Result<Self, PageError> {
        let mut stage = Stage::new(document, config()?);
        let report = stage.boot();
        let toast = match report {
            Some(_) => Some(show_welcome(&mut stage)?),
            None => None,
        };
        Ok(Self {
            stage,
            report,
            toast,
        })
    }

    pub fn report(&self) -> Option<ReadyReport> {
        self.report
    }

    pub fn toast(&self) -> Option<NodeId> {
        self.toast
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }
}

fn show_welcome(stage: &mut Stage) -> Result<NodeId, PageError> {
    let doc = stage.document_mut();
    let body = doc.body();
    let toast = doc.append(body, "div");
    doc.add_class(toast, TOAST_CLASS);
    doc.set_text(toast, WELCOME_TEXT);
    doc.set_reveal(toast, Reveal::Hidden);
    stage.run_transient(toast, welcome_steps())?;
    Ok(toast)
}

// ---------------------------------------------------------------------------
// Sample document
// ---------------------------------------------------------------------------

/// Eras shown on the sample page: (id, year, title).
pub const ERAS: [(&str, &str, &str); 5] = [
    ("era-1", "1903", "First powered flight"),
    ("era-2", "1928", "Penicillin discovered"),
    ("era-3", "1969", "Moon landing"),
    ("era-4", "1989", "The web is proposed"),
    ("era-5", "2007", "The smartphone era"),
];

/// Stat cards on the sample page: (label, data-target).
pub const STATS: [(&str, &str); 4] = [
    ("Years covered", "104"),
    ("Inventions", "1234"),
    ("Passengers per day", "8000000"),
    ("Unknown", "n/a"),
];

pub const ITEM_HEIGHT: f64 = 250.0;
pub const FIRST_ITEM_TOP: f64 = 400.0;
pub const ITEM_GAP: f64 = 300.0;

/// Top edge of the stats row.
pub fn stats_top() -> f64 {
    FIRST_ITEM_TOP + ITEM_GAP * ERAS.len() as f64 + 100.0
}

fn block(doc: &mut Document, parent: NodeId, tag: &str, class: &str, rect: Rect) -> NodeId {
    let id = doc.append(parent, tag);
    if !class.is_empty() {
        doc.add_class(id, class);
    }
    doc.set_rect(id, rect);
    id
}

/// A laid-out timeline page in an 800px viewport: header with title, home
/// link and era anchors, five timeline items, a stats row and a closing
/// message card.
pub fn sample_document() -> Document {
    let mut doc = Document::new(Viewport::new(800.0));
    let body = doc.body();

    let header = block(&mut doc, body, "header", "header", Rect::new(0.0, 320.0));
    let title = block(&mut doc, header, "h1", "title", Rect::new(80.0, 60.0));
    doc.set_text(title, "A Short History of Everything");
    let home = block(&mut doc, header, "a", "home-link", Rect::new(20.0, 24.0));
    doc.set_attribute(home, "href", "../index.html");
    doc.set_text(home, "Home");

    let nav = block(&mut doc, header, "nav", "era-nav", Rect::new(240.0, 40.0));
    for (id, year, _) in ERAS {
        let link = block(&mut doc, nav, "a", "era-link", Rect::new(240.0, 40.0));
        doc.set_attribute(link, "href", &format!("#{id}"));
        doc.set_text(link, year);
    }

    for (i, (id, year, title)) in ERAS.into_iter().enumerate() {
        let top = FIRST_ITEM_TOP + ITEM_GAP * i as f64;
        let item = block(&mut doc, body, "div", "timeline-item", Rect::new(top, ITEM_HEIGHT));
        doc.set_attribute(item, "id", id);
        block(&mut doc, item, "span", "timeline-marker", Rect::new(top, 24.0));
        let content = block(
            &mut doc,
            item,
            "div",
            "timeline-content",
            Rect::new(top, ITEM_HEIGHT - 20.0),
        );
        let heading = block(&mut doc, content, "h3", "", Rect::new(top, 30.0));
        doc.set_text(heading, &format!("{year}: {title}"));
    }

    let stats_top = stats_top();
    let stats = block(&mut doc, body, "section", "stats", Rect::new(stats_top, 200.0));
    for (label, target) in STATS {
        let card = block(&mut doc, stats, "div", "stat-card", Rect::new(stats_top, 200.0));
        let number = block(&mut doc, card, "span", "stat-number", Rect::new(stats_top + 40.0, 60.0));
        doc.set_attribute(number, "data-target", target);
        doc.set_text(number, "0");
        let caption = block(&mut doc, card, "p", "stat-label", Rect::new(stats_top + 120.0, 30.0));
        doc.set_text(caption, label);
    }

    let message = block(&mut doc, body, "div", "message-card", Rect::new(stats_top + 300.0, 240.0));
    doc.set_text(message, "History is still being written.");

    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use unveil_core::router::{Binding, InputEvent};
    use unveil_core::stage::StagePhase;
    use unveil_core::visual::Accent;

    fn loaded() -> TimelinePage {
        TimelinePage::load(sample_document()).unwrap()
    }

    fn item(page: &TimelinePage, id: &str) -> NodeId {
        page.stage().document().find_by_id(id).unwrap()
    }

    #[test]
    fn embedded_config_parses() {
        let config = config().unwrap();
        assert_eq!(config.reveals.len(), 1);
        assert_eq!(config.reveals[0].classes.len(), 3);
        assert_eq!(config.reveals[0].plans[0].steps.len(), 2);
        assert_eq!(config.reveals[0].plans[0].enter_stagger_ms, 300);
        assert_eq!(config.ramps.len(), 1);
        assert_eq!(config.ramps[0].watch.threshold, 0.5);
        assert_eq!(config.bindings.len(), 6);
        assert!(config.bindings.contains(&Binding::page_scroll()));
        assert!(config.bindings.contains(&Binding::home()));
        assert!(config.particles.is_some());
    }

    #[test]
    fn load_reveals_what_is_in_view() {
        let page = loaded();
        let report = page.report().unwrap();
        assert_eq!(page.stage().phase(), StagePhase::Ready);
        // Five items, four stat cards, one message card.
        assert_eq!(report.observed, 10);
        assert_eq!(report.ramp_targets, STATS.len());
        // Items at 400 and 700 are visible above the 750px effective bottom.
        assert_eq!(report.entered, 2);
        assert!(report.particles);
        let doc = page.stage().document();
        assert!(doc.is_revealed(item(&page, "era-1")));
        assert!(doc.is_revealed(item(&page, "era-2")));
        assert!(!doc.is_revealed(item(&page, "era-3")));
    }

    #[test]
    fn visible_items_fade_in_three_tenths_apart() {
        let mut page = loaded();
        let reveal = |page: &TimelinePage, id: &str| {
            page.stage().document().visual(item(page, id)).unwrap().reveal
        };
        assert_eq!(reveal(&page, "era-1"), Reveal::AnimatingIn);
        assert_eq!(reveal(&page, "era-2"), Reveal::Initial);

        page.stage_mut().advance_to(299).unwrap();
        assert_eq!(reveal(&page, "era-2"), Reveal::Initial);
        page.stage_mut().advance_to(300).unwrap();
        assert_eq!(reveal(&page, "era-2"), Reveal::AnimatingIn);

        // The third item keeps its slot even though it enters on scroll.
        page.stage_mut().dispatch(InputEvent::key("Space"));
        assert!(page.stage().document().is_revealed(item(&page, "era-3")));
        assert_eq!(reveal(&page, "era-3"), Reveal::Initial);
        page.stage_mut().advance(600).unwrap();
        assert_eq!(reveal(&page, "era-3"), Reveal::AnimatingIn);
    }

    #[test]
    fn welcome_toast_lifecycle() {
        let mut page = loaded();
        let toast = page.toast().unwrap();
        let visual = |page: &TimelinePage| page.stage().document().visual(toast);

        assert_eq!(visual(&page).unwrap().reveal, Reveal::Hidden);
        page.stage_mut().advance_to(1100).unwrap();
        assert_eq!(visual(&page).unwrap().reveal, Reveal::Shown);
        page.stage_mut().advance_to(3000).unwrap();
        assert_eq!(visual(&page).unwrap().reveal, Reveal::Hidden);
        page.stage_mut().advance_to(3499).unwrap();
        assert!(page.stage().document().contains(toast));
        page.stage_mut().advance_to(3500).unwrap();
        assert!(!page.stage().document().contains(toast));
    }

    #[test]
    fn space_scrolls_and_reveals_more() {
        let mut page = loaded();
        page.stage_mut().dispatch(InputEvent::key("Space"));
        assert_eq!(page.stage().document().viewport().scroll_top, 640.0);
        assert!(page.stage().document().is_revealed(item(&page, "era-3")));
    }

    #[test]
    fn era_anchor_scrolls_to_item() {
        let mut page = loaded();
        let link = page.stage().document().find_link_containing("#era-4").unwrap();
        page.stage_mut().dispatch(InputEvent::Click { node: link });
        let top = FIRST_ITEM_TOP + ITEM_GAP * 3.0;
        assert_eq!(page.stage().document().viewport().scroll_top, top);
        assert!(page.stage().document().is_revealed(item(&page, "era-4")));
    }

    #[test]
    fn ctrl_h_goes_home() {
        let mut page = loaded();
        page.stage_mut().dispatch(InputEvent::ctrl_key("KeyH"));
        assert_eq!(page.stage().document().location(), "../index.html");
    }

    #[test]
    fn title_hover_switches_to_gradient() {
        let mut page = loaded();
        let title = page.stage().document().query_by_classes(&["title"])[0];
        page.stage_mut().dispatch(InputEvent::PointerEnter { node: title });
        let accent = page.stage().document().visual(title).unwrap().accent;
        assert_eq!(accent, Accent::Gradient);
        page.stage_mut().dispatch(InputEvent::PointerLeave { node: title });
        let accent = page.stage().document().visual(title).unwrap().accent;
        assert_eq!(accent, Accent::Pulsing);
    }

    #[test]
    fn stats_count_up_once_scrolled_into_view() {
        let mut page = loaded();
        page.stage_mut().scroll_to(stats_top() - 200.0);
        page.stage_mut().advance(2100).unwrap();
        let doc = page.stage().document();
        let texts: Vec<_> = doc
            .query_by_classes(&["stat-number"])
            .into_iter()
            .map(|n| doc.text(n).unwrap_or("").to_string())
            .collect();
        assert_eq!(texts, ["104", "1,234", "8,000,000", "0"]);
    }
}
