//! The card grid page: fade-up reveals, toggleable details and a back button.

use unveil_core::config::StageConfig;
use unveil_core::document::{Document, Rect, Viewport};
use unveil_core::id::NodeId;
use unveil_core::stage::{ReadyReport, Stage};

use crate::PageError;

pub const CONFIG: &str = include_str!("../pages/cards.ron");

/// Id of the back-to-index button.
pub const BACK_BUTTON_ID: &str = "to21index";

pub fn config() -> Result<StageConfig, PageError> {
    crate::embedded_config(CONFIG)
}

pub struct CardsPage {
    stage: Stage,
    report: Option<ReadyReport>,
}

impl CardsPage {
    pub fn load(document: Document) -> Result<Self, PageError> {
        let mut stage = Stage::new(document, config()?);
        let report = stage.boot();
        Ok(Self { stage, report })
    }

    pub fn report(&self) -> Option<ReadyReport> {
        self.report
    }

    /// Cards that have faded in so far.
    pub fn visible_cards(&self) -> Vec<NodeId> {
        let doc = self.stage.document();
        doc.query_by_classes(&["card"])
            .into_iter()
            .filter(|&c| doc.has_class(c, "visible"))
            .collect()
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }
}

pub const CARD_HEIGHT: f64 = 300.0;
pub const CARD_GAP: f64 = 350.0;

/// Ids of one sample card's parts.
#[derive(Debug, Clone, Copy)]
pub struct SampleCard {
    pub card: NodeId,
    pub toggle: NodeId,
    pub details: NodeId,
}

/// Six stacked cards in a 700px viewport, each with a "more" button whose
/// `data-toggle` names the card's details panel, plus the back button.
pub fn sample_document() -> (Document, Vec<SampleCard>) {
    let mut doc = Document::new(Viewport::new(700.0));
    let body = doc.body();

    let back = doc.append(body, "button");
    doc.set_attribute(back, "id", BACK_BUTTON_ID);
    doc.set_text(back, "Back to index");
    doc.set_rect(back, Rect::new(10.0, 40.0));

    let cards = (0..6)
        .map(|i| {
            let top = 100.0 + CARD_GAP * i as f64;
            let card = doc.append(body, "article");
            doc.add_class(card, "card");
            doc.set_rect(card, Rect::new(top, CARD_HEIGHT));

            let toggle = doc.append(card, "button");
            doc.set_attribute(toggle, "data-toggle", &format!("details-{i}"));
            doc.set_rect(toggle, Rect::new(top + 240.0, 40.0));
            let label = doc.append(toggle, "span");
            doc.set_text(label, "More");

            let details = doc.append(card, "div");
            doc.add_class(details, "details");
            doc.set_attribute(details, "id", &format!("details-{i}"));
            doc.set_rect(details, Rect::new(top + 60.0, 160.0));

            SampleCard {
                card,
                toggle,
                details,
            }
        })
        .collect();

    (doc, cards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use unveil_core::router::{Binding, InputEvent};
    use unveil_core::visual::Accent;

    #[test]
    fn embedded_config_parses() {
        let config = config().unwrap();
        assert_eq!(config.reveals[0].enter_class, "visible");
        assert_eq!(config.reveals[0].watch.threshold, 0.12);
        assert!(config.reveals[0].plans.is_empty());
        assert_eq!(config.bindings[0], Binding::toggle());
        assert_eq!(config.bindings[1], Binding::navigate("to21index", "./21index.html"));
        assert!(config.particles.is_none());
    }

    #[test]
    fn cards_fade_in_as_they_scroll_into_view() {
        let (doc, cards) = sample_document();
        let mut page = CardsPage::load(doc).unwrap();
        // 100..400 and 450..750 (12% of 300 is 36px; 700 - 450 = 250).
        assert_eq!(page.visible_cards(), vec![cards[0].card, cards[1].card]);

        page.stage_mut().scroll_to(1000.0);
        assert_eq!(page.visible_cards().len(), 5);

        // Scrolling back never hides anything.
        page.stage_mut().scroll_to(0.0);
        assert_eq!(page.visible_cards().len(), 5);
    }

    #[test]
    fn toggle_opens_and_closes_details() {
        let (doc, cards) = sample_document();
        let mut page = CardsPage::load(doc).unwrap();
        let SampleCard {
            toggle, details, ..
        } = cards[0];
        let label = page.stage().document().children(toggle)[0];

        page.stage_mut().dispatch(InputEvent::Click { node: label });
        assert!(page.stage().document().has_class(details, "open"));
        let accent = page.stage().document().visual(toggle).unwrap().accent;
        assert_eq!(accent, Accent::Pressed);

        page.stage_mut().advance(180).unwrap();
        let accent = page.stage().document().visual(toggle).unwrap().accent;
        assert_eq!(accent, Accent::None);

        page.stage_mut().dispatch(InputEvent::Click { node: toggle });
        assert!(!page.stage().document().has_class(details, "open"));
    }

    #[test]
    fn toggle_with_missing_details_does_nothing() {
        let (mut doc, cards) = sample_document();
        doc.set_attribute(cards[2].toggle, "data-toggle", "nowhere");
        let mut page = CardsPage::load(doc).unwrap();
        assert_eq!(page.stage_mut().dispatch(InputEvent::Click { node: cards[2].toggle }), 0);
    }

    #[test]
    fn back_button_navigates() {
        let (doc, _) = sample_document();
        let mut page = CardsPage::load(doc).unwrap();
        let back = page.stage().document().find_by_id(BACK_BUTTON_ID).unwrap();
        page.stage_mut().dispatch(InputEvent::Click { node: back });
        assert_eq!(page.stage().document().location(), "./21index.html");
    }
}
