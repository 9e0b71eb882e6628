//! Pet popularity list with a refresh button.

use unveil_core::config::StageConfig;
use unveil_core::document::{Document, Viewport};
use unveil_core::id::NodeId;
use unveil_core::stage::Stage;

use crate::PageError;

pub const LIST_ID: &str = "pet-list";
pub const REFRESH_ID: &str = "refresh-button";
pub const NOTICE_CLASS: &str = "notice";
pub const REFRESH_NOTICE: &str = "Pet trends are up to date!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PetTrend {
    pub name: &'static str,
    pub popularity: &'static str,
    pub reason: &'static str,
}

pub const PET_TRENDS: [PetTrend; 5] = [
    PetTrend {
        name: "Cats",
        popularity: "Rising",
        reason: "More remote work means more indoor pets",
    },
    PetTrend {
        name: "Small dogs",
        popularity: "Rising",
        reason: "Easy to keep in the city",
    },
    PetTrend {
        name: "Rabbits",
        popularity: "In the spotlight",
        reason: "Cute and low effort",
    },
    PetTrend {
        name: "Ferrets",
        popularity: "Growing",
        reason: "Quirky and playful",
    },
    PetTrend {
        name: "Reptiles",
        popularity: "Gaining fans",
        reason: "Curiosity about something new",
    },
];

impl PetTrend {
    /// `name: popularity - reason`.
    pub fn line(&self) -> String {
        format!("{}{}", self.name, self.detail())
    }

    /// `: popularity - reason`, the text following the bold name.
    pub fn detail(&self) -> String {
        format!(": {} - {}", self.popularity, self.reason)
    }
}

/// Append one `li` per trend to `#pet-list`. The name lives only in a
/// `strong` child; the item's own text is the detail. Returns the items.
pub fn render_pet_list(doc: &mut Document, trends: &[PetTrend]) -> Result<Vec<NodeId>, PageError> {
    let list = doc
        .find_by_id(LIST_ID)
        .ok_or_else(|| PageError::missing(LIST_ID))?;
    Ok(trends
        .iter()
        .map(|pet| {
            let item = doc.append(list, "li");
            doc.set_text(item, &pet.detail());
            let name = doc.append(item, "strong");
            doc.set_text(name, pet.name);
            item
        })
        .collect())
}

pub struct PetsPage {
    stage: Stage,
}

impl PetsPage {
    pub fn load(document: Document) -> Result<Self, PageError> {
        let mut stage = Stage::new(document, StageConfig::default());
        stage.boot();
        render_pet_list(stage.document_mut(), &PET_TRENDS)?;
        Ok(Self { stage })
    }

    /// Show the refresh notice. The list itself is static; a click only
    /// confirms. Returns the notice node.
    pub fn refresh(&mut self) -> NodeId {
        let doc = self.stage.document_mut();
        let body = doc.body();
        let notice = match doc.query_by_classes(&[NOTICE_CLASS]).first() {
            Some(&existing) => existing,
            None => {
                let node = doc.append(body, "div");
                doc.add_class(node, NOTICE_CLASS);
                node
            }
        };
        doc.set_text(notice, REFRESH_NOTICE);
        log::info!("{REFRESH_NOTICE}");
        notice
    }

    /// Refresh when the click landed inside the refresh button.
    pub fn handle_click(&mut self, node: NodeId) -> Option<NodeId> {
        let doc = self.stage.document();
        let on_button = std::iter::once(node)
            .chain(doc.ancestors(node))
            .any(|n| doc.attribute(n, "id") == Some(REFRESH_ID));
        on_button.then(|| self.refresh())
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }
}

/// An empty `#pet-list` and the refresh button.
pub fn sample_document() -> Document {
    let mut doc = Document::new(Viewport::new(800.0));
    let body = doc.body();
    let list = doc.append(body, "ul");
    doc.set_attribute(list, "id", LIST_ID);
    let button = doc.append(body, "button");
    doc.set_attribute(button, "id", REFRESH_ID);
    doc.set_text(button, "Refresh");
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_trend_in_order() {
        let page = PetsPage::load(sample_document()).unwrap();
        let doc = page.stage().document();
        let list = doc.find_by_id(LIST_ID).unwrap();
        let items = doc.children(list);
        assert_eq!(items.len(), 5);
        assert_eq!(
            doc.text(items[0]),
            Some(": Rising - More remote work means more indoor pets")
        );
        let name = doc.children(items[4])[0];
        assert_eq!(doc.tag(name), Some("strong"));
        assert_eq!(doc.text(name), Some("Reptiles"));

        // Bold name then detail reads as the full line, name shown once.
        for (item, pet) in items.iter().zip(PET_TRENDS) {
            let name = doc.children(*item)[0];
            let shown = format!("{}{}", doc.text(name).unwrap(), doc.text(*item).unwrap());
            assert_eq!(shown, pet.line());
            assert!(!doc.text(*item).unwrap().contains(pet.name));
        }
    }

    #[test]
    fn missing_list_is_an_error() {
        let doc = Document::new(Viewport::new(800.0));
        let err = PetsPage::load(doc).err().unwrap();
        assert!(matches!(err, PageError::MissingElement { id } if id == LIST_ID));
    }

    #[test]
    fn refresh_writes_a_single_notice() {
        let mut page = PetsPage::load(sample_document()).unwrap();
        let button = page.stage().document().find_by_id(REFRESH_ID).unwrap();
        let first = page.handle_click(button).unwrap();
        let second = page.handle_click(button).unwrap();
        assert_eq!(first, second);
        assert_eq!(page.stage().document().text(first), Some(REFRESH_NOTICE));

        let body = page.stage().document().body();
        assert_eq!(page.handle_click(body), None);
    }
}
