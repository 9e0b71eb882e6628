//! Page scripts built on the Unveil engine.
//!
//! Each page is a thin layer of configuration and glue over
//! [`unveil_core::stage::Stage`]: the timeline and card pages are almost
//! entirely declared in RON under `pages/`, while the weather, fortune and
//! pet pages render their own content into the document and lean on the
//! stage for transient animations and particles.
//!
//! # Usage
//!
//! ```rust,ignore
//! use unveil_pages::timeline::{TimelinePage, sample_document};
//!
//! let mut page = TimelinePage::load(sample_document())?;
//! page.stage_mut().scroll_to(900.0);
//! page.stage_mut().advance(500)?;
//! ```

pub mod cards;
pub mod error;
pub mod forecast;
pub mod pets;
pub mod timeline;
pub mod weather;

pub use error::PageError;

use unveil_core::config::{Format, StageConfig, parse_config};

/// Parse one of the embedded RON page configs.
pub(crate) fn embedded_config(source: &str) -> Result<StageConfig, PageError> {
    Ok(parse_config(source, Format::Ron)?)
}
