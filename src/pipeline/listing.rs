use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::app::Result;
use crate::engine::RenderingEngine;
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::scripts;

/// Leading layout variants consulted when confirming the display mode.
const CONFIRMATION_LAYOUTS: usize = 2;

static SPAN: Lazy<Selector> = Lazy::new(|| Selector::parse("span").expect("valid selector"));
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("valid selector"));

/// One result row as read from the page, before field extraction.
#[derive(Debug, Clone)]
pub struct ListingCandidate<H> {
    /// Rendered text of the row.
    pub text: String,
    /// Inner markup of the row.
    pub markup: String,
    /// URL of the page the row was read from, for resolving relative links.
    pub base_url: Option<String>,
    pub handle: H,
}

impl ListingCandidate<()> {
    pub fn from_parts(text: &str, markup: &str) -> Self {
        Self {
            text: text.to_string(),
            markup: markup.to_string(),
            base_url: None,
            handle: (),
        }
    }
}

/// Whether a row matches the generic layout: a `span` showing a yen amount
/// plus at least one link.
pub fn is_generic_listing(markup: &str) -> bool {
    let fragment = Html::parse_fragment(markup);
    let has_amount = fragment
        .select(&SPAN)
        .any(|span| span.text().any(|t| t.contains('円')));
    has_amount && fragment.select(&LINK).next().is_some()
}

/// Finds the result rows of whichever layout variant the page rendered.
pub struct ListingEnumerator<'a, E: RenderingEngine> {
    engine: &'a E,
    config: &'a PipelineConfig,
}

impl<'a, E: RenderingEngine> ListingEnumerator<'a, E> {
    pub fn new(engine: &'a E, config: &'a PipelineConfig) -> Self {
        Self { engine, config }
    }

    /// Rows of the first layout variant that yields any, falling back to the
    /// generic pattern. Variants are never merged.
    pub async fn enumerate(&self) -> Result<Vec<E::Element>> {
        for selector in &self.config.layout_selectors {
            let found = self.engine.find_elements(selector).await?;
            if !found.is_empty() {
                debug!("Layout {} matched {} rows", selector, found.len());
                return Ok(found);
            }
        }

        let mut rows = Vec::new();
        for element in self.engine.find_elements(&self.config.generic_item_selector).await? {
            match self.engine.read_markup(&element).await {
                Ok(markup) if is_generic_listing(&markup) => rows.push(element),
                Ok(_) => {}
                Err(e) => debug!("Skipping unreadable row: {}", e),
            }
        }
        debug!("Generic layout matched {} rows", rows.len());
        Ok(rows)
    }

    /// Text of the first row of the leading layout variants.
    pub async fn first_item_text(&self) -> Option<String> {
        for selector in self.config.layout_selectors.iter().take(CONFIRMATION_LAYOUTS) {
            let found = match self.engine.find_elements(selector).await {
                Ok(found) => found,
                Err(e) => {
                    debug!("Layout lookup {} failed: {}", selector, e);
                    continue;
                }
            };
            if let Some(first) = found.first() {
                return self.engine.read_text(first).await.ok();
            }
        }
        None
    }

    /// Scroll a row into view and snapshot its text and markup.
    pub async fn read_candidate(
        &self,
        element: E::Element,
        base_url: Option<String>,
    ) -> Result<ListingCandidate<E::Element>> {
        if let Err(e) = self
            .engine
            .execute_script(scripts::SCROLL_INTO_VIEW, Some(&element))
            .await
        {
            warn!("Failed to scroll row into view: {}", e);
        }

        let text = self.engine.read_text(&element).await?;
        let markup = self.engine.read_markup(&element).await?;
        Ok(ListingCandidate {
            text,
            markup,
            base_url,
            handle: element,
        })
    }
}
