use tracing::{debug, warn};

use crate::app::{PricelensError, Result};
use crate::domain::ProductCode;
use crate::engine::wait::settle;
use crate::engine::RenderingEngine;
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::scripts;

/// Resolves a product code to its product listing page.
pub struct Navigator<'a, E: RenderingEngine> {
    engine: &'a E,
    config: &'a PipelineConfig,
}

impl<'a, E: RenderingEngine> Navigator<'a, E> {
    pub fn new(engine: &'a E, config: &'a PipelineConfig) -> Self {
        Self { engine, config }
    }

    /// Load the product page for `code` in the foreground context.
    ///
    /// Returns [`PricelensError::NotFound`] when the search page never shows
    /// a product link or the product page cannot be loaded.
    pub async fn open(&self, code: &ProductCode) -> Result<String> {
        let search_url = self.config.search_url(code)?;
        self.engine.navigate(&search_url).await?;
        settle(self.config.search_settle()).await;

        let link = self
            .engine
            .wait_for_element(
                &self.config.product_link_selector,
                self.config.navigation_timeout(),
                self.config.poll_interval(),
            )
            .await
            .ok_or_else(|| PricelensError::NotFound(code.to_string()))?;

        let href = self
            .engine
            .read_attribute(&link, "href")
            .await?
            .filter(|href| !href.trim().is_empty())
            .ok_or_else(|| PricelensError::NotFound(code.to_string()))?;
        let product_url = url::Url::parse(&search_url)?.join(href.trim())?.to_string();

        if let Err(e) = self.engine.navigate(&product_url).await {
            if e.is_fatal() {
                return Err(e);
            }
            warn!("Product page {} failed to load: {}", product_url, e);
            return Err(PricelensError::NotFound(code.to_string()));
        }
        settle(self.config.product_settle()).await;

        self.switch_to_list_view().await;
        Ok(product_url)
    }

    /// Best-effort switch of the listing to list view.
    async fn switch_to_list_view(&self) {
        for selector in &self.config.list_view_selectors {
            match self.engine.find_elements(selector).await {
                Ok(elements) => {
                    if let Some(control) = elements.first() {
                        match self
                            .engine
                            .execute_script(scripts::CLICK_ELEMENT, Some(control))
                            .await
                        {
                            Ok(_) => {
                                debug!("Switched to list view via {}", selector);
                                settle(self.config.list_view_settle()).await;
                            }
                            Err(e) => debug!("List view control {} not clickable: {}", selector, e),
                        }
                        return;
                    }
                }
                Err(e) => debug!("List view lookup {} failed: {}", selector, e),
            }
        }

        let script = scripts::click_by_label("a", &[self.config.list_view_label.as_str()], true);
        match self.engine.execute_script(&script, None).await {
            Ok(clicked) if clicked.as_u64().unwrap_or(0) > 0 => {
                debug!("Switched to list view via link label");
                settle(self.config.list_view_settle()).await;
            }
            Ok(_) => debug!("No list view control on page"),
            Err(e) => debug!("List view switch failed: {}", e),
        }
    }
}
