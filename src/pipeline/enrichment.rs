use tracing::{debug, warn};

use crate::app::{PricelensError, Result};
use crate::domain::NO_ORDER_ACTIVITY;
use crate::engine::wait::settle;
use crate::engine::{ContextStack, RenderingEngine};
use crate::pipeline::config::PipelineConfig;

/// Urgency phrases on item pages, in priority order.
pub const ORDER_ACTIVITY_PHRASES: [&str; 3] = ["以内に注文", "人がカート", "人が検討"];

/// First line mentioning an urgency phrase. Phrases are tried in priority
/// order, lines in page order.
pub fn find_order_activity(body: &str) -> Option<String> {
    ORDER_ACTIVITY_PHRASES.iter().find_map(|phrase| {
        body.lines()
            .find(|line| line.contains(phrase))
            .map(|line| line.trim().to_string())
    })
}

/// Reads the order-activity line from an item's own page.
pub struct EnrichmentFetcher<'a, E: RenderingEngine> {
    engine: &'a E,
    config: &'a PipelineConfig,
}

impl<'a, E: RenderingEngine> EnrichmentFetcher<'a, E> {
    pub fn new(engine: &'a E, config: &'a PipelineConfig) -> Self {
        Self { engine, config }
    }

    /// Visit `item_url` in a secondary context and return its order-activity
    /// line, or [`NO_ORDER_ACTIVITY`].
    ///
    /// Failures inside the side trip only degrade the value. The original
    /// foreground context is restored before returning; if that is
    /// impossible the session is unusable and a fatal error is returned.
    pub async fn fetch(&self, item_url: &str) -> Result<String> {
        if item_url.is_empty() {
            return Ok(NO_ORDER_ACTIVITY.to_string());
        }

        let mut stack = ContextStack::new(self.engine);
        let origin = stack.origin();
        let visited = self.visit(&mut stack, item_url).await;

        stack.pop().await.map_err(|e| {
            PricelensError::Session(format!("Could not restore {} after enrichment: {}", origin, e))
        })?;

        Ok(match visited {
            Ok(Some(line)) => {
                debug!("Order activity for {}: {}", item_url, line);
                line
            }
            Ok(None) => NO_ORDER_ACTIVITY.to_string(),
            Err(e) => {
                warn!("Enrichment of {} failed: {}", item_url, e);
                NO_ORDER_ACTIVITY.to_string()
            }
        })
    }

    async fn visit(&self, stack: &mut ContextStack<'_, E>, item_url: &str) -> Result<Option<String>> {
        stack.push(item_url).await?;
        settle(self.config.enrichment_settle()).await;
        let body = self.engine.body_text().await?;
        Ok(find_order_activity(&body))
    }
}
