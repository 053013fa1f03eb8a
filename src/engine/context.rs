use tracing::{debug, warn};

use crate::app::Result;
use crate::engine::{ContextId, RenderingEngine};

/// Push/pop bookkeeping for side trips into a secondary context.
///
/// The stack remembers the foreground context and the set of open contexts
/// when it was created. [`ContextStack::pop`] closes everything opened since
/// and hands the foreground back to the origin, regardless of how far the
/// side trip got.
pub struct ContextStack<'a, E: RenderingEngine + ?Sized> {
    engine: &'a E,
    origin: ContextId,
    existing: Vec<ContextId>,
}

impl<'a, E: RenderingEngine + ?Sized> ContextStack<'a, E> {
    pub fn new(engine: &'a E) -> Self {
        Self {
            engine,
            origin: engine.foreground(),
            existing: engine.contexts(),
        }
    }

    pub fn origin(&self) -> ContextId {
        self.origin
    }

    /// Open `url` in a new context and make it the foreground.
    pub async fn push(&mut self, url: &str) -> Result<ContextId> {
        let id = self.engine.open_context(url).await?;
        self.engine.switch_foreground(id).await?;
        debug!("Pushed {} for {}", id, url);
        Ok(id)
    }

    /// Close every context opened since creation and restore the origin.
    ///
    /// Close failures are logged and do not stop the restore; the returned
    /// error only reports a failed switch back to the origin.
    pub async fn pop(self) -> Result<()> {
        for id in self.engine.contexts() {
            if id == self.origin || self.existing.contains(&id) {
                continue;
            }
            if let Err(e) = self.engine.close_context(id).await {
                warn!("Failed to close {}: {}", id, e);
            }
        }

        if self.engine.foreground() != self.origin {
            self.engine.switch_foreground(self.origin).await?;
        }
        debug!("Restored {}", self.origin);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fake::{FakeEngine, FakePage};

    #[tokio::test]
    async fn test_push_then_pop_restores_origin() {
        let engine = FakeEngine::new(FakePage::new("https://example.com/list"));
        engine.add_route(FakePage::new("https://example.com/item").with_body("detail"));
        let origin = engine.foreground();

        let mut stack = ContextStack::new(&engine);
        let pushed = stack.push("https://example.com/item").await.unwrap();
        assert_eq!(engine.foreground(), pushed);
        assert_eq!(engine.body_text().await.unwrap(), "detail");

        stack.pop().await.unwrap();
        assert_eq!(engine.foreground(), origin);
        assert_eq!(engine.contexts(), vec![origin]);
    }

    #[tokio::test]
    async fn test_pop_cleans_up_half_opened_context() {
        let engine = FakeEngine::new(FakePage::new("https://example.com/list"));
        engine.fail_url("https://example.com/broken");
        let origin = engine.foreground();

        let mut stack = ContextStack::new(&engine);
        assert!(stack.push("https://example.com/broken").await.is_err());
        // The failed open still left a tab behind.
        assert_eq!(engine.contexts().len(), 2);

        stack.pop().await.unwrap();
        assert_eq!(engine.foreground(), origin);
        assert_eq!(engine.contexts(), vec![origin]);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_blank_context_registered() {
        let engine = FakeEngine::new(FakePage::new("https://example.com/list"));
        engine.fail_url("https://example.com/slow");
        let origin = engine.foreground();

        assert!(engine.open_context("https://example.com/slow").await.is_err());
        let leftover = engine
            .contexts()
            .into_iter()
            .find(|id| *id != origin)
            .unwrap();

        engine.switch_foreground(leftover).await.unwrap();
        assert_eq!(
            engine.current_url().await.unwrap().as_deref(),
            Some("about:blank")
        );

        engine.close_context(leftover).await.unwrap();
        assert_eq!(engine.contexts(), vec![origin]);
    }
}
