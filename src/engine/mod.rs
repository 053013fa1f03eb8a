//! Rendering-engine boundary.
//!
//! The pipeline only talks to a page through [`RenderingEngine`], so any
//! engine offering these primitives can drive it. [`ChromeEngine`] is the
//! production implementation on top of chromiumoxide.
//!
//! ```text
//! Navigator / DisplayModeSwitcher / ListingEnumerator / EnrichmentFetcher
//!                          │
//!                   RenderingEngine
//!                          │
//!              ChromeEngine (chromiumoxide)
//! ```

mod chrome;
mod config;
pub mod context;
#[cfg(test)]
pub mod fake;
pub mod wait;

pub use chrome::ChromeEngine;
pub use config::EngineConfig;
pub use context::ContextStack;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::app::Result;

/// Handle to one browsing context (a tab) owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

/// Primitives the extraction pipeline needs from a rendered page.
///
/// All page-level operations act on the foreground context. Element handles
/// stay bound to the context they were found in.
#[async_trait]
pub trait RenderingEngine: Send + Sync {
    type Element: Send + Sync;

    async fn navigate(&self, url: &str) -> Result<()>;

    async fn reload(&self) -> Result<()>;

    async fn current_url(&self) -> Result<Option<String>>;

    /// Zero or more elements matching a CSS selector.
    async fn find_elements(&self, selector: &str) -> Result<Vec<Self::Element>>;

    /// Rendered (visible) text of the element.
    async fn read_text(&self, element: &Self::Element) -> Result<String>;

    /// Inner markup of the element.
    async fn read_markup(&self, element: &Self::Element) -> Result<String>;

    async fn read_attribute(&self, element: &Self::Element, name: &str) -> Result<Option<String>>;

    async fn click(&self, element: &Self::Element) -> Result<()>;

    /// Run JavaScript in the foreground page.
    ///
    /// Without an element the script is evaluated as an expression. With an
    /// element it must be a function declaration, called with `this` bound
    /// to that element.
    async fn execute_script(
        &self,
        script: &str,
        element: Option<&Self::Element>,
    ) -> Result<serde_json::Value>;

    /// Open a new context loading `url`. The foreground does not change.
    ///
    /// The context is registered before `url` loads, so it stays open and
    /// listed by [`RenderingEngine::contexts`] when the load fails.
    async fn open_context(&self, url: &str) -> Result<ContextId>;

    async fn close_context(&self, id: ContextId) -> Result<()>;

    async fn switch_foreground(&self, id: ContextId) -> Result<()>;

    fn foreground(&self) -> ContextId;

    /// Every context currently open, in creation order.
    fn contexts(&self) -> Vec<ContextId>;

    /// Visible text of the whole foreground page.
    async fn body_text(&self) -> Result<String> {
        let bodies = self.find_elements("body").await?;
        match bodies.first() {
            Some(body) => self.read_text(body).await,
            None => Ok(String::new()),
        }
    }

    /// Wait, bounded, for the first element matching `selector`.
    ///
    /// Lookup errors count as "not yet present"; `None` means the timeout
    /// elapsed.
    async fn wait_for_element(
        &self,
        selector: &str,
        timeout: Duration,
        interval: Duration,
    ) -> Option<Self::Element> {
        wait::poll_until(timeout, interval, || async move {
            match self.find_elements(selector).await {
                Ok(elements) => elements.into_iter().next(),
                Err(e) => {
                    tracing::debug!("Lookup of {} failed while waiting: {}", selector, e);
                    None
                }
            }
        })
        .await
    }
}
