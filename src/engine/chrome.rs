use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::app::{PricelensError, Result};
use crate::engine::config::EngineConfig;
use crate::engine::{ContextId, RenderingEngine};

struct PageTable {
    pages: BTreeMap<u64, Page>,
    foreground: u64,
    next_id: u64,
}

/// Chrome-based rendering engine using chromiumoxide
///
/// One browser process backs the whole run. Each browsing context is a
/// chromiumoxide [`Page`] (a tab) registered under a [`ContextId`].
pub struct ChromeEngine {
    browser: Browser,
    handler: JoinHandle<()>,
    table: Mutex<PageTable>,
}

impl ChromeEngine {
    /// Launch a browser and open the initial foreground context
    pub async fn launch(config: &EngineConfig) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(config.window_width, config.window_height)
            .request_timeout(config.request_timeout());

        for arg in config.launch_args() {
            builder = builder.arg(arg);
        }

        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(ref path) = config.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        let browser_config = builder
            .build()
            .map_err(|e| PricelensError::Session(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            PricelensError::Session(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        // Drive the DevTools connection
        let handler = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| PricelensError::Session(format!("Failed to open initial page: {}", e)))?;

        let mut pages = BTreeMap::new();
        pages.insert(0, page);

        Ok(Self {
            browser,
            handler,
            table: Mutex::new(PageTable {
                pages,
                foreground: 0,
                next_id: 1,
            }),
        })
    }

    /// Close the browser and stop the connection handler
    pub async fn shutdown(mut self) -> Result<()> {
        let closed = self.browser.close().await;
        let _ = self.browser.wait().await;
        self.handler.abort();
        closed
            .map(|_| ())
            .map_err(|e| PricelensError::Browser(format!("Failed to close browser: {}", e)))
    }

    fn table(&self) -> MutexGuard<'_, PageTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn page(&self) -> Result<Page> {
        let table = self.table();
        table
            .pages
            .get(&table.foreground)
            .cloned()
            .ok_or(PricelensError::UnknownContext(table.foreground))
    }

    /// Map a failed command, telling a dead browser apart from a page-level failure
    async fn failure(&self, what: &str, err: impl std::fmt::Display) -> PricelensError {
        match self.browser.version().await {
            Ok(_) => PricelensError::Browser(format!("{}: {}", what, err)),
            Err(_) => PricelensError::Session(format!("{}: {}", what, err)),
        }
    }
}

#[async_trait]
impl RenderingEngine for ChromeEngine {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<()> {
        let page = self.page()?;
        match page.goto(url).await {
            Ok(_) => Ok(()),
            Err(e) => Err(self.failure(&format!("Navigation to {} failed", url), e).await),
        }
    }

    async fn reload(&self) -> Result<()> {
        let page = self.page()?;
        match page.reload().await {
            Ok(_) => Ok(()),
            Err(e) => Err(self.failure("Reload failed", e).await),
        }
    }

    async fn current_url(&self) -> Result<Option<String>> {
        let page = self.page()?;
        match page.url().await {
            Ok(url) => Ok(url),
            Err(e) => Err(self.failure("Reading page URL failed", e).await),
        }
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<Element>> {
        let page = self.page()?;
        match page.find_elements(selector).await {
            Ok(elements) => Ok(elements),
            Err(e) => Err(self.failure(&format!("Lookup of {} failed", selector), e).await),
        }
    }

    async fn read_text(&self, element: &Element) -> Result<String> {
        element
            .inner_text()
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| PricelensError::Browser(format!("Failed to read text: {}", e)))
    }

    async fn read_markup(&self, element: &Element) -> Result<String> {
        element
            .inner_html()
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| PricelensError::Browser(format!("Failed to read markup: {}", e)))
    }

    async fn read_attribute(&self, element: &Element, name: &str) -> Result<Option<String>> {
        element
            .attribute(name)
            .await
            .map_err(|e| PricelensError::Browser(format!("Failed to read {}: {}", name, e)))
    }

    async fn click(&self, element: &Element) -> Result<()> {
        element
            .click()
            .await
            .map(|_| ())
            .map_err(|e| PricelensError::Browser(format!("Click failed: {}", e)))
    }

    async fn execute_script(
        &self,
        script: &str,
        element: Option<&Element>,
    ) -> Result<serde_json::Value> {
        if let Some(element) = element {
            let returns = element
                .call_js_fn(script, false)
                .await
                .map_err(|e| PricelensError::Browser(format!("Script execution failed: {}", e)))?;
            return Ok(returns.result.value.unwrap_or(serde_json::Value::Null));
        }

        let page = self.page()?;
        match page.evaluate(script).await {
            Ok(result) => Ok(result.value().cloned().unwrap_or(serde_json::Value::Null)),
            Err(e) => Err(self.failure("Script execution failed", e).await),
        }
    }

    async fn open_context(&self, url: &str) -> Result<ContextId> {
        let page = match self.browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => return Err(self.failure("Failed to open a new page", e).await),
        };

        // Registered before loading so a failed load still leaves a context
        // the caller can close.
        let id = {
            let mut table = self.table();
            let id = table.next_id;
            table.next_id += 1;
            table.pages.insert(id, page.clone());
            id
        };

        if let Err(e) = page.goto(url).await {
            return Err(self
                .failure(&format!("Failed to load {} in ctx#{}", url, id), e)
                .await);
        }
        debug!("Opened ctx#{} at {}", id, url);
        Ok(ContextId(id))
    }

    async fn close_context(&self, id: ContextId) -> Result<()> {
        let page = self
            .table()
            .pages
            .remove(&id.0)
            .ok_or(PricelensError::UnknownContext(id.0))?;

        page.close()
            .await
            .map_err(|e| PricelensError::Browser(format!("Failed to close page: {}", e)))
    }

    async fn switch_foreground(&self, id: ContextId) -> Result<()> {
        let page = {
            let mut table = self.table();
            let page = table
                .pages
                .get(&id.0)
                .cloned()
                .ok_or(PricelensError::UnknownContext(id.0))?;
            table.foreground = id.0;
            page
        };

        if let Err(e) = page.bring_to_front().await {
            warn!("Failed to bring {} to front: {}", id, e);
        }
        Ok(())
    }

    fn foreground(&self) -> ContextId {
        ContextId(self.table().foreground)
    }

    fn contexts(&self) -> Vec<ContextId> {
        self.table().pages.keys().copied().map(ContextId).collect()
    }
}
