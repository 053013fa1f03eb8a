//! Scripted in-memory engine for pipeline tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::app::{PricelensError, Result};
use crate::engine::{ContextId, RenderingEngine};

#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    selector: String,
    text: String,
    markup: String,
    attributes: HashMap<String, String>,
}

impl FakeElement {
    pub fn new(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            ..Default::default()
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn markup(mut self, markup: &str) -> Self {
        self.markup = markup.to_string();
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, Clone)]
pub struct FakePage {
    url: String,
    body: String,
    elements: Vec<FakeElement>,
}

impl FakePage {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            body: String::new(),
            elements: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    pub fn with_element(mut self, element: FakeElement) -> Self {
        self.elements.push(element);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeHandle {
    context: u64,
    index: usize,
}

#[derive(Debug, Default)]
struct FakeState {
    routes: HashMap<String, FakePage>,
    contexts: BTreeMap<u64, FakePage>,
    foreground: u64,
    next_id: u64,
    failing: HashSet<String>,
    after_interaction: Option<FakePage>,
    page_scripts: usize,
    element_scripts: usize,
    clicks: usize,
    reloads: usize,
    navigations: Vec<String>,
}

/// Engine whose pages are canned [`FakePage`]s.
///
/// Navigation swaps in the page registered for the URL (a blank page when
/// none is), and URLs marked with [`FakeEngine::fail_url`] error out.
pub struct FakeEngine {
    state: Mutex<FakeState>,
}

impl FakeEngine {
    pub fn new(start: FakePage) -> Self {
        let mut state = FakeState::default();
        state.contexts.insert(0, start);
        state.next_id = 1;
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn add_route(&self, page: FakePage) {
        let mut state = self.state.lock().unwrap();
        state.routes.insert(page.url.clone(), page);
    }

    pub fn fail_url(&self, url: &str) {
        self.state.lock().unwrap().failing.insert(url.to_string());
    }

    /// Replace the foreground page with `page` on the next page-level
    /// script or click.
    pub fn transform_on_interaction(&self, page: FakePage) {
        self.state.lock().unwrap().after_interaction = Some(page);
    }

    pub fn page_scripts(&self) -> usize {
        self.state.lock().unwrap().page_scripts
    }

    pub fn element_scripts(&self) -> usize {
        self.state.lock().unwrap().element_scripts
    }

    pub fn clicks(&self) -> usize {
        self.state.lock().unwrap().clicks
    }

    pub fn reloads(&self) -> usize {
        self.state.lock().unwrap().reloads
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    fn element(&self, handle: &FakeHandle) -> Result<FakeElement> {
        let state = self.state.lock().unwrap();
        state
            .contexts
            .get(&handle.context)
            .and_then(|page| page.elements.get(handle.index))
            .cloned()
            .ok_or_else(|| PricelensError::Browser("stale element".into()))
    }

    fn interact(state: &mut FakeState) {
        if let Some(page) = state.after_interaction.take() {
            let fg = state.foreground;
            state.contexts.insert(fg, page);
        }
    }
}

#[async_trait]
impl RenderingEngine for FakeEngine {
    type Element = FakeHandle;

    async fn navigate(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.navigations.push(url.to_string());
        if state.failing.contains(url) {
            return Err(PricelensError::Browser(format!("navigation to {} failed", url)));
        }
        let page = state
            .routes
            .get(url)
            .cloned()
            .unwrap_or_else(|| FakePage::new(url));
        let fg = state.foreground;
        state.contexts.insert(fg, page);
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        self.state.lock().unwrap().reloads += 1;
        Ok(())
    }

    async fn current_url(&self) -> Result<Option<String>> {
        let state = self.state.lock().unwrap();
        Ok(state.contexts.get(&state.foreground).map(|p| p.url.clone()))
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<FakeHandle>> {
        let state = self.state.lock().unwrap();
        let page = state
            .contexts
            .get(&state.foreground)
            .ok_or(PricelensError::UnknownContext(state.foreground))?;
        Ok(page
            .elements
            .iter()
            .enumerate()
            .filter(|(_, el)| el.selector == selector)
            .map(|(index, _)| FakeHandle {
                context: state.foreground,
                index,
            })
            .collect())
    }

    async fn read_text(&self, element: &FakeHandle) -> Result<String> {
        Ok(self.element(element)?.text)
    }

    async fn read_markup(&self, element: &FakeHandle) -> Result<String> {
        Ok(self.element(element)?.markup)
    }

    async fn read_attribute(&self, element: &FakeHandle, name: &str) -> Result<Option<String>> {
        Ok(self.element(element)?.attributes.get(name).cloned())
    }

    async fn click(&self, element: &FakeHandle) -> Result<()> {
        self.element(element)?;
        let mut state = self.state.lock().unwrap();
        state.clicks += 1;
        Self::interact(&mut state);
        Ok(())
    }

    async fn execute_script(
        &self,
        _script: &str,
        element: Option<&FakeHandle>,
    ) -> Result<serde_json::Value> {
        if let Some(handle) = element {
            self.element(handle)?;
            self.state.lock().unwrap().element_scripts += 1;
            return Ok(serde_json::Value::Null);
        }
        let mut state = self.state.lock().unwrap();
        state.page_scripts += 1;
        Self::interact(&mut state);
        Ok(serde_json::json!(1))
    }

    async fn open_context(&self, url: &str) -> Result<ContextId> {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        state.contexts.insert(id, FakePage::new("about:blank"));

        if state.failing.contains(url) {
            return Err(PricelensError::Browser(format!("failed to load {}", url)));
        }
        let page = state
            .routes
            .get(url)
            .cloned()
            .unwrap_or_else(|| FakePage::new(url));
        state.contexts.insert(id, page);
        Ok(ContextId(id))
    }

    async fn close_context(&self, id: ContextId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .contexts
            .remove(&id.0)
            .map(|_| ())
            .ok_or(PricelensError::UnknownContext(id.0))
    }

    async fn switch_foreground(&self, id: ContextId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.contexts.contains_key(&id.0) {
            return Err(PricelensError::UnknownContext(id.0));
        }
        state.foreground = id.0;
        Ok(())
    }

    fn foreground(&self) -> ContextId {
        ContextId(self.state.lock().unwrap().foreground)
    }

    fn contexts(&self) -> Vec<ContextId> {
        self.state
            .lock()
            .unwrap()
            .contexts
            .keys()
            .copied()
            .map(ContextId)
            .collect()
    }

    async fn body_text(&self) -> Result<String> {
        let state = self.state.lock().unwrap();
        state
            .contexts
            .get(&state.foreground)
            .map(|p| p.body.clone())
            .ok_or(PricelensError::UnknownContext(state.foreground))
    }
}
