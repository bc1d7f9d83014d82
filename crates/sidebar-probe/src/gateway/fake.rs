//! Scripted in-memory page for testing without a browser.
//!
//! A [`FakePage`] holds a flat list of [`FakeElement`]s, each tagged with the
//! selectors it answers to. Click and navigation handlers mutate the DOM the
//! way the application under test would (resize a panel, hide a label,
//! re-render a subtree), so scenarios can be exercised end to end.

use super::{BrowserGateway, ElementHandle, SessionProvider};
use crate::config::HarnessConfig;
use crate::geometry::BoundingBox;
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const HANDLE_PREFIX: &str = "fake-";

/// Mutation applied to the DOM when an element is clicked or the page navigates
pub type DomHandler = Arc<dyn Fn(&mut FakeDom) + Send + Sync>;

/// One element of the fake document
#[derive(Debug, Clone)]
pub struct FakeElement {
    /// Selectors this element matches (exact string comparison, `*` matches all)
    pub selectors: Vec<String>,
    /// Settled geometry
    pub bbox: BoundingBox,
    /// Whether the element is rendered
    pub visible: bool,
    /// Inner markup/text
    pub content: String,
    /// Index of the parent element, for scoped queries
    pub parent: Option<usize>,
    /// False once the element has been removed from the document
    pub attached: bool,
    frames: VecDeque<BoundingBox>,
}

impl FakeElement {
    /// Create a visible element answering to `selector`
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selectors: vec![selector.into()],
            bbox: BoundingBox::new(0.0, 0.0, 0.0, 0.0),
            visible: true,
            content: String::new(),
            parent: None,
            attached: true,
            frames: VecDeque::new(),
        }
    }

    /// Also answer to another selector
    #[must_use]
    pub fn also(mut self, selector: impl Into<String>) -> Self {
        self.selectors.push(selector.into());
        self
    }

    /// Set geometry
    #[must_use]
    pub fn at(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.bbox = BoundingBox::new(x, y, width, height);
        self
    }

    /// Set inner content
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Start hidden
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Nest under another element
    #[must_use]
    pub fn child_of(mut self, parent: usize) -> Self {
        self.parent = Some(parent);
        self
    }

    fn matches(&self, selector: &str) -> bool {
        selector == "*" || self.selectors.iter().any(|s| s == selector)
    }
}

/// Mutable document state behind a [`FakePage`]
#[derive(Default)]
pub struct FakeDom {
    elements: Vec<FakeElement>,
    click_handlers: HashMap<usize, DomHandler>,
    navigate_handler: Option<DomHandler>,
    navigation_failure: Option<String>,
    failing: HashSet<usize>,
    url: Option<String>,
    history: Vec<String>,
    screenshots: Vec<(PathBuf, bool)>,
    closed: bool,
    close_count: usize,
}

impl fmt::Debug for FakeDom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeDom")
            .field("elements", &self.elements)
            .field("url", &self.url)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl FakeDom {
    /// Add an element, returning its index
    pub fn add(&mut self, element: FakeElement) -> usize {
        self.elements.push(element);
        self.elements.len() - 1
    }

    /// Element by index
    #[must_use]
    pub fn element(&self, id: usize) -> Option<&FakeElement> {
        self.elements.get(id)
    }

    /// Mutable element by index
    pub fn element_mut(&mut self, id: usize) -> Option<&mut FakeElement> {
        self.elements.get_mut(id)
    }

    /// Move or resize an element immediately
    pub fn set_box(&mut self, id: usize, bbox: BoundingBox) {
        if let Some(el) = self.elements.get_mut(id) {
            el.bbox = bbox;
            el.frames.clear();
        }
    }

    /// Show or hide an element
    pub fn set_visible(&mut self, id: usize, visible: bool) {
        if let Some(el) = self.elements.get_mut(id) {
            el.visible = visible;
        }
    }

    /// Remove an element from the document; its handle goes stale
    pub fn detach(&mut self, id: usize) {
        if let Some(el) = self.elements.get_mut(id) {
            el.attached = false;
        }
    }

    /// Animate towards `target`: each geometry query returns the next frame
    /// until the queue drains, after which `target` is reported.
    pub fn animate(&mut self, id: usize, frames: Vec<BoundingBox>, target: BoundingBox) {
        if let Some(el) = self.elements.get_mut(id) {
            el.frames = frames.into();
            el.bbox = target;
        }
    }

    /// Register what happens when element `id` is clicked
    pub fn on_click(&mut self, id: usize, handler: impl Fn(&mut Self) + Send + Sync + 'static) {
        self.click_handlers.insert(id, Arc::new(handler));
    }

    /// Register what happens on every navigation
    pub fn on_navigate(&mut self, handler: impl Fn(&mut Self) + Send + Sync + 'static) {
        self.navigate_handler = Some(Arc::new(handler));
    }

    /// Make every navigation fail with `message`
    pub fn fail_navigation(&mut self, message: impl Into<String>) {
        self.navigation_failure = Some(message.into());
    }

    /// Make geometry/content queries on element `id` error out
    pub fn fail_queries(&mut self, id: usize) {
        self.failing.insert(id);
    }

    fn resolve(&self, handle: &ElementHandle) -> Option<usize> {
        handle
            .id()
            .strip_prefix(HANDLE_PREFIX)
            .and_then(|raw| raw.parse().ok())
            .filter(|idx| *idx < self.elements.len())
    }

    fn is_within(&self, mut id: usize, scope: usize) -> bool {
        while let Some(parent) = self.elements[id].parent {
            if parent == scope {
                return true;
            }
            id = parent;
        }
        false
    }

    fn ensure_open(&self) -> ProbeResult<()> {
        if self.closed {
            return Err(ProbeError::Page {
                message: "session closed".to_string(),
            });
        }
        Ok(())
    }

    fn checked(&self, handle: &ElementHandle) -> ProbeResult<usize> {
        self.ensure_open()?;
        let idx = self.resolve(handle).ok_or_else(|| ProbeError::StaleHandle {
            handle: handle.to_string(),
        })?;
        if self.failing.contains(&idx) {
            return Err(ProbeError::TransientQuery {
                message: format!("{handle} detached mid-query"),
            });
        }
        Ok(idx)
    }
}

/// In-memory [`BrowserGateway`]; clones share one document
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    inner: Arc<Mutex<FakeDom>>,
}

impl FakePage {
    /// Create an empty page
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the document (setup and inspection)
    pub fn with_dom<R>(&self, f: impl FnOnce(&mut FakeDom) -> R) -> R {
        f(&mut *self.dom())
    }

    /// Handle for element `id`
    #[must_use]
    pub fn handle(id: usize) -> ElementHandle {
        ElementHandle::new(format!("{HANDLE_PREFIX}{id}"))
    }

    /// Calls made against this page, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.dom().history.clone()
    }

    /// Check if a method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.dom().history.iter().any(|c| c.starts_with(method))
    }

    /// Screenshots requested so far
    #[must_use]
    pub fn screenshots(&self) -> Vec<(PathBuf, bool)> {
        self.dom().screenshots.clone()
    }

    /// Last URL navigated to
    #[must_use]
    pub fn current_url(&self) -> Option<String> {
        self.dom().url.clone()
    }

    /// Whether `close_session` has run
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.dom().closed
    }

    /// How many times `close_session` has run
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.dom().close_count
    }

    fn dom(&self) -> MutexGuard<'_, FakeDom> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BrowserGateway for FakePage {
    async fn navigate(&self, url: &str) -> ProbeResult<()> {
        let mut dom = self.dom();
        dom.ensure_open()?;
        dom.history.push(format!("navigate:{url}"));
        if let Some(message) = dom.navigation_failure.clone() {
            return Err(ProbeError::Navigation {
                url: url.to_string(),
                message,
            });
        }
        dom.url = Some(url.to_string());
        if let Some(handler) = dom.navigate_handler.clone() {
            handler(&mut *dom);
        }
        Ok(())
    }

    async fn query_all(
        &self,
        selector: &str,
        scope: Option<&ElementHandle>,
    ) -> ProbeResult<Vec<ElementHandle>> {
        let mut dom = self.dom();
        dom.ensure_open()?;
        dom.history.push(format!("query_all:{selector}"));
        let scope = match scope {
            Some(handle) => Some(dom.resolve(handle).ok_or_else(|| ProbeError::StaleHandle {
                handle: handle.to_string(),
            })?),
            None => None,
        };
        Ok(dom
            .elements
            .iter()
            .enumerate()
            .filter(|(_, el)| el.attached && el.matches(selector))
            .filter(|(idx, _)| scope.map_or(true, |s| dom.is_within(*idx, s)))
            .map(|(idx, _)| Self::handle(idx))
            .collect())
    }

    async fn bounding_box(&self, handle: &ElementHandle) -> ProbeResult<Option<BoundingBox>> {
        let mut dom = self.dom();
        let idx = match dom.checked(handle) {
            Ok(idx) => idx,
            Err(ProbeError::StaleHandle { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let el = &mut dom.elements[idx];
        if !el.attached || !el.visible {
            return Ok(None);
        }
        Ok(Some(el.frames.pop_front().unwrap_or(el.bbox)))
    }

    async fn is_visible(&self, handle: &ElementHandle) -> ProbeResult<bool> {
        let dom = self.dom();
        let idx = match dom.checked(handle) {
            Ok(idx) => idx,
            Err(ProbeError::StaleHandle { .. }) => return Ok(false),
            Err(e) => return Err(e),
        };
        let el = &dom.elements[idx];
        Ok(el.attached && el.visible && !el.bbox.is_empty())
    }

    async fn inner_content(&self, handle: &ElementHandle) -> ProbeResult<String> {
        let dom = self.dom();
        let idx = dom.checked(handle)?;
        let el = &dom.elements[idx];
        if !el.attached {
            return Err(ProbeError::StaleHandle {
                handle: handle.to_string(),
            });
        }
        Ok(el.content.clone())
    }

    async fn click(&self, handle: &ElementHandle) -> ProbeResult<()> {
        let mut dom = self.dom();
        dom.ensure_open()?;
        dom.history.push(format!("click:{handle}"));
        let idx = dom.resolve(handle).ok_or_else(|| ProbeError::StaleHandle {
            handle: handle.to_string(),
        })?;
        if !dom.elements[idx].attached {
            return Err(ProbeError::StaleHandle {
                handle: handle.to_string(),
            });
        }
        if let Some(handler) = dom.click_handlers.get(&idx).cloned() {
            handler(&mut *dom);
        }
        Ok(())
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> ProbeResult<()> {
        let mut dom = self.dom();
        dom.ensure_open()?;
        dom.history.push(format!("screenshot:{}", path.display()));
        dom.screenshots.push((path.to_path_buf(), full_page));
        Ok(())
    }

    async fn close_session(&self) -> ProbeResult<()> {
        let mut dom = self.dom();
        dom.history.push("close_session".to_string());
        dom.closed = true;
        dom.close_count += 1;
        Ok(())
    }
}

/// Hands out clones of one [`FakePage`], so tests can inspect it after a run
#[derive(Debug, Clone, Default)]
pub struct FakeSessionProvider {
    page: FakePage,
    open_failure: Option<String>,
}

impl FakeSessionProvider {
    /// Provider serving `page`
    #[must_use]
    pub fn new(page: FakePage) -> Self {
        Self {
            page,
            open_failure: None,
        }
    }

    /// Make `open` fail, as if the browser could not start
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.open_failure = Some(message.into());
        self
    }

    /// The served page
    #[must_use]
    pub fn page(&self) -> &FakePage {
        &self.page
    }
}

#[async_trait]
impl SessionProvider for FakeSessionProvider {
    type Gateway = FakePage;

    async fn open(&self, _config: &HarnessConfig) -> ProbeResult<FakePage> {
        if let Some(message) = &self.open_failure {
            return Err(ProbeError::BrowserLaunch {
                message: message.clone(),
            });
        }
        Ok(self.page.clone())
    }
}
