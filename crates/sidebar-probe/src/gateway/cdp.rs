//! Chrome DevTools Protocol gateway (requires the `browser` feature).
//!
//! Element handles are indices into a page-side registry of `WeakRef`s
//! (`window.__spHandles`). A navigation replaces the window, so every
//! handle from before it resolves to nothing and reads as stale.

use super::{BrowserGateway, ElementHandle, SessionProvider};
use crate::config::HarnessConfig;
use crate::geometry::BoundingBox;
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const HANDLE_PREFIX: &str = "cdp-";
const READY_POLL: Duration = Duration::from_millis(50);

/// Launches one headless Chromium per session
#[derive(Debug, Clone, Copy, Default)]
pub struct CdpSessionProvider;

impl CdpSessionProvider {
    /// Create a provider
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionProvider for CdpSessionProvider {
    type Gateway = CdpGateway;

    async fn open(&self, config: &HarnessConfig) -> ProbeResult<CdpGateway> {
        CdpGateway::launch(config).await
    }
}

/// Live page driven over CDP
#[derive(Debug)]
pub struct CdpGateway {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler: JoinHandle<()>,
}

impl CdpGateway {
    /// Launch a browser sized to the configured viewport and open a blank page
    ///
    /// # Errors
    ///
    /// Returns `BrowserLaunch` if Chromium cannot start, `Page` if the tab
    /// cannot be created or sized
    pub async fn launch(config: &HarnessConfig) -> ProbeResult<Self> {
        let mut builder =
            CdpConfig::builder().window_size(config.viewport.width, config.viewport.height);
        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder
            .build()
            .map_err(|message| ProbeError::BrowserLaunch { message })?;

        let (browser, mut handler) =
            Browser::launch(cdp_config)
                .await
                .map_err(|e| ProbeError::BrowserLaunch {
                    message: e.to_string(),
                })?;

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| page_error(&e))?;
        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(config.viewport.width),
            i64::from(config.viewport.height),
            1.0,
            false,
        ))
        .await
        .map_err(|e| page_error(&e))?;
        debug!(viewport = %config.viewport, headless = config.headless, "browser session opened");

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            page,
            handler,
        })
    }

    async fn eval<T: DeserializeOwned>(&self, expr: String) -> ProbeResult<T> {
        let result = self.page.evaluate_expression(expr).await.map_err(|e| page_error(&e))?;
        result.into_value().map_err(|e| page_error(&e))
    }

    /// Evaluate against one element; failures are scoped to that candidate
    async fn eval_element<T: DeserializeOwned>(
        &self,
        handle: &ElementHandle,
        body: &str,
    ) -> ProbeResult<T> {
        let expr = format!(
            "(() => {{ const el = {}; {body} }})()",
            resolve_js(registry_index(handle)?)
        );
        let result = self
            .page
            .evaluate_expression(expr)
            .await
            .map_err(|e| ProbeError::TransientQuery {
                message: format!("{handle}: {e}"),
            })?;
        result.into_value().map_err(|e| ProbeError::TransientQuery {
            message: format!("{handle}: {e}"),
        })
    }

    async fn mouse(&self, kind: DispatchMouseEventType, x: f64, y: f64) -> ProbeResult<()> {
        let params = DispatchMouseEventParams::builder()
            .r#type(kind)
            .x(x)
            .y(y)
            .button(MouseButton::Left)
            .click_count(1)
            .build()
            .map_err(|message| ProbeError::Input { message })?;
        self.page
            .execute(params)
            .await
            .map_err(|e| ProbeError::Input {
                message: e.to_string(),
            })?;
        Ok(())
    }

    fn stale(handle: &ElementHandle) -> ProbeError {
        ProbeError::StaleHandle {
            handle: handle.to_string(),
        }
    }
}

fn page_error(e: &impl ToString) -> ProbeError {
    ProbeError::Page {
        message: e.to_string(),
    }
}

fn registry_index(handle: &ElementHandle) -> ProbeResult<usize> {
    handle
        .id()
        .strip_prefix(HANDLE_PREFIX)
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| ProbeError::StaleHandle {
            handle: handle.to_string(),
        })
}

/// Expression yielding the live element at `index`, or `null`
fn resolve_js(index: usize) -> String {
    format!(
        "(() => {{ const r = (window.__spHandles || [])[{index}]; \
         const el = r && r.deref(); \
         return el && el.isConnected ? el : null; }})()"
    )
}

/// PNG capture; `full_page` resizes to the document before capturing
fn screenshot_params(full_page: bool) -> ScreenshotParams {
    ScreenshotParams::builder()
        .format(CaptureScreenshotFormat::Png)
        .full_page(full_page)
        .build()
}

/// Script registering every match of `selector` and returning the indices.
///
/// `text=NEEDLE` matches the innermost elements whose text contains NEEDLE;
/// anything else is a CSS selector. Returns `null` when the scope is stale.
/// An element already in the registry keeps its index, so repeated queries
/// (settle polling) do not grow it.
fn query_js(selector: &str, scope: Option<usize>) -> ProbeResult<String> {
    let selector = serde_json::to_string(selector)?;
    let root = scope.map_or_else(|| "document".to_string(), resolve_js);
    Ok(format!(
        "(() => {{
            const reg = (window.__spHandles = window.__spHandles || []);
            const indexOf = (el) => {{
                const known = reg.findIndex((r) => r.deref() === el);
                return known >= 0 ? known : reg.push(new WeakRef(el)) - 1;
            }};
            const root = {root};
            if (!root) return null;
            const sel = {selector};
            let found;
            if (sel.startsWith('text=')) {{
                const needle = sel.slice(5).trim();
                const has = (el) => (el.textContent || '').includes(needle);
                found = Array.from(root.querySelectorAll('*'))
                    .filter(has)
                    .filter((el) => !Array.from(el.children).some(has));
            }} else {{
                found = Array.from(root.querySelectorAll(sel));
            }}
            return found.map(indexOf);
        }})()"
    ))
}

#[async_trait]
impl BrowserGateway for CdpGateway {
    async fn navigate(&self, url: &str) -> ProbeResult<()> {
        debug!(url, "navigating");
        self.page
            .goto(url)
            .await
            .map_err(|e| ProbeError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        loop {
            let state: String = self.eval("document.readyState".to_string()).await?;
            if state == "complete" {
                return Ok(());
            }
            tokio::time::sleep(READY_POLL).await;
        }
    }

    async fn query_all(
        &self,
        selector: &str,
        scope: Option<&ElementHandle>,
    ) -> ProbeResult<Vec<ElementHandle>> {
        let scope_index = scope.map(registry_index).transpose()?;
        let found: Option<Vec<usize>> = self.eval(query_js(selector, scope_index)?).await?;
        match found {
            Some(indices) => Ok(indices
                .into_iter()
                .map(|i| ElementHandle::new(format!("{HANDLE_PREFIX}{i}")))
                .collect()),
            None => Err(scope.map_or_else(
                || page_error(&"query root missing"),
                Self::stale,
            )),
        }
    }

    async fn bounding_box(&self, handle: &ElementHandle) -> ProbeResult<Option<BoundingBox>> {
        if registry_index(handle).is_err() {
            return Ok(None);
        }
        self.eval_element(
            handle,
            "if (!el || el.getClientRects().length === 0) return null; \
             const r = el.getBoundingClientRect(); \
             return { x: r.x, y: r.y, width: r.width, height: r.height };",
        )
        .await
    }

    async fn is_visible(&self, handle: &ElementHandle) -> ProbeResult<bool> {
        if registry_index(handle).is_err() {
            return Ok(false);
        }
        self.eval_element(
            handle,
            "if (!el) return false; \
             const s = getComputedStyle(el); \
             if (s.display === 'none' || s.visibility === 'hidden' || s.opacity === '0') return false; \
             const r = el.getBoundingClientRect(); \
             return r.width > 0 && r.height > 0;",
        )
        .await
    }

    async fn inner_content(&self, handle: &ElementHandle) -> ProbeResult<String> {
        let content: Option<String> = self
            .eval_element(handle, "return el ? el.outerHTML : null;")
            .await?;
        content.ok_or_else(|| Self::stale(handle))
    }

    async fn click(&self, handle: &ElementHandle) -> ProbeResult<()> {
        let bbox: Option<BoundingBox> = self
            .eval_element(
                handle,
                "if (!el) return null; \
                 el.scrollIntoView({ block: 'nearest', inline: 'nearest' }); \
                 const r = el.getBoundingClientRect(); \
                 return { x: r.x, y: r.y, width: r.width, height: r.height };",
            )
            .await
            .map_err(|e| match e {
                ProbeError::TransientQuery { message } => ProbeError::Input { message },
                other => other,
            })?;
        let center = bbox.ok_or_else(|| Self::stale(handle))?.center();
        debug!(%handle, x = center.x, y = center.y, "click");
        self.mouse(DispatchMouseEventType::MousePressed, center.x, center.y)
            .await?;
        self.mouse(DispatchMouseEventType::MouseReleased, center.x, center.y)
            .await
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> ProbeResult<()> {
        let bytes = self
            .page
            .screenshot(screenshot_params(full_page))
            .await
            .map_err(|e| ProbeError::Screenshot {
                message: e.to_string(),
            })?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn close_session(&self) -> ProbeResult<()> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };
        let closed = browser.close().await;
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "browser process did not exit cleanly");
        }
        self.handler.abort();
        closed.map_err(|e| page_error(&e))?;
        debug!("browser session closed");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_index_parses_own_handles() {
        assert_eq!(registry_index(&ElementHandle::new("cdp-12")).unwrap(), 12);
        assert!(registry_index(&ElementHandle::new("fake-1"))
            .unwrap_err()
            .is_stale());
    }

    #[test]
    fn test_query_script_escapes_selector() {
        let js = query_js("button[aria-label=\"x\"]", None).unwrap();
        assert!(js.contains(r#"const sel = "button[aria-label=\"x\"]";"#));
        assert!(js.contains("const root = document;"));
    }

    #[test]
    fn test_query_script_reuses_registered_elements() {
        let js = query_js("button", None).unwrap();
        assert!(js.contains("reg.findIndex((r) => r.deref() === el)"));
        assert!(js.contains("found.map(indexOf)"));
        assert_eq!(js.matches("reg.push").count(), 1);
    }

    #[test]
    fn test_screenshot_params_follow_full_page() {
        assert_eq!(screenshot_params(true).full_page, Some(true));
        assert_eq!(screenshot_params(false).full_page, Some(false));
    }

    #[test]
    fn test_query_script_scoped() {
        let js = query_js("svg", Some(4)).unwrap();
        assert!(js.contains("[4]"));
        assert!(js.contains("isConnected"));
    }
}
