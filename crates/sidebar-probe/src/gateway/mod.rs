//! Browser automation gateway.
//!
//! The harness never talks to a browser directly. Everything it needs from
//! the live page goes through [`BrowserGateway`], which keeps the engine
//! swappable:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  BrowserGateway (async trait)                                │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────┐        ┌─────────────────────────┐  │
//! │  │  CdpGateway         │        │  FakePage               │  │
//! │  │  (`browser` feature)│        │  (scripted, in-memory)  │  │
//! │  │  chromiumoxide      │        │  unit + scenario tests  │  │
//! │  └─────────────────────┘        └─────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sessions are acquired through a [`SessionProvider`]; the scenario runner
//! owns the gateway for exactly one run and always calls
//! [`BrowserGateway::close_session`] before returning.

use crate::config::HarnessConfig;
use crate::geometry::BoundingBox;
use crate::result::ProbeResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[cfg(feature = "browser")]
mod cdp;
mod fake;

#[cfg(feature = "browser")]
pub use cdp::{CdpGateway, CdpSessionProvider};
pub use fake::{FakeDom, FakeElement, FakePage, FakeSessionProvider};

/// Opaque reference to an element in the live page.
///
/// The gateway owns what the id points at. The id may go stale after a
/// navigation or re-render; gateways report that as
/// [`ProbeError::StaleHandle`](crate::ProbeError::StaleHandle) from actions
/// and as `None` from geometry queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementHandle(String);

impl ElementHandle {
    /// Wrap a gateway-specific id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Capability set the harness consumes from a browser automation transport.
#[async_trait]
pub trait BrowserGateway: Send + Sync {
    /// Navigate and suspend until the page reports load-complete
    async fn navigate(&self, url: &str) -> ProbeResult<()>;

    /// All elements matching `selector`, optionally inside `scope`, in document order
    async fn query_all(
        &self,
        selector: &str,
        scope: Option<&ElementHandle>,
    ) -> ProbeResult<Vec<ElementHandle>>;

    /// Fresh geometry, `None` when detached or not rendered
    async fn bounding_box(&self, handle: &ElementHandle) -> ProbeResult<Option<BoundingBox>>;

    /// Whether the element is rendered with non-zero area
    async fn is_visible(&self, handle: &ElementHandle) -> ProbeResult<bool>;

    /// Inner markup/text, used by content filters
    async fn inner_content(&self, handle: &ElementHandle) -> ProbeResult<String>;

    /// Dispatch a click on the element
    async fn click(&self, handle: &ElementHandle) -> ProbeResult<()>;

    /// Write a PNG screenshot to `path`
    async fn screenshot(&self, path: &Path, full_page: bool) -> ProbeResult<()>;

    /// Release the session; must be safe to call more than once
    async fn close_session(&self) -> ProbeResult<()>;
}

/// Scoped acquisition of a page session.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Gateway handed out for one run
    type Gateway: BrowserGateway;

    /// Open a session sized and configured per `config`
    async fn open(&self, config: &HarnessConfig) -> ProbeResult<Self::Gateway>;
}
