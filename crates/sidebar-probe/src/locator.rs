//! Strategy-ordered element location.
//!
//! Icon-only toggle controls rarely carry stable identifiers, so elements are
//! found from what is rendered: a CSS selector narrows the candidates, then a
//! geometric filter and a content filter decide which candidates match.
//!
//! A [`Locator`] holds one or more [`LocatorQuery`] strategies. They are tried
//! in order and resolution stops at the first strategy with a non-empty
//! result:
//!
//! ```text
//! button ──► [x < 50 && y < 60]      primary   ──► match? done
//!        └─► [x < 100 && width < 50] fallback  ──► match? done
//!                                              └─► empty (LocatorNotFound)
//! ```
//!
//! # Example
//!
//! ```
//! use sidebar_probe::{BoxFilter, Locator};
//!
//! let toggle = Locator::new("toggle", "button")
//!     .filter(BoxFilter::NearTopLeft { max_x: 50.0, max_y: 60.0 })
//!     .fallback("button", BoxFilter::NarrowLeftAligned { max_x: 100.0, max_width: 50.0 });
//! assert_eq!(toggle.queries().len(), 2);
//! ```

use crate::gateway::{BrowserGateway, ElementHandle};
use crate::geometry::{Axis, Bound, BoundingBox};
use crate::result::{ProbeError, ProbeResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Closure form of a geometric predicate
#[derive(Clone)]
pub struct BoxPredicate(Arc<dyn Fn(&BoundingBox) -> bool + Send + Sync>);

impl fmt::Debug for BoxPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BoxPredicate(..)")
    }
}

/// Closure form of a content predicate
#[derive(Clone)]
pub struct ContentPredicate(Arc<dyn Fn(&str) -> bool + Send + Sync>);

impl fmt::Debug for ContentPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentPredicate(..)")
    }
}

/// Predicate over a candidate's bounding box.
///
/// Strict comparisons (`<`, `>`) are used for the position filters, matching
/// how position heuristics are usually phrased ("x below 50").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxFilter {
    /// Every candidate, including ones with no rendered box
    #[default]
    Anything,
    /// `x < max_x && y < max_y`
    NearTopLeft {
        /// Exclusive x limit
        max_x: f64,
        /// Exclusive y limit
        max_y: f64,
    },
    /// `x < max_x && width < max_width`
    NarrowLeftAligned {
        /// Exclusive x limit
        max_x: f64,
        /// Exclusive width limit
        max_width: f64,
    },
    /// `x >= value`
    MinX(f64),
    /// `x < value`
    MaxX(f64),
    /// `y >= value`
    MinY(f64),
    /// `y < value`
    MaxY(f64),
    /// `x > value`
    RightOf(f64),
    /// Generic threshold on any axis
    Within {
        /// Measured axis
        axis: Axis,
        /// Comparison
        bound: Bound,
        /// Limit
        limit: f64,
    },
    /// Every inner filter holds
    All(Vec<BoxFilter>),
    /// At least one inner filter holds
    Any(Vec<BoxFilter>),
    /// Inner filter does not hold
    Not(Box<BoxFilter>),
    /// Programmatic predicate (not serialisable)
    #[serde(skip)]
    Custom(BoxPredicate),
}

impl BoxFilter {
    /// Wrap a closure
    #[must_use]
    pub fn custom(f: impl Fn(&BoundingBox) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(BoxPredicate(Arc::new(f)))
    }

    /// Evaluate against a measured box.
    ///
    /// Candidates with no rendered box only pass [`BoxFilter::Anything`].
    #[must_use]
    pub fn matches(&self, bbox: Option<&BoundingBox>) -> bool {
        match bbox {
            Some(b) => self.test(b),
            None => matches!(self, Self::Anything),
        }
    }

    fn test(&self, b: &BoundingBox) -> bool {
        match self {
            Self::Anything => true,
            Self::NearTopLeft { max_x, max_y } => b.x < *max_x && b.y < *max_y,
            Self::NarrowLeftAligned { max_x, max_width } => b.x < *max_x && b.width < *max_width,
            Self::MinX(v) => b.x >= *v,
            Self::MaxX(v) => b.x < *v,
            Self::MinY(v) => b.y >= *v,
            Self::MaxY(v) => b.y < *v,
            Self::RightOf(v) => b.x > *v,
            Self::Within { axis, bound, limit } => bound.holds(b.value(*axis), *limit),
            Self::All(filters) => filters.iter().all(|f| f.test(b)),
            Self::Any(filters) => filters.iter().any(|f| f.test(b)),
            Self::Not(inner) => !inner.test(b),
            Self::Custom(p) => (p.0)(b),
        }
    }
}

/// Predicate over a candidate's inner markup/text
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFilter {
    /// No content requirement (content is never fetched)
    #[default]
    Anything,
    /// Case-insensitive substring
    Contains(String),
    /// Trimmed content equals the value exactly
    Equals(String),
    /// Case-insensitive substring must be absent
    NotContains(String),
    /// Regular expression
    Matches(String),
    /// Every inner filter holds
    All(Vec<ContentFilter>),
    /// At least one inner filter holds
    Any(Vec<ContentFilter>),
    /// Inner filter does not hold
    Not(Box<ContentFilter>),
    /// Programmatic predicate (not serialisable)
    #[serde(skip)]
    Custom(ContentPredicate),
}

impl ContentFilter {
    /// Wrap a closure
    #[must_use]
    pub fn custom(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(ContentPredicate(Arc::new(f)))
    }

    /// Whether candidates must have their content fetched
    #[must_use]
    pub const fn needs_content(&self) -> bool {
        !matches!(self, Self::Anything)
    }

    /// Evaluate against inner content. An invalid regex matches nothing.
    #[must_use]
    pub fn matches(&self, content: &str) -> bool {
        match self {
            Self::Anything => true,
            Self::Contains(needle) => content.to_lowercase().contains(&needle.to_lowercase()),
            Self::Equals(value) => content.trim() == value,
            Self::NotContains(needle) => !content.to_lowercase().contains(&needle.to_lowercase()),
            Self::Matches(pattern) => Regex::new(pattern).is_ok_and(|re| re.is_match(content)),
            Self::All(filters) => filters.iter().all(|f| f.matches(content)),
            Self::Any(filters) => filters.iter().any(|f| f.matches(content)),
            Self::Not(inner) => !inner.matches(content),
            Self::Custom(p) => (p.0)(content),
        }
    }

    /// Check that every regex in the filter compiles
    pub fn validate(&self) -> ProbeResult<()> {
        match self {
            Self::Matches(pattern) => Regex::new(pattern)
                .map(|_| ())
                .map_err(|e| ProbeError::config(format!("invalid content regex '{pattern}': {e}"))),
            Self::All(filters) | Self::Any(filters) => {
                filters.iter().try_for_each(Self::validate)
            }
            Self::Not(inner) => inner.validate(),
            _ => Ok(()),
        }
    }
}

/// Role of a query within its locator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Strict filter, tried first
    #[default]
    Primary,
    /// Relaxed filter, tried when earlier strategies found nothing
    Fallback,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

/// One location strategy: selector plus filters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorQuery {
    /// CSS selector (or `text=...`) sent to the gateway
    pub selector: String,
    /// Geometric filter
    #[serde(default, rename = "box")]
    pub geometric_filter: BoxFilter,
    /// Content filter
    #[serde(default, rename = "content")]
    pub attribute_filter: ContentFilter,
    /// Primary or fallback
    #[serde(default)]
    pub strategy: Strategy,
}

impl LocatorQuery {
    /// Query with no filters
    #[must_use]
    pub fn new(selector: impl Into<String>, strategy: Strategy) -> Self {
        Self {
            selector: selector.into(),
            geometric_filter: BoxFilter::Anything,
            attribute_filter: ContentFilter::Anything,
            strategy,
        }
    }
}

/// Named, ordered list of location strategies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Locator {
    /// Name used in logs, errors and snapshots
    #[serde(default)]
    pub name: String,
    /// Strategies in resolution order
    pub queries: Vec<LocatorQuery>,
}

impl Locator {
    /// Locator with a single unfiltered primary query
    #[must_use]
    pub fn new(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queries: vec![LocatorQuery::new(selector, Strategy::Primary)],
        }
    }

    /// Set the geometric filter of the most recently added query
    #[must_use]
    pub fn filter(mut self, filter: BoxFilter) -> Self {
        if let Some(q) = self.queries.last_mut() {
            q.geometric_filter = filter;
        }
        self
    }

    /// Set the content filter of the most recently added query
    #[must_use]
    pub fn content(mut self, filter: ContentFilter) -> Self {
        if let Some(q) = self.queries.last_mut() {
            q.attribute_filter = filter;
        }
        self
    }

    /// Append a fallback strategy
    #[must_use]
    pub fn fallback(mut self, selector: impl Into<String>, filter: BoxFilter) -> Self {
        let mut query = LocatorQuery::new(selector, Strategy::Fallback);
        query.geometric_filter = filter;
        self.queries.push(query);
        self
    }

    /// Strategies in order
    #[must_use]
    pub fn queries(&self) -> &[LocatorQuery] {
        &self.queries
    }
}

/// A candidate that passed both filters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Gateway handle
    pub handle: ElementHandle,
    /// Box measured while filtering
    pub bbox: Option<BoundingBox>,
    /// Content, when the filter needed it
    pub content: Option<String>,
}

/// Outcome of [`locate`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Located {
    /// Locator name
    pub locator: String,
    /// Index of the winning strategy, `None` when nothing matched
    pub strategy_index: Option<usize>,
    /// Kind of the winning strategy
    pub strategy: Option<Strategy>,
    /// Number of strategies attempted
    pub attempts: usize,
    /// Matching candidates in document order
    pub matches: Vec<Candidate>,
}

impl Located {
    /// True when no strategy matched
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// First match
    #[must_use]
    pub fn first(&self) -> Option<&Candidate> {
        self.matches.first()
    }
}

/// Resolve `locator` against the live page.
///
/// An empty result is not an error. Per-candidate transient and stale
/// failures are logged and the candidate is skipped; any other gateway error
/// is returned.
pub async fn locate<G>(
    gateway: &G,
    locator: &Locator,
    scope: Option<&ElementHandle>,
) -> ProbeResult<Located>
where
    G: BrowserGateway + ?Sized,
{
    let mut attempts = 0;
    for (index, query) in locator.queries.iter().enumerate() {
        attempts += 1;
        let handles = match gateway.query_all(&query.selector, scope).await {
            Ok(handles) => handles,
            Err(e) if recoverable(&e) => {
                debug!(locator = %locator.name, selector = %query.selector, error = %e, "query skipped");
                continue;
            }
            Err(e) => return Err(e),
        };

        let mut matches = Vec::new();
        for handle in handles {
            match evaluate_candidate(gateway, query, handle).await {
                Ok(Some(candidate)) => matches.push(candidate),
                Ok(None) => {}
                Err(e) if recoverable(&e) => {
                    debug!(locator = %locator.name, error = %e, "candidate skipped");
                }
                Err(e) => return Err(e),
            }
        }

        if !matches.is_empty() {
            debug!(
                locator = %locator.name,
                strategy = %query.strategy,
                count = matches.len(),
                "located"
            );
            return Ok(Located {
                locator: locator.name.clone(),
                strategy_index: Some(index),
                strategy: Some(query.strategy),
                attempts,
                matches,
            });
        }
    }

    Ok(Located {
        locator: locator.name.clone(),
        strategy_index: None,
        strategy: None,
        attempts,
        matches: Vec::new(),
    })
}

/// Resolve `locator` to its first match.
///
/// # Errors
///
/// [`ProbeError::LocatorNotFound`] when every strategy comes back empty.
pub async fn locate_one<G>(
    gateway: &G,
    locator: &Locator,
    scope: Option<&ElementHandle>,
) -> ProbeResult<Candidate>
where
    G: BrowserGateway + ?Sized,
{
    let located = locate(gateway, locator, scope).await?;
    located
        .matches
        .into_iter()
        .next()
        .ok_or_else(|| ProbeError::LocatorNotFound {
            locator: locator.name.clone(),
            strategies: located.attempts,
        })
}

async fn evaluate_candidate<G>(
    gateway: &G,
    query: &LocatorQuery,
    handle: ElementHandle,
) -> ProbeResult<Option<Candidate>>
where
    G: BrowserGateway + ?Sized,
{
    let bbox = gateway.bounding_box(&handle).await?;
    if !query.geometric_filter.matches(bbox.as_ref()) {
        return Ok(None);
    }
    let content = if query.attribute_filter.needs_content() {
        let content = gateway.inner_content(&handle).await?;
        if !query.attribute_filter.matches(&content) {
            return Ok(None);
        }
        Some(content)
    } else {
        None
    };
    Ok(Some(Candidate {
        handle,
        bbox,
        content,
    }))
}

const fn recoverable(e: &ProbeError) -> bool {
    !e.is_fatal() || e.is_stale()
}
