//! Geometry snapshots.
//!
//! A snapshot is what the evaluator sees: for each named target, every
//! element its locator resolved to, with a freshly measured box, visibility
//! and (when fetched) content. Snapshots are taken right after a settle wait
//! and never refreshed.

use crate::gateway::{BrowserGateway, ElementHandle};
use crate::geometry::BoundingBox;
use crate::locator::{locate, Locator, Strategy};
use crate::result::{ProbeError, ProbeResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// One measured element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSample {
    /// Gateway handle
    pub handle: ElementHandle,
    /// Bounding box, `None` when not rendered
    pub bbox: Option<BoundingBox>,
    /// Rendered with non-zero area
    pub visible: bool,
    /// Inner content, when the locator needed it
    pub content: Option<String>,
}

impl ElementSample {
    /// Box of a visible, non-empty element
    #[must_use]
    pub fn visible_box(&self) -> Option<BoundingBox> {
        self.bbox.filter(|b| self.visible && !b.is_empty())
    }
}

/// Everything measured for one named target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Strategy that produced the samples
    pub strategy: Option<Strategy>,
    /// Samples in document order
    pub samples: Vec<ElementSample>,
}

impl Measurement {
    /// Number of matched elements
    #[must_use]
    pub fn count(&self) -> usize {
        self.samples.len()
    }

    /// Box of the first sample that has one
    #[must_use]
    pub fn first_box(&self) -> Option<BoundingBox> {
        self.samples.iter().find_map(|s| s.bbox)
    }

    /// Boxes of visible samples
    #[must_use]
    pub fn visible_boxes(&self) -> Vec<BoundingBox> {
        self.samples.iter().filter_map(ElementSample::visible_box).collect()
    }

    /// Any sample visible with non-zero area
    #[must_use]
    pub fn any_visible(&self) -> bool {
        self.samples.iter().any(|s| s.visible_box().is_some())
    }

    /// All boxes in document order (`None` for unrendered samples)
    #[must_use]
    pub fn boxes(&self) -> Vec<Option<BoundingBox>> {
        self.samples.iter().map(|s| s.bbox).collect()
    }
}

/// Named measurements taken at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the measurement started
    pub taken_at: DateTime<Utc>,
    /// Target name to measurement
    pub measurements: BTreeMap<String, Measurement>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl Snapshot {
    /// Empty snapshot stamped now
    #[must_use]
    pub fn new() -> Self {
        Self {
            taken_at: Utc::now(),
            measurements: BTreeMap::new(),
        }
    }

    /// Add or replace a measurement
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, measurement: Measurement) -> Self {
        self.measurements.insert(name.into(), measurement);
        self
    }

    /// Measurement for `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Measurement> {
        self.measurements.get(name)
    }

    /// Whether `name` was measured
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.measurements.contains_key(name)
    }
}

/// Snapshots recorded by capture steps, keyed by label
pub type Baselines = BTreeMap<String, Snapshot>;

/// Measure the named `targets`.
///
/// # Errors
///
/// [`ProbeError::Config`] for a name missing from `targets`, or a fatal
/// gateway error.
pub async fn capture<'a, G, I>(
    gateway: &G,
    targets: &BTreeMap<String, Locator>,
    names: I,
) -> ProbeResult<Snapshot>
where
    G: BrowserGateway + ?Sized,
    I: IntoIterator<Item = &'a str>,
{
    let mut snapshot = Snapshot::new();
    for name in names {
        if snapshot.contains(name) {
            continue;
        }
        let locator = targets
            .get(name)
            .ok_or_else(|| ProbeError::config(format!("unknown target '{name}'")))?;
        let measurement = measure(gateway, locator).await?;
        debug!(target_name = name, count = measurement.count(), "measured");
        snapshot.measurements.insert(name.to_string(), measurement);
    }
    Ok(snapshot)
}

/// Locate and measure every match of `locator`
pub async fn measure<G>(gateway: &G, locator: &Locator) -> ProbeResult<Measurement>
where
    G: BrowserGateway + ?Sized,
{
    let located = locate(gateway, locator, None).await?;
    let mut samples = Vec::with_capacity(located.matches.len());
    for candidate in located.matches {
        let visible = match gateway.is_visible(&candidate.handle).await {
            Ok(v) => v,
            Err(e) if !e.is_fatal() || e.is_stale() => false,
            Err(e) => return Err(e),
        };
        samples.push(ElementSample {
            handle: candidate.handle,
            bbox: candidate.bbox,
            visible,
            content: candidate.content,
        });
    }
    Ok(Measurement {
        strategy: located.strategy,
        samples,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::gateway::{FakeElement, FakePage};

    fn sample(bbox: Option<BoundingBox>, visible: bool) -> ElementSample {
        ElementSample {
            handle: ElementHandle::new("h"),
            bbox,
            visible,
            content: None,
        }
    }

    #[test]
    fn test_visible_box_requires_area() {
        let b = BoundingBox::new(0.0, 0.0, 0.0, 20.0);
        assert!(sample(Some(b), true).visible_box().is_none());
        let b = BoundingBox::new(0.0, 0.0, 10.0, 20.0);
        assert!(sample(Some(b), false).visible_box().is_none());
        assert!(sample(Some(b), true).visible_box().is_some());
    }

    #[test]
    fn test_measurement_accessors() {
        let m = Measurement {
            strategy: Some(Strategy::Primary),
            samples: vec![
                sample(None, false),
                sample(Some(BoundingBox::new(5.0, 5.0, 10.0, 10.0)), true),
            ],
        };
        assert_eq!(m.count(), 2);
        assert_eq!(m.first_box().unwrap().x, 5.0);
        assert_eq!(m.visible_boxes().len(), 1);
        assert!(m.any_visible());
        assert_eq!(m.boxes()[0], None);
    }

    #[tokio::test]
    async fn test_capture_named_targets() {
        let page = FakePage::new();
        page.with_dom(|dom| {
            dom.add(FakeElement::new("aside").at(280.0, 0.0, 64.0, 900.0));
            dom.add(FakeElement::new("h2").hidden());
        });
        let mut targets = BTreeMap::new();
        targets.insert("panel".to_string(), Locator::new("panel", "aside"));
        targets.insert("title".to_string(), Locator::new("title", "h2"));
        targets.insert("unused".to_string(), Locator::new("unused", "nav"));

        let snapshot = capture(&page, &targets, ["panel", "title", "panel"])
            .await
            .unwrap();
        assert_eq!(snapshot.measurements.len(), 2);
        assert_eq!(snapshot.get("panel").unwrap().first_box().unwrap().width, 64.0);
        assert!(!snapshot.get("title").unwrap().any_visible());
        assert!(!snapshot.contains("unused"));
    }

    #[tokio::test]
    async fn test_capture_unknown_target() {
        let page = FakePage::new();
        let err = capture(&page, &BTreeMap::new(), ["ghost"]).await.unwrap_err();
        assert!(matches!(err, ProbeError::Config { .. }));
    }

    #[tokio::test]
    async fn test_empty_target_is_an_empty_measurement() {
        let page = FakePage::new();
        let m = measure(&page, &Locator::new("panel", "aside")).await.unwrap();
        assert_eq!(m.count(), 0);
        assert_eq!(m.strategy, None);
    }
}
