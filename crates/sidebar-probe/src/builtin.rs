//! Built-in scenarios for the two observed sidebar patterns.
//!
//! - [`sidebar_toggle`]: the main navigation sidebar collapses to an icon
//!   rail and expands back.
//! - [`secondary_panel`]: a thread panel next to the main sidebar starts
//!   collapsed, expands, and collapses again.
//!
//! Thresholds and the base URL come from [`HarnessConfig`]; the pixel
//! constants below describe the application's layout.

use crate::config::{HarnessConfig, SettleMode};
use crate::geometry::{Axis, Bound};
use crate::locator::{BoxFilter, ContentFilter, Locator};
use crate::rules::{Check, LayoutState, Rule};
use crate::scenario::{Scenario, SettleSpec, Step};

/// Width of the expanded main sidebar
pub const MAIN_SIDEBAR_WIDTH: f64 = 280.0;

/// Width of a collapsed rail
pub const COLLAPSED_RAIL_WIDTH: f64 = 64.0;

/// Idle wait after navigation, for entrance animations
pub const POST_NAVIGATION_WAIT_MS: u64 = 2_000;

/// Name and description of each built-in scenario
pub const BUILTINS: &[(&str, &str)] = &[
    (
        "sidebar-toggle",
        "Main sidebar collapses to a 64px rail and expands back",
    ),
    (
        "secondary-panel",
        "Thread panel starts collapsed, expands to 280px, collapses again",
    ),
];

/// Built-in scenario by name
#[must_use]
pub fn by_name(name: &str, config: &HarnessConfig) -> Option<Scenario> {
    match name {
        "sidebar-toggle" => Some(sidebar_toggle(config)),
        "secondary-panel" => Some(secondary_panel(config)),
        _ => None,
    }
}

fn label_visible(name: &str, label: &str, expect: bool) -> Rule {
    Rule::new(
        name,
        Check::LabelVisibility {
            label: label.to_string(),
            expect,
        },
    )
}

fn width_class(name: &str, target: &str, expect: LayoutState) -> Rule {
    Rule::new(
        name,
        Check::WidthClass {
            target: target.to_string(),
            expect,
            collapsed_max: None,
            expanded_min: None,
        },
    )
}

fn no_duplicate_history() -> Rule {
    Rule::new(
        "No duplicate History in nav",
        Check::SingleToggleLocation {
            component: Some("panel".to_string()),
            toggles: "history_buttons".to_string(),
            min_x: None,
        },
    )
}

fn settle(config: &HarnessConfig, probe: &str) -> SettleSpec {
    match config.settle_mode {
        SettleMode::Fixed => SettleSpec::Fixed {
            delay_ms: config.settle_delay_ms,
        },
        SettleMode::Poll => SettleSpec::Poll {
            probe: probe.to_string(),
        },
    }
}

/// Main sidebar: collapse via the top-left toggle, then expand again.
///
/// The toggle is the button nearest the top-left corner (`x < 50, y < 60`),
/// falling back to any narrow left-aligned button (`x < 100, width < 50`).
/// The sidebar itself is the `aside` flush with the left edge; its right edge
/// bounds where a toggle may appear, and it is the settle probe.
#[must_use]
pub fn sidebar_toggle(config: &HarnessConfig) -> Scenario {
    let toggle = Locator::new("toggle", "button")
        .filter(BoxFilter::NearTopLeft {
            max_x: 50.0,
            max_y: 60.0,
        })
        .fallback(
            "button",
            BoxFilter::NarrowLeftAligned {
                max_x: 100.0,
                max_width: 50.0,
            },
        );
    let sidebar = Locator::new("sidebar", "aside").filter(BoxFilter::MaxX(10.0));
    let nav_toggles = Locator::new("nav_toggles", "button")
        .content(ContentFilter::Contains("panel-right".to_string()));

    let expanded_rules = vec![label_visible("Title visible when expanded", "label", true)];
    let collapsed_rules = vec![
        label_visible("Sidebar collapsed (title hidden)", "label", false),
        Rule::new(
            "Toggle within collapsed sidebar",
            Check::Position {
                target: "toggle".to_string(),
                axis: Axis::X,
                bound: Bound::Below,
                limit: COLLAPSED_RAIL_WIDTH,
            },
        ),
        Rule::info(
            "Footer icons vertically aligned",
            Check::Alignment {
                icons: vec![
                    "key_icon".to_string(),
                    "wrench_icon".to_string(),
                    "settings_icon".to_string(),
                ],
                tolerance: None,
            },
        ),
        Rule::new(
            "No sidebar toggle in navigation area",
            Check::SingleToggleLocation {
                component: Some("sidebar".to_string()),
                toggles: "nav_toggles".to_string(),
                min_x: None,
            },
        ),
    ];
    let reexpanded_rules = vec![
        label_visible("Sidebar re-expanded", "label", true),
        Rule::new(
            "Geometry restored after round trip",
            Check::RoundTrip {
                baseline: "initial_expanded".to_string(),
                targets: vec!["toggle".to_string(), "label".to_string()],
                tolerance: 1.0,
            },
        ),
    ];

    Scenario::new("sidebar-toggle")
        .with_description("Main sidebar collapses to an icon rail and expands back")
        .target("sidebar", sidebar)
        .target("toggle", toggle)
        .target("label", Locator::new("label", "text=Deep Agent Builder"))
        .target("key_icon", Locator::new("key_icon", "svg.lucide-key"))
        .target("wrench_icon", Locator::new("wrench_icon", "svg.lucide-wrench"))
        .target("settings_icon", Locator::new("settings_icon", "svg.lucide-settings"))
        .target("nav_toggles", nav_toggles)
        .step(Step::navigate())
        .step(Step::wait(POST_NAVIGATION_WAIT_MS))
        .step(Step::capture("initial_expanded"))
        .step(Step::locate("toggle"))
        .step(Step::assert_all("initial", expanded_rules))
        .step(Step::act_with("toggle", settle(config, "sidebar")))
        .step(Step::capture("collapsed"))
        .step(Step::assert_all("collapsed", collapsed_rules))
        .step(Step::act_with("toggle", settle(config, "sidebar")))
        .step(Step::capture("expanded_again"))
        .step(Step::assert_all("re-expanded", reexpanded_rules))
}

/// Secondary thread panel: open an agent page, expand the panel, collapse it.
///
/// The panel toggle is the History button right of the main sidebar
/// (`x >= 270, y < 100`); any History button beyond the panel's measured
/// right edge is a duplicate.
#[must_use]
pub fn secondary_panel(config: &HarnessConfig) -> Scenario {
    let agent = Locator::new("agent", "button:has(svg.lucide-bot)")
        .filter(BoxFilter::MaxX(MAIN_SIDEBAR_WIDTH));
    let toggle = Locator::new("toggle", "button:has(svg.lucide-history)").filter(BoxFilter::All(vec![
        BoxFilter::MinX(MAIN_SIDEBAR_WIDTH - 10.0),
        BoxFilter::MaxY(100.0),
    ]));
    let title = Locator::new("title", "h2").content(ContentFilter::Contains("Threads".to_string()));
    let panel_icon = |class: &str| {
        Locator::new(class, format!("aside[role='complementary'] svg.{class}"))
    };

    let initial_rules = vec![
        width_class("Initial state collapsed", "panel", LayoutState::Collapsed),
        label_visible("'Threads' title hidden when collapsed", "title", false),
    ];
    let expanded_rules = vec![
        width_class("Expand works correctly", "panel", LayoutState::Expanded),
        label_visible("'Threads' title visible when expanded", "title", true),
        Rule::new(
            "Toggle in thread panel area",
            Check::Position {
                target: "toggle".to_string(),
                axis: Axis::X,
                bound: Bound::AtLeast,
                limit: MAIN_SIDEBAR_WIDTH - 10.0,
            },
        ),
        no_duplicate_history(),
    ];
    let collapsed_rules = vec![
        width_class("Collapse works correctly", "panel", LayoutState::Collapsed),
        no_duplicate_history(),
        Rule::info(
            "Icons vertically aligned",
            Check::Alignment {
                icons: vec![
                    "history_icon".to_string(),
                    "plus_icon".to_string(),
                    "message_icon".to_string(),
                ],
                tolerance: None,
            },
        ),
        Rule::new(
            "Geometry restored after round trip",
            Check::RoundTrip {
                baseline: "agent_page_initial".to_string(),
                targets: vec!["panel".to_string()],
                tolerance: 1.0,
            },
        ),
    ];

    Scenario::new("secondary-panel")
        .with_description("Thread panel starts collapsed, expands and collapses again")
        .target("agent", agent)
        .target("panel", Locator::new("panel", "aside[role='complementary']"))
        .target("title", title)
        .target("toggle", toggle)
        .target(
            "history_buttons",
            Locator::new("history_buttons", "button:has(svg.lucide-history)"),
        )
        .target("history_icon", panel_icon("lucide-history"))
        .target("plus_icon", panel_icon("lucide-plus"))
        .target("message_icon", panel_icon("lucide-message-square"))
        .step(Step::navigate())
        .step(Step::wait(POST_NAVIGATION_WAIT_MS))
        .step(Step::capture("homepage"))
        .step(Step::locate("agent"))
        .step(Step::act_with(
            "agent",
            SettleSpec::Fixed {
                delay_ms: POST_NAVIGATION_WAIT_MS,
            },
        ))
        .step(Step::capture("agent_page_initial"))
        .step(Step::assert_all("initial", initial_rules))
        .step(Step::locate("toggle"))
        .step(Step::act_with("toggle", settle(config, "panel")))
        .step(Step::capture("expanded"))
        .step(Step::assert_all("expanded", expanded_rules))
        .step(Step::act_with("toggle", settle(config, "panel")))
        .step(Step::capture("collapsed"))
        .step(Step::assert_all("collapsed", collapsed_rules))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_validate() {
        let config = HarnessConfig::default();
        for (name, _) in BUILTINS {
            let scenario = by_name(name, &config).unwrap_or_else(|| panic!("missing {name}"));
            assert_eq!(scenario.name, *name);
            assert!(scenario.problems().is_empty(), "{name}: {:?}", scenario.problems());
        }
        assert!(by_name("nope", &config).is_none());
    }

    #[test]
    fn test_toggle_locator_has_fallback() {
        let scenario = sidebar_toggle(&HarnessConfig::default());
        assert_eq!(scenario.targets["toggle"].queries().len(), 2);
    }

    #[test]
    fn test_settle_delay_follows_config() {
        let config = HarnessConfig::default().with_settle_delay(900);
        let scenario = secondary_panel(&config);
        let delays: Vec<u64> = scenario
            .steps
            .iter()
            .filter_map(|s| match s {
                Step::Act {
                    settle: Some(SettleSpec::Fixed { delay_ms }),
                    ..
                } => Some(*delay_ms),
                _ => None,
            })
            .collect();
        assert_eq!(delays, vec![2_000, 900, 900]);
    }

    #[test]
    fn test_poll_mode_watches_the_component() {
        let config = HarnessConfig::default().with_settle_mode(SettleMode::Poll);
        let scenario = secondary_panel(&config);
        assert!(scenario.steps.iter().any(|s| matches!(
            s,
            Step::Act { settle: Some(SettleSpec::Poll { probe }), .. } if probe == "panel"
        )));
        assert!(scenario.problems().is_empty());
    }

    #[test]
    fn test_poll_mode_watches_the_sidebar() {
        let config = HarnessConfig::default().with_settle_mode(SettleMode::Poll);
        let scenario = sidebar_toggle(&config);
        let probes: Vec<&str> = scenario
            .steps
            .iter()
            .filter_map(|s| match s {
                Step::Act {
                    settle: Some(SettleSpec::Poll { probe }),
                    ..
                } => Some(probe.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(probes, vec!["sidebar", "sidebar"]);
        assert!(scenario.problems().is_empty());
    }

    #[test]
    fn test_duplicate_toggle_region_follows_sidebar() {
        let scenario = sidebar_toggle(&HarnessConfig::default());
        let checks: Vec<&Check> = scenario
            .steps
            .iter()
            .filter_map(|s| match s {
                Step::AssertAll { rules, .. } => Some(rules),
                _ => None,
            })
            .flatten()
            .map(|r| &r.check)
            .collect();
        assert!(checks.iter().any(|c| matches!(
            c,
            Check::SingleToggleLocation { component: Some(name), min_x: None, .. } if name == "sidebar"
        )));
    }

    #[test]
    fn test_duplicate_history_checked_in_both_states() {
        let scenario = secondary_panel(&HarnessConfig::default());
        let steps: Vec<&str> = scenario
            .steps
            .iter()
            .filter_map(|s| match s {
                Step::AssertAll {
                    name: Some(name),
                    rules,
                } if rules.iter().any(|r| r.name == "No duplicate History in nav") => {
                    Some(name.as_str())
                }
                _ => None,
            })
            .collect();
        assert_eq!(steps, vec!["expanded", "collapsed"]);
    }

    #[test]
    fn test_capture_labels_in_order() {
        let scenario = secondary_panel(&HarnessConfig::default());
        let labels: Vec<&str> = scenario
            .steps
            .iter()
            .filter_map(|s| match s {
                Step::Capture { label, .. } => Some(label.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            labels,
            vec!["homepage", "agent_page_initial", "expanded", "collapsed"]
        );
    }
}
