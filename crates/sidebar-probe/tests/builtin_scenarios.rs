//! End-to-end runs of the built-in scenarios against scripted pages that
//! behave like the application: a main sidebar collapsing to a rail, and a
//! thread panel opened from an agent page.

#![allow(clippy::unwrap_used)]

use sidebar_probe::{
    builtin, render, run_scenario, BoundingBox, FakeElement, FakePage, FakeSessionProvider,
    HarnessConfig, RunStatus, Scenario, ScenarioReport, SettleMode, Status, Verdict,
};
use tempfile::TempDir;

fn config(dir: &TempDir) -> HarnessConfig {
    HarnessConfig::default()
        .with_settle_delay(0)
        .with_output_dir(dir.path())
}

fn status_of(report: &ScenarioReport, rule: &str) -> Status {
    report
        .verdicts()
        .find(|v| v.rule == rule)
        .map(|v| v.status)
        .unwrap_or_else(|| panic!("no verdict for '{rule}'"))
}

fn verdict_in<'a>(report: &'a ScenarioReport, step: &str, rule: &str) -> &'a Verdict {
    report
        .steps()
        .iter()
        .find(|s| s.step_name == step)
        .and_then(|s| s.verdicts.iter().find(|v| v.rule == rule))
        .unwrap_or_else(|| panic!("no verdict for '{rule}' in '{step}'"))
}

/// Main sidebar: 280px wide with a title, collapsing to a 64px icon rail.
///
/// With `duplicate_toggle`, the content header carries a second
/// `panel-right` toggle far outside the sidebar. `animated` makes each
/// resize take a few frames.
fn main_sidebar_page(duplicate_toggle: bool, animated: bool) -> FakePage {
    let page = FakePage::new();
    page.with_dom(|dom| {
        let sidebar = dom.add(FakeElement::new("aside").at(0.0, 0.0, 280.0, 900.0));
        let toggle = dom.add(
            FakeElement::new("button")
                .at(12.0, 12.0, 32.0, 32.0)
                .with_content(r#"<svg class="lucide lucide-panel-left"></svg>"#),
        );
        dom.add(
            FakeElement::new("button")
                .at(320.0, 12.0, 32.0, 32.0)
                .with_content(r#"<svg class="lucide lucide-share"></svg>"#),
        );
        if duplicate_toggle {
            dom.add(
                FakeElement::new("button")
                    .at(1200.0, 12.0, 32.0, 32.0)
                    .with_content(r#"<svg class="lucide lucide-panel-right"></svg>"#),
            );
        }
        let label = dom.add(
            FakeElement::new("text=Deep Agent Builder")
                .at(52.0, 16.0, 160.0, 24.0)
                .with_content("Deep Agent Builder"),
        );
        let icons: Vec<usize> = ["svg.lucide-key", "svg.lucide-wrench", "svg.lucide-settings"]
            .iter()
            .enumerate()
            .map(|(i, sel)| {
                dom.add(FakeElement::new(*sel).at(16.0 + 40.0 * i as f64, 850.0, 20.0, 20.0))
            })
            .collect();

        dom.on_click(toggle, move |dom| {
            let expanded = dom.element(sidebar).map_or(false, |s| s.bbox.width > 100.0);
            let (from, width) = if expanded { (280.0, 64.0) } else { (64.0, 280.0) };
            let target = BoundingBox::new(0.0, 0.0, width, 900.0);
            if animated {
                let frames = (1..=3)
                    .map(|i| {
                        let w = from + (width - from) * f64::from(i) / 4.0;
                        BoundingBox::new(0.0, 0.0, w, 900.0)
                    })
                    .collect();
                dom.animate(sidebar, frames, target);
            } else {
                dom.set_box(sidebar, target);
            }
            if expanded {
                dom.set_visible(label, false);
                for (i, icon) in icons.iter().enumerate() {
                    dom.set_box(*icon, BoundingBox::new(22.0, 770.0 + 40.0 * i as f64, 20.0, 20.0));
                }
            } else {
                dom.set_visible(label, true);
                for (i, icon) in icons.iter().enumerate() {
                    dom.set_box(
                        *icon,
                        BoundingBox::new(16.0 + 40.0 * i as f64, 850.0, 20.0, 20.0),
                    );
                }
            }
        });
    });
    page
}

/// Agent page with a thread panel next to the 280px main sidebar.
///
/// Where a stray History button shows up in the content header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HistoryLeak {
    Never,
    Always,
    AfterCollapse,
}

/// `leak` places a second History button at x=1200.
fn thread_panel_page(animated: bool, leak: HistoryLeak) -> FakePage {
    const PANEL: &str = "aside[role='complementary']";
    let page = FakePage::new();
    page.with_dom(|dom| {
        dom.add(FakeElement::new("aside").at(0.0, 0.0, 280.0, 900.0));
        let agent = dom.add(
            FakeElement::new("button:has(svg.lucide-bot)").at(16.0, 200.0, 248.0, 36.0),
        );
        let panel = dom.add(FakeElement::new(PANEL).at(280.0, 0.0, 64.0, 900.0).hidden());
        let toggle = dom.add(
            FakeElement::new("button:has(svg.lucide-history)")
                .at(296.0, 16.0, 32.0, 32.0)
                .hidden(),
        );
        let title = dom.add(
            FakeElement::new("h2")
                .at(336.0, 20.0, 120.0, 24.0)
                .with_content("Threads")
                .hidden(),
        );
        let icons: Vec<usize> = ["lucide-history", "lucide-plus", "lucide-message-square"]
            .iter()
            .enumerate()
            .map(|(i, class)| {
                dom.add(
                    FakeElement::new(format!("{PANEL} svg.{class}"))
                        .at(302.0, 22.0 + 40.0 * i as f64, 20.0, 20.0)
                        .child_of(panel)
                        .hidden(),
                )
            })
            .collect();
        let stray = dom.add(
            FakeElement::new("button:has(svg.lucide-history)").at(1200.0, 16.0, 32.0, 32.0),
        );
        if leak != HistoryLeak::Always {
            dom.set_visible(stray, false);
        }

        let opened = icons.clone();
        dom.on_click(agent, move |dom| {
            for id in [panel, toggle].iter().chain(opened.iter()) {
                dom.set_visible(*id, true);
            }
        });

        dom.on_click(toggle, move |dom| {
            let expanded = dom.element(panel).map_or(false, |p| p.bbox.width > 100.0);
            let (width, toggle_x) = if expanded { (64.0, 296.0) } else { (280.0, 512.0) };
            let target = BoundingBox::new(280.0, 0.0, width, 900.0);
            if animated {
                let from = if expanded { 280.0 } else { 64.0 };
                let frames = (1..=3)
                    .map(|i| {
                        let w = from + (width - from) * f64::from(i) / 4.0;
                        BoundingBox::new(280.0, 0.0, w, 900.0)
                    })
                    .collect();
                dom.animate(panel, frames, target);
            } else {
                dom.set_box(panel, target);
            }
            dom.set_box(toggle, BoundingBox::new(toggle_x, 16.0, 32.0, 32.0));
            dom.set_visible(title, !expanded);
            if expanded && leak == HistoryLeak::AfterCollapse {
                dom.set_visible(stray, true);
            }
            for (i, icon) in icons.iter().enumerate() {
                let bbox = if expanded {
                    BoundingBox::new(302.0, 22.0 + 40.0 * i as f64, 20.0, 20.0)
                } else {
                    BoundingBox::new(300.0 + 40.0 * i as f64, 60.0, 20.0, 20.0)
                };
                dom.set_box(*icon, bbox);
            }
        });
    });
    page
}

mod sidebar_toggle_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_healthy_sidebar_passes() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let provider = FakeSessionProvider::new(main_sidebar_page(false, false));
        let report = run_scenario(&provider, &builtin::sidebar_toggle(&config), &config).await;

        assert_eq!(report.status(), &RunStatus::Completed);
        assert!(report.overall_passed(), "{}", render(&report));
        assert_eq!(
            status_of(&report, "Sidebar collapsed (title hidden)"),
            Status::Pass
        );
        assert_eq!(status_of(&report, "Footer icons vertically aligned"), Status::Pass);
        assert_eq!(status_of(&report, "Geometry restored after round trip"), Status::Pass);
        assert_eq!(report.artifacts().count(), 3);
        assert!(provider.page().is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_toggle_fails() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let provider = FakeSessionProvider::new(main_sidebar_page(true, false));
        let report = run_scenario(&provider, &builtin::sidebar_toggle(&config), &config).await;

        assert_eq!(report.status(), &RunStatus::Completed);
        assert!(!report.overall_passed());
        let verdict = report
            .verdicts()
            .find(|v| v.rule == "No sidebar toggle in navigation area")
            .unwrap();
        assert_eq!(verdict.status, Status::Fail);
        assert_eq!(verdict.explanation, "1 nav_toggles beyond x=64 (at x=1200)");
    }

    #[tokio::test(start_paused = true)]
    async fn test_collapsed_toggle_outside_rail_fails() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let page = main_sidebar_page(false, false);
        // found by the fallback strategy, but never inside a 64px rail
        page.with_dom(|dom| dom.set_box(1, BoundingBox::new(90.0, 12.0, 32.0, 32.0)));
        let provider = FakeSessionProvider::new(page);
        let report = run_scenario(&provider, &builtin::sidebar_toggle(&config), &config).await;

        assert_eq!(report.status(), &RunStatus::Completed);
        let verdict = verdict_in(&report, "assert collapsed", "Toggle within collapsed sidebar");
        assert_eq!(verdict.status, Status::Fail);
        assert_eq!(verdict.explanation, "toggle x=90 (expected < 64)");
        assert!(!report.overall_passed());
        assert!(render(&report).trim_end().ends_with("SOME TESTS FAILED"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_settle_watches_the_sidebar() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir).with_settle_mode(SettleMode::Poll);
        let provider = FakeSessionProvider::new(main_sidebar_page(false, true));
        let report = run_scenario(&provider, &builtin::sidebar_toggle(&config), &config).await;

        assert!(report.overall_passed(), "{}", render(&report));
        let verdict = verdict_in(&report, "assert collapsed", "No sidebar toggle in navigation area");
        assert_eq!(verdict.explanation, "no nav_toggles beyond x=64");
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_toggle_aborts_with_partial_report() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let page = FakePage::new();
        page.with_dom(|dom| {
            dom.add(FakeElement::new("button").at(600.0, 400.0, 120.0, 40.0));
        });
        let provider = FakeSessionProvider::new(page);
        let report = run_scenario(&provider, &builtin::sidebar_toggle(&config), &config).await;

        assert!(report.is_aborted());
        assert!(!report.overall_passed());
        let last = report.steps().last().unwrap();
        assert_eq!(last.step_name, "locate toggle");
        assert_eq!(
            last.error.as_deref(),
            Some("Locator 'toggle' matched nothing (tried 2 strategies)")
        );
        // navigate, wait and the first capture completed
        assert_eq!(report.steps().len(), 4);
        assert!(provider.page().is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_strategy_finds_offset_toggle() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let page = main_sidebar_page(false, false);
        // header padding pushes the toggle out of the top-left corner
        page.with_dom(|dom| dom.set_box(1, BoundingBox::new(12.0, 72.0, 32.0, 32.0)));
        let provider = FakeSessionProvider::new(page);
        let report = run_scenario(&provider, &builtin::sidebar_toggle(&config), &config).await;

        assert_eq!(report.status(), &RunStatus::Completed);
        assert!(report.overall_passed(), "{}", render(&report));
    }
}

mod secondary_panel_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_panel_round_trip_passes() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let provider = FakeSessionProvider::new(thread_panel_page(false, HistoryLeak::Never));
        let report = run_scenario(&provider, &builtin::secondary_panel(&config), &config).await;

        assert!(report.overall_passed(), "{}", render(&report));
        assert_eq!(status_of(&report, "Initial state collapsed"), Status::Pass);
        assert_eq!(status_of(&report, "Expand works correctly"), Status::Pass);
        assert_eq!(status_of(&report, "No duplicate History in nav"), Status::Pass);
        assert_eq!(status_of(&report, "Collapse works correctly"), Status::Pass);
        assert_eq!(status_of(&report, "Geometry restored after round trip"), Status::Pass);

        let labels: Vec<&str> = report.artifacts().map(|a| a.label.as_str()).collect();
        assert_eq!(labels, vec!["homepage", "agent_page_initial", "expanded", "collapsed"]);
        assert!(report
            .artifacts()
            .last()
            .unwrap()
            .path
            .ends_with("04_collapsed.png"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_settle_waits_out_animation() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir).with_settle_mode(SettleMode::Poll);
        let provider = FakeSessionProvider::new(thread_panel_page(true, HistoryLeak::Never));
        let report = run_scenario(&provider, &builtin::secondary_panel(&config), &config).await;

        assert!(report.overall_passed(), "{}", render(&report));
        assert_eq!(status_of(&report, "Expand works correctly"), Status::Pass);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_history_fails_in_both_states() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let provider = FakeSessionProvider::new(thread_panel_page(false, HistoryLeak::Always));
        let report = run_scenario(&provider, &builtin::secondary_panel(&config), &config).await;

        assert_eq!(report.status(), &RunStatus::Completed);
        let expanded = verdict_in(&report, "assert expanded", "No duplicate History in nav");
        assert_eq!(expanded.status, Status::Fail);
        assert_eq!(expanded.explanation, "1 history_buttons beyond x=560 (at x=1200)");
        let collapsed = verdict_in(&report, "assert collapsed", "No duplicate History in nav");
        assert_eq!(collapsed.status, Status::Fail);
        assert_eq!(collapsed.explanation, "1 history_buttons beyond x=344 (at x=1200)");
        // the real toggle is still the one acted on
        assert_eq!(status_of(&report, "Expand works correctly"), Status::Pass);
        assert!(!report.overall_passed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_history_after_collapse_fails() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let provider =
            FakeSessionProvider::new(thread_panel_page(false, HistoryLeak::AfterCollapse));
        let report = run_scenario(&provider, &builtin::secondary_panel(&config), &config).await;

        let expanded = verdict_in(&report, "assert expanded", "No duplicate History in nav");
        assert_eq!(expanded.status, Status::Pass);
        let collapsed = verdict_in(&report, "assert collapsed", "No duplicate History in nav");
        assert_eq!(collapsed.status, Status::Fail);
        assert_eq!(collapsed.explanation, "1 history_buttons beyond x=344 (at x=1200)");
        assert_eq!(status_of(&report, "Collapse works correctly"), Status::Pass);
        assert!(!report.overall_passed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_panel_that_never_expands_fails() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let page = thread_panel_page(false, HistoryLeak::Never);
        // toggle wired to nothing
        page.with_dom(|dom| dom.on_click(3, |_| {}));
        let provider = FakeSessionProvider::new(page);
        let report = run_scenario(&provider, &builtin::secondary_panel(&config), &config).await;

        assert_eq!(report.status(), &RunStatus::Completed);
        assert_eq!(status_of(&report, "Expand works correctly"), Status::Fail);
        assert_eq!(
            status_of(&report, "'Threads' title visible when expanded"),
            Status::Fail
        );
        assert!(!report.overall_passed());
    }
}

mod scenario_file_tests {
    use super::*;

    const SCENARIO: &str = r#"
name: rail from file
targets:
  sidebar:
    queries:
      - selector: aside
  toggle:
    queries:
      - selector: button
        box: { near_top_left: { max_x: 50, max_y: 60 } }
  label:
    queries:
      - selector: "text=Deep Agent Builder"
steps:
  - action: navigate
  - action: capture
    label: start
  - action: locate
    query: toggle
    bind: toggle
  - action: act
    handle: toggle
  - action: assert_all
    name: collapsed
    rules:
      - name: rail width
        check: width_class
        target: sidebar
        expect: collapsed
      - name: state
        check: infer_state
        target: sidebar
  - action: act
    handle: toggle
  - action: assert_all
    name: restored
    rules:
      - name: idempotent
        check: round_trip
        baseline: start
        targets: [sidebar, label]
"#;

    #[tokio::test]
    async fn test_yaml_scenario_runs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rail.yaml");
        std::fs::write(&path, SCENARIO).unwrap();
        let scenario = Scenario::from_file(&path).unwrap();
        assert_eq!(scenario.targets["toggle"].name, "toggle");

        let config = config(&dir);
        let provider = FakeSessionProvider::new(main_sidebar_page(false, false));
        let report = run_scenario(&provider, &scenario, &config).await;

        assert!(report.overall_passed(), "{}", render(&report));
        assert_eq!(status_of(&report, "state").to_string(), "PASS");
        assert_eq!(status_of(&report, "idempotent"), Status::Pass);
        assert_eq!(
            provider.page().history().iter().filter(|c| c.starts_with("click:")).count(),
            2
        );
    }

    #[tokio::test]
    async fn test_session_closed_once_on_every_path() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let scenario = Scenario::from_yaml(SCENARIO).unwrap();

        let healthy = FakeSessionProvider::new(main_sidebar_page(false, false));
        run_scenario(&healthy, &scenario, &config).await;
        assert_eq!(healthy.page().close_count(), 1);

        let broken = FakePage::new();
        broken.with_dom(|dom| dom.fail_navigation("net::ERR_CONNECTION_REFUSED"));
        let provider = FakeSessionProvider::new(broken);
        let report = run_scenario(&provider, &scenario, &config).await;
        assert!(report.is_aborted());
        assert_eq!(provider.page().close_count(), 1);
    }
}
