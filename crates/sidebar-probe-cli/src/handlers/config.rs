//! Config command handler

use crate::config::HarnessOverrides;
use crate::error::CliResult;
use sidebar_probe::HarnessConfig;

/// Effective (or default) configuration as YAML
pub fn config_yaml(overrides: &HarnessOverrides, defaults: bool) -> CliResult<String> {
    let config = if defaults {
        HarnessConfig::default()
    } else {
        overrides.resolve()?
    };
    Ok(config.to_yaml()?)
}

/// Execute the config command
pub fn execute_config(overrides: &HarnessOverrides, defaults: bool) -> CliResult<()> {
    print!("{}", config_yaml(overrides, defaults)?);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sidebar_probe::Viewport;

    #[test]
    fn test_defaults_ignore_overrides() {
        let overrides = HarnessOverrides {
            settle_delay_ms: Some(900),
            ..HarnessOverrides::default()
        };
        let yaml = config_yaml(&overrides, true).unwrap();
        assert!(yaml.contains("settle_delay_ms: 600"));
    }

    #[test]
    fn test_effective_config_round_trips() {
        let overrides = HarnessOverrides {
            viewport: Some(Viewport::new(1280, 720)),
            ..HarnessOverrides::default()
        };
        let yaml = config_yaml(&overrides, false).unwrap();
        let parsed: HarnessConfig = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(parsed.viewport, Viewport::new(1280, 720));
    }
}
