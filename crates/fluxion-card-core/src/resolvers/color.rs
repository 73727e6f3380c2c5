// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use fluxion_card_types::{ColorSettings, ColorStep, EntityConfig};

use crate::diagnostics::DiagnosticSink;

/// Color used when the level cannot be colored
pub const DEFAULT_COLOR: &str = "inherit";

fn default_steps() -> Vec<ColorStep> {
    vec![
        ColorStep::new(20.0, "var(--label-badge-red)"),
        ColorStep::new(55.0, "var(--label-badge-yellow)"),
        ColorStep::new(101.0, "var(--label-badge-green)"),
    ]
}

/// Icon color for a battery level
pub fn get_color(
    config: &EntityConfig,
    level: Option<f64>,
    is_charging: bool,
    sink: &dyn DiagnosticSink,
) -> String {
    if is_charging
        && let Some(color) = config
            .settings
            .charging_state
            .as_ref()
            .and_then(|charging| charging.color.as_ref())
    {
        return color.clone();
    }

    let defaults;
    let (steps, gradient, non_percent) = match &config.settings.colors {
        Some(ColorSettings {
            steps,
            gradient,
            non_percent_values,
        }) if !steps.is_empty() => (steps.as_slice(), *gradient, *non_percent_values),
        colors => {
            defaults = default_steps();
            let gradient = colors.as_ref().is_some_and(|c| c.gradient);
            (defaults.as_slice(), gradient, false)
        }
    };

    let Some(level) = level.filter(|l| l.is_finite()) else {
        return DEFAULT_COLOR.to_owned();
    };
    if !non_percent && !(0.0..=100.0).contains(&level) {
        return DEFAULT_COLOR.to_owned();
    }

    if gradient {
        return gradient_color(steps, level, non_percent).unwrap_or_else(|| {
            sink.error(&format!(
                "[COLOR] Gradient of '{}' needs at least two hex colors, e.g. '#FF00FF'",
                config.entity
            ));
            DEFAULT_COLOR.to_owned()
        });
    }

    steps
        .iter()
        .find(|step| step.value.is_none_or(|threshold| level <= threshold))
        .map_or_else(|| DEFAULT_COLOR.to_owned(), |step| step.color.clone())
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Rgb(f64, f64, f64);

impl Rgb {
    fn parse(color: &str) -> Option<Self> {
        let hex = color.strip_prefix('#')?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(f64::from);
        match hex.len() {
            3 => {
                let expand = |i: usize| channel(hex[i..=i].repeat(2).as_str());
                Some(Self(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Some(Self(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
            _ => None,
        }
    }

    fn blend(self, other: Self, t: f64) -> Self {
        let mix = |a: f64, b: f64| a + (b - a) * t;
        Self(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }

    fn to_hex(self) -> String {
        // channels truncate, matching CSS-style integer conversion
        let channel = |c: f64| (c + 1e-9).floor().clamp(0.0, 255.0) as u8;
        format!("#{:02x}{:02x}{:02x}", channel(self.0), channel(self.1), channel(self.2))
    }
}

/// Linear interpolation between step colors
///
/// Stops sit at step values when every step has one, otherwise they are spread
/// evenly over 0-100. Non-percent stops are rescaled between the first and last value.
fn gradient_color(steps: &[ColorStep], level: f64, non_percent: bool) -> Option<String> {
    if steps.len() < 2 {
        return None;
    }
    let colors = steps
        .iter()
        .map(|step| Rgb::parse(&step.color))
        .collect::<Option<Vec<_>>>()?;

    let last = (steps.len() - 1) as f64;
    let mut positions: Vec<f64> = match steps.iter().map(|s| s.value).collect::<Option<Vec<_>>>() {
        Some(values) => values,
        None => (0..steps.len()).map(|i| i as f64 / last * 100.0).collect(),
    };

    let mut level = level;
    if non_percent {
        let (low, high) = (positions[0], positions[positions.len() - 1]);
        let span = high - low;
        if span <= 0.0 {
            return None;
        }
        let rescale = |v: f64| (v - low) / span * 100.0;
        positions = positions.into_iter().map(rescale).collect();
        level = rescale(level).clamp(0.0, 100.0);
    }

    if level <= positions[0] {
        return Some(colors[0].to_hex());
    }
    for (idx, window) in positions.windows(2).enumerate() {
        let (start, end) = (window[0], window[1]);
        if level <= end {
            let t = if end > start { (level - start) / (end - start) } else { 1.0 };
            return Some(colors[idx].blend(colors[idx + 1], t).to_hex());
        }
    }
    colors.last().map(|c| c.to_hex())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use fluxion_card_types::{ChargingStateConfig, EntitySettings};

    fn colored(colors: ColorSettings) -> EntityConfig {
        EntityConfig::new("sensor.x").with_settings(EntitySettings {
            colors: Some(colors),
            ..EntitySettings::default()
        })
    }

    fn gradient(steps: Vec<ColorStep>) -> EntityConfig {
        colored(ColorSettings {
            steps,
            gradient: true,
            non_percent_values: false,
        })
    }

    fn color(config: &EntityConfig, level: Option<f64>) -> String {
        get_color(config, level, false, &MemorySink::new())
    }

    #[test]
    fn test_default_thresholds() {
        let plain = EntityConfig::new("sensor.x");
        assert_eq!(color(&plain, Some(80.0)), "var(--label-badge-green)");
        assert_eq!(color(&plain, Some(55.0)), "var(--label-badge-yellow)");
        assert_eq!(color(&plain, Some(20.0)), "var(--label-badge-red)");
        assert_eq!(color(&plain, Some(0.0)), "var(--label-badge-red)");
    }

    #[test]
    fn test_invalid_level_inherits() {
        let plain = EntityConfig::new("sensor.x");
        assert_eq!(color(&plain, None), DEFAULT_COLOR);
        assert_eq!(color(&plain, Some(-5.0)), DEFAULT_COLOR);
        assert_eq!(color(&plain, Some(120.0)), DEFAULT_COLOR);
    }

    #[test]
    fn test_custom_steps() {
        let config = colored(ColorSettings {
            steps: vec![
                ColorStep::new(10.0, "red"),
                ColorStep {
                    value: None,
                    color: "blue".to_owned(),
                },
            ],
            ..ColorSettings::default()
        });
        assert_eq!(color(&config, Some(10.0)), "red");
        assert_eq!(color(&config, Some(70.0)), "blue");

        let capped = colored(ColorSettings {
            steps: vec![ColorStep::new(50.0, "red")],
            ..ColorSettings::default()
        });
        assert_eq!(color(&capped, Some(70.0)), DEFAULT_COLOR);
    }

    #[test]
    fn test_gradient_midpoint() {
        let config = gradient(vec![ColorStep::new(0.0, "#ff0000"), ColorStep::new(100.0, "#00ff00")]);
        assert_eq!(color(&config, Some(50.0)), "#7f7f00");
        assert_eq!(color(&config, Some(0.0)), "#ff0000");
        assert_eq!(color(&config, Some(100.0)), "#00ff00");
    }

    #[test]
    fn test_gradient_three_stops_without_values() {
        let config = gradient(vec![
            ColorStep { value: None, color: "#f00".to_owned() },
            ColorStep { value: None, color: "#ffff00".to_owned() },
            ColorStep { value: None, color: "#00ff00".to_owned() },
        ]);
        assert_eq!(color(&config, Some(50.0)), "#ffff00");
        assert_eq!(color(&config, Some(75.0)), "#7fff00");
    }

    #[test]
    fn test_non_percent_gradient() {
        let config = colored(ColorSettings {
            steps: vec![ColorStep::new(2.0, "#000000"), ColorStep::new(4.0, "#ffffff")],
            gradient: true,
            non_percent_values: true,
        });
        assert_eq!(color(&config, Some(3.0)), "#7f7f7f");
        assert_eq!(color(&config, Some(1.0)), "#000000");
        assert_eq!(color(&config, Some(250.0)), "#ffffff");
    }

    #[test]
    fn test_invalid_gradient_is_reported() {
        let sink = MemorySink::new();
        let config = gradient(vec![ColorStep::new(0.0, "red"), ColorStep::new(100.0, "#00ff00")]);
        assert_eq!(get_color(&config, Some(50.0), false, &sink), DEFAULT_COLOR);
        assert!(sink.contains("[COLOR]"));
    }

    #[test]
    fn test_charging_color() {
        let config = EntityConfig::new("sensor.x").with_settings(EntitySettings {
            charging_state: Some(ChargingStateConfig {
                color: Some("blue".to_owned()),
                ..ChargingStateConfig::default()
            }),
            ..EntitySettings::default()
        });
        let sink = MemorySink::new();
        assert_eq!(get_color(&config, None, true, &sink), "blue");
        assert_eq!(get_color(&config, Some(80.0), false, &sink), "var(--label-badge-green)");
    }
}
