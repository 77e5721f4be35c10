// Theme module - Color constants and color helpers
//
// This module provides the color palette used throughout the UI and maps
// node classes and link states onto it.

use crate::graph::NodeClass;
use crate::traffic::ThreatLevel;
use ratatui::style::Color;

/// Primary accent color - used for borders, titles, ordinary links
/// RGB: (187, 154, 247)
pub const NEON_PURPLE: Color = Color::Rgb(187, 154, 247);

/// Warning color - used for the gateway and elevated threat levels
/// RGB: (255, 158, 100)
pub const PUMPKIN_ORANGE: Color = Color::Rgb(255, 158, 100);

/// Danger color - used for attackers, hostile links and errors
/// RGB: (247, 118, 142)
pub const BLOOD_RED: Color = Color::Rgb(247, 118, 142);

/// Healthy color - used for local hosts and "on" indicators
/// RGB: (158, 206, 106)
pub const TOXIC_GREEN: Color = Color::Rgb(158, 206, 106);

/// Neutral text color
/// RGB: (169, 177, 214)
pub const BONE_WHITE: Color = Color::Rgb(169, 177, 214);

/// External hosts
/// RGB: (125, 207, 255)
pub const SPECTRAL_BLUE: Color = Color::Rgb(125, 207, 255);

/// Links pushed to the background while something is focused
/// RGB: (65, 72, 104)
pub const DIM_SLATE: Color = Color::Rgb(65, 72, 104);

/// Selection highlight
/// RGB: (224, 175, 104)
pub const FOCUS_GOLD: Color = Color::Rgb(224, 175, 104);

/// Color of a node by classification
pub fn node_color(class: NodeClass) -> Color {
    match class {
        NodeClass::Gateway => PUMPKIN_ORANGE,
        NodeClass::LocalHost => TOXIC_GREEN,
        NodeClass::ExternalHost => SPECTRAL_BLUE,
        NodeClass::Attacker => BLOOD_RED,
    }
}

/// Color of a threat level indicator
pub fn threat_color(level: ThreatLevel) -> Color {
    match level {
        ThreatLevel::Low => TOXIC_GREEN,
        ThreatLevel::Medium => FOCUS_GOLD,
        ThreatLevel::High => PUMPKIN_ORANGE,
        ThreatLevel::Critical => BLOOD_RED,
    }
}

/// Color for a usage percentage: green, then orange above 60, red above 85
pub fn usage_color(percent: f64) -> Color {
    if percent > 85.0 {
        BLOOD_RED
    } else if percent > 60.0 {
        PUMPKIN_ORANGE
    } else {
        TOXIC_GREEN
    }
}

/// Interpolate between two RGB colors based on a ratio (0.0 ~ 1.0)
///
/// # Arguments
/// * `color1` - Starting color as (r, g, b) tuple
/// * `color2` - Ending color as (r, g, b) tuple
/// * `ratio` - Interpolation ratio (0.0 = color1, 1.0 = color2)
pub fn interpolate_color(color1: (u8, u8, u8), color2: (u8, u8, u8), ratio: f32) -> Color {
    let ratio = ratio.clamp(0.0, 1.0);
    let r = (color1.0 as f32 + (color2.0 as f32 - color1.0 as f32) * ratio) as u8;
    let g = (color1.1 as f32 + (color2.1 as f32 - color1.1 as f32) * ratio) as u8;
    let b = (color1.2 as f32 + (color2.2 as f32 - color1.2 as f32) * ratio) as u8;
    Color::Rgb(r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_colors_are_distinct() {
        let colors = [
            node_color(NodeClass::Gateway),
            node_color(NodeClass::LocalHost),
            node_color(NodeClass::ExternalHost),
            node_color(NodeClass::Attacker),
        ];
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(node_color(NodeClass::Attacker), BLOOD_RED);
    }

    #[test]
    fn test_interpolate_color_endpoints() {
        assert_eq!(interpolate_color((0, 0, 0), (200, 100, 50), 0.0), Color::Rgb(0, 0, 0));
        assert_eq!(
            interpolate_color((0, 0, 0), (200, 100, 50), 1.0),
            Color::Rgb(200, 100, 50)
        );
        // Out-of-range ratios are clamped
        assert_eq!(
            interpolate_color((0, 0, 0), (200, 100, 50), 3.0),
            Color::Rgb(200, 100, 50)
        );
    }

    #[test]
    fn test_usage_color_thresholds() {
        assert_eq!(usage_color(10.0), TOXIC_GREEN);
        assert_eq!(usage_color(70.0), PUMPKIN_ORANGE);
        assert_eq!(usage_color(99.0), BLOOD_RED);
    }

    #[test]
    fn test_threat_color_critical_is_red() {
        assert_eq!(threat_color(ThreatLevel::Critical), BLOOD_RED);
        assert_eq!(threat_color(ThreatLevel::Low), TOXIC_GREEN);
    }
}
