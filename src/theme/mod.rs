use std::fmt;

use serde::Serialize;

use crate::utils::{format_hex_color, parse_hex_color};

pub const DEFAULT_ACCENT: &str = "slate";
pub const MAX_ACCENT_SHIFT: i32 = 50;

pub const ACCENT_PALETTE: &[(&str, &str)] = &[
    ("slate", "#64748b"),
    ("blue", "#0a84ff"),
    ("green", "#30d158"),
    ("purple", "#bf5af2"),
    ("orange", "#ff9f0a"),
    ("pink", "#ff375f"),
    ("teal", "#40c8e0"),
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Auto,
}

impl Theme {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            "auto" | "system" => Some(Self::Auto),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::Auto => "auto",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            _ => Self::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A palette token or a custom hex color.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum Accent {
    Palette(&'static str),
    Custom(String),
}

impl Default for Accent {
    fn default() -> Self {
        Self::Palette(DEFAULT_ACCENT)
    }
}

impl From<Accent> for String {
    fn from(value: Accent) -> Self {
        value.token().to_string()
    }
}

impl Accent {
    pub fn parse(value: &str) -> Result<Self, String> {
        let raw = value.trim();
        let lower = raw.to_lowercase();
        if let Some((name, _)) = ACCENT_PALETTE.iter().find(|(name, _)| *name == lower) {
            return Ok(Self::Palette(*name));
        }
        if raw.starts_with('#') {
            let (r, g, b) = parse_hex_color(raw)?;
            return Ok(Self::Custom(format_hex_color(r, g, b)));
        }
        let names: Vec<&str> = ACCENT_PALETTE.iter().map(|(name, _)| *name).collect();
        Err(format!(
            "unknown accent '{raw}', expected a hex color or one of: {}",
            names.join(", ")
        ))
    }

    /// Value as persisted.
    pub fn token(&self) -> &str {
        match self {
            Self::Palette(name) => name,
            Self::Custom(hex) => hex.as_str(),
        }
    }

    pub fn hex(&self) -> &str {
        match self {
            Self::Palette(name) => ACCENT_PALETTE
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, hex)| *hex)
                .unwrap_or("#64748b"),
            Self::Custom(hex) => hex.as_str(),
        }
    }
}

pub fn clamp_shift(shift: i32) -> i32 {
    shift.clamp(-MAX_ACCENT_SHIFT, MAX_ACCENT_SHIFT)
}

/// Brightens or darkens every channel by `shift * 2`.
pub fn shifted_accent(accent: &Accent, shift: i32) -> String {
    let (r, g, b) = match parse_hex_color(accent.hex()) {
        Ok(rgb) => rgb,
        Err(_) => return accent.hex().to_string(),
    };
    let delta = clamp_shift(shift) * 2;
    let adjust = |c: u8| (i32::from(c) + delta).clamp(0, 255) as u8;
    format_hex_color(adjust(r), adjust(g), adjust(b))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ThemeAttributes {
    pub data_theme: &'static str,
    pub dark_class: bool,
    pub accent: String,
    pub accent_strong: String,
}

pub fn theme_attributes(theme: Theme, accent: &Accent, shift: i32) -> ThemeAttributes {
    ThemeAttributes {
        data_theme: theme.as_str(),
        dark_class: theme == Theme::Dark,
        accent: accent.hex().to_string(),
        accent_strong: shifted_accent(accent, shift),
    }
}

impl ThemeAttributes {
    pub fn css_variables(&self) -> String {
        format!(
            "--accent: {}; --accent-strong: {};",
            self.accent, self.accent_strong
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_dark_and_promotes_others_to_dark() {
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::Auto.toggled(), Theme::Dark);
    }

    #[test]
    fn accent_parses_palette_and_custom_hex() {
        assert_eq!(Accent::parse("Blue").unwrap(), Accent::Palette("blue"));
        assert_eq!(
            Accent::parse("#ABC").unwrap(),
            Accent::Custom("#aabbcc".to_string())
        );
        assert!(Accent::parse("chartreuse").is_err());
    }

    #[test]
    fn shifted_accent_clamps_channels() {
        let accent = Accent::Custom("#f0f0f0".to_string());
        assert_eq!(shifted_accent(&accent, 50), "#ffffff");
        assert_eq!(shifted_accent(&accent, 0), "#f0f0f0");
        let dark = Accent::Custom("#101010".to_string());
        assert_eq!(shifted_accent(&dark, -50), "#000000");
    }

    #[test]
    fn attributes_mark_dark_theme() {
        let attrs = theme_attributes(Theme::Dark, &Accent::default(), 0);
        assert_eq!(attrs.data_theme, "dark");
        assert!(attrs.dark_class);
        assert_eq!(attrs.accent, "#64748b");
        assert!(attrs.css_variables().contains("--accent-strong: #64748b"));
    }
}
