use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Four RGB colours indexed by 2-bit pixel value; index 0 is the lightest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    #[serde(default)]
    pub name: Option<String>,
    pub colors: [[u8; 3]; 4],
}

const GREYSCALE_COLORS: [[u8; 3]; 4] = [
    [0xff, 0xff, 0xff],
    [0xaa, 0xaa, 0xaa],
    [0x55, 0x55, 0x55],
    [0x00, 0x00, 0x00],
];
const GBC_LIGHT: [u8; 3] = [0xff, 0xff, 0xff];
const GBC_DARK: [u8; 3] = [0x00, 0x00, 0x00];
const SGB_LIGHT: [u8; 3] = [0xff, 0xef, 0xff];
const SGB_DARK: [u8; 3] = [0x19, 0x10, 0x10];

#[rustfmt::skip]
const PRESETS: &[(&str, [[u8; 3]; 4])] = &[
    ("greyscale",  GREYSCALE_COLORS),
    ("dmg",        [[0xb8, 0xf8, 0x78], [0x80, 0xb0, 0x50], [0x48, 0x68, 0x28], [0x10, 0x20, 0x00]]),
    ("gbc-red",    [GBC_LIGHT, [0xff, 0x84, 0x84], [0x94, 0x3a, 0x3a], GBC_DARK]),
    ("gbc-blue",   [GBC_LIGHT, [0x63, 0xa5, 0xff], [0x00, 0x00, 0xff], GBC_DARK]),
    ("gbc-green",  [GBC_LIGHT, [0x7b, 0xff, 0x31], [0x00, 0x63, 0xc5], GBC_DARK]),
    ("gbc-yellow", [GBC_LIGHT, [0xff, 0xff, 0x00], [0xff, 0x00, 0x00], GBC_DARK]),
    ("sgb-green",  [SGB_LIGHT, [0xa5, 0xd6, 0x84], [0x4a, 0xa5, 0x5a], SGB_DARK]),
    ("sgb-red",    [SGB_LIGHT, [0xff, 0xa5, 0x52], [0xd6, 0x52, 0x31], SGB_DARK]),
    ("sgb-cyan",   [SGB_LIGHT, [0xad, 0xce, 0xef], [0x73, 0x9c, 0xce], SGB_DARK]),
    ("sgb-yellow", [SGB_LIGHT, [0xff, 0xe6, 0x73], [0xd6, 0xa5, 0x00], SGB_DARK]),
    ("sgb-brown",  [SGB_LIGHT, [0xe6, 0xa5, 0x7b], [0xad, 0x73, 0x4a], SGB_DARK]),
    ("sgb-gray",   [SGB_LIGHT, [0xd6, 0xad, 0xb5], [0x7b, 0x7b, 0x94], SGB_DARK]),
    ("sgb-purple", [SGB_LIGHT, [0xde, 0xb5, 0xc5], [0xad, 0x7b, 0xbd], SGB_DARK]),
    ("sgb-blue",   [SGB_LIGHT, [0x94, 0xa5, 0xde], [0x5a, 0x7b, 0xbd], SGB_DARK]),
    ("sgb-pink",   [SGB_LIGHT, [0xf7, 0xb5, 0xc5], [0xe6, 0x7b, 0xad], SGB_DARK]),
    ("sgb-mew",    [SGB_LIGHT, [0xf7, 0xb5, 0x8c], [0x84, 0x73, 0x9c], SGB_DARK]),
];

impl Palette {
    pub const GREYSCALE: Palette = Palette {
        name: None,
        colors: GREYSCALE_COLORS,
    };

    /// Look up a built-in palette (case-insensitive).
    pub fn named(name: &str) -> Option<Self> {
        PRESETS
            .iter()
            .find(|(preset, _)| preset.eq_ignore_ascii_case(name))
            .map(|(preset, colors)| Palette {
                name: Some(preset.to_string()),
                colors: *colors,
            })
    }

    pub fn preset_names() -> impl Iterator<Item = &'static str> {
        PRESETS.iter().map(|(name, _)| *name)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context("parsing palette JSON")
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("reading palette {}", path.display()))?;
        Self::from_json(&bytes).with_context(|| format!("loading palette {}", path.display()))
    }

    #[inline]
    pub fn color(&self, index: u8) -> [u8; 3] {
        self.colors[(index & 0b11) as usize]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette::GREYSCALE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_resolve_by_name() {
        let dmg = Palette::named("DMG").expect("dmg preset");
        assert_eq!(dmg.name.as_deref(), Some("dmg"));
        assert_eq!(dmg.color(0), [0xb8, 0xf8, 0x78]);
        assert_eq!(Palette::named("sgb-mew").unwrap().color(3), [0x19, 0x10, 0x10]);
        assert!(Palette::named("vaporwave").is_none());
        assert_eq!(Palette::preset_names().count(), 16);
        assert_eq!(Palette::default().colors, Palette::named("greyscale").unwrap().colors);
    }

    #[test]
    fn parses_custom_palette_json() {
        let palette = Palette::from_json(
            br#"{"colors": [[255, 255, 255], [200, 0, 0], [100, 0, 0], [0, 0, 0]]}"#,
        )
        .unwrap();
        assert_eq!(palette.name, None);
        assert_eq!(palette.color(1), [200, 0, 0]);
        assert_eq!(palette.color(7), [0, 0, 0]);

        assert!(Palette::from_json(br#"{"colors": [[1, 2, 3]]}"#).is_err());
    }
}
