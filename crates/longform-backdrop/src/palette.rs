#![forbid(unsafe_code)]

//! Color palettes for the backdrop variants.
//!
//! Particle colors are theme-independent; star colors and the night-sky
//! gradient follow the color mode.

use crate::color::Rgba;

/// Vivid particle colors, used in both modes.
pub const PARTICLE_COLORS: [Rgba; 7] = [
    Rgba::rgb(0xFF, 0x6B, 0x6B),
    Rgba::rgb(0x4E, 0xCD, 0xC4),
    Rgba::rgb(0x45, 0xB7, 0xD1),
    Rgba::rgb(0x96, 0xCE, 0xB4),
    Rgba::rgb(0xFE, 0xCA, 0x57),
    Rgba::rgb(0xFF, 0x9F, 0xF3),
    Rgba::rgb(0x54, 0xA0, 0xFF),
];

/// Star colors against a dark sky: white through warm and cool tints.
pub const STAR_COLORS_DARK: [Rgba; 5] = [
    Rgba::rgb(0xFF, 0xFF, 0xFF),
    Rgba::rgb(0xFE, 0xF3, 0xC7),
    Rgba::rgb(0xDD, 0xD6, 0xFE),
    Rgba::rgb(0xBF, 0xDB, 0xFE),
    Rgba::rgb(0xC7, 0xD2, 0xFE),
];

/// Star colors against a light page: slate greys.
pub const STAR_COLORS_LIGHT: [Rgba; 5] = [
    Rgba::rgb(0x64, 0x74, 0x8B),
    Rgba::rgb(0x94, 0xA3, 0xB8),
    Rgba::rgb(0xCB, 0xD5, 0xE1),
    Rgba::rgb(0xE2, 0xE8, 0xF0),
    Rgba::rgb(0xF8, 0xFA, 0xFC),
];

/// Connection line color between nearby particles.
pub const LINK_LINE: Rgba = Rgba::rgb(0x00, 0xD2, 0xFF);

/// Shooting star head and trail color.
pub const SHOOTING_STAR: Rgba = Rgba::WHITE;

/// Night-sky gradient stops, top to bottom, drawn only in dark mode.
/// Slate-900 through slate-700 with fading opacity.
pub const NIGHT_GRADIENT: [(f32, Rgba); 3] = [
    (0.0, Rgba::rgba(0x0F, 0x17, 0x2A, 153)),
    (0.5, Rgba::rgba(0x1E, 0x29, 0x3B, 102)),
    (1.0, Rgba::rgba(0x33, 0x41, 0x55, 51)),
];

/// Color mode of the page behind the backdrop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Dark page; bright entities, night gradient on.
    #[default]
    Dark,
    /// Light page; muted entities, no gradient.
    Light,
}

/// Resolved palette for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Palette {
    /// Current color mode.
    pub mode: Mode,
}

impl Palette {
    /// Palette for the given mode.
    #[must_use]
    pub const fn new(mode: Mode) -> Self {
        Self { mode }
    }

    /// Dark-mode palette.
    #[must_use]
    pub const fn dark() -> Self {
        Self::new(Mode::Dark)
    }

    /// Light-mode palette.
    #[must_use]
    pub const fn light() -> Self {
        Self::new(Mode::Light)
    }

    /// Whether the night gradient and bright stars apply.
    pub fn is_dark(&self) -> bool {
        matches!(self.mode, Mode::Dark)
    }

    /// Particle colors (same in both modes).
    pub fn particle_colors(&self) -> &'static [Rgba; 7] {
        &PARTICLE_COLORS
    }

    /// Star colors for the current mode.
    pub fn star_colors(&self) -> &'static [Rgba; 5] {
        match self.mode {
            Mode::Dark => &STAR_COLORS_DARK,
            Mode::Light => &STAR_COLORS_LIGHT,
        }
    }

    /// Gradient stops for the sky, present only in dark mode.
    pub fn night_gradient(&self) -> Option<&'static [(f32, Rgba); 3]> {
        match self.mode {
            Mode::Dark => Some(&NIGHT_GRADIENT),
            Mode::Light => None,
        }
    }
}
