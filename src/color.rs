use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::args::Arg;

/// Straight-alpha RGBA color with every channel normalized to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Builds a color from 8-bit channels.
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            f32::from(a) / 255.0,
        )
    }

    pub fn rgb(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    fn clamped(self) -> Self {
        Self::new(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
            self.a.clamp(0.0, 1.0),
        )
    }
}

/// How numeric color channels are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColorMode {
    #[default]
    Rgb,
    Hsb,
    Hsl,
}

impl ColorMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "rgb" => Some(Self::Rgb),
            "hsb" | "hsv" => Some(Self::Hsb),
            "hsl" => Some(Self::Hsl),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Rgb => "rgb",
            Self::Hsb => "hsb",
            Self::Hsl => "hsl",
        }
    }

    /// Channel maxima a fresh resolver uses for this mode.
    pub const fn default_maxes(self) -> [f32; 4] {
        match self {
            Self::Rgb => [255.0, 255.0, 255.0, 255.0],
            Self::Hsb | Self::Hsl => [360.0, 100.0, 100.0, 1.0],
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::Rgb => 0,
            Self::Hsb => 1,
            Self::Hsl => 2,
        }
    }
}

/// The closed set of shapes a color argument list can take.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSpec {
    Gray { value: f32, alpha: Option<f32> },
    Channels { c0: f32, c1: f32, c2: f32, alpha: Option<f32> },
    Css { text: String, alpha: Option<f32> },
    Array(Vec<f32>),
    Color(Color),
}

impl ColorSpec {
    /// Classifies a positional argument list.
    pub fn from_args(args: &[Arg]) -> Result<Self, ColorError> {
        use crate::args::Arg::Number as N;
        let spec = match args {
            [N(value)] => Self::Gray {
                value: *value,
                alpha: None,
            },
            [N(value), N(alpha)] => Self::Gray {
                value: *value,
                alpha: Some(*alpha),
            },
            [N(c0), N(c1), N(c2)] => Self::Channels {
                c0: *c0,
                c1: *c1,
                c2: *c2,
                alpha: None,
            },
            [N(c0), N(c1), N(c2), N(alpha)] => Self::Channels {
                c0: *c0,
                c1: *c1,
                c2: *c2,
                alpha: Some(*alpha),
            },
            [Arg::Str(text)] => Self::Css {
                text: text.clone(),
                alpha: None,
            },
            [Arg::Str(text), N(alpha)] => Self::Css {
                text: text.clone(),
                alpha: Some(*alpha),
            },
            [Arg::Array(values)] => Self::Array(values.clone()),
            [Arg::Color(color)] => Self::Color(*color),
            _ => return Err(ColorError::UnsupportedArguments(describe(args))),
        };
        Ok(spec)
    }
}

fn describe(args: &[Arg]) -> String {
    if args.is_empty() {
        return "no arguments".to_string();
    }
    args.iter()
        .map(Arg::type_name)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ColorError {
    #[error("unsupported color arguments ({0})")]
    UnsupportedArguments(String),
    #[error("unrecognized color string `{0}`")]
    UnknownColorString(String),
    #[error("color arrays take 1 to 4 entries, got {0}")]
    ArrayLength(usize),
    #[error("color channel maximum must be positive and finite, got {0}")]
    InvalidMaximum(f32),
}

/// Normalizes color arguments against the active color mode and ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorResolver {
    mode: ColorMode,
    maxes: [[f32; 4]; 3],
}

impl Default for ColorResolver {
    fn default() -> Self {
        Self {
            mode: ColorMode::Rgb,
            maxes: [
                ColorMode::Rgb.default_maxes(),
                ColorMode::Hsb.default_maxes(),
                ColorMode::Hsl.default_maxes(),
            ],
        }
    }
}

impl ColorResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    /// Channel maxima of the active mode.
    pub fn maxes(&self) -> [f32; 4] {
        self.maxes[self.mode.slot()]
    }

    /// Channel maxima `mode` would use if it were switched to.
    pub fn maxes_for(&self, mode: ColorMode) -> [f32; 4] {
        self.maxes[mode.slot()]
    }

    /// Switches mode, keeping whatever maxima that mode was last given.
    pub fn set_mode(&mut self, mode: ColorMode) {
        self.mode = mode;
    }

    /// Switches mode and uses `max` for every channel, alpha included.
    pub fn set_mode_with_max(&mut self, mode: ColorMode, max: f32) -> Result<(), ColorError> {
        self.set_mode_with_maxes(mode, [max; 4])
    }

    pub fn set_mode_with_maxes(
        &mut self,
        mode: ColorMode,
        maxes: [f32; 4],
    ) -> Result<(), ColorError> {
        if let Some(bad) = maxes.iter().find(|max| !(max.is_finite() && **max > 0.0)) {
            return Err(ColorError::InvalidMaximum(*bad));
        }
        self.mode = mode;
        self.maxes[mode.slot()] = maxes;
        Ok(())
    }

    /// Resolves a positional argument list in one step.
    pub fn resolve_args(&self, args: &[Arg]) -> Result<Color, ColorError> {
        self.resolve(&ColorSpec::from_args(args)?)
    }

    pub fn resolve(&self, spec: &ColorSpec) -> Result<Color, ColorError> {
        let maxes = self.maxes();
        let color = match spec {
            ColorSpec::Gray { value, alpha } => {
                let level = value / maxes[2];
                Color::new(level, level, level, self.alpha(*alpha))
            }
            ColorSpec::Channels { c0, c1, c2, alpha } => {
                let a = self.alpha(*alpha);
                let (c0, c1, c2) = (c0 / maxes[0], c1 / maxes[1], c2 / maxes[2]);
                match self.mode {
                    ColorMode::Rgb => Color::new(c0, c1, c2, a),
                    ColorMode::Hsb => {
                        let [r, g, b] = hsb_to_rgb(c0, c1, c2);
                        Color::new(r, g, b, a)
                    }
                    ColorMode::Hsl => {
                        let [r, g, b] = hsl_to_rgb(c0, c1, c2);
                        Color::new(r, g, b, a)
                    }
                }
            }
            ColorSpec::Css { text, alpha } => {
                let parsed = parse_css(text)?;
                match alpha {
                    Some(alpha) => Color {
                        a: alpha / maxes[3],
                        ..parsed
                    },
                    None => parsed,
                }
            }
            ColorSpec::Array(values) => {
                let spec = match values.as_slice() {
                    [value] => ColorSpec::Gray {
                        value: *value,
                        alpha: None,
                    },
                    [value, alpha] => ColorSpec::Gray {
                        value: *value,
                        alpha: Some(*alpha),
                    },
                    [c0, c1, c2] => ColorSpec::Channels {
                        c0: *c0,
                        c1: *c1,
                        c2: *c2,
                        alpha: None,
                    },
                    [c0, c1, c2, alpha] => ColorSpec::Channels {
                        c0: *c0,
                        c1: *c1,
                        c2: *c2,
                        alpha: Some(*alpha),
                    },
                    other => return Err(ColorError::ArrayLength(other.len())),
                };
                return self.resolve(&spec);
            }
            ColorSpec::Color(color) => *color,
        };
        Ok(color.clamped())
    }

    fn alpha(&self, alpha: Option<f32>) -> f32 {
        alpha.map_or(1.0, |alpha| alpha / self.maxes()[3])
    }
}

fn hsb_to_rgb(hue: f32, saturation: f32, brightness: f32) -> [f32; 3] {
    if saturation <= 0.0 {
        return [brightness; 3];
    }
    let sector = hue.rem_euclid(1.0) * 6.0;
    let index = sector.floor();
    let fraction = sector - index;
    let p = brightness * (1.0 - saturation);
    let q = brightness * (1.0 - saturation * fraction);
    let t = brightness * (1.0 - saturation * (1.0 - fraction));
    match index as u8 {
        0 => [brightness, t, p],
        1 => [q, brightness, p],
        2 => [p, brightness, t],
        3 => [p, q, brightness],
        4 => [t, p, brightness],
        _ => [brightness, p, q],
    }
}

fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> [f32; 3] {
    let brightness = lightness + saturation * lightness.min(1.0 - lightness);
    let saturation = if brightness <= 0.0 {
        0.0
    } else {
        2.0 * (1.0 - lightness / brightness)
    };
    hsb_to_rgb(hue, saturation, brightness)
}

fn parse_css(text: &str) -> Result<Color, ColorError> {
    let trimmed = text.trim();
    let unknown = || ColorError::UnknownColorString(text.to_string());
    if let Some(hex) = trimmed.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(unknown);
    }
    let lower = trimmed.to_ascii_lowercase();
    if let Some(body) = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
    {
        let body = body.strip_suffix(')').ok_or_else(unknown)?;
        return parse_rgb_function(body).ok_or_else(unknown);
    }
    named_color(&lower).ok_or_else(unknown)
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |index: usize| u8::from_str_radix(&hex[index..=index], 16).ok().map(|v| v * 17);
    let byte = |index: usize| u8::from_str_radix(&hex[index..index + 2], 16).ok();
    match hex.len() {
        3 => Some(Color::from_rgba8(nibble(0)?, nibble(1)?, nibble(2)?, 255)),
        4 => Some(Color::from_rgba8(nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?)),
        6 => Some(Color::from_rgba8(byte(0)?, byte(2)?, byte(4)?, 255)),
        8 => Some(Color::from_rgba8(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

fn parse_rgb_function(body: &str) -> Option<Color> {
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    let channel = |part: &str| -> Option<f32> {
        match part.strip_suffix('%') {
            Some(percent) => percent.parse::<f32>().ok().map(|p| p / 100.0),
            None => part.parse::<f32>().ok().map(|v| v / 255.0),
        }
    };
    let (r, g, b, a) = match parts.as_slice() {
        [r, g, b] => (channel(r)?, channel(g)?, channel(b)?, 1.0),
        [r, g, b, a] => (channel(r)?, channel(g)?, channel(b)?, a.parse::<f32>().ok()?),
        _ => return None,
    };
    Some(Color::new(r, g, b, a).clamped())
}

fn named_color(name: &str) -> Option<Color> {
    let [r, g, b] = match name {
        "black" => [0, 0, 0],
        "white" => [255, 255, 255],
        "red" => [255, 0, 0],
        "green" => [0, 128, 0],
        "lime" => [0, 255, 0],
        "blue" => [0, 0, 255],
        "yellow" => [255, 255, 0],
        "cyan" | "aqua" => [0, 255, 255],
        "magenta" | "fuchsia" => [255, 0, 255],
        "gray" | "grey" => [128, 128, 128],
        "silver" => [192, 192, 192],
        "maroon" => [128, 0, 0],
        "olive" => [128, 128, 0],
        "purple" => [128, 0, 128],
        "teal" => [0, 128, 128],
        "navy" => [0, 0, 128],
        "orange" => [255, 165, 0],
        "pink" => [255, 192, 203],
        "brown" => [165, 42, 42],
        "gold" => [255, 215, 0],
        "indigo" => [75, 0, 130],
        "violet" => [238, 130, 238],
        "coral" => [255, 127, 80],
        "salmon" => [250, 128, 114],
        "skyblue" => [135, 206, 235],
        "transparent" => return Some(Color::new(0.0, 0.0, 0.0, 0.0)),
        _ => return None,
    };
    Some(Color::from_rgba8(r, g, b, 255))
}
