use crate::foundation::core::Rgb8;
use serde::{Deserialize, Serialize};

/// A gradient color as written in configuration, channels normalized to `0..=1`.
///
/// Accepted JSON forms:
/// - `"#RRGGBB"` / `"#RRGGBBAA"`
/// - `"rgb(r, g, b)"` / `"rgba(r, g, b, a)"` with `0..=255` color channels and `0..=1` alpha
/// - `{"r": .., "g": .., "b": .., "a": ..}` with `0..=1` channels (`a` optional)
/// - `[r, g, b]` / `[r, g, b, a]` with `0..=1` channels
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorDef {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl ColorDef {
    pub fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Quantize to straight RGB8. Alpha is dropped; palettes carry color only.
    pub fn to_rgb8(self) -> Rgb8 {
        fn to_u8(x: f64) -> u8 {
            (x.clamp(0.0, 1.0) * 255.0).round() as u8
        }

        Rgb8::new(to_u8(self.r), to_u8(self.g), to_u8(self.b))
    }

    /// Parse a string color (`#hex`, `rgb()` or `rgba()`).
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if let Some(args) = strip_fn(s, "rgba") {
            return parse_css_channels(args, true);
        }
        if let Some(args) = strip_fn(s, "rgb") {
            return parse_css_channels(args, false);
        }
        parse_hex(s)
    }
}

impl<'de> Deserialize<'de> for ColorDef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Str(String),
            RgbaObj {
                r: f64,
                g: f64,
                b: f64,
                #[serde(default = "one")]
                a: f64,
            },
            Arr(Vec<f64>),
        }

        fn one() -> f64 {
            1.0
        }

        match Repr::deserialize(deserializer)? {
            Repr::Str(s) => Self::parse(&s).map_err(serde::de::Error::custom),
            Repr::RgbaObj { r, g, b, a } => Ok(Self::rgba(r, g, b, a)),
            Repr::Arr(v) => match v.as_slice() {
                [r, g, b] => Ok(Self::rgba(*r, *g, *b, 1.0)),
                [r, g, b, a] => Ok(Self::rgba(*r, *g, *b, *a)),
                _ => Err(serde::de::Error::custom(
                    "rgba array must have len 3 ([r,g,b]) or 4 ([r,g,b,a])",
                )),
            },
        }
    }
}

fn strip_fn<'a>(s: &'a str, name: &str) -> Option<&'a str> {
    let head = s.get(..name.len())?;
    if !head.eq_ignore_ascii_case(name) {
        return None;
    }
    s[name.len()..]
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

fn parse_css_channels(args: &str, with_alpha: bool) -> Result<ColorDef, String> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    let expected = if with_alpha { 4 } else { 3 };
    if parts.len() != expected {
        return Err(format!(
            "expected {expected} comma-separated channels, got {}",
            parts.len()
        ));
    }

    let mut rgb = [0.0f64; 3];
    for (dst, part) in rgb.iter_mut().zip(&parts) {
        let v: f64 = part
            .parse()
            .map_err(|_| format!("invalid color channel \"{part}\""))?;
        if !(0.0..=255.0).contains(&v) {
            return Err(format!("color channel {v} out of range 0..=255"));
        }
        *dst = v / 255.0;
    }

    let a = if with_alpha {
        let part = parts[3];
        let v: f64 = part
            .parse()
            .map_err(|_| format!("invalid alpha channel \"{part}\""))?;
        if !(0.0..=1.0).contains(&v) {
            return Err(format!("alpha channel {v} out of range 0..=1"));
        }
        v
    } else {
        1.0
    };

    Ok(ColorDef::rgba(rgb[0], rgb[1], rgb[2], a))
}

fn parse_hex(s: &str) -> Result<ColorDef, String> {
    let s = s.strip_prefix('#').unwrap_or(s);

    fn hex_byte(pair: &str) -> Result<u8, String> {
        u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
    }

    if !s.is_ascii() {
        return Err("hex color must be ASCII".to_owned());
    }

    let (r, g, b, a) = match s.len() {
        6 => (
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
            255,
        ),
        8 => (
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
            hex_byte(&s[6..8])?,
        ),
        _ => {
            return Err(
                "color must be #RRGGBB, #RRGGBBAA, rgb(r,g,b) or rgba(r,g,b,a)".to_owned(),
            );
        }
    };

    Ok(ColorDef::rgba(
        f64::from(r) / 255.0,
        f64::from(g) / 255.0,
        f64::from(b) / 255.0,
        f64::from(a) / 255.0,
    ))
}
