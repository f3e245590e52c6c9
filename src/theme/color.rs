//! Color normalization.
//!
//! The editor expects `#RRGGBB` or `#RRGGBBAA`. Theme authors may write any of:
//!
//! - `#rgb` / `#rgba`
//! - `#rrggbb` / `#rrggbbaa`
//! - `rgb(r, g, b)` with channels in `0..=255`
//! - `rgba(r, g, b, a)` with alpha in `0.0..=1.0`
//!
//! The alpha byte is dropped when the color is fully opaque.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("`{0}` is not a recognized color")]
    Unrecognized(String),

    #[error("`{0}` has an out-of-range channel")]
    OutOfRange(String),
}

/// An RGBA color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: u8::MAX }
    }

    /// Parse any supported notation.
    pub fn parse(input: &str) -> Result<Self, ColorError> {
        let trimmed = input.trim();
        if let Some(hex) = trimmed.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(|| ColorError::Unrecognized(input.to_string()));
        }

        let lower = trimmed.to_ascii_lowercase();
        if let Some(body) = function_body(&lower, "rgba") {
            return parse_functional(body, true, input);
        }
        if let Some(body) = function_body(&lower, "rgb") {
            return parse_functional(body, false, input);
        }

        Err(ColorError::Unrecognized(input.to_string()))
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)?;
        if self.a != u8::MAX {
            write!(f, "{:02X}", self.a)?;
        }
        Ok(())
    }
}

/// Normalize a color string to the editor's hex form.
pub fn normalize(input: &str) -> Result<String, ColorError> {
    Rgba::parse(input).map(|color| color.to_string())
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let nibble = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    match hex.len() {
        3 => Some(Rgba::opaque(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(Rgba {
            r: nibble(0)?,
            g: nibble(1)?,
            b: nibble(2)?,
            a: nibble(3)?,
        }),
        6 => Some(Rgba::opaque(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Rgba {
            r: byte(0)?,
            g: byte(2)?,
            b: byte(4)?,
            a: byte(6)?,
        }),
        _ => None,
    }
}

fn function_body<'a>(lower: &'a str, name: &str) -> Option<&'a str> {
    lower
        .strip_prefix(name)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

fn parse_functional(body: &str, with_alpha: bool, input: &str) -> Result<Rgba, ColorError> {
    let unrecognized = || ColorError::Unrecognized(input.to_string());
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    let expected = if with_alpha { 4 } else { 3 };
    if parts.len() != expected {
        return Err(unrecognized());
    }

    let mut channels = [0u8; 3];
    for (slot, part) in channels.iter_mut().zip(&parts) {
        let value: f64 = part.parse().map_err(|_| unrecognized())?;
        if !(0.0..=255.0).contains(&value) {
            return Err(ColorError::OutOfRange(input.to_string()));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            *slot = value.round() as u8;
        }
    }

    let alpha = if with_alpha {
        let value: f64 = parts[3].parse().map_err(|_| unrecognized())?;
        if !(0.0..=1.0).contains(&value) {
            return Err(ColorError::OutOfRange(input.to_string()));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let byte = (value * 255.0).round() as u8;
        byte
    } else {
        u8::MAX
    };

    Ok(Rgba {
        r: channels[0],
        g: channels[1],
        b: channels[2],
        a: alpha,
    })
}
