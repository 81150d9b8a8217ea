use crate::error::{Result, SketchpadError};

/// Straight (non-premultiplied) RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a CSS color string as sent by browser clients.
    ///
    /// Accepts `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(r,g,b)`,
    /// `rgba(r,g,b,a)` with `a` in `[0, 1]`, and a handful of named colors.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || SketchpadError::InvalidEvent(format!("Invalid color: {:?}", s));

        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(invalid);
        }

        let lower = s.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_functional(args).ok_or_else(invalid);
        }

        named(&lower).ok_or_else(invalid)
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    match hex.len() {
        3 => Some(Rgba::new(nibble(0)?, nibble(1)?, nibble(2)?, 255)),
        4 => Some(Rgba::new(nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?)),
        6 => Some(Rgba::new(byte(0)?, byte(2)?, byte(4)?, 255)),
        8 => Some(Rgba::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

fn parse_functional(args: &str) -> Option<Rgba> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();

    let channel = |s: &str| -> Option<u8> {
        let v = s.parse::<f64>().ok()?;
        v.is_finite().then(|| v.clamp(0.0, 255.0).round() as u8)
    };

    match parts.as_slice() {
        [r, g, b] => Some(Rgba::new(channel(r)?, channel(g)?, channel(b)?, 255)),
        [r, g, b, a] => {
            let alpha = a.parse::<f64>().ok().filter(|v| v.is_finite())?;
            let alpha = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
            Some(Rgba::new(channel(r)?, channel(g)?, channel(b)?, alpha))
        }
        _ => None,
    }
}

fn named(name: &str) -> Option<Rgba> {
    let color = match name {
        "black" => Rgba::new(0, 0, 0, 255),
        "white" => Rgba::new(255, 255, 255, 255),
        "red" => Rgba::new(255, 0, 0, 255),
        "green" => Rgba::new(0, 128, 0, 255),
        "blue" => Rgba::new(0, 0, 255, 255),
        "yellow" => Rgba::new(255, 255, 0, 255),
        "orange" => Rgba::new(255, 165, 0, 255),
        "purple" => Rgba::new(128, 0, 128, 255),
        "gray" | "grey" => Rgba::new(128, 128, 128, 255),
        "transparent" => Rgba::new(0, 0, 0, 0),
        _ => return None,
    };
    Some(color)
}
