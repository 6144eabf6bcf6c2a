use std::fmt;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Palette index assigned to a cell, or `None` when the cell is unassigned.
pub type CellColor = Option<u16>;

/// 8-bit fixed-point RGB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Colour used for unassigned cells and for palette indices that are out of range.
pub const NEUTRAL_COLOR: Rgb = Rgb::new(128, 132, 140);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }

    /// Multiplies each channel by `factor`, saturating at 255.
    pub fn scaled(self, factor: f32) -> Self {
        let factor = if factor.is_finite() {
            factor.max(0.0)
        } else {
            0.0
        };
        let scale = |channel: u8| (channel as f32 * factor).round().min(255.0) as u8;
        Self {
            r: scale(self.r),
            g: scale(self.g),
            b: scale(self.b),
        }
    }

    pub fn parse_hex(raw: &str) -> Option<Self> {
        let digits = raw.strip_prefix('#').unwrap_or(raw);
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
        Some(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RgbVisitor)
    }
}

struct RgbVisitor;

impl<'de> Visitor<'de> for RgbVisitor {
    type Value = Rgb;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a \"#rrggbb\" string or an [r, g, b] array")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Rgb, E> {
        Rgb::parse_hex(value)
            .ok_or_else(|| E::invalid_value(de::Unexpected::Str(value), &"#rrggbb"))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Rgb, A::Error> {
        let r = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let g = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        let b = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(2, &self))?;
        if seq.next_element::<de::IgnoredAny>()?.is_some() {
            return Err(de::Error::invalid_length(4, &self));
        }
        Ok(Rgb { r, g, b })
    }
}

/// Outcome of looking up a cell's colour in a palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedColor {
    Assigned(Rgb),
    Unassigned,
    OutOfRange(u16),
}

impl ResolvedColor {
    pub fn display_color(self) -> Rgb {
        match self {
            ResolvedColor::Assigned(color) => color,
            ResolvedColor::Unassigned | ResolvedColor::OutOfRange(_) => NEUTRAL_COLOR,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    pub fn new(colors: Vec<Rgb>) -> Self {
        Self { colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn get(&self, index: u16) -> Option<Rgb> {
        self.colors.get(index as usize).copied()
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn resolve(&self, cell: CellColor) -> ResolvedColor {
        match cell {
            None => ResolvedColor::Unassigned,
            Some(index) => match self.get(index) {
                Some(color) => ResolvedColor::Assigned(color),
                None => ResolvedColor::OutOfRange(index),
            },
        }
    }
}

impl From<Vec<Rgb>> for Palette {
    fn from(colors: Vec<Rgb>) -> Self {
        Self::new(colors)
    }
}
