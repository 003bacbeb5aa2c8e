//! Stage label to color mapping.
//!
//! Known stages get fixed colors. Any other label gets a color derived from
//! an FNV-1a hash of its bytes, so the same label always draws the same way.

use crate::primitives::{SPIN_STAGE, START_STAGE, WARP_STAGE, WEFT_STAGE};
use serde::{Serialize, Serializer};
use std::fmt;

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub const START_COLOR: Color = Color::rgb(0x9e, 0x9e, 0x9e);
pub const SPIN_COLOR: Color = Color::rgb(0xf5, 0xa6, 0x23);
pub const WARP_COLOR: Color = Color::rgb(0x4a, 0x90, 0xe2);
pub const WEFT_COLOR: Color = Color::rgb(0x7e, 0xd3, 0x21);

/// Ink used for captions.
pub const TEXT_COLOR: Color = Color::rgb(0x22, 0x22, 0x22);

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Color for a stage name or label.
#[must_use]
pub fn color_for(label: &str) -> Color {
    match label {
        START_STAGE => START_COLOR,
        SPIN_STAGE => SPIN_COLOR,
        WARP_STAGE => WARP_COLOR,
        WEFT_STAGE => WEFT_COLOR,
        other => hashed_color(other),
    }
}

fn hashed_color(label: &str) -> Color {
    let mut hash = FNV_OFFSET;
    for byte in label.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    // Channels stay within 48..=207.
    let channel = |shift: u32| 48 + ((hash >> shift) % 160) as u8;
    Color::rgb(channel(0), channel(16), channel(32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_stages_have_fixed_colors() {
        assert_eq!(color_for("warp"), WARP_COLOR);
        assert_eq!(color_for("start"), START_COLOR);
    }

    #[test]
    fn hashed_colors_are_stable_and_bounded() {
        let a = color_for("blue-ish");
        assert_eq!(a, color_for("blue-ish"));
        for c in [a.r, a.g, a.b] {
            assert!((48..=207).contains(&c));
        }
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(Color::rgb(0, 0x10, 0xff).to_string(), "#0010ff");
    }
}
