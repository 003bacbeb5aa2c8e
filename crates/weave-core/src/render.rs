//! # Render View
//!
//! Stateless projection of fiber state into drawing instructions.
//!
//! Nothing here mutates a fiber or keeps animation state; a renderer
//! (canvas, SVG, terminal) consumes the instruction list as it likes.
//!
//! Layout, all in integer canvas units:
//! - `Warp` fibers are vertical lines at `x = spacing * (slot + 1)`
//! - `Weft` fibers are horizontal lines at `y = spacing * (slot + 1)`
//! - `Plain` fibers run diagonally from `(0, spacing * slot)` to `(width, height)`
//!
//! Each line is split into one stroke per history entry, colored by the
//! entry's label. Markers become dots spread along the line and the current
//! stage tag is captioned at its end.

use crate::palette::{Color, TEXT_COLOR, color_for};
use crate::primitives::MAX_CANVAS_EXTENT;
use crate::{Fiber, Loom, Role, WeaveError};
use serde::{Deserialize, Serialize};

/// Canvas geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: i64,
    pub height: i64,
    /// Distance between neighbouring fibers of the same role.
    pub spacing: i64,
    /// Stroke width.
    pub stroke: i64,
}

impl RenderConfig {
    /// Check that every dimension is positive and at most `MAX_CANVAS_EXTENT`.
    pub fn validate(&self) -> Result<(), WeaveError> {
        for (name, value) in [
            ("width", self.width),
            ("height", self.height),
            ("spacing", self.spacing),
            ("stroke", self.stroke),
        ] {
            if value <= 0 || value > MAX_CANVAS_EXTENT {
                return Err(WeaveError::InvalidArgument(format!(
                    "render {} must be in 1..={}, got {}",
                    name, MAX_CANVAS_EXTENT, value
                )));
            }
        }
        Ok(())
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            spacing: 40,
            stroke: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    #[must_use]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// The point `num / den` of the way from `self` to `to`.
    ///
    /// Saturates instead of overflowing; a zero `den` yields `self`.
    fn lerp(self, to: Self, num: i64, den: i64) -> Self {
        let step = |from: i64, to: i64| {
            let offset = to
                .saturating_sub(from)
                .saturating_mul(num)
                .checked_div(den)
                .unwrap_or(0);
            from.saturating_add(offset)
        };
        Self {
            x: step(self.x, to.x),
            y: step(self.y, to.y),
        }
    }
}

/// A single drawing step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawInstruction {
    Stroke {
        fiber: String,
        from: Point,
        to: Point,
        color: Color,
        width: i64,
    },
    Dot {
        fiber: String,
        at: Point,
        radius: i64,
        color: Color,
        marker: String,
    },
    Text {
        fiber: String,
        at: Point,
        text: String,
        color: Color,
    },
}

/// End points of a fiber's line for its role and slot.
fn endpoints(role: Role, slot: usize, config: &RenderConfig) -> (Point, Point) {
    let slot = i64::try_from(slot).unwrap_or(i64::MAX);
    match role {
        Role::Warp => {
            let x = config.spacing.saturating_mul(slot.saturating_add(1));
            (Point::new(x, 0), Point::new(x, config.height))
        }
        Role::Weft => {
            let y = config.spacing.saturating_mul(slot.saturating_add(1));
            (Point::new(0, y), Point::new(config.width, y))
        }
        Role::Plain => {
            let y = config.spacing.saturating_mul(slot).min(config.height);
            (Point::new(0, y), Point::new(config.width, config.height))
        }
    }
}

/// Draw one fiber at the given slot within its role.
#[must_use]
pub fn render_fiber(fiber: &Fiber, slot: usize, config: &RenderConfig) -> Vec<DrawInstruction> {
    let (start, end) = endpoints(fiber.role(), slot, config);
    let id = fiber.id().as_str();
    let history = fiber.history();
    let markers = fiber.markers();
    let segments = i64::try_from(history.len()).unwrap_or(i64::MAX);
    let dots = i64::try_from(markers.len()).unwrap_or(i64::MAX);

    let mut out = Vec::with_capacity(history.len() + markers.len() + 1);

    for (i, entry) in (0_i64..).zip(history) {
        out.push(DrawInstruction::Stroke {
            fiber: id.to_string(),
            from: start.lerp(end, i, segments),
            to: start.lerp(end, i + 1, segments),
            color: color_for(entry.label.as_str()),
            width: config.stroke,
        });
    }

    for (j, marker) in (1_i64..).zip(markers) {
        out.push(DrawInstruction::Dot {
            fiber: id.to_string(),
            at: start.lerp(end, j, dots.saturating_add(1)),
            radius: config.stroke.saturating_mul(2),
            color: color_for(marker.as_str()),
            marker: marker.as_str().to_string(),
        });
    }

    out.push(DrawInstruction::Text {
        fiber: id.to_string(),
        at: end,
        text: fiber.stage_tag().as_str().to_string(),
        color: TEXT_COLOR,
    });

    out
}

/// Draw every fiber of a loom.
///
/// Slots are assigned per role in fiber id order, so the output is
/// deterministic for a given loom.
#[must_use]
pub fn render_loom(loom: &Loom, config: &RenderConfig) -> Vec<DrawInstruction> {
    let mut warp = 0;
    let mut weft = 0;
    let mut plain = 0;
    let mut out = Vec::new();

    for fiber in loom.fibers() {
        let counter = match fiber.role() {
            Role::Warp => &mut warp,
            Role::Weft => &mut weft,
            Role::Plain => &mut plain,
        };
        out.extend(render_fiber(fiber, *counter, config));
        *counter += 1;
    }

    out
}

// =============================================================================
// TESTS
// =============================================================================
