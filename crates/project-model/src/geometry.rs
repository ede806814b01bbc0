//! Pixel geometry: sizes, rectangles, and the aspect-preserving fit.
//!
//! All values are output-canvas pixels. Rounding uses integer arithmetic
//! (round-half-to-even) so a layout is reproducible bit-for-bit.

use serde::{Deserialize, Serialize};
use slidecast_common::error::SlidecastError;

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether this size fits inside `other` without scaling.
    pub fn fits_within(&self, other: Size) -> bool {
        self.width <= other.width && self.height <= other.height
    }
}

/// An axis-aligned rectangle on the output canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle at the origin covering `size`.
    pub const fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// Whether `other` lies entirely inside this rectangle.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// Horizontal placement inside a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HAlign {
    Left,
    Center,
    Right,
}

/// Vertical placement inside a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VAlign {
    Top,
    Center,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Alignment {
    pub horizontal: HAlign,
    pub vertical: VAlign,
}

impl Alignment {
    pub const TOP_LEFT: Alignment = Alignment::new(HAlign::Left, VAlign::Top);
    pub const TOP_RIGHT: Alignment = Alignment::new(HAlign::Right, VAlign::Top);
    pub const CENTER: Alignment = Alignment::new(HAlign::Center, VAlign::Center);

    pub const fn new(horizontal: HAlign, vertical: VAlign) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }
}

/// Degenerate fit inputs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    #[error("cannot fit a {}x{} source", .0.width, .0.height)]
    EmptySource(Size),

    #[error("cannot fit into a {}x{} box", .0.width, .0.height)]
    EmptyBox(Size),
}

impl From<GeometryError> for SlidecastError {
    fn from(err: GeometryError) -> Self {
        SlidecastError::geometry(err.to_string())
    }
}

/// Fit `source` inside `bbox`, preserving its aspect ratio.
///
/// With `shrink_only`, a source that already fits keeps its native size.
/// Otherwise the dominant axis fills the box: a source relatively wider than
/// the box takes the box width, anything else takes the box height. The
/// result is then placed inside the box according to `align`; centering
/// floors, so odd leftovers put the extra pixel after the content.
pub fn fit(
    source: Size,
    bbox: Rect,
    align: Alignment,
    shrink_only: bool,
) -> Result<Rect, GeometryError> {
    if source.is_empty() {
        return Err(GeometryError::EmptySource(source));
    }
    if bbox.size().is_empty() {
        return Err(GeometryError::EmptyBox(bbox.size()));
    }

    let (aw, ah) = (source.width as u64, source.height as u64);
    let (bw, bh) = (bbox.width as u64, bbox.height as u64);

    let (width, height) = if shrink_only && source.fits_within(bbox.size()) {
        (aw, ah)
    } else if aw * bh > ah * bw {
        // Relatively wider than the box: width-bound.
        (bw, div_round_half_even(ah * bw, aw).max(1))
    } else {
        (div_round_half_even(aw * bh, ah).max(1), bh)
    };

    let dx = match align.horizontal {
        HAlign::Left => 0,
        HAlign::Center => (bw - width) / 2,
        HAlign::Right => bw - width,
    };
    let dy = match align.vertical {
        VAlign::Top => 0,
        VAlign::Center => (bh - height) / 2,
        VAlign::Bottom => bh - height,
    };

    Ok(Rect::new(
        bbox.x + dx as i32,
        bbox.y + dy as i32,
        width as u32,
        height as u32,
    ))
}

fn div_round_half_even(num: u64, den: u64) -> u64 {
    let q = num / den;
    let r = num % den;
    match (2 * r).cmp(&den) {
        std::cmp::Ordering::Less => q,
        std::cmp::Ordering::Greater => q + 1,
        std::cmp::Ordering::Equal => q + (q & 1),
    }
}
