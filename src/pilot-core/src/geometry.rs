//! Geometry types for widget positioning.
//!
//! This module provides the small set of geometry primitives the recorder needs:
//! - [`Offset`]: a signed 2D position, either on screen or relative to a widget
//! - [`Size`]: terminal or widget dimensions in character cells
//! - [`Region`]: a rectangle combining an origin and a size
//!
//! Coordinates use (0, 0) as the top-left corner, with x increasing to the
//! right and y increasing downward.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// A 2D offset with signed integer coordinates.
///
/// Offsets can be negative when a pointer position is expressed relative to a
/// widget that starts to the right of or below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Offset {
    /// The x coordinate (column).
    pub x: i32,
    /// The y coordinate (row).
    pub y: i32,
}

impl Offset {
    /// The origin (0, 0).
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Creates a new offset.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns true if both coordinates are zero.
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.x == 0 && self.y == 0
    }
}

impl Add for Offset {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Offset {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Offset {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Offset {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl From<(i32, i32)> for Offset {
    #[inline]
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl From<Offset> for (i32, i32) {
    #[inline]
    fn from(offset: Offset) -> Self {
        (offset.x, offset.y)
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width in columns.
    pub width: u16,
    /// Height in rows.
    pub height: u16,
}

impl Size {
    /// Creates a new size.
    #[inline]
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Returns true if either dimension is zero.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl From<(u16, u16)> for Size {
    #[inline]
    fn from((width, height): (u16, u16)) -> Self {
        Self::new(width, height)
    }
}

impl From<Size> for (u16, u16) {
    #[inline]
    fn from(size: Size) -> Self {
        (size.width, size.height)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A rectangular area of the screen.
///
/// The region is defined by its top-left corner (the widget's on-screen
/// origin) and its size. The right and bottom edges are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Region {
    /// The x coordinate of the left edge.
    pub x: i32,
    /// The y coordinate of the top edge.
    pub y: i32,
    /// The width of the region.
    pub width: u16,
    /// The height of the region.
    pub height: u16,
}

impl Region {
    /// Creates a new region at the given position with the given size.
    #[inline]
    pub const fn new(x: i32, y: i32, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a region at the origin covering the given size.
    #[inline]
    pub const fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    /// Returns the top-left corner of the region.
    #[inline]
    pub const fn origin(self) -> Offset {
        Offset::new(self.x, self.y)
    }

    /// Returns the size of the region.
    #[inline]
    pub const fn size(self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Returns the x coordinate of the right edge (exclusive).
    #[inline]
    pub const fn right(self) -> i32 {
        self.x + self.width as i32
    }

    /// Returns the y coordinate of the bottom edge (exclusive).
    #[inline]
    pub const fn bottom(self) -> i32 {
        self.y + self.height as i32
    }

    /// Returns true if the region has no area.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns true if the point lies inside the region.
    #[inline]
    pub const fn contains(self, point: Offset) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// Returns a copy of the region moved by `delta`.
    #[inline]
    pub fn translate(self, delta: Offset) -> Self {
        Self::new(self.x + delta.x, self.y + delta.y, self.width, self.height)
    }
}

impl From<(i32, i32, u16, u16)> for Region {
    #[inline]
    fn from((x, y, width, height): (i32, i32, u16, u16)) -> Self {
        Self::new(x, y, width, height)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Region({}, {}, {}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}
