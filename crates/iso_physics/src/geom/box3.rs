//! Axis-aligned 3D box primitive
//!
//! A `Box3` is defined by its bottom-back corner and three non-negative
//! extents. The X and Y extents are the "widths" of the footprint and the Z
//! extent is the height, matching the axonometric convention where Z is up.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Point3, Vec3};

/// Axis-aligned box defined by an origin corner and three extents.
///
/// Extents should never be set negative. A box with a zero or negative extent
/// on any axis is degenerate: it contains no point (including its own origin)
/// and intersects nothing. That is deliberate policy, not an error, so
/// callers can use zero-size boxes as sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Box3 {
    /// The x coordinate of the bottom-back corner
    pub x: f32,
    /// The y coordinate of the bottom-back corner
    pub y: f32,
    /// The z coordinate of the bottom-back corner
    pub z: f32,
    /// The X axis width (breadth)
    pub width_x: f32,
    /// The Y axis width (depth)
    pub width_y: f32,
    /// The Z axis height
    pub height: f32,
}

impl Box3 {
    /// Create a new box from its bottom-back corner and extents.
    pub fn new(x: f32, y: f32, z: f32, width_x: f32, width_y: f32, height: f32) -> Self {
        Self {
            x,
            y,
            z,
            width_x,
            width_y,
            height,
        }
    }

    /// Set all members to the specified values.
    pub fn set_to(&mut self, x: f32, y: f32, z: f32, width_x: f32, width_y: f32, height: f32) {
        self.x = x;
        self.y = y;
        self.z = z;
        self.width_x = width_x;
        self.width_y = width_y;
        self.height = height;
    }

    /// Copy the members of another box into this one.
    pub fn copy_from(&mut self, source: &Self) {
        *self = *source;
    }

    /// The far face on the X axis (`x + width_x`).
    pub fn front_x(&self) -> f32 {
        self.x + self.width_x
    }

    /// The far face on the Y axis (`y + width_y`).
    pub fn front_y(&self) -> f32 {
        self.y + self.width_y
    }

    /// The top face (`z + height`).
    pub fn top(&self) -> f32 {
        self.z + self.height
    }

    /// The near face on the X axis (the origin x).
    pub fn back_x(&self) -> f32 {
        self.x
    }

    /// The near face on the Y axis (the origin y).
    pub fn back_y(&self) -> f32 {
        self.y
    }

    /// The bottom face (the origin z).
    pub fn bottom(&self) -> f32 {
        self.z
    }

    /// Half the X extent, rounded to the nearest whole unit.
    pub fn half_width_x(&self) -> f32 {
        (self.width_x * 0.5).round()
    }

    /// Half the Y extent, rounded to the nearest whole unit.
    pub fn half_width_y(&self) -> f32 {
        (self.width_y * 0.5).round()
    }

    /// Half the height, rounded to the nearest whole unit.
    pub fn half_height(&self) -> f32 {
        (self.height * 0.5).round()
    }

    /// The center of the box, derived from the rounded half extents.
    pub fn center(&self) -> Vec3 {
        Vec3::new(
            self.x + self.half_width_x(),
            self.y + self.half_width_y(),
            self.z + self.half_height(),
        )
    }

    /// The volume of the box.
    pub fn volume(&self) -> f32 {
        self.width_x * self.width_y * self.height
    }

    /// The extents as a vector `(width_x, width_y, height)`.
    pub fn size(&self) -> Vec3 {
        Vec3::new(self.width_x, self.width_y, self.height)
    }

    /// Whether the point lies within the box (closed on all faces).
    ///
    /// Always false when any extent is not strictly positive.
    pub fn contains(&self, x: f32, y: f32, z: f32) -> bool {
        if self.width_x <= 0.0 || self.width_y <= 0.0 || self.height <= 0.0 {
            return false;
        }

        x >= self.x
            && x <= self.front_x()
            && y >= self.y
            && y <= self.front_y()
            && z >= self.z
            && z <= self.top()
    }

    /// Whether the point lies within the box.
    pub fn contains_point(&self, point: &Point3) -> bool {
        self.contains(point.x, point.y, point.z)
    }

    /// Whether two boxes overlap (separating-axis test on all three axes).
    ///
    /// Always false when either box has a non-positive extent on any axis.
    pub fn intersects(&self, b: &Self) -> bool {
        if self.width_x <= 0.0
            || self.width_y <= 0.0
            || self.height <= 0.0
            || b.width_x <= 0.0
            || b.width_y <= 0.0
            || b.height <= 0.0
        {
            return false;
        }

        !(self.front_x() < b.x
            || self.front_y() < b.y
            || self.x > b.front_x()
            || self.y > b.front_y()
            || self.z > b.top()
            || self.top() < b.z)
    }

    /// The 8 vertices of the box, bottom four first, each quad ordered by
    /// ascending y then ascending x.
    pub fn corners(&self) -> [Point3; 8] {
        let front_x = self.front_x();
        let front_y = self.front_y();
        let top = self.top();

        [
            Point3::new(self.x, self.y, self.z),
            Point3::new(self.x, self.y, top),
            Point3::new(self.x, front_y, self.z),
            Point3::new(self.x, front_y, top),
            Point3::new(front_x, self.y, self.z),
            Point3::new(front_x, self.y, top),
            Point3::new(front_x, front_y, self.z),
            Point3::new(front_x, front_y, top),
        ]
    }
}
