//! Physics body: an axis-aligned box with motion state and collision flags
//!
//! A [`Body`] is the unit the [`crate::physics::World`] operates on. The
//! world never owns bodies; the host keeps them (typically one per scene
//! object, in a slice for group operations) and hands them to the world each
//! step.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::foundation::math::Vec3;
use crate::geom::Box3;

/// Per-direction collision enable mask.
///
/// Disabling a direction opts the corresponding face out of collision: for
/// example `down = false` means nothing can collide with this body's bottom
/// face (and a body cannot hit the world floor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionFlags {
    /// Top face (+z)
    pub up: bool,
    /// Bottom face (-z)
    pub down: bool,
    /// Far X face (+x)
    pub front_x: bool,
    /// Far Y face (+y)
    pub front_y: bool,
    /// Near X face (-x)
    pub back_x: bool,
    /// Near Y face (-y)
    pub back_y: bool,
}

impl Default for CollisionFlags {
    fn default() -> Self {
        Self {
            up: true,
            down: true,
            front_x: true,
            front_y: true,
            back_x: true,
            back_y: true,
        }
    }
}

/// Per-direction record of which face registered a resolved collision most
/// recently. `none` is true while no face is touching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Touching {
    /// No face is currently touching
    pub none: bool,
    /// Top face (+z)
    pub up: bool,
    /// Bottom face (-z)
    pub down: bool,
    /// Far X face (+x)
    pub front_x: bool,
    /// Far Y face (+y)
    pub front_y: bool,
    /// Near X face (-x)
    pub back_x: bool,
    /// Near Y face (-y)
    pub back_y: bool,
}

impl Default for Touching {
    fn default() -> Self {
        Self {
            none: true,
            up: false,
            down: false,
            front_x: false,
            front_y: false,
            back_x: false,
            back_y: false,
        }
    }
}

/// Raised when a body carries values the simulation cannot work with.
///
/// These indicate a host-side bug (uninitialized or corrupted fields); the
/// simulation itself never produces them from valid input.
#[derive(Debug, Error)]
pub enum BodyError {
    /// A numeric field is NaN or infinite
    #[error("body field `{0}` is not finite")]
    NonFinite(&'static str),

    /// Mass must stay strictly positive for the impulse math
    #[error("body mass must be > 0, got {0}")]
    NonPositiveMass(f32),
}

/// An axis-aligned physics body.
///
/// Positions are the bottom-back corner, matching [`Box3`]. Velocity,
/// acceleration, drag and bounce are per-axis. `prev` snapshots the position
/// at the start of the current step; the per-frame displacement
/// (`delta_x/y/z`) drives the separation direction and the moving-platform
/// carry.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    /// Bottom-back corner position
    pub position: Vec3,
    /// Position at the start of the current step
    pub prev: Vec3,
    /// X extent (breadth)
    pub width_x: f32,
    /// Y extent (depth)
    pub width_y: f32,
    /// Z extent (height)
    pub height: f32,

    /// Velocity, units per second
    pub velocity: Vec3,
    /// Acceleration, units per second squared
    pub acceleration: Vec3,
    /// Deceleration applied when no acceleration is set on that axis
    pub drag: Vec3,
    /// Additional per-body gravity, added to the world's
    pub gravity: Vec3,
    /// Restitution per axis: 1 = perfectly elastic, 0 = dead stop
    pub bounce: Vec3,
    /// Absolute velocity cap per axis
    pub max_velocity: Vec3,

    /// Facing angle in radians (display-plane rotation)
    pub rotation: f32,
    /// Angular velocity, radians per second
    pub angular_velocity: f32,
    /// Angular acceleration, radians per second squared
    pub angular_acceleration: f32,
    /// Angular drag, applied when angular acceleration is zero
    pub angular_drag: f32,
    /// Absolute angular velocity cap
    pub max_angular: f32,

    /// Mass, must stay strictly positive
    pub mass: f32,
    /// Never moved by separation; still pushes movable bodies
    pub immovable: bool,
    /// Whether the world integrates this body's motion at all
    pub moves: bool,
    /// Disabled bodies are skipped by every collision check
    pub enable: bool,
    /// Whether the owning scene object is alive; dead bodies are skipped by
    /// octree population and group collision
    pub exists: bool,
    /// Whether world and body gravity are applied during motion updates
    pub allow_gravity: bool,
    /// Clamp and rebound against the world bounds after integration
    pub collide_world_bounds: bool,

    /// Which of this body's faces participate in collision
    pub check_collision: CollisionFlags,
    /// Which faces registered a resolved collision most recently
    pub touching: Touching,
    /// Set when this body overlaps another and neither moved on the tested
    /// axis this step (a resting or stuck state)
    pub embedded: bool,

    /// Overlap found on the X axis by the latest separation, for caller
    /// introspection
    pub overlap_x: f32,
    /// Overlap found on the Y axis by the latest separation
    pub overlap_y: f32,
    /// Overlap found on the Z axis by the latest separation
    pub overlap_z: f32,

    /// Skip built-in X separation (caller resolves it from `overlap_x`)
    pub custom_separate_x: bool,
    /// Skip built-in Y separation
    pub custom_separate_y: bool,
    /// Skip built-in Z separation
    pub custom_separate_z: bool,

    /// Exclude this body from octree broad-phase (always linear scan)
    pub skip_tree: bool,
}

impl Default for Body {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            prev: Vec3::zeros(),
            width_x: 0.0,
            width_y: 0.0,
            height: 0.0,
            velocity: Vec3::zeros(),
            acceleration: Vec3::zeros(),
            drag: Vec3::zeros(),
            gravity: Vec3::zeros(),
            bounce: Vec3::zeros(),
            max_velocity: Vec3::new(10_000.0, 10_000.0, 10_000.0),
            rotation: 0.0,
            angular_velocity: 0.0,
            angular_acceleration: 0.0,
            angular_drag: 0.0,
            max_angular: 1_000.0,
            mass: 1.0,
            immovable: false,
            moves: true,
            enable: true,
            exists: true,
            allow_gravity: true,
            collide_world_bounds: false,
            check_collision: CollisionFlags::default(),
            touching: Touching::default(),
            embedded: false,
            overlap_x: 0.0,
            overlap_y: 0.0,
            overlap_z: 0.0,
            custom_separate_x: false,
            custom_separate_y: false,
            custom_separate_z: false,
            skip_tree: false,
        }
    }
}

impl Body {
    /// Create a body at the given bottom-back corner with the given extents.
    pub fn new(x: f32, y: f32, z: f32, width_x: f32, width_y: f32, height: f32) -> Self {
        Self {
            position: Vec3::new(x, y, z),
            prev: Vec3::new(x, y, z),
            width_x,
            width_y,
            height,
            ..Self::default()
        }
    }

    /// The far face on the X axis.
    pub fn front_x(&self) -> f32 {
        self.position.x + self.width_x
    }

    /// The far face on the Y axis.
    pub fn front_y(&self) -> f32 {
        self.position.y + self.width_y
    }

    /// The top face.
    pub fn top(&self) -> f32 {
        self.position.z + self.height
    }

    /// The near face on the X axis.
    pub fn back_x(&self) -> f32 {
        self.position.x
    }

    /// The near face on the Y axis.
    pub fn back_y(&self) -> f32 {
        self.position.y
    }

    /// The bottom face.
    pub fn bottom(&self) -> f32 {
        self.position.z
    }

    /// The body's box at its current position.
    pub fn bounds(&self) -> Box3 {
        Box3::new(
            self.position.x,
            self.position.y,
            self.position.z,
            self.width_x,
            self.width_y,
            self.height,
        )
    }

    /// Displacement on X since the start of the step.
    pub fn delta_x(&self) -> f32 {
        self.position.x - self.prev.x
    }

    /// Displacement on Y since the start of the step.
    pub fn delta_y(&self) -> f32 {
        self.position.y - self.prev.y
    }

    /// Displacement on Z since the start of the step.
    pub fn delta_z(&self) -> f32 {
        self.position.z - self.prev.z
    }

    /// Absolute displacement on X since the start of the step.
    pub fn delta_abs_x(&self) -> f32 {
        self.delta_x().abs()
    }

    /// Absolute displacement on Y since the start of the step.
    pub fn delta_abs_y(&self) -> f32 {
        self.delta_y().abs()
    }

    /// Absolute displacement on Z since the start of the step.
    pub fn delta_abs_z(&self) -> f32 {
        self.delta_z().abs()
    }

    /// Strict face test between two bodies.
    ///
    /// NOT intersecting when a front face merely touches the other's back
    /// face (`<=`/`>=`), so bodies separated to exact contact do not
    /// re-collide. A body with zero extent on an axis can never intersect
    /// anything on that axis.
    pub fn intersects(&self, other: &Self) -> bool {
        if self.front_x() <= other.position.x {
            return false;
        }

        if self.front_y() <= other.position.y {
            return false;
        }

        if self.position.x >= other.front_x() {
            return false;
        }

        if self.position.y >= other.front_y() {
            return false;
        }

        if self.top() <= other.position.z {
            return false;
        }

        if self.position.z >= other.top() {
            return false;
        }

        true
    }

    /// Rewind all motion state and place the body at a new position.
    pub fn reset(&mut self, x: f32, y: f32, z: f32) {
        self.position = Vec3::new(x, y, z);
        self.prev = self.position;
        self.velocity = Vec3::zeros();
        self.acceleration = Vec3::zeros();
        self.angular_velocity = 0.0;
        self.angular_acceleration = 0.0;
        self.touching = Touching::default();
        self.embedded = false;
        self.overlap_x = 0.0;
        self.overlap_y = 0.0;
        self.overlap_z = 0.0;
    }

    /// Check the fields the separation math depends on.
    ///
    /// The simulation is best-effort and never raises errors itself, but a
    /// body built from bad host data (NaN positions, zero mass) would
    /// silently poison every later computation. Hosts should validate after
    /// constructing bodies from external data.
    pub fn validate(&self) -> Result<(), BodyError> {
        fn finite(value: f32, name: &'static str) -> Result<(), BodyError> {
            if value.is_finite() {
                Ok(())
            } else {
                Err(BodyError::NonFinite(name))
            }
        }

        finite(self.position.x, "position.x")?;
        finite(self.position.y, "position.y")?;
        finite(self.position.z, "position.z")?;
        finite(self.width_x, "width_x")?;
        finite(self.width_y, "width_y")?;
        finite(self.height, "height")?;
        finite(self.velocity.x, "velocity.x")?;
        finite(self.velocity.y, "velocity.y")?;
        finite(self.velocity.z, "velocity.z")?;
        finite(self.mass, "mass")?;

        if self.mass <= 0.0 {
            return Err(BodyError::NonPositiveMass(self.mass));
        }

        Ok(())
    }
}
