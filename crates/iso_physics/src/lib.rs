//! # Iso Physics
//!
//! Arcade-style 3D collision detection and resolution for axonometrically
//! projected ("isometric") game worlds.
//!
//! The crate has two tightly coupled pieces:
//!
//! - **Broad phase**: an [`spatial::Octree`] that partitions a bounded 3D
//!   region and answers "what else might this box touch" queries with no
//!   false negatives.
//! - **Narrow phase**: the per-axis separation algorithm on
//!   [`physics::World`], which detects overlap between two axis-aligned
//!   bodies, pushes them apart along the dominant axis order, and exchanges
//!   momentum between movable bodies.
//!
//! It is deliberately not a rigid-body solver: no swept collision, no
//! rotational dynamics, no contact manifolds. Single-pair penetration
//! resolution is the whole contract.
//!
//! ## Quick Start
//!
//! ```rust
//! use iso_physics::prelude::*;
//!
//! let mut world = World::default();
//! world.set_bounds(0.0, 0.0, 0.0, 512.0, 512.0, 256.0);
//! world.gravity.z = -500.0;
//!
//! // An immovable floor slab and a crate resting above it.
//! let mut floor = Body::new(0.0, 0.0, 0.0, 512.0, 512.0, 16.0);
//! floor.immovable = true;
//! floor.allow_gravity = false;
//! let mut crate_body = Body::new(100.0, 100.0, 200.0, 32.0, 32.0, 32.0);
//!
//! let dt = 1.0 / 60.0;
//! for _ in 0..120 {
//!     world.update_body(&mut crate_body, dt);
//!     world.collide_pair(&mut crate_body, &mut floor, None, None);
//! }
//! assert!(crate_body.touching.down);
//! ```

// Foundation utilities (math aliases, logging)
pub mod foundation;

// Geometric primitives
pub mod geom;

// Spatial partitioning (broad phase)
pub mod spatial;

// Collision world, bodies and separation (narrow phase)
pub mod physics;

// Configuration
pub mod config;

pub use config::{ConfigError, WorldConfig};
pub use geom::Box3;
pub use physics::{Body, BodyError, CollisionFlags, ColliderRef, Touching, World};
pub use spatial::{Octree, OctreeEntry};

/// Commonly used types, importable in one line.
pub mod prelude {
    pub use crate::config::WorldConfig;
    pub use crate::foundation::math::{Vec2, Vec3};
    pub use crate::geom::Box3;
    pub use crate::physics::{Body, CollisionFlags, ColliderRef, Touching, World};
    pub use crate::spatial::{Octree, OctreeEntry};
}
