//! Collision world, bodies and per-axis separation
//!
//! The broad phase narrows "all pairs" down to plausible pairs via the
//! octree in [`crate::spatial`]; the narrow phase here runs the exact face
//! test and resolves penetration one axis at a time, exchanging momentum
//! between movable bodies.

pub mod body;
pub mod world;

pub use body::{Body, BodyError, CollisionFlags, Touching};
pub use world::{ColliderRef, ContactFn, ProcessFn, World};
