//! Spatial partitioning structures for broad-phase collision queries

pub mod octree;

pub use octree::{Octree, OctreeEntry};
