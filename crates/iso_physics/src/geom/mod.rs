//! Geometric primitives

pub mod box3;

pub use box3::Box3;
