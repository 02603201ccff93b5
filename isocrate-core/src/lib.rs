//! Core data structures and traits for isocrate
//!
//! This crate provides the volume abstraction read by the contouring engine,
//! the triangle mesh it produces, and the shared error type.

pub mod error;
pub mod mesh;
pub mod volume;

pub use error::*;
pub use mesh::*;
pub use volume::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3};

/// Single-precision 3D point
pub type Point3f = Point3<f32>;

/// Single-precision 3D vector
pub type Vector3f = Vector3<f32>;
