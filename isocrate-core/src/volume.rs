//! Regular voxel grids of scalar samples
//!
//! The contouring engine only ever reads a volume through [`ScalarVolume`];
//! [`ImageVolume`] is the in-memory implementation used by callers that do
//! not bring their own storage.

use crate::{Error, Point3f, Result};
use ndarray::{s, Array3, ArrayView1};

/// Read-only access to a regular 3-D grid of scalar samples
pub trait ScalarVolume: Sync {
    /// Number of samples along x, y and z
    fn dims(&self) -> [usize; 3];

    /// World position of sample (0, 0, 0)
    fn origin(&self) -> Point3f;

    /// Distance between neighbouring samples along each axis
    fn spacing(&self) -> [f32; 3];

    /// Sample value at grid coordinates. Callers stay inside `dims()`.
    fn scalar_at(&self, i: usize, j: usize, k: usize) -> f32;

    /// Truncation radius when the samples form a truncated signed distance field
    fn radius(&self) -> Option<f32> {
        None
    }
}

/// Check that a volume can be contoured at all
pub fn validate_volume<V: ScalarVolume + ?Sized>(volume: &V) -> Result<()> {
    let dims = volume.dims();
    if dims.iter().any(|&d| d < 2) {
        return Err(Error::InvalidDimensions {
            dims,
            reason: "every dimension needs at least two samples".to_string(),
        });
    }

    let spacing = volume.spacing();
    if spacing.iter().any(|s| *s == 0.0 || !s.is_finite()) {
        return Err(Error::InvalidData(format!(
            "Spacing {:?} must be finite and non-zero",
            spacing
        )));
    }

    if let Some(radius) = volume.radius() {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(Error::InvalidData(format!(
                "Truncation radius {} must be finite and positive",
                radius
            )));
        }
    }

    Ok(())
}

/// 3D volumetric grid containing scalar values
///
/// Samples are stored in (z, y, x) order so every x-row is contiguous.
#[derive(Debug, Clone)]
pub struct ImageVolume {
    values: Array3<f32>,
    origin: Point3f,
    spacing: [f32; 3],
    radius: Option<f32>,
}

impl ImageVolume {
    /// Create a zero-filled volume
    pub fn new(dims: [usize; 3], spacing: [f32; 3], origin: Point3f) -> Self {
        Self {
            values: Array3::zeros((dims[2], dims[1], dims[0])),
            origin,
            spacing,
            radius: None,
        }
    }

    /// Wrap samples laid out x-fastest, then y, then z
    pub fn from_vec(
        dims: [usize; 3],
        spacing: [f32; 3],
        origin: Point3f,
        values: Vec<f32>,
    ) -> Result<Self> {
        let len = values.len();
        let values = Array3::from_shape_vec((dims[2], dims[1], dims[0]), values).map_err(|e| {
            Error::InvalidData(format!(
                "{} samples do not fill a {:?} volume: {}",
                len, dims, e
            ))
        })?;

        Ok(Self {
            values,
            origin,
            spacing,
            radius: None,
        })
    }

    /// Sample a function of world position at every grid point
    pub fn from_fn<F>(dims: [usize; 3], spacing: [f32; 3], origin: Point3f, mut f: F) -> Self
    where
        F: FnMut(Point3f) -> f32,
    {
        let values = Array3::from_shape_fn((dims[2], dims[1], dims[0]), |(k, j, i)| {
            f(Point3f::new(
                origin.x + i as f32 * spacing[0],
                origin.y + j as f32 * spacing[1],
                origin.z + k as f32 * spacing[2],
            ))
        });

        Self {
            values,
            origin,
            spacing,
            radius: None,
        }
    }

    /// Signed distance to a sphere, negative inside
    pub fn sphere(
        dims: [usize; 3],
        spacing: [f32; 3],
        origin: Point3f,
        center: Point3f,
        radius: f32,
    ) -> Self {
        Self::from_fn(dims, spacing, origin, |p| (p - center).magnitude() - radius)
    }

    /// Mark the samples as a truncated signed distance field
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = Some(radius);
        self
    }

    /// Clamp every sample into `[-radius, radius]` and mark the volume as a TSDF
    ///
    /// Samples at `-radius` read as empty space, samples at `radius` as unseen.
    pub fn truncate(mut self, radius: f32) -> Self {
        self.values.mapv_inplace(|v| v.max(-radius).min(radius));
        self.radius = Some(radius);
        self
    }

    /// Get scalar value at grid coordinates (with bounds checking)
    pub fn get(&self, i: usize, j: usize, k: usize) -> Option<f32> {
        self.values.get((k, j, i)).copied()
    }

    /// Set scalar value at grid coordinates
    pub fn set(&mut self, i: usize, j: usize, k: usize, value: f32) -> Result<()> {
        let dims = self.dims();
        match self.values.get_mut((k, j, i)) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::InvalidData(format!(
                "Grid coordinates ({}, {}, {}) out of bounds for dimensions {:?}",
                i, j, k, dims
            ))),
        }
    }

    /// Convert grid coordinates to world coordinates
    pub fn grid_to_world(&self, i: usize, j: usize, k: usize) -> Point3f {
        Point3f::new(
            self.origin.x + i as f32 * self.spacing[0],
            self.origin.y + j as f32 * self.spacing[1],
            self.origin.z + k as f32 * self.spacing[2],
        )
    }

    /// One x-row of samples
    pub fn row(&self, j: usize, k: usize) -> ArrayView1<'_, f32> {
        self.values.slice(s![k, j, ..])
    }
}

impl ScalarVolume for ImageVolume {
    fn dims(&self) -> [usize; 3] {
        let (nz, ny, nx) = self.values.dim();
        [nx, ny, nz]
    }

    fn origin(&self) -> Point3f {
        self.origin
    }

    fn spacing(&self) -> [f32; 3] {
        self.spacing
    }

    #[inline]
    fn scalar_at(&self, i: usize, j: usize, k: usize) -> f32 {
        self.values[[k, j, i]]
    }

    fn radius(&self) -> Option<f32> {
        self.radius
    }
}
