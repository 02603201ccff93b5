//! Flying Edges iso-surface extraction
//!
//! Extraction runs in four passes over the volume:
//!
//! 1. classify every x-edge and record per-row trim ranges
//! 2. count triangles and y/z intersections per voxel row
//! 3. turn the counts into disjoint output offsets (serial prefix sum)
//! 4. generate points and triangles straight into the pre-sized output
//!
//! Passes 1, 2 and 4 are parallel over z-slices. Every edge is visited once
//! and assigned exactly one point id, so no vertex merging is needed.
//!
//! ```rust
//! use isocrate_contour::{FlyingEdges, FlyingEdgesConfig};
//! use isocrate_core::{ImageVolume, Point3f};
//!
//! let center = Point3f::new(3.5, 3.5, 3.5);
//! let volume = ImageVolume::sphere([8, 8, 8], [1.0; 3], Point3f::origin(), center, 3.0);
//!
//! let mesh = FlyingEdges::new(FlyingEdgesConfig::default())
//!     .extract(&volume)
//!     .unwrap();
//! assert!(mesh.face_count() > 0);
//! ```

use crate::classify::classify_voxel_rows;
use crate::edge_cases::EdgeCaseTable;
use crate::emit::{Emitter, MeshBuffers};
use crate::offsets::OffsetPlan;
use crate::parallel;
use crate::scan::{ContourParams, EdgeGrid};
use isocrate_core::{validate_volume, Error, Result, ScalarVolume, TriangleMesh};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cooperative cancellation shared between the caller and an extraction
///
/// The flag is checked between passes; an aborted extraction returns
/// [`Error::Cancelled`] and no mesh.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Configuration for Flying Edges extraction
#[derive(Debug, Clone)]
pub struct FlyingEdgesConfig {
    /// Contour value; ignored (treated as 0) for truncated distance volumes
    pub iso_value: f32,
    /// Whether to compute vertex normals
    pub compute_normals: bool,
    /// Whether to output the interpolated gradient at each vertex
    pub compute_gradients: bool,
    /// Whether to attach the contour value as a per-vertex scalar
    pub compute_scalars: bool,
    /// Extract the empty/unseen boundary of a truncated distance volume as well
    pub hole_filling: bool,
    /// Run the parallel passes on the thread pool
    pub enable_parallel: bool,
    pub abort: Option<AbortFlag>,
}

impl Default for FlyingEdgesConfig {
    fn default() -> Self {
        Self {
            iso_value: 0.0,
            compute_normals: true,
            compute_gradients: false,
            compute_scalars: false,
            hole_filling: false,
            enable_parallel: true,
            abort: None,
        }
    }
}

impl FlyingEdgesConfig {
    pub fn with_iso_value(mut self, iso_value: f32) -> Self {
        self.iso_value = iso_value;
        self
    }

    pub fn with_normals(mut self, enabled: bool) -> Self {
        self.compute_normals = enabled;
        self
    }

    pub fn with_gradients(mut self, enabled: bool) -> Self {
        self.compute_gradients = enabled;
        self
    }

    pub fn with_scalars(mut self, enabled: bool) -> Self {
        self.compute_scalars = enabled;
        self
    }

    pub fn with_hole_filling(mut self, enabled: bool) -> Self {
        self.hole_filling = enabled;
        self
    }

    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.enable_parallel = enabled;
        self
    }

    pub fn with_abort_flag(mut self, abort: AbortFlag) -> Self {
        self.abort = Some(abort);
        self
    }
}

/// Counters gathered during one extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    /// Grid rows classified by pass 1
    pub rows_scanned: usize,
    /// Voxel rows considered by pass 2
    pub voxel_rows: usize,
    /// Voxel rows dropped entirely by trimming
    pub voxel_rows_skipped: usize,
    /// Crossing x-edges between empty and unseen space; only contoured with hole filling
    pub separating_x_edges: usize,
    pub num_points: usize,
    pub num_triangles: usize,
}

/// Flying Edges implementation
#[derive(Debug, Clone)]
pub struct FlyingEdges {
    config: FlyingEdgesConfig,
    table: &'static EdgeCaseTable,
}

impl FlyingEdges {
    /// Create a new Flying Edges instance
    pub fn new(config: FlyingEdgesConfig) -> Self {
        Self {
            config,
            table: EdgeCaseTable::shared(),
        }
    }

    pub fn config(&self) -> &FlyingEdgesConfig {
        &self.config
    }

    /// Extract the iso-surface of `volume`
    pub fn extract<V: ScalarVolume + ?Sized>(&self, volume: &V) -> Result<TriangleMesh> {
        self.extract_with_stats(volume).map(|(mesh, _)| mesh)
    }

    /// Extract the iso-surface and report pass statistics
    pub fn extract_with_stats<V: ScalarVolume + ?Sized>(
        &self,
        volume: &V,
    ) -> Result<(TriangleMesh, ExtractionStats)> {
        validate_volume(volume)?;
        let params = self.contour_params(volume);

        if self.config.enable_parallel && parallel::is_parallel_enabled() {
            parallel::execute_parallel(|| self.run(volume, &params, true))?
        } else {
            self.run(volume, &params, false)
        }
    }

    /// Extract one surface per contour value and merge them into one mesh
    ///
    /// Not available for truncated distance volumes, whose contour is fixed at 0.
    pub fn extract_many<V: ScalarVolume + ?Sized>(
        &self,
        volume: &V,
        values: &[f32],
    ) -> Result<TriangleMesh> {
        if volume.radius().is_some() {
            return Err(Error::InvalidData(
                "Truncated distance volumes only support the zero contour".to_string(),
            ));
        }

        let mut mesh = TriangleMesh::new();
        for &value in values {
            let config = self.config.clone().with_iso_value(value);
            let surface = FlyingEdges {
                config,
                table: self.table,
            }
            .extract(volume)?;
            mesh.append(surface);
        }
        Ok(mesh)
    }

    fn contour_params<V: ScalarVolume + ?Sized>(&self, volume: &V) -> ContourParams {
        let radius = volume.radius();
        let iso_value = match radius {
            Some(radius) => {
                if self.config.iso_value != 0.0 {
                    warn!(
                        requested = self.config.iso_value,
                        radius, "Contour value overridden to 0 for truncated distance volume"
                    );
                }
                0.0
            }
            None => self.config.iso_value,
        };

        ContourParams {
            iso_value,
            radius,
            hole_filling: self.config.hole_filling,
        }
    }

    fn check_abort(&self, after: &str) -> Result<()> {
        match &self.config.abort {
            Some(flag) if flag.is_aborted() => {
                debug!(after, "Extraction aborted");
                Err(Error::Cancelled(format!("aborted after {}", after)))
            }
            _ => Ok(()),
        }
    }

    fn run<V: ScalarVolume + ?Sized>(
        &self,
        volume: &V,
        params: &ContourParams,
        parallel: bool,
    ) -> Result<(TriangleMesh, ExtractionStats)> {
        let dims = volume.dims();
        info!(
            dims = ?dims,
            iso_value = params.iso_value,
            tsdf = params.radius.is_some(),
            parallel,
            "Extracting iso-surface"
        );

        let grid = EdgeGrid::scan(volume, params, parallel);
        let separating = if params.radius.is_some() {
            grid.separating_x_edges()
        } else {
            0
        };
        debug!(
            x_points = grid.total_x_ints(),
            separating, "Classified x-edges"
        );
        self.check_abort("x-edge classification")?;

        let voxel_rows = classify_voxel_rows(&grid, self.table, params.hole_filling, parallel);
        let skipped = voxel_rows.iter().filter(|row| row.trim.is_none()).count();
        debug!(
            voxel_rows = voxel_rows.len(),
            skipped, "Classified voxel rows"
        );
        self.check_abort("voxel-row classification")?;

        let plan = OffsetPlan::plan(&grid, &voxel_rows);
        debug!(
            points = plan.num_points(),
            triangles = plan.num_triangles(),
            "Planned output offsets"
        );
        self.check_abort("offset planning")?;

        let mut buffers = MeshBuffers::allocate(
            &plan,
            self.config.compute_normals,
            self.config.compute_gradients,
        );
        let emitter = Emitter {
            volume,
            grid: &grid,
            table: self.table,
            voxel_rows: &voxel_rows,
            plan: &plan,
            params: *params,
        };
        emitter.emit(&mut buffers, parallel);

        let stats = ExtractionStats {
            rows_scanned: dims[1] * dims[2],
            voxel_rows: voxel_rows.len(),
            voxel_rows_skipped: skipped,
            separating_x_edges: separating,
            num_points: plan.num_points(),
            num_triangles: plan.num_triangles(),
        };

        let scalars = self
            .config
            .compute_scalars
            .then(|| vec![params.iso_value; stats.num_points]);
        let mesh = TriangleMesh {
            vertices: buffers.points,
            faces: buffers.triangles,
            normals: buffers.normals,
            gradients: buffers.gradients,
            scalars,
        };

        info!(
            points = stats.num_points,
            triangles = stats.num_triangles,
            "Iso-surface extraction complete"
        );

        Ok((mesh, stats))
    }
}

/// Convenience function for basic Flying Edges extraction
pub fn flying_edges<V: ScalarVolume + ?Sized>(volume: &V, iso_value: f32) -> Result<TriangleMesh> {
    let config = FlyingEdgesConfig {
        iso_value,
        ..Default::default()
    };
    FlyingEdges::new(config).extract(volume)
}

#[cfg(test)]
mod tests {
    use super::*;
    use isocrate_core::{ImageVolume, Point3f};

    fn sphere(dims: usize, radius: f32) -> ImageVolume {
        let c = (dims - 1) as f32 / 2.0;
        ImageVolume::sphere(
            [dims; 3],
            [1.0; 3],
            Point3f::origin(),
            Point3f::new(c, c, c),
            radius,
        )
    }

    #[test]
    fn test_flying_edges_config_default() {
        let config = FlyingEdgesConfig::default();
        assert_eq!(config.iso_value, 0.0);
        assert!(config.compute_normals);
        assert!(!config.compute_gradients);
        assert!(!config.compute_scalars);
        assert!(!config.hole_filling);
        assert!(config.enable_parallel);
        assert!(config.abort.is_none());
    }

    #[test]
    fn test_builder_setters() {
        let config = FlyingEdgesConfig::default()
            .with_iso_value(0.25)
            .with_normals(false)
            .with_gradients(true)
            .with_scalars(true)
            .with_hole_filling(true)
            .with_parallel(false);

        assert_eq!(config.iso_value, 0.25);
        assert!(!config.compute_normals);
        assert!(config.compute_gradients);
        assert!(config.compute_scalars);
        assert!(config.hole_filling);
        assert!(!config.enable_parallel);
    }

    #[test]
    fn test_flying_edges_simple() {
        let mesh = flying_edges(&sphere(8, 2.5), 0.0).unwrap();

        assert!(!mesh.is_empty());
        assert_eq!(mesh.normals.as_ref().map(Vec::len), Some(mesh.vertex_count()));
        assert!(mesh.gradients.is_none());
        assert!(mesh.scalars.is_none());
    }

    #[test]
    fn test_attribute_arrays() {
        let config = FlyingEdgesConfig::default()
            .with_iso_value(0.5)
            .with_normals(false)
            .with_gradients(true)
            .with_scalars(true);
        let mesh = FlyingEdges::new(config).extract(&sphere(8, 2.0)).unwrap();

        assert!(mesh.normals.is_none());
        assert_eq!(mesh.gradients.as_ref().map(Vec::len), Some(mesh.vertex_count()));
        let scalars = mesh.scalars.unwrap();
        assert_eq!(scalars.len(), mesh.vertices.len());
        assert!(scalars.iter().all(|&s| s == 0.5));
    }

    #[test]
    fn test_stats_report_totals() {
        let volume = sphere(10, 2.0);
        let (mesh, stats) = FlyingEdges::new(FlyingEdgesConfig::default())
            .extract_with_stats(&volume)
            .unwrap();

        assert_eq!(stats.rows_scanned, 100);
        assert_eq!(stats.voxel_rows, 81);
        assert!(stats.voxel_rows_skipped > 0);
        assert_eq!(stats.separating_x_edges, 0);
        assert_eq!(stats.num_points, mesh.vertex_count());
        assert_eq!(stats.num_triangles, mesh.face_count());
    }

    #[test]
    fn test_abort_flag_cancels() {
        let abort = AbortFlag::new();
        abort.abort();
        let config = FlyingEdgesConfig::default().with_abort_flag(abort.clone());
        let engine = FlyingEdges::new(config);

        let result = engine.extract(&sphere(6, 1.5));
        assert!(matches!(result, Err(Error::Cancelled(_))));

        abort.reset();
        assert!(engine.extract(&sphere(6, 1.5)).is_ok());
    }

    #[test]
    fn test_tsdf_forces_zero_contour() {
        let volume = sphere(10, 3.0).truncate(2.0);
        let shifted = FlyingEdgesConfig::default().with_iso_value(0.7);

        let a = FlyingEdges::new(shifted).extract(&volume).unwrap();
        let b = flying_edges(&volume, 0.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_extract_many_rejects_tsdf() {
        let volume = sphere(6, 1.5).truncate(1.0);
        let engine = FlyingEdges::new(FlyingEdgesConfig::default());

        assert!(matches!(
            engine.extract_many(&volume, &[0.0, 0.5]),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_invalid_dimensions() {
        let volume = ImageVolume::new([1, 4, 4], [1.0; 3], Point3f::origin());
        assert!(matches!(
            flying_edges(&volume, 0.0),
            Err(Error::InvalidDimensions { .. })
        ));
    }
}
