//! Pass 2: voxel-row classification
//!
//! Each voxel row `(j, k)` is bounded by the x-rows `(j,k)`, `(j+1,k)`,
//! `(j,k+1)` and `(j+1,k+1)`. Pass 2 narrows the row to the x-range where the
//! contour can occur, then counts the triangles and the active y- and z-edges
//! the row will produce.

use crate::boundary::VoxelLocation;
use crate::edge_cases::EdgeCaseTable;
use crate::scan::EdgeGrid;
use rayon::prelude::*;
use std::ops::Range;

/// Pass 2 output for one voxel row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoxelRowCounts {
    /// Voxels that may intersect the contour; `None` skips the row entirely
    pub trim: Option<Range<usize>>,
    /// Active y-edges owned by grid row `(j, k)`
    pub y_ints: usize,
    /// Active z-edges owned by grid row `(j, k)`
    pub z_ints: usize,
    /// Triangles emitted by valid voxels
    pub triangles: usize,
    /// Active y-edges on the +z face, owned by grid row `(j, k + 1)`
    pub spill_y: usize,
    /// Active z-edges on the +y face, owned by grid row `(j + 1, k)`
    pub spill_z: usize,
}

/// Voxel range of row `(j, k)` that can contain the contour
///
/// Outside the returned range every corner in each of the four bounding rows
/// lies on the same side of the contour.
pub fn trim_voxel_row(grid: &EdgeGrid, j: usize, k: usize) -> Option<Range<usize>> {
    let nx = grid.dims()[0];
    let rows = [(j, k), (j + 1, k), (j, k + 1), (j + 1, k + 1)];

    if rows.iter().all(|&(j, k)| !grid.row(j, k).has_crossings()) {
        // Each row is uniform; the voxels straddle the contour only if the rows disagree
        let first = grid.edges(j, k)[0].class();
        if rows.iter().all(|&(j, k)| grid.edges(j, k)[0].class() == first) {
            return None;
        }
        return Some(0..nx - 1);
    }

    let mut x_left = rows
        .iter()
        .map(|&(j, k)| grid.row(j, k).trim_min)
        .min()
        .unwrap_or(0);
    let mut x_right = rows
        .iter()
        .map(|&(j, k)| grid.row(j, k).trim_max)
        .max()
        .unwrap_or(nx - 1);

    if x_left > 0 {
        let above = grid.edges(j, k)[x_left].class().left_above();
        if rows
            .iter()
            .any(|&(j, k)| grid.edges(j, k)[x_left].class().left_above() != above)
        {
            x_left = 0;
        }
    }

    if x_right < nx - 1 {
        let above = grid.edges(j, k)[x_right - 1].class().right_above();
        if rows
            .iter()
            .any(|&(j, k)| grid.edges(j, k)[x_right - 1].class().right_above() != above)
        {
            x_right = nx - 1;
        }
    }

    Some(x_left..x_right)
}

/// Count triangles and active y/z edges of voxel row `(j, k)`
pub fn classify_voxel_row(
    grid: &EdgeGrid,
    table: &EdgeCaseTable,
    hole_filling: bool,
    j: usize,
    k: usize,
) -> VoxelRowCounts {
    let dims = grid.dims();
    let mut counts = VoxelRowCounts {
        trim: trim_voxel_row(grid, j, k),
        ..Default::default()
    };
    let Some(trim) = counts.trim.clone() else {
        return counts;
    };

    for i in trim {
        let voxel = table.voxel(&grid.corners(i, j, k), hole_filling);
        let entry = table.entry(voxel.case);
        if entry.num_triangles() == 0 {
            continue;
        }

        if voxel.valid {
            counts.triangles += entry.num_triangles();
        }
        counts.y_ints += voxel.step(4);
        counts.z_ints += voxel.step(8);

        let location = VoxelLocation::of(i, j, k, dims);
        if location.is_interior() {
            continue;
        }
        if location.x_max() {
            counts.y_ints += voxel.step(5);
            counts.z_ints += voxel.step(9);
        }
        if location.y_max() {
            counts.spill_z += voxel.step(10);
            if location.x_max() {
                counts.spill_z += voxel.step(11);
            }
        }
        if location.z_max() {
            counts.spill_y += voxel.step(6);
            if location.x_max() {
                counts.spill_y += voxel.step(7);
            }
        }
    }

    counts
}

/// Run pass 2 over every voxel row, indexed `k * (ny - 1) + j`
pub fn classify_voxel_rows(
    grid: &EdgeGrid,
    table: &EdgeCaseTable,
    hole_filling: bool,
    parallel: bool,
) -> Vec<VoxelRowCounts> {
    let [_, ny, nz] = grid.dims();

    let classify_slice = |k: usize| -> Vec<VoxelRowCounts> {
        (0..ny - 1)
            .map(|j| classify_voxel_row(grid, table, hole_filling, j, k))
            .collect()
    };

    let per_slice: Vec<Vec<VoxelRowCounts>> = if parallel {
        (0..nz - 1).into_par_iter().map(classify_slice).collect()
    } else {
        (0..nz - 1).map(classify_slice).collect()
    };

    per_slice.into_iter().flatten().collect()
}
