//! Pass 3: output offsets
//!
//! A serial prefix sum over the grid rows, slice-major and row-minor, that
//! gives every row a disjoint block of point ids (x-edge points first, then
//! y, then z) and a disjoint block of triangle ids.

use crate::classify::VoxelRowCounts;
use crate::scan::EdgeGrid;
use itertools::iproduct;
use std::ops::Range;

/// Number of points and triangles a grid row contributes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowCounts {
    pub x: usize,
    pub y: usize,
    pub z: usize,
    pub triangles: usize,
}

impl RowCounts {
    pub fn points(&self) -> usize {
        self.x + self.y + self.z
    }
}

/// First output id of each kind for a grid row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowOffsets {
    pub x: usize,
    pub y: usize,
    pub z: usize,
    pub triangles: usize,
}

#[derive(Debug, Clone)]
pub struct OffsetPlan {
    dims: [usize; 3],
    counts: Vec<RowCounts>,
    offsets: Vec<RowOffsets>,
    num_points: usize,
    num_triangles: usize,
}

impl OffsetPlan {
    /// Fold pass 1 and pass 2 counts into absolute offsets
    pub fn plan(grid: &EdgeGrid, voxel_rows: &[VoxelRowCounts]) -> Self {
        let dims = grid.dims();
        let [_, ny, nz] = dims;
        let voxel_row = |j: usize, k: usize| &voxel_rows[k * (ny - 1) + j];

        let mut counts = Vec::with_capacity(ny * nz);
        let mut offsets = Vec::with_capacity(ny * nz);
        let mut num_points = 0;
        let mut num_triangles = 0;

        for (k, j) in iproduct!(0..nz, 0..ny) {
            let mut row = RowCounts {
                x: grid.row(j, k).x_ints,
                ..Default::default()
            };
            if j < ny - 1 && k < nz - 1 {
                let owned = voxel_row(j, k);
                row.y = owned.y_ints;
                row.z = owned.z_ints;
                row.triangles = owned.triangles;
            }
            if k == nz - 1 && j < ny - 1 {
                row.y += voxel_row(j, k - 1).spill_y;
            }
            if j == ny - 1 && k < nz - 1 {
                row.z += voxel_row(j - 1, k).spill_z;
            }

            offsets.push(RowOffsets {
                x: num_points,
                y: num_points + row.x,
                z: num_points + row.x + row.y,
                triangles: num_triangles,
            });
            counts.push(row);

            num_points += row.points();
            num_triangles += row.triangles;
        }

        Self {
            dims,
            counts,
            offsets,
            num_points,
            num_triangles,
        }
    }

    #[inline]
    pub fn offsets(&self, j: usize, k: usize) -> RowOffsets {
        self.offsets[k * self.dims[1] + j]
    }

    #[inline]
    pub fn counts(&self, j: usize, k: usize) -> RowCounts {
        self.counts[k * self.dims[1] + j]
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    pub fn num_triangles(&self) -> usize {
        self.num_triangles
    }

    /// Point ids assigned to grid row `(j, k)`
    pub fn point_range(&self, j: usize, k: usize) -> Range<usize> {
        let start = self.offsets(j, k).x;
        start..start + self.counts(j, k).points()
    }

    /// Triangle ids assigned to grid row `(j, k)`
    pub fn triangle_range(&self, j: usize, k: usize) -> Range<usize> {
        let start = self.offsets(j, k).triangles;
        start..start + self.counts(j, k).triangles
    }

    /// First point id written by voxel slice `k`; `nz - 1` maps to the total
    pub fn slice_point_start(&self, k: usize) -> usize {
        if k + 1 < self.dims[2] {
            self.offsets(0, k).x
        } else {
            self.num_points
        }
    }

    /// First triangle id written by voxel slice `k`; `nz - 1` maps to the total
    pub fn slice_triangle_start(&self, k: usize) -> usize {
        if k + 1 < self.dims[2] {
            self.offsets(0, k).triangles
        } else {
            self.num_triangles
        }
    }

    /// Every grid row's point and triangle range, in planning order
    pub fn row_ranges(&self) -> impl Iterator<Item = (Range<usize>, Range<usize>)> + '_ {
        iproduct!(0..self.dims[2], 0..self.dims[1])
            .map(move |(k, j)| (self.point_range(j, k), self.triangle_range(j, k)))
    }
}
