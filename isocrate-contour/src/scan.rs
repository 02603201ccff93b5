//! Pass 1: x-edge classification
//!
//! Every x-row of the volume is scanned once. Each x-edge is classified
//! into an [`EdgeCase`], active crossings are counted, and the extent of all
//! crossings is recorded as the row's trim range.

use crate::edge_class::{EdgeCase, EdgeClass, EdgeState, VertexState};
use isocrate_core::ScalarVolume;
use rayon::prelude::*;

/// Thresholding parameters shared by every pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourParams {
    pub iso_value: f32,
    /// Truncation radius of a TSDF volume
    pub radius: Option<f32>,
    pub hole_filling: bool,
}

impl ContourParams {
    pub fn new(iso_value: f32) -> Self {
        Self {
            iso_value,
            radius: None,
            hole_filling: false,
        }
    }
}

/// Result of scanning one x-row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowScan {
    /// Active x-edge crossings; each becomes one output point
    pub x_ints: usize,
    /// First crossing edge, or `nx - 1` when there is none
    pub trim_min: usize,
    /// One past the last crossing edge, or 0 when there is none
    pub trim_max: usize,
}

impl RowScan {
    /// Record of a row with no crossings
    pub fn empty(nx: usize) -> Self {
        Self {
            x_ints: 0,
            trim_min: nx - 1,
            trim_max: 0,
        }
    }

    #[inline]
    pub fn has_crossings(&self) -> bool {
        self.trim_min < self.trim_max
    }
}

/// Classify the x-edges of row `(j, k)` into `edges` (length `nx - 1`)
pub fn scan_row<V: ScalarVolume + ?Sized>(
    volume: &V,
    j: usize,
    k: usize,
    params: &ContourParams,
    edges: &mut [EdgeCase],
) -> RowScan {
    let mut scan = RowScan::empty(edges.len() + 1);

    let mut s0 = volume.scalar_at(0, j, k);
    let mut state0 = VertexState::of(s0, params.radius);

    for (i, edge) in edges.iter_mut().enumerate() {
        let s1 = volume.scalar_at(i + 1, j, k);
        let state1 = VertexState::of(s1, params.radius);

        let class = EdgeClass::classify(s0, s1, params.iso_value);
        *edge = EdgeCase::new(class, state0, state1);

        if class.is_crossing() {
            if edge.is_active(params.hole_filling) {
                scan.x_ints += 1;
            }
            scan.trim_min = scan.trim_min.min(i);
            scan.trim_max = i + 1;
        }

        s0 = s1;
        state0 = state1;
    }

    scan
}

/// Pass 1 output: every x-edge case plus one [`RowScan`] per row
///
/// Rows are ordered slice-major: row `(j, k)` has index `k * ny + j`.
#[derive(Debug, Clone)]
pub struct EdgeGrid {
    dims: [usize; 3],
    edges: Vec<EdgeCase>,
    rows: Vec<RowScan>,
}

impl EdgeGrid {
    /// Run pass 1 over the whole volume
    pub fn scan<V: ScalarVolume + ?Sized>(volume: &V, params: &ContourParams, parallel: bool) -> Self {
        let dims = volume.dims();
        let [nx, ny, nz] = dims;
        let row_len = nx - 1;
        let mut edges = vec![EdgeCase::default(); row_len * ny * nz];

        let scan_slice = |(k, slice): (usize, &mut [EdgeCase])| -> Vec<RowScan> {
            slice
                .chunks_mut(row_len)
                .enumerate()
                .map(|(j, row)| scan_row(volume, j, k, params, row))
                .collect()
        };

        let per_slice: Vec<Vec<RowScan>> = if parallel {
            edges
                .par_chunks_mut(row_len * ny)
                .enumerate()
                .map(scan_slice)
                .collect()
        } else {
            edges.chunks_mut(row_len * ny).enumerate().map(scan_slice).collect()
        };

        Self {
            dims,
            edges,
            rows: per_slice.into_iter().flatten().collect(),
        }
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    #[inline]
    fn row_index(&self, j: usize, k: usize) -> usize {
        k * self.dims[1] + j
    }

    /// Edge cases of row `(j, k)`
    #[inline]
    pub fn edges(&self, j: usize, k: usize) -> &[EdgeCase] {
        let len = self.dims[0] - 1;
        let start = self.row_index(j, k) * len;
        &self.edges[start..start + len]
    }

    #[inline]
    pub fn row(&self, j: usize, k: usize) -> &RowScan {
        &self.rows[self.row_index(j, k)]
    }

    /// The four x-edges bounding voxel `(i, j, k)`
    #[inline]
    pub fn corners(&self, i: usize, j: usize, k: usize) -> [EdgeCase; 4] {
        [
            self.edges(j, k)[i],
            self.edges(j + 1, k)[i],
            self.edges(j, k + 1)[i],
            self.edges(j + 1, k + 1)[i],
        ]
    }

    /// Total active x-edge crossings
    pub fn total_x_ints(&self) -> usize {
        self.rows.iter().map(|row| row.x_ints).sum()
    }

    /// Crossing x-edges running from an empty sample to an unseen one
    pub fn separating_x_edges(&self) -> usize {
        self.edges
            .iter()
            .filter(|edge| edge.class().is_crossing() && edge.state() == EdgeState::Separating)
            .count()
    }
}
