//! Pass 4: point and triangle generation
//!
//! Every voxel slice writes into its own disjoint block of the pre-sized output
//! arrays. Point ids are tracked with twelve running counters per voxel row,
//! one per voxel edge, advanced past each active edge.

use crate::boundary::VoxelLocation;
use crate::classify::VoxelRowCounts;
use crate::edge_cases::{edge_axis, vertex_offset, EdgeCaseTable, Voxel, EDGE_VERTICES};
use crate::gradient::{grid_gradient, normal_from_gradient};
use crate::offsets::OffsetPlan;
use crate::scan::{ContourParams, EdgeGrid};
use isocrate_core::{Point3f, ScalarVolume, Vector3f};
use rayon::prelude::*;

/// Edges every voxel generates points for
const AXIS_EDGES: [usize; 3] = [0, 4, 8];

/// Output buffers, sized from the offset plan
#[derive(Debug, Clone, Default)]
pub struct MeshBuffers {
    pub points: Vec<Point3f>,
    pub triangles: Vec<[usize; 3]>,
    pub normals: Option<Vec<Vector3f>>,
    pub gradients: Option<Vec<Vector3f>>,
}

impl MeshBuffers {
    pub fn allocate(plan: &OffsetPlan, normals: bool, gradients: bool) -> Self {
        let n = plan.num_points();
        Self {
            points: vec![Point3f::origin(); n],
            triangles: vec![[0; 3]; plan.num_triangles()],
            normals: normals.then(|| vec![Vector3f::zeros(); n]),
            gradients: gradients.then(|| vec![Vector3f::zeros(); n]),
        }
    }
}

/// The part of the output one voxel slice writes
struct SliceOutput<'a> {
    k: usize,
    point_base: usize,
    triangle_base: usize,
    points: &'a mut [Point3f],
    triangles: &'a mut [[usize; 3]],
    normals: Option<&'a mut [Vector3f]>,
    gradients: Option<&'a mut [Vector3f]>,
}

/// Read-only state shared by all slices
pub struct Emitter<'a, V: ?Sized> {
    pub volume: &'a V,
    pub grid: &'a EdgeGrid,
    pub table: &'a EdgeCaseTable,
    pub voxel_rows: &'a [VoxelRowCounts],
    pub plan: &'a OffsetPlan,
    pub params: ContourParams,
}

impl<'a, V: ScalarVolume + ?Sized> Emitter<'a, V> {
    /// Fill `buffers` for every voxel slice
    pub fn emit(&self, buffers: &mut MeshBuffers, parallel: bool) {
        // One block per voxel slice; the last one also holds the far z face
        let slices = 0..self.grid.dims()[2] - 1;
        let point_bounds: Vec<usize> = slices
            .clone()
            .map(|k| self.plan.slice_point_start(k))
            .collect();
        let triangle_bounds: Vec<usize> = slices
            .map(|k| self.plan.slice_triangle_start(k))
            .collect();

        let mut normals = buffers
            .normals
            .as_deref_mut()
            .map(|n| split_by(n, &point_bounds).into_iter());
        let mut gradients = buffers
            .gradients
            .as_deref_mut()
            .map(|g| split_by(g, &point_bounds).into_iter());

        let slices: Vec<SliceOutput<'_>> = split_by(&mut buffers.points, &point_bounds)
            .into_iter()
            .zip(split_by(&mut buffers.triangles, &triangle_bounds))
            .enumerate()
            .map(|(k, (points, triangles))| SliceOutput {
                k,
                point_base: point_bounds[k],
                triangle_base: triangle_bounds[k],
                points,
                triangles,
                normals: normals.as_mut().and_then(Iterator::next),
                gradients: gradients.as_mut().and_then(Iterator::next),
            })
            .collect();

        if parallel {
            slices.into_par_iter().for_each(|mut slice| self.emit_slice(&mut slice));
        } else {
            slices.into_iter().for_each(|mut slice| self.emit_slice(&mut slice));
        }
    }

    fn emit_slice(&self, out: &mut SliceOutput<'_>) {
        let ny = self.grid.dims()[1];
        for j in 0..ny - 1 {
            self.emit_voxel_row(j, out);
        }
    }

    fn emit_voxel_row(&self, j: usize, out: &mut SliceOutput<'_>) {
        let k = out.k;
        let dims = self.grid.dims();
        let counts = &self.voxel_rows[k * (dims[1] - 1) + j];
        let Some(trim) = counts.trim.clone() else {
            return;
        };

        let own = self.plan.offsets(j, k);
        let up_y = self.plan.offsets(j + 1, k);
        let up_z = self.plan.offsets(j, k + 1);
        let up_yz = self.plan.offsets(j + 1, k + 1);

        let mut ids = [0usize; 12];
        ids[0] = own.x;
        ids[1] = up_y.x;
        ids[2] = up_z.x;
        ids[3] = up_yz.x;
        ids[4] = own.y;
        ids[6] = up_z.y;
        ids[8] = own.z;
        ids[10] = up_y.z;

        let mut next_triangle = own.triangles - out.triangle_base;

        for i in trim {
            let voxel = self.table.voxel(&self.grid.corners(i, j, k), self.params.hole_filling);
            let entry = self.table.entry(voxel.case);
            if entry.num_triangles() == 0 {
                continue;
            }

            ids[5] = ids[4] + voxel.step(4);
            ids[7] = ids[6] + voxel.step(6);
            ids[9] = ids[8] + voxel.step(8);
            ids[11] = ids[10] + voxel.step(10);

            if voxel.valid {
                for tri in entry.triangles() {
                    let face = tri.map(|edge| ids[edge as usize]);
                    debug_assert!(face[0] != face[1] && face[1] != face[2] && face[0] != face[2]);
                    out.triangles[next_triangle] = face;
                    next_triangle += 1;
                }
            }

            let location = VoxelLocation::of(i, j, k, dims);
            if entry.includes_axes || !location.is_interior() {
                for &edge in AXIS_EDGES.iter().chain(location.extra_edges()) {
                    if voxel.active[edge] {
                        self.emit_point(i, j, k, edge, ids[edge], out);
                    }
                }
            }

            advance(&mut ids, &voxel);
        }
    }

    /// Interpolate the point on `edge` of voxel `(i, j, k)` into slot `id`
    fn emit_point(
        &self,
        i: usize,
        j: usize,
        k: usize,
        edge: usize,
        id: usize,
        out: &mut SliceOutput<'_>,
    ) {
        let [a, b] = EDGE_VERTICES[edge];
        let [da, db] = [vertex_offset(a), vertex_offset(b)];
        let p0 = [i + da[0], j + da[1], k + da[2]];
        let p1 = [i + db[0], j + db[1], k + db[2]];

        let s0 = self.volume.scalar_at(p0[0], p0[1], p0[2]);
        let s1 = self.volume.scalar_at(p1[0], p1[1], p1[2]);
        let t = (self.params.iso_value - s0) / (s1 - s0);

        let origin = self.volume.origin();
        let spacing = self.volume.spacing();
        let axis = edge_axis(edge);
        let mut grid_pos = [p0[0] as f32, p0[1] as f32, p0[2] as f32];
        grid_pos[axis] += t;

        let slot = id - out.point_base;
        out.points[slot] = Point3f::new(
            origin.x + spacing[0] * grid_pos[0],
            origin.y + spacing[1] * grid_pos[1],
            origin.z + spacing[2] * grid_pos[2],
        );

        if out.normals.is_none() && out.gradients.is_none() {
            return;
        }
        let g0 = grid_gradient(self.volume, p0);
        let g1 = grid_gradient(self.volume, p1);
        let gradient = g0 + (g1 - g0) * t;

        if let Some(normals) = out.normals.as_deref_mut() {
            normals[slot] = normal_from_gradient(&gradient);
        }
        if let Some(gradients) = out.gradients.as_deref_mut() {
            gradients[slot] = gradient;
        }
    }
}

/// Move the running ids past voxel `i` to voxel `i + 1`
#[inline]
fn advance(ids: &mut [usize; 12], voxel: &Voxel) {
    for edge in [0, 1, 2, 3, 4, 6, 8, 10] {
        ids[edge] += voxel.step(edge);
    }
}

/// Cut `data` into consecutive blocks `[bounds[n], bounds[n + 1])`, the last
/// block running to the end
fn split_by<'a, T>(mut data: &'a mut [T], bounds: &[usize]) -> Vec<&'a mut [T]> {
    let mut parts = Vec::with_capacity(bounds.len());
    for (n, &start) in bounds.iter().enumerate() {
        let end = bounds.get(n + 1).copied();
        let len = end.map_or(data.len(), |end| end - start);
        let (head, tail) = std::mem::take(&mut data).split_at_mut(len);
        parts.push(head);
        data = tail;
    }
    parts
}
