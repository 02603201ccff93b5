//! Edge-oriented case table
//!
//! Voxel vertices are numbered `v = dx + 2*dy + 4*dz`. Edges 0..4 run along x
//! (at the four y-z corners), 4..8 along y and 8..12 along z. Within each axis
//! group the first edge is the one touching vertex 0 and the rest follow the
//! remaining corner order, so edge `e` of a voxel row always lines up with
//! edge `e` of its neighbour along x.

use crate::case_table::CanonicalCaseTable;
use crate::edge_class::{voxel_case, EdgeCase};
use std::sync::OnceLock;

/// Endpoint vertices of every voxel edge
pub const EDGE_VERTICES: [[usize; 2]; 12] = [
    [0, 1],
    [2, 3],
    [4, 5],
    [6, 7],
    [0, 2],
    [1, 3],
    [4, 6],
    [5, 7],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

/// Canonical cube vertex to voxel vertex
pub const VERT_MAP: [usize; 8] = [0, 1, 3, 2, 4, 5, 7, 6];

/// Canonical cube edge to voxel edge
pub const EDGE_MAP: [usize; 12] = [0, 5, 1, 4, 2, 7, 3, 6, 8, 9, 11, 10];

/// Grid offset of a voxel vertex
#[inline]
pub const fn vertex_offset(v: usize) -> [usize; 3] {
    [v & 1, (v >> 1) & 1, v >> 2]
}

/// Axis an edge runs along
#[inline]
pub const fn edge_axis(edge: usize) -> usize {
    edge / 4
}

/// Triangulation of one voxel case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaseEntry {
    triangles: [[u8; 3]; 5],
    num_triangles: u8,
    /// Edges referenced by at least one triangle
    pub edge_uses: [bool; 12],
    /// Any of edges 0, 4 or 8 is used
    pub includes_axes: bool,
}

impl CaseEntry {
    const EMPTY: CaseEntry = CaseEntry {
        triangles: [[0; 3]; 5],
        num_triangles: 0,
        edge_uses: [false; 12],
        includes_axes: false,
    };

    pub fn num_triangles(&self) -> usize {
        self.num_triangles as usize
    }

    /// Triangles as voxel edge triples
    pub fn triangles(&self) -> &[[u8; 3]] {
        &self.triangles[..self.num_triangles as usize]
    }
}

/// 256 voxel cases indexed by [`voxel_case`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeCaseTable {
    cases: [CaseEntry; 256],
}

static SHARED_TABLE: OnceLock<EdgeCaseTable> = OnceLock::new();

impl EdgeCaseTable {
    /// Derive the edge-oriented table from the canonical one
    pub fn build() -> Self {
        let mut cases = [CaseEntry::EMPTY; 256];

        for (case, entry) in cases.iter_mut().enumerate() {
            let mask = canonical_mask(case as u8);

            for tri in CanonicalCaseTable::triangles(mask) {
                let mapped = tri.map(|edge| EDGE_MAP[edge as usize] as u8);
                if mapped[0] == mapped[1] || mapped[1] == mapped[2] || mapped[0] == mapped[2] {
                    continue;
                }
                entry.triangles[entry.num_triangles as usize] = mapped;
                entry.num_triangles += 1;
                for edge in mapped {
                    entry.edge_uses[edge as usize] = true;
                }
            }

            entry.includes_axes = entry.edge_uses[0] || entry.edge_uses[4] || entry.edge_uses[8];
        }

        Self { cases }
    }

    /// Process-wide table, built on first use
    pub fn shared() -> &'static EdgeCaseTable {
        SHARED_TABLE.get_or_init(Self::build)
    }

    #[inline]
    pub fn entry(&self, case: u8) -> &CaseEntry {
        &self.cases[case as usize]
    }

    /// Look up a voxel from its four bounding x-edges
    pub fn voxel(&self, corners: &[EdgeCase; 4], hole_filling: bool) -> Voxel {
        let case = voxel_case(corners);
        let mut legal = [false; 8];
        for (n, edge) in corners.iter().enumerate() {
            legal[2 * n] = edge.left_state().is_legal(hole_filling);
            legal[2 * n + 1] = edge.right_state().is_legal(hole_filling);
        }

        let uses = &self.cases[case as usize].edge_uses;
        let mut active = [false; 12];
        for (e, slot) in active.iter_mut().enumerate() {
            let [a, b] = EDGE_VERTICES[e];
            *slot = uses[e] && legal[a] && legal[b];
        }

        Voxel {
            case,
            valid: legal.iter().all(|&l| l),
            active,
        }
    }
}

/// Canonical vertex mask (bit set = below) of a voxel case
fn canonical_mask(case: u8) -> u8 {
    let mut above = [false; 8];
    for n in 0..4 {
        let bits = (case >> (2 * n)) & 0b11;
        above[2 * n] = bits & 1 != 0;
        above[2 * n + 1] = bits & 2 != 0;
    }

    VERT_MAP
        .iter()
        .enumerate()
        .filter(|(_, v)| !above[**v])
        .fold(0u8, |mask, (canonical, _)| mask | 1 << canonical)
}

/// One voxel resolved against the case table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Voxel {
    pub case: u8,
    /// All eight corners are legal, so the voxel may emit triangles
    pub valid: bool,
    /// Edges that cross the contour between two legal corners
    pub active: [bool; 12],
}

impl Voxel {
    /// 0 or 1, for advancing point ids along a row
    #[inline]
    pub fn step(&self, edge: usize) -> usize {
        usize::from(self.active[edge])
    }
}

/// The canonical cube vertex that a voxel vertex corresponds to
pub fn canonical_vertex(v: usize) -> Option<usize> {
    VERT_MAP.iter().position(|&m| m == v)
}
