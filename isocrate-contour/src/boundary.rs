//! Voxel location relative to the far faces of the volume
//!
//! Interior voxels own only edges 0, 4 and 8. A voxel touching the +x, +y or
//! +z face also owns the edges on that face, since no voxel lies beyond it.

/// 3-bit location code of a voxel: bit 0 = last along x, bit 1 = last along y,
/// bit 2 = last along z
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct VoxelLocation(u8);

impl VoxelLocation {
    pub const INTERIOR: VoxelLocation = VoxelLocation(0);
    pub const X_MAX: u8 = 1;
    pub const Y_MAX: u8 = 2;
    pub const Z_MAX: u8 = 4;

    /// Location of voxel `(i, j, k)` in a volume of `dims` grid points
    #[inline]
    pub fn of(i: usize, j: usize, k: usize, dims: [usize; 3]) -> Self {
        let mut code = 0;
        if i + 2 == dims[0] {
            code |= Self::X_MAX;
        }
        if j + 2 == dims[1] {
            code |= Self::Y_MAX;
        }
        if k + 2 == dims[2] {
            code |= Self::Z_MAX;
        }
        Self(code)
    }

    #[inline]
    pub fn code(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn is_interior(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn x_max(self) -> bool {
        self.0 & Self::X_MAX != 0
    }

    #[inline]
    pub fn y_max(self) -> bool {
        self.0 & Self::Y_MAX != 0
    }

    #[inline]
    pub fn z_max(self) -> bool {
        self.0 & Self::Z_MAX != 0
    }

    /// Edges besides 0, 4 and 8 whose points this voxel generates
    #[inline]
    pub fn extra_edges(self) -> &'static [usize] {
        BOUNDARY_EDGES[self.0 as usize]
    }
}

/// Extra owned edges per location code
const BOUNDARY_EDGES: [&[usize]; 8] = [
    &[],
    &[5, 9],
    &[1, 10],
    &[1, 5, 9, 10, 11],
    &[2, 6],
    &[2, 5, 6, 7, 9],
    &[1, 2, 3, 6, 10],
    &[1, 2, 3, 5, 6, 7, 9, 10, 11],
];
