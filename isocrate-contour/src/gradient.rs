//! Finite-difference gradients at grid points

use isocrate_core::{ScalarVolume, Vector3f};

/// Gradient of the scalar field at grid point `ijk`
///
/// Central differences in the interior; forward difference at index 0 and
/// backward difference at the last index of each axis.
pub fn grid_gradient<V: ScalarVolume + ?Sized>(volume: &V, ijk: [usize; 3]) -> Vector3f {
    let dims = volume.dims();
    let spacing = volume.spacing();
    let sample = |p: [usize; 3]| volume.scalar_at(p[0], p[1], p[2]);

    let mut gradient = Vector3f::zeros();
    for axis in 0..3 {
        let at = |index: usize| {
            let mut p = ijk;
            p[axis] = index;
            sample(p)
        };
        let c = ijk[axis];
        let last = dims[axis] - 1;

        gradient[axis] = if c == 0 {
            (at(1) - at(0)) / spacing[axis]
        } else if c == last {
            (at(last) - at(last - 1)) / spacing[axis]
        } else {
            (at(c + 1) - at(c - 1)) / (2.0 * spacing[axis])
        };
    }
    gradient
}

/// Normal from a gradient: the negated gradient, normalized; zero when the gradient vanishes
#[inline]
pub fn normal_from_gradient(gradient: &Vector3f) -> Vector3f {
    (-gradient).try_normalize(0.0).unwrap_or_else(Vector3f::zeros)
}
