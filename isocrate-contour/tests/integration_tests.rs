//! Integration tests for isocrate-contour
//!
//! These tests run whole extractions and check the resulting meshes against
//! a brute-force marching-cubes reference and against topological invariants.

use approx::assert_relative_eq;
use isocrate_contour::case_table::{CUBE_EDGES, CUBE_VERTICES};
use isocrate_contour::classify::classify_voxel_rows;
use isocrate_contour::*;
use isocrate_core::{Error, ImageVolume, Point3f, ScalarVolume, TriangleMesh, Vector3f};
use itertools::iproduct;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

type TriangleKey = [[u32; 3]; 3];

/// Signed distance to a sphere centered in the volume
fn centered_sphere(n: usize, radius: f32) -> ImageVolume {
    let c = (n - 1) as f32 / 2.0;
    ImageVolume::sphere([n; 3], [1.0; 3], Point3f::origin(), Point3f::new(c, c, c), radius)
}

fn random_volume(dims: [usize; 3], seed: u64) -> ImageVolume {
    let mut rng = StdRng::seed_from_u64(seed);
    ImageVolume::from_fn(dims, [1.0; 3], Point3f::origin(), |_| rng.gen_range(-1.0..1.0))
}

fn serial(config: FlyingEdgesConfig) -> FlyingEdges {
    FlyingEdges::new(config.with_parallel(false))
}

fn point_key(p: &Point3f) -> [u32; 3] {
    [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]
}

fn mesh_triangles(mesh: &TriangleMesh) -> Vec<TriangleKey> {
    let mut keys: Vec<TriangleKey> = mesh
        .faces
        .iter()
        .map(|face| {
            let mut key = face.map(|id| point_key(&mesh.vertices[id]));
            key.sort_unstable();
            key
        })
        .collect();
    keys.sort_unstable();
    keys
}

/// Cube-at-a-time marching cubes over the canonical table
fn reference_triangles(volume: &ImageVolume, iso: f32) -> Vec<TriangleKey> {
    let [nx, ny, nz] = volume.dims();
    let origin = volume.origin();
    let spacing = volume.spacing();

    let edge_point = |base: [usize; 3], edge: usize| -> [u32; 3] {
        let [a, b] = CUBE_EDGES[edge];
        let (lo, hi) = if CUBE_VERTICES[a] <= CUBE_VERTICES[b] {
            (CUBE_VERTICES[a], CUBE_VERTICES[b])
        } else {
            (CUBE_VERTICES[b], CUBE_VERTICES[a])
        };
        let p0 = [base[0] + lo[0], base[1] + lo[1], base[2] + lo[2]];
        let p1 = [base[0] + hi[0], base[1] + hi[1], base[2] + hi[2]];
        let s0 = volume.scalar_at(p0[0], p0[1], p0[2]);
        let s1 = volume.scalar_at(p1[0], p1[1], p1[2]);
        let t = (iso - s0) / (s1 - s0);

        let axis = (0..3).find(|&d| p0[d] != p1[d]).unwrap();
        let mut grid_pos = [p0[0] as f32, p0[1] as f32, p0[2] as f32];
        grid_pos[axis] += t;
        point_key(&Point3f::new(
            origin.x + spacing[0] * grid_pos[0],
            origin.y + spacing[1] * grid_pos[1],
            origin.z + spacing[2] * grid_pos[2],
        ))
    };

    let mut keys = Vec::new();
    for (k, j, i) in iproduct!(0..nz - 1, 0..ny - 1, 0..nx - 1) {
        let mut mask = 0u8;
        for (v, offset) in CUBE_VERTICES.iter().enumerate() {
            if volume.scalar_at(i + offset[0], j + offset[1], k + offset[2]) < iso {
                mask |= 1 << v;
            }
        }
        for tri in CanonicalCaseTable::triangles(mask) {
            let mut key = tri.map(|edge| edge_point([i, j, k], edge as usize));
            key.sort_unstable();
            keys.push(key);
        }
    }
    keys.sort_unstable();
    keys
}

fn assert_distinct_ids(mesh: &TriangleMesh) {
    for face in &mesh.faces {
        assert!(face[0] != face[1] && face[1] != face[2] && face[0] != face[2]);
        assert!(face.iter().all(|&id| id < mesh.vertex_count()));
    }
}

#[test]
fn test_sphere_scenario() {
    let mesh = flying_edges(&centered_sphere(8, 3.0), 0.0).unwrap();
    let center = Point3f::new(3.5, 3.5, 3.5);

    assert!(mesh.face_count() > 0);
    for vertex in &mesh.vertices {
        assert_relative_eq!((vertex - center).magnitude(), 3.0, epsilon = 0.1);
    }
}

#[test]
fn test_sphere_is_closed_surface() {
    for (n, radius) in [(8, 3.0), (8, 2.5), (16, 5.0)] {
        let mesh = flying_edges(&centered_sphere(n, radius), 0.0).unwrap();

        assert_eq!(mesh.euler_characteristic(), 2, "sphere n={n} r={radius}");
        assert!(mesh.edge_face_counts().values().all(|&count| count == 2));
        assert_distinct_ids(&mesh);
    }
}

#[test]
fn test_sphere_counts() {
    let mesh = flying_edges(&centered_sphere(8, 3.0), 0.0).unwrap();

    assert_eq!(mesh.vertex_count(), 192);
    assert_eq!(mesh.face_count(), 380);
    assert_eq!(mesh.to_cell_array().len(), 4 * 380);
}

#[test]
fn test_sphere_normals_point_inward() {
    let mesh = flying_edges(&centered_sphere(12, 4.0), 0.0).unwrap();
    let normals = mesh.normals.as_ref().unwrap();
    let center = Point3f::new(5.5, 5.5, 5.5);

    for (vertex, normal) in mesh.vertices.iter().zip(normals) {
        assert_relative_eq!(normal.magnitude(), 1.0, epsilon = 1e-4);
        let inward = (center - vertex).normalize();
        assert!(normal.dot(&inward) > 0.9);
    }
}

#[test]
fn test_gradients_follow_distance_field() {
    let config = FlyingEdgesConfig::default().with_gradients(true);
    let mesh = FlyingEdges::new(config).extract(&centered_sphere(12, 4.0)).unwrap();

    for gradient in mesh.gradients.as_ref().unwrap() {
        assert!((gradient.magnitude() - 1.0).abs() < 0.15);
    }
}

#[test]
fn test_matches_reference_marching_cubes() {
    for (seed, dims) in [(1, [5, 4, 6]), (2, [2, 2, 2]), (3, [7, 3, 2]), (4, [3, 6, 5])] {
        let volume = random_volume(dims, seed);
        let mesh = serial(FlyingEdgesConfig::default()).extract(&volume).unwrap();

        assert_eq!(mesh_triangles(&mesh), reference_triangles(&volume, 0.0), "seed {seed}");
        assert_distinct_ids(&mesh);
    }
}

#[test]
fn test_matches_reference_on_exact_values() {
    let mut rng = StdRng::seed_from_u64(7);
    let volume = ImageVolume::from_fn([6, 5, 4], [0.5, 1.0, 2.0], Point3f::new(-1.0, 2.0, 0.5), |_| {
        [-1.0, 0.0, 1.0, 2.0][rng.gen_range(0..4)]
    });
    let mesh = flying_edges(&volume, 0.0).unwrap();

    assert_eq!(mesh_triangles(&mesh), reference_triangles(&volume, 0.0));
}

#[test]
fn test_every_point_is_referenced() {
    let volume = random_volume([6, 6, 6], 11);
    let mesh = flying_edges(&volume, 0.0).unwrap();

    let mut used = vec![false; mesh.vertex_count()];
    for face in &mesh.faces {
        for &id in face {
            used[id] = true;
        }
    }
    assert!(used.into_iter().all(|u| u));
}

#[test]
fn test_empty_tsdf_volume() {
    let volume = ImageVolume::from_fn([6, 6, 6], [1.0; 3], Point3f::origin(), |_| -1.0).with_radius(1.0);

    for hole_filling in [false, true] {
        let config = FlyingEdgesConfig::default().with_hole_filling(hole_filling);
        let mesh = FlyingEdges::new(config).extract(&volume).unwrap();
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.face_count(), 0);
    }
}

#[test]
fn test_constant_volume_at_contour_value() {
    let volume = ImageVolume::from_fn([5, 5, 5], [1.0; 3], Point3f::origin(), |_| 0.25);
    let (mesh, stats) = FlyingEdges::new(FlyingEdgesConfig::default().with_iso_value(0.25))
        .extract_with_stats(&volume)
        .unwrap();

    assert_eq!(mesh.face_count(), 0);
    assert_eq!(mesh.vertex_count(), 0);
    assert_eq!(stats.voxel_rows_skipped, stats.voxel_rows);
    assert!(mesh.vertices.iter().all(|p| p.iter().all(|c| c.is_finite())));
}

#[test]
fn test_single_corner_below() {
    let mut volume = ImageVolume::from_fn([2, 2, 2], [1.0; 3], Point3f::origin(), |_| 1.0);
    volume.set(0, 0, 0, -1.0).unwrap();

    let mesh = flying_edges(&volume, 0.0).unwrap();

    assert_eq!(mesh.face_count(), 1);
    assert_eq!(mesh.vertex_count(), 3);
    assert_eq!(mesh.faces, vec![[0, 2, 1]]);
    assert_eq!(mesh.vertices[0], Point3f::new(0.5, 0.0, 0.0));
    assert_eq!(mesh.vertices[1], Point3f::new(0.0, 0.5, 0.0));
    assert_eq!(mesh.vertices[2], Point3f::new(0.0, 0.0, 0.5));
}

#[test]
fn test_repeated_runs_are_identical() {
    let volume = random_volume([9, 8, 10], 5);
    let engine = FlyingEdges::new(FlyingEdgesConfig::default().with_gradients(true));

    let first = engine.extract(&volume).unwrap();
    let second = engine.extract(&volume).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_serial_and_parallel_agree() {
    let volume = random_volume([10, 9, 8], 21);
    let config = FlyingEdgesConfig::default().with_gradients(true).with_scalars(true);

    let parallel = FlyingEdges::new(config.clone()).extract(&volume).unwrap();
    let serial = serial(config).extract(&volume).unwrap();
    assert_eq!(parallel, serial);
}

#[test]
fn test_offsets_partition_random_volume() {
    let volume = random_volume([7, 6, 5], 3);
    let grid = EdgeGrid::scan(&volume, &ContourParams::new(0.0), true);
    let rows = classify_voxel_rows(&grid, EdgeCaseTable::shared(), false, true);
    let plan = OffsetPlan::plan(&grid, &rows);

    let mut next = (0, 0);
    for (points, triangles) in plan.row_ranges() {
        assert_eq!((points.start, triangles.start), next);
        next = (points.end, triangles.end);
    }
    assert_eq!(next, (plan.num_points(), plan.num_triangles()));

    let mesh = flying_edges(&volume, 0.0).unwrap();
    assert_eq!(mesh.vertex_count(), plan.num_points());
    assert_eq!(mesh.face_count(), plan.num_triangles());
}

#[test]
fn test_truncated_sphere_without_hole_filling() {
    let full = flying_edges(&centered_sphere(12, 3.0), 0.0).unwrap();
    let volume = centered_sphere(12, 3.0).truncate(1.0);
    let mesh = flying_edges(&volume, 0.0).unwrap();

    assert!(mesh.face_count() > 0);
    assert!(mesh.face_count() < full.face_count());
    assert_distinct_ids(&mesh);
    // Open patches, but never more than two faces on an edge
    assert!(mesh.edge_face_counts().values().all(|&count| count <= 2));
}

#[test]
fn test_hole_filling_closes_truncated_sphere() {
    let full = flying_edges(&centered_sphere(12, 3.0), 0.0).unwrap();
    let volume = centered_sphere(12, 3.0).truncate(1.0);
    let config = FlyingEdgesConfig::default().with_hole_filling(true);
    let mesh = FlyingEdges::new(config).extract(&volume).unwrap();

    assert_eq!(mesh.face_count(), full.face_count());
    assert_eq!(mesh.euler_characteristic(), 2);
}

#[test]
fn test_empty_unseen_boundary_needs_hole_filling() {
    let volume = ImageVolume::from_fn([4, 4, 4], [1.0; 3], Point3f::origin(), |p| {
        if p.x < 1.5 {
            -1.0
        } else {
            1.0
        }
    })
    .with_radius(1.0);

    let (plain, stats) = FlyingEdges::new(FlyingEdgesConfig::default())
        .extract_with_stats(&volume)
        .unwrap();
    assert_eq!(plain.face_count(), 0);
    assert_eq!(plain.vertex_count(), 0);
    assert_eq!(stats.separating_x_edges, 16);

    let config = FlyingEdgesConfig::default().with_hole_filling(true);
    let (filled, stats) = FlyingEdges::new(config).extract_with_stats(&volume).unwrap();
    assert_eq!(stats.separating_x_edges, 16);
    assert_eq!(filled.vertex_count(), 16);
    assert_eq!(filled.face_count(), 18);
    assert!(filled.vertices.iter().all(|p| p.x == 1.5));
}

#[test]
fn test_nan_propagates_to_points() {
    let mut volume = ImageVolume::from_fn([2, 2, 2], [1.0; 3], Point3f::origin(), |_| 1.0);
    volume.set(0, 0, 0, f32::NAN).unwrap();

    let mesh = flying_edges(&volume, 0.0).unwrap();
    assert_eq!(mesh.face_count(), 1);
    assert!(mesh.vertices.iter().all(|p| p.x.is_nan() || p.y.is_nan() || p.z.is_nan()));
}

#[test]
fn test_spacing_and_origin_are_applied() {
    let volume = ImageVolume::from_fn([4, 3, 3], [0.5, 2.0, 1.0], Point3f::new(10.0, -2.0, 1.0), |p| {
        p.x - 10.75
    });
    let mesh = flying_edges(&volume, 0.0).unwrap();

    assert!(mesh.vertex_count() > 0);
    for vertex in &mesh.vertices {
        assert_relative_eq!(vertex.x, 10.75, epsilon = 1e-5);
    }
}

#[test]
fn test_gradients_on_far_faces_are_exact() {
    // Plane 0.7x + 0.4y + 0.3z = const cuts the +x, +y and +z faces of the grid
    let origin = Point3f::new(1.0, -2.0, 0.5);
    let volume = ImageVolume::from_fn([5, 4, 6], [0.5, 2.0, 1.0], origin, |p| {
        0.7 * (p.x - origin.x) + 0.4 * (p.y - origin.y) + 0.3 * (p.z - origin.z) - 2.6
    });
    let config = FlyingEdgesConfig::default().with_gradients(true);
    let mesh = FlyingEdges::new(config).extract(&volume).unwrap();

    let far = Point3f::new(3.0, 4.0, 5.5);
    for axis in 0..3 {
        assert!(
            mesh.vertices.iter().any(|p| (p[axis] - far[axis]).abs() < 1e-5),
            "no points on far face {axis}"
        );
    }

    let expected = Vector3f::new(0.7, 0.4, 0.3);
    let normal = -expected.normalize();
    let gradients = mesh.gradients.as_ref().unwrap();
    let normals = mesh.normals.as_ref().unwrap();
    for (gradient, n) in gradients.iter().zip(normals) {
        assert_relative_eq!(*gradient, expected, epsilon = 1e-4);
        assert_relative_eq!(*n, normal, epsilon = 1e-4);
    }
}

#[test]
fn test_face_normals_finite_on_ties() {
    let mut volume = ImageVolume::from_fn([2, 2, 2], [1.0; 3], Point3f::origin(), |_| -1.0);
    volume.set(0, 0, 0, 0.0).unwrap();

    let mesh = flying_edges(&volume, 0.0).unwrap();
    assert_eq!(mesh.face_count(), 1);
    assert!(mesh.vertices.iter().all(|p| *p == Point3f::origin()));

    let normals = mesh.calculate_face_normals();
    assert_eq!(normals, vec![Vector3f::zeros()]);

    let mut rng = StdRng::seed_from_u64(13);
    let ties = ImageVolume::from_fn([6, 6, 6], [1.0; 3], Point3f::origin(), |_| {
        [-1.0, 0.0, 1.0][rng.gen_range(0..3)]
    });
    let mesh = flying_edges(&ties, 0.0).unwrap();
    assert!(mesh
        .calculate_face_normals()
        .iter()
        .all(|n| n.iter().all(|c| c.is_finite())));
}

#[test]
fn test_extract_many_concatenates_surfaces() -> anyhow::Result<()> {
    let volume = centered_sphere(14, 3.0);
    let engine = FlyingEdges::new(FlyingEdgesConfig::default().with_scalars(true));

    let inner = engine.extract(&volume)?;
    let both = engine.extract_many(&volume, &[0.0, 2.0])?;

    assert!(both.face_count() > 2 * inner.face_count());
    assert_eq!(both.euler_characteristic(), 4);
    assert_distinct_ids(&both);

    let scalars = both.scalars.as_ref().unwrap();
    assert_eq!(scalars[0], 0.0);
    assert_eq!(scalars[both.vertex_count() - 1], 2.0);
    Ok(())
}

#[test]
fn test_cancellation_between_passes() {
    let abort = AbortFlag::new();
    abort.abort();
    let engine = FlyingEdges::new(FlyingEdgesConfig::default().with_abort_flag(abort));

    match engine.extract(&centered_sphere(8, 3.0)) {
        Err(Error::Cancelled(message)) => assert!(message.contains("x-edge")),
        other => panic!("expected cancellation, got {:?}", other.map(|m| m.face_count())),
    }
}

#[test]
fn test_invalid_volumes_are_rejected() {
    let flat = ImageVolume::new([5, 5, 1], [1.0; 3], Point3f::origin());
    assert!(matches!(
        flying_edges(&flat, 0.0),
        Err(Error::InvalidDimensions { .. })
    ));

    let bad_spacing = ImageVolume::new([3, 3, 3], [1.0, f32::NAN, 1.0], Point3f::origin());
    assert!(matches!(flying_edges(&bad_spacing, 0.0), Err(Error::InvalidData(_))));
}

#[test]
fn test_thread_pool_configuration() {
    let config = ThreadPoolConfig::default().with_threads(2);
    init_thread_pool(config).unwrap();

    let mesh = flying_edges(&centered_sphere(10, 3.5), 0.0).unwrap();
    assert_eq!(mesh.euler_characteristic(), 2);
}
