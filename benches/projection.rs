use cam_label::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::{storage::Owned, Dyn, OMatrix, Point3, Translation3, U3};

fn generate_grid(half: usize, step: f64) -> Points<WorldFrame, f64, Dyn, Owned<f64, Dyn, U3>> {
    let n = 2 * half + 1;
    let mut data = OMatrix::<f64, Dyn, U3>::zeros(n * n);
    for row in 0..n {
        for col in 0..n {
            let i = row * n + col;
            data[(i, 0)] = (col as f64 - half as f64) * step;
            data[(i, 1)] = (row as f64 - half as f64) * step;
            data[(i, 2)] = ((row + col) % 7) as f64 * 0.1;
        }
    }
    Points::new(data)
}

fn criterion_benchmark(c: &mut Criterion) {
    let lens = LensParams {
        focal_length: 50.0,
        sensor_width: 36.0,
        clip_start: 0.1,
        clip_end: 200.0,
    };
    let intrinsics = SensorIntrinsics::new(lens, RenderTarget::new(1920, 1080)).unwrap();
    let pose = CameraPose::from_euler_xyz(Point3::new(1.2, -3.4, 50.0), 0.1, -0.05, 0.3);
    let camera = Camera::new(intrinsics, pose);

    let world_coords = generate_grid(50, 0.25);
    println!("{} points", world_coords.data.nrows());

    c.bench_function("world_to_camera", |b| {
        b.iter(|| camera.pose().world_to_camera(black_box(&world_coords)));
    });

    c.bench_function("world_to_pixel", |b| {
        b.iter(|| camera.world_to_pixel(black_box(&world_coords)));
    });

    c.bench_function("compute_box", |b| {
        b.iter(|| compute_box(&camera, 0, black_box(&world_coords), &BoxOptions::default()));
    });

    let objects: Vec<_> = (0..64)
        .map(|i| {
            let x = (i % 8) as f64 * 3.0 - 12.0;
            let y = (i / 8) as f64 * 3.0 - 12.0;
            let transform = Translation3::new(x, y, 0.0).to_homogeneous();
            SceneObject::cuboid("cube", i % 5, [1.0, 1.0, 1.0], transform)
        })
        .collect();
    let encoder = BoxEncoder::new(&camera, BoxOptions::default());
    c.bench_function("encode_objects box corners", |b| {
        b.iter(|| encoder.encode_objects(black_box(&objects), BoundingGeometry::BoxCorners));
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
