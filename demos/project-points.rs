// This is cut-and-pasted from the example in the docs of src/lib.rs.

fn main() {
    use cam_label::*;
    use nalgebra::Matrix3;

    // Create three points in the world coordinate frame.
    let world_coords = Points::new(Matrix3::new(
        0.0, 0.0, 0.0, // point 1, directly below the camera
        1.0, 0.0, 0.0, // point 2
        0.0, 1.0, 0.5, // point 3
    ));

    // 50mm lens on a 36mm wide sensor, rendering 1920x1080 at full size.
    let lens = LensParams {
        focal_length: 50.0,
        sensor_width: 36.0,
        clip_start: 0.1,
        clip_end: 200.0,
    };
    let target = RenderTarget::new(1920, 1080);

    // Camera 10 units above the origin, looking straight down.
    let camera = Camera::looking_down(10.0, lens, target).unwrap();

    // Project the 3D coordinates to 2D pixel coordinates.
    let pixel_coords = camera.world_to_pixel(&world_coords);

    // Print the results.
    for i in 0..world_coords.data.nrows() {
        let wc = world_coords.data.row(i);
        let pix = pixel_coords.data.row(i);
        println!("{} -> {}", wc, pix);
    }

    // The box around all three points, as a label record.
    let bbox = compute_box(&camera, 0, &world_coords, &BoxOptions::default()).unwrap();
    println!("{bbox}");
}
