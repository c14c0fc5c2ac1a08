//! Generates one labelled frame of a procedural scene: a few primitives seen
//! by the configured camera. The rendered image is stood in for by a blank
//! canvas, so the overlay shows the boxes only.
//!
//! Usage: `annotate-scene [config.json]`. Without a configuration file the
//! defaults are used with all output under `./annotate-scene-output`.

use std::error::Error;

use cam_label::{
    config::GeneratorConfig, labels, visualize, AnnotatedBox, BoxEncoder, SceneObject,
};
use image::{Rgb, RgbImage};
use nalgebra::{Matrix4, Rotation3, Translation3, Vector3};

fn scene() -> Vec<SceneObject<f64>> {
    let place = |x: f64, y: f64, yaw_degrees: f64| {
        Translation3::new(x, y, 0.0).to_homogeneous()
            * Rotation3::from_axis_angle(&Vector3::z_axis(), yaw_degrees.to_radians())
                .to_homogeneous()
    };
    vec![
        SceneObject::cuboid("cube", 0, [2.0, 2.0, 2.0], place(-8.0, 5.0, 30.0)),
        SceneObject::cuboid("slab", 1, [4.0, 1.0, 0.5], place(10.0, -3.0, -15.0)),
        SceneObject::cuboid("pillar", 3, [1.0, 1.0, 6.0], place(0.0, 0.0, 0.0)),
        SceneObject::cuboid(
            "flat",
            4,
            [3.0, 3.0, 0.2],
            place(-15.0, -12.0, 45.0) * Matrix4::new_nonuniform_scaling(&Vector3::new(1.5, 0.5, 1.0)),
        ),
        // Outside the field of view; produces a clipped box.
        SceneObject::cuboid("stray", 2, [1.0, 1.0, 1.0], place(80.0, 0.0, 0.0)),
        SceneObject::new("empty", 2, Matrix4::identity(), Vec::new()),
    ]
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cfg = match std::env::args().nth(1) {
        Some(path) => GeneratorConfig::from_json_file(path)?,
        None => {
            let mut cfg = GeneratorConfig::default();
            cfg.paths.images = "annotate-scene-output/images".into();
            cfg.paths.labels = "annotate-scene-output/labels".into();
            cfg.paths.vis = "annotate-scene-output/images/vis".into();
            cfg.create_visualization = true;
            cfg
        }
    };

    let camera = cfg.camera()?;
    let encoder = BoxEncoder::new(&camera, cfg.box_options());
    let objects = scene();

    let mut boxes: Vec<AnnotatedBox> = Vec::new();
    for (obj, result) in objects
        .iter()
        .zip(encoder.encode_objects(&objects, cfg.annotation.geometry))
    {
        match result {
            Ok(bbox) => boxes.push(bbox),
            Err(e) => log::warn!("skipping {}: {e}", obj.name),
        }
    }

    std::fs::create_dir_all(&cfg.paths.labels)?;
    let label_path = cfg.label_path(0);
    labels::write_records(&boxes, &label_path)?;
    println!("{} boxes written to {}", boxes.len(), label_path.display());

    if cfg.create_visualization {
        let target = camera.render_target();
        std::fs::create_dir_all(&cfg.paths.images)?;
        let image_path = cfg.image_path(0);
        RgbImage::from_pixel(target.resolution_x, target.resolution_y, Rgb([40, 40, 40]))
            .save(&image_path)?;

        let report = visualize::visualize_file(
            &image_path,
            &label_path,
            cfg.vis_path(0),
            &cfg.palette(),
        )?;
        println!(
            "overlay with {} boxes written to {}",
            report.drawn,
            cfg.vis_path(0).display()
        );
    }
    Ok(())
}
