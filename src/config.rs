//! Every section and field is optional in the JSON document and falls back to
//! the defaults below: a camera 100 units above the origin looking straight
//! down, 1920x1080 output and 1% box padding.
//!
//! ```
//! use cam_label::config::GeneratorConfig;
//!
//! let cfg = GeneratorConfig::from_json_str(
//!     r#"{ "render": { "resolution_x": 640, "resolution_y": 480 },
//!          "annotation": { "padding": 0.0, "geometry": "box_corners" } }"#,
//! )
//! .unwrap();
//! assert_eq!(cfg.camera.position, [0.0, 0.0, 100.0]);
//! assert_eq!(cfg.render.resolution_percentage, 100);
//! let camera = cfg.camera().unwrap();
//! assert_eq!(camera.render_target().resolution_x, 640);
//! ```

use std::path::{Path, PathBuf};

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::{
    labels, BoundingGeometry, BoxOptions, Camera, CameraPose, ClassPalette, Error, LensParams,
    RenderTarget, SensorIntrinsics,
};

/// Position, orientation and lens of the rendering camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Position in world units.
    pub position: [f64; 3],
    /// XYZ Euler rotation in degrees. All zeros looks straight down.
    pub rotation_degrees: [f64; 3],
    /// Focal length in millimetres.
    pub focal_length: f64,
    /// Sensor width in millimetres.
    pub sensor_width: f64,
    /// Near clipping distance.
    pub clip_start: f64,
    /// Far clipping distance.
    pub clip_end: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 100.0],
            rotation_degrees: [0.0, 0.0, 0.0],
            focal_length: 50.0,
            sensor_width: 36.0,
            clip_start: 0.1,
            clip_end: 200.0,
        }
    }
}

impl CameraConfig {
    /// The lens described by this section.
    pub fn lens(&self) -> LensParams<f64> {
        LensParams {
            focal_length: self.focal_length,
            sensor_width: self.sensor_width,
            clip_start: self.clip_start,
            clip_end: self.clip_end,
        }
    }

    /// The pose described by this section.
    pub fn pose(&self) -> CameraPose<f64> {
        let [x, y, z] = self.position;
        let [rx, ry, rz] = self.rotation_degrees.map(f64::to_radians);
        CameraPose::from_euler_xyz(Point3::new(x, y, z), rx, ry, rz)
    }
}

/// How boxes are computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Fractional growth of box width and height.
    pub padding: f64,
    /// Which object points are projected.
    pub geometry: BoundingGeometry,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            padding: BoxOptions::default().padding,
            geometry: BoundingGeometry::default(),
        }
    }
}

/// Class names and overlay colours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Class names, indexed by class.
    pub classes: Vec<String>,
    /// Overlay colours, indexed by class.
    pub class_colours: Vec<[u8; 3]>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        let ClassPalette { names, colours } = ClassPalette::default();
        Self {
            classes: names,
            class_colours: colours,
        }
    }
}

/// Output directories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Rendered images.
    pub images: PathBuf,
    /// Label files.
    pub labels: PathBuf,
    /// Overlay images.
    pub vis: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            images: PathBuf::from("./images"),
            labels: PathBuf::from("./labels"),
            vis: PathBuf::from("./images/vis"),
        }
    }
}

/// Complete configuration of a label generation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Camera section.
    pub camera: CameraConfig,
    /// Output resolution.
    pub render: RenderTarget,
    /// Box computation.
    pub annotation: AnnotationConfig,
    /// Class table.
    pub output: OutputConfig,
    /// Output directories.
    pub paths: PathsConfig,
    /// Whether to write overlay images next to the labels.
    pub create_visualization: bool,
}

impl GeneratorConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let cfg = Self::from_json_str(&json)?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(cfg)
    }

    /// Check every numeric parameter.
    pub fn validate(&self) -> Result<(), Error> {
        if self
            .camera
            .position
            .iter()
            .chain(self.camera.rotation_degrees.iter())
            .any(|v| !v.is_finite())
        {
            return Err(Error::InvalidConfig {
                parameter: "camera",
                reason: "position and rotation must be finite",
            });
        }
        self.camera.lens().validate()?;
        self.render.validate()?;
        self.box_options().validate()
    }

    /// Build the camera.
    pub fn camera(&self) -> Result<Camera<f64>, Error> {
        let intrinsics = SensorIntrinsics::new(self.camera.lens(), self.render)?;
        Ok(Camera::new(intrinsics, self.camera.pose()))
    }

    /// Box encoding options.
    pub fn box_options(&self) -> BoxOptions {
        BoxOptions {
            padding: self.annotation.padding,
        }
    }

    /// Class names and colours.
    pub fn palette(&self) -> ClassPalette {
        ClassPalette::new(
            self.output.classes.clone(),
            self.output.class_colours.clone(),
        )
    }

    /// Path of the rendered image of frame `index`.
    pub fn image_path(&self, index: usize) -> PathBuf {
        self.paths.images.join(labels::image_file_name(index))
    }

    /// Path of the label file of frame `index`.
    pub fn label_path(&self, index: usize) -> PathBuf {
        self.paths.labels.join(labels::label_file_name(index))
    }

    /// Path of the overlay image of frame `index`.
    pub fn vis_path(&self, index: usize) -> PathBuf {
        self.paths.vis.join(labels::image_file_name(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = GeneratorConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, GeneratorConfig::default());
        assert_eq!(cfg.render, RenderTarget::new(1920, 1080));
        assert_eq!(cfg.box_options(), BoxOptions::default());
        assert_eq!(cfg.annotation.geometry, BoundingGeometry::MeshVertices);
        assert!(!cfg.create_visualization);
    }

    #[test]
    fn default_camera_looks_down_from_above() {
        let cam = GeneratorConfig::default().camera().unwrap();
        approx::assert_abs_diff_eq!(cam.pose().position().z, 100.0);
        let pix = cam.project_point(&Point3::new(0.0, 0.0, 0.0));
        approx::assert_abs_diff_eq!(pix.x, 960.0, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(pix.y, 540.0, epsilon = 1e-9);
    }

    #[test]
    fn rotation_is_in_degrees() {
        let cfg = GeneratorConfig::from_json_str(
            r#"{"camera": {"position": [0, 0, 10], "rotation_degrees": [0, 0, 90]}}"#,
        )
        .unwrap();
        let cam = cfg.camera().unwrap();
        let right = cam.pose().right();
        approx::assert_abs_diff_eq!(right.x, 0.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(right.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = GeneratorConfig::from_json_str(r#"{"camera": {"sensor_width": 0}}"#).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidConfig {
                parameter: "sensor_width",
                ..
            }
        ));
        let err = GeneratorConfig::from_json_str(r#"{"render": {"resolution_x": 0}}"#).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidConfig {
                parameter: "resolution_x",
                ..
            }
        ));
        let err =
            GeneratorConfig::from_json_str(r#"{"annotation": {"padding": -1}}"#).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidConfig {
                parameter: "padding",
                ..
            }
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            GeneratorConfig::from_json_str("{ camera: "),
            Err(Error::ConfigParse(_))
        ));
        assert!(matches!(
            GeneratorConfig::from_json_str(r#"{"annotation": {"geometry": "hull"}}"#),
            Err(Error::ConfigParse(_))
        ));
    }

    #[test]
    fn file_loading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"output": {"classes": ["a", "b"], "class_colours": [[1, 2, 3]]},
                "paths": {"labels": "/tmp/out"},
                "create_visualization": true}"#,
        )
        .unwrap();
        let cfg = GeneratorConfig::from_json_file(&path).unwrap();
        assert!(cfg.create_visualization);
        assert_eq!(cfg.palette().name(3), "b");
        assert_eq!(cfg.palette().colour(3), [1, 2, 3]);
        assert_eq!(cfg.label_path(12), Path::new("/tmp/out/image_000012.txt"));
        assert_eq!(cfg.image_path(0), Path::new("./images/image_000000.png"));
        assert_eq!(cfg.vis_path(1), Path::new("./images/vis/image_000001.png"));

        assert!(matches!(
            GeneratorConfig::from_json_file(dir.path().join("missing.json")),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn serialized_config_reloads() {
        let mut cfg = GeneratorConfig::default();
        cfg.annotation.geometry = BoundingGeometry::BoxCorners;
        cfg.render.resolution_percentage = 50;
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"box_corners\""));
        assert_eq!(GeneratorConfig::from_json_str(&json).unwrap(), cfg);
    }
}
