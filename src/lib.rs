#![cfg_attr(not(feature = "std"), no_std)]
#![deny(rust_2018_idioms, unsafe_code, missing_docs)]
#![cfg_attr(not(doctest), doc = include_str!("../README.md"))]
#![cfg_attr(doc_cfg, feature(doc_cfg))]

//! # Examples
//!
//! ## Example - projecting 3D world coordinates to 2D pixel coordinates.
//!
//! ```
//! use cam_label::*;
//! use nalgebra::{Matrix2x3, Point3};
//!
//! // Create two points in the world coordinate frame.
//! let world_coords = Points::new(Matrix2x3::new(
//!     0.0, 0.0, 0.0, // point 1, directly below the camera
//!     1.0, 0.0, 0.0, // point 2
//! ));
//!
//! // 50mm lens on a 36mm wide sensor, rendering 1920x1080 at full size.
//! let lens = LensParams {
//!     focal_length: 50.0,
//!     sensor_width: 36.0,
//!     clip_start: 0.1,
//!     clip_end: 200.0,
//! };
//! let target = RenderTarget::new(1920, 1080);
//!
//! // Camera 10 units above the origin, looking straight down.
//! let camera = Camera::looking_down(10.0, lens, target).unwrap();
//!
//! // Project the 3D coordinates to 2D pixel coordinates.
//! let pixel_coords = camera.world_to_pixel(&world_coords);
//! assert_eq!(pixel_coords.data[(0, 0)], 960.0);
//! assert_eq!(pixel_coords.data[(0, 1)], 540.0);
//!
//! // Single points can be projected directly.
//! let pix = camera.project_point(&Point3::new(1.0, 0.0, 0.0));
//! assert!(pix.x > 960.0);
//! ```
//!
//! ## Example - encoding a YOLO label line
//!
//! ```
//! use cam_label::*;
//! use nalgebra::Matrix2x3;
//!
//! let lens = LensParams {
//!     focal_length: 50.0,
//!     sensor_width: 36.0,
//!     clip_start: 0.1,
//!     clip_end: 200.0,
//! };
//! let camera = Camera::looking_down(10.0, lens, RenderTarget::new(1920, 1080)).unwrap();
//!
//! // Two opposite corners of an object lying on the ground plane.
//! let corners = Points::new(Matrix2x3::new(
//!     -1.0, -1.0, 0.0,
//!     1.0, 1.0, 0.0,
//! ));
//!
//! let bbox = compute_box(&camera, 3, &corners, &BoxOptions::unpadded()).unwrap();
//! assert_eq!(bbox.to_string().split_whitespace().next(), Some("3"));
//!
//! let parsed: AnnotatedBox = bbox.to_string().parse().unwrap();
//! approx::assert_abs_diff_eq!(parsed, bbox, epsilon = 1e-6);
//! ```

#[cfg(not(feature = "std"))]
extern crate core as std;

#[cfg(feature = "alloc")]
extern crate alloc;

use nalgebra::{Dim, RealField, U2, U3};

mod intrinsics;
pub use intrinsics::{LensParams, RenderTarget, SensorIntrinsics, Z_EPSILON};

mod extrinsics;
pub use extrinsics::CameraPose;

mod camera;
pub use camera::Camera;

mod bbox;
pub use bbox::{
    compute_box, AnnotatedBox, BoxEncoder, BoxOptions, ParseRecordError, PixelExtent, PixelRect,
};

#[cfg(feature = "alloc")]
mod scene;
#[cfg(feature = "alloc")]
pub use scene::{BoundingGeometry, SceneObject};

#[cfg(feature = "alloc")]
mod palette;
#[cfg(feature = "alloc")]
pub use palette::ClassPalette;

/// Reading and writing YOLO label files.
#[cfg(feature = "std")]
pub mod labels;

/// Typed configuration of the label generator.
#[cfg(feature = "config")]
pub mod config;

/// Overlay of decoded labels on rendered images.
#[cfg(feature = "visualize")]
pub mod visualize;

/// All possible errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A camera or render parameter is out of range.
    #[error("invalid configuration: `{parameter}` {reason}")]
    InvalidConfig {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// An object provided no points to project.
    #[error("object has no geometry to project")]
    EmptyGeometry,
    /// Projection produced NaN or infinite pixel coordinates.
    #[error("projection produced a non-finite pixel coordinate")]
    NonFiniteProjection,
    /// A label record could not be parsed.
    #[error("malformed label record: {0}")]
    MalformedRecord(#[from] ParseRecordError),
    /// Reading or writing a file failed.
    #[cfg(feature = "std")]
    #[error("i/o error on {path:?}: {source}")]
    Io {
        /// The file being accessed.
        path: std::path::PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
    /// A configuration document could not be parsed.
    #[cfg(feature = "config")]
    #[error("could not parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
    /// An image could not be decoded or encoded.
    #[cfg(feature = "visualize")]
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

#[cfg(feature = "std")]
impl Error {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// 2D pixel locations in the rendered image.
///
/// The origin is the bottom-left corner of the image with y increasing
/// upward. Values outside `[0, resolution]` are kept as-is; clamping happens
/// when encoding boxes.
///
/// This is a newtype wrapping an `nalgebra::Matrix`.
#[derive(Clone)]
pub struct Pixels<R: RealField, NPTS: Dim, STORAGE> {
    /// The matrix storing pixel locations.
    pub data: nalgebra::Matrix<R, NPTS, U2, STORAGE>,
}

impl<R: RealField, NPTS: Dim, STORAGE> Pixels<R, NPTS, STORAGE> {
    /// Create a new Pixels instance
    #[inline]
    pub fn new(data: nalgebra::Matrix<R, NPTS, U2, STORAGE>) -> Self {
        Self { data }
    }
}

/// A coordinate system in which points can be defined.
pub trait CoordinateSystem {}

/// Implementations of [`CoordinateSystem`](trait.CoordinateSystem.html).
pub mod coordinate_system {

    #[cfg(feature = "serde-serialize")]
    use serde::{Deserialize, Serialize};

    /// Coordinates in the camera coordinate system.
    ///
    /// The camera center is at (0,0,0) looking at (0,0,-1) with up as (0,1,0)
    /// and image right as (1,0,0) in this coordinate frame.
    #[derive(Debug, Clone, PartialEq)]
    #[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
    pub struct CameraFrame {}
    impl crate::CoordinateSystem for CameraFrame {}

    /// Coordinates in the world (scene) coordinate system.
    ///
    /// The camera center may be located at an arbitrary position and pointed
    /// in an arbitrary direction in this coordinate frame.
    #[derive(Debug, Clone, PartialEq)]
    #[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
    pub struct WorldFrame {}
    impl crate::CoordinateSystem for WorldFrame {}
}
pub use coordinate_system::{CameraFrame, WorldFrame};

/// 3D points. Can be in any [`CoordinateSystem`](trait.CoordinateSystem.html).
///
/// This is a newtype wrapping an `nalgebra::Matrix` with one point per row.
pub struct Points<Coords: CoordinateSystem, R: RealField, NPTS: Dim, STORAGE> {
    coords: std::marker::PhantomData<Coords>,
    /// The matrix storing point locations.
    pub data: nalgebra::Matrix<R, NPTS, U3, STORAGE>,
}

impl<Coords, R, NPTS, STORAGE> std::fmt::Debug for Points<Coords, R, NPTS, STORAGE>
where
    Coords: CoordinateSystem + std::fmt::Debug,
    R: RealField,
    NPTS: Dim,
    STORAGE: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Points")
            .field("coords", &self.coords)
            .field("data", &self.data)
            .finish()
    }
}

impl<Coords, R, NPTS, STORAGE> Points<Coords, R, NPTS, STORAGE>
where
    Coords: CoordinateSystem,
    R: RealField,
    NPTS: Dim,
{
    /// Create a new Points instance from the underlying storage.
    #[inline]
    pub fn new(data: nalgebra::Matrix<R, NPTS, U3, STORAGE>) -> Self {
        Self {
            coords: std::marker::PhantomData,
            data,
        }
    }
}
