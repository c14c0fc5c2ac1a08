//! Axis-aligned bounding boxes of projected geometry and their YOLO record
//! form.

use std::cmp::Ordering;
use std::fmt;
use std::num::{ParseFloatError, ParseIntError};
use std::str::FromStr;

use approx::AbsDiffEq;
use itertools::Itertools;
use nalgebra::{
    allocator::Allocator, storage::Storage, DefaultAllocator, Dim, RealField, U2, U3,
};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

use crate::{coordinate_system::WorldFrame, Camera, Error, Points};

#[cfg(feature = "alloc")]
use crate::{BoundingGeometry, SceneObject};
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

/// Number of whitespace separated fields in a label record.
const RECORD_FIELDS: usize = 5;

/// Clamped pixel extremes of a projected object, before normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct PixelExtent {
    /// Smallest x, in `[0, resolution_x]`.
    pub min_x: f64,
    /// Smallest y, in `[0, resolution_y]`.
    pub min_y: f64,
    /// Largest x, in `[0, resolution_x]`.
    pub max_x: f64,
    /// Largest y, in `[0, resolution_y]`.
    pub max_y: f64,
}

/// One labelled object: a class and a box in normalized center form.
///
/// `y_center` follows the label convention with y increasing downward from
/// the top of the image.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct AnnotatedBox {
    /// Class of the object.
    pub class_idx: u32,
    /// Horizontal center as a fraction of image width.
    pub x_center: f64,
    /// Vertical center as a fraction of image height, measured from the top.
    pub y_center: f64,
    /// Width as a fraction of image width.
    pub width: f64,
    /// Height as a fraction of image height.
    pub height: f64,
    /// Pixel extremes the box was built from. `None` for parsed records.
    #[cfg_attr(feature = "serde-serialize", serde(default))]
    pub extent: Option<PixelExtent>,
}

/// Pixel-space rectangle of a box, with y increasing downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    /// Left edge.
    pub x1: f64,
    /// Top edge.
    pub y1: f64,
    /// Right edge.
    pub x2: f64,
    /// Bottom edge.
    pub y2: f64,
}

impl PixelRect {
    /// Width of the rectangle.
    #[inline]
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    /// Height of the rectangle.
    #[inline]
    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }
}

impl AnnotatedBox {
    /// Create a box without pixel extent information.
    pub fn new(class_idx: u32, x_center: f64, y_center: f64, width: f64, height: f64) -> Self {
        Self {
            class_idx,
            x_center,
            y_center,
            width,
            height,
            extent: None,
        }
    }

    /// Reconstruct the pixel rectangle of this box in an image of
    /// `image_width` by `image_height` pixels.
    ///
    /// Corners are clamped into the image.
    pub fn pixel_rect(&self, image_width: u32, image_height: u32) -> PixelRect {
        let w = f64::from(image_width);
        let h = f64::from(image_height);
        let box_w = self.width * w;
        let box_h = self.height * h;
        let cx = self.x_center * w;
        let cy = self.y_center * h;
        PixelRect {
            x1: (cx - box_w / 2.0).clamp(0.0, w),
            y1: (cy - box_h / 2.0).clamp(0.0, h),
            x2: (cx + box_w / 2.0).clamp(0.0, w),
            y2: (cy + box_h / 2.0).clamp(0.0, h),
        }
    }
}

// `{:.6}` keeps the sign of negative zero.
#[inline]
fn unsigned_zero(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else {
        v
    }
}

/// Formats the box as a label record: `class x_center y_center width height`
/// with six decimals and no trailing newline.
impl fmt::Display for AnnotatedBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.class_idx,
            unsigned_zero(self.x_center),
            unsigned_zero(self.y_center),
            unsigned_zero(self.width),
            unsigned_zero(self.height),
        )
    }
}

/// Why a label record could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseRecordError {
    /// The record did not have exactly five fields.
    #[error("expected 5 fields, found {0}")]
    FieldCount(usize),
    /// The class field is not a non-negative integer.
    #[error("invalid class index: {0}")]
    ClassIndex(#[source] ParseIntError),
    /// A coordinate field is not a number.
    #[error("invalid {field}: {source}")]
    Coordinate {
        /// Name of the field.
        field: &'static str,
        /// The underlying error.
        source: ParseFloatError,
    },
    /// A coordinate field is NaN or infinite.
    #[error("{0} is not finite")]
    NonFinite(&'static str),
}

fn parse_coordinate(field: &'static str, token: &str) -> Result<f64, ParseRecordError> {
    let value: f64 = token
        .parse()
        .map_err(|source| ParseRecordError::Coordinate { field, source })?;
    if !value.is_finite() {
        return Err(ParseRecordError::NonFinite(field));
    }
    Ok(value)
}

impl FromStr for AnnotatedBox {
    type Err = ParseRecordError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut tokens = [""; RECORD_FIELDS];
        let mut count = 0;
        for token in line.split_whitespace() {
            if count < RECORD_FIELDS {
                tokens[count] = token;
            }
            count += 1;
        }
        if count != RECORD_FIELDS {
            return Err(ParseRecordError::FieldCount(count));
        }

        let class_idx = tokens[0].parse().map_err(ParseRecordError::ClassIndex)?;
        Ok(AnnotatedBox::new(
            class_idx,
            parse_coordinate("x_center", tokens[1])?,
            parse_coordinate("y_center", tokens[2])?,
            parse_coordinate("width", tokens[3])?,
            parse_coordinate("height", tokens[4])?,
        ))
    }
}

impl AbsDiffEq for AnnotatedBox {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::default_epsilon()
    }

    /// Class indices must match exactly. Pixel extents are ignored.
    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.class_idx == other.class_idx
            && self.x_center.abs_diff_eq(&other.x_center, epsilon)
            && self.y_center.abs_diff_eq(&other.y_center, epsilon)
            && self.width.abs_diff_eq(&other.width, epsilon)
            && self.height.abs_diff_eq(&other.height, epsilon)
    }
}

/// Tunable parameters of box encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct BoxOptions {
    /// Fractional growth of width and height about the box center. Boxes
    /// built from sampled corners or vertices can be slightly tighter than
    /// the rendered silhouette.
    pub padding: f64,
}

impl BoxOptions {
    /// Options with the given padding.
    pub fn with_padding(padding: f64) -> Result<Self, Error> {
        let options = Self { padding };
        options.validate()?;
        Ok(options)
    }

    /// Options that leave boxes at their projected size.
    pub fn unpadded() -> Self {
        Self { padding: 0.0 }
    }

    /// Check that the padding is finite and non-negative.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.padding.is_finite() || self.padding < 0.0 {
            return Err(Error::InvalidConfig {
                parameter: "padding",
                reason: "must be finite and non-negative",
            });
        }
        Ok(())
    }
}

impl Default for BoxOptions {
    fn default() -> Self {
        Self { padding: 0.01 }
    }
}

fn total_order(a: &f64, b: &f64) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

/// Compute the label box of one object from its world-space points.
///
/// Every point is projected through `camera`, the projections are reduced
/// to their extremes and clamped into the image, and the result is
/// normalized to center form with the vertical axis flipped so that
/// `y_center` is measured from the top of the image. Finally width and
/// height are grown by `options.padding`, never beyond 1.
///
/// Objects that are partly or entirely outside the image produce clipped,
/// possibly zero-area, boxes.
///
/// Returns [`Error::EmptyGeometry`] if `world` has no points.
pub fn compute_box<R, NPTS, InStorage>(
    camera: &Camera<R>,
    class_idx: u32,
    world: &Points<WorldFrame, R, NPTS, InStorage>,
    options: &BoxOptions,
) -> Result<AnnotatedBox, Error>
where
    R: RealField + Copy,
    NPTS: Dim,
    InStorage: Storage<R, NPTS, U3>,
    DefaultAllocator: Allocator<NPTS, U3>,
    DefaultAllocator: Allocator<NPTS, U2>,
{
    if world.data.nrows() == 0 {
        return Err(Error::EmptyGeometry);
    }
    options.validate()?;

    let pixels = camera.world_to_pixel(world);
    let column = |j: usize| -> Result<(f64, f64), Error> {
        let col = pixels.data.column(j);
        let finite = col.iter().map(|v| {
            nalgebra::try_convert::<R, f64>(*v)
                .filter(|v| v.is_finite())
                .ok_or(Error::NonFiniteProjection)
        });
        itertools::process_results(finite, |values| {
            values.minmax_by(total_order).into_option()
        })?
        .ok_or(Error::EmptyGeometry)
    };
    let (min_x, max_x) = column(0)?;
    let (min_y, max_y) = column(1)?;

    let target = camera.render_target();
    let res_x = f64::from(target.resolution_x);
    let res_y = f64::from(target.resolution_y);

    let extent = PixelExtent {
        min_x: min_x.clamp(0.0, res_x),
        min_y: min_y.clamp(0.0, res_y),
        max_x: max_x.clamp(0.0, res_x),
        max_y: max_y.clamp(0.0, res_y),
    };

    let x_center = (extent.min_x + extent.max_x) / 2.0 / res_x;
    let y_center = 1.0 - (extent.min_y + extent.max_y) / 2.0 / res_y;
    let width = (extent.max_x - extent.min_x) / res_x;
    let height = (extent.max_y - extent.min_y) / res_y;

    let grow = 1.0 + options.padding;
    let bbox = AnnotatedBox {
        class_idx,
        x_center,
        y_center,
        width: (width * grow).min(1.0),
        height: (height * grow).min(1.0),
        extent: Some(extent),
    };
    log::debug!("class {class_idx}: {bbox} from {} points", world.data.nrows());
    Ok(bbox)
}

/// Encodes boxes for objects seen by one camera.
///
/// ```
/// use cam_label::*;
/// use nalgebra::{Matrix1x3, Point3};
///
/// let lens = LensParams {
///     focal_length: 50.0,
///     sensor_width: 36.0,
///     clip_start: 0.1,
///     clip_end: 200.0,
/// };
/// let camera = Camera::looking_down(10.0, lens, RenderTarget::new(640, 480)).unwrap();
/// let encoder = BoxEncoder::new(&camera, BoxOptions::unpadded());
///
/// let point = Points::new(Matrix1x3::new(0.0, 0.0, 0.0));
/// let bbox = encoder.encode(1, &point).unwrap();
/// assert_eq!(bbox.to_string(), "1 0.500000 0.500000 0.000000 0.000000");
/// ```
#[derive(Debug, Clone)]
pub struct BoxEncoder<'a, R: RealField> {
    camera: &'a Camera<R>,
    options: BoxOptions,
}

impl<'a, R: RealField + Copy> BoxEncoder<'a, R> {
    /// Create an encoder for `camera`.
    pub fn new(camera: &'a Camera<R>, options: BoxOptions) -> Self {
        Self { camera, options }
    }

    /// Return the camera boxes are projected through.
    #[inline]
    pub fn camera(&self) -> &Camera<R> {
        self.camera
    }

    /// Return the encoding options.
    #[inline]
    pub fn options(&self) -> &BoxOptions {
        &self.options
    }

    /// Compute the box of one object. See [`compute_box`].
    pub fn encode<NPTS, InStorage>(
        &self,
        class_idx: u32,
        world: &Points<WorldFrame, R, NPTS, InStorage>,
    ) -> Result<AnnotatedBox, Error>
    where
        NPTS: Dim,
        InStorage: Storage<R, NPTS, U3>,
        DefaultAllocator: Allocator<NPTS, U3>,
        DefaultAllocator: Allocator<NPTS, U2>,
    {
        compute_box(self.camera, class_idx, world, &self.options)
    }

    /// Compute one box per scene object, in order.
    ///
    /// Each object gets its own result so that callers can drop objects
    /// without geometry and keep the rest.
    #[cfg(feature = "alloc")]
    pub fn encode_objects(
        &self,
        objects: &[SceneObject<R>],
        geometry: BoundingGeometry,
    ) -> Vec<Result<AnnotatedBox, Error>> {
        objects
            .iter()
            .map(|obj| self.encode(obj.class_idx, &obj.world_points(geometry)))
            .collect()
    }
}
