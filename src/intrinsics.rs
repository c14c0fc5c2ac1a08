use nalgebra::{
    allocator::Allocator,
    convert,
    storage::{Owned, Storage},
    DefaultAllocator, Dim, OMatrix, Point2, Point3, RealField, U2,
};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

use crate::{coordinate_system::CameraFrame, Error, Pixels, Points};

/// Depth substituted for points lying exactly in the camera plane (local z of
/// zero) before the perspective division.
pub const Z_EPSILON: f64 = 1e-4;

/// Parameters of the physical lens and sensor of a pinhole camera.
///
/// Focal length and sensor width are in millimetres. Only their ratio
/// matters for projection. The clip planes are carried along for the
/// renderer and never used by the projection math.
///
/// Combine with a [`RenderTarget`](struct.RenderTarget.html) to build
/// [`SensorIntrinsics`](struct.SensorIntrinsics.html).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct LensParams<R: RealField> {
    /// Focal length of the lens.
    pub focal_length: R,
    /// Horizontal size of the sensor.
    pub sensor_width: R,
    /// Near clipping distance.
    pub clip_start: R,
    /// Far clipping distance.
    pub clip_end: R,
}

/// The pixel grid an image is rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-serialize", serde(default))]
pub struct RenderTarget {
    /// Image width in pixels.
    pub resolution_x: u32,
    /// Image height in pixels.
    pub resolution_y: u32,
    /// Render scale, in percent of the nominal resolution.
    pub resolution_percentage: u32,
}

impl RenderTarget {
    /// Create a render target at 100% scale.
    pub fn new(resolution_x: u32, resolution_y: u32) -> Self {
        Self {
            resolution_x,
            resolution_y,
            resolution_percentage: 100,
        }
    }

    /// Check that the resolution and scale are usable.
    pub fn validate(&self) -> Result<(), Error> {
        if self.resolution_x == 0 {
            return Err(Error::InvalidConfig {
                parameter: "resolution_x",
                reason: "must be greater than zero",
            });
        }
        if self.resolution_y == 0 {
            return Err(Error::InvalidConfig {
                parameter: "resolution_y",
                reason: "must be greater than zero",
            });
        }
        if self.resolution_percentage == 0 || self.resolution_percentage > 100 {
            return Err(Error::InvalidConfig {
                parameter: "resolution_percentage",
                reason: "must be in (0, 100]",
            });
        }
        Ok(())
    }
}

impl Default for RenderTarget {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

impl<R: RealField + Copy> LensParams<R> {
    /// Check that the lens parameters are finite and in range.
    pub fn validate(&self) -> Result<(), Error> {
        let zero = R::zero();
        if !self.focal_length.is_finite() || self.focal_length <= zero {
            return Err(Error::InvalidConfig {
                parameter: "focal_length",
                reason: "must be finite and positive",
            });
        }
        if !self.sensor_width.is_finite() || self.sensor_width <= zero {
            return Err(Error::InvalidConfig {
                parameter: "sensor_width",
                reason: "must be finite and positive",
            });
        }
        if !self.clip_start.is_finite() || self.clip_start < zero {
            return Err(Error::InvalidConfig {
                parameter: "clip_start",
                reason: "must be finite and non-negative",
            });
        }
        if !self.clip_end.is_finite() || self.clip_end <= self.clip_start {
            return Err(Error::InvalidConfig {
                parameter: "clip_end",
                reason: "must be finite and beyond clip_start",
            });
        }
        Ok(())
    }
}

#[derive(Clone, PartialEq)]
struct SensorCache<R: RealField> {
    res_x: R,
    res_y: R,
    scale: R,
    sensor_height: R,
}

/// Validated lens and render target, mapping camera coordinates to pixels.
///
/// The vertical sensor size is derived from the horizontal one so that the
/// sensor has the aspect ratio of the image.
///
/// ```
/// use cam_label::*;
/// let lens = LensParams {
///     focal_length: 50.0,
///     sensor_width: 36.0,
///     clip_start: 0.1,
///     clip_end: 100.0,
/// };
/// let intrinsics = SensorIntrinsics::new(lens, RenderTarget::new(1920, 1080)).unwrap();
/// assert_eq!(intrinsics.sensor_height(), 20.25);
/// ```
#[derive(Clone, PartialEq)]
#[cfg_attr(
    feature = "serde-serialize",
    derive(Serialize, Deserialize),
    serde(
        try_from = "SensorIntrinsicsDef<R>",
        into = "SensorIntrinsicsDef<R>",
        bound(
            serialize = "R: Serialize + Copy",
            deserialize = "R: Deserialize<'de> + Copy"
        )
    )
)]
pub struct SensorIntrinsics<R: RealField> {
    lens: LensParams<R>,
    target: RenderTarget,
    cache: SensorCache<R>,
}

impl<R: RealField + Copy> SensorIntrinsics<R> {
    /// Validate the parameters and precompute the projection constants.
    pub fn new(lens: LensParams<R>, target: RenderTarget) -> Result<Self, Error> {
        target.validate()?;
        lens.validate()?;

        let res_x: R = convert(f64::from(target.resolution_x));
        let res_y: R = convert(f64::from(target.resolution_y));
        let scale: R = convert(f64::from(target.resolution_percentage) / 100.0);
        let sensor_height = lens.sensor_width * res_y / res_x;

        Ok(Self {
            lens,
            target,
            cache: SensorCache {
                res_x,
                res_y,
                scale,
                sensor_height,
            },
        })
    }

    /// Get the lens parameters
    #[inline]
    pub fn lens(&self) -> &LensParams<R> {
        &self.lens
    }

    /// Get the render target
    #[inline]
    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    /// Get the sensor height derived from the image aspect ratio
    #[inline]
    pub fn sensor_height(&self) -> R {
        self.cache.sensor_height
    }

    /// Get the render scale as a fraction
    #[inline]
    pub fn scale(&self) -> R {
        self.cache.scale
    }

    /// Project a single point in camera coordinates to pixel coordinates.
    ///
    /// The camera looks down its local -Z axis. A local z of exactly zero is
    /// replaced by [`Z_EPSILON`] before dividing. Results are not clamped to
    /// the image.
    pub fn camera_to_pixel_point(&self, local: &Point3<R>) -> Point2<R> {
        let z = if local.z == R::zero() {
            convert(Z_EPSILON)
        } else {
            local.z
        };

        let ndc_x = local.x / -z;
        let ndc_y = local.y / -z;

        let half: R = convert(0.5);
        let c = &self.cache;
        let focal = self.lens.focal_length;
        let px = c.res_x * c.scale * (ndc_x * focal / self.lens.sensor_width + half);
        let py = c.res_y * c.scale * (ndc_y * focal / c.sensor_height + half);
        Point2::new(px, py)
    }

    /// project camera coords to pixel coordinates
    pub fn camera_to_pixel<IN, NPTS>(
        &self,
        camera: &Points<CameraFrame, R, NPTS, IN>,
    ) -> Pixels<R, NPTS, Owned<R, NPTS, U2>>
    where
        IN: Storage<R, NPTS, nalgebra::U3>,
        NPTS: Dim,
        DefaultAllocator: Allocator<NPTS, U2>,
    {
        let mut result = Pixels::new(OMatrix::zeros_generic(
            NPTS::from_usize(camera.data.nrows()),
            U2::from_usize(2),
        ));

        for i in 0..camera.data.nrows() {
            let local = Point3::new(
                camera.data[(i, 0)],
                camera.data[(i, 1)],
                camera.data[(i, 2)],
            );
            let pix = self.camera_to_pixel_point(&local);
            result.data[(i, 0)] = pix.x;
            result.data[(i, 1)] = pix.y;
        }
        result
    }
}

impl<R: RealField> std::fmt::Debug for SensorIntrinsics<R> {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Matches the derived output but skips the cache.
        fmt.debug_struct("SensorIntrinsics")
            .field("lens", &self.lens)
            .field("target", &self.target)
            .finish()
    }
}

// Serialized form. Deserializing goes back through `SensorIntrinsics::new`
// so the cache is rebuilt and the parameters are validated.
#[cfg(feature = "serde-serialize")]
#[derive(Serialize, Deserialize)]
#[serde(rename = "SensorIntrinsics")]
struct SensorIntrinsicsDef<R: RealField> {
    lens: LensParams<R>,
    target: RenderTarget,
}

#[cfg(feature = "serde-serialize")]
impl<R: RealField + Copy> TryFrom<SensorIntrinsicsDef<R>> for SensorIntrinsics<R> {
    type Error = Error;
    fn try_from(def: SensorIntrinsicsDef<R>) -> Result<Self, Error> {
        SensorIntrinsics::new(def.lens, def.target)
    }
}

#[cfg(feature = "serde-serialize")]
impl<R: RealField + Copy> From<SensorIntrinsics<R>> for SensorIntrinsicsDef<R> {
    fn from(intrinsics: SensorIntrinsics<R>) -> Self {
        Self {
            lens: intrinsics.lens,
            target: intrinsics.target,
        }
    }
}
