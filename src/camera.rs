use nalgebra::{
    allocator::Allocator,
    storage::{Owned, Storage},
    DefaultAllocator, Dim, Point2, Point3, RealField, U2, U3,
};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

use crate::{
    coordinate_system::WorldFrame, CameraPose, Error, LensParams, Pixels, Points, RenderTarget,
    SensorIntrinsics,
};

/// A pinhole camera that converts world coordinates into pixel coordinates.
///
/// # Examples
///
/// Creates a camera 100 units above the scene origin, looking straight down:
///
/// ```
/// use cam_label::*;
/// use nalgebra::Point3;
///
/// let lens = LensParams {
///     focal_length: 50.0,
///     sensor_width: 36.0,
///     clip_start: 0.1,
///     clip_end: 200.0,
/// };
/// let intrinsics = SensorIntrinsics::new(lens, RenderTarget::new(1920, 1080)).unwrap();
/// let pose = CameraPose::looking_down(Point3::new(0.0, 0.0, 100.0));
///
/// let cam = Camera::new(intrinsics, pose);
/// let pix = cam.project_point(&Point3::new(0.0, 0.0, 0.0));
/// assert_eq!((pix.x, pix.y), (960.0, 540.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde-serialize",
    serde(bound(
        serialize = "R: Serialize + Copy",
        deserialize = "R: Deserialize<'de> + Copy"
    ))
)]
pub struct Camera<R: RealField> {
    intrinsics: SensorIntrinsics<R>,
    pose: CameraPose<R>,
}

impl<R: RealField + Copy> Camera<R> {
    /// Create a new camera from intrinsic parameters and a pose.
    #[inline]
    pub fn new(intrinsics: SensorIntrinsics<R>, pose: CameraPose<R>) -> Self {
        Self { intrinsics, pose }
    }

    /// Create a camera at `(0, 0, height)` looking straight down.
    ///
    /// Returns an error if the lens or render target is invalid.
    pub fn looking_down(
        height: R,
        lens: LensParams<R>,
        target: RenderTarget,
    ) -> Result<Self, Error> {
        let intrinsics = SensorIntrinsics::new(lens, target)?;
        let pose = CameraPose::looking_down(Point3::new(R::zero(), R::zero(), height));
        Ok(Self::new(intrinsics, pose))
    }

    /// Return a reference to the pose.
    #[inline]
    pub fn pose(&self) -> &CameraPose<R> {
        &self.pose
    }

    /// Return a reference to the intrinsic parameters.
    #[inline]
    pub fn intrinsics(&self) -> &SensorIntrinsics<R> {
        &self.intrinsics
    }

    /// Return the render target pixels are mapped into.
    #[inline]
    pub fn render_target(&self) -> &RenderTarget {
        self.intrinsics.target()
    }

    /// Project a single world point to pixel coordinates.
    ///
    /// Never fails: points in the camera plane are nudged off it and points
    /// outside the image keep their out-of-range coordinates.
    pub fn project_point(&self, world: &Point3<R>) -> Point2<R> {
        let local = self.pose.world_to_camera_point(world);
        self.intrinsics.camera_to_pixel_point(&local)
    }

    /// take 3D coordinates in world frame and convert to pixel coordinates
    pub fn world_to_pixel<NPTS, InStorage>(
        &self,
        world: &Points<WorldFrame, R, NPTS, InStorage>,
    ) -> Pixels<R, NPTS, Owned<R, NPTS, U2>>
    where
        NPTS: Dim,
        InStorage: Storage<R, NPTS, U3>,
        DefaultAllocator: Allocator<NPTS, U3>,
        DefaultAllocator: Allocator<NPTS, U2>,
    {
        let camera_frame = self.pose.world_to_camera(world);
        self.intrinsics.camera_to_pixel(&camera_frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix2x3, Matrix3};

    fn lens() -> LensParams<f64> {
        LensParams {
            focal_length: 50.0,
            sensor_width: 36.0,
            clip_start: 0.1,
            clip_end: 200.0,
        }
    }

    #[test]
    fn centered_point_projects_to_image_center() {
        for height in [1.0, 10.0, 100.0] {
            let cam = Camera::looking_down(height, lens(), RenderTarget::new(1920, 1080)).unwrap();
            let pix = cam.project_point(&Point3::new(0.0, 0.0, 0.0));
            approx::assert_abs_diff_eq!(pix.x, 960.0, epsilon = 1e-9);
            approx::assert_abs_diff_eq!(pix.y, 540.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn world_axes_follow_image_axes() {
        let cam = Camera::looking_down(10.0, lens(), RenderTarget::new(1920, 1080)).unwrap();
        let right = cam.project_point(&Point3::new(1.0, 0.0, 0.0));
        let up = cam.project_point(&Point3::new(0.0, 1.0, 0.0));
        assert!(right.x > 960.0);
        approx::assert_abs_diff_eq!(right.y, 540.0, epsilon = 1e-9);
        assert!(up.y > 540.0);
        approx::assert_abs_diff_eq!(up.x, 960.0, epsilon = 1e-9);
    }

    #[test]
    fn point_in_camera_plane_is_finite() {
        let cam = Camera::looking_down(10.0, lens(), RenderTarget::new(1920, 1080)).unwrap();
        let pix = cam.project_point(&Point3::new(3.0, -2.0, 10.0));
        assert!(pix.x.is_finite());
        assert!(pix.y.is_finite());
    }

    #[test]
    fn rotated_camera() {
        let intrinsics = SensorIntrinsics::new(lens(), RenderTarget::new(1920, 1080)).unwrap();
        let pose = CameraPose::from_euler_xyz(
            Point3::new(0.0, 0.0, 10.0),
            0.0,
            0.0,
            std::f64::consts::FRAC_PI_2,
        );
        let cam = Camera::new(intrinsics, pose);

        let pix = cam.project_point(&Point3::new(0.0, 2.0, 0.0));
        approx::assert_abs_diff_eq!(pix.x, 1920.0 * (0.2 * 50.0 / 36.0 + 0.5), epsilon = 1e-9);
        approx::assert_abs_diff_eq!(pix.y, 540.0, epsilon = 1e-9);
    }

    #[test]
    fn batch_matches_single() {
        let intrinsics = SensorIntrinsics::new(lens(), RenderTarget::new(1280, 720)).unwrap();
        let pose = CameraPose::from_euler_xyz(Point3::new(1.0, 2.0, 30.0), 0.05, -0.1, 0.4);
        let cam = Camera::new(intrinsics, pose);

        #[rustfmt::skip]
        let world = Points::new(Matrix3::new(
            0.0, 0.0, 0.0,
            1.5, -2.0, 0.5,
            -4.0, 3.0, 1.0,
        ));
        let pixels = cam.world_to_pixel(&world);
        for i in 0..3 {
            let single = cam.project_point(&Point3::new(
                world.data[(i, 0)],
                world.data[(i, 1)],
                world.data[(i, 2)],
            ));
            approx::assert_abs_diff_eq!(pixels.data[(i, 0)], single.x, epsilon = 1e-9);
            approx::assert_abs_diff_eq!(pixels.data[(i, 1)], single.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn invalid_lens_is_rejected() {
        let mut l = lens();
        l.sensor_width = 0.0;
        assert!(Camera::looking_down(10.0, l, RenderTarget::new(1920, 1080)).is_err());
        assert!(Camera::looking_down(10.0, lens(), RenderTarget::new(0, 1080)).is_err());
    }

    #[test]
    fn mirrored_points_mirror_pixels() {
        let cam = Camera::looking_down(20.0, lens(), RenderTarget::new(1920, 1080)).unwrap();
        #[rustfmt::skip]
        let world = Points::new(Matrix2x3::new(
            1.0, 2.5, 0.0,
            1.0, -2.5, 0.0,
        ));
        let pixels = cam.world_to_pixel(&world);
        approx::assert_abs_diff_eq!(
            pixels.data[(0, 1)] + pixels.data[(1, 1)],
            1080.0,
            epsilon = 1e-9
        );
    }

    #[test]
    #[cfg(feature = "serde-serialize")]
    fn test_serde() {
        let intrinsics = SensorIntrinsics::new(lens(), RenderTarget::new(640, 480)).unwrap();
        let pose = CameraPose::from_euler_xyz(Point3::new(1.0, 2.0, 30.0), 0.05, -0.1, 0.4);
        let expected = Camera::new(intrinsics, pose);

        let buf = serde_json::to_string(&expected).unwrap();
        let actual: Camera<f64> = serde_json::from_str(&buf).unwrap();
        assert!(expected == actual);
    }
}
