use nalgebra::geometry::{Isometry3, Point3, Translation3, UnitQuaternion};
use nalgebra::{
    allocator::Allocator,
    storage::{Owned, Storage},
    DefaultAllocator, RealField,
};
use nalgebra::{Dim, OMatrix, Unit, Vector3, U3};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

use crate::{
    coordinate_system::{CameraFrame, WorldFrame},
    Points,
};

/// Defines the pose of a camera in the world coordinate system.
///
/// The pose is stored as the camera-to-world transform: the camera position
/// and the rotation taking camera axes to world axes. The camera looks down
/// its own -Z axis with +Y up, so the identity rotation points the camera
/// straight down the world -Z axis.
#[derive(Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize))]
pub struct CameraPose<R: RealField> {
    pub(crate) rotation: UnitQuaternion<R>,
    pub(crate) position: Point3<R>,
    #[cfg_attr(feature = "serde-serialize", serde(skip))]
    pub(crate) cache: PoseCache<R>,
}

impl<R: RealField> std::fmt::Debug for CameraPose<R> {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // This should match the auto derived Debug implementation but not print
        // the cache field.
        fmt.debug_struct("CameraPose")
            .field("rotation", &self.rotation)
            .field("position", &self.position)
            .finish()
    }
}

#[derive(Clone, PartialEq)]
pub(crate) struct PoseCache<R: RealField> {
    pub(crate) camera_to_world: Isometry3<R>,
    pub(crate) world_to_camera: Isometry3<R>,
}

impl<R: RealField> std::fmt::Debug for PoseCache<R> {
    fn fmt(&self, _f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // do not show cache
        Ok(())
    }
}

impl<R: RealField + Copy> CameraPose<R> {
    /// Create a new instance from the camera rotation and position in world
    /// coordinates.
    pub fn from_rotation_and_position(rotation: UnitQuaternion<R>, position: Point3<R>) -> Self {
        let camera_to_world = Isometry3::from_parts(Translation3::from(position.coords), rotation);
        let world_to_camera = camera_to_world.inverse();
        Self {
            rotation,
            position,
            cache: PoseCache {
                camera_to_world,
                world_to_camera,
            },
        }
    }

    /// Create a new instance from XYZ Euler angles in radians.
    ///
    /// The rotation applies `rx` about X first, then `ry` about Y, then `rz`
    /// about Z.
    pub fn from_euler_xyz(position: Point3<R>, rx: R, ry: R, rz: R) -> Self {
        let rotation = UnitQuaternion::from_euler_angles(rx, ry, rz);
        Self::from_rotation_and_position(rotation, position)
    }

    /// Create a camera at `position` looking straight down the world -Z axis
    /// with world +Y as image up.
    pub fn looking_down(position: Point3<R>) -> Self {
        Self::from_rotation_and_position(UnitQuaternion::identity(), position)
    }

    /// Create a new instance from a camera-to-world
    /// [`nalgebra::Isometry3`](https://docs.rs/nalgebra/latest/nalgebra/geometry/type.Isometry3.html).
    pub fn from_transform(camera_to_world: &Isometry3<R>) -> Self {
        let position = Point3::from(camera_to_world.translation.vector);
        Self::from_rotation_and_position(camera_to_world.rotation, position)
    }

    /// Return the camera position
    #[inline]
    pub fn position(&self) -> &Point3<R> {
        &self.position
    }

    /// Return the rotation taking camera axes to world axes
    #[inline]
    pub fn rotation(&self) -> &UnitQuaternion<R> {
        &self.rotation
    }

    /// Return the camera-to-world transform
    #[inline]
    pub fn camera_to_world_transform(&self) -> &Isometry3<R> {
        &self.cache.camera_to_world
    }

    /// Return the world-to-camera transform
    #[inline]
    pub fn world_to_camera_transform(&self) -> &Isometry3<R> {
        &self.cache.world_to_camera
    }

    /// Return a unit vector aligned along our look (-Z) direction.
    pub fn forward(&self) -> Unit<Vector3<R>> {
        self.lookdir(&Vector3::new(R::zero(), R::zero(), -R::one()))
    }

    /// Return a unit vector aligned along our up (+Y) direction.
    pub fn up(&self) -> Unit<Vector3<R>> {
        self.lookdir(&Vector3::new(R::zero(), R::one(), R::zero()))
    }

    /// Return a unit vector aligned along our right (+X) direction.
    pub fn right(&self) -> Unit<Vector3<R>> {
        self.lookdir(&Vector3::new(R::one(), R::zero(), R::zero()))
    }

    #[inline]
    fn lookdir(&self, dir_cam: &Vector3<R>) -> Unit<Vector3<R>> {
        Unit::new_normalize(self.rotation.transform_vector(dir_cam))
    }

    /// Convert a single point from world coordinates to camera coordinates.
    #[inline]
    pub fn world_to_camera_point(&self, world: &Point3<R>) -> Point3<R> {
        self.cache.world_to_camera.transform_point(world)
    }

    /// Convert points in camera coordinates to world coordinates.
    pub fn camera_to_world<NPTS, InStorage>(
        &self,
        cam_coords: &Points<CameraFrame, R, NPTS, InStorage>,
    ) -> Points<WorldFrame, R, NPTS, Owned<R, NPTS, U3>>
    where
        NPTS: Dim,
        InStorage: Storage<R, NPTS, U3>,
        DefaultAllocator: Allocator<NPTS, U3>,
    {
        Points::new(transform_rows(
            &self.cache.camera_to_world,
            &cam_coords.data,
        ))
    }

    /// Convert points in world coordinates to camera coordinates.
    pub fn world_to_camera<NPTS, InStorage>(
        &self,
        world: &Points<WorldFrame, R, NPTS, InStorage>,
    ) -> Points<CameraFrame, R, NPTS, Owned<R, NPTS, U3>>
    where
        NPTS: Dim,
        InStorage: Storage<R, NPTS, U3>,
        DefaultAllocator: Allocator<NPTS, U3>,
    {
        Points::new(transform_rows(&self.cache.world_to_camera, &world.data))
    }
}

fn transform_rows<R, NPTS, InStorage>(
    transform: &Isometry3<R>,
    input: &nalgebra::Matrix<R, NPTS, U3, InStorage>,
) -> OMatrix<R, NPTS, U3>
where
    R: RealField + Copy,
    NPTS: Dim,
    InStorage: Storage<R, NPTS, U3>,
    DefaultAllocator: Allocator<NPTS, U3>,
{
    let mut out = OMatrix::zeros_generic(NPTS::from_usize(input.nrows()), U3::from_usize(3));

    for i in 0..input.nrows() {
        let tmp =
            transform.transform_point(&Point3::new(input[(i, 0)], input[(i, 1)], input[(i, 2)]));
        for j in 0..3 {
            out[(i, j)] = tmp[j];
        }
    }
    out
}

// serde derive cannot construct the cache after rotation and position are
// read, so Deserialize is implemented by hand and goes through
// `from_rotation_and_position`.
#[cfg(feature = "serde-serialize")]
impl<'de, R: RealField + Copy + serde::Deserialize<'de>> serde::Deserialize<'de> for CameraPose<R> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de;
        use std::fmt;

        #[derive(Deserialize)]
        #[serde(field_identifier, rename_all = "lowercase")]
        enum Field {
            Rotation,
            Position,
        }

        struct CameraPoseVisitor<'de, R2: RealField + serde::Deserialize<'de>>(
            std::marker::PhantomData<&'de R2>,
        );

        impl<'de, R2: RealField + Copy + serde::Deserialize<'de>> serde::de::Visitor<'de>
            for CameraPoseVisitor<'de, R2>
        {
            type Value = CameraPose<R2>;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("struct CameraPose")
            }

            fn visit_seq<V>(self, mut seq: V) -> std::result::Result<CameraPose<R2>, V::Error>
            where
                V: serde::de::SeqAccess<'de>,
            {
                let rotation = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let position = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                Ok(CameraPose::from_rotation_and_position(rotation, position))
            }

            fn visit_map<V>(self, mut map: V) -> std::result::Result<CameraPose<R2>, V::Error>
            where
                V: serde::de::MapAccess<'de>,
            {
                let mut rotation = None;
                let mut position = None;
                while let Some(key) = map.next_key()? {
                    match key {
                        Field::Rotation => {
                            if rotation.is_some() {
                                return Err(de::Error::duplicate_field("rotation"));
                            }
                            rotation = Some(map.next_value()?);
                        }
                        Field::Position => {
                            if position.is_some() {
                                return Err(de::Error::duplicate_field("position"));
                            }
                            position = Some(map.next_value()?);
                        }
                    }
                }
                let rotation = rotation.ok_or_else(|| de::Error::missing_field("rotation"))?;
                let position = position.ok_or_else(|| de::Error::missing_field("position"))?;
                Ok(CameraPose::from_rotation_and_position(rotation, position))
            }
        }

        const FIELDS: &[&str] = &["rotation", "position"];
        deserializer.deserialize_struct(
            "CameraPose",
            FIELDS,
            CameraPoseVisitor(std::marker::PhantomData),
        )
    }
}
