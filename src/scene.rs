use alloc::string::String;
use alloc::vec::Vec;

use nalgebra::{storage::Owned, Dyn, Matrix4, OMatrix, Point3, RealField, U3};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

use crate::{coordinate_system::WorldFrame, Points};

/// Which points of an object are projected to build its box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-serialize", serde(rename_all = "snake_case"))]
pub enum BoundingGeometry {
    /// The 8 corners of the object's local axis-aligned bounding box. Cheap,
    /// but boxes are loose for rotated or rounded objects.
    BoxCorners,
    /// Every mesh vertex. Tight boxes at the cost of projecting the whole
    /// mesh.
    #[default]
    MeshVertices,
}

/// An object placed in the scene, as handed over by the scene graph.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject<R: RealField> {
    /// Name of the object, for diagnostics.
    pub name: String,
    /// Class label attached to the object.
    pub class_idx: u32,
    /// Object-to-world affine transform.
    pub world_transform: Matrix4<R>,
    /// Mesh vertices in object coordinates.
    pub vertices: Vec<Point3<R>>,
}

impl<R: RealField + Copy> SceneObject<R> {
    /// Create an object from its mesh vertices.
    pub fn new(
        name: impl Into<String>,
        class_idx: u32,
        world_transform: Matrix4<R>,
        vertices: Vec<Point3<R>>,
    ) -> Self {
        Self {
            name: name.into(),
            class_idx,
            world_transform,
            vertices,
        }
    }

    /// Create a box primitive centered on its origin.
    pub fn cuboid(
        name: impl Into<String>,
        class_idx: u32,
        half_extents: [R; 3],
        world_transform: Matrix4<R>,
    ) -> Self {
        let [hx, hy, hz] = half_extents;
        let vertices = box_corners(
            &Point3::new(-hx, -hy, -hz),
            &Point3::new(hx, hy, hz),
        )
        .to_vec();
        Self::new(name, class_idx, world_transform, vertices)
    }

    /// Corners of the axis-aligned box enclosing the vertices, in object
    /// coordinates. `None` if the object has no vertices.
    pub fn local_bounding_corners(&self) -> Option<[Point3<R>; 8]> {
        let (first, rest) = self.vertices.split_first()?;
        let (lo, hi) = rest.iter().fold((*first, *first), |(lo, hi), v| {
            (lo.inf(v), hi.sup(v))
        });
        Some(box_corners(&lo, &hi))
    }

    /// The points of this object in world coordinates, one per row.
    ///
    /// Objects without vertices give zero rows.
    pub fn world_points(
        &self,
        geometry: BoundingGeometry,
    ) -> Points<WorldFrame, R, Dyn, Owned<R, Dyn, U3>> {
        let local: Vec<Point3<R>> = match geometry {
            BoundingGeometry::BoxCorners => self
                .local_bounding_corners()
                .map(|corners| corners.to_vec())
                .unwrap_or_default(),
            BoundingGeometry::MeshVertices => self.vertices.clone(),
        };
        let world: Vec<Point3<R>> = local
            .iter()
            .map(|p| self.world_transform.transform_point(p))
            .collect();
        Points::new(OMatrix::<R, Dyn, U3>::from_fn(world.len(), |i, j| {
            world[i][j]
        }))
    }
}

/// Box corners in the order used by the scene graph's `bound_box`.
fn box_corners<R: RealField + Copy>(lo: &Point3<R>, hi: &Point3<R>) -> [Point3<R>; 8] {
    [
        Point3::new(lo.x, lo.y, lo.z),
        Point3::new(lo.x, lo.y, hi.z),
        Point3::new(lo.x, hi.y, hi.z),
        Point3::new(lo.x, hi.y, lo.z),
        Point3::new(hi.x, lo.y, lo.z),
        Point3::new(hi.x, lo.y, hi.z),
        Point3::new(hi.x, hi.y, hi.z),
        Point3::new(hi.x, hi.y, lo.z),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Rotation3, Translation3, Vector3};

    fn triangle() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.5),
        ]
    }

    #[test]
    fn bounding_corners_enclose_vertices() {
        let obj = SceneObject::new("tri", 0, Matrix4::identity(), triangle());
        let corners = obj.local_bounding_corners().unwrap();
        assert_eq!(corners[0], Point3::new(0.0, 0.0, 0.0));
        assert_eq!(corners[6], Point3::new(2.0, 1.0, 0.5));
        for c in corners.iter() {
            assert!(c.x == 0.0 || c.x == 2.0);
            assert!(c.y == 0.0 || c.y == 1.0);
            assert!(c.z == 0.0 || c.z == 0.5);
        }
    }

    #[test]
    fn empty_object_has_no_points() {
        let obj = SceneObject::<f64>::new("empty", 0, Matrix4::identity(), Vec::new());
        assert!(obj.local_bounding_corners().is_none());
        assert_eq!(obj.world_points(BoundingGeometry::BoxCorners).data.nrows(), 0);
        assert_eq!(obj.world_points(BoundingGeometry::MeshVertices).data.nrows(), 0);
    }

    #[test]
    fn geometry_selects_points() {
        let obj = SceneObject::new("tri", 0, Matrix4::identity(), triangle());
        assert_eq!(obj.world_points(BoundingGeometry::BoxCorners).data.nrows(), 8);
        assert_eq!(obj.world_points(BoundingGeometry::MeshVertices).data.nrows(), 3);
    }

    #[test]
    fn world_transform_is_applied() {
        let transform = Translation3::new(10.0, -5.0, 1.0).to_homogeneous()
            * Rotation3::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2)
                .to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&Vector3::new(2.0, 1.0, 1.0));
        let obj = SceneObject::new("tri", 0, transform, triangle());
        let pts = obj.world_points(BoundingGeometry::MeshVertices);

        // (2, 0, 0) -> scaled (4, 0, 0) -> rotated (0, 4, 0) -> translated
        approx::assert_abs_diff_eq!(pts.data[(1, 0)], 10.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(pts.data[(1, 1)], -1.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(pts.data[(1, 2)], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn cuboid_is_centered() {
        let obj = SceneObject::cuboid("box", 3, [1.0, 2.0, 0.5], Matrix4::identity());
        assert_eq!(obj.class_idx, 3);
        assert_eq!(obj.vertices.len(), 8);
        let corners = obj.local_bounding_corners().unwrap();
        assert_eq!(corners[0], Point3::new(-1.0, -2.0, -0.5));
        assert_eq!(corners[6], Point3::new(1.0, 2.0, 0.5));
    }
}
