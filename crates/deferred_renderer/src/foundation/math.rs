//! Math utilities and types
//!
//! Thin aliases over nalgebra plus the transform helpers the pipeline and the
//! transform API share.

pub use nalgebra::{Matrix3, Matrix4, Quaternion, Unit, UnitQuaternion, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// Integer 4D vector, used for bone ids
pub type IVec4 = Vector4<i32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = UnitQuaternion<f32>;

/// Frame a rotation is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TransformSpace {
    /// Rotate about the object's own (already rotated) axes
    Local,
    /// Rotate about the global axes
    World,
}

/// Position, scale and orientation of a scene record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphicsData {
    /// Position in world space
    pub position: Vec3,
    /// Per-axis scale
    pub scale: Vec3,
    /// Orientation
    pub orientation: Quat,
}

impl Default for GraphicsData {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            orientation: Quat::identity(),
        }
    }
}

impl GraphicsData {
    /// Create transform data from its parts
    pub const fn new(position: Vec3, orientation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            scale,
            orientation,
        }
    }

    /// Model matrix, composed as translate · rotate · scale
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.orientation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Compose `rotation` onto the current orientation
    pub fn rotate(&mut self, rotation: Quaternion<f32>, relative_to: TransformSpace) {
        self.orientation = compose_rotation(self.orientation, rotation, relative_to);
    }
}

/// Compose a rotation with an existing orientation
///
/// `Local` right-multiplies (the rotation happens in the rotated frame),
/// `World` left-multiplies. The incoming quaternion is normalized first.
pub fn compose_rotation(current: Quat, rotation: Quaternion<f32>, relative_to: TransformSpace) -> Quat {
    let rotation = Quat::new_normalize(rotation);
    match relative_to {
        TransformSpace::Local => current * rotation,
        TransformSpace::World => rotation * current,
    }
}

/// Normalized rotation of `degrees` about `axis`
///
/// A zero-length axis yields the identity.
pub fn axis_angle_degrees(degrees: f32, axis: &Vec3) -> Quat {
    Unit::try_new(*axis, f32::EPSILON)
        .map_or_else(Quat::identity, |axis| Quat::from_axis_angle(&axis, degrees.to_radians()))
}

/// `inverse(transpose(mat3(view · model)))`
pub fn normal_matrix(view: &Mat4, model: &Mat4) -> Mat3 {
    let view_model: Mat3 = (view * model).fixed_view::<3, 3>(0, 0).into_owned();
    view_model
        .transpose()
        .try_inverse()
        .unwrap_or_else(Mat3::identity)
}

/// Right-handed perspective projection with a vertical field of view in degrees
pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    Mat4::new_perspective(aspect, fov_y_degrees.to_radians(), near, far)
}

/// Orthographic projection
pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    Mat4::new_orthographic(left, right, bottom, top, near, far)
}

/// Right-handed look-at view matrix
pub fn look_at(eye: &Vec3, target: &Vec3, up: &Vec3) -> Mat4 {
    Mat4::look_at_rh(&Point3::from(*eye), &Point3::from(*target), up)
}

/// View matrix for an eye at `position` with `orientation`: `rotation⁻¹ · translate(-position)`
pub fn view_matrix(position: &Vec3, orientation: &Quat) -> Mat4 {
    orientation.inverse().to_homogeneous() * Mat4::new_translation(&-position)
}

/// Strip the translation out of a view matrix
pub fn rotation_only(view: &Mat4) -> Mat4 {
    let rotation: Mat3 = view.fixed_view::<3, 3>(0, 0).into_owned();
    rotation.to_homogeneous()
}

/// Orientation whose -Z axis points from `position` toward `target`
///
/// Returns `None` when the two points coincide.
pub fn orientation_facing(position: &Vec3, target: &Vec3) -> Option<Quat> {
    let direction = target - position;
    let length = direction.norm();
    if length <= f32::EPSILON {
        return None;
    }

    // Looking straight up or down, fall back to Z as the up vector
    let up = if (direction / length).y.abs() > 0.999 {
        Vec3::z()
    } else {
        Vec3::y()
    };

    Some(Quat::look_at_rh(&direction, &up).inverse())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_model_matrix_order() {
        let data = GraphicsData::new(
            Vec3::new(1.0, 2.0, 3.0),
            axis_angle_degrees(90.0, &Vec3::y()),
            Vec3::new(2.0, 2.0, 2.0),
        );

        // Scale first, then rotate +X onto -Z, then translate
        let point = data.model_matrix().transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(point, Point3::new(1.0, 2.0, 1.0), epsilon = EPSILON);
    }

    #[test]
    fn test_local_rotation_then_inverse_restores() {
        let start = axis_angle_degrees(30.0, &Vec3::new(1.0, 1.0, 0.0));
        let q = axis_angle_degrees(75.0, &Vec3::z());

        let mut data = GraphicsData {
            orientation: start,
            ..GraphicsData::default()
        };
        data.rotate(*q.quaternion(), TransformSpace::Local);
        data.rotate(*q.inverse().quaternion(), TransformSpace::Local);

        assert_relative_eq!(data.orientation, start, epsilon = EPSILON);
    }

    #[test]
    fn test_world_and_local_differ() {
        let start = axis_angle_degrees(90.0, &Vec3::x());
        let q = axis_angle_degrees(90.0, &Vec3::y());

        let local = compose_rotation(start, *q.quaternion(), TransformSpace::Local);
        let world = compose_rotation(start, *q.quaternion(), TransformSpace::World);

        assert!(local.angle_to(&world) > 0.1);
        assert_relative_eq!(local, start * q, epsilon = EPSILON);
        assert_relative_eq!(world, q * start, epsilon = EPSILON);
    }

    #[test]
    fn test_unnormalized_rotation_is_normalized() {
        let raw = Quaternion::new(2.0, 0.0, 0.0, 0.0);
        let composed = compose_rotation(Quat::identity(), raw, TransformSpace::World);
        assert_relative_eq!(composed.quaternion().norm(), 1.0, epsilon = EPSILON);
    }

    #[test]
    fn test_facing_orientation_looks_down_negative_z() {
        let eye = Vec3::new(0.0, 2.0, 5.0);
        let target = Vec3::new(1.0, 0.0, -3.0);
        let orientation = orientation_facing(&eye, &target).unwrap();

        let view = view_matrix(&eye, &orientation);
        let in_view = view.transform_point(&Point3::from(target));
        let distance = (target - eye).norm();

        assert_relative_eq!(in_view, Point3::new(0.0, 0.0, -distance), epsilon = 1e-4);
    }

    #[test]
    fn test_facing_degenerate_and_vertical() {
        let eye = Vec3::new(1.0, 1.0, 1.0);
        assert!(orientation_facing(&eye, &eye).is_none());

        let below = orientation_facing(&eye, &Vec3::new(1.0, -4.0, 1.0)).unwrap();
        let forward = below * -Vec3::z();
        assert_relative_eq!(forward, -Vec3::y(), epsilon = EPSILON);
    }

    #[test]
    fn test_rotation_only_drops_translation() {
        let view = view_matrix(&Vec3::new(4.0, 5.0, 6.0), &axis_angle_degrees(45.0, &Vec3::y()));
        let stripped = rotation_only(&view);

        assert_relative_eq!(stripped.m14, 0.0);
        assert_relative_eq!(stripped.m24, 0.0);
        assert_relative_eq!(stripped.m34, 0.0);
        assert_relative_eq!(stripped.m11, view.m11);
    }

    #[test]
    fn test_normal_matrix_of_uniform_scale() {
        let model = Mat4::new_scaling(2.0);
        let normal = normal_matrix(&Mat4::identity(), &model);
        assert_relative_eq!(normal, Mat3::identity() * 0.5, epsilon = EPSILON);
    }
}
