//! Process-wide camera

use crate::foundation::handle::Handle;
use crate::foundation::math::{self, Mat4, Quat, Quaternion, TransformSpace, Vec3};
use crate::render::{RenderError, RenderResult};

/// Eye position and orientation; looks down its local -Z axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// World position
    pub position: Vec3,
    /// Orientation
    pub orientation: Quat,
}

/// Handle to the camera
pub type CameraHandle = Handle<Camera>;

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            orientation: Quat::identity(),
        }
    }
}

impl Camera {
    /// Camera at `position` facing `target`
    pub fn looking_at(position: Vec3, target: Vec3) -> RenderResult<Self> {
        let mut camera = Self {
            position,
            ..Self::default()
        };
        camera.look_at(&target)?;
        Ok(camera)
    }

    /// `rotation⁻¹ · translate(-position)`
    pub fn view_matrix(&self) -> Mat4 {
        math::view_matrix(&self.position, &self.orientation)
    }

    /// Compose `rotation` with the current orientation
    pub fn rotate(&mut self, rotation: Quaternion<f32>, relative_to: TransformSpace) {
        self.orientation = math::compose_rotation(self.orientation, rotation, relative_to);
    }

    /// Compose a rotation of `degrees` about `axis`
    pub fn rotate_degrees(&mut self, degrees: f32, axis: &Vec3, relative_to: TransformSpace) {
        let rotation = math::axis_angle_degrees(degrees, axis);
        self.rotate(rotation.into_inner(), relative_to);
    }

    /// Face `target`, keeping the position
    ///
    /// Fails when `target` is the current position.
    pub fn look_at(&mut self, target: &Vec3) -> RenderResult<()> {
        self.orientation = math::orientation_facing(&self.position, target).ok_or_else(|| {
            RenderError::InvalidInput("camera cannot look at its own position".to_string())
        })?;
        Ok(())
    }

    /// Unit vector the camera looks along
    pub fn forward(&self) -> Vec3 {
        self.orientation * -Vec3::z()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_looking_at_faces_target() {
        let camera = Camera::looking_at(Vec3::new(0.0, 0.0, 5.0), Vec3::new(5.0, 0.0, 5.0)).unwrap();
        assert_relative_eq!(camera.forward(), Vec3::x(), epsilon = EPSILON);
    }

    #[test]
    fn test_view_matrix_moves_eye_to_origin() {
        let camera = Camera::looking_at(Vec3::new(1.0, 2.0, 3.0), Vec3::new(1.0, 2.0, 0.0)).unwrap();
        let eye = camera.view_matrix().transform_point(&math::Point3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(eye.coords, Vec3::zeros(), epsilon = EPSILON);

        let target = camera.view_matrix().transform_point(&math::Point3::new(1.0, 2.0, 0.0));
        assert_relative_eq!(target.coords, Vec3::new(0.0, 0.0, -3.0), epsilon = EPSILON);
    }

    #[test]
    fn test_look_at_own_position_fails() {
        let mut camera = Camera::default();
        assert!(matches!(camera.look_at(&Vec3::zeros()), Err(RenderError::InvalidInput(_))));
        assert_eq!(camera.orientation, Quat::identity());
    }

    #[test]
    fn test_degrees_match_quaternion_form() {
        let axis = Vec3::y();
        let mut by_degrees = Camera::default();
        by_degrees.rotate_degrees(90.0, &axis, TransformSpace::World);

        let mut by_quaternion = Camera::default();
        by_quaternion.rotate(math::axis_angle_degrees(90.0, &axis).into_inner(), TransformSpace::World);

        assert_relative_eq!(by_degrees.orientation, by_quaternion.orientation, epsilon = EPSILON);
        assert_relative_eq!(by_degrees.forward(), -Vec3::x(), epsilon = EPSILON);
    }
}
