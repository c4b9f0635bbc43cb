//! Transform mutators and accessors
//!
//! Pure data updates on scene records and the camera; nothing here touches
//! the graphics context.
//!
//! # Panics
//!
//! Accessors and mutators index straight into the registries and panic on
//! a stale scene, renderable or light handle. Check with
//! [`Renderer::valid_in_scene`] first when a handle may have been destroyed.
//! Camera calls use the current camera and fall back to a no-op (or the
//! default camera for reads) when none exists.

use super::renderer::invalid;
use crate::foundation::math::{self, GraphicsData, Quat, Quaternion, TransformSpace, Vec3};
use crate::render::camera::Camera;
use crate::render::scene::{PointLightHandle, RenderableHandle, SceneHandle};
use crate::render::{RenderError, RenderResult, Renderer};

impl Renderer {
    fn graphics(&self, scene: SceneHandle, renderable: RenderableHandle) -> &GraphicsData {
        &self.scenes[scene].renderables()[renderable].graphics
    }

    fn graphics_mut(&mut self, scene: SceneHandle, renderable: RenderableHandle) -> &mut GraphicsData {
        &mut self.scenes[scene].renderables_mut()[renderable].graphics
    }

    // Renderables

    /// Compose `rotation` onto a renderable's orientation
    pub fn rotate(
        &mut self,
        scene: SceneHandle,
        renderable: RenderableHandle,
        rotation: Quaternion<f32>,
        relative_to: TransformSpace,
    ) {
        self.graphics_mut(scene, renderable).rotate(rotation, relative_to);
    }

    /// Compose a rotation of `degrees` about `axis`
    pub fn rotate_degrees(
        &mut self,
        scene: SceneHandle,
        renderable: RenderableHandle,
        degrees: f32,
        axis: &Vec3,
        relative_to: TransformSpace,
    ) {
        let rotation = math::axis_angle_degrees(degrees, axis);
        self.rotate(scene, renderable, rotation.into_inner(), relative_to);
    }

    /// Replace a renderable's orientation; the quaternion is normalized
    pub fn set_rotation(&mut self, scene: SceneHandle, renderable: RenderableHandle, rotation: Quaternion<f32>) {
        self.graphics_mut(scene, renderable).orientation = Quat::new_normalize(rotation);
    }

    /// Replace a renderable's orientation with `degrees` about `axis`
    pub fn set_rotation_degrees(&mut self, scene: SceneHandle, renderable: RenderableHandle, degrees: f32, axis: &Vec3) {
        self.graphics_mut(scene, renderable).orientation = math::axis_angle_degrees(degrees, axis);
    }

    /// A renderable's orientation
    pub fn rotation(&self, scene: SceneHandle, renderable: RenderableHandle) -> Quat {
        self.graphics(scene, renderable).orientation
    }

    /// Move a renderable by `offset`
    pub fn translate(&mut self, scene: SceneHandle, renderable: RenderableHandle, offset: &Vec3) {
        self.graphics_mut(scene, renderable).position += offset;
    }

    /// Place a renderable at `position`
    pub fn set_position(&mut self, scene: SceneHandle, renderable: RenderableHandle, position: Vec3) {
        self.graphics_mut(scene, renderable).position = position;
    }

    /// A renderable's position
    pub fn position(&self, scene: SceneHandle, renderable: RenderableHandle) -> Vec3 {
        self.graphics(scene, renderable).position
    }

    /// Replace a renderable's per-axis scale
    pub fn set_scale(&mut self, scene: SceneHandle, renderable: RenderableHandle, scale: Vec3) {
        self.graphics_mut(scene, renderable).scale = scale;
    }

    /// A renderable's per-axis scale
    pub fn scale(&self, scene: SceneHandle, renderable: RenderableHandle) -> Vec3 {
        self.graphics(scene, renderable).scale
    }

    /// Turn a renderable so its -Z axis faces `target`
    ///
    /// Unlike the other mutators this checks its handles, and it fails with
    /// `InvalidInput` when `target` is the renderable's own position.
    pub fn look_at(&mut self, scene: SceneHandle, renderable: RenderableHandle, target: &Vec3) -> RenderResult<()> {
        let graphics = &mut self
            .scenes
            .get_mut(scene)
            .ok_or_else(|| invalid("scene"))?
            .renderables_mut()
            .get_mut(renderable)
            .ok_or_else(|| invalid("renderable"))?
            .graphics;
        graphics.orientation = math::orientation_facing(&graphics.position, target).ok_or_else(|| {
            RenderError::InvalidInput("renderable cannot look at its own position".to_string())
        })?;
        Ok(())
    }

    // Point lights

    /// Move a light by `offset`
    pub fn translate_light(&mut self, scene: SceneHandle, light: PointLightHandle, offset: &Vec3) {
        self.scenes[scene].point_lights_mut()[light].position += offset;
    }

    /// Place a light at `position`
    pub fn set_light_position(&mut self, scene: SceneHandle, light: PointLightHandle, position: Vec3) {
        self.scenes[scene].point_lights_mut()[light].position = position;
    }

    /// A light's position
    pub fn light_position(&self, scene: SceneHandle, light: PointLightHandle) -> Vec3 {
        self.scenes[scene].point_lights()[light].position
    }

    /// Set a light's color
    pub fn set_light_color(&mut self, scene: SceneHandle, light: PointLightHandle, color: Vec3) {
        self.scenes[scene].point_lights_mut()[light].color = color;
    }

    /// A light's color
    pub fn light_color(&self, scene: SceneHandle, light: PointLightHandle) -> Vec3 {
        self.scenes[scene].point_lights()[light].color
    }

    // Camera

    fn camera_mut(&mut self) -> Option<&mut Camera> {
        self.camera.and_then(|handle| self.cameras.get_mut(handle))
    }

    fn camera_ref(&self) -> Camera {
        self.camera
            .and_then(|handle| self.cameras.get(handle))
            .copied()
            .unwrap_or_default()
    }

    /// Compose `rotation` onto the camera orientation
    pub fn rotate_camera(&mut self, rotation: Quaternion<f32>, relative_to: TransformSpace) {
        if let Some(camera) = self.camera_mut() {
            camera.rotate(rotation, relative_to);
        }
    }

    /// Compose a rotation of `degrees` about `axis` onto the camera
    pub fn rotate_camera_degrees(&mut self, degrees: f32, axis: &Vec3, relative_to: TransformSpace) {
        if let Some(camera) = self.camera_mut() {
            camera.rotate_degrees(degrees, axis, relative_to);
        }
    }

    /// Replace the camera orientation
    pub fn set_camera_rotation(&mut self, rotation: Quaternion<f32>) {
        if let Some(camera) = self.camera_mut() {
            camera.orientation = Quat::new_normalize(rotation);
        }
    }

    /// Camera orientation
    pub fn camera_rotation(&self) -> Quat {
        self.camera_ref().orientation
    }

    /// Move the camera by `offset`
    pub fn translate_camera(&mut self, offset: &Vec3) {
        if let Some(camera) = self.camera_mut() {
            camera.position += offset;
        }
    }

    /// Place the camera at `position`
    pub fn set_camera_position(&mut self, position: Vec3) {
        if let Some(camera) = self.camera_mut() {
            camera.position = position;
        }
    }

    /// Camera position
    pub fn camera_position(&self) -> Vec3 {
        self.camera_ref().position
    }

    /// Turn the camera toward `target`
    pub fn camera_look_at(&mut self, target: &Vec3) -> RenderResult<()> {
        self.camera_mut().ok_or_else(|| invalid("camera"))?.look_at(target)
    }
}

#[cfg(test)]
mod tests {
    use crate::foundation::math::{axis_angle_degrees, GraphicsData, TransformSpace, Vec3};
    use crate::render::resources::MeshData;
    use crate::render::scene::Shading;
    use crate::render::{RenderError, RenderableHandle, Renderer, SceneHandle};
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    fn scene_with_cube() -> (Renderer, SceneHandle, RenderableHandle) {
        let mut renderer = Renderer::headless(320, 240).unwrap();
        let scene = renderer.create_render_scene();
        let mesh = renderer.create_static_mesh(&MeshData::cube()).unwrap();
        let renderable = renderer
            .create_renderable(scene, mesh, Shading::None, GraphicsData::default())
            .unwrap();
        (renderer, scene, renderable)
    }

    #[test]
    fn test_local_rotation_then_inverse_restores() {
        let (mut renderer, scene, renderable) = scene_with_cube();
        let start = axis_angle_degrees(30.0, &Vec3::x());
        renderer.set_rotation(scene, renderable, start.into_inner());

        let q = axis_angle_degrees(45.0, &Vec3::new(0.0, 1.0, 1.0));
        renderer.rotate(scene, renderable, q.into_inner(), TransformSpace::Local);
        renderer.rotate(scene, renderable, q.inverse().into_inner(), TransformSpace::Local);

        assert_relative_eq!(renderer.rotation(scene, renderable), start, epsilon = EPSILON);
    }

    #[test]
    fn test_world_rotation_differs_from_local() {
        let (mut renderer, scene, renderable) = scene_with_cube();
        let mesh = renderer.scene(scene).unwrap().renderables()[renderable].mesh;
        let other = renderer
            .create_renderable(scene, mesh, Shading::None, GraphicsData::default())
            .unwrap();
        for handle in [renderable, other] {
            renderer.rotate_degrees(scene, handle, 90.0, &Vec3::x(), TransformSpace::Local);
        }

        renderer.rotate_degrees(scene, renderable, 90.0, &Vec3::y(), TransformSpace::Local);
        renderer.rotate_degrees(scene, other, 90.0, &Vec3::y(), TransformSpace::World);

        let local = renderer.rotation(scene, renderable);
        let world = renderer.rotation(scene, other);
        assert!(local.angle_to(&world) > 0.1);
    }

    #[test]
    fn test_position_and_scale() {
        let (mut renderer, scene, renderable) = scene_with_cube();
        renderer.set_position(scene, renderable, Vec3::new(1.0, 2.0, 3.0));
        renderer.translate(scene, renderable, &Vec3::new(1.0, 0.0, -1.0));
        assert_relative_eq!(renderer.position(scene, renderable), Vec3::new(2.0, 2.0, 2.0), epsilon = EPSILON);

        renderer.set_scale(scene, renderable, Vec3::new(2.0, 1.0, 0.5));
        assert_relative_eq!(renderer.scale(scene, renderable), Vec3::new(2.0, 1.0, 0.5), epsilon = EPSILON);
    }

    #[test]
    fn test_look_at_faces_target() {
        let (mut renderer, scene, renderable) = scene_with_cube();
        renderer.look_at(scene, renderable, &Vec3::new(5.0, 0.0, 0.0)).unwrap();
        let forward = renderer.rotation(scene, renderable) * -Vec3::z();
        assert_relative_eq!(forward, Vec3::x(), epsilon = EPSILON);

        assert!(matches!(
            renderer.look_at(scene, renderable, &Vec3::zeros()),
            Err(RenderError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_light_position_and_color() {
        let mut renderer = Renderer::headless(64, 64).unwrap();
        let scene = renderer.create_render_scene();
        let light = renderer.create_point_light(scene, Vec3::zeros()).unwrap();

        assert_relative_eq!(renderer.light_color(scene, light), Vec3::new(1.0, 1.0, 1.0));
        renderer.set_light_color(scene, light, Vec3::new(1.0, 0.5, 0.0));
        renderer.translate_light(scene, light, &Vec3::y());
        assert_relative_eq!(renderer.light_color(scene, light), Vec3::new(1.0, 0.5, 0.0));
        assert_relative_eq!(renderer.light_position(scene, light), Vec3::y());
        renderer.set_light_position(scene, light, Vec3::z());
        assert_relative_eq!(renderer.light_position(scene, light), Vec3::z());
    }

    #[test]
    fn test_camera_transforms() {
        let mut renderer = Renderer::headless(64, 64).unwrap();
        assert!(matches!(renderer.camera_look_at(&Vec3::x()), Err(RenderError::InvalidHandle { kind: "camera" })));

        renderer.create_camera(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros()).unwrap();
        assert_relative_eq!(renderer.camera_rotation() * -Vec3::z(), -Vec3::z(), epsilon = EPSILON);

        renderer.translate_camera(&Vec3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(renderer.camera_position(), Vec3::new(0.0, 1.0, 5.0), epsilon = EPSILON);

        renderer.rotate_camera_degrees(90.0, &Vec3::y(), TransformSpace::World);
        renderer.rotate_camera_degrees(-90.0, &Vec3::y(), TransformSpace::World);
        assert_relative_eq!(renderer.camera_rotation() * -Vec3::z(), -Vec3::z(), epsilon = EPSILON);

        renderer.set_camera_position(Vec3::zeros());
        renderer.camera_look_at(&Vec3::new(0.0, 0.0, 10.0)).unwrap();
        let forward = renderer.camera_rotation() * -Vec3::z();
        assert_relative_eq!(forward, Vec3::z(), epsilon = EPSILON);
    }

    #[test]
    #[should_panic]
    fn test_stale_renderable_panics() {
        let (mut renderer, scene, renderable) = scene_with_cube();
        renderer.destroy_in_scene(scene, renderable).unwrap();
        let _ = renderer.position(scene, renderable);
    }
}
