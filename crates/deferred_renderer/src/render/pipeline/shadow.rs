//! Directional-light shadow map

use std::fmt;
use std::rc::Rc;

use crate::foundation::math::{self, Mat4, Vec3};
use crate::gl::{FrameBuffer, GraphicsContext, Texture, TextureFormat, TextureKind};
use crate::render::RenderResult;

/// Direction of the single directional light
pub const LIGHT_DIRECTION: Vec3 = Vec3::new(-0.2, -1.0, -0.3);

/// Half extent of the orthographic light frustum
const LIGHT_HALF_EXTENT: f32 = 20.0;
const LIGHT_NEAR: f32 = -10.0;
const LIGHT_FAR: f32 = 100.0;

/// Position the light renders from: opposite its direction, relative to the camera
pub fn light_position(camera_position: &Vec3) -> Vec3 {
    camera_position - LIGHT_DIRECTION
}

/// Light projection · light view, looking at the camera position
pub fn light_space_matrix(camera_position: &Vec3) -> Mat4 {
    let projection = math::orthographic(
        -LIGHT_HALF_EXTENT,
        LIGHT_HALF_EXTENT,
        -LIGHT_HALF_EXTENT,
        LIGHT_HALF_EXTENT,
        LIGHT_NEAR,
        LIGHT_FAR,
    );
    let view = math::look_at(&light_position(camera_position), camera_position, &Vec3::y());
    projection * view
}

/// Depth-only framebuffer sampled by the lighting pass
pub struct ShadowMap {
    /// Framebuffer with only a depth attachment
    pub frame_buffer: FrameBuffer,
    /// Square depth texture
    pub depth: Texture,
    size: u32,
}

impl ShadowMap {
    /// Allocate a `size` x `size` depth map
    pub fn new(gl: &Rc<dyn GraphicsContext>, size: u32) -> RenderResult<Self> {
        let mut depth = Texture::new(Rc::clone(gl), TextureKind::Texture2d);
        depth.generate_2d(TextureFormat::DEPTH, size, size, None, false)?;
        depth.set_nearest_filtering()?;
        // Samples outside the map read as fully lit
        depth.set_border_color([1.0, 1.0, 1.0, 1.0])?;

        let mut frame_buffer = FrameBuffer::new(Rc::clone(gl));
        frame_buffer.generate()?;
        frame_buffer.attach_at(&depth, glow::DEPTH_ATTACHMENT)?;
        FrameBuffer::draw_buffer(gl.as_ref(), glow::NONE);
        FrameBuffer::read_buffer(gl.as_ref(), glow::NONE);
        frame_buffer.ensure_complete()?;
        FrameBuffer::unbind(gl.as_ref());

        log::debug!("Created {size}x{size} shadow map");
        Ok(Self {
            frame_buffer,
            depth,
            size,
        })
    }

    /// Edge length in texels
    pub const fn size(&self) -> u32 {
        self.size
    }
}

impl fmt::Debug for ShadowMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowMap")
            .field("frame_buffer", &self.frame_buffer.id())
            .field("depth", &self.depth.id())
            .field("size", &self.size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::HeadlessContext;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-4;

    #[test]
    fn test_light_sits_opposite_its_direction() {
        let camera = Vec3::new(3.0, 1.0, -2.0);
        assert_relative_eq!(light_position(&camera), Vec3::new(3.2, 2.0, -1.7), epsilon = EPSILON);
    }

    #[test]
    fn test_camera_position_projects_to_frustum_center() {
        let camera = Vec3::new(5.0, 0.0, 5.0);
        let clip = light_space_matrix(&camera).transform_point(&math::Point3::from(camera));
        assert_relative_eq!(clip.x, 0.0, epsilon = EPSILON);
        assert_relative_eq!(clip.y, 0.0, epsilon = EPSILON);
    }

    #[test]
    fn test_shadow_map_is_depth_only() {
        let headless = Rc::new(HeadlessContext::new());
        let gl: Rc<dyn GraphicsContext> = headless.clone();
        let shadow = ShadowMap::new(&gl, 256).unwrap();

        assert!(shadow.frame_buffer.ready().unwrap());
        assert_eq!(shadow.frame_buffer.color_attachments(), 0);
        assert_eq!(headless.texture_size(shadow.depth.id().unwrap()), Some((256, 256, 1)));
        assert_eq!(headless.errors_raised(), 0);
    }
}
