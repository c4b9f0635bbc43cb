//! Geometry-pass render target

use std::fmt;
use std::rc::Rc;

use crate::gl::{FrameBuffer, GraphicsContext, RenderBuffer, Texture, TextureFormat, TextureKind};
use crate::render::RenderResult;

/// The four color attachments plus depth written by the geometry pass
pub struct GBuffer {
    /// Off-screen framebuffer
    pub frame_buffer: FrameBuffer,
    /// World-space position, attachment 0
    pub position: Texture,
    /// Surface normal, attachment 1
    pub normal: Texture,
    /// Albedo, attachment 2
    pub albedo: Texture,
    /// Packed metallic / roughness / ambient occlusion, attachment 3
    pub metallic_roughness_ambient_occlusion: Texture,
    /// Depth storage, blitted to the default framebuffer after lighting
    pub depth: RenderBuffer,
    width: u32,
    height: u32,
}

fn attachment(gl: &Rc<dyn GraphicsContext>, format: TextureFormat, width: u32, height: u32) -> RenderResult<Texture> {
    let mut texture = Texture::new(Rc::clone(gl), TextureKind::Texture2d);
    texture.generate_2d(format, width, height, None, false)?;
    texture.set_nearest_filtering()?;
    Ok(texture)
}

impl GBuffer {
    /// Allocate every attachment at `width` x `height`
    pub fn new(gl: &Rc<dyn GraphicsContext>, width: u32, height: u32) -> RenderResult<Self> {
        let mut frame_buffer = FrameBuffer::new(Rc::clone(gl));
        frame_buffer.generate()?;
        frame_buffer.bind()?;

        let position = attachment(gl, TextureFormat::RGB16F, width, height)?;
        let normal = attachment(gl, TextureFormat::RGB16F, width, height)?;
        let albedo = attachment(gl, TextureFormat::RGBA8, width, height)?;
        let metallic_roughness_ambient_occlusion = attachment(gl, TextureFormat::RGB8, width, height)?;

        frame_buffer.attach(&position)?;
        frame_buffer.attach(&normal)?;
        frame_buffer.attach(&albedo)?;
        frame_buffer.attach(&metallic_roughness_ambient_occlusion)?;

        let mut depth = RenderBuffer::new(Rc::clone(gl));
        depth.generate()?;
        depth.set_storage(glow::DEPTH_COMPONENT, width, height)?;
        frame_buffer.attach_render_buffer(&depth, glow::DEPTH_ATTACHMENT)?;

        frame_buffer.ensure_complete()?;
        FrameBuffer::unbind(gl.as_ref());

        log::debug!("Created {width}x{height} G-buffer");
        Ok(Self {
            frame_buffer,
            position,
            normal,
            albedo,
            metallic_roughness_ambient_occlusion,
            depth,
            width,
            height,
        })
    }

    /// Bind the four color attachments to units 0 to 3
    pub fn bind_textures(&self) -> RenderResult<()> {
        self.position.bind_to_unit(0)?;
        self.normal.bind_to_unit(1)?;
        self.albedo.bind_to_unit(2)?;
        self.metallic_roughness_ambient_occlusion.bind_to_unit(3)
    }

    /// Attachment size
    pub const fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl fmt::Debug for GBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GBuffer")
            .field("frame_buffer", &self.frame_buffer.id())
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{HeadlessContext, ObjectKind};

    #[test]
    fn test_gbuffer_is_complete_with_four_outputs() {
        let headless = Rc::new(HeadlessContext::new());
        let gl: Rc<dyn GraphicsContext> = headless.clone();
        let gbuffer = GBuffer::new(&gl, 64, 32).unwrap();

        assert_eq!(gbuffer.frame_buffer.color_attachments(), 4);
        assert!(gbuffer.frame_buffer.ready().unwrap());
        assert_eq!(headless.live_count(ObjectKind::Texture), 4);
        assert_eq!(headless.live_count(ObjectKind::Renderbuffer), 1);
        assert_eq!(headless.texture_size(gbuffer.albedo.id().unwrap()), Some((64, 32, 1)));
        assert_eq!(headless.errors_raised(), 0);
    }

    #[test]
    fn test_drop_releases_every_attachment() {
        let headless = Rc::new(HeadlessContext::new());
        let gl: Rc<dyn GraphicsContext> = headless.clone();
        drop(GBuffer::new(&gl, 8, 8).unwrap());
        assert_eq!(headless.live_objects(), 0);
    }
}
