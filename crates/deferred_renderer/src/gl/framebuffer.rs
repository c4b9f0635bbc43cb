//! Framebuffer and renderbuffer objects

use std::fmt;
use std::rc::Rc;

use super::{require, require_unallocated, GraphicsContext, NativeId, Texture};
use crate::render::{RenderError, RenderResult};

/// An off-screen render target
pub struct FrameBuffer {
    gl: Rc<dyn GraphicsContext>,
    id: Option<NativeId>,
    color_attachments: u32,
}

impl FrameBuffer {
    /// Create an unallocated framebuffer
    pub fn new(gl: Rc<dyn GraphicsContext>) -> Self {
        Self {
            gl,
            id: None,
            color_attachments: 0,
        }
    }

    /// Allocate the native framebuffer
    pub fn generate(&mut self) -> RenderResult<()> {
        require_unallocated(self.id, "frame buffer", "generate")?;
        let id = self
            .gl
            .create_framebuffer()
            .map_err(|e| RenderError::CreationFailed(format!("Could not create frame buffer: {e}")))?;
        self.id = Some(id);
        Ok(())
    }

    /// Bind for both reading and drawing
    pub fn bind(&self) -> RenderResult<()> {
        self.bind_to(glow::FRAMEBUFFER)
    }

    /// Bind to `target` (`FRAMEBUFFER`, `READ_FRAMEBUFFER` or `DRAW_FRAMEBUFFER`)
    pub fn bind_to(&self, target: u32) -> RenderResult<()> {
        let id = require(self.id, "frame buffer", "bind")?;
        self.gl.bind_framebuffer(target, Some(id));
        Ok(())
    }

    /// Rebind the default framebuffer
    pub fn unbind(gl: &dyn GraphicsContext) {
        gl.bind_framebuffer(glow::FRAMEBUFFER, None);
    }

    /// Attach `texture` at the next color attachment and enable every
    /// attached color output
    pub fn attach(&mut self, texture: &Texture) -> RenderResult<()> {
        let attachment = glow::COLOR_ATTACHMENT0 + self.color_attachments;
        self.attach_at(texture, attachment)?;
        self.color_attachments += 1;

        let outputs: Vec<u32> = (0..self.color_attachments)
            .map(|i| glow::COLOR_ATTACHMENT0 + i)
            .collect();
        self.gl.draw_buffers(&outputs);
        Ok(())
    }

    /// Attach `texture` at an explicit attachment point
    pub fn attach_at(&self, texture: &Texture, attachment: u32) -> RenderResult<()> {
        let texture_id = require(texture.id(), "texture", "attach")?;
        if self.id.is_none() {
            return Err(RenderError::NotAllocated {
                object: "frame buffer",
                action: "attach texture to",
            });
        }
        self.bind()?;
        self.gl.framebuffer_texture_2d(
            glow::FRAMEBUFFER,
            attachment,
            glow::TEXTURE_2D,
            Some(texture_id),
            0,
        );
        Ok(())
    }

    /// Attach a renderbuffer
    pub fn attach_render_buffer(&self, render_buffer: &RenderBuffer, attachment: u32) -> RenderResult<()> {
        let render_buffer_id = require(render_buffer.id(), "render buffer", "attach")?;
        if self.id.is_none() {
            return Err(RenderError::NotAllocated {
                object: "frame buffer",
                action: "attach render buffer to",
            });
        }
        self.bind()?;
        self.gl
            .framebuffer_renderbuffer(glow::FRAMEBUFFER, attachment, Some(render_buffer_id));
        Ok(())
    }

    /// Completeness status (binds the framebuffer)
    pub fn status(&self) -> RenderResult<u32> {
        self.bind()?;
        Ok(self.gl.check_framebuffer_status(glow::FRAMEBUFFER))
    }

    /// True when complete
    pub fn ready(&self) -> RenderResult<bool> {
        Ok(self.status()? == glow::FRAMEBUFFER_COMPLETE)
    }

    /// Fail with the status code unless complete
    pub fn ensure_complete(&self) -> RenderResult<()> {
        match self.status()? {
            glow::FRAMEBUFFER_COMPLETE => Ok(()),
            status => Err(RenderError::FramebufferIncomplete(status)),
        }
    }

    /// Select a single draw output of the bound framebuffer
    pub fn draw_buffer(gl: &dyn GraphicsContext, buffer: u32) {
        gl.draw_buffer(buffer);
    }

    /// Select the read source of the bound framebuffer
    pub fn read_buffer(gl: &dyn GraphicsContext, mode: u32) {
        gl.read_buffer(mode);
    }

    /// Number of color attachments added through [`FrameBuffer::attach`]
    pub const fn color_attachments(&self) -> u32 {
        self.color_attachments
    }

    /// Release the native framebuffer
    pub fn destroy(&mut self) -> RenderResult<()> {
        let id = require(self.id, "frame buffer", "destroy")?;
        self.gl.delete_framebuffer(id);
        self.id = None;
        self.color_attachments = 0;
        Ok(())
    }

    /// Move the native framebuffer out, leaving this object unallocated
    #[must_use]
    pub fn take(&mut self) -> Self {
        Self {
            gl: Rc::clone(&self.gl),
            id: self.id.take(),
            color_attachments: std::mem::take(&mut self.color_attachments),
        }
    }

    /// Native name, if allocated
    pub const fn id(&self) -> Option<NativeId> {
        self.id
    }

    /// True while allocated
    pub const fn valid(&self) -> bool {
        self.id.is_some()
    }
}

impl Drop for FrameBuffer {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.gl.delete_framebuffer(id);
        }
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("id", &self.id)
            .field("color_attachments", &self.color_attachments)
            .finish()
    }
}

/// Renderbuffer storage, used as the G-buffer depth attachment
pub struct RenderBuffer {
    gl: Rc<dyn GraphicsContext>,
    id: Option<NativeId>,
}

impl RenderBuffer {
    /// Create an unallocated renderbuffer
    pub fn new(gl: Rc<dyn GraphicsContext>) -> Self {
        Self { gl, id: None }
    }

    /// Allocate the native renderbuffer
    pub fn generate(&mut self) -> RenderResult<()> {
        require_unallocated(self.id, "render buffer", "generate")?;
        let id = self
            .gl
            .create_renderbuffer()
            .map_err(|e| RenderError::CreationFailed(format!("Could not create render buffer: {e}")))?;
        self.id = Some(id);
        Ok(())
    }

    /// Bind as the current renderbuffer
    pub fn bind(&self) -> RenderResult<()> {
        let id = require(self.id, "render buffer", "bind")?;
        self.gl.bind_renderbuffer(Some(id));
        Ok(())
    }

    /// Allocate storage of `internal_format`
    pub fn set_storage(&self, internal_format: u32, width: u32, height: u32) -> RenderResult<()> {
        self.bind()?;
        self.gl
            .renderbuffer_storage(internal_format, width as i32, height as i32);
        Ok(())
    }

    /// Release the native renderbuffer
    pub fn destroy(&mut self) -> RenderResult<()> {
        let id = require(self.id, "render buffer", "destroy")?;
        self.gl.delete_renderbuffer(id);
        self.id = None;
        Ok(())
    }

    /// Move the native renderbuffer out, leaving this object unallocated
    #[must_use]
    pub fn take(&mut self) -> Self {
        Self {
            gl: Rc::clone(&self.gl),
            id: self.id.take(),
        }
    }

    /// Native name, if allocated
    pub const fn id(&self) -> Option<NativeId> {
        self.id
    }

    /// True while allocated
    pub const fn valid(&self) -> bool {
        self.id.is_some()
    }
}

impl Drop for RenderBuffer {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.gl.delete_renderbuffer(id);
        }
    }
}

impl fmt::Debug for RenderBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderBuffer").field("id", &self.id).finish()
    }
}
