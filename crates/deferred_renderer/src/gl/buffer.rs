//! Buffer and vertex array objects

use std::fmt;
use std::rc::Rc;

use super::{require, require_unallocated, GraphicsContext, NativeId};
use crate::render::{RenderError, RenderResult};

/// A GPU buffer bound to one target (`ARRAY_BUFFER`, `UNIFORM_BUFFER`, ...)
pub struct Buffer {
    gl: Rc<dyn GraphicsContext>,
    target: u32,
    id: Option<NativeId>,
    size: usize,
}

impl Buffer {
    /// Create an unallocated buffer for `target`
    pub fn new(gl: Rc<dyn GraphicsContext>, target: u32) -> Self {
        Self {
            gl,
            target,
            id: None,
            size: 0,
        }
    }

    /// Allocate the native buffer
    pub fn generate(&mut self) -> RenderResult<()> {
        require_unallocated(self.id, "buffer", "generate")?;
        let id = self
            .gl
            .create_buffer()
            .map_err(|e| RenderError::CreationFailed(format!("Could not create buffer: {e}")))?;
        self.id = Some(id);
        Ok(())
    }

    /// Bind to this buffer's target
    pub fn bind(&self) -> RenderResult<()> {
        let id = require(self.id, "buffer", "bind")?;
        self.gl.bind_buffer(self.target, Some(id));
        Ok(())
    }

    /// Bind to indexed binding point `index` (uniform blocks)
    pub fn bind_base(&self, index: u32) -> RenderResult<()> {
        let id = require(self.id, "buffer", "bind")?;
        self.gl.bind_buffer_base(self.target, index, Some(id));
        Ok(())
    }

    /// Bind, then replace the storage with `data`
    pub fn upload(&mut self, data: &[u8], usage: u32) -> RenderResult<()> {
        self.bind()?;
        self.gl.buffer_data(self.target, data, usage);
        self.size = data.len();
        Ok(())
    }

    /// Bind, then reserve `size` undefined bytes
    pub fn reserve(&mut self, size: usize, usage: u32) -> RenderResult<()> {
        self.bind()?;
        self.gl.buffer_data_size(self.target, size as i32, usage);
        self.size = size;
        Ok(())
    }

    /// Bind, then overwrite bytes starting at `offset`
    pub fn write(&self, offset: usize, data: &[u8]) -> RenderResult<()> {
        self.check_range(offset, data.len())?;
        self.bind()?;
        self.gl.buffer_sub_data(self.target, offset as i32, data);
        Ok(())
    }

    /// Bind, then map-write-unmap `data` at `offset`
    ///
    /// Blocks until the driver has accepted the write.
    pub fn write_mapped(&self, offset: usize, data: &[u8]) -> RenderResult<()> {
        self.check_range(offset, data.len())?;
        self.bind()?;
        if self.gl.write_mapped(self.target, offset as i32, data) {
            Ok(())
        } else {
            Err(RenderError::CreationFailed("Could not map buffer range".to_string()))
        }
    }

    fn check_range(&self, offset: usize, len: usize) -> RenderResult<()> {
        if offset + len > self.size {
            return Err(RenderError::InvalidInput(format!(
                "write of {len} bytes at {offset} overflows a buffer of {} bytes",
                self.size
            )));
        }
        Ok(())
    }

    /// Release the native buffer
    pub fn destroy(&mut self) -> RenderResult<()> {
        let id = require(self.id, "buffer", "destroy")?;
        self.gl.delete_buffer(id);
        self.id = None;
        self.size = 0;
        Ok(())
    }

    /// Move the native buffer out, leaving this object unallocated
    #[must_use]
    pub fn take(&mut self) -> Self {
        Self {
            gl: Rc::clone(&self.gl),
            target: self.target,
            id: self.id.take(),
            size: std::mem::take(&mut self.size),
        }
    }

    /// Allocated size in bytes
    pub const fn size(&self) -> usize {
        self.size
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

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.gl.delete_buffer(id);
        }
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("target", &self.target)
            .field("id", &self.id)
            .field("size", &self.size)
            .finish()
    }
}

/// Vertex array object
pub struct VertexArray {
    gl: Rc<dyn GraphicsContext>,
    id: Option<NativeId>,
}

impl VertexArray {
    /// Create an unallocated vertex array
    pub fn new(gl: Rc<dyn GraphicsContext>) -> Self {
        Self { gl, id: None }
    }

    /// Allocate the native vertex array
    pub fn generate(&mut self) -> RenderResult<()> {
        require_unallocated(self.id, "vertex array", "generate")?;
        let id = self
            .gl
            .create_vertex_array()
            .map_err(|e| RenderError::CreationFailed(format!("Could not create vertex array: {e}")))?;
        self.id = Some(id);
        Ok(())
    }

    /// Bind as the current vertex array
    pub fn bind(&self) -> RenderResult<()> {
        let id = require(self.id, "vertex array", "bind")?;
        self.gl.bind_vertex_array(Some(id));
        Ok(())
    }

    /// Clear the current vertex array
    pub fn unbind(gl: &dyn GraphicsContext) {
        gl.bind_vertex_array(None);
    }

    /// Release the native vertex array
    pub fn destroy(&mut self) -> RenderResult<()> {
        let id = require(self.id, "vertex array", "destroy")?;
        self.gl.delete_vertex_array(id);
        self.id = None;
        Ok(())
    }

    /// Move the native vertex array out, leaving this object unallocated
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

impl Drop for VertexArray {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.gl.delete_vertex_array(id);
        }
    }
}

impl fmt::Debug for VertexArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexArray").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{HeadlessContext, ObjectKind};

    #[test]
    fn test_write_bounds_are_checked() {
        let gl: Rc<dyn GraphicsContext> = Rc::new(HeadlessContext::new());
        let mut buffer = Buffer::new(gl, glow::ARRAY_BUFFER);
        buffer.generate().unwrap();
        buffer.reserve(8, glow::DYNAMIC_DRAW).unwrap();

        assert!(buffer.write(4, &[1, 2, 3, 4]).is_ok());
        assert!(matches!(buffer.write(6, &[1, 2, 3, 4]), Err(RenderError::InvalidInput(_))));
    }

    #[test]
    fn test_mapped_write_reaches_storage() {
        let headless = Rc::new(HeadlessContext::new());
        let gl: Rc<dyn GraphicsContext> = headless.clone();
        let mut buffer = Buffer::new(gl, glow::UNIFORM_BUFFER);
        buffer.generate().unwrap();
        buffer.upload(&[0; 4], glow::STREAM_DRAW).unwrap();
        buffer.write_mapped(0, &[7, 7, 7, 7]).unwrap();

        assert_eq!(headless.buffer_contents(buffer.id().unwrap()).unwrap(), vec![7; 4]);
    }

    #[test]
    fn test_vertex_array_state_machine() {
        let headless = Rc::new(HeadlessContext::new());
        let gl: Rc<dyn GraphicsContext> = headless.clone();
        let mut vao = VertexArray::new(gl);
        assert!(matches!(vao.bind(), Err(RenderError::NotAllocated { .. })));

        vao.generate().unwrap();
        assert!(matches!(vao.generate(), Err(RenderError::AlreadyAllocated { .. })));
        vao.bind().unwrap();

        let moved = vao.take();
        assert!(!vao.valid());
        assert_eq!(headless.live_count(ObjectKind::VertexArray), 1);
        drop(moved);
        assert_eq!(headless.live_count(ObjectKind::VertexArray), 0);
    }
}
