//! Immediate-mode debug lines
//!
//! Lines are drawn straight to the default framebuffer with their own
//! program. They bypass the G-buffer, so they are neither lit nor shadowed.

use std::fmt;
use std::rc::Rc;

use crate::foundation::math::{Mat4, Vec3};
use crate::gl::{Buffer, GraphicsContext, ShaderProgram, VertexArray};
use crate::render::RenderResult;

/// One colored segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    /// Start point
    pub from: Vec3,
    /// End point
    pub to: Vec3,
    /// Linear RGB color of the whole segment
    pub color: Vec3,
}

impl Line {
    /// Segment from `from` to `to`
    pub const fn new(from: Vec3, to: Vec3, color: Vec3) -> Self {
        Self { from, to, color }
    }
}

/// Position then color, per vertex
const FLOATS_PER_VERTEX: usize = 6;
const STRIDE: i32 = (FLOATS_PER_VERTEX * std::mem::size_of::<f32>()) as i32;

fn vertices(lines: &[Line]) -> Vec<f32> {
    let mut data = Vec::with_capacity(lines.len() * 2 * FLOATS_PER_VERTEX);
    for line in lines {
        for point in [&line.from, &line.to] {
            data.extend_from_slice(point.as_slice());
            data.extend_from_slice(line.color.as_slice());
        }
    }
    data
}

/// Dynamic vertex buffer that grows to the largest batch seen
pub struct LineRenderer {
    gl: Rc<dyn GraphicsContext>,
    vertex_array: VertexArray,
    buffer: Buffer,
}

impl LineRenderer {
    /// Unallocated renderer; GPU objects are created by the first draw
    pub fn new(gl: Rc<dyn GraphicsContext>) -> Self {
        Self {
            vertex_array: VertexArray::new(Rc::clone(&gl)),
            buffer: Buffer::new(Rc::clone(&gl), glow::ARRAY_BUFFER),
            gl,
        }
    }

    fn allocate(&mut self) -> RenderResult<()> {
        self.vertex_array.generate()?;
        self.buffer.generate()?;
        self.vertex_array.bind()?;
        self.buffer.bind()?;
        self.gl
            .vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, STRIDE, 0);
        self.gl.enable_vertex_attrib_array(0);
        self.gl.vertex_attrib_pointer_f32(
            1,
            3,
            glow::FLOAT,
            false,
            STRIDE,
            (3 * std::mem::size_of::<f32>()) as i32,
        );
        self.gl.enable_vertex_attrib_array(1);
        VertexArray::unbind(self.gl.as_ref());
        Ok(())
    }

    /// Upload `lines` and draw them as a line list with `program`
    pub fn draw(&mut self, program: &ShaderProgram, projection: &Mat4, view: &Mat4, lines: &[Line]) -> RenderResult<()> {
        if lines.is_empty() {
            return Ok(());
        }
        if !self.vertex_array.valid() {
            self.allocate()?;
        }

        let data = vertices(lines);
        let bytes: &[u8] = bytemuck::cast_slice(&data);

        self.vertex_array.bind()?;
        if bytes.len() > self.buffer.size() {
            log::trace!("Growing line buffer to {} bytes", bytes.len());
            self.buffer.upload(bytes, glow::DYNAMIC_DRAW)?;
        } else {
            self.buffer.write(0, bytes)?;
        }

        program.use_program()?;
        program.set_mat4("projectionMatrix", projection);
        program.set_mat4("viewMatrix", view);

        self.gl.draw_arrays(glow::LINES, 0, (lines.len() * 2) as i32);
        VertexArray::unbind(self.gl.as_ref());
        Ok(())
    }

    /// Current buffer capacity in bytes
    pub const fn capacity(&self) -> usize {
        self.buffer.size()
    }
}

impl fmt::Debug for LineRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineRenderer")
            .field("vertex_array", &self.vertex_array.id())
            .field("capacity", &self.buffer.size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{HeadlessContext, ObjectKind, Shader, ShaderStage};

    fn program(gl: &Rc<dyn GraphicsContext>) -> ShaderProgram {
        let vertex = Shader::from_source(Rc::clone(gl), ShaderStage::Vertex, "void main() {}").unwrap();
        let fragment = Shader::from_source(Rc::clone(gl), ShaderStage::Fragment, "void main() {}").unwrap();
        ShaderProgram::from_shaders(Rc::clone(gl), &[&vertex, &fragment]).unwrap()
    }

    fn line(x: f32) -> Line {
        Line::new(Vec3::zeros(), Vec3::new(x, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0))
    }

    #[test]
    fn test_vertices_interleave_position_and_color() {
        let data = vertices(&[line(2.0)]);
        assert_eq!(data, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_buffer_grows_only_when_needed() {
        let headless = Rc::new(HeadlessContext::new());
        let gl: Rc<dyn GraphicsContext> = headless.clone();
        let program = program(&gl);
        let mut lines = LineRenderer::new(Rc::clone(&gl));
        let identity = Mat4::identity();

        lines.draw(&program, &identity, &identity, &[line(1.0), line(2.0)]).unwrap();
        let grown = lines.capacity();
        assert_eq!(grown, 2 * 2 * STRIDE as usize);

        lines.draw(&program, &identity, &identity, &[line(3.0)]).unwrap();
        assert_eq!(lines.capacity(), grown);
        assert_eq!(headless.live_count(ObjectKind::Buffer), 1);
        assert_eq!(headless.live_count(ObjectKind::VertexArray), 1);
        assert_eq!(headless.draw_calls(), 2);
        assert_eq!(headless.errors_raised(), 0);
    }

    #[test]
    fn test_empty_batch_allocates_nothing() {
        let headless = Rc::new(HeadlessContext::new());
        let gl: Rc<dyn GraphicsContext> = headless.clone();
        let program = program(&gl);
        let before = headless.live_objects();

        let mut lines = LineRenderer::new(Rc::clone(&gl));
        lines.draw(&program, &Mat4::identity(), &Mat4::identity(), &[]).unwrap();
        assert_eq!(headless.live_objects(), before);
        assert_eq!(headless.draw_calls(), 0);
    }
}
