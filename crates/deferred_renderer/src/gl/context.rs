//! The native graphics seam
//!
//! [`GraphicsContext`] is the OpenGL 3.3 core subset the renderer issues.
//! Object ids cross the seam as [`NativeId`]; enums are the raw GL values
//! re-exported by `glow`. Implementations: [`super::GlowContext`] drives a
//! real context, [`super::HeadlessContext`] records calls for tests.

use std::num::NonZeroU32;

use crate::render::{RenderError, RenderResult};

/// Native object name; zero is reserved by GL as "no object"
pub type NativeId = NonZeroU32;

/// Uniform location inside a linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// OpenGL entry points used by the renderer
///
/// All calls act on the context current on the calling thread. Creation
/// calls return the driver message when no name could be generated.
pub trait GraphicsContext {
    // Shaders and programs

    /// Generate a shader object of `kind` (`glow::VERTEX_SHADER`, ...)
    fn create_shader(&self, kind: u32) -> Result<NativeId, String>;
    /// Replace the shader's source text
    fn shader_source(&self, shader: NativeId, source: &str);
    /// Compile the attached source
    fn compile_shader(&self, shader: NativeId);
    /// Result of the last compile
    fn shader_compile_status(&self, shader: NativeId) -> bool;
    /// Compiler diagnostics
    fn shader_info_log(&self, shader: NativeId) -> String;
    /// Release a shader object
    fn delete_shader(&self, shader: NativeId);

    /// Generate a program object
    fn create_program(&self) -> Result<NativeId, String>;
    /// Attach a compiled shader
    fn attach_shader(&self, program: NativeId, shader: NativeId);
    /// Detach a shader after linking
    fn detach_shader(&self, program: NativeId, shader: NativeId);
    /// Link attached shaders
    fn link_program(&self, program: NativeId);
    /// Result of the last link
    fn program_link_status(&self, program: NativeId) -> bool;
    /// Linker diagnostics
    fn program_info_log(&self, program: NativeId) -> String;
    /// Release a program object
    fn delete_program(&self, program: NativeId);
    /// Make `program` current, or none
    fn use_program(&self, program: Option<NativeId>);

    /// Location of a named uniform, if active
    fn uniform_location(&self, program: NativeId, name: &str) -> Option<UniformLocation>;
    /// Index of a named uniform block, if active
    fn uniform_block_index(&self, program: NativeId, name: &str) -> Option<u32>;
    /// Route a uniform block to a buffer binding point
    fn uniform_block_binding(&self, program: NativeId, index: u32, binding: u32);
    /// Set an `int` / sampler uniform on the current program
    fn uniform_1_i32(&self, location: Option<&UniformLocation>, value: i32);
    /// Set a `float` uniform
    fn uniform_1_f32(&self, location: Option<&UniformLocation>, value: f32);
    /// Set a `vec3` uniform
    fn uniform_3_f32(&self, location: Option<&UniformLocation>, x: f32, y: f32, z: f32);
    /// Set an `ivec4` uniform
    fn uniform_4_i32(&self, location: Option<&UniformLocation>, x: i32, y: i32, z: i32, w: i32);
    /// Set a `vec4` uniform
    fn uniform_4_f32(&self, location: Option<&UniformLocation>, x: f32, y: f32, z: f32, w: f32);
    /// Set a column-major `mat3` uniform
    fn uniform_matrix_3(&self, location: Option<&UniformLocation>, value: &[f32]);
    /// Set a column-major `mat4` uniform
    fn uniform_matrix_4(&self, location: Option<&UniformLocation>, value: &[f32]);

    // Textures

    /// Generate a texture object
    fn create_texture(&self) -> Result<NativeId, String>;
    /// Release a texture object
    fn delete_texture(&self, texture: NativeId);
    /// Select the texture unit (`glow::TEXTURE0 + n`)
    fn active_texture(&self, unit: u32);
    /// Bind a texture to `target` on the active unit
    fn bind_texture(&self, target: u32, texture: Option<NativeId>);
    /// Allocate (and optionally fill) level `level` of a 2D target
    fn tex_image_2d(
        &self,
        target: u32,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    );
    /// Allocate (and optionally fill) a 3D or array target
    fn tex_image_3d(
        &self,
        target: u32,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        depth: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    );
    /// Upload a sub-region of a 3D or array target
    fn tex_sub_image_3d(
        &self,
        target: u32,
        level: i32,
        offset: [i32; 3],
        size: [i32; 3],
        format: u32,
        ty: u32,
        pixels: &[u8],
    );
    /// Set an integer texture parameter
    fn tex_parameter_i32(&self, target: u32, parameter: u32, value: i32);
    /// Set a vector texture parameter
    fn tex_parameter_f32_slice(&self, target: u32, parameter: u32, values: &[f32]);
    /// Build the mip chain of the bound texture
    fn generate_mipmap(&self, target: u32);

    // Framebuffers

    /// Generate a framebuffer object
    fn create_framebuffer(&self) -> Result<NativeId, String>;
    /// Release a framebuffer object
    fn delete_framebuffer(&self, framebuffer: NativeId);
    /// Bind a framebuffer, `None` selects the default target
    fn bind_framebuffer(&self, target: u32, framebuffer: Option<NativeId>);
    /// Attach a texture level to the bound framebuffer
    fn framebuffer_texture_2d(
        &self,
        target: u32,
        attachment: u32,
        texture_target: u32,
        texture: Option<NativeId>,
        level: i32,
    );
    /// Attach a renderbuffer to the bound framebuffer
    fn framebuffer_renderbuffer(&self, target: u32, attachment: u32, renderbuffer: Option<NativeId>);
    /// Completeness of the framebuffer bound to `target`
    fn check_framebuffer_status(&self, target: u32) -> u32;
    /// Select the color outputs of the bound draw framebuffer
    fn draw_buffers(&self, buffers: &[u32]);
    /// Select a single color output (or `glow::NONE`)
    fn draw_buffer(&self, buffer: u32);
    /// Select the read source (or `glow::NONE`)
    fn read_buffer(&self, buffer: u32);
    /// Copy a rectangle from the read to the draw framebuffer
    fn blit_framebuffer(&self, source: [i32; 4], destination: [i32; 4], mask: u32, filter: u32);

    /// Generate a renderbuffer object
    fn create_renderbuffer(&self) -> Result<NativeId, String>;
    /// Release a renderbuffer object
    fn delete_renderbuffer(&self, renderbuffer: NativeId);
    /// Bind a renderbuffer
    fn bind_renderbuffer(&self, renderbuffer: Option<NativeId>);
    /// Allocate storage for the bound renderbuffer
    fn renderbuffer_storage(&self, internal_format: u32, width: i32, height: i32);

    // Buffers and vertex arrays

    /// Generate a buffer object
    fn create_buffer(&self) -> Result<NativeId, String>;
    /// Release a buffer object
    fn delete_buffer(&self, buffer: NativeId);
    /// Bind a buffer to `target`
    fn bind_buffer(&self, target: u32, buffer: Option<NativeId>);
    /// Bind a buffer to an indexed binding point (uniform blocks)
    fn bind_buffer_base(&self, target: u32, index: u32, buffer: Option<NativeId>);
    /// Allocate uninitialized storage for the bound buffer
    fn buffer_data_size(&self, target: u32, size: i32, usage: u32);
    /// Allocate and fill the bound buffer
    fn buffer_data(&self, target: u32, data: &[u8], usage: u32);
    /// Overwrite part of the bound buffer
    fn buffer_sub_data(&self, target: u32, offset: i32, data: &[u8]);
    /// Map a range of the bound buffer, copy `data` in, unmap
    ///
    /// Returns false when the driver refused the mapping.
    fn write_mapped(&self, target: u32, offset: i32, data: &[u8]) -> bool;

    /// Generate a vertex array object
    fn create_vertex_array(&self) -> Result<NativeId, String>;
    /// Release a vertex array object
    fn delete_vertex_array(&self, vertex_array: NativeId);
    /// Bind a vertex array
    fn bind_vertex_array(&self, vertex_array: Option<NativeId>);
    /// Describe a float attribute sourced from the bound array buffer
    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, ty: u32, normalized: bool, stride: i32, offset: i32);
    /// Describe an integer attribute sourced from the bound array buffer
    fn vertex_attrib_pointer_i32(&self, index: u32, size: i32, ty: u32, stride: i32, offset: i32);
    /// Enable an attribute on the bound vertex array
    fn enable_vertex_attrib_array(&self, index: u32);

    // Fixed-function state and draws

    /// Set the viewport rectangle
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    /// Set the clear color
    fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32);
    /// Clear the buffers selected by `mask`
    fn clear(&self, mask: u32);
    /// Enable a capability
    fn enable(&self, capability: u32);
    /// Disable a capability
    fn disable(&self, capability: u32);
    /// Set the depth comparison
    fn depth_func(&self, func: u32);
    /// Set the rasterization mode
    fn polygon_mode(&self, face: u32, mode: u32);
    /// Indexed draw from the bound vertex array
    fn draw_elements(&self, mode: u32, count: i32, ty: u32, offset: i32);
    /// Non-indexed draw from the bound vertex array
    fn draw_arrays(&self, mode: u32, first: i32, count: i32);

    /// Pop the oldest pending error flag (`glow::NO_ERROR` when none)
    fn get_error(&self) -> u32;
}

/// Symbolic name of a GL error code
pub const fn error_name(code: u32) -> &'static str {
    match code {
        glow::NO_ERROR => "GL_NO_ERROR",
        glow::INVALID_ENUM => "GL_INVALID_ENUM",
        glow::INVALID_VALUE => "GL_INVALID_VALUE",
        glow::INVALID_OPERATION => "GL_INVALID_OPERATION",
        glow::INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION",
        glow::OUT_OF_MEMORY => "GL_OUT_OF_MEMORY",
        glow::STACK_UNDERFLOW => "GL_STACK_UNDERFLOW",
        glow::STACK_OVERFLOW => "GL_STACK_OVERFLOW",
        _ => "GL_UNKNOWN_ERROR",
    }
}

/// Drain the error queue and surface the first pending error
pub fn check_error(gl: &dyn GraphicsContext) -> RenderResult<()> {
    let first = gl.get_error();
    if first == glow::NO_ERROR {
        return Ok(());
    }

    // Later flags are dropped; GL keeps at most one per kind
    for _ in 0..8 {
        if gl.get_error() == glow::NO_ERROR {
            break;
        }
    }

    Err(RenderError::Gl {
        code: first,
        name: error_name(first),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_names() {
        assert_eq!(error_name(glow::INVALID_OPERATION), "GL_INVALID_OPERATION");
        assert_eq!(error_name(glow::INVALID_ENUM), "GL_INVALID_ENUM");
        assert_eq!(error_name(glow::INVALID_VALUE), "GL_INVALID_VALUE");
        assert_eq!(error_name(glow::OUT_OF_MEMORY), "GL_OUT_OF_MEMORY");
        assert_eq!(
            error_name(glow::INVALID_FRAMEBUFFER_OPERATION),
            "GL_INVALID_FRAMEBUFFER_OPERATION"
        );
        assert_eq!(error_name(0xdead), "GL_UNKNOWN_ERROR");
    }
}
