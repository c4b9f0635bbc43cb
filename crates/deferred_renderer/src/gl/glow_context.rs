//! [`GraphicsContext`] over a real OpenGL context through `glow`
//!
//! Every call here is FFI into the driver; the wrapper is only sound while
//! the context it was loaded from is current on this thread.

#![allow(unsafe_code)]

use std::ffi::c_void;
use std::ptr;

use glow::HasContext;

use super::context::{GraphicsContext, NativeId, UniformLocation};

/// OpenGL 3.3 core context loaded with `glow`
pub struct GlowContext {
    gl: glow::Context,
}

impl GlowContext {
    /// Load the entry points with a platform `get_proc_address`
    ///
    /// # Safety
    ///
    /// The GL context the loader resolves against must be current on the
    /// calling thread, and must outlive the returned value.
    pub unsafe fn from_loader_function<F>(loader: F) -> Self
    where
        F: FnMut(&str) -> *const c_void,
    {
        let gl = glow::Context::from_loader_function(loader);
        log::info!(
            "OpenGL {} ({})",
            gl.get_parameter_string(glow::VERSION),
            gl.get_parameter_string(glow::RENDERER)
        );
        Self { gl }
    }

    /// Load the entry points from the context `window` made current
    ///
    /// The window must outlive the returned context.
    pub fn from_window(window: &mut crate::platform::Window) -> Self {
        // SAFETY: `Window::new` makes its context current on this thread and
        // the renderer drops every GL user before the window.
        unsafe { Self::from_loader_function(|name| window.get_proc_address(name)) }
    }

    /// Wrap an already loaded `glow` context
    pub const fn from_glow(gl: glow::Context) -> Self {
        Self { gl }
    }
}

const fn location(location: Option<&UniformLocation>) -> Option<glow::NativeUniformLocation> {
    match location {
        Some(UniformLocation(value)) => Some(glow::NativeUniformLocation(*value)),
        None => None,
    }
}

impl GraphicsContext for GlowContext {
    fn create_shader(&self, kind: u32) -> Result<NativeId, String> {
        unsafe { self.gl.create_shader(kind).map(|s| s.0) }
    }

    fn shader_source(&self, shader: NativeId, source: &str) {
        unsafe { self.gl.shader_source(glow::NativeShader(shader), source) }
    }

    fn compile_shader(&self, shader: NativeId) {
        unsafe { self.gl.compile_shader(glow::NativeShader(shader)) }
    }

    fn shader_compile_status(&self, shader: NativeId) -> bool {
        unsafe { self.gl.get_shader_compile_status(glow::NativeShader(shader)) }
    }

    fn shader_info_log(&self, shader: NativeId) -> String {
        unsafe { self.gl.get_shader_info_log(glow::NativeShader(shader)) }
    }

    fn delete_shader(&self, shader: NativeId) {
        unsafe { self.gl.delete_shader(glow::NativeShader(shader)) }
    }

    fn create_program(&self) -> Result<NativeId, String> {
        unsafe { self.gl.create_program().map(|p| p.0) }
    }

    fn attach_shader(&self, program: NativeId, shader: NativeId) {
        unsafe {
            self.gl
                .attach_shader(glow::NativeProgram(program), glow::NativeShader(shader));
        }
    }

    fn detach_shader(&self, program: NativeId, shader: NativeId) {
        unsafe {
            self.gl
                .detach_shader(glow::NativeProgram(program), glow::NativeShader(shader));
        }
    }

    fn link_program(&self, program: NativeId) {
        unsafe { self.gl.link_program(glow::NativeProgram(program)) }
    }

    fn program_link_status(&self, program: NativeId) -> bool {
        unsafe { self.gl.get_program_link_status(glow::NativeProgram(program)) }
    }

    fn program_info_log(&self, program: NativeId) -> String {
        unsafe { self.gl.get_program_info_log(glow::NativeProgram(program)) }
    }

    fn delete_program(&self, program: NativeId) {
        unsafe { self.gl.delete_program(glow::NativeProgram(program)) }
    }

    fn use_program(&self, program: Option<NativeId>) {
        unsafe { self.gl.use_program(program.map(glow::NativeProgram)) }
    }

    fn uniform_location(&self, program: NativeId, name: &str) -> Option<UniformLocation> {
        unsafe {
            self.gl
                .get_uniform_location(glow::NativeProgram(program), name)
                .map(|l| UniformLocation(l.0))
        }
    }

    fn uniform_block_index(&self, program: NativeId, name: &str) -> Option<u32> {
        unsafe { self.gl.get_uniform_block_index(glow::NativeProgram(program), name) }
    }

    fn uniform_block_binding(&self, program: NativeId, index: u32, binding: u32) {
        unsafe {
            self.gl
                .uniform_block_binding(glow::NativeProgram(program), index, binding);
        }
    }

    fn uniform_1_i32(&self, loc: Option<&UniformLocation>, value: i32) {
        unsafe { self.gl.uniform_1_i32(location(loc).as_ref(), value) }
    }

    fn uniform_1_f32(&self, loc: Option<&UniformLocation>, value: f32) {
        unsafe { self.gl.uniform_1_f32(location(loc).as_ref(), value) }
    }

    fn uniform_3_f32(&self, loc: Option<&UniformLocation>, x: f32, y: f32, z: f32) {
        unsafe { self.gl.uniform_3_f32(location(loc).as_ref(), x, y, z) }
    }

    fn uniform_4_i32(&self, loc: Option<&UniformLocation>, x: i32, y: i32, z: i32, w: i32) {
        unsafe { self.gl.uniform_4_i32(location(loc).as_ref(), x, y, z, w) }
    }

    fn uniform_4_f32(&self, loc: Option<&UniformLocation>, x: f32, y: f32, z: f32, w: f32) {
        unsafe { self.gl.uniform_4_f32(location(loc).as_ref(), x, y, z, w) }
    }

    fn uniform_matrix_3(&self, loc: Option<&UniformLocation>, value: &[f32]) {
        unsafe {
            self.gl
                .uniform_matrix_3_f32_slice(location(loc).as_ref(), false, value);
        }
    }

    fn uniform_matrix_4(&self, loc: Option<&UniformLocation>, value: &[f32]) {
        unsafe {
            self.gl
                .uniform_matrix_4_f32_slice(location(loc).as_ref(), false, value);
        }
    }

    fn create_texture(&self) -> Result<NativeId, String> {
        unsafe { self.gl.create_texture().map(|t| t.0) }
    }

    fn delete_texture(&self, texture: NativeId) {
        unsafe { self.gl.delete_texture(glow::NativeTexture(texture)) }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { self.gl.active_texture(unit) }
    }

    fn bind_texture(&self, target: u32, texture: Option<NativeId>) {
        unsafe { self.gl.bind_texture(target, texture.map(glow::NativeTexture)) }
    }

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
    ) {
        unsafe {
            self.gl
                .tex_image_2d(target, level, internal_format, width, height, 0, format, ty, pixels);
        }
    }

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
    ) {
        unsafe {
            self.gl.tex_image_3d(
                target,
                level,
                internal_format,
                width,
                height,
                depth,
                0,
                format,
                ty,
                pixels,
            );
        }
    }

    fn tex_sub_image_3d(
        &self,
        target: u32,
        level: i32,
        offset: [i32; 3],
        size: [i32; 3],
        format: u32,
        ty: u32,
        pixels: &[u8],
    ) {
        unsafe {
            self.gl.tex_sub_image_3d(
                target,
                level,
                offset[0],
                offset[1],
                offset[2],
                size[0],
                size[1],
                size[2],
                format,
                ty,
                glow::PixelUnpackData::Slice(pixels),
            );
        }
    }

    fn tex_parameter_i32(&self, target: u32, parameter: u32, value: i32) {
        unsafe { self.gl.tex_parameter_i32(target, parameter, value) }
    }

    fn tex_parameter_f32_slice(&self, target: u32, parameter: u32, values: &[f32]) {
        unsafe { self.gl.tex_parameter_f32_slice(target, parameter, values) }
    }

    fn generate_mipmap(&self, target: u32) {
        unsafe { self.gl.generate_mipmap(target) }
    }

    fn create_framebuffer(&self) -> Result<NativeId, String> {
        unsafe { self.gl.create_framebuffer().map(|f| f.0) }
    }

    fn delete_framebuffer(&self, framebuffer: NativeId) {
        unsafe { self.gl.delete_framebuffer(glow::NativeFramebuffer(framebuffer)) }
    }

    fn bind_framebuffer(&self, target: u32, framebuffer: Option<NativeId>) {
        unsafe {
            self.gl
                .bind_framebuffer(target, framebuffer.map(glow::NativeFramebuffer));
        }
    }

    fn framebuffer_texture_2d(
        &self,
        target: u32,
        attachment: u32,
        texture_target: u32,
        texture: Option<NativeId>,
        level: i32,
    ) {
        unsafe {
            self.gl.framebuffer_texture_2d(
                target,
                attachment,
                texture_target,
                texture.map(glow::NativeTexture),
                level,
            );
        }
    }

    fn framebuffer_renderbuffer(&self, target: u32, attachment: u32, renderbuffer: Option<NativeId>) {
        unsafe {
            self.gl.framebuffer_renderbuffer(
                target,
                attachment,
                glow::RENDERBUFFER,
                renderbuffer.map(glow::NativeRenderbuffer),
            );
        }
    }

    fn check_framebuffer_status(&self, target: u32) -> u32 {
        unsafe { self.gl.check_framebuffer_status(target) }
    }

    fn draw_buffers(&self, buffers: &[u32]) {
        unsafe { self.gl.draw_buffers(buffers) }
    }

    fn draw_buffer(&self, buffer: u32) {
        unsafe { self.gl.draw_buffer(buffer) }
    }

    fn read_buffer(&self, buffer: u32) {
        unsafe { self.gl.read_buffer(buffer) }
    }

    fn blit_framebuffer(&self, source: [i32; 4], destination: [i32; 4], mask: u32, filter: u32) {
        unsafe {
            self.gl.blit_framebuffer(
                source[0],
                source[1],
                source[2],
                source[3],
                destination[0],
                destination[1],
                destination[2],
                destination[3],
                mask,
                filter,
            );
        }
    }

    fn create_renderbuffer(&self) -> Result<NativeId, String> {
        unsafe { self.gl.create_renderbuffer().map(|r| r.0) }
    }

    fn delete_renderbuffer(&self, renderbuffer: NativeId) {
        unsafe { self.gl.delete_renderbuffer(glow::NativeRenderbuffer(renderbuffer)) }
    }

    fn bind_renderbuffer(&self, renderbuffer: Option<NativeId>) {
        unsafe {
            self.gl
                .bind_renderbuffer(glow::RENDERBUFFER, renderbuffer.map(glow::NativeRenderbuffer));
        }
    }

    fn renderbuffer_storage(&self, internal_format: u32, width: i32, height: i32) {
        unsafe {
            self.gl
                .renderbuffer_storage(glow::RENDERBUFFER, internal_format, width, height);
        }
    }

    fn create_buffer(&self) -> Result<NativeId, String> {
        unsafe { self.gl.create_buffer().map(|b| b.0) }
    }

    fn delete_buffer(&self, buffer: NativeId) {
        unsafe { self.gl.delete_buffer(glow::NativeBuffer(buffer)) }
    }

    fn bind_buffer(&self, target: u32, buffer: Option<NativeId>) {
        unsafe { self.gl.bind_buffer(target, buffer.map(glow::NativeBuffer)) }
    }

    fn bind_buffer_base(&self, target: u32, index: u32, buffer: Option<NativeId>) {
        unsafe {
            self.gl
                .bind_buffer_base(target, index, buffer.map(glow::NativeBuffer));
        }
    }

    fn buffer_data_size(&self, target: u32, size: i32, usage: u32) {
        unsafe { self.gl.buffer_data_size(target, size, usage) }
    }

    fn buffer_data(&self, target: u32, data: &[u8], usage: u32) {
        unsafe { self.gl.buffer_data_u8_slice(target, data, usage) }
    }

    fn buffer_sub_data(&self, target: u32, offset: i32, data: &[u8]) {
        unsafe { self.gl.buffer_sub_data_u8_slice(target, offset, data) }
    }

    fn write_mapped(&self, target: u32, offset: i32, data: &[u8]) -> bool {
        unsafe {
            let mapped = self.gl.map_buffer_range(
                target,
                offset,
                data.len() as i32,
                glow::MAP_WRITE_BIT | glow::MAP_INVALIDATE_RANGE_BIT,
            );
            if mapped.is_null() {
                return false;
            }
            // SAFETY: the driver mapped exactly data.len() writable bytes
            ptr::copy_nonoverlapping(data.as_ptr(), mapped, data.len());
            self.gl.unmap_buffer(target);
        }
        true
    }

    fn create_vertex_array(&self) -> Result<NativeId, String> {
        unsafe { self.gl.create_vertex_array().map(|v| v.0) }
    }

    fn delete_vertex_array(&self, vertex_array: NativeId) {
        unsafe { self.gl.delete_vertex_array(glow::NativeVertexArray(vertex_array)) }
    }

    fn bind_vertex_array(&self, vertex_array: Option<NativeId>) {
        unsafe {
            self.gl
                .bind_vertex_array(vertex_array.map(glow::NativeVertexArray));
        }
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, ty: u32, normalized: bool, stride: i32, offset: i32) {
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(index, size, ty, normalized, stride, offset);
        }
    }

    fn vertex_attrib_pointer_i32(&self, index: u32, size: i32, ty: u32, stride: i32, offset: i32) {
        unsafe { self.gl.vertex_attrib_pointer_i32(index, size, ty, stride, offset) }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32) {
        unsafe { self.gl.clear_color(red, green, blue, alpha) }
    }

    fn clear(&self, mask: u32) {
        unsafe { self.gl.clear(mask) }
    }

    fn enable(&self, capability: u32) {
        unsafe { self.gl.enable(capability) }
    }

    fn disable(&self, capability: u32) {
        unsafe { self.gl.disable(capability) }
    }

    fn depth_func(&self, func: u32) {
        unsafe { self.gl.depth_func(func) }
    }

    fn polygon_mode(&self, face: u32, mode: u32) {
        unsafe { self.gl.polygon_mode(face, mode) }
    }

    fn draw_elements(&self, mode: u32, count: i32, ty: u32, offset: i32) {
        unsafe { self.gl.draw_elements(mode, count, ty, offset) }
    }

    fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(mode, first, count) }
    }

    fn get_error(&self) -> u32 {
        unsafe { self.gl.get_error() }
    }
}
