//! Linked shader programs and uniform upload

use std::fmt;
use std::rc::Rc;

use super::{require, require_unallocated, GraphicsContext, NativeId, Shader, UniformLocation};
use crate::foundation::math::{IVec4, Mat3, Mat4, Vec3, Vec4};
use crate::render::{RenderError, RenderResult};

/// A linked program object
pub struct ShaderProgram {
    gl: Rc<dyn GraphicsContext>,
    id: Option<NativeId>,
}

impl ShaderProgram {
    /// Create an unlinked program
    pub fn new(gl: Rc<dyn GraphicsContext>) -> Self {
        Self { gl, id: None }
    }

    /// Create and link in one step
    pub fn from_shaders(gl: Rc<dyn GraphicsContext>, shaders: &[&Shader]) -> RenderResult<Self> {
        let mut program = Self::new(gl);
        program.link(shaders)?;
        Ok(program)
    }

    /// Attach `shaders`, link, then detach them again
    ///
    /// Accepts vertex + fragment, or vertex + tessellation control +
    /// tessellation evaluation + fragment. A failed link deletes the program
    /// before the linker log is returned.
    pub fn link(&mut self, shaders: &[&Shader]) -> RenderResult<()> {
        require_unallocated(self.id, "program", "link")?;

        if shaders.len() != 2 && shaders.len() != 4 {
            return Err(RenderError::InvalidInput(format!(
                "a program links 2 or 4 shader stages, got {}",
                shaders.len()
            )));
        }
        let ids = shaders
            .iter()
            .map(|shader| require(shader.id(), "shader", "attach"))
            .collect::<RenderResult<Vec<_>>>()?;

        let id = self
            .gl
            .create_program()
            .map_err(|e| RenderError::CreationFailed(format!("Could not create program: {e}")))?;

        for shader in &ids {
            self.gl.attach_shader(id, *shader);
        }
        self.gl.link_program(id);
        for shader in &ids {
            self.gl.detach_shader(id, *shader);
        }

        if !self.gl.program_link_status(id) {
            let log = self.gl.program_info_log(id);
            self.gl.delete_program(id);
            return Err(RenderError::LinkFailed { log });
        }

        log::debug!("Linked program {} from {} stages", id, ids.len());
        self.id = Some(id);
        Ok(())
    }

    /// Make this program current
    pub fn use_program(&self) -> RenderResult<()> {
        let id = require(self.id, "program", "use")?;
        self.gl.use_program(Some(id));
        Ok(())
    }

    /// Clear the current program
    pub fn unbind(gl: &dyn GraphicsContext) {
        gl.use_program(None);
    }

    /// Location of `name`, `None` when inactive or unlinked
    pub fn location(&self, name: &str) -> Option<UniformLocation> {
        self.gl.uniform_location(self.id?, name)
    }

    /// Route the uniform block `name` to buffer binding `binding`
    ///
    /// Returns the block index, or `None` if the program has no such block.
    pub fn bind_uniform_block(&self, name: &str, binding: u32) -> Option<u32> {
        let id = self.id?;
        let index = self.gl.uniform_block_index(id, name)?;
        self.gl.uniform_block_binding(id, index, binding);
        Some(index)
    }

    /// Set an `int` or sampler uniform on the current program
    pub fn set_int(&self, name: &str, value: i32) {
        self.gl.uniform_1_i32(self.location(name).as_ref(), value);
    }

    /// Set a `bool` uniform
    pub fn set_bool(&self, name: &str, value: bool) {
        self.set_int(name, i32::from(value));
    }

    /// Set a `float` uniform
    pub fn set_float(&self, name: &str, value: f32) {
        self.gl.uniform_1_f32(self.location(name).as_ref(), value);
    }

    /// Set a `vec3` uniform
    pub fn set_vec3(&self, name: &str, value: &Vec3) {
        self.gl
            .uniform_3_f32(self.location(name).as_ref(), value.x, value.y, value.z);
    }

    /// Set a `vec4` uniform
    pub fn set_vec4(&self, name: &str, value: &Vec4) {
        self.gl
            .uniform_4_f32(self.location(name).as_ref(), value.x, value.y, value.z, value.w);
    }

    /// Set an `ivec4` uniform
    pub fn set_ivec4(&self, name: &str, value: &IVec4) {
        self.gl
            .uniform_4_i32(self.location(name).as_ref(), value.x, value.y, value.z, value.w);
    }

    /// Set a `mat3` uniform
    pub fn set_mat3(&self, name: &str, value: &Mat3) {
        self.gl
            .uniform_matrix_3(self.location(name).as_ref(), value.as_slice());
    }

    /// Set a `mat4` uniform
    pub fn set_mat4(&self, name: &str, value: &Mat4) {
        self.gl
            .uniform_matrix_4(self.location(name).as_ref(), value.as_slice());
    }

    /// Release the native program
    pub fn destroy(&mut self) -> RenderResult<()> {
        let id = require(self.id, "program", "destroy")?;
        self.gl.delete_program(id);
        self.id = None;
        Ok(())
    }

    /// Move the native program out, leaving this object unlinked
    #[must_use]
    pub fn take(&mut self) -> Self {
        Self {
            gl: Rc::clone(&self.gl),
            id: self.id.take(),
        }
    }

    /// Native name, if linked
    pub const fn id(&self) -> Option<NativeId> {
        self.id
    }

    /// True while linked
    pub const fn valid(&self) -> bool {
        self.id.is_some()
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.gl.delete_program(id);
        }
    }
}

impl fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderProgram").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{HeadlessContext, ObjectKind, ShaderStage, UniformValue};

    const SOURCE: &str = "#version 330 core\nvoid main() {}\n";

    fn shaders(gl: &Rc<dyn GraphicsContext>) -> (Shader, Shader) {
        (
            Shader::from_source(Rc::clone(gl), ShaderStage::Vertex, SOURCE).unwrap(),
            Shader::from_source(Rc::clone(gl), ShaderStage::Fragment, SOURCE).unwrap(),
        )
    }

    #[test]
    fn test_use_before_link_fails() {
        let gl: Rc<dyn GraphicsContext> = Rc::new(HeadlessContext::new());
        let program = ShaderProgram::new(gl);
        assert!(matches!(
            program.use_program(),
            Err(RenderError::NotAllocated { object: "program", action: "use" })
        ));
    }

    #[test]
    fn test_link_twice_fails() {
        let gl: Rc<dyn GraphicsContext> = Rc::new(HeadlessContext::new());
        let (vertex, fragment) = shaders(&gl);
        let mut program = ShaderProgram::from_shaders(Rc::clone(&gl), &[&vertex, &fragment]).unwrap();
        assert!(program.valid());
        assert!(matches!(
            program.link(&[&vertex, &fragment]),
            Err(RenderError::AlreadyAllocated { .. })
        ));
    }

    #[test]
    fn test_link_rejects_unallocated_stage() {
        let headless = Rc::new(HeadlessContext::new());
        let gl: Rc<dyn GraphicsContext> = headless.clone();
        let vertex = Shader::from_source(Rc::clone(&gl), ShaderStage::Vertex, SOURCE).unwrap();
        let fragment = Shader::new(Rc::clone(&gl), ShaderStage::Fragment);

        let result = ShaderProgram::from_shaders(gl, &[&vertex, &fragment]);
        assert!(matches!(result, Err(RenderError::NotAllocated { object: "shader", .. })));
        assert_eq!(headless.live_count(ObjectKind::Program), 0);
    }

    #[test]
    fn test_uniforms_are_recorded() {
        let headless = Rc::new(HeadlessContext::new());
        let gl: Rc<dyn GraphicsContext> = headless.clone();
        let (vertex, fragment) = shaders(&gl);
        let program = ShaderProgram::from_shaders(gl, &[&vertex, &fragment]).unwrap();

        program.use_program().unwrap();
        program.set_int("texture_diffuse1", 0);
        program.set_vec3("viewPos", &Vec3::new(1.0, 2.0, 3.0));

        let id = program.id().unwrap();
        assert_eq!(headless.uniform(id, "texture_diffuse1"), Some(UniformValue::Int(0)));
        assert_eq!(
            headless.uniform(id, "viewPos"),
            Some(UniformValue::Vec3([1.0, 2.0, 3.0]))
        );
    }

    #[test]
    fn test_take_then_drop_releases_once() {
        let headless = Rc::new(HeadlessContext::new());
        let gl: Rc<dyn GraphicsContext> = headless.clone();
        let (vertex, fragment) = shaders(&gl);
        let mut program = ShaderProgram::from_shaders(gl, &[&vertex, &fragment]).unwrap();

        let moved = program.take();
        assert!(!program.valid());
        assert!(moved.valid());
        drop(program);
        drop(moved);
        assert_eq!(headless.live_count(ObjectKind::Program), 0);
        assert_eq!(headless.errors_raised(), 0);
    }
}
