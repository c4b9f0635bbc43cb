//! Shader objects

use std::fmt;
use std::rc::Rc;

use super::{require, require_unallocated, GraphicsContext, NativeId};
use crate::render::{RenderError, RenderResult};

/// Programmable pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader
    Vertex,
    /// Fragment shader
    Fragment,
    /// Tessellation control shader
    TessControl,
    /// Tessellation evaluation shader
    TessEval,
}

impl ShaderStage {
    /// GL shader type enum
    pub const fn gl_kind(self) -> u32 {
        match self {
            Self::Vertex => glow::VERTEX_SHADER,
            Self::Fragment => glow::FRAGMENT_SHADER,
            Self::TessControl => glow::TESS_CONTROL_SHADER,
            Self::TessEval => glow::TESS_EVALUATION_SHADER,
        }
    }

    /// Human readable stage name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::TessControl => "tessellation control",
            Self::TessEval => "tessellation evaluation",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A compiled shader stage
pub struct Shader {
    gl: Rc<dyn GraphicsContext>,
    stage: ShaderStage,
    id: Option<NativeId>,
}

impl Shader {
    /// Create an uncompiled shader for `stage`
    pub fn new(gl: Rc<dyn GraphicsContext>, stage: ShaderStage) -> Self {
        Self { gl, stage, id: None }
    }

    /// Create and compile in one step
    pub fn from_source(gl: Rc<dyn GraphicsContext>, stage: ShaderStage, source: &str) -> RenderResult<Self> {
        let mut shader = Self::new(gl, stage);
        shader.compile(source)?;
        Ok(shader)
    }

    /// Compile `source`
    ///
    /// On failure the native shader is deleted before the compiler log is
    /// returned, leaving this object unallocated.
    pub fn compile(&mut self, source: &str) -> RenderResult<()> {
        require_unallocated(self.id, "shader", "compile")?;

        let id = self
            .gl
            .create_shader(self.stage.gl_kind())
            .map_err(|e| RenderError::CreationFailed(format!("Could not create shader: {e}")))?;

        self.gl.shader_source(id, source);
        self.gl.compile_shader(id);

        if !self.gl.shader_compile_status(id) {
            let log = self.gl.shader_info_log(id);
            self.gl.delete_shader(id);
            return Err(RenderError::CompileFailed { stage: self.stage, log });
        }

        log::debug!("Compiled {} shader {}", self.stage, id);
        self.id = Some(id);
        Ok(())
    }

    /// Release the native shader
    pub fn destroy(&mut self) -> RenderResult<()> {
        let id = require(self.id, "shader", "destroy")?;
        self.gl.delete_shader(id);
        self.id = None;
        Ok(())
    }

    /// Move the native shader out, leaving this object unallocated
    #[must_use]
    pub fn take(&mut self) -> Self {
        Self {
            gl: Rc::clone(&self.gl),
            stage: self.stage,
            id: self.id.take(),
        }
    }

    /// Pipeline stage
    pub const fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Native name, if compiled
    pub const fn id(&self) -> Option<NativeId> {
        self.id
    }

    /// True while compiled
    pub const fn valid(&self) -> bool {
        self.id.is_some()
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.gl.delete_shader(id);
        }
    }
}

impl fmt::Debug for Shader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shader")
            .field("stage", &self.stage)
            .field("id", &self.id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{HeadlessContext, ObjectKind};

    const SOURCE: &str = "#version 330 core\nvoid main() {}\n";

    fn context() -> (Rc<HeadlessContext>, Rc<dyn GraphicsContext>) {
        let headless = Rc::new(HeadlessContext::new());
        let gl: Rc<dyn GraphicsContext> = headless.clone();
        (headless, gl)
    }

    #[test]
    fn test_compile_twice_fails() {
        let (_, gl) = context();
        let mut shader = Shader::new(gl, ShaderStage::Vertex);
        shader.compile(SOURCE).unwrap();
        assert!(matches!(
            shader.compile(SOURCE),
            Err(RenderError::AlreadyAllocated { object: "shader", .. })
        ));
    }

    #[test]
    fn test_destroy_before_compile_fails() {
        let (_, gl) = context();
        let mut shader = Shader::new(gl, ShaderStage::Fragment);
        assert!(matches!(shader.destroy(), Err(RenderError::NotAllocated { .. })));
    }

    #[test]
    fn test_failed_compile_releases_shader() {
        let (headless, gl) = context();
        headless.fail_compilation_containing("broken");

        let result = Shader::from_source(gl, ShaderStage::Fragment, "broken");
        match result {
            Err(RenderError::CompileFailed { stage, log }) => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(log.contains("broken"));
            }
            other => panic!("expected compile failure, got {other:?}"),
        }
        assert_eq!(headless.live_count(ObjectKind::Shader), 0);
    }

    #[test]
    fn test_take_transfers_ownership() {
        let (headless, gl) = context();
        let mut source = Shader::from_source(gl, ShaderStage::Vertex, SOURCE).unwrap();
        let id = source.id();

        let moved = source.take();
        assert!(!source.valid());
        assert!(moved.valid());
        assert_eq!(moved.id(), id);

        drop(source);
        assert_eq!(headless.live_count(ObjectKind::Shader), 1);
        drop(moved);
        assert_eq!(headless.live_count(ObjectKind::Shader), 0);
    }
}
