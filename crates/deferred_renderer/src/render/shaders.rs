//! Stage-typed shader pools
//!
//! Each stage gets its own registry so a vertex shader handle can never be
//! passed where a fragment shader is expected.

use std::marker::PhantomData;
use std::rc::Rc;

use crate::foundation::handle::Handle;
use crate::gl::{GraphicsContext, Shader, ShaderProgram, ShaderStage};
use crate::render::RenderResult;

/// Compile-time shader stage tag
pub trait StageKind {
    /// Runtime stage
    const STAGE: ShaderStage;
}

/// Vertex stage tag
#[derive(Debug)]
pub enum Vertex {}

/// Fragment stage tag
#[derive(Debug)]
pub enum Fragment {}

/// Tessellation control stage tag
#[derive(Debug)]
pub enum TessellationControl {}

/// Tessellation evaluation stage tag
#[derive(Debug)]
pub enum TessellationEvaluation {}

impl StageKind for Vertex {
    const STAGE: ShaderStage = ShaderStage::Vertex;
}

impl StageKind for Fragment {
    const STAGE: ShaderStage = ShaderStage::Fragment;
}

impl StageKind for TessellationControl {
    const STAGE: ShaderStage = ShaderStage::TessControl;
}

impl StageKind for TessellationEvaluation {
    const STAGE: ShaderStage = ShaderStage::TessEval;
}

/// A compiled shader known to be of stage `S`
#[derive(Debug)]
pub struct StageShader<S: StageKind> {
    shader: Shader,
    _stage: PhantomData<S>,
}

impl<S: StageKind> StageShader<S> {
    /// Compile `source` as stage `S`
    pub fn compile(gl: &Rc<dyn GraphicsContext>, source: &str) -> RenderResult<Self> {
        Ok(Self {
            shader: Shader::from_source(Rc::clone(gl), S::STAGE, source)?,
            _stage: PhantomData,
        })
    }

    /// Untyped shader object
    pub const fn shader(&self) -> &Shader {
        &self.shader
    }
}

/// Handle to a compiled vertex shader
pub type VertexShaderHandle = Handle<StageShader<Vertex>>;

/// Handle to a compiled fragment shader
pub type FragmentShaderHandle = Handle<StageShader<Fragment>>;

/// Handle to a compiled tessellation control shader
pub type TessellationControlShaderHandle = Handle<StageShader<TessellationControl>>;

/// Handle to a compiled tessellation evaluation shader
pub type TessellationEvaluationShaderHandle = Handle<StageShader<TessellationEvaluation>>;

/// Handle to a linked shader program
pub type ShaderProgramHandle = Handle<ShaderProgram>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::HeadlessContext;
    use crate::render::RenderError;

    #[test]
    fn test_stage_follows_tag() {
        let gl: Rc<dyn GraphicsContext> = Rc::new(HeadlessContext::new());
        let shader = StageShader::<TessellationEvaluation>::compile(&gl, "void main() {}").unwrap();
        assert_eq!(shader.shader().stage(), ShaderStage::TessEval);
    }

    #[test]
    fn test_compile_failure_carries_stage() {
        let headless = Rc::new(HeadlessContext::new());
        headless.fail_compilation_containing("broken");
        let gl: Rc<dyn GraphicsContext> = headless.clone();

        let result = StageShader::<Fragment>::compile(&gl, "broken");
        assert!(matches!(
            result,
            Err(RenderError::CompileFailed { stage: ShaderStage::Fragment, .. })
        ));
    }
}
