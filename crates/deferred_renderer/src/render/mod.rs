//! # Rendering System
//!
//! Deferred renderer built on the native seam in [`crate::gl`].
//!
//! ## Architecture
//!
//! - **Renderer**: facade owning every resource pool, the scene registry, the
//!   camera and the pass pipeline
//! - **Resources**: meshes, textures, materials, terrain, skyboxes and bone
//!   buffers, stored in engine-global [`Registry`](crate::foundation::Registry) pools
//! - **Scene**: per-scene renderables, lights, terrain and skybox instances
//!   that only reference pool handles
//! - **Pipeline**: shadow, geometry, lighting, depth copy and skybox passes
//!   run once per `render` call

pub mod camera;
pub mod lines;
pub mod pipeline;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod shader_source;
pub mod shaders;

mod transform;

pub use camera::{Camera, CameraHandle};
pub use lines::Line;
pub use pipeline::{FrameState, PipelineState};
pub use renderer::{PoolHandle, Renderer, SceneObjectHandle};
pub use resources::{
    BonesHandle, DisplacementMap, HeightMap, Image, ImageFormat, MaterialHandle, MeshData, MeshHandle,
    PbrMaterialData, Skeleton, SkeletonHandle, SkyboxFaces, SkyboxHandle, SplatMap, TerrainHandle, TextureHandle,
};
pub use scene::{
    PointLightHandle, RenderScene, RenderableHandle, SceneHandle, Shading, SkyboxRenderableHandle,
    TerrainRenderableHandle,
};
pub use shader_source::{EmbeddedShaderSource, FileShaderSource, ShaderSource};
pub use shaders::{
    FragmentShaderHandle, ShaderProgramHandle, TessellationControlShaderHandle, TessellationEvaluationShaderHandle,
    VertexShaderHandle,
};

use crate::config::ConfigError;
use crate::gl::ShaderStage;
use crate::platform::WindowError;

/// Renderer errors
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    /// A GPU object was allocated twice
    #[error("Cannot {action} {object} - {object} was already created")]
    AlreadyAllocated {
        /// Object family
        object: &'static str,
        /// Attempted operation
        action: &'static str,
    },

    /// A GPU object was used before allocation or after release
    #[error("Cannot {action} {object} - {object} was not created")]
    NotAllocated {
        /// Object family
        object: &'static str,
        /// Attempted operation
        action: &'static str,
    },

    /// The driver returned no object name
    #[error("Creation failed: {0}")]
    CreationFailed(String),

    /// Shader compilation failed
    #[error("{stage} shader compilation failed: {log}")]
    CompileFailed {
        /// Stage that failed
        stage: ShaderStage,
        /// Compiler info log
        log: String,
    },

    /// Program linking failed
    #[error("Shader program link failed: {log}")]
    LinkFailed {
        /// Linker info log
        log: String,
    },

    /// A handle did not refer to a live registry slot
    #[error("Invalid {kind} handle")]
    InvalidHandle {
        /// Handle family
        kind: &'static str,
    },

    /// A frame bracketing call arrived in the wrong state
    #[error("Cannot {operation} while {state}")]
    InvalidFrameState {
        /// Attempted operation
        operation: &'static str,
        /// Current frame state
        state: &'static str,
    },

    /// Native graphics API error flag
    #[error("OpenGL error {name} ({code:#06x})")]
    Gl {
        /// Raw error code
        code: u32,
        /// Symbolic name
        name: &'static str,
    },

    /// Framebuffer failed its completeness check
    #[error("Framebuffer incomplete (status {0:#06x})")]
    FramebufferIncomplete(u32),

    /// Bone buffer larger than the shader block allows
    #[error("Cannot have more than {max} bones (requested {requested})")]
    TooManyBones {
        /// Requested bone count
        requested: usize,
        /// Maximum supported
        max: usize,
    },

    /// Mesh already carries skeleton vertex data
    #[error("Skeleton already exists")]
    SkeletonExists,

    /// Malformed resource input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Shader source lookup failed
    #[error("Shader with filename '{0}' does not exist")]
    ShaderNotFound(String),

    /// Window or context creation failed
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Configuration failed to load or validate
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for renderer operations
pub type RenderResult<T> = Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RenderError::AlreadyAllocated {
            object: "texture",
            action: "generate",
        };
        assert_eq!(
            err.to_string(),
            "Cannot generate texture - texture was already created"
        );

        let err = RenderError::Gl {
            code: glow::INVALID_OPERATION,
            name: "GL_INVALID_OPERATION",
        };
        assert_eq!(err.to_string(), "OpenGL error GL_INVALID_OPERATION (0x0502)");

        let err = RenderError::CompileFailed {
            stage: ShaderStage::Fragment,
            log: "syntax error".to_string(),
        };
        assert_eq!(err.to_string(), "fragment shader compilation failed: syntax error");
    }
}
