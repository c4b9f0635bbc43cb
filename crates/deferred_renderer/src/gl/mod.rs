//! OpenGL object layer
//!
//! Move-only wrappers over native GL objects. Every wrapper starts
//! unallocated, allocates exactly once, releases its native name on drop and
//! hands ownership over with `take()`. Misuse (allocating twice, binding an
//! unallocated object) is reported as a [`RenderError`], never ignored.

pub mod buffer;
pub mod context;
pub mod framebuffer;
pub mod glow_context;
pub mod headless;
pub mod program;
pub mod shader;
pub mod texture;

pub use buffer::{Buffer, VertexArray};
pub use context::{check_error, error_name, GraphicsContext, NativeId, UniformLocation};
pub use framebuffer::{FrameBuffer, RenderBuffer};
pub use glow_context::GlowContext;
pub use headless::{HeadlessContext, ObjectKind, UniformValue};
pub use program::ShaderProgram;
pub use shader::{Shader, ShaderStage};
pub use texture::{CubeFaces, Texture, TextureFormat, TextureKind};

use crate::render::{RenderError, RenderResult};

/// Fail unless the object holds a native name
fn require(id: Option<NativeId>, object: &'static str, action: &'static str) -> RenderResult<NativeId> {
    id.ok_or(RenderError::NotAllocated { object, action })
}

/// Fail if the object already holds a native name
fn require_unallocated(id: Option<NativeId>, object: &'static str, action: &'static str) -> RenderResult<()> {
    match id {
        Some(_) => Err(RenderError::AlreadyAllocated { object, action }),
        None => Ok(()),
    }
}
