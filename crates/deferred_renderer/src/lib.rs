//! # Deferred Renderer
//!
//! A deferred OpenGL 3.3 renderer with handle-indexed resource pools and a
//! per-scene graph.
//!
//! ## Features
//!
//! - **Resource pools**: shaders, programs, meshes, textures, PBR materials,
//!   terrain, skyboxes and bone buffers behind generational handles
//! - **Scenes**: renderables, point lights, terrain and skybox instances that
//!   only reference pool handles
//! - **Pipeline**: shadow, geometry, lighting, depth copy and skybox passes,
//!   plus immediate-mode debug lines
//! - **Headless**: a recording graphics context and surface for running the
//!   whole pipeline without a GPU
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deferred_renderer::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut renderer = Renderer::new(&Properties::new())?;
//!
//!     let scene = renderer.create_render_scene();
//!     let mesh = renderer.create_static_mesh(&MeshData::cube())?;
//!     let texture = renderer.create_texture2d(&Image::solid(1, 1, [200, 80, 40, 255]))?;
//!     renderer.create_renderable_with_texture(scene, mesh, texture, GraphicsData::default(), None)?;
//!     renderer.create_point_light(scene, Vec3::new(0.0, 3.0, 3.0))?;
//!     renderer.create_camera(Vec3::new(0.0, 1.0, 5.0), Vec3::zeros())?;
//!
//!     renderer.begin_render()?;
//!     renderer.render(scene)?;
//!     renderer.end_render()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod events;
pub mod foundation;
pub mod gl;
pub mod input;
pub mod platform;
pub mod render;

pub use render::{RenderError, RenderResult, Renderer};

/// Common imports for renderer users
pub mod prelude {
    pub use crate::{
        config::{Config, Properties, RendererSettings, WindowSettings},
        events::{ButtonState, Event, EventListener, ListenerId, WindowEventType},
        foundation::{
            handle::{Handle, Registry},
            math::{GraphicsData, IVec4, Mat4, Quat, TransformSpace, Vec3, Vec4},
        },
        input::{KeyCode, KeyMod, MouseButton},
        platform::Surface,
        render::{
            Camera, Image, ImageFormat, Line, MeshData, PbrMaterialData, RenderError, RenderResult, Renderer,
            Shading, Skeleton, SkyboxFaces,
        },
    };
}
