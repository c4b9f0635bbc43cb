//! Deferred pass pipeline
//!
//! [`PipelineState`] owns everything the passes share: the built-in
//! programs, the G-buffer and shadow map, the lazily built full-screen quad,
//! the debug line buffer and the per-frame matrices. One `render` call runs
//! the fixed sequence shadow → geometry → lighting → depth copy → skybox.
//!
//! Frame bracketing is a two-state machine:
//!
//! ```text
//! Idle --begin--> Rendering --end--> Idle
//!                 Rendering --render / lines--> Rendering
//! ```

pub mod gbuffer;
mod passes;
pub mod shadow;

pub use gbuffer::GBuffer;
pub use shadow::{light_position, light_space_matrix, ShadowMap, LIGHT_DIRECTION};

use std::fmt;
use std::rc::Rc;

use crate::config::RendererSettings;
use crate::foundation::handle::Registry;
use crate::foundation::math::{self, Mat4};
use crate::gl::{check_error, GraphicsContext, Shader, ShaderProgram, ShaderStage, Texture};
use crate::render::camera::Camera;
use crate::render::lines::{Line, LineRenderer};
use crate::render::resources::{Bones, Material, Mesh, Skybox, Terrain};
use crate::render::scene::RenderScene;
use crate::render::shader_source::ShaderSource;
use crate::render::{RenderError, RenderResult};

use passes::FullScreenQuad;

/// Vertical field of view of the scene projection, in degrees
pub const FIELD_OF_VIEW: f32 = 60.0;
/// Near clip distance
pub const NEAR_PLANE: f32 = 0.1;
/// Far clip distance
pub const FAR_PLANE: f32 = 500.0;
/// Point lights uploaded to the lighting pass per frame
pub const MAX_POINT_LIGHTS: usize = 32;

/// Frame bracketing state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameState {
    /// Between frames
    #[default]
    Idle,
    /// After `begin_render`, before `end_render`
    Rendering,
}

impl FrameState {
    const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Rendering => "rendering",
        }
    }
}

/// Built-in programs, one per pass
struct Programs {
    shadow: ShaderProgram,
    geometry: ShaderProgram,
    terrain: ShaderProgram,
    lighting: ShaderProgram,
    skybox: ShaderProgram,
    line: ShaderProgram,
}

fn build_program(gl: &Rc<dyn GraphicsContext>, source: &dyn ShaderSource, name: &str) -> RenderResult<ShaderProgram> {
    let vertex = Shader::from_source(
        Rc::clone(gl),
        ShaderStage::Vertex,
        &source.load(&format!("{name}.vert"))?,
    )?;
    let fragment = Shader::from_source(
        Rc::clone(gl),
        ShaderStage::Fragment,
        &source.load(&format!("{name}.frag"))?,
    )?;
    let program = ShaderProgram::from_shaders(Rc::clone(gl), &[&vertex, &fragment])?;
    log::debug!("Built {name} program");
    Ok(program)
}

impl Programs {
    fn load(gl: &Rc<dyn GraphicsContext>, source: &dyn ShaderSource) -> RenderResult<Self> {
        Ok(Self {
            shadow: build_program(gl, source, "shadow_mapping")?,
            geometry: build_program(gl, source, "deferred_lighting_geometry_pass")?,
            terrain: build_program(gl, source, "deferred_lighting_terrain_geometry_pass")?,
            lighting: build_program(gl, source, "lighting")?,
            skybox: build_program(gl, source, "skybox")?,
            line: build_program(gl, source, "line")?,
        })
    }
}

/// Read-only view of the renderer pools a frame draws from
pub(crate) struct FrameResources<'a> {
    pub meshes: &'a Registry<Mesh>,
    pub textures: &'a Registry<Texture>,
    pub materials: &'a Registry<Material>,
    pub terrains: &'a Registry<Terrain>,
    pub skyboxes: &'a Registry<Skybox>,
    pub bones: &'a Registry<Bones>,
    pub programs: &'a Registry<ShaderProgram>,
}

/// Everything the passes share across frames
pub struct PipelineState {
    gl: Rc<dyn GraphicsContext>,
    programs: Programs,
    gbuffer: Option<GBuffer>,
    shadow_map: Option<ShadowMap>,
    quad: Option<FullScreenQuad>,
    lines: LineRenderer,
    frame: FrameState,
    viewport: (u32, u32),
    projection: Mat4,
    view: Mat4,
    model: Mat4,
    shadow_map_size: u32,
    check_errors_per_draw: bool,
}

impl PipelineState {
    /// Build the pass programs from `source`
    ///
    /// Render targets are allocated by the first [`set_viewport`](Self::set_viewport).
    pub fn new(gl: Rc<dyn GraphicsContext>, source: &dyn ShaderSource, settings: &RendererSettings) -> RenderResult<Self> {
        let programs = Programs::load(&gl, source)?;
        log::info!(
            "Pipeline ready (shadow map {0}x{0})",
            settings.shadow_map_size
        );
        Ok(Self {
            lines: LineRenderer::new(Rc::clone(&gl)),
            gl,
            programs,
            gbuffer: None,
            shadow_map: None,
            quad: None,
            frame: FrameState::Idle,
            viewport: (0, 0),
            projection: Mat4::identity(),
            view: Mat4::identity(),
            model: Mat4::identity(),
            shadow_map_size: settings.shadow_map_size,
            check_errors_per_draw: settings.check_errors_per_draw,
        })
    }

    /// Resize the viewport, recompute the projection and reallocate the
    /// G-buffer and shadow map
    pub fn set_viewport(&mut self, width: u32, height: u32) -> RenderResult<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidInput(format!(
                "viewport must be non-zero, got {width}x{height}"
            )));
        }

        self.projection = math::perspective(FIELD_OF_VIEW, width as f32 / height as f32, NEAR_PLANE, FAR_PLANE);
        self.viewport = (width, height);
        self.gl.viewport(0, 0, width as i32, height as i32);

        // Old targets go first so their names are free before reallocation
        self.gbuffer = None;
        self.shadow_map = None;
        self.gbuffer = Some(GBuffer::new(&self.gl, width, height)?);
        self.shadow_map = Some(ShadowMap::new(&self.gl, self.shadow_map_size)?);

        log::info!("Viewport set to {width}x{height}");
        check_error(self.gl.as_ref())
    }

    /// Current viewport size
    pub const fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Scene projection
    pub const fn projection_matrix(&self) -> &Mat4 {
        &self.projection
    }

    /// Camera view, as of the last `begin_frame`
    pub const fn view_matrix(&self) -> &Mat4 {
        &self.view
    }

    /// Base model matrix every transform composes onto
    pub const fn model_matrix(&self) -> &Mat4 {
        &self.model
    }

    /// Frame bracketing state
    pub const fn frame_state(&self) -> FrameState {
        self.frame
    }

    /// G-buffer, once a viewport is set
    pub const fn gbuffer(&self) -> Option<&GBuffer> {
        self.gbuffer.as_ref()
    }

    /// Shadow map, once a viewport is set
    pub const fn shadow_map(&self) -> Option<&ShadowMap> {
        self.shadow_map.as_ref()
    }

    fn expect_state(&self, expected: FrameState, operation: &'static str) -> RenderResult<()> {
        if self.frame == expected {
            Ok(())
        } else {
            Err(RenderError::InvalidFrameState {
                operation,
                state: self.frame.name(),
            })
        }
    }

    /// Start a frame: reset fixed-function state, take the camera view and
    /// clear the default framebuffer
    pub fn begin_frame(&mut self, camera: &Camera) -> RenderResult<()> {
        self.expect_state(FrameState::Idle, "begin render")?;

        self.gl.polygon_mode(glow::FRONT_AND_BACK, glow::FILL);
        self.gl.enable(glow::DEPTH_TEST);
        self.view = camera.view_matrix();

        self.gl.clear_color(0.0, 0.0, 0.0, 0.0);
        self.gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);

        self.frame = FrameState::Rendering;
        log::trace!("Frame started");
        Ok(())
    }

    /// Run the pass sequence for `scene`
    pub(crate) fn render_scene(
        &mut self,
        scene: &RenderScene,
        resources: &FrameResources<'_>,
        camera: &Camera,
    ) -> RenderResult<()> {
        self.expect_state(FrameState::Rendering, "render")?;
        if self.gbuffer.is_none() || self.shadow_map.is_none() {
            return Err(RenderError::NotAllocated {
                object: "render targets",
                action: "render into",
            });
        }

        let light_space = light_space_matrix(&camera.position);
        self.shadow_pass(scene, resources, &light_space)?;
        self.geometry_pass(scene, resources)?;
        self.lighting_pass(scene, &camera.position, &light_space)?;
        self.copy_depth()?;
        self.skybox_pass(scene, resources)
    }

    /// Draw debug lines straight to the default framebuffer
    pub fn draw_lines(&mut self, lines: &[Line]) -> RenderResult<()> {
        self.expect_state(FrameState::Rendering, "render lines")?;
        self.lines
            .draw(&self.programs.line, &self.projection, &self.view, lines)?;
        check_error(self.gl.as_ref())
    }

    /// Close the frame
    pub fn end_frame(&mut self) -> RenderResult<()> {
        self.expect_state(FrameState::Rendering, "end render")?;
        self.frame = FrameState::Idle;
        log::trace!("Frame ended");
        Ok(())
    }

    fn check_draw(&self) -> RenderResult<()> {
        if self.check_errors_per_draw {
            check_error(self.gl.as_ref())
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
impl PipelineState {
    pub(crate) const fn lighting_program(&self) -> &ShaderProgram {
        &self.programs.lighting
    }

    pub(crate) const fn terrain_program(&self) -> &ShaderProgram {
        &self.programs.terrain
    }
}

impl fmt::Debug for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineState")
            .field("frame", &self.frame)
            .field("viewport", &self.viewport)
            .field("gbuffer", &self.gbuffer)
            .field("shadow_map", &self.shadow_map)
            .field("lines", &self.lines)
            .finish_non_exhaustive()
    }
}
