//! Renderer facade
//!
//! [`Renderer`] owns every engine-global pool (shaders, programs, meshes,
//! textures, materials, terrain, skyboxes, skeletons, bone buffers), the
//! scene registry, the camera, the pass pipeline, the event listeners and
//! the window surface. Hosts drive it entirely through handles.
//!
//! Pool handles are checked and released through [`Renderer::valid`] and
//! [`Renderer::destroy`]; records inside a scene go through
//! [`Renderer::valid_in_scene`] and [`Renderer::destroy_in_scene`].

use std::rc::Rc;

use crate::config::{Config, Properties, RendererSettings, WindowSettings};
use crate::events::{EventListener, EventListeners, ListenerId};
use crate::foundation::handle::Registry;
use crate::foundation::math::{GraphicsData, IVec4, Mat4, Vec3, Vec4};
use crate::gl::{GlowContext, GraphicsContext, HeadlessContext, ShaderProgram, Texture};
use crate::platform::{HeadlessSurface, Surface, Window};
use crate::render::camera::{Camera, CameraHandle};
use crate::render::lines::Line;
use crate::render::pipeline::{FrameResources, FrameState, PipelineState};
use crate::render::resources::{
    material, Bones, BonesHandle, DisplacementMap, HeightMap, Image, Material, MaterialHandle, Mesh, MeshData,
    MeshHandle, PbrMaterialData, Skeleton, SkeletonBinding, SkeletonHandle, Skybox, SkyboxFaces, SkyboxHandle,
    SplatMap, Terrain, TerrainHandle, TextureHandle,
};
use crate::render::scene::{
    BoneAttachment, PointLight, PointLightHandle, RenderScene, Renderable, RenderableHandle, SceneHandle, Shading,
    SkyboxRenderable, SkyboxRenderableHandle, TerrainRenderable, TerrainRenderableHandle,
};
use crate::render::shader_source::{EmbeddedShaderSource, FileShaderSource, ShaderSource};
use crate::render::shaders::{
    Fragment, FragmentShaderHandle, ShaderProgramHandle, StageKind, StageShader, TessellationControl,
    TessellationControlShaderHandle, TessellationEvaluation, TessellationEvaluationShaderHandle, Vertex,
    VertexShaderHandle,
};
use crate::render::{RenderError, RenderResult};

pub(super) const fn invalid(kind: &'static str) -> RenderError {
    RenderError::InvalidHandle { kind }
}

/// A handle into one of the renderer's engine-global pools
pub trait PoolHandle: Copy {
    /// True while the handle addresses a live resource
    fn valid_in(self, renderer: &Renderer) -> bool;

    /// Release the resource behind the handle
    fn destroy_in(self, renderer: &mut Renderer) -> RenderResult<()>;
}

/// A handle to a record inside one scene
pub trait SceneObjectHandle: Copy {
    /// True while the handle addresses a live record of `scene`
    fn valid_in(self, scene: &RenderScene) -> bool;

    /// Remove the record from `scene`
    fn destroy_in(self, scene: &mut RenderScene) -> RenderResult<()>;
}

macro_rules! pool_handle {
    ($handle:ty, $pool:ident, $kind:literal) => {
        impl PoolHandle for $handle {
            fn valid_in(self, renderer: &Renderer) -> bool {
                renderer.$pool.valid(self)
            }

            fn destroy_in(self, renderer: &mut Renderer) -> RenderResult<()> {
                renderer.$pool.destroy(self).map_err(|_| invalid($kind))?;
                log::debug!("Destroyed {} {:?}", $kind, self);
                Ok(())
            }
        }
    };
}

pool_handle!(VertexShaderHandle, vertex_shaders, "vertex shader");
pool_handle!(FragmentShaderHandle, fragment_shaders, "fragment shader");
pool_handle!(TessellationControlShaderHandle, tessellation_control_shaders, "tessellation control shader");
pool_handle!(TessellationEvaluationShaderHandle, tessellation_evaluation_shaders, "tessellation evaluation shader");
pool_handle!(ShaderProgramHandle, programs, "shader program");
pool_handle!(MeshHandle, meshes, "mesh");
pool_handle!(TextureHandle, textures, "texture");
pool_handle!(MaterialHandle, materials, "material");
pool_handle!(TerrainHandle, terrains, "terrain");
pool_handle!(SkyboxHandle, skyboxes, "skybox");
pool_handle!(BonesHandle, bones, "bones");
pool_handle!(SceneHandle, scenes, "scene");

impl PoolHandle for SkeletonHandle {
    fn valid_in(self, renderer: &Renderer) -> bool {
        renderer.skeletons.valid(self)
    }

    fn destroy_in(self, renderer: &mut Renderer) -> RenderResult<()> {
        let binding = renderer.skeletons.destroy(self).map_err(|_| invalid("skeleton"))?;
        if let Some(mesh) = renderer.meshes.get_mut(binding.mesh) {
            mesh.remove_skeleton();
        }
        log::debug!("Destroyed skeleton {self:?}");
        Ok(())
    }
}

impl PoolHandle for CameraHandle {
    fn valid_in(self, renderer: &Renderer) -> bool {
        renderer.cameras.valid(self)
    }

    fn destroy_in(self, renderer: &mut Renderer) -> RenderResult<()> {
        renderer.cameras.destroy(self).map_err(|_| invalid("camera"))?;
        if renderer.camera == Some(self) {
            renderer.camera = None;
        }
        Ok(())
    }
}

macro_rules! scene_object_handle {
    ($handle:ty, $registry:ident, $remove:ident) => {
        impl SceneObjectHandle for $handle {
            fn valid_in(self, scene: &RenderScene) -> bool {
                scene.$registry().valid(self)
            }

            fn destroy_in(self, scene: &mut RenderScene) -> RenderResult<()> {
                scene.$remove(self).map(drop)
            }
        }
    };
}

scene_object_handle!(RenderableHandle, renderables, remove_renderable);
scene_object_handle!(PointLightHandle, point_lights, remove_point_light);
scene_object_handle!(TerrainRenderableHandle, terrain, remove_terrain);
scene_object_handle!(SkyboxRenderableHandle, skyboxes, remove_skybox);

fn compile_stage<S: StageKind>(
    gl: &Rc<dyn GraphicsContext>,
    pool: &mut Registry<StageShader<S>>,
    source: &str,
) -> RenderResult<crate::foundation::Handle<StageShader<S>>> {
    let shader = StageShader::<S>::compile(gl, source)?;
    log::debug!("Compiled {} shader", S::STAGE);
    Ok(pool.create(shader))
}

/// The deferred renderer
///
/// Pools are declared before the pipeline, the context and the surface, so
/// every GPU object is released while the context is still alive.
pub struct Renderer {
    pub(super) scenes: Registry<RenderScene>,
    pub(super) cameras: Registry<Camera>,
    pub(super) camera: Option<CameraHandle>,
    skeletons: Registry<SkeletonBinding>,
    pub(super) bones: Registry<Bones>,
    meshes: Registry<Mesh>,
    textures: Registry<Texture>,
    materials: Registry<Material>,
    terrains: Registry<Terrain>,
    skyboxes: Registry<Skybox>,
    programs: Registry<ShaderProgram>,
    vertex_shaders: Registry<StageShader<Vertex>>,
    fragment_shaders: Registry<StageShader<Fragment>>,
    tessellation_control_shaders: Registry<StageShader<TessellationControl>>,
    tessellation_evaluation_shaders: Registry<StageShader<TessellationEvaluation>>,
    pipeline: PipelineState,
    listeners: EventListeners,
    gl: Rc<dyn GraphicsContext>,
    surface: Box<dyn Surface>,
}

impl Renderer {
    /// Open a window from `properties` and render into it
    ///
    /// Shaders are read from `renderer.shader_directory`.
    pub fn new(properties: &Properties) -> RenderResult<Self> {
        let window_settings = WindowSettings::from_properties(properties);
        let settings = RendererSettings::from_properties(properties);
        settings.validate().map_err(RenderError::InvalidInput)?;

        let mut window = Window::new(&window_settings)?;
        let gl: Rc<dyn GraphicsContext> = Rc::new(GlowContext::from_window(&mut window));
        let source = FileShaderSource::new(&settings.shader_directory);
        Self::from_parts(gl, Box::new(window), &source, &settings)
    }

    /// [`Renderer::new`] with properties read from a `.toml` or `.ron` file
    pub fn from_config_file(path: &str) -> RenderResult<Self> {
        let properties = Properties::load_from_file(path)?;
        Self::new(&properties)
    }

    /// Renderer over a recording context and a headless surface, with the
    /// embedded shaders
    pub fn headless(width: u32, height: u32) -> RenderResult<Self> {
        let gl: Rc<dyn GraphicsContext> = Rc::new(HeadlessContext::new());
        Self::from_parts(
            gl,
            Box::new(HeadlessSurface::new(width, height)),
            &EmbeddedShaderSource::new(),
            &RendererSettings::default(),
        )
    }

    /// Assemble a renderer from its collaborators
    ///
    /// The viewport starts at the surface's drawable size.
    pub fn from_parts(
        gl: Rc<dyn GraphicsContext>,
        surface: Box<dyn Surface>,
        source: &dyn ShaderSource,
        settings: &RendererSettings,
    ) -> RenderResult<Self> {
        let mut pipeline = PipelineState::new(Rc::clone(&gl), source, settings)?;
        let (width, height) = surface.drawable_size();
        pipeline.set_viewport(width, height)?;
        log::info!("Renderer initialized at {width}x{height}");

        Ok(Self {
            scenes: Registry::new(),
            cameras: Registry::new(),
            camera: None,
            skeletons: Registry::new(),
            bones: Registry::new(),
            meshes: Registry::new(),
            textures: Registry::new(),
            materials: Registry::new(),
            terrains: Registry::new(),
            skyboxes: Registry::new(),
            programs: Registry::new(),
            vertex_shaders: Registry::new(),
            fragment_shaders: Registry::new(),
            tessellation_control_shaders: Registry::new(),
            tessellation_evaluation_shaders: Registry::new(),
            pipeline,
            listeners: EventListeners::new(),
            gl,
            surface,
        })
    }

    /// Native context every GPU object is created on
    pub const fn graphics_context(&self) -> &Rc<dyn GraphicsContext> {
        &self.gl
    }

    /// Window surface
    pub fn surface(&self) -> &dyn Surface {
        self.surface.as_ref()
    }

    // Viewport and matrices

    /// Resize the viewport and reallocate the render targets
    pub fn set_viewport(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.pipeline.set_viewport(width, height)
    }

    /// Current viewport size
    pub const fn viewport(&self) -> (u32, u32) {
        self.pipeline.viewport()
    }

    /// Base model matrix
    pub const fn model_matrix(&self) -> Mat4 {
        *self.pipeline.model_matrix()
    }

    /// Camera view as of the last `begin_render`
    pub const fn view_matrix(&self) -> Mat4 {
        *self.pipeline.view_matrix()
    }

    /// Scene projection
    pub const fn projection_matrix(&self) -> Mat4 {
        *self.pipeline.projection_matrix()
    }

    /// Frame bracketing state
    pub const fn frame_state(&self) -> FrameState {
        self.pipeline.frame_state()
    }

    // Frame bracketing

    fn active_camera(&self) -> Camera {
        self.camera
            .and_then(|handle| self.cameras.get(handle))
            .copied()
            .unwrap_or_default()
    }

    /// Start a frame from the current camera
    pub fn begin_render(&mut self) -> RenderResult<()> {
        let camera = self.active_camera();
        self.pipeline.begin_frame(&camera)
    }

    /// Run the pass sequence for `scene`
    pub fn render(&mut self, scene: SceneHandle) -> RenderResult<()> {
        let camera = self.active_camera();
        let scene = self.scenes.get(scene).ok_or_else(|| invalid("scene"))?;
        let resources = FrameResources {
            meshes: &self.meshes,
            textures: &self.textures,
            materials: &self.materials,
            terrains: &self.terrains,
            skyboxes: &self.skyboxes,
            bones: &self.bones,
            programs: &self.programs,
        };
        self.pipeline.render_scene(scene, &resources, &camera)
    }

    /// Draw one debug line
    pub fn render_line(&mut self, from: Vec3, to: Vec3, color: Vec3) -> RenderResult<()> {
        self.pipeline.draw_lines(&[Line::new(from, to, color)])
    }

    /// Draw a batch of debug lines
    pub fn render_lines(&mut self, lines: &[Line]) -> RenderResult<()> {
        self.pipeline.draw_lines(lines)
    }

    /// Close the frame and present it
    pub fn end_render(&mut self) -> RenderResult<()> {
        self.pipeline.end_frame()?;
        self.surface.swap_buffers();
        Ok(())
    }

    // Handle validity

    /// True while `handle` addresses a live pool resource
    pub fn valid<H: PoolHandle>(&self, handle: H) -> bool {
        handle.valid_in(self)
    }

    /// Release a pool resource
    ///
    /// Scene records referring to it stay in place and are skipped when
    /// rendered.
    pub fn destroy<H: PoolHandle>(&mut self, handle: H) -> RenderResult<()> {
        handle.destroy_in(self)
    }

    /// True while `scene` is live and `handle` addresses one of its records
    pub fn valid_in_scene<H: SceneObjectHandle>(&self, scene: SceneHandle, handle: H) -> bool {
        self.scenes.get(scene).is_some_and(|scene| handle.valid_in(scene))
    }

    /// Remove a record from `scene`
    pub fn destroy_in_scene<H: SceneObjectHandle>(&mut self, scene: SceneHandle, handle: H) -> RenderResult<()> {
        handle.destroy_in(self.scene_mut(scene)?)
    }

    fn scene_mut(&mut self, scene: SceneHandle) -> RenderResult<&mut RenderScene> {
        self.scenes.get_mut(scene).ok_or_else(|| invalid("scene"))
    }

    /// Scene behind `handle`
    pub fn scene(&self, handle: SceneHandle) -> Option<&RenderScene> {
        self.scenes.get(handle)
    }

    // Shaders and programs

    /// Compile a vertex shader
    pub fn create_vertex_shader(&mut self, source: &str) -> RenderResult<VertexShaderHandle> {
        compile_stage(&self.gl, &mut self.vertex_shaders, source)
    }

    /// Compile a fragment shader
    pub fn create_fragment_shader(&mut self, source: &str) -> RenderResult<FragmentShaderHandle> {
        compile_stage(&self.gl, &mut self.fragment_shaders, source)
    }

    /// Compile a tessellation control shader
    pub fn create_tessellation_control_shader(&mut self, source: &str) -> RenderResult<TessellationControlShaderHandle> {
        compile_stage(&self.gl, &mut self.tessellation_control_shaders, source)
    }

    /// Compile a tessellation evaluation shader
    pub fn create_tessellation_evaluation_shader(
        &mut self,
        source: &str,
    ) -> RenderResult<TessellationEvaluationShaderHandle> {
        compile_stage(&self.gl, &mut self.tessellation_evaluation_shaders, source)
    }

    /// Link a vertex and a fragment shader
    pub fn create_shader_program(
        &mut self,
        vertex: VertexShaderHandle,
        fragment: FragmentShaderHandle,
    ) -> RenderResult<ShaderProgramHandle> {
        let vertex = self.vertex_shaders.get(vertex).ok_or_else(|| invalid("vertex shader"))?;
        let fragment = self.fragment_shaders.get(fragment).ok_or_else(|| invalid("fragment shader"))?;

        let program = ShaderProgram::from_shaders(Rc::clone(&self.gl), &[vertex.shader(), fragment.shader()])?;
        log::debug!("Linked shader program");
        Ok(self.programs.create(program))
    }

    /// Link all four stages
    pub fn create_tessellation_shader_program(
        &mut self,
        vertex: VertexShaderHandle,
        control: TessellationControlShaderHandle,
        evaluation: TessellationEvaluationShaderHandle,
        fragment: FragmentShaderHandle,
    ) -> RenderResult<ShaderProgramHandle> {
        let vertex = self.vertex_shaders.get(vertex).ok_or_else(|| invalid("vertex shader"))?;
        let control = self
            .tessellation_control_shaders
            .get(control)
            .ok_or_else(|| invalid("tessellation control shader"))?;
        let evaluation = self
            .tessellation_evaluation_shaders
            .get(evaluation)
            .ok_or_else(|| invalid("tessellation evaluation shader"))?;
        let fragment = self.fragment_shaders.get(fragment).ok_or_else(|| invalid("fragment shader"))?;

        let program = ShaderProgram::from_shaders(
            Rc::clone(&self.gl),
            &[vertex.shader(), control.shader(), evaluation.shader(), fragment.shader()],
        )?;
        log::debug!("Linked tessellation shader program");
        Ok(self.programs.create(program))
    }

    // Geometry and surfaces

    /// Upload immutable geometry
    pub fn create_static_mesh(&mut self, data: &MeshData) -> RenderResult<MeshHandle> {
        let mesh = Mesh::new(&self.gl, data, glow::STATIC_DRAW)?;
        Ok(self.meshes.create(mesh))
    }

    /// Upload geometry with a dynamic usage hint
    pub fn create_dynamic_mesh(&mut self, data: &MeshData) -> RenderResult<MeshHandle> {
        let mesh = Mesh::new(&self.gl, data, glow::DYNAMIC_DRAW)?;
        Ok(self.meshes.create(mesh))
    }

    /// Mesh behind `handle`
    pub fn mesh(&self, handle: MeshHandle) -> Option<&Mesh> {
        self.meshes.get(handle)
    }

    /// Add bone ids and weights to `mesh`
    pub fn create_skeleton(&mut self, mesh: MeshHandle, skeleton: &Skeleton) -> RenderResult<SkeletonHandle> {
        self.meshes
            .get_mut(mesh)
            .ok_or_else(|| invalid("mesh"))?
            .add_skeleton(skeleton)?;
        log::debug!("Added skeleton to mesh {mesh:?}");
        Ok(self.skeletons.create(SkeletonBinding { mesh }))
    }

    /// Allocate a bone buffer of `max_bones` identity transforms
    pub fn create_bones(&mut self, max_bones: usize) -> RenderResult<BonesHandle> {
        let bones = Bones::new(&self.gl, max_bones)?;
        Ok(self.bones.create(bones))
    }

    /// Upload an image as a mipmapped 2D texture
    pub fn create_texture2d(&mut self, image: &Image) -> RenderResult<TextureHandle> {
        let texture = material::upload(&self.gl, image)?;
        log::debug!("Created {}x{} texture", image.width(), image.height());
        Ok(self.textures.create(texture))
    }

    /// Texture behind `handle`
    pub fn texture(&self, handle: TextureHandle) -> Option<&Texture> {
        self.textures.get(handle)
    }

    /// Upload a PBR material; missing channels default to mid-gray
    pub fn create_material(&mut self, data: &PbrMaterialData) -> RenderResult<MaterialHandle> {
        let material = Material::new(&self.gl, data)?;
        log::debug!("Created material");
        Ok(self.materials.create(material))
    }

    /// Material behind `handle`
    pub fn material(&self, handle: MaterialHandle) -> Option<&Material> {
        self.materials.get(handle)
    }

    /// Build terrain from a height map and a splat map
    pub fn create_static_terrain(
        &mut self,
        height_map: &HeightMap,
        splat_map: &SplatMap,
        displacement_map: &DisplacementMap,
    ) -> RenderResult<TerrainHandle> {
        let terrain = Terrain::new(&self.gl, height_map, splat_map, displacement_map)?;
        Ok(self.terrains.create(terrain))
    }

    /// Build a skybox from six square faces of one size
    pub fn create_static_skybox(&mut self, faces: &SkyboxFaces) -> RenderResult<SkyboxHandle> {
        let skybox = Skybox::new(&self.gl, faces)?;
        Ok(self.skyboxes.create(skybox))
    }

    // Scenes and cameras

    /// Create an empty scene
    pub fn create_render_scene(&mut self) -> SceneHandle {
        let handle = self.scenes.create(RenderScene::new());
        log::debug!("Created scene {handle:?}");
        handle
    }

    /// Replace the camera with one at `position` facing `look_at`
    ///
    /// The previous camera handle stops validating.
    pub fn create_camera(&mut self, position: Vec3, look_at: Vec3) -> RenderResult<CameraHandle> {
        let camera = Camera::looking_at(position, look_at)?;
        if let Some(previous) = self.camera.take() {
            // Already gone if the host destroyed it
            let _ = self.cameras.destroy(previous);
        }
        let handle = self.cameras.create(camera);
        self.camera = Some(handle);
        Ok(handle)
    }

    // Scene records

    /// Add a renderable with an explicit shading binding
    pub fn create_renderable(
        &mut self,
        scene: SceneHandle,
        mesh: MeshHandle,
        shading: Shading,
        graphics: GraphicsData,
    ) -> RenderResult<RenderableHandle> {
        if !self.meshes.valid(mesh) {
            return Err(invalid("mesh"));
        }
        match shading {
            Shading::Texture(texture) if !self.textures.valid(texture) => return Err(invalid("texture")),
            Shading::Material(material) if !self.materials.valid(material) => return Err(invalid("material")),
            _ => {}
        }
        Ok(self
            .scene_mut(scene)?
            .add_renderable(Renderable::new(mesh, shading, graphics)))
    }

    /// Add a renderable shaded by one diffuse texture
    ///
    /// A `program` becomes the scene's default for static geometry.
    pub fn create_renderable_with_texture(
        &mut self,
        scene: SceneHandle,
        mesh: MeshHandle,
        texture: TextureHandle,
        graphics: GraphicsData,
        program: Option<ShaderProgramHandle>,
    ) -> RenderResult<RenderableHandle> {
        if let Some(program) = program {
            if !self.programs.valid(program) {
                return Err(invalid("shader program"));
            }
        }
        let handle = self.create_renderable(scene, mesh, Shading::Texture(texture), graphics)?;
        if program.is_some() {
            self.scene_mut(scene)?.set_default_program(program);
        }
        Ok(handle)
    }

    /// Add a renderable shaded by a PBR material
    pub fn create_renderable_with_material(
        &mut self,
        scene: SceneHandle,
        mesh: MeshHandle,
        material: MaterialHandle,
        graphics: GraphicsData,
    ) -> RenderResult<RenderableHandle> {
        self.create_renderable(scene, mesh, Shading::Material(material), graphics)
    }

    /// Add a terrain instance centred on the origin
    pub fn create_terrain_renderable(
        &mut self,
        scene: SceneHandle,
        terrain: TerrainHandle,
    ) -> RenderResult<TerrainRenderableHandle> {
        let resource = self.terrains.get(terrain).ok_or_else(|| invalid("terrain"))?;
        let graphics = GraphicsData {
            position: Vec3::new(-(resource.width as f32) / 2.0, 0.0, -(resource.height as f32) / 2.0),
            ..GraphicsData::default()
        };
        Ok(self
            .scene_mut(scene)?
            .add_terrain(TerrainRenderable { terrain, graphics }))
    }

    /// Add a skybox instance
    pub fn create_skybox_renderable(
        &mut self,
        scene: SceneHandle,
        skybox: SkyboxHandle,
    ) -> RenderResult<SkyboxRenderableHandle> {
        if !self.skyboxes.valid(skybox) {
            return Err(invalid("skybox"));
        }
        Ok(self.scene_mut(scene)?.add_skybox(SkyboxRenderable {
            skybox,
            graphics: GraphicsData::default(),
        }))
    }

    /// Add a white point light
    pub fn create_point_light(&mut self, scene: SceneHandle, position: Vec3) -> RenderResult<PointLightHandle> {
        Ok(self.scene_mut(scene)?.add_point_light(PointLight::new(position)))
    }

    // Bones

    fn renderable_mut(&mut self, scene: SceneHandle, renderable: RenderableHandle) -> RenderResult<&mut Renderable> {
        self.scene_mut(scene)?
            .renderables_mut()
            .get_mut(renderable)
            .ok_or_else(|| invalid("renderable"))
    }

    /// Skin a renderable with `bones`
    pub fn attach_bones(&mut self, scene: SceneHandle, renderable: RenderableHandle, bones: BonesHandle) -> RenderResult<()> {
        if !self.bones.valid(bones) {
            return Err(invalid("bones"));
        }
        self.renderable_mut(scene, renderable)?.attach_bones(bones);
        Ok(())
    }

    /// Drop skinning and any bone attachment
    pub fn detach_bones(&mut self, scene: SceneHandle, renderable: RenderableHandle) -> RenderResult<()> {
        self.renderable_mut(scene, renderable)?.detach_bones();
        Ok(())
    }

    /// Rigidly attach a renderable to up to four bones of `bones`
    pub fn attach_bone_attachment(
        &mut self,
        scene: SceneHandle,
        renderable: RenderableHandle,
        bones: BonesHandle,
        bone_ids: IVec4,
        bone_weights: Vec4,
    ) -> RenderResult<()> {
        if !self.bones.valid(bones) {
            return Err(invalid("bones"));
        }
        self.renderable_mut(scene, renderable)?
            .attach_bone_attachment(bones, BoneAttachment { bone_ids, bone_weights });
        Ok(())
    }

    /// Drop a rigid bone attachment
    pub fn detach_bone_attachment(&mut self, scene: SceneHandle, renderable: RenderableHandle) -> RenderResult<()> {
        self.renderable_mut(scene, renderable)?.detach_bone_attachment();
        Ok(())
    }

    /// Write `transforms` into the renderable's bone buffer
    pub fn update_bones(
        &mut self,
        scene: SceneHandle,
        renderable: RenderableHandle,
        transforms: &[Mat4],
    ) -> RenderResult<()> {
        let handle = self
            .renderable_mut(scene, renderable)?
            .bones
            .ok_or(RenderError::NotAllocated {
                object: "bone buffer",
                action: "update",
            })?;
        self.bones
            .get(handle)
            .ok_or_else(|| invalid("bones"))?
            .update(transforms)
    }

    // Events and cursor

    /// Register an event listener
    pub fn add_event_listener(&mut self, listener: Box<dyn EventListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Unregister a listener; false if it was not registered
    pub fn remove_event_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Drain the surface's events and push each one to every listener
    pub fn process_events(&mut self) {
        for event in self.surface.poll_events() {
            self.listeners.dispatch(&event);
        }
    }

    /// Lock the cursor and report relative motion
    pub fn set_mouse_relative_mode(&mut self, enabled: bool) {
        self.surface.set_mouse_relative_mode(enabled);
    }

    /// Confine the cursor to the window
    pub fn set_window_grab(&mut self, grabbed: bool) {
        self.surface.set_window_grab(grabbed);
    }

    /// Whether the cursor is drawn
    pub fn cursor_visible(&self) -> bool {
        self.surface.cursor_visible()
    }

    /// Show or hide the cursor
    pub fn set_cursor_visible(&mut self, visible: bool) {
        self.surface.set_cursor_visible(visible);
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("scenes", &self.scenes.len())
            .field("meshes", &self.meshes.len())
            .field("textures", &self.textures.len())
            .field("materials", &self.materials.len())
            .field("programs", &self.programs.len())
            .field("pipeline", &self.pipeline)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;
    use crate::gl::{ObjectKind, UniformValue};
    use crate::render::pipeline::MAX_POINT_LIGHTS;
    use crate::render::resources::{ImageFormat, DEFAULT_CHANNEL_VALUE};
    use std::cell::RefCell;

    fn renderer() -> (Rc<HeadlessContext>, Renderer) {
        let headless = Rc::new(HeadlessContext::new());
        let gl: Rc<dyn GraphicsContext> = headless.clone();
        let renderer = Renderer::from_parts(
            gl,
            Box::new(HeadlessSurface::new(800, 600)),
            &EmbeddedShaderSource::new(),
            &RendererSettings::default(),
        )
        .unwrap();
        (headless, renderer)
    }

    fn checker() -> Image {
        Image::new(2, 2, ImageFormat::Rgba, vec![255; 16]).unwrap()
    }

    #[test]
    fn test_full_frame_leaves_pipeline_idle() {
        let (headless, mut renderer) = renderer();
        let scene = renderer.create_render_scene();
        let mesh = renderer.create_static_mesh(&MeshData::quad()).unwrap();
        let texture = renderer.create_texture2d(&checker()).unwrap();
        renderer
            .create_renderable_with_texture(scene, mesh, texture, GraphicsData::default(), None)
            .unwrap();
        renderer.create_point_light(scene, Vec3::new(0.0, 2.0, 2.0)).unwrap();
        renderer.create_camera(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros()).unwrap();

        for _ in 0..2 {
            renderer.begin_render().unwrap();
            renderer.render(scene).unwrap();
            renderer
                .render_line(Vec3::zeros(), Vec3::x(), Vec3::new(1.0, 0.0, 0.0))
                .unwrap();
            renderer.end_render().unwrap();
            assert_eq!(renderer.frame_state(), FrameState::Idle);
        }

        assert_eq!(headless.errors_raised(), 0);
        assert!(headless.draw_calls() > 0);
        assert_eq!(headless.blits(), 2);
    }

    #[test]
    fn test_every_pass_draws_its_scene_content() {
        let (headless, mut renderer) = renderer();
        let scene = renderer.create_render_scene();

        let mesh = renderer.create_static_mesh(&MeshData::cube()).unwrap();
        let material = renderer
            .create_material(&PbrMaterialData::new(checker(), checker()).with_roughness(checker()))
            .unwrap();
        renderer
            .create_renderable_with_material(scene, mesh, material, GraphicsData::default())
            .unwrap();

        let terrain = renderer
            .create_static_terrain(
                &HeightMap {
                    image: Image::solid(3, 3, [0; 4]),
                },
                &SplatMap {
                    terrain_map: Image::solid(3, 3, [0; 4]),
                    materials: vec![PbrMaterialData::new(checker(), checker())],
                },
                &DisplacementMap {
                    image: Image::solid(3, 3, [0; 4]),
                },
            )
            .unwrap();
        renderer.create_terrain_renderable(scene, terrain).unwrap();

        let face = || Image::solid(1, 1, [40; 4]);
        let skybox = renderer
            .create_static_skybox(&SkyboxFaces {
                back: face(),
                down: face(),
                front: face(),
                left: face(),
                right: face(),
                up: face(),
            })
            .unwrap();
        renderer.create_skybox_renderable(scene, skybox).unwrap();

        for i in 0..40 {
            renderer.create_point_light(scene, Vec3::new(i as f32, 2.0, 0.0)).unwrap();
        }
        renderer.create_camera(Vec3::new(0.0, 2.0, 6.0), Vec3::zeros()).unwrap();

        let draws = headless.draw_calls();
        renderer.begin_render().unwrap();
        renderer.render(scene).unwrap();
        renderer.end_render().unwrap();

        // Shadow, geometry, terrain, lighting quad, skybox
        assert_eq!(headless.draw_calls() - draws, 5);
        assert_eq!(headless.errors_raised(), 0);
        assert_eq!(headless.current_depth_func(), glow::LESS);

        let lighting = renderer.pipeline.lighting_program().id().unwrap();
        assert_eq!(
            headless.uniform(lighting, "numberOfPointLights"),
            Some(UniformValue::Int(MAX_POINT_LIGHTS as i32))
        );
        let light_samplers = ["gPosition", "gNormal", "gAlbedoSpec", "gMetallicRoughnessAmbientOcclusion", "shadowMap"];
        for (unit, name) in light_samplers.into_iter().enumerate() {
            assert_eq!(headless.uniform(lighting, name), Some(UniformValue::Int(unit as i32)), "{name}");
        }

        let terrain_program = renderer.pipeline.terrain_program().id().unwrap();
        let terrain_samplers = [
            "heightMapTexture",
            "terrainMapTexture",
            "splatMapAlbedoTextures",
            "splatMapNormalTextures",
            "splatMapMetallicRoughnessAmbientOcclusionTextures",
        ];
        for (unit, name) in terrain_samplers.into_iter().enumerate() {
            assert_eq!(headless.uniform(terrain_program, name), Some(UniformValue::Int(unit as i32)), "{name}");
        }
    }

    #[test]
    fn test_render_outside_frame_fails() {
        let (_headless, mut renderer) = renderer();
        let scene = renderer.create_render_scene();
        assert!(matches!(
            renderer.render(scene),
            Err(RenderError::InvalidFrameState { operation: "render", .. })
        ));
    }

    #[test]
    fn test_scene_isolation() {
        let (_headless, mut renderer) = renderer();
        let mesh = renderer.create_static_mesh(&MeshData::cube()).unwrap();
        let texture = renderer.create_texture2d(&checker()).unwrap();

        let first = renderer.create_render_scene();
        let second = renderer.create_render_scene();
        renderer
            .create_renderable_with_texture(first, mesh, texture, GraphicsData::default(), None)
            .unwrap();
        let kept = renderer
            .create_renderable_with_texture(second, mesh, texture, GraphicsData::default(), None)
            .unwrap();
        let light = renderer.create_point_light(second, Vec3::zeros()).unwrap();

        renderer.destroy(first).unwrap();

        assert!(!renderer.valid(first));
        assert!(renderer.valid(second));
        assert!(renderer.valid_in_scene(second, kept));
        assert!(renderer.valid_in_scene(second, light));
        assert!(renderer.valid(mesh));
        assert!(renderer.valid(texture));
        assert!(!renderer.valid_in_scene(first, kept));
    }

    #[test]
    fn test_material_without_pbr_channels() {
        let (headless, mut renderer) = renderer();
        let material = renderer
            .create_material(&PbrMaterialData::new(checker(), checker()))
            .unwrap();

        let packed = renderer.material(material).unwrap();
        let id = packed.metallic_roughness_ambient_occlusion.id().unwrap();
        let data = headless.texture_data(id).unwrap();
        assert!(data
            .chunks_exact(4)
            .all(|texel| texel[..3].iter().all(|c| *c == DEFAULT_CHANNEL_VALUE)));
    }

    #[test]
    fn test_invalid_handles_are_rejected() {
        let (_headless, mut renderer) = renderer();
        let scene = renderer.create_render_scene();
        let mesh = renderer.create_static_mesh(&MeshData::quad()).unwrap();
        renderer.destroy(mesh).unwrap();

        assert!(matches!(
            renderer.create_renderable(scene, mesh, Shading::None, GraphicsData::default()),
            Err(RenderError::InvalidHandle { kind: "mesh" })
        ));
        assert!(matches!(renderer.destroy(mesh), Err(RenderError::InvalidHandle { kind: "mesh" })));
    }

    #[test]
    fn test_destroyed_mesh_is_skipped_when_rendering() {
        let (headless, mut renderer) = renderer();
        let scene = renderer.create_render_scene();
        let mesh = renderer.create_static_mesh(&MeshData::quad()).unwrap();
        let renderable = renderer
            .create_renderable(scene, mesh, Shading::None, GraphicsData::default())
            .unwrap();
        renderer.destroy(mesh).unwrap();

        renderer.begin_render().unwrap();
        renderer.render(scene).unwrap();
        renderer.end_render().unwrap();

        assert!(renderer.valid_in_scene(scene, renderable));
        assert_eq!(headless.errors_raised(), 0);
    }

    #[test]
    fn test_new_camera_replaces_old() {
        let (_headless, mut renderer) = renderer();
        let first = renderer.create_camera(Vec3::new(0.0, 0.0, 3.0), Vec3::zeros()).unwrap();
        let second = renderer.create_camera(Vec3::new(0.0, 1.0, 3.0), Vec3::zeros()).unwrap();

        assert!(!renderer.valid(first));
        assert!(renderer.valid(second));
        assert!(matches!(
            renderer.create_camera(Vec3::zeros(), Vec3::zeros()),
            Err(RenderError::InvalidInput(_))
        ));
        // A failed replacement keeps the current camera
        assert!(renderer.valid(second));
    }

    #[test]
    fn test_program_linking_and_scene_default() {
        let (headless, mut renderer) = renderer();
        let vertex = renderer.create_vertex_shader("void main() {}").unwrap();
        let fragment = renderer.create_fragment_shader("void main() {}").unwrap();
        let before = headless.live_count(ObjectKind::Program);
        let program = renderer.create_shader_program(vertex, fragment).unwrap();
        assert_eq!(headless.live_count(ObjectKind::Program), before + 1);

        let scene = renderer.create_render_scene();
        let mesh = renderer.create_static_mesh(&MeshData::quad()).unwrap();
        let texture = renderer.create_texture2d(&checker()).unwrap();
        renderer
            .create_renderable_with_texture(scene, mesh, texture, GraphicsData::default(), Some(program))
            .unwrap();
        assert_eq!(renderer.scene(scene).unwrap().default_program(), Some(program));

        renderer.destroy(vertex).unwrap();
        assert!(!renderer.valid(vertex));
        assert!(matches!(
            renderer.create_shader_program(vertex, fragment),
            Err(RenderError::InvalidHandle { kind: "vertex shader" })
        ));
    }

    #[test]
    fn test_tessellation_program_links_four_stages() {
        let (_headless, mut renderer) = renderer();
        let vertex = renderer.create_vertex_shader("void main() {}").unwrap();
        let control = renderer.create_tessellation_control_shader("void main() {}").unwrap();
        let evaluation = renderer.create_tessellation_evaluation_shader("void main() {}").unwrap();
        let fragment = renderer.create_fragment_shader("void main() {}").unwrap();

        let program = renderer
            .create_tessellation_shader_program(vertex, control, evaluation, fragment)
            .unwrap();
        assert!(renderer.valid(program));
    }

    #[test]
    fn test_skeleton_and_bones_lifecycle() {
        let (headless, mut renderer) = renderer();
        let data = MeshData::quad();
        let count = data.vertices.len();
        let mesh = renderer.create_static_mesh(&data).unwrap();

        let skeleton = Skeleton::new(vec![IVec4::zeros(); count], vec![Vec4::new(1.0, 0.0, 0.0, 0.0); count]);
        let binding = renderer.create_skeleton(mesh, &skeleton).unwrap();
        assert!(matches!(renderer.create_skeleton(mesh, &skeleton), Err(RenderError::SkeletonExists)));

        let scene = renderer.create_render_scene();
        let renderable = renderer
            .create_renderable(scene, mesh, Shading::None, GraphicsData::default())
            .unwrap();
        assert!(matches!(
            renderer.update_bones(scene, renderable, &[Mat4::identity()]),
            Err(RenderError::NotAllocated { object: "bone buffer", .. })
        ));

        let bones = renderer.create_bones(4).unwrap();
        renderer.attach_bones(scene, renderable, bones).unwrap();
        let moved = Mat4::new_translation(&Vec3::new(1.0, 0.0, 0.0));
        renderer.update_bones(scene, renderable, &[moved]).unwrap();

        renderer.begin_render().unwrap();
        renderer.render(scene).unwrap();
        renderer.end_render().unwrap();
        assert_eq!(headless.errors_raised(), 0);

        renderer.destroy(binding).unwrap();
        assert!(!renderer.mesh(mesh).unwrap().has_skeleton());
        renderer.destroy(bones).unwrap();
        assert!(matches!(renderer.create_bones(101), Err(RenderError::TooManyBones { requested: 101, max: 100 })));
    }

    #[test]
    fn test_events_reach_listeners() {
        struct Counter(Rc<RefCell<Vec<f64>>>);
        impl EventListener for Counter {
            fn process_event(&mut self, event: &Event) {
                self.0.borrow_mut().push(event.timestamp());
            }
        }

        let mut surface = HeadlessSurface::new(64, 64);
        surface.push_event(Event::Quit { timestamp: 4.0 });
        let gl: Rc<dyn GraphicsContext> = Rc::new(HeadlessContext::new());
        let mut renderer =
            Renderer::from_parts(gl, Box::new(surface), &EmbeddedShaderSource::new(), &RendererSettings::default())
                .unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let id = renderer.add_event_listener(Box::new(Counter(Rc::clone(&seen))));
        renderer.process_events();
        renderer.process_events();
        assert_eq!(*seen.borrow(), vec![4.0]);
        assert!(renderer.remove_event_listener(id));
        assert!(!renderer.remove_event_listener(id));
    }

    #[test]
    fn test_cursor_control_forwards_to_surface() {
        let (_headless, mut renderer) = renderer();
        assert!(renderer.cursor_visible());
        renderer.set_cursor_visible(false);
        assert!(!renderer.cursor_visible());
        renderer.set_mouse_relative_mode(true);
        renderer.set_window_grab(true);
    }

    #[test]
    fn test_viewport_is_taken_from_surface() {
        let (_headless, mut renderer) = renderer();
        assert_eq!(renderer.viewport(), (800, 600));
        renderer.set_viewport(1024, 768).unwrap();
        assert_eq!(renderer.viewport(), (1024, 768));
        assert_eq!(renderer.model_matrix(), Mat4::identity());
        assert_ne!(renderer.projection_matrix(), Mat4::identity());
    }
}
