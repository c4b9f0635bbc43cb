//! Render scenes
//!
//! A [`RenderScene`] owns four independent registries: renderables, point
//! lights, terrain instances and skybox instances. It owns no GPU objects;
//! every record refers to the renderer's shared pools by handle, so
//! destroying a scene never invalidates meshes, textures or materials.

use crate::foundation::handle::{Handle, Registry};
use crate::foundation::math::{GraphicsData, IVec4, Vec3, Vec4};
use crate::render::resources::{BonesHandle, MaterialHandle, MeshHandle, SkyboxHandle, TerrainHandle, TextureHandle};
use crate::render::shaders::ShaderProgramHandle;
use crate::render::{RenderError, RenderResult};

/// How a renderable's surface is shaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shading {
    /// Nothing bound; whatever the texture units hold is sampled
    None,
    /// Single diffuse texture on unit 0
    Texture(TextureHandle),
    /// PBR material on units 0 to 2
    Material(MaterialHandle),
}

/// Rigid attachment of non-skinned geometry to up to four bones
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneAttachment {
    /// Bones the geometry follows
    pub bone_ids: IVec4,
    /// Influence of each bone
    pub bone_weights: Vec4,
}

/// A mesh instance in a scene
#[derive(Debug, Clone, PartialEq)]
pub struct Renderable {
    /// Geometry
    pub mesh: MeshHandle,
    /// Texture or material binding
    pub shading: Shading,
    /// Transform
    pub graphics: GraphicsData,
    /// Bone transform buffer, shared by skinning and bone attachment
    pub bones: Option<BonesHandle>,
    /// True when the mesh is skinned by `bones`
    pub has_bones: bool,
    /// Rigid bone attachment
    pub bone_attachment: Option<BoneAttachment>,
}

impl Renderable {
    /// Unskinned renderable at `graphics`
    pub const fn new(mesh: MeshHandle, shading: Shading, graphics: GraphicsData) -> Self {
        Self {
            mesh,
            shading,
            graphics,
            bones: None,
            has_bones: false,
            bone_attachment: None,
        }
    }

    /// Skin with `bones`
    pub fn attach_bones(&mut self, bones: BonesHandle) {
        self.bones = Some(bones);
        self.has_bones = true;
    }

    /// Drop skinning and any bone attachment
    pub fn detach_bones(&mut self) {
        self.bones = None;
        self.has_bones = false;
        self.bone_attachment = None;
    }

    /// Follow `bones` rigidly with the given ids and weights
    pub fn attach_bone_attachment(&mut self, bones: BonesHandle, attachment: BoneAttachment) {
        self.bones = Some(bones);
        self.bone_attachment = Some(attachment);
    }

    /// Drop the bone attachment; the bone buffer stays only when skinned
    pub fn detach_bone_attachment(&mut self) {
        if !self.has_bones {
            self.bones = None;
        }
        self.bone_attachment = None;
    }
}

/// Default color of a new point light
pub const DEFAULT_LIGHT_COLOR: Vec3 = Vec3::new(1.0, 1.0, 1.0);

/// Point light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// World position
    pub position: Vec3,
    /// Linear RGB color
    pub color: Vec3,
}

impl PointLight {
    /// White light at `position`
    pub const fn new(position: Vec3) -> Self {
        Self {
            position,
            color: DEFAULT_LIGHT_COLOR,
        }
    }
}

/// Terrain instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainRenderable {
    /// Terrain resource
    pub terrain: TerrainHandle,
    /// Transform
    pub graphics: GraphicsData,
}

/// Skybox instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyboxRenderable {
    /// Skybox resource
    pub skybox: SkyboxHandle,
    /// Transform; only the camera rotation affects how a skybox renders
    pub graphics: GraphicsData,
}

/// Handle to a renderable inside one scene
pub type RenderableHandle = Handle<Renderable>;
/// Handle to a point light inside one scene
pub type PointLightHandle = Handle<PointLight>;
/// Handle to a terrain instance inside one scene
pub type TerrainRenderableHandle = Handle<TerrainRenderable>;
/// Handle to a skybox instance inside one scene
pub type SkyboxRenderableHandle = Handle<SkyboxRenderable>;
/// Handle to a scene
pub type SceneHandle = Handle<RenderScene>;

/// Per-scene collections of render records
#[derive(Default)]
pub struct RenderScene {
    renderables: Registry<Renderable>,
    point_lights: Registry<PointLight>,
    terrain: Registry<TerrainRenderable>,
    skyboxes: Registry<SkyboxRenderable>,
    default_program: Option<ShaderProgramHandle>,
}

fn invalid(kind: &'static str) -> RenderError {
    RenderError::InvalidHandle { kind }
}

impl RenderScene {
    /// Empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a renderable
    pub fn add_renderable(&mut self, renderable: Renderable) -> RenderableHandle {
        self.renderables.create(renderable)
    }

    /// Remove a renderable
    pub fn remove_renderable(&mut self, handle: RenderableHandle) -> RenderResult<Renderable> {
        self.renderables.destroy(handle).map_err(|_| invalid("renderable"))
    }

    /// Add a point light
    pub fn add_point_light(&mut self, light: PointLight) -> PointLightHandle {
        self.point_lights.create(light)
    }

    /// Remove a point light
    pub fn remove_point_light(&mut self, handle: PointLightHandle) -> RenderResult<PointLight> {
        self.point_lights.destroy(handle).map_err(|_| invalid("point light"))
    }

    /// Add a terrain instance
    pub fn add_terrain(&mut self, terrain: TerrainRenderable) -> TerrainRenderableHandle {
        self.terrain.create(terrain)
    }

    /// Remove a terrain instance
    pub fn remove_terrain(&mut self, handle: TerrainRenderableHandle) -> RenderResult<TerrainRenderable> {
        self.terrain.destroy(handle).map_err(|_| invalid("terrain renderable"))
    }

    /// Add a skybox instance
    pub fn add_skybox(&mut self, skybox: SkyboxRenderable) -> SkyboxRenderableHandle {
        self.skyboxes.create(skybox)
    }

    /// Remove a skybox instance
    pub fn remove_skybox(&mut self, handle: SkyboxRenderableHandle) -> RenderResult<SkyboxRenderable> {
        self.skyboxes.destroy(handle).map_err(|_| invalid("skybox renderable"))
    }

    /// Renderables in creation order
    pub const fn renderables(&self) -> &Registry<Renderable> {
        &self.renderables
    }

    /// Mutable renderable registry
    pub fn renderables_mut(&mut self) -> &mut Registry<Renderable> {
        &mut self.renderables
    }

    /// Point lights in creation order
    pub const fn point_lights(&self) -> &Registry<PointLight> {
        &self.point_lights
    }

    /// Mutable point light registry
    pub fn point_lights_mut(&mut self) -> &mut Registry<PointLight> {
        &mut self.point_lights
    }

    /// Terrain instances in creation order
    pub const fn terrain(&self) -> &Registry<TerrainRenderable> {
        &self.terrain
    }

    /// Mutable terrain registry
    pub fn terrain_mut(&mut self) -> &mut Registry<TerrainRenderable> {
        &mut self.terrain
    }

    /// Skybox instances in creation order
    pub const fn skyboxes(&self) -> &Registry<SkyboxRenderable> {
        &self.skyboxes
    }

    /// Mutable skybox registry
    pub fn skyboxes_mut(&mut self) -> &mut Registry<SkyboxRenderable> {
        &mut self.skyboxes
    }

    /// Program used for static renderables instead of the built-in one
    pub const fn default_program(&self) -> Option<ShaderProgramHandle> {
        self.default_program
    }

    /// Replace the default program
    pub fn set_default_program(&mut self, program: Option<ShaderProgramHandle>) {
        self.default_program = program;
    }

    /// Drop every record, invalidating all handles into this scene
    pub fn clear(&mut self) {
        self.renderables.clear();
        self.point_lights.clear();
        self.terrain.clear();
        self.skyboxes.clear();
        self.default_program = None;
    }
}

impl std::fmt::Debug for RenderScene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderScene")
            .field("renderables", &self.renderables.len())
            .field("point_lights", &self.point_lights.len())
            .field("terrain", &self.terrain.len())
            .field("skyboxes", &self.skyboxes.len())
            .field("default_program", &self.default_program)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderable() -> Renderable {
        Renderable::new(MeshHandle::NULL, Shading::None, GraphicsData::default())
    }

    #[test]
    fn test_registries_are_independent() {
        let mut scene = RenderScene::new();
        let r = scene.add_renderable(renderable());
        let light = scene.add_point_light(PointLight::new(Vec3::zeros()));

        scene.remove_renderable(r).unwrap();
        assert!(scene.point_lights().valid(light));
        assert!(matches!(
            scene.remove_renderable(r),
            Err(RenderError::InvalidHandle { kind: "renderable" })
        ));
    }

    #[test]
    fn test_detach_attachment_keeps_skinning_buffer() {
        let bones = BonesHandle::NULL;
        let attachment = BoneAttachment {
            bone_ids: IVec4::new(1, 0, 0, 0),
            bone_weights: Vec4::new(1.0, 0.0, 0.0, 0.0),
        };

        let mut skinned = renderable();
        skinned.attach_bones(bones);
        skinned.attach_bone_attachment(bones, attachment);
        skinned.detach_bone_attachment();
        assert_eq!(skinned.bones, Some(bones));
        assert!(skinned.has_bones);
        assert!(skinned.bone_attachment.is_none());

        let mut rigid = renderable();
        rigid.attach_bone_attachment(bones, attachment);
        rigid.detach_bone_attachment();
        assert!(rigid.bones.is_none());
        assert!(rigid.bone_attachment.is_none());
    }

    #[test]
    fn test_clear_invalidates_records() {
        let mut scene = RenderScene::new();
        let r = scene.add_renderable(renderable());
        scene.clear();
        assert!(!scene.renderables().valid(r));
        assert!(scene.renderables().is_empty());
    }

    #[test]
    fn test_lights_default_to_white() {
        let light = PointLight::new(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(light.color, DEFAULT_LIGHT_COLOR);
    }
}
