//! The per-frame passes

use std::rc::Rc;

use super::{FrameResources, PipelineState, MAX_POINT_LIGHTS};
use crate::foundation::math::{self, Mat4, Vec3};
use crate::gl::{check_error, Buffer, FrameBuffer, GraphicsContext, ShaderProgram, Texture, VertexArray};
use crate::render::scene::{RenderScene, Renderable, Shading};
use crate::render::RenderResult;

/// Uniform buffer binding point of the `Bones` block
const BONES_BINDING: u32 = 0;

const LIGHT_LINEAR: f32 = 0.05;
const LIGHT_QUADRATIC: f32 = 0.05;
const DIRECTIONAL_AMBIENT: Vec3 = Vec3::new(0.2, 0.2, 0.2);
const DIRECTIONAL_DIFFUSE: Vec3 = Vec3::new(0.2, 0.2, 0.2);
const DIRECTIONAL_SPECULAR: Vec3 = Vec3::new(1.0, 1.0, 1.0);

/// Position (xyz) and texture coordinate (uv) of the four strip corners
#[rustfmt::skip]
const QUAD_VERTICES: [f32; 20] = [
    -1.0,  1.0, 0.0, 0.0, 1.0,
    -1.0, -1.0, 0.0, 0.0, 0.0,
     1.0,  1.0, 0.0, 1.0, 1.0,
     1.0, -1.0, 0.0, 1.0, 0.0,
];

/// Screen-covering triangle strip drawn by the lighting pass
pub(super) struct FullScreenQuad {
    gl: Rc<dyn GraphicsContext>,
    vertex_array: VertexArray,
    _vertices: Buffer,
}

impl FullScreenQuad {
    fn new(gl: &Rc<dyn GraphicsContext>) -> RenderResult<Self> {
        let mut vertex_array = VertexArray::new(Rc::clone(gl));
        vertex_array.generate()?;
        vertex_array.bind()?;

        let mut vertices = Buffer::new(Rc::clone(gl), glow::ARRAY_BUFFER);
        vertices.generate()?;
        vertices.upload(bytemuck::cast_slice(&QUAD_VERTICES), glow::STATIC_DRAW)?;

        let float = std::mem::size_of::<f32>() as i32;
        gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, 5 * float, 0);
        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_f32(1, 2, glow::FLOAT, false, 5 * float, 3 * float);
        gl.enable_vertex_attrib_array(1);
        VertexArray::unbind(gl.as_ref());

        log::debug!("Created full-screen quad");
        Ok(Self {
            gl: Rc::clone(gl),
            vertex_array,
            _vertices: vertices,
        })
    }

    fn draw(&self) -> RenderResult<()> {
        self.vertex_array.bind()?;
        self.gl.draw_arrays(glow::TRIANGLE_STRIP, 0, 4);
        VertexArray::unbind(self.gl.as_ref());
        Ok(())
    }
}

impl std::fmt::Debug for FullScreenQuad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FullScreenQuad")
            .field("vertex_array", &self.vertex_array.id())
            .finish_non_exhaustive()
    }
}

fn set_geometry_samplers(program: &ShaderProgram) {
    program.set_int("texture_diffuse1", 0);
    program.set_int("normalTextures", 1);
    program.set_int("metallicRoughnessAmbientOcclusionTextures", 2);
}

impl PipelineState {
    fn viewport_i32(&self) -> (i32, i32) {
        (self.viewport.0 as i32, self.viewport.1 as i32)
    }

    /// Depth from the directional light into the shadow map
    pub(super) fn shadow_pass(
        &self,
        scene: &RenderScene,
        resources: &FrameResources<'_>,
        light_space: &Mat4,
    ) -> RenderResult<()> {
        let Some(shadow_map) = &self.shadow_map else {
            return Ok(());
        };
        let gl = self.gl.as_ref();

        gl.clear_color(0.1, 0.1, 0.1, 1.0);
        gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);

        let program = &self.programs.shadow;
        program.use_program()?;
        program.set_mat4("lightSpaceMatrix", light_space);

        let size = shadow_map.size() as i32;
        gl.viewport(0, 0, size, size);
        shadow_map.frame_buffer.bind()?;
        Texture::activate(gl, 0);
        gl.clear(glow::DEPTH_BUFFER_BIT);

        for renderable in scene.renderables().values() {
            let Some(mesh) = resources.meshes.get(renderable.mesh) else {
                log::debug!("Skipping renderable with a stale mesh handle");
                continue;
            };
            program.set_mat4("modelMatrix", &(self.model * renderable.graphics.model_matrix()));
            if let Shading::Texture(handle) = renderable.shading {
                if let Some(texture) = resources.textures.get(handle) {
                    texture.bind()?;
                }
            }
            mesh.draw()?;
            self.check_draw()?;
        }

        FrameBuffer::unbind(gl);
        let (width, height) = self.viewport_i32();
        gl.viewport(0, 0, width, height);
        gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);

        log::trace!("Shadow pass drew {} renderables", scene.renderables().len());
        check_error(gl)
    }

    /// Static, skinned and terrain geometry into the G-buffer
    pub(super) fn geometry_pass(&self, scene: &RenderScene, resources: &FrameResources<'_>) -> RenderResult<()> {
        let Some(gbuffer) = &self.gbuffer else {
            return Ok(());
        };
        let gl = self.gl.as_ref();

        gbuffer.frame_buffer.bind()?;
        Texture::activate(gl, 0);
        gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);

        let default_program = scene
            .default_program()
            .and_then(|handle| resources.programs.get(handle));
        let mut current = None;

        for renderable in scene.renderables().values() {
            let Some(mesh) = resources.meshes.get(renderable.mesh) else {
                log::debug!("Skipping renderable with a stale mesh handle");
                continue;
            };

            // Skinned geometry needs the built-in bone-aware program
            let program = match default_program {
                Some(program) if !renderable.has_bones => program,
                _ => &self.programs.geometry,
            };
            if current != program.id() {
                program.use_program()?;
                set_geometry_samplers(program);
                current = program.id();
            }

            let model = self.model * renderable.graphics.model_matrix();
            program.set_mat4("pvmMatrix", &(self.projection * self.view * model));
            program.set_mat3("normalMatrix", &math::normal_matrix(&self.view, &model));
            program.set_mat4("modelMatrix", &model);

            Self::bind_bones(program, renderable, resources)?;

            match renderable.shading {
                Shading::None => {}
                Shading::Texture(handle) => {
                    if let Some(texture) = resources.textures.get(handle) {
                        texture.bind_to_unit(0)?;
                    }
                }
                Shading::Material(handle) => {
                    if let Some(material) = resources.materials.get(handle) {
                        material.bind()?;
                    }
                }
            }

            mesh.draw()?;
            self.check_draw()?;
        }

        self.terrain_geometry(scene, resources)?;

        FrameBuffer::unbind(gl);
        log::trace!(
            "Geometry pass drew {} renderables and {} terrain",
            scene.renderables().len(),
            scene.terrain().len()
        );
        check_error(gl)
    }

    fn bind_bones(program: &ShaderProgram, renderable: &Renderable, resources: &FrameResources<'_>) -> RenderResult<()> {
        let bones = renderable.bones.and_then(|handle| resources.bones.get(handle));
        let Some(bones) = bones else {
            program.set_bool("hasBones", false);
            program.set_bool("hasBoneAttachment", false);
            return Ok(());
        };

        program.set_bool("hasBones", renderable.has_bones);
        program.set_bool("hasBoneAttachment", renderable.bone_attachment.is_some());
        program.bind_uniform_block("Bones", BONES_BINDING);
        bones.bind_base(BONES_BINDING)?;

        if let Some(attachment) = &renderable.bone_attachment {
            program.set_ivec4("boneAttachmentIds", &attachment.bone_ids);
            program.set_vec4("boneAttachmentWeights", &attachment.bone_weights);
        }
        Ok(())
    }

    fn terrain_geometry(&self, scene: &RenderScene, resources: &FrameResources<'_>) -> RenderResult<()> {
        if scene.terrain().is_empty() {
            return Ok(());
        }

        let program = &self.programs.terrain;
        program.use_program()?;
        program.set_int("heightMapTexture", 0);
        program.set_int("terrainMapTexture", 1);
        program.set_int("splatMapAlbedoTextures", 2);
        program.set_int("splatMapNormalTextures", 3);
        program.set_int("splatMapMetallicRoughnessAmbientOcclusionTextures", 4);

        for instance in scene.terrain().values() {
            let Some(terrain) = resources.terrains.get(instance.terrain) else {
                log::debug!("Skipping terrain instance with a stale terrain handle");
                continue;
            };
            let model = self.model * instance.graphics.model_matrix();
            program.set_mat4("modelMatrix", &model);
            program.set_mat4("pvmMatrix", &(self.projection * self.view * model));

            terrain.bind_textures()?;
            terrain.mesh.draw()?;
            self.check_draw()?;
        }
        Ok(())
    }

    /// Shade the G-buffer onto the default framebuffer
    pub(super) fn lighting_pass(&mut self, scene: &RenderScene, camera_position: &Vec3, light_space: &Mat4) -> RenderResult<()> {
        if self.quad.is_none() {
            self.quad = Some(FullScreenQuad::new(&self.gl)?);
        }
        let (Some(gbuffer), Some(shadow_map), Some(quad)) = (&self.gbuffer, &self.shadow_map, &self.quad) else {
            return Ok(());
        };
        let gl = self.gl.as_ref();

        FrameBuffer::unbind(gl);
        gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);

        let program = &self.programs.lighting;
        program.use_program()?;
        program.set_int("gPosition", 0);
        program.set_int("gNormal", 1);
        program.set_int("gAlbedoSpec", 2);
        program.set_int("gMetallicRoughnessAmbientOcclusion", 3);
        program.set_int("shadowMap", 4);
        program.set_vec3("viewPos", camera_position);
        program.set_vec3("lightPos", &super::light_position(camera_position));
        program.set_mat4("lightSpaceMatrix", light_space);

        gbuffer.bind_textures()?;
        shadow_map.depth.bind_to_unit(4)?;

        let lights = scene.point_lights();
        if lights.len() > MAX_POINT_LIGHTS {
            log::warn!(
                "Scene has {} point lights, only the first {MAX_POINT_LIGHTS} are lit",
                lights.len()
            );
        }
        let mut lit = 0;
        for (index, light) in lights.values().take(MAX_POINT_LIGHTS).enumerate() {
            program.set_vec3(&format!("lights[{index}].Position"), &light.position);
            program.set_vec3(&format!("lights[{index}].Color"), &light.color);
            program.set_float(&format!("lights[{index}].Linear"), LIGHT_LINEAR);
            program.set_float(&format!("lights[{index}].Quadratic"), LIGHT_QUADRATIC);
            lit += 1;
        }
        program.set_int("numberOfPointLights", lit);

        program.set_vec3("directionalLights[0].direction", &super::LIGHT_DIRECTION);
        program.set_vec3("directionalLights[0].ambient", &DIRECTIONAL_AMBIENT);
        program.set_vec3("directionalLights[0].diffuse", &DIRECTIONAL_DIFFUSE);
        program.set_vec3("directionalLights[0].specular", &DIRECTIONAL_SPECULAR);

        quad.draw()?;
        self.check_draw()?;

        log::trace!("Lighting pass shaded {lit} point lights");
        check_error(gl)
    }

    /// Copy G-buffer depth into the default framebuffer
    pub(super) fn copy_depth(&self) -> RenderResult<()> {
        let Some(gbuffer) = &self.gbuffer else {
            return Ok(());
        };
        let gl = self.gl.as_ref();
        let (width, height) = self.viewport_i32();

        gbuffer.frame_buffer.bind_to(glow::READ_FRAMEBUFFER)?;
        gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, None);
        gl.blit_framebuffer(
            [0, 0, width, height],
            [0, 0, width, height],
            glow::DEPTH_BUFFER_BIT,
            glow::NEAREST,
        );
        FrameBuffer::unbind(gl);
        check_error(gl)
    }

    /// Cube maps behind everything already drawn
    ///
    /// The depth function is back at `LESS` when this returns, on error too.
    pub(super) fn skybox_pass(&self, scene: &RenderScene, resources: &FrameResources<'_>) -> RenderResult<()> {
        let gl = self.gl.as_ref();
        gl.depth_func(glow::LEQUAL);
        let drawn = self.draw_skyboxes(scene, resources);
        gl.depth_func(glow::LESS);
        drawn?;
        check_error(gl)
    }

    fn draw_skyboxes(&self, scene: &RenderScene, resources: &FrameResources<'_>) -> RenderResult<()> {
        let program = &self.programs.skybox;
        program.use_program()?;
        program.set_int("skybox", 0);

        let view = math::rotation_only(&self.view);
        for instance in scene.skyboxes().values() {
            let Some(skybox) = resources.skyboxes.get(instance.skybox) else {
                log::debug!("Skipping skybox instance with a stale skybox handle");
                continue;
            };
            program.set_mat4("projectionMatrix", &self.projection);
            program.set_mat4("viewMatrix", &view);

            skybox.cube_map.bind_to_unit(0)?;
            skybox.mesh.draw()?;
            self.check_draw()?;
        }
        Ok(())
    }
}
