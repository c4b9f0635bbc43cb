//! Vertex array records and geometry generators
//!
//! A [`Mesh`] owns one vertex array with up to two vertex buffer slots and an
//! index buffer. Slot 0 holds the per-vertex attributes as consecutive
//! blocks, not interleaved:
//!
//! | location | attribute | type |
//! |---|---|---|
//! | 0 | position | `vec3` |
//! | 1 | color | `vec4` |
//! | 2 | normal | `vec3` |
//! | 3 | texture coordinate | `vec2` |
//!
//! Slot 1 is the optional skeleton data (bone ids at location 4, bone weights
//! at location 5) added by [`Mesh::add_skeleton`].

use std::fmt;
use std::rc::Rc;

use crate::foundation::math::{Vec2, Vec3, Vec4};
use crate::gl::{Buffer, GraphicsContext, VertexArray};
use crate::render::resources::Skeleton;
use crate::render::{RenderError, RenderResult};

/// CPU-side geometry for a static or dynamic mesh
///
/// Colors, normals and texture coordinates may be left empty; when present
/// they must have one entry per vertex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Vertex positions
    pub vertices: Vec<Vec3>,
    /// Triangle list indices
    pub indices: Vec<u32>,
    /// Per-vertex colors
    pub colors: Vec<Vec4>,
    /// Per-vertex normals
    pub normals: Vec<Vec3>,
    /// Per-vertex texture coordinates
    pub texture_coordinates: Vec<Vec2>,
}

impl MeshData {
    /// Positions and indices only
    pub const fn new(vertices: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            colors: Vec::new(),
            normals: Vec::new(),
            texture_coordinates: Vec::new(),
        }
    }

    /// Set per-vertex colors
    #[must_use]
    pub fn with_colors(mut self, colors: Vec<Vec4>) -> Self {
        self.colors = colors;
        self
    }

    /// Set per-vertex normals
    #[must_use]
    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = normals;
        self
    }

    /// Set per-vertex texture coordinates
    #[must_use]
    pub fn with_texture_coordinates(mut self, texture_coordinates: Vec<Vec2>) -> Self {
        self.texture_coordinates = texture_coordinates;
        self
    }

    /// Check attribute counts and index bounds
    pub fn validate(&self) -> RenderResult<()> {
        let count = self.vertices.len();
        let attributes = [
            ("colors", self.colors.len()),
            ("normals", self.normals.len()),
            ("texture coordinates", self.texture_coordinates.len()),
        ];
        for (name, len) in attributes {
            if len != 0 && len != count {
                return Err(RenderError::InvalidInput(format!(
                    "mesh has {count} vertices but {len} {name}"
                )));
            }
        }
        if let Some(index) = self.indices.iter().find(|i| **i as usize >= count) {
            return Err(RenderError::InvalidInput(format!(
                "index {index} out of range for {count} vertices"
            )));
        }
        Ok(())
    }

    /// Flat grid in the XZ plane with `width × height` cells, one unit each
    ///
    /// Vertex `(x, z)` sits at index `z * (width + 1) + x`.
    pub fn grid(width: u32, height: u32) -> Self {
        let vertices: Vec<Vec3> = (0..=height)
            .flat_map(|z| (0..=width).map(move |x| Vec3::new(x as f32, 0.0, z as f32)))
            .collect();

        let row = width + 1;
        let mut indices = Vec::with_capacity(width as usize * height as usize * 6);
        for z in 0..height {
            for x in 0..width {
                let top_left = z * row + x;
                let bottom_left = top_left + row;
                indices.extend_from_slice(&[
                    top_left,
                    bottom_left,
                    top_left + 1,
                    top_left + 1,
                    bottom_left,
                    bottom_left + 1,
                ]);
            }
        }

        Self::new(vertices, indices)
    }

    /// Cube spanning -1..1 on every axis, positions only
    pub fn cube() -> Self {
        let vertices = vec![
            // Front face
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-1.0, 1.0, 1.0),
            // Back face
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
        ];

        let indices = vec![
            // Front
            0, 1, 2, 2, 3, 0,
            // Back
            4, 5, 6, 6, 7, 4,
            // Left
            4, 0, 3, 3, 5, 4,
            // Right
            1, 7, 6, 6, 2, 1,
            // Top
            3, 2, 6, 6, 5, 3,
            // Bottom
            4, 7, 1, 1, 0, 4,
        ];

        Self::new(vertices, indices)
    }

    /// Textured unit quad in the XY plane facing +Z
    pub fn quad() -> Self {
        let vertices = vec![
            Vec3::new(-0.5, -0.5, 0.0),
            Vec3::new(0.5, -0.5, 0.0),
            Vec3::new(0.5, 0.5, 0.0),
            Vec3::new(-0.5, 0.5, 0.0),
        ];
        let white = Vec4::new(1.0, 1.0, 1.0, 1.0);

        Self::new(vertices, vec![0, 1, 2, 2, 3, 0])
            .with_colors(vec![white; 4])
            .with_normals(vec![Vec3::z(); 4])
            .with_texture_coordinates(vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ])
    }
}

fn flatten<const N: usize>(values: &[nalgebra::SVector<f32, N>]) -> Vec<f32> {
    values.iter().flat_map(|v| v.iter().copied()).collect()
}

/// Uploaded vertex array with its buffers and draw parameters
pub struct Mesh {
    gl: Rc<dyn GraphicsContext>,
    vertex_array: VertexArray,
    vertices: Buffer,
    skeleton: Option<Buffer>,
    indices: Buffer,
    vertex_count: usize,
    mode: u32,
    index_count: i32,
}

impl Mesh {
    /// Upload `data` with buffer `usage` (`STATIC_DRAW` or `DYNAMIC_DRAW`)
    pub fn new(gl: &Rc<dyn GraphicsContext>, data: &MeshData, usage: u32) -> RenderResult<Self> {
        data.validate()?;

        let mut vertex_array = VertexArray::new(Rc::clone(gl));
        vertex_array.generate()?;
        vertex_array.bind()?;

        let blocks = [
            (3, flatten(&data.vertices)),
            (4, flatten(&data.colors)),
            (3, flatten(&data.normals)),
            (2, flatten(&data.texture_coordinates)),
        ];
        let mut bytes = Vec::new();
        for (_, block) in &blocks {
            bytes.extend_from_slice(bytemuck::cast_slice(block));
        }

        let mut vertices = Buffer::new(Rc::clone(gl), glow::ARRAY_BUFFER);
        vertices.generate()?;
        vertices.upload(&bytes, usage)?;

        let mut offset = 0;
        for (location, (components, block)) in blocks.iter().enumerate() {
            gl.vertex_attrib_pointer_f32(location as u32, *components, glow::FLOAT, false, 0, offset);
            gl.enable_vertex_attrib_array(location as u32);
            offset += std::mem::size_of_val(block.as_slice()) as i32;
        }

        let mut indices = Buffer::new(Rc::clone(gl), glow::ELEMENT_ARRAY_BUFFER);
        indices.generate()?;
        indices.upload(bytemuck::cast_slice(&data.indices), usage)?;

        VertexArray::unbind(gl.as_ref());

        log::debug!(
            "Created mesh with {} vertices and {} indices",
            data.vertices.len(),
            data.indices.len()
        );

        Ok(Self {
            gl: Rc::clone(gl),
            vertex_array,
            vertices,
            skeleton: None,
            indices,
            vertex_count: data.vertices.len(),
            mode: glow::TRIANGLES,
            index_count: data.indices.len() as i32,
        })
    }

    /// Add bone ids and weights as vertex buffer slot 1
    pub fn add_skeleton(&mut self, skeleton: &Skeleton) -> RenderResult<()> {
        if self.skeleton.is_some() {
            return Err(RenderError::SkeletonExists);
        }
        skeleton.validate(self.vertex_count)?;

        self.vertex_array.bind()?;

        let ids: Vec<i32> = skeleton.bone_ids.iter().flat_map(|v| v.iter().copied()).collect();
        let weights = flatten(&skeleton.bone_weights);
        let ids_size = std::mem::size_of_val(ids.as_slice());

        let mut bytes = Vec::with_capacity(ids_size + std::mem::size_of_val(weights.as_slice()));
        bytes.extend_from_slice(bytemuck::cast_slice(&ids));
        bytes.extend_from_slice(bytemuck::cast_slice(&weights));

        let mut buffer = Buffer::new(Rc::clone(&self.gl), glow::ARRAY_BUFFER);
        buffer.generate()?;
        buffer.upload(&bytes, glow::STATIC_DRAW)?;

        self.gl.vertex_attrib_pointer_i32(4, 4, glow::INT, 0, 0);
        self.gl.enable_vertex_attrib_array(4);
        self.gl
            .vertex_attrib_pointer_f32(5, 4, glow::FLOAT, false, 0, ids_size as i32);
        self.gl.enable_vertex_attrib_array(5);

        VertexArray::unbind(self.gl.as_ref());
        self.skeleton = Some(buffer);
        Ok(())
    }

    /// Release the skeleton slot, returning whether one existed
    pub fn remove_skeleton(&mut self) -> bool {
        self.skeleton.take().is_some()
    }

    /// True when vertex buffer slot 1 is populated
    pub const fn has_skeleton(&self) -> bool {
        self.skeleton.is_some()
    }

    /// Bind the vertex array and issue the indexed draw
    pub fn draw(&self) -> RenderResult<()> {
        self.vertex_array.bind()?;
        self.gl
            .draw_elements(self.mode, self.index_count, glow::UNSIGNED_INT, 0);
        VertexArray::unbind(self.gl.as_ref());
        Ok(())
    }

    /// Number of vertices in slot 0
    pub const fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Number of indices drawn
    pub const fn index_count(&self) -> i32 {
        self.index_count
    }

    /// Primitive mode
    pub const fn mode(&self) -> u32 {
        self.mode
    }

    /// Slot 0 vertex buffer
    pub const fn vertex_buffer(&self) -> &Buffer {
        &self.vertices
    }

    /// Index buffer
    pub const fn index_buffer(&self) -> &Buffer {
        &self.indices
    }
}

impl fmt::Debug for Mesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mesh")
            .field("vertex_array", &self.vertex_array)
            .field("vertex_count", &self.vertex_count)
            .field("index_count", &self.index_count)
            .field("skeleton", &self.skeleton.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::IVec4;
    use crate::gl::{HeadlessContext, ObjectKind};

    fn context() -> (Rc<HeadlessContext>, Rc<dyn GraphicsContext>) {
        let headless = Rc::new(HeadlessContext::new());
        let gl: Rc<dyn GraphicsContext> = headless.clone();
        (headless, gl)
    }

    #[test]
    fn test_grid_dimensions() {
        let grid = MeshData::grid(3, 2);
        assert_eq!(grid.vertices.len(), 4 * 3);
        assert_eq!(grid.indices.len(), 3 * 2 * 6);
        assert_eq!(grid.vertices[5], Vec3::new(1.0, 0.0, 1.0));
        assert!(grid.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let mut data = MeshData::quad();
        data.indices.push(4);
        assert!(matches!(data.validate(), Err(RenderError::InvalidInput(_))));

        let data = MeshData::cube().with_normals(vec![Vec3::z(); 3]);
        assert!(matches!(data.validate(), Err(RenderError::InvalidInput(_))));
    }

    #[test]
    fn test_slot_zero_layout_is_blocked() {
        let (headless, gl) = context();
        let mesh = Mesh::new(&gl, &MeshData::quad(), glow::STATIC_DRAW).unwrap();

        let bytes = headless
            .buffer_contents(mesh.vertex_buffer().id().unwrap())
            .unwrap();
        // 4 vertices × (3 + 4 + 3 + 2) floats
        assert_eq!(bytes.len(), 4 * 12 * 4);
        let floats: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        assert_eq!(&floats[0..3], &[-0.5, -0.5, 0.0]);
        // First color follows the whole position block
        assert_eq!(&floats[12..16], &[1.0, 1.0, 1.0, 1.0]);

        let indices = headless
            .buffer_contents(mesh.index_buffer().id().unwrap())
            .unwrap();
        assert_eq!(indices.len(), 6 * 4);
        assert_eq!(mesh.index_count(), 6);
        assert_eq!(mesh.mode(), glow::TRIANGLES);
    }

    #[test]
    fn test_skeleton_slot_is_added_once() {
        let (headless, gl) = context();
        let mut mesh = Mesh::new(&gl, &MeshData::quad(), glow::STATIC_DRAW).unwrap();
        let skeleton = Skeleton::new(vec![IVec4::new(0, 1, 0, 0); 4], vec![Vec4::new(0.5, 0.5, 0.0, 0.0); 4]);

        mesh.add_skeleton(&skeleton).unwrap();
        assert!(mesh.has_skeleton());
        assert_eq!(headless.live_count(ObjectKind::Buffer), 3);
        assert!(matches!(mesh.add_skeleton(&skeleton), Err(RenderError::SkeletonExists)));

        assert!(mesh.remove_skeleton());
        assert_eq!(headless.live_count(ObjectKind::Buffer), 2);
    }

    #[test]
    fn test_skeleton_must_cover_every_vertex() {
        let (_, gl) = context();
        let mut mesh = Mesh::new(&gl, &MeshData::quad(), glow::STATIC_DRAW).unwrap();
        let skeleton = Skeleton::new(vec![IVec4::zeros(); 2], vec![Vec4::zeros(); 2]);
        assert!(matches!(mesh.add_skeleton(&skeleton), Err(RenderError::InvalidInput(_))));
    }

    #[test]
    fn test_drop_releases_everything() {
        let (headless, gl) = context();
        let mesh = Mesh::new(&gl, &MeshData::cube(), glow::STATIC_DRAW).unwrap();
        assert_eq!(headless.live_objects(), 3);
        drop(mesh);
        assert_eq!(headless.live_objects(), 0);
        assert_eq!(headless.errors_raised(), 0);
    }
}
