//! Skeletal animation data: per-vertex bone weights and bone transform buffers

use std::rc::Rc;

use crate::foundation::handle::Handle;
use crate::foundation::math::{IVec4, Mat4, Vec4};
use crate::gl::{Buffer, GraphicsContext};
use crate::render::resources::MeshHandle;
use crate::render::{RenderError, RenderResult};

/// Bones a single [`Bones`] buffer can hold; matches the `Bones` uniform block
pub const MAX_BONES: usize = 100;

/// Up to four bone influences per vertex
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skeleton {
    /// Bone indices per vertex
    pub bone_ids: Vec<IVec4>,
    /// Bone weights per vertex, paired with `bone_ids`
    pub bone_weights: Vec<Vec4>,
}

impl Skeleton {
    /// Create from matching id and weight arrays
    pub const fn new(bone_ids: Vec<IVec4>, bone_weights: Vec<Vec4>) -> Self {
        Self {
            bone_ids,
            bone_weights,
        }
    }

    pub(crate) fn validate(&self, vertex_count: usize) -> RenderResult<()> {
        if self.bone_ids.len() != self.bone_weights.len() {
            return Err(RenderError::InvalidInput(format!(
                "skeleton has {} bone id sets but {} weight sets",
                self.bone_ids.len(),
                self.bone_weights.len()
            )));
        }
        if self.bone_ids.len() != vertex_count {
            return Err(RenderError::InvalidInput(format!(
                "skeleton covers {} vertices, mesh has {vertex_count}",
                self.bone_ids.len()
            )));
        }
        Ok(())
    }
}

/// Record of a skeleton added to a mesh
///
/// Destroying it removes the skeleton slot from the mesh again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkeletonBinding {
    /// Mesh carrying the skeleton slot
    pub mesh: MeshHandle,
}

/// Handle to a skeleton added with `create_skeleton`
pub type SkeletonHandle = Handle<SkeletonBinding>;

/// Uniform buffer of bone transforms
#[derive(Debug)]
pub struct Bones {
    buffer: Buffer,
    capacity: usize,
}

/// Handle to a bone transform buffer
pub type BonesHandle = Handle<Bones>;

impl Bones {
    /// Allocate room for `capacity` matrices, all identity
    pub fn new(gl: &Rc<dyn GraphicsContext>, capacity: usize) -> RenderResult<Self> {
        if capacity > MAX_BONES {
            return Err(RenderError::TooManyBones {
                requested: capacity,
                max: MAX_BONES,
            });
        }

        let identity = vec![Mat4::identity(); capacity];
        let mut buffer = Buffer::new(Rc::clone(gl), glow::UNIFORM_BUFFER);
        buffer.generate()?;
        buffer.upload(&matrix_bytes(&identity), glow::STREAM_DRAW)?;

        log::debug!("Created bone buffer for {capacity} bones");
        Ok(Self { buffer, capacity })
    }

    /// Overwrite the leading transforms through a mapped write
    pub fn update(&self, transforms: &[Mat4]) -> RenderResult<()> {
        if transforms.len() > self.capacity {
            return Err(RenderError::TooManyBones {
                requested: transforms.len(),
                max: self.capacity,
            });
        }
        self.buffer.write_mapped(0, &matrix_bytes(transforms))
    }

    /// Bind to uniform buffer binding point `binding`
    pub fn bind_base(&self, binding: u32) -> RenderResult<()> {
        self.buffer.bind_base(binding)
    }

    /// Number of matrices the buffer holds
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Underlying uniform buffer
    pub const fn buffer(&self) -> &Buffer {
        &self.buffer
    }
}

fn matrix_bytes(matrices: &[Mat4]) -> Vec<u8> {
    let floats: Vec<f32> = matrices
        .iter()
        .flat_map(|m| m.as_slice().iter().copied())
        .collect();
    bytemuck::cast_slice(&floats).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::HeadlessContext;

    #[test]
    fn test_bone_limit() {
        let gl: Rc<dyn GraphicsContext> = Rc::new(HeadlessContext::new());
        assert!(Bones::new(&gl, MAX_BONES).is_ok());
        assert!(matches!(
            Bones::new(&gl, MAX_BONES + 1),
            Err(RenderError::TooManyBones { requested: 101, max: 100 })
        ));
    }

    #[test]
    fn test_buffer_starts_with_identity() {
        let headless = Rc::new(HeadlessContext::new());
        let gl: Rc<dyn GraphicsContext> = headless.clone();
        let bones = Bones::new(&gl, 2).unwrap();

        let bytes = headless.buffer_contents(bones.buffer().id().unwrap()).unwrap();
        assert_eq!(bytes, matrix_bytes(&[Mat4::identity(), Mat4::identity()]));
    }

    #[test]
    fn test_update_writes_through_mapping() {
        let headless = Rc::new(HeadlessContext::new());
        let gl: Rc<dyn GraphicsContext> = headless.clone();
        let bones = Bones::new(&gl, 2).unwrap();
        let scaled = Mat4::new_scaling(2.0);

        bones.update(&[scaled]).unwrap();
        let bytes = headless.buffer_contents(bones.buffer().id().unwrap()).unwrap();
        assert_eq!(bytes, matrix_bytes(&[scaled, Mat4::identity()]));

        assert!(matches!(
            bones.update(&[scaled; 3]),
            Err(RenderError::TooManyBones { .. })
        ));
    }
}
