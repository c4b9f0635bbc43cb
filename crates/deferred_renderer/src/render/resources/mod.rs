//! Resource management
//!
//! Engine-global GPU resources. Each lives in a [`Registry`] pool owned by
//! the renderer; scenes only hold handles into these pools, so one mesh or
//! texture can be shared across scenes.
//!
//! [`Registry`]: crate::foundation::Registry

pub mod image;
pub mod material;
pub mod mesh;
pub mod skeleton;
pub mod skybox;
pub mod terrain;

pub use image::{Image, ImageFormat};
pub use material::{Material, PbrMaterialData, DEFAULT_CHANNEL_VALUE};
pub use mesh::{Mesh, MeshData};
pub use skeleton::{Bones, BonesHandle, Skeleton, SkeletonBinding, SkeletonHandle, MAX_BONES};
pub use skybox::{Skybox, SkyboxFaces, SkyboxHandle};
pub use terrain::{DisplacementMap, HeightMap, SplatMap, Terrain, TerrainHandle, SPLAT_LAYERS};

use crate::foundation::handle::Handle;
use crate::gl::Texture;

/// Handle to a mesh
pub type MeshHandle = Handle<Mesh>;

/// Handle to a 2D texture
pub type TextureHandle = Handle<Texture>;

/// Handle to a PBR material
pub type MaterialHandle = Handle<Material>;
