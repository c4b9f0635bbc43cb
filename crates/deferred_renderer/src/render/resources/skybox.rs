//! Cube-mapped skyboxes

use std::rc::Rc;

use crate::foundation::handle::Handle;
use crate::gl::{CubeFaces, GraphicsContext, Texture, TextureKind};
use crate::render::resources::{Image, Mesh, MeshData};
use crate::render::{RenderError, RenderResult};

/// The six face images of a skybox
#[derive(Debug, Clone)]
pub struct SkyboxFaces {
    /// Behind the viewer (+Z)
    pub back: Image,
    /// Below (-Y)
    pub down: Image,
    /// In front (-Z)
    pub front: Image,
    /// Left (-X)
    pub left: Image,
    /// Right (+X)
    pub right: Image,
    /// Above (+Y)
    pub up: Image,
}

impl SkyboxFaces {
    fn all(&self) -> [&Image; 6] {
        [&self.back, &self.down, &self.front, &self.left, &self.right, &self.up]
    }

    /// Check that all faces are square and share one size and format
    pub fn validate(&self) -> RenderResult<()> {
        let reference = &self.back;
        if reference.width() != reference.height() {
            return Err(RenderError::InvalidInput(format!(
                "skybox faces must be square, got {}x{}",
                reference.width(),
                reference.height()
            )));
        }
        for face in self.all() {
            if face.width() != reference.width()
                || face.height() != reference.height()
                || face.format() != reference.format()
            {
                return Err(RenderError::InvalidInput(
                    "skybox faces must share one size and format".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// GPU resources of a skybox
#[derive(Debug)]
pub struct Skybox {
    /// Face size in texels
    pub size: u32,
    /// Cube map sampled by the skybox pass
    pub cube_map: Texture,
    /// Unit cube drawn around the camera
    pub mesh: Mesh,
}

/// Handle to a skybox
pub type SkyboxHandle = Handle<Skybox>;

impl Skybox {
    /// Upload the cube map and build the cube mesh
    pub fn new(gl: &Rc<dyn GraphicsContext>, faces: &SkyboxFaces) -> RenderResult<Self> {
        faces.validate()?;
        let size = faces.back.width();

        let mut cube_map = Texture::new(Rc::clone(gl), TextureKind::CubeMap);
        cube_map.generate_cube_map(
            faces.back.format().texture_format(),
            size,
            size,
            &CubeFaces {
                back: faces.back.data(),
                down: faces.down.data(),
                front: faces.front.data(),
                left: faces.left.data(),
                right: faces.right.data(),
                up: faces.up.data(),
            },
        )?;

        let mesh = Mesh::new(gl, &MeshData::cube(), glow::STATIC_DRAW)?;
        log::debug!("Created {size}x{size} skybox");
        Ok(Self { size, cube_map, mesh })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::HeadlessContext;

    fn faces(size: u32) -> SkyboxFaces {
        let face = |value| Image::solid(size, size, [value; 4]);
        SkyboxFaces {
            back: face(1),
            down: face(2),
            front: face(3),
            left: face(4),
            right: face(5),
            up: face(6),
        }
    }

    #[test]
    fn test_faces_land_on_their_cube_targets() {
        let headless = Rc::new(HeadlessContext::new());
        let gl: Rc<dyn GraphicsContext> = headless.clone();
        let skybox = Skybox::new(&gl, &faces(1)).unwrap();

        // Stored in +X, -X, +Y, -Y, +Z, -Z order
        let data = headless.texture_data(skybox.cube_map.id().unwrap()).unwrap();
        let firsts: Vec<u8> = data.chunks_exact(4).map(|p| p[0]).collect();
        assert_eq!(firsts, vec![5, 4, 6, 2, 1, 3]);
    }

    #[test]
    fn test_faces_must_match() {
        let gl: Rc<dyn GraphicsContext> = Rc::new(HeadlessContext::new());
        let mut mismatched = faces(2);
        mismatched.up = Image::solid(4, 4, [0; 4]);
        assert!(matches!(Skybox::new(&gl, &mismatched), Err(RenderError::InvalidInput(_))));

        let mut oblong = faces(2);
        oblong.back = Image::solid(2, 3, [0; 4]);
        assert!(matches!(oblong.validate(), Err(RenderError::InvalidInput(_))));
    }
}
