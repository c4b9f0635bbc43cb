//! Texture objects: 2D, 2D arrays and cube maps

use std::fmt;
use std::rc::Rc;

use super::{require, require_unallocated, GraphicsContext, NativeId};
use crate::render::{RenderError, RenderResult};

/// Texture target flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    /// `GL_TEXTURE_2D`
    Texture2d,
    /// `GL_TEXTURE_2D_ARRAY`
    Texture2dArray,
    /// `GL_TEXTURE_CUBE_MAP`
    CubeMap,
}

impl TextureKind {
    /// GL binding target
    pub const fn target(self) -> u32 {
        match self {
            Self::Texture2d => glow::TEXTURE_2D,
            Self::Texture2dArray => glow::TEXTURE_2D_ARRAY,
            Self::CubeMap => glow::TEXTURE_CUBE_MAP,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Texture2d => "texture",
            Self::Texture2dArray => "texture array",
            Self::CubeMap => "texture cube map",
        }
    }
}

/// Internal format, client format and component type of an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureFormat {
    /// Internal (GPU side) format
    pub internal: i32,
    /// Client pixel format
    pub format: u32,
    /// Client component type
    pub ty: u32,
}

impl TextureFormat {
    /// 8-bit RGBA
    pub const RGBA8: Self = Self::new(glow::RGBA as i32, glow::RGBA, glow::UNSIGNED_BYTE);
    /// 8-bit RGB
    pub const RGB8: Self = Self::new(glow::RGB as i32, glow::RGB, glow::UNSIGNED_BYTE);
    /// Unsigned integer RGBA, sampled without filtering
    pub const RGBA8UI: Self = Self::new(glow::RGBA8UI as i32, glow::RGBA_INTEGER, glow::UNSIGNED_BYTE);
    /// Half-float RGB
    pub const RGB16F: Self = Self::new(glow::RGB16F as i32, glow::RGB, glow::FLOAT);
    /// Float depth
    pub const DEPTH: Self = Self::new(glow::DEPTH_COMPONENT as i32, glow::DEPTH_COMPONENT, glow::FLOAT);

    /// Combine the three parts
    pub const fn new(internal: i32, format: u32, ty: u32) -> Self {
        Self { internal, format, ty }
    }
}

/// Cube map faces in upload order: back, down, front, right, left, up
const CUBE_FACES: [u32; 6] = [
    glow::TEXTURE_CUBE_MAP_POSITIVE_Z,
    glow::TEXTURE_CUBE_MAP_NEGATIVE_Y,
    glow::TEXTURE_CUBE_MAP_NEGATIVE_Z,
    glow::TEXTURE_CUBE_MAP_POSITIVE_X,
    glow::TEXTURE_CUBE_MAP_NEGATIVE_X,
    glow::TEXTURE_CUBE_MAP_POSITIVE_Y,
];

/// Pixel data of the six skybox faces
#[derive(Debug, Clone, Copy)]
pub struct CubeFaces<'a> {
    /// +Z
    pub back: &'a [u8],
    /// -Y
    pub down: &'a [u8],
    /// -Z
    pub front: &'a [u8],
    /// -X
    pub left: &'a [u8],
    /// +X
    pub right: &'a [u8],
    /// +Y
    pub up: &'a [u8],
}

/// A texture object of one [`TextureKind`]
pub struct Texture {
    gl: Rc<dyn GraphicsContext>,
    kind: TextureKind,
    id: Option<NativeId>,
    size: (u32, u32, u32),
}

impl Texture {
    /// Create an unallocated texture of `kind`
    pub fn new(gl: Rc<dyn GraphicsContext>, kind: TextureKind) -> Self {
        Self {
            gl,
            kind,
            id: None,
            size: (0, 0, 0),
        }
    }

    /// Activate texture unit `unit`
    pub fn activate(gl: &dyn GraphicsContext, unit: u32) {
        gl.active_texture(glow::TEXTURE0 + unit);
    }

    fn allocate(&mut self, expected: TextureKind) -> RenderResult<NativeId> {
        require_unallocated(self.id, self.kind.name(), "generate")?;
        if self.kind != expected {
            return Err(RenderError::InvalidInput(format!(
                "cannot generate a {} as a {}",
                self.kind.name(),
                expected.name()
            )));
        }
        let id = self
            .gl
            .create_texture()
            .map_err(|e| RenderError::CreationFailed(format!("Could not create {}: {e}", self.kind.name())))?;
        self.id = Some(id);
        self.gl.bind_texture(self.kind.target(), Some(id));
        Ok(id)
    }

    /// Allocate a 2D texture and upload `pixels` (or leave it undefined)
    pub fn generate_2d(
        &mut self,
        format: TextureFormat,
        width: u32,
        height: u32,
        pixels: Option<&[u8]>,
        mipmap: bool,
    ) -> RenderResult<()> {
        self.allocate(TextureKind::Texture2d)?;
        self.gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            format.internal,
            width as i32,
            height as i32,
            format.format,
            format.ty,
            pixels,
        );
        if mipmap {
            self.gl.generate_mipmap(glow::TEXTURE_2D);
        }
        self.gl.bind_texture(glow::TEXTURE_2D, None);
        self.size = (width, height, 1);
        Ok(())
    }

    /// Allocate a 2D array with `layers` undefined layers
    pub fn generate_array(&mut self, format: TextureFormat, width: u32, height: u32, layers: u32) -> RenderResult<()> {
        self.allocate(TextureKind::Texture2dArray)?;
        self.gl.tex_image_3d(
            glow::TEXTURE_2D_ARRAY,
            0,
            format.internal,
            width as i32,
            height as i32,
            layers as i32,
            format.format,
            format.ty,
            None,
        );
        self.gl.bind_texture(glow::TEXTURE_2D_ARRAY, None);
        self.size = (width, height, layers);
        Ok(())
    }

    /// Upload one full layer of a 2D array
    pub fn upload_layer(&self, layer: u32, format: TextureFormat, width: u32, height: u32, pixels: &[u8]) -> RenderResult<()> {
        self.bind()?;
        if layer >= self.size.2 {
            return Err(RenderError::InvalidInput(format!(
                "layer {layer} out of range for an array of {} layers",
                self.size.2
            )));
        }
        self.gl.tex_sub_image_3d(
            glow::TEXTURE_2D_ARRAY,
            0,
            [0, 0, layer as i32],
            [width as i32, height as i32, 1],
            format.format,
            format.ty,
            pixels,
        );
        Ok(())
    }

    /// Allocate a cube map from six square faces
    ///
    /// Filtering is linear and every axis clamps to edge.
    pub fn generate_cube_map(&mut self, format: TextureFormat, width: u32, height: u32, faces: &CubeFaces<'_>) -> RenderResult<()> {
        self.allocate(TextureKind::CubeMap)?;
        let data = [faces.back, faces.down, faces.front, faces.right, faces.left, faces.up];
        for (target, pixels) in CUBE_FACES.iter().zip(data) {
            self.gl.tex_image_2d(
                *target,
                0,
                format.internal,
                width as i32,
                height as i32,
                format.format,
                format.ty,
                Some(pixels),
            );
        }

        let target = glow::TEXTURE_CUBE_MAP;
        self.gl.tex_parameter_i32(target, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
        self.gl.tex_parameter_i32(target, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
        self.gl.tex_parameter_i32(target, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
        self.gl.tex_parameter_i32(target, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
        self.gl.tex_parameter_i32(target, glow::TEXTURE_WRAP_R, glow::CLAMP_TO_EDGE as i32);
        self.gl.bind_texture(target, None);
        self.size = (width, height, 6);
        Ok(())
    }

    /// Bind to this texture's target on the active unit
    pub fn bind(&self) -> RenderResult<()> {
        let id = require(self.id, self.kind.name(), "bind")?;
        self.gl.bind_texture(self.kind.target(), Some(id));
        Ok(())
    }

    /// Activate `unit` and bind there
    pub fn bind_to_unit(&self, unit: u32) -> RenderResult<()> {
        Self::activate(self.gl.as_ref(), unit);
        self.bind()
    }

    /// Bind, then set an integer parameter
    pub fn set_parameter(&self, parameter: u32, value: u32) -> RenderResult<()> {
        self.bind()?;
        self.gl
            .tex_parameter_i32(self.kind.target(), parameter, value as i32);
        Ok(())
    }

    /// Nearest filtering in both directions
    pub fn set_nearest_filtering(&self) -> RenderResult<()> {
        self.set_parameter(glow::TEXTURE_MIN_FILTER, glow::NEAREST)?;
        self.set_parameter(glow::TEXTURE_MAG_FILTER, glow::NEAREST)
    }

    /// Clamp to a constant border color
    pub fn set_border_color(&self, color: [f32; 4]) -> RenderResult<()> {
        self.set_parameter(glow::TEXTURE_WRAP_S, glow::CLAMP_TO_BORDER)?;
        self.set_parameter(glow::TEXTURE_WRAP_T, glow::CLAMP_TO_BORDER)?;
        self.gl
            .tex_parameter_f32_slice(self.kind.target(), glow::TEXTURE_BORDER_COLOR, &color);
        Ok(())
    }

    /// Rebuild the mip chain
    pub fn generate_mipmap(&self) -> RenderResult<()> {
        self.bind()?;
        self.gl.generate_mipmap(self.kind.target());
        Ok(())
    }

    /// Release the native texture
    pub fn destroy(&mut self) -> RenderResult<()> {
        let id = require(self.id, self.kind.name(), "destroy")?;
        self.gl.delete_texture(id);
        self.id = None;
        self.size = (0, 0, 0);
        Ok(())
    }

    /// Move the native texture out, leaving this object unallocated
    #[must_use]
    pub fn take(&mut self) -> Self {
        Self {
            gl: Rc::clone(&self.gl),
            kind: self.kind,
            id: self.id.take(),
            size: std::mem::take(&mut self.size),
        }
    }

    /// Target flavor
    pub const fn kind(&self) -> TextureKind {
        self.kind
    }

    /// `(width, height, layers)`
    pub const fn size(&self) -> (u32, u32, u32) {
        self.size
    }

    /// Native name, if allocated
    pub const fn id(&self) -> Option<NativeId> {
        self.id
    }

    /// True while allocated
    pub const fn valid(&self) -> bool {
        self.id.is_some()
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.gl.delete_texture(id);
        }
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("size", &self.size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{HeadlessContext, ObjectKind};

    fn context() -> (Rc<HeadlessContext>, Rc<dyn GraphicsContext>) {
        let headless = Rc::new(HeadlessContext::new());
        let gl: Rc<dyn GraphicsContext> = headless.clone();
        (headless, gl)
    }

    #[test]
    fn test_generate_twice_fails() {
        let (_, gl) = context();
        let mut texture = Texture::new(gl, TextureKind::Texture2d);
        texture
            .generate_2d(TextureFormat::RGBA8, 1, 1, Some(&[1, 2, 3, 4]), false)
            .unwrap();
        let second = texture.generate_2d(TextureFormat::RGBA8, 1, 1, None, false);
        assert!(matches!(second, Err(RenderError::AlreadyAllocated { .. })));
    }

    #[test]
    fn test_bind_before_generate_fails() {
        let (_, gl) = context();
        let texture = Texture::new(gl, TextureKind::CubeMap);
        assert!(matches!(
            texture.bind(),
            Err(RenderError::NotAllocated { object: "texture cube map", action: "bind" })
        ));
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let (headless, gl) = context();
        let mut texture = Texture::new(gl, TextureKind::Texture2dArray);
        let result = texture.generate_2d(TextureFormat::RGBA8, 1, 1, None, false);
        assert!(matches!(result, Err(RenderError::InvalidInput(_))));
        assert_eq!(headless.live_count(ObjectKind::Texture), 0);
    }

    #[test]
    fn test_array_layers_upload() {
        let (headless, gl) = context();
        let mut array = Texture::new(gl, TextureKind::Texture2dArray);
        array.generate_array(TextureFormat::RGBA8, 1, 1, 4).unwrap();
        array.upload_layer(2, TextureFormat::RGBA8, 1, 1, &[9, 9, 9, 9]).unwrap();
        assert!(array.upload_layer(4, TextureFormat::RGBA8, 1, 1, &[0; 4]).is_err());

        let data = headless.texture_data(array.id().unwrap()).unwrap();
        assert_eq!(&data[8..12], &[9, 9, 9, 9]);
        assert_eq!(array.size(), (1, 1, 4));
    }

    #[test]
    fn test_cube_map_face_order() {
        let (headless, gl) = context();
        let mut cube = Texture::new(gl, TextureKind::CubeMap);
        let faces = CubeFaces {
            back: &[0; 4],
            down: &[1; 4],
            front: &[2; 4],
            left: &[3; 4],
            right: &[4; 4],
            up: &[5; 4],
        };
        cube.generate_cube_map(TextureFormat::RGBA8, 1, 1, &faces).unwrap();

        // Stored per face in +X, -X, +Y, -Y, +Z, -Z order
        let data = headless.texture_data(cube.id().unwrap()).unwrap();
        let faces: Vec<u8> = data.chunks(4).map(|face| face[0]).collect();
        assert_eq!(faces, vec![4, 3, 5, 1, 0, 2]);
    }

    #[test]
    fn test_drop_releases_texture() {
        let (headless, gl) = context();
        {
            let mut texture = Texture::new(gl, TextureKind::Texture2d);
            texture.generate_2d(TextureFormat::RGB8, 2, 2, None, true).unwrap();
            assert_eq!(headless.live_count(ObjectKind::Texture), 1);
        }
        assert_eq!(headless.live_count(ObjectKind::Texture), 0);
    }
}
