//! PBR materials
//!
//! A [`Material`] owns three textures: albedo, normal, and a packed texture
//! whose red, green and blue channels hold metalness, roughness and ambient
//! occlusion. Missing source channels fall back to [`DEFAULT_CHANNEL_VALUE`].

use std::rc::Rc;

use crate::gl::{GraphicsContext, Texture, TextureFormat, TextureKind};
use crate::render::resources::Image;
use crate::render::{RenderError, RenderResult};

/// Packed channel value used when a source image is absent
pub const DEFAULT_CHANNEL_VALUE: u8 = 127;

/// Source images of a PBR material
///
/// Metalness, roughness and ambient occlusion are grey-scale maps; each
/// packed channel is the average of the source's color channels.
#[derive(Debug, Clone)]
pub struct PbrMaterialData {
    /// Base color
    pub albedo: Image,
    /// Tangent-space normal map
    pub normal: Image,
    /// Metalness map
    pub metalness: Option<Image>,
    /// Roughness map
    pub roughness: Option<Image>,
    /// Ambient occlusion map
    pub ambient_occlusion: Option<Image>,
}

impl PbrMaterialData {
    /// Material with only albedo and normal maps
    pub const fn new(albedo: Image, normal: Image) -> Self {
        Self {
            albedo,
            normal,
            metalness: None,
            roughness: None,
            ambient_occlusion: None,
        }
    }

    /// Set the metalness map
    #[must_use]
    pub fn with_metalness(mut self, image: Image) -> Self {
        self.metalness = Some(image);
        self
    }

    /// Set the roughness map
    #[must_use]
    pub fn with_roughness(mut self, image: Image) -> Self {
        self.roughness = Some(image);
        self
    }

    /// Set the ambient occlusion map
    #[must_use]
    pub fn with_ambient_occlusion(mut self, image: Image) -> Self {
        self.ambient_occlusion = Some(image);
        self
    }

    /// Fail when a present metalness, roughness or ambient occlusion map
    /// is not sized like the albedo map
    pub fn validate(&self) -> RenderResult<()> {
        let (width, height) = (self.albedo.width(), self.albedo.height());
        let maps = [
            ("metalness", &self.metalness),
            ("roughness", &self.roughness),
            ("ambient occlusion", &self.ambient_occlusion),
        ];
        for (name, map) in maps {
            let Some(map) = map else { continue };
            if map.width() != width || map.height() != height {
                return Err(RenderError::InvalidInput(format!(
                    "{name} map is {}x{}, albedo is {width}x{height}",
                    map.width(),
                    map.height()
                )));
            }
        }
        Ok(())
    }

    /// RGBA pixels sized like the albedo map: metalness, roughness,
    /// ambient occlusion, zero
    pub fn packed_metallic_roughness_ambient_occlusion(&self) -> Vec<u8> {
        let pixel_count = self.albedo.width() as usize * self.albedo.height() as usize;
        let mut packed = vec![0; pixel_count * 4];

        let sources = [&self.metalness, &self.roughness, &self.ambient_occlusion];
        for (channel, source) in sources.into_iter().enumerate() {
            let mut values = source.iter().flat_map(Image::luminance);
            for pixel in packed.chunks_exact_mut(4) {
                pixel[channel] = values.next().unwrap_or(DEFAULT_CHANNEL_VALUE);
            }
        }
        packed
    }
}

/// Uploaded material textures
#[derive(Debug)]
pub struct Material {
    /// Albedo texture, unit 0 in the geometry pass
    pub albedo: Texture,
    /// Normal texture, unit 1
    pub normal: Texture,
    /// Packed metalness / roughness / ambient occlusion texture, unit 2
    pub metallic_roughness_ambient_occlusion: Texture,
}

impl Material {
    /// Upload the three textures of `data`, each with mipmaps
    ///
    /// Fails with `InvalidInput` before anything is uploaded when a present
    /// map's size differs from the albedo's.
    pub fn new(gl: &Rc<dyn GraphicsContext>, data: &PbrMaterialData) -> RenderResult<Self> {
        data.validate()?;
        let albedo = upload(gl, &data.albedo)?;
        let normal = upload(gl, &data.normal)?;

        let packed = data.packed_metallic_roughness_ambient_occlusion();
        let mut metallic_roughness_ambient_occlusion = Texture::new(Rc::clone(gl), TextureKind::Texture2d);
        metallic_roughness_ambient_occlusion.generate_2d(
            TextureFormat::RGBA8,
            data.albedo.width(),
            data.albedo.height(),
            Some(&packed),
            true,
        )?;

        Ok(Self {
            albedo,
            normal,
            metallic_roughness_ambient_occlusion,
        })
    }

    /// Bind albedo, normal and packed textures to units 0, 1 and 2
    pub fn bind(&self) -> RenderResult<()> {
        self.albedo.bind_to_unit(0)?;
        self.normal.bind_to_unit(1)?;
        self.metallic_roughness_ambient_occlusion.bind_to_unit(2)
    }
}

/// Upload an image as a mipmapped 2D texture in its own channel layout
pub(crate) fn upload(gl: &Rc<dyn GraphicsContext>, image: &Image) -> RenderResult<Texture> {
    let mut texture = Texture::new(Rc::clone(gl), TextureKind::Texture2d);
    texture.generate_2d(
        image.format().texture_format(),
        image.width(),
        image.height(),
        Some(image.data()),
        true,
    )?;
    Ok(texture)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{HeadlessContext, ObjectKind};

    #[test]
    fn test_missing_channels_use_default() {
        let data = PbrMaterialData::new(Image::solid(2, 2, [255; 4]), Image::solid(2, 2, [128, 128, 255, 255]));
        let packed = data.packed_metallic_roughness_ambient_occlusion();

        assert_eq!(packed.len(), 2 * 2 * 4);
        for pixel in packed.chunks_exact(4) {
            assert_eq!(pixel, &[127, 127, 127, 0]);
        }
    }

    #[test]
    fn test_present_channels_are_averaged() {
        let data = PbrMaterialData::new(Image::solid(1, 1, [0; 4]), Image::solid(1, 1, [0; 4]))
            .with_metalness(Image::solid(1, 1, [30, 60, 90, 255]))
            .with_ambient_occlusion(Image::solid(1, 1, [255, 255, 255, 0]));

        assert_eq!(data.packed_metallic_roughness_ambient_occlusion(), vec![60, 127, 255, 0]);
    }

    #[test]
    fn test_mismatched_map_size_is_rejected() {
        let headless = Rc::new(HeadlessContext::new());
        let gl: Rc<dyn GraphicsContext> = headless.clone();
        let data = PbrMaterialData::new(Image::solid(2, 2, [0; 4]), Image::solid(2, 2, [0; 4]))
            .with_metalness(Image::solid(1, 1, [200; 4]));

        assert!(matches!(Material::new(&gl, &data), Err(RenderError::InvalidInput(_))));
        assert_eq!(headless.live_count(ObjectKind::Texture), 0);

        let wide = PbrMaterialData::new(Image::solid(2, 2, [0; 4]), Image::solid(2, 2, [0; 4]))
            .with_roughness(Image::solid(4, 1, [90; 4]));
        assert!(matches!(wide.validate(), Err(RenderError::InvalidInput(_))));
    }

    #[test]
    fn test_material_without_pbr_maps_uploads() {
        let headless = Rc::new(HeadlessContext::new());
        let gl: Rc<dyn GraphicsContext> = headless.clone();
        let data = PbrMaterialData::new(Image::solid(4, 4, [200; 4]), Image::solid(4, 4, [128; 4]));

        let material = Material::new(&gl, &data).unwrap();
        let packed = headless
            .texture_data(material.metallic_roughness_ambient_occlusion.id().unwrap())
            .unwrap();
        assert_eq!(packed.len(), 4 * 4 * 4);
        assert!(packed.chunks_exact(4).all(|p| p == [127, 127, 127, 0]));
        assert_eq!(headless.errors_raised(), 0);
    }
}
