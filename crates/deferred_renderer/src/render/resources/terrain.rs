//! Static splat-mapped terrain

use std::rc::Rc;

use crate::foundation::handle::Handle;
use crate::gl::{GraphicsContext, Texture, TextureFormat, TextureKind};
use crate::render::resources::{Image, Mesh, MeshData, PbrMaterialData};
use crate::render::{RenderError, RenderResult};

/// Layers allocated in every splat texture array
pub const SPLAT_LAYERS: u32 = 256;

/// Height map; its dimensions set the terrain size
#[derive(Debug, Clone)]
pub struct HeightMap {
    /// Height samples in the color channels
    pub image: Image,
}

/// Splat map: per-texel material ids plus the materials they select
#[derive(Debug, Clone)]
pub struct SplatMap {
    /// Per-texel material ids, uploaded as an unsigned integer texture
    pub terrain_map: Image,
    /// Materials indexed by the terrain map, one array layer each
    pub materials: Vec<PbrMaterialData>,
}

/// Displacement map
///
/// Accepted for interface completeness; the terrain shaders do not sample it.
#[derive(Debug, Clone)]
pub struct DisplacementMap {
    /// Displacement samples
    pub image: Image,
}

/// GPU resources of a terrain
#[derive(Debug)]
pub struct Terrain {
    /// Height map width in texels
    pub width: u32,
    /// Height map height in texels
    pub height: u32,
    /// Height texture, unit 0
    pub height_texture: Texture,
    /// Material id texture, unit 1
    pub terrain_map_texture: Texture,
    /// Albedo layers, unit 2
    pub albedo_array: Texture,
    /// Normal layers, unit 3
    pub normal_array: Texture,
    /// Packed metalness / roughness / ambient occlusion layers, unit 4
    pub metallic_roughness_ambient_occlusion_array: Texture,
    /// Grid of `(width - 1) × (height - 1)` cells
    pub mesh: Mesh,
}

/// Handle to a terrain
pub type TerrainHandle = Handle<Terrain>;

impl Terrain {
    /// Upload every texture and build the grid mesh
    pub fn new(
        gl: &Rc<dyn GraphicsContext>,
        height_map: &HeightMap,
        splat_map: &SplatMap,
        _displacement_map: &DisplacementMap,
    ) -> RenderResult<Self> {
        let width = height_map.image.width();
        let height = height_map.image.height();
        if width < 2 || height < 2 {
            return Err(RenderError::InvalidInput(format!(
                "terrain height map must be at least 2x2, got {width}x{height}"
            )));
        }
        let Some(first) = splat_map.materials.first() else {
            return Err(RenderError::InvalidInput("splat map has no materials".to_string()));
        };
        if splat_map.materials.len() > SPLAT_LAYERS as usize {
            return Err(RenderError::InvalidInput(format!(
                "splat map has {} materials, at most {SPLAT_LAYERS} fit",
                splat_map.materials.len()
            )));
        }

        for material in &splat_map.materials {
            material.validate()?;
        }

        let mut height_texture = Texture::new(Rc::clone(gl), TextureKind::Texture2d);
        height_texture.generate_2d(
            TextureFormat::RGBA8,
            width,
            height,
            Some(&rgba(&height_map.image)),
            true,
        )?;

        let terrain_map = &splat_map.terrain_map;
        let mut terrain_map_texture = Texture::new(Rc::clone(gl), TextureKind::Texture2d);
        terrain_map_texture.generate_2d(
            TextureFormat::RGBA8UI,
            terrain_map.width(),
            terrain_map.height(),
            Some(&rgba(terrain_map)),
            false,
        )?;
        terrain_map_texture.set_nearest_filtering()?;

        let albedo_array = layered(gl, &first.albedo, splat_map.materials.iter().map(|m| rgba(&m.albedo)))?;
        let normal_array = layered(gl, &first.normal, splat_map.materials.iter().map(|m| rgba(&m.normal)))?;
        let metallic_roughness_ambient_occlusion_array = layered(
            gl,
            &first.albedo,
            splat_map
                .materials
                .iter()
                .map(PbrMaterialData::packed_metallic_roughness_ambient_occlusion),
        )?;

        let mesh = Mesh::new(gl, &MeshData::grid(width - 1, height - 1), glow::STATIC_DRAW)?;

        log::debug!(
            "Created {width}x{height} terrain with {} splat materials",
            splat_map.materials.len()
        );

        Ok(Self {
            width,
            height,
            height_texture,
            terrain_map_texture,
            albedo_array,
            normal_array,
            metallic_roughness_ambient_occlusion_array,
            mesh,
        })
    }

    /// Bind the five terrain textures to units 0 through 4
    pub fn bind_textures(&self) -> RenderResult<()> {
        self.height_texture.bind_to_unit(0)?;
        self.terrain_map_texture.bind_to_unit(1)?;
        self.albedo_array.bind_to_unit(2)?;
        self.normal_array.bind_to_unit(3)?;
        self.metallic_roughness_ambient_occlusion_array.bind_to_unit(4)
    }
}

/// Allocate a [`SPLAT_LAYERS`]-deep array sized like `reference`, fill one
/// layer per item, then build mipmaps
fn layered(
    gl: &Rc<dyn GraphicsContext>,
    reference: &Image,
    layers: impl Iterator<Item = Vec<u8>>,
) -> RenderResult<Texture> {
    let (width, height) = (reference.width(), reference.height());
    let mut array = Texture::new(Rc::clone(gl), TextureKind::Texture2dArray);
    array.generate_array(TextureFormat::RGBA8, width, height, SPLAT_LAYERS)?;

    for (layer, pixels) in layers.enumerate() {
        if pixels.len() != width as usize * height as usize * 4 {
            return Err(RenderError::InvalidInput(format!(
                "splat layer {layer} does not match the {width}x{height} layer size"
            )));
        }
        array.upload_layer(layer as u32, TextureFormat::RGBA8, width, height, &pixels)?;
    }
    array.generate_mipmap()?;
    Ok(array)
}

/// Pixels expanded to RGBA
fn rgba(image: &Image) -> Vec<u8> {
    match image.format() {
        super::ImageFormat::Rgba => image.data().to_vec(),
        super::ImageFormat::Rgb => image
            .data()
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], u8::MAX])
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{HeadlessContext, ObjectKind};

    fn inputs(materials: usize) -> (HeightMap, SplatMap, DisplacementMap) {
        let material = PbrMaterialData::new(Image::solid(2, 2, [10; 4]), Image::solid(2, 2, [20; 4]));
        (
            HeightMap {
                image: Image::solid(5, 3, [0; 4]),
            },
            SplatMap {
                terrain_map: Image::solid(5, 3, [0; 4]),
                materials: vec![material; materials],
            },
            DisplacementMap {
                image: Image::solid(5, 3, [0; 4]),
            },
        )
    }

    #[test]
    fn test_terrain_resources() {
        let headless = Rc::new(HeadlessContext::new());
        let gl: Rc<dyn GraphicsContext> = headless.clone();
        let (height, splat, displacement) = inputs(2);

        let terrain = Terrain::new(&gl, &height, &splat, &displacement).unwrap();
        assert_eq!((terrain.width, terrain.height), (5, 3));
        assert_eq!(terrain.albedo_array.size(), (2, 2, SPLAT_LAYERS));
        assert_eq!(terrain.mesh.vertex_count(), 5 * 3);
        assert_eq!(terrain.mesh.index_count(), 4 * 2 * 6);
        assert_eq!(headless.live_count(ObjectKind::Texture), 5);
        assert_eq!(headless.errors_raised(), 0);

        drop(terrain);
        assert_eq!(headless.live_objects(), 0);
    }

    #[test]
    fn test_terrain_needs_a_material() {
        let gl: Rc<dyn GraphicsContext> = Rc::new(HeadlessContext::new());
        let (height, splat, displacement) = inputs(0);
        assert!(matches!(
            Terrain::new(&gl, &height, &splat, &displacement),
            Err(RenderError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_mismatched_layer_is_rejected() {
        let gl: Rc<dyn GraphicsContext> = Rc::new(HeadlessContext::new());
        let (height, mut splat, displacement) = inputs(1);
        splat.materials.push(PbrMaterialData::new(Image::solid(4, 4, [0; 4]), Image::solid(4, 4, [0; 4])));
        assert!(matches!(
            Terrain::new(&gl, &height, &splat, &displacement),
            Err(RenderError::InvalidInput(_))
        ));

        let (height, mut splat, displacement) = inputs(1);
        splat.materials[0].ambient_occlusion = Some(Image::solid(1, 2, [0; 4]));
        assert!(matches!(
            Terrain::new(&gl, &height, &splat, &displacement),
            Err(RenderError::InvalidInput(_))
        ));
    }
}
