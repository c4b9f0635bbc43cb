//! Shader source providers
//!
//! The pipeline asks for its built-in programs by file name
//! (`lighting.frag`, `skybox.vert`, ...). A [`FileShaderSource`] reads them
//! from a directory at startup; an [`EmbeddedShaderSource`] serves copies
//! compiled into the crate so a renderer can start without any files on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::render::{RenderError, RenderResult};

/// Resolves a logical shader name to GLSL text
pub trait ShaderSource {
    /// Full source text of `name`, or [`RenderError::ShaderNotFound`]
    fn load(&self, name: &str) -> RenderResult<String>;
}

/// Reads shaders from a directory
#[derive(Debug, Clone)]
pub struct FileShaderSource {
    directory: PathBuf,
}

impl FileShaderSource {
    /// Serve files under `directory`
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Directory shaders are read from
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl ShaderSource for FileShaderSource {
    fn load(&self, name: &str) -> RenderResult<String> {
        let path = self.directory.join(name);
        std::fs::read_to_string(&path).map_err(|e| {
            log::debug!("Failed to read shader {}: {e}", path.display());
            RenderError::ShaderNotFound(name.to_string())
        })
    }
}

/// Built-in shader name and source pairs
const BUILT_IN: [(&str, &str); 12] = [
    ("line.vert", include_str!("../../resources/shaders/line.vert")),
    ("line.frag", include_str!("../../resources/shaders/line.frag")),
    ("shadow_mapping.vert", include_str!("../../resources/shaders/shadow_mapping.vert")),
    ("shadow_mapping.frag", include_str!("../../resources/shaders/shadow_mapping.frag")),
    (
        "deferred_lighting_geometry_pass.vert",
        include_str!("../../resources/shaders/deferred_lighting_geometry_pass.vert"),
    ),
    (
        "deferred_lighting_geometry_pass.frag",
        include_str!("../../resources/shaders/deferred_lighting_geometry_pass.frag"),
    ),
    (
        "deferred_lighting_terrain_geometry_pass.vert",
        include_str!("../../resources/shaders/deferred_lighting_terrain_geometry_pass.vert"),
    ),
    (
        "deferred_lighting_terrain_geometry_pass.frag",
        include_str!("../../resources/shaders/deferred_lighting_terrain_geometry_pass.frag"),
    ),
    ("lighting.vert", include_str!("../../resources/shaders/lighting.vert")),
    ("lighting.frag", include_str!("../../resources/shaders/lighting.frag")),
    ("skybox.vert", include_str!("../../resources/shaders/skybox.vert")),
    ("skybox.frag", include_str!("../../resources/shaders/skybox.frag")),
];

/// Serves the built-in shaders, optionally shadowed by in-memory overrides
#[derive(Debug, Clone, Default)]
pub struct EmbeddedShaderSource {
    overrides: HashMap<String, String>,
}

impl EmbeddedShaderSource {
    /// Built-in shaders only
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace (or add) the source served for `name`
    #[must_use]
    pub fn with_override(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.overrides.insert(name.into(), source.into());
        self
    }

    /// Names of the built-in shaders
    pub fn names() -> impl Iterator<Item = &'static str> {
        BUILT_IN.iter().map(|(name, _)| *name)
    }
}

impl ShaderSource for EmbeddedShaderSource {
    fn load(&self, name: &str) -> RenderResult<String> {
        if let Some(source) = self.overrides.get(name) {
            return Ok(source.clone());
        }
        BUILT_IN
            .iter()
            .find(|(built_in, _)| *built_in == name)
            .map(|(_, source)| (*source).to_string())
            .ok_or_else(|| RenderError::ShaderNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_built_in_is_glsl_330() {
        let source = EmbeddedShaderSource::new();
        for name in EmbeddedShaderSource::names() {
            let text = source.load(name).unwrap();
            assert!(text.starts_with("#version 330 core"), "{name}");
        }
    }

    #[test]
    fn test_unknown_name_is_not_found() {
        let source = EmbeddedShaderSource::new();
        assert!(matches!(
            source.load("missing.frag"),
            Err(RenderError::ShaderNotFound(name)) if name == "missing.frag"
        ));
    }

    #[test]
    fn test_override_shadows_built_in() {
        let source = EmbeddedShaderSource::new().with_override("line.frag", "custom");
        assert_eq!(source.load("line.frag").unwrap(), "custom");
        assert!(source.load("line.vert").unwrap().contains("projectionMatrix"));
    }

    #[test]
    fn test_file_source_reads_directory() {
        let directory = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("resources/shaders");
        let source = FileShaderSource::new(&directory);
        assert_eq!(
            source.load("skybox.frag").unwrap(),
            EmbeddedShaderSource::new().load("skybox.frag").unwrap()
        );
        assert!(matches!(source.load("nope.vert"), Err(RenderError::ShaderNotFound(_))));
    }
}
