//! Window and renderer settings read once at initialization

use serde::{Deserialize, Serialize};

use super::{Config, Properties};

/// Window creation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSettings {
    /// Requested window width in screen coordinates
    pub width: u32,
    /// Requested window height in screen coordinates
    pub height: u32,
    /// Window title
    pub title: String,
    /// Create on the primary monitor in fullscreen mode
    pub fullscreen: bool,
    /// Allow the user to resize the window
    pub resizable: bool,
    /// Start maximized
    pub maximized: bool,
    /// Synchronize buffer swaps with the display refresh
    pub vsync: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            title: "Ice Engine".to_string(),
            fullscreen: false,
            resizable: false,
            maximized: false,
            vsync: false,
        }
    }
}

impl Config for WindowSettings {}

impl WindowSettings {
    /// Read the `window.*` keys, falling back to the defaults
    pub fn from_properties(properties: &Properties) -> Self {
        let defaults = Self::default();
        Self {
            width: clamp_dimension(properties.get_int("window.width", i64::from(defaults.width))),
            height: clamp_dimension(properties.get_int("window.height", i64::from(defaults.height))),
            title: properties.get_string("window.title", &defaults.title),
            fullscreen: properties.get_bool("window.fullscreen", defaults.fullscreen),
            resizable: properties.get_bool("window.resizable", defaults.resizable),
            maximized: properties.get_bool("window.maximized", defaults.maximized),
            vsync: properties.get_bool("window.vsync", defaults.vsync),
        }
    }

    /// Set the window size
    #[must_use]
    pub const fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the window title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Enable or disable vsync
    #[must_use]
    pub const fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Enable or disable fullscreen
    #[must_use]
    pub const fn with_fullscreen(mut self, fullscreen: bool) -> Self {
        self.fullscreen = fullscreen;
        self
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!("window size must be non-zero, got {}x{}", self.width, self.height));
        }
        Ok(())
    }
}

/// Pipeline parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendererSettings {
    /// Edge length of the square shadow depth texture
    pub shadow_map_size: u32,
    /// Directory the file shader source reads from
    pub shader_directory: String,
    /// Check the native error state after every draw, not only at pass ends
    pub check_errors_per_draw: bool,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            shadow_map_size: 1024,
            shader_directory: "resources/shaders".to_string(),
            check_errors_per_draw: cfg!(debug_assertions),
        }
    }
}

impl Config for RendererSettings {}

impl RendererSettings {
    /// Read the `renderer.*` keys, falling back to the defaults
    pub fn from_properties(properties: &Properties) -> Self {
        let defaults = Self::default();
        Self {
            shadow_map_size: clamp_dimension(
                properties.get_int("renderer.shadow_map_size", i64::from(defaults.shadow_map_size)),
            ),
            shader_directory: properties.get_string("renderer.shader_directory", &defaults.shader_directory),
            check_errors_per_draw: properties
                .get_bool("renderer.check_errors_per_draw", defaults.check_errors_per_draw),
        }
    }

    /// Set the shadow map resolution
    #[must_use]
    pub const fn with_shadow_map_size(mut self, size: u32) -> Self {
        self.shadow_map_size = size;
        self
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), String> {
        if self.shadow_map_size == 0 || !self.shadow_map_size.is_power_of_two() {
            return Err(format!(
                "shadow map size must be a non-zero power of two, got {}",
                self.shadow_map_size
            ));
        }
        Ok(())
    }
}

fn clamp_dimension(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_defaults() {
        let settings = WindowSettings::from_properties(&Properties::new());
        assert_eq!(settings, WindowSettings::default());
        assert_eq!((settings.width, settings.height), (1024, 768));
        assert_eq!(settings.title, "Ice Engine");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_window_from_properties() {
        let properties = Properties::new()
            .with("window.width", 1280_i64)
            .with("window.height", 720_i64)
            .with("window.resizable", true)
            .with("window.title", "Scene");
        let settings = WindowSettings::from_properties(&properties);

        assert_eq!((settings.width, settings.height), (1280, 720));
        assert!(settings.resizable);
        assert!(!settings.fullscreen);
        assert_eq!(settings.title, "Scene");
    }

    #[test]
    fn test_negative_size_is_rejected() {
        let properties = Properties::new().with("window.width", -5_i64);
        let settings = WindowSettings::from_properties(&properties);
        assert_eq!(settings.width, 0);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_renderer_settings_validation() {
        assert!(RendererSettings::default().validate().is_ok());
        assert!(RendererSettings::default().with_shadow_map_size(1000).validate().is_err());
    }
}
