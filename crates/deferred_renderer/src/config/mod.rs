//! Configuration system
//!
//! [`Config`] gives any serde type file persistence in TOML or RON.
//! [`Properties`] is the typed key-value reader the renderer consults once at
//! start-up; keys are dotted paths into nested tables (`window.width`).

pub mod settings;

use std::collections::BTreeMap;

pub use serde::{Deserialize, Serialize};
pub use settings::{RendererSettings, WindowSettings};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        // Try different formats
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// A single configuration value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Boolean flag
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Text
    String(String),
    /// Nested table
    Table(BTreeMap<String, PropertyValue>),
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Typed key-value store read with fall-back defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties {
    values: BTreeMap<String, PropertyValue>,
}

impl Config for Properties {}

impl Properties {
    /// Create an empty property set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse properties from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parse properties from RON text
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        ron::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Set `key`, creating intermediate tables along the dotted path
    ///
    /// A scalar sitting where a table is needed is replaced.
    pub fn set(&mut self, key: &str, value: impl Into<PropertyValue>) {
        let mut segments: Vec<&str> = key.split('.').collect();
        let Some(last) = segments.pop() else {
            return;
        };

        let mut table = &mut self.values;
        for segment in segments {
            let entry = table
                .entry(segment.to_string())
                .or_insert_with(|| PropertyValue::Table(BTreeMap::new()));
            if !matches!(entry, PropertyValue::Table(_)) {
                *entry = PropertyValue::Table(BTreeMap::new());
            }
            let PropertyValue::Table(next) = entry else {
                return;
            };
            table = next;
        }
        table.insert(last.to_string(), value.into());
    }

    /// Builder form of [`Properties::set`]
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Raw value at `key`
    ///
    /// A literal dotted key at the root wins over a nested path.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        if let Some(value) = self.values.get(key) {
            return Some(value);
        }

        let mut segments = key.split('.');
        let mut current = self.values.get(segments.next()?)?;
        for segment in segments {
            match current {
                PropertyValue::Table(table) => current = table.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Integer at `key`, or `default` when missing or of another type
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.get(key) {
            Some(PropertyValue::Int(value)) => *value,
            Some(other) => {
                log::warn!("Property '{key}' is not an integer ({other:?}), using {default}");
                default
            }
            None => default,
        }
    }

    /// Float at `key`; integers are widened
    pub fn get_float(&self, key: &str, default: f64) -> f64 {
        match self.get(key) {
            Some(PropertyValue::Float(value)) => *value,
            Some(PropertyValue::Int(value)) => *value as f64,
            Some(other) => {
                log::warn!("Property '{key}' is not a number ({other:?}), using {default}");
                default
            }
            None => default,
        }
    }

    /// Boolean at `key`
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(PropertyValue::Bool(value)) => *value,
            Some(other) => {
                log::warn!("Property '{key}' is not a boolean ({other:?}), using {default}");
                default
            }
            None => default,
        }
    }

    /// String at `key`
    pub fn get_string(&self, key: &str, default: &str) -> String {
        match self.get(key) {
            Some(PropertyValue::String(value)) => value.clone(),
            Some(other) => {
                log::warn!("Property '{key}' is not a string ({other:?}), using '{default}'");
                default.to_string()
            }
            None => default.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_missing() {
        let properties = Properties::new();
        assert_eq!(properties.get_int("window.width", 1024), 1024);
        assert!(!properties.get_bool("window.vsync", false));
        assert_eq!(properties.get_string("window.title", "Ice Engine"), "Ice Engine");
    }

    #[test]
    fn test_nested_toml_lookup() {
        let properties = Properties::from_toml_str(
            r#"
            [window]
            width = 800
            title = "Demo"
            vsync = true
            scale = 1.5
            "#,
        )
        .unwrap();

        assert_eq!(properties.get_int("window.width", 0), 800);
        assert_eq!(properties.get_string("window.title", ""), "Demo");
        assert!(properties.get_bool("window.vsync", false));
        assert!((properties.get_float("window.scale", 0.0) - 1.5).abs() < f64::EPSILON);
        assert!((properties.get_float("window.width", 0.0) - 800.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_wrong_type_falls_back() {
        let properties = Properties::new().with("window.width", "wide");
        assert_eq!(properties.get_int("window.width", 640), 640);
    }

    #[test]
    fn test_set_builds_tables() {
        let mut properties = Properties::new();
        properties.set("window.height", 600_i64);
        properties.set("window.fullscreen", true);

        assert_eq!(properties.get_int("window.height", 0), 600);
        assert!(properties.get_bool("window.fullscreen", false));
        assert!(matches!(properties.get("window"), Some(PropertyValue::Table(_))));
    }

    #[test]
    fn test_ron_round_trip() {
        let properties = Properties::new()
            .with("window.width", 320_i64)
            .with("window.title", "ron");
        let text = ron::to_string(&properties).unwrap();
        let parsed = Properties::from_ron_str(&text).unwrap();
        assert_eq!(parsed, properties);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = Properties::load_from_file("settings.ini");
        assert!(matches!(result, Err(ConfigError::Io(_) | ConfigError::UnsupportedFormat(_))));
    }
}
