//! Foundation module - Core utilities and types
//!
//! - Generational handles and registries
//! - Math types and transform helpers
//! - Logging utilities

pub mod handle;
pub mod logging;
pub mod math;

pub use handle::{Handle, Registry, StaleHandle};
