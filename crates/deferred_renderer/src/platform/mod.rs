//! Platform layer
//!
//! The renderer only needs a handful of things from its window: presenting,
//! draining translated events, the drawable size and cursor control. Those
//! sit behind [`Surface`]; [`Window`] implements it over glfw and
//! [`HeadlessSurface`] implements it for tests.

pub mod headless;
pub mod window;

pub use headless::HeadlessSurface;
pub use window::{translate_event, CursorTracker, Window, WindowError, WindowResult};

use crate::events::Event;

/// What the renderer needs from a window
pub trait Surface {
    /// Present the back buffer
    fn swap_buffers(&mut self);

    /// Drain pending events in arrival order
    fn poll_events(&mut self) -> Vec<Event>;

    /// Framebuffer size in pixels
    fn drawable_size(&self) -> (u32, u32);

    /// Whether the cursor is drawn over the window
    fn cursor_visible(&self) -> bool;

    /// Show or hide the cursor
    fn set_cursor_visible(&mut self, visible: bool);

    /// Hide and lock the cursor, reporting only relative motion
    fn set_mouse_relative_mode(&mut self, enabled: bool);

    /// Confine the cursor to the window
    fn set_window_grab(&mut self, grabbed: bool);
}
