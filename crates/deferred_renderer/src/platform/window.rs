//! Window management using GLFW
//!
//! Creates an OpenGL 3.3 core context and translates glfw events into
//! [`Event`] values.

use std::ffi::c_void;

use glfw::Context;
use thiserror::Error;

use super::Surface;
use crate::config::WindowSettings;
use crate::events::{ButtonState, Event, KeySym, WheelDirection, WindowEventType};
use crate::input::{key_from_glfw, modifiers_from_glfw, mouse_button_from_glfw};

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// glfw could not start
    #[error("GLFW initialization failed")]
    InitializationFailed,

    /// glfw refused to create the window or its context
    #[error("Window creation failed")]
    CreationFailed,

    /// Settings failed validation
    #[error("Invalid window settings: {0}")]
    InvalidSettings(String),
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// glfw has no window ids; every event reports this one
const WINDOW_ID: u32 = 1;

/// Last known cursor position, for relative motion and button coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CursorTracker {
    position: Option<(f64, f64)>,
}

impl CursorTracker {
    fn coordinates(&self) -> (i32, i32) {
        self.position
            .map_or((0, 0), |(x, y)| (x.round() as i32, y.round() as i32))
    }
}

const fn window_event(event_type: WindowEventType, timestamp: f64, data1: i32, data2: i32) -> Event {
    Event::Window {
        event_type,
        timestamp,
        window_id: WINDOW_ID,
        data1,
        data2,
    }
}

/// Translate one glfw event, appending the result to `out`
///
/// A close request yields a window `Close` followed by `Quit`.
pub fn translate_event(tracker: &mut CursorTracker, timestamp: f64, event: glfw::WindowEvent, out: &mut Vec<Event>) {
    use glfw::WindowEvent as E;

    let translated = match event {
        E::Pos(x, y) => window_event(WindowEventType::Moved, timestamp, x, y),
        E::Size(width, height) => window_event(WindowEventType::Resized, timestamp, width, height),
        E::FramebufferSize(width, height) => window_event(WindowEventType::SizeChanged, timestamp, width, height),
        E::Refresh => window_event(WindowEventType::Exposed, timestamp, 0, 0),
        E::Focus(true) => window_event(WindowEventType::FocusGained, timestamp, 0, 0),
        E::Focus(false) => window_event(WindowEventType::FocusLost, timestamp, 0, 0),
        E::Iconify(true) => window_event(WindowEventType::Minimized, timestamp, 0, 0),
        E::Maximize(true) => window_event(WindowEventType::Maximized, timestamp, 0, 0),
        E::Iconify(false) | E::Maximize(false) => window_event(WindowEventType::Restored, timestamp, 0, 0),
        E::CursorEnter(true) => window_event(WindowEventType::Enter, timestamp, 0, 0),
        E::CursorEnter(false) => window_event(WindowEventType::Leave, timestamp, 0, 0),
        E::Close => {
            out.push(window_event(WindowEventType::Close, timestamp, 0, 0));
            Event::Quit { timestamp }
        }
        E::Key(key, scancode, action, modifiers) => {
            let key_sym = KeySym {
                sym: key_from_glfw(key),
                scancode,
                modifiers: modifiers_from_glfw(modifiers),
            };
            match action {
                glfw::Action::Release => Event::KeyUp {
                    timestamp,
                    key_sym,
                    state: ButtonState::Released,
                    repeat: false,
                },
                glfw::Action::Press | glfw::Action::Repeat => Event::KeyDown {
                    timestamp,
                    key_sym,
                    state: ButtonState::Pressed,
                    repeat: action == glfw::Action::Repeat,
                },
            }
        }
        E::Char(character) => Event::TextInput {
            timestamp,
            text: character.to_string(),
        },
        E::CursorPos(x, y) => {
            let (last_x, last_y) = tracker.position.unwrap_or((x, y));
            tracker.position = Some((x, y));
            Event::MouseMotion {
                timestamp,
                x: x.round() as i32,
                y: y.round() as i32,
                xrel: (x - last_x).round() as i32,
                yrel: (y - last_y).round() as i32,
            }
        }
        E::MouseButton(button, action, _) => {
            let button = mouse_button_from_glfw(button);
            let (x, y) = tracker.coordinates();
            if action == glfw::Action::Release {
                Event::MouseButtonUp {
                    timestamp,
                    button,
                    state: ButtonState::Released,
                    clicks: 1,
                    x,
                    y,
                }
            } else {
                Event::MouseButtonDown {
                    timestamp,
                    button,
                    state: ButtonState::Pressed,
                    clicks: 1,
                    x,
                    y,
                }
            }
        }
        E::Scroll(x, y) => Event::MouseWheel {
            timestamp,
            x: x.round() as i32,
            y: y.round() as i32,
            direction: WheelDirection::Normal,
        },
        _ => Event::Unknown { timestamp },
    };
    out.push(translated);
}

/// GLFW window owning the OpenGL context
pub struct Window {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
    tracker: CursorTracker,
    cursor_visible: bool,
    relative_mouse: bool,
    grabbed: bool,
}

impl Window {
    /// Create the window and make its OpenGL 3.3 core context current
    pub fn new(settings: &WindowSettings) -> WindowResult<Self> {
        settings.validate().map_err(WindowError::InvalidSettings)?;

        let mut glfw = glfw::init(glfw::fail_on_errors).map_err(|_| WindowError::InitializationFailed)?;

        glfw.window_hint(glfw::WindowHint::ContextVersion(3, 3));
        glfw.window_hint(glfw::WindowHint::OpenGlProfile(glfw::OpenGlProfileHint::Core));
        glfw.window_hint(glfw::WindowHint::OpenGlForwardCompat(true));
        glfw.window_hint(glfw::WindowHint::DoubleBuffer(true));
        glfw.window_hint(glfw::WindowHint::Resizable(settings.resizable));
        glfw.window_hint(glfw::WindowHint::Maximized(settings.maximized));

        let (mut window, events) = if settings.fullscreen {
            glfw.with_primary_monitor(|glfw, monitor| {
                let mode = monitor.map_or(glfw::WindowMode::Windowed, |monitor| glfw::WindowMode::FullScreen(monitor));
                glfw.create_window(settings.width, settings.height, &settings.title, mode)
            })
        } else {
            glfw.create_window(settings.width, settings.height, &settings.title, glfw::WindowMode::Windowed)
        }
        .ok_or(WindowError::CreationFailed)?;

        window.make_current();
        glfw.set_swap_interval(if settings.vsync {
            glfw::SwapInterval::Sync(1)
        } else {
            glfw::SwapInterval::None
        });

        window.set_key_polling(true);
        window.set_char_polling(true);
        window.set_cursor_pos_polling(true);
        window.set_cursor_enter_polling(true);
        window.set_mouse_button_polling(true);
        window.set_scroll_polling(true);
        window.set_pos_polling(true);
        window.set_size_polling(true);
        window.set_framebuffer_size_polling(true);
        window.set_refresh_polling(true);
        window.set_focus_polling(true);
        window.set_iconify_polling(true);
        window.set_maximize_polling(true);
        window.set_close_polling(true);

        log::info!(
            "Created {}x{} window '{}'{}",
            settings.width,
            settings.height,
            settings.title,
            if settings.fullscreen { " (fullscreen)" } else { "" }
        );

        Ok(Self {
            glfw,
            window,
            events,
            tracker: CursorTracker::default(),
            cursor_visible: true,
            relative_mouse: false,
            grabbed: false,
        })
    }

    /// Resolve an OpenGL entry point through the current context
    pub fn get_proc_address(&mut self, name: &str) -> *const c_void {
        self.window.get_proc_address(name)
    }

    /// True once the user asked to close the window
    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    /// Set or clear the close flag
    pub fn set_should_close(&mut self, should_close: bool) {
        self.window.set_should_close(should_close);
    }

    /// Window size in screen coordinates
    pub fn size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_size();
        (width.max(0) as u32, height.max(0) as u32)
    }

    // glfw can only confine the cursor by disabling it
    fn apply_cursor_mode(&mut self) {
        let mode = if self.relative_mouse || self.grabbed {
            glfw::CursorMode::Disabled
        } else if self.cursor_visible {
            glfw::CursorMode::Normal
        } else {
            glfw::CursorMode::Hidden
        };
        self.window.set_cursor_mode(mode);
    }
}

impl Surface for Window {
    fn swap_buffers(&mut self) {
        self.window.swap_buffers();
    }

    fn poll_events(&mut self) -> Vec<Event> {
        self.glfw.poll_events();
        let mut out = Vec::new();
        for (timestamp, event) in glfw::flush_messages(&self.events) {
            translate_event(&mut self.tracker, timestamp, event, &mut out);
        }
        out
    }

    fn drawable_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (width.max(0) as u32, height.max(0) as u32)
    }

    fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        self.cursor_visible = visible;
        self.apply_cursor_mode();
    }

    fn set_mouse_relative_mode(&mut self, enabled: bool) {
        self.relative_mouse = enabled;
        self.apply_cursor_mode();
    }

    fn set_window_grab(&mut self, grabbed: bool) {
        self.grabbed = grabbed;
        self.apply_cursor_mode();
    }
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("size", &self.size())
            .field("cursor_visible", &self.cursor_visible)
            .field("relative_mouse", &self.relative_mouse)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{KeyCode, KeyMod, MouseButton};

    fn translate(tracker: &mut CursorTracker, event: glfw::WindowEvent) -> Vec<Event> {
        let mut out = Vec::new();
        translate_event(tracker, 0.5, event, &mut out);
        out
    }

    #[test]
    fn test_key_events_carry_symbol_and_repeat() {
        let mut tracker = CursorTracker::default();
        let events = translate(
            &mut tracker,
            glfw::WindowEvent::Key(glfw::Key::W, 17, glfw::Action::Repeat, glfw::Modifiers::Shift),
        );

        assert_eq!(
            events,
            vec![Event::KeyDown {
                timestamp: 0.5,
                key_sym: KeySym {
                    sym: KeyCode::W,
                    scancode: 17,
                    modifiers: KeyMod::SHIFT,
                },
                state: ButtonState::Pressed,
                repeat: true,
            }]
        );
    }

    #[test]
    fn test_motion_is_relative_to_last_position() {
        let mut tracker = CursorTracker::default();
        let first = translate(&mut tracker, glfw::WindowEvent::CursorPos(10.0, 20.0));
        assert!(matches!(first[0], Event::MouseMotion { xrel: 0, yrel: 0, .. }));

        let second = translate(&mut tracker, glfw::WindowEvent::CursorPos(13.0, 15.0));
        assert!(matches!(second[0], Event::MouseMotion { x: 13, y: 15, xrel: 3, yrel: -5, .. }));

        let press = translate(
            &mut tracker,
            glfw::WindowEvent::MouseButton(glfw::MouseButton::Button2, glfw::Action::Press, glfw::Modifiers::empty()),
        );
        assert!(matches!(
            press[0],
            Event::MouseButtonDown { button: MouseButton::Right, x: 13, y: 15, clicks: 1, .. }
        ));
    }

    #[test]
    fn test_close_also_quits() {
        let mut tracker = CursorTracker::default();
        let events = translate(&mut tracker, glfw::WindowEvent::Close);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::Window { event_type: WindowEventType::Close, .. }));
        assert_eq!(events[1], Event::Quit { timestamp: 0.5 });
    }

    #[test]
    fn test_window_state_changes() {
        let mut tracker = CursorTracker::default();
        let resized = translate(&mut tracker, glfw::WindowEvent::FramebufferSize(800, 600));
        assert!(matches!(
            resized[0],
            Event::Window { event_type: WindowEventType::SizeChanged, data1: 800, data2: 600, window_id: WINDOW_ID, .. }
        ));

        let restored = translate(&mut tracker, glfw::WindowEvent::Iconify(false));
        assert!(matches!(restored[0], Event::Window { event_type: WindowEventType::Restored, .. }));
    }
}
