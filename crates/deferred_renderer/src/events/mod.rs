//! Window and input events
//!
//! The platform layer translates native events into [`Event`] values. The
//! renderer drains them once per `process_events` call and pushes each one to
//! every registered [`EventListener`], in registration order.

use slotmap::{new_key_type, SlotMap};

use crate::input::{KeyCode, KeyMod, MouseButton};

/// Window event subtype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum WindowEventType {
    None,
    Shown,
    Hidden,
    Exposed,
    Moved,
    Resized,
    SizeChanged,
    Minimized,
    Maximized,
    Restored,
    Enter,
    Leave,
    FocusGained,
    FocusLost,
    Close,
    TakeFocus,
    HitTest,
    Unknown,
}

/// Pressed or released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonState {
    /// Key or button down
    Pressed,
    /// Key or button up
    Released,
}

/// Key identity carried by keyboard events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySym {
    /// Engine key code
    pub sym: KeyCode,
    /// Platform scancode
    pub scancode: i32,
    /// Modifiers held
    pub modifiers: KeyMod,
}

/// Wheel direction convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WheelDirection {
    /// Positive y scrolls away from the user
    Normal,
    /// Natural scrolling; deltas are inverted
    Flipped,
}

/// A translated window or input event
///
/// Timestamps are seconds since the platform layer started.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The application was asked to quit
    Quit {
        /// Event time
        timestamp: f64,
    },
    /// Window state change
    Window {
        /// What happened
        event_type: WindowEventType,
        /// Event time
        timestamp: f64,
        /// Window the event belongs to
        window_id: u32,
        /// First payload value (x or width)
        data1: i32,
        /// Second payload value (y or height)
        data2: i32,
    },
    /// Committed text input
    TextInput {
        /// Event time
        timestamp: f64,
        /// UTF-8 text
        text: String,
    },
    /// Key pressed
    KeyDown {
        /// Event time
        timestamp: f64,
        /// Key identity
        key_sym: KeySym,
        /// Always [`ButtonState::Pressed`]
        state: ButtonState,
        /// True for auto-repeat
        repeat: bool,
    },
    /// Key released
    KeyUp {
        /// Event time
        timestamp: f64,
        /// Key identity
        key_sym: KeySym,
        /// Always [`ButtonState::Released`]
        state: ButtonState,
        /// Always false
        repeat: bool,
    },
    /// Cursor moved
    MouseMotion {
        /// Event time
        timestamp: f64,
        /// Cursor x in window coordinates
        x: i32,
        /// Cursor y in window coordinates
        y: i32,
        /// Motion since the previous event
        xrel: i32,
        /// Motion since the previous event
        yrel: i32,
    },
    /// Mouse button pressed
    MouseButtonDown {
        /// Event time
        timestamp: f64,
        /// Button
        button: MouseButton,
        /// Always [`ButtonState::Pressed`]
        state: ButtonState,
        /// Click count
        clicks: u8,
        /// Cursor x at the press
        x: i32,
        /// Cursor y at the press
        y: i32,
    },
    /// Mouse button released
    MouseButtonUp {
        /// Event time
        timestamp: f64,
        /// Button
        button: MouseButton,
        /// Always [`ButtonState::Released`]
        state: ButtonState,
        /// Click count
        clicks: u8,
        /// Cursor x at the release
        x: i32,
        /// Cursor y at the release
        y: i32,
    },
    /// Wheel scrolled
    MouseWheel {
        /// Event time
        timestamp: f64,
        /// Horizontal scroll
        x: i32,
        /// Vertical scroll
        y: i32,
        /// Direction convention
        direction: WheelDirection,
    },
    /// An event with no engine translation
    Unknown {
        /// Event time
        timestamp: f64,
    },
}

impl Event {
    /// Event time in seconds
    pub const fn timestamp(&self) -> f64 {
        match self {
            Self::Quit { timestamp }
            | Self::Window { timestamp, .. }
            | Self::TextInput { timestamp, .. }
            | Self::KeyDown { timestamp, .. }
            | Self::KeyUp { timestamp, .. }
            | Self::MouseMotion { timestamp, .. }
            | Self::MouseButtonDown { timestamp, .. }
            | Self::MouseButtonUp { timestamp, .. }
            | Self::MouseWheel { timestamp, .. }
            | Self::Unknown { timestamp } => *timestamp,
        }
    }
}

/// Receives every processed event
pub trait EventListener {
    /// Handle one event
    fn process_event(&mut self, event: &Event);
}

new_key_type! {
    /// Registration id of a listener
    pub struct ListenerId;
}

/// Registered listeners, notified in registration order
#[derive(Default)]
pub struct EventListeners {
    listeners: SlotMap<ListenerId, Box<dyn EventListener>>,
    order: Vec<ListenerId>,
}

impl EventListeners {
    /// No listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener`
    pub fn add(&mut self, listener: Box<dyn EventListener>) -> ListenerId {
        let id = self.listeners.insert(listener);
        self.order.push(id);
        id
    }

    /// Unregister; false if `id` was not registered
    pub fn remove(&mut self, id: ListenerId) -> bool {
        if self.listeners.remove(id).is_none() {
            return false;
        }
        self.order.retain(|registered| *registered != id);
        true
    }

    /// Push `event` to every listener
    pub fn dispatch(&mut self, event: &Event) {
        for id in &self.order {
            if let Some(listener) = self.listeners.get_mut(*id) {
                listener.process_event(event);
            }
        }
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListeners")
            .field("count", &self.listeners.len())
            .finish()
    }
}
