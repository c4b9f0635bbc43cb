//! Window stand-in for tests and offscreen hosts

use std::collections::VecDeque;

use super::Surface;
use crate::events::Event;

/// Surface with a fixed size, a queue of injected events and a swap counter
#[derive(Debug)]
pub struct HeadlessSurface {
    size: (u32, u32),
    queue: VecDeque<Event>,
    swaps: usize,
    cursor_visible: bool,
    relative_mouse: bool,
    grabbed: bool,
}

impl HeadlessSurface {
    /// Surface reporting a `width` x `height` drawable
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            queue: VecDeque::new(),
            swaps: 0,
            cursor_visible: true,
            relative_mouse: false,
            grabbed: false,
        }
    }

    /// Queue `event` for the next poll
    pub fn push_event(&mut self, event: Event) {
        self.queue.push_back(event);
    }

    /// Change the reported drawable size
    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    /// Number of presented frames
    pub const fn swap_count(&self) -> usize {
        self.swaps
    }

    /// Relative mouse mode flag
    pub const fn relative_mouse(&self) -> bool {
        self.relative_mouse
    }

    /// Grab flag
    pub const fn grabbed(&self) -> bool {
        self.grabbed
    }
}

impl Surface for HeadlessSurface {
    fn swap_buffers(&mut self) {
        self.swaps += 1;
    }

    fn poll_events(&mut self) -> Vec<Event> {
        self.queue.drain(..).collect()
    }

    fn drawable_size(&self) -> (u32, u32) {
        self.size
    }

    fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        self.cursor_visible = visible;
    }

    fn set_mouse_relative_mode(&mut self, enabled: bool) {
        self.relative_mouse = enabled;
    }

    fn set_window_grab(&mut self, grabbed: bool) {
        self.grabbed = grabbed;
    }
}
