//! Server-side catalog carousel.
//!
//! The home page shows a window of [`SLIDES_PER_VIEW`] products. The window
//! position travels in the `?slide=` query parameter, so the previous/next
//! controls are plain links and work without JavaScript.

use std::ops::Range;

/// Products visible at once.
pub const SLIDES_PER_VIEW: usize = 3;

/// Position of the visible window over a list of slides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Carousel {
    len: usize,
    per_view: usize,
    current: usize,
}

impl Carousel {
    /// Carousel over `len` slides, positioned at the first one.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            len,
            per_view: SLIDES_PER_VIEW,
            current: 0,
        }
    }

    /// Move to `index`, clamped to the valid range.
    #[must_use]
    pub fn at(self, index: usize) -> Self {
        Self {
            current: index.min(self.last_index()),
            ..self
        }
    }

    /// Index of the last position that still fills the window.
    #[must_use]
    pub const fn last_index(&self) -> usize {
        self.len.saturating_sub(self.per_view)
    }

    /// Current position.
    #[must_use]
    pub const fn current(&self) -> usize {
        self.current
    }

    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.current > 0
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.current < self.last_index()
    }

    /// Position one step back, if any.
    #[must_use]
    pub const fn prev_index(&self) -> Option<usize> {
        if self.has_prev() {
            Some(self.current - 1)
        } else {
            None
        }
    }

    /// Position one step forward, if any.
    #[must_use]
    pub const fn next_index(&self) -> Option<usize> {
        if self.has_next() {
            Some(self.current + 1)
        } else {
            None
        }
    }

    /// Slide indices inside the window.
    #[must_use]
    pub fn visible(&self) -> Range<usize> {
        self.current..(self.current + self.per_view).min(self.len)
    }
}
