use gpui::{Bounds, Pixels, point, px};
use gpui_component::VirtualListScrollHandle;

/// Distance from the tail within which follow mode re-engages.
const FOLLOW_RESUME_THRESHOLD: Pixels = px(24.);
/// Delta below which offset changes count as floating-point jitter.
const SCROLL_DELTA_EPSILON: f32 = 1.0;

/// Keeps the message list glued to its tail while new entries arrive, and
/// releases it when the user scrolls back through the history.
pub struct ScrollManager {
    scroll_handle: VirtualListScrollHandle,
    pending_scroll_to_bottom: bool,
    follow_bottom: bool,
    last_offset: Pixels,
    last_max_offset: Pixels,
}

impl Default for ScrollManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrollManager {
    pub fn new() -> Self {
        Self {
            scroll_handle: VirtualListScrollHandle::new(),
            pending_scroll_to_bottom: false,
            follow_bottom: true,
            last_offset: Pixels::ZERO,
            last_max_offset: Pixels::ZERO,
        }
    }

    pub fn handle(&self) -> &VirtualListScrollHandle {
        &self.scroll_handle
    }

    pub fn bounds(&self) -> Bounds<Pixels> {
        self.scroll_handle.bounds()
    }

    /// Queues a jump to the tail if the user had not scrolled away.
    pub fn request_scroll_to_bottom_if_following(&mut self) {
        if self.follow_bottom || self.was_near_bottom() {
            self.pending_scroll_to_bottom = true;
        }
    }

    /// Forgets scroll history, e.g. when the transcript is replaced.
    pub fn reset(&mut self) {
        self.last_offset = Pixels::ZERO;
        self.last_max_offset = Pixels::ZERO;
        self.follow_bottom = true;
        self.pending_scroll_to_bottom = true;
    }

    /// Re-evaluates follow mode from the offsets of the last frame. Called
    /// once per render before [`Self::apply_pending_scroll`].
    pub fn update_follow_state(&mut self) {
        let offset = self.scroll_handle.offset().y;
        let max_offset = self.scroll_handle.max_offset().height;
        let offset_delta = f32::from(offset) - f32::from(self.last_offset);
        let content_grew =
            (f32::from(max_offset) - f32::from(self.last_max_offset)).abs() > SCROLL_DELTA_EPSILON;
        let scrolled_up = offset_delta > SCROLL_DELTA_EPSILON && !content_grew;
        let scrolled_down = offset_delta < -SCROLL_DELTA_EPSILON && !content_grew;

        if self.pending_scroll_to_bottom || (content_grew && self.was_near_bottom()) {
            self.follow_bottom = true;
        } else if self.follow_bottom {
            if scrolled_up {
                self.follow_bottom = false;
            }
        } else if scrolled_down && self.near_bottom(offset, max_offset) {
            self.follow_bottom = true;
        }

        self.last_offset = offset;
        self.last_max_offset = max_offset;
    }

    /// Moves the viewport to the tail when follow mode or an explicit
    /// request demands it.
    pub fn apply_pending_scroll(&mut self) {
        if self.follow_bottom || self.pending_scroll_to_bottom {
            let max_offset = self.scroll_handle.max_offset().height;
            let current_x = self.scroll_handle.offset().x;
            let target_y = if max_offset > Pixels::ZERO {
                -max_offset
            } else {
                Pixels::ZERO
            };
            self.scroll_handle.set_offset(point(current_x, target_y));
        }

        self.pending_scroll_to_bottom = false;
    }

    fn was_near_bottom(&self) -> bool {
        self.near_bottom(self.last_offset, self.last_max_offset)
    }

    // Scrolling down means increasingly negative Y offsets, so offset + max
    // approaches zero at the tail.
    fn near_bottom(&self, offset: Pixels, max_offset: Pixels) -> bool {
        if max_offset <= Pixels::ZERO {
            return true;
        }

        (offset + max_offset).abs() <= FOLLOW_RESUME_THRESHOLD
    }
}
