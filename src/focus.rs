//! Focus tracking: where the magnifier looks.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::geometry::{to_capture_space, CoordinateOrigin, Point, Rect};
use crate::pointer::PointerSource;

/// How the focus point is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    /// Follow the live pointer position.
    #[value(name = "follow")]
    FollowPointer,
    /// Stay on the last explicitly set center.
    #[value(name = "fixed")]
    FixedPosition,
    /// Center of the display.
    #[value(name = "fullscreen")]
    FullScreen,
}

/// Resolves the focus point for the active [`TrackingMode`].
///
/// Owns the pointer subscription: it begins when follow-pointer mode is
/// entered and ends when it is left or the tracker is dropped.
pub struct FocusTracker {
    mode: TrackingMode,
    fixed_center: Point,
    last_resolved: Point,
    display: Rect,
    origin: CoordinateOrigin,
    pointer: Option<Arc<dyn PointerSource>>,
    tracking: bool,
}

impl FocusTracker {
    /// Tracker centred on `display`, starting in `mode`.
    pub fn new(
        mode: TrackingMode,
        display: Rect,
        origin: CoordinateOrigin,
        pointer: Option<Arc<dyn PointerSource>>,
    ) -> Self {
        let center = display.center();
        let mut tracker = Self {
            mode,
            fixed_center: center,
            last_resolved: center,
            display,
            origin,
            pointer,
            tracking: false,
        };
        if mode == TrackingMode::FollowPointer {
            tracker.begin_tracking();
        }
        tracker.resolve();
        tracker
    }

    pub fn mode(&self) -> TrackingMode {
        self.mode
    }

    /// Most recently resolved center.
    pub fn center(&self) -> Point {
        self.last_resolved
    }

    /// Center used by [`TrackingMode::FixedPosition`].
    pub fn fixed_center(&self) -> Point {
        self.fixed_center
    }

    pub fn display_bounds(&self) -> Rect {
        self.display
    }

    /// Switch modes, managing the pointer subscription. Returns the center
    /// recomputed for the new mode.
    pub fn set_mode(&mut self, mode: TrackingMode) -> Point {
        if mode == self.mode {
            return self.last_resolved;
        }
        if self.mode == TrackingMode::FollowPointer {
            self.end_tracking();
        }
        self.mode = mode;
        if mode == TrackingMode::FollowPointer {
            self.begin_tracking();
        }
        log::debug!("focus mode -> {:?}", mode);
        self.resolve()
    }

    /// Store the fixed center. Kept across mode switches.
    pub fn set_center(&mut self, point: Point) {
        self.fixed_center = point;
        if self.mode == TrackingMode::FixedPosition {
            self.last_resolved = point;
        }
    }

    /// Update the display the tracker works on.
    pub fn set_display_bounds(&mut self, display: Rect) {
        if display != self.display {
            self.display = display;
            if self.mode == TrackingMode::FullScreen {
                self.last_resolved = display.center();
            }
        }
    }

    /// Compute the focus point for the current mode.
    ///
    /// In follow-pointer mode an unknown pointer position keeps the previous
    /// center.
    pub fn resolve(&mut self) -> Point {
        self.last_resolved = match self.mode {
            TrackingMode::FollowPointer => self
                .pointer
                .as_ref()
                .and_then(|pointer| pointer.position())
                .map(|p| to_capture_space(p, self.display, self.origin))
                .unwrap_or(self.last_resolved),
            TrackingMode::FixedPosition => self.fixed_center,
            TrackingMode::FullScreen => self.display.center(),
        };
        self.last_resolved
    }

    fn begin_tracking(&mut self) {
        if let Some(pointer) = &self.pointer {
            if !self.tracking {
                pointer.begin_tracking();
                self.tracking = true;
            }
        }
    }

    fn end_tracking(&mut self) {
        if let Some(pointer) = &self.pointer {
            if self.tracking {
                pointer.end_tracking();
                self.tracking = false;
            }
        }
    }
}

impl Drop for FocusTracker {
    fn drop(&mut self) {
        self.end_tracking();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::SharedPointer;

    const DISPLAY: Rect = Rect::new(0.0, 0.0, 1920.0, 1080.0);

    fn tracker(mode: TrackingMode, pointer: &SharedPointer) -> FocusTracker {
        FocusTracker::new(
            mode,
            DISPLAY,
            CoordinateOrigin::TopLeft,
            Some(Arc::new(pointer.clone())),
        )
    }

    #[test]
    fn fixed_center_survives_a_trip_through_follow_mode() {
        let pointer = SharedPointer::at(Point::new(300.0, 300.0));
        let mut focus = tracker(TrackingMode::FixedPosition, &pointer);
        focus.set_center(Point::new(10.0, 10.0));

        focus.set_mode(TrackingMode::FollowPointer);
        pointer.move_to(Point::new(900.0, 700.0));
        assert_eq!(focus.resolve(), Point::new(900.0, 700.0));

        focus.set_mode(TrackingMode::FixedPosition);
        assert_eq!(focus.resolve(), Point::new(10.0, 10.0));
    }

    #[test]
    fn entering_follow_mode_subscribes_and_recomputes() {
        let pointer = SharedPointer::at(Point::new(42.0, 24.0));
        let mut focus = tracker(TrackingMode::FixedPosition, &pointer);
        assert!(!pointer.is_tracking());

        let center = focus.set_mode(TrackingMode::FollowPointer);
        assert_eq!(center, Point::new(42.0, 24.0));
        assert!(pointer.is_tracking());

        focus.set_mode(TrackingMode::FullScreen);
        assert!(!pointer.is_tracking());
        assert_eq!(pointer.subscriptions(), 1);
    }

    #[test]
    fn dropping_the_tracker_ends_the_subscription() {
        let pointer = SharedPointer::at(Point::new(1.0, 1.0));
        let focus = tracker(TrackingMode::FollowPointer, &pointer);
        assert!(pointer.is_tracking());
        drop(focus);
        assert!(!pointer.is_tracking());
    }

    #[test]
    fn fullscreen_follows_display_changes() {
        let pointer = SharedPointer::new();
        let mut focus = tracker(TrackingMode::FullScreen, &pointer);
        assert_eq!(focus.resolve(), Point::new(960.0, 540.0));
        focus.set_display_bounds(Rect::new(0.0, 0.0, 800.0, 600.0));
        assert_eq!(focus.center(), Point::new(400.0, 300.0));
    }

    #[test]
    fn unknown_pointer_keeps_the_previous_center() {
        let pointer = SharedPointer::at(Point::new(50.0, 60.0));
        let mut focus = tracker(TrackingMode::FollowPointer, &pointer);
        assert_eq!(focus.resolve(), Point::new(50.0, 60.0));
        pointer.clear();
        assert_eq!(focus.resolve(), Point::new(50.0, 60.0));
    }

    #[test]
    fn bottom_left_pointer_is_flipped() {
        let pointer = SharedPointer::at(Point::new(100.0, 200.0));
        let mut focus = FocusTracker::new(
            TrackingMode::FollowPointer,
            DISPLAY,
            CoordinateOrigin::BottomLeft,
            Some(Arc::new(pointer.clone())),
        );
        assert_eq!(focus.resolve(), Point::new(100.0, 880.0));
    }

    #[test]
    fn follow_mode_without_a_pointer_stays_on_the_display_center() {
        let mut focus = FocusTracker::new(
            TrackingMode::FollowPointer,
            DISPLAY,
            CoordinateOrigin::TopLeft,
            None,
        );
        assert_eq!(focus.resolve(), Point::new(960.0, 540.0));
    }
}
