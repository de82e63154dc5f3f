//! Pointer position sources.
//!
//! The focus tracker reads the pointer through [`PointerSource`]. Positions
//! are reported in the platform's native convention, named by
//! `MagnifierConfig::pointer_origin`, and converted to capture space by the
//! tracker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::geometry::Point;

/// Anything that can report where the pointer currently is.
pub trait PointerSource: Send + Sync {
    /// Current pointer position, `None` when it cannot be determined.
    fn position(&self) -> Option<Point>;

    /// Called when follow-pointer mode becomes active.
    fn begin_tracking(&self) {}

    /// Called when follow-pointer mode ends.
    fn end_tracking(&self) {}
}

/// Pointer with a settable position.
///
/// Clones share state, so a test (or an input layer feeding synthetic
/// events) can move the pointer while the engine holds another clone.
#[derive(Clone, Default)]
pub struct SharedPointer {
    inner: Arc<SharedPointerState>,
}

#[derive(Default)]
struct SharedPointerState {
    position: Mutex<Option<Point>>,
    subscribed: AtomicU64,
    unsubscribed: AtomicU64,
}

impl SharedPointer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer that starts at `point`.
    pub fn at(point: Point) -> Self {
        let pointer = Self::new();
        pointer.move_to(point);
        pointer
    }

    pub fn move_to(&self, point: Point) {
        *self.inner.position.lock() = Some(point);
    }

    /// Make the position unknown.
    pub fn clear(&self) {
        *self.inner.position.lock() = None;
    }

    /// Number of `begin_tracking` calls seen
    pub fn subscriptions(&self) -> u64 {
        self.inner.subscribed.load(Ordering::SeqCst)
    }

    /// Number of `end_tracking` calls seen
    pub fn unsubscriptions(&self) -> u64 {
        self.inner.unsubscribed.load(Ordering::SeqCst)
    }

    /// True while tracking has begun more often than it has ended.
    pub fn is_tracking(&self) -> bool {
        self.subscriptions() > self.unsubscriptions()
    }
}

impl PointerSource for SharedPointer {
    fn position(&self) -> Option<Point> {
        *self.inner.position.lock()
    }

    fn begin_tracking(&self) {
        self.inner.subscribed.fetch_add(1, Ordering::SeqCst);
    }

    fn end_tracking(&self) {
        self.inner.unsubscribed.fetch_add(1, Ordering::SeqCst);
    }
}

/// System pointer read through `device_query`.
///
/// Reports `None` when no input device connection can be opened, e.g. on a
/// headless or Wayland-only session.
#[cfg(feature = "pointer")]
#[derive(Debug, Default, Clone, Copy)]
pub struct DevicePointerSource;

#[cfg(feature = "pointer")]
impl DevicePointerSource {
    pub fn new() -> Self {
        Self
    }
}

// DeviceState holds a platform handle that cannot cross threads, so each
// thread opens one on first use and keeps it, failure included.
#[cfg(feature = "pointer")]
thread_local! {
    static DEVICE_STATE: std::cell::OnceCell<Option<device_query::DeviceState>> =
        const { std::cell::OnceCell::new() };
}

#[cfg(all(feature = "pointer", target_os = "linux"))]
fn open_device_state() -> Option<device_query::DeviceState> {
    let state = device_query::DeviceState::checked_new();
    if state.is_none() {
        log::warn!("cannot open the X display; pointer position unavailable");
    }
    state
}

#[cfg(all(feature = "pointer", not(target_os = "linux")))]
fn open_device_state() -> Option<device_query::DeviceState> {
    Some(device_query::DeviceState::new())
}

#[cfg(feature = "pointer")]
impl PointerSource for DevicePointerSource {
    fn position(&self) -> Option<Point> {
        use device_query::DeviceQuery;

        DEVICE_STATE.with(|state| {
            let state = state.get_or_init(open_device_state).as_ref()?;
            let (x, y) = state.get_mouse().coords;
            Some(Point::new(x as f64, y as f64))
        })
    }
}
