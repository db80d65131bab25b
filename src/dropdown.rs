//! Outside-click handling for menus and dropdowns.
//!
//! The UI owns one [`PointerHub`]. A [`Dropdown`] subscribes to it only
//! while open, and the [`Subscription`] guard detaches itself when dropped,
//! so closing, outside-click dismissal and dropping the owning component
//! all release the listener.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use ratatui::layout::Rect;

/// A pointer-down location in terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: u16,
    pub y: u16,
}

impl Point {
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    pub fn within(&self, rect: &Rect) -> bool {
        self.x >= rect.x
            && self.y >= rect.y
            && self.x < rect.x.saturating_add(rect.width)
            && self.y < rect.y.saturating_add(rect.height)
    }
}

type Listener = Arc<dyn Fn(Point) + Send + Sync>;

#[derive(Default)]
struct HubInner {
    next_id: u64,
    listeners: BTreeMap<u64, Listener>,
}

#[derive(Clone, Default)]
pub struct PointerHub {
    inner: Arc<Mutex<HubInner>>,
}

impl PointerHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Point) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.insert(id, Arc::new(listener));
        Subscription {
            id,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Delivers a pointer-down to every listener. The lock is released
    /// before listeners run.
    pub fn dispatch(&self, position: Point) {
        let listeners: Vec<Listener> = self.inner.lock().listeners.values().cloned().collect();
        for listener in listeners {
            listener(position);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }
}

#[must_use = "dropping a subscription detaches the listener"]
pub struct Subscription {
    id: u64,
    hub: Weak<Mutex<HubInner>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.lock().listeners.remove(&self.id);
        }
    }
}

#[derive(Default)]
struct DropdownShared {
    open: AtomicBool,
    regions: Mutex<Vec<Rect>>,
}

/// One open/closed flag plus a pointer subscription that exists only
/// while the dropdown is open.
#[derive(Default)]
pub struct Dropdown {
    shared: Arc<DropdownShared>,
    subscription: Option<Subscription>,
}

impl Dropdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }

    pub fn open(&mut self, hub: &PointerHub) {
        if self.is_open() {
            return;
        }
        self.shared.open.store(true, Ordering::SeqCst);
        let shared = Arc::downgrade(&self.shared);
        self.subscription = Some(hub.subscribe(move |position| {
            let Some(shared) = shared.upgrade() else {
                return;
            };
            let inside = shared
                .regions
                .lock()
                .iter()
                .any(|rect| position.within(rect));
            if !inside {
                shared.open.store(false, Ordering::SeqCst);
            }
        }));
    }

    pub fn close(&mut self) {
        self.shared.open.store(false, Ordering::SeqCst);
        self.subscription = None;
    }

    pub fn toggle(&mut self, hub: &PointerHub) {
        if self.is_open() {
            self.close();
        } else {
            self.open(hub);
        }
    }

    /// Areas that count as "inside": the trigger and the menu body.
    /// Recorded during draw.
    pub fn set_regions(&self, regions: Vec<Rect>) {
        *self.shared.regions.lock() = regions;
    }

    /// Drops the subscription if an outside click closed the dropdown.
    /// Returns true when that happened.
    pub fn sync(&mut self) -> bool {
        if !self.is_open() && self.subscription.is_some() {
            self.subscription = None;
            return true;
        }
        false
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: u16, y: u16) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn subscription_detaches_on_drop() {
        let hub = PointerHub::new();
        let sub = hub.subscribe(|_| {});
        assert_eq!(hub.listener_count(), 1);
        drop(sub);
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn listener_only_while_open() {
        let hub = PointerHub::new();
        let mut menu = Dropdown::new();
        assert_eq!(hub.listener_count(), 0);
        menu.open(&hub);
        assert_eq!(hub.listener_count(), 1);
        menu.open(&hub);
        assert_eq!(hub.listener_count(), 1);
        menu.close();
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn outside_click_closes_and_sync_detaches() {
        let hub = PointerHub::new();
        let mut menu = Dropdown::new();
        menu.open(&hub);
        menu.set_regions(vec![Rect::new(10, 10, 5, 5)]);

        hub.dispatch(at(12, 12));
        assert!(menu.is_open());

        hub.dispatch(at(0, 0));
        assert!(!menu.is_open());
        assert!(menu.sync());
        assert_eq!(hub.listener_count(), 0);
        assert!(!menu.sync());
    }

    #[test]
    fn dropping_open_dropdown_releases_listener() {
        let hub = PointerHub::new();
        {
            let mut menu = Dropdown::new();
            menu.open(&hub);
            assert_eq!(hub.listener_count(), 1);
        }
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn toggle_twice_restores_closed() {
        let hub = PointerHub::new();
        let mut menu = Dropdown::new();
        menu.toggle(&hub);
        menu.toggle(&hub);
        assert!(!menu.is_open());
        assert!(!menu.is_subscribed());
    }

    #[test]
    fn independent_dropdowns_share_one_hub() {
        let hub = PointerHub::new();
        let mut a = Dropdown::new();
        let mut b = Dropdown::new();
        a.open(&hub);
        b.open(&hub);
        a.set_regions(vec![Rect::new(0, 0, 4, 4)]);
        b.set_regions(vec![Rect::new(20, 0, 4, 4)]);
        hub.dispatch(at(1, 1));
        assert!(a.is_open());
        assert!(!b.is_open());
        b.sync();
        assert_eq!(hub.listener_count(), 1);
    }
}
