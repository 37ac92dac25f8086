//! Canvas event model (spec §4.5/§9): a tagged `Event` enum replacing the
//! original `opaque void* payload -> union` with a closed Rust enum, fed
//! through the [`crate::fifo::Fifo`] to ordered public/private callback
//! lists per event kind.

use std::collections::HashMap;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// Discriminant used to key the callback tables, kept separate from the
/// payload-carrying `Event` so a callback can subscribe to "any mouse
/// event" without matching on the payload shape.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Mouse,
    Key,
    Timer,
    Frame,
    Resize,
    Refill,
    PreSend,
    PostSend,
    User,
}

#[derive(Clone, Debug)]
pub enum Event {
    Mouse {
        button: MouseButton,
        x: f32,
        y: f32,
        pressed: bool,
    },
    Key {
        code: u32,
        state: KeyState,
    },
    Timer {
        timer_idx: u32,
        time: f32,
    },
    Frame {
        frame_idx: u64,
        time: f32,
    },
    Resize {
        width: u32,
        height: u32,
    },
    Refill {
        frame_idx: u64,
    },
    PreSend,
    PostSend,
    /// Escape hatch for embedder-defined event kinds, per spec §4.5.
    User {
        tag: u32,
        payload: Vec<u8>,
    },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Mouse { .. } => EventKind::Mouse,
            Event::Key { .. } => EventKind::Key,
            Event::Timer { .. } => EventKind::Timer,
            Event::Frame { .. } => EventKind::Frame,
            Event::Resize { .. } => EventKind::Resize,
            Event::Refill { .. } => EventKind::Refill,
            Event::PreSend => EventKind::PreSend,
            Event::PostSend => EventKind::PostSend,
            Event::User { .. } => EventKind::User,
        }
    }
}

pub type Callback = Box<dyn FnMut(&Event) + Send>;

/// One registered periodic timer: fires when `now - last_fire >= interval`
/// (spec §4.5), tracked by index so `Event::Timer::timer_idx` can identify
/// which registration fired.
struct TimerSlot {
    interval: f32,
    last_fire: f32,
}

/// Ordered callback lists per event kind, split into a "public" table (user
/// registrations, via the embedder-facing API) and a "private" table
/// (internal engine reactions, e.g. the panel controller's pan/zoom
/// handling) so internal wiring can't be silently overridden by a user
/// callback of the same kind, per spec §4.5.
#[derive(Default)]
pub struct CallbackTable {
    public: HashMap<EventKind, Vec<Callback>>,
    private: HashMap<EventKind, Vec<Callback>>,
    timers: Vec<TimerSlot>,
}

impl CallbackTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, kind: EventKind, callback: Callback) {
        self.public.entry(kind).or_default().push(callback);
    }

    pub fn on_internal(&mut self, kind: EventKind, callback: Callback) {
        self.private.entry(kind).or_default().push(callback);
    }

    /// Registers a periodic timer and returns the `timer_idx` its
    /// `Event::Timer` will carry. The timer itself is silent until
    /// [`CallbackTable::poll_timers`] is driven by the frame loop; callers
    /// still subscribe to its firing through `on(EventKind::Timer, ...)`
    /// like any other event kind.
    pub fn add_timer(&mut self, interval: f32) -> u32 {
        self.timers.push(TimerSlot {
            interval,
            last_fire: 0.0,
        });
        (self.timers.len() - 1) as u32
    }

    /// Checks every registered timer against `now` (spec §4.5: "Timers fire
    /// when now − last_fire ≥ interval") and returns the `Event::Timer`s due
    /// this tick. Does not dispatch them itself; the canvas enqueues the
    /// result through the normal event FIFO alongside `Event::Frame`.
    pub fn poll_timers(&mut self, now: f32) -> Vec<Event> {
        let mut fired = Vec::new();
        for (idx, timer) in self.timers.iter_mut().enumerate() {
            if now - timer.last_fire >= timer.interval {
                timer.last_fire = now;
                fired.push(Event::Timer {
                    timer_idx: idx as u32,
                    time: now,
                });
            }
        }
        fired
    }

    /// Dispatches `event` to private callbacks first, then public ones, so
    /// internal state (e.g. panel transforms) is consistent before user code
    /// observes the event.
    pub fn dispatch(&mut self, event: &Event) {
        let kind = event.kind();
        if let Some(callbacks) = self.private.get_mut(&kind) {
            for cb in callbacks.iter_mut() {
                cb(event);
            }
        }
        if let Some(callbacks) = self.public.get_mut(&kind) {
            for cb in callbacks.iter_mut() {
                cb(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn private_callbacks_run_before_public_ones() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut table = CallbackTable::new();

        let o1 = order.clone();
        table.on_internal(
            EventKind::Resize,
            Box::new(move |_| o1.lock().unwrap().push("private")),
        );
        let o2 = order.clone();
        table.on(
            EventKind::Resize,
            Box::new(move |_| o2.lock().unwrap().push("public")),
        );

        table.dispatch(&Event::Resize { width: 10, height: 20 });

        assert_eq!(*order.lock().unwrap(), vec!["private", "public"]);
    }

    #[test]
    fn only_matching_kind_fires() {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        let mut table = CallbackTable::new();
        table.on(EventKind::Key, Box::new(move |_| { c.fetch_add(1, Ordering::SeqCst); }));

        table.dispatch(&Event::Resize { width: 1, height: 1 });
        assert_eq!(count.load(Ordering::SeqCst), 0);

        table.dispatch(&Event::Key { code: 65, state: KeyState::Pressed });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn timer_fires_once_interval_elapses() {
        let mut table = CallbackTable::new();
        let idx = table.add_timer(0.25);

        assert!(table.poll_timers(0.1).is_empty());
        let fired = table.poll_timers(0.3);
        assert_eq!(fired.len(), 1);
        match fired[0] {
            Event::Timer { timer_idx, time } => {
                assert_eq!(timer_idx, idx);
                assert_eq!(time, 0.3);
            }
            _ => panic!("expected Event::Timer"),
        }

        assert!(table.poll_timers(0.4).is_empty());
        assert_eq!(table.poll_timers(0.55).len(), 1);
    }

    #[test]
    fn independent_timers_fire_on_their_own_schedule() {
        let mut table = CallbackTable::new();
        let fast = table.add_timer(0.1);
        let slow = table.add_timer(1.0);

        let fired = table.poll_timers(0.1);
        assert_eq!(fired.len(), 1);
        assert!(matches!(fired[0], Event::Timer { timer_idx, .. } if timer_idx == fast));

        let fired = table.poll_timers(1.0);
        assert_eq!(fired.len(), 2);
        assert!(fired.iter().any(|e| matches!(e, Event::Timer { timer_idx, .. } if *timer_idx == slow)));
    }
}
