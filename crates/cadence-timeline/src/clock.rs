//! Frame clock shared by timelines.
//!
//! The host supplies a `FrameSource` (a display-link, `requestAnimationFrame`
//! bridge, or a test driver). The clock requests a frame only while at least
//! one subscriber exists, and cancels the outstanding request when the last
//! one leaves.
//!
//! # Usage
//!
//! ```ignore
//! use cadence_timeline::clock::{FrameClock, ManualFrameSource};
//!
//! let source = ManualFrameSource::new();
//! let clock = FrameClock::new(source.clone());
//!
//! let id = clock.subscribe(Rc::new(|delta, elapsed| {
//!     println!("+{delta}ms ({elapsed}ms total)");
//! }));
//! clock.on_frame(0.0);
//! clock.on_frame(16.0);
//! clock.unsubscribe(id);
//! assert!(!source.is_pending());
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::types::Millis;

/// Host frame scheduler.
pub trait FrameSource {
    /// Ask for one `FrameClock::on_frame` call at the next frame.
    fn request_frame(&mut self);

    /// Withdraw the outstanding request.
    fn cancel_frame(&mut self);
}

/// Subscriber callback: `(delta, elapsed)` in milliseconds.
pub type FrameCallback = Rc<dyn Fn(Millis, Millis)>;

/// Handle identifying one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    callback: FrameCallback,
    elapsed: Millis,
}

struct ClockState {
    source: Box<dyn FrameSource>,
    subscribers: Vec<Subscriber>,
    next_id: u64,
    last_time: Option<Millis>,
    frame_pending: bool,
}

impl ClockState {
    fn request(&mut self) {
        if !self.frame_pending {
            self.frame_pending = true;
            self.source.request_frame();
        }
    }

    fn stop(&mut self) {
        if self.frame_pending {
            self.source.cancel_frame();
        }
        self.frame_pending = false;
        self.last_time = None;
    }
}

/// Multiplexes subscribers onto one `FrameSource`.
///
/// Cloning yields another handle to the same clock.
#[derive(Clone)]
pub struct FrameClock {
    state: Rc<RefCell<ClockState>>,
}

impl FrameClock {
    pub fn new(source: impl FrameSource + 'static) -> Self {
        Self {
            state: Rc::new(RefCell::new(ClockState {
                source: Box::new(source),
                subscribers: Vec::new(),
                next_id: 0,
                last_time: None,
                frame_pending: false,
            })),
        }
    }

    /// A clock driven by hand, with the source handle for inspection.
    pub fn manual() -> (Self, ManualFrameSource) {
        let source = ManualFrameSource::new();
        (Self::new(source.clone()), source)
    }

    /// Add a subscriber, starting the source if it is idle.
    pub fn subscribe(&self, callback: FrameCallback) -> SubscriptionId {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = SubscriptionId(state.next_id);
        state.subscribers.push(Subscriber {
            id,
            callback,
            elapsed: 0.0,
        });
        state.request();
        id
    }

    /// Remove a subscriber. The source is stopped once none remain.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.borrow_mut();
        let before = state.subscribers.len();
        state.subscribers.retain(|s| s.id != id);
        let removed = state.subscribers.len() != before;
        if state.subscribers.is_empty() {
            state.stop();
        }
        removed
    }

    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.state.borrow().subscribers.iter().any(|s| s.id == id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.borrow().subscribers.len()
    }

    /// True while a frame is requested from the source.
    pub fn is_running(&self) -> bool {
        self.state.borrow().frame_pending
    }

    /// Cumulative time delivered to `id`.
    pub fn elapsed(&self, id: SubscriptionId) -> Option<Millis> {
        self.state
            .borrow()
            .subscribers
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.elapsed)
    }

    /// Entry point for the host: a frame fired at `timestamp`.
    ///
    /// The first frame after starting delivers a zero delta.
    pub fn on_frame(&self, timestamp: Millis) {
        let delta = {
            let mut state = self.state.borrow_mut();
            state.frame_pending = false;

            if state.subscribers.is_empty() {
                state.stop();
                return;
            }

            let delta = state.last_time.map_or(0.0, |last| timestamp - last);
            state.last_time = Some(timestamp);
            state.request();
            delta
        };

        self.dispatch(delta);
    }

    /// Deliver `delta` to every subscriber without consulting the source.
    pub fn advance(&self, delta: Millis) {
        if self.subscriber_count() > 0 {
            self.dispatch(delta);
        }
    }

    fn dispatch(&self, delta: Millis) {
        let calls: Vec<(SubscriptionId, FrameCallback, Millis)> = {
            let mut state = self.state.borrow_mut();
            state
                .subscribers
                .iter_mut()
                .map(|s| {
                    s.elapsed += delta;
                    (s.id, Rc::clone(&s.callback), s.elapsed)
                })
                .collect()
        };

        trace!(delta, subscribers = calls.len(), "frame");

        for (id, callback, elapsed) in calls {
            // earlier callbacks may have unsubscribed this one
            if self.is_subscribed(id) {
                callback(delta, elapsed);
            }
        }
    }
}

impl fmt::Debug for FrameClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("FrameClock")
            .field("subscribers", &state.subscribers.len())
            .field("frame_pending", &state.frame_pending)
            .field("last_time", &state.last_time)
            .finish()
    }
}

#[derive(Debug, Default)]
struct ManualState {
    requests: usize,
    cancels: usize,
    pending: bool,
}

/// Frame source for headless driving and tests; records what was asked of it.
#[derive(Debug, Clone, Default)]
pub struct ManualFrameSource {
    state: Rc<RefCell<ManualState>>,
}

impl ManualFrameSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames requested so far.
    pub fn requests(&self) -> usize {
        self.state.borrow().requests
    }

    pub fn cancels(&self) -> usize {
        self.state.borrow().cancels
    }

    /// True while a request is outstanding.
    pub fn is_pending(&self) -> bool {
        self.state.borrow().pending
    }
}

impl FrameSource for ManualFrameSource {
    fn request_frame(&mut self) {
        let mut state = self.state.borrow_mut();
        state.requests += 1;
        state.pending = true;
    }

    fn cancel_frame(&mut self) {
        let mut state = self.state.borrow_mut();
        state.cancels += 1;
        state.pending = false;
    }
}
