//! Timeline events and listener registry.
//!
//! Control calls and ticks queue `EventRecord`s while timeline state is
//! borrowed; once the borrow is released the queue is drained and each
//! record is delivered to the listeners registered for its event, in
//! registration order. Listeners may call back into the timeline.
//!
//! # Usage
//!
//! ```ignore
//! use cadence_timeline::{Timeline, TimelineEvent};
//!
//! let id = timeline.on(TimelineEvent::Finish, |time| println!("finished at {time}"));
//! timeline.play(1, Direction::Normal);
//! // ...
//! timeline.off(TimelineEvent::Finish, id);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::types::Millis;

/// Notification emitted by a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineEvent {
    /// `play` was called.
    Play,
    /// `pause` was called or a paused timeline was ticked.
    Pause,
    /// The timeline was reset to idle.
    Cancel,
    /// The last iteration completed or `finish` was called.
    Finish,
    /// Time advanced during a tick.
    Update,
}

impl TimelineEvent {
    pub const ALL: [TimelineEvent; 5] = [
        Self::Play,
        Self::Pause,
        Self::Cancel,
        Self::Finish,
        Self::Update,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Cancel => "cancel",
            Self::Finish => "finish",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for TimelineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimelineEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown timeline event: {s:?}"))
    }
}

/// An event with the timeline time it carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventRecord {
    pub event: TimelineEvent,
    pub time: Millis,
}

/// FIFO of events awaiting delivery.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<EventRecord>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: TimelineEvent, time: Millis) {
        self.events.push_back(EventRecord { event, time });
    }

    pub fn pop(&mut self) -> Option<EventRecord> {
        self.events.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = EventRecord> + '_ {
        self.events.drain(..)
    }
}

/// Handle returned by `on`, used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Callback receiving the timeline time carried by the event.
pub type Listener = Rc<dyn Fn(Millis)>;

/// Listeners per event, in registration order.
#[derive(Default)]
pub struct Listeners {
    next_id: u64,
    entries: Vec<(TimelineEvent, ListenerId, Listener)>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, event: TimelineEvent, listener: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push((event, id, listener));
        id
    }

    /// Returns whether a listener was removed.
    pub fn remove(&mut self, event: TimelineEvent, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(e, i, _)| !(*e == event && *i == id));
        self.entries.len() != before
    }

    /// Listeners for `event`, cloned so they can be called without holding
    /// a borrow of the registry.
    pub fn snapshot(&self, event: TimelineEvent) -> Vec<Listener> {
        self.entries
            .iter()
            .filter(|(e, _, _)| *e == event)
            .map(|(_, _, l)| Rc::clone(l))
            .collect()
    }

    pub fn count(&self, event: TimelineEvent) -> usize {
        self.entries.iter().filter(|(e, _, _)| *e == event).count()
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for event in TimelineEvent::ALL {
            let count = self.count(event);
            if count > 0 {
                map.entry(&event, &count);
            }
        }
        map.finish()
    }
}
