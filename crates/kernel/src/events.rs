use railstream_common::{
    BudgetMetric, DoorId, DoorState, LodTier, ResidencyState, SectionIndex,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Everything the streaming runtime tells the outside world.
///
/// Fire-and-forget: emitters never learn who, if anyone, consumed an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameplayEvent {
    SectionStateChanged {
        section: SectionIndex,
        state: ResidencyState,
    },
    /// A section finished loading (reached Loaded or Active from Preloading).
    SectionLoadComplete { section: SectionIndex },
    /// Streaming memory crossed above its budget.
    StreamingBudgetExceeded { used_mb: f32, budget_mb: f32 },
    DoorStateChanged { door: DoorId, state: DoorState },
    /// A door gave up waiting and started the fade fallback.
    DoorFallbackTriggered {
        door: DoorId,
        destination: SectionIndex,
    },
    CharacterPoolChanged {
        section: SectionIndex,
        active_count: usize,
    },
    /// A registration was refused for capacity reasons.
    CharacterBudgetExceeded {
        section: SectionIndex,
        count: usize,
    },
    SectionLodChanged {
        section: SectionIndex,
        tier: LodTier,
    },
    PerformanceBudgetViolated {
        metric: BudgetMetric,
        value: f32,
        limit: f32,
    },
}

/// Discriminant of [`GameplayEvent`], used for subscription filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    SectionStateChanged,
    SectionLoadComplete,
    StreamingBudgetExceeded,
    DoorStateChanged,
    DoorFallbackTriggered,
    CharacterPoolChanged,
    CharacterBudgetExceeded,
    SectionLodChanged,
    PerformanceBudgetViolated,
}

impl GameplayEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::SectionStateChanged { .. } => EventKind::SectionStateChanged,
            Self::SectionLoadComplete { .. } => EventKind::SectionLoadComplete,
            Self::StreamingBudgetExceeded { .. } => EventKind::StreamingBudgetExceeded,
            Self::DoorStateChanged { .. } => EventKind::DoorStateChanged,
            Self::DoorFallbackTriggered { .. } => EventKind::DoorFallbackTriggered,
            Self::CharacterPoolChanged { .. } => EventKind::CharacterPoolChanged,
            Self::CharacterBudgetExceeded { .. } => EventKind::CharacterBudgetExceeded,
            Self::SectionLodChanged { .. } => EventKind::SectionLodChanged,
            Self::PerformanceBudgetViolated { .. } => EventKind::PerformanceBudgetViolated,
        }
    }
}

/// Handle returned by [`EventBus::subscribe`]. Independent of whatever
/// object the subscriber is; dropping it does nothing, call
/// [`EventBus::unsubscribe`] on teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

#[derive(Debug)]
struct Mailbox {
    filter: Option<Vec<EventKind>>,
    queue: VecDeque<GameplayEvent>,
    dropped: u64,
}

impl Mailbox {
    fn accepts(&self, kind: EventKind) -> bool {
        self.filter.as_ref().is_none_or(|kinds| kinds.contains(&kind))
    }
}

/// Multi-subscriber publish/subscribe bus.
///
/// Each subscriber gets its own bounded mailbox. Publishing copies the
/// event into every matching mailbox in publish order; when a mailbox is
/// full its oldest event is discarded.
#[derive(Debug)]
pub struct EventBus {
    mailboxes: BTreeMap<SubscriberId, Mailbox>,
    next_id: u64,
    capacity: usize,
    published: u64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_capacity(EventBus::DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub const DEFAULT_CAPACITY: usize = 1024;

    pub fn new() -> Self {
        Self::default()
    }

    /// Bus whose mailboxes hold at most `capacity` undrained events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            mailboxes: BTreeMap::new(),
            next_id: 0,
            capacity: capacity.max(1),
            published: 0,
        }
    }

    /// Subscribe to every event.
    pub fn subscribe(&mut self) -> SubscriberId {
        self.register(None)
    }

    /// Subscribe to the listed kinds only.
    pub fn subscribe_to(&mut self, kinds: &[EventKind]) -> SubscriberId {
        self.register(Some(kinds.to_vec()))
    }

    fn register(&mut self, filter: Option<Vec<EventKind>>) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.mailboxes.insert(
            id,
            Mailbox {
                filter,
                queue: VecDeque::new(),
                dropped: 0,
            },
        );
        tracing::debug!(?id, "event subscriber added");
        id
    }

    /// Remove a subscriber and discard its undrained events.
    /// Returns false if the handle was unknown.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let removed = self.mailboxes.remove(&id).is_some();
        if removed {
            tracing::debug!(?id, "event subscriber removed");
        }
        removed
    }

    pub fn publish(&mut self, event: GameplayEvent) {
        self.published += 1;
        let kind = event.kind();
        for mailbox in self.mailboxes.values_mut() {
            if !mailbox.accepts(kind) {
                continue;
            }
            if mailbox.queue.len() >= self.capacity {
                mailbox.queue.pop_front();
                mailbox.dropped += 1;
            }
            mailbox.queue.push_back(event.clone());
        }
    }

    pub fn publish_all(&mut self, events: impl IntoIterator<Item = GameplayEvent>) {
        for event in events {
            self.publish(event);
        }
    }

    /// Take every pending event for a subscriber, oldest first.
    /// Unknown handles yield nothing.
    pub fn drain(&mut self, id: SubscriberId) -> Vec<GameplayEvent> {
        self.mailboxes
            .get_mut(&id)
            .map(|m| m.queue.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn pending(&self, id: SubscriberId) -> usize {
        self.mailboxes.get(&id).map_or(0, |m| m.queue.len())
    }

    /// Events discarded from this subscriber's mailbox because it was full.
    pub fn dropped(&self, id: SubscriberId) -> u64 {
        self.mailboxes.get(&id).map_or(0, |m| m.dropped)
    }

    pub fn subscriber_count(&self) -> usize {
        self.mailboxes.len()
    }

    /// Total events published since creation.
    pub fn published(&self) -> u64 {
        self.published
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_complete(i: u32) -> GameplayEvent {
        GameplayEvent::SectionLoadComplete {
            section: SectionIndex(i),
        }
    }

    #[test]
    fn every_subscriber_sees_events_in_order() {
        let mut bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();
        bus.publish(load_complete(1));
        bus.publish(load_complete(2));

        let expected = vec![load_complete(1), load_complete(2)];
        assert_eq!(bus.drain(a), expected);
        assert_eq!(bus.drain(b), expected);
        assert!(bus.drain(a).is_empty());
        assert_eq!(bus.published(), 2);
    }

    #[test]
    fn filtered_subscriber_only_receives_its_kinds() {
        let mut bus = EventBus::new();
        let lod_only = bus.subscribe_to(&[EventKind::SectionLodChanged]);
        bus.publish(load_complete(3));
        bus.publish(GameplayEvent::SectionLodChanged {
            section: SectionIndex(3),
            tier: LodTier::Full,
        });

        let events = bus.drain(lod_only);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), EventKind::SectionLodChanged);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let id = bus.subscribe();
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(load_complete(0));
        assert!(bus.drain(id).is_empty());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn full_mailbox_drops_oldest() {
        let mut bus = EventBus::with_capacity(2);
        let id = bus.subscribe();
        bus.publish(load_complete(1));
        bus.publish(load_complete(2));
        bus.publish(load_complete(3));

        assert_eq!(bus.pending(id), 2);
        assert_eq!(bus.dropped(id), 1);
        assert_eq!(bus.drain(id), vec![load_complete(2), load_complete(3)]);
    }

    #[test]
    fn late_subscriber_misses_earlier_events() {
        let mut bus = EventBus::new();
        bus.publish(load_complete(1));
        let id = bus.subscribe();
        assert_eq!(bus.pending(id), 0);
    }
}
