//! In-process event bus for seat-assignment changes.
//!
//! # Guarantees
//!
//! - **Synchronous enqueue**: `publish` hands the event to every current
//!   subscriber before returning
//! - **At-most-once delivery**: slow receivers may miss events
//!   (`RecvError::Lagged`)
//! - **No replay**: events published before `subscribe` are never seen
//!
//! The bus is the only wire between the two write paths and the
//! reconciliation scheduler. A lagged listener must assume it missed changes
//! and schedule a full pass.

use tokio::sync::broadcast;

use crate::model::{GuestId, SeatAssignment, SyncSource};

/// Default channel capacity for the event bus.
const DEFAULT_CAPACITY: usize = 1024;

/// A change to one guest's seat, from either side.
#[derive(Debug, Clone, PartialEq)]
pub struct SeatingEvent {
    pub source: SyncSource,
    pub guest_id: GuestId,
    pub seat_assignment: Option<SeatAssignment>,
}

impl SeatingEvent {
    pub fn new(
        source: SyncSource,
        guest_id: GuestId,
        seat_assignment: Option<SeatAssignment>,
    ) -> Self {
        Self {
            source,
            guest_id,
            seat_assignment,
        }
    }

    /// Events produced by the reconciliation pass must not trigger another one.
    pub fn is_self_inflicted(&self) -> bool {
        self.source == SyncSource::AutoSync
    }
}

/// Broadcast channel for [`SeatingEvent`]s.
///
/// # Example
///
/// ```ignore
/// let bus = EventBus::new();
/// let mut receiver = bus.subscribe();
///
/// bus.publish(SeatingEvent::new(SyncSource::Guests, guest_id, None));
///
/// let event = receiver.recv().await?;
/// assert_eq!(event.source, SyncSource::Guests);
/// ```
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SeatingEvent>,
}

impl EventBus {
    /// Create a new event bus with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new event bus with the specified capacity.
    ///
    /// The capacity determines how many events can be buffered before
    /// slow receivers start lagging.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event.
    pub fn publish(&self, event: SeatingEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<SeatingEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TableId;

    fn event(source: SyncSource, guest: &str) -> SeatingEvent {
        SeatingEvent::new(source, GuestId::from(guest), None)
    }

    #[tokio::test]
    async fn test_publish_and_receive() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        let seat = SeatAssignment {
            table_id: TableId::from("3"),
            table_name: "Mesa 3".into(),
            seat_index: 4,
        };
        bus.publish(SeatingEvent::new(
            SyncSource::Seating,
            GuestId::from("g1"),
            Some(seat.clone()),
        ));

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.guest_id, GuestId::from("g1"));
        assert_eq!(received.seat_assignment, Some(seat));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new();
        let mut receiver1 = bus.subscribe();
        let mut receiver2 = bus.subscribe();

        assert_eq!(bus.publish(event(SyncSource::Guests, "g2")), 2);

        assert_eq!(receiver1.recv().await.unwrap().guest_id, GuestId::from("g2"));
        assert_eq!(receiver2.recv().await.unwrap().guest_id, GuestId::from("g2"));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(event(SyncSource::Guests, "g1")), 0);
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_events() {
        let bus = EventBus::new();
        bus.publish(event(SyncSource::Guests, "early"));

        let mut receiver = bus.subscribe();
        bus.publish(event(SyncSource::Guests, "late"));

        assert_eq!(receiver.recv().await.unwrap().guest_id, GuestId::from("late"));
    }

    #[tokio::test]
    async fn test_slow_receiver_lags() {
        let bus = EventBus::with_capacity(2);
        let mut receiver = bus.subscribe();
        for i in 0..5 {
            bus.publish(event(SyncSource::Seating, &format!("g{}", i)));
        }
        assert!(matches!(
            receiver.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
    }

    #[tokio::test]
    async fn test_clone_shares_channel() {
        let bus1 = EventBus::new();
        let bus2 = bus1.clone();
        let mut receiver = bus1.subscribe();

        bus2.publish(event(SyncSource::AutoSync, "g5"));

        let received = receiver.recv().await.unwrap();
        assert!(received.is_self_inflicted());
    }

    #[test]
    fn test_debug_impl() {
        let bus = EventBus::new();
        let _r1 = bus.subscribe();
        let debug_str = format!("{:?}", bus);
        assert!(debug_str.contains("EventBus"));
        assert!(debug_str.contains("subscriber_count"));
    }
}
