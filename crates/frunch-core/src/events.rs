//! Viewer event types and the broadcast bus that fans them out.
//!
//! The rotation loop publishes into a [`PictureBus`]; every connected viewer
//! holds its own receiver. Late joiners get the current picture from the
//! scheduler, then follow the bus.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::DisplayPicture;
use crate::traits::PictureSink;

/// Event pushed to viewers.
///
/// Serialized with a `type` tag, e.g.
/// `{"type":"new_picture","picture":{"id":"...","path":"/images/..."}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewerEvent {
    /// A new picture is on screen.
    NewPicture { picture: DisplayPicture },
}

/// Broadcast bus for viewer events.
#[derive(Clone)]
pub struct PictureBus {
    tx: broadcast::Sender<ViewerEvent>,
}

impl PictureBus {
    /// Create a new bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers. Dropped silently when nobody listens.
    pub fn emit(&self, event: ViewerEvent) {
        let subscriber_count = self.tx.receiver_count();
        tracing::debug!(subscriber_count, "PictureBus emit");
        let _ = self.tx.send(event);
    }

    /// Subscribe to receive events. Each subscriber gets its own stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ViewerEvent> {
        self.tx.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for PictureBus {
    fn default() -> Self {
        Self::new(crate::defaults::PICTURE_BUS_CAPACITY)
    }
}

impl PictureSink for PictureBus {
    fn publish(&self, picture: &DisplayPicture) {
        self.emit(ViewerEvent::NewPicture {
            picture: picture.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn picture(id: &str) -> DisplayPicture {
        DisplayPicture {
            id: id.to_string(),
            author: Some("Kit".to_string()),
            location: None,
            path: format!("/images/{}.jpg", id),
            when: "added a day ago".to_string(),
            added_at: 0,
            taken_at: None,
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let bus = PictureBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(&picture("p1"));

        let ViewerEvent::NewPicture { picture: got_a } = a.recv().await.unwrap();
        let ViewerEvent::NewPicture { picture: got_b } = b.recv().await.unwrap();
        assert_eq!(got_a.id, "p1");
        assert_eq!(got_b.id, "p1");
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = PictureBus::new(8);
        bus.publish(&picture("nobody-listening"));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_wire_format() {
        let event = ViewerEvent::NewPicture {
            picture: picture("p9"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "new_picture");
        assert_eq!(json["picture"]["path"], "/images/p9.jpg");
    }
}
