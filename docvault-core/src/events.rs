use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Store change notifications, emitted after a mutation commits.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    Created { id: Uuid },
    Updated { id: Uuid },
    Moved { id: Uuid, new_parent: Uuid },
    Deleted { id: Uuid },
    PermissionAdded { node: Uuid, entry: Uuid },
    PermissionModified { node: Uuid, entry: Uuid },
    PermissionRemoved { node: Uuid, entry: Uuid },
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(100);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub fn send(&self, event: Event) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
