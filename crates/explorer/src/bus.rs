use tokio::sync::broadcast;

use crate::event::ExplorerEvent;

#[derive(Clone)]
pub struct Bus {
    sender: broadcast::Sender<ExplorerEvent>,
}

impl Bus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExplorerEvent> {
        self.sender.subscribe()
    }

    pub fn publish(
        &self,
        event: ExplorerEvent,
    ) -> Result<usize, broadcast::error::SendError<ExplorerEvent>> {
        self.sender.send(event)
    }
}
