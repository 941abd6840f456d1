//! Outbound event hand-off to the single consumer.

use crate::reconciler::Event;
use serde::Serialize;
use tokio::sync::mpsc;

/// What the tracker emits. The variant is fixed by the mode chosen at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackerEvent<B> {
    /// A new head, reported as-is (non-reconciling mode).
    Block { block: B },
    /// Added/removed blocks after reconciliation.
    Reconciled(Event<B>),
}

impl<B> TrackerEvent<B> {
    /// Blocks that joined the chain.
    pub fn added(&self) -> &[B] {
        match self {
            TrackerEvent::Block { block } => std::slice::from_ref(block),
            TrackerEvent::Reconciled(ev) => &ev.added,
        }
    }

    /// Blocks that left the chain.
    pub fn removed(&self) -> &[B] {
        match self {
            TrackerEvent::Block { .. } => &[],
            TrackerEvent::Reconciled(ev) => &ev.removed,
        }
    }
}

/// The consumer dropped its receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerGone;

/// Sending half of the event channel. One slot: a slow consumer holds up the tracker.
#[derive(Debug)]
pub struct Dispatcher<B> {
    tx: mpsc::Sender<TrackerEvent<B>>,
}

impl<B> Dispatcher<B> {
    pub fn channel() -> (Self, mpsc::Receiver<TrackerEvent<B>>) {
        let (tx, rx) = mpsc::channel(1);
        (Self { tx }, rx)
    }

    /// Wait until the consumer has room, then hand over `event`.
    pub async fn dispatch(&self, event: TrackerEvent<B>) -> Result<(), ConsumerGone> {
        self.tx.send(event).await.map_err(|_| ConsumerGone)
    }
}
