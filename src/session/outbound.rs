//! Per-session outbound queue and its single writer task.
//!
//! Every frame bound for a socket goes through the session's
//! [`OutboundQueue`]; only the drain task spawned by [`spawn_drain`] ever
//! touches the socket's write half, so frames for one session are written
//! strictly in queue order and never interleaved.
//!
//! The queue is bounded. Replies produced by the owning session's loop are
//! never dropped: when the queue is full they evict the oldest pending push
//! or wait for room. Pushes from other sessions never wait: on overflow the
//! oldest pending push is dropped instead.

use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::domain::SessionId;
use crate::error::GatewayError;
use crate::ws::messages::OutboundFrame;

/// Result of a best-effort [`OutboundQueue::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Queued with room to spare.
    Queued,
    /// Queued after dropping the oldest pending push.
    DisplacedOldest,
    /// Not queued: the queue is full of replies.
    Dropped,
    /// Not queued: the session is closing.
    Closed,
}

impl PushOutcome {
    /// Returns `true` if the frame made it into the queue.
    #[must_use]
    pub const fn is_queued(self) -> bool {
        matches!(self, Self::Queued | Self::DisplacedOldest)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameClass {
    Reply,
    Push,
}

#[derive(Debug)]
struct Queued {
    class: FrameClass,
    frame: OutboundFrame,
}

#[derive(Debug, Default)]
struct QueueState {
    frames: VecDeque<Queued>,
    closed: bool,
}

impl QueueState {
    /// Removes the oldest pending push. Returns `false` if there is none.
    fn evict_oldest_push(&mut self) -> bool {
        let Some(pos) = self
            .frames
            .iter()
            .position(|queued| queued.class == FrameClass::Push)
        else {
            return false;
        };
        self.frames.remove(pos).is_some()
    }
}

/// Bounded single-consumer queue of frames waiting to be written.
#[derive(Debug)]
pub struct OutboundQueue {
    state: Mutex<QueueState>,
    capacity: usize,
    readable: Notify,
    writable: Notify,
    closed: Notify,
}

impl OutboundQueue {
    /// Creates an empty queue holding at most `capacity` frames (min 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            capacity: capacity.max(1),
            readable: Notify::new(),
            writable: Notify::new(),
            closed: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a reply from the owning session's loop.
    ///
    /// Waits while the queue is full of replies. A full queue that still
    /// holds a pending push makes room by dropping the oldest push.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::TransportFailure`] once the queue is closed.
    pub async fn enqueue_reply(&self, frame: OutboundFrame) -> Result<(), GatewayError> {
        loop {
            let notified = self.writable.notified();
            {
                let mut state = self.lock();
                if state.closed {
                    return Err(GatewayError::TransportFailure("session closed".to_string()));
                }
                if state.frames.len() < self.capacity || state.evict_oldest_push() {
                    state.frames.push_back(Queued {
                        class: FrameClass::Reply,
                        frame,
                    });
                    drop(state);
                    self.readable.notify_one();
                    return Ok(());
                }
            }
            notified.await;
        }
    }

    /// Queues a push from another session without ever waiting.
    pub fn push(&self, frame: OutboundFrame) -> PushOutcome {
        let mut state = self.lock();
        if state.closed {
            return PushOutcome::Closed;
        }
        let mut outcome = PushOutcome::Queued;
        if state.frames.len() >= self.capacity {
            if !state.evict_oldest_push() {
                return PushOutcome::Dropped;
            }
            outcome = PushOutcome::DisplacedOldest;
        }
        state.frames.push_back(Queued {
            class: FrameClass::Push,
            frame,
        });
        drop(state);
        self.readable.notify_one();
        outcome
    }

    /// Waits for the next frame. Returns `None` once the queue is closed
    /// and fully drained.
    pub async fn next(&self) -> Option<OutboundFrame> {
        loop {
            let notified = self.readable.notified();
            {
                let mut state = self.lock();
                if let Some(queued) = state.frames.pop_front() {
                    drop(state);
                    self.writable.notify_waiters();
                    return Some(queued.frame);
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Stops accepting frames. Frames already queued are still drained.
    pub fn close(&self) {
        self.close_inner(None);
    }

    /// Closes the queue after appending one last frame, regardless of
    /// capacity. Has no effect if the queue is already closed.
    pub fn close_with(&self, frame: OutboundFrame) {
        self.close_inner(Some(frame));
    }

    fn close_inner(&self, last: Option<OutboundFrame>) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        if let Some(frame) = last {
            state.frames.push_back(Queued {
                class: FrameClass::Reply,
                frame,
            });
        }
        state.closed = true;
        drop(state);
        self.readable.notify_one();
        self.writable.notify_waiters();
        self.closed.notify_waiters();
    }

    /// Resolves once the queue has been closed.
    pub async fn closed(&self) {
        loop {
            let notified = self.closed.notified();
            if self.is_closed() {
                return;
            }
            notified.await;
        }
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of frames waiting to be written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().frames.len()
    }

    /// Returns `true` if no frames are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().frames.is_empty()
    }
}

/// Spawns the only task allowed to write to `sink`.
///
/// Each frame becomes exactly one text message. A write error closes the
/// queue so the owning loop notices and tears the session down. The sink
/// is closed once the queue is closed and drained.
pub fn spawn_drain<S>(queue: Arc<OutboundQueue>, mut sink: S, session_id: SessionId) -> JoinHandle<()>
where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Display,
{
    tokio::spawn(async move {
        while let Some(frame) = queue.next().await {
            let text = match frame.to_json() {
                Ok(text) => text,
                Err(err) => {
                    tracing::error!(%session_id, error = %err, "failed to encode outbound frame");
                    continue;
                }
            };
            if let Err(err) = sink.send(Message::text(text)).await {
                tracing::debug!(%session_id, error = %err, "outbound write failed");
                queue.close();
                break;
            }
        }
        if let Err(err) = sink.close().await {
            tracing::debug!(%session_id, error = %err, "closing outbound sink failed");
        }
        tracing::trace!(%session_id, "drain task finished");
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{MessageId, UserId, UserIdentity};
    use tokio_test::{assert_pending, assert_ready, task};

    fn push_frame(n: i64) -> OutboundFrame {
        OutboundFrame::Push {
            message_id: MessageId::new(n),
            from: UserIdentity::new(UserId::new(1), "alice"),
            content: format!("push {n}"),
        }
    }

    fn reply_frame() -> OutboundFrame {
        OutboundFrame::SendAck {
            message_id: MessageId::new(0),
            delivered_live: false,
        }
    }

    fn push_id(frame: Option<OutboundFrame>) -> i64 {
        match frame {
            Some(OutboundFrame::Push { message_id, .. }) => message_id.get(),
            other => panic!("expected push, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn frames_drain_in_fifo_order() {
        let queue = OutboundQueue::new(8);
        for n in 1..=3 {
            assert_eq!(queue.push(push_frame(n)), PushOutcome::Queued);
        }
        assert_eq!(push_id(queue.next().await), 1);
        assert_eq!(push_id(queue.next().await), 2);
        assert_eq!(push_id(queue.next().await), 3);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn overflow_drops_oldest_push() {
        let queue = OutboundQueue::new(2);
        assert_eq!(queue.push(push_frame(1)), PushOutcome::Queued);
        assert_eq!(queue.push(push_frame(2)), PushOutcome::Queued);
        assert_eq!(queue.push(push_frame(3)), PushOutcome::DisplacedOldest);
        assert_eq!(queue.len(), 2);
        assert_eq!(push_id(queue.next().await), 2);
        assert_eq!(push_id(queue.next().await), 3);
    }

    #[tokio::test]
    async fn push_is_dropped_when_full_of_replies() {
        let queue = OutboundQueue::new(1);
        assert!(queue.enqueue_reply(reply_frame()).await.is_ok());
        assert_eq!(queue.push(push_frame(1)), PushOutcome::Dropped);
        assert!(matches!(
            queue.next().await,
            Some(OutboundFrame::SendAck { .. })
        ));
    }

    #[tokio::test]
    async fn reply_evicts_pending_push_instead_of_waiting() {
        let queue = OutboundQueue::new(1);
        assert_eq!(queue.push(push_frame(1)), PushOutcome::Queued);
        assert!(queue.enqueue_reply(reply_frame()).await.is_ok());
        assert_eq!(queue.len(), 1);
        assert!(matches!(
            queue.next().await,
            Some(OutboundFrame::SendAck { .. })
        ));
    }

    #[tokio::test]
    async fn reply_waits_for_room() {
        let queue = OutboundQueue::new(1);
        assert!(queue.enqueue_reply(reply_frame()).await.is_ok());

        let mut blocked = task::spawn(queue.enqueue_reply(reply_frame()));
        assert_pending!(blocked.poll());

        assert!(queue.next().await.is_some());
        assert!(blocked.is_woken());
        let result = assert_ready!(blocked.poll());
        assert!(result.is_ok());
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn close_releases_waiting_reply() {
        let queue = OutboundQueue::new(1);
        assert!(queue.enqueue_reply(reply_frame()).await.is_ok());

        let mut blocked = task::spawn(queue.enqueue_reply(reply_frame()));
        assert_pending!(blocked.poll());
        queue.close();
        let result = assert_ready!(blocked.poll());
        assert!(matches!(result, Err(GatewayError::TransportFailure(_))));
    }

    #[tokio::test]
    async fn close_with_flushes_then_ends() {
        let queue = OutboundQueue::new(1);
        assert_eq!(queue.push(push_frame(1)), PushOutcome::Queued);
        queue.close_with(OutboundFrame::error(&GatewayError::Superseded));
        assert_eq!(queue.push(push_frame(2)), PushOutcome::Closed);

        assert_eq!(push_id(queue.next().await), 1);
        assert!(matches!(queue.next().await, Some(OutboundFrame::Error(_))));
        assert!(queue.next().await.is_none());
    }

    #[tokio::test]
    async fn closed_resolves_after_close() {
        let queue = Arc::new(OutboundQueue::new(4));
        let mut waiter = task::spawn(queue.closed());
        assert_pending!(waiter.poll());
        queue.close();
        assert!(waiter.is_woken());
        assert_ready!(waiter.poll());
    }

    #[tokio::test]
    async fn drain_writes_one_text_message_per_frame() {
        let written = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink_log = Arc::clone(&written);
        let sink = Box::pin(futures_util::sink::unfold(
            sink_log,
            |log, msg: Message| async move {
                if let Message::Text(text) = msg {
                    log.lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(text.as_str().to_owned());
                }
                Ok::<_, std::convert::Infallible>(log)
            },
        ));

        let queue = Arc::new(OutboundQueue::new(8));
        let drain = spawn_drain(Arc::clone(&queue), sink, SessionId::new());
        assert_eq!(queue.push(push_frame(1)), PushOutcome::Queued);
        assert!(queue.enqueue_reply(reply_frame()).await.is_ok());
        queue.close();
        assert!(drain.await.is_ok());

        let written = written.lock().unwrap_or_else(PoisonError::into_inner);
        assert_eq!(written.len(), 2);
        for text in written.iter() {
            let parsed: Result<serde_json::Value, _> = serde_json::from_str(text);
            assert!(parsed.is_ok(), "frame is not standalone JSON: {text}");
        }
    }
}
