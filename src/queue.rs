use crate::frame::ClientFrame;

/// Backing storage is compacted once it holds more than this many slots...
const COMPACT_MIN_SLOTS: usize = 50;
/// ...and more than this fraction of them has already been dequeued.
const COMPACT_CONSUMED_RATIO: f64 = 0.25;

/// FIFO buffer of outbound frames waiting for an established session.
///
/// Dequeued slots are cleared in place and advanced past with a head index;
/// the consumed prefix is physically removed once it grows past the
/// thresholds above, so a long-lived queue does not retain storage for
/// frames it already handed out.
#[derive(Debug, Default)]
pub struct FrameQueue {
    slots: Vec<Option<ClientFrame>>,
    head: usize,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame at the back of the queue.
    pub fn enqueue(&mut self, frame: ClientFrame) {
        self.slots.push(Some(frame));
    }

    /// Remove and return the frame at the front of the queue.
    pub fn dequeue(&mut self) -> Option<ClientFrame> {
        let frame = self.slots.get_mut(self.head)?.take()?;
        self.head += 1;

        if self.head == self.slots.len() {
            self.slots.clear();
            self.head = 0;
        } else {
            let consumed = self.head as f64 / self.slots.len() as f64;
            if self.slots.len() > COMPACT_MIN_SLOTS && consumed > COMPACT_CONSUMED_RATIO {
                self.slots.drain(..self.head);
                self.head = 0;
            }
        }

        Some(frame)
    }

    /// The frame that `dequeue` would return next.
    pub fn front(&self) -> Option<&ClientFrame> {
        self.slots.get(self.head).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.head
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
