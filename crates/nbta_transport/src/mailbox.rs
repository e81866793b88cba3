//! Bounded per-link frame queues.

use crate::config::OverflowPolicy;
use std::collections::VecDeque;

/// Result of offering a frame to a [`Mailbox`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Offer {
    /// Queued with room to spare.
    Queued,
    /// Queued after evicting the oldest frame.
    Evicted,
    /// Refused; the mailbox is unchanged.
    Refused,
}

/// FIFO of encoded frames for one `(from, to)` link.
#[derive(Debug)]
pub(crate) struct Mailbox {
    frames: VecDeque<Vec<u8>>,
    capacity: usize,
}

impl Mailbox {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::new(),
            capacity,
        }
    }

    pub(crate) fn offer(&mut self, frame: Vec<u8>, policy: OverflowPolicy) -> Offer {
        if self.frames.len() < self.capacity {
            self.frames.push_back(frame);
            return Offer::Queued;
        }
        match policy {
            OverflowPolicy::Reject => Offer::Refused,
            OverflowPolicy::DropOldest => {
                self.frames.pop_front();
                self.frames.push_back(frame);
                Offer::Evicted
            }
        }
    }

    pub(crate) fn pop(&mut self) -> Option<Vec<u8>> {
        self.frames.pop_front()
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = Vec<u8>> + '_ {
        self.frames.drain(..)
    }

    pub(crate) fn len(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }
}
