//! Pending-call buckets.
//!
//! Calls issued before their gating condition holds wait here. Two FIFO
//! buckets: `NoAuth` drains when the connection is ready, `Auth` drains
//! when a session is obtained. Entries pushed while a drain is in
//! progress wait for the next cycle.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::router::CallHandle;
use crate::types::Envelope;

/// Which gating condition a queued call waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    NoAuth,
    Auth,
}

/// A buffered call: its envelope in progress plus the chunk-upload calls
/// that must settle before it may be transmitted. `explicit_creds` marks
/// a caller-supplied identity that must survive the flush-time restamp.
pub struct QueuedCall {
    pub envelope: Envelope,
    pub dependents: Vec<CallHandle>,
    pub explicit_creds: bool,
}

#[derive(Default)]
pub struct PendingQueue {
    no_auth: Mutex<VecDeque<QueuedCall>>,
    auth: Mutex<VecDeque<QueuedCall>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn bucket(&self, bucket: Bucket) -> &Mutex<VecDeque<QueuedCall>> {
        match bucket {
            Bucket::NoAuth => &self.no_auth,
            Bucket::Auth => &self.auth,
        }
    }

    /// Append a call, preserving submission order.
    pub fn push(&self, bucket: Bucket, call: QueuedCall) {
        self.bucket(bucket)
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(call);
    }

    /// Take the whole bucket as a flush snapshot, oldest first.
    pub fn drain(&self, bucket: Bucket) -> Vec<QueuedCall> {
        self.bucket(bucket)
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    pub fn len(&self, bucket: Bucket) -> usize {
        self.bucket(bucket)
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
