//! Bookkeeping of outstanding block requests.
//!
//! Block bodies responses do not carry the hash of the block they belong to,
//! so the hash is remembered per request id until the response arrives.

use alloy_primitives::B256;
use std::collections::VecDeque;

/// Maximum number of outstanding requests remembered per connection.
pub const MAX_TRACKED_REQUESTS: usize = 32;

/// An outstanding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub id: u64,
    /// Hash of the block the request is about.
    pub block_hash: B256,
}

/// Bounded queue of outstanding requests, oldest evicted first.
#[derive(Debug, Default)]
pub(crate) struct RequestQueue {
    requests: VecDeque<Request>,
}

impl RequestQueue {
    pub fn push(&mut self, request: Request) {
        if self.requests.len() == MAX_TRACKED_REQUESTS {
            self.requests.pop_front();
        }
        self.requests.push_back(request);
    }

    pub fn take(&mut self, id: u64) -> Option<Request> {
        let index = self.requests.iter().position(|r| r.id == id)?;
        self.requests.remove(index)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }
}
