//! Request-replay guard — safe retries for mutating entry points.
//!
//! Callers that supply a request id get true idempotency: a replayed request
//! returns the originally produced response instead of re-running the
//! operation. Without a request id, replay safety is carried by the store's
//! compare-and-swap and the daily unique index.
//!
//! The guard keeps a bounded cache with LRU-style eviction so memory stays
//! predictable in long-running processes.

use std::collections::{HashMap, VecDeque};

use serde::{Serialize, de::DeserializeOwned};

use offerpass_types::RequestId;

/// Bounded cache of (request id -> serialized response).
#[derive(Debug)]
pub struct ReplayGuard {
    responses: HashMap<RequestId, serde_json::Value>,
    /// Insertion order for eviction (front = oldest).
    order: VecDeque<RequestId>,
    max_size: usize,
}

impl ReplayGuard {
    /// Create a guard remembering at most `max_size` responses.
    ///
    /// # Panics
    /// Panics if `max_size` is zero.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        assert!(max_size > 0, "ReplayGuard max_size must be > 0");
        Self {
            responses: HashMap::with_capacity(max_size),
            order: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// The stored response for a replayed request id, if any.
    #[must_use]
    pub fn recall<T: DeserializeOwned>(&self, request_id: RequestId) -> Option<T> {
        self.responses
            .get(&request_id)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Remember the response produced for `request_id`. Best-effort: a
    /// response that fails to serialize is simply not remembered.
    pub fn remember<T: Serialize>(&mut self, request_id: RequestId, response: &T) {
        let Ok(value) = serde_json::to_value(response) else {
            return;
        };
        if self.responses.len() >= self.max_size && !self.responses.contains_key(&request_id) {
            if let Some(oldest) = self.order.pop_front() {
                self.responses.remove(&oldest);
            }
        }
        if self.responses.insert(request_id, value).is_none() {
            self.order.push_back(request_id);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}
