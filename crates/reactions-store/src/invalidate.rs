// SPDX-License-Identifier: Apache-2.0
//! Cache-invalidation observer bus.
//!
//! Rendered reaction HTML is often served from a full-page cache in front of
//! the application, so every successful counter mutation signals the parent
//! content so those layers can drop their copy. The signal is best-effort:
//! zero subscribers is fine and no subscriber outcome fails the request.

use std::sync::Arc;

use tracing::debug;

use crate::ContentId;

/// A cache layer interested in content-scoped invalidation.
pub trait CacheInvalidator: Send + Sync {
    /// Drop any cached rendering of the given content.
    fn flush_content(&self, content_id: ContentId);
}

/// Registrable list of invalidation subscribers.
#[derive(Default, Clone)]
pub struct InvalidationBus {
    subscribers: Vec<Arc<dyn CacheInvalidator>>,
}

impl InvalidationBus {
    /// An empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Registration order is notification order.
    pub fn register(&mut self, subscriber: Arc<dyn CacheInvalidator>) {
        self.subscribers.push(subscriber);
    }

    /// Notify every subscriber that `content_id` changed. Fire-and-forget.
    pub fn notify(&self, content_id: ContentId) {
        debug!(content_id, subscribers = self.subscribers.len(), "cache invalidation");
        for subscriber in &self.subscribers {
            subscriber.flush_content(content_id);
        }
    }

    /// Number of registered subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether no subscriber is registered.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl std::fmt::Debug for InvalidationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvalidationBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
