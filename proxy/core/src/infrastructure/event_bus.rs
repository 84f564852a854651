// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Application Events
//
// In-memory fan-out over a tokio broadcast channel. Feeds the SSE watch
// endpoint. Events are not persisted; a slow subscriber that falls behind the
// channel capacity loses the oldest events.

use futures::stream::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

use crate::domain::events::ApplicationEvent;

/// Event bus for publishing and subscribing to application events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<ApplicationEvent>>,
}

impl EventBus {
    /// Capacity is the number of events buffered per subscriber before the
    /// oldest ones are dropped.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    pub fn publish(&self, event: ApplicationEvent) {
        debug!("Publishing event: {:?}", event);

        let receiver_count = self.sender.send(event).unwrap_or(0);
        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    /// Stream of events for a single application. Lagged gaps are skipped.
    pub fn application_stream(
        &self,
        namespace: &str,
        name: &str,
    ) -> impl Stream<Item = ApplicationEvent> + Send + 'static {
        let namespace = namespace.to_string();
        let name = name.to_string();

        BroadcastStream::new(self.sender.subscribe()).filter_map(move |item| {
            let event = match item {
                Ok(event) if event.concerns(&namespace, &name) => Some(event),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(n)) => {
                    warn!("Event stream lagged by {} events", n);
                    None
                }
            };
            futures::future::ready(event)
        })
    }
}
