//! Bounded per-service event queues.

use crate::core::{Event, ServiceId, Signal};
use std::collections::{BTreeMap, VecDeque};
use thiserror::Error;
use tracing::trace;

/// Errors returned by [`Mailboxes::post`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PostError {
    #[error("Queue for {service} is full ({capacity} pending), dropped {event}")]
    QueueFull {
        service: ServiceId,
        capacity: usize,
        event: &'static str,
    },

    #[error("No service registered as {0}")]
    UnknownService(ServiceId),

    #[error("{0} is a pseudo-event and cannot be posted")]
    PseudoEvent(&'static str),
}

/// FIFO of pending events for one service.
#[derive(Debug, Clone)]
pub struct EventQueue<A> {
    events: VecDeque<Event<A>>,
    capacity: usize,
}

impl<A: Signal> EventQueue<A> {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `event`. Returns `false` without queuing when full.
    pub fn push(&mut self, event: Event<A>) -> bool {
        if self.is_full() {
            return false;
        }
        self.events.push_back(event);
        true
    }

    /// Put `event` ahead of everything already queued, ignoring capacity.
    ///
    /// Only used for the boot `Init`.
    pub(crate) fn push_front(&mut self, event: Event<A>) {
        self.events.push_front(event);
    }

    pub fn pop(&mut self) -> Option<Event<A>> {
        self.events.pop_front()
    }

    pub fn peek(&self) -> Option<&Event<A>> {
        self.events.front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.events.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event<A>> {
        self.events.iter()
    }
}

/// One [`EventQueue`] per registered service, keyed (and ordered) by id.
#[derive(Debug, Clone)]
pub struct Mailboxes<A> {
    queues: BTreeMap<ServiceId, EventQueue<A>>,
}

impl<A: Signal> Default for Mailboxes<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Signal> Mailboxes<A> {
    pub fn new() -> Self {
        Self {
            queues: BTreeMap::new(),
        }
    }

    /// Create the queue for `service`. Returns `false` if it already exists.
    pub fn register(&mut self, service: ServiceId, capacity: usize) -> bool {
        if self.queues.contains_key(&service) {
            return false;
        }
        self.queues.insert(service, EventQueue::new(capacity));
        true
    }

    /// Queue `event` for `service`. Never blocks.
    pub fn post(&mut self, service: ServiceId, event: Event<A>) -> Result<(), PostError> {
        if event.kind.is_pseudo() {
            return Err(PostError::PseudoEvent(event.name()));
        }
        let queue = self
            .queues
            .get_mut(&service)
            .ok_or(PostError::UnknownService(service))?;
        if !queue.push(event) {
            return Err(PostError::QueueFull {
                service,
                capacity: queue.capacity(),
                event: event.name(),
            });
        }
        trace!(%service, event = event.name(), param = event.param, "Event queued");
        Ok(())
    }

    /// Place the boot `Init` at the head of `service`'s queue.
    pub(crate) fn post_init(&mut self, service: ServiceId) -> Result<(), PostError> {
        let queue = self
            .queues
            .get_mut(&service)
            .ok_or(PostError::UnknownService(service))?;
        queue.push_front(Event::init());
        Ok(())
    }

    pub fn pop(&mut self, service: ServiceId) -> Option<Event<A>> {
        self.queues.get_mut(&service).and_then(EventQueue::pop)
    }

    pub fn get(&self, service: ServiceId) -> Option<&EventQueue<A>> {
        self.queues.get(&service)
    }

    pub fn contains(&self, service: ServiceId) -> bool {
        self.queues.contains_key(&service)
    }

    /// Pending events for `service`; zero for unknown services.
    pub fn len(&self, service: ServiceId) -> usize {
        self.queues.get(&service).map_or(0, EventQueue::len)
    }

    pub fn total_pending(&self) -> usize {
        self.queues.values().map(EventQueue::len).sum()
    }

    /// Registered services in ascending id order.
    pub fn services(&self) -> impl Iterator<Item = ServiceId> + '_ {
        self.queues.keys().copied()
    }

    pub fn clear(&mut self) {
        self.queues.values_mut().for_each(EventQueue::clear);
    }
}
