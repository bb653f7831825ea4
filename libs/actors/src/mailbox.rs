//! Mailboxes
//!
//! Per-actor FIFO queues of [`Message`]s. The owning actor's drain loop is
//! the single consumer; any number of proxies produce. After
//! [`close`](Mailbox::close) returns no send can succeed, so whatever is
//! still queued can be handed to dead letters in one pass.
//!
//! # Providers
//!
//! - `queueMailbox`: unbounded lock-free queue (default)
//! - `ringMailbox`: preallocated ring; proxies append operations with
//!   [`send_with`](Mailbox::send_with). A full ring spills into an ordered
//!   overflow queue instead of blocking the sender.

use crate::address::Address;
use crate::completes::PendingCompletion;
use crate::message::{Message, Operation};
use actors_config::{defaults, MailboxConfig};
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Send outcome; a rejected message is handed back to the caller
pub type SendResult<A> = std::result::Result<(), Message<A>>;

pub trait Mailbox<A>: Send + Sync {
    /// Whether proxies should use [`send_with`](Mailbox::send_with)
    fn is_preallocated(&self) -> bool {
        false
    }

    fn send(&self, message: Message<A>) -> SendResult<A>;

    fn send_with(
        &self,
        target: &Address,
        representation: &'static str,
        operation: Operation<A>,
        completion: Option<Box<dyn PendingCompletion>>,
    ) -> SendResult<A> {
        self.send(Message::new(target.clone(), representation, operation, completion))
    }

    fn receive(&self) -> Option<Message<A>>;

    fn close(&self);

    fn is_closed(&self) -> bool;

    fn pending_messages(&self) -> usize;
}

/// Unbounded multi-producer queue
pub struct ConcurrentQueueMailbox<A> {
    sender: Sender<Message<A>>,
    receiver: Receiver<Message<A>>,
    closed: RwLock<bool>,
}

impl<A> ConcurrentQueueMailbox<A> {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            sender,
            receiver,
            closed: RwLock::new(false),
        }
    }
}

impl<A> Default for ConcurrentQueueMailbox<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Mailbox<A> for ConcurrentQueueMailbox<A> {
    fn send(&self, message: Message<A>) -> SendResult<A> {
        let closed = self.closed.read();
        if *closed {
            return Err(message);
        }
        self.sender.send(message).map_err(|e| e.into_inner())
    }

    fn receive(&self) -> Option<Message<A>> {
        self.receiver.try_recv().ok()
    }

    fn close(&self) {
        *self.closed.write() = true;
    }

    fn is_closed(&self) -> bool {
        *self.closed.read()
    }

    fn pending_messages(&self) -> usize {
        self.receiver.len()
    }
}

/// Preallocated ring with ordered overflow.
///
/// Messages enter the ring only while the overflow is empty, and the
/// overflow is read only once the ring is empty, so every ringed message is
/// older than every overflowed one.
pub struct RingBufferMailbox<A> {
    ring: Sender<Message<A>>,
    ringed: Receiver<Message<A>>,
    overflow: Mutex<VecDeque<Message<A>>>,
    closed: RwLock<bool>,
    capacity: usize,
}

impl<A> RingBufferMailbox<A> {
    pub fn new(capacity: usize) -> Self {
        let (ring, ringed) = crossbeam_channel::bounded(capacity.max(1));
        Self {
            ring,
            ringed,
            overflow: Mutex::new(VecDeque::new()),
            closed: RwLock::new(false),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Messages currently spilled past the ring
    pub fn overflowed(&self) -> usize {
        self.overflow.lock().len()
    }
}

impl<A> Mailbox<A> for RingBufferMailbox<A> {
    fn is_preallocated(&self) -> bool {
        true
    }

    fn send(&self, message: Message<A>) -> SendResult<A> {
        self.send_with_message(message)
    }

    fn send_with(
        &self,
        target: &Address,
        representation: &'static str,
        operation: Operation<A>,
        completion: Option<Box<dyn PendingCompletion>>,
    ) -> SendResult<A> {
        self.send_with_message(Message::new(target.clone(), representation, operation, completion))
    }

    fn receive(&self) -> Option<Message<A>> {
        match self.ringed.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                self.overflow.lock().pop_front()
            }
        }
    }

    fn close(&self) {
        *self.closed.write() = true;
    }

    fn is_closed(&self) -> bool {
        *self.closed.read()
    }

    fn pending_messages(&self) -> usize {
        self.ringed.len() + self.overflow.lock().len()
    }
}

impl<A> RingBufferMailbox<A> {
    fn send_with_message(&self, message: Message<A>) -> SendResult<A> {
        let closed = self.closed.read();
        if *closed {
            return Err(message);
        }
        let mut overflow = self.overflow.lock();
        if !overflow.is_empty() {
            overflow.push_back(message);
            return Ok(());
        }
        match self.ring.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(message)) => {
                if overflow.is_empty() {
                    debug!(capacity = self.capacity, "Ring mailbox full, spilling to overflow");
                }
                overflow.push_back(message);
                Ok(())
            }
            Err(TrySendError::Disconnected(message)) => Err(message),
        }
    }
}

/// Mailbox implementation a provider name resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxKind {
    Queue,
    Ring { capacity: usize },
}

impl MailboxKind {
    pub fn create<A: 'static>(&self) -> Box<dyn Mailbox<A>> {
        match *self {
            MailboxKind::Queue => Box::new(ConcurrentQueueMailbox::new()),
            MailboxKind::Ring { capacity } => Box::new(RingBufferMailbox::new(capacity)),
        }
    }
}

/// Named mailbox providers registered on a world
#[derive(Debug)]
pub struct MailboxRegistry {
    providers: DashMap<String, MailboxKind>,
    default: RwLock<String>,
}

impl MailboxRegistry {
    pub fn from_config(config: &MailboxConfig) -> Self {
        let registry = Self {
            providers: DashMap::new(),
            default: RwLock::new(defaults::mailbox::QUEUE_MAILBOX.to_string()),
        };
        registry.register(defaults::mailbox::QUEUE_MAILBOX, MailboxKind::Queue, false);
        registry.register(
            defaults::mailbox::RING_MAILBOX,
            MailboxKind::Ring {
                capacity: config.ring_capacity,
            },
            false,
        );
        if registry.providers.contains_key(&config.default) {
            *registry.default.write() = config.default.clone();
        } else {
            warn!(
                mailbox = %config.default,
                "Configured default mailbox is not registered; using queueMailbox"
            );
        }
        registry
    }

    pub fn register(&self, name: &str, kind: MailboxKind, is_default: bool) {
        self.providers.insert(name.to_string(), kind);
        if is_default {
            *self.default.write() = name.to_string();
        }
        debug!(mailbox = name, ?kind, is_default, "Mailbox provider registered");
    }

    pub fn default_name(&self) -> String {
        self.default.read().clone()
    }

    /// Resolve a definition's mailbox name; unknown names fall back to the default
    pub fn resolve(&self, name: Option<&str>) -> (String, MailboxKind) {
        if let Some(name) = name {
            if let Some(kind) = self.providers.get(name) {
                return (name.to_string(), *kind);
            }
            warn!(mailbox = name, "Unknown mailbox name; using the default provider");
        }
        let default = self.default_name();
        let kind = self
            .providers
            .get(&default)
            .map(|kind| *kind)
            .unwrap_or(MailboxKind::Queue);
        (default, kind)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.providers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AddressFactory;

    fn message(target: &Address, representation: &'static str) -> Message<Vec<&'static str>> {
        let label = representation;
        Message::new(
            target.clone(),
            representation,
            Box::new(move |log: &mut Vec<&'static str>, _| {
                log.push(label);
                Ok(())
            }),
            None,
        )
    }

    fn drain<A>(mailbox: &dyn Mailbox<A>) -> Vec<&'static str> {
        let mut seen = Vec::new();
        while let Some(message) = mailbox.receive() {
            seen.push(message.representation());
        }
        seen
    }

    #[test]
    fn test_queue_mailbox_fifo_and_close() {
        let target = AddressFactory::new().unique().unwrap();
        let mailbox = ConcurrentQueueMailbox::new();
        for label in ["a", "b", "c"] {
            mailbox.send(message(&target, label)).unwrap();
        }
        assert_eq!(mailbox.pending_messages(), 3);
        assert_eq!(drain(&mailbox), vec!["a", "b", "c"]);

        mailbox.close();
        let rejected = mailbox.send(message(&target, "late")).unwrap_err();
        assert_eq!(rejected.representation(), "late");
    }

    #[test]
    fn test_ring_overflow_preserves_order() {
        let target = AddressFactory::new().unique().unwrap();
        let mailbox = RingBufferMailbox::new(2);
        assert!(mailbox.is_preallocated());

        for label in ["1", "2", "3", "4"] {
            mailbox
                .send_with(&target, label, Box::new(|_: &mut Vec<&'static str>, _| Ok(())), None)
                .unwrap();
        }
        assert_eq!(mailbox.overflowed(), 2);

        // free one ring slot; the next send must still queue behind the overflow
        assert_eq!(mailbox.receive().unwrap().representation(), "1");
        mailbox.send(message(&target, "5")).unwrap();

        assert_eq!(drain(&mailbox), vec!["2", "3", "4", "5"]);
        assert_eq!(mailbox.pending_messages(), 0);

        // once drained, sends use the ring again
        mailbox.send(message(&target, "6")).unwrap();
        assert_eq!(mailbox.overflowed(), 0);
    }

    #[test]
    fn test_registry_falls_back_to_default() {
        let registry = MailboxRegistry::from_config(&MailboxConfig::default());
        assert_eq!(registry.resolve(None).0, "queueMailbox");
        assert_eq!(registry.resolve(Some("missing")).1, MailboxKind::Queue);
        assert_eq!(
            registry.resolve(Some("ringMailbox")).1,
            MailboxKind::Ring { capacity: 1024 }
        );

        registry.register("tiny", MailboxKind::Ring { capacity: 4 }, true);
        assert_eq!(registry.resolve(None), ("tiny".to_string(), MailboxKind::Ring { capacity: 4 }));
        assert_eq!(registry.names(), vec!["queueMailbox", "ringMailbox", "tiny"]);
    }
}
