//! Actor Directory
//!
//! Address to actor registry owned by a stage. Registration goes through the
//! map's entry API, so two racing registrations of one address resolve to
//! exactly one winner.

use crate::address::Address;
use crate::error::{ActorError, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

#[derive(Debug)]
pub struct Directory<V> {
    actors: DashMap<Address, V>,
}

impl<V: Clone> Directory<V> {
    pub fn new() -> Self {
        Self {
            actors: DashMap::new(),
        }
    }

    /// Register under `address`; the first writer wins
    pub fn register(&self, address: Address, actor: V) -> Result<()> {
        match self.actors.entry(address) {
            Entry::Occupied(occupied) => {
                tracing::debug!(address = %occupied.key(), "Rejected duplicate registration");
                Err(ActorError::duplicate_address(occupied.key()))
            }
            Entry::Vacant(vacant) => {
                vacant.insert(actor);
                Ok(())
            }
        }
    }

    pub fn remove(&self, address: &Address) -> Option<V> {
        self.actors.remove(address).map(|(_, actor)| actor)
    }

    pub fn lookup(&self, address: &Address) -> Option<V> {
        self.actors.get(address).map(|entry| entry.value().clone())
    }

    pub fn is_registered(&self, address: &Address) -> bool {
        self.actors.contains_key(address)
    }

    pub fn count(&self) -> usize {
        self.actors.len()
    }

    pub fn addresses(&self) -> Vec<Address> {
        let mut addresses: Vec<_> = self.actors.iter().map(|e| e.key().clone()).collect();
        addresses.sort();
        addresses
    }

    pub fn actors(&self) -> Vec<V> {
        self.actors.iter().map(|e| e.value().clone()).collect()
    }
}

impl<V: Clone> Default for Directory<V> {
    fn default() -> Self {
        Self::new()
    }
}
