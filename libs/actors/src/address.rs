//! Actor Addresses
//!
//! Stable identities for actors. Ordinary ids are allocated monotonically by
//! one [`AddressFactory`] per world and never reused; the three highest ids
//! are reserved for the root actors every world starts with.

use crate::error::{ActorError, Result};
use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Id of the private root actor
pub const PRIVATE_ROOT_ID: u64 = u64::MAX;
/// Id of the public root actor
pub const PUBLIC_ROOT_ID: u64 = u64::MAX - 1;
/// Id of the dead letters actor
pub const DEAD_LETTERS_ID: u64 = u64::MAX - 2;

pub const PRIVATE_ROOT_NAME: &str = "#private";
pub const PUBLIC_ROOT_NAME: &str = "#public";
pub const DEAD_LETTERS_NAME: &str = "#deadLetters";

/// Immutable actor identity. Equality, ordering and hashing use the id only.
#[derive(Clone)]
pub struct Address {
    id: u64,
    name: Option<Arc<str>>,
}

impl Address {
    pub(crate) fn new(id: u64, name: Option<&str>) -> Self {
        Self {
            id,
            name: name.map(Arc::from),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// True for the root and dead letters addresses
    pub fn is_reserved(&self) -> bool {
        is_reserved_id(self.id)
    }
}

fn is_reserved_id(id: u64) -> bool {
    id >= DEAD_LETTERS_ID
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Address {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Address {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) if name.starts_with('#') => write!(f, "{}", name),
            Some(name) => write!(f, "{}#{}", name, self.id),
            None => write!(f, "#{}", self.id),
        }
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

/// World-wide allocator of unique addresses
#[derive(Debug)]
pub struct AddressFactory {
    next: AtomicU64,
}

impl AddressFactory {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next unnamed address
    pub fn unique(&self) -> Result<Address> {
        self.unique_with(None)
    }

    /// Allocate the next address, optionally carrying a human name. Fails
    /// once the ids below the reserved range are used up.
    pub fn unique_with(&self, name: Option<&str>) -> Result<Address> {
        self.next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |next| {
                (!is_reserved_id(next)).then_some(next + 1)
            })
            .map(|id| Address::new(id, name))
            .map_err(ActorError::addresses_exhausted)
    }

    /// Accept a caller-chosen id. Later allocations never hand it out again.
    pub fn from_id(&self, id: u64, name: Option<&str>) -> Result<Address> {
        if is_reserved_id(id) {
            return Err(ActorError::configuration(
                format!("Address id {} is reserved for root actors", id),
                Some("address_id"),
            ));
        }
        // the id after it would be the first reserved one
        if is_reserved_id(id + 1) {
            return Err(ActorError::configuration(
                format!("Address id {} is the last below the reserved range", id),
                Some("address_id"),
            ));
        }
        if id == 0 {
            return Err(ActorError::configuration(
                "Address id 0 is never allocated",
                Some("address_id"),
            ));
        }
        self.next.fetch_max(id + 1, Ordering::Relaxed);
        Ok(Address::new(id, name))
    }

    pub fn private_root() -> Address {
        Address::new(PRIVATE_ROOT_ID, Some(PRIVATE_ROOT_NAME))
    }

    pub fn public_root() -> Address {
        Address::new(PUBLIC_ROOT_ID, Some(PUBLIC_ROOT_NAME))
    }

    pub fn dead_letters() -> Address {
        Address::new(DEAD_LETTERS_ID, Some(DEAD_LETTERS_NAME))
    }

    /// Approximate number of allocated ids
    pub fn allocated(&self) -> u64 {
        self.next.load(Ordering::Relaxed) - 1
    }
}

impl Default for AddressFactory {
    fn default() -> Self {
        Self::new()
    }
}
