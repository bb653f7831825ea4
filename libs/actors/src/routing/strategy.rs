//! Routing strategies. Each returns the positions of the routees that
//! should receive one message.

use crate::address::Address;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::any::Any;

/// What a strategy may know about a routee when choosing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteeStatus {
    /// Position in the router's pool
    pub index: usize,
    pub address: Address,
    pub pending_messages: usize,
}

pub trait RoutingStrategy: Send {
    fn name(&self) -> &'static str;

    /// Pool positions to route `message` to; empty when there is nothing to choose
    fn choose(&mut self, message: &dyn Any, routees: &[RouteeStatus]) -> Vec<usize>;
}

pub struct RandomRoutingStrategy {
    rng: StdRng,
}

impl RandomRoutingStrategy {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible choices
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomRoutingStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutingStrategy for RandomRoutingStrategy {
    fn name(&self) -> &'static str {
        "random"
    }

    fn choose(&mut self, _message: &dyn Any, routees: &[RouteeStatus]) -> Vec<usize> {
        routees
            .choose(&mut self.rng)
            .map(|routee| vec![routee.index])
            .unwrap_or_default()
    }
}

#[derive(Debug, Default)]
pub struct RoundRobinRoutingStrategy {
    next: usize,
}

impl RoundRobinRoutingStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoutingStrategy for RoundRobinRoutingStrategy {
    fn name(&self) -> &'static str {
        "round-robin"
    }

    fn choose(&mut self, _message: &dyn Any, routees: &[RouteeStatus]) -> Vec<usize> {
        if routees.is_empty() {
            return Vec::new();
        }
        let chosen = routees[self.next % routees.len()].index;
        self.next = self.next.wrapping_add(1);
        vec![chosen]
    }
}

/// Fewest pending messages wins; ties go to the earliest routee
#[derive(Debug, Default)]
pub struct SmallestMailboxRoutingStrategy;

impl RoutingStrategy for SmallestMailboxRoutingStrategy {
    fn name(&self) -> &'static str {
        "smallest-mailbox"
    }

    fn choose(&mut self, _message: &dyn Any, routees: &[RouteeStatus]) -> Vec<usize> {
        routees
            .iter()
            .min_by_key(|routee| (routee.pending_messages, routee.index))
            .map(|routee| vec![routee.index])
            .unwrap_or_default()
    }
}

#[derive(Debug, Default)]
pub struct BroadcastRoutingStrategy;

impl RoutingStrategy for BroadcastRoutingStrategy {
    fn name(&self) -> &'static str {
        "broadcast"
    }

    fn choose(&mut self, _message: &dyn Any, routees: &[RouteeStatus]) -> Vec<usize> {
        routees.iter().map(|routee| routee.index).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AddressFactory;

    fn pool(pending: &[usize]) -> Vec<RouteeStatus> {
        let factory = AddressFactory::new();
        pending
            .iter()
            .enumerate()
            .map(|(index, &pending_messages)| RouteeStatus {
                index,
                address: factory.unique().unwrap(),
                pending_messages,
            })
            .collect()
    }

    #[test]
    fn test_round_robin_cycles_in_order() {
        let routees = pool(&[0, 0, 0]);
        let mut strategy = RoundRobinRoutingStrategy::new();
        let picks: Vec<usize> = (0..6).flat_map(|_| strategy.choose(&(), &routees)).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn test_smallest_mailbox_prefers_earliest_on_tie() {
        let mut strategy = SmallestMailboxRoutingStrategy;
        assert_eq!(strategy.choose(&(), &pool(&[3, 1, 1, 4])), vec![1]);
        assert_eq!(strategy.choose(&(), &pool(&[0, 0])), vec![0]);
    }

    #[test]
    fn test_random_picks_exactly_one_member() {
        let routees = pool(&[0, 0, 0, 0]);
        let mut strategy = RandomRoutingStrategy::with_seed(7);
        for _ in 0..50 {
            let picked = strategy.choose(&"msg", &routees);
            assert_eq!(picked.len(), 1);
            assert!(picked[0] < 4);
        }
    }

    #[test]
    fn test_empty_pool_and_broadcast() {
        assert!(RandomRoutingStrategy::new().choose(&(), &[]).is_empty());
        assert!(RoundRobinRoutingStrategy::new().choose(&(), &[]).is_empty());
        assert_eq!(
            BroadcastRoutingStrategy.choose(&(), &pool(&[5, 0, 2])),
            vec![0, 1, 2]
        );
    }
}
