//! Per-message identity allocation.

use crate::identity::{ResourceIdentity, Uuid};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// A source of candidate UUIDs for the allocator.
pub trait UuidSource {
    /// Returns the next candidate UUID.
    fn next_uuid(&mut self) -> Uuid;
}

/// Random version-4 UUIDs from the operating system RNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomUuids;

impl UuidSource for RandomUuids {
    fn next_uuid(&mut self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Deterministic version-4-shaped UUIDs built from an incrementing counter.
///
/// Intended for tests and reproducible CLI output where a stable rendering is more useful than
/// unpredictability.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequentialUuids {
    next: u64,
}

impl SequentialUuids {
    /// Starts the sequence at `start`.
    pub fn starting_at(start: u64) -> Self {
        Self { next: start }
    }
}

impl UuidSource for SequentialUuids {
    fn next_uuid(&mut self) -> Uuid {
        let mut bytes = [0u8; 16];
        bytes[8..].copy_from_slice(&self.next.to_be_bytes());
        self.next = self.next.wrapping_add(1);
        ::uuid::Builder::from_random_bytes(bytes).into_uuid()
    }
}

/// Allocates one [`ResourceIdentity`] per logical role for a single compose call.
///
/// Guarantees:
/// - allocating the same role twice returns the same identity
/// - two different roles never share an identity; a candidate UUID that was already issued is
///   discarded and a new one drawn
///
/// Allocation cannot fail.
#[derive(Debug)]
pub struct ReferenceAllocator<R, S = RandomUuids> {
    source: S,
    by_role: HashMap<R, ResourceIdentity>,
    issued: HashSet<Uuid>,
}

impl<R> ReferenceAllocator<R, RandomUuids>
where
    R: Eq + Hash + Copy,
{
    /// Creates an allocator backed by random version-4 UUIDs.
    pub fn new() -> Self {
        Self::with_source(RandomUuids)
    }
}

impl<R> Default for ReferenceAllocator<R, RandomUuids>
where
    R: Eq + Hash + Copy,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<R, S> ReferenceAllocator<R, S>
where
    R: Eq + Hash + Copy,
    S: UuidSource,
{
    /// Creates an allocator drawing candidates from `source`.
    pub fn with_source(source: S) -> Self {
        Self {
            source,
            by_role: HashMap::new(),
            issued: HashSet::new(),
        }
    }

    /// Returns the identity for `role`, allocating one on first use.
    pub fn allocate(&mut self, role: R) -> ResourceIdentity {
        if let Some(existing) = self.by_role.get(&role) {
            return *existing;
        }

        let uuid = loop {
            let candidate = self.source.next_uuid();
            if self.issued.insert(candidate) {
                break candidate;
            }
        };

        let identity = ResourceIdentity::from_uuid(uuid);
        self.by_role.insert(role, identity);
        identity
    }

    /// Number of distinct roles allocated so far.
    pub fn len(&self) -> usize {
        self.by_role.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_role.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    enum Role {
        Patient,
        Observation(usize),
    }

    /// Replays a fixed list of UUIDs, then falls back to a counter.
    struct Scripted {
        queue: VecDeque<Uuid>,
        fallback: SequentialUuids,
    }

    impl UuidSource for Scripted {
        fn next_uuid(&mut self) -> Uuid {
            self.queue
                .pop_front()
                .unwrap_or_else(|| self.fallback.next_uuid())
        }
    }

    #[test]
    fn allocate_is_stable_per_role() {
        let mut allocator = ReferenceAllocator::new();
        let first = allocator.allocate(Role::Patient);
        let second = allocator.allocate(Role::Patient);

        assert_eq!(first, second);
        assert_eq!(allocator.len(), 1);
    }

    #[test]
    fn distinct_roles_get_distinct_identities() {
        let mut allocator = ReferenceAllocator::new();
        let ids: HashSet<_> = (0..200)
            .map(|i| allocator.allocate(Role::Observation(i)))
            .collect();

        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn colliding_candidate_is_redrawn() {
        let repeated = Uuid::from_u128(7);
        let mut allocator = ReferenceAllocator::with_source(Scripted {
            queue: VecDeque::from(vec![repeated, repeated]),
            fallback: SequentialUuids::starting_at(100),
        });

        let a = allocator.allocate(Role::Observation(0));
        let b = allocator.allocate(Role::Observation(1));

        assert_eq!(a, ResourceIdentity::from_uuid(repeated));
        assert_ne!(a, b);
    }

    #[test]
    fn sequential_source_is_reproducible() {
        let mut left = ReferenceAllocator::with_source(SequentialUuids::default());
        let mut right = ReferenceAllocator::with_source(SequentialUuids::default());

        assert_eq!(left.allocate(Role::Patient), right.allocate(Role::Patient));
        let id = left.allocate(Role::Patient).id();
        assert_eq!(Uuid::parse_str(&id).unwrap().get_version_num(), 4);
    }

    #[test]
    fn len_counts_roles_not_calls() {
        let mut allocator = ReferenceAllocator::with_source(SequentialUuids::default());
        assert!(allocator.is_empty());

        allocator.allocate(Role::Patient);
        allocator.allocate(Role::Observation(3));
        allocator.allocate(Role::Patient);

        assert_eq!(allocator.len(), 2);
    }
}
