//! Identifier generation for new people.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use uuid::Uuid;

use crate::person::PersonId;

/// Hands out identifiers that are unique for the lifetime of the process.
pub trait IdGenerator: Send + Sync + 'static {
    fn next_id(&self) -> PersonId;
}

/// Random v4 UUIDs.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> PersonId {
        PersonId::new(Uuid::new_v4().to_string())
    }
}

/// `1`, `2`, `3`... Deterministic, for tests and reproducible demos.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> PersonId {
        PersonId::new(self.next.fetch_add(1, Ordering::Relaxed).to_string())
    }
}
