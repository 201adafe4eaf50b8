//! The networked KV store abstraction: ready-domain scheduling, bloom-filter
//! dedup, and per-domain bookkeeping, all behind one [`KvBackend`] trait so
//! the frontier and politeness layers never talk to `redis` directly.

mod backend;
mod counting;
mod error;
mod redis_backend;
pub mod schema;

#[cfg(any(test, feature = "test-util"))]
mod fake;

pub use backend::{DomainRecord, KvBackend, ReadyDomain, VisitedFields};
pub use counting::CountingKv;
pub use error::KvError;
pub use redis_backend::RedisKv;

#[cfg(any(test, feature = "test-util"))]
pub use fake::FakeKv;
