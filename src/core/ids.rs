use std::sync::atomic::{AtomicU64, Ordering};

/// Source of ids for expressions submitted without one
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Collision-resistant ids from `cuid2`
#[derive(Debug, Default, Clone, Copy)]
pub struct Cuid2Generator;

impl IdGenerator for Cuid2Generator {
    fn next_id(&self) -> String {
        cuid2::create_id()
    }
}

/// Deterministic `prefix-N` ids, counting from 1
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", self.prefix, n)
    }
}
