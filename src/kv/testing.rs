//! Fault-injecting backend for tests

use super::{pattern_matches, KvBackend, MemoryKv};
use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;

/// Backend operation a fault applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvOp {
    Get,
    Set,
    Delete,
    Keys,
}

#[derive(Debug, Clone)]
struct Fault {
    op: KvOp,
    /// Glob over the key (or over the pattern, for `Keys`)
    pattern: String,
    /// Matching calls still allowed to succeed
    skip: usize,
}

/// In-memory backend that fails chosen operations on demand
#[derive(Debug, Default)]
pub struct FlakyKv {
    inner: MemoryKv,
    faults: Mutex<Vec<Fault>>,
}

impl FlakyKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `op` on keys matching the glob `pattern`
    pub fn fail(&self, op: KvOp, pattern: &str) {
        self.fail_after(op, pattern, 0);
    }

    /// Let `skip` matching calls succeed, then fail the rest
    pub fn fail_after(&self, op: KvOp, pattern: &str, skip: usize) {
        self.push(Fault {
            op,
            pattern: pattern.to_string(),
            skip,
        });
    }

    /// Fail `op` on every key
    pub fn fail_all(&self, op: KvOp) {
        self.fail(op, "*");
    }

    /// Remove every fault
    pub fn heal(&self) {
        self.faults.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Access the backing store without fault injection
    pub fn inner(&self) -> &MemoryKv {
        &self.inner
    }

    fn push(&self, fault: Fault) {
        self.faults
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(fault);
    }

    fn check(&self, op: KvOp, key: &str) -> Result<()> {
        let mut faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
        for fault in faults.iter_mut() {
            if fault.op != op || !pattern_matches(&fault.pattern, key) {
                continue;
            }
            if fault.skip > 0 {
                fault.skip -= 1;
                continue;
            }
            bail!("simulated backend failure: {:?} {}", op, key);
        }
        Ok(())
    }
}

#[async_trait]
impl KvBackend for FlakyKv {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.check(KvOp::Get, key)?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        self.check(KvOp::Set, key)?;
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check(KvOp::Delete, key)?;
        self.inner.delete(key).await
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.check(KvOp::Keys, pattern)?;
        self.inner.keys(pattern).await
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}
