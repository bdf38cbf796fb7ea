use std::{
    path::Path,
    time::Duration,
};

use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    error::Result,
    schema::IndexSchema,
};

/// Writer memory budget used when none is configured.
pub const DEFAULT_WRITER_MEMORY: usize = 15_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Bytes the index writer may buffer before flushing a segment.
    pub writer_memory_budget: usize,
    /// Give up waiting for index access after this many milliseconds.
    /// Waits forever when unset.
    pub lock_timeout_ms: Option<u64>,
    pub schema: IndexSchema,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            writer_memory_budget: DEFAULT_WRITER_MEMORY,
            lock_timeout_ms: None,
            schema: IndexSchema::default(),
        }
    }
}

impl ServiceConfig {
    /// Read a JSON config file, falling back to defaults when it does not
    /// exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_slice(&std::fs::read(path)?)?;
        config.schema.validate()?;
        Ok(config)
    }

    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_ms.map(Duration::from_millis)
    }
}
