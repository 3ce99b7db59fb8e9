use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a variable held by a store.
///
/// Ids are handed out by an [`IdAllocator`] and are never reused by the
/// allocator that produced them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableId(u64);

impl VariableId {
    pub fn new(n: u64) -> Self {
        VariableId(n)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "var-{}", self.0)
    }
}

/// Monotonic id source owned by one store instance.
///
/// Two allocators never share state, so tests building fresh stores always
/// see ids starting at 1.
#[derive(Debug)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn allocate(&mut self) -> VariableId {
        let id = VariableId(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque identifier of a map-service layer or layer group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
