//! TenantKey - isolation boundary for buffered records
//!
//! Tenant and actor identifiers are cloned into every batch, requeue and log
//! line, so both parts use `Arc<str>` internally.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Reference-counted identifier; clones share one allocation.
///
/// Compares, orders and hashes like the underlying `str`, so maps keyed by
/// `SharedId` can be queried with a plain `&str`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SharedId(Arc<str>);

impl SharedId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SharedId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SharedId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for SharedId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for SharedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for SharedId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SharedId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

/// Composite (tenant, actor) key.
///
/// Records under different keys are never combined into one batch. Ordering
/// is lexicographic on `(tenant_id, actor_id)` so snapshots iterate
/// deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantKey {
    /// Customer / agency the records belong to
    pub tenant_id: SharedId,
    /// User acting on behalf of the tenant
    pub actor_id: SharedId,
}

impl TenantKey {
    pub fn new(tenant_id: impl Into<SharedId>, actor_id: impl Into<SharedId>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            actor_id: actor_id.into(),
        }
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant_id, self.actor_id)
    }
}
