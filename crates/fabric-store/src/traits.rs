//! ByteStore trait: the persistence collaborator.
//!
//! A flat string-keyed map of byte values. Keys are opaque to the store;
//! callers impose structure with prefixes such as `fabric/pages/7`.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Async key/value byte storage.
///
/// # Contract
///
/// - **Last write wins**: a `set` replaces any previous value for the key.
/// - **Read-your-writes**: a `get` after a completed `set` on the same key
///   returns byte-identical content.
/// - `keys` returns matching keys in ascending byte order.
#[async_trait]
pub trait ByteStore: Send + Sync {
    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Bytes) -> Result<()>;

    /// Remove `key`. Returns whether a value was present.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Check whether `key` holds a value.
    async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// List every key starting with `prefix`, in ascending order.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>>;
}

#[async_trait]
impl<S: ByteStore + ?Sized> ByteStore for Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<()> {
        (**self).set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        (**self).delete(key).await
    }

    async fn has(&self, key: &str) -> Result<bool> {
        (**self).has(key).await
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        (**self).keys(prefix).await
    }
}
