//! Keyed storage for per-den records.
//!
//! On ledger every den, list node, owner slot and surplus balance is its own `KeyValueStore`
//! entry, so a call only loads what it touches. Unit tests of the ledger run without an
//! engine and use a `HashMap` with the same `get`/`insert`/`remove` surface.
//!
//! Reads go through [`load`], which clones the entry and releases it right away. Writes replace
//! the whole entry. No entry reference is held across another store access.

use scrypto::prelude::*;

#[cfg(not(test))]
pub type DenStore<K, V> = KeyValueStore<K, V>;

#[cfg(test)]
pub type DenStore<K, V> = HashMap<K, V>;

/// Clones the entry under `key`, if any.
pub fn load<K, V>(store: &DenStore<K, V>, key: &K) -> Option<V>
where
    K: ScryptoEncode + ScryptoDecode + ScryptoDescribe + Eq + std::hash::Hash,
    V: ScryptoEncode + ScryptoDecode + ScryptoDescribe + Clone,
{
    store.get(key).map(|entry| entry.clone())
}
