// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process LRU cache of derived public keys.
//!
//! Account recovery probes many coordinates and the signer re-derives the
//! same key for every batch entry; caching the public half avoids walking the
//! five-level path each time. Only public keys are cached.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use super::sdk::KeyGenDraft;

/// Default number of cached public keys per engine.
pub const DEFAULT_CAPACITY: usize = 64;

pub struct PublicKeyCache {
    cache: Mutex<LruCache<KeyGenDraft, [u8; 32]>>,
}

impl PublicKeyCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    pub fn get(&self, draft: &KeyGenDraft) -> Option<[u8; 32]> {
        let mut cache = self.cache.lock().ok()?;
        cache.get(draft).copied()
    }

    pub fn put(&self, draft: KeyGenDraft, public_key: [u8; 32]) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(draft, public_key);
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PublicKeyCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DerivationType, KeyContext};

    fn draft(key_index: u32) -> KeyGenDraft {
        KeyGenDraft {
            context: KeyContext::Address,
            account: 0,
            change: 0,
            key_index,
            derivation_type: DerivationType::Peikert,
        }
    }

    #[test]
    fn put_and_get() {
        let cache = PublicKeyCache::new(4);
        assert!(cache.get(&draft(0)).is_none());

        cache.put(draft(0), [1u8; 32]);
        assert_eq!(cache.get(&draft(0)), Some([1u8; 32]));
        assert!(cache.get(&draft(1)).is_none());
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = PublicKeyCache::new(2);
        cache.put(draft(0), [0u8; 32]);
        cache.put(draft(1), [1u8; 32]);
        // Touch 0 so that 1 becomes the eviction candidate.
        assert!(cache.get(&draft(0)).is_some());
        cache.put(draft(2), [2u8; 32]);

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&draft(1)).is_none());
        assert!(cache.get(&draft(0)).is_some());
    }

    #[test]
    fn zero_capacity_falls_back_to_one() {
        let cache = PublicKeyCache::new(0);
        cache.put(draft(0), [0u8; 32]);
        cache.put(draft(1), [1u8; 32]);
        assert_eq!(cache.len(), 1);
        assert!(!cache.is_empty());
    }
}
