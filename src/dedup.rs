//! Crawl-wide deduplication by identity key.
//!
//! Identity keys are hashed with SHA-256 before they enter the seen-set, so
//! memory per remembered item is fixed regardless of how long the comment
//! bodies that make up a conversation key are.

use sha2::{Digest, Sha256};
use std::collections::HashSet;

use crate::models::{CommentRecord, IssueRecord};

/// Digest of an item's identity fields.
pub type IdentityKey = [u8; 32];

/// Something that can be deduplicated.
pub trait Identity {
    fn identity_key(&self) -> IdentityKey;
}

/// Hash a tuple of fields. Each field is length-prefixed so `("ab", "c")`
/// and `("a", "bc")` produce different keys.
pub fn identity_key<'a, I>(fields: I) -> IdentityKey
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update((field.len() as u64).to_le_bytes());
        hasher.update(field);
    }
    hasher.finalize().into()
}

impl Identity for IssueRecord {
    fn identity_key(&self) -> IdentityKey {
        let number = self.number.to_string();
        identity_key([number.as_bytes(), self.title.as_bytes()])
    }
}

impl Identity for CommentRecord {
    fn identity_key(&self) -> IdentityKey {
        identity_key([
            self.author.as_bytes(),
            self.content.as_bytes(),
            self.timestamp.as_bytes(),
        ])
    }
}

/// Remembers every identity key seen during one crawl.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<IdentityKey>,
    discarded: u64,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time a key is offered, `false` afterwards.
    pub fn admit_key(&mut self, key: IdentityKey) -> bool {
        if self.seen.insert(key) {
            true
        } else {
            self.discarded += 1;
            false
        }
    }

    /// Admit an item, logging it when it is a repeat.
    pub fn admit<T: Identity + std::fmt::Debug>(&mut self, item: &T) -> bool {
        let fresh = self.admit_key(item.identity_key());
        if !fresh {
            tracing::info!(item = ?item, "Duplicate item skipped");
        }
        fresh
    }

    /// Number of items rejected as duplicates so far.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    pub fn seen(&self) -> usize {
        self.seen.len()
    }
}

/// Keep the first occurrence of every key, preserving order.
pub fn dedupe<T, K>(items: Vec<T>, key_fn: K) -> Vec<T>
where
    K: Fn(&T) -> IdentityKey,
{
    let mut dedup = Deduplicator::new();
    items
        .into_iter()
        .filter(|item| dedup.admit_key(key_fn(item)))
        .collect()
}
