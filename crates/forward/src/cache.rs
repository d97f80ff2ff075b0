//! Reply-link cache.
//!
//! Remembers which destination message was produced when a given source
//! message was relayed to a given destination chat, so that a later reply to
//! the source message can be relayed as a reply to the destination copy.
//! Bounded by both entry count and age.

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
    time::{Duration, Instant},
};

use relay_common::{ChatId, MessageId};

/// Default maximum number of remembered links.
pub const DEFAULT_LINK_CAPACITY: usize = 50_000;

/// Default link lifetime (one week).
pub const DEFAULT_LINK_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// `(source_chat, source_message, dest_chat)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkKey {
    pub source_chat: ChatId,
    pub source_message: MessageId,
    pub dest_chat: ChatId,
}

impl LinkKey {
    pub fn new(source_chat: ChatId, source_message: MessageId, dest_chat: ChatId) -> Self {
        Self {
            source_chat,
            source_message,
            dest_chat,
        }
    }
}

struct LinkEntry {
    dest_message: MessageId,
    inserted_at: Instant,
    seq: u64,
}

#[derive(Default)]
struct Links {
    entries: HashMap<LinkKey, LinkEntry>,
    /// Insertion order. Entries overwritten by a later upsert stay here until
    /// popped and are recognised as stale by their sequence number.
    order: VecDeque<(LinkKey, u64)>,
    next_seq: u64,
}

impl Links {
    fn is_current(&self, key: &LinkKey, seq: u64) -> bool {
        self.entries.get(key).is_some_and(|e| e.seq == seq)
    }

    /// Pop stale and expired entries from the front of the queue.
    fn evict_expired(&mut self, now: Instant, ttl: Duration) {
        while let Some(&(key, seq)) = self.order.front() {
            if !self.is_current(&key, seq) {
                self.order.pop_front();
                continue;
            }
            let expired = self
                .entries
                .get(&key)
                .is_some_and(|e| now.duration_since(e.inserted_at) >= ttl);
            if !expired {
                break;
            }
            self.order.pop_front();
            self.entries.remove(&key);
        }
    }

    fn evict_oldest(&mut self) {
        while let Some((key, seq)) = self.order.pop_front() {
            if self.is_current(&key, seq) {
                self.entries.remove(&key);
                return;
            }
        }
    }
}

/// Thread-safe, bounded map of reply links.
pub struct ReplyLinkCache {
    links: Mutex<Links>,
    capacity: usize,
    ttl: Duration,
}

impl Default for ReplyLinkCache {
    fn default() -> Self {
        Self::new(DEFAULT_LINK_CAPACITY, DEFAULT_LINK_TTL)
    }
}

impl ReplyLinkCache {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            links: Mutex::new(Links::default()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// Remember that relaying `source_message` from `source_chat` to
    /// `dest_chat` produced `dest_message`. Overwrites any earlier link for
    /// the same key.
    pub fn record(
        &self,
        source_chat: ChatId,
        source_message: MessageId,
        dest_chat: ChatId,
        dest_message: MessageId,
    ) {
        self.record_at(
            LinkKey::new(source_chat, source_message, dest_chat),
            dest_message,
            Instant::now(),
        );
    }

    /// Destination message produced by an earlier relay, if still remembered.
    pub fn resolve(
        &self,
        source_chat: ChatId,
        source_message: MessageId,
        dest_chat: ChatId,
    ) -> Option<MessageId> {
        self.resolve_at(
            &LinkKey::new(source_chat, source_message, dest_chat),
            Instant::now(),
        )
    }

    pub fn len(&self) -> usize {
        self.links
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record_at(&self, key: LinkKey, dest_message: MessageId, now: Instant) {
        let mut links = self.links.lock().unwrap_or_else(|e| e.into_inner());
        links.evict_expired(now, self.ttl);

        let seq = links.next_seq;
        links.next_seq += 1;
        links.entries.insert(key, LinkEntry {
            dest_message,
            inserted_at: now,
            seq,
        });
        links.order.push_back((key, seq));

        while links.entries.len() > self.capacity {
            links.evict_oldest();
        }
        // Repeated upserts of hot keys leave stale queue entries behind.
        if links.order.len() > self.capacity.saturating_mul(2) {
            let Links { entries, order, .. } = &mut *links;
            order.retain(|(k, s)| entries.get(k).is_some_and(|e| e.seq == *s));
        }
    }

    fn resolve_at(&self, key: &LinkKey, now: Instant) -> Option<MessageId> {
        let links = self.links.lock().unwrap_or_else(|e| e.into_inner());
        links
            .entries
            .get(key)
            .filter(|e| now.duration_since(e.inserted_at) < self.ttl)
            .map(|e| e.dest_message)
    }
}
