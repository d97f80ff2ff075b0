//! Relay engine: fans inbound source messages out to every destination and
//! keeps reply chains intact across the hop.

pub mod cache;
pub mod engine;

pub use {
    cache::{DEFAULT_LINK_CAPACITY, DEFAULT_LINK_TTL, LinkKey, ReplyLinkCache},
    engine::{RelayEngine, RelayReport},
};
