//! Shared identifiers and transport event records used across all relay crates.

pub mod types;

pub use types::{AdminMessage, ChatId, InboundMessage, MessageId, TopicId, TransportEvent};
