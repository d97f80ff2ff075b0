//! Transport-neutral records for inbound events.
//!
//! The transport adapter converts its own update objects into these records
//! before anything reaches the relay engine or the admin session machine, so
//! the core never sees a partially populated platform message.

use serde::{Deserialize, Serialize};

/// Conversation identifier as presented by the transport.
pub type ChatId = i64;

/// Message identifier, unique within a chat.
pub type MessageId = i32;

/// Topic (forum thread) identifier within a chat.
pub type TopicId = i32;

/// A message observed by the relay identity in one of its chats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Chat the message arrived in, in the transport's own (possibly
    /// `-100`-prefixed) form.
    pub chat_id: ChatId,
    pub message_id: MessageId,
    /// Absent for anonymous channel posts.
    pub sender_id: Option<i64>,
    pub text: Option<String>,
    pub thread_id: Option<TopicId>,
    pub reply_to_message_id: Option<MessageId>,
}

impl InboundMessage {
    /// Minimal record for a plain message with no thread or reply.
    pub fn new(chat_id: ChatId, message_id: MessageId) -> Self {
        Self {
            chat_id,
            message_id,
            sender_id: None,
            text: None,
            thread_id: None,
            reply_to_message_id: None,
        }
    }

    #[must_use]
    pub fn in_thread(mut self, thread_id: TopicId) -> Self {
        self.thread_id = Some(thread_id);
        self
    }

    #[must_use]
    pub fn replying_to(mut self, message_id: MessageId) -> Self {
        self.reply_to_message_id = Some(message_id);
        self
    }
}

/// A text message sent to the admin identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminMessage {
    /// Chat to answer in.
    pub chat_id: ChatId,
    pub sender_id: i64,
    pub text: String,
}

/// An inbound event, tagged by the identity that received it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "identity", rename_all = "snake_case")]
pub enum TransportEvent {
    Admin(AdminMessage),
    Relay(InboundMessage),
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_thread_and_reply() {
        let msg = InboundMessage::new(-1001234, 7).in_thread(5).replying_to(3);
        assert_eq!(msg.thread_id, Some(5));
        assert_eq!(msg.reply_to_message_id, Some(3));
        assert_eq!(msg.sender_id, None);
    }

    #[test]
    fn event_serializes_with_identity_tag() {
        let event = TransportEvent::Admin(AdminMessage {
            chat_id: 42,
            sender_id: 42,
            text: "/showconfig".into(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["identity"], "admin");
        assert_eq!(json["text"], "/showconfig");
    }
}
