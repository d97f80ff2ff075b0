use {
    async_trait::async_trait,
    relay_common::{ChatId, InboundMessage, MessageId, TopicId},
};

use crate::Result;

/// Where a relayed copy lands inside its destination chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendTarget {
    /// Reply to an earlier relayed message in the destination.
    Reply(MessageId),
    /// Post into a topic of a forum chat.
    Topic(TopicId),
}

impl SendTarget {
    /// A known reply link wins over the destination's configured topic.
    pub fn resolve(reply_to: Option<MessageId>, topic: Option<TopicId>) -> Option<Self> {
        reply_to.map(Self::Reply).or(topic.map(Self::Topic))
    }
}

/// Send path used by the relay engine.
#[async_trait]
pub trait RelayOutbound: Send + Sync {
    /// Copy `message` into chat `to` and return the id of the new message.
    /// `to` is used exactly as configured; no id normalization happens here.
    async fn relay(
        &self,
        to: ChatId,
        message: &InboundMessage,
        target: Option<SendTarget>,
    ) -> Result<MessageId>;
}

/// Send path used to answer the administrator.
#[async_trait]
pub trait AdminOutbound: Send + Sync {
    async fn send_text(&self, to: ChatId, text: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_link_overrides_topic() {
        assert_eq!(SendTarget::resolve(Some(9), Some(5)), Some(SendTarget::Reply(9)));
    }

    #[test]
    fn topic_is_fallback() {
        assert_eq!(SendTarget::resolve(None, Some(5)), Some(SendTarget::Topic(5)));
        assert_eq!(SendTarget::resolve(None, None), None);
    }
}
