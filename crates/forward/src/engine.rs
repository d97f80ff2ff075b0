use std::sync::Arc;

use {
    relay_channels::{RelayOutbound, SendTarget},
    relay_common::InboundMessage,
    relay_routing::{RoutingStore, normalize_chat_id},
    tokio::sync::mpsc,
    tracing::{debug, info, warn},
};

use crate::cache::ReplyLinkCache;

/// Outcome of relaying one inbound message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    /// Source routes that matched the message.
    pub matched_sources: usize,
    /// Sends that succeeded.
    pub delivered: usize,
    /// Sends that failed and were skipped.
    pub failed: usize,
}

/// Relays messages from source chats to every destination chat.
pub struct RelayEngine {
    routing: Arc<RoutingStore>,
    outbound: Arc<dyn RelayOutbound>,
    links: ReplyLinkCache,
}

impl RelayEngine {
    pub fn new(
        routing: Arc<RoutingStore>,
        outbound: Arc<dyn RelayOutbound>,
        links: ReplyLinkCache,
    ) -> Self {
        Self {
            routing,
            outbound,
            links,
        }
    }

    pub fn links(&self) -> &ReplyLinkCache {
        &self.links
    }

    /// Relay one message to every destination, once per matching source.
    ///
    /// A failed send is logged and skipped; the remaining destinations are
    /// still attempted.
    pub async fn relay(&self, msg: &InboundMessage) -> RelayReport {
        let chat_id = normalize_chat_id(msg.chat_id);
        let table = self.routing.snapshot();

        let mut report = RelayReport::default();
        for source in table.matching_sources(chat_id, msg.thread_id) {
            report.matched_sources += 1;
            debug!(
                chat_id,
                message_id = msg.message_id,
                source = %source,
                "source matched"
            );

            for dest in &table.dests {
                let reply_to = msg
                    .reply_to_message_id
                    .and_then(|r| self.links.resolve(chat_id, r, dest.chat_id));
                let target = SendTarget::resolve(reply_to, dest.topic_id);

                match self.outbound.relay(dest.chat_id, msg, target).await {
                    Ok(sent) => {
                        self.links
                            .record(chat_id, msg.message_id, dest.chat_id, sent);
                        report.delivered += 1;
                        debug!(
                            chat_id,
                            message_id = msg.message_id,
                            dest_chat_id = dest.chat_id,
                            dest_message_id = sent,
                            ?target,
                            "relayed"
                        );
                    },
                    Err(e) => {
                        report.failed += 1;
                        warn!(
                            chat_id,
                            message_id = msg.message_id,
                            dest_chat_id = dest.chat_id,
                            error = %e,
                            "relay to destination failed"
                        );
                    },
                }
            }
        }

        if report.matched_sources > 0 {
            info!(
                chat_id,
                message_id = msg.message_id,
                matched = report.matched_sources,
                delivered = report.delivered,
                failed = report.failed,
                "message relayed"
            );
        }
        report
    }

    /// Relay events in arrival order until the channel closes.
    pub async fn run(&self, mut events: mpsc::Receiver<InboundMessage>) {
        info!("relay engine started");
        while let Some(msg) = events.recv().await {
            self.relay(&msg).await;
        }
        info!("relay engine stopped");
    }
}
