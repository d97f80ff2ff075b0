//! Bot API message → transport event.

use {
    relay_common::{AdminMessage, InboundMessage, TransportEvent},
    teloxide::types::Message,
};

/// What a polling loop is responsible for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Admin bot only: private text messages become admin commands.
    Admin,
    /// Relay bot only: every message and channel post is relay input.
    Relay,
    /// One bot for both. Private messages from `admin_id` go to the admin
    /// stream, everything else is relay input.
    Combined { admin_id: i64 },
}

/// Decide which stream, if any, a message belongs to.
pub fn classify(msg: &Message, role: Role) -> Option<TransportEvent> {
    match role {
        Role::Admin => admin_message(msg).map(TransportEvent::Admin),
        Role::Relay => Some(TransportEvent::Relay(inbound_message(msg))),
        Role::Combined { admin_id } => match admin_message(msg) {
            Some(admin) if admin.sender_id == admin_id => Some(TransportEvent::Admin(admin)),
            _ => Some(TransportEvent::Relay(inbound_message(msg))),
        },
    }
}

/// Relay view of a message. Chat ids are passed through untouched.
pub fn inbound_message(msg: &Message) -> InboundMessage {
    InboundMessage {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
        sender_id: msg.from.as_ref().map(|u| u.id.0 as i64),
        text: msg.text().or_else(|| msg.caption()).map(str::to_string),
        thread_id: msg.thread_id.map(|t| t.0.0),
        reply_to_message_id: msg.reply_to_message().map(|r| r.id.0),
    }
}

/// Admin view of a message: a private chat with a known sender and text.
pub fn admin_message(msg: &Message) -> Option<AdminMessage> {
    if !msg.chat.is_private() {
        return None;
    }
    let sender = msg.from.as_ref()?;
    let text = msg.text()?;
    Some(AdminMessage {
        chat_id: msg.chat.id.0,
        sender_id: sender.id.0 as i64,
        text: text.to_string(),
    })
}
