use std::time::Duration;

use {
    relay_common::{AdminMessage, InboundMessage, TransportEvent},
    secrecy::{ExposeSecret, Secret},
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, BotCommand, UpdateKind},
    },
    tokio::{
        sync::mpsc::{self, error::TrySendError},
        task::JoinHandle,
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    Result,
    convert::{Role, classify},
};

/// Long-polling timeout passed to `getUpdates`.
const POLL_TIMEOUT_SECS: u32 = 30;

/// Pause after a failed `getUpdates` before polling again.
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Where polling loops deliver their events.
#[derive(Clone)]
pub struct EventSinks {
    pub admin: mpsc::Sender<AdminMessage>,
    pub relay: mpsc::Sender<InboundMessage>,
}

impl EventSinks {
    /// Hand an event to its consumer. Returns `false` once that consumer is
    /// gone.
    ///
    /// Relay events never wait for queue space: when the engine falls behind
    /// the event is dropped so admin commands polled by the same bot keep
    /// flowing.
    async fn deliver(&self, event: TransportEvent) -> bool {
        match event {
            TransportEvent::Admin(msg) => self.admin.send(msg).await.is_ok(),
            TransportEvent::Relay(msg) => match self.relay.try_send(msg) {
                Ok(()) => true,
                Err(TrySendError::Full(msg)) => {
                    warn!(
                        chat_id = msg.chat_id,
                        message_id = msg.message_id,
                        "relay queue full, dropping message"
                    );
                    true
                },
                Err(TrySendError::Closed(_)) => false,
            },
        }
    }
}

/// Build a bot whose HTTP client outlives the long-polling timeout.
pub fn build_bot(token: &Secret<String>) -> anyhow::Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(u64::from(POLL_TIMEOUT_SECS) + 15))
        .build()?;
    Ok(Bot::with_client(token.expose_secret(), client))
}

/// Verify the token, clear any webhook and, for bots that talk to the
/// administrator, register the command menu.
pub async fn connect(bot: &Bot, role: Role) -> Result<Option<String>> {
    let me = bot.get_me().await?;
    let username = me.username.clone();

    bot.delete_webhook().send().await?;

    if role != Role::Relay {
        let commands = relay_admin::COMMANDS
            .iter()
            .map(|(name, description)| BotCommand::new(*name, *description))
            .collect::<Vec<_>>();
        if let Err(e) = bot.set_my_commands(commands).await {
            warn!(username = ?username, "failed to register bot commands: {e}");
        }
    }

    info!(username = ?username, ?role, "telegram bot connected (webhook cleared)");
    Ok(username)
}

fn allowed_updates(role: Role) -> Vec<AllowedUpdate> {
    match role {
        Role::Admin => vec![AllowedUpdate::Message],
        Role::Relay | Role::Combined { .. } => {
            vec![AllowedUpdate::Message, AllowedUpdate::ChannelPost]
        },
    }
}

/// Spawn the manual long-polling loop for one bot.
///
/// The loop runs until `cancel` fires or a consumer goes away. Another
/// process polling with the same token cancels `cancel` so the whole relay
/// shuts down instead of fighting over updates.
pub fn start_polling(
    bot: Bot,
    role: Role,
    sinks: EventSinks,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(?role, "starting telegram manual polling loop");
        let mut offset: i32 = 0;

        loop {
            let result = tokio::select! {
                () = cancel.cancelled() => break,
                result = bot
                    .get_updates()
                    .offset(offset)
                    .timeout(POLL_TIMEOUT_SECS)
                    .allowed_updates(allowed_updates(role))
                    .send() => result,
            };

            match result {
                Ok(updates) => {
                    debug!(?role, count = updates.len(), "got telegram updates");
                    for update in updates {
                        offset = update.id.as_offset();
                        let msg = match update.kind {
                            UpdateKind::Message(msg) | UpdateKind::ChannelPost(msg) => msg,
                            other => {
                                debug!(?role, "ignoring non-message update: {other:?}");
                                continue;
                            },
                        };
                        debug!(?role, chat_id = msg.chat.id.0, "received telegram message");
                        let Some(event) = classify(&msg, role) else {
                            continue;
                        };
                        if !sinks.deliver(event).await {
                            info!(?role, "event consumer closed, stopping polling");
                            return;
                        }
                    }
                },
                Err(RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) => {
                    warn!(
                        ?role,
                        "telegram polling disabled: another instance is already running with this token"
                    );
                    cancel.cancel();
                    break;
                },
                Err(e) => {
                    warn!(?role, error = %e, "telegram getUpdates failed");
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(POLL_ERROR_BACKOFF) => {},
                    }
                },
            }
        }
        info!(?role, "telegram polling stopped");
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn admin_message(text: &str) -> AdminMessage {
        AdminMessage {
            chat_id: 1,
            sender_id: 1,
            text: text.into(),
        }
    }

    #[test]
    fn build_bot_accepts_token() {
        assert!(build_bot(&Secret::new("123:abc".to_string())).is_ok());
    }

    #[test]
    fn admin_bot_only_wants_messages() {
        assert_eq!(allowed_updates(Role::Admin), vec![AllowedUpdate::Message]);
        assert_eq!(allowed_updates(Role::Relay), vec![
            AllowedUpdate::Message,
            AllowedUpdate::ChannelPost
        ]);
    }

    #[tokio::test]
    async fn deliver_routes_by_identity() {
        let (admin_tx, mut admin_rx) = mpsc::channel(1);
        let (relay_tx, mut relay_rx) = mpsc::channel(1);
        let sinks = EventSinks {
            admin: admin_tx,
            relay: relay_tx,
        };

        let admin = admin_message("/help");
        assert!(sinks.deliver(TransportEvent::Admin(admin.clone())).await);
        assert!(
            sinks
                .deliver(TransportEvent::Relay(InboundMessage::new(-100, 3)))
                .await
        );
        assert_eq!(admin_rx.recv().await, Some(admin));
        assert_eq!(relay_rx.recv().await, Some(InboundMessage::new(-100, 3)));
    }

    #[tokio::test]
    async fn full_relay_queue_does_not_hold_up_admin() {
        let (admin_tx, mut admin_rx) = mpsc::channel(1);
        let (relay_tx, mut relay_rx) = mpsc::channel(1);
        let sinks = EventSinks {
            admin: admin_tx,
            relay: relay_tx,
        };

        let relay = |id| TransportEvent::Relay(InboundMessage::new(-100, id));
        assert!(sinks.deliver(relay(1)).await);
        let overflow = tokio::time::timeout(Duration::from_millis(500), sinks.deliver(relay(2)))
            .await
            .expect("relay delivery waited for queue space");
        assert!(overflow);

        let admin = admin_message("/showconfig");
        let delivered = tokio::time::timeout(
            Duration::from_millis(500),
            sinks.deliver(TransportEvent::Admin(admin.clone())),
        )
        .await
        .expect("admin command stuck behind relay queue");
        assert!(delivered);
        assert_eq!(admin_rx.recv().await, Some(admin));

        assert_eq!(relay_rx.recv().await, Some(InboundMessage::new(-100, 1)));
        assert!(relay_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn deliver_reports_closed_relay_consumer() {
        let (admin_tx, _admin_rx) = mpsc::channel(1);
        let (relay_tx, relay_rx) = mpsc::channel(1);
        drop(relay_rx);
        let sinks = EventSinks {
            admin: admin_tx,
            relay: relay_tx,
        };
        assert!(
            !sinks
                .deliver(TransportEvent::Relay(InboundMessage::new(-100, 1)))
                .await
        );
    }

    #[tokio::test]
    async fn deliver_reports_closed_consumer() {
        let (admin_tx, admin_rx) = mpsc::channel(1);
        let (relay_tx, _relay_rx) = mpsc::channel(1);
        drop(admin_rx);
        let sinks = EventSinks {
            admin: admin_tx,
            relay: relay_tx,
        };
        let closed = !sinks
            .deliver(TransportEvent::Admin(admin_message("x")))
            .await;
        assert!(closed);
    }
}
