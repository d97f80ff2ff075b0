use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use {
    relay_channels::AdminOutbound,
    relay_common::{AdminMessage, ChatId, TopicId},
    relay_routing::{Route, RoutingStore, render_table},
    tokio::sync::mpsc,
    tracing::{debug, info, warn},
};

use crate::{
    command::{Command, Input, help_text},
    session::{AdminSession, Mode, SessionTable, Step},
};

const ASK_TOPIC: &str = "Add topic? (yes/no)";
const PROMPT_TOPIC_ID: &str = "Send the topic/thread ID:";
const INVALID_CHAT_ID: &str = "Please send a valid numeric chat ID.";
const INVALID_TOPIC_ID: &str = "Please send a valid numeric topic ID.";

/// Drives the administrator's routing-table dialogs.
pub struct AdminSessionMachine {
    admin_id: i64,
    routing: Arc<RoutingStore>,
    /// std Mutex: only held for map lookups, never across `.await`.
    sessions: Mutex<SessionTable>,
}

impl AdminSessionMachine {
    pub fn new(admin_id: i64, routing: Arc<RoutingStore>, session_ttl: Duration) -> Self {
        Self {
            admin_id,
            routing,
            sessions: Mutex::new(SessionTable::new(session_ttl)),
        }
    }

    /// The open dialog of `admin_id`, if any.
    pub fn session(&self, admin_id: i64) -> Option<AdminSession> {
        self.sessions().get(admin_id)
    }

    /// Handle one admin-bot message. Returns the reply to send, or `None`
    /// when the message must go unanswered (foreign sender, unknown command,
    /// stray text).
    pub async fn handle(&self, msg: &AdminMessage) -> Option<String> {
        if msg.sender_id != self.admin_id {
            debug!(sender_id = msg.sender_id, "ignoring message from non-admin");
            return None;
        }
        self.sessions().evict_expired();

        match Input::parse(&msg.text) {
            Input::Command(Command::Start(mode)) => {
                self.sessions().start(msg.sender_id, mode);
                debug!(admin_id = msg.sender_id, ?mode, "admin dialog started");
                Some(mode.prompt().to_string())
            },
            Input::Command(Command::ShowConfig) => Some(render_table(&self.routing.snapshot())),
            Input::Command(Command::Cancel) => Some(if self.sessions().end(msg.sender_id) {
                "Cancelled.".to_string()
            } else {
                "Nothing to cancel.".to_string()
            }),
            Input::Command(Command::Help) => Some(help_text()),
            Input::UnknownCommand => None,
            Input::Text(text) => {
                let session = self.session(msg.sender_id)?;
                Some(self.advance(session, text).await)
            },
        }
    }

    /// Answer admin messages until the channel closes.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<AdminMessage>,
        outbound: Arc<dyn AdminOutbound>,
    ) {
        info!(admin_id = self.admin_id, "admin dialog handler started");
        while let Some(msg) = events.recv().await {
            let Some(reply) = self.handle(&msg).await else {
                continue;
            };
            if let Err(e) = outbound.send_text(msg.chat_id, &reply).await {
                warn!(chat_id = msg.chat_id, error = %e, "failed to answer admin");
            }
        }
        info!("admin dialog handler stopped");
    }

    async fn advance(&self, session: AdminSession, text: &str) -> String {
        let admin_id = session.admin_id;
        let mode = session.mode;
        match session.step {
            Step::AwaitChatId => {
                let Ok(chat_id) = text.parse::<ChatId>() else {
                    return INVALID_CHAT_ID.to_string();
                };
                if mode.is_add() {
                    self.sessions()
                        .advance(admin_id, Step::AwaitTopicChoice { chat_id });
                    return ASK_TOPIC.to_string();
                }
                self.sessions().end(admin_id);
                self.remove(mode, chat_id).await
            },
            Step::AwaitTopicChoice { chat_id } => {
                if text.to_lowercase().starts_with('y') {
                    self.sessions()
                        .advance(admin_id, Step::AwaitTopicId { chat_id });
                    return PROMPT_TOPIC_ID.to_string();
                }
                self.sessions().end(admin_id);
                self.add(mode, Route::chat(chat_id)).await
            },
            Step::AwaitTopicId { chat_id } => {
                let Ok(topic_id) = text.parse::<TopicId>() else {
                    return INVALID_TOPIC_ID.to_string();
                };
                self.sessions().end(admin_id);
                self.add(mode, Route::topic(chat_id, topic_id)).await
            },
        }
    }

    async fn add(&self, mode: Mode, route: Route) -> String {
        let result = match mode {
            Mode::AddSource => self.routing.add_source(route).await,
            _ => self.routing.add_dest(route).await,
        };
        match (result, route.topic_id) {
            (Err(e), _) => save_failed(&e),
            (Ok(()), None) => {
                format!("Added {} {} without topic.", mode.noun(), route.chat_id)
            },
            (Ok(()), Some(topic)) => format!(
                "Added {} {} with topic {topic}.",
                mode.noun(),
                route.chat_id
            ),
        }
    }

    async fn remove(&self, mode: Mode, chat_id: ChatId) -> String {
        let result = match mode {
            Mode::RemoveSource => self.routing.remove_sources(chat_id).await,
            _ => self.routing.remove_dests(chat_id).await,
        };
        match result {
            Ok(removed) => format!("Removed {removed} {}s matching {chat_id}.", mode.noun()),
            Err(e) => save_failed(&e),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, SessionTable> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn save_failed(error: &relay_routing::Error) -> String {
    warn!(error = %error, "routing table edit not saved");
    format!("Failed to save routing table: {error}")
}
