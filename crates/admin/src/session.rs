//! In-memory admin dialog state.
//!
//! Sessions are not persisted: a restart drops any dialog in progress, and
//! the administrator simply starts over with a new command.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use relay_common::ChatId;

/// How long an idle dialog stays open.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(600);

/// Which edit a dialog performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    AddSource,
    RemoveSource,
    AddDest,
    RemoveDest,
}

impl Mode {
    pub fn is_add(self) -> bool {
        matches!(self, Self::AddSource | Self::AddDest)
    }

    /// Noun used in replies ("source", "destination").
    pub fn noun(self) -> &'static str {
        match self {
            Self::AddSource | Self::RemoveSource => "source",
            Self::AddDest | Self::RemoveDest => "destination",
        }
    }

    /// First prompt of the dialog.
    pub fn prompt(self) -> &'static str {
        match self {
            Self::AddSource => "Send the numeric group/channel ID for the new source.",
            Self::AddDest => "Send the numeric group/channel ID for the destination.",
            Self::RemoveSource | Self::RemoveDest => {
                "Send the numeric group/channel ID to remove."
            },
        }
    }
}

/// Where a dialog stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Waiting for a numeric chat id.
    AwaitChatId,
    /// Add modes: waiting for yes/no on adding a topic.
    AwaitTopicChoice { chat_id: ChatId },
    /// Add modes: waiting for a numeric topic id.
    AwaitTopicId { chat_id: ChatId },
}

impl Step {
    /// 1-based position in the dialog.
    pub fn number(self) -> u8 {
        match self {
            Self::AwaitChatId => 1,
            Self::AwaitTopicChoice { .. } => 2,
            Self::AwaitTopicId { .. } => 3,
        }
    }

    /// Chat id collected in step 1, if any.
    pub fn pending_chat_id(self) -> Option<ChatId> {
        match self {
            Self::AwaitChatId => None,
            Self::AwaitTopicChoice { chat_id } | Self::AwaitTopicId { chat_id } => Some(chat_id),
        }
    }
}

/// One administrator's open dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminSession {
    pub admin_id: i64,
    pub mode: Mode,
    pub step: Step,
    pub expires_at: Instant,
}

/// Open dialogs keyed by administrator id.
pub struct SessionTable {
    sessions: HashMap<i64, AdminSession>,
    ttl: Duration,
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl SessionTable {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            ttl,
        }
    }

    /// Open a fresh dialog, replacing any existing one for `admin_id`.
    pub fn start(&mut self, admin_id: i64, mode: Mode) -> AdminSession {
        self.start_at(admin_id, mode, Instant::now())
    }

    /// The open, unexpired dialog for `admin_id`. An expired one is dropped.
    pub fn get(&mut self, admin_id: i64) -> Option<AdminSession> {
        self.get_at(admin_id, Instant::now())
    }

    /// Move an open dialog to `step`, extending its lifetime.
    pub fn advance(&mut self, admin_id: i64, step: Step) {
        let expires_at = Instant::now() + self.ttl;
        if let Some(session) = self.sessions.get_mut(&admin_id) {
            session.step = step;
            session.expires_at = expires_at;
        }
    }

    /// Close the dialog. Returns whether one was open.
    pub fn end(&mut self, admin_id: i64) -> bool {
        self.sessions.remove(&admin_id).is_some()
    }

    /// Drop every expired dialog.
    pub fn evict_expired(&mut self) {
        let now = Instant::now();
        self.sessions.retain(|_, s| now < s.expires_at);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn start_at(&mut self, admin_id: i64, mode: Mode, now: Instant) -> AdminSession {
        let session = AdminSession {
            admin_id,
            mode,
            step: Step::AwaitChatId,
            expires_at: now + self.ttl,
        };
        self.sessions.insert(admin_id, session);
        session
    }

    fn get_at(&mut self, admin_id: i64, now: Instant) -> Option<AdminSession> {
        let session = *self.sessions.get(&admin_id)?;
        if now >= session.expires_at {
            self.sessions.remove(&admin_id);
            return None;
        }
        Some(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_opens_step_one() {
        let mut table = SessionTable::default();
        let session = table.start(7, Mode::AddSource);
        assert_eq!(session.step, Step::AwaitChatId);
        assert_eq!(session.step.number(), 1);
        assert_eq!(session.step.pending_chat_id(), None);
        assert_eq!(table.get(7), Some(session));
    }

    #[test]
    fn start_replaces_existing_dialog() {
        let mut table = SessionTable::default();
        table.start(7, Mode::AddSource);
        table.advance(7, Step::AwaitTopicChoice { chat_id: 1 });
        table.start(7, Mode::RemoveDest);
        let session = table.get(7);
        assert_eq!(session.map(|s| s.mode), Some(Mode::RemoveDest));
        assert_eq!(session.map(|s| s.step), Some(Step::AwaitChatId));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn advance_keeps_pending_chat() {
        let mut table = SessionTable::default();
        table.start(7, Mode::AddDest);
        table.advance(7, Step::AwaitTopicId { chat_id: -1005 });
        let step = table.get(7).map(|s| s.step);
        assert_eq!(step.map(Step::number), Some(3));
        assert_eq!(step.and_then(Step::pending_chat_id), Some(-1005));
    }

    #[test]
    fn advance_without_dialog_is_noop() {
        let mut table = SessionTable::default();
        table.advance(7, Step::AwaitTopicId { chat_id: 1 });
        assert!(table.is_empty());
    }

    #[test]
    fn expired_dialog_is_dropped() {
        let ttl = Duration::from_secs(60);
        let mut table = SessionTable::new(ttl);
        let t0 = Instant::now();
        table.start_at(7, Mode::AddSource, t0);
        assert!(table.get_at(7, t0 + Duration::from_secs(59)).is_some());
        assert!(table.get_at(7, t0 + ttl).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn end_reports_whether_open() {
        let mut table = SessionTable::default();
        assert!(!table.end(7));
        table.start(7, Mode::AddSource);
        assert!(table.end(7));
        assert!(table.get(7).is_none());
    }

    #[test]
    fn evict_expired_keeps_live_dialogs() {
        let mut table = SessionTable::new(Duration::ZERO);
        table.start(1, Mode::AddSource);
        table.evict_expired();
        assert!(table.is_empty());

        let mut table = SessionTable::default();
        table.start(1, Mode::AddSource);
        table.evict_expired();
        assert_eq!(table.len(), 1);
    }
}
