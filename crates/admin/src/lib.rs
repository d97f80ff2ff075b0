//! Administrator dialog for editing the routing table at runtime.
//!
//! A single configured administrator drives multi-step dialogs with plain
//! text replies (`/addsource`, then a chat id, then an optional topic).
//! Messages from anyone else are ignored without a reply.

pub mod command;
pub mod machine;
pub mod session;

pub use {
    command::{COMMANDS, Command, Input},
    machine::AdminSessionMachine,
    session::{AdminSession, DEFAULT_SESSION_TTL, Mode, SessionTable, Step},
};
