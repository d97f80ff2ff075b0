//! Transport seams.
//!
//! The relay engine and the admin session machine only talk to the messaging
//! platform through the traits defined here; the Telegram crate provides the
//! concrete implementation and tests provide recording mocks.

pub mod error;
pub mod outbound;

pub use {
    error::{Error, Result},
    outbound::{AdminOutbound, RelayOutbound, SendTarget},
};
