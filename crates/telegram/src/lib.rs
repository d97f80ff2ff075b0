//! Telegram transport for the relay.
//!
//! Turns Bot API updates into [`relay_common::TransportEvent`]s and
//! implements the outbound traits from `relay-channels` on top of teloxide.

pub mod bot;
pub mod convert;
pub mod error;
pub mod outbound;

pub use {
    bot::{EventSinks, build_bot, connect, start_polling},
    convert::{Role, classify},
    error::{Error, Result},
    outbound::TelegramOutbound,
};
